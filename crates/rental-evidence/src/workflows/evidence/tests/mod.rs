mod common;
mod comparison;
mod lifecycle;
mod routing;
