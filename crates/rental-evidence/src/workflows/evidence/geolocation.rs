use std::future::Future;
use std::time::Duration;

use tracing::debug;

use super::domain::GeoPoint;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("location unavailable: {0}")]
    Unavailable(String),
}

/// Awaits a location lookup for at most `timeout`.
///
/// Photos are still recorded without a position, so every failure collapses to `None`.
pub async fn locate_within<F>(lookup: F, timeout: Duration) -> Option<GeoPoint>
where
    F: Future<Output = Result<GeoPoint, LocationError>>,
{
    match tokio::time::timeout(timeout, lookup).await {
        Ok(Ok(point)) => GeoPoint::new(point.latitude, point.longitude),
        Ok(Err(error)) => {
            debug!(%error, "location lookup failed; recording photo without position");
            None
        }
        Err(_) => {
            debug!(
                timeout_ms = timeout.as_millis() as u64,
                "location lookup timed out; recording photo without position"
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn returns_point_when_lookup_is_fast() {
        let point = locate_within(
            async { Ok(GeoPoint { latitude: 41.6, longitude: -93.6 }) },
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(point, GeoPoint::new(41.6, -93.6));
    }

    #[tokio::test]
    async fn denied_permission_degrades_to_none() {
        let point = locate_within(
            async { Err(LocationError::PermissionDenied) },
            Duration::from_secs(5),
        )
        .await;
        assert!(point.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn slow_lookup_times_out() {
        let lookup = async {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(GeoPoint { latitude: 1.0, longitude: 1.0 })
        };
        assert!(locate_within(lookup, Duration::from_secs(5)).await.is_none());
    }

    #[tokio::test]
    async fn invalid_coordinates_are_dropped() {
        let point = locate_within(
            async { Ok(GeoPoint { latitude: 123.0, longitude: 0.0 }) },
            Duration::from_secs(5),
        )
        .await;
        assert!(point.is_none());
    }
}
