/// Image encodings accepted for condition photos, detected from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Webp,
    Heic,
    Gif,
}

impl ImageFormat {
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return Some(Self::Jpeg);
        }
        if bytes.starts_with(&[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]) {
            return Some(Self::Png);
        }
        if bytes.starts_with(b"GIF87a") || bytes.starts_with(b"GIF89a") {
            return Some(Self::Gif);
        }
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
            return Some(Self::Webp);
        }
        if bytes.len() >= 12 && &bytes[4..8] == b"ftyp" {
            let brand = &bytes[8..12];
            if [b"heic", b"heix", b"hevc", b"mif1", b"msf1"]
                .iter()
                .any(|candidate| brand == *candidate)
            {
                return Some(Self::Heic);
            }
        }
        None
    }

    pub fn content_type(self) -> String {
        match self {
            Self::Jpeg => mime::IMAGE_JPEG.to_string(),
            Self::Png => mime::IMAGE_PNG.to_string(),
            Self::Gif => mime::IMAGE_GIF.to_string(),
            Self::Webp => "image/webp".to_string(),
            Self::Heic => "image/heic".to_string(),
        }
    }

    pub const fn extension(self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Gif => "gif",
            Self::Webp => "webp",
            Self::Heic => "heic",
        }
    }
}

/// Signatures are opaque; unrecognised payloads fall back to `application/octet-stream`.
pub(crate) fn signature_content_type(bytes: &[u8]) -> (String, &'static str) {
    match ImageFormat::sniff(bytes) {
        Some(format) => (format.content_type(), format.extension()),
        None => (mime::APPLICATION_OCTET_STREAM.to_string(), "bin"),
    }
}
