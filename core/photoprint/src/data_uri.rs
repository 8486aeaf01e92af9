use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::PppError;

/// `data:<type>/<subtype>[;<param>=<value>][;base64],`
static DATA_URI_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^data:([a-z]+/[a-z0-9.+\-]+(;[a-z\-]+=[a-z0-9\-]+)?)?(;base64)?,")
        .expect("data URI pattern is valid")
});

/// Decode image text: base64 content, optionally behind a data URI prefix.
pub fn decode_image_text(text: &str) -> Result<Vec<u8>, PppError> {
    let text = text.trim();
    let payload = match DATA_URI_PREFIX.find(text) {
        Some(prefix) => &text[prefix.end()..],
        None => text,
    };

    // Line-wrapped base64 is common in pasted data
    let compact: String = payload.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| PppError::DecodeError(format!("invalid base64 image data: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_data_uri_prefix() {
        let bytes = decode_image_text("data:image/png;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn accepts_media_type_parameter() {
        let bytes = decode_image_text("data:image/jpeg;charset=utf-8;base64,aGVsbG8=").unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[test]
    fn accepts_bare_base64() {
        assert_eq!(decode_image_text("aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn accepts_prefix_without_media_type() {
        assert_eq!(decode_image_text("data:;base64,aGVsbG8=").unwrap(), b"hello");
        assert_eq!(decode_image_text("data:,aGVsbG8=").unwrap(), b"hello");
    }

    #[test]
    fn ignores_line_breaks() {
        assert_eq!(decode_image_text("aGVs\nbG8=\n").unwrap(), b"hello");
    }

    #[test]
    fn invalid_base64_is_decode_error() {
        assert!(matches!(
            decode_image_text("data:image/png;base64,@@@@"),
            Err(PppError::DecodeError(_))
        ));
    }
}
