//! Image reference normalization.
//!
//! Vendors that cannot take an image URL want `(mime type, base64 payload)` pairs. This
//! module turns an `image_url` string into that pair without any network access: a plain
//! `https://` URL is passed through as if it already were base64.

use std::sync::LazyLock;

use regex::Regex;

const DEFAULT_MIME_TYPE: &str = "image/jpeg";

static DATA_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^data:image/([^;]+);base64,(.*)$").expect("data URL pattern is valid")
});

/// Decoded image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedImage {
    pub mime_type: &'static str,
    pub base64_data: String,
}

/// Splits an image reference into mime type and base64 payload.
///
/// Only the exact lowercase `png`, `gif` and `webp` subtypes are kept; everything else,
/// including references that are not data URLs at all, is reported as `image/jpeg`.
/// A payload spanning several lines is not treated as a data URL.
///
/// # Examples
///
/// ```
/// use kotoba_bridge::image::normalize_image;
///
/// let png = normalize_image("data:image/png;base64,AAAA");
/// assert_eq!(png.mime_type, "image/png");
/// assert_eq!(png.base64_data, "AAAA");
///
/// let bare = normalize_image("BBBB");
/// assert_eq!(bare.mime_type, "image/jpeg");
/// assert_eq!(bare.base64_data, "BBBB");
/// ```
pub fn normalize_image(reference: &str) -> NormalizedImage {
    let Some(captures) = DATA_URL.captures(reference) else {
        return NormalizedImage {
            mime_type: DEFAULT_MIME_TYPE,
            base64_data: reference.to_string(),
        };
    };

    let mime_type = match &captures[1] {
        "png" => "image/png",
        "gif" => "image/gif",
        "webp" => "image/webp",
        _ => DEFAULT_MIME_TYPE,
    };
    NormalizedImage {
        mime_type,
        base64_data: captures[2].to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recognised_subtypes_keep_their_mime_type() {
        for (subtype, expected) in [
            ("png", "image/png"),
            ("gif", "image/gif"),
            ("webp", "image/webp"),
            ("jpeg", "image/jpeg"),
        ] {
            let image = normalize_image(&format!("data:image/{subtype};base64,QUJD"));
            assert_eq!(image.mime_type, expected, "subtype {subtype}");
            assert_eq!(image.base64_data, "QUJD");
        }
    }

    #[test]
    fn unknown_subtype_falls_back_to_jpeg() {
        let image = normalize_image("data:image/svg+xml;base64,PHN2Zz4=");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.base64_data, "PHN2Zz4=");
    }

    #[test]
    fn non_data_references_are_passed_through() {
        let url = "https://example.com/cat.png";
        let image = normalize_image(url);
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.base64_data, url);

        let not_image = normalize_image("data:text/plain;base64,SGk=");
        assert_eq!(not_image.base64_data, "data:text/plain;base64,SGk=");
    }

    #[test]
    fn subtype_matching_is_case_sensitive() {
        let image = normalize_image("data:image/PNG;base64,QUJD");
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.base64_data, "QUJD");
    }

    #[test]
    fn multi_line_payload_is_passed_through_whole() {
        let reference = "data:image/png;base64,QUJD\nREVG";
        let image = normalize_image(reference);
        assert_eq!(image.mime_type, "image/jpeg");
        assert_eq!(image.base64_data, reference);
    }
}
