//! Image MIME detection
//!
//! Providers routinely serve processed results without a usable
//! `Content-Type` header, so downloaded bytes are sniffed by magic
//! number before falling back to the crate-wide PNG default.

/// Guess an image MIME type by inspecting bytes (magic numbers).
/// Returns `None` for non-image content.
pub fn guess_image_mime(bytes: &[u8]) -> Option<String> {
    let kind = infer::get(bytes)?;
    let mime = kind.mime_type();
    mime.starts_with("image/").then(|| mime.to_string())
}

/// Whether a declared content type names an image media type.
pub fn is_image_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .next()
        .map(str::trim)
        .is_some_and(|t| t.starts_with("image/"))
}
