//! Payload transport codec
//!
//! Converts between raw image bytes and the transport encodings the
//! provider wire formats expect (raw base64 or a self-describing
//! data-URI), and derives upload filenames from content types.
//!
//! Decoding defaults the content type to `image/png` when the transport
//! string declares none; several providers return raw pixels without
//! metadata, and PNG is what they actually emit.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;

use crate::error::{Result, UnmarkError};
use crate::types::ImagePayload;

/// Media type assumed for decoded images that declare none.
pub const DEFAULT_IMAGE_TYPE: &str = "image/png";

/// Encode a payload as raw base64 with no prefix, for protocol fields
/// that expect the bare data.
pub fn to_base64(payload: &ImagePayload) -> String {
    BASE64.encode(&payload.bytes)
}

/// Encode a payload as a self-describing data-URI, for protocol fields
/// that expect one.
pub fn to_data_uri(payload: &ImagePayload) -> String {
    format!(
        "data:{};base64,{}",
        payload.content_type,
        BASE64.encode(&payload.bytes)
    )
}

/// Return the raw base64 part of a transport string, stripping a
/// data-URI prefix when present. Strings without a prefix pass through
/// unchanged.
pub fn strip_data_uri(transport: &str) -> &str {
    match transport.split_once("base64,") {
        Some((_, data)) => data,
        None => transport,
    }
}

/// Media type declared by a data-URI prefix, if the string carries one.
fn declared_content_type(transport: &str) -> Option<&str> {
    let rest = transport.strip_prefix("data:")?;
    let (media_type, _) = rest.split_once(';')?;
    if media_type.is_empty() {
        None
    } else {
        Some(media_type)
    }
}

/// Decode a transport string (raw base64 or a full data-URI) into an
/// [`ImagePayload`].
///
/// Content type precedence: the data-URI prefix, then the caller's
/// `content_type` hint, then [`DEFAULT_IMAGE_TYPE`].
pub fn from_base64(transport: &str, content_type: Option<&str>) -> Result<ImagePayload> {
    let declared = declared_content_type(transport);
    let data = strip_data_uri(transport);
    let bytes = BASE64
        .decode(data.trim())
        .map_err(|e| UnmarkError::ParseError(format!("invalid base64 image data: {e}")))?;

    let content_type = declared
        .or(content_type)
        .unwrap_or(DEFAULT_IMAGE_TYPE)
        .to_string();

    Ok(ImagePayload {
        bytes,
        content_type,
    })
}

/// Upload filename for a content type. Providers that take multipart
/// file parts key their server-side validation off the extension.
pub fn filename_for(content_type: &str) -> &'static str {
    if content_type.contains("jpeg") || content_type.contains("jpg") {
        "image.jpg"
    } else if content_type.contains("bmp") {
        "image.bmp"
    } else {
        "image.png"
    }
}
