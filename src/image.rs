//! Validation of base64 image payloads attached to media gallery entries.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::model::ImageContent;

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";
pub const MIME_GIF: &str = "image/gif";

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const GIF_MAGIC: &[u8] = b"GIF8";

pub fn encode_image(name: impl Into<String>, mime_type: &str, bytes: &[u8]) -> ImageContent {
    ImageContent {
        name: name.into(),
        mime_type: mime_type.to_string(),
        base64_encoded_data: STANDARD.encode(bytes),
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ImageContentValidator;

impl ImageContentValidator {
    /// Name present, supported mime type, decodable payload whose leading
    /// bytes match the declared type.
    pub fn is_valid(&self, content: &ImageContent) -> bool {
        if content.name.trim().is_empty() {
            return false;
        }
        let magic = match content.mime_type.as_str() {
            MIME_JPEG => JPEG_MAGIC,
            MIME_PNG => PNG_MAGIC,
            MIME_GIF => GIF_MAGIC,
            _ => return false,
        };
        match STANDARD.decode(content.base64_encoded_data.as_bytes()) {
            Ok(bytes) => bytes.starts_with(magic),
            Err(_) => false,
        }
    }
}
