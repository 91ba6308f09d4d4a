//! Plant identification from photos
//!
//! Uploaded images are checked locally (declared type, size, file signature)
//! before being forwarded to an identification backend.

mod plantnet;

pub use plantnet::PlantNetClient;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n'];

/// Accepted image encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
}

impl ImageFormat {
    pub fn from_content_type(content_type: &str) -> Option<Self> {
        match content_type.split(';').next().map(str::trim) {
            Some("image/jpeg") => Some(ImageFormat::Jpeg),
            Some("image/png") => Some(ImageFormat::Png),
            _ => None,
        }
    }

    /// Sniff the format from the leading bytes
    pub fn detect(data: &[u8]) -> Option<Self> {
        if data.starts_with(JPEG_MAGIC) {
            Some(ImageFormat::Jpeg)
        } else if data.starts_with(PNG_MAGIC) {
            Some(ImageFormat::Png)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }
}

/// One validated image ready to be forwarded
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub file_name: String,
    pub format: ImageFormat,
    pub data: Vec<u8>,
}

/// Why an uploaded image was refused; positions are 1-based
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageRejection {
    #[error("Unsupported image format for image {0}. Use JPEG or PNG.")]
    UnsupportedType(usize),

    #[error("Image {position} is too large. The maximum size is {max_mb}MB.")]
    TooLarge { position: usize, max_mb: usize },

    #[error("File {0} is not a valid image.")]
    NotAnImage(usize),
}

impl ImageUpload {
    /// Check declared content type, size and signature of the image at `position`
    pub fn validate(
        position: usize,
        file_name: Option<&str>,
        content_type: Option<&str>,
        data: Vec<u8>,
        max_size: usize,
    ) -> Result<Self, ImageRejection> {
        let declared = content_type
            .and_then(ImageFormat::from_content_type)
            .ok_or(ImageRejection::UnsupportedType(position))?;

        if data.len() > max_size {
            return Err(ImageRejection::TooLarge {
                position,
                max_mb: max_size / (1024 * 1024),
            });
        }

        // Either accepted signature will do; PlantNet sniffs the bytes itself
        let format = ImageFormat::detect(&data).ok_or(ImageRejection::NotAnImage(position))?;
        if format != declared {
            tracing::debug!(
                position,
                declared = declared.mime_type(),
                detected = format.mime_type(),
                "Image content type does not match its signature"
            );
        }

        let file_name = file_name
            .filter(|name| !name.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("image_{}", position));

        Ok(Self {
            file_name,
            format,
            data,
        })
    }
}

/// Identification failures
#[derive(Debug, Error)]
pub enum IdentifyError {
    /// The backend recognised no species
    #[error("The requested plant could not be found.")]
    NotFound,

    /// Transport failure or unexpected status
    #[error("Plant identification service failed: {0}")]
    Upstream(String),

    /// The backend answered with something that is not JSON
    #[error("Invalid response from plant identification service: {0}")]
    InvalidResponse(String),
}

/// Backend that turns images into species candidates
#[async_trait]
pub trait PlantIdentifier: Send + Sync {
    /// Returns the backend's JSON result unchanged
    async fn identify(&self, images: Vec<ImageUpload>) -> Result<Value, IdentifyError>;
}
