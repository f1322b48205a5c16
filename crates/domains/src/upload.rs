//! # Uploads
//!
//! Image upload types and the acceptance policy (content type and size)
//! applied before anything touches storage.

use bytes::Bytes;
use mime::Mime;

use crate::error::{DomainError, Result};

/// Multipart field name that carries the image.
pub const IMAGE_FIELD: &str = "image";

/// Upper bound and default of the configurable upload size limit.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 15 * 1024 * 1024;
/// Lowest upload size limit a deployment may configure.
pub const MIN_MAX_UPLOAD_BYTES: usize = 12 * 1024 * 1024;

/// A fully buffered image that passed the upload policy.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageUpload {
    pub bytes: Bytes,
    pub content_type: Mime,
    /// Client-supplied name; only its extension is ever consulted.
    pub original_name: Option<String>,
}

/// Where an upload ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub filename: String,
    pub public_url: String,
}

/// Accepted image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Jpeg,
    Png,
    Webp,
}

impl ImageKind {
    /// Matches on the MIME essence; `image/jpg` is accepted as an alias.
    pub fn from_mime(mime: &Mime) -> Option<Self> {
        match mime.essence_str() {
            "image/jpeg" | "image/jpg" => Some(Self::Jpeg),
            "image/png" => Some(Self::Png),
            "image/webp" => Some(Self::Webp),
            _ => None,
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Jpeg => "jpg",
            Self::Png => "png",
            Self::Webp => "webp",
        }
    }

    /// Whether a client-supplied extension is a legitimate spelling for this kind.
    pub fn accepts_extension(&self, ext: &str) -> bool {
        let ext = ext.to_ascii_lowercase();
        match self {
            Self::Jpeg => ext == "jpg" || ext == "jpeg",
            Self::Png => ext == "png",
            Self::Webp => ext == "webp",
        }
    }
}

/// Size and type limits for image uploads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolicy {
    pub max_bytes: usize,
}

impl UploadPolicy {
    pub fn new(max_bytes: usize) -> Self {
        Self { max_bytes }
    }

    /// Parses and checks a declared content type.
    pub fn accept_content_type(&self, raw: Option<&str>) -> Result<Mime> {
        let raw = raw.unwrap_or("application/octet-stream");
        let mime: Mime = raw
            .parse()
            .map_err(|_| DomainError::UnsupportedMediaType(raw.to_string()))?;
        match ImageKind::from_mime(&mime) {
            Some(_) => Ok(mime),
            None => Err(DomainError::UnsupportedMediaType(
                mime.essence_str().to_string(),
            )),
        }
    }

    /// Checked after every buffered chunk so oversized bodies are cut short.
    pub fn check_size(&self, received: usize) -> Result<()> {
        if received > self.max_bytes {
            Err(DomainError::PayloadTooLarge {
                limit: self.max_bytes,
            })
        } else {
            Ok(())
        }
    }
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_UPLOAD_BYTES)
    }
}
