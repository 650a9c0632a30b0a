//! Inline image embedding.
//!
//! A picked file is size-checked before anything is read, then read, typed
//! by sniffing its bytes and turned into an `<img>` with a `data:` URI. The
//! async [`ImageEmbedder::load`] step borrows nothing from the session, so the
//! session stays usable while the file is read.

use std::future::Future;
use std::path::{Path, PathBuf};

use base64::{Engine, engine::general_purpose::STANDARD};
use bytes::Bytes;
use mime_sniffer::MimeTypeSniffer;
use signet_common::Config;
use signet_common::config::{DEFAULT_CONTAINER_WIDTH, DEFAULT_MAX_IMAGE_BYTES};
use signet_editor_core::{Element, Node};

use crate::error::EmbedError;

/// Largest accepted image file, in bytes (500 KB).
pub const MAX_IMAGE_BYTES: u64 = DEFAULT_MAX_IMAGE_BYTES;

/// A file the user picked.
pub trait ImageFile {
    fn name(&self) -> &str;

    /// Size in bytes, known without reading the contents.
    fn size(&self) -> u64;

    fn read(&self) -> impl Future<Output = std::io::Result<Bytes>>;
}

/// An image file on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalImageFile {
    path: PathBuf,
    name: String,
    size: u64,
}

impl LocalImageFile {
    pub async fn open(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let metadata = tokio::fs::metadata(&path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self {
            path,
            name,
            size: metadata.len(),
        })
    }
}

impl ImageFile for LocalImageFile {
    fn name(&self) -> &str {
        &self.name
    }

    fn size(&self) -> u64 {
        self.size
    }

    async fn read(&self) -> std::io::Result<Bytes> {
        Ok(Bytes::from(tokio::fs::read(&self.path).await?))
    }
}

/// An image ready to be inserted into the surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbeddedImage {
    /// `data:` URI holding the whole file.
    pub src: String,
    pub mime_type: String,
    pub width: u32,
}

impl EmbeddedImage {
    pub fn to_node(&self) -> Node {
        Node::Element(
            Element::new("img")
                .with_attr("src", self.src.clone())
                .with_attr("style", format!("width: {}px; height: auto;", self.width)),
        )
    }
}

/// Builds [`EmbeddedImage`]s under a size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageEmbedder {
    max_bytes: u64,
    container_width: u32,
}

impl Default for ImageEmbedder {
    fn default() -> Self {
        Self::new(MAX_IMAGE_BYTES, DEFAULT_CONTAINER_WIDTH)
    }
}

impl ImageEmbedder {
    pub fn new(max_bytes: u64, container_width: u32) -> Self {
        Self {
            max_bytes,
            container_width,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.max_image_bytes, config.container_width)
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Reject files over the limit. A file of exactly the limit is accepted.
    pub fn check(&self, file: &impl ImageFile) -> Result<(), EmbedError> {
        let size = file.size();
        if size > self.max_bytes {
            tracing::warn!(
                name = file.name(),
                size,
                limit = self.max_bytes,
                "image over size limit"
            );
            return Err(EmbedError::TooLarge {
                size,
                limit: self.max_bytes,
            });
        }
        Ok(())
    }

    /// Check, read and encode `file`.
    #[tracing::instrument(skip_all, fields(name = file.name(), size = file.size()))]
    pub async fn load(&self, file: &impl ImageFile) -> Result<EmbeddedImage, EmbedError> {
        self.check(file)?;
        let bytes = file.read().await.map_err(|e| {
            tracing::error!(error = %e, "failed to read image");
            EmbedError::Read(e)
        })?;
        let mime_type = mime_type_for(&bytes, file.name());
        tracing::debug!(%mime_type, "image loaded");
        Ok(EmbeddedImage {
            src: data_uri(&mime_type, &bytes),
            mime_type,
            width: self.container_width,
        })
    }
}

/// Encode `bytes` as a base64 `data:` URI.
pub fn data_uri(mime_type: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime_type, STANDARD.encode(bytes))
}

/// Sniff the type from the bytes, falling back to the file extension.
fn mime_type_for(bytes: &Bytes, name: &str) -> String {
    if let Some(mime) = bytes.sniff_mime_type() {
        if mime.starts_with("image/") {
            return mime.to_string();
        }
    }
    let ext = name.rsplit_once('.').map(|(_, ext)| ext.to_ascii_lowercase());
    match ext.as_deref() {
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("svg") => "image/svg+xml",
        Some("bmp") => "image/bmp",
        _ => "application/octet-stream",
    }
    .to_string()
}
