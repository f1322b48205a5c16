//! # Local media storage
//!
//! Uploaded images are written flat into one directory and served back by
//! the HTTP layer under [`PUBLIC_PREFIX`]. File names are generated here;
//! nothing the client sends ends up in a path except a vetted extension.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use domains::{ImageKind, ImageUpload, MediaStorage, RepoError, StoredImage};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};
use uuid::Uuid;

/// URL path under which stored files are served.
pub const PUBLIC_PREFIX: &str = "/uploads/photos";

/// `"/uploads/photos/<file>"`, or `"<base>/uploads/photos/<file>"` when a
/// public base URL is configured.
pub fn build_public_url(filename: &str, base: &str) -> String {
    let base = base.trim().trim_end_matches('/');
    format!("{base}{PUBLIC_PREFIX}/{filename}")
}

/// `photo_<unix-millis>_<8 hex>.<ext>`. The client extension is kept only
/// when it is a legitimate spelling of the detected type.
pub fn generate_filename(kind: ImageKind, original_name: Option<&str>) -> String {
    let ext = original_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .filter(|ext| kind.accepts_extension(ext))
        .map(str::to_ascii_lowercase)
        .unwrap_or_else(|| kind.extension().to_string());
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "photo_{}_{}.{ext}",
        Utc::now().timestamp_millis(),
        &suffix[..8]
    )
}

/// Extracts a plain file name from an absolute or root-relative URL.
/// Anything that could escape the storage directory yields `None`.
fn file_name_from_url(url: &str) -> Option<&str> {
    let path = url.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    let plain = !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['\\', '\0', ':']);
    plain.then_some(name)
}

pub struct LocalMediaStorage {
    root: PathBuf,
    public_base: String,
}

impl LocalMediaStorage {
    /// Creates the storage directory if needed.
    pub fn new(
        root: impl Into<PathBuf>,
        public_base: impl Into<String>,
    ) -> Result<Self, RepoError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| {
            RepoError::Backend(format!("cannot create {}: {e}", root.display()))
        })?;
        Ok(Self {
            root,
            public_base: public_base.into(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl MediaStorage for LocalMediaStorage {
    async fn store(&self, upload: ImageUpload) -> Result<StoredImage, RepoError> {
        let kind = ImageKind::from_mime(&upload.content_type).ok_or_else(|| {
            RepoError::Backend(format!("refusing to store {}", upload.content_type))
        })?;
        let filename = generate_filename(kind, upload.original_name.as_deref());
        let path = self.root.join(&filename);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
            .map_err(|e| RepoError::Backend(format!("cannot create {}: {e}", path.display())))?;
        if let Err(e) = async {
            file.write_all(&upload.bytes).await?;
            file.flush().await
        }
        .await
        {
            drop(file);
            discard_partial(&path).await;
            return Err(RepoError::Backend(format!("cannot write {}: {e}", path.display())));
        }

        debug!(file = %filename, bytes = upload.bytes.len(), "image stored");
        Ok(StoredImage {
            public_url: build_public_url(&filename, &self.public_base),
            filename,
        })
    }

    async fn delete_by_url(&self, url: &str) -> bool {
        let Some(name) = file_name_from_url(url) else {
            warn!(url, "refusing to delete suspicious media url");
            return false;
        };
        match fs::remove_file(self.root.join(name)).await {
            Ok(()) => {
                debug!(file = name, "image removed");
                true
            }
            Err(e) => {
                warn!(file = name, error = %e, "image removal failed");
                false
            }
        }
    }
}

/// Removes a file left behind by a failed write.
async fn discard_partial(path: &Path) -> bool {
    match fs::remove_file(path).await {
        Ok(()) => true,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "partial upload was not removed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn upload(mime: mime::Mime, name: Option<&str>) -> ImageUpload {
        ImageUpload {
            bytes: Bytes::from_static(b"fake image bytes"),
            content_type: mime,
            original_name: name.map(str::to_string),
        }
    }

    #[test]
    fn public_url_with_and_without_base() {
        assert_eq!(build_public_url("a.jpg", ""), "/uploads/photos/a.jpg");
        assert_eq!(
            build_public_url("a.jpg", "https://cdn.example.com/"),
            "https://cdn.example.com/uploads/photos/a.jpg"
        );
    }

    #[test]
    fn filenames_follow_the_pattern() {
        let name = generate_filename(ImageKind::Jpeg, Some("Holiday.JPEG"));
        assert!(name.starts_with("photo_"));
        assert!(name.ends_with(".jpeg"));
        let parts: Vec<&str> = name.trim_end_matches(".jpeg").split('_').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].parse::<i64>().is_ok());
        assert_eq!(parts[2].len(), 8);
        assert!(parts[2].chars().all(|c| c.is_ascii_hexdigit()));

        assert!(generate_filename(ImageKind::Png, Some("evil.php")).ends_with(".png"));
        assert!(generate_filename(ImageKind::Webp, None).ends_with(".webp"));
    }

    #[test]
    fn traversal_urls_are_refused() {
        assert_eq!(file_name_from_url("/uploads/photos/a.jpg"), Some("a.jpg"));
        assert_eq!(
            file_name_from_url("https://x.test/uploads/photos/a.jpg?v=2"),
            Some("a.jpg")
        );
        assert_eq!(file_name_from_url("/uploads/photos/.."), None);
        assert_eq!(file_name_from_url("/uploads/photos/"), None);
        assert_eq!(file_name_from_url("..\\..\\etc"), None);
    }

    #[tokio::test]
    async fn store_then_delete() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path().join("photos"), "").unwrap();

        let stored = storage
            .store(upload(mime::IMAGE_PNG, Some("x.png")))
            .await
            .unwrap();
        let on_disk = storage.root().join(&stored.filename);
        assert_eq!(std::fs::read(&on_disk).unwrap(), b"fake image bytes");
        assert_eq!(stored.public_url, format!("/uploads/photos/{}", stored.filename));

        assert!(storage.delete_by_url(&stored.public_url).await);
        assert!(!on_disk.exists());
        assert!(!storage.delete_by_url(&stored.public_url).await);
    }

    #[tokio::test]
    async fn partial_files_are_discarded() {
        let dir = tempfile::tempdir().unwrap();
        let partial = dir.path().join("photo_partial.png");
        std::fs::write(&partial, b"half").unwrap();

        assert!(discard_partial(&partial).await);
        assert!(!partial.exists());
        assert!(!discard_partial(&partial).await);
    }

    #[tokio::test]
    async fn non_images_are_never_written() {
        let dir = tempfile::tempdir().unwrap();
        let storage = LocalMediaStorage::new(dir.path(), "").unwrap();
        let result = storage.store(upload(mime::TEXT_PLAIN, Some("a.txt"))).await;
        assert!(result.is_err());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
