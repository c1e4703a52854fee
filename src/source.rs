//! File-system photo source and decoder
//!
//! Default collaborators for running the slideshow against a folder of
//! images: `FolderSource` walks a directory tree for supported image files,
//! and `ImageFileDecoder` decodes them into RGBA surfaces kept in a shared
//! `SurfaceStore` the host draws from.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use image::imageops::FilterType;
use image::RgbaImage;
use walkdir::WalkDir;

use crate::error::DecodeError;
use crate::photo::{DecodedImage, ImageDecoder, ImageSource};
use crate::stage::SurfaceId;

const SUPPORTED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];

fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|s| ext.eq_ignore_ascii_case(s))
        })
}

/// Enumerates image files under a root folder, recursively.
#[derive(Debug, Clone)]
pub struct FolderSource {
    root: PathBuf,
}

impl FolderSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Quick precheck for hosts that want to prompt the user before
    /// building the whole engine: true when no supported image exists.
    pub fn is_empty(&self) -> bool {
        !WalkDir::new(&self.root)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .any(|entry| entry.file_type().is_file() && is_supported(entry.path()))
    }
}

impl ImageSource for FolderSource {
    fn enumerate(&self, max_count: usize) -> std::io::Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(&self.root) {
            // Unreadable entries are skipped, not fatal.
            let entry = match entry {
                Ok(entry) => entry,
                Err(error) => {
                    log::warn!("skipping unreadable entry: {error}");
                    continue;
                }
            };

            if entry.file_type().is_file() && is_supported(entry.path()) {
                paths.push(entry.path().to_path_buf());
                if paths.len() >= max_count {
                    break;
                }
            }
        }
        Ok(paths)
    }
}

/// Decoded pixel data shared between the decoder workers and the drawing
/// host, keyed by the surface handles the engine binds to visuals.
#[derive(Debug, Clone, Default)]
pub struct SurfaceStore {
    inner: Arc<SurfaceStoreInner>,
}

#[derive(Debug, Default)]
struct SurfaceStoreInner {
    next_id: AtomicU64,
    images: Mutex<HashMap<SurfaceId, Arc<RgbaImage>>>,
}

impl SurfaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, image: RgbaImage) -> SurfaceId {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut images) = self.inner.images.lock() {
            images.insert(id, Arc::new(image));
        }
        id
    }

    pub fn get(&self, id: SurfaceId) -> Option<Arc<RgbaImage>> {
        self.inner
            .images
            .lock()
            .ok()
            .and_then(|images| images.get(&id).cloned())
    }
}

/// Decodes image files with the `image` crate, downscaled to the requested
/// square target, and publishes the pixels into a [`SurfaceStore`].
#[derive(Debug, Clone)]
pub struct ImageFileDecoder {
    store: SurfaceStore,
}

impl ImageFileDecoder {
    pub fn new(store: SurfaceStore) -> Self {
        Self { store }
    }
}

impl ImageDecoder for ImageFileDecoder {
    fn decode(&self, source: &Path, decode_size: u32) -> Result<DecodedImage, DecodeError> {
        let bytes = std::fs::read(source).map_err(|error| DecodeError::Io {
            path: source.to_path_buf(),
            source: error,
        })?;

        let decoded = image::load_from_memory(&bytes).map_err(|error| DecodeError::Malformed {
            path: source.to_path_buf(),
            reason: error.to_string(),
        })?;

        let resized = decoded.resize(decode_size, decode_size, FilterType::Lanczos3);
        let rgba = resized.to_rgba8();
        let (width, height) = (rgba.width(), rgba.height());
        let surface = self.store.register(rgba);

        Ok(DecodedImage {
            surface,
            width,
            height,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_filter() {
        assert!(is_supported(Path::new("a/b/photo.jpg")));
        assert!(is_supported(Path::new("photo.JPEG")));
        assert!(is_supported(Path::new("photo.Png")));
        assert!(!is_supported(Path::new("photo.gif")));
        assert!(!is_supported(Path::new("photo")));
        assert!(!is_supported(Path::new(".jpg/notafile.txt")));
    }

    #[test]
    fn test_surface_store_roundtrip() {
        let store = SurfaceStore::new();

        let a = store.register(RgbaImage::new(4, 4));
        let b = store.register(RgbaImage::new(8, 2));
        assert_ne!(a, b);

        assert_eq!(store.get(a).unwrap().width(), 4);
        assert_eq!(store.get(b).unwrap().height(), 2);
        assert!(store.get(999).is_none());
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let decoder = ImageFileDecoder::new(SurfaceStore::new());
        let result = decoder.decode(Path::new("/nonexistent/zzz.jpg"), 400);
        assert!(matches!(result, Err(DecodeError::Io { .. })));
    }
}
