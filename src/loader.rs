//! Background photo loading
//!
//! Decodes run on tokio blocking workers; results come back through an mpsc
//! channel that the logical UI thread drains. That keeps every mutation of
//! tiles, histories, and controller state on one thread, no matter how many
//! decodes are in flight.
//!
//! The loader itself imposes no concurrency cap: the layout manager keeps
//! the pipeline bounded by only requesting a new decode after a previous
//! completion has been fully processed.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::error::DecodeError;
use crate::photo::{DecodedImage, ImageDecoder, Photo, PhotoId};

/// One finished decode, successful or not.
#[derive(Debug)]
pub struct LoadCompletion {
    pub photo: PhotoId,
    pub result: Result<DecodedImage, DecodeError>,
}

pub struct PhotoLoader {
    decoder: Arc<dyn ImageDecoder>,
    runtime: tokio::runtime::Handle,
    decode_size: u32,
    tx: mpsc::UnboundedSender<LoadCompletion>,
    rx: mpsc::UnboundedReceiver<LoadCompletion>,
}

impl PhotoLoader {
    pub fn new(
        decoder: Arc<dyn ImageDecoder>,
        runtime: tokio::runtime::Handle,
        decode_size: u32,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            decoder,
            runtime,
            decode_size,
            tx,
            rx,
        }
    }

    /// Kick off a background decode for `photo`. The result arrives later
    /// through [`drain_completions`](Self::drain_completions).
    pub fn request(&self, photo: &Photo) {
        let decoder = Arc::clone(&self.decoder);
        let tx = self.tx.clone();
        let id = photo.id();
        let path = photo.source().to_path_buf();
        let decode_size = self.decode_size;

        log::debug!("decode requested for {}", path.display());

        self.runtime.spawn_blocking(move || {
            let result = decoder.decode(&path, decode_size);
            // The receiver only goes away on shutdown; a send failure then
            // is uninteresting.
            let _ = tx.send(LoadCompletion { photo: id, result });
        });
    }

    /// Collect every completion that has arrived so far, without blocking.
    pub fn drain_completions(&mut self) -> Vec<LoadCompletion> {
        let mut completions = Vec::new();
        while let Ok(completion) = self.rx.try_recv() {
            completions.push(completion);
        }
        completions
    }
}

impl std::fmt::Debug for PhotoLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PhotoLoader")
            .field("decode_size", &self.decode_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::path::PathBuf;
    use std::time::Duration;

    struct FixedDecoder;

    impl ImageDecoder for FixedDecoder {
        fn decode(&self, source: &Path, _decode_size: u32) -> Result<DecodedImage, DecodeError> {
            if source.to_string_lossy().contains("bad") {
                return Err(DecodeError::Malformed {
                    path: source.to_path_buf(),
                    reason: "test".into(),
                });
            }
            Ok(DecodedImage { surface: 7, width: 400, height: 300 })
        }
    }

    async fn drain_until(loader: &mut PhotoLoader, count: usize) -> Vec<LoadCompletion> {
        let mut all = Vec::new();
        for _ in 0..200 {
            all.extend(loader.drain_completions());
            if all.len() >= count {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        all
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_completions_arrive_on_drain() {
        let mut loader = PhotoLoader::new(
            Arc::new(FixedDecoder),
            tokio::runtime::Handle::current(),
            400,
        );

        let good = Photo::new(PhotoId(0), PathBuf::from("ok.jpg"));
        let bad = Photo::new(PhotoId(1), PathBuf::from("bad.jpg"));
        loader.request(&good);
        loader.request(&bad);

        let completions = drain_until(&mut loader, 2).await;
        assert_eq!(completions.len(), 2);

        let ok = completions.iter().find(|c| c.photo == PhotoId(0)).unwrap();
        assert!(ok.result.is_ok());
        let err = completions.iter().find(|c| c.photo == PhotoId(1)).unwrap();
        assert!(err.result.is_err());
    }
}
