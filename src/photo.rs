//! Photos and the collaborator traits that supply them
//!
//! A `Photo` is an identity (its path) plus an image surface that is
//! attached once the background decode finishes. Photos are owned by the
//! catalog and shared read-only with whichever tile displays them; the whole
//! engine runs on one logical thread, so `Rc` is the right sharing tool.

use std::cell::OnceCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crate::error::DecodeError;
use crate::stage::SurfaceId;

/// Stable identity of a photo inside its catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PhotoId(pub u32);

/// A decoded, displayable image surface. The pixel data itself lives with
/// the host; the engine only ever binds the handle to a visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedImage {
    pub surface: SurfaceId,
    pub width: u32,
    pub height: u32,
}

#[derive(Debug)]
pub struct Photo {
    id: PhotoId,
    source: PathBuf,
    image: OnceCell<DecodedImage>,
}

impl Photo {
    pub fn new(id: PhotoId, source: PathBuf) -> Rc<Self> {
        Rc::new(Self {
            id,
            source,
            image: OnceCell::new(),
        })
    }

    pub fn id(&self) -> PhotoId {
        self.id
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The decoded surface, if the decode has completed.
    pub fn image(&self) -> Option<DecodedImage> {
        self.image.get().copied()
    }

    /// Attach the decode result. Set-at-most-once: a photo can come around
    /// again once the catalog cursor wraps, and the first surface wins.
    pub fn attach_image(&self, image: DecodedImage) {
        let _ = self.image.set(image);
    }
}

/// Enumerates candidate image identifiers, up to a maximum count.
///
/// The engine treats the returned paths as opaque identities; it never
/// interprets them beyond equality.
pub trait ImageSource {
    fn enumerate(&self, max_count: usize) -> std::io::Result<Vec<PathBuf>>;
}

/// Decodes one image identifier into a displayable surface.
///
/// Implementations run on background worker threads (the loader wraps calls
/// in `spawn_blocking`), so they must be `Send + Sync`. `decode_size` is a
/// square target edge; implementations may decode smaller but should not
/// decode dramatically larger.
pub trait ImageDecoder: Send + Sync {
    fn decode(&self, source: &Path, decode_size: u32) -> Result<DecodedImage, DecodeError>;
}
