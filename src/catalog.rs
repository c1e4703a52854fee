//! Photo catalog
//!
//! Owns the master list of photos and hands them out in a randomized but
//! exhaustive order: the list is shuffled once at build time and a cursor
//! walks it round-robin. This avoids the duplicate-heavy draw that repeated
//! independent random picks would produce.

use std::collections::HashSet;
use std::rc::Rc;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use crate::error::CatalogError;
use crate::photo::{ImageSource, Photo, PhotoId};

#[derive(Debug)]
pub struct PhotoCatalog {
    photos: Vec<Rc<Photo>>,
    cursor: usize,
}

impl PhotoCatalog {
    /// Enumerate up to `max_count` image identifiers from `source`,
    /// deduplicate them, and build a shuffled catalog.
    ///
    /// Fails with [`CatalogError::NoPhotosFound`] when the source yields
    /// nothing usable.
    pub fn build(
        source: &dyn ImageSource,
        max_count: usize,
        rng: &mut StdRng,
    ) -> Result<Self, CatalogError> {
        let paths = source.enumerate(max_count)?;

        // Ensure each identity appears only once, keeping first occurrence.
        let mut seen = HashSet::new();
        let mut photos: Vec<Rc<Photo>> = Vec::with_capacity(paths.len());
        for path in paths {
            if photos.len() >= max_count {
                break;
            }
            if seen.insert(path.clone()) {
                let id = PhotoId(photos.len() as u32);
                photos.push(Photo::new(id, path));
            }
        }

        if photos.is_empty() {
            return Err(CatalogError::NoPhotosFound);
        }

        // Shuffle once up front so the round-robin draw is exhaustive and
        // unbiased.
        photos.shuffle(rng);

        log::info!("catalog built with {} photos", photos.len());

        Ok(Self { photos, cursor: 0 })
    }

    pub fn len(&self) -> usize {
        self.photos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.photos.is_empty()
    }

    /// The photo at the cursor; advances with wraparound. Returns `None`
    /// only for an empty catalog, which `build` prevents.
    pub fn next_photo(&mut self) -> Option<Rc<Photo>> {
        if self.photos.is_empty() {
            return None;
        }

        let photo = Rc::clone(&self.photos[self.cursor]);
        self.cursor += 1;
        if self.cursor >= self.photos.len() {
            self.cursor = 0;
        }

        Some(photo)
    }

    /// Look up a photo by its stable id.
    pub fn photo(&self, id: PhotoId) -> Option<Rc<Photo>> {
        self.photos.iter().find(|p| p.id() == id).map(Rc::clone)
    }
}
