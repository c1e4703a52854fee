//! An animated photo-wall slideshow engine.
//!
//! The engine fills a large grid of tiles with photos loaded in the
//! background and autoplays randomized pan/zoom/stack transitions across
//! the wall. It owns no window and no renderer: hosts hand it an
//! [`ImageSource`](photo::ImageSource), an
//! [`ImageDecoder`](photo::ImageDecoder), window-size events, and clock
//! ticks, then draw the retained [`stage`] tree however they like.

pub mod catalog;
pub mod config;
pub mod context;
pub mod error;
pub mod layout;
pub mod loader;
pub mod photo;
pub mod slideshow;
pub mod source;
pub mod stage;
pub mod tile;
pub mod transition;

pub use config::SlideshowConfig;
pub use error::{CatalogError, DecodeError};
pub use photo::{DecodedImage, ImageDecoder, ImageSource, Photo, PhotoId};
pub use slideshow::SlideShow;
pub use source::{FolderSource, ImageFileDecoder, SurfaceStore};
pub use transition::TransitionKind;
