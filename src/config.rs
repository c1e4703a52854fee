//! Slideshow configuration
//!
//! All tunable constants for the grid, loading pipeline, and transitions.
//! Values are serialized to JSON so a host can persist and restore its
//! settings. The defaults reproduce the classic layout: a 20x20 wall of
//! 200x150 frames with a 4-deep decode pipeline.

use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct SlideshowConfig {
    // ========== Grid ==========
    /// Number of tile rows in the wall
    pub rows: usize,
    /// Number of tile columns in the wall
    pub columns: usize,
    /// Rows near the top/bottom edge that far-neighbor selection avoids
    /// on its first pass
    pub edge_rows: usize,
    /// Columns near the left/right edge that far-neighbor selection avoids
    /// on its first pass
    pub edge_columns: usize,

    // ========== Tile geometry (pixels) ==========
    /// Width of a picture frame
    pub frame_width: f32,
    /// Height of a picture frame
    pub frame_height: f32,
    /// Spacing between adjacent frames
    pub margin: f32,
    /// Inset between a frame and the photo it holds
    pub border: f32,

    // ========== Loading pipeline ==========
    /// Maximum number of photos enumerated from the image source
    pub max_photos: usize,
    /// Number of decode operations kept in flight at once
    pub concurrent_decodes: usize,
    /// Square decode target for photo surfaces (pixels)
    pub decode_size: u32,

    // ========== Transitions ==========
    /// Scale factor applied by zoom-style transitions
    pub zoom_scale: f32,
    /// Distance from window center (pixels) within which the color
    /// spotlight keeps tiles fully saturated
    pub spotlight_radius: f32,
    /// Far plane for the fake depth-perspective transform on the root
    pub far_plane: f32,

    /// Seed for the random generator; `None` seeds from entropy.
    /// Fix this to make neighbor selection and sequencing reproducible.
    pub seed: Option<u64>,
}

impl Default for SlideshowConfig {
    fn default() -> Self {
        Self {
            rows: 20,
            columns: 20,
            edge_rows: 2,
            edge_columns: 2,
            frame_width: 200.0,
            frame_height: 150.0,
            margin: 20.0,
            border: 10.0,
            max_photos: 250,
            concurrent_decodes: 4,
            decode_size: 400,
            zoom_scale: 3.0,
            spotlight_radius: 300.0,
            far_plane: -400.0,
            seed: None,
        }
    }
}

impl SlideshowConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of tiles in the grid
    pub fn tile_count(&self) -> usize {
        self.rows * self.columns
    }

    /// Convert to JSON string for persistence by the host
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Parse from a JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
