//! Layout manager
//!
//! Owns the tile grid and the panning container it lives in, coordinates
//! photo loading into the grid, and answers the near/far neighbor queries
//! that transitions use to pick where the view goes next.

use std::collections::VecDeque;
use std::rc::Rc;

use cgmath::{InnerSpace, Matrix4, SquareMatrix, Vector2, Vector3};
use rand::rngs::StdRng;
use rand::Rng;

use crate::catalog::PhotoCatalog;
use crate::config::SlideshowConfig;
use crate::context::SlideshowContext;
use crate::loader::{LoadCompletion, PhotoLoader};
use crate::photo::Photo;
use crate::stage::{BatchId, Stage, VisualId};
use crate::tile::Tile;

/// Anti-repeat history caps. The near history is tiny because corner tiles
/// have very few neighbors to choose from.
const NEAR_HISTORY_CAP: usize = 2;
const FAR_HISTORY_CAP: usize = 10;

/// Retry caps for neighbor selection. Bounded on purpose: selection
/// falls back to the current tile rather than spinning forever on grids
/// where no valid choice exists.
const HISTORY_RETRIES: usize = 20;
const NEAR_PICK_RETRIES: usize = 20;
const FAR_PICK_SAMPLES: usize = 100;

/// Minimum squared grid distance for a "far" neighbor (3 tiles).
const FAR_MIN_DISTANCE_SQUARED: i64 = 9;

#[derive(Debug)]
pub struct LayoutManager {
    rows: usize,
    columns: usize,
    edge_rows: usize,
    edge_columns: usize,
    concurrent_decodes: usize,
    far_plane: f32,

    tiles: Vec<Tile>,
    current_tile_index: usize,
    empty_tile_count: usize,
    near_history: VecDeque<usize>,
    far_history: VecDeque<usize>,

    catalog: PhotoCatalog,

    root: VisualId,
    panning: VisualId,
}

impl LayoutManager {
    /// Build the grid inside `root`: a panning container holding rows x
    /// columns of tiles on an evenly spaced raster, with the middle tile
    /// designated as current.
    pub fn create(
        stage: &mut Stage,
        ctx: &mut SlideshowContext,
        root: VisualId,
        catalog: PhotoCatalog,
        config: &SlideshowConfig,
    ) -> Self {
        let panning = stage.create_visual();
        stage.insert_at_top(root, panning);

        let mut tiles = Vec::with_capacity(config.tile_count());
        for row in 0..config.rows {
            for col in 0..config.columns {
                let mut tile = Tile::new(stage, ctx, panning, row, col, config.border);

                tile.set_size(stage, Vector2::new(config.frame_width, config.frame_height));
                tile.set_offset(
                    stage,
                    Vector3::new(
                        col as f32 * (config.frame_width + config.margin),
                        row as f32 * (config.frame_height + config.margin),
                        0.0,
                    ),
                );
                tile.set_visible(stage, true);

                tiles.push(tile);
            }
        }

        let empty_tile_count = tiles.len();

        stage.visual_mut(panning).size = Vector2::new(
            config.columns as f32 * (config.frame_width + config.margin + 2.0 * config.border)
                - config.margin,
            config.rows as f32 * (config.frame_height + config.margin + 2.0 * config.border)
                - config.margin,
        );

        // Start in the middle of the wall.
        let current_tile_index = config.rows / 2 * config.columns + config.columns / 2;

        Self {
            rows: config.rows,
            columns: config.columns,
            edge_rows: config.edge_rows,
            edge_columns: config.edge_columns,
            concurrent_decodes: config.concurrent_decodes,
            far_plane: config.far_plane,
            tiles,
            current_tile_index,
            empty_tile_count,
            near_history: VecDeque::with_capacity(NEAR_HISTORY_CAP),
            far_history: VecDeque::with_capacity(FAR_HISTORY_CAP),
            catalog,
            root,
            panning,
        }
    }

    // ========== Accessors ==========

    pub fn tiles(&self) -> &[Tile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [Tile] {
        &mut self.tiles
    }

    pub fn tile(&self, index: usize) -> &Tile {
        &self.tiles[index]
    }

    /// The panning container every tile frame lives in.
    pub fn grid_visual(&self) -> VisualId {
        self.panning
    }

    pub fn current_index(&self) -> usize {
        self.current_tile_index
    }

    pub fn current_tile(&self) -> &Tile {
        &self.tiles[self.current_tile_index]
    }

    /// Reposition the view's focus. Mostly useful for hosts and tests that
    /// want a known starting point.
    pub fn set_current_tile(&mut self, row: usize, col: usize) {
        debug_assert!(row < self.rows && col < self.columns);
        self.current_tile_index = row * self.columns + col;
    }

    /// Grid cells still waiting for a successfully loaded photo.
    pub fn empty_tile_count(&self) -> usize {
        self.empty_tile_count
    }

    #[cfg(test)]
    pub(crate) fn near_history_len(&self) -> usize {
        self.near_history.len()
    }

    #[cfg(test)]
    pub(crate) fn far_history_len(&self) -> usize {
        self.far_history.len()
    }

    // ========== Window ==========

    /// Resize the root container and refresh the fake depth perspective,
    /// which makes larger z-distances shrink toward the window center.
    pub fn update_window_size(&mut self, stage: &mut Stage, size: Vector2<f32>) {
        debug_assert!(size.x > 0.0 && size.y > 0.0, "window must have positive size");

        stage.set_window_size(size);
        stage.visual_mut(self.root).size = size;

        let to_center = Matrix4::from_translation(Vector3::new(-size.x / 2.0, -size.y / 2.0, 0.0));
        let mut shrink = Matrix4::identity();
        shrink[2][3] = 1.0 / self.far_plane;
        let from_center = Matrix4::from_translation(Vector3::new(size.x / 2.0, size.y / 2.0, 0.0));

        stage.visual_mut(self.root).transform = from_center * shrink * to_center;
    }

    // ========== Photo loading ==========

    /// Prime the decode pipeline: a fixed number of loads are put in flight
    /// and each completion replenishes exactly one, so at most
    /// `concurrent_decodes` decodes are ever outstanding.
    pub fn start_loading(&mut self, stage: &mut Stage, loader: &PhotoLoader) {
        for _ in 0..self.concurrent_decodes {
            self.load_next_photo(stage, loader);
        }
    }

    /// Pull the next catalog photo and start decoding it. Photos the
    /// catalog has already decoded (cursor wrapped) are placed immediately
    /// and the pull continues until something actually needs decoding.
    pub fn load_next_photo(&mut self, stage: &mut Stage, loader: &PhotoLoader) {
        loop {
            let Some(photo) = self.catalog.next_photo() else {
                return;
            };

            if photo.image().is_some() {
                self.place_photo(stage, photo);
                if self.empty_tile_count == 0 {
                    return;
                }
                continue;
            }

            loader.request(&photo);
            return;
        }
    }

    /// Handle one decode completion on the logical thread. Failed decodes
    /// leave their slot empty and do not touch the counter; either way the
    /// pipeline replenishes one load if tiles still need photos.
    pub fn process_completion(
        &mut self,
        stage: &mut Stage,
        loader: &PhotoLoader,
        completion: LoadCompletion,
    ) {
        match completion.result {
            Ok(image) => {
                if let Some(photo) = self.catalog.photo(completion.photo) {
                    photo.attach_image(image);
                    self.place_photo(stage, photo);
                }
            }
            Err(error) => {
                log::warn!("photo decode failed, leaving tile empty: {error}");
            }
        }

        if self.empty_tile_count > 0 {
            self.load_next_photo(stage, loader);
        }
    }

    /// Assign an arrived photo to the current tile if it is still empty,
    /// otherwise to the nearest empty tile. With no empty tile left the
    /// photo is quietly dropped.
    fn place_photo(&mut self, stage: &mut Stage, photo: Rc<Photo>) {
        let target = if !self.tiles[self.current_tile_index].has_photo() {
            Some(self.current_tile_index)
        } else {
            self.find_nearest_empty(self.current_tile_index)
        };

        if let Some(index) = target {
            debug_assert!(!self.tiles[index].has_photo());
            self.tiles[index].set_photo(stage, photo);
            self.empty_tile_count -= 1;

            if self.empty_tile_count == 0 {
                log::info!("all tiles filled");
            }
        }
    }

    /// Closest photo-less tile to `center_index`, by center-to-center
    /// distance.
    fn find_nearest_empty(&self, center_index: usize) -> Option<usize> {
        let center = self.tiles[center_index].center();

        let mut found = None;
        let mut best = f32::MAX;
        for (index, candidate) in self.tiles.iter().enumerate() {
            if index == center_index || candidate.has_photo() {
                continue;
            }

            let distance = (candidate.center() - center).magnitude();
            if distance < best {
                best = distance;
                found = Some(index);
            }
        }

        found
    }

    // ========== Neighbor selection ==========

    /// Choose a tile one step up/down/left/right of the current tile,
    /// avoiding the most recent picks. Updates the current index.
    pub fn get_near_neighbor(&mut self, rng: &mut StdRng) -> usize {
        let mut retries = HISTORY_RETRIES;
        let chosen = loop {
            let saved = self.current_tile_index;
            let candidate = self.pick_near_neighbor(rng);

            if retries == 0 {
                break candidate;
            }
            retries -= 1;

            if self.near_history.contains(&candidate) {
                // Rejected: restore the focus and try again.
                self.current_tile_index = saved;
                continue;
            }

            break candidate;
        };

        push_history(&mut self.near_history, NEAR_HISTORY_CAP, chosen);
        chosen
    }

    /// Choose a tile at least three grid units away, avoiding recent picks.
    /// Updates the current index.
    pub fn get_far_neighbor(&mut self, rng: &mut StdRng) -> usize {
        let mut retries = HISTORY_RETRIES;
        let chosen = loop {
            let saved = self.current_tile_index;
            let candidate = self.pick_far_neighbor(rng);

            if retries == 0 {
                break candidate;
            }
            retries -= 1;

            if self.far_history.contains(&candidate) {
                self.current_tile_index = saved;
                continue;
            }

            break candidate;
        };

        push_history(&mut self.far_history, FAR_HISTORY_CAP, chosen);
        chosen
    }

    /// Far-neighbor selection for callers that need to reference a far tile
    /// without moving the view there (stack transitions).
    pub fn get_far_neighbor_preserve_selection(&mut self, rng: &mut StdRng) -> usize {
        let saved = self.current_tile_index;
        let chosen = self.get_far_neighbor(rng);
        self.current_tile_index = saved;
        chosen
    }

    fn pick_near_neighbor(&mut self, rng: &mut StdRng) -> usize {
        let cur_row = (self.current_tile_index / self.columns) as i64;
        let cur_col = (self.current_tile_index % self.columns) as i64;

        let mut near_row = cur_row;
        let mut near_col = cur_col;
        let mut found = false;

        for _ in 0..NEAR_PICK_RETRIES {
            near_row = cur_row + rng.random_range(0..3) - 1;
            near_col = cur_col + rng.random_range(0..3) - 1;

            if near_row != cur_row && near_col != cur_col {
                // Horizontal / vertical steps only, no diagonals.
                if rng.random_range(0..2) == 0 {
                    near_row = cur_row;
                } else {
                    near_col = cur_col;
                }
            }

            if near_row >= 0
                && near_row < self.rows as i64
                && near_col >= 0
                && near_col < self.columns as i64
                && (near_row != cur_row || near_col != cur_col)
            {
                found = true;
                break;
            }
        }

        if !found {
            near_row = cur_row;
            near_col = cur_col;
        }

        self.current_tile_index = (near_row * self.columns as i64 + near_col) as usize;
        self.current_tile_index
    }

    fn pick_far_neighbor(&mut self, rng: &mut StdRng) -> usize {
        let cur_row = (self.current_tile_index / self.columns) as i64;
        let cur_col = (self.current_tile_index % self.columns) as i64;

        // Search for a far tile that ideally has a photo already loaded.
        // Pass 0 also avoids the outer edge of the grid; pass 1 drops that
        // restriction. Early on nothing is loaded yet, so the search may
        // well run every iteration of both passes - the sample cap keeps that
        // bounded.
        let mut new_tile_index = None;

        'passes: for pass in 0..2 {
            for _ in 0..FAR_PICK_SAMPLES {
                let far_row = rng.random_range(0..self.rows) as i64;
                let far_col = rng.random_range(0..self.columns) as i64;

                if pass == 0 {
                    if far_col < self.edge_columns as i64
                        || far_col >= (self.columns - self.edge_columns) as i64
                    {
                        continue;
                    }
                    if far_row < self.edge_rows as i64
                        || far_row >= (self.rows - self.edge_rows) as i64
                    {
                        continue;
                    }
                }

                let distance_squared = (far_row - cur_row) * (far_row - cur_row)
                    + (far_col - cur_col) * (far_col - cur_col);

                if distance_squared >= FAR_MIN_DISTANCE_SQUARED {
                    let index = (far_row * self.columns as i64 + far_col) as usize;
                    new_tile_index = Some(index);

                    if self.tiles[index].has_photo() {
                        break 'passes;
                    }
                }
            }
        }

        // Fall back to the current tile when the search found nothing at
        // all (grid too small for the minimum distance).
        match new_tile_index {
            Some(index) => {
                self.current_tile_index = index;
                index
            }
            None => self.current_tile_index,
        }
    }

    // ========== Batch routing ==========

    /// Offer a completed batch to the tiles (idle-wobble renewal). Returns
    /// true when a tile claimed it.
    pub fn handle_batch_completed(
        &mut self,
        stage: &mut Stage,
        ctx: &mut SlideshowContext,
        batch: BatchId,
    ) -> bool {
        for tile in &mut self.tiles {
            if tile.handle_batch_completed(stage, ctx, batch) {
                return true;
            }
        }
        false
    }
}

fn push_history(history: &mut VecDeque<usize>, cap: usize, value: usize) {
    if history.len() == cap {
        history.pop_front();
    }
    history.push_back(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::photo::{DecodedImage, ImageSource};
    use std::path::PathBuf;

    struct ListSource(usize);

    impl ImageSource for ListSource {
        fn enumerate(&self, max_count: usize) -> std::io::Result<Vec<PathBuf>> {
            Ok((0..self.0.min(max_count))
                .map(|i| PathBuf::from(format!("photo_{i}.jpg")))
                .collect())
        }
    }

    fn fixture(rows: usize, columns: usize, photos: usize) -> (Stage, SlideshowContext, LayoutManager) {
        let mut stage = Stage::new();
        let mut ctx = SlideshowContext::new(Some(1234));
        let root = stage.create_visual();

        let catalog = PhotoCatalog::build(&ListSource(photos), 250, &mut ctx.rng).unwrap();

        let config = SlideshowConfig {
            rows,
            columns,
            ..SlideshowConfig::default()
        };
        let layout = LayoutManager::create(&mut stage, &mut ctx, root, catalog, &config);
        (stage, ctx, layout)
    }

    fn decoded(surface: u64) -> DecodedImage {
        DecodedImage { surface, width: 400, height: 300 }
    }

    #[test]
    fn test_grid_starts_at_middle() {
        let (_stage, _ctx, layout) = fixture(10, 10, 5);
        assert_eq!(layout.current_index(), 55);
        assert_eq!(layout.tiles().len(), 100);
        assert_eq!(layout.empty_tile_count(), 100);
    }

    #[test]
    fn test_near_neighbor_is_adjacent_non_diagonal() {
        let (_stage, mut ctx, mut layout) = fixture(10, 10, 5);

        for _ in 0..200 {
            let before = layout.current_index();
            let chosen = layout.get_near_neighbor(&mut ctx.rng);
            assert_eq!(chosen, layout.current_index());

            let (r0, c0) = (before / 10, before % 10);
            let (r1, c1) = (chosen / 10, chosen % 10);
            let dr = r0.abs_diff(r1);
            let dc = c0.abs_diff(c1);
            assert!(dr <= 1 && dc <= 1, "more than one step away");
            assert!(dr == 0 || dc == 0, "diagonal step");
        }
    }

    #[test]
    fn test_near_neighbor_trapped_grid_stays_put() {
        // A 1x1 grid has no neighbor at all; selection must fall back to
        // the current tile instead of looping forever.
        let (_stage, mut ctx, mut layout) = fixture(1, 1, 2);
        assert_eq!(layout.get_near_neighbor(&mut ctx.rng), 0);
    }

    #[test]
    fn test_far_neighbor_minimum_distance() {
        let (_stage, mut ctx, mut layout) = fixture(10, 10, 5);

        for _ in 0..100 {
            let before = layout.current_index();
            let chosen = layout.get_far_neighbor(&mut ctx.rng);

            let (r0, c0) = ((before / 10) as i64, (before % 10) as i64);
            let (r1, c1) = ((chosen / 10) as i64, (chosen % 10) as i64);
            let d2 = (r1 - r0) * (r1 - r0) + (c1 - c0) * (c1 - c0);
            assert!(d2 >= 9, "far neighbor too close: d2={d2}");
        }
    }

    #[test]
    fn test_far_neighbor_small_grid_falls_back() {
        // 2x2 grid: max squared distance is 2, below the minimum of 9.
        let (_stage, mut ctx, mut layout) = fixture(2, 2, 2);
        let before = layout.current_index();
        assert_eq!(layout.get_far_neighbor(&mut ctx.rng), before);
    }

    #[test]
    fn test_history_caps() {
        let (_stage, mut ctx, mut layout) = fixture(12, 12, 5);

        for _ in 0..40 {
            layout.get_near_neighbor(&mut ctx.rng);
            layout.get_far_neighbor(&mut ctx.rng);
        }

        assert!(layout.near_history_len() <= NEAR_HISTORY_CAP);
        assert!(layout.far_history_len() <= FAR_HISTORY_CAP);
        assert_eq!(layout.far_history_len(), FAR_HISTORY_CAP);
    }

    #[test]
    fn test_far_history_avoids_recent_picks() {
        let (_stage, mut ctx, mut layout) = fixture(20, 20, 5);

        let mut recent: VecDeque<usize> = VecDeque::new();
        for _ in 0..60 {
            let chosen = layout.get_far_neighbor(&mut ctx.rng);
            assert!(
                !recent.contains(&chosen),
                "picked a tile still in the far history"
            );
            if recent.len() == FAR_HISTORY_CAP {
                recent.pop_front();
            }
            recent.push_back(chosen);
        }
    }

    #[test]
    fn test_preserve_selection_restores_current() {
        let (_stage, mut ctx, mut layout) = fixture(10, 10, 5);
        let before = layout.current_index();

        let chosen = layout.get_far_neighbor_preserve_selection(&mut ctx.rng);
        assert_ne!(chosen, before);
        assert_eq!(layout.current_index(), before);
    }

    #[test]
    fn test_placement_prefers_current_then_nearest() {
        let (mut stage, mut ctx, mut layout) = fixture(5, 5, 10);

        let first = layout.catalog.next_photo().unwrap();
        first.attach_image(decoded(1));
        layout.place_photo(&mut stage, first);
        assert!(layout.current_tile().has_photo());
        assert_eq!(layout.empty_tile_count(), 24);

        // Second photo lands on one of the four orthogonal neighbors of the
        // middle tile (all at equal, minimal distance).
        let second = layout.catalog.next_photo().unwrap();
        second.attach_image(decoded(2));
        layout.place_photo(&mut stage, second);

        let current = layout.current_index();
        let neighbors = [current - 1, current + 1, current - 5, current + 5];
        let placed: Vec<usize> = (0..25).filter(|&i| layout.tile(i).has_photo()).collect();
        assert_eq!(placed.len(), 2);
        assert!(placed.iter().any(|i| neighbors.contains(i)));

        let _ = ctx;
    }

    #[test]
    fn test_full_grid_drops_photo() {
        let (mut stage, mut ctx, mut layout) = fixture(2, 2, 10);

        for i in 0..4 {
            let photo = layout.catalog.next_photo().unwrap();
            photo.attach_image(decoded(i));
            layout.place_photo(&mut stage, photo);
        }
        assert_eq!(layout.empty_tile_count(), 0);

        // A fifth arrival has nowhere to go and is dropped without error.
        let extra = layout.catalog.next_photo().unwrap();
        extra.attach_image(decoded(99));
        layout.place_photo(&mut stage, extra);
        assert_eq!(layout.empty_tile_count(), 0);

        let _ = ctx;
    }

    #[test]
    fn test_update_window_size_sets_perspective() {
        let (mut stage, _ctx, mut layout) = fixture(4, 4, 2);

        layout.update_window_size(&mut stage, Vector2::new(1280.0, 800.0));

        assert_eq!(stage.window_size(), Vector2::new(1280.0, 800.0));
        let transform = stage.visual(layout.root).transform;
        assert!((transform[2][3] - 1.0 / layout.far_plane).abs() < 1e-6);
    }
}
