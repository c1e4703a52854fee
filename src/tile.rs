//! Tiles
//!
//! A tile is one grid cell of the wall: a picture frame visual, a selection
//! highlight underneath it, and (once a photo arrives) a content visual
//! carrying the photo surface. Tiles are created and positioned by the
//! layout manager and never reparented.

use std::rc::Rc;
use std::time::Duration;

use cgmath::{Vector2, Vector3};
use rand::Rng;

use crate::context::{CommonAnimations, SlideshowContext, NORMAL_TIME};
use crate::photo::Photo;
use crate::stage::{Animation, BatchId, Brush, Color, Property, Stage, VisualId};

/// Largest idle-wobble tilt, in degrees either way.
const MAX_WOBBLE_DEGREES: f32 = 10.0;

/// Idle-wobble duration range, milliseconds.
const WOBBLE_TIME_MS: std::ops::Range<u64> = 2000..5000;

#[derive(Debug)]
pub struct Tile {
    row: usize,
    col: usize,

    offset: Vector3<f32>,
    size: Vector2<f32>,
    border: f32,

    photo: Option<Rc<Photo>>,
    selected: bool,
    visible: bool,
    desaturated: bool,

    parent: VisualId,
    frame: VisualId,
    selected_frame: VisualId,
    content: Option<VisualId>,

    rotation_batch: Option<BatchId>,
    rotate_animating: bool,
}

impl Tile {
    pub fn new(
        stage: &mut Stage,
        ctx: &mut SlideshowContext,
        parent: VisualId,
        row: usize,
        col: usize,
        border: f32,
    ) -> Self {
        // The frame is not parented yet: the layout manager sets offset and
        // size first, then flips visibility, so nothing animates before the
        // tile is actually on screen.
        let frame = stage.create_visual();
        stage.visual_mut(frame).brush = Brush::Solid(Color::WHITE);

        // Selection highlight, faded in behind the photo when selected.
        let selected_frame = stage.create_visual();
        stage.visual_mut(selected_frame).brush = Brush::Solid(Color::ORANGE);
        stage.visual_mut(selected_frame).opacity = 0.0;
        stage.insert_at_bottom(frame, selected_frame);

        let mut tile = Self {
            row,
            col,
            offset: Vector3::new(0.0, 0.0, 0.0),
            size: Vector2::new(0.0, 0.0),
            border,
            photo: None,
            selected: false,
            visible: false,
            desaturated: false,
            parent,
            frame,
            selected_frame,
            content: None,
            rotation_batch: None,
            rotate_animating: false,
        };

        tile.start_rotation(stage, ctx);
        tile
    }

    pub fn grid_row(&self) -> usize {
        self.row
    }

    pub fn grid_column(&self) -> usize {
        self.col
    }

    pub fn frame(&self) -> VisualId {
        self.frame
    }

    /// Logical (resting) offset. During transitions the visual may be
    /// animated elsewhere, but neighbor math always uses this value.
    pub fn offset(&self) -> Vector3<f32> {
        self.offset
    }

    pub fn size(&self) -> Vector2<f32> {
        self.size
    }

    /// Center of the tile in grid coordinates, for nearest-empty searches.
    pub fn center(&self) -> Vector2<f32> {
        Vector2::new(
            self.offset.x + self.size.x / 2.0,
            self.offset.y + self.size.y / 2.0,
        )
    }

    pub fn set_offset(&mut self, stage: &mut Stage, value: Vector3<f32>) {
        if self.offset == value {
            return;
        }
        self.offset = value;

        if self.visible {
            // Animate visible tiles to their new resting place.
            let animation = Animation::new(NORMAL_TIME).key_vector(1.0, value);
            stage.start_animation(self.frame, Property::Offset, animation);
        } else {
            // Hidden tiles jump straight there; animating would make the
            // first reveal glide in from nowhere.
            stage.visual_mut(self.frame).offset = value;
        }
    }

    pub fn set_size(&mut self, stage: &mut Stage, value: Vector2<f32>) {
        self.size = value;

        let frame = stage.visual_mut(self.frame);
        frame.size = value;
        frame.center_point = Vector3::new(value.x / 2.0, value.y / 2.0, 0.0);

        stage.visual_mut(self.selected_frame).size = value;

        if let Some(content) = self.content {
            stage.visual_mut(content).size = self.content_size();
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn set_visible(&mut self, stage: &mut Stage, value: bool) {
        if self.visible == value {
            return;
        }
        self.visible = value;

        if value {
            stage.insert_at_top(self.parent, self.frame);
        } else {
            stage.remove_child(self.parent, self.frame);
        }
    }

    pub fn is_selected(&self) -> bool {
        self.selected
    }

    pub fn set_selected(&mut self, stage: &mut Stage, animations: &CommonAnimations, value: bool) {
        if self.selected == value {
            return;
        }
        self.selected = value;

        let template = if value {
            animations.normal_on.clone()
        } else {
            animations.slow_off.clone()
        };
        stage.start_animation(self.selected_frame, Property::Opacity, template);
    }

    pub fn is_desaturated(&self) -> bool {
        self.desaturated
    }

    pub fn set_desaturated(&mut self, value: bool) {
        self.desaturated = value;
    }

    pub fn photo(&self) -> Option<&Rc<Photo>> {
        self.photo.as_ref()
    }

    pub fn has_photo(&self) -> bool {
        self.photo.is_some()
    }

    /// Content visual holding the photo surface, if a photo is bound.
    pub fn content(&self) -> Option<VisualId> {
        self.content
    }

    /// Bind a photo to this tile, creating the content visual inside the
    /// frame's border inset.
    pub fn set_photo(&mut self, stage: &mut Stage, photo: Rc<Photo>) {
        debug_assert!(self.photo.is_none(), "tile photo is set at most once until cleared");

        let image = photo.image().expect("photo must be decoded before binding");

        let content = stage.create_visual();
        let visual = stage.visual_mut(content);
        visual.brush = Brush::Surface(image.surface);
        visual.offset = Vector3::new(self.border, self.border, 0.0);
        visual.size = self.content_size();
        visual.saturation = if self.desaturated { 0.0 } else { 1.0 };
        stage.insert_at_top(self.frame, content);

        self.content = Some(content);
        self.photo = Some(photo);
    }

    pub fn bring_to_top(&self, stage: &mut Stage) {
        stage.bring_to_top(self.frame);
    }

    /// Drive the content's saturation with a template or spotlight-produced
    /// animation. Tiles without a photo have nothing to desaturate.
    pub fn apply_desaturation_animation(&self, stage: &mut Stage, animation: Animation) {
        if let Some(content) = self.content {
            stage.start_animation(content, Property::Saturation, animation);
        }
    }

    fn content_size(&self) -> Vector2<f32> {
        Vector2::new(
            self.size.x - 2.0 * self.border,
            self.size.y - 2.0 * self.border,
        )
    }

    /// Begin one leg of the idle wobble: a random tilt over a random
    /// duration. The completion of its batch triggers the next leg.
    fn start_rotation(&mut self, stage: &mut Stage, ctx: &mut SlideshowContext) {
        debug_assert!(
            !self.rotate_animating,
            "must not start a new rotation while one is in flight"
        );

        let degrees = ctx.rng.random::<f32>() * (2.0 * MAX_WOBBLE_DEGREES) - MAX_WOBBLE_DEGREES;
        let radians = degrees.to_radians();
        let millis = ctx.rng.random_range(WOBBLE_TIME_MS);

        let animation = Animation::new(Duration::from_millis(millis)).key_scalar(1.0, radians);

        let batch = stage.begin_batch();
        stage.start_animation(self.frame, Property::RotationAngle, animation);
        stage.end_batch(batch);

        self.rotation_batch = Some(batch);
        self.rotate_animating = true;
    }

    /// Route a completed batch to this tile. Returns true when the batch was
    /// this tile's rotation leg (and the next leg has been started).
    pub fn handle_batch_completed(
        &mut self,
        stage: &mut Stage,
        ctx: &mut SlideshowContext,
        batch: BatchId,
    ) -> bool {
        if self.rotation_batch != Some(batch) {
            return false;
        }

        debug_assert!(self.rotate_animating);
        self.rotate_animating = false;
        self.start_rotation(stage, ctx);
        true
    }
}
