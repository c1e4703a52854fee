//! Transition library
//!
//! Builds the animated property changes that make up each transition, given
//! a target tile and the current window geometry. Slides and zooms move the
//! panning container so the target ends up centered in the viewport; stack
//! and unstack fly individual tiles toward and away from a focal point.

use std::time::Duration;

use cgmath::{InnerSpace, Vector2, Vector3};
use rand::rngs::StdRng;
use rand::Rng;

use crate::config::SlideshowConfig;
use crate::context::CommonAnimations;
use crate::layout::LayoutManager;
use crate::stage::{Animation, Easing, Expression, KeyFrameValue, Property, Stage, VisualId};
use crate::tile::Tile;
use crate::transition::DesaturationMode;

const NEAR_SLIDE_TIME: Duration = Duration::from_secs(4);
const FAR_SLIDE_TIME: Duration = Duration::from_secs(8);
const ZOOM_TIME: Duration = Duration::from_secs(12);
const STACK_FLY_TIME: Duration = Duration::from_secs(2);
const STACK_SCALE_TIME: Duration = Duration::from_secs(6);

/// Per-tile stagger between stack fly-ins.
const STACK_STAGGER: Duration = Duration::from_secs(2);

/// Base delay before the first unstack fly-out, plus per-tile countdown step.
const UNSTACK_BASE_DELAY_MS: u64 = 1500;
const UNSTACK_STEP_MS: u64 = 100;

/// Tiles flown in by the current stack, in fly-in order, plus the focal
/// offset they converged on. Present only between a stack and its unstack.
#[derive(Debug)]
struct StackState {
    tiles: Vec<usize>,
    center: Vector3<f32>,
}

#[derive(Debug)]
pub struct TransitionLibrary {
    grid: VisualId,
    zoom_scale: f32,
    spotlight_radius: f32,
    stack: Option<StackState>,
}

impl TransitionLibrary {
    pub fn new(grid: VisualId, config: &SlideshowConfig) -> Self {
        Self {
            grid,
            zoom_scale: config.zoom_scale,
            spotlight_radius: config.spotlight_radius,
            stack: None,
        }
    }

    /// True between a stack fly-in and the matching unstack.
    pub fn is_stacked(&self) -> bool {
        self.stack.is_some()
    }

    /// Target tile center, scale pivot, and the panning offset that puts the
    /// target at the viewport center.
    fn target_values(
        &self,
        stage: &Stage,
        target: &Tile,
    ) -> (Vector3<f32>, Vector3<f32>, Vector3<f32>) {
        let offset = stage.visual(target.frame()).offset;
        let size = target.size();
        let window = stage.window_size();

        let target_center = Vector3::new(
            offset.x + size.x / 2.0,
            offset.y + size.y / 2.0,
            offset.z,
        );
        let target_center_point = Vector3::new(target_center.x, target_center.y, 0.0);
        let viewport_center = Vector3::new(
            target_center.x - window.x / 2.0,
            target_center.y - window.y / 2.0,
            target_center.z,
        );

        (target_center, target_center_point, viewport_center)
    }

    fn zoom_scale_vector(&self) -> Vector3<f32> {
        Vector3::new(self.zoom_scale, self.zoom_scale, 1.0)
    }

    /// Fast pan to the target with a scale pulse.
    pub fn create_near_slide(&mut self, stage: &mut Stage, target: &Tile) {
        let (_, center_point, viewport_center) = self.target_values(stage, target);

        stage.start_animation(
            self.grid,
            Property::Offset,
            Animation::new(NEAR_SLIDE_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key_vector(1.0, -viewport_center),
        );
        stage.start_animation(
            self.grid,
            Property::CenterPoint,
            Animation::new(NEAR_SLIDE_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key_vector(1.0, center_point),
        );
        stage.start_animation(
            self.grid,
            Property::Scale,
            Animation::new(NEAR_SLIDE_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key_vector(1.0, self.zoom_scale_vector()),
        );
    }

    /// Slow pan to a distant target, parked at the destination from 90% on,
    /// with a scale pulse that settles back to 1 early.
    pub fn create_far_slide(&mut self, stage: &mut Stage, target: &Tile) {
        let (_, center_point, viewport_center) = self.target_values(stage, target);

        stage.start_animation(
            self.grid,
            Property::Offset,
            Animation::new(FAR_SLIDE_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key_vector(0.9, -viewport_center)
                .key_vector(1.0, -viewport_center),
        );
        stage.start_animation(
            self.grid,
            Property::CenterPoint,
            Animation::new(FAR_SLIDE_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key_vector(1.0, center_point),
        );
        stage.start_animation(
            self.grid,
            Property::Scale,
            Animation::new(NEAR_SLIDE_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key_vector(0.3, Vector3::new(1.0, 1.0, 1.0))
                .key_vector(1.0, Vector3::new(1.0, 1.0, 1.0)),
        );
    }

    /// Long pan with a mid-flight hold (40%-60%) where position pauses
    /// before the scale climbs to the zoom factor.
    pub fn create_zoom_and_pan(&mut self, stage: &mut Stage, target: &Tile) {
        let (_, center_point, viewport_center) = self.target_values(stage, target);

        stage.start_animation(
            self.grid,
            Property::Offset,
            Animation::new(ZOOM_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key_vector(1.0, -viewport_center),
        );
        stage.start_animation(
            self.grid,
            Property::CenterPoint,
            Animation::new(ZOOM_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key(0.4, KeyFrameValue::Starting)
                .key_vector(0.6, center_point)
                .key_vector(1.0, center_point),
        );
        stage.start_animation(
            self.grid,
            Property::Scale,
            Animation::new(ZOOM_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key_vector(0.4, Vector3::new(1.0, 1.0, 1.0))
                .key_vector(0.6, Vector3::new(1.0, 1.0, 1.0))
                .key_vector(1.0, self.zoom_scale_vector()),
        );
    }

    /// Fly a random handful of far tiles in toward the target, staggered,
    /// while the container scales up. Must be balanced by
    /// [`create_unstack`](Self::create_unstack) before the next stack.
    pub fn create_stack(
        &mut self,
        stage: &mut Stage,
        layout: &mut LayoutManager,
        rng: &mut StdRng,
        target_index: usize,
    ) {
        debug_assert!(self.stack.is_none(), "stack started while one is pending");

        let stack_size = rng.random_range(4..9);
        let center = stage.visual(layout.tile(target_index).frame()).offset;
        let window = stage.window_size();
        let fly_distance = window.x.max(window.y);

        stage.start_animation(
            self.grid,
            Property::Scale,
            Animation::new(STACK_SCALE_TIME)
                .key(0.0, KeyFrameValue::Starting)
                .key_vector(1.0, self.zoom_scale_vector()),
        );

        let fly_in_easing = Easing::CubicBezier(Vector2::new(0.0, 1.0), Vector2::new(0.8, 1.0));

        let mut stacked = Vec::with_capacity(stack_size);
        for i in 0..stack_size {
            let index = layout.get_far_neighbor_preserve_selection(rng);
            stacked.push(index);

            let tile = layout.tile(index);
            let direction = fly_direction(stage.visual(tile.frame()).offset, center);
            let start_delta = direction * fly_distance;

            // Rest near the focal point with a small random jitter.
            let jitter_x = rng.random::<f32>() * 100.0 - 50.0;
            let jitter_y = rng.random::<f32>() * 100.0 - 50.0;
            let end_delta = Vector3::new(
                -direction.x * jitter_x,
                -direction.y * jitter_y,
                0.0,
            );

            stage.start_animation(
                tile.frame(),
                Property::Offset,
                Animation::new(STACK_FLY_TIME)
                    .key_vector(0.0, center + start_delta)
                    .key_eased(
                        1.0,
                        KeyFrameValue::Value(crate::stage::KeyValue::Vector3(center + end_delta)),
                        fly_in_easing,
                    )
                    .delay(STACK_STAGGER * i as u32),
            );

            tile.bring_to_top(stage);
        }

        self.stack = Some(StackState {
            tiles: stacked,
            center,
        });
    }

    /// Reverse the pending stack: each tile flies out along its approach
    /// direction and then returns to its resting grid offset, staggered in
    /// countdown order.
    pub fn create_unstack(&mut self, stage: &mut Stage, layout: &LayoutManager) {
        let stack = self.stack.take();
        debug_assert!(
            stack.as_ref().is_some_and(|s| !s.tiles.is_empty()),
            "unstack without a pending stack"
        );
        let Some(stack) = stack else {
            return;
        };

        let window = stage.window_size();
        let fly_distance = window.x.max(window.y);
        let fly_out_easing = Easing::CubicBezier(Vector2::new(0.0, 0.4), Vector2::new(1.0, 0.6));
        let count = stack.tiles.len() as u64;

        for (i, &index) in stack.tiles.iter().enumerate() {
            let tile = layout.tile(index);
            let direction = fly_direction(stage.visual(tile.frame()).offset, stack.center);
            let delta = direction * fly_distance;

            let delay = UNSTACK_BASE_DELAY_MS + (count - i as u64) * UNSTACK_STEP_MS;

            stage.start_animation(
                tile.frame(),
                Property::Offset,
                Animation::new(STACK_FLY_TIME)
                    .key_eased(0.0, KeyFrameValue::Starting, fly_out_easing)
                    .key_eased(0.5, KeyFrameValue::StartingPlus(delta), fly_out_easing)
                    .key_eased(
                        1.0,
                        KeyFrameValue::Value(crate::stage::KeyValue::Vector3(tile.offset())),
                        fly_out_easing,
                    )
                    .delay(Duration::from_millis(delay)),
            );
        }
    }

    /// Drive one tile's saturation according to `mode`. Regular mode fades
    /// with the shared templates toward the tile's desaturation flag; the
    /// spotlight binds a continuously evaluated distance expression instead.
    pub fn apply_desaturation(
        &self,
        stage: &mut Stage,
        tile: &Tile,
        animations: &CommonAnimations,
        mode: DesaturationMode,
    ) {
        match mode {
            DesaturationMode::ColorSpotlight => {
                if let Some(content) = tile.content() {
                    stage.bind_expression(
                        content,
                        Property::Saturation,
                        Expression::SpotlightSaturation {
                            frame: tile.frame(),
                            grid: self.grid,
                            radius: self.spotlight_radius,
                        },
                    );
                }
            }
            DesaturationMode::None | DesaturationMode::Regular => {
                let template = if tile.is_desaturated() {
                    animations.slow_off.clone()
                } else {
                    animations.normal_on.clone()
                };
                tile.apply_desaturation_animation(stage, template);
            }
        }
    }
}

/// Unit vector from the stack focal point toward a tile. Degenerates to a
/// fixed direction when the tile sits exactly on the focal point, which the
/// far-neighbor fallback can produce on tiny grids.
fn fly_direction(tile_offset: Vector3<f32>, center: Vector3<f32>) -> Vector3<f32> {
    let offset = tile_offset - center;
    let length = offset.magnitude();
    if length <= f32::EPSILON {
        Vector3::new(1.0, 0.0, 0.0)
    } else {
        offset / length
    }
}
