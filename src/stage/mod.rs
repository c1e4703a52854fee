//! Retained visual stage
//!
//! This module is the engine's model of the host compositor: a tree of
//! visuals with typed animatable properties, keyframe animations with
//! scoped completion batches, and continuously evaluated expressions.
//! The engine parameterizes animations against it; the host advances it
//! with [`Stage::tick`] and draws the resulting tree however it likes.
//!
//! Everything here runs on the single logical UI thread.

pub mod animation;
pub mod batch;
pub mod visual;

use std::collections::HashMap;
use std::time::Duration;

use cgmath::Vector2;

pub use animation::{Animation, Easing, Expression, KeyFrameValue, KeyValue, Property};
pub use batch::BatchId;
pub use visual::{Brush, Color, SurfaceId, Visual, VisualId};

use batch::BatchState;

#[derive(Debug)]
struct ActiveAnimation {
    target: VisualId,
    property: Property,
    animation: Animation,
    elapsed: Duration,
    /// Starting value, captured once the delay has elapsed
    starting: Option<KeyValue>,
    batch: Option<BatchId>,
}

#[derive(Debug)]
struct ExpressionBinding {
    target: VisualId,
    property: Property,
    expression: Expression,
}

/// The visual tree plus its animation clock.
#[derive(Debug)]
pub struct Stage {
    visuals: Vec<Visual>,
    animations: Vec<ActiveAnimation>,
    expressions: Vec<ExpressionBinding>,
    /// Batches still waiting to complete, keyed by id. Ids are handed out
    /// from a monotonic counter and never reused, so a stale `BatchId` held
    /// by a caller can never collide with a live batch.
    batches: HashMap<BatchId, BatchState>,
    next_batch: usize,
    open_batch: Option<BatchId>,
    completed: Vec<BatchId>,
    window_size: Vector2<f32>,
}

impl Stage {
    pub fn new() -> Self {
        Self {
            visuals: Vec::new(),
            animations: Vec::new(),
            expressions: Vec::new(),
            batches: HashMap::new(),
            next_batch: 0,
            open_batch: None,
            completed: Vec::new(),
            window_size: Vector2::new(0.0, 0.0),
        }
    }

    // ========== Tree ==========

    pub fn create_visual(&mut self) -> VisualId {
        self.visuals.push(Visual::new());
        VisualId(self.visuals.len() - 1)
    }

    pub fn visual(&self, id: VisualId) -> &Visual {
        &self.visuals[id.0]
    }

    pub fn visual_mut(&mut self, id: VisualId) -> &mut Visual {
        &mut self.visuals[id.0]
    }

    /// Insert `child` as the top-most (last painted) child of `parent`.
    pub fn insert_at_top(&mut self, parent: VisualId, child: VisualId) {
        debug_assert!(self.visuals[child.0].parent.is_none(), "visual already parented");
        self.visuals[child.0].parent = Some(parent);
        self.visuals[parent.0].children.push(child);
    }

    /// Insert `child` as the bottom-most (first painted) child of `parent`.
    pub fn insert_at_bottom(&mut self, parent: VisualId, child: VisualId) {
        debug_assert!(self.visuals[child.0].parent.is_none(), "visual already parented");
        self.visuals[child.0].parent = Some(parent);
        self.visuals[parent.0].children.insert(0, child);
    }

    pub fn remove_child(&mut self, parent: VisualId, child: VisualId) {
        debug_assert_eq!(self.visuals[child.0].parent, Some(parent), "visual not a child of parent");
        self.visuals[child.0].parent = None;
        self.visuals[parent.0].children.retain(|&c| c != child);
    }

    /// Re-insert an already-parented visual at the top of its parent's
    /// child order.
    pub fn bring_to_top(&mut self, child: VisualId) {
        let parent = self.visuals[child.0].parent;
        debug_assert!(parent.is_some(), "bring_to_top on an unparented visual");
        if let Some(parent) = parent {
            let children = &mut self.visuals[parent.0].children;
            children.retain(|&c| c != child);
            children.push(child);
        }
    }

    // ========== Window ==========

    pub fn window_size(&self) -> Vector2<f32> {
        self.window_size
    }

    pub fn set_window_size(&mut self, size: Vector2<f32>) {
        self.window_size = size;
    }

    // ========== Batches ==========

    /// Open a scoped batch. Animations started before the matching
    /// [`end_batch`](Self::end_batch) are tracked by it.
    pub fn begin_batch(&mut self) -> BatchId {
        debug_assert!(self.open_batch.is_none(), "a batch is already open");
        let id = BatchId(self.next_batch);
        self.next_batch += 1;
        self.batches.insert(id, BatchState::new());
        self.open_batch = Some(id);
        id
    }

    pub fn end_batch(&mut self, id: BatchId) {
        debug_assert_eq!(self.open_batch, Some(id), "ending a batch that is not open");
        self.open_batch = None;

        if let Some(batch) = self.batches.get_mut(&id) {
            batch.ended = true;
            if batch.is_complete() {
                self.batches.remove(&id);
                self.completed.push(id);
            }
        }
    }

    /// Mark one tracked animation of `batch` as finished, reporting and
    /// discarding the batch once nothing in it remains.
    fn finish_batch_member(&mut self, batch: BatchId) {
        if let Some(state) = self.batches.get_mut(&batch) {
            state.remaining -= 1;
            if state.is_complete() {
                self.batches.remove(&batch);
                self.completed.push(batch);
            }
        }
    }

    /// Number of batches whose completion has not been reported yet.
    pub fn pending_batch_count(&self) -> usize {
        self.batches.len()
    }

    // ========== Animations ==========

    /// Start `animation` on a property. Replaces any animation or expression
    /// already driving the same property of the same visual.
    pub fn start_animation(&mut self, target: VisualId, property: Property, animation: Animation) {
        self.detach(target, property);

        let batch = self.open_batch;
        if let Some(batch) = batch {
            if let Some(state) = self.batches.get_mut(&batch) {
                state.remaining += 1;
            }
        }

        self.animations.push(ActiveAnimation {
            target,
            property,
            animation,
            elapsed: Duration::ZERO,
            starting: None,
            batch,
        });
    }

    /// Bind an expression to a property, replacing any animation or prior
    /// expression on the same slot. Expressions never complete; they are
    /// re-evaluated on every tick.
    pub fn bind_expression(&mut self, target: VisualId, property: Property, expression: Expression) {
        self.detach(target, property);
        self.expressions.push(ExpressionBinding {
            target,
            property,
            expression,
        });
    }

    /// Remove whatever is currently driving (target, property). A replaced
    /// animation counts as finished for its batch.
    fn detach(&mut self, target: VisualId, property: Property) {
        let mut finished_batches = Vec::new();
        self.animations.retain(|a| {
            if a.target == target && a.property == property {
                if let Some(batch) = a.batch {
                    finished_batches.push(batch);
                }
                false
            } else {
                true
            }
        });
        for batch in finished_batches {
            self.finish_batch_member(batch);
        }

        self.expressions
            .retain(|e| !(e.target == target && e.property == property));
    }

    /// Number of animations currently in flight (delayed ones included).
    pub fn active_animation_count(&self) -> usize {
        self.animations.len()
    }

    // ========== Clock ==========

    /// Advance every animation by `dt`, apply expression bindings, and
    /// return the batches that completed during this tick.
    pub fn tick(&mut self, dt: Duration) -> Vec<BatchId> {
        let mut index = 0;
        while index < self.animations.len() {
            let active = &mut self.animations[index];
            active.elapsed += dt;

            let delay = active.animation.delay_time();
            if active.elapsed < delay {
                index += 1;
                continue;
            }

            let starting = match active.starting {
                Some(value) => value,
                None => {
                    let value = self.visuals[active.target.0].property_value(active.property);
                    active.starting = Some(value);
                    value
                }
            };

            let playing = active.elapsed - delay;
            let duration = active.animation.duration();
            let progress = playing.as_secs_f32() / duration.as_secs_f32();

            let value = active.animation.sample(progress, starting);
            let target = active.target;
            let property = active.property;
            self.visuals[target.0].set_property(property, value);

            if progress >= 1.0 {
                let finished = self.animations.swap_remove(index);
                if let Some(batch) = finished.batch {
                    self.finish_batch_member(batch);
                }
            } else {
                index += 1;
            }
        }

        for binding in &self.expressions {
            let Expression::SpotlightSaturation { frame, grid, .. } = binding.expression;
            let frame_visual = &self.visuals[frame.0];
            let (frame_offset, frame_size) = (frame_visual.offset, frame_visual.size);
            let grid_offset = self.visuals[grid.0].offset;

            let value =
                binding
                    .expression
                    .evaluate(frame_offset, frame_size, grid_offset, self.window_size);
            self.visuals[binding.target.0].set_property(binding.property, KeyValue::Scalar(value));
        }

        std::mem::take(&mut self.completed)
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::new()
    }
}
