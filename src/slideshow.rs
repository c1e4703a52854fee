//! Slideshow engine facade
//!
//! Wires the catalog, layout manager, photo loader, and transition
//! controller together behind one object the host drives: feed it window
//! sizes and clock ticks, draw the stage it exposes.

use std::sync::Arc;
use std::time::Duration;

use cgmath::Vector2;

use crate::catalog::PhotoCatalog;
use crate::config::SlideshowConfig;
use crate::context::SlideshowContext;
use crate::error::CatalogError;
use crate::layout::LayoutManager;
use crate::loader::PhotoLoader;
use crate::photo::{ImageDecoder, ImageSource};
use crate::stage::{Stage, VisualId};
use crate::transition::{TransitionController, TransitionKind};

#[derive(Debug)]
pub struct SlideShow {
    stage: Stage,
    ctx: SlideshowContext,
    layout: LayoutManager,
    loader: PhotoLoader,
    controller: TransitionController,
    root: VisualId,
}

impl SlideShow {
    /// Build the whole engine. Fails only when the source yields no photos
    /// at all; everything after that point is self-healing.
    pub fn new(
        config: &SlideshowConfig,
        source: &dyn ImageSource,
        decoder: Arc<dyn ImageDecoder>,
        runtime: tokio::runtime::Handle,
    ) -> Result<Self, CatalogError> {
        let mut stage = Stage::new();
        let mut ctx = SlideshowContext::new(config.seed);
        let root = stage.create_visual();

        let catalog = PhotoCatalog::build(source, config.max_photos, &mut ctx.rng)?;
        let layout = LayoutManager::create(&mut stage, &mut ctx, root, catalog, config);
        let loader = PhotoLoader::new(decoder, runtime, config.decode_size);
        let controller = TransitionController::new(layout.grid_visual(), config);

        Ok(Self {
            stage,
            ctx,
            layout,
            loader,
            controller,
            root,
        })
    }

    /// Begin loading photos and start autoplaying transitions.
    pub fn start(&mut self) {
        self.layout.start_loading(&mut self.stage, &self.loader);
        self.controller
            .next_transition(&mut self.stage, &mut self.layout, &mut self.ctx);
    }

    /// Advance the engine by one frame: process decode completions, run the
    /// animation clock, and route completed batches to whoever started them.
    pub fn tick(&mut self, dt: Duration) {
        for completion in self.loader.drain_completions() {
            self.layout
                .process_completion(&mut self.stage, &self.loader, completion);
        }

        for batch in self.stage.tick(dt) {
            if self.controller.handle_batch_completed(
                &mut self.stage,
                &mut self.layout,
                &mut self.ctx,
                batch,
            ) {
                continue;
            }
            self.layout
                .handle_batch_completed(&mut self.stage, &mut self.ctx, batch);
        }
    }

    pub fn update_window_size(&mut self, size: Vector2<f32>) {
        self.layout.update_window_size(&mut self.stage, size);
    }

    pub fn set_transition_enabled(&mut self, kind: TransitionKind, enabled: bool) {
        self.controller.set_transition_enabled(
            &mut self.stage,
            &mut self.layout,
            &mut self.ctx,
            kind,
            enabled,
        );
    }

    pub fn set_spotlight_enabled(&mut self, enabled: bool) {
        self.controller.set_spotlight_enabled(enabled);
    }

    /// Root of the visual tree, for hosts drawing the stage.
    pub fn root(&self) -> VisualId {
        self.root
    }

    pub fn stage(&self) -> &Stage {
        &self.stage
    }

    pub fn layout(&self) -> &LayoutManager {
        &self.layout
    }

    pub fn controller(&self) -> &TransitionController {
        &self.controller
    }
}
