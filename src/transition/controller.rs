//! Transition controller
//!
//! A small state machine that decides which transition plays next, honors
//! the per-kind enable toggles, and keeps exactly one transition in flight.
//! Each completed transition batch immediately triggers the next one, so a
//! started controller autoplays until every kind is disabled.

use rand::rngs::StdRng;
use rand::Rng;

use crate::config::SlideshowConfig;
use crate::context::SlideshowContext;
use crate::layout::LayoutManager;
use crate::stage::{BatchId, Stage, VisualId};
use crate::transition::{DesaturationMode, TransitionKind, TransitionLibrary};

/// Identity of a registered transition entry. Distinct from
/// [`TransitionKind`]: stack and unstack are separate entries behind the
/// same toggleable kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EntryId {
    NearSlide,
    FarSlide,
    Zoom,
    Stack,
    Unstack,
}

/// Registration order; fresh random picks draw uniformly from this list.
const ENTRY_ORDER: [EntryId; 5] = [
    EntryId::NearSlide,
    EntryId::FarSlide,
    EntryId::Zoom,
    EntryId::Stack,
    EntryId::Unstack,
];

/// How an entry picks its target tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Selection {
    NearNeighbor,
    FarNeighbor,
    CurrentTile,
}

#[derive(Debug)]
struct TransitionEntry {
    id: EntryId,
    kind: TransitionKind,
    selection: Selection,
    /// Whether the target tile gets the selection highlight
    select: bool,
    desaturation: DesaturationMode,
    enabled: bool,
}

#[derive(Debug)]
pub struct TransitionController {
    entries: Vec<TransitionEntry>,
    library: TransitionLibrary,

    last_entry: Option<EntryId>,
    repeat_count: u32,
    started: bool,
    playing: Option<TransitionKind>,
    playing_batch: Option<BatchId>,
    selected_tile: Option<usize>,
    spotlight_enabled: bool,
}

impl TransitionController {
    pub fn new(grid: VisualId, config: &SlideshowConfig) -> Self {
        let entries = vec![
            TransitionEntry {
                id: EntryId::NearSlide,
                kind: TransitionKind::NearSlide,
                selection: Selection::NearNeighbor,
                select: true,
                desaturation: DesaturationMode::None,
                enabled: true,
            },
            TransitionEntry {
                id: EntryId::FarSlide,
                kind: TransitionKind::FarSlide,
                selection: Selection::FarNeighbor,
                select: true,
                desaturation: DesaturationMode::ColorSpotlight,
                enabled: true,
            },
            TransitionEntry {
                id: EntryId::Zoom,
                kind: TransitionKind::Zoom,
                selection: Selection::FarNeighbor,
                select: true,
                desaturation: DesaturationMode::Regular,
                enabled: true,
            },
            TransitionEntry {
                id: EntryId::Stack,
                kind: TransitionKind::Stack,
                selection: Selection::CurrentTile,
                select: true,
                desaturation: DesaturationMode::None,
                enabled: true,
            },
            TransitionEntry {
                id: EntryId::Unstack,
                kind: TransitionKind::Stack,
                selection: Selection::CurrentTile,
                select: true,
                desaturation: DesaturationMode::None,
                enabled: true,
            },
        ];

        Self {
            entries,
            library: TransitionLibrary::new(grid, config),
            last_entry: None,
            repeat_count: 0,
            started: false,
            playing: None,
            playing_batch: None,
            selected_tile: None,
            spotlight_enabled: true,
        }
    }

    /// The kind currently playing, if any.
    pub fn playing(&self) -> Option<TransitionKind> {
        self.playing
    }

    pub fn is_spotlight_enabled(&self) -> bool {
        self.spotlight_enabled
    }

    pub fn set_spotlight_enabled(&mut self, enabled: bool) {
        self.spotlight_enabled = enabled;
    }

    /// Toggle every entry of the given kind. If the controller has been
    /// started but nothing is playing (all kinds were disabled earlier),
    /// re-enabling a kind resumes autoplay immediately.
    pub fn set_transition_enabled(
        &mut self,
        stage: &mut Stage,
        layout: &mut LayoutManager,
        ctx: &mut SlideshowContext,
        kind: TransitionKind,
        enabled: bool,
    ) {
        for entry in &mut self.entries {
            if entry.kind == kind {
                entry.enabled = enabled;
            }
        }

        if self.started && self.playing.is_none() {
            self.next_transition(stage, layout, ctx);
        }
    }

    /// Choose, set up, and start the next transition. A no-op that leaves
    /// the controller idle when every kind is disabled.
    pub fn next_transition(
        &mut self,
        stage: &mut Stage,
        layout: &mut LayoutManager,
        ctx: &mut SlideshowContext,
    ) {
        // Overlapping transitions would fight over the same properties.
        debug_assert!(
            self.playing.is_none(),
            "must not start a transition while one is playing"
        );

        // Remember that autoplay was requested, so a later re-enable can
        // resume even if every kind is disabled right now.
        self.started = true;

        let Some(entry_index) = self.choose_next_transition(&mut ctx.rng) else {
            return;
        };

        let (entry_id, kind, selection, select, desaturation) = {
            let entry = &self.entries[entry_index];
            (entry.id, entry.kind, entry.selection, entry.select, entry.desaturation)
        };

        let next_tile = match selection {
            Selection::NearNeighbor => layout.get_near_neighbor(&mut ctx.rng),
            Selection::FarNeighbor => layout.get_far_neighbor(&mut ctx.rng),
            Selection::CurrentTile => layout.current_index(),
        };

        log::debug!("transition {entry_id:?} -> tile {next_tile}");

        // Move the selection highlight.
        let animations = ctx.animations.clone();
        if let Some(previous) = self.selected_tile.take() {
            layout.tiles_mut()[previous].set_selected(stage, &animations, false);
        }
        if select {
            layout.tiles_mut()[next_tile].set_selected(stage, &animations, true);
            self.selected_tile = Some(next_tile);
        }

        // Refresh desaturation across the whole wall. A mode of None also
        // has to undo whatever the previous transition left behind.
        let mode = match desaturation {
            DesaturationMode::ColorSpotlight if !self.spotlight_enabled => {
                DesaturationMode::Regular
            }
            other => other,
        };
        for index in 0..layout.tiles().len() {
            let desaturate = match mode {
                DesaturationMode::None => false,
                DesaturationMode::Regular | DesaturationMode::ColorSpotlight => {
                    index != next_tile
                }
            };
            layout.tiles_mut()[index].set_desaturated(desaturate);

            let tile_mode = match mode {
                DesaturationMode::ColorSpotlight if index == next_tile => DesaturationMode::None,
                other => other,
            };
            self.library
                .apply_desaturation(stage, layout.tile(index), &animations, tile_mode);
        }

        // Build the transition inside a scoped batch so its completion can
        // be observed as one event.
        let batch = stage.begin_batch();
        match entry_id {
            EntryId::NearSlide => self.library.create_near_slide(stage, layout.tile(next_tile)),
            EntryId::FarSlide => self.library.create_far_slide(stage, layout.tile(next_tile)),
            EntryId::Zoom => self.library.create_zoom_and_pan(stage, layout.tile(next_tile)),
            EntryId::Stack => {
                self.library
                    .create_stack(stage, layout, &mut ctx.rng, next_tile)
            }
            EntryId::Unstack => self.library.create_unstack(stage, layout),
        }
        stage.end_batch(batch);

        self.playing = Some(kind);
        self.playing_batch = Some(batch);
    }

    /// Route a completed batch. When it is the playing transition's batch,
    /// the controller immediately starts the next transition and returns
    /// true; unrelated batches are left for other components.
    pub fn handle_batch_completed(
        &mut self,
        stage: &mut Stage,
        layout: &mut LayoutManager,
        ctx: &mut SlideshowContext,
        batch: BatchId,
    ) -> bool {
        if self.playing_batch != Some(batch) {
            return false;
        }

        self.playing = None;
        self.playing_batch = None;
        self.next_transition(stage, layout, ctx);
        true
    }

    /// Sequencing rules, in priority order: the first transition ever is a
    /// far slide; pending repeats replay the last entry; a stack is always
    /// followed by unstack; unstack by a coin flip between far slide and
    /// zoom; otherwise a uniform fresh pick (with unstack re-mapped to
    /// stack, and slides arming a small repeat count). Disabled picks fall
    /// back to the first enabled entry, or stop the controller when none
    /// remain.
    fn choose_next_transition(&mut self, rng: &mut StdRng) -> Option<usize> {
        let mut id = if self.last_entry.is_none() {
            EntryId::FarSlide
        } else if self.repeat_count > 0 {
            self.repeat_count -= 1;
            self.last_entry.unwrap_or(EntryId::FarSlide)
        } else if self.last_entry == Some(EntryId::Stack) {
            EntryId::Unstack
        } else if self.last_entry == Some(EntryId::Unstack) {
            if rng.random_range(0..2) == 0 {
                EntryId::FarSlide
            } else {
                EntryId::Zoom
            }
        } else {
            let mut fresh = ENTRY_ORDER[rng.random_range(0..ENTRY_ORDER.len())];
            match fresh {
                EntryId::NearSlide | EntryId::FarSlide => {
                    self.repeat_count = rng.random_range(1..3);
                }
                EntryId::Unstack => {
                    // Unstack is never a fresh pick; it only follows a stack.
                    fresh = EntryId::Stack;
                }
                _ => {}
            }
            fresh
        };

        if !self.entry(id).enabled {
            if self.last_entry == Some(EntryId::Stack) {
                // Mid-stack: the unstack must play no matter what.
                id = EntryId::Unstack;
            } else {
                match self.entries.iter().find(|e| e.enabled) {
                    Some(first_enabled) => id = first_enabled.id,
                    None => {
                        self.repeat_count = 0;
                        return None;
                    }
                }
            }

            // Repeats only make sense with the full set enabled.
            self.repeat_count = 0;
        }

        self.last_entry = Some(id);
        self.entries.iter().position(|e| e.id == id)
    }

    fn entry(&self, id: EntryId) -> &TransitionEntry {
        self.entries
            .iter()
            .find(|e| e.id == id)
            .unwrap_or(&self.entries[0])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::PhotoCatalog;
    use crate::photo::ImageSource;
    use cgmath::Vector2;
    use std::path::PathBuf;
    use std::time::Duration;

    struct ListSource(usize);

    impl ImageSource for ListSource {
        fn enumerate(&self, max_count: usize) -> std::io::Result<Vec<PathBuf>> {
            Ok((0..self.0.min(max_count))
                .map(|i| PathBuf::from(format!("photo_{i}.jpg")))
                .collect())
        }
    }

    fn fixture(seed: u64) -> (Stage, SlideshowContext, LayoutManager, TransitionController) {
        let mut stage = Stage::new();
        let mut ctx = SlideshowContext::new(Some(seed));
        let root = stage.create_visual();

        let catalog = PhotoCatalog::build(&ListSource(8), 250, &mut ctx.rng).unwrap();
        let config = SlideshowConfig {
            rows: 10,
            columns: 10,
            ..SlideshowConfig::default()
        };
        let mut layout = LayoutManager::create(&mut stage, &mut ctx, root, catalog, &config);
        layout.update_window_size(&mut stage, Vector2::new(1280.0, 800.0));

        let controller = TransitionController::new(layout.grid_visual(), &config);
        (stage, ctx, layout, controller)
    }

    /// Run the stage until the playing transition's batch completes,
    /// routing completions like a host would. Returns the entry sequence
    /// implied by `last_entry` after each auto-started transition.
    fn settle_one(
        stage: &mut Stage,
        ctx: &mut SlideshowContext,
        layout: &mut LayoutManager,
        controller: &mut TransitionController,
    ) {
        for _ in 0..600 {
            for batch in stage.tick(Duration::from_millis(100)) {
                if controller.handle_batch_completed(stage, layout, ctx, batch) {
                    return;
                }
                layout.handle_batch_completed(stage, ctx, batch);
            }
        }
        panic!("transition did not complete");
    }

    #[test]
    fn test_first_transition_is_far_slide() {
        let (mut stage, mut ctx, mut layout, mut controller) = fixture(5);

        controller.next_transition(&mut stage, &mut layout, &mut ctx);

        assert_eq!(controller.last_entry, Some(EntryId::FarSlide));
        assert_eq!(controller.playing(), Some(TransitionKind::FarSlide));
    }

    #[test]
    fn test_stack_is_followed_by_unstack() {
        let (mut stage, mut ctx, mut layout, mut controller) = fixture(5);

        controller.next_transition(&mut stage, &mut layout, &mut ctx);
        for _ in 0..40 {
            let last = controller.last_entry;
            settle_one(&mut stage, &mut ctx, &mut layout, &mut controller);
            if last == Some(EntryId::Stack) {
                assert_eq!(controller.last_entry, Some(EntryId::Unstack));
                return;
            }
        }
        panic!("no stack transition occurred in 40 cycles");
    }

    #[test]
    fn test_unstack_is_followed_by_far_slide_or_zoom() {
        let (mut stage, mut ctx, mut layout, mut controller) = fixture(5);

        controller.next_transition(&mut stage, &mut layout, &mut ctx);
        for _ in 0..60 {
            let last = controller.last_entry;
            settle_one(&mut stage, &mut ctx, &mut layout, &mut controller);
            if last == Some(EntryId::Unstack) {
                assert!(matches!(
                    controller.last_entry,
                    Some(EntryId::FarSlide) | Some(EntryId::Zoom)
                ));
                return;
            }
        }
        panic!("no unstack transition occurred in 60 cycles");
    }

    #[test]
    fn test_disabled_kinds_are_never_chosen() {
        let (mut stage, mut ctx, mut layout, mut controller) = fixture(7);

        controller.set_transition_enabled(
            &mut stage, &mut layout, &mut ctx, TransitionKind::NearSlide, false,
        );
        controller.set_transition_enabled(
            &mut stage, &mut layout, &mut ctx, TransitionKind::FarSlide, false,
        );

        controller.next_transition(&mut stage, &mut layout, &mut ctx);
        for _ in 0..5 {
            let last = controller.last_entry.unwrap();
            assert!(
                matches!(last, EntryId::Zoom | EntryId::Stack | EntryId::Unstack),
                "disabled entry played: {last:?}"
            );
            if last == EntryId::Stack {
                settle_one(&mut stage, &mut ctx, &mut layout, &mut controller);
                assert_eq!(controller.last_entry, Some(EntryId::Unstack));
            } else {
                settle_one(&mut stage, &mut ctx, &mut layout, &mut controller);
            }
        }
    }

    #[test]
    fn test_all_disabled_stops_and_reenable_resumes() {
        let (mut stage, mut ctx, mut layout, mut controller) = fixture(3);

        for kind in [
            TransitionKind::NearSlide,
            TransitionKind::FarSlide,
            TransitionKind::Zoom,
            TransitionKind::Stack,
        ] {
            controller.set_transition_enabled(&mut stage, &mut layout, &mut ctx, kind, false);
        }

        controller.next_transition(&mut stage, &mut layout, &mut ctx);
        assert_eq!(controller.playing(), None);

        // Re-enabling a kind resumes autoplay on the spot.
        controller.set_transition_enabled(
            &mut stage, &mut layout, &mut ctx, TransitionKind::Zoom, true,
        );
        assert_eq!(controller.playing(), Some(TransitionKind::Zoom));
    }

    #[test]
    fn test_exactly_one_tile_selected() {
        let (mut stage, mut ctx, mut layout, mut controller) = fixture(11);

        controller.next_transition(&mut stage, &mut layout, &mut ctx);
        for _ in 0..6 {
            let selected: Vec<usize> = (0..layout.tiles().len())
                .filter(|&i| layout.tile(i).is_selected())
                .collect();
            assert_eq!(selected.len(), 1);
            assert_eq!(selected[0], controller.selected_tile.unwrap());
            settle_one(&mut stage, &mut ctx, &mut layout, &mut controller);
        }
    }

    #[test]
    fn test_repeat_replays_same_kind() {
        // Drive many cycles; whenever a fresh slide pick arms a repeat, the
        // following cycles must replay the same entry until it drains.
        let (mut stage, mut ctx, mut layout, mut controller) = fixture(13);

        controller.next_transition(&mut stage, &mut layout, &mut ctx);
        for _ in 0..30 {
            let pending = controller.repeat_count;
            let last = controller.last_entry;
            settle_one(&mut stage, &mut ctx, &mut layout, &mut controller);
            if pending > 0 {
                assert_eq!(controller.last_entry, last);
                assert_eq!(controller.repeat_count, pending - 1);
            }
        }
    }
}
