//! End-to-end scenarios driving the engine through its public surface.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use cgmath::Vector2;
use photo_wall::catalog::PhotoCatalog;
use photo_wall::context::SlideshowContext;
use photo_wall::layout::LayoutManager;
use photo_wall::stage::Stage;
use photo_wall::{
    DecodeError, DecodedImage, ImageDecoder, ImageSource, SlideShow, SlideshowConfig,
    TransitionKind,
};

struct ListSource(usize);

impl ImageSource for ListSource {
    fn enumerate(&self, max_count: usize) -> std::io::Result<Vec<PathBuf>> {
        Ok((0..self.0.min(max_count))
            .map(|i| PathBuf::from(format!("photo_{i}.jpg")))
            .collect())
    }
}

/// Decoder that tracks how many decodes run at once.
#[derive(Default)]
struct CountingDecoder {
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    next_surface: AtomicU64,
}

impl ImageDecoder for CountingDecoder {
    fn decode(&self, _source: &Path, _decode_size: u32) -> Result<DecodedImage, DecodeError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        std::thread::sleep(Duration::from_millis(10));

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(DecodedImage {
            surface: self.next_surface.fetch_add(1, Ordering::SeqCst),
            width: 400,
            height: 300,
        })
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_all_tiles_fill_with_bounded_concurrency() {
    let config = SlideshowConfig {
        rows: 4,
        columns: 4,
        concurrent_decodes: 4,
        seed: Some(2024),
        ..SlideshowConfig::default()
    };
    let decoder = Arc::new(CountingDecoder::default());

    let mut slideshow = SlideShow::new(
        &config,
        &ListSource(20),
        Arc::clone(&decoder) as Arc<dyn ImageDecoder>,
        tokio::runtime::Handle::current(),
    )
    .unwrap();
    slideshow.update_window_size(Vector2::new(1280.0, 800.0));
    slideshow.start();

    for _ in 0..2000 {
        slideshow.tick(Duration::from_millis(16));
        if slideshow.layout().empty_tile_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    assert_eq!(slideshow.layout().empty_tile_count(), 0);
    for index in 0..16 {
        assert!(slideshow.layout().tile(index).has_photo());
    }
    assert!(decoder.max_in_flight.load(Ordering::SeqCst) <= 4);
}

#[test]
fn test_near_neighbor_walk_stays_adjacent() {
    let mut stage = Stage::new();
    let mut ctx = SlideshowContext::new(Some(77));
    let root = stage.create_visual();

    let catalog = PhotoCatalog::build(&ListSource(5), 250, &mut ctx.rng).unwrap();
    let config = SlideshowConfig {
        rows: 10,
        columns: 10,
        ..SlideshowConfig::default()
    };
    let mut layout = LayoutManager::create(&mut stage, &mut ctx, root, catalog, &config);
    layout.set_current_tile(2, 2);

    let mut previous = layout.current_index();
    for _ in 0..20 {
        let chosen = layout.get_near_neighbor(&mut ctx.rng);

        let (r0, c0) = (previous / 10, previous % 10);
        let (r1, c1) = (chosen / 10, chosen % 10);
        let chebyshev = r0.abs_diff(r1).max(c0.abs_diff(c1));
        assert!(chebyshev <= 1, "jumped more than one step: {previous} -> {chosen}");

        previous = chosen;
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disabled_slides_are_never_played() {
    let config = SlideshowConfig {
        rows: 10,
        columns: 10,
        seed: Some(99),
        ..SlideshowConfig::default()
    };

    let mut slideshow = SlideShow::new(
        &config,
        &ListSource(12),
        Arc::new(CountingDecoder::default()) as Arc<dyn ImageDecoder>,
        tokio::runtime::Handle::current(),
    )
    .unwrap();
    slideshow.update_window_size(Vector2::new(1280.0, 800.0));

    slideshow.set_transition_enabled(TransitionKind::NearSlide, false);
    slideshow.set_transition_enabled(TransitionKind::FarSlide, false);
    slideshow.start();

    // Cycle through many transitions; only zoom and stack/unstack may play.
    for _ in 0..200 {
        slideshow.tick(Duration::from_secs(3));

        let playing = slideshow.controller().playing();
        assert!(
            matches!(playing, Some(TransitionKind::Zoom) | Some(TransitionKind::Stack)),
            "unexpected transition: {playing:?}"
        );
    }
}
