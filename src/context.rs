//! Shared slideshow context
//!
//! Everything the original design kept in process-wide statics lives here
//! instead and is passed explicitly to the pieces that need it: the random
//! generator (seedable for deterministic tests) and the shared on/off
//! animation templates used for selection highlights and desaturation.

use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;

use crate::stage::Animation;

/// Duration of the standard fade-in / move animations (800 ms).
pub const NORMAL_TIME: Duration = Duration::from_millis(800);

/// Duration of the slow fade-out animation (1400 ms).
pub const SLOW_TIME: Duration = Duration::from_millis(1400);

/// Shared animation templates.
///
/// Both saturation and opacity run over 0.0..=1.0, so the same two templates
/// serve selection highlights and regular desaturation.
#[derive(Debug, Clone)]
pub struct CommonAnimations {
    /// Animate a scalar property to 1.0 over the normal duration
    pub normal_on: Animation,
    /// Animate a scalar property to 0.0 over the slow duration
    pub slow_off: Animation,
}

impl CommonAnimations {
    fn new() -> Self {
        Self {
            normal_on: Animation::new(NORMAL_TIME).key_scalar(1.0, 1.0),
            slow_off: Animation::new(SLOW_TIME).key_scalar(1.0, 0.0),
        }
    }
}

/// Explicit dependencies shared across the slideshow: hidden global state
/// is not welcome here.
#[derive(Debug)]
pub struct SlideshowContext {
    pub rng: StdRng,
    pub animations: CommonAnimations,
}

impl SlideshowContext {
    /// Build a context, optionally seeding the RNG for reproducible runs.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        Self {
            rng,
            animations: CommonAnimations::new(),
        }
    }
}
