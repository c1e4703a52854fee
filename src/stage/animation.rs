//! Keyframe animations and expressions
//!
//! Animations are plain data: a list of keyframes over a duration, with an
//! optional start delay. The engine builds them (or clones them from shared
//! templates) and hands them to the stage; the stage samples them every tick.

use std::time::Duration;

use cgmath::{InnerSpace, Vector2, Vector3};

use super::visual::VisualId;

/// Animatable properties of a visual.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Property {
    Offset,
    CenterPoint,
    Scale,
    RotationAngle,
    Opacity,
    Saturation,
}

/// A concrete animatable value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyValue {
    Scalar(f32),
    Vector3(Vector3<f32>),
}

impl KeyValue {
    fn lerp(self, other: KeyValue, t: f32) -> KeyValue {
        match (self, other) {
            (KeyValue::Scalar(a), KeyValue::Scalar(b)) => KeyValue::Scalar(a + (b - a) * t),
            (KeyValue::Vector3(a), KeyValue::Vector3(b)) => KeyValue::Vector3(a + (b - a) * t),
            (a, b) => {
                debug_assert!(false, "cannot interpolate {a:?} with {b:?}");
                a
            }
        }
    }
}

/// The value a keyframe resolves to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KeyFrameValue {
    /// The property's value at the moment the animation begins playing
    Starting,
    /// The starting value plus a fixed vector delta
    StartingPlus(Vector3<f32>),
    /// A fixed value
    Value(KeyValue),
}

impl KeyFrameValue {
    fn resolve(self, starting: KeyValue) -> KeyValue {
        match self {
            KeyFrameValue::Starting => starting,
            KeyFrameValue::StartingPlus(delta) => match starting {
                KeyValue::Vector3(v) => KeyValue::Vector3(v + delta),
                KeyValue::Scalar(_) => {
                    debug_assert!(false, "StartingPlus requires a vector property");
                    starting
                }
            },
            KeyFrameValue::Value(v) => v,
        }
    }
}

/// Easing applied over the segment that ends at a keyframe.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Easing {
    Linear,
    /// Cubic bezier with implicit endpoints (0,0) and (1,1)
    CubicBezier(Vector2<f32>, Vector2<f32>),
}

impl Easing {
    /// Map linear segment progress to eased progress.
    fn apply(self, t: f32) -> f32 {
        match self {
            Easing::Linear => t,
            Easing::CubicBezier(p1, p2) => cubic_bezier(p1, p2, t),
        }
    }
}

/// Evaluate a CSS-style cubic bezier timing curve at horizontal position `x`
/// by bisecting on the curve parameter.
fn cubic_bezier(p1: Vector2<f32>, p2: Vector2<f32>, x: f32) -> f32 {
    if x <= 0.0 {
        return 0.0;
    }
    if x >= 1.0 {
        return 1.0;
    }

    let sample = |s: f32| -> Vector2<f32> {
        let inv = 1.0 - s;
        p1 * (3.0 * inv * inv * s) + p2 * (3.0 * inv * s * s) + Vector2::new(1.0, 1.0) * (s * s * s)
    };

    let mut lo = 0.0_f32;
    let mut hi = 1.0_f32;
    let mut s = x;
    for _ in 0..24 {
        let point = sample(s);
        if point.x < x {
            lo = s;
        } else {
            hi = s;
        }
        s = (lo + hi) * 0.5;
    }

    sample(s).y
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyFrame {
    /// Normalized position in 0..=1
    pub progress: f32,
    pub value: KeyFrameValue,
    pub easing: Easing,
}

/// A keyframe animation description.
///
/// If no keyframe is placed at progress 0, the animation implicitly starts
/// from the property's current value.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    keyframes: Vec<KeyFrame>,
    duration: Duration,
    delay: Duration,
}

impl Animation {
    pub fn new(duration: Duration) -> Self {
        debug_assert!(!duration.is_zero(), "animations need a positive duration");
        Self {
            keyframes: Vec::new(),
            duration,
            delay: Duration::ZERO,
        }
    }

    /// Add a keyframe with linear easing.
    pub fn key(self, progress: f32, value: KeyFrameValue) -> Self {
        self.key_eased(progress, value, Easing::Linear)
    }

    pub fn key_eased(mut self, progress: f32, value: KeyFrameValue, easing: Easing) -> Self {
        debug_assert!((0.0..=1.0).contains(&progress));
        debug_assert!(
            self.keyframes.last().map_or(true, |k| k.progress < progress),
            "keyframes must be added in increasing progress order"
        );
        self.keyframes.push(KeyFrame { progress, value, easing });
        self
    }

    pub fn key_scalar(self, progress: f32, value: f32) -> Self {
        self.key(progress, KeyFrameValue::Value(KeyValue::Scalar(value)))
    }

    pub fn key_vector(self, progress: f32, value: Vector3<f32>) -> Self {
        self.key(progress, KeyFrameValue::Value(KeyValue::Vector3(value)))
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn delay_time(&self) -> Duration {
        self.delay
    }

    /// Sample the animation at normalized progress `p`, given the captured
    /// starting value of the target property.
    pub(super) fn sample(&self, p: f32, starting: KeyValue) -> KeyValue {
        debug_assert!(!self.keyframes.is_empty(), "animation without keyframes");
        let p = p.clamp(0.0, 1.0);

        // Implicit starting keyframe at 0 unless one was provided.
        let mut prev_progress = 0.0_f32;
        let mut prev_value = starting;

        for frame in &self.keyframes {
            if p <= frame.progress {
                let span = frame.progress - prev_progress;
                let local = if span <= f32::EPSILON {
                    1.0
                } else {
                    (p - prev_progress) / span
                };
                let eased = frame.easing.apply(local);
                return prev_value.lerp(frame.value.resolve(starting), eased);
            }
            prev_progress = frame.progress;
            prev_value = frame.value.resolve(starting);
        }

        prev_value
    }
}

/// A continuously re-evaluated property binding.
///
/// Unlike a keyframe animation this never completes; the stage recomputes it
/// every tick until it is replaced.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Expression {
    /// Saturation as a smooth function of the distance between a tile frame's
    /// center and the window center: 1.0 at the center, falling to 0.0 at
    /// `radius` and beyond. The frame's position is measured through the
    /// panning grid's offset.
    SpotlightSaturation {
        frame: VisualId,
        grid: VisualId,
        radius: f32,
    },
}

impl Expression {
    pub(super) fn evaluate(
        &self,
        frame_offset: Vector3<f32>,
        frame_size: Vector2<f32>,
        grid_offset: Vector3<f32>,
        window: Vector2<f32>,
    ) -> f32 {
        match self {
            Expression::SpotlightSaturation { radius, .. } => {
                let center = Vector2::new(
                    frame_offset.x + frame_size.x * 0.5 + grid_offset.x - window.x * 0.5,
                    frame_offset.y + frame_size.y * 0.5 + grid_offset.y - window.y * 0.5,
                );
                let falloff = center.magnitude2() / (radius * radius);
                1.0 - falloff.min(1.0)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_implicit_start() {
        let anim = Animation::new(Duration::from_millis(800)).key_scalar(1.0, 1.0);

        assert_eq!(anim.sample(0.0, KeyValue::Scalar(0.0)), KeyValue::Scalar(0.0));
        assert_eq!(anim.sample(0.5, KeyValue::Scalar(0.0)), KeyValue::Scalar(0.5));
        assert_eq!(anim.sample(1.0, KeyValue::Scalar(0.0)), KeyValue::Scalar(1.0));
    }

    #[test]
    fn test_sample_hold_segment() {
        // Far-slide shape: destination reached at 90% and held to the end.
        let dest = Vector3::new(10.0, 0.0, 0.0);
        let anim = Animation::new(Duration::from_secs(8))
            .key(0.0, KeyFrameValue::Starting)
            .key_vector(0.9, dest)
            .key_vector(1.0, dest);

        let start = KeyValue::Vector3(Vector3::new(0.0, 0.0, 0.0));
        assert_eq!(anim.sample(0.95, start), KeyValue::Vector3(dest));
        assert_eq!(anim.sample(0.45, start), KeyValue::Vector3(dest * 0.5));
    }

    #[test]
    fn test_sample_starting_mid_track() {
        // Zoom center-point shape: starting value held until 40%.
        let target = Vector3::new(100.0, 50.0, 0.0);
        let anim = Animation::new(Duration::from_secs(12))
            .key(0.0, KeyFrameValue::Starting)
            .key(0.4, KeyFrameValue::Starting)
            .key_vector(0.6, target)
            .key_vector(1.0, target);

        let start = KeyValue::Vector3(Vector3::new(4.0, 4.0, 0.0));
        assert_eq!(anim.sample(0.2, start), start);
        assert_eq!(anim.sample(0.4, start), start);
        assert_eq!(anim.sample(0.8, start), KeyValue::Vector3(target));
    }

    #[test]
    fn test_starting_plus_resolves_against_capture() {
        let anim = Animation::new(Duration::from_secs(2))
            .key(0.0, KeyFrameValue::Starting)
            .key(0.5, KeyFrameValue::StartingPlus(Vector3::new(100.0, 0.0, 0.0)))
            .key_vector(1.0, Vector3::new(0.0, 0.0, 0.0));

        let start = KeyValue::Vector3(Vector3::new(5.0, 5.0, 0.0));
        assert_eq!(
            anim.sample(0.5, start),
            KeyValue::Vector3(Vector3::new(105.0, 5.0, 0.0))
        );
    }

    #[test]
    fn test_cubic_bezier_endpoints() {
        let ease = Easing::CubicBezier(Vector2::new(0.0, 1.0), Vector2::new(0.8, 1.0));
        assert_eq!(ease.apply(0.0), 0.0);
        assert_eq!(ease.apply(1.0), 1.0);

        // This curve front-loads progress.
        assert!(ease.apply(0.3) > 0.3);
    }

    #[test]
    fn test_spotlight_expression() {
        let expr = Expression::SpotlightSaturation {
            frame: VisualId(0),
            grid: VisualId(1),
            radius: 300.0,
        };
        let window = Vector2::new(1000.0, 800.0);
        let size = Vector2::new(200.0, 150.0);

        // Frame centered exactly on the window center: full color.
        let centered = Vector3::new(400.0, 325.0, 0.0);
        let sat = expr.evaluate(centered, size, Vector3::new(0.0, 0.0, 0.0), window);
        assert!((sat - 1.0).abs() < 1e-6);

        // Far away: fully desaturated.
        let far = Vector3::new(5000.0, 5000.0, 0.0);
        let sat = expr.evaluate(far, size, Vector3::new(0.0, 0.0, 0.0), window);
        assert_eq!(sat, 0.0);

        // Half the radius away: 75% saturation.
        let half = Vector3::new(400.0 + 150.0, 325.0, 0.0);
        let sat = expr.evaluate(half, size, Vector3::new(0.0, 0.0, 0.0), window);
        assert!((sat - 0.75).abs() < 1e-4);
    }
}
