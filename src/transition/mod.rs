//! Transitions
//!
//! A transition is a parameterized, animated change of view focus from the
//! current tile to a newly selected one. The library builds the animations;
//! the controller decides which transition plays next and keeps exactly one
//! in flight.

pub mod controller;
pub mod library;

pub use controller::TransitionController;
pub use library::TransitionLibrary;

/// The externally toggleable transition kinds. Unstack is not listed: it is
/// the mandatory second half of a stack and shares its toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionKind {
    NearSlide,
    FarSlide,
    Zoom,
    Stack,
}

/// How a transition treats tile saturation while it plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesaturationMode {
    /// Every tile at full color
    None,
    /// Every tile except the focused one fully desaturated
    Regular,
    /// Saturation graded by distance from the window center
    ColorSpotlight,
}
