//! Visual nodes
//!
//! A `Visual` is one node in the retained tree: typed geometry and paint
//! properties plus parent/child links. The slideshow engine only ever talks
//! to visuals through these typed properties, so there is no runtime
//! type-sniffing of handles anywhere.

use cgmath::{Matrix4, SquareMatrix, Vector2, Vector3};

use super::animation::Property;
use super::KeyValue;

/// Handle to a visual owned by a [`Stage`](super::Stage).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VisualId(pub(super) usize);

/// Opaque handle to a decoded image surface. The host allocates these and
/// maps them back to real textures when it draws the tree.
pub type SurfaceId = u64;

/// Straight-alpha color, linear components in 0..=1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color { r: 1.0, g: 1.0, b: 1.0, a: 1.0 };
    pub const ORANGE: Color = Color { r: 1.0, g: 0.65, b: 0.0, a: 1.0 };
}

/// What a visual paints inside its bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Brush {
    /// Container: no paint of its own
    None,
    /// Flat color fill
    Solid(Color),
    /// A decoded photo surface
    Surface(SurfaceId),
}

#[derive(Debug, Clone)]
pub struct Visual {
    pub offset: Vector3<f32>,
    pub size: Vector2<f32>,
    /// Point (relative to the visual's own origin) that scale and rotation
    /// pivot around
    pub center_point: Vector3<f32>,
    pub scale: Vector3<f32>,
    /// Rotation around the center point, in radians
    pub rotation: f32,
    pub opacity: f32,
    /// 1.0 = full color, 0.0 = grayscale
    pub saturation: f32,
    pub brush: Brush,
    /// Extra transform applied to this node and its subtree (used for the
    /// root's fake depth perspective)
    pub transform: Matrix4<f32>,

    pub(super) parent: Option<VisualId>,
    pub(super) children: Vec<VisualId>,
}

impl Visual {
    pub(super) fn new() -> Self {
        Self {
            offset: Vector3::new(0.0, 0.0, 0.0),
            size: Vector2::new(0.0, 0.0),
            center_point: Vector3::new(0.0, 0.0, 0.0),
            scale: Vector3::new(1.0, 1.0, 1.0),
            rotation: 0.0,
            opacity: 1.0,
            saturation: 1.0,
            brush: Brush::None,
            transform: Matrix4::identity(),
            parent: None,
            children: Vec::new(),
        }
    }

    pub fn parent(&self) -> Option<VisualId> {
        self.parent
    }

    /// Children in paint order, bottom-most first
    pub fn children(&self) -> &[VisualId] {
        &self.children
    }

    pub(super) fn property_value(&self, property: Property) -> KeyValue {
        match property {
            Property::Offset => KeyValue::Vector3(self.offset),
            Property::CenterPoint => KeyValue::Vector3(self.center_point),
            Property::Scale => KeyValue::Vector3(self.scale),
            Property::RotationAngle => KeyValue::Scalar(self.rotation),
            Property::Opacity => KeyValue::Scalar(self.opacity),
            Property::Saturation => KeyValue::Scalar(self.saturation),
        }
    }

    pub(super) fn set_property(&mut self, property: Property, value: KeyValue) {
        match (property, value) {
            (Property::Offset, KeyValue::Vector3(v)) => self.offset = v,
            (Property::CenterPoint, KeyValue::Vector3(v)) => self.center_point = v,
            (Property::Scale, KeyValue::Vector3(v)) => self.scale = v,
            (Property::RotationAngle, KeyValue::Scalar(s)) => self.rotation = s,
            (Property::Opacity, KeyValue::Scalar(s)) => self.opacity = s,
            (Property::Saturation, KeyValue::Scalar(s)) => self.saturation = s,
            (property, value) => {
                debug_assert!(false, "type mismatch applying {value:?} to {property:?}");
            }
        }
    }
}
