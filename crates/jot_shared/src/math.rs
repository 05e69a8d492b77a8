//! Quantized 2D coordinates.
//!
//! On the wire each axis is an `i16` holding `round(value * 10)`, so the
//! representable range is `-3276.7..=3276.7` at one decimal of precision.

use bytemuck::{Pod, Zeroable};
use serde::{Deserialize, Serialize};

use crate::constants::VECTOR_SCALE;

/// 2D vector carried by the codec's `vector` primitive.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable, Serialize, Deserialize)]
pub struct Vector2 {
    /// X component
    pub x: f32,
    /// Y component
    pub y: f32,
}

impl Vector2 {
    /// Largest magnitude an axis may have and still encode.
    pub const AXIS_LIMIT: f32 = i16::MAX as f32 / VECTOR_SCALE;

    /// Zero vector
    pub const ZERO: Self = Self::new(0.0, 0.0);

    /// Creates a new Vector2
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Scales one axis to its wire value, or `None` when it cannot fit an `i16`.
    #[must_use]
    pub fn quantize_axis(value: f32) -> Option<i16> {
        let scaled = (value * VECTOR_SCALE).round();
        if scaled.is_finite() && scaled.abs() <= f32::from(i16::MAX) {
            Some(scaled as i16)
        } else {
            None
        }
    }

    /// Inverse of [`Vector2::quantize_axis`].
    #[must_use]
    pub fn dequantize_axis(raw: i16) -> f32 {
        f32::from(raw) / VECTOR_SCALE
    }
}
