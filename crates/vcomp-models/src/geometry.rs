//! Probed frame geometry and fraction-to-pixel conversion.

use serde::{Deserialize, Serialize};

/// Smallest even dimension handed to a scaler.
const MIN_EVEN_DIMENSION: u32 = 2;

/// Width, height and duration of the base video.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameGeometry {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Duration in seconds
    pub duration: f64,
}

impl FrameGeometry {
    pub fn new(width: u32, height: u32, duration: f64) -> Self {
        Self {
            width,
            height,
            duration,
        }
    }

    /// Horizontal pixel position for a width fraction (floored).
    pub fn px_x(&self, fraction: f64) -> u32 {
        scale_floor(fraction, self.width)
    }

    /// Vertical pixel position for a height fraction (floored).
    pub fn px_y(&self, fraction: f64) -> u32 {
        scale_floor(fraction, self.height)
    }

    /// Even pixel width for a width fraction, rounded down.
    pub fn even_width(&self, fraction: f64) -> u32 {
        floor_even(scale_floor(fraction, self.width))
    }

    /// Even pixel height for a height fraction, rounded down.
    pub fn even_height(&self, fraction: f64) -> u32 {
        floor_even(scale_floor(fraction, self.height))
    }
}

fn scale_floor(fraction: f64, extent: u32) -> u32 {
    let value = (fraction * extent as f64).floor();
    if value.is_finite() && value > 0.0 {
        (value as u32).min(extent)
    } else {
        0
    }
}

/// Round down to the nearest even value, never below the minimum scaler size.
fn floor_even(value: u32) -> u32 {
    (value & !1).max(MIN_EVEN_DIMENSION)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_positions() {
        let geometry = FrameGeometry::new(1920, 1080, 10.0);
        assert_eq!(geometry.px_x(0.5), 960);
        assert_eq!(geometry.px_y(0.5), 540);
        assert_eq!(geometry.px_x(0.0), 0);
        assert_eq!(geometry.px_x(1.0), 1920);
    }

    #[test]
    fn test_even_sizes_round_down() {
        let geometry = FrameGeometry::new(1921, 1081, 10.0);
        // 0.2 * 1921 = 384.2 -> 384
        assert_eq!(geometry.even_width(0.2), 384);
        // 0.3 * 1081 = 324.3 -> 324
        assert_eq!(geometry.even_height(0.3), 324);
        // 0.25 * 1081 = 270.25 -> 270
        assert_eq!(geometry.even_height(0.25), 270);

        let odd = FrameGeometry::new(246, 246, 1.0);
        // 0.5 * 246 = 123 -> 122
        assert_eq!(odd.even_width(0.5), 122);
    }

    #[test]
    fn test_even_sizes_never_exceed_frame() {
        let geometry = FrameGeometry::new(641, 481, 1.0);
        assert_eq!(geometry.even_width(1.0), 640);
        assert_eq!(geometry.even_height(1.0), 480);
    }

    #[test]
    fn test_tiny_sizes_clamp_to_minimum() {
        let geometry = FrameGeometry::new(100, 100, 1.0);
        assert_eq!(geometry.even_width(0.0), 2);
        assert_eq!(geometry.even_height(0.001), 2);
    }
}
