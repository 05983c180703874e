use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A pixel position in either display or original space.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

/// Axis-aligned rectangle with `x1 <= x2` and `y1 <= y2`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rect {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Rect {
    /// Build a rectangle from two drag endpoints in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            x1: a.x.min(b.x),
            y1: a.y.min(b.y),
            x2: a.x.max(b.x),
            y2: a.y.max(b.y),
        }
    }

    pub fn top_left(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    pub fn bottom_right(&self) -> Point {
        Point::new(self.x2, self.y2)
    }

    pub fn width(&self) -> u32 {
        self.x2.abs_diff(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.abs_diff(self.y1)
    }

    /// A click without movement in one axis produces nothing usable.
    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// Intersection with an image of the given size, or `None` when empty.
    pub fn clamp_to(&self, width: u32, height: u32) -> Option<Rect> {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        let clamped = Rect {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
        };
        (!clamped.is_degenerate()).then_some(clamped)
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({},{})-({},{})", self.x1, self.y1, self.x2, self.y2)
    }
}

// ── Scaler ──────────────────────────────────────────────────────────────────

/// Maps between the down-scaled preview and the full-resolution image.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Scaler {
    factor: f64,
}

impl Scaler {
    pub fn new(factor: f64) -> Result<Self, ConfigError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "scale factor must be a positive number, got {factor}"
            )));
        }
        Ok(Self { factor })
    }

    pub fn to_display(&self, p: Point) -> Point {
        Point::new(
            (p.x as f64 * self.factor).floor() as i32,
            (p.y as f64 * self.factor).floor() as i32,
        )
    }

    pub fn to_original(&self, p: Point) -> Point {
        Point::new(
            (p.x as f64 / self.factor).floor() as i32,
            (p.y as f64 / self.factor).floor() as i32,
        )
    }

    pub fn rect_to_display(&self, r: Rect) -> Rect {
        Rect::from_corners(self.to_display(r.top_left()), self.to_display(r.bottom_right()))
    }

    pub fn rect_to_original(&self, r: Rect) -> Rect {
        Rect::from_corners(
            self.to_original(r.top_left()),
            self.to_original(r.bottom_right()),
        )
    }

    /// Preview dimensions for an image of `width` x `height`.
    pub fn display_size(&self, width: u32, height: u32) -> (u32, u32) {
        let w = (width as f64 * self.factor).floor() as u32;
        let h = (height as f64 * self.factor).floor() as u32;
        (w.max(1), h.max(1))
    }
}

impl Default for Scaler {
    fn default() -> Self {
        Self { factor: 0.5 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_corners_normalizes_any_direction() {
        let forward = Rect::from_corners(Point::new(10, 20), Point::new(50, 80));
        let backward = Rect::from_corners(Point::new(50, 80), Point::new(10, 20));
        let mixed = Rect::from_corners(Point::new(50, 20), Point::new(10, 80));
        assert_eq!(forward, backward);
        assert_eq!(forward, mixed);
        assert_eq!(forward.width(), 40);
        assert_eq!(forward.height(), 60);
    }

    #[test]
    fn test_round_trip_drift_is_at_most_one_pixel() {
        let scaler = Scaler::default();
        for x in 0..200 {
            for y in [0, 1, 7, 99, 100, 101] {
                let back = scaler.to_original(scaler.to_display(Point::new(x, y)));
                assert!((back.x - x).abs() <= 1, "x drift at {x}");
                assert!((back.y - y).abs() <= 1, "y drift at {y}");
            }
        }
    }

    #[test]
    fn test_region_maps_between_spaces() {
        let scaler = Scaler::default();
        let display = Rect::from_corners(Point::new(50, 25), Point::new(200, 150));
        let original = scaler.rect_to_original(display);
        assert_eq!(original, Rect::from_corners(Point::new(100, 50), Point::new(400, 300)));
        assert_eq!(scaler.rect_to_display(original), display);
    }

    #[test]
    fn test_to_display_floors() {
        let scaler = Scaler::default();
        assert_eq!(scaler.to_display(Point::new(7, 3)), Point::new(3, 1));
        assert_eq!(scaler.display_size(801, 1), (400, 1));
    }

    #[test]
    fn test_rejects_bad_factor() {
        assert!(Scaler::new(0.0).is_err());
        assert!(Scaler::new(-0.5).is_err());
        assert!(Scaler::new(f64::NAN).is_err());
        assert!(Scaler::new(0.25).is_ok());
    }

    #[test]
    fn test_clamp_to_image() {
        let r = Rect::from_corners(Point::new(-10, 5), Point::new(120, 40));
        assert_eq!(
            r.clamp_to(100, 100),
            Some(Rect::from_corners(Point::new(0, 5), Point::new(100, 40)))
        );
        let outside = Rect::from_corners(Point::new(150, 150), Point::new(200, 200));
        assert_eq!(outside.clamp_to(100, 100), None);
    }
}
