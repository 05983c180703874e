use image::imageops::FilterType;
use image::{DynamicImage, Rgb, RgbImage};

use crate::config::StrokeStyle;
use crate::error::{PrepError, PrepResult};
use crate::geometry::{Rect, Scaler};

/// Down-scaled copy of `image` for on-screen display.
pub fn preview(image: &DynamicImage, scaler: &Scaler) -> DynamicImage {
    let (w, h) = scaler.display_size(image.width(), image.height());
    image.resize_exact(w, h, FilterType::Triangle)
}

/// Slice `image` by `region`; parts outside the bitmap are dropped.
pub fn crop(image: &DynamicImage, region: Rect) -> PrepResult<DynamicImage> {
    let (width, height) = (image.width(), image.height());
    let Some(r) = region.clamp_to(width, height) else {
        return Err(PrepError::EmptyCrop {
            region,
            width,
            height,
        });
    };
    Ok(image.crop_imm(r.x1 as u32, r.y1 as u32, r.width(), r.height()))
}

/// Draw the outline of `rect` centred on its edges.
pub fn stroke_rect(img: &mut RgbImage, rect: Rect, style: StrokeStyle) {
    let s = style.stroke.max(1) as i32;
    let (lo, hi) = (-(s / 2), (s - 1) / 2);
    let color = Rgb(style.color);

    for y in [rect.y1, rect.y2] {
        fill_block(img, rect.x1 + lo, rect.x2 + hi, y + lo, y + hi, color);
    }
    for x in [rect.x1, rect.x2] {
        fill_block(img, x + lo, x + hi, rect.y1 + lo, rect.y2 + hi, color);
    }
}

/// Burn every box into a copy of `image`.
pub fn burn_boxes(image: &DynamicImage, boxes: &[Rect], style: StrokeStyle) -> RgbImage {
    let mut img = image.to_rgb8();
    for b in boxes {
        stroke_rect(&mut img, *b, style);
    }
    img
}

fn fill_block(img: &mut RgbImage, x0: i32, x1: i32, y0: i32, y1: i32, color: Rgb<u8>) {
    let (w, h) = (img.width() as i32, img.height() as i32);
    if w == 0 || h == 0 {
        return;
    }
    let (x0, x1) = (x0.max(0), x1.min(w - 1));
    let (y0, y1) = (y0.max(0), y1.min(h - 1));
    for py in y0..=y1 {
        for px in x0..=x1 {
            img.put_pixel(px as u32, py as u32, color);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Point;

    const RED: StrokeStyle = StrokeStyle::new([255, 0, 0], 3);

    fn gradient(w: u32, h: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, 7])
        }))
    }

    #[test]
    fn test_preview_halves_dimensions() {
        let img = gradient(401, 300);
        let small = preview(&img, &Scaler::default());
        assert_eq!((small.width(), small.height()), (200, 150));
    }

    #[test]
    fn test_crop_slices_exact_region() {
        let img = gradient(500, 400);
        let region = Rect::from_corners(Point::new(100, 50), Point::new(400, 300));
        let out = crop(&img, region).unwrap();
        assert_eq!((out.width(), out.height()), (300, 250));
        assert_eq!(out.to_rgb8().get_pixel(0, 0), &Rgb([100, 50, 7]));
    }

    #[test]
    fn test_crop_clamps_and_rejects_outside() {
        let img = gradient(100, 100);
        let partial = Rect::from_corners(Point::new(50, 50), Point::new(300, 300));
        let out = crop(&img, partial).unwrap();
        assert_eq!((out.width(), out.height()), (50, 50));

        let outside = Rect::from_corners(Point::new(200, 200), Point::new(300, 300));
        assert!(matches!(crop(&img, outside), Err(PrepError::EmptyCrop { .. })));
    }

    #[test]
    fn test_stroke_rect_outlines_only() {
        let mut img = RgbImage::new(40, 40);
        stroke_rect(&mut img, Rect::from_corners(Point::new(10, 10), Point::new(30, 30)), RED);

        for p in [(10, 10), (9, 20), (11, 20), (20, 29), (31, 31), (30, 20)] {
            assert_eq!(img.get_pixel(p.0, p.1), &Rgb([255, 0, 0]), "edge pixel {p:?}");
        }
        for p in [(20, 20), (12, 12), (8, 20), (32, 20)] {
            assert_eq!(img.get_pixel(p.0, p.1), &Rgb([0, 0, 0]), "pixel {p:?} must stay clear");
        }
    }

    #[test]
    fn test_stroke_rect_clips_at_border() {
        let mut img = RgbImage::new(20, 20);
        stroke_rect(&mut img, Rect::from_corners(Point::new(0, 0), Point::new(50, 50)), RED);
        assert_eq!(img.get_pixel(0, 10), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(10, 0), &Rgb([255, 0, 0]));
        assert_eq!(img.get_pixel(19, 19), &Rgb([0, 0, 0]));
    }
}
