//! CPU raster backend over an `image::RgbImage`.
//!
//! The buffer persists across frames; trails come from painting a translucent
//! background over the previous content rather than clearing it.

use std::collections::HashMap;
use std::io::Cursor;

use image::{imageops, ImageFormat, RgbImage};

use crate::font;
use crate::landmark::Point;
use crate::surface::{Blend, Paint, Rect, Surface, TextAlign};
use crate::theme::{clamp_unit, Color};

/// Share of the paint alpha used for the glow halo.
const GLOW_ALPHA: f32 = 0.35;

pub struct RasterSurface {
    image: RgbImage,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbImage::new(width, height),
        }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// The frame as presented to the viewer: mirrored horizontally.
    pub fn presented(&self) -> RgbImage {
        imageops::flip_horizontal(&self.image)
    }

    /// PNG encoding of the presented frame.
    pub fn encode_png(&self) -> Result<Vec<u8>, image::ImageError> {
        let mut bytes = Cursor::new(Vec::new());
        self.presented().write_to(&mut bytes, ImageFormat::Png)?;
        Ok(bytes.into_inner())
    }

    fn blend_pixel(&mut self, x: i64, y: i64, color: Color, coverage: f32, blend: Blend) {
        if x < 0 || y < 0 || x >= i64::from(self.image.width()) || y >= i64::from(self.image.height()) {
            return;
        }
        let a = clamp_unit(color.a * coverage);
        if a <= 0.0 {
            return;
        }
        let px = self.image.get_pixel_mut(x as u32, y as u32);
        let src = [color.r, color.g, color.b];
        for (dst, &s) in px.0.iter_mut().zip(&src) {
            let d = f32::from(*dst);
            let s = f32::from(s);
            let target = match blend {
                Blend::SourceOver => s,
                Blend::Screen => 255.0 - (255.0 - d) * (255.0 - s) / 255.0,
            };
            *dst = (d + (target - d) * a).round().clamp(0.0, 255.0) as u8;
        }
    }

    /// Blend a coverage map, each pixel exactly once.
    fn blend_coverage(&mut self, coverage: &HashMap<(i64, i64), f32>, color: Color, blend: Blend) {
        for (&(x, y), &c) in coverage {
            self.blend_pixel(x, y, color, c, blend);
        }
    }

    /// Coverage of the stroked segments, clipped to the surface plus the pen radius.
    fn rasterize_segments(&self, segments: &[(Point, Point)], width: f32) -> HashMap<(i64, i64), f32> {
        let mut coverage = HashMap::new();
        let thin = width < 1.0;
        let half = (width / 2.0).max(0.5);
        let weight = if thin { width.max(0.0) } else { 1.0 };
        let margin = half + 1.0;
        let lo = Point::new(-margin, -margin);
        let hi = Point::new(
            self.image.width() as f32 + margin,
            self.image.height() as f32 + margin,
        );
        for &(a, b) in segments {
            if !(a.x.is_finite() && a.y.is_finite() && b.x.is_finite() && b.y.is_finite()) {
                continue;
            }
            let Some((a, b)) = clip_segment(a, b, lo, hi) else {
                continue;
            };
            let steps = (b.x - a.x).abs().max((b.y - a.y).abs()).ceil().max(1.0) as usize;
            for i in 0..=steps {
                let t = i as f32 / steps as f32;
                let cx = a.x + (b.x - a.x) * t;
                let cy = a.y + (b.y - a.y) * t;
                if thin {
                    let key = (cx.floor() as i64, cy.floor() as i64);
                    coverage.insert(key, weight);
                    continue;
                }
                let x0 = (cx - half).round() as i64;
                let x1 = (cx + half).round() as i64;
                let y0 = (cy - half).round() as i64;
                let y1 = (cy + half).round() as i64;
                for y in y0..y1.max(y0 + 1) {
                    for x in x0..x1.max(x0 + 1) {
                        coverage.insert((x, y), weight);
                    }
                }
            }
        }
        coverage
    }

    fn stroke_with_glow(&mut self, segments: &[(Point, Point)], width: f32, paint: &Paint) {
        if let Some(glow) = paint.glow {
            let halo = self.rasterize_segments(segments, width + glow.radius);
            self.blend_coverage(&halo, glow.color.fade(GLOW_ALPHA), paint.blend);
        }
        let coverage = self.rasterize_segments(segments, width);
        self.blend_coverage(&coverage, paint.color, paint.blend);
    }
}

impl Surface for RasterSurface {
    fn width(&self) -> u32 {
        self.image.width()
    }

    fn height(&self) -> u32 {
        self.image.height()
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        let (x, w) = if rect.width < 0.0 {
            (rect.x + rect.width, -rect.width)
        } else {
            (rect.x, rect.width)
        };
        let (y, h) = if rect.height < 0.0 {
            (rect.y + rect.height, -rect.height)
        } else {
            (rect.y, rect.height)
        };
        if !(x.is_finite() && y.is_finite() && w.is_finite() && h.is_finite()) {
            return;
        }
        // Sub-pixel rects (particle flecks) land on one pixel with partial coverage.
        if w < 1.0 || h < 1.0 {
            let coverage = w.min(1.0) * h.min(1.0);
            let cx = (x + w / 2.0).floor() as i64;
            let cy = (y + h / 2.0).floor() as i64;
            self.blend_pixel(cx, cy, paint.color, coverage, paint.blend);
            return;
        }
        let max_x = self.image.width() as f32;
        let max_y = self.image.height() as f32;
        let x0 = (x - 0.5).ceil().max(0.0) as i64;
        let x1 = (x + w - 0.5).ceil().min(max_x) as i64;
        let y0 = (y - 0.5).ceil().max(0.0) as i64;
        let y1 = (y + h - 0.5).ceil().min(max_y) as i64;
        for py in y0..y1 {
            for px in x0..x1 {
                self.blend_pixel(px, py, paint.color, 1.0, paint.blend);
            }
        }
    }

    fn fill_polygon(&mut self, points: &[Point], paint: &Paint) {
        if points.len() < 3 || points.iter().any(|p| !(p.x.is_finite() && p.y.is_finite())) {
            return;
        }
        let min_y = points.iter().map(|p| p.y).fold(f32::INFINITY, f32::min);
        let max_y = points.iter().map(|p| p.y).fold(f32::NEG_INFINITY, f32::max);
        let min_x = points.iter().map(|p| p.x).fold(f32::INFINITY, f32::min);
        let max_x = points.iter().map(|p| p.x).fold(f32::NEG_INFINITY, f32::max);
        let width = i64::from(self.image.width());
        let height = i64::from(self.image.height());

        let mut filled = false;
        let mut crossings = Vec::with_capacity(points.len());
        let row_start = ((min_y - 0.5).ceil() as i64).max(0);
        let row_end = ((max_y - 0.5).ceil() as i64).min(height);
        for py in row_start..row_end {
            let yc = py as f32 + 0.5;
            crossings.clear();
            for (i, a) in points.iter().enumerate() {
                let b = points[(i + 1) % points.len()];
                if (a.y <= yc && b.y > yc) || (b.y <= yc && a.y > yc) {
                    crossings.push(a.x + (yc - a.y) / (b.y - a.y) * (b.x - a.x));
                }
            }
            crossings.sort_by(f32::total_cmp);
            for span in crossings.chunks_exact(2) {
                let x0 = ((span[0] - 0.5).ceil() as i64).max(0);
                let x1 = ((span[1] - 0.5).ceil() as i64).min(width);
                for px in x0..x1 {
                    self.blend_pixel(px, py, paint.color, 1.0, paint.blend);
                    filled = true;
                }
            }
        }

        // Shapes smaller than a pixel still leave a faint mark at their centre.
        if !filled {
            let area = ((max_x - min_x) * (max_y - min_y)).min(1.0);
            let cx = ((min_x + max_x) / 2.0).floor() as i64;
            let cy = ((min_y + max_y) / 2.0).floor() as i64;
            self.blend_pixel(cx, cy, paint.color, area, paint.blend);
        }
    }

    fn stroke_path(&mut self, points: &[Point], width: f32, paint: &Paint) {
        let segments: Vec<(Point, Point)> = points.windows(2).map(|w| (w[0], w[1])).collect();
        self.stroke_with_glow(&segments, width, paint);
    }

    fn stroke_segments(&mut self, segments: &[(Point, Point)], width: f32, paint: &Paint) {
        self.stroke_with_glow(segments, width, paint);
    }

    fn draw_text(&mut self, text: &str, anchor: Point, size: f32, align: TextAlign, paint: &Paint) {
        let cell = font::cell_size(size);
        let text_width = font::measure(text, cell) as f32;
        let left = match align {
            TextAlign::Left => anchor.x,
            TextAlign::Center => anchor.x - text_width / 2.0,
        };
        let top = anchor.y - (font::GLYPH_ROWS * cell) as f32;
        let cell_f = cell as f32;
        let advance = ((font::GLYPH_COLS + 1) * cell) as f32;

        let mut halo = HashMap::new();
        let mut body = HashMap::new();
        let spread = paint.glow.map_or(0, |g| (g.radius / 4.0).ceil() as i64);
        for (i, c) in text.chars().enumerate() {
            let gx = left + i as f32 * advance;
            for (col, row) in font::lit_cells(c) {
                let x0 = (gx + col as f32 * cell_f).round() as i64;
                let y0 = (top + row as f32 * cell_f).round() as i64;
                for y in y0..y0 + cell as i64 {
                    for x in x0..x0 + cell as i64 {
                        body.insert((x, y), 1.0);
                        for dy in -spread..=spread {
                            for dx in -spread..=spread {
                                halo.insert((x + dx, y + dy), 1.0);
                            }
                        }
                    }
                }
            }
        }

        if let Some(glow) = paint.glow {
            self.blend_coverage(&halo, glow.color.fade(GLOW_ALPHA), paint.blend);
        }
        self.blend_coverage(&body, paint.color, paint.blend);
    }
}

/// Liang-Barsky clip of segment `a`-`b` against the box `lo`..`hi`.
fn clip_segment(a: Point, b: Point, lo: Point, hi: Point) -> Option<(Point, Point)> {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    let mut t0 = 0.0_f32;
    let mut t1 = 1.0_f32;
    for (p, q) in [
        (-dx, a.x - lo.x),
        (dx, hi.x - a.x),
        (-dy, a.y - lo.y),
        (dy, hi.y - a.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            if r > t1 {
                return None;
            }
            t0 = t0.max(r);
        } else {
            if r < t0 {
                return None;
            }
            t1 = t1.min(r);
        }
    }
    Some((
        Point::new(a.x + dx * t0, a.y + dy * t0),
        Point::new(a.x + dx * t1, a.y + dy * t1),
    ))
}
