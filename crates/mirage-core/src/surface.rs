//! Immediate-mode drawing capability the renderer targets.
//!
//! Coordinates are device pixels. Backends decide how to rasterise; the
//! renderer only issues primitives.

use crate::landmark::Point;
use crate::theme::Color;

/// How a primitive is composited onto the existing content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Blend {
    #[default]
    SourceOver,
    /// Additive-like brightening, used for the double glitch pass.
    Screen,
}

/// Blurred halo drawn beneath a primitive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glow {
    pub color: Color,
    pub radius: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Paint {
    pub color: Color,
    pub blend: Blend,
    pub glow: Option<Glow>,
}

impl Paint {
    pub fn new(color: Color) -> Self {
        Self {
            color,
            blend: Blend::SourceOver,
            glow: None,
        }
    }

    pub fn blend(mut self, blend: Blend) -> Self {
        self.blend = blend;
        self
    }

    pub fn glow(mut self, color: Color, radius: f32) -> Self {
        self.glow = Some(Glow { color, radius });
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TextAlign {
    Left,
    #[default]
    Center,
}

pub trait Surface {
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    fn fill_rect(&mut self, rect: Rect, paint: &Paint);
    fn fill_polygon(&mut self, points: &[Point], paint: &Paint);
    /// Stroke an open polyline.
    fn stroke_path(&mut self, points: &[Point], width: f32, paint: &Paint);
    /// Stroke independent segments in one call (mesh edges).
    fn stroke_segments(&mut self, segments: &[(Point, Point)], width: f32, paint: &Paint);
    /// Draw a single line of text; `anchor.y` is the baseline.
    fn draw_text(&mut self, text: &str, anchor: Point, size: f32, align: TextAlign, paint: &Paint);
}

/// One primitive captured by [`RecordingSurface`].
#[derive(Debug, Clone, PartialEq)]
pub enum DrawCommand {
    FillRect { rect: Rect, paint: Paint },
    FillPolygon { points: Vec<Point>, paint: Paint },
    StrokePath { points: Vec<Point>, width: f32, paint: Paint },
    StrokeSegments { count: usize, width: f32, paint: Paint },
    Text { text: String, anchor: Point, size: f32, paint: Paint },
}

impl DrawCommand {
    pub fn paint(&self) -> &Paint {
        match self {
            DrawCommand::FillRect { paint, .. }
            | DrawCommand::FillPolygon { paint, .. }
            | DrawCommand::StrokePath { paint, .. }
            | DrawCommand::StrokeSegments { paint, .. }
            | DrawCommand::Text { paint, .. } => paint,
        }
    }
}

/// Surface that records primitives instead of rasterising them.
#[derive(Debug, Clone, Default)]
pub struct RecordingSurface {
    width: u32,
    height: u32,
    pub commands: Vec<DrawCommand>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            commands: Vec::new(),
        }
    }

    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.commands.iter().filter_map(|c| match c {
            DrawCommand::Text { text, .. } => Some(text.as_str()),
            _ => None,
        })
    }
}

impl Surface for RecordingSurface {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fill_rect(&mut self, rect: Rect, paint: &Paint) {
        self.commands.push(DrawCommand::FillRect { rect, paint: *paint });
    }

    fn fill_polygon(&mut self, points: &[Point], paint: &Paint) {
        self.commands.push(DrawCommand::FillPolygon {
            points: points.to_vec(),
            paint: *paint,
        });
    }

    fn stroke_path(&mut self, points: &[Point], width: f32, paint: &Paint) {
        self.commands.push(DrawCommand::StrokePath {
            points: points.to_vec(),
            width,
            paint: *paint,
        });
    }

    fn stroke_segments(&mut self, segments: &[(Point, Point)], width: f32, paint: &Paint) {
        self.commands.push(DrawCommand::StrokeSegments {
            count: segments.len(),
            width,
            paint: *paint,
        });
    }

    fn draw_text(&mut self, text: &str, anchor: Point, size: f32, _align: TextAlign, paint: &Paint) {
        self.commands.push(DrawCommand::Text {
            text: text.to_string(),
            anchor,
            size,
            paint: *paint,
        });
    }
}
