//! Per-frame drawing: trail fade, background texture, face mesh passes and HUD.
//!
//! The renderer owns the surface it draws on. That surface is the only state
//! carried between frames: trails come from fading the previous content.

use std::f32::consts::TAU;

use crate::classifier::DerivedFrameSignals;
use crate::geometry::TransformedGeometry;
use crate::landmark::{index, Point};
use crate::surface::{Blend, Paint, Rect, Surface, TextAlign};
use crate::theme::{warning, Color, Theme};
use crate::topology::{Edge, MeshTopology};

/// Audio level above which size/opacity laws stop growing.
pub const AUDIO_VISUAL_CEILING: f32 = 3.0;

pub const IDLE_CAPTION: &str = "ACQUIRING_TARGET...";
pub const WARNING_CAPTION: &str = "! WARNING: BIO-SIGNATURE UNSTABLE !";
pub const WARNING_SUBCAPTION: &str = "DETECTED ABNORMAL JAW ARTIFACT";

const BACKGROUND_BARS: usize = 32;
const IDLE_BARS: usize = 64;
const IDLE_BAR_MAX_HEIGHT: f32 = 100.0;
const IDLE_BAR_AUDIO_GATE: f32 = 0.1;
const GLITCH_TINT_ALPHA: f32 = 21.0 / 255.0;
const BRACKET_PAD: f32 = 0.08;
const BRACKET_ARM: f32 = 30.0;
const BRACKET_GLOW_LEVEL: f32 = 0.5;
const RETICLE_SEGMENTS: usize = 64;

/// Inputs for one frame.
pub struct RenderFrame<'a> {
    pub theme: &'a Theme,
    pub signals: &'a DerivedFrameSignals,
    /// `None` when no face was tracked this frame.
    pub geometry: Option<&'a TransformedGeometry>,
    pub topology: &'a MeshTopology,
    /// Raw frequency magnitudes; `None` when audio capture is unavailable.
    pub spectrum: Option<&'a [u8]>,
    /// Wall-clock milliseconds, drives the sweep line, caption flashing and reticle pulse.
    pub time_ms: f64,
}

/// Opacity of the background wash painted over the previous frame.
///
/// Louder audio lowers it, leaving longer trails, down to a floor of 0.1.
pub fn trail_alpha(audio_level: f32, is_warning: bool) -> f32 {
    if is_warning {
        warning::TRAIL.a
    } else {
        (0.25 - visual_level(audio_level) * 0.1).max(0.1)
    }
}

fn visual_level(audio_level: f32) -> f32 {
    if audio_level.is_nan() {
        0.0
    } else {
        audio_level.clamp(0.0, AUDIO_VISUAL_CEILING)
    }
}

/// Maps landmark-space pixels (normalized × viewport) to device pixels:
/// translate to viewport centre, scale by `scale × stretch`, translate back by
/// the centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshTransform {
    pub sx: f32,
    pub sy: f32,
    pub tx: f32,
    pub ty: f32,
}

impl MeshTransform {
    pub fn new(geometry: &TransformedGeometry, width: f32, height: f32, offset: (f32, f32)) -> Self {
        let sx = geometry.scale * geometry.stretch_x;
        let sy = geometry.scale * geometry.stretch_y;
        Self {
            sx,
            sy,
            tx: width / 2.0 + offset.0 - geometry.centroid.x * width * sx,
            ty: height / 2.0 + offset.1 - geometry.centroid.y * height * sy,
        }
    }

    pub fn apply(&self, p: Point) -> Point {
        Point::new(p.x * self.sx + self.tx, p.y * self.sy + self.ty)
    }

    /// Device width of a stroke specified in landmark space.
    pub fn stroke_scale(&self) -> f32 {
        (self.sx * self.sy).abs().sqrt()
    }
}

#[derive(Debug, Clone, Copy)]
struct PassColors {
    primary: Color,
    secondary: Color,
}

pub struct Renderer<S: Surface> {
    surface: S,
}

impl<S: Surface> Renderer<S> {
    pub fn new(surface: S) -> Self {
        Self { surface }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn into_surface(self) -> S {
        self.surface
    }

    pub fn render(&mut self, frame: &RenderFrame<'_>) {
        let signals = frame.signals;
        let surface = &mut self.surface;
        let w = surface.width() as f32;
        let h = surface.height() as f32;

        fade_trail(surface, frame.theme, signals, w, h);
        draw_background(surface, frame, w, h);

        let Some(geometry) = frame.geometry else {
            draw_idle(surface, frame, w, h);
            return;
        };

        let (primary, secondary, glitch) = if signals.is_warning {
            (warning::PRIMARY, warning::SECONDARY, warning::GLITCH)
        } else {
            (frame.theme.primary, frame.theme.secondary, frame.theme.glitch_a)
        };

        if signals.is_glitch || signals.is_warning {
            let glitch_pass = PassColors {
                primary: glitch,
                secondary,
            };
            let main_pass = PassColors { primary, secondary };
            draw_mesh_pass(surface, frame, geometry, glitch_pass, signals.jitter, Blend::Screen);
            draw_mesh_pass(surface, frame, geometry, main_pass, (0.0, 0.0), Blend::Screen);
        } else {
            let pass = PassColors { primary, secondary };
            draw_mesh_pass(surface, frame, geometry, pass, (0.0, 0.0), Blend::SourceOver);
        }

        if signals.is_warning {
            draw_warning_hud(surface, frame.time_ms, w, h);
        }
    }
}

fn fade_trail<S: Surface + ?Sized>(
    surface: &mut S,
    theme: &Theme,
    signals: &DerivedFrameSignals,
    w: f32,
    h: f32,
) {
    let color = if signals.is_warning {
        warning::TRAIL
    } else {
        theme
            .background
            .with_alpha(trail_alpha(signals.audio_level, false))
    };
    surface.fill_rect(Rect::new(0.0, 0.0, w, h), &Paint::new(color));
}

fn draw_background<S: Surface + ?Sized>(surface: &mut S, frame: &RenderFrame<'_>, w: f32, h: f32) {
    let signals = frame.signals;

    if signals.is_warning {
        let paint = Paint::new(warning::SCANLINE);
        for y in (0..surface.height()).step_by(8).filter(|y| y % 16 == 0) {
            surface.fill_rect(Rect::new(0.0, y as f32, w, 2.0), &paint);
        }
        return;
    }

    if signals.is_glitch {
        let tint = frame.theme.primary.with_alpha(GLITCH_TINT_ALPHA);
        surface.fill_rect(Rect::new(0.0, 0.0, w, h), &Paint::new(tint));
        return;
    }

    let level = visual_level(signals.audio_level);
    let paint = Paint::new(frame.theme.dim.with_alpha(0.05 + level * 0.1));
    match frame.spectrum.filter(|s| !s.is_empty()) {
        Some(spectrum) => {
            let bar_width = w / BACKGROUND_BARS as f32;
            for i in 0..BACKGROUND_BARS {
                let magnitude = spectrum.get(i * 2).copied().unwrap_or(0);
                let bar_height = f32::from(magnitude) / 255.0 * h * 0.5;
                surface.fill_rect(
                    Rect::new(i as f32 * bar_width, h - bar_height, bar_width - 2.0, bar_height),
                    &paint,
                );
            }
        }
        None => {
            for y in (0..surface.height()).step_by(4) {
                surface.fill_rect(Rect::new(0.0, y as f32, w, 1.0), &paint);
            }
        }
    }
}

fn draw_idle<S: Surface + ?Sized>(surface: &mut S, frame: &RenderFrame<'_>, w: f32, h: f32) {
    let primary = frame.theme.primary;
    let phase = (frame.time_ms / 1000.0).sin() as f32;
    let scan_y = (phase * 0.5 + 0.5) * h;

    surface.stroke_path(
        &[Point::new(0.0, scan_y), Point::new(w, scan_y)],
        2.0,
        &Paint::new(primary),
    );
    surface.draw_text(
        IDLE_CAPTION,
        Point::new(w / 2.0, scan_y - 10.0),
        16.0,
        TextAlign::Center,
        &Paint::new(primary),
    );

    let Some(spectrum) = frame.spectrum else {
        return;
    };
    if frame.signals.audio_level <= IDLE_BAR_AUDIO_GATE {
        return;
    }
    let bar_width = w / IDLE_BARS as f32;
    let paint = Paint::new(primary);
    for i in 0..IDLE_BARS {
        let magnitude = spectrum.get(i).copied().unwrap_or(0);
        let bar_height = f32::from(magnitude) / 255.0 * IDLE_BAR_MAX_HEIGHT;
        surface.fill_rect(
            Rect::new(i as f32 * bar_width, h - bar_height, bar_width - 1.0, bar_height),
            &paint,
        );
    }
}

fn edge_segments(points: &[Point], edges: &[Edge]) -> Vec<(Point, Point)> {
    edges
        .iter()
        .filter_map(|&(a, b)| Some((*points.get(a)?, *points.get(b)?)))
        .collect()
}

fn diamond(t: &MeshTransform, center: Point, size: f32) -> [Point; 4] {
    [
        t.apply(Point::new(center.x, center.y - size)),
        t.apply(Point::new(center.x + size, center.y)),
        t.apply(Point::new(center.x, center.y + size)),
        t.apply(Point::new(center.x - size, center.y)),
    ]
}

fn draw_mesh_pass<S: Surface + ?Sized>(
    surface: &mut S,
    frame: &RenderFrame<'_>,
    geometry: &TransformedGeometry,
    colors: PassColors,
    offset: (f32, f32),
    blend: Blend,
) {
    let w = surface.width() as f32;
    let h = surface.height() as f32;
    let audio = frame.signals.audio_level;
    let level = visual_level(audio);
    let t = MeshTransform::new(geometry, w, h, offset);
    let stroke_scale = t.stroke_scale();

    let local: Vec<Point> = geometry
        .landmarks
        .points
        .iter()
        .map(|p| Point::new(p.x * w, p.y * h))
        .collect();
    let device: Vec<Point> = local.iter().map(|&p| t.apply(p)).collect();

    // Wireframe
    let boost = (level * 0.5).min(1.0);
    let tessellation = edge_segments(&device, &frame.topology.tessellation);
    surface.stroke_segments(
        &tessellation,
        (0.5 + boost) * stroke_scale,
        &Paint::new(colors.primary.fade(0.2 + boost * 0.3)).blend(blend),
    );
    let feature_paint = Paint::new(colors.primary).blend(blend);
    for group in frame.topology.feature_groups() {
        let segments = edge_segments(&device, group);
        surface.stroke_segments(&segments, (0.8 + boost) * stroke_scale, &feature_paint);
    }

    // Particles
    let key_size = 3.0 + level * 2.0;
    let contour_size = 1.5 + level;
    let key_paint = Paint::new(colors.primary).blend(blend);
    let contour_paint = Paint::new(colors.secondary).blend(blend);
    let fleck_paint = Paint::new(colors.secondary.fade(0.4 + level * 0.4)).blend(blend);
    for (i, &p) in local.iter().enumerate() {
        if index::KEY_FEATURES.contains(&i) {
            surface.fill_polygon(&diamond(&t, p, key_size), &key_paint);
        } else if i % 10 == 0 || index::JAW_CONTOUR.contains(&i) {
            surface.fill_polygon(&diamond(&t, p, contour_size), &contour_paint);
        } else if i % 3 == 0 {
            let corner = t.apply(Point::new(p.x - 0.5, p.y - 0.5));
            surface.fill_rect(Rect::new(corner.x, corner.y, t.sx, t.sy), &fleck_paint);
        }
    }

    draw_brackets(surface, geometry, &t, colors, audio, blend, w, h);
}

#[allow(clippy::too_many_arguments)]
fn draw_brackets<S: Surface + ?Sized>(
    surface: &mut S,
    geometry: &TransformedGeometry,
    t: &MeshTransform,
    colors: PassColors,
    audio_level: f32,
    blend: Blend,
    w: f32,
    h: f32,
) {
    let b = &geometry.bounds;
    let pad = BRACKET_PAD * w;
    let lx = b.min_x * w - pad;
    let ly = b.min_y * h - pad;
    let lw = b.width() * w + pad * 2.0;
    let lh = b.height() * h + pad * 2.0;

    // Widths and arm lengths are divided by the transform so brackets keep a
    // constant on-screen weight whatever the face scale.
    let local_width = 1.0 / (geometry.scale * geometry.stretch_x);
    let arm = BRACKET_ARM / (geometry.scale * geometry.stretch_y);

    let mut paint = Paint::new(colors.secondary).blend(blend);
    if audio_level > BRACKET_GLOW_LEVEL {
        paint = paint.glow(colors.primary, 10.0);
    }

    let corners = [
        [(lx, ly + arm), (lx, ly), (lx + arm, ly)],
        [(lx + lw - arm, ly), (lx + lw, ly), (lx + lw, ly + arm)],
        [(lx + lw, ly + lh - arm), (lx + lw, ly + lh), (lx + lw - arm, ly + lh)],
        [(lx + arm, ly + lh), (lx, ly + lh), (lx, ly + lh - arm)],
    ];
    for corner in corners {
        let path = corner.map(|(x, y)| t.apply(Point::new(x, y)));
        surface.stroke_path(&path, local_width * t.stroke_scale(), &paint);
    }
}

fn draw_warning_hud<S: Surface + ?Sized>(surface: &mut S, time_ms: f64, w: f32, h: f32) {
    let caption_y = h * 0.2;

    if (time_ms / 100.0).floor() as i64 % 2 == 0 {
        surface.draw_text(
            WARNING_CAPTION,
            Point::new(w / 2.0, caption_y),
            32.0,
            TextAlign::Center,
            &Paint::new(warning::CAPTION).glow(warning::CAPTION_GLOW, 20.0),
        );
    }

    surface.draw_text(
        WARNING_SUBCAPTION,
        Point::new(w / 2.0, caption_y + 30.0),
        16.0,
        TextAlign::Center,
        &Paint::new(warning::SUBCAPTION).glow(warning::CAPTION_GLOW, 20.0),
    );

    let radius = 100.0 + (time_ms / 200.0).sin() as f32 * 20.0;
    let center = Point::new(w / 2.0, h / 2.0);
    let ring: Vec<Point> = (0..=RETICLE_SEGMENTS)
        .map(|i| {
            let a = i as f32 / RETICLE_SEGMENTS as f32 * TAU;
            Point::new(center.x + radius * a.cos(), center.y + radius * a.sin())
        })
        .collect();
    surface.stroke_path(
        &ring,
        2.0,
        &Paint::new(warning::RETICLE).glow(warning::CAPTION_GLOW, 20.0),
    );
}
