//! Colour presets and avatar morph modes, selected externally and read-only to the core.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ParseError {
    #[error("unknown theme '{0}' (expected matrix, cyber_punk or golden_data)")]
    Theme(String),
    #[error("unknown gender mode '{0}' (expected neutral, female or male)")]
    Gender(String),
}

/// Straight (non-premultiplied) RGBA colour with a float alpha.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f32,
}

impl Color {
    pub const WHITE: Color = Color::rgb(255, 255, 255);

    pub const fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub const fn rgba(r: u8, g: u8, b: u8, a: f32) -> Self {
        Self { r, g, b, a }
    }

    /// Replace the alpha, clamped to `[0, 1]`.
    pub fn with_alpha(self, a: f32) -> Self {
        Self {
            a: clamp_unit(a),
            ..self
        }
    }

    /// Multiply the alpha, clamped to `[0, 1]`.
    pub fn fade(self, factor: f32) -> Self {
        self.with_alpha(self.a * factor)
    }
}

/// Clamp to `[0, 1]`, mapping NaN to 0.
pub fn clamp_unit(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(0.0, 1.0)
    }
}

/// An immutable colour record for one preset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Theme {
    pub background: Color,
    pub primary: Color,
    pub secondary: Color,
    pub dim: Color,
    pub glitch_a: Color,
    pub glitch_b: Color,
}

pub const MATRIX: Theme = Theme {
    background: Color::rgb(0x01, 0x02, 0x02),
    primary: Color::rgb(0x00, 0xff, 0xcc),
    secondary: Color::rgba(0, 255, 200, 0.6),
    dim: Color::rgba(0, 50, 40, 0.05),
    glitch_a: Color::rgb(0xff, 0x00, 0x55),
    glitch_b: Color::rgb(0x00, 0xff, 0xcc),
};

pub const CYBER_PUNK: Theme = Theme {
    background: Color::rgb(0x05, 0x00, 0x05),
    primary: Color::rgb(0xff, 0x00, 0xff),
    secondary: Color::rgba(0, 200, 255, 0.8),
    dim: Color::rgba(50, 0, 50, 0.05),
    glitch_a: Color::rgb(0x00, 0xff, 0xff),
    glitch_b: Color::rgb(0xff, 0xff, 0x00),
};

pub const GOLDEN_DATA: Theme = Theme {
    background: Color::rgb(0x05, 0x02, 0x00),
    primary: Color::rgb(0xff, 0xcc, 0x00),
    secondary: Color::rgba(255, 150, 0, 0.6),
    dim: Color::rgba(50, 20, 0, 0.05),
    glitch_a: Color::WHITE,
    glitch_b: Color::rgb(0xff, 0x00, 0x00),
};

/// Fixed palette that overrides the theme while warning mode is active.
pub mod warning {
    use super::Color;

    pub const TRAIL: Color = Color::rgba(20, 0, 0, 0.3);
    pub const SCANLINE: Color = Color::rgba(255, 0, 0, 0.1);
    pub const PRIMARY: Color = Color::rgb(0xff, 0x1a, 0x1a);
    pub const SECONDARY: Color = Color::rgba(255, 20, 20, 0.8);
    pub const GLITCH: Color = Color::WHITE;
    pub const CAPTION: Color = Color::rgba(255, 0, 0, 0.8);
    pub const CAPTION_GLOW: Color = Color::rgb(255, 0, 0);
    pub const SUBCAPTION: Color = Color::rgba(255, 100, 100, 0.9);
    pub const RETICLE: Color = Color::rgba(255, 0, 0, 0.5);
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ThemeKind {
    #[default]
    Matrix,
    CyberPunk,
    GoldenData,
}

impl ThemeKind {
    pub const ALL: [ThemeKind; 3] = [ThemeKind::Matrix, ThemeKind::CyberPunk, ThemeKind::GoldenData];

    pub fn theme(self) -> &'static Theme {
        match self {
            ThemeKind::Matrix => &MATRIX,
            ThemeKind::CyberPunk => &CYBER_PUNK,
            ThemeKind::GoldenData => &GOLDEN_DATA,
        }
    }
}

impl fmt::Display for ThemeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ThemeKind::Matrix => "MATRIX",
            ThemeKind::CyberPunk => "CYBER_PUNK",
            ThemeKind::GoldenData => "GOLDEN_DATA",
        })
    }
}

impl FromStr for ThemeKind {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "matrix" => Ok(ThemeKind::Matrix),
            "cyber_punk" | "cyberpunk" => Ok(ThemeKind::CyberPunk),
            "golden_data" | "golden" => Ok(ThemeKind::GoldenData),
            _ => Err(ParseError::Theme(s.to_string())),
        }
    }
}

/// Avatar morph mode; governs jaw reshaping and stretch factors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum GenderMode {
    #[default]
    Neutral,
    FemaleLean,
    MaleLean,
}

impl GenderMode {
    pub const ALL: [GenderMode; 3] = [GenderMode::Neutral, GenderMode::FemaleLean, GenderMode::MaleLean];
}

impl fmt::Display for GenderMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            GenderMode::Neutral => "NEUTRAL",
            GenderMode::FemaleLean => "FEMALE",
            GenderMode::MaleLean => "MALE",
        })
    }
}

impl FromStr for GenderMode {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "neutral" => Ok(GenderMode::Neutral),
            "female" | "female_lean" => Ok(GenderMode::FemaleLean),
            "male" | "male_lean" => Ok(GenderMode::MaleLean),
            _ => Err(ParseError::Gender(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_theme_names_roundtrip() {
        for kind in ThemeKind::ALL {
            assert_eq!(kind.to_string().parse::<ThemeKind>(), Ok(kind));
        }
        assert_eq!("Golden".parse::<ThemeKind>(), Ok(ThemeKind::GoldenData));
        assert_eq!("cyber-punk".parse::<ThemeKind>(), Ok(ThemeKind::CyberPunk));
    }

    #[test]
    fn test_unknown_names_rejected() {
        assert!(matches!("vapor".parse::<ThemeKind>(), Err(ParseError::Theme(_))));
        assert!(matches!("robot".parse::<GenderMode>(), Err(ParseError::Gender(_))));
    }

    #[test]
    fn test_gender_parse() {
        assert_eq!("FEMALE".parse::<GenderMode>(), Ok(GenderMode::FemaleLean));
        assert_eq!(" male ".parse::<GenderMode>(), Ok(GenderMode::MaleLean));
    }

    #[test]
    fn test_alpha_clamped() {
        assert_eq!(Color::WHITE.with_alpha(3.0).a, 1.0);
        assert_eq!(Color::WHITE.with_alpha(-1.0).a, 0.0);
        assert_eq!(Color::WHITE.with_alpha(f32::NAN).a, 0.0);
        assert!((MATRIX.secondary.fade(0.5).a - 0.3).abs() < 1e-6);
    }
}
