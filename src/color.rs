use std::fmt;
use std::str::FromStr;

use image::Rgb;
use palette::{FromColor, Hsl, IntoColor, Lab, Srgb};

use crate::error::MatchError;

/// Core color type used throughout the pipeline.
/// Named sRGB u8 channels, so channel order is never positional.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_srgb_u8(self) -> Srgb<u8> {
        Srgb::new(self.r, self.g, self.b)
    }

    /// Convert to CIELAB (for nearest-neighbour classification and segmentation).
    pub fn to_lab(self) -> Lab {
        let srgb_f32: Srgb<f32> = self.to_srgb_u8().into_format();
        srgb_f32.into_color()
    }

    /// Convert to hue/saturation/lightness (for color-wheel rotation).
    pub fn to_hsl(self) -> Hsl {
        let srgb_f32: Srgb<f32> = self.to_srgb_u8().into_format();
        srgb_f32.into_color()
    }

    /// Create from HSL, rounding each channel to the nearest integer.
    pub fn from_hsl(hsl: Hsl) -> Self {
        let srgb_f32: Srgb<f32> = Srgb::from_color(hsl);
        Self::from_srgb_f32_clamped(srgb_f32)
    }

    /// Clamp an Srgb<f32> to [0, 1] and convert to Color.
    fn from_srgb_f32_clamped(srgb: Srgb<f32>) -> Self {
        let r = (srgb.red.clamp(0.0, 1.0) * 255.0).round() as u8;
        let g = (srgb.green.clamp(0.0, 1.0) * 255.0).round() as u8;
        let b = (srgb.blue.clamp(0.0, 1.0) * 255.0).round() as u8;
        Self { r, g, b }
    }

    /// Squared euclidean distance in RGB space.
    pub fn distance_sq(self, other: Color) -> u32 {
        let dr = self.r as i32 - other.r as i32;
        let dg = self.g as i32 - other.g as i32;
        let db = self.b as i32 - other.b as i32;
        (dr * dr + dg * dg + db * db) as u32
    }

    /// WCAG 2.0 relative luminance.
    pub fn relative_luminance(self) -> f32 {
        fn linearize(c: u8) -> f32 {
            let c = c as f32 / 255.0;
            if c <= 0.04045 {
                c / 12.92
            } else {
                ((c + 0.055) / 1.055).powf(2.4)
            }
        }
        0.2126 * linearize(self.r) + 0.7152 * linearize(self.g) + 0.0722 * linearize(self.b)
    }
}

impl From<Rgb<u8>> for Color {
    fn from(pixel: Rgb<u8>) -> Self {
        let [r, g, b] = pixel.0;
        Self { r, g, b }
    }
}

impl From<Color> for Rgb<u8> {
    fn from(color: Color) -> Self {
        Rgb([color.r, color.g, color.b])
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// The discrete color vocabulary of the classifier.
///
/// The first six variants sit on the hue wheel; the last four are neutrals.
/// Declaration order is wheel order, which is also how match sets are listed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ColorLabel {
    Red,
    Yellow,
    Green,
    Cyan,
    Blue,
    Magenta,
    Black,
    Brown,
    Grey,
    White,
}

impl ColorLabel {
    pub const COUNT: usize = 10;

    pub const ALL: [ColorLabel; Self::COUNT] = [
        ColorLabel::Red,
        ColorLabel::Yellow,
        ColorLabel::Green,
        ColorLabel::Cyan,
        ColorLabel::Blue,
        ColorLabel::Magenta,
        ColorLabel::Black,
        ColorLabel::Brown,
        ColorLabel::Grey,
        ColorLabel::White,
    ];

    pub const CHROMATIC: [ColorLabel; 6] = [
        ColorLabel::Red,
        ColorLabel::Yellow,
        ColorLabel::Green,
        ColorLabel::Cyan,
        ColorLabel::Blue,
        ColorLabel::Magenta,
    ];

    pub const NEUTRAL: [ColorLabel; 4] = [
        ColorLabel::Black,
        ColorLabel::Brown,
        ColorLabel::Grey,
        ColorLabel::White,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ColorLabel::Red => "red",
            ColorLabel::Yellow => "yellow",
            ColorLabel::Green => "green",
            ColorLabel::Cyan => "cyan",
            ColorLabel::Blue => "blue",
            ColorLabel::Magenta => "magenta",
            ColorLabel::Black => "black",
            ColorLabel::Brown => "brown",
            ColorLabel::Grey => "grey",
            ColorLabel::White => "white",
        }
    }

    /// Position in [`ColorLabel::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn is_chromatic(self) -> bool {
        self.anchor().is_some()
    }

    pub fn is_neutral(self) -> bool {
        !self.is_chromatic()
    }

    /// The canonical color-wheel anchor. Neutrals have none.
    pub fn anchor(self) -> Option<Color> {
        match self {
            ColorLabel::Red => Some(Color::new(255, 0, 0)),
            ColorLabel::Yellow => Some(Color::new(255, 255, 0)),
            ColorLabel::Green => Some(Color::new(0, 255, 0)),
            ColorLabel::Cyan => Some(Color::new(0, 255, 255)),
            ColorLabel::Blue => Some(Color::new(0, 0, 255)),
            ColorLabel::Magenta => Some(Color::new(255, 0, 255)),
            ColorLabel::Black | ColorLabel::Brown | ColorLabel::Grey | ColorLabel::White => None,
        }
    }

    /// A representative color for display, defined for every label.
    pub fn swatch(self) -> Color {
        match self {
            ColorLabel::Black => Color::new(0, 0, 0),
            ColorLabel::Brown => Color::new(139, 69, 19),
            ColorLabel::Grey => Color::new(128, 128, 128),
            ColorLabel::White => Color::new(255, 255, 255),
            chromatic => chromatic.anchor().unwrap_or(Color::new(128, 128, 128)),
        }
    }

    /// Exact reverse lookup in the anchor table.
    pub fn from_anchor(color: Color) -> Option<ColorLabel> {
        Self::CHROMATIC
            .into_iter()
            .find(|label| label.anchor() == Some(color))
    }

    /// The chromatic label whose anchor is closest to `color` in RGB space.
    /// Equal to [`ColorLabel::from_anchor`] whenever that returns `Some`.
    pub fn nearest_chromatic(color: Color) -> ColorLabel {
        Self::CHROMATIC
            .into_iter()
            .min_by_key(|label| {
                label
                    .anchor()
                    .map_or(u32::MAX, |anchor| anchor.distance_sq(color))
            })
            .unwrap_or(ColorLabel::Red)
    }
}

impl fmt::Display for ColorLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ColorLabel {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        let wanted = if wanted == "gray" { "grey".to_string() } else { wanted };
        Self::ALL
            .into_iter()
            .find(|label| label.as_str() == wanted)
            .ok_or_else(|| MatchError::UnknownColor(s.to_string()))
    }
}

/// How matching colors are derived from the reference color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum MatchingRule {
    /// The color opposite on the hue wheel (180°)
    Complement,
    /// The two colors a third of the wheel away (120°)
    Triad,
}

impl MatchingRule {
    pub const ALL: [MatchingRule; 2] = [MatchingRule::Complement, MatchingRule::Triad];

    /// Hue rotation in degrees.
    pub fn degrees(self) -> f32 {
        match self {
            MatchingRule::Complement => 180.0,
            MatchingRule::Triad => 120.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MatchingRule::Complement => "complement",
            MatchingRule::Triad => "triad",
        }
    }
}

impl fmt::Display for MatchingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MatchingRule {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|rule| rule.as_str() == wanted)
            .ok_or_else(|| MatchError::UnknownRule(s.to_string()))
    }
}
