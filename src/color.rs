//! Conversion between hex RGB strings and the `"H S% L%"` HSL form used for
//! card colors.
//!
//! Both [hex_to_hsl] and [hsl_to_hex] are total: malformed input never fails,
//! it degrades to black (bad hex digits or length) or to zeroed components
//! (bad HSL text). Empty input maps to white in both directions.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// An HSL color with integer components.
///
/// `hue` is in `[0, 360)`, `saturation` and `lightness` are percentages in
/// `[0, 100]`.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct Hsl {
    /// Hue in degrees.
    pub hue: u16,
    /// Saturation in percent.
    pub saturation: u8,
    /// Lightness in percent.
    pub lightness: u8,
}

/// Errors returned by the strict [Hsl] parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorError {
    /// The text did not have three whitespace separated components.
    Shape(String),
    /// A component was not a number or was out of range.
    Component(String),
}

impl fmt::Display for ColorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shape(value) => write!(f, "Expected \"H S% L%\", got {value:?}"),
            Self::Component(value) => write!(f, "Invalid HSL component {value:?}"),
        }
    }
}

impl std::error::Error for ColorError {}

impl Hsl {
    /// Plain black, the default text color.
    pub const BLACK: Hsl = Hsl {
        hue: 0,
        saturation: 0,
        lightness: 0,
    };

    /// Plain white, the default background color and the fallback for empty hex input.
    pub const WHITE: Hsl = Hsl {
        hue: 0,
        saturation: 0,
        lightness: 100,
    };

    /// Builds a color, wrapping the hue into `[0, 360)` and clamping the percentages.
    pub fn new(hue: u16, saturation: u8, lightness: u8) -> Self {
        Self {
            hue: hue % 360,
            saturation: saturation.min(100),
            lightness: lightness.min(100),
        }
    }

    /// Draws a uniformly random color across the whole domain.
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            hue: rng.random_range(0..360),
            saturation: rng.random_range(0..=100),
            lightness: rng.random_range(0..=100),
        }
    }

    /// Parses a hex color (`#rgb` or `#rrggbb`). Any other length is black.
    pub fn from_hex(hex: &str) -> Self {
        if hex.is_empty() {
            return Self::WHITE;
        }
        let [r, g, b] = parse_hex_channels(hex);
        rgb_to_hsl(
            f64::from(r) / 255.0,
            f64::from(g) / 255.0,
            f64::from(b) / 255.0,
        )
    }

    /// The color as 8-bit RGB channels.
    pub fn to_rgb(self) -> [u8; 3] {
        hsl_to_rgb(
            f64::from(self.hue) / 360.0,
            f64::from(self.saturation) / 100.0,
            f64::from(self.lightness) / 100.0,
        )
    }

    /// The color as a lowercase `#rrggbb` string.
    pub fn to_hex(self) -> String {
        format_hex(self.to_rgb())
    }
}

impl fmt::Display for Hsl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}% {}%", self.hue, self.saturation, self.lightness)
    }
}

impl FromStr for Hsl {
    type Err = ColorError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = value.split_whitespace().collect();
        let [hue, saturation, lightness] = parts.as_slice() else {
            return Err(ColorError::Shape(value.to_string()));
        };
        let hue = hue
            .parse::<u16>()
            .ok()
            .filter(|hue| *hue < 360)
            .ok_or_else(|| ColorError::Component(hue.to_string()))?;
        let saturation = parse_percent(saturation)?;
        let lightness = parse_percent(lightness)?;
        Ok(Self {
            hue,
            saturation,
            lightness,
        })
    }
}

fn parse_percent(value: &str) -> Result<u8, ColorError> {
    value
        .strip_suffix('%')
        .and_then(|number| number.parse::<u8>().ok())
        .filter(|number| *number <= 100)
        .ok_or_else(|| ColorError::Component(value.to_string()))
}

/// Converts a hex color to its `"H S% L%"` form. Empty input yields `"0 0% 100%"`.
pub fn hex_to_hsl(hex: &str) -> String {
    Hsl::from_hex(hex).to_string()
}

/// Converts `"H S% L%"` text to a lowercase `#rrggbb` string. Empty input yields `"#ffffff"`.
///
/// Components are read leniently: a trailing `%` is optional and anything
/// that is not a number counts as zero.
pub fn hsl_to_hex(hsl: &str) -> String {
    if hsl.is_empty() {
        return "#ffffff".to_string();
    }
    let mut components = hsl
        .split_whitespace()
        .map(|part| {
            let number = part.trim_end_matches('%').parse::<f64>().unwrap_or(0.0);
            if number.is_finite() { number } else { 0.0 }
        });
    let hue = components.next().unwrap_or(0.0).rem_euclid(360.0);
    let saturation = components.next().unwrap_or(0.0).clamp(0.0, 100.0);
    let lightness = components.next().unwrap_or(0.0).clamp(0.0, 100.0);
    format_hex(hsl_to_rgb(hue / 360.0, saturation / 100.0, lightness / 100.0))
}

fn parse_hex_channels(hex: &str) -> [u8; 3] {
    let digits: Vec<char> = hex.chars().collect();
    let pair = |hi: char, lo: char| {
        let mut text = String::with_capacity(2);
        text.push(hi);
        text.push(lo);
        u8::from_str_radix(&text, 16).unwrap_or(0)
    };
    match digits.as_slice() {
        [_, r, g, b] => [pair(*r, *r), pair(*g, *g), pair(*b, *b)],
        [_, r1, r2, g1, g2, b1, b2] => [pair(*r1, *r2), pair(*g1, *g2), pair(*b1, *b2)],
        _ => [0, 0, 0],
    }
}

#[allow(clippy::float_cmp)] // the max channel is picked by identity, as in the usual formula
fn rgb_to_hsl(r: f64, g: f64, b: f64) -> Hsl {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let lightness = (max + min) / 2.0;

    let (hue, saturation) = if max == min {
        (0.0, 0.0)
    } else {
        let d = max - min;
        let saturation = if lightness > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let sector = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        (sector / 6.0, saturation)
    };

    Hsl {
        hue: ((hue * 360.0).round() as u16) % 360,
        saturation: (saturation * 100.0).round() as u8,
        lightness: (lightness * 100.0).round() as u8,
    }
}

/// `h`, `s` and `l` are all normalized to `[0, 1]`.
fn hsl_to_rgb(h: f64, s: f64, l: f64) -> [u8; 3] {
    let (r, g, b) = if s == 0.0 {
        (l, l, l)
    } else {
        let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let p = 2.0 * l - q;
        (
            hue_to_channel(p, q, h + 1.0 / 3.0),
            hue_to_channel(p, q, h),
            hue_to_channel(p, q, h - 1.0 / 3.0),
        )
    };
    [to_byte(r), to_byte(g), to_byte(b)]
}

fn hue_to_channel(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

fn to_byte(channel: f64) -> u8 {
    (channel * 255.0).round().clamp(0.0, 255.0) as u8
}

fn format_hex([r, g, b]: [u8; 3]) -> String {
    format!("#{r:02x}{g:02x}{b:02x}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_inputs_default_to_white() {
        assert_eq!(hex_to_hsl(""), "0 0% 100%");
        assert_eq!(hsl_to_hex(""), "#ffffff");
    }

    #[test]
    fn mid_grey_is_a_fixed_point() {
        assert_eq!(hsl_to_hex("0 0% 50%"), "#808080");
        assert_eq!(hex_to_hsl("#808080"), "0 0% 50%");
    }

    #[test]
    fn short_hex_doubles_each_digit() {
        assert_eq!(hex_to_hsl("#abc"), hex_to_hsl("#aabbcc"));
        assert_eq!(hex_to_hsl("#abc"), "210 25% 73%");
        assert_eq!(hex_to_hsl("#fff"), "0 0% 100%");
    }

    #[test]
    fn odd_lengths_are_black() {
        assert_eq!(hex_to_hsl("#12345"), "0 0% 0%");
        assert_eq!(hex_to_hsl("#1234567"), "0 0% 0%");
        assert_eq!(hex_to_hsl("red"), "0 0% 0%");
    }

    #[test]
    fn bad_digits_read_as_zero() {
        assert_eq!(hex_to_hsl("#zz0000"), "0 0% 0%");
        assert_eq!(hex_to_hsl("#ffzzzz"), "0 100% 50%");
    }

    #[test]
    fn primaries() {
        assert_eq!(hsl_to_hex("0 100% 50%"), "#ff0000");
        assert_eq!(hsl_to_hex("120 100% 50%"), "#00ff00");
        assert_eq!(hsl_to_hex("240 100% 50%"), "#0000ff");
        assert_eq!(hex_to_hsl("#0000ff"), "240 100% 50%");
        assert_eq!(hex_to_hsl("#ffff00"), "60 100% 50%");
    }

    #[test]
    fn dark_blue_uses_low_lightness_branch() {
        assert_eq!(hsl_to_hex("240 100% 25%"), "#000080");
        assert_eq!(hex_to_hsl("#000080"), "240 100% 25%");
    }

    #[test]
    fn output_is_lowercase_and_padded() {
        let hex = hsl_to_hex("210 50% 40%");
        assert_eq!(hex, "#336699");
        assert_eq!(hsl_to_hex("0 0% 0%"), "#000000");
        assert_eq!(hex.len(), 7);
    }

    #[test]
    fn lenient_hsl_text() {
        assert_eq!(hsl_to_hex("0 0 50"), "#808080");
        assert_eq!(hsl_to_hex("garbage"), "#000000");
        assert_eq!(hsl_to_hex("360 100% 50%"), "#ff0000");
        assert_eq!(hsl_to_hex("0 250% 50%"), "#ff0000");
    }

    #[test]
    fn non_finite_components_keep_their_place() {
        assert_eq!(hsl_to_hex("NaN 100% 50%"), "#ff0000");
        assert_eq!(hsl_to_hex("120 inf% 50%"), "#808080");
        assert_eq!(hsl_to_hex("240 100% -inf%"), "#000000");
    }

    #[test]
    fn strict_parse_and_display_agree() {
        let color: Hsl = "210 50% 40%".parse().expect("parse hsl");
        assert_eq!(color, Hsl::new(210, 50, 40));
        assert_eq!(color.to_string(), "210 50% 40%");
        assert!("360 0% 0%".parse::<Hsl>().is_err());
        assert!("10 101% 0%".parse::<Hsl>().is_err());
        assert!("10 10 0%".parse::<Hsl>().is_err());
        assert!("10 10%".parse::<Hsl>().is_err());
    }

    #[test]
    fn random_colors_stay_in_domain() {
        let mut rng = rand::rng();
        for _ in 0..1_000 {
            let color = Hsl::random(&mut rng);
            assert!(color.hue < 360);
            assert!(color.saturation <= 100);
            assert!(color.lightness <= 100);
        }
    }
}
