//! Presentation settings for the poem card.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::color::Hsl;
use crate::constants::{DEFAULT_FONT_SIZE_PX, MAX_FONT_SIZE_PX, MIN_FONT_SIZE_PX};

/// How wide the exported card is.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardSize {
    /// Narrow card.
    Small,
    /// The default.
    #[default]
    Medium,
    /// Wide card.
    Large,
}

impl CardSize {
    /// All sizes, in the order they are offered.
    pub const ALL: [CardSize; 3] = [CardSize::Small, CardSize::Medium, CardSize::Large];

    /// Card width in pixels.
    pub fn width_px(self) -> u32 {
        match self {
            CardSize::Small => 320,
            CardSize::Medium => 480,
            CardSize::Large => 640,
        }
    }

    /// Padding between the card edge and its content, in pixels.
    pub fn padding_px(self) -> u32 {
        match self {
            CardSize::Small => 12,
            CardSize::Medium => 16,
            CardSize::Large => 24,
        }
    }

    /// Form value, matching the serialized name.
    pub fn code(self) -> &'static str {
        match self {
            CardSize::Small => "small",
            CardSize::Medium => "medium",
            CardSize::Large => "large",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            CardSize::Small => "Small",
            CardSize::Medium => "Medium",
            CardSize::Large => "Large",
        }
    }
}

/// Font families offered for the poem text.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub enum FontFamily {
    /// `serif`, the default.
    #[default]
    #[serde(rename = "serif")]
    Serif,
    /// `sans-serif`
    #[serde(rename = "sans-serif")]
    SansSerif,
    /// `monospace`
    #[serde(rename = "monospace")]
    Monospace,
}

impl FontFamily {
    /// All families, in the order they are offered.
    pub const ALL: [FontFamily; 3] = [
        FontFamily::Serif,
        FontFamily::SansSerif,
        FontFamily::Monospace,
    ];

    /// The CSS generic family name, also used as the font file stem.
    pub fn css_name(self) -> &'static str {
        match self {
            FontFamily::Serif => "serif",
            FontFamily::SansSerif => "sans-serif",
            FontFamily::Monospace => "monospace",
        }
    }

    /// Human readable label.
    pub fn label(self) -> &'static str {
        match self {
            FontFamily::Serif => "Serif",
            FontFamily::SansSerif => "Sans-Serif",
            FontFamily::Monospace => "Monospace",
        }
    }
}

impl fmt::Display for FontFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.css_name())
    }
}

impl FromStr for FontFamily {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        FontFamily::ALL
            .into_iter()
            .find(|family| family.css_name() == value.trim())
            .ok_or_else(|| format!("Unknown font family {value:?}"))
    }
}

impl FromStr for CardSize {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "small" => Ok(CardSize::Small),
            "medium" => Ok(CardSize::Medium),
            "large" => Ok(CardSize::Large),
            other => Err(format!("Unknown card size {other:?}")),
        }
    }
}

/// Everything the user can tweak about the card. Always defined; only
/// rendered once there is both an image and a poem.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CardStyle {
    /// Card width category.
    pub size: CardSize,
    /// Poem font family.
    pub font_family: FontFamily,
    /// Poem font size, kept within the slider bounds.
    font_size_px: u32,
    /// Poem text color.
    pub text_color: Hsl,
    /// Card background color.
    pub background_color: Hsl,
}

impl Default for CardStyle {
    fn default() -> Self {
        Self {
            size: CardSize::default(),
            font_family: FontFamily::default(),
            font_size_px: DEFAULT_FONT_SIZE_PX,
            text_color: Hsl::BLACK,
            background_color: Hsl::WHITE,
        }
    }
}

impl CardStyle {
    /// Poem font size in pixels.
    pub fn font_size_px(&self) -> u32 {
        self.font_size_px
    }

    /// Sets the card size category.
    pub fn set_size(&mut self, size: CardSize) {
        self.size = size;
    }

    /// Sets the poem font family.
    pub fn set_font_family(&mut self, font_family: FontFamily) {
        self.font_family = font_family;
    }

    /// Sets the font size, clamped to the slider's range.
    pub fn set_font_size_px(&mut self, font_size_px: u32) {
        self.font_size_px = font_size_px.clamp(MIN_FONT_SIZE_PX, MAX_FONT_SIZE_PX);
    }

    /// Sets the poem text color.
    pub fn set_text_color(&mut self, color: Hsl) {
        self.text_color = color;
    }

    /// Sets the card background color.
    pub fn set_background_color(&mut self, color: Hsl) {
        self.background_color = color;
    }

    /// Replaces both colors with independent uniformly random ones. They may
    /// collide, which leaves the poem unreadable; that is accepted.
    pub fn randomize_colors<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.text_color = Hsl::random(rng);
        self.background_color = Hsl::random(rng);
    }

    /// Inline CSS for the live preview.
    pub fn css(&self) -> String {
        format!(
            "font-family: {}; font-size: {}px; color: hsl({}); background-color: hsl({});",
            self.font_family.css_name(),
            self.font_size_px,
            css_hsl(self.text_color),
            css_hsl(self.background_color)
        )
    }
}

/// CSS `hsl()` wants commas in the legacy syntax that every browser accepts.
fn css_hsl(color: Hsl) -> String {
    format!("{}, {}%, {}%", color.hue, color.saturation, color.lightness)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_the_page() {
        let style = CardStyle::default();
        assert_eq!(style.size, CardSize::Medium);
        assert_eq!(style.font_family, FontFamily::Serif);
        assert_eq!(style.font_size_px(), 20);
        assert_eq!(style.text_color.to_string(), "0 0% 0%");
        assert_eq!(style.background_color.to_string(), "0 0% 100%");
    }

    #[test]
    fn font_size_is_clamped() {
        let mut style = CardStyle::default();
        style.set_font_size_px(4);
        assert_eq!(style.font_size_px(), 10);
        style.set_font_size_px(400);
        assert_eq!(style.font_size_px(), 40);
        style.set_font_size_px(33);
        assert_eq!(style.font_size_px(), 33);
    }

    #[test]
    fn randomize_assigns_both_colors() {
        let mut style = CardStyle::default();
        let mut rng = rand::rng();
        for _ in 0..200 {
            style.randomize_colors(&mut rng);
            for color in [style.text_color, style.background_color] {
                assert!(color.hue < 360);
                assert!(color.saturation <= 100);
                assert!(color.lightness <= 100);
            }
        }
    }

    #[test]
    fn parse_choices() {
        assert_eq!("sans-serif".parse::<FontFamily>(), Ok(FontFamily::SansSerif));
        assert!("comic-sans".parse::<FontFamily>().is_err());
        assert_eq!("Large".parse::<CardSize>(), Ok(CardSize::Large));
        assert!("huge".parse::<CardSize>().is_err());
    }

    #[test]
    fn preview_css() {
        let mut style = CardStyle::default();
        style.set_text_color(Hsl::new(210, 50, 40));
        assert_eq!(
            style.css(),
            "font-family: serif; font-size: 20px; color: hsl(210, 50%, 40%); background-color: hsl(0, 0%, 100%);"
        );
    }
}
