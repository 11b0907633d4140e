//! Rasterizing the poem card to PNG.

use std::collections::HashMap;
use std::fmt;
use std::io::{Cursor, ErrorKind};
use std::path::Path;

use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_text_mut;
use tracing::{debug, info, warn};

use crate::card::{CardStyle, FontFamily};
use crate::intake::UploadedImage;
use crate::pipeline::Poem;

/// Errors raised while producing the card image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderError {
    /// The card could not be assembled, eg the image does not decode.
    TargetNotFound(String),
    /// No font file is loaded for the requested family.
    MissingFont(FontFamily),
    /// A font file exists but could not be used.
    Font(String),
    /// PNG encoding failed.
    Encode(String),
}

impl fmt::Display for RenderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TargetNotFound(err) => write!(f, "Poem card could not be built: {err}"),
            Self::MissingFont(family) => write!(f, "No font loaded for {family}"),
            Self::Font(err) => write!(f, "Font error: {err}"),
            Self::Encode(err) => write!(f, "Failed to encode PNG: {err}"),
        }
    }
}

impl std::error::Error for RenderError {}

/// The card to rasterize: decoded image, poem text and the style to draw with.
#[derive(Clone, Debug)]
pub struct CardSurface {
    image: RgbaImage,
    poem: String,
    style: CardStyle,
}

impl CardSurface {
    /// Assembles a card from the session image and poem, with the default style.
    pub fn new(image: &UploadedImage, poem: &Poem) -> Result<Self, RenderError> {
        let bytes = image
            .to_bytes()
            .map_err(|err| RenderError::TargetNotFound(err.to_string()))?;
        let decoded = image::load_from_memory(&bytes)
            .map_err(|err| RenderError::TargetNotFound(err.to_string()))?;
        Ok(Self {
            image: decoded.to_rgba8(),
            poem: poem.as_str().to_string(),
            style: CardStyle::default(),
        })
    }

    /// Applies a style to the card, replacing whatever it had.
    pub fn apply_style(&mut self, style: &CardStyle) {
        self.style = style.clone();
    }

    /// The style the card will be drawn with.
    pub fn style(&self) -> &CardStyle {
        &self.style
    }
}

/// Turns a [CardSurface] into PNG bytes.
pub trait CardRasterizer: Send + Sync {
    /// Renders the card. Nothing is written anywhere on failure.
    fn rasterize(&self, surface: &CardSurface) -> Result<Vec<u8>, RenderError>;
}

/// Pixel geometry of a rendered card.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CardLayout {
    /// Card width.
    pub width: u32,
    /// Card height.
    pub height: u32,
    /// Left edge of the image.
    pub image_x: u32,
    /// Top edge of the image.
    pub image_y: u32,
    /// Scaled image width.
    pub image_width: u32,
    /// Scaled image height.
    pub image_height: u32,
    /// Left edge of the poem text.
    pub text_x: u32,
    /// Top of the first poem line.
    pub text_y: u32,
    /// Distance between poem baselines.
    pub line_height: u32,
}

impl CardLayout {
    /// Lays out a card: the image fits a square box the width of the content
    /// area, and the poem lines follow below it.
    pub fn compute(style: &CardStyle, image_size: (u32, u32), line_count: u32) -> Self {
        let width = style.size.width_px();
        let padding = style.size.padding_px();
        let inner = width - padding * 2;

        let (source_width, source_height) = (image_size.0.max(1), image_size.1.max(1));
        let scale = f64::from(inner) / f64::from(source_width.max(source_height));
        let image_width = ((f64::from(source_width) * scale).round() as u32).clamp(1, inner);
        let image_height = ((f64::from(source_height) * scale).round() as u32).clamp(1, inner);

        let line_height = style.font_size_px() * 3 / 2;
        let text_y = padding + image_height + padding;
        let text_height = line_count * line_height;
        let height = if line_count == 0 {
            text_y
        } else {
            text_y + text_height + padding
        };

        Self {
            width,
            height,
            image_x: padding + (inner - image_width) / 2,
            image_y: padding,
            image_width,
            image_height,
            text_x: padding,
            text_y,
            line_height,
        }
    }

    /// Width available to the poem text.
    pub fn text_width(&self) -> u32 {
        self.width - self.text_x * 2
    }
}

/// Draws cards with `imageproc` using one font file per family.
#[derive(Clone, Default)]
pub struct GlyphRasterizer {
    fonts: HashMap<FontFamily, FontArc>,
}

impl fmt::Debug for GlyphRasterizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GlyphRasterizer")
            .field("fonts", &self.fonts.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl GlyphRasterizer {
    /// Loads `<family>.ttf` or `<family>.otf` for every family from `dir`.
    /// Missing files are logged and only fail when that family is exported.
    pub fn from_dir(dir: &Path) -> Result<Self, RenderError> {
        let mut rasterizer = Self::default();
        for family in FontFamily::ALL {
            let mut loaded = false;
            for ext in ["ttf", "otf"] {
                let path = dir.join(format!("{}.{}", family.css_name(), ext));
                match std::fs::read(&path) {
                    Ok(data) => {
                        rasterizer.add_font(family, data)?;
                        info!("Loaded {} font from {}", family, path.display());
                        loaded = true;
                        break;
                    }
                    Err(err) if err.kind() == ErrorKind::NotFound => continue,
                    Err(err) => {
                        return Err(RenderError::Font(format!("{}: {}", path.display(), err)));
                    }
                }
            }
            if !loaded {
                warn!(
                    "No {} font found in {}, exports using it will fail",
                    family,
                    dir.display()
                );
            }
        }
        Ok(rasterizer)
    }

    /// Registers font data for a family.
    pub fn add_font(&mut self, family: FontFamily, data: Vec<u8>) -> Result<(), RenderError> {
        let font = FontArc::try_from_vec(data).map_err(|err| RenderError::Font(err.to_string()))?;
        self.fonts.insert(family, font);
        Ok(())
    }
}

impl CardRasterizer for GlyphRasterizer {
    fn rasterize(&self, surface: &CardSurface) -> Result<Vec<u8>, RenderError> {
        let style = &surface.style;
        let scale = PxScale::from(style.font_size_px() as f32);
        let probe = CardLayout::compute(style, surface.image.dimensions(), 0);

        let lines = if surface.poem.trim().is_empty() {
            Vec::new()
        } else {
            let font = self
                .fonts
                .get(&style.font_family)
                .ok_or(RenderError::MissingFont(style.font_family))?;
            wrap_poem(&surface.poem, probe.text_width() as f32, &|text| {
                measure_text_width(font, scale, text)
            })
        };
        let layout = CardLayout::compute(style, surface.image.dimensions(), lines.len() as u32);
        debug!("Rendering card {:?} with {} lines", layout, lines.len());

        let [r, g, b] = style.background_color.to_rgb();
        let mut canvas = RgbaImage::from_pixel(layout.width, layout.height, Rgba([r, g, b, 255]));

        let scaled = imageops::resize(
            &surface.image,
            layout.image_width,
            layout.image_height,
            FilterType::Triangle,
        );
        imageops::overlay(
            &mut canvas,
            &scaled,
            i64::from(layout.image_x),
            i64::from(layout.image_y),
        );

        if let Some(font) = self.fonts.get(&style.font_family) {
            let [r, g, b] = style.text_color.to_rgb();
            let color = Rgba([r, g, b, 255]);
            for (idx, line) in lines.iter().enumerate() {
                let y = layout.text_y + idx as u32 * layout.line_height;
                draw_text_mut(
                    &mut canvas,
                    color,
                    layout.text_x as i32,
                    y as i32,
                    scale,
                    font,
                    line,
                );
            }
        }

        let mut output = Cursor::new(Vec::new());
        DynamicImage::ImageRgba8(canvas)
            .write_to(&mut output, ImageFormat::Png)
            .map_err(|err| RenderError::Encode(err.to_string()))?;
        Ok(output.into_inner())
    }
}

fn measure_text_width(font: &FontArc, scale: PxScale, text: &str) -> f32 {
    let scaled = font.as_scaled(scale);
    let mut width = 0.0f32;
    let mut prev = None;
    for c in text.chars() {
        let glyph_id = scaled.glyph_id(c);
        if let Some(prev_id) = prev {
            width += scaled.kern(prev_id, glyph_id);
        }
        width += scaled.h_advance(glyph_id);
        prev = Some(glyph_id);
    }
    width
}

/// Wraps each poem line to `max_width`. Explicit line breaks are kept, words
/// are packed greedily, and a word wider than the line (eg unspaced CJK
/// text) is broken between characters.
fn wrap_poem(poem: &str, max_width: f32, measure: &impl Fn(&str) -> f32) -> Vec<String> {
    let mut lines = Vec::new();
    for paragraph in poem.trim_end().lines() {
        let mut current = String::new();
        for word in paragraph.split_whitespace() {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{current} {word}")
            };
            if measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }
            if !current.is_empty() {
                lines.push(std::mem::take(&mut current));
            }
            if measure(word) <= max_width {
                current = word.to_string();
                continue;
            }
            for c in word.chars() {
                current.push(c);
                if measure(&current) > max_width && current.chars().count() > 1 {
                    current.pop();
                    lines.push(std::mem::take(&mut current));
                    current.push(c);
                }
            }
        }
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::card::CardSize;
    use crate::color::Hsl;

    fn surface(poem: &str) -> CardSurface {
        let image = UploadedImage::from_bytes("image/png", &crate::intake::test_png());
        CardSurface::new(&image, &Poem(poem.to_string())).expect("surface")
    }

    fn by_chars(text: &str) -> f32 {
        text.chars().count() as f32 * 10.0
    }

    #[test]
    fn layout_fits_image_in_content_box() {
        let style = CardStyle::default();
        let layout = CardLayout::compute(&style, (800, 400), 3);
        assert_eq!(layout.width, 480);
        assert_eq!(layout.image_width, 448);
        assert_eq!(layout.image_height, 224);
        assert_eq!(layout.image_x, 16);
        assert_eq!(layout.text_y, 16 + 224 + 16);
        assert_eq!(layout.line_height, 30);
        assert_eq!(layout.height, 256 + 90 + 16);

        let mut style = CardStyle::default();
        style.set_size(CardSize::Small);
        let tall = CardLayout::compute(&style, (100, 400), 0);
        assert_eq!(tall.image_height, 296);
        assert_eq!(tall.image_width, 74);
        assert_eq!(tall.image_x, 12 + (296 - 74) / 2);
    }

    #[test]
    fn wrapping_keeps_breaks_and_splits_long_words() {
        let lines = wrap_poem("one two three\nfour", 75.0, &by_chars);
        assert_eq!(lines, vec!["one two", "three", "four"]);

        let lines = wrap_poem("山川草木皆有情", 30.0, &by_chars);
        assert_eq!(lines, vec!["山川草", "木皆有", "情"]);

        let lines = wrap_poem("a\n\nb", 100.0, &by_chars);
        assert_eq!(lines, vec!["a", "", "b"]);
    }

    #[test]
    fn undecodable_image_is_not_a_card() {
        let image = UploadedImage::from_bytes("image/png", b"not an image");
        let err = CardSurface::new(&image, &Poem("x".to_string())).expect_err("bad image");
        assert!(matches!(err, RenderError::TargetNotFound(_)));
    }

    #[test]
    fn missing_font_fails() {
        let rasterizer = GlyphRasterizer::default();
        let err = rasterizer
            .rasterize(&surface("roses are red"))
            .expect_err("no fonts");
        assert_eq!(err, RenderError::MissingFont(FontFamily::Serif));
    }

    #[test]
    fn empty_poem_renders_background_and_image() {
        let mut card = surface("   ");
        let mut style = CardStyle::default();
        style.set_background_color(Hsl::new(240, 100, 25));
        card.apply_style(&style);

        let png = GlyphRasterizer::default()
            .rasterize(&card)
            .expect("rasterize");
        let rendered = image::load_from_memory(&png).expect("decode").to_rgba8();
        let layout = CardLayout::compute(card.style(), (4, 3), 0);
        assert_eq!(rendered.dimensions(), (layout.width, layout.height));
        assert_eq!(rendered.get_pixel(0, 0), &Rgba([0, 0, 128, 255]));
        let centre = rendered.get_pixel(layout.width / 2, layout.image_y + layout.image_height / 2);
        for (channel, expected) in centre.0.iter().zip([200u8, 40, 40, 255]) {
            assert!(channel.abs_diff(expected) <= 1, "{centre:?}");
        }
    }

    #[test]
    fn font_dir_without_fonts_loads_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let rasterizer = GlyphRasterizer::from_dir(dir.path()).expect("load");
        assert!(rasterizer.fonts.is_empty());

        std::fs::write(dir.path().join("serif.ttf"), b"not a font").expect("write");
        assert!(matches!(
            GlyphRasterizer::from_dir(dir.path()),
            Err(RenderError::Font(_))
        ));
    }
}
