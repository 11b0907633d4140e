use super::prelude::*;
use crate::ai::Language;
use crate::card::{CardSize, FontFamily};
use crate::color::hsl_to_hex;
use crate::constants::{MAX_FONT_SIZE_PX, MIN_FONT_SIZE_PX};

/// One `<option>` in a select box.
#[derive(Clone, Debug)]
pub(crate) struct SelectOption {
    pub(crate) value: &'static str,
    pub(crate) label: &'static str,
    pub(crate) selected: bool,
}

#[derive(Template, WebTemplate)]
#[template(path = "home.html")]
pub(crate) struct HomeTemplate {
    pub(crate) has_flash: bool,
    pub(crate) flash_title: String,
    pub(crate) flash_message: String,
    pub(crate) flash_class: String,
    pub(crate) has_image: bool,
    pub(crate) image_uri: String,
    pub(crate) has_analysis: bool,
    pub(crate) objects: String,
    pub(crate) scenes: String,
    pub(crate) emotions: String,
    pub(crate) has_poem: bool,
    pub(crate) poem: String,
    pub(crate) languages: Vec<SelectOption>,
    pub(crate) sizes: Vec<SelectOption>,
    pub(crate) fonts: Vec<SelectOption>,
    pub(crate) font_size: u32,
    pub(crate) min_font_size: u32,
    pub(crate) max_font_size: u32,
    pub(crate) text_color_hex: String,
    pub(crate) background_color_hex: String,
    pub(crate) card_class: String,
    pub(crate) card_style: String,
}

impl HomeTemplate {
    fn new(state: &SessionState, flash: Option<flash::FlashMessage>) -> Self {
        let (has_flash, flash_title, flash_message, flash_class) = match flash {
            Some(message) => (
                true,
                message.title.to_string(),
                message.text.to_string(),
                message.class.to_string(),
            ),
            None => (false, String::new(), String::new(), String::new()),
        };

        let pipeline = &state.pipeline;
        let style = &state.style;
        let (objects, scenes, emotions) = match pipeline.analysis() {
            Some(analysis) => (
                analysis.objects.join(", "),
                analysis.scenes.join(", "),
                analysis.emotions.join(", "),
            ),
            None => (String::new(), String::new(), String::new()),
        };

        Self {
            has_flash,
            flash_title,
            flash_message,
            flash_class,
            has_image: pipeline.image().is_some(),
            image_uri: pipeline
                .image()
                .map(|image| image.data_uri().to_string())
                .unwrap_or_default(),
            has_analysis: pipeline.analysis().is_some(),
            objects,
            scenes,
            emotions,
            has_poem: pipeline.poem().is_some(),
            poem: pipeline
                .poem()
                .map(|poem| poem.as_str().to_string())
                .unwrap_or_default(),
            languages: Language::ALL
                .iter()
                .map(|language| SelectOption {
                    value: language.code(),
                    label: language.label(),
                    selected: *language == state.language,
                })
                .collect(),
            sizes: CardSize::ALL
                .iter()
                .map(|size| SelectOption {
                    value: size.code(),
                    label: size.label(),
                    selected: *size == style.size,
                })
                .collect(),
            fonts: FontFamily::ALL
                .iter()
                .map(|family| SelectOption {
                    value: family.css_name(),
                    label: family.label(),
                    selected: *family == style.font_family,
                })
                .collect(),
            font_size: style.font_size_px(),
            min_font_size: MIN_FONT_SIZE_PX,
            max_font_size: MAX_FONT_SIZE_PX,
            text_color_hex: hsl_to_hex(&style.text_color.to_string()),
            background_color_hex: hsl_to_hex(&style.background_color.to_string()),
            card_class: format!("size-{}", style.size.code()),
            card_style: style.css(),
        }
    }
}

/// handles the / GET
#[instrument(level = "debug", skip_all)]
pub(crate) async fn root_handler(session: Session) -> Result<HomeTemplate, ImageverseError> {
    let state = load_state(&session).await?;
    let flash = flash::take_flash_message(&session).await?;
    debug!(
        has_image = state.pipeline.image().is_some(),
        has_poem = state.pipeline.poem().is_some(),
        "rendering home"
    );
    Ok(HomeTemplate::new(&state, flash))
}
