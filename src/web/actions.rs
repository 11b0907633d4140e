//! Form posts that move the pipeline along or tweak the card.
//!
//! Every action redirects back to `/`; problems become a notice that is shown
//! once on the next page load.

use super::prelude::*;
use axum::extract::Multipart;
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_TYPE};

use crate::ai::{AnalysisRequest, Language, PoemRequest};
use crate::card::{CardSize, CardStyle, FontFamily};
use crate::color::Hsl;
use crate::constants::EXPORT_FILENAME;
use crate::intake::{IntakeError, accept_upload};
use crate::render::CardSurface;

/// The multipart field carrying the picture.
const IMAGE_FIELD: &str = "image";

#[derive(Deserialize)]
pub(crate) struct PoemForm {
    language: String,
}

#[derive(Deserialize, Default)]
pub(crate) struct StyleForm {
    size: Option<String>,
    font_family: Option<String>,
    font_size: Option<String>,
    text_color: Option<String>,
    background_color: Option<String>,
}

impl StyleForm {
    /// Applies every supplied field to a copy of `style`, so that a single
    /// bad field leaves the original untouched.
    fn apply_to(&self, style: &CardStyle) -> Result<CardStyle, String> {
        let mut updated = style.clone();
        if let Some(size) = supplied(self.size.as_deref()) {
            updated.set_size(size.parse::<CardSize>()?);
        }
        if let Some(family) = supplied(self.font_family.as_deref()) {
            updated.set_font_family(family.parse::<FontFamily>()?);
        }
        if let Some(font_size) = supplied(self.font_size.as_deref()) {
            let font_size = font_size
                .trim()
                .parse::<u32>()
                .map_err(|err| format!("Invalid font size {font_size:?}: {err}"))?;
            updated.set_font_size_px(font_size);
        }
        if let Some(color) = supplied(self.text_color.as_deref()) {
            updated.set_text_color(Hsl::from_hex(color));
        }
        if let Some(color) = supplied(self.background_color.as_deref()) {
            updated.set_background_color(Hsl::from_hex(color));
        }
        Ok(updated)
    }
}

fn supplied(value: Option<&str>) -> Option<&str> {
    value.filter(|value| !value.trim().is_empty())
}

fn home() -> Redirect {
    Redirect::to("/")
}

async fn notify(session: &Session, notice: Notice) -> Result<Redirect, ImageverseError> {
    flash::set_flash(session, notice).await?;
    Ok(home())
}

/// Reads the chosen file into the session, discarding any earlier analysis
/// and poem.
#[instrument(level = "info", skip_all)]
pub(crate) async fn upload_handler(
    session: Session,
    mut multipart: Multipart,
) -> Result<Redirect, ImageverseError> {
    let mut upload = None;
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                error!("Failed to read upload: {}", err);
                return notify(&session, Notice::FileReadError).await;
            }
        };
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().map(str::to_string);
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(err) => {
                error!("Failed to read uploaded file {:?}: {}", file_name, err);
                return notify(&session, Notice::FileReadError).await;
            }
        };
        upload = Some(accept_upload(
            file_name.as_deref(),
            content_type.as_deref(),
            &bytes,
        ));
        break;
    }

    let image = match upload {
        None | Some(Ok(None)) => {
            debug!("Upload submitted without a file, ignoring");
            return Ok(home());
        }
        Some(Ok(Some(image))) => image,
        Some(Err(IntakeError::Aborted)) => {
            error!("Uploaded file was empty");
            return notify(&session, Notice::FileReadAborted).await;
        }
        Some(Err(err)) => {
            error!("Rejected upload: {}", err);
            return notify(&session, Notice::FileReadError).await;
        }
    };

    let mut current = load_state(&session).await?;
    current.pipeline.load_image(image);
    if let Err(err) = save_state(&session, &current).await {
        error!("Failed to store uploaded image: {}", err);
        return notify(&session, Notice::FileReadError).await;
    }
    info!("Image loaded");
    Ok(home())
}

/// Asks the analyzer to describe the current image.
///
/// Other requests may change the session while the analyzer runs, so the
/// state is read again afterwards and the result is only kept if the same
/// image is still loaded.
#[instrument(level = "info", skip_all)]
pub(crate) async fn analyze_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<Redirect, ImageverseError> {
    let current = load_state(&session).await?;
    let Some(image) = current.pipeline.image().cloned() else {
        error!("Analysis requested without an image");
        return notify(&session, Notice::NoImage).await;
    };

    let outcome = state
        .analyzer
        .analyze(AnalysisRequest {
            image: image.clone(),
        })
        .await;
    let mut current = reload_state(&state, &session).await?;
    match outcome {
        Ok(response) => {
            if current.pipeline.image() != Some(&image) {
                info!("Image changed during analysis, dropping the result");
                return Ok(home());
            }
            if let Err(err) = current.pipeline.record_analysis(response.into()) {
                error!("Could not record analysis: {}", err);
                return notify(&session, Notice::NoImage).await;
            }
            save_state(&session, &current).await?;
            info!("Image analyzed");
            Ok(home())
        }
        Err(err) => {
            error!("Image analysis failed: {}", err);
            notify(&session, Notice::AnalysisFailed).await
        }
    }
}

/// Writes a poem from the current analysis in the chosen language.
///
/// Like analysis, the poem is dropped if the image or its analysis changed
/// while it was being written.
#[instrument(level = "info", skip_all)]
pub(crate) async fn poem_handler(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<PoemForm>,
) -> Result<Redirect, ImageverseError> {
    let language = form
        .language
        .parse::<Language>()
        .map_err(ImageverseError::BadRequest)?;

    let mut current = load_state(&session).await?;
    current.language = language;
    save_state(&session, &current).await?;

    let (Some(image), Some(analysis)) = (
        current.pipeline.image().cloned(),
        current.pipeline.analysis().cloned(),
    ) else {
        error!("Poem requested without an analysis");
        return notify(&session, Notice::NoAnalysis).await;
    };
    let request = PoemRequest {
        image_analysis: analysis.summary(),
        language,
    };
    debug!("Requesting {} poem", language);

    let outcome = state.poet.generate(request).await;
    let mut current = reload_state(&state, &session).await?;
    current.language = language;
    save_state(&session, &current).await?;
    match outcome {
        Ok(response) => {
            if current.pipeline.image() != Some(&image)
                || current.pipeline.analysis() != Some(&analysis)
            {
                info!("Image or analysis changed during poem generation, dropping the poem");
                return Ok(home());
            }
            if let Err(err) = current.pipeline.record_poem(response.into()) {
                error!("Could not record poem: {}", err);
                return notify(&session, Notice::NoAnalysis).await;
            }
            save_state(&session, &current).await?;
            info!("Poem generated");
            Ok(home())
        }
        Err(err) => {
            error!("Poem generation failed: {}", err);
            notify(&session, Notice::PoemFailed).await
        }
    }
}

/// Updates any of the card settings.
#[instrument(level = "debug", skip_all)]
pub(crate) async fn style_handler(
    session: Session,
    Form(form): Form<StyleForm>,
) -> Result<Redirect, ImageverseError> {
    let mut current = load_state(&session).await?;
    match form.apply_to(&current.style) {
        Ok(style) => {
            current.style = style;
            save_state(&session, &current).await?;
            Ok(home())
        }
        Err(err) => {
            error!("Rejected card settings: {}", err);
            notify(&session, Notice::SettingsRejected).await
        }
    }
}

/// Picks new random text and background colors.
#[instrument(level = "debug", skip_all)]
pub(crate) async fn random_colors_handler(session: Session) -> Result<Redirect, ImageverseError> {
    let mut current = load_state(&session).await?;
    current.style.randomize_colors(&mut rand::rng());
    debug!(
        "Random colors: text {} background {}",
        current.style.text_color, current.style.background_color
    );
    save_state(&session, &current).await?;
    Ok(home())
}

/// Renders the styled card and sends it as a PNG download.
#[instrument(level = "info", skip_all)]
pub(crate) async fn export_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<Response, ImageverseError> {
    let current = load_state(&session).await?;
    let (Some(image), Some(poem)) = (current.pipeline.image(), current.pipeline.poem()) else {
        error!("Export requested without a poem");
        return Ok(notify(&session, Notice::NoPoem).await?.into_response());
    };

    let mut surface = match CardSurface::new(image, poem) {
        Ok(surface) => surface,
        Err(err) => {
            error!("No card to export: {}", err);
            return Ok(notify(&session, Notice::CardNotFound).await?.into_response());
        }
    };
    surface.apply_style(&current.style);

    let rasterizer = state.rasterizer.clone();
    let rendered = tokio::task::spawn_blocking(move || rasterizer.rasterize(&surface))
        .await
        .map_err(|err| err.to_string())
        .and_then(|result| result.map_err(|err| err.to_string()));

    match rendered {
        Ok(png) => {
            info!("Exported card ({} bytes)", png.len());
            Ok((
                [
                    (CONTENT_TYPE, "image/png".to_string()),
                    (
                        CONTENT_DISPOSITION,
                        format!("attachment; filename=\"{EXPORT_FILENAME}\""),
                    ),
                ],
                png,
            )
                .into_response())
        }
        Err(err) => {
            error!("Card export failed: {}", err);
            reload_state(&state, &session).await?;
            Ok(notify(&session, Notice::DownloadFailed).await?.into_response())
        }
    }
}
