//! The image → analysis → poem pipeline as an explicit state machine.
//!
//! Each stage owns everything upstream of it, so a stage can only exist when
//! its predecessor succeeded, and loading a new image drops every derived
//! value in one move.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::intake::UploadedImage;

/// Labels returned by the analysis call.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Things in the picture.
    pub objects: Vec<String>,
    /// Where the picture seems to be.
    pub scenes: Vec<String>,
    /// The mood of the picture.
    pub emotions: Vec<String>,
}

impl AnalysisResult {
    /// Flattens the labels into the text handed to the poem call, eg
    /// `Objects: cat. Scenes: indoor. Emotions: calm`.
    pub fn summary(&self) -> String {
        format!(
            "Objects: {}. Scenes: {}. Emotions: {}",
            self.objects.join(", "),
            self.scenes.join(", "),
            self.emotions.join(", ")
        )
    }

    /// True when the analysis produced no labels at all.
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty() && self.scenes.is_empty() && self.emotions.is_empty()
    }
}

/// A generated poem.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Poem(pub String);

impl Poem {
    /// The poem text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Poem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A transition was attempted without its required predecessor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineError {
    /// Analysis needs an uploaded image.
    MissingImage,
    /// Poem generation needs an analysis.
    MissingAnalysis,
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingImage => write!(f, "No image has been uploaded"),
            Self::MissingAnalysis => write!(f, "The image has not been analyzed"),
        }
    }
}

impl std::error::Error for PipelineError {}

/// Where a session is in the pipeline.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum Pipeline {
    /// Nothing uploaded yet.
    #[default]
    Empty,
    /// An image is loaded but not analyzed.
    ImageLoaded {
        /// The current image.
        image: UploadedImage,
    },
    /// The image has been analyzed.
    Analyzed {
        /// The current image.
        image: UploadedImage,
        /// Its analysis.
        analysis: AnalysisResult,
    },
    /// A poem exists for the analysis.
    Poemed {
        /// The current image.
        image: UploadedImage,
        /// Its analysis.
        analysis: AnalysisResult,
        /// The poem written from the analysis.
        poem: Poem,
    },
}

impl Pipeline {
    /// Replaces the image, discarding any analysis and poem.
    pub fn load_image(&mut self, image: UploadedImage) {
        *self = Pipeline::ImageLoaded { image };
    }

    /// Stores a fresh analysis of the current image. Any poem written from a
    /// previous analysis is dropped.
    pub fn record_analysis(&mut self, analysis: AnalysisResult) -> Result<(), PipelineError> {
        let image = self.image().cloned().ok_or(PipelineError::MissingImage)?;
        *self = Pipeline::Analyzed { image, analysis };
        Ok(())
    }

    /// Stores a poem written from the current analysis.
    pub fn record_poem(&mut self, poem: Poem) -> Result<(), PipelineError> {
        let (image, analysis) = match self {
            Pipeline::Analyzed { image, analysis } | Pipeline::Poemed { image, analysis, .. } => {
                (image.clone(), analysis.clone())
            }
            Pipeline::Empty | Pipeline::ImageLoaded { .. } => {
                return Err(PipelineError::MissingAnalysis);
            }
        };
        *self = Pipeline::Poemed {
            image,
            analysis,
            poem,
        };
        Ok(())
    }

    /// The current image, if any.
    pub fn image(&self) -> Option<&UploadedImage> {
        match self {
            Pipeline::Empty => None,
            Pipeline::ImageLoaded { image }
            | Pipeline::Analyzed { image, .. }
            | Pipeline::Poemed { image, .. } => Some(image),
        }
    }

    /// The current analysis, if any.
    pub fn analysis(&self) -> Option<&AnalysisResult> {
        match self {
            Pipeline::Analyzed { analysis, .. } | Pipeline::Poemed { analysis, .. } => {
                Some(analysis)
            }
            Pipeline::Empty | Pipeline::ImageLoaded { .. } => None,
        }
    }

    /// The current poem, if any.
    pub fn poem(&self) -> Option<&Poem> {
        match self {
            Pipeline::Poemed { poem, .. } => Some(poem),
            _ => None,
        }
    }
}
