//! Clients for the image and video models of a model server.
//!
//! Image services upload a local picture as the `image` part of a multipart
//! request; a path that does not exist locally is passed through for the
//! server to open. None of them stream.

pub mod img_cap;
pub mod ocr;
pub mod vid_cap;
pub mod vla;

pub use img_cap::{ImgCapPipeline, ImgCapPrediction, ImgCapQuery};
pub use ocr::{avg_confidence, stringify, OcrPipeline, OcrPrediction, OcrQuery, Position, RegionResult};
pub use pipeline::{PipelineConfig, PipelineError, Result};
pub use vid_cap::{VidCapPipeline, VidCapPrediction, VidCapQuery};
pub use vla::{ShowUiAction, ShowUiPipeline, ShowUiPrediction, ShowUiQuery};

use pipeline::FileField;

/// Multipart part carrying the picture.
pub(crate) const IMAGE: FileField = FileField {
    field: "img_path",
    part: "image",
};
