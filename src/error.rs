//! Unified application error for the status banner.

use crate::intake::IntakeError;
use crate::upload::UploadError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    Intake(#[from] IntakeError),
    #[error("{0}")]
    Upload(#[from] UploadError),
    #[error("could not decode image: {0}")]
    Decode(#[from] image::ImageError),
}
