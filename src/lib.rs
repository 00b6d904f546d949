//! Crop-and-upload widget: pick or drop an image, crop it on a canvas, and
//! send the result to the upload endpoint behind a tokenized invite link.

pub mod app;
pub mod config;
pub mod crop;
pub mod error;
pub mod intake;
pub mod raster;
pub mod state;
pub mod upload;
