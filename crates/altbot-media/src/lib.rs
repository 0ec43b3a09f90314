//! Media pipeline: bounded download, multi-format decode, downscale and
//! re-encode into a format the alt-text backends accept.
//!
//! Images are processed in memory. Video and audio are streamed to a scoped
//! temporary file because the backends consume those as raw files.

pub mod error;
pub mod fetch;
pub mod image_ops;
pub mod temp;

pub use error::{MediaError, Result};
pub use fetch::fetch;
pub use image_ops::{decode, downscale, prepare_image, reencode, OutputFormat, PreparedImage};
pub use temp::download_to_temp;
