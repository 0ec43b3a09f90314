pub mod config;
pub mod error;
pub mod locale;

pub use config::AltbotConfig;
pub use error::{AltbotError, Result};
pub use locale::{Catalog, Localizer};
