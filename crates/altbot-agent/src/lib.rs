//! Alt-text generation backends.
//!
//! One backend is selected at startup from configuration and wrapped in an
//! [`invoker::Invoker`], which normalizes whatever text the model returns.

pub mod gemini;
pub mod invoker;
pub mod ollama;
pub mod postprocess;
pub mod provider;

pub use invoker::Invoker;
pub use provider::{AltTextBackend, FileKind, ProviderError};
