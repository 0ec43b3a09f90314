//! Localized reply strings and model prompts.
//!
//! A catalog is a JSON document shaped `{ lang: { category: { key: text } } }`.
//! The English catalog is compiled in; a file from `localization.path` can be
//! merged over it to add languages or reword messages.

use std::collections::HashMap;

use tracing::{debug, info};

use crate::error::{AltbotError, Result};

const BUILTIN: &str = include_str!("../locales/en.json");
const BUILTIN_LANGUAGE: &str = "en";

type Table = HashMap<String, HashMap<String, HashMap<String, String>>>;

/// Pure string lookup. Implementations hold no mutable state.
pub trait Localizer: Send + Sync {
    fn get(&self, language: &str, key: &str, category: &str) -> String;
}

pub struct Catalog {
    default_language: String,
    table: Table,
}

impl Catalog {
    /// Catalog with only the compiled-in English strings.
    pub fn builtin() -> Self {
        // The embedded file is checked by `builtin_catalog_parses`.
        let table: Table = serde_json::from_str(BUILTIN).unwrap_or_default();
        Self {
            default_language: BUILTIN_LANGUAGE.to_string(),
            table,
        }
    }

    /// Built-in strings, optionally overlaid with an external JSON file.
    pub fn load(default_language: &str, path: Option<&str>) -> Result<Self> {
        let mut catalog = Self::builtin();
        catalog.default_language = primary_subtag(default_language);

        if let Some(path) = path {
            let raw = std::fs::read_to_string(path)?;
            let extra: Table = serde_json::from_str(&raw).map_err(|e| {
                AltbotError::Localization(format!("invalid catalog {path}: {e}"))
            })?;
            catalog.merge(extra);
            info!(path, "loaded localization catalog");
        }

        Ok(catalog)
    }

    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.table.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    fn merge(&mut self, extra: Table) {
        for (lang, categories) in extra {
            let dest = self.table.entry(lang).or_default();
            for (category, keys) in categories {
                dest.entry(category).or_default().extend(keys);
            }
        }
    }

    fn lookup(&self, language: &str, key: &str, category: &str) -> Option<&String> {
        self.table.get(language)?.get(category)?.get(key)
    }
}

impl Localizer for Catalog {
    fn get(&self, language: &str, key: &str, category: &str) -> String {
        let lang = primary_subtag(language);
        self.lookup(&lang, key, category)
            .or_else(|| self.lookup(&self.default_language, key, category))
            .or_else(|| self.lookup(BUILTIN_LANGUAGE, key, category))
            .cloned()
            .unwrap_or_else(|| {
                debug!(language, key, category, "missing localization string");
                key.to_string()
            })
    }
}

/// Fill `{name}` placeholders in a localized template.
pub fn fill(template: &str, vars: &[(&str, &str)]) -> String {
    vars.iter().fold(template.to_string(), |acc, (name, value)| {
        acc.replace(&format!("{{{name}}}"), value)
    })
}

/// `pt-BR` → `pt`, `EN` → `en`.
fn primary_subtag(language: &str) -> String {
    language
        .split(['-', '_'])
        .next()
        .unwrap_or_default()
        .to_ascii_lowercase()
}
