//! Configuration loader
//!
//! `defaults/hilite.default.toml` is embedded into the crate so documented and
//! runtime defaults stay in sync. Applications layer their own files on top of
//! those defaults via [`Loader`] before deserializing into [`HighlightConfig`].

use crate::hilite::compiling::CompileOptions;
use crate::hilite::keywords::KeywordScoring;
use config::builder::DefaultState;
use config::{Config, ConfigBuilder, File, FileFormat, ValueKind};
use serde::Deserialize;
use std::path::Path;

pub use config::ConfigError;

const DEFAULT_TOML: &str = include_str!("../../defaults/hilite.default.toml");

/// Top-level configuration
#[derive(Debug, Clone, Deserialize)]
pub struct HighlightConfig {
    pub highlight: HighlightSettings,
}

/// Engine knobs under `[highlight]`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HighlightSettings {
    pub safe_mode: bool,
    pub class_prefix: String,
    pub max_keyword_hits: usize,
    pub common_keywords: Vec<String>,
    pub max_iterations: usize,
    pub autodetect_ignore_illegals: bool,
    pub languages: Vec<String>,
}

impl HighlightSettings {
    pub fn keyword_scoring(&self) -> KeywordScoring {
        KeywordScoring::new(self.common_keywords.iter().cloned(), self.max_keyword_hits)
    }

    pub fn compile_options(&self) -> CompileOptions {
        CompileOptions {
            scoring: self.keyword_scoring(),
        }
    }
}

impl Default for HighlightSettings {
    fn default() -> Self {
        let scoring = KeywordScoring::default();
        let mut common_keywords: Vec<String> = scoring.common_keywords.into_iter().collect();
        common_keywords.sort();
        Self {
            safe_mode: true,
            class_prefix: crate::hilite::formats::DEFAULT_CLASS_PREFIX.to_string(),
            max_keyword_hits: scoring.max_hits,
            common_keywords,
            max_iterations: 100_000,
            autodetect_ignore_illegals: true,
            languages: Vec::new(),
        }
    }
}

/// Layers user overrides over the built-in defaults
#[derive(Debug, Clone)]
pub struct Loader {
    builder: ConfigBuilder<DefaultState>,
}

impl Loader {
    /// Start from the embedded defaults
    pub fn new() -> Self {
        let builder = Config::builder().add_source(File::from_str(DEFAULT_TOML, FileFormat::Toml));
        Self { builder }
    }

    /// Layer a configuration file; a missing file is an error
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(true);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Layer a configuration file if it exists
    pub fn with_optional_file(mut self, path: impl AsRef<Path>) -> Self {
        let source = File::from(path.as_ref())
            .format(FileFormat::Toml)
            .required(false);
        self.builder = self.builder.add_source(source);
        self
    }

    /// Override a single key, e.g. from a command line flag
    pub fn set_override<I>(mut self, key: &str, value: I) -> Result<Self, ConfigError>
    where
        I: Into<ValueKind>,
    {
        self.builder = self.builder.set_override(key, value)?;
        Ok(self)
    }

    pub fn build(self) -> Result<HighlightConfig, ConfigError> {
        self.builder.build()?.try_deserialize()
    }
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

/// The embedded defaults alone
pub fn load_defaults() -> Result<HighlightConfig, ConfigError> {
    Loader::new().build()
}
