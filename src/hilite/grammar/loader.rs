//! Grammar loading utilities
//!
//! Grammars without code hooks can live in data files. `GrammarLoader` reads
//! JSON or YAML, picking the format from the file extension.
//!
//! ```text
//! let grammar = GrammarLoader::from_path("grammars/ini.yaml")?.grammar;
//! registry.register_grammar(grammar)?;
//! ```

use crate::hilite::grammar::language::Grammar;
use std::fs;
use std::path::Path;

/// Error that can occur when loading grammars
#[derive(Debug, Clone)]
pub enum LoaderError {
    /// IO error when reading the file
    IoError(String),
    /// Malformed JSON grammar
    JsonError(String),
    /// Malformed YAML grammar
    YamlError(String),
    /// Extension other than `.json`, `.yaml` or `.yml`
    UnsupportedFormat(String),
}

impl std::fmt::Display for LoaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LoaderError::IoError(msg) => write!(f, "IO error: {}", msg),
            LoaderError::JsonError(msg) => write!(f, "Invalid JSON grammar: {}", msg),
            LoaderError::YamlError(msg) => write!(f, "Invalid YAML grammar: {}", msg),
            LoaderError::UnsupportedFormat(ext) => {
                write!(f, "Unsupported grammar file format: '{}'", ext)
            }
        }
    }
}

impl std::error::Error for LoaderError {}

impl From<std::io::Error> for LoaderError {
    fn from(err: std::io::Error) -> Self {
        LoaderError::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for LoaderError {
    fn from(err: serde_json::Error) -> Self {
        LoaderError::JsonError(err.to_string())
    }
}

impl From<serde_yaml::Error> for LoaderError {
    fn from(err: serde_yaml::Error) -> Self {
        LoaderError::YamlError(err.to_string())
    }
}

/// Data format of a grammar file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrammarFormat {
    Json,
    Yaml,
}

impl GrammarFormat {
    pub fn from_path(path: &Path) -> Result<Self, LoaderError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_lowercase();
        match ext.as_str() {
            "json" => Ok(GrammarFormat::Json),
            "yaml" | "yml" => Ok(GrammarFormat::Yaml),
            _ => Err(LoaderError::UnsupportedFormat(ext)),
        }
    }
}

/// A loaded grammar
pub struct GrammarLoader {
    pub grammar: Grammar,
}

impl GrammarLoader {
    /// Load from a `.json`, `.yaml` or `.yml` file
    ///
    /// A grammar without a `name` is named after the file stem.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self, LoaderError> {
        let path = path.as_ref();
        let format = GrammarFormat::from_path(path)?;
        let source = fs::read_to_string(path)?;
        let mut loader = Self::from_str(&source, format)?;
        if loader.grammar.name.is_empty() {
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                loader.grammar.name = stem.to_string();
            }
        }
        Ok(loader)
    }

    pub fn from_str(source: &str, format: GrammarFormat) -> Result<Self, LoaderError> {
        let grammar = match format {
            GrammarFormat::Json => serde_json::from_str(source)?,
            GrammarFormat::Yaml => serde_yaml::from_str(source)?,
        };
        Ok(Self { grammar })
    }

    pub fn from_json(source: &str) -> Result<Self, LoaderError> {
        Self::from_str(source, GrammarFormat::Json)
    }

    pub fn from_yaml(source: &str) -> Result<Self, LoaderError> {
        Self::from_str(source, GrammarFormat::Yaml)
    }

    /// Name a grammar file registers under: the lowercased grammar name
    pub fn language_name(&self) -> String {
        self.grammar.name.to_lowercase()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(
            GrammarFormat::from_path(&PathBuf::from("a/b.JSON")).unwrap(),
            GrammarFormat::Json
        );
        assert_eq!(
            GrammarFormat::from_path(&PathBuf::from("x.yml")).unwrap(),
            GrammarFormat::Yaml
        );
        assert!(matches!(
            GrammarFormat::from_path(&PathBuf::from("x.toml")),
            Err(LoaderError::UnsupportedFormat(ext)) if ext == "toml"
        ));
    }

    #[test]
    fn test_load_yaml() {
        let loader = GrammarLoader::from_yaml(
            "name: Ini\ncontains:\n  - scope: comment\n    begin: ';'\n    end: '$'\n",
        )
        .unwrap();
        assert_eq!(loader.language_name(), "ini");
        assert_eq!(loader.grammar.contains.len(), 1);
    }

    #[test]
    fn test_malformed_json() {
        let err = GrammarLoader::from_json("{ \"name\": ").err().unwrap();
        assert!(matches!(err, LoaderError::JsonError(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = GrammarLoader::from_path("does/not/exist.json").err().unwrap();
        assert!(matches!(err, LoaderError::IoError(_)));
    }
}
