//! Language registry
//!
//! Maps language names and aliases to grammars. Names are case-insensitive.
//! Grammars are compiled on first use and the compiled form is kept for the
//! life of the registration, so every later highlight call shares it.
//!
//! A grammar that cannot be built or compiled does not take the registry down:
//! in safe mode the failure is logged and the language highlights as plain text.

use crate::hilite::compiling::{compile, CompileOptions, CompiledGrammar};
use crate::hilite::error::{GrammarError, HighlightError};
use crate::hilite::grammar::language::{Grammar, PLAINTEXT_NAME};
use once_cell::sync::OnceCell;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

#[derive(Debug)]
struct LanguageEntry {
    grammar: Arc<Grammar>,
    compiled: OnceCell<Result<Arc<CompiledGrammar>, GrammarError>>,
}

impl LanguageEntry {
    fn new(grammar: Grammar) -> Self {
        Self {
            grammar: Arc::new(grammar),
            compiled: OnceCell::new(),
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    languages: HashMap<String, Arc<LanguageEntry>>,
    /// alias -> canonical name
    aliases: HashMap<String, String>,
}

impl Inner {
    fn entry(&self, key: &str) -> Option<&Arc<LanguageEntry>> {
        self.languages.get(key).or_else(|| {
            self.aliases
                .get(key)
                .and_then(|canonical| self.languages.get(canonical))
        })
    }
}

/// Registry of highlightable languages
#[derive(Debug)]
pub struct Registry {
    inner: RwLock<Inner>,
    safe_mode: bool,
    options: CompileOptions,
    plaintext: OnceCell<Arc<CompiledGrammar>>,
}

impl Registry {
    /// Empty registry in safe mode with default keyword scoring
    pub fn new() -> Self {
        Self::with_options(true, CompileOptions::default())
    }

    pub fn with_options(safe_mode: bool, options: CompileOptions) -> Self {
        Registry {
            inner: RwLock::new(Inner::default()),
            safe_mode,
            options,
            plaintext: OnceCell::new(),
        }
    }

    pub fn safe_mode(&self) -> bool {
        self.safe_mode
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register the grammar built by `factory` under `name`
    ///
    /// The grammar's own aliases are registered along with it. If the factory
    /// fails, safe mode registers the plain text grammar in its place; otherwise
    /// the error is returned and nothing is registered.
    pub fn register_language<F>(&self, name: &str, factory: F) -> Result<(), GrammarError>
    where
        F: FnOnce() -> Result<Grammar, GrammarError>,
    {
        let mut grammar = match factory() {
            Ok(grammar) => grammar,
            Err(err) => {
                log::error!("Language definition for '{name}' could not be registered: {err}");
                if !self.safe_mode {
                    return Err(err);
                }
                Grammar::plaintext()
            }
        };
        if grammar.name.is_empty() {
            grammar.name = name.to_string();
        }

        let key = name.to_lowercase();
        let aliases = grammar.aliases.clone();
        let mut inner = self.write();
        inner
            .languages
            .insert(key.clone(), Arc::new(LanguageEntry::new(grammar)));
        for alias in aliases {
            inner.aliases.insert(alias.to_lowercase(), key.clone());
        }
        log::debug!("Registered language '{key}'");
        Ok(())
    }

    /// Register an already built grammar
    pub fn register_grammar(&self, name: &str, grammar: Grammar) -> Result<(), GrammarError> {
        self.register_language(name, || Ok(grammar))
    }

    /// Remove a language and every alias pointing at it
    pub fn unregister_language(&self, name: &str) {
        let key = name.to_lowercase();
        let mut inner = self.write();
        inner.languages.remove(&key);
        inner.aliases.retain(|_, canonical| *canonical != key);
    }

    /// Point additional names at a registered language
    pub fn register_aliases<I, S>(&self, aliases: I, language_name: &str)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let canonical = language_name.to_lowercase();
        let mut inner = self.write();
        for alias in aliases {
            inner
                .aliases
                .insert(alias.as_ref().to_lowercase(), canonical.clone());
        }
    }

    /// Sorted canonical names
    pub fn list_languages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.read().languages.keys().cloned().collect();
        names.sort();
        names
    }

    /// The raw grammar registered under a name or alias
    pub fn get_language(&self, name: &str) -> Option<Arc<Grammar>> {
        self.read()
            .entry(&name.to_lowercase())
            .map(|entry| Arc::clone(&entry.grammar))
    }

    pub fn has_language(&self, name: &str) -> bool {
        self.read().entry(&name.to_lowercase()).is_some()
    }

    /// Whether the language takes part in auto-detection
    pub fn auto_detection(&self, name: &str) -> bool {
        self.get_language(name)
            .is_some_and(|grammar| !grammar.disable_autodetect)
    }

    /// The language a registered grammar declares itself a superset of
    pub fn superset_of(&self, name: &str) -> Option<String> {
        self.get_language(name)
            .and_then(|grammar| grammar.superset_of.clone())
    }

    /// The compiled grammar for a name or alias, compiling it on first use
    pub fn compiled(&self, name: &str) -> Result<Arc<CompiledGrammar>, HighlightError> {
        let entry = self
            .read()
            .entry(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| HighlightError::UnknownLanguage(name.to_string()))?;

        let compiled = entry.compiled.get_or_init(|| {
            compile(&entry.grammar, &self.options)
                .map(Arc::new)
                .inspect_err(|err| {
                    log::error!(
                        "Language definition for '{}' could not be compiled: {err}",
                        entry.grammar.name
                    );
                })
        });

        match compiled {
            Ok(grammar) => Ok(Arc::clone(grammar)),
            Err(_) if self.safe_mode => self.plaintext(),
            Err(err) => Err(HighlightError::Grammar {
                language: name.to_string(),
                source: err.clone(),
            }),
        }
    }

    /// The compiled plain text grammar stood in for broken languages
    pub fn plaintext(&self) -> Result<Arc<CompiledGrammar>, HighlightError> {
        self.plaintext
            .get_or_try_init(|| compile(&Grammar::plaintext(), &self.options).map(Arc::new))
            .map(Arc::clone)
            .map_err(|source| HighlightError::Grammar {
                language: PLAINTEXT_NAME.to_string(),
                source,
            })
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hilite::grammar::mode::Mode;

    fn mini() -> Grammar {
        Grammar::new("Mini")
            .alias("mn")
            .contains([Mode::new().scope("string").begin("\"").end("\"")])
    }

    #[test]
    fn test_register_and_lookup() {
        let registry = Registry::new();
        registry.register_grammar("Mini", mini()).unwrap();

        assert!(registry.has_language("mini"));
        assert!(registry.has_language("MINI"));
        assert!(registry.has_language("mn"));
        assert_eq!(registry.get_language("mn").unwrap().name, "Mini");
        assert_eq!(registry.list_languages(), vec!["mini"]);
    }

    #[test]
    fn test_unregister_drops_aliases() {
        let registry = Registry::new();
        registry.register_grammar("mini", mini()).unwrap();
        registry.register_aliases(["tiny"], "mini");
        registry.unregister_language("mini");

        assert!(!registry.has_language("mini"));
        assert!(!registry.has_language("mn"));
        assert!(!registry.has_language("tiny"));
    }

    #[test]
    fn test_compiled_is_cached() {
        let registry = Registry::new();
        registry.register_grammar("mini", mini()).unwrap();
        let first = registry.compiled("mini").unwrap();
        let second = registry.compiled("mn").unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_unknown_language() {
        let registry = Registry::new();
        assert_eq!(
            registry.compiled("nope").unwrap_err(),
            HighlightError::UnknownLanguage("nope".to_string())
        );
    }

    #[test]
    fn test_failing_factory_falls_back_to_plaintext() {
        let registry = Registry::new();
        registry
            .register_language("broken", || {
                Err(GrammarError::FactoryFailed("boom".to_string()))
            })
            .unwrap();
        assert_eq!(registry.get_language("broken").unwrap().name, PLAINTEXT_NAME);
        assert!(!registry.auto_detection("broken"));
    }

    #[test]
    fn test_failing_factory_in_strict_mode() {
        let registry = Registry::with_options(false, CompileOptions::default());
        let err = registry
            .register_language("broken", || {
                Err(GrammarError::FactoryFailed("boom".to_string()))
            })
            .unwrap_err();
        assert_eq!(err, GrammarError::FactoryFailed("boom".to_string()));
        assert!(!registry.has_language("broken"));
    }

    #[test]
    fn test_compile_failure_substitutes_plaintext() {
        let registry = Registry::new();
        let bad = Grammar::new("bad").contains([Mode::new().match_pattern("a").begin("b")]);
        registry.register_grammar("bad", bad).unwrap();
        let compiled = registry.compiled("bad").unwrap();
        assert_eq!(compiled.name, PLAINTEXT_NAME);
    }

    #[test]
    fn test_compile_failure_in_strict_mode() {
        let registry = Registry::with_options(false, CompileOptions::default());
        let bad = Grammar::new("bad").contains([Mode::new().match_pattern("a").begin("b")]);
        registry.register_grammar("bad", bad).unwrap();
        match registry.compiled("bad") {
            Err(HighlightError::Grammar { language, source }) => {
                assert_eq!(language, "bad");
                assert_eq!(source, GrammarError::MatchWithBeginEnd);
            }
            other => panic!("Expected grammar error, got {other:?}"),
        }
    }

    #[test]
    fn test_superset_and_autodetect_flags() {
        let registry = Registry::new();
        registry
            .register_grammar("derived", Grammar::new("derived").superset_of("base"))
            .unwrap();
        registry
            .register_grammar("hidden", Grammar::new("hidden").disable_autodetect())
            .unwrap();
        assert_eq!(registry.superset_of("derived"), Some("base".to_string()));
        assert!(registry.auto_detection("derived"));
        assert!(!registry.auto_detection("hidden"));
        assert!(!registry.auto_detection("missing"));
    }
}
