//! TranslationSpec - compiled `path -> destination` table

use std::collections::HashMap;

use contracts::TranslationConfig;

use crate::path::PathExpression;

/// One compiled rename rule
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationEntry {
    /// Path as configured
    pub raw_path: String,
    /// Parsed path
    pub path: PathExpression,
    /// Output field name
    pub destination: String,
}

/// Compiled translation table
///
/// Entries are ordered lexicographically by their configured path, so that
/// "last write wins" on a shared destination is reproducible.
#[derive(Debug, Clone, Default)]
pub struct TranslationSpec {
    entries: Vec<TranslationEntry>,
    by_head: HashMap<String, Vec<usize>>,
}

impl TranslationSpec {
    /// Compile a `path -> destination` table split on `separator`
    pub fn new<I, K, V>(table: I, separator: &str) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut pairs: Vec<(String, String)> = table
            .into_iter()
            .map(|(path, destination)| (path.into(), destination.into()))
            .collect();
        pairs.sort();

        let entries: Vec<TranslationEntry> = pairs
            .into_iter()
            .map(|(raw_path, destination)| TranslationEntry {
                path: PathExpression::parse(&raw_path, separator),
                raw_path,
                destination,
            })
            .collect();

        let mut by_head: HashMap<String, Vec<usize>> = HashMap::new();
        for (idx, entry) in entries.iter().enumerate() {
            by_head
                .entry(entry.path.head().as_key().to_string())
                .or_default()
                .push(idx);
        }

        Self { entries, by_head }
    }

    /// Compile from configuration
    pub fn from_config(config: &TranslationConfig) -> Self {
        Self::new(
            config.paths.iter().map(|(k, v)| (k.as_str(), v.as_str())),
            &config.separator,
        )
    }

    /// All entries in application order
    pub fn entries(&self) -> &[TranslationEntry] {
        &self.entries
    }

    /// Entries whose first segment equals `key`, in application order
    pub fn entries_for<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a TranslationEntry> + 'a {
        self.by_head
            .get(key)
            .into_iter()
            .flatten()
            .map(|&idx| &self.entries[idx])
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
