//! RecordTransformer - translation followed by filtering

use bytes::Bytes;
use contracts::TranslationConfig;
use serde_json::{Map, Value};

use crate::error::{Result, TranslatorError};
use crate::filter::{FilterEngine, ValueKind};
use crate::path::resolve;
use crate::spec::TranslationSpec;

/// Reshapes one JSON object and decides whether it is delivered
///
/// Immutable after construction; share it freely between dispatch tasks.
#[derive(Debug, Clone, Default)]
pub struct RecordTransformer {
    spec: TranslationSpec,
    filters: FilterEngine,
}

impl RecordTransformer {
    /// Combine a translation table with filter rules
    pub fn new(spec: TranslationSpec, filters: FilterEngine) -> Self {
        Self { spec, filters }
    }

    /// Build from receiver configuration
    ///
    /// # Errors
    /// [`TranslatorError::InvalidRule`] for a misconfigured filter rule
    pub fn from_config(config: &TranslationConfig) -> Result<Self> {
        Ok(Self {
            spec: TranslationSpec::from_config(config),
            filters: FilterEngine::from_config(&config.filters)?,
        })
    }

    /// Translation table
    pub fn spec(&self) -> &TranslationSpec {
        &self.spec
    }

    /// Filter rules
    pub fn filters(&self) -> &FilterEngine {
        &self.filters
    }

    /// Transform `obj`, or `None` when the record is filtered out
    ///
    /// Only top-level fields are considered. A field matching no entry is
    /// copied as is; a matching field is written under each entry's
    /// destination. Filters are evaluated against the original fields and
    /// drop the whole record.
    pub fn transform(&self, obj: &Map<String, Value>) -> Option<Map<String, Value>> {
        if !self.filters.passes_all(obj) {
            return None;
        }

        let mut output = Map::new();
        for (key, value) in obj {
            let mut translated = false;
            for entry in self.spec.entries_for(key) {
                translated = true;
                let resolved = if entry.path.len() == 1 {
                    Some(value)
                } else {
                    resolve(value, entry.path.tail())
                };
                output.insert(
                    entry.destination.clone(),
                    resolved.cloned().unwrap_or(Value::Null),
                );
            }
            if !translated {
                output.insert(key.clone(), value.clone());
            }
        }
        Some(output)
    }

    /// Parse, transform and re-serialize a JSON payload
    ///
    /// # Errors
    /// The payload is not JSON, or not a JSON object at the top level
    pub fn transform_bytes(&self, payload: &[u8]) -> Result<Option<Bytes>> {
        let value: Value = serde_json::from_slice(payload)?;
        let Value::Object(obj) = value else {
            return Err(TranslatorError::NotAnObject {
                found: ValueKind::of(&value).name(),
            });
        };

        match self.transform(&obj) {
            Some(output) => Ok(Some(Bytes::from(serde_json::to_vec(&output)?))),
            None => Ok(None),
        }
    }
}
