use std::collections::HashMap;

use serde_json::Value;

use crate::content::provider::{ContentProvider, ContentRequest, ProviderError, ProviderIdentity};
use crate::content::schema::wrap_envelope;

/// Serves content recorded in a manifest, keyed by block id.
///
/// Used to regenerate a sample exactly even when the original provider was non-deterministic.
#[derive(Debug, Clone, Default)]
pub struct ReplayProvider {
    values: HashMap<String, Value>,
}

impl ReplayProvider {
    /// Build from `(block id, value)` pairs.
    pub fn new(records: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            values: records.into_iter().collect(),
        }
    }

    /// Number of recorded slots.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Return `true` when nothing was recorded.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl ContentProvider for ReplayProvider {
    fn identity(&self) -> ProviderIdentity {
        ProviderIdentity {
            kind: "replay".to_owned(),
            model: "manifest".to_owned(),
        }
    }

    fn generate(&self, request: &ContentRequest<'_>) -> Result<String, ProviderError> {
        self.values
            .get(request.block_id)
            .map(|v| wrap_envelope(v.clone()))
            .ok_or_else(|| ProviderError::NotRecorded(request.block_id.to_owned()))
    }
}
