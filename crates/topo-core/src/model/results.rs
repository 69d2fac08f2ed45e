// ── Download results ──

use std::collections::BTreeMap;

use super::config_record::ConfigRecord;

/// Reserved key for the type catalog stored as a pseudo entity type.
pub const TYPES_AS_ENTITIES_TYPE: &str = "ENTITY_TYPES_CATALOG";

/// Records per entity type, plus the types that failed and why.
///
/// Each type key is written at most once per run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultsByType {
    configs: BTreeMap<String, Vec<ConfigRecord>>,
    failures: BTreeMap<String, String>,
}

impl ResultsByType {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a type's records. A key that is already present is left alone
    /// and `false` is returned.
    pub fn insert(&mut self, type_id: impl Into<String>, records: Vec<ConfigRecord>) -> bool {
        match self.configs.entry(type_id.into()) {
            std::collections::btree_map::Entry::Vacant(slot) => {
                slot.insert(records);
                true
            }
            std::collections::btree_map::Entry::Occupied(_) => false,
        }
    }

    pub fn record_failure(&mut self, type_id: impl Into<String>, message: impl Into<String>) {
        self.failures.insert(type_id.into(), message.into());
    }

    pub fn get(&self, type_id: &str) -> Option<&[ConfigRecord]> {
        self.configs.get(type_id).map(Vec::as_slice)
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.configs.contains_key(type_id)
    }

    /// Type keys in sorted order, including the catalog pseudo-type.
    pub fn type_ids(&self) -> impl Iterator<Item = &str> {
        self.configs.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[ConfigRecord])> {
        self.configs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn failures(&self) -> &BTreeMap<String, String> {
        &self.failures
    }

    /// Number of real entity types with records; the catalog is not counted.
    pub fn entity_type_count(&self) -> usize {
        self.configs
            .iter()
            .filter(|(k, v)| k.as_str() != TYPES_AS_ENTITIES_TYPE && !v.is_empty())
            .count()
    }

    pub fn catalog(&self) -> Option<&[ConfigRecord]> {
        self.get(TYPES_AS_ENTITIES_TYPE)
    }
}
