// ── Configuration records ──
//
// The canonical output unit of a download: one type's serialized entity
// array, a stable identity, and the timeframe it was fetched for.

use std::collections::BTreeMap;

use serde::Serialize;

/// Parameter holding the record's display name.
pub const NAME_PARAMETER: &str = "name";

/// Where a record lives: project, type and stable id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub project: String,
    #[serde(rename = "type")]
    pub type_id: String,
    pub config_id: String,
}

/// Serialized content of one record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    /// JSON array of entities; empty when there were none.
    pub content: String,
}

/// The entity type and window a record was downloaded for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitiesKind {
    pub entities_type: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigRecord {
    pub coordinate: Coordinate,
    pub template: Template,
    pub kind: EntitiesKind,
    pub parameters: BTreeMap<String, String>,
    pub skip: bool,
}

impl ConfigRecord {
    pub fn config_id(&self) -> &str {
        &self.coordinate.config_id
    }

    pub fn type_id(&self) -> &str {
        &self.coordinate.type_id
    }
}
