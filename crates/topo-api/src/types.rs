// Wire types for the entity and entity-type endpoints.
//
// Entities are kept as raw JSON: their shape differs per type and is
// never interpreted here. Type descriptors are parsed just far enough to
// answer "does relationship/property X.Y exist for this type".

use std::collections::{BTreeMap, BTreeSet};

use serde::Deserialize;
use serde_json::value::RawValue;

// ── Entities ─────────────────────────────────────────────────────────

/// One raw entity exactly as the platform returned it.
pub type EntityRecord = Box<RawValue>;

/// A page of `GET /api/v2/entities`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntitiesPage {
    #[serde(default)]
    pub total_count: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub next_page_key: Option<String>,
    #[serde(default)]
    pub entities: Vec<EntityRecord>,
}

/// A page of `GET /api/v2/entityTypes`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityTypesPage {
    #[serde(default)]
    pub total_count: Option<i64>,
    #[serde(default)]
    pub page_size: Option<i64>,
    #[serde(default)]
    pub next_page_key: Option<String>,
    #[serde(default)]
    pub types: Vec<EntityRecord>,
}

/// All records fetched for one type, with the window actually requested.
///
/// `from`/`to` are millisecond epoch timestamps rendered as strings.
#[derive(Debug, Clone)]
pub struct EntityList {
    pub entities: Vec<EntityRecord>,
    pub from: String,
    pub to: String,
}

// ── Entity type descriptors ──────────────────────────────────────────

/// One fetchable entity type from the type catalog.
///
/// Every top-level array in the descriptor whose elements carry an `id`
/// (`toRelationships`, `fromRelationships`, `properties`, ...) is indexed
/// at parse time, so field lookups need no introspection later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityTypeDescriptor {
    type_id: String,
    fields: BTreeMap<String, BTreeSet<String>>,
}

#[derive(Deserialize)]
struct DescriptorShape {
    #[serde(rename = "type")]
    type_id: String,
    #[serde(flatten)]
    rest: serde_json::Map<String, serde_json::Value>,
}

impl EntityTypeDescriptor {
    /// Build a descriptor by hand (mostly useful in tests).
    pub fn new<I, S>(type_id: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = (S, Vec<S>)>,
        S: Into<String>,
    {
        let fields = fields
            .into_iter()
            .map(|(top, ids)| (top.into(), ids.into_iter().map(Into::into).collect()))
            .collect();
        Self {
            type_id: type_id.into(),
            fields,
        }
    }

    /// Parse one descriptor from the raw catalog record.
    pub fn from_raw(raw: &RawValue) -> Result<Self, serde_json::Error> {
        let shape: DescriptorShape = serde_json::from_str(raw.get())?;

        let fields = shape
            .rest
            .into_iter()
            .filter_map(|(name, value)| {
                let serde_json::Value::Array(items) = value else {
                    return None;
                };
                let ids: BTreeSet<String> = items
                    .iter()
                    .filter_map(|item| item.get("id").and_then(serde_json::Value::as_str))
                    .map(str::to_owned)
                    .collect();
                Some((name, ids))
            })
            .collect();

        Ok(Self {
            type_id: shape.type_id,
            fields,
        })
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    /// Whether `top_field` lists an element with `id == sub_id`.
    pub fn has_relation_field(&self, top_field: &str, sub_id: &str) -> bool {
        self.fields
            .get(top_field)
            .is_some_and(|ids| ids.contains(sub_id))
    }

    /// Number of ids listed under `top_field`.
    pub fn field_count(&self, top_field: &str) -> usize {
        self.fields.get(top_field).map_or(0, BTreeSet::len)
    }
}

// ── Error envelope ───────────────────────────────────────────────────

/// Structured error body returned on rejected requests.
#[derive(Debug, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    pub code: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub constraint_violations: Vec<ConstraintViolation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConstraintViolation {
    #[serde(default)]
    pub path: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub parameter_location: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl ErrorEnvelope {
    /// Parse a response body, returning `None` for anything else.
    pub fn parse(body: &str) -> Option<Self> {
        serde_json::from_str(body).ok()
    }
}
