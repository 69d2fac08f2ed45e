// ── Field selection ──
//
// Computes the `fields` query parameter for one entity type. The result
// starts from a small default set and adds `top.sub` extras only when the
// type descriptor declares them and neither part has been excluded.

use std::collections::BTreeSet;

use topo_api::EntityTypeDescriptor;

/// Fields requested for every type.
///
/// The full export would also ask for tags, management zones, both
/// relationship directions, icon and properties.
pub const DEFAULT_FIELDS: &[&str] = &["lastSeenTms", "firstSeenTms"];

// ── Exclusion set ────────────────────────────────────────────────────

/// Field names the platform rejected for one type.
///
/// Only grows: there is no way to un-exclude a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldExclusionSet(BTreeSet<String>);

impl FieldExclusionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field; returns `false` if it was already excluded.
    pub fn insert(&mut self, field: impl Into<String>) -> bool {
        self.0.insert(field.into())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Whether `top.sub` is excluded by its top field, sub field, or full path.
    fn excludes_pair(&self, top: &str, sub: &str) -> bool {
        self.contains(top) || self.contains(sub) || self.contains(&format!("{top}.{sub}"))
    }
}

// ── Rules ────────────────────────────────────────────────────────────

/// A top-level field and the sub-field ids worth requesting under it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub top_field: String,
    pub sub_fields: Vec<String>,
}

impl FieldRule {
    pub fn new(top_field: &str, sub_fields: &[&str]) -> Self {
        Self {
            top_field: top_field.to_owned(),
            sub_fields: sub_fields.iter().map(|s| (*s).to_owned()).collect(),
        }
    }
}

/// Ordered rule tables consulted by the selector.
///
/// Tables are visited in order and every qualifying field from every table
/// is kept; a field listed by several tables is requested once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRules {
    pub tables: Vec<Vec<FieldRule>>,
}

impl FieldRules {
    pub fn new(tables: Vec<Vec<FieldRule>>) -> Self {
        Self { tables }
    }

    pub fn empty() -> Self {
        Self { tables: Vec::new() }
    }

    /// General extras: site and cluster membership.
    pub fn general() -> Vec<FieldRule> {
        vec![FieldRule::new(
            "toRelationships",
            &["isSiteOf", "isClusterOfHost"],
        )]
    }

    /// Relationships used to index entities across environments.
    pub fn index() -> Vec<FieldRule> {
        vec![
            FieldRule::new("fromRelationships", &["isInstanceOf", "runsOn", "isProcessOf"]),
            FieldRule::new("toRelationships", &["isSiteOf"]),
        ]
    }

    /// Relationships that place an entity in its parent hierarchy.
    pub fn hierarchy() -> Vec<FieldRule> {
        vec![
            FieldRule::new(
                "fromRelationships",
                &["belongsTo", "isGroupOf", "isApplicationMethodOf", "isServiceMethodOf"],
            ),
            FieldRule::new("toRelationships", &["isNetworkClientOfHost", "isDiskOf"]),
        ]
    }
}

impl Default for FieldRules {
    fn default() -> Self {
        Self::new(vec![Self::general(), Self::index(), Self::hierarchy()])
    }
}

// ── Selector ─────────────────────────────────────────────────────────

/// Builds field specs from injected rule tables.
///
/// `select` is a pure function of its inputs, so it is safe to call again
/// after every retry with a grown exclusion set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldSelector {
    defaults: Vec<String>,
    rules: FieldRules,
}

impl Default for FieldSelector {
    fn default() -> Self {
        Self::new(FieldRules::default())
    }
}

impl FieldSelector {
    pub fn new(rules: FieldRules) -> Self {
        Self {
            defaults: DEFAULT_FIELDS.iter().map(|f| (*f).to_owned()).collect(),
            rules,
        }
    }

    /// Compute the `fields` parameter, e.g. `+lastSeenTms,+toRelationships.isSiteOf`.
    pub fn select(&self, descriptor: &EntityTypeDescriptor, excluded: &FieldExclusionSet) -> String {
        let mut chosen: Vec<String> = self
            .defaults
            .iter()
            .filter(|f| !excluded.contains(f))
            .cloned()
            .collect();

        for rule in self.rules.tables.iter().flatten() {
            for sub in &rule.sub_fields {
                if excluded.excludes_pair(&rule.top_field, sub)
                    || !descriptor.has_relation_field(&rule.top_field, sub)
                {
                    continue;
                }
                let field = format!("{}.{sub}", rule.top_field);
                if !chosen.contains(&field) {
                    chosen.push(field);
                }
            }
        }

        chosen
            .iter()
            .map(|f| format!("+{f}"))
            .collect::<Vec<_>>()
            .join(",")
    }
}
