// ── Entity list → configuration record ──
//
// Bridges raw `topo_api` listings into `ConfigRecord`s. Identifiers are
// derived from the type name alone, so re-downloading a type always lands
// on the same id.

use std::collections::BTreeMap;

use uuid::Uuid;

use topo_api::{EntityList, EntityRecord};

use crate::model::{ConfigRecord, Coordinate, EntitiesKind, NAME_PARAMETER, Template};

/// Namespace for name-derived configuration ids.
const CONFIG_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f6e_6574_6f70_4f00_8000_656e_7469_7479);

/// Deterministic configuration id for a name.
pub fn config_id_from_name(name: &str) -> String {
    Uuid::new_v5(&CONFIG_ID_NAMESPACE, name.as_bytes()).to_string()
}

/// Join raw records into one JSON array literal.
///
/// No records yields an empty string rather than `[]`.
pub fn join_json_array(records: &[EntityRecord]) -> String {
    if records.is_empty() {
        return String::new();
    }

    let len = records.iter().map(|r| r.get().len() + 1).sum::<usize>() + 1;
    let mut out = String::with_capacity(len);
    out.push('[');
    for (i, record) in records.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        out.push_str(record.get());
    }
    out.push(']');
    out
}

/// Convert one type's listing into its configuration record.
pub fn to_config_record(list: &EntityList, type_id: &str, project: &str) -> ConfigRecord {
    let config_id = config_id_from_name(type_id);

    let mut parameters = BTreeMap::new();
    parameters.insert(NAME_PARAMETER.to_owned(), config_id.clone());

    ConfigRecord {
        coordinate: Coordinate {
            project: project.to_owned(),
            type_id: type_id.to_owned(),
            config_id,
        },
        template: Template {
            id: type_id.to_owned(),
            name: type_id.to_owned(),
            content: join_json_array(&list.entities),
        },
        kind: EntitiesKind {
            entities_type: type_id.to_owned(),
            from: list.from.clone(),
            to: list.to.clone(),
        },
        parameters,
        skip: false,
    }
}
