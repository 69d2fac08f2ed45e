//! Output: stdout rendering and the on-disk project layout.
//!
//! A download is written as `<root>/<TYPE>/<config_id>.json` (the record's
//! entity array) plus one `config.yaml` per type describing its records.

use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use topo_core::model::EntitiesKind;
use topo_core::{ConfigRecord, ResultsByType};

use crate::cli::OutputFormat;
use crate::error::CliError;

/// Manifest file written next to each type's records.
pub const MANIFEST_FILE: &str = "config.yaml";

// ── stdout ───────────────────────────────────────────────────────────

/// Render rows in the chosen format.
pub fn render_list<T, R>(
    format: OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: Serialize,
    R: Tabled,
{
    Ok(match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Table::new(rows).with(Style::rounded()).to_string()
        }
        OutputFormat::Json => serde_json::to_string_pretty(data)?,
        OutputFormat::Plain => data.iter().map(id_fn).collect::<Vec<_>>().join("\n"),
    })
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

// ── Project layout ───────────────────────────────────────────────────

#[derive(Serialize)]
struct Manifest<'a> {
    configs: Vec<ManifestEntry<'a>>,
}

#[derive(Serialize)]
struct ManifestEntry<'a> {
    id: &'a str,
    config: ManifestConfig<'a>,
    #[serde(rename = "type")]
    kind: ManifestKind<'a>,
}

#[derive(Serialize)]
struct ManifestConfig<'a> {
    name: &'a str,
    template: String,
    skip: bool,
}

#[derive(Serialize)]
struct ManifestKind<'a> {
    entities: &'a EntitiesKind,
}

impl<'a> ManifestEntry<'a> {
    fn new(record: &'a ConfigRecord) -> Self {
        Self {
            id: record.config_id(),
            config: ManifestConfig {
                name: record
                    .parameters
                    .get(topo_core::model::NAME_PARAMETER)
                    .map_or(record.config_id(), String::as_str),
                template: template_file_name(record),
                skip: record.skip,
            },
            kind: ManifestKind {
                entities: &record.kind,
            },
        }
    }
}

fn template_file_name(record: &ConfigRecord) -> String {
    format!("{}.json", record.config_id())
}

/// Make a name usable as a directory name.
fn sanitize_file_name(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

/// Sanitize `name` into a single folder below its parent.
///
/// Names that collapse to nothing, `.` or `..` would point at or above the
/// parent and are refused.
pub fn folder_name(name: &str, field: &str) -> Result<String, CliError> {
    let folder = sanitize_file_name(name);
    if folder.chars().all(|c| c == '.') {
        return Err(CliError::Validation {
            field: field.into(),
            reason: format!("'{name}' does not name a folder"),
        });
    }
    Ok(folder)
}

/// Refuse to reuse an existing project folder unless forced.
pub fn ensure_writable(root: &Path, force: bool) -> Result<(), CliError> {
    if root.exists() && !force {
        return Err(CliError::OutputExists {
            path: root.display().to_string(),
        });
    }
    Ok(())
}

/// Map each type with records to its folder name.
///
/// Fails before anything is written when two types would share a folder.
/// Names are compared case-insensitively so the layout also holds on
/// case-insensitive filesystems.
fn type_folders(results: &ResultsByType) -> Result<Vec<(&str, &[ConfigRecord], String)>, CliError> {
    let mut owners: HashMap<String, &str> = HashMap::new();
    let mut folders = Vec::new();

    for (type_id, records) in results.iter() {
        if records.is_empty() {
            continue;
        }
        let folder = folder_name(type_id, "entity type")?;
        if let Some(first) = owners.insert(folder.to_ascii_lowercase(), type_id) {
            return Err(CliError::FolderCollision {
                folder,
                first: first.to_owned(),
                second: type_id.to_owned(),
            });
        }
        folders.push((type_id, records, folder));
    }

    Ok(folders)
}

/// Write every type with records below `root`. Returns the type folders
/// written, in type order.
pub fn write_results(results: &ResultsByType, root: &Path) -> Result<Vec<PathBuf>, CliError> {
    let mut written = Vec::new();

    for (type_id, records, folder) in type_folders(results)? {
        let dir = root.join(folder);
        std::fs::create_dir_all(&dir).map_err(|source| write_error(&dir, source))?;

        for record in records {
            let path = dir.join(template_file_name(record));
            std::fs::write(&path, &record.template.content)
                .map_err(|source| write_error(&path, source))?;
        }

        let manifest = Manifest {
            configs: records.iter().map(ManifestEntry::new).collect(),
        };
        let path = dir.join(MANIFEST_FILE);
        std::fs::write(&path, serde_yaml::to_string(&manifest)?)
            .map_err(|source| write_error(&path, source))?;

        tracing::debug!(type_id, dir = %dir.display(), "wrote entity type");
        written.push(dir);
    }

    Ok(written)
}

fn write_error(path: &Path, source: io::Error) -> CliError {
    CliError::Write {
        path: path.display().to_string(),
        source,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;
    use serde_json::value::RawValue;

    use topo_core::{TYPES_AS_ENTITIES_TYPE, to_config_record};

    use super::*;

    fn results() -> ResultsByType {
        let list = topo_core::EntityList {
            entities: vec![RawValue::from_string(r#"{"entityId":"HOST-1"}"#.into()).unwrap()],
            from: "1".into(),
            to: "2".into(),
        };
        let mut results = ResultsByType::new();
        results.insert("HOST", vec![to_config_record(&list, "HOST", "proj")]);
        results.insert(
            TYPES_AS_ENTITIES_TYPE,
            vec![to_config_record(&list, TYPES_AS_ENTITIES_TYPE, "proj")],
        );
        results
    }

    #[test]
    fn writes_records_and_manifest_per_type() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj");
        let results = results();

        let written = write_results(&results, &root).unwrap();
        assert_eq!(
            written,
            vec![root.join(TYPES_AS_ENTITIES_TYPE), root.join("HOST")]
        );

        let host = &results.get("HOST").unwrap()[0];
        let content =
            std::fs::read_to_string(root.join("HOST").join(format!("{}.json", host.config_id())))
                .unwrap();
        assert_eq!(content, r#"[{"entityId":"HOST-1"}]"#);

        let manifest: serde_yaml::Value =
            serde_yaml::from_str(&std::fs::read_to_string(root.join("HOST/config.yaml")).unwrap())
                .unwrap();
        let entry = &manifest["configs"][0];
        assert_eq!(entry["id"].as_str(), Some(host.config_id()));
        assert_eq!(entry["type"]["entities"]["entitiesType"].as_str(), Some("HOST"));
        assert_eq!(entry["config"]["skip"].as_bool(), Some(false));
    }

    #[test]
    fn existing_folder_needs_force() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            ensure_writable(dir.path(), false),
            Err(CliError::OutputExists { .. })
        ));
        assert!(ensure_writable(dir.path(), true).is_ok());
        assert!(ensure_writable(&dir.path().join("fresh"), false).is_ok());
    }

    #[test]
    fn sanitizes_type_ids() {
        assert_eq!(sanitize_file_name("HOST"), "HOST");
        assert_eq!(
            sanitize_file_name("cloud:gcp:k8s/node"),
            "cloud_gcp_k8s_node"
        );
    }

    #[test]
    fn dot_names_are_not_folders() {
        for name in ["", ".", "..", "...."] {
            assert!(
                matches!(folder_name(name, "project"), Err(CliError::Validation { .. })),
                "{name:?} accepted"
            );
        }
        assert_eq!(folder_name("../etc", "project").unwrap(), ".._etc");
        assert_eq!(folder_name(".hidden", "project").unwrap(), ".hidden");
    }

    #[test]
    fn parent_type_id_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj");
        let mut results = results();
        let list = topo_core::EntityList {
            entities: vec![RawValue::from_string("{}".into()).unwrap()],
            from: "1".into(),
            to: "2".into(),
        };
        results.insert("..", vec![to_config_record(&list, "..", "proj")]);

        assert!(matches!(
            write_results(&results, &root),
            Err(CliError::Validation { .. })
        ));
        assert!(!root.exists());
    }

    #[test]
    fn colliding_type_folders_are_refused() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("proj");
        let list = topo_core::EntityList {
            entities: vec![RawValue::from_string("{}".into()).unwrap()],
            from: "1".into(),
            to: "2".into(),
        };
        let mut results = ResultsByType::new();
        results.insert("a:b", vec![to_config_record(&list, "a:b", "proj")]);
        results.insert("a_b", vec![to_config_record(&list, "a_b", "proj")]);

        match write_results(&results, &root).unwrap_err() {
            CliError::FolderCollision { folder, first, second } => {
                assert_eq!(folder, "a_b");
                assert_eq!(first, "a:b");
                assert_eq!(second, "a_b");
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(!root.exists());
    }
}
