//! `topo types`: list the entity type catalog.

use serde::Serialize;
use tabled::Tabled;

use topo_core::{Downloader, EntityTypeDescriptor};

use crate::cli::{GlobalOpts, TypesArgs};
use crate::error::CliError;
use crate::{config, output};

// ── Table row ───────────────────────────────────────────────────────

#[derive(Clone, Serialize, Tabled)]
#[serde(rename_all = "camelCase")]
struct TypeRow {
    #[tabled(rename = "Type")]
    #[serde(rename = "type")]
    type_id: String,
    #[tabled(rename = "From rel.")]
    from_relationships: usize,
    #[tabled(rename = "To rel.")]
    to_relationships: usize,
    #[tabled(rename = "Properties")]
    properties: usize,
}

impl From<&EntityTypeDescriptor> for TypeRow {
    fn from(d: &EntityTypeDescriptor) -> Self {
        Self {
            type_id: d.type_id().to_owned(),
            from_relationships: d.field_count("fromRelationships"),
            to_relationships: d.field_count("toRelationships"),
            properties: d.field_count("properties"),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: TypesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let env = config::resolve_environment(global, &cfg)?;
    let settings = cfg.defaults.download_settings();
    let downloader = Downloader::new(env.connect(settings.concurrent_requests)?, settings);

    let catalog = downloader
        .catalog()
        .await
        .map_err(|e| CliError::from_core(e, env.url.as_str()))?;

    let mut rows: Vec<TypeRow> = catalog.types.iter().map(TypeRow::from).collect();
    rows.sort_by(|a, b| a.type_id.cmp(&b.type_id));

    let out = output::render_list(
        args.output,
        &rows,
        TypeRow::clone,
        |r| r.type_id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}
