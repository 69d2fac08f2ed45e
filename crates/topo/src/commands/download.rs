//! `topo download entities`: fetch entity types and write the project.

use std::path::PathBuf;

use topo_config::Defaults;
use topo_core::{DownloadSettings, Downloader};

use crate::cli::{DownloadArgs, DownloadCommand, EntitiesArgs, GlobalOpts};
use crate::error::CliError;
use crate::{config, output};

pub async fn handle(args: DownloadArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        DownloadCommand::Entities(args) => entities(args, global).await,
    }
}

async fn entities(args: EntitiesArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let settings = download_settings(&args, &cfg.defaults)?;

    let output_folder: PathBuf = args
        .output_folder
        .clone()
        .unwrap_or_else(|| cfg.defaults.output_folder.clone());
    let root = output_folder.join(output::folder_name(&settings.project_name, "project")?);
    output::ensure_writable(&root, args.force)?;

    let env = config::resolve_environment(global, &cfg)?;
    let client = env.connect(settings.concurrent_requests)?;
    let downloader = Downloader::new(client, settings);

    tracing::debug!(url = %env.url, types = ?args.specific_types, "downloading entities");
    let results = downloader
        .download_entities(&args.specific_types)
        .await
        .map_err(|e| CliError::from_core(e, env.url.as_str()))?;

    let Some(results) = results else {
        if !global.quiet {
            eprintln!("No entities were found. No files will be created.");
        }
        return Ok(());
    };

    if root.exists() {
        std::fs::remove_dir_all(&root).map_err(|source| CliError::Write {
            path: root.display().to_string(),
            source,
        })?;
    }
    output::write_results(&results, &root)?;

    if !global.quiet {
        for (type_id, reason) in results.failures() {
            eprintln!("Skipped {type_id}: {reason}");
        }
        eprintln!(
            "Downloaded {} entity types to {}",
            results.entity_type_count(),
            root.display()
        );
    }
    Ok(())
}

/// Config defaults with command-line overrides applied.
fn download_settings(args: &EntitiesArgs, defaults: &Defaults) -> Result<DownloadSettings, CliError> {
    let mut settings = defaults.download_settings();

    if let Some(minutes) = args.time_from_minutes {
        settings.list.time_from_minutes = minutes;
    }
    if let Some(minutes) = args.time_to_minutes {
        settings.list.time_to_minutes = minutes;
    }
    if let Some(size) = args.entity_page_size {
        settings.list.entity_page_size = size;
    }
    if let Some(limit) = args.concurrent_requests {
        settings.concurrent_requests = limit;
    }
    if let Some(ref project) = args.project {
        settings.project_name.clone_from(project);
    }

    if settings.list.time_from_minutes < settings.list.time_to_minutes {
        return Err(CliError::Validation {
            field: "time-from-minutes".into(),
            reason: format!(
                "window start ({} min ago) is after its end ({} min ago)",
                settings.list.time_from_minutes, settings.list.time_to_minutes
            ),
        });
    }
    if let Err(e) = settings.list.timeframe() {
        return Err(CliError::Validation {
            field: "time-from-minutes".into(),
            reason: e.to_string(),
        });
    }
    if settings.project_name.trim().is_empty() {
        return Err(CliError::Validation {
            field: "project".into(),
            reason: "must not be empty".into(),
        });
    }
    output::folder_name(&settings.project_name, "project")?;

    Ok(settings)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use clap::Parser;

    use crate::cli::{Cli, Command};

    use super::*;

    fn entities_args(argv: &[&str]) -> EntitiesArgs {
        let cli = Cli::try_parse_from(argv).unwrap();
        match cli.command {
            Command::Download(DownloadArgs {
                command: DownloadCommand::Entities(args),
            }) => args,
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn flags_override_defaults() {
        let args = entities_args(&[
            "topo",
            "download",
            "entities",
            "--specific-types",
            "HOST,SERVICE",
            "--time-from-minutes",
            "120",
            "--entity-page-size",
            "50",
            "--concurrent-requests",
            "2",
            "--project",
            "demo",
        ]);
        assert_eq!(args.specific_types, vec!["HOST", "SERVICE"]);

        let settings = download_settings(&args, &Defaults::default()).unwrap();
        assert_eq!(settings.list.time_from_minutes, 120);
        assert_eq!(settings.list.time_to_minutes, 0);
        assert_eq!(settings.list.entity_page_size, 50);
        assert_eq!(settings.concurrent_requests, 2);
        assert_eq!(settings.project_name, "demo");
    }

    #[test]
    fn inverted_window_is_rejected() {
        let args = entities_args(&[
            "topo",
            "download",
            "entities",
            "--time-from-minutes",
            "10",
            "--time-to-minutes",
            "60",
        ]);
        assert!(matches!(
            download_settings(&args, &Defaults::default()),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn unrepresentable_window_is_rejected() {
        let args = entities_args(&[
            "topo",
            "download",
            "entities",
            "--time-from-minutes",
            "1000000000000",
        ]);
        assert!(matches!(
            download_settings(&args, &Defaults::default()),
            Err(CliError::Validation { .. })
        ));
    }

    #[test]
    fn project_must_name_a_folder() {
        for project in [".", "..", "..."] {
            let args = entities_args(&["topo", "download", "entities", "--project", project]);
            assert!(
                matches!(
                    download_settings(&args, &Defaults::default()),
                    Err(CliError::Validation { .. })
                ),
                "{project:?} accepted"
            );
        }
    }
}
