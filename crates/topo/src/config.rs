//! CLI-side configuration: `GlobalOpts` overrides layered on `topo_config`.
//!
//! Core never sees these types -- it receives a pre-built `EnvironmentConfig`.

use std::path::PathBuf;

use topo_config::{Config, ConfigError, Environment};
use topo_core::EnvironmentConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// The config file in effect: `--config` or the platform default.
pub fn config_file(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(topo_config::config_path)
}

/// Load the config file + `TOPO_` environment variables.
pub fn load(global: &GlobalOpts) -> Result<Config, CliError> {
    Ok(topo_config::load_config_from(&config_file(global))?)
}

/// Resolve the environment to talk to from profile + flags.
///
/// An explicitly named environment must exist. Without one, the default
/// profile is used when present, otherwise `--url` alone is enough.
pub fn resolve_environment(
    global: &GlobalOpts,
    cfg: &Config,
) -> Result<EnvironmentConfig, CliError> {
    let (name, mut env) = match cfg.environment(global.environment.as_deref()) {
        Ok((name, env)) => (name.to_owned(), env.clone()),
        Err(ConfigError::UnknownEnvironment { .. }) if global.environment.is_none() => {
            let Some(url) = global.url.clone() else {
                return Err(CliError::NoConfig {
                    path: config_file(global).display().to_string(),
                });
            };
            ("cli".to_owned(), adhoc_environment(url))
        }
        Err(err) => return Err(err.into()),
    };

    // Flags override the profile
    if let Some(ref url) = global.url {
        env.url.clone_from(url);
    }
    if let Some(ref var) = global.token_env {
        env.token_env = Some(var.clone());
    }
    if global.insecure {
        env.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        env.timeout = Some(timeout);
    }

    tracing::debug!(environment = %name, url = %env.url, "resolved environment");
    Ok(topo_config::environment_to_config(&env, &name, &cfg.defaults)?)
}

fn adhoc_environment(url: String) -> Environment {
    Environment {
        url,
        token: None,
        token_env: None,
        ca_cert: None,
        insecure: None,
        timeout: None,
    }
}
