use std::{fs, path::Path};

use anyhow::{Context, Result};
use client_core::{FetchFailurePolicy, DEFAULT_RECORDS_PATH};
use serde::Deserialize;
use shared::domain::DEFAULT_ID_FIELD;

pub const DEFAULT_CONFIG_FILE: &str = "grid.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub server_url: String,
    pub records_path: String,
    pub id_field: String,
    pub on_fetch_failure: FetchFailurePolicy,
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".into(),
            records_path: DEFAULT_RECORDS_PATH.into(),
            id_field: DEFAULT_ID_FIELD.into(),
            on_fetch_failure: FetchFailurePolicy::KeepPrevious,
            log_filter: "info".into(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileSettings {
    server_url: Option<String>,
    records_path: Option<String>,
    id_field: Option<String>,
    on_fetch_failure: Option<FetchFailurePolicy>,
    log_filter: Option<String>,
}

/// Values given on the command line; they win over file and environment.
#[derive(Debug, Default, Clone)]
pub struct CliOverrides {
    pub server_url: Option<String>,
    pub records_path: Option<String>,
    pub id_field: Option<String>,
    pub on_fetch_failure: Option<FetchFailurePolicy>,
    pub log_filter: Option<String>,
}

/// Defaults, then the config file, then environment, then CLI flags.
/// An explicitly named config file must exist; the default one is optional.
pub fn load_settings(config_path: Option<&Path>, cli: &CliOverrides) -> Result<Settings> {
    let mut settings = Settings::default();

    match config_path {
        Some(path) => {
            let raw = fs::read_to_string(path)
                .with_context(|| format!("failed to read config file '{}'", path.display()))?;
            apply_file(&mut settings, &raw)
                .with_context(|| format!("invalid config file '{}'", path.display()))?;
        }
        None => {
            if let Ok(raw) = fs::read_to_string(DEFAULT_CONFIG_FILE) {
                apply_file(&mut settings, &raw)
                    .with_context(|| format!("invalid config file '{DEFAULT_CONFIG_FILE}'"))?;
            }
        }
    }

    apply_env(&mut settings, |key| std::env::var(key).ok())?;
    apply_cli(&mut settings, cli);
    Ok(settings)
}

fn apply_file(settings: &mut Settings, raw: &str) -> Result<()> {
    let file: FileSettings = toml::from_str(raw)?;
    if let Some(v) = file.server_url {
        settings.server_url = v;
    }
    if let Some(v) = file.records_path {
        settings.records_path = v;
    }
    if let Some(v) = file.id_field {
        settings.id_field = v;
    }
    if let Some(v) = file.on_fetch_failure {
        settings.on_fetch_failure = v;
    }
    if let Some(v) = file.log_filter {
        settings.log_filter = v;
    }
    Ok(())
}

fn apply_env<F>(settings: &mut Settings, lookup: F) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("GRID_SERVER_URL") {
        settings.server_url = v;
    }
    if let Some(v) = lookup("APP__SERVER_URL") {
        settings.server_url = v;
    }

    if let Some(v) = lookup("GRID_RECORDS_PATH") {
        settings.records_path = v;
    }

    if let Some(v) = lookup("GRID_ID_FIELD") {
        settings.id_field = v;
    }

    if let Some(v) = lookup("GRID_ON_FETCH_FAILURE") {
        settings.on_fetch_failure = v
            .parse()
            .context("invalid GRID_ON_FETCH_FAILURE")?;
    }

    if let Some(v) = lookup("GRID_LOG") {
        settings.log_filter = v;
    }

    Ok(())
}

fn apply_cli(settings: &mut Settings, cli: &CliOverrides) {
    if let Some(v) = &cli.server_url {
        settings.server_url = v.clone();
    }
    if let Some(v) = &cli.records_path {
        settings.records_path = v.clone();
    }
    if let Some(v) = &cli.id_field {
        settings.id_field = v.clone();
    }
    if let Some(v) = cli.on_fetch_failure {
        settings.on_fetch_failure = v;
    }
    if let Some(v) = &cli.log_filter {
        settings.log_filter = v.clone();
    }
}

#[cfg(test)]
#[path = "tests/config_tests.rs"]
mod tests;
