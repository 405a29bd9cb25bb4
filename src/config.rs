use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

use crate::cli::Cli;
use crate::engine::{DEFAULT_INDENT_SIZE, EngineOptions};

pub const ENGINE_JAR_ENV: &str = "FERNFLOWER_JAR";
pub const JAVA_ENV: &str = "CLASSVIEW_JAVA";
pub const LOG_ENV: &str = "CLASSVIEW_LOG";

/// Optional settings read from `config.json`.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub indent_size: Option<usize>,
    pub engine_jar: Option<PathBuf>,
    pub java: Option<String>,
}

impl Settings {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read settings file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse settings file: {}", path.display()))
    }

    /// Loads `--config` if given, else the default settings file when it exists.
    pub fn resolve(cli: &Cli) -> Result<Self> {
        if let Some(path) = cli.config.as_deref() {
            return Self::load(path);
        }
        match default_settings_path() {
            Some(path) if path.exists() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }
}

pub fn default_settings_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("classview").join("config.json"))
}

pub fn resolve_engine_jar(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    if let Some(p) = cli.engine_jar.clone() {
        return Ok(p);
    }

    if let Ok(p) = env::var(ENGINE_JAR_ENV) {
        return Ok(PathBuf::from(p));
    }

    if let Some(p) = settings.engine_jar.clone() {
        return Ok(p);
    }

    let default_path = classview_home()?.join("tools").join("fernflower.jar");
    if default_path.exists() {
        return Ok(default_path);
    }

    anyhow::bail!(
        "Fernflower jar not found. Use --engine-jar, set {ENGINE_JAR_ENV}, add \"engine_jar\" to the settings file, or place it at {}",
        default_path.display()
    )
}

pub fn resolve_java(settings: &Settings) -> String {
    env::var(JAVA_ENV)
        .ok()
        .or_else(|| settings.java.clone())
        .unwrap_or_else(|| "java".to_string())
}

pub fn resolve_options(cli: &Cli, settings: &Settings) -> EngineOptions {
    let size = cli
        .indent
        .or(settings.indent_size)
        .unwrap_or(DEFAULT_INDENT_SIZE);
    EngineOptions::with_indent_size(size)
}

fn classview_home() -> Result<PathBuf> {
    let base = dirs::data_local_dir()
        .or_else(dirs::cache_dir)
        .or_else(dirs::home_dir)
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve data directory"))?;
    Ok(base.join("classview"))
}
