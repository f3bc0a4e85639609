use anyhow::{Context, anyhow, ensure};
use bindery_core::tasks::TaskEngineConfig;
use serde::{Deserialize, Serialize};
use std::{
    env, fmt, fs,
    path::{Path, PathBuf},
};

use crate::telemetry::LoggingConfig;

pub const CONFIG_PATH_ENV: &str = "BINDERY_CONFIG_PATH";
pub const CONFIG_JSON_ENV: &str = "BINDERY_CONFIG_JSON";

/// Source that produced the settings.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    EnvPath(PathBuf),
    EnvInline,
    File(PathBuf),
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigSource::Default => write!(f, "built-in defaults"),
            ConfigSource::EnvPath(path) => {
                write!(f, "{} (from ${CONFIG_PATH_ENV})", path.display())
            }
            ConfigSource::EnvInline => write!(f, "${CONFIG_JSON_ENV}"),
            ConfigSource::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Top-level settings for a Bindery process.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct BinderySettings {
    /// Background task engine: queue capacity, worker counts per lane, event
    /// buffer and shutdown grace period. More task workers analyze and
    /// convert faster at the cost of disk pressure.
    pub engine: TaskEngineConfig,
    /// Log filter and output format.
    pub logging: LoggingConfig,
}

impl BinderySettings {
    /// Load settings using environment variables.
    /// Evaluation order:
    /// 1) `$BINDERY_CONFIG_PATH` (TOML or JSON file),
    /// 2) `$BINDERY_CONFIG_JSON` (inline JSON),
    /// 3) `bindery.toml`, `bindery.json`, `config/bindery.toml` or
    ///    `config/bindery.json` in the working directory,
    /// 4) defaults.
    pub fn load_from_env() -> anyhow::Result<(Self, ConfigSource)> {
        let cwd = env::current_dir()
            .context("failed to resolve the working directory")?;
        Self::load_with(|key| env::var(key).ok(), &cwd)
    }

    /// Same as [`Self::load_from_env`] with an explicit variable lookup and
    /// base directory for the default files.
    pub fn load_with<F>(
        lookup: F,
        base_dir: &Path,
    ) -> anyhow::Result<(Self, ConfigSource)>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path_str) = lookup(CONFIG_PATH_ENV)
            && !path_str.trim().is_empty()
        {
            let path = PathBuf::from(path_str);
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, ConfigSource::EnvPath(path)));
        }

        if let Some(raw) = lookup(CONFIG_JSON_ENV)
            && !raw.trim().is_empty()
        {
            let parsed = Self::parse_json(&raw)
                .with_context(|| format!("failed to parse {CONFIG_JSON_ENV}"))?;
            parsed.validate()?;
            return Ok((parsed, ConfigSource::EnvInline));
        }

        if let Some(path) = Self::find_default_file(base_dir) {
            let settings = Self::load_from_file(&path)?;
            return Ok((settings, ConfigSource::File(path)));
        }

        Ok((Self::default(), ConfigSource::Default))
    }

    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let contents = fs::read_to_string(path).with_context(|| {
            format!("failed to read bindery config from {}", path.display())
        })?;

        let settings = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::parse_json(&contents).with_context(|| {
                format!("invalid bindery config {}", path.display())
            })?,
            Some("toml") | Some("tml") => {
                toml::from_str::<Self>(&contents).map_err(|err| {
                    anyhow!("invalid bindery config {}: {}", path.display(), err)
                })?
            }
            _ => Self::parse_from_str(&contents, &path.display().to_string())?,
        };

        settings
            .validate()
            .with_context(|| format!("rejected bindery config {}", path.display()))?;
        Ok(settings)
    }

    pub fn parse_from_str(contents: &str, origin: &str) -> anyhow::Result<Self> {
        // TOML first, then JSON.
        toml::from_str(contents).or_else(|toml_err| {
            serde_json::from_str(contents).map_err(|json_err| {
                anyhow!(
                    "failed to parse bindery config {}: toml error: {}; json error: {}",
                    origin,
                    toml_err,
                    json_err
                )
            })
        })
    }

    pub fn parse_json(raw: &str) -> anyhow::Result<Self> {
        serde_json::from_str(raw)
            .map_err(|err| anyhow!("invalid bindery config json: {err}"))
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let engine = &self.engine;
        ensure!(
            engine.workers.scan_workers > 0,
            "engine.workers.scan_workers must be at least 1"
        );
        ensure!(
            engine.workers.task_workers > 0,
            "engine.workers.task_workers must be at least 1"
        );
        ensure!(
            engine.queue.capacity > 0,
            "engine.queue.capacity must be at least 1"
        );
        ensure!(
            engine.events.channel_capacity > 0,
            "engine.events.channel_capacity must be at least 1"
        );
        Ok(())
    }

    fn find_default_file(base_dir: &Path) -> Option<PathBuf> {
        const CANDIDATES: &[&str] = &[
            "bindery.toml",
            "bindery.json",
            "config/bindery.toml",
            "config/bindery.json",
        ];

        CANDIDATES
            .iter()
            .map(|candidate| base_dir.join(candidate))
            .find(|path| path.exists())
    }
}
