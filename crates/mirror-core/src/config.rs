//! Configuration loader and path helpers.
//!
//! Uses Figment to merge built-in defaults, `config.toml`, `config.<env>.toml`
//! and `APP_*` env vars (nested keys split on `__`, e.g.
//! `APP_PIPELINE__INDEX_DIR`). Relative paths resolve against the directory the
//! config files were loaded from.
use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Tunables for the export → normalize → index → query pipeline, read from
/// the `[pipeline]` table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub dataset_dir: PathBuf,
    pub htdocs_dir: PathBuf,
    pub index_dir: PathBuf,
    pub progress_every: usize,
    pub export_workers: usize,
    pub batch_start: usize,
    pub batch_ceiling: usize,
    pub writer_heap_bytes: usize,
    pub default_page_size: usize,
    pub max_page_size: usize,
    pub facet_size: usize,
    pub snippet_chars: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            dataset_dir: PathBuf::from("dataset"),
            htdocs_dir: PathBuf::from("htdocs"),
            index_dir: PathBuf::from("index"),
            progress_every: 100,
            export_workers: 1,
            batch_start: 10,
            batch_ceiling: 1000,
            writer_heap_bytes: 50_000_000,
            default_page_size: 10,
            max_page_size: 100,
            facet_size: 3,
            snippet_chars: 150,
        }
    }
}

impl PipelineSettings {
    pub fn validate(&self) -> Result<()> {
        let fail = |msg: &str| Err(Error::InvalidConfig(msg.to_string()));
        if self.batch_start == 0 {
            return fail("pipeline.batch_start must be at least 1");
        }
        if self.batch_ceiling < self.batch_start {
            return fail("pipeline.batch_ceiling must not be below pipeline.batch_start");
        }
        if self.default_page_size == 0 || self.max_page_size < self.default_page_size {
            return fail("pipeline.max_page_size must be >= pipeline.default_page_size >= 1");
        }
        if self.facet_size == 0 {
            return fail("pipeline.facet_size must be at least 1");
        }
        if self.export_workers == 0 {
            return fail("pipeline.export_workers must be at least 1");
        }
        Ok(())
    }

    fn resolve_paths(mut self, base: &Path) -> Self {
        for dir in [&mut self.dataset_dir, &mut self.htdocs_dir, &mut self.index_dir] {
            *dir = resolve_with_base(base, dir.to_string_lossy());
        }
        self
    }
}

pub struct Config {
    figment: Figment,
    base: PathBuf,
}

impl Config {
    /// Load from the current directory.
    pub fn load() -> anyhow::Result<Self> {
        let cwd = env::current_dir()?;
        Self::load_from(&cwd)
    }

    pub fn load_from(dir: &Path) -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new()
            .merge(Serialized::default("pipeline", PipelineSettings::default()))
            .merge(Toml::file(dir.join("config.toml")));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file(dir.join("config.dev.toml"))),
            "prod" | "production" => figment = figment.merge(Toml::file(dir.join("config.prod.toml"))),
            "test" | "testing" => figment = figment.merge(Toml::file(dir.join("config.test.toml"))),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment, base: dir.to_path_buf() };
        config.settings()?;
        Ok(config)
    }

    /// Wrap an already-built figment; relative paths resolve against `base`.
    pub fn from_figment(figment: Figment, base: impl Into<PathBuf>) -> Self {
        let figment = Figment::from(Serialized::default("pipeline", PipelineSettings::default())).merge(figment);
        Self { figment, base: base.into() }
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// Validated pipeline settings with directories resolved.
    pub fn settings(&self) -> Result<PipelineSettings> {
        let settings: PipelineSettings = self
            .figment
            .extract_inner("pipeline")
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;
        settings.validate()?;
        Ok(settings.resolve_paths(&self.base))
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
