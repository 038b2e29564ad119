//! Configuration management utilities.

use std::collections::BTreeSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use dirs_next::config_dir;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

static DEFAULT_CONFIG: Lazy<&'static str> =
    Lazy::new(|| include_str!("../../assets/default-config.toml"));
static DEFAULT_WORKSPACE_CONFIG_PATH: &str = ".appmanifest/config.toml";

/// Layered configuration loaded from defaults, user, workspace, and env.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub defaults: Defaults,
    #[serde(default)]
    pub scan: Scan,
    #[serde(default)]
    pub ignore: Ignore,
    #[serde(default)]
    pub watch: Watch,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    #[serde(default = "Defaults::default_format")]
    pub format: String,
    /// Application name to keep selected whenever it is present.
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub include_source: bool,
    #[serde(default = "Defaults::default_log_level")]
    pub log_level: String,
}

impl Defaults {
    fn default_format() -> String {
        "plain".into()
    }

    fn default_log_level() -> String {
        "warn".into()
    }
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            format: Self::default_format(),
            app: None,
            include_source: false,
            log_level: Self::default_log_level(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
    #[serde(default = "Scan::default_patterns")]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub show_hidden: bool,
}

impl Scan {
    fn default_patterns() -> Vec<String> {
        vec![
            "manifest.yml".into(),
            "manifest.yaml".into(),
            "manifest-*.yml".into(),
            "manifest-*.yaml".into(),
            "*.manifest.yml".into(),
        ]
    }
}

impl Default for Scan {
    fn default() -> Self {
        Self {
            patterns: Self::default_patterns(),
            show_hidden: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ignore {
    #[serde(default)]
    pub paths: Vec<String>,
    #[serde(default)]
    pub globs: Vec<String>,
}

impl Default for Ignore {
    fn default() -> Self {
        Self {
            paths: vec!["target/".into(), "node_modules/".into(), ".git/".into()],
            globs: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Watch {
    #[serde(default = "Watch::default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Watch {
    fn default_debounce_ms() -> u64 {
        250
    }
}

impl Default for Watch {
    fn default() -> Self {
        Self {
            debounce_ms: Self::default_debounce_ms(),
        }
    }
}

/// Environment overrides for critical settings.
#[derive(Debug, Default, Clone)]
pub struct EnvOverrides {
    format: Option<String>,
    app: Option<String>,
    log_level: Option<String>,
}

impl EnvOverrides {
    fn from_env() -> Self {
        Self {
            format: env::var("APPMANIFEST_FORMAT").ok(),
            app: env::var("APPMANIFEST_APP").ok(),
            log_level: env::var("APPMANIFEST_LOG").ok(),
        }
    }

    #[cfg(test)]
    fn for_tests(format: &str, app: &str) -> Self {
        Self {
            format: Some(format.to_owned()),
            app: Some(app.to_owned()),
            log_level: None,
        }
    }
}

impl Config {
    /// Load configuration from defaults, user/global config, workspace config, and env overrides.
    pub fn load() -> Result<Self> {
        let env = EnvOverrides::from_env();
        let global = global_config_path();
        let workspace = workspace_config_path()?;
        Self::load_with_layers(global, workspace, env)
    }

    /// Load from an explicit file on top of the built-in defaults, still honouring env overrides.
    pub fn load_from(path: &Path) -> Result<Self> {
        let merged = Self::from_str(&DEFAULT_CONFIG)?.merge(Self::from_file(path)?);
        Ok(apply_env_overrides(merged, EnvOverrides::from_env()))
    }

    fn load_with_layers(
        global: Option<PathBuf>,
        workspace: Option<PathBuf>,
        env_overrides: EnvOverrides,
    ) -> Result<Self> {
        let mut layers: Vec<Config> = Vec::new();

        layers.push(Self::from_str(&DEFAULT_CONFIG)?);

        if let Some(global_path) = global.filter(|path| path.exists()) {
            layers.push(Self::from_file(&global_path)?);
        }

        if let Some(workspace_path) = workspace.filter(|path| path.exists()) {
            layers.push(Self::from_file(&workspace_path)?);
        }

        let merged = layers.into_iter().reduce(Config::merge).unwrap_or_default();
        Ok(apply_env_overrides(merged, env_overrides))
    }

    fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        Self::from_str(&data)
    }

    fn from_str(contents: &str) -> Result<Self> {
        let config: Config =
            toml::from_str(contents).with_context(|| "failed to parse TOML config".to_string())?;
        Ok(config)
    }

    fn merge(self, other: Self) -> Self {
        Self {
            defaults: merge_defaults(self.defaults, other.defaults),
            scan: merge_scan(self.scan, other.scan),
            ignore: merge_ignore(self.ignore, other.ignore),
            watch: Watch {
                debounce_ms: if other.watch.debounce_ms != Watch::default_debounce_ms() {
                    other.watch.debounce_ms
                } else {
                    self.watch.debounce_ms
                },
            },
        }
    }
}

fn merge_defaults(base: Defaults, overlay: Defaults) -> Defaults {
    Defaults {
        format: if overlay.format != Defaults::default_format() {
            overlay.format
        } else {
            base.format
        },
        app: overlay.app.or(base.app),
        include_source: overlay.include_source || base.include_source,
        log_level: if overlay.log_level != Defaults::default_log_level() {
            overlay.log_level
        } else {
            base.log_level
        },
    }
}

fn merge_scan(base: Scan, overlay: Scan) -> Scan {
    let patterns = if overlay.patterns != Scan::default_patterns() {
        overlay.patterns
    } else {
        base.patterns
    };
    Scan {
        patterns,
        show_hidden: overlay.show_hidden || base.show_hidden,
    }
}

fn merge_ignore(base: Ignore, overlay: Ignore) -> Ignore {
    let mut paths: BTreeSet<String> = base.paths.into_iter().collect();
    paths.extend(overlay.paths);

    let mut globs: BTreeSet<String> = base.globs.into_iter().collect();
    globs.extend(overlay.globs);

    Ignore {
        paths: paths.into_iter().collect(),
        globs: globs.into_iter().collect(),
    }
}

fn global_config_path() -> Option<PathBuf> {
    config_dir().map(|base| base.join("appmanifest/config.toml"))
}

fn workspace_config_path() -> Result<Option<PathBuf>> {
    let cwd = env::current_dir()?;
    let root = find_repo_root(&cwd).unwrap_or(cwd);
    Ok(Some(root.join(DEFAULT_WORKSPACE_CONFIG_PATH)))
}

/// Nearest ancestor of `start` containing a `.git` directory.
pub fn find_repo_root(start: &Path) -> Option<PathBuf> {
    let mut current = start;
    loop {
        if current.join(".git").exists() {
            return Some(current.to_path_buf());
        }
        match current.parent() {
            Some(parent) => current = parent,
            None => return None,
        }
    }
}

fn apply_env_overrides(mut config: Config, env: EnvOverrides) -> Config {
    if let Some(format) = env.format {
        config.defaults.format = format;
    }
    if let Some(app) = env.app.filter(|app| !app.trim().is_empty()) {
        config.defaults.app = Some(app);
    }
    if let Some(level) = env.log_level {
        config.defaults.log_level = level;
    }
    config
}
