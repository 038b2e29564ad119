//! Manifest discovery services.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::{DirEntry, WalkBuilder, WalkState};
use rayon::prelude::*;

use crate::app::locator::ApplicationNameLocator;
use crate::app::report::LocatedManifest;
use crate::infra::config::Config;

const APPMANIFEST_IGNORE: &str = ".appmanifestignore";

/// A manifest file found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestFile {
    pub path: PathBuf,
    pub display_path: String,
}

/// Result of scanning a root directory.
#[derive(Debug, Default)]
pub struct ScanResult {
    pub manifests: Vec<ManifestFile>,
    pub root: PathBuf,
}

/// Configuration inputs for the scanner.
#[derive(Debug, Clone)]
pub struct ScannerConfig {
    pub root: PathBuf,
    pub max_file_size: u64,
    pub config: Config,
}

impl ScannerConfig {
    pub fn from_root(root: PathBuf, config: Config) -> Self {
        Self {
            root,
            max_file_size: 1024 * 1024,
            config,
        }
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }
}

/// Walks a directory tree respecting ignore rules and collects manifest files.
#[derive(Debug, Default)]
pub struct Scanner;

impl Scanner {
    pub fn new() -> Self {
        Self
    }

    pub fn scan(&self, cfg: &ScannerConfig) -> Result<ScanResult> {
        let skip = Arc::new(build_ignore_matcher(&cfg.root, cfg)?);
        let patterns = Arc::new(build_pattern_matcher(&cfg.config.scan.patterns)?);
        let mut builder = WalkBuilder::new(&cfg.root);
        builder
            .git_ignore(true)
            .hidden(!cfg.config.scan.show_hidden);

        let root = cfg.root.clone();
        builder.filter_entry({
            let skip = skip.clone();
            move |entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let rel = entry.path().strip_prefix(&root).unwrap_or(entry.path());
                !skip.is_match(rel)
            }
        });

        let manifests = Mutex::new(Vec::new());
        let cfg_ref = Arc::new(cfg.clone());

        builder.build_parallel().run(|| {
            let manifests = &manifests;
            let cfg = cfg_ref.clone();
            let patterns = patterns.clone();
            Box::new(move |result| match result {
                Ok(entry) => {
                    if let Some(manifest) = process_entry(&entry, &cfg, &patterns)
                        && let Ok(mut guard) = manifests.lock()
                    {
                        guard.push(manifest);
                    }
                    WalkState::Continue
                }
                Err(err) => {
                    tracing::warn!(error = %err, "scanner error");
                    WalkState::Continue
                }
            })
        });

        let mut manifests = manifests.into_inner().unwrap_or_default();
        manifests.sort_by(|a, b| a.display_path.cmp(&b.display_path));
        tracing::debug!(root = %cfg.root.display(), count = manifests.len(), "scanned for manifests");

        Ok(ScanResult {
            manifests,
            root: cfg.root.clone(),
        })
    }
}

/// Read and locate every scanned manifest on the rayon pool.
pub fn locate_all(scan: &ScanResult, locator: &ApplicationNameLocator) -> Vec<LocatedManifest> {
    scan.manifests
        .par_iter()
        .map(|manifest| {
            LocatedManifest::read(&manifest.path, &manifest.display_path, locator, None)
        })
        .collect()
}

fn process_entry(
    entry: &DirEntry,
    cfg: &ScannerConfig,
    patterns: &GlobSet,
) -> Option<ManifestFile> {
    let path = entry.path();
    let metadata = entry.metadata().ok()?;
    if !metadata.is_file() || metadata.len() > cfg.max_file_size {
        return None;
    }
    let file_name = path.file_name()?;
    if !patterns.is_match(Path::new(file_name)) {
        return None;
    }

    Some(ManifestFile {
        path: path.to_path_buf(),
        display_path: to_display_path(&cfg.root, path),
    })
}

fn to_display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}

fn build_pattern_matcher(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = Glob::new(pattern)
            .with_context(|| format!("invalid manifest pattern '{pattern}'"))?;
        builder.add(glob);
    }
    builder.build().context("failed to build manifest matcher")
}

fn build_ignore_matcher(root: &Path, cfg: &ScannerConfig) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();

    for pattern in &cfg.config.ignore.paths {
        for expanded in expand_dir_pattern(pattern) {
            let glob = Glob::new(&expanded).context("invalid ignore path pattern")?;
            builder.add(glob);
        }
    }

    for glob in &cfg.config.ignore.globs {
        let glob = Glob::new(glob).context("invalid ignore glob")?;
        builder.add(glob);
    }

    for pattern in load_ignore_file(root)? {
        for expanded in expand_dir_pattern(&pattern) {
            let glob = Glob::new(&expanded).context("invalid .appmanifestignore pattern")?;
            builder.add(glob);
        }
    }

    builder.build().context("failed to build ignore matcher")
}

fn expand_dir_pattern(raw: &str) -> Vec<String> {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Vec::new();
    }
    vec![
        trimmed.to_owned(),
        format!("{trimmed}/**"),
        format!("**/{trimmed}"),
        format!("**/{trimmed}/**"),
    ]
}

fn load_ignore_file(root: &Path) -> Result<Vec<String>> {
    let path = root.join(APPMANIFEST_IGNORE);
    if !path.exists() {
        return Ok(Vec::new());
    }

    let file = File::open(&path).with_context(|| format!("failed to open {}", path.display()))?;
    let reader = BufReader::new(file);
    let mut patterns = Vec::new();
    for line in reader.lines() {
        let line = line?;
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        patterns.push(trimmed.to_owned());
    }
    Ok(patterns)
}
