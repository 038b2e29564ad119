//! Rendering located application names.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use clap::ValueEnum;
use minijinja::Environment;
use serde::{Deserialize, Serialize};

use crate::app::locator::ApplicationNameLocator;
use crate::domain::document::Document;
use crate::domain::model::{Located, Selection, Span};

/// Supported output formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
#[value(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One line per application, selected entry starred.
    Plain,
    /// Markdown list with optional source blocks.
    Markdown,
    Json,
    Yaml,
}

impl OutputFormat {
    /// Return a stable identifier for configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Plain => "plain",
            OutputFormat::Markdown => "markdown",
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = OutputFormatParseError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "plain" | "text" | "txt" => Ok(OutputFormat::Plain),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            "json" => Ok(OutputFormat::Json),
            "yaml" | "yml" => Ok(OutputFormat::Yaml),
            other => Err(OutputFormatParseError::UnknownFormat(other.to_string())),
        }
    }
}

/// Error returned when parsing an [`OutputFormat`] fails.
#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum OutputFormatParseError {
    #[error("unknown output format '{0}'")]
    UnknownFormat(String),
}

/// A manifest read from disk (or memory) together with its locate result.
#[derive(Debug, Clone)]
pub struct LocatedManifest {
    pub path: PathBuf,
    pub display_path: String,
    pub document: Document,
    pub located: Located,
    /// Set when the file could not be read.
    pub error: Option<String>,
}

impl LocatedManifest {
    /// Read `path` and locate its applications. Read failures are recorded, not returned.
    pub fn read(
        path: &Path,
        display_path: &str,
        locator: &ApplicationNameLocator,
        previous: Option<&Selection>,
    ) -> Self {
        match fs::read_to_string(path) {
            Ok(text) => Self::from_text(path, display_path, text, locator, previous),
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to read manifest");
                Self {
                    path: path.to_path_buf(),
                    display_path: display_path.to_owned(),
                    document: Document::new(""),
                    located: Located::default(),
                    error: Some(format!("failed to read {}: {err}", path.display())),
                }
            }
        }
    }

    pub fn from_text(
        path: &Path,
        display_path: &str,
        text: impl Into<String>,
        locator: &ApplicationNameLocator,
        previous: Option<&Selection>,
    ) -> Self {
        let document = Document::new(text);
        let located = locator.locate(&document, previous);
        Self {
            path: path.to_path_buf(),
            display_path: display_path.to_owned(),
            document,
            located,
            error: None,
        }
    }
}

/// Serializable view of one or more located manifests.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Report {
    pub manifests: Vec<ManifestReport>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ManifestReport {
    pub path: String,
    pub applications: Vec<ApplicationReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ApplicationReport {
    pub name: String,
    pub selected: bool,
    pub root_level: bool,
    pub span: Span,
    pub start: Position,
    pub end: Position,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

/// One-based line and column.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub column: usize,
}

impl Report {
    pub fn build(manifests: &[LocatedManifest], include_source: bool) -> Self {
        Self {
            manifests: manifests
                .iter()
                .map(|manifest| manifest_report(manifest, include_source))
                .collect(),
        }
    }
}

fn manifest_report(manifest: &LocatedManifest, include_source: bool) -> ManifestReport {
    let document = &manifest.document;
    let applications = manifest
        .located
        .iter()
        .map(|(entry, selected)| ApplicationReport {
            name: entry.name.clone(),
            selected,
            root_level: entry.root_level,
            span: entry.span,
            start: position(document, entry.span.start),
            end: position(document, entry.span.end),
            source: include_source.then(|| document.slice(entry.span).to_owned()),
        })
        .collect();
    ManifestReport {
        path: manifest.display_path.clone(),
        applications,
        error: manifest.error.clone(),
    }
}

fn position(document: &Document, offset: usize) -> Position {
    document
        .line_column(offset)
        .map_or(Position { line: 1, column: 1 }, |lc| Position {
            line: lc.line + 1,
            column: lc.column + 1,
        })
}

/// Renders reports in every [`OutputFormat`].
pub struct Reporter {
    env: Environment<'static>,
}

impl Reporter {
    /// Create a reporter with the built-in templates loaded.
    pub fn new() -> Result<Self> {
        Ok(Self {
            env: default_environment()?,
        })
    }

    pub fn render(&self, report: &Report, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Plain => self.render_with_template(report, "plain"),
            OutputFormat::Markdown => self.render_with_template(report, "markdown"),
            OutputFormat::Json => {
                let mut rendered =
                    serde_json::to_string_pretty(report).context("failed to serialize report")?;
                rendered.push('\n');
                Ok(rendered)
            }
            OutputFormat::Yaml => {
                serde_yaml::to_string(report).context("failed to serialize report")
            }
        }
    }

    fn render_with_template(&self, report: &Report, template_name: &str) -> Result<String> {
        let template = self
            .env
            .get_template(template_name)
            .map_err(|err| anyhow!("template '{template_name}' not found: {err}"))?;
        template
            .render(report)
            .map_err(|err| anyhow!("failed to render template '{template_name}': {err}"))
    }
}

fn default_environment() -> Result<Environment<'static>> {
    let mut env = Environment::new();
    env.set_trim_blocks(true);
    env.set_lstrip_blocks(true);
    env.add_template("plain", PLAIN_TEMPLATE)
        .map_err(|err| anyhow!("failed to register plain template: {err}"))?;
    env.add_template("markdown", MARKDOWN_TEMPLATE)
        .map_err(|err| anyhow!("failed to register markdown template: {err}"))?;
    Ok(env)
}

const PLAIN_TEMPLATE: &str = r#"{% for manifest in manifests %}
{{ manifest.path }}
{% if manifest.error %}
  error: {{ manifest.error }}
{% endif %}
{% for app in manifest.applications %}
{{ "* " if app.selected else "  " }}{{ app.name }}{% if app.root_level %} (root){% endif %} {{ app.start.line }}:{{ app.start.column }}-{{ app.end.line }}:{{ app.end.column }}
{% if app.source %}
{{ app.source | indent(4, true) }}
{% endif %}
{% endfor %}
{% endfor %}
"#;

const MARKDOWN_TEMPLATE: &str = r#"{% for manifest in manifests %}
## {{ manifest.path }}

{% if manifest.error %}
> {{ manifest.error }}

{% endif %}
{% for app in manifest.applications %}
- {% if app.selected %}**{{ app.name }}** (selected){% else %}{{ app.name }}{% endif %}, lines {{ app.start.line }}-{{ app.end.line }}
{% if app.source %}

```yaml
{{ app.source }}
```

{% endif %}
{% endfor %}

{% endfor %}
"#;
