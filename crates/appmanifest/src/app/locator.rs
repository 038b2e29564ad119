//! Locating application names in Cloud Foundry manifests.

use crate::domain::document::Document;
use crate::domain::errors::LocateError;
use crate::domain::model::{ApplicationEntry, Located, Selection};
use crate::domain::yaml::{self, YamlNode, YamlStream};

/// Key of the sequence holding one mapping per application.
pub const APPLICATIONS_PROP: &str = "applications";
/// Key of an application's name.
pub const NAME_PROP: &str = "name";

/// Finds application blocks in a manifest and picks the selected one.
///
/// With a pinned name the entry carrying that name is always the selected
/// one. Without it, selection follows the previous pass: same name closest
/// to the old position, then anything at the old position, then the first
/// entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplicationNameLocator {
    pinned: Option<String>,
}

impl ApplicationNameLocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Locator that always selects the application called `name`.
    pub fn pinned(name: impl Into<String>) -> Self {
        Self {
            pinned: Some(name.into()),
        }
    }

    pub fn with_pinned(pinned: Option<String>) -> Self {
        Self { pinned }
    }

    pub fn pinned_name(&self) -> Option<&str> {
        self.pinned.as_deref()
    }

    /// Locate entries, degrading to an empty result for input that is not a
    /// single well-formed YAML document.
    pub fn locate(&self, document: &Document, previous: Option<&Selection>) -> Located {
        self.try_locate(document, previous).unwrap_or_else(|err| {
            tracing::debug!(error = %err, "no application names located");
            Located::default()
        })
    }

    /// Like [`locate`](Self::locate) but reports why nothing could be located.
    pub fn try_locate(
        &self,
        document: &Document,
        previous: Option<&Selection>,
    ) -> Result<Located, LocateError> {
        let stream = yaml::parse(document.text())?;
        self.locate_in(document, &stream, previous)
    }

    /// Locate entries in an already parsed stream of `document`.
    pub fn locate_in(
        &self,
        document: &Document,
        stream: &YamlStream,
        previous: Option<&Selection>,
    ) -> Result<Located, LocateError> {
        let root = stream.single_root()?;
        let entries = collect_entries(document, root);
        let selected = select(&entries, previous, self.pinned.as_deref());
        Ok(Located::new(entries, selected))
    }
}

fn collect_entries(document: &Document, root: &YamlNode) -> Vec<ApplicationEntry> {
    match root.get(APPLICATIONS_PROP).and_then(YamlNode::as_sequence) {
        Some(applications) => applications
            .iter()
            .filter_map(|app| {
                let name = app.get(NAME_PROP)?.as_scalar()?;
                Some(ApplicationEntry {
                    name: name.to_owned(),
                    root_level: false,
                    span: document.node_span(app.start, app.end),
                })
            })
            .collect(),
        None => root
            .get(NAME_PROP)
            .and_then(YamlNode::as_scalar)
            .map(|name| ApplicationEntry {
                name: name.to_owned(),
                root_level: true,
                span: document.node_span(root.start, root.end),
            })
            .into_iter()
            .collect(),
    }
}

fn select(
    entries: &[ApplicationEntry],
    previous: Option<&Selection>,
    pinned: Option<&str>,
) -> Option<usize> {
    if entries.is_empty() {
        return None;
    }
    if let Some(pinned) = pinned {
        return entries.iter().position(|entry| entry.name == pinned);
    }
    Some(previous.and_then(|previous| reselect(entries, previous)).unwrap_or(0))
}

fn reselect(entries: &[ApplicationEntry], previous: &Selection) -> Option<usize> {
    // `min_by_key` keeps the first of equally close candidates.
    entries
        .iter()
        .enumerate()
        .filter(|(_, entry)| entry.name == previous.name)
        .min_by_key(|(_, entry)| entry.span.start.abs_diff(previous.start))
        .map(|(index, _)| index)
        .or_else(|| {
            entries
                .iter()
                .position(|entry| entry.span.start == previous.start)
        })
}
