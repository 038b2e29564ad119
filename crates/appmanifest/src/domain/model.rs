//! Domain models for application entries, spans, and selections.

use serde::{Deserialize, Serialize};

/// Half-open `[start, end)` range of character offsets into a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self {
            start: start.min(end),
            end: start.max(end),
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset < self.end
    }
}

/// One application block declared in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ApplicationEntry {
    pub name: String,
    /// `true` when the manifest has no `applications` sequence and the name
    /// sits directly on the document root.
    pub root_level: bool,
    pub span: Span,
}

/// Identity of a previously selected entry, used to re-find it after a re-parse.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    pub name: String,
    pub start: usize,
}

impl From<&ApplicationEntry> for Selection {
    fn from(entry: &ApplicationEntry) -> Self {
        Self {
            name: entry.name.clone(),
            start: entry.span.start,
        }
    }
}

/// Result of one locate pass: entries in document order and at most one selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Located {
    entries: Vec<ApplicationEntry>,
    selected: Option<usize>,
}

impl Located {
    pub(crate) fn new(entries: Vec<ApplicationEntry>, selected: Option<usize>) -> Self {
        let selected = selected.filter(|index| *index < entries.len());
        Self { entries, selected }
    }

    pub fn entries(&self) -> &[ApplicationEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn selected_index(&self) -> Option<usize> {
        self.selected
    }

    pub fn selected(&self) -> Option<&ApplicationEntry> {
        self.selected.and_then(|index| self.entries.get(index))
    }

    /// Identity of the selected entry, to be fed into the next pass.
    pub fn selection(&self) -> Option<Selection> {
        self.selected().map(Selection::from)
    }

    /// Iterate entries together with their selection flag.
    pub fn iter(&self) -> impl Iterator<Item = (&ApplicationEntry, bool)> + '_ {
        self.entries
            .iter()
            .enumerate()
            .map(move |(index, entry)| (entry, Some(index) == self.selected))
    }

    pub fn names(&self) -> Vec<&str> {
        self.entries.iter().map(|entry| entry.name.as_str()).collect()
    }
}
