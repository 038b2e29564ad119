//! Reconcile passes over an edited document.
//!
//! A session owns what an editor would keep between passes: the entries of
//! the last pass and the selection to carry into the next one. Each pass
//! re-locates the whole document and reports what changed.

use crate::app::locator::ApplicationNameLocator;
use crate::domain::document::Document;
use crate::domain::model::{ApplicationEntry, Located, Selection, Span};

/// How the selected entry moved between two passes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectionChange {
    Unchanged,
    Selected(Selection),
    Cleared,
}

/// Entries that disappeared and appeared since the previous pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnotationDiff {
    pub removed: Vec<ApplicationEntry>,
    pub added: Vec<ApplicationEntry>,
    pub selection: SelectionChange,
}

impl AnnotationDiff {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty()
            && self.added.is_empty()
            && self.selection == SelectionChange::Unchanged
    }
}

#[derive(Debug, Clone)]
pub struct Reconciled {
    pub located: Located,
    pub diff: AnnotationDiff,
}

#[derive(Debug, Clone, Default)]
pub struct ReconcileSession {
    locator: ApplicationNameLocator,
    current: Located,
}

impl ReconcileSession {
    pub fn new(locator: ApplicationNameLocator) -> Self {
        Self {
            locator,
            current: Located::default(),
        }
    }

    pub fn locator(&self) -> &ApplicationNameLocator {
        &self.locator
    }

    /// Result of the most recent pass.
    pub fn current(&self) -> &Located {
        &self.current
    }

    pub fn selection(&self) -> Option<Selection> {
        self.current.selection()
    }

    /// Forget the previous pass so the next one starts from scratch.
    pub fn reset(&mut self) {
        self.current = Located::default();
    }

    /// First pass over a freshly opened document.
    pub fn initial(&mut self, document: &Document) -> Reconciled {
        self.reconcile(document, None)
    }

    /// Re-locate `document` after an edit touching `dirty`.
    pub fn reconcile(&mut self, document: &Document, dirty: Option<Span>) -> Reconciled {
        let region = dirty.map_or_else(
            || Span::new(0, document.len()),
            |span| document.line_aligned(span),
        );
        let previous = self.current.selection();
        let located = self.locator.locate(document, previous.as_ref());
        tracing::debug!(
            region.start = region.start,
            region.end = region.end,
            entries = located.len(),
            selected = located.selected().map(|entry| entry.name.as_str()),
            "reconciled application names"
        );

        let diff = compute_diff(&self.current, &located);
        self.current = located.clone();
        Reconciled { located, diff }
    }
}

fn compute_diff(old: &Located, new: &Located) -> AnnotationDiff {
    let removed = old
        .entries()
        .iter()
        .filter(|entry| !new.entries().contains(entry))
        .cloned()
        .collect();
    let added = new
        .entries()
        .iter()
        .filter(|entry| !old.entries().contains(entry))
        .cloned()
        .collect();
    let selection = match (old.selected(), new.selected()) {
        (before, after) if before == after => SelectionChange::Unchanged,
        (_, Some(entry)) => SelectionChange::Selected(Selection::from(entry)),
        (_, None) => SelectionChange::Cleared,
    };
    AnnotationDiff {
        removed,
        added,
        selection,
    }
}
