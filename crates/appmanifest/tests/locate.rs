use appmanifest::{ApplicationNameLocator, Document, LocateError, Selection, Span};

const TWO_APPS: &str = "applications:\n- name: alpha\n- name: beta\n";

fn names(text: &str, locator: &ApplicationNameLocator) -> (Vec<String>, Option<String>) {
    let located = locator.locate(&Document::new(text), None);
    let names = located.entries().iter().map(|e| e.name.clone()).collect();
    (names, located.selected().map(|e| e.name.clone()))
}

#[test]
fn root_level_name_is_the_single_selected_entry() {
    let document = Document::new("name: foo\n");
    let located = ApplicationNameLocator::new().locate(&document, None);

    assert_eq!(located.len(), 1);
    let entry = &located.entries()[0];
    assert_eq!(entry.name, "foo");
    assert!(entry.root_level);
    assert_eq!(entry.span, Span::new(0, 10));
    assert_eq!(located.selected(), Some(entry));
}

#[test]
fn applications_are_listed_in_document_order() {
    let document = Document::new(TWO_APPS);
    let located = ApplicationNameLocator::new().locate(&document, None);

    assert_eq!(located.names(), vec!["alpha", "beta"]);
    assert!(located.entries().iter().all(|e| !e.root_level));
    assert_eq!(located.selected().map(|e| e.name.as_str()), Some("alpha"));

    let first = located.entries()[0].span;
    let second = located.entries()[1].span;
    assert_eq!(first.start, 16);
    assert_eq!(second.start, 30);
    assert!(document.slice(first).starts_with("name: alpha"));
    assert!(document.slice(second).starts_with("name: beta"));
    assert!(first.end <= second.start);
    assert_eq!(second.end, document.len());
}

#[test]
fn pinned_name_wins_over_order_and_previous_selection() {
    let locator = ApplicationNameLocator::pinned("beta");
    let previous = Selection {
        name: "alpha".into(),
        start: 16,
    };
    let located = locator.locate(&Document::new(TWO_APPS), Some(&previous));
    assert_eq!(located.selected().map(|e| e.name.as_str()), Some("beta"));
}

#[test]
fn pinned_name_that_is_absent_selects_nothing() {
    let (names, selected) = names(TWO_APPS, &ApplicationNameLocator::pinned("gamma"));
    assert_eq!(names.len(), 2);
    assert_eq!(selected, None);
}

#[test]
fn duplicate_names_reselect_the_closest_block() {
    let text = "applications:\n- name: alpha\n  memory: 1G\n- name: other\n- name: alpha\n";
    let document = Document::new(text);
    let locator = ApplicationNameLocator::new();
    let first = locator.locate(&document, None);
    let starts: Vec<usize> = first.entries().iter().map(|e| e.span.start).collect();
    assert_eq!(first.names(), vec!["alpha", "other", "alpha"]);

    let near_second = Selection {
        name: "alpha".into(),
        start: starts[2] - 2,
    };
    let located = locator.locate(&document, Some(&near_second));
    assert_eq!(located.selected_index(), Some(2));
}

#[test]
fn locate_is_idempotent() {
    let document = Document::new(TWO_APPS);
    let locator = ApplicationNameLocator::new();
    let previous = Selection {
        name: "beta".into(),
        start: 30,
    };
    let once = locator.locate(&document, Some(&previous));
    let twice = locator.locate(&document, Some(&previous));
    assert_eq!(once, twice);
    assert_eq!(once.selected().map(|e| e.name.as_str()), Some("beta"));
}

#[test]
fn malformed_yaml_yields_nothing() {
    let document = Document::new("applications:\n- name: {alpha\n");
    let locator = ApplicationNameLocator::new();
    let located = locator.locate(&document, None);
    assert!(located.is_empty());
    assert!(located.selected().is_none());
    assert!(matches!(
        locator.try_locate(&document, None),
        Err(LocateError::Parse(_))
    ));
}

#[test]
fn multi_document_streams_are_unsupported() {
    let document = Document::new("name: a\n---\nname: b\n");
    let locator = ApplicationNameLocator::new();
    assert!(locator.locate(&document, None).is_empty());
    assert!(matches!(
        locator.try_locate(&document, None),
        Err(LocateError::UnsupportedShape { documents: 2 })
    ));
}

#[test]
fn manifests_without_names_are_empty_not_errors() {
    let locator = ApplicationNameLocator::new();
    for text in ["", "memory: 1G\n", "applications: []\n", "- just\n- a list\n"] {
        let document = Document::new(text);
        let located = locator.try_locate(&document, None);
        match located {
            Ok(located) => assert!(located.is_empty(), "{text:?}"),
            Err(LocateError::UnsupportedShape { documents: 0 }) => assert!(text.is_empty()),
            Err(other) => panic!("unexpected error for {text:?}: {other}"),
        }
    }
}

#[test]
fn byte_order_mark_does_not_hide_applications() {
    let locator = ApplicationNameLocator::new();

    let root = locator.locate(&Document::new("\u{feff}name: foo\n"), None);
    assert_eq!(root.names(), vec!["foo"]);
    assert_eq!(root.entries()[0].span, Span::new(0, 10));

    let listed = locator.locate(&Document::new(format!("\u{feff}{TWO_APPS}")), None);
    assert_eq!(listed.names(), vec!["alpha", "beta"]);
    assert_eq!(listed.entries()[0].span.start, 16);
}

#[test]
fn flow_items_are_trimmed_to_their_closing_brace() {
    let document = Document::new("applications:\n- {name: alpha}   \n- {name: beta}\n");
    let located = ApplicationNameLocator::new().locate(&document, None);

    let spans: Vec<Span> = located.entries().iter().map(|e| e.span).collect();
    assert_eq!(spans, vec![Span::new(16, 29), Span::new(35, 47)]);
    assert_eq!(document.slice(spans[0]), "{name: alpha}");
    assert_eq!(document.slice(spans[1]), "{name: beta}");
}

#[test]
fn block_items_run_up_to_the_next_item() {
    let document = Document::new("applications:\n- name: a\n\n- name: b\n");
    let located = ApplicationNameLocator::new().locate(&document, None);

    let spans: Vec<Span> = located.entries().iter().map(|e| e.span).collect();
    // Marks land on the next `-` or the document end, which are never trimmed.
    assert_eq!(spans, vec![Span::new(16, 25), Span::new(27, document.len())]);
    assert_eq!(document.slice(spans[0]), "name: a\n\n");
}
