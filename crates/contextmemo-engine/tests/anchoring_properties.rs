use contextmemo_engine::anchoring::{
    Anchor, AnchorOptions, Mapping, ResolveError, ResolveOptions, Strategy, TextRange, flatten,
    remove_highlight, resolve_context_window, resolve_flat, resolve_structural, resolve_verbatim,
    serialize_range,
};
use contextmemo_engine::dom::Document;
use contextmemo_engine::{Resolution, annotate, restore_highlights};
use pretty_assertions::assert_eq;
use rstest::rstest;

const ORIGINAL: &str = "<html><head><title>Foxes</title></head><body><div id=\"content\">\
    <h1>Foxes</h1>\
    <p>Alpha beta gamma.</p>\
    <p>The quick brown fox jumps over the lazy dog.</p>\
    <p>The quick <em>brown</em> fox sleeps.</p>\
    </div></body></html>";

/// Same words as `ORIGINAL`, different whitespace.
const REFORMATTED: &str = "<html>\n<body>\n  <div id=\"content\">\n    <h1>Foxes</h1>\n    \
    <p>Alpha   beta\n gamma.</p>\n    \
    <p>The quick\n      brown fox   jumps over the lazy dog.</p>\n    \
    <p>The quick <em>brown</em> fox sleeps.</p>\n  </div>\n</body>\n</html>";

fn anchor_for(page: &str, needle: &str, occurrence: usize) -> Anchor {
    let doc = Document::parse_html(page);
    let range = TextRange::find_text(&doc, needle, occurrence).unwrap();
    serialize_range(&doc, &range, &AnchorOptions::default()).unwrap()
}

fn resolve_on(doc: &Document, anchor: &Anchor) -> Option<(Resolution, String)> {
    let flat = flatten(doc, doc.body());
    let resolution = resolve_flat(doc, &flat, anchor, &ResolveOptions::default())?;
    let text = resolution.range.text(&flat)?;
    Some((resolution, text))
}

#[rstest]
#[case("Alpha beta", 0)]
#[case("quick brown fox", 0)]
#[case("quick brown fox", 1)]
#[case("brown fox sleeps", 0)]
#[case("gamma.The quick", 0)]
#[case("Foxes", 0)]
fn test_round_trip_on_unchanged_document(#[case] needle: &str, #[case] occurrence: usize) {
    let doc = Document::parse_html(ORIGINAL);
    let selection = TextRange::find_text(&doc, needle, occurrence).unwrap();
    let anchor = serialize_range(&doc, &selection, &AnchorOptions::default()).unwrap();

    let (_, text) = resolve_on(&doc, &anchor).unwrap();

    assert_eq!(text, anchor.selected_text);
}

#[test]
fn test_round_trip_selects_the_same_occurrence() {
    let doc = Document::parse_html(ORIGINAL);
    let selection = TextRange::find_text(&doc, "quick brown fox", 1).unwrap();
    let anchor = serialize_range(&doc, &selection, &AnchorOptions::default()).unwrap();

    let (resolution, _) = resolve_on(&doc, &anchor).unwrap();
    let range = resolution.range.to_text_range(&flatten(&doc, doc.body())).unwrap();

    assert_eq!(range, selection);
}

#[test]
fn test_whitespace_reformatting_is_tolerated() {
    let anchor = anchor_for(ORIGINAL, "brown fox jumps", 0);
    let doc = Document::parse_html(REFORMATTED);

    let (resolution, text) = resolve_on(&doc, &anchor).unwrap();

    assert_eq!(
        resolution.strategy,
        Strategy::ContextWindow {
            mapping: Mapping::Normalized
        }
    );
    assert_eq!(text, "brown fox   jumps");
}

#[test]
fn test_context_disambiguates_repeated_phrase() {
    let page = "<body><ul><li>Save the file</li><li>Open the file</li></ul></body>";
    let anchor = anchor_for(page, "the file", 1);
    let doc = Document::parse_html(page);

    let (resolution, text) = resolve_on(&doc, &anchor).unwrap();

    assert_eq!(text, "the file");
    assert_eq!(resolution.range.start_unit, 1);
    assert_eq!(resolution.range.start_offset, 5);
}

#[test]
fn test_quick_brown_fox_scenario() {
    let page = "<body><p>The quick brown fox jumps. The quick brown fox sleeps.</p></body>";
    let doc = Document::parse_html(page);
    let flat = flatten(&doc, doc.body());
    let by_hand = Anchor {
        selected_text: "quick brown fox".into(),
        prefix: "The ".into(),
        suffix: " sleeps".into(),
        structural_start: None,
        structural_end: None,
    };

    for anchor in [by_hand, anchor_for(page, "quick brown fox", 1)] {
        let resolution = resolve_flat(&doc, &flat, &anchor, &ResolveOptions::default()).unwrap();
        assert_eq!(resolution.range.start_offset, 31);
        assert_eq!(resolution.range.end_offset, 46);
    }
}

#[test]
fn test_anchor_without_context_still_resolves() {
    let doc = Document::parse_html(ORIGINAL);
    let flat = flatten(&doc, doc.body());
    let bare = Anchor::from_text("lazy dog");

    let resolution = resolve_flat(&doc, &flat, &bare, &ResolveOptions::default()).unwrap();

    assert_eq!(
        resolution.strategy,
        Strategy::ContextWindow {
            mapping: Mapping::Normalized
        }
    );
    assert_eq!(resolution.range.text(&flat).as_deref(), Some("lazy dog"));
    assert!(resolve_verbatim(&flat, &bare).is_ok());
}

#[test]
fn test_absent_text_is_not_found_by_any_strategy() {
    let doc = Document::parse_html(ORIGINAL);
    let flat = flatten(&doc, doc.body());
    let absent = Anchor {
        selected_text: "a purple elephant".into(),
        prefix: "The quick ".into(),
        suffix: " jumps".into(),
        structural_start: None,
        structural_end: None,
    };

    assert_eq!(
        resolve_context_window(&flat, &absent, &ResolveOptions::default()),
        Err(ResolveError::NoMatch)
    );
    assert_eq!(
        resolve_structural(&doc, &flat, &absent),
        Err(ResolveError::NoStructuralAddress)
    );
    assert_eq!(resolve_verbatim(&flat, &absent), Err(ResolveError::NoMatch));
    assert_eq!(resolve_flat(&doc, &flat, &absent, &ResolveOptions::default()), None);
}

#[test]
fn test_structural_fallback_when_text_is_gone() {
    let doc = Document::parse_html(ORIGINAL);
    let mut anchor = anchor_for(ORIGINAL, "jumps over", 0);
    assert_eq!(
        anchor.structural_start.as_ref().unwrap().address.to_xpath(),
        "id(\"content\")/p[2]"
    );
    anchor.selected_text = "text that is no longer on the page".into();

    let (resolution, text) = resolve_on(&doc, &anchor).unwrap();

    assert_eq!(resolution.strategy, Strategy::Structural);
    assert_eq!(text, "jumps over");
}

/// Known precision gap: the structural tier never checks text, so after a
/// rewrite it anchors to whatever now sits at the stored address.
#[test]
fn test_structural_fallback_accepts_unrelated_text() {
    let anchor = anchor_for(ORIGINAL, "jumps over", 0);
    let rewritten = "<body><div id=\"content\"><h1>News</h1><p>Intro.</p>\
        <p>Completely unrelated words here.</p></div></body>";
    let doc = Document::parse_html(rewritten);

    let (resolution, text) = resolve_on(&doc, &anchor).unwrap();

    assert_eq!(resolution.strategy, Strategy::Structural);
    assert_ne!(text, anchor.selected_text);
}

#[test]
fn test_structural_offsets_are_clamped() {
    let anchor = anchor_for(ORIGINAL, "jumps over", 0);
    let doc = Document::parse_html("<body><div id=\"content\"><p>One.</p><p>Short.</p></div></body>");

    let (resolution, text) = resolve_on(&doc, &anchor).unwrap();

    assert_eq!(resolution.strategy, Strategy::Structural);
    assert_eq!(resolution.range.start_offset, 6);
    assert_eq!(resolution.range.end_offset, 6);
    assert_eq!(text, "");
}

#[test]
fn test_raw_fallback_mapping_path() {
    let page = "<body><p><span>alpha </span><span> beta</span> gamma</p></body>";
    let anchor = anchor_for(page, "beta", 0);
    assert_eq!(anchor.prefix, "alpha ");
    let doc = Document::parse_html(page);

    let (resolution, text) = resolve_on(&doc, &anchor).unwrap();

    assert_eq!(
        resolution.strategy,
        Strategy::ContextWindow {
            mapping: Mapping::RawFallback
        }
    );
    assert_eq!(text, "beta");
}

#[test]
fn test_anchor_survives_json_persistence() {
    let anchor = anchor_for(ORIGINAL, "quick brown fox", 1);
    let json = serde_json::to_string(&anchor).unwrap();
    let reloaded: Anchor = serde_json::from_str(&json).unwrap();
    let doc = Document::parse_html(ORIGINAL);

    assert_eq!(reloaded, anchor);
    assert_eq!(resolve_on(&doc, &reloaded), resolve_on(&doc, &anchor));
}

#[test]
fn test_overlapping_highlights_do_not_corrupt_each_other() {
    let source = Document::parse_html(ORIGINAL);
    let options = AnchorOptions::default();
    let first = TextRange::find_text(&source, "quick brown fox jumps", 0).unwrap();
    let second = TextRange::find_text(&source, "fox jumps over the lazy", 0).unwrap();
    let notes = vec![
        annotate(&source, &first, "https://example.com/", "one", &options).unwrap(),
        annotate(&source, &second, "https://example.com/", "two", &options).unwrap(),
    ];

    let mut doc = Document::parse_html(ORIGINAL);
    let report = restore_highlights(&mut doc, &notes, &ResolveOptions::default());

    assert_eq!(report.applied.len(), 2);
    assert_eq!(doc.text_content(doc.body()), source.text_content(source.body()));

    assert_eq!(remove_highlight(&mut doc, &notes[0].id.to_string()), 2);
    assert_eq!(remove_highlight(&mut doc, &notes[1].id.to_string()), 1);
    assert_eq!(doc.to_html(), source.to_html());
}
