//! Scanner integration tests
//!
//! Offset correctness over a range of documents, plus span layout for
//! nesting, escaped values, namespaces and malformed input.

mod common;

use common::{covered, scan_text, scan_with, spans_for};
use xmlcolor::highlight::{ColorClass, ScanError, ScanOutcome, ScanSettings};

const DOCUMENTS: &[&str] = &[
    r#"<a x="1"><b/></a>"#,
    "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<!-- header -->\n<root/>",
    "<r>\n\t<item   key = 'v'  other=\"w\" />\n\t<item>text &amp; more</item>\n</r>\n",
    "<r\r\n  a=\"1\"\r\n>\r\n  <!--\r\n multi\r\n line -->\r\n</r>",
    "<doc>\n  <naïve attr=\"café\">ünïcödé</naïve>\n  <ß k='€'/>\n</doc>",
    "<ns:root xmlns:ns=\"urn:x\"><ns:child ns:attr=\"1\"/></ns:root>",
    "<!DOCTYPE r [<!ELEMENT r ANY>]>\n<r a=\"&lt;&gt;\"></r>",
    "<a><![CDATA[<not> a tag]]><b c=\"d\"/></a >",
    "<a xmlns=\"u>v\" xmlns:q='urn:q'><q:b q:c=\"&gt;\"/></a>",
    "<!DOCTYPE r [<!ENTITY e \"<x a='1'/>\">]>\n<r>\n<q/>\n&e;</r>",
];

fn check_offsets(text: &str) {
    let spans = spans_for(text);
    assert!(!spans.is_empty(), "no spans for {:?}", text);

    for span in &spans {
        assert!(span.len > 0, "empty span in {:?}", text);
        assert!(span.end() <= text.len(), "{:?} past end of {:?}", span, text);
        assert!(
            text.is_char_boundary(span.start) && text.is_char_boundary(span.end()),
            "{:?} splits a character in {:?}",
            span,
            text
        );

        let covered = &text[span.range()];
        match span.class {
            ColorClass::Delimiter => assert!(
                matches!(covered, "<" | ">" | "/>" | "</" | "="),
                "unexpected delimiter {:?} in {:?}",
                covered,
                text
            ),
            ColorClass::ElementName | ColorClass::AttributeName => {
                assert!(
                    !covered.contains(|c: char| c.is_whitespace() || "<>=\"'/".contains(c)),
                    "name {:?} in {:?}",
                    covered,
                    text
                );
            }
            ColorClass::AttributeValue => {
                let quote = text[..span.start].chars().last();
                assert!(matches!(quote, Some('"' | '\'')), "{:?} not quoted", covered);
                assert_eq!(text[span.end()..].chars().next(), quote);
            }
            ColorClass::Comment => {
                assert!(text[..span.start].ends_with("<!--"), "comment {:?}", covered);
                assert!(text[span.end()..].starts_with("-->"), "comment {:?}", covered);
            }
        }
    }

    for pair in spans.windows(2) {
        assert!(
            pair[0].end() <= pair[1].start,
            "{:?} overlaps {:?} in {:?}",
            pair[0],
            pair[1],
            text
        );
    }
}

#[test]
fn test_span_offsets_cover_expected_text() {
    for doc in DOCUMENTS {
        check_offsets(doc);
    }
}

#[test]
fn test_large_document_offsets() {
    check_offsets(&common::large_document(500));
}

#[test]
fn test_nested_and_self_closing_tags() {
    let text = r#"<a x="1"><b/></a>"#;
    assert_eq!(
        covered(text, &spans_for(text)),
        vec![
            ("<", "delimiter"),
            ("a", "element-name"),
            ("x", "attribute-name"),
            ("=", "delimiter"),
            ("1", "attribute-value"),
            (">", "delimiter"),
            ("<", "delimiter"),
            ("b", "element-name"),
            ("/>", "delimiter"),
            ("</", "delimiter"),
            ("a", "element-name"),
            (">", "delimiter"),
        ]
    );
}

#[test]
fn test_escaped_value_keeps_source_length() {
    let text = r#"<a x="5&quot;6"/>"#;
    let spans = spans_for(text);
    let value = spans
        .iter()
        .find(|s| s.class == ColorClass::AttributeValue)
        .expect("value span");
    assert_eq!((value.start, value.len), (6, 8));
}

#[test]
fn test_mismatched_tags_are_malformed() {
    let run = scan_text("<a><b></a>");
    match run.outcome {
        Err(ScanError::MalformedDocument(err)) => assert!(!err.to_string().is_empty()),
        other => panic!("expected malformed document, got {:?}", other),
    }
    assert!(run.reports.iter().all(|p| !p.is_complete()));
}

#[test]
fn test_namespaced_names_cover_prefix() {
    let text = "<ns:root xmlns:ns=\"urn:x\"><ns:child ns:attr=\"1\"/></ns:root>";
    let got = covered(text, &spans_for(text));
    assert_eq!(
        &got[..6],
        &[
            ("<", "delimiter"),
            ("ns:root", "element-name"),
            ("xmlns:ns", "attribute-name"),
            ("=", "delimiter"),
            ("urn:x", "attribute-value"),
            (">", "delimiter"),
        ]
    );
    assert!(got.contains(&("ns:child", "element-name")));
    assert!(got.contains(&("ns:attr", "attribute-name")));
}

#[test]
fn test_default_namespace_value_with_gt() {
    let text = r#"<a xmlns="u>v"/>"#;
    let got = covered(text, &spans_for(text));
    assert_eq!(
        got,
        vec![
            ("<", "delimiter"),
            ("a", "element-name"),
            ("xmlns", "attribute-name"),
            ("=", "delimiter"),
            ("u>v", "attribute-value"),
            ("/>", "delimiter"),
        ]
    );
}

#[test]
fn test_entity_expansion_is_not_painted_inside_dtd() {
    let text = "<!DOCTYPE r [<!ENTITY e \"<x a='1'/>\">]>\n<r>\n<q/>\n&e;</r>";
    let spans = spans_for(text);
    let root = text.find("<r>").unwrap();
    assert!(spans.iter().all(|s| s.start >= root), "{:?}", spans);
    assert_eq!(
        covered(text, &spans)
            .into_iter()
            .filter(|(_, class)| *class == "element-name")
            .map(|(name, _)| name)
            .collect::<Vec<_>>(),
        vec!["r", "q", "r"]
    );
}

#[test]
fn test_single_flush_settings_still_complete() {
    let settings = ScanSettings {
        poll_interval: 1,
        flushes_per_document: 1,
        min_reporting_interval: 1,
    };
    let doc = common::large_document(40);
    let run = scan_with(&doc, &settings);
    assert_eq!(run.outcome, Ok(ScanOutcome::Completed));
    assert_eq!(run.reports.last().map(|p| p.percent()), Some(100));
    assert_eq!(run.spans, spans_for(&doc));
}
