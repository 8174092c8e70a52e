use std::borrow::Cow;
use std::sync::LazyLock;

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use regex::Regex;
use serde::Serialize;

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]*>").expect("tag pattern is valid"));

/// One timed fragment of a transcript, in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cue {
    pub text: String,
    pub start: f64,
    pub duration: f64,
}

/// Parses a timedtext XML payload into cues, keeping document order.
///
/// Every `<text>` child of the root yields one cue unless its text content is
/// empty. A bare fragment of `<text>` elements is accepted as well. Markup inside
/// the text (for example `&lt;font&gt;` runs) is decoded and stripped.
/// A missing or non-numeric `start`/`dur` becomes `0.0`.
pub fn parse_cues(xml: &str) -> Result<Vec<Cue>, quick_xml::Error> {
    let mut reader = Reader::from_str(xml);
    let mut cues = Vec::new();
    // Open <text> element: timing, the text collected so far and its depth.
    let mut current: Option<(f64, f64, String, usize)> = None;
    let mut depth = 0usize;

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                if current.is_none() && depth <= 1 && e.name().as_ref() == b"text" {
                    let (start, duration) = timing(&e)?;
                    current = Some((start, duration, String::new(), depth));
                }
                depth += 1;
            }
            Event::End(_) => {
                depth = depth.saturating_sub(1);
                if current.as_ref().is_some_and(|(_, _, _, open)| *open == depth) {
                    if let Some((start, duration, raw, _)) = current.take() {
                        if let Some(text) = clean_text(&raw) {
                            cues.push(Cue { text, start, duration });
                        }
                    }
                }
            }
            Event::Text(e) => {
                if let Some((_, _, raw, _)) = current.as_mut() {
                    raw.push_str(&e.unescape()?);
                }
            }
            Event::CData(e) => {
                if let Some((_, _, raw, _)) = current.as_mut() {
                    raw.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Event::Eof => break,
            // <text .../> has no content
            _ => {}
        }
    }

    Ok(cues)
}

fn timing(e: &BytesStart<'_>) -> Result<(f64, f64), quick_xml::Error> {
    let mut start = 0.0;
    let mut duration = 0.0;
    for attr in e.attributes() {
        let attr = attr?;
        let value = attr.unescape_value()?;
        match attr.key.as_ref() {
            b"start" => start = seconds(&value),
            b"dur" => duration = seconds(&value),
            _ => {}
        }
    }
    Ok((start, duration))
}

fn seconds(value: &str) -> f64 {
    value.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// `None` when the element carried no text at all.
fn clean_text(raw: &str) -> Option<String> {
    if raw.is_empty() {
        return None;
    }
    let decoded = html_escape::decode_html_entities(raw);
    let stripped = match HTML_TAG.replace_all(&decoded, "") {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    };
    Some(stripped)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_elements_are_dropped() {
        let cues = parse_cues(r#"<text start="1.0" dur="2.5">A &amp; B</text><text start="3.0"></text>"#).unwrap();
        assert_eq!(cues, vec![Cue { text: "A & B".into(), start: 1.0, duration: 2.5 }]);
    }

    #[test]
    fn document_order_is_preserved() {
        let xml = r#"<?xml version="1.0" encoding="utf-8" ?>
<transcript>
    <text start="5.0" dur="1.0">later</text>
    <text start="0.5" dur="1.0">earlier</text>
    <text start="9.0" dur="1.0"/>
    <text start="7.25" dur="0.5">last</text>
</transcript>"#;
        let texts: Vec<_> = parse_cues(xml).unwrap().into_iter().map(|c| c.text).collect();
        assert_eq!(texts, ["later", "earlier", "last"]);
    }

    #[test]
    fn missing_or_bad_timing_defaults_to_zero() {
        let xml = r#"<transcript>
<text start="1.5">no duration</text>
<text start="2.0" dur="soon">bad duration</text>
<text dur="3.0">no start</text>
</transcript>"#;
        let cues = parse_cues(xml).unwrap();
        assert_eq!(cues.len(), 3);
        assert_eq!((cues[0].start, cues[0].duration), (1.5, 0.0));
        assert_eq!((cues[1].start, cues[1].duration), (2.0, 0.0));
        assert_eq!((cues[2].start, cues[2].duration), (0.0, 3.0));
    }

    #[test]
    fn double_escaped_entities_and_markup_are_cleaned() {
        let xml = r#"<transcript>
<text start="0.0" dur="1.0">it&amp;#39;s &lt;font color=&quot;#E5E5E5&quot;&gt;loud&lt;/font&gt; &amp;quot;here&amp;quot;</text>
</transcript>"#;
        let cues = parse_cues(xml).unwrap();
        assert_eq!(cues[0].text, "it's loud \"here\"");
    }

    #[test]
    fn nested_elements_contribute_their_text() {
        let xml = r#"<transcript><text start="1" dur="1">a <b>bold</b> word</text></transcript>"#;
        let cues = parse_cues(xml).unwrap();
        assert_eq!(cues[0].text, "a bold word");
    }

    #[test]
    fn only_children_of_the_root_are_cues() {
        let xml = r#"<transcript>
<body><text start="1.0" dur="1.0">deep</text></body>
<text start="2.0" dur="1.0">top</text>
</transcript>"#;
        let cues = parse_cues(xml).unwrap();
        assert_eq!(cues, vec![Cue { text: "top".into(), start: 2.0, duration: 1.0 }]);
    }

    #[test]
    fn malformed_xml_is_an_error() {
        assert!(parse_cues(r#"<transcript><text start="1">open</transcript>"#).is_err());
    }
}
