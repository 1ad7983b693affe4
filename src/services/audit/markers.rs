//! Phase Marker Filter
//!
//! The backend embeds `[[PHASE: name]]` tags in its narration. The filter
//! removes them from streamed text and reports each one as a phase event.
//! Fragments can split a tag anywhere, so a trailing piece that might still
//! become a tag is held back until the next fragment settles it.
//!
//! A tag lives on one line. An opener that never closes on its line, or
//! outgrows the hold bound, is stripped together with its name token and
//! the text after it is forwarded.

use std::sync::OnceLock;

use regex::Regex;
use tracing::debug;

/// Longest trailing piece held back while waiting for a tag to close.
const MAX_HOLD_BYTES: usize = 96;

/// Filtered output, in stream order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterEvent {
    Text(String),
    Phase(String),
}

fn marker_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)[ \t]*\[\[[ \t]*phase[ \t]*:(?:[ \t]*([^\[\]\n]*?)[ \t]*\]\]|[ \t]*[\w.\-]*)(?:[ \t]*\r?\n)?",
        )
        .ok()
    })
    .as_ref()
}

fn partial_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"(?i)[ \t]*\[(?:\[[ \t]*(?:p(?:h(?:a(?:s(?:e[ \t]*(?::[^\[\]\n]*\]?)?)?)?)?)?)?)?$",
        )
        .ok()
    })
    .as_ref()
}

/// Split complete text into text and phase events.
fn split_markers(text: &str) -> Vec<FilterEvent> {
    let Some(re) = marker_regex() else {
        return if text.is_empty() {
            Vec::new()
        } else {
            vec![FilterEvent::Text(text.to_string())]
        };
    };

    let mut events = Vec::new();
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if whole.start() > last {
            events.push(FilterEvent::Text(text[last..whole.start()].to_string()));
        }
        match caps.get(1) {
            Some(name) if !name.as_str().trim().is_empty() => {
                events.push(FilterEvent::Phase(name.as_str().trim().to_string()));
            }
            Some(_) => {}
            None => debug!(fragment = %whole.as_str(), "Dropping unterminated phase marker"),
        }
        last = whole.end();
    }
    if last < text.len() {
        events.push(FilterEvent::Text(text[last..].to_string()));
    }
    events
}

/// Byte offset where a possible unfinished tag starts, if any.
fn holdback_start(text: &str) -> Option<usize> {
    let m = partial_regex()?.find(text)?;
    (text.len() - m.start() <= MAX_HOLD_BYTES).then_some(m.start())
}

/// Incremental marker filter for one streamed turn.
#[derive(Debug, Default)]
pub struct MarkerFilter {
    pending: String,
}

impl MarkerFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one fragment.
    pub fn push(&mut self, fragment: &str) -> Vec<FilterEvent> {
        self.pending.push_str(fragment);
        let text = std::mem::take(&mut self.pending);

        match holdback_start(&text) {
            Some(start) => {
                self.pending = text[start..].to_string();
                split_markers(&text[..start])
            }
            None => split_markers(&text),
        }
    }

    /// Flush whatever is held back at the end of a turn.
    pub fn finish(&mut self) -> Vec<FilterEvent> {
        let text = std::mem::take(&mut self.pending);
        split_markers(&text)
    }
}

/// Remove every marker from a complete text.
pub fn strip_markers(text: &str) -> String {
    let mut filter = MarkerFilter::new();
    let mut events = filter.push(text);
    events.extend(filter.finish());
    events
        .into_iter()
        .filter_map(|e| match e {
            FilterEvent::Text(t) => Some(t),
            FilterEvent::Phase(_) => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(fragments: &[&str]) -> (String, Vec<String>) {
        let mut filter = MarkerFilter::new();
        let mut events = Vec::new();
        for f in fragments {
            events.extend(filter.push(f));
        }
        events.extend(filter.finish());

        let mut text = String::new();
        let mut phases = Vec::new();
        for e in events {
            match e {
                FilterEvent::Text(t) => text.push_str(&t),
                FilterEvent::Phase(p) => phases.push(p),
            }
        }
        (text, phases)
    }

    #[test]
    fn test_marker_on_own_line() {
        let (text, phases) = run(&["[[PHASE: analysis]]\nCounting layers.\n"]);
        assert_eq!(text, "Counting layers.\n");
        assert_eq!(phases, vec!["analysis"]);
    }

    #[test]
    fn test_case_and_whitespace_tolerant() {
        let (text, phases) = run(&["a\n  [[ phase :  Benchmarks ]]\nb"]);
        assert_eq!(text, "a\nb");
        assert_eq!(phases, vec!["Benchmarks"]);
    }

    #[test]
    fn test_marker_split_across_fragments() {
        let (text, phases) = run(&["Start\n[[PHA", "SE: sea", "rch]]\nDone"]);
        assert_eq!(text, "Start\nDone");
        assert_eq!(phases, vec!["search"]);
    }

    #[test]
    fn test_each_occurrence_reported() {
        let (text, phases) = run(&["[[PHASE: a]]\nx\n[[PHASE: a]]\ny"]);
        assert_eq!(text, "x\ny");
        assert_eq!(phases, vec!["a", "a"]);
    }

    #[test]
    fn test_mid_line_marker_keeps_surrounding_text() {
        let (text, phases) = run(&["before [[PHASE: x]] after"]);
        assert_eq!(text, "before after");
        assert_eq!(phases, vec!["x"]);
    }

    #[test]
    fn test_brackets_that_are_not_markers_pass_through() {
        let (text, phases) = run(&["y = x[[0, 1]]", " and [", "1]"]);
        assert_eq!(text, "y = x[[0, 1]] and [1]");
        assert!(phases.is_empty());
    }

    #[test]
    fn test_unterminated_marker_dropped_at_end() {
        let (text, phases) = run(&["text\n[[PHASE: trunc"]);
        assert_eq!(text, "text\n");
        assert!(phases.is_empty());
    }

    #[test]
    fn test_unclosed_marker_keeps_following_lines() {
        let (text, phases) = run(&["[[PHASE: analysis\nLooking at the convs.\n{\"a\": 1}"]);
        assert_eq!(text, "Looking at the convs.\n{\"a\": 1}");
        assert!(phases.is_empty());

        let (text, _) = run(&["[[PHASE: analysis", "\nLooking at the convs.\n", "{\"a\": 1}"]);
        assert_eq!(text, "Looking at the convs.\n{\"a\": 1}");
    }

    #[test]
    fn test_opener_longer_than_hold_bound_is_stripped() {
        let long_name = "x".repeat(MAX_HOLD_BYTES + 24);

        let (text, phases) = run(&[&format!("[[PHASE: {}\nmore narration", long_name)]);
        assert_eq!(text, "more narration");
        assert!(phases.is_empty());

        let (text, _) = run(&["[[PHASE: ", &long_name, "\nmore narration"]);
        assert!(!text.contains("[[PHASE:"));
        assert!(text.ends_with("more narration"));
    }

    #[test]
    fn test_partial_bracket_released_at_end() {
        let (text, _) = run(&["ends with ["]);
        assert_eq!(text, "ends with [");
    }

    #[test]
    fn test_strip_markers_idempotent() {
        let raw = "[[PHASE: a]]\n{\"x\": 1}\n[[phase:b]]";
        let once = strip_markers(raw);
        assert_eq!(once, "{\"x\": 1}\n");
        assert_eq!(strip_markers(&once), once);
        assert!(!once.contains("[[PHASE:"));
    }
}
