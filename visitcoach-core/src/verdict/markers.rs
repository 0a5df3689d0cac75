//! Inline citation markers
//!
//! Answer text cites curriculum sources as `[n]` and transcript quotes as
//! `[Tn]`. A single bracket may group several, e.g. `[2, T1]`. Markers are
//! never rewritten; this module only locates and parses them.

use std::ops::Range;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

static MARKER_GROUP: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"\[(T?\d+(?:\s*,\s*T?\d+)*)\]").ok());

/// One member of a marker group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum CitationRef {
    /// `[n]`, resolved against the grounding-derived citations
    Curriculum(u32),
    /// `[Tn]`, resolved against the transcript citations
    Transcript(u32),
}

impl CitationRef {
    /// Parse a single member such as `3` or `T1`
    pub fn parse(member: &str) -> Option<Self> {
        let member = member.trim();
        match member.strip_prefix('T') {
            Some(number) => number.parse().ok().map(CitationRef::Transcript),
            None => member.parse().ok().map(CitationRef::Curriculum),
        }
    }

    /// The standalone bracketed form, e.g. `[T1]`
    pub fn marker(&self) -> String {
        format!("[{self}]")
    }
}

impl std::fmt::Display for CitationRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CitationRef::Curriculum(n) => write!(f, "{n}"),
            CitationRef::Transcript(n) => write!(f, "T{n}"),
        }
    }
}

/// A bracketed marker and the references it holds
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarkerGroup {
    /// Byte range of the whole bracket in the scanned text
    pub span: Range<usize>,
    pub refs: Vec<CitationRef>,
}

/// Find every marker group in `text`, in order of appearance
pub fn scan_markers(text: &str) -> Vec<MarkerGroup> {
    let Some(regex) = MARKER_GROUP.as_ref() else {
        return Vec::new();
    };

    regex
        .captures_iter(text)
        .filter_map(|caps| {
            let whole = caps.get(0)?;
            let refs: Vec<CitationRef> = caps
                .get(1)?
                .as_str()
                .split(',')
                .filter_map(CitationRef::parse)
                .collect();
            (!refs.is_empty()).then(|| MarkerGroup {
                span: whole.range(),
                refs,
            })
        })
        .collect()
}

/// Every reference in `text`, flattened across groups
pub fn referenced(text: &str) -> Vec<CitationRef> {
    scan_markers(text)
        .into_iter()
        .flat_map(|group| group.refs)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scans_single_curriculum_marker() {
        let groups = scan_markers("Introduce yourself fully [1].");
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].refs, vec![CitationRef::Curriculum(1)]);
        assert_eq!(groups[0].span, 25..28);
    }

    #[test]
    fn scans_mixed_group() {
        let groups = scan_markers("You asked permission [2, T1] and waited.");
        assert_eq!(
            groups[0].refs,
            vec![CitationRef::Curriculum(2), CitationRef::Transcript(1)]
        );
    }

    #[test]
    fn scans_multiple_groups_in_order() {
        let refs = referenced("A [T3]. B [1,2]. C [T1 , 4].");
        assert_eq!(
            refs,
            vec![
                CitationRef::Transcript(3),
                CitationRef::Curriculum(1),
                CitationRef::Curriculum(2),
                CitationRef::Transcript(1),
                CitationRef::Curriculum(4),
            ]
        );
    }

    #[test]
    fn ignores_non_marker_brackets() {
        assert!(scan_markers("See [note] and [] and [T] and [1a].").is_empty());
    }

    #[test]
    fn marker_form_round_trips() {
        assert_eq!(CitationRef::Transcript(7).marker(), "[T7]");
        assert_eq!(CitationRef::Curriculum(12).marker(), "[12]");
        assert_eq!(CitationRef::parse(" T7 "), Some(CitationRef::Transcript(7)));
        assert_eq!(CitationRef::parse("x"), None);
    }
}
