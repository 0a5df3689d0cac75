//! Reconstruction of a structured verdict from streamed answer text
//!
//! The answer is expected to be a single JSON object, possibly wrapped in a
//! Markdown code fence. Text that does not parse yet is `Incomplete`; text
//! that parses but violates the verdict shape is `Invalid`.

use serde_json::Value;
use tracing::debug;

use super::shape::VerdictShape;
use super::types::{AnalysisVerdict, SupervisorVerdict, Verdict, curriculum_citations};
use crate::parser::GroundingBatch;
use crate::session::PromptVariant;

/// Outcome of one extraction attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction<V> {
    Complete(V),
    /// Not parseable yet; more answer text may complete it
    Incomplete,
    /// Parseable but not an acceptable verdict
    Invalid(String),
}

impl<V> Extraction<V> {
    pub fn is_complete(&self) -> bool {
        matches!(self, Extraction::Complete(_))
    }

    pub fn map<U>(self, f: impl FnOnce(V) -> U) -> Extraction<U> {
        match self {
            Extraction::Complete(verdict) => Extraction::Complete(f(verdict)),
            Extraction::Incomplete => Extraction::Incomplete,
            Extraction::Invalid(reason) => Extraction::Invalid(reason),
        }
    }
}

/// Extract a caseworker analysis verdict
pub fn try_extract(
    answer_text: &str,
    grounding: Option<&GroundingBatch>,
) -> Extraction<AnalysisVerdict> {
    try_extract_as(answer_text, grounding)
}

/// Extract the verdict shape a prompt variant asks for
pub fn try_extract_for(
    variant: PromptVariant,
    answer_text: &str,
    grounding: Option<&GroundingBatch>,
) -> Extraction<Verdict> {
    match variant {
        PromptVariant::Caseworker => try_extract(answer_text, grounding).map(Verdict::Caseworker),
        PromptVariant::Supervisor => {
            try_extract_as::<SupervisorVerdict>(answer_text, grounding).map(Verdict::Supervisor)
        }
    }
}

/// Extract any verdict shape
///
/// On success a non-empty grounding batch replaces the verdict's curriculum
/// citations, numbered exactly as the batch is.
pub fn try_extract_as<V: VerdictShape>(
    answer_text: &str,
    grounding: Option<&GroundingBatch>,
) -> Extraction<V> {
    let body = strip_code_fences(answer_text);

    let value: Value = match isolate_object(body) {
        Some(object_text) => match serde_json::from_str(object_text) {
            Ok(value) => value,
            Err(_) => return Extraction::Incomplete,
        },
        None => {
            return match serde_json::from_str::<Value>(body) {
                Ok(_) => Extraction::Invalid("expected a JSON object".to_string()),
                Err(_) => Extraction::Incomplete,
            };
        }
    };

    let Value::Object(object) = value else {
        return Extraction::Invalid("expected a JSON object".to_string());
    };

    if let Err(reason) = V::validate(&object) {
        debug!(shape = V::NAME, %reason, "Rejected verdict");
        return Extraction::Invalid(reason);
    }

    let mut verdict: V = match serde_json::from_value(Value::Object(object)) {
        Ok(verdict) => verdict,
        Err(e) => return Extraction::Invalid(format!("malformed {} verdict: {e}", V::NAME)),
    };

    if let Some(batch) = grounding.filter(|batch| !batch.is_empty()) {
        verdict.attach_citations(curriculum_citations(batch));
    }

    Extraction::Complete(verdict)
}

/// Remove a surrounding Markdown code fence, with or without a language tag
pub fn strip_code_fences(text: &str) -> &str {
    let mut body = text.trim();

    if let Some(rest) = body.strip_prefix("```") {
        body = match rest.find('\n') {
            Some(newline) => &rest[newline + 1..],
            // Single-line fence: drop only the language tag
            None => skip_language_tag(rest),
        };
    }
    if let Some(rest) = body.trim_end().strip_suffix("```") {
        body = rest;
    }

    body.trim()
}

/// Skip a leading tag such as `json` on the opening fence line
fn skip_language_tag(text: &str) -> &str {
    let tag_len = text
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '-' || c == '_'))
        .unwrap_or(text.len());
    &text[tag_len..]
}

/// Slice from the first `{` to the last `}`
fn isolate_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{GroundingSource, PageRange};

    const VALID: &str = r#"{"overallSummary":"Warm and clear [1].","strengths":["Introduced self [T1]"],"areasForImprovement":[{"area":"Next steps","suggestion":"Explain the process."}]}"#;

    fn grounding() -> GroundingBatch {
        GroundingBatch {
            sources: vec![GroundingSource {
                index: 1,
                title: "Engagement Standards, p.12".to_string(),
                text: Some("Workers state their full name.".to_string()),
                pages: Some(PageRange {
                    first_page: 12,
                    last_page: 12,
                }),
                uri: None,
            }],
        }
    }

    // ==================== Fence Tests ====================

    #[test]
    fn strips_json_fence() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    #[test]
    fn strips_bare_fence_and_whitespace() {
        assert_eq!(strip_code_fences("  ```\n{}\n```  \n"), "{}");
    }

    #[test]
    fn leaves_unfenced_text_alone() {
        assert_eq!(strip_code_fences(" {\"a\":1} "), "{\"a\":1}");
    }

    #[test]
    fn opening_fence_without_newline_is_empty() {
        assert_eq!(strip_code_fences("```json"), "");
    }

    #[test]
    fn single_line_fence_keeps_its_content() {
        assert_eq!(strip_code_fences("```json {\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```json{\"a\":1}"), "{\"a\":1}");
    }

    // ==================== Extraction Tests ====================

    #[test]
    fn complete_verdict_is_extracted() {
        let extraction = try_extract(VALID, None);
        let Extraction::Complete(verdict) = extraction else {
            panic!("expected complete verdict");
        };
        assert_eq!(verdict.strengths.len(), 1);
        assert!(verdict.citations.is_none());
    }

    #[test]
    fn fenced_verdict_is_extracted() {
        let fenced = format!("```json\n{VALID}\n```");
        assert!(try_extract(&fenced, None).is_complete());
    }

    #[test]
    fn single_line_fenced_verdict_is_extracted() {
        let fenced = format!("```json {VALID}```");
        assert!(try_extract(&fenced, None).is_complete());
    }

    #[test]
    fn every_strict_prefix_is_incomplete() {
        for end in 0..VALID.len() {
            assert_eq!(
                try_extract(&VALID[..end], None),
                Extraction::Incomplete,
                "prefix of length {end}"
            );
        }
    }

    #[test]
    fn non_object_json_is_invalid() {
        assert!(matches!(try_extract("[1, 2]", None), Extraction::Invalid(_)));
        assert!(matches!(try_extract("\"text\"", None), Extraction::Invalid(_)));
    }

    #[test]
    fn missing_required_field_is_invalid() {
        let extraction = try_extract(r#"{"overallSummary":"Fine.","strengths":["x"]}"#, None);
        assert_eq!(
            extraction,
            Extraction::Invalid("missing 'areasForImprovement'".to_string())
        );
    }

    #[test]
    fn wrongly_typed_optional_section_is_invalid() {
        let text = VALID.replacen('{', r#"{"criteriaAnalysis":"none","#, 1);
        let Extraction::Invalid(reason) = try_extract(&text, None) else {
            panic!("expected invalid");
        };
        assert!(reason.contains("analysis"));
    }

    #[test]
    fn grounding_replaces_citations_with_same_numbering() {
        let Extraction::Complete(verdict) = try_extract(VALID, Some(&grounding())) else {
            panic!("expected complete verdict");
        };
        let citations = verdict.citations.unwrap();

        assert_eq!(citations.len(), 1);
        assert_eq!(citations[0].number, 1);
        assert_eq!(citations[0].source, "Engagement Standards, p.12");
        assert_eq!(citations[0].pages.as_deref(), Some("Pages 12-12"));
    }

    #[test]
    fn empty_grounding_keeps_model_citations() {
        let text = VALID.replacen(
            '{',
            r#"{"citations":[{"number":1,"source":"From model"}],"#,
            1,
        );
        let Extraction::Complete(verdict) = try_extract(&text, Some(&GroundingBatch::default()))
        else {
            panic!("expected complete verdict");
        };
        assert_eq!(verdict.citations.unwrap()[0].source, "From model");
    }

    #[test]
    fn supervisor_shape_is_extracted() {
        let extraction: Extraction<SupervisorVerdict> = try_extract_as(
            r#"{"feedbackOnStrengths":"Accurate.","feedbackOnCritique":"Specific.","overallTone":"Supportive"}"#,
            Some(&grounding()),
        );
        let Extraction::Complete(verdict) = extraction else {
            panic!("expected complete verdict");
        };
        assert_eq!(verdict.overall_tone, "Supportive");
        assert_eq!(verdict.citations.unwrap().len(), 1);
    }

    #[test]
    fn variant_selects_shape() {
        let caseworker = try_extract_for(PromptVariant::Caseworker, VALID, None);
        assert!(matches!(caseworker, Extraction::Complete(Verdict::Caseworker(_))));

        let supervisor = try_extract_for(PromptVariant::Supervisor, VALID, None);
        assert_eq!(
            supervisor,
            Extraction::Invalid("missing 'feedbackOnStrengths'".to_string())
        );
    }

    #[test]
    fn map_preserves_incomplete_and_invalid() {
        assert_eq!(
            Extraction::<u8>::Incomplete.map(|v| v + 1),
            Extraction::Incomplete
        );
        assert_eq!(
            Extraction::<u8>::Invalid("bad".to_string()).map(|v| v + 1),
            Extraction::Invalid("bad".to_string())
        );
        assert_eq!(Extraction::Complete(1u8).map(|v| v + 1), Extraction::Complete(2));
    }
}
