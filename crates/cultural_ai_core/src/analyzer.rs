//! crates/cultural_ai_core/src/analyzer.rs
//!
//! The network-free analysis strategy and the prompt shared with the
//! provider-backed strategy.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::domain::{AnalysisRequest, Finding, FindingKind, FindingReport, TextOrigin};
use crate::ports::CulturalAnalyzer;

/// A phrase the heuristic analyzer looks for, with its neutral replacement.
struct Marker {
    pattern: Regex,
    replacement: &'static str,
}

impl Marker {
    fn new(phrase: &str, replacement: &'static str) -> Self {
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", phrase)).expect("valid marker pattern");
        Self {
            pattern,
            replacement,
        }
    }
}

// Checked in this order; every match produces its own finding.
static IDIOM_MARKERS: Lazy<Vec<Marker>> = Lazy::new(|| {
    vec![
        Marker::new("break a leg", "I wish you success"),
        Marker::new("piece of cake", "very straightforward"),
        Marker::new("under the weather", "feeling unwell"),
        Marker::new("cost an arm and a leg", "very expensive"),
    ]
});

static INFORMAL_MARKERS: Lazy<Vec<Marker>> = Lazy::new(|| {
    vec![
        Marker::new("hey", "Hello"),
        Marker::new("what'?s up", "How are you"),
    ]
});

const IDIOM_EXPLANATION: &str =
    "This English idiom may not translate well in other cultures and could be confusing.";
const FORMALITY_EXPLANATION: &str =
    "This greeting is too casual for formal or initial business interactions in many cultures.";
const CONTEXT_EXPLANATION: &str = "When interpreting this message, consider that in some cultures, communication may be more indirect. Look for subtle cues rather than explicit statements.";
const GENERAL_EXPLANATION: &str = "No obvious cultural concerns detected in the provided text. However, always consider context and relationship with the recipient.";

// Lengths are in UTF-16 code units, the unit client-side text lengths use.
const CONTEXT_MIN_UNITS: usize = 20;
const ALTERNATIVES_MIN_UNITS: usize = 10;

/// Pattern-matching analyzer with no network dependency.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicAnalyzer;

impl HeuristicAnalyzer {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous core of the heuristic strategy.
    pub fn report(&self, request: &AnalysisRequest, culture_name: &str) -> FindingReport {
        let text = request.text.as_str();
        let length = text.encode_utf16().count();
        let mut issues = Vec::new();

        for marker in IDIOM_MARKERS.iter() {
            if let Some(found) = marker.pattern.find(text) {
                issues.push(Finding {
                    kind: FindingKind::Idiom,
                    excerpt: found.as_str().to_string(),
                    explanation: IDIOM_EXPLANATION.to_string(),
                    suggestion: Some(format!(
                        "Consider using more direct language, e.g. \"{}\".",
                        marker.replacement
                    )),
                    related_idiom_id: None,
                });
            }
        }

        for marker in INFORMAL_MARKERS.iter() {
            if let Some(found) = marker.pattern.find(text) {
                issues.push(Finding {
                    kind: FindingKind::Formality,
                    excerpt: found.as_str().to_string(),
                    explanation: FORMALITY_EXPLANATION.to_string(),
                    suggestion: Some(format!(
                        "Consider \"{}\" or \"Good morning/afternoon\" for a more universally appropriate greeting.",
                        marker.replacement
                    )),
                    related_idiom_id: None,
                });
            }
        }

        if request.origin == TextOrigin::Theirs && length > CONTEXT_MIN_UNITS {
            issues.push(Finding {
                kind: FindingKind::Context,
                excerpt: "(General observation)".to_string(),
                explanation: CONTEXT_EXPLANATION.to_string(),
                suggestion: None,
                related_idiom_id: None,
            });
        }

        if issues.is_empty() {
            issues.push(Finding {
                kind: FindingKind::General,
                excerpt: "(No specific issues detected)".to_string(),
                explanation: GENERAL_EXPLANATION.to_string(),
                suggestion: None,
                related_idiom_id: None,
            });
        }

        let alternatives = (request.origin == TextOrigin::Mine && length > ALTERNATIVES_MIN_UNITS)
            .then(|| rewrite_alternatives(text));

        FindingReport {
            summary: format!("Analysis of text in relation to {} culture.", culture_name),
            issues,
            alternatives,
        }
    }
}

#[async_trait]
impl CulturalAnalyzer for HeuristicAnalyzer {
    async fn analyze(&self, request: &AnalysisRequest, culture_name: &str) -> FindingReport {
        self.report(request, culture_name)
    }
}

fn replace_markers(text: &str, markers: &[Marker]) -> String {
    markers.iter().fold(text.to_string(), |acc, marker| {
        marker.pattern.replace_all(&acc, marker.replacement).into_owned()
    })
}

/// One greeting-adapted rewrite, plus a fully neutral one when it differs.
fn rewrite_alternatives(text: &str) -> Vec<String> {
    let adapted = replace_markers(text, &INFORMAL_MARKERS);
    let formal = replace_markers(&adapted, &IDIOM_MARKERS);

    let mut alternatives = vec![format!(
        "A more culturally adapted version might be: \"{}\"",
        adapted
    )];
    if formal != adapted {
        alternatives.push(format!("For formal contexts: \"{}\"", formal));
    }
    alternatives
}

//=========================================================================================
// Provider Prompt
//=========================================================================================

pub const ANALYSIS_SYSTEM_PROMPT: &str =
    "You are a cultural intelligence expert who helps with cross-cultural communication.";

/// Builds the user prompt for the provider-backed strategy.
pub fn analysis_prompt(request: &AnalysisRequest, culture_name: &str) -> String {
    let origin = match request.origin {
        TextOrigin::Mine => "something I wrote",
        TextOrigin::Theirs => "written by someone from this culture",
    };

    format!(
        r#"You are a cultural intelligence expert who helps people communicate effectively across different cultures.

I need you to analyze the following text in the context of {culture_name} culture.
The text is {origin}.

Text to analyze: "{text}"

Respond with a single JSON object in exactly this format:
{{
  "summary": "Brief summary of your analysis",
  "issues": [
    {{
      "type": "One of: Idiom, Formality, Context, General",
      "text": "The specific text that raised this issue",
      "explanation": "Why this might be an issue in this cultural context",
      "suggestion": "Suggested alternative if appropriate"
    }}
  ],
  "alternatives": [
    "Alternative phrasings that would be more culturally appropriate"
  ]
}}

If no issues are found, say so in the summary and return an empty issues array."#,
        culture_name = culture_name,
        origin = origin,
        text = request.text,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(report: &FindingReport) -> Vec<FindingKind> {
        report.issues.iter().map(|f| f.kind).collect()
    }

    #[test]
    fn idiom_and_greeting_both_reported() {
        let request = AnalysisRequest::new("hey, break a leg!", "us", TextOrigin::Mine);
        let report = HeuristicAnalyzer::new().report(&request, "Japanese");

        assert_eq!(kinds(&report), vec![FindingKind::Idiom, FindingKind::Formality]);
        assert_eq!(report.issues[0].excerpt, "break a leg");
        assert_eq!(report.issues[1].excerpt, "hey");
        assert_eq!(report.summary, "Analysis of text in relation to Japanese culture.");

        let alternatives = report.alternatives.expect("alternatives for own text");
        assert_eq!(
            alternatives,
            vec![
                "A more culturally adapted version might be: \"Hello, break a leg!\"".to_string(),
                "For formal contexts: \"Hello, I wish you success!\"".to_string(),
            ]
        );
    }

    #[test]
    fn neutral_text_yields_single_general_finding() {
        let request = AnalysisRequest::new("The weather is nice today.", "de", TextOrigin::Mine);
        let report = HeuristicAnalyzer::new().report(&request, "German");

        assert_eq!(kinds(&report), vec![FindingKind::General]);
        assert_eq!(report.alternatives.map(|a| a.len()), Some(1));
    }

    #[test]
    fn every_matching_marker_produces_a_finding() {
        let request = AnalysisRequest::new(
            "Hey! What's up? The exam was a piece of cake, so break a leg.",
            "jp",
            TextOrigin::Theirs,
        );
        let report = HeuristicAnalyzer::new().report(&request, "Japanese");

        assert_eq!(
            kinds(&report),
            vec![
                FindingKind::Idiom,
                FindingKind::Idiom,
                FindingKind::Formality,
                FindingKind::Formality,
                FindingKind::Context,
            ]
        );
        assert_eq!(report.issues[0].excerpt, "break a leg");
        assert_eq!(report.issues[1].excerpt, "piece of cake");
        assert_eq!(report.issues[2].excerpt, "Hey");
        assert!(report.alternatives.is_none());
    }

    #[test]
    fn markers_respect_word_boundaries() {
        let request = AnalysisRequest::new("They said the theyhey plan works.", "de", TextOrigin::Mine);
        let report = HeuristicAnalyzer::new().report(&request, "German");
        assert_eq!(kinds(&report), vec![FindingKind::General]);
    }

    #[test]
    fn their_long_text_gets_context_note_only() {
        let request = AnalysisRequest::new(
            "We will consider your proposal carefully.",
            "jp",
            TextOrigin::Theirs,
        );
        let report = HeuristicAnalyzer::new().report(&request, "Japanese");
        assert_eq!(kinds(&report), vec![FindingKind::Context]);
    }

    #[test]
    fn short_texts_get_no_extras() {
        let theirs = AnalysisRequest::new("Short reply.", "jp", TextOrigin::Theirs);
        let report = HeuristicAnalyzer::new().report(&theirs, "Japanese");
        assert_eq!(kinds(&report), vec![FindingKind::General]);

        let mine = AnalysisRequest::new("hey there", "jp", TextOrigin::Mine);
        let report = HeuristicAnalyzer::new().report(&mine, "Japanese");
        assert_eq!(kinds(&report), vec![FindingKind::Formality]);
        assert!(report.alternatives.is_none());
    }

    #[test]
    fn length_thresholds_count_utf16_units() {
        // Six emoji are six chars but twelve UTF-16 units.
        let mine = AnalysisRequest::new("👍👍👍👍👍👍", "jp", TextOrigin::Mine);
        let report = HeuristicAnalyzer::new().report(&mine, "Japanese");
        assert!(report.alternatives.is_some());

        let theirs = AnalysisRequest::new("🙂".repeat(11), "jp", TextOrigin::Theirs);
        let report = HeuristicAnalyzer::new().report(&theirs, "Japanese");
        assert_eq!(kinds(&report), vec![FindingKind::Context]);
    }

    #[test]
    fn prompt_embeds_text_culture_and_origin() {
        let request = AnalysisRequest::new("See you soon", "br", TextOrigin::Theirs);
        let prompt = analysis_prompt(&request, "Brazilian");

        assert!(prompt.contains("\"See you soon\""));
        assert!(prompt.contains("context of Brazilian culture"));
        assert!(prompt.contains("written by someone from this culture"));
        assert!(prompt.contains("\"summary\""));
    }
}
