//! Heuristic grammar linting over transcript text.
//!
//! This is a rule table, not a parser: each rule is a tagged regex run
//! against one sentence at a time, plus two structural checks (run-ons and
//! fragments) that need word counts rather than patterns. False positives
//! and negatives are expected and acceptable; the point is a rough defect
//! signal for the scorer, and new rules should be added to the table
//! without touching the control flow.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarCategory {
    SubjectVerbAgreement,
    TenseMixing,
    ArticleMisuse,
    PrepositionMisuse,
    RunOn,
    Fragment,
}

/// One detected defect: the rule category and the offending sentence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrammarFinding {
    pub category: GrammarCategory,
    pub sentence: String,
}

struct GrammarRule {
    category: GrammarCategory,
    pattern: &'static str,
}

// The versioned rule table. Order is significant only for output ordering.
const RULES: &[GrammarRule] = &[
    GrammarRule {
        category: GrammarCategory::SubjectVerbAgreement,
        pattern: r"(?i)\b(he|she|it)\s+(are|were|have|don't)\b",
    },
    GrammarRule {
        category: GrammarCategory::SubjectVerbAgreement,
        pattern: r"(?i)\b(you|we|they)\s+(is|was|has|doesn't)\b",
    },
    GrammarRule {
        category: GrammarCategory::SubjectVerbAgreement,
        pattern: r"(?i)\bI\s+(is|are|has|does)\b",
    },
    GrammarRule {
        category: GrammarCategory::TenseMixing,
        pattern: r"(?i)\byesterday\b.*\b(will|going to)\b",
    },
    GrammarRule {
        category: GrammarCategory::TenseMixing,
        pattern: r"(?i)\btomorrow\b.*\b(was|were|did)\b",
    },
    GrammarRule {
        category: GrammarCategory::ArticleMisuse,
        pattern: r"(?i)\ba\s+[aeiou]\w+",
    },
    GrammarRule {
        category: GrammarCategory::ArticleMisuse,
        pattern: r"(?i)\ban\s+[^aeiou\s\d]\w+",
    },
    GrammarRule {
        category: GrammarCategory::PrepositionMisuse,
        pattern: r"(?i)\b(discuss about|married with|emphasize on|reached to|entered into the room)\b",
    },
];

static COMPILED_RULES: Lazy<Vec<(GrammarCategory, Regex)>> = Lazy::new(|| {
    RULES
        .iter()
        .map(|rule| {
            let regex = Regex::new(rule.pattern).expect("grammar rule pattern must compile");
            (rule.category, regex)
        })
        .collect()
});

/// Tokens treated as evidence that a sentence contains a verb.
const VERB_LEXICON: &[&str] = &[
    "is", "are", "was", "were", "am", "be", "been", "being", "have", "has", "had", "do", "does",
    "did", "will", "would", "can", "could", "should", "shall", "may", "might", "must", "went",
    "got", "made", "took", "said", "led", "built", "ran", "saw", "knew", "felt", "kept", "began",
    "came", "gave", "found", "thought", "brought", "set", "put", "met", "let", "held", "grew",
];

const CLAUSE_SEPARATORS: &[&str] = &["and", "but", "so", "or", "because", "which", "while"];

/// Word counts beyond which a many-claused sentence is flagged as a run-on.
const RUN_ON_MIN_WORDS: usize = 25;
const RUN_ON_MIN_SEPARATORS: usize = 3;

/// Runs the full rule table over a transcript and returns all findings.
///
/// The transcript is split into sentences on terminal punctuation; every
/// rule sees one sentence at a time so a single long answer produces one
/// finding per (rule, sentence) pair at most.
pub fn check(text: &str) -> Vec<GrammarFinding> {
    let mut findings = Vec::new();
    for raw in text.split(['.', '?', '!']) {
        let sentence = raw.trim();
        if sentence.is_empty() {
            continue;
        }
        for (category, regex) in COMPILED_RULES.iter() {
            if regex.is_match(sentence) {
                findings.push(GrammarFinding {
                    category: *category,
                    sentence: sentence.to_string(),
                });
            }
        }
        if is_run_on(sentence) {
            findings.push(GrammarFinding {
                category: GrammarCategory::RunOn,
                sentence: sentence.to_string(),
            });
        }
        if is_fragment(sentence) {
            findings.push(GrammarFinding {
                category: GrammarCategory::Fragment,
                sentence: sentence.to_string(),
            });
        }
    }
    findings
}

fn is_run_on(sentence: &str) -> bool {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    if words.len() <= RUN_ON_MIN_WORDS {
        return false;
    }
    let commas = sentence.matches(',').count();
    let conjunctions = words
        .iter()
        .filter(|w| {
            let token = normalize_token(w);
            CLAUSE_SEPARATORS.contains(&token.as_str())
        })
        .count();
    commas + conjunctions > RUN_ON_MIN_SEPARATORS
}

fn is_fragment(sentence: &str) -> bool {
    let words: Vec<&str> = sentence.split_whitespace().collect();
    // One- and two-word utterances are interjections, not worth flagging.
    if words.len() < 3 {
        return false;
    }
    let has_verb = words.iter().any(|w| {
        let token = normalize_token(w);
        VERB_LEXICON.contains(&token.as_str())
            || (token.len() > 4 && (token.ends_with("ed") || token.ends_with("ing")))
    });
    let has_subject = words.iter().any(|w| {
        let token = normalize_token(w);
        matches!(
            token.as_str(),
            "i" | "you" | "he" | "she" | "it" | "we" | "they" | "this" | "that" | "there"
        ) || w.chars().next().is_some_and(|c| c.is_uppercase())
    });
    !has_verb || !has_subject
}

fn normalize_token(word: &str) -> String {
    word.trim_matches(|c: char| !c.is_alphanumeric())
        .to_lowercase()
}
