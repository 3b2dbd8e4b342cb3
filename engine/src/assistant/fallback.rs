//! Offline clinical-protocol answers
//!
//! When the remote backend cannot be used, the assistant still answers from an
//! ordered list of keyword rules. The first rule whose keyword occurs in the
//! normalized utterance wins; rule order is part of the contract.
//!
//! Every answer ends with [`CLINICAL_DISCLAIMER`], including the default one.

/// Sentence every assistant answer must end with
pub const CLINICAL_DISCLAIMER: &str =
    "*Clinical Disclaimer: Responses are for assistance and not final diagnoses.*";

/// Which rule produced an answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleCategory {
    /// Chest X-ray reading protocol
    ChestImaging,

    /// Local patient-status lookup
    PatientStatus,

    /// Symptom-check protocol
    SymptomCheck,

    /// Nothing matched
    Default,
}

struct FallbackRule {
    category: RuleCategory,
    keywords: &'static [&'static str],
    response: &'static str,
}

/// Evaluated top to bottom; do not reorder.
const RULES: &[FallbackRule] = &[
    FallbackRule {
        category: RuleCategory::ChestImaging,
        keywords: &["chest x-ray", "xray"],
        response: "Based on clinical protocols, a Chest X-Ray summary typically includes: \n\
                   1. Lung Expansion & Aeration \n\
                   2. Presence of opacities or infiltrates \n\
                   3. Cardiac contour and size \n\
                   4. Costophrenic angles. \n\
                   This is a protocol summary. Always refer to the original radiologist's findings.",
    },
    FallbackRule {
        category: RuleCategory::PatientStatus,
        keywords: &["patient", "status"],
        response: "Accessing local patient database... \n\
                   Protocols for patient P-8429 (Last Scan: Feb 18) indicate stable progression. \
                   No critical anomalies flagged in the current queue.",
    },
    FallbackRule {
        category: RuleCategory::SymptomCheck,
        keywords: &["symptom", "check"],
        response: "Current Clinical Protocol for Symptom Checking: \n\
                   1. Evaluate vitals first. \n\
                   2. Check for comorbid conditions. \n\
                   3. Correlate with recent imaging results. \n\
                   Would you like me to pull the specific ICD-11 protocol for a specific symptom?",
    },
];

const DEFAULT_RESPONSE: &str = "I am currently operating in Clinical Fallback mode due to a connection issue \
     with the main AI engine. I can still assist with clinical protocols and platform data. How can I help?";

/// Rule-based responder used when the remote backend is unavailable
///
/// Stateless; `respond` is pure and total.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackRuleEngine;

impl FallbackRuleEngine {
    pub fn new() -> Self {
        Self
    }

    /// Which rule an utterance falls under
    pub fn classify(&self, utterance: &str) -> RuleCategory {
        self.matching_rule(utterance)
            .map(|rule| rule.category)
            .unwrap_or(RuleCategory::Default)
    }

    /// Answer an utterance from the protocol rules
    pub fn respond(&self, utterance: &str) -> String {
        let body = self
            .matching_rule(utterance)
            .map(|rule| rule.response)
            .unwrap_or(DEFAULT_RESPONSE);

        with_disclaimer(body)
    }

    fn matching_rule(&self, utterance: &str) -> Option<&'static FallbackRule> {
        let normalized = utterance.trim().to_lowercase();
        RULES.iter().find(|rule| {
            rule.keywords
                .iter()
                .any(|keyword| normalized.contains(keyword))
        })
    }
}

/// Append the disclaimer as its own paragraph.
pub fn with_disclaimer(body: &str) -> String {
    let body = body.trim_end();
    if body.is_empty() {
        CLINICAL_DISCLAIMER.to_string()
    } else {
        format!("{}\n\n{}", body, CLINICAL_DISCLAIMER)
    }
}

/// Remote replies keep their own wording; the fixed sentence is added only if missing.
pub fn ensure_disclaimer(text: &str) -> String {
    if text.contains(CLINICAL_DISCLAIMER) {
        text.to_string()
    } else {
        with_disclaimer(text)
    }
}
