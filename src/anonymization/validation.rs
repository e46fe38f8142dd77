//! Post-transformation validation
//!
//! Confirms the hard guarantees (removals absent, preserves unchanged) and
//! runs a best-effort keyword scan over the remaining values. Keyword hits
//! are warnings, not errors: the scan is a residual-PHI smell test, not a
//! guarantee.

use crate::domain::{MetadataRecord, Result, ScrubError};
use crate::policy::TagRules;
use regex::Regex;

/// Case-insensitive keywords that suggest residual PHI in a value
const PHI_KEYWORD_PATTERN: &str =
    r"(?i)patient|physician|doctor|hospital|clinic|address|phone|telephone";

/// Validates engine output against the policy's rule sets
pub struct Validator {
    keyword_re: Regex,
}

/// Hard errors and soft warnings found by validation
pub struct ValidationFindings {
    pub phi_removed: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl Validator {
    pub fn new() -> Result<Self> {
        let keyword_re = Regex::new(PHI_KEYWORD_PATTERN)
            .map_err(|e| ScrubError::Configuration(format!("invalid keyword pattern: {e}")))?;
        Ok(Self { keyword_re })
    }

    /// Checks the anonymized record against the original and the rules
    pub fn validate(
        &self,
        original: &MetadataRecord,
        anonymized: &MetadataRecord,
        rules: &TagRules,
    ) -> ValidationFindings {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut phi_removed = true;

        // Every remove-listed tag must be absent; a survivor is a hard error
        for tag in &rules.remove {
            if anonymized.contains(tag) {
                phi_removed = false;
                errors.push(format!("remove-listed tag {tag} survived in the output"));
            }
        }

        // Every preserve-listed tag present in the input must survive unchanged
        for tag in &rules.preserve {
            if let Some(original_value) = original.get(tag) {
                match anonymized.get(tag) {
                    None => errors.push(format!("preserve-listed tag {tag} was lost")),
                    Some(value) if value != original_value => {
                        errors.push(format!("preserve-listed tag {tag} was altered"))
                    }
                    Some(_) => {}
                }
            }
        }

        // Residual-PHI keyword smell test over all remaining values
        for (tag, value) in anonymized.iter() {
            if self.keyword_re.is_match(value) {
                warnings.push(format!(
                    "value of {tag} matches a PHI keyword and may need review"
                ));
            }
        }

        ValidationFindings {
            phi_removed,
            errors,
            warnings,
        }
    }
}
