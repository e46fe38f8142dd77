//! Tag classification for pseudonymization dispatch
//!
//! Each pseudonymized tag belongs to exactly one class, which selects the
//! output format (UID, shifted date, shifted time, or generic marker).
//! Classification is resolved once when a policy is compiled, never
//! re-derived per record.

use crate::domain::{tags, Tag};
use crate::policy::Policy;
use std::collections::BTreeMap;

/// Closed set of tag classes the pseudonymizer dispatches on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagClass {
    /// UID-valued tags; output keeps UID syntax under the configured root
    Identifier,
    /// `YYYYMMDD` date tags, shifted by a deterministic offset
    Date,
    /// `HHMMSS[.ffffff]` time tags, shifted with mod-24h wraparound
    Time,
    /// Everything else gets an `ANON_` marker
    Generic,
}

/// Classifies a tag by its well-known coordinate
pub fn classify(tag: Tag) -> TagClass {
    match tag {
        tags::SOP_INSTANCE_UID
        | tags::STUDY_INSTANCE_UID
        | tags::SERIES_INSTANCE_UID
        | tags::FRAME_OF_REFERENCE_UID => TagClass::Identifier,

        tags::STUDY_DATE
        | tags::SERIES_DATE
        | tags::ACQUISITION_DATE
        | tags::CONTENT_DATE
        | tags::PATIENT_BIRTH_DATE => TagClass::Date,

        tags::STUDY_TIME | tags::SERIES_TIME | tags::ACQUISITION_TIME | tags::CONTENT_TIME => {
            TagClass::Time
        }

        _ => TagClass::Generic,
    }
}

/// A policy with its pseudonymize set pre-classified
///
/// Compiled once per policy (at snapshot-rebuild time), then shared by all
/// concurrent apply calls against that snapshot.
#[derive(Debug, Clone)]
pub struct CompiledPolicy {
    pub policy: Policy,
    classes: BTreeMap<Tag, TagClass>,
}

impl CompiledPolicy {
    /// Compiles the classification table for the policy's pseudonymize set
    pub fn compile(policy: Policy) -> Self {
        let classes = policy
            .tag_rules
            .pseudonymize
            .iter()
            .map(|&tag| (tag, classify(tag)))
            .collect();

        Self { policy, classes }
    }

    /// Returns the pre-resolved class for a pseudonymized tag
    pub fn class_of(&self, tag: &Tag) -> TagClass {
        self.classes.get(tag).copied().unwrap_or(TagClass::Generic)
    }
}
