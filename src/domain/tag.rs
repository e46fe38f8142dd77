//! DICOM-style tag identifier with validation
//!
//! A tag is a `(group,element)` coordinate identifying one metadata field,
//! written in the canonical form `(GGGG,EEEE)` with upper-case hex digits.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// Metadata tag newtype wrapper
///
/// Parsed once into its numeric `(group, element)` pair and rendered back
/// in the normalized `(GGGG,EEEE)` form. Input is accepted in any hex case.
///
/// # Examples
///
/// ```
/// use scrub::domain::Tag;
/// use std::str::FromStr;
///
/// let tag = Tag::from_str("(0010,0010)").unwrap();
/// assert_eq!(tag.to_string(), "(0010,0010)");
/// assert_eq!(tag.group(), 0x0010);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Tag {
    group: u16,
    element: u16,
}

impl Tag {
    /// Creates a tag from its numeric group and element
    pub const fn new(group: u16, element: u16) -> Self {
        Self { group, element }
    }

    /// Parses a tag from the `(GGGG,EEEE)` string form
    ///
    /// # Errors
    ///
    /// Returns an error describing the expected format if the input does not
    /// match `^\([0-9A-Fa-f]{4},[0-9A-Fa-f]{4}\)$`.
    pub fn parse(s: &str) -> Result<Self, String> {
        let bytes = s.as_bytes();
        if bytes.len() != 11 || bytes[0] != b'(' || bytes[5] != b',' || bytes[10] != b')' {
            return Err(format!(
                "Invalid tag '{s}'. Expected format: (GGGG,EEEE) with hex group/element"
            ));
        }

        let group = u16::from_str_radix(&s[1..5], 16)
            .map_err(|_| format!("Invalid tag '{s}': group is not 4 hex digits"))?;
        let element = u16::from_str_radix(&s[6..10], 16)
            .map_err(|_| format!("Invalid tag '{s}': element is not 4 hex digits"))?;

        Ok(Self { group, element })
    }

    /// Returns the group number
    pub const fn group(&self) -> u16 {
        self.group
    }

    /// Returns the element number
    pub const fn element(&self) -> u16 {
        self.element
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:04X},{:04X})", self.group, self.element)
    }
}

impl FromStr for Tag {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Tag {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Tag {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Tag::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Well-known tags referenced by the engine's tag classification
pub mod tags {
    use super::Tag;

    pub const PATIENT_NAME: Tag = Tag::new(0x0010, 0x0010);
    pub const PATIENT_ID: Tag = Tag::new(0x0010, 0x0020);
    pub const PATIENT_BIRTH_DATE: Tag = Tag::new(0x0010, 0x0030);

    pub const SOP_INSTANCE_UID: Tag = Tag::new(0x0008, 0x0018);
    pub const STUDY_INSTANCE_UID: Tag = Tag::new(0x0020, 0x000D);
    pub const SERIES_INSTANCE_UID: Tag = Tag::new(0x0020, 0x000E);
    pub const FRAME_OF_REFERENCE_UID: Tag = Tag::new(0x0020, 0x0052);

    pub const STUDY_DATE: Tag = Tag::new(0x0008, 0x0020);
    pub const SERIES_DATE: Tag = Tag::new(0x0008, 0x0021);
    pub const ACQUISITION_DATE: Tag = Tag::new(0x0008, 0x0022);
    pub const CONTENT_DATE: Tag = Tag::new(0x0008, 0x0023);

    pub const STUDY_TIME: Tag = Tag::new(0x0008, 0x0030);
    pub const SERIES_TIME: Tag = Tag::new(0x0008, 0x0031);
    pub const ACQUISITION_TIME: Tag = Tag::new(0x0008, 0x0032);
    pub const CONTENT_TIME: Tag = Tag::new(0x0008, 0x0033);
}
