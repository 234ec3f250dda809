//! Normalized discourse representation consumed by the graph builder.
//!
//! File-ingestion collaborators (column-delimited, interlinear-gloss, and
//! multi-file transcript readers) all reduce their input to a [`DiscourseData`]:
//! a discourse name plus an ordered list of tiers, each with its own ordered
//! spans. Base-tier spans are positional (their index in the tier is their
//! position on the timeline); dependent-tier spans reference half-open ranges
//! of base-tier indices.

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::entities::TierFlags;
use crate::errors::CoreError;

/// Declaration of one tier of a discourse.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct TierDefinition {
    pub name: String,
    #[serde(flatten)]
    pub flags: TierFlags,
    /// Delimiter splitting composite labels into base segments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,
}

impl TierDefinition {
    /// A base tier that anchors the discourse timeline.
    #[must_use]
    pub fn anchor(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: TierFlags::anchor_base(),
            delimiter: None,
        }
    }

    /// A secondary base tier, aligned against the anchor.
    #[must_use]
    pub fn base(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: TierFlags::base(),
            delimiter: None,
        }
    }

    /// A tier whose spans cover base-tier units.
    #[must_use]
    pub fn dependent(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            flags: TierFlags::dependent(),
            delimiter: None,
        }
    }

    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    #[must_use]
    pub const fn with_token(mut self, token: bool) -> Self {
        self.flags.token = token;
        self
    }
}

/// One labeled unit of a tier.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct Span {
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub begin_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<f64>,
    /// Half-open `(begin, end)` ranges of base-tier indices, keyed by base tier name.
    /// Empty for base-tier spans.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub refs: BTreeMap<String, (usize, usize)>,
}

impl Span {
    /// An untimed base-tier unit.
    #[must_use]
    pub fn unit(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            begin_time: None,
            end_time: None,
            refs: BTreeMap::new(),
        }
    }

    /// A timed base-tier unit.
    #[must_use]
    pub fn timed(label: impl Into<String>, begin: f64, end: f64) -> Self {
        Self {
            begin_time: Some(begin),
            end_time: Some(end),
            ..Self::unit(label)
        }
    }

    /// A dependent unit covering `begin..end` of `base`.
    #[must_use]
    pub fn over(label: impl Into<String>, base: impl Into<String>, begin: usize, end: usize) -> Self {
        Self::unit(label).and_over(base, begin, end)
    }

    /// Add a reference into another base tier.
    #[must_use]
    pub fn and_over(mut self, base: impl Into<String>, begin: usize, end: usize) -> Self {
        self.refs.insert(base.into(), (begin, end));
        self
    }
}

/// A tier declaration together with its spans.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct TierData {
    pub definition: TierDefinition,
    #[serde(default)]
    pub spans: Vec<Span>,
}

/// The normalized representation of one discourse.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, PartialEq)]
pub struct DiscourseData {
    pub name: String,
    #[serde(default)]
    pub tiers: Vec<TierData>,
}

impl DiscourseData {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tiers: Vec::new(),
        }
    }

    /// Append a tier with its spans.
    #[must_use]
    pub fn with_tier(mut self, definition: TierDefinition, spans: Vec<Span>) -> Self {
        self.tiers.push(TierData { definition, spans });
        self
    }

    #[must_use]
    pub fn tier(&self, name: &str) -> Option<&TierData> {
        self.tiers.iter().find(|t| t.definition.name == name)
    }

    /// Tiers flagged `base`, in declaration order.
    pub fn base_tiers(&self) -> impl Iterator<Item = &TierData> {
        self.tiers.iter().filter(|t| t.definition.flags.base)
    }

    /// Number of spans currently in a tier (0 if undeclared).
    #[must_use]
    pub fn level_length(&self, name: &str) -> usize {
        self.tier(name).map_or(0, |t| t.spans.len())
    }

    /// Append a composite unit: its segments become consecutive base spans and
    /// the unit itself a dependent span covering them.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if either tier is undeclared or
    /// `base_tier` is not a base tier.
    pub fn push_composite(
        &mut self,
        tier: &str,
        label: &str,
        base_tier: &str,
        segments: &[String],
    ) -> Result<(), CoreError> {
        if self.tier(tier).is_none() {
            return Err(CoreError::Validation(format!("tier '{tier}' is not declared")));
        }
        let base = self
            .tiers
            .iter_mut()
            .find(|t| t.definition.name == base_tier)
            .ok_or_else(|| CoreError::Validation(format!("tier '{base_tier}' is not declared")))?;
        if !base.definition.flags.base {
            return Err(CoreError::Validation(format!(
                "tier '{base_tier}' is not a base tier"
            )));
        }

        let begin = base.spans.len();
        base.spans.extend(segments.iter().map(Span::unit));
        let end = base.spans.len();

        if let Some(t) = self.tiers.iter_mut().find(|t| t.definition.name == tier) {
            t.spans.push(Span::over(label, base_tier, begin, end));
        }
        Ok(())
    }

    /// Parse a discourse from its JSON form.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Validation` if the JSON does not match the schema.
    pub fn from_json(json: &str) -> Result<Self, CoreError> {
        serde_json::from_str(json).map_err(|e| CoreError::Validation(e.to_string()))
    }

    /// JSON Schema describing the normalized representation.
    #[must_use]
    pub fn json_schema() -> schemars::Schema {
        schemars::schema_for!(Self)
    }
}

/// Split a composite label into segments.
///
/// With a delimiter, splits on it and drops empty pieces (`"k.a.t"` → `k a t`).
/// Without one, every non-whitespace character is a segment.
#[must_use]
pub fn parse_transcription(text: &str, delimiter: Option<&str>) -> Vec<String> {
    match delimiter {
        Some(delim) if !delim.is_empty() => text
            .split(delim)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect(),
        _ => text
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(String::from)
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("k.a.t", Some("."), &["k", "a", "t"])]
    #[case("k..a.", Some("."), &["k", "a"])]
    #[case("ch;a", Some(";"), &["ch", "a"])]
    #[case("kat", None, &["k", "a", "t"])]
    #[case("k a", Some(""), &["k", "a"])]
    fn parse_transcription_cases(
        #[case] text: &str,
        #[case] delimiter: Option<&str>,
        #[case] expected: &[&str],
    ) {
        assert_eq!(parse_transcription(text, delimiter), expected);
    }

    #[test]
    fn push_composite_appends_base_and_dependent_spans() {
        let mut data = DiscourseData::new("d1")
            .with_tier(TierDefinition::dependent("word"), Vec::new())
            .with_tier(TierDefinition::anchor("phone"), Vec::new());

        data.push_composite("word", "cat", "phone", &parse_transcription("k.a.t", Some(".")))
            .unwrap();
        data.push_composite("word", "at", "phone", &parse_transcription("a.t", Some(".")))
            .unwrap();

        assert_eq!(data.level_length("phone"), 5);
        let words = &data.tier("word").unwrap().spans;
        assert_eq!(words[0].refs["phone"], (0, 3));
        assert_eq!(words[1].refs["phone"], (3, 5));
    }

    #[test]
    fn push_composite_rejects_non_base_tier() {
        let mut data = DiscourseData::new("d1")
            .with_tier(TierDefinition::dependent("word"), Vec::new())
            .with_tier(TierDefinition::dependent("syllable"), Vec::new());

        let err = data
            .push_composite("word", "cat", "syllable", &["ka".into()])
            .unwrap_err();
        assert!(matches!(err, CoreError::Validation(_)));
    }

    #[test]
    fn schema_names_the_tiers_property() {
        let schema = serde_json::to_value(DiscourseData::json_schema()).unwrap();
        assert!(schema["properties"]["tiers"].is_object());
    }
}
