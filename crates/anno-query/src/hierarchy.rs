//! Declared tier, speaker and discourse vocabulary of a corpus.
//!
//! Every attribute a query uses is resolved here into a closed
//! [`AttributeKind`]. Names that the hierarchy does not declare are an
//! explicit [`SpecificationError::UnknownProperty`].

use std::collections::{BTreeMap, BTreeSet};

use anno_graph::AnnotationGraph;

use crate::attribute::{AnnotationRef, AttributeKind, Position, TierProperty};
use crate::error::SpecificationError;
use crate::spec::QuerySpecification;

const BUILTIN_TIER_PROPERTIES: [&str; 4] = ["label", "begin", "end", "duration"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct TierSchema {
    properties: BTreeSet<String>,
}

/// Lookup table of everything a query may refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hierarchy {
    corpus: String,
    tiers: BTreeMap<String, TierSchema>,
    speaker_properties: BTreeSet<String>,
    discourse_properties: BTreeSet<String>,
}

impl Hierarchy {
    /// An empty hierarchy for `corpus`. Discourses always have a `name`.
    #[must_use]
    pub fn new(corpus: impl Into<String>) -> Self {
        Self {
            corpus: corpus.into(),
            tiers: BTreeMap::new(),
            speaker_properties: BTreeSet::new(),
            discourse_properties: BTreeSet::from(["name".to_string()]),
        }
    }

    /// Declare every tier registered in `graph`.
    #[must_use]
    pub fn from_graph(corpus: impl Into<String>, graph: &AnnotationGraph) -> Self {
        graph
            .tiers()
            .fold(Self::new(corpus), |h, t| h.with_tier(&t.label, []))
    }

    /// Declare a tier with its extra named properties.
    #[must_use]
    pub fn with_tier<'a>(
        mut self,
        name: &str,
        properties: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let schema = self.tiers.entry(name.into()).or_default();
        schema
            .properties
            .extend(properties.into_iter().map(String::from));
        self
    }

    #[must_use]
    pub fn with_speaker_property(mut self, key: &str) -> Self {
        self.speaker_properties.insert(key.into());
        self
    }

    #[must_use]
    pub fn with_discourse_property(mut self, key: &str) -> Self {
        self.discourse_properties.insert(key.into());
        self
    }

    #[must_use]
    pub fn corpus(&self) -> &str {
        &self.corpus
    }

    #[must_use]
    pub fn has_tier(&self, name: &str) -> bool {
        self.tiers.contains_key(name)
    }

    /// # Errors
    ///
    /// Returns `SpecificationError::UnknownTier` if the tier is not declared.
    pub fn tier(&self, name: &str) -> Result<TierRef<'_>, SpecificationError> {
        let Some((tier, _)) = self.tiers.get_key_value(name) else {
            return Err(SpecificationError::UnknownTier {
                tier: name.into(),
                available: self.tiers.keys().cloned().collect(),
            });
        };
        Ok(TierRef {
            hierarchy: self,
            tier,
            position: Position::Matched,
        })
    }

    /// Start a query for annotations of `tier`.
    ///
    /// # Errors
    ///
    /// Returns `SpecificationError::UnknownTier` if the tier is not declared.
    pub fn find(&self, tier: &str) -> Result<QuerySpecification, SpecificationError> {
        self.tier(tier)?;
        Ok(QuerySpecification::new(&self.corpus, tier))
    }

    /// # Errors
    ///
    /// Returns `SpecificationError::UnknownProperty` for an undeclared key.
    pub fn speaker(&self, key: &str) -> Result<AttributeKind, SpecificationError> {
        if key.starts_with("channel") {
            return Ok(AttributeKind::Channel);
        }
        if self.speaker_properties.contains(key) {
            return Ok(AttributeKind::Speaker {
                property: key.into(),
            });
        }
        Err(SpecificationError::UnknownProperty {
            kind: "Speakers".into(),
            key: key.into(),
            available: self.speaker_properties.iter().cloned().collect(),
        })
    }

    /// # Errors
    ///
    /// Returns `SpecificationError::UnknownProperty` for an undeclared key.
    pub fn discourse(&self, key: &str) -> Result<AttributeKind, SpecificationError> {
        if key.starts_with("channel") {
            return Ok(AttributeKind::Channel);
        }
        if self.discourse_properties.contains(key) {
            return Ok(AttributeKind::Discourse {
                property: key.into(),
            });
        }
        Err(SpecificationError::UnknownProperty {
            kind: "Discourses".into(),
            key: key.into(),
            available: self.discourse_properties.iter().cloned().collect(),
        })
    }

    fn tier_property(
        &self,
        annotation: &AnnotationRef,
        key: &str,
    ) -> Result<TierProperty, SpecificationError> {
        let schema = self.tiers.get(&annotation.tier);
        match key {
            "label" => Ok(TierProperty::Label),
            "begin" => Ok(TierProperty::Begin),
            "end" => Ok(TierProperty::End),
            "duration" => Ok(TierProperty::Duration),
            _ if schema.is_some_and(|s| s.properties.contains(key)) => {
                Ok(TierProperty::Named(key.into()))
            }
            _ => Err(SpecificationError::UnknownProperty {
                kind: format!("Tier '{}' annotations", annotation.tier),
                key: key.into(),
                available: BUILTIN_TIER_PROPERTIES
                    .iter()
                    .map(|s| (*s).to_string())
                    .chain(schema.into_iter().flat_map(|s| s.properties.iter().cloned()))
                    .collect(),
            }),
        }
    }
}

/// A tier annotation at a fixed position, ready to yield attributes.
#[derive(Debug, Clone, Copy)]
pub struct TierRef<'h> {
    hierarchy: &'h Hierarchy,
    tier: &'h str,
    position: Position,
}

impl<'h> TierRef<'h> {
    /// The same tier `offset` units away from the matched annotation.
    #[must_use]
    pub const fn at(self, offset: i32) -> Self {
        Self {
            position: Position::Relative(offset),
            ..self
        }
    }

    /// The annotation one unit earlier.
    #[must_use]
    pub const fn previous(self) -> Self {
        self.at(-1)
    }

    /// The annotation one unit later.
    #[must_use]
    pub const fn following(self) -> Self {
        self.at(1)
    }

    #[must_use]
    pub fn annotation(self) -> AnnotationRef {
        AnnotationRef {
            tier: self.tier.into(),
            position: self.position,
        }
    }

    fn attribute(self, property: TierProperty) -> AttributeKind {
        AttributeKind::Tier {
            annotation: self.annotation(),
            property,
        }
    }

    #[must_use]
    pub fn label(self) -> AttributeKind {
        self.attribute(TierProperty::Label)
    }

    #[must_use]
    pub fn begin(self) -> AttributeKind {
        self.attribute(TierProperty::Begin)
    }

    #[must_use]
    pub fn end(self) -> AttributeKind {
        self.attribute(TierProperty::End)
    }

    #[must_use]
    pub fn duration(self) -> AttributeKind {
        self.attribute(TierProperty::Duration)
    }

    /// Closure path of this annotation over `lower`.
    ///
    /// # Errors
    ///
    /// Returns `SpecificationError::UnknownTier` if `lower` is not declared.
    pub fn subarc(self, lower: &str) -> Result<AttributeKind, SpecificationError> {
        self.hierarchy.tier(lower)?;
        Ok(self.attribute(TierProperty::Subarc(lower.into())))
    }

    /// Resolve any property by name.
    ///
    /// # Errors
    ///
    /// Returns `SpecificationError::UnknownProperty` for an undeclared key.
    pub fn property(self, key: &str) -> Result<AttributeKind, SpecificationError> {
        let property = self.hierarchy.tier_property(&self.annotation(), key)?;
        Ok(self.attribute(property))
    }
}
