//! Incrementally built query specifications.

use serde::{Deserialize, Serialize};

use crate::attribute::{AnnotationRef, AttributeKind, Filter, TierProperty};

/// A reducer over matched rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Aggregate {
    Count,
    Sum(AttributeKind),
    Average(AttributeKind),
    Min(AttributeKind),
    Max(AttributeKind),
    Stdev(AttributeKind),
}

impl Aggregate {
    /// Output column alias.
    #[must_use]
    pub fn output_alias(&self) -> String {
        match self {
            Self::Count => "count_all".into(),
            Self::Sum(a) => format!("sum_{}", a.output_alias()),
            Self::Average(a) => format!("average_{}", a.output_alias()),
            Self::Min(a) => format!("min_{}", a.output_alias()),
            Self::Max(a) => format!("max_{}", a.output_alias()),
            Self::Stdev(a) => format!("stdev_{}", a.output_alias()),
        }
    }

    /// Function name and argument.
    #[must_use]
    pub const fn parts(&self) -> (&'static str, Option<&AttributeKind>) {
        match self {
            Self::Count => ("count", None),
            Self::Sum(a) => ("sum", Some(a)),
            Self::Average(a) => ("avg", Some(a)),
            Self::Min(a) => ("min", Some(a)),
            Self::Max(a) => ("max", Some(a)),
            Self::Stdev(a) => ("stdev", Some(a)),
        }
    }
}

/// Everything a caller asked of one query, not yet checked for consistency.
///
/// Built with chained calls and handed to [`crate::compile`] or
/// [`crate::evaluate`]; consistency errors surface there.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuerySpecification {
    pub corpus: String,
    pub tier: String,
    pub filters: Vec<Filter>,
    pub contains: Vec<Filter>,
    pub contained_by: Vec<Filter>,
    pub left_aligned: Vec<String>,
    pub right_aligned: Vec<String>,
    pub columns: Vec<AttributeKind>,
    pub order_by: Vec<(AttributeKind, bool)>,
    pub group_by: Vec<AttributeKind>,
    pub aggregates: Vec<Aggregate>,
}

impl QuerySpecification {
    #[must_use]
    pub fn new(corpus: impl Into<String>, tier: impl Into<String>) -> Self {
        Self {
            corpus: corpus.into(),
            tier: tier.into(),
            filters: Vec::new(),
            contains: Vec::new(),
            contained_by: Vec::new(),
            left_aligned: Vec::new(),
            right_aligned: Vec::new(),
            columns: Vec::new(),
            order_by: Vec::new(),
            group_by: Vec::new(),
            aggregates: Vec::new(),
        }
    }

    /// The matched annotation.
    #[must_use]
    pub fn matched(&self) -> AnnotationRef {
        AnnotationRef::matched(self.tier.clone())
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: impl IntoIterator<Item = Filter>) -> Self {
        self.filters.extend(filters);
        self
    }

    /// Require a contained annotation of another tier to satisfy `filter`.
    #[must_use]
    pub fn filter_contains(mut self, filter: Filter) -> Self {
        self.contains.push(filter);
        self
    }

    /// Require an enclosing annotation of another tier to satisfy `filter`.
    #[must_use]
    pub fn filter_contained_by(mut self, filter: Filter) -> Self {
        self.contained_by.push(filter);
        self
    }

    /// Require an edge of `tier` to begin where the match begins.
    #[must_use]
    pub fn filter_left_aligned(mut self, tier: impl Into<String>) -> Self {
        self.left_aligned.push(tier.into());
        self
    }

    /// Require an edge of `tier` to end where the match ends.
    #[must_use]
    pub fn filter_right_aligned(mut self, tier: impl Into<String>) -> Self {
        self.right_aligned.push(tier.into());
        self
    }

    #[must_use]
    pub fn columns(mut self, columns: impl IntoIterator<Item = AttributeKind>) -> Self {
        self.columns.extend(columns);
        self
    }

    /// Add begin and end time of the match as columns.
    #[must_use]
    pub fn times(self) -> Self {
        let matched = self.matched();
        self.columns([
            tier_attribute(matched.clone(), TierProperty::Begin),
            tier_attribute(matched, TierProperty::End),
        ])
    }

    /// Add the duration of the match as a column.
    #[must_use]
    pub fn duration(self) -> Self {
        let matched = self.matched();
        self.columns([tier_attribute(matched, TierProperty::Duration)])
    }

    #[must_use]
    pub fn order_by(mut self, attribute: AttributeKind, descending: bool) -> Self {
        self.order_by.push((attribute, descending));
        self
    }

    #[must_use]
    pub fn group_by(mut self, attribute: AttributeKind) -> Self {
        self.group_by.push(attribute);
        self
    }

    /// Replace the aggregate projection.
    #[must_use]
    pub fn aggregate(mut self, aggregates: impl IntoIterator<Item = Aggregate>) -> Self {
        self.aggregates = aggregates.into_iter().collect();
        self
    }

    /// Shorthand for `aggregate([Aggregate::Count])`.
    #[must_use]
    pub fn count(self) -> Self {
        self.aggregate([Aggregate::Count])
    }

    /// Annotations referenced anywhere in the specification, in order of appearance.
    pub fn referenced(&self) -> impl Iterator<Item = &AnnotationRef> {
        let filters = self
            .filters
            .iter()
            .chain(&self.contained_by)
            .flat_map(Filter::annotations);
        let projected = self
            .columns
            .iter()
            .chain(self.order_by.iter().map(|(a, _)| a))
            .chain(&self.group_by)
            .chain(self.aggregates.iter().filter_map(|a| a.parts().1))
            .filter_map(AttributeKind::annotation);
        filters.chain(projected)
    }
}

const fn tier_attribute(annotation: AnnotationRef, property: TierProperty) -> AttributeKind {
    AttributeKind::Tier {
        annotation,
        property,
    }
}
