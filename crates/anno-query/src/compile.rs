//! Query specification to pattern-query compilation.
//!
//! The matched edge of the queried tier is the centre of one contiguous
//! chain. Every offset referenced on that tier gets its own aliased step;
//! offsets between the furthest references and the match that nobody refers
//! to are bridged with anonymous steps of the same tier. Annotations of other
//! tiers are tied in as enclosing (contained-by) annotations.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use crate::ast::{
    Expr, NodePattern, OrderItem, PathPattern, Projection, Query, RelPattern, ReturnItem,
};
use crate::attribute::{
    AnnotationRef, AttributeKind, Filter, Operator, Position, TierProperty, Value,
};
use crate::error::SpecificationError;
use crate::render::render;
use crate::spec::{Aggregate, QuerySpecification};

/// Query text plus the names of the columns it returns, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledQuery {
    pub text: String,
    pub columns: Vec<String>,
}

/// Compile `spec` to query text.
///
/// # Errors
///
/// Returns a `SpecificationError` if the specification is inconsistent; no
/// text is produced in that case.
pub fn compile(spec: &QuerySpecification) -> Result<CompiledQuery, SpecificationError> {
    let query = plan(spec)?;
    let columns: Vec<String> = query
        .projection
        .items
        .iter()
        .map(|item| match (&item.alias, &item.expr) {
            (Some(alias), _) => alias.clone(),
            (None, Expr::Variable(name)) => name.clone(),
            (None, _) => String::new(),
        })
        .collect();
    let text = render(&query);
    debug!(tier = %spec.tier, columns = ?columns, "query compiled");
    Ok(CompiledQuery { text, columns })
}

/// Build the query tree for `spec` without rendering it.
///
/// # Errors
///
/// As [`compile`].
pub fn plan(spec: &QuerySpecification) -> Result<Query, SpecificationError> {
    Compiler::new(spec).build()
}

struct Compiler<'s> {
    spec: &'s QuerySpecification,
    matched: AnnotationRef,
}

impl<'s> Compiler<'s> {
    fn new(spec: &'s QuerySpecification) -> Self {
        Self {
            spec,
            matched: spec.matched(),
        }
    }

    fn build(&self) -> Result<Query, SpecificationError> {
        self.check_positions()?;

        let mut matches = vec![self.chain()];
        let mut conditions = vec![Expr::compare(
            Expr::property(self.matched.begin_alias(), "corpus"),
            Operator::Eq,
            Expr::Literal(self.spec.corpus.as_str().into()),
        )];

        for filter in self.spec.filters.iter().chain(&self.spec.contained_by) {
            conditions.push(self.condition(filter)?);
        }

        let mut contains: BTreeSet<&str> = BTreeSet::new();
        for filter in &self.spec.contains {
            let (tier, expr) = self.contains_condition(filter)?;
            contains.insert(tier);
            conditions.push(expr);
        }

        for tier in &self.spec.left_aligned {
            matches.push(
                PathPattern::starting_at(NodePattern::anonymous()).step(
                    RelPattern::new(None, tier.as_str()).incoming(),
                    NodePattern::named(self.matched.begin_alias()),
                ),
            );
        }
        for tier in &self.spec.right_aligned {
            matches.push(
                PathPattern::starting_at(NodePattern::anonymous()).step(
                    RelPattern::new(None, tier.as_str()),
                    NodePattern::named(self.matched.end_alias()),
                ),
            );
        }

        for outer in self.contained_by_tiers()? {
            matches.push(self.enclosing(&outer));
        }
        for tier in contains {
            let inner = AnnotationRef::matched(tier);
            matches.push(
                PathPattern::starting_at(NodePattern::named(self.matched.begin_alias())).step(
                    RelPattern::new(Some(inner.contents_alias()), tier).repeated(),
                    NodePattern::named(self.matched.end_alias()),
                ),
            );
        }

        for (alias, (annotation, lower)) in self.subarcs() {
            matches.push(PathPattern::starting_at(
                NodePattern::named(alias.clone())
                    .with_label("Subarc")
                    .with_property("higher", annotation.tier.as_str())
                    .with_property("lower", lower.as_str()),
            ));
            conditions.push(Expr::compare(
                Expr::property(alias, "annotation_id"),
                Operator::Eq,
                Expr::property(annotation.rel_alias(), "annotation_id"),
            ));
        }

        let (discourse, speaker) = self.metadata_usage();
        if discourse || speaker {
            matches.push(
                PathPattern::starting_at(NodePattern::named(self.matched.begin_alias())).step(
                    RelPattern::new(None, "in_discourse"),
                    NodePattern::named("discourse").with_label("Discourse"),
                ),
            );
        }
        if speaker {
            matches.push(
                PathPattern::starting_at(NodePattern::named("speaker").with_label("Speaker"))
                    .step(
                        RelPattern::new(Some("speaks".into()), "speaks_in"),
                        NodePattern::named("discourse"),
                    ),
            );
        }

        let (projection, order_by) = self.projection()?;
        Ok(Query {
            matches,
            conditions,
            projection,
            order_by,
        })
    }

    /// Reject offsets that are redundant or placed on other tiers.
    fn check_positions(&self) -> Result<(), SpecificationError> {
        let contained = self
            .spec
            .contains
            .iter()
            .filter_map(|f| f.attribute.annotation());
        for annotation in self.spec.referenced().chain(contained) {
            match annotation.position {
                Position::Relative(0) => {
                    return Err(SpecificationError::RedundantZeroOffset {
                        tier: annotation.tier.clone(),
                    });
                }
                Position::Relative(offset) if annotation.tier != self.matched.tier => {
                    return Err(SpecificationError::UnsupportedOffset {
                        tier: annotation.tier.clone(),
                        offset,
                    });
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Offsets referenced on the queried tier, excluding the match itself.
    fn offsets(&self) -> BTreeSet<i32> {
        self.spec
            .referenced()
            .filter(|a| a.tier == self.matched.tier)
            .map(|a| a.position.offset())
            .filter(|&k| k != 0)
            .collect()
    }

    fn at(&self, offset: i32) -> AnnotationRef {
        AnnotationRef {
            tier: self.matched.tier.clone(),
            position: if offset == 0 {
                Position::Matched
            } else {
                Position::Relative(offset)
            },
        }
    }

    /// Alias of the node between offsets `boundary - 1` and `boundary`.
    ///
    /// Boundaries at or before the match are named after the annotation they
    /// begin, later ones after the annotation they end.
    fn boundary(&self, boundary: i32) -> String {
        if boundary <= 0 {
            self.at(boundary).begin_alias()
        } else {
            self.at(boundary - 1).end_alias()
        }
    }

    /// The contiguous chain from the furthest preceding to the furthest
    /// following reference through the matched edge.
    fn chain(&self) -> PathPattern {
        let offsets = self.offsets();
        let tier = self.matched.tier.as_str();
        let first = offsets.first().copied().unwrap_or(0).min(0);
        let last = offsets.last().copied().unwrap_or(0).max(0);

        let step = |k: i32| {
            if k == 0 || offsets.contains(&k) {
                RelPattern::new(Some(self.at(k).rel_alias()), tier)
            } else {
                RelPattern::bridge(tier)
            }
        };

        let mut path = PathPattern::starting_at(NodePattern::named(self.boundary(first)));
        for k in first..=last {
            path = path.step(step(k), NodePattern::named(self.boundary(k + 1)));
        }
        path
    }

    /// `(b)<-[:T*0..]-(b_o)-[r_o:O]->(e_o)<-[:T*0..]-(e)`
    fn enclosing(&self, outer: &AnnotationRef) -> PathPattern {
        let tier = self.matched.tier.as_str();
        PathPattern::starting_at(NodePattern::named(self.matched.begin_alias()))
            .step(
                RelPattern::new(None, tier).incoming().repeated(),
                NodePattern::named(outer.begin_alias()),
            )
            .step(
                RelPattern::new(Some(outer.rel_alias()), outer.tier.as_str()),
                NodePattern::named(outer.end_alias()),
            )
            .step(
                RelPattern::new(None, tier).incoming().repeated(),
                NodePattern::named(self.matched.end_alias()),
            )
    }

    /// Other-tier annotations, which must enclose the match.
    fn contained_by_tiers(&self) -> Result<BTreeSet<AnnotationRef>, SpecificationError> {
        let mut outer = BTreeSet::new();
        for filter in &self.spec.contained_by {
            if let Some(a) = filter.attribute.annotation() {
                if a.tier == self.matched.tier {
                    return Err(SpecificationError::SelfContainment {
                        tier: a.tier.clone(),
                    });
                }
            }
        }
        for annotation in self.spec.referenced() {
            if annotation.tier != self.matched.tier {
                outer.insert(annotation.clone());
            }
        }
        Ok(outer)
    }

    /// Subarc joins keyed by their Subarc node alias.
    fn subarcs(&self) -> BTreeMap<String, (AnnotationRef, String)> {
        let mut joins = BTreeMap::new();
        for attribute in self.all_attributes() {
            if let AttributeKind::Tier {
                annotation,
                property: TierProperty::Subarc(lower),
            } = attribute
            {
                joins.insert(
                    subarc_alias(annotation, lower),
                    (annotation.clone(), lower.clone()),
                );
            }
        }
        joins
    }

    /// Whether discourse and speaker metadata are referenced.
    fn metadata_usage(&self) -> (bool, bool) {
        let mut discourse = false;
        let mut speaker = false;
        for attribute in self.all_attributes() {
            match attribute {
                AttributeKind::Discourse { .. } => discourse = true,
                AttributeKind::Speaker { .. } | AttributeKind::Channel => speaker = true,
                AttributeKind::Tier { .. } => {}
            }
        }
        (discourse, speaker)
    }

    fn all_attributes(&self) -> impl Iterator<Item = &AttributeKind> {
        let spec = self.spec;
        let filters = spec
            .filters
            .iter()
            .chain(&spec.contained_by)
            .flat_map(|f| {
                let rhs = match &f.value {
                    Value::Attribute(a) => Some(a),
                    _ => None,
                };
                std::iter::once(&f.attribute).chain(rhs)
            });
        filters
            .chain(&spec.columns)
            .chain(spec.order_by.iter().map(|(a, _)| a))
            .chain(&spec.group_by)
            .chain(spec.aggregates.iter().filter_map(|a| a.parts().1))
    }

    fn attribute_expr(&self, attribute: &AttributeKind) -> Expr {
        match attribute {
            AttributeKind::Tier {
                annotation,
                property,
            } => {
                let (begin, end) = if annotation.tier == self.matched.tier {
                    let k = annotation.position.offset();
                    (self.boundary(k), self.boundary(k + 1))
                } else {
                    (annotation.begin_alias(), annotation.end_alias())
                };
                match property {
                    TierProperty::Label => Expr::property(annotation.rel_alias(), "label"),
                    TierProperty::Named(key) => Expr::property(annotation.rel_alias(), key.as_str()),
                    TierProperty::Begin => Expr::property(begin, "time"),
                    TierProperty::End => Expr::property(end, "time"),
                    TierProperty::Duration => Expr::Subtract(
                        Box::new(Expr::property(end, "time")),
                        Box::new(Expr::property(begin, "time")),
                    ),
                    TierProperty::Subarc(lower) => {
                        Expr::property(subarc_alias(annotation, lower), "subarc")
                    }
                }
            }
            AttributeKind::Speaker { property } => Expr::property("speaker", property.as_str()),
            AttributeKind::Discourse { property } => {
                Expr::property("discourse", property.as_str())
            }
            AttributeKind::Channel => Expr::property("speaks", "channel"),
        }
    }

    fn value_expr(&self, filter: &Filter) -> Result<Expr, SpecificationError> {
        match &filter.value {
            Value::Literal(literal) => Ok(Expr::Literal(literal.clone())),
            Value::List(values) if values.is_empty() => Err(SpecificationError::EmptyInList {
                column: filter.attribute.output_alias(),
            }),
            Value::List(values) => Ok(Expr::List(values.clone())),
            Value::Attribute(other) => Ok(self.attribute_expr(other)),
        }
    }

    fn condition(&self, filter: &Filter) -> Result<Expr, SpecificationError> {
        Ok(Expr::compare(
            self.attribute_expr(&filter.attribute),
            filter.operator,
            self.value_expr(filter)?,
        ))
    }

    /// `any(x IN c_inner WHERE x.key op value)` for a contained tier.
    fn contains_condition<'f>(
        &self,
        filter: &'f Filter,
    ) -> Result<(&'f str, Expr), SpecificationError> {
        let AttributeKind::Tier {
            annotation,
            property,
        } = &filter.attribute
        else {
            return Err(SpecificationError::UnsupportedInContains {
                property: filter.attribute.output_alias(),
            });
        };
        if annotation.tier == self.matched.tier {
            return Err(SpecificationError::SelfContainment {
                tier: annotation.tier.clone(),
            });
        }
        let key = match property {
            TierProperty::Label => "label",
            TierProperty::Named(key) => key.as_str(),
            _ => {
                return Err(SpecificationError::UnsupportedInContains {
                    property: filter.attribute.output_alias(),
                });
            }
        };
        let predicate = Expr::compare(
            Expr::property("x", key),
            filter.operator,
            self.value_expr(filter)?,
        );
        Ok((
            annotation.tier.as_str(),
            Expr::Any {
                var: "x".into(),
                list: annotation.contents_alias(),
                predicate: Box::new(predicate),
            },
        ))
    }

    fn projection(&self) -> Result<(Projection, Vec<OrderItem>), SpecificationError> {
        let spec = self.spec;
        let mut columns: Vec<&AttributeKind> = Vec::new();
        for attribute in spec.columns.iter().chain(spec.order_by.iter().map(|(a, _)| a)) {
            if !columns.contains(&attribute) {
                columns.push(attribute);
            }
        }

        let aliased = |attribute: &AttributeKind| ReturnItem {
            expr: self.attribute_expr(attribute),
            alias: Some(attribute.output_alias()),
        };

        let projection = if spec.aggregates.is_empty() {
            let mut items = vec![ReturnItem {
                expr: Expr::Variable(self.matched.rel_alias()),
                alias: None,
            }];
            items.extend(columns.iter().map(|a| aliased(a)));
            Projection {
                distinct: true,
                items,
            }
        } else {
            if let Some(ungrouped) = columns.iter().find(|c| !spec.group_by.contains(c)) {
                return Err(SpecificationError::UngroupedColumn {
                    column: ungrouped.output_alias(),
                });
            }
            let mut items: Vec<ReturnItem> = spec.group_by.iter().map(aliased).collect();
            items.extend(spec.aggregates.iter().map(|a| self.aggregate_item(a)));
            Projection {
                distinct: false,
                items,
            }
        };

        let order_by = spec
            .order_by
            .iter()
            .map(|(attribute, descending)| OrderItem {
                column: attribute.output_alias(),
                descending: *descending,
            })
            .collect();
        Ok((projection, order_by))
    }

    fn aggregate_item(&self, aggregate: &Aggregate) -> ReturnItem {
        let (name, argument) = aggregate.parts();
        ReturnItem {
            expr: Expr::Call {
                name: name.into(),
                arg: argument.map(|a| Box::new(self.attribute_expr(a))),
            },
            alias: Some(aggregate.output_alias()),
        }
    }
}

fn subarc_alias(annotation: &AnnotationRef, lower: &str) -> String {
    format!("s_{}_{lower}", annotation.output_name())
}
