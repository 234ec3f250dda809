//! Attribute, value and filter types that query specifications are built from.

use serde::{Deserialize, Serialize};

/// Where an annotation sits relative to the matched one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    /// The matched annotation itself.
    Matched,
    /// `k` units before (negative) or after (positive) the matched annotation.
    Relative(i32),
}

impl Position {
    /// Offset from the matched annotation (0 for [`Position::Matched`]).
    #[must_use]
    pub const fn offset(self) -> i32 {
        match self {
            Self::Matched => 0,
            Self::Relative(k) => k,
        }
    }
}

/// One annotation of a tier taking part in a query.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AnnotationRef {
    pub tier: String,
    pub position: Position,
}

impl AnnotationRef {
    #[must_use]
    pub fn matched(tier: impl Into<String>) -> Self {
        Self {
            tier: tier.into(),
            position: Position::Matched,
        }
    }

    /// Suffix distinguishing offsets in aliases: `""`, `"_m2"`, `"_p1"`.
    #[must_use]
    pub fn suffix(&self) -> String {
        match self.position.offset() {
            0 => String::new(),
            k if k < 0 => format!("_m{}", k.unsigned_abs()),
            k => format!("_p{k}"),
        }
    }

    /// Alias of the tier edge.
    #[must_use]
    pub fn rel_alias(&self) -> String {
        format!("r_{}{}", self.tier, self.suffix())
    }

    /// Alias of the node the edge starts at.
    #[must_use]
    pub fn begin_alias(&self) -> String {
        format!("b_{}{}", self.tier, self.suffix())
    }

    /// Alias of the node the edge ends at.
    #[must_use]
    pub fn end_alias(&self) -> String {
        format!("e_{}{}", self.tier, self.suffix())
    }

    /// Alias of the edge list a contains filter quantifies over.
    #[must_use]
    pub fn contents_alias(&self) -> String {
        format!("c_{}{}", self.tier, self.suffix())
    }

    /// Name used in output column aliases: `phone`, `phone_m1`.
    #[must_use]
    pub fn output_name(&self) -> String {
        format!("{}{}", self.tier, self.suffix())
    }
}

/// What is read from a tier annotation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum TierProperty {
    Label,
    Begin,
    End,
    Duration,
    /// Closure path over the named lower tier.
    Subarc(String),
    /// A declared per-tier property.
    Named(String),
}

/// Closed set of things a query can refer to.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AttributeKind {
    Tier {
        annotation: AnnotationRef,
        property: TierProperty,
    },
    Speaker {
        property: String,
    },
    Discourse {
        property: String,
    },
    /// Recording channel of the speaker in the discourse.
    Channel,
}

impl AttributeKind {
    /// The annotation this attribute is read from, if it is a tier attribute.
    #[must_use]
    pub const fn annotation(&self) -> Option<&AnnotationRef> {
        match self {
            Self::Tier { annotation, .. } => Some(annotation),
            _ => None,
        }
    }

    /// Output column alias.
    #[must_use]
    pub fn output_alias(&self) -> String {
        match self {
            Self::Tier {
                annotation,
                property,
            } => {
                let name = annotation.output_name();
                match property {
                    TierProperty::Label => format!("{name}_label"),
                    TierProperty::Begin => format!("{name}_begin"),
                    TierProperty::End => format!("{name}_end"),
                    TierProperty::Duration => format!("{name}_duration"),
                    TierProperty::Subarc(lower) => format!("{name}_subarc_{lower}"),
                    TierProperty::Named(key) => format!("{name}_{key}"),
                }
            }
            Self::Speaker { property } => format!("speaker_{property}"),
            Self::Discourse { property } => format!("discourse_{property}"),
            Self::Channel => "channel".into(),
        }
    }

    #[must_use]
    pub fn equals(self, value: impl Into<Value>) -> Filter {
        Filter::new(self, Operator::Eq, value)
    }

    #[must_use]
    pub fn not_equals(self, value: impl Into<Value>) -> Filter {
        Filter::new(self, Operator::NotEq, value)
    }

    #[must_use]
    pub fn less_than(self, value: impl Into<Value>) -> Filter {
        Filter::new(self, Operator::Lt, value)
    }

    #[must_use]
    pub fn at_most(self, value: impl Into<Value>) -> Filter {
        Filter::new(self, Operator::Le, value)
    }

    #[must_use]
    pub fn greater_than(self, value: impl Into<Value>) -> Filter {
        Filter::new(self, Operator::Gt, value)
    }

    #[must_use]
    pub fn at_least(self, value: impl Into<Value>) -> Filter {
        Filter::new(self, Operator::Ge, value)
    }

    #[must_use]
    pub fn one_of<I, V>(self, values: I) -> Filter
    where
        I: IntoIterator<Item = V>,
        V: Into<Literal>,
    {
        Filter::new(
            self,
            Operator::In,
            Value::List(values.into_iter().map(Into::into).collect()),
        )
    }
}

/// A constant in a filter or pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Text(String),
    Number(f64),
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::Text(value.into())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

/// Right-hand side of a filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Literal(Literal),
    List(Vec<Literal>),
    /// Compare against another attribute.
    Attribute(AttributeKind),
}

impl From<Literal> for Value {
    fn from(value: Literal) -> Self {
        Self::Literal(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Literal(value.into())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Literal(value.into())
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Literal(value.into())
    }
}

impl From<AttributeKind> for Value {
    fn from(value: AttributeKind) -> Self {
        Self::Attribute(value)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operator {
    Eq,
    NotEq,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

impl Operator {
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::NotEq => "<>",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::In => "IN",
        }
    }
}

/// `attribute op value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub attribute: AttributeKind,
    pub operator: Operator,
    pub value: Value,
}

impl Filter {
    #[must_use]
    pub fn new(attribute: AttributeKind, operator: Operator, value: impl Into<Value>) -> Self {
        Self {
            attribute,
            operator,
            value: value.into(),
        }
    }

    /// Annotations this filter reads on either side.
    pub fn annotations(&self) -> impl Iterator<Item = &AnnotationRef> {
        let rhs = match &self.value {
            Value::Attribute(attr) => attr.annotation(),
            _ => None,
        };
        self.attribute.annotation().into_iter().chain(rhs)
    }
}
