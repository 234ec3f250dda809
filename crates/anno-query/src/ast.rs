//! Typed graph-pattern query tree.
//!
//! The compiler only builds these values; [`crate::render`] turns them into
//! text, so clause order and escaping never depend on the order in which the
//! compiler produced them.

use crate::attribute::{Literal, Operator};

/// `(alias:Label {key: value, ...})`
#[derive(Debug, Clone, PartialEq, Default)]
pub struct NodePattern {
    pub alias: Option<String>,
    pub label: Option<String>,
    pub properties: Vec<(String, Literal)>,
}

impl NodePattern {
    #[must_use]
    pub fn named(alias: impl Into<String>) -> Self {
        Self {
            alias: Some(alias.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[must_use]
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Literal>) -> Self {
        self.properties.push((key.into(), value.into()));
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// `-[...]->`
    Outgoing,
    /// `<-[...]-`
    Incoming,
}

/// `-[alias:type*0..]->`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelPattern {
    pub alias: Option<String>,
    pub rel_type: String,
    pub direction: Direction,
    /// Zero or more repetitions.
    pub repeated: bool,
    /// Bridging step standing in for an offset nobody referenced.
    pub synthesized: bool,
}

impl RelPattern {
    #[must_use]
    pub fn new(alias: Option<String>, rel_type: impl Into<String>) -> Self {
        Self {
            alias,
            rel_type: rel_type.into(),
            direction: Direction::Outgoing,
            repeated: false,
            synthesized: false,
        }
    }

    /// An unaliased step of `rel_type` inserted to keep a chain contiguous.
    #[must_use]
    pub fn bridge(rel_type: impl Into<String>) -> Self {
        Self {
            synthesized: true,
            ..Self::new(None, rel_type)
        }
    }

    #[must_use]
    pub const fn incoming(mut self) -> Self {
        self.direction = Direction::Incoming;
        self
    }

    #[must_use]
    pub const fn repeated(mut self) -> Self {
        self.repeated = true;
        self
    }
}

/// A node followed by any number of (relationship, node) steps.
#[derive(Debug, Clone, PartialEq)]
pub struct PathPattern {
    pub start: NodePattern,
    pub steps: Vec<(RelPattern, NodePattern)>,
}

impl PathPattern {
    #[must_use]
    pub const fn starting_at(start: NodePattern) -> Self {
        Self {
            start,
            steps: Vec::new(),
        }
    }

    #[must_use]
    pub fn step(mut self, rel: RelPattern, node: NodePattern) -> Self {
        self.steps.push((rel, node));
        self
    }

    /// Steps inserted only to bridge unreferenced offsets.
    pub fn synthesized(&self) -> impl Iterator<Item = &RelPattern> {
        self.steps.iter().map(|(r, _)| r).filter(|r| r.synthesized)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// `alias.key`
    Property { alias: String, key: String },
    /// A bare alias.
    Variable(String),
    Literal(Literal),
    List(Vec<Literal>),
    /// `lhs op rhs`
    Compare {
        lhs: Box<Expr>,
        op: Operator,
        rhs: Box<Expr>,
    },
    /// `lhs - rhs`
    Subtract(Box<Expr>, Box<Expr>),
    /// `any(var IN list WHERE predicate)`
    Any {
        var: String,
        list: String,
        predicate: Box<Expr>,
    },
    /// `name(arg)`, or `name(*)` without an argument.
    Call { name: String, arg: Option<Box<Expr>> },
}

impl Expr {
    #[must_use]
    pub fn property(alias: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Property {
            alias: alias.into(),
            key: key.into(),
        }
    }

    #[must_use]
    pub fn compare(lhs: Self, op: Operator, rhs: Self) -> Self {
        Self::Compare {
            lhs: Box::new(lhs),
            op,
            rhs: Box::new(rhs),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReturnItem {
    pub expr: Expr,
    pub alias: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Projection {
    pub distinct: bool,
    pub items: Vec<ReturnItem>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderItem {
    /// Output column alias to sort on.
    pub column: String,
    pub descending: bool,
}

/// `MATCH ... WHERE ... RETURN ... ORDER BY ...`
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub matches: Vec<PathPattern>,
    /// Conjunction of conditions.
    pub conditions: Vec<Expr>,
    pub projection: Projection,
    pub order_by: Vec<OrderItem>,
}
