//! Single-pass serialisation of a [`Query`] to text.

use std::fmt::Write;

use crate::ast::{Direction, Expr, NodePattern, PathPattern, Query, RelPattern};
use crate::attribute::Literal;

/// Render a query. Each clause starts on its own line.
#[must_use]
pub fn render(query: &Query) -> String {
    let mut out = String::from("MATCH ");
    let patterns: Vec<String> = query.matches.iter().map(path).collect();
    out.push_str(&patterns.join(",\n"));

    if let Some((first, rest)) = query.conditions.split_first() {
        out.push_str("\nWHERE ");
        out.push_str(&expr(first));
        for condition in rest {
            out.push_str("\nAND ");
            out.push_str(&expr(condition));
        }
    }

    out.push_str("\nRETURN ");
    if query.projection.distinct {
        out.push_str("DISTINCT ");
    }
    let items: Vec<String> = query
        .projection
        .items
        .iter()
        .map(|item| match &item.alias {
            Some(alias) => format!("{} AS {}", expr(&item.expr), identifier(alias)),
            None => expr(&item.expr),
        })
        .collect();
    out.push_str(&items.join(", "));

    if !query.order_by.is_empty() {
        let items: Vec<String> = query
            .order_by
            .iter()
            .map(|o| {
                if o.descending {
                    format!("{} DESC", identifier(&o.column))
                } else {
                    identifier(&o.column)
                }
            })
            .collect();
        out.push_str("\nORDER BY ");
        out.push_str(&items.join(", "));
    }
    out
}

fn path(pattern: &PathPattern) -> String {
    let mut out = node(&pattern.start);
    for (rel_pattern, target) in &pattern.steps {
        out.push_str(&rel(rel_pattern));
        out.push_str(&node(target));
    }
    out
}

fn node(pattern: &NodePattern) -> String {
    let mut out = String::from("(");
    if let Some(alias) = &pattern.alias {
        out.push_str(&identifier(alias));
    }
    if let Some(label) = &pattern.label {
        out.push(':');
        out.push_str(&identifier(label));
    }
    if !pattern.properties.is_empty() {
        let props: Vec<String> = pattern
            .properties
            .iter()
            .map(|(k, v)| format!("{}: {}", identifier(k), literal(v)))
            .collect();
        let _ = write!(out, " {{{}}}", props.join(", "));
    }
    out.push(')');
    out
}

fn rel(pattern: &RelPattern) -> String {
    let mut inner = String::new();
    if let Some(alias) = &pattern.alias {
        inner.push_str(&identifier(alias));
    }
    inner.push(':');
    inner.push_str(&identifier(&pattern.rel_type));
    if pattern.repeated {
        inner.push_str("*0..");
    }
    match pattern.direction {
        Direction::Outgoing => format!("-[{inner}]->"),
        Direction::Incoming => format!("<-[{inner}]-"),
    }
}

fn expr(e: &Expr) -> String {
    match e {
        Expr::Property { alias, key } => format!("{}.{}", identifier(alias), identifier(key)),
        Expr::Variable(alias) => identifier(alias),
        Expr::Literal(value) => literal(value),
        Expr::List(values) => {
            let values: Vec<String> = values.iter().map(literal).collect();
            format!("[{}]", values.join(", "))
        }
        Expr::Compare { lhs, op, rhs } => format!("{} {} {}", expr(lhs), op.symbol(), expr(rhs)),
        Expr::Subtract(lhs, rhs) => format!("{} - {}", expr(lhs), expr(rhs)),
        Expr::Any {
            var,
            list,
            predicate,
        } => format!(
            "any({} IN {} WHERE {})",
            identifier(var),
            identifier(list),
            expr(predicate)
        ),
        Expr::Call { name, arg } => match arg {
            Some(arg) => format!("{name}({})", expr(arg)),
            None => format!("{name}(*)"),
        },
    }
}

fn literal(value: &Literal) -> String {
    match value {
        Literal::Text(text) => quote(text),
        Literal::Number(n) => n.to_string(),
    }
}

/// Single-quoted string literal with backslash escapes.
#[must_use]
pub fn quote(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('\'');
    for c in text.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '\n' => out.push_str("\\n"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Plain identifiers pass through; anything else is backtick-quoted.
#[must_use]
pub fn identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}
