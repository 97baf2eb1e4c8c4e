//! Composable filter expression sent to the repository.
//!
//! A [`Predicate`] is a plain tree: conjunction/disjunction nodes over field
//! comparisons and set membership. Repositories either evaluate it in memory
//! with [`Predicate::matches`] or translate it to their own query language.

use std::collections::BTreeSet;
use std::fmt;

use serde::Serialize;

use crate::models::{ArticleVersion, ResourceKey, WorkflowStatus};

/// Article attribute a clause inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Field {
    /// Title in any language.
    Title,
    /// Body in any language, raw (unrendered) form.
    Content,
    Status,
    ResourceKey,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Title => "title",
            Field::Content => "content",
            Field::Status => "status",
            Field::ResourceKey => "resourceKey",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum CompareOp {
    Eq,
    /// `%term%`: unanchored, case-insensitive.
    Contains,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Text(String),
    Status(WorkflowStatus),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Predicate {
    /// True when every child is; an empty conjunction is true.
    And(Vec<Predicate>),
    /// True when any child is; an empty disjunction is false.
    Or(Vec<Predicate>),
    Compare {
        field: Field,
        op: CompareOp,
        value: Value,
    },
    InSet {
        field: Field,
        values: BTreeSet<ResourceKey>,
    },
}

impl Predicate {
    pub fn status_is(status: WorkflowStatus) -> Self {
        Predicate::Compare {
            field: Field::Status,
            op: CompareOp::Eq,
            value: Value::Status(status),
        }
    }

    pub fn contains(field: Field, term: &str) -> Self {
        Predicate::Compare {
            field,
            op: CompareOp::Contains,
            value: Value::Text(term.to_string()),
        }
    }

    pub fn resource_key_in(values: BTreeSet<ResourceKey>) -> Self {
        Predicate::InSet {
            field: Field::ResourceKey,
            values,
        }
    }

    /// Evaluate against one article version.
    pub fn matches(&self, article: &ArticleVersion) -> bool {
        match self {
            Predicate::And(children) => children.iter().all(|c| c.matches(article)),
            Predicate::Or(children) => children.iter().any(|c| c.matches(article)),
            Predicate::Compare { field, op, value } => compare(article, *field, *op, value),
            Predicate::InSet { field, values } => match field {
                Field::ResourceKey => values.contains(&article.item.resource_key),
                _ => false,
            },
        }
    }
}

fn compare(article: &ArticleVersion, field: Field, op: CompareOp, value: &Value) -> bool {
    match (field, value) {
        (Field::Status, Value::Status(status)) => {
            op == CompareOp::Eq && article.version.status == *status
        }
        (Field::Title, Value::Text(term)) => article
            .version
            .titles
            .values()
            .any(|text| text_matches(text, op, term)),
        (Field::Content, Value::Text(term)) => article
            .version
            .bodies
            .values()
            .any(|text| text_matches(text, op, term)),
        (Field::ResourceKey, Value::Text(term)) => {
            op == CompareOp::Eq && article.item.resource_key.to_string() == *term
        }
        _ => false,
    }
}

fn text_matches(text: &str, op: CompareOp, term: &str) -> bool {
    match op {
        CompareOp::Eq => text == term,
        CompareOp::Contains => text.to_lowercase().contains(&term.to_lowercase()),
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Text(text) => write!(f, "{:?}", text),
            Value::Status(status) => f.write_str(status.as_str()),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::And(children) => write_group(f, children, " AND ", "TRUE"),
            Predicate::Or(children) => write_group(f, children, " OR ", "FALSE"),
            Predicate::Compare { field, op, value } => {
                let op = match op {
                    CompareOp::Eq => "=",
                    CompareOp::Contains => "~",
                };
                write!(f, "{} {} {}", field.as_str(), op, value)
            }
            Predicate::InSet { field, values } => {
                let keys: Vec<String> = values.iter().map(|k| k.to_string()).collect();
                write!(f, "{} IN [{}]", field.as_str(), keys.join(", "))
            }
        }
    }
}

fn write_group(
    f: &mut fmt::Formatter<'_>,
    children: &[Predicate],
    sep: &str,
    empty: &str,
) -> fmt::Result {
    if children.is_empty() {
        return f.write_str(empty);
    }
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(sep)?;
        }
        write!(f, "({})", child)?;
    }
    Ok(())
}
