//! Turns a search form into a [`Predicate`].
//!
//! Compilation is pure: tag and category names must already be resolved into
//! resource-key sets (see [`TagCategoryIndex`](super::TagCategoryIndex)) and are
//! passed in through [`ResolvedTaxonomy`].

use std::collections::BTreeSet;

use crate::models::{ResourceKey, SearchCriteria, WorkflowStatus};

use super::predicate::{Field, Predicate};

/// Which branch of the search form is in effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchMode {
    /// No keywords, no advanced form: every visible article.
    Listing,
    /// Title/tag/category fields combined with AND or OR.
    Advanced,
    /// Keywords against title and content.
    Keyword,
}

impl SearchMode {
    pub fn of(criteria: &SearchCriteria) -> Self {
        if criteria.advanced_search {
            SearchMode::Advanced
        } else if criteria.keywords().is_none() {
            SearchMode::Listing
        } else {
            SearchMode::Keyword
        }
    }
}

/// Resource keys resolved for the tag and category fields of a search.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedTaxonomy {
    pub tag: Option<BTreeSet<ResourceKey>>,
    pub category: Option<BTreeSet<ResourceKey>>,
}

/// Status filter: approved articles, plus expired ones when archives are shown.
pub fn visibility(include_archived: bool) -> Predicate {
    let mut statuses = vec![Predicate::status_is(WorkflowStatus::Approved)];
    if include_archived {
        statuses.push(Predicate::status_is(WorkflowStatus::Expired));
    }
    Predicate::Or(statuses)
}

/// Build the repository filter for `criteria`.
pub fn compile(criteria: &SearchCriteria, resolved: &ResolvedTaxonomy) -> Predicate {
    let visible = visibility(criteria.include_archived);

    match SearchMode::of(criteria) {
        SearchMode::Listing => visible,
        SearchMode::Advanced => {
            let mut clauses = Vec::new();

            if let Some(title) = criteria.title() {
                clauses.push(Predicate::contains(Field::Title, title));
            }
            // A name that resolved to nothing still filters: IN ∅ never matches.
            if criteria.tag().is_some() {
                let keys = resolved.tag.clone().unwrap_or_default();
                clauses.push(Predicate::resource_key_in(keys));
            }
            if criteria.category().is_some() {
                let keys = resolved.category.clone().unwrap_or_default();
                clauses.push(Predicate::resource_key_in(keys));
            }

            if clauses.is_empty() {
                return visible;
            }

            let root = if criteria.and_operator {
                Predicate::And(clauses)
            } else {
                Predicate::Or(clauses)
            };
            Predicate::And(vec![root, visible])
        }
        SearchMode::Keyword => {
            let keywords = criteria.keywords().unwrap_or_default();
            let text = Predicate::Or(vec![
                Predicate::contains(Field::Title, keywords),
                Predicate::contains(Field::Content, keywords),
            ]);
            Predicate::And(vec![text, visible])
        }
    }
}
