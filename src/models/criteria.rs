//! Search form and page bounds.

use serde::{Deserialize, Serialize};

use super::Locale;
use crate::errors::AppError;

/// Search terms as submitted by the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchCriteria {
    #[serde(default)]
    pub keywords: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub advanced_search: bool,
    /// Only meaningful together with `advanced_search`.
    #[serde(default)]
    pub and_operator: bool,
    /// Also show expired articles.
    #[serde(default)]
    pub include_archived: bool,
    pub locale: Locale,
}

impl SearchCriteria {
    /// Criteria that list every visible article in the given locale.
    pub fn new(locale: Locale) -> Self {
        Self {
            keywords: None,
            title: None,
            tag: None,
            category: None,
            advanced_search: false,
            and_operator: false,
            include_archived: false,
            locale,
        }
    }

    pub fn keywords(&self) -> Option<&str> {
        non_blank(self.keywords.as_deref())
    }

    pub fn title(&self) -> Option<&str> {
        non_blank(self.title.as_deref())
    }

    pub fn tag(&self) -> Option<&str> {
        non_blank(self.tag.as_deref())
    }

    pub fn category(&self) -> Option<&str> {
        non_blank(self.category.as_deref())
    }
}

/// `None` for absent or whitespace-only values.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Half-open `[start, end)` window over an ordered result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub start: usize,
    pub end: usize,
}

impl Page {
    pub fn new(start: usize, end: usize) -> Result<Self, AppError> {
        if start > end {
            return Err(AppError::invalid(format!(
                "page start {} is after end {}",
                start, end
            )));
        }
        Ok(Self { start, end })
    }

    /// Everything.
    pub fn all() -> Self {
        Self {
            start: 0,
            end: usize::MAX,
        }
    }

    /// Cut the window out of `items`, truncating at the end of the list.
    pub fn apply<T>(&self, items: Vec<T>) -> Vec<T> {
        if self.start >= items.len() {
            return Vec::new();
        }
        let end = self.end.min(items.len());
        items
            .into_iter()
            .skip(self.start)
            .take(end - self.start)
            .collect()
    }
}
