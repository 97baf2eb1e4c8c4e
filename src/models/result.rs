//! Locale-projected article returned to callers.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{ArticleVersion, GroupId, Locale, ResourceKey};

/// Single-locale view of the current version of an article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub group_id: GroupId,
    pub article_id: String,
    pub resource_key: ResourceKey,
    pub version: f64,
    /// Configured locale the item was projected for, when one matches.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locale: Option<Locale>,
    /// Unset when the article could not be localized.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub tags: BTreeSet<String>,
    pub categories: BTreeSet<String>,
    pub modified_at: DateTime<Utc>,
}

impl ResultItem {
    /// Identity and taxonomy of `article`, without title/content.
    pub fn unlocalized(article: &ArticleVersion) -> Self {
        Self {
            group_id: article.item.group_id,
            article_id: article.item.article_id.clone(),
            resource_key: article.item.resource_key,
            version: article.version.version,
            locale: None,
            title: None,
            content: None,
            tags: article.item.tags.clone(),
            categories: article.item.categories.clone(),
            modified_at: article.version.modified_at,
        }
    }
}
