//! Versioned article model: the logical content item and one of its versions.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Site/group an article belongs to.
pub type GroupId = i64;

/// Stable identity of an article across all of its versions.
pub type ResourceKey = i64;

/// Workflow lifecycle state of a version.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WorkflowStatus {
    Approved,
    Pending,
    Draft,
    Expired,
    Trashed,
}

impl WorkflowStatus {
    /// Integer code used by the storage adapter.
    pub fn code(&self) -> i64 {
        match self {
            WorkflowStatus::Approved => 0,
            WorkflowStatus::Pending => 1,
            WorkflowStatus::Draft => 2,
            WorkflowStatus::Expired => 3,
            WorkflowStatus::Trashed => 8,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(WorkflowStatus::Approved),
            1 => Some(WorkflowStatus::Pending),
            2 => Some(WorkflowStatus::Draft),
            3 => Some(WorkflowStatus::Expired),
            8 => Some(WorkflowStatus::Trashed),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowStatus::Approved => "approved",
            WorkflowStatus::Pending => "pending",
            WorkflowStatus::Draft => "draft",
            WorkflowStatus::Expired => "expired",
            WorkflowStatus::Trashed => "trashed",
        }
    }
}

/// One logical article, identified by `(group_id, article_id)`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub group_id: GroupId,
    pub article_id: String,
    pub resource_key: ResourceKey,
    /// Tag names as materialized by the repository.
    #[serde(default)]
    pub tags: BTreeSet<String>,
    /// Category names as materialized by the repository.
    #[serde(default)]
    pub categories: BTreeSet<String>,
}

/// One revision of an article.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub version: f64,
    pub status: WorkflowStatus,
    #[serde(default)]
    pub in_trash: bool,
    pub default_language_id: String,
    /// Title per language id (`en_US`, `ru_RU`, ...).
    #[serde(default)]
    pub titles: BTreeMap<String, String>,
    /// Body per language id; may be structured markup.
    #[serde(default)]
    pub bodies: BTreeMap<String, String>,
    pub modified_at: DateTime<Utc>,
}

impl Version {
    /// Whether this version may represent its article in listings.
    pub fn is_current_approved(&self) -> bool {
        self.status == WorkflowStatus::Approved && !self.in_trash
    }
}

/// An article paired with one of its versions, as enumerated by the repository.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArticleVersion {
    pub item: ContentItem,
    pub version: Version,
}

impl ArticleVersion {
    pub fn article_id(&self) -> &str {
        &self.item.article_id
    }

    pub fn group_id(&self) -> GroupId {
        self.item.group_id
    }

    pub fn resource_key(&self) -> ResourceKey {
        self.item.resource_key
    }
}
