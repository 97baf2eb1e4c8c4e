//! Builders shared by the query unit tests.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, TimeZone, Utc};

use crate::models::{ArticleVersion, ContentItem, Locale, ResourceKey, Version, WorkflowStatus};

pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

pub fn en() -> Locale {
    Locale::parse("en_US").unwrap()
}

pub struct ArticleBuilder {
    item: ContentItem,
    version: Version,
}

pub fn article(
    article_id: &str,
    resource_key: ResourceKey,
    version: f64,
    status: WorkflowStatus,
) -> ArticleBuilder {
    ArticleBuilder {
        item: ContentItem {
            group_id: 20,
            article_id: article_id.to_string(),
            resource_key,
            tags: BTreeSet::new(),
            categories: BTreeSet::new(),
        },
        version: Version {
            version,
            status,
            in_trash: false,
            default_language_id: "en_US".to_string(),
            titles: BTreeMap::new(),
            bodies: BTreeMap::new(),
            modified_at: base_time(),
        },
    }
}

impl ArticleBuilder {
    pub fn group(mut self, group_id: i64) -> Self {
        self.item.group_id = group_id;
        self
    }

    pub fn title(mut self, language_id: &str, text: &str) -> Self {
        self.version
            .titles
            .insert(language_id.to_string(), text.to_string());
        self
    }

    pub fn body(mut self, language_id: &str, text: &str) -> Self {
        self.version
            .bodies
            .insert(language_id.to_string(), text.to_string());
        self
    }

    pub fn default_language(mut self, language_id: &str) -> Self {
        self.version.default_language_id = language_id.to_string();
        self
    }

    pub fn trashed(mut self) -> Self {
        self.version.in_trash = true;
        self
    }

    /// Modification time `days` after [`base_time`].
    pub fn modified(mut self, days: i64) -> Self {
        self.version.modified_at = base_time() + Duration::days(days);
        self
    }

    pub fn tag(mut self, name: &str) -> Self {
        self.item.tags.insert(name.to_string());
        self
    }

    pub fn category(mut self, name: &str) -> Self {
        self.item.categories.insert(name.to_string());
        self
    }

    pub fn build(&self) -> ArticleVersion {
        ArticleVersion {
            item: self.item.clone(),
            version: self.version.clone(),
        }
    }
}
