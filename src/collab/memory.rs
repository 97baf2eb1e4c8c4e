//! In-memory collaborators for tests and embedding.
//!
//! Uses `Vec` behind `std::sync::RwLock`. Predicates are evaluated with
//! [`Predicate::matches`]; enumeration order is insertion order.

use std::collections::BTreeSet;
use std::sync::RwLock;

use async_trait::async_trait;

use crate::errors::CollaboratorError;
use crate::models::{ArticleVersion, GroupId, ResourceKey};
use crate::query::Predicate;

use super::{AssetRef, CategoryId, ContentRepository, TagId, TaggingService};

/// Article versions held in insertion order.
#[derive(Default)]
pub struct InMemoryRepository {
    versions: RwLock<Vec<ArticleVersion>>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_versions(versions: Vec<ArticleVersion>) -> Self {
        Self {
            versions: RwLock::new(versions),
        }
    }

    pub fn push(&self, version: ArticleVersion) {
        match self.versions.write() {
            Ok(mut versions) => versions.push(version),
            Err(poisoned) => poisoned.into_inner().push(version),
        }
    }

    fn snapshot(&self) -> Result<Vec<ArticleVersion>, CollaboratorError> {
        self.versions
            .read()
            .map(|v| v.clone())
            .map_err(|_| CollaboratorError::unavailable("in-memory repository lock poisoned"))
    }
}

#[async_trait]
impl ContentRepository for InMemoryRepository {
    async fn fetch_all(&self) -> Result<Vec<ArticleVersion>, CollaboratorError> {
        self.snapshot()
    }

    async fn fetch_matching(
        &self,
        predicate: &Predicate,
    ) -> Result<Vec<ArticleVersion>, CollaboratorError> {
        Ok(self
            .snapshot()?
            .into_iter()
            .filter(|v| predicate.matches(v))
            .collect())
    }

    async fn fetch_current(
        &self,
        group_id: GroupId,
        article_id: &str,
    ) -> Result<Option<ArticleVersion>, CollaboratorError> {
        let mut current: Option<ArticleVersion> = None;
        for candidate in self.snapshot()? {
            if candidate.item.group_id != group_id || candidate.item.article_id != article_id {
                continue;
            }
            let newer = current
                .as_ref()
                .map_or(true, |c| candidate.version.version > c.version.version);
            if newer {
                current = Some(candidate);
            }
        }
        Ok(current)
    }
}

struct NamedAsset {
    id: i64,
    name: String,
    resource_keys: BTreeSet<ResourceKey>,
}

/// Tags and categories with their article associations.
#[derive(Default)]
pub struct InMemoryTagging {
    tags: RwLock<Vec<NamedAsset>>,
    categories: RwLock<Vec<NamedAsset>>,
}

impl InMemoryTagging {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tag with the articles carrying it.
    pub fn add_tag(&self, id: TagId, name: &str, resource_keys: &[ResourceKey]) {
        push_asset(&self.tags, id, name, resource_keys);
    }

    /// Register a category with the articles carrying it.
    pub fn add_category(&self, id: CategoryId, name: &str, resource_keys: &[ResourceKey]) {
        push_asset(&self.categories, id, name, resource_keys);
    }
}

fn push_asset(assets: &RwLock<Vec<NamedAsset>>, id: i64, name: &str, keys: &[ResourceKey]) {
    let asset = NamedAsset {
        id,
        name: name.to_string(),
        resource_keys: keys.iter().copied().collect(),
    };
    match assets.write() {
        Ok(mut assets) => assets.push(asset),
        Err(poisoned) => poisoned.into_inner().push(asset),
    }
}

fn ids_named(assets: &RwLock<Vec<NamedAsset>>, name: &str) -> Result<Vec<i64>, CollaboratorError> {
    let assets = assets
        .read()
        .map_err(|_| CollaboratorError::unavailable("in-memory tagging lock poisoned"))?;
    let wanted = name.to_lowercase();
    Ok(assets
        .iter()
        .filter(|a| a.name.to_lowercase() == wanted)
        .map(|a| a.id)
        .collect())
}

fn keys_of(assets: &RwLock<Vec<NamedAsset>>, id: i64) -> Result<Vec<ResourceKey>, CollaboratorError> {
    let assets = assets
        .read()
        .map_err(|_| CollaboratorError::unavailable("in-memory tagging lock poisoned"))?;
    Ok(assets
        .iter()
        .filter(|a| a.id == id)
        .flat_map(|a| a.resource_keys.iter().copied())
        .collect())
}

#[async_trait]
impl TaggingService for InMemoryTagging {
    async fn find_tags_by_name(&self, name: &str) -> Result<Vec<TagId>, CollaboratorError> {
        ids_named(&self.tags, name)
    }

    async fn find_categories_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<CategoryId>, CollaboratorError> {
        ids_named(&self.categories, name)
    }

    async fn associations_for(
        &self,
        asset: AssetRef,
    ) -> Result<Vec<ResourceKey>, CollaboratorError> {
        match asset {
            AssetRef::Tag(id) => keys_of(&self.tags, id),
            AssetRef::Category(id) => keys_of(&self.categories, id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::WorkflowStatus::*;
    use crate::query::test_support::article;

    #[tokio::test]
    async fn fetch_current_returns_highest_version_of_any_status() {
        let repo = InMemoryRepository::with_versions(vec![
            article("A", 1, 1.0, Approved).build(),
            article("A", 1, 1.2, Pending).build(),
            article("A", 1, 1.1, Approved).build(),
            article("A", 9, 3.0, Approved).group(99).build(),
        ]);

        let current = repo.fetch_current(20, "A").await.unwrap().unwrap();
        assert_eq!(current.version.version, 1.2);
        assert!(repo.fetch_current(20, "missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn tag_lookup_ignores_case() {
        let tagging = InMemoryTagging::new();
        tagging.add_tag(1, "Finance", &[10, 11]);
        tagging.add_tag(2, "sports", &[99]);

        assert_eq!(tagging.find_tags_by_name("finance").await.unwrap(), vec![1]);
        assert_eq!(
            tagging.associations_for(AssetRef::Tag(1)).await.unwrap(),
            vec![10, 11]
        );
        assert!(tagging.find_categories_by_name("finance").await.unwrap().is_empty());
    }
}
