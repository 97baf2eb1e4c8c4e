//! Collaborator interfaces the query layer depends on.
//!
//! Storage, asset tagging and locale resolution live outside this crate; the
//! query layer only sees these traits. Every call is routed through a
//! [`CallScope`] which bounds it in time, honours cancellation and applies the
//! configured [`FailurePolicy`].
//!
//! Implementations must be `Send + Sync` to be shared across request handlers.

pub mod locale;
pub mod memory;
mod scope;

pub use scope::*;

use async_trait::async_trait;

use crate::errors::CollaboratorError;
use crate::models::{ArticleVersion, GroupId, Locale, ResourceKey};
use crate::query::Predicate;

pub type TagId = i64;
pub type CategoryId = i64;

/// A tag or category record in the asset service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetRef {
    Tag(TagId),
    Category(CategoryId),
}

/// Read access to the versioned article store.
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Every version of every article, in the store's native order.
    async fn fetch_all(&self) -> Result<Vec<ArticleVersion>, CollaboratorError>;

    /// Versions matching `predicate`, in the store's native order.
    async fn fetch_matching(
        &self,
        predicate: &Predicate,
    ) -> Result<Vec<ArticleVersion>, CollaboratorError>;

    /// Latest version (any status) of one article.
    async fn fetch_current(
        &self,
        group_id: GroupId,
        article_id: &str,
    ) -> Result<Option<ArticleVersion>, CollaboratorError>;
}

/// Asset tagging and categorization lookups.
#[async_trait]
pub trait TaggingService: Send + Sync {
    /// Tags whose name equals `name`, ignoring case.
    async fn find_tags_by_name(&self, name: &str) -> Result<Vec<TagId>, CollaboratorError>;

    /// Categories whose name equals `name`, ignoring case.
    async fn find_categories_by_name(
        &self,
        name: &str,
    ) -> Result<Vec<CategoryId>, CollaboratorError>;

    /// Resource keys of the articles carrying a tag or category.
    async fn associations_for(&self, asset: AssetRef)
        -> Result<Vec<ResourceKey>, CollaboratorError>;
}

#[async_trait]
pub trait LocaleService: Send + Sync {
    /// Configured locale for `language_id`; `None` when none is configured.
    async fn resolve_locale(&self, language_id: &str)
        -> Result<Option<Locale>, CollaboratorError>;
}
