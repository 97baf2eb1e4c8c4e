//! Resolves tag and category names into the resource keys of the articles
//! carrying them.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::collab::{AssetRef, CallScope, TaggingService};
use crate::errors::AppError;
use crate::models::ResourceKey;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Taxonomy {
    Tag,
    Category,
}

impl Taxonomy {
    fn label(&self) -> &'static str {
        match self {
            Taxonomy::Tag => "tag",
            Taxonomy::Category => "category",
        }
    }

    fn find_operation(&self) -> &'static str {
        match self {
            Taxonomy::Tag => "find_tags_by_name",
            Taxonomy::Category => "find_categories_by_name",
        }
    }

    fn asset(&self, id: i64) -> AssetRef {
        match self {
            Taxonomy::Tag => AssetRef::Tag(id),
            Taxonomy::Category => AssetRef::Category(id),
        }
    }
}

pub struct TagCategoryIndex {
    tagging: Arc<dyn TaggingService>,
}

impl TagCategoryIndex {
    pub fn new(tagging: Arc<dyn TaggingService>) -> Self {
        Self { tagging }
    }

    pub async fn resolve_tag(
        &self,
        name: &str,
        scope: &CallScope,
    ) -> Result<BTreeSet<ResourceKey>, AppError> {
        self.resolve(Taxonomy::Tag, name, scope).await
    }

    pub async fn resolve_category(
        &self,
        name: &str,
        scope: &CallScope,
    ) -> Result<BTreeSet<ResourceKey>, AppError> {
        self.resolve(Taxonomy::Category, name, scope).await
    }

    /// Name lookup, then one association lookup per matching record.
    ///
    /// A failed sub-lookup contributes no keys; the others still count.
    async fn resolve(
        &self,
        taxonomy: Taxonomy,
        name: &str,
        scope: &CallScope,
    ) -> Result<BTreeSet<ResourceKey>, AppError> {
        if name.trim().is_empty() {
            return Err(AppError::invalid(format!(
                "{} name must not be blank",
                taxonomy.label()
            )));
        }

        let context = format!("{}={}", taxonomy.label(), name);
        let ids = scope
            .run(taxonomy.find_operation(), &context, Vec::new(), || {
                let tagging = Arc::clone(&self.tagging);
                let name = name.to_string();
                async move {
                    match taxonomy {
                        Taxonomy::Tag => tagging.find_tags_by_name(&name).await,
                        Taxonomy::Category => tagging.find_categories_by_name(&name).await,
                    }
                }
            })
            .await?;

        let mut keys = BTreeSet::new();
        for id in ids {
            if scope.is_tripped() {
                break;
            }
            let asset = taxonomy.asset(id);
            let context = format!("{}={} id={}", taxonomy.label(), name, id);
            let associated = scope
                .run("associations_for", &context, Vec::new(), || {
                    self.tagging.associations_for(asset)
                })
                .await?;
            keys.extend(associated);
        }

        tracing::debug!(
            taxonomy = taxonomy.label(),
            name,
            keys = keys.len(),
            "resolved resource keys"
        );
        Ok(keys)
    }
}
