//! Query orchestration: compile, fetch, resolve current versions, localize,
//! paginate.

use std::sync::Arc;

use indexmap::IndexSet;
use tokio_util::sync::CancellationToken;

use crate::collab::{CallScope, CallSettings, ContentRepository, LocaleService, TaggingService};
use crate::errors::AppError;
use crate::models::{ArticleVersion, GroupId, Locale, Page, ResultItem, SearchCriteria};
use crate::observe::Observer;

use super::compiler::{compile, ResolvedTaxonomy, SearchMode};
use super::localizer::Localizer;
use super::resolver::{resolve, ResolutionPolicy};
use super::taxonomy::TagCategoryIndex;

/// Tuning for [`QueryService`], decoupled from application config.
#[derive(Debug, Clone, Default)]
pub struct QuerySettings {
    pub calls: CallSettings,
    pub resolution: ResolutionPolicy,
}

/// Read-side entry point over the article repository.
///
/// Holds no per-query state; every operation builds its own [`CallScope`].
pub struct QueryService {
    repository: Arc<dyn ContentRepository>,
    index: TagCategoryIndex,
    localizer: Localizer,
    observer: Arc<dyn Observer>,
    settings: QuerySettings,
    shutdown: CancellationToken,
}

impl QueryService {
    pub fn new(
        repository: Arc<dyn ContentRepository>,
        tagging: Arc<dyn TaggingService>,
        locales: Arc<dyn LocaleService>,
        observer: Arc<dyn Observer>,
        settings: QuerySettings,
    ) -> Self {
        Self {
            repository,
            index: TagCategoryIndex::new(tagging),
            localizer: Localizer::new(locales),
            observer,
            settings,
            shutdown: CancellationToken::new(),
        }
    }

    /// Cancel in-flight and future collaborator calls when `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    fn scope(&self) -> CallScope {
        CallScope::new(
            self.settings.calls.clone(),
            self.shutdown.child_token(),
            Arc::clone(&self.observer),
        )
    }

    /// One page of the articles matching `criteria`, in repository order.
    #[tracing::instrument(skip(self, criteria), fields(mode = ?SearchMode::of(criteria)))]
    pub async fn search(
        &self,
        criteria: &SearchCriteria,
        page: Page,
    ) -> Result<Vec<ResultItem>, AppError> {
        let scope = self.scope();
        let items = self.collect(criteria, &scope).await?;
        Ok(page.apply(items))
    }

    /// Size of the unpaginated result of `criteria`. Runs the whole query again.
    #[tracing::instrument(skip(self, criteria))]
    pub async fn count(&self, criteria: &SearchCriteria) -> Result<usize, AppError> {
        let scope = self.scope();
        Ok(self.collect(criteria, &scope).await?.len())
    }

    /// One page of `criteria` together with the unpaginated total, from a
    /// single execution.
    #[tracing::instrument(skip(self, criteria), fields(mode = ?SearchMode::of(criteria)))]
    pub async fn search_with_total(
        &self,
        criteria: &SearchCriteria,
        page: Page,
    ) -> Result<(Vec<ResultItem>, usize), AppError> {
        let scope = self.scope();
        let items = self.collect(criteria, &scope).await?;
        let total = items.len();
        Ok((page.apply(items), total))
    }

    /// Every article's representative version, newest modification first.
    ///
    /// Titles and bodies are projected into `locale` when given, otherwise into
    /// each article's default language.
    #[tracing::instrument(skip(self))]
    pub async fn latest_versions(
        &self,
        locale: Option<&Locale>,
    ) -> Result<Vec<ResultItem>, AppError> {
        let scope = self.scope();
        self.listing(locale, &scope).await
    }

    /// Current version of one article, if it exists.
    #[tracing::instrument(skip(self))]
    pub async fn latest_version(
        &self,
        group_id: GroupId,
        article_id: &str,
    ) -> Result<Option<ResultItem>, AppError> {
        if group_id <= 0 {
            return Err(AppError::invalid(format!(
                "groupId must be positive, got {}",
                group_id
            )));
        }
        if article_id.trim().is_empty() {
            return Err(AppError::invalid("articleId must not be blank"));
        }

        let scope = self.scope();
        let Some(current) = self.fetch_current(group_id, article_id, &scope).await? else {
            return Ok(None);
        };
        let language_id = current.version.default_language_id.clone();
        let item = self.project(&current, &language_id, &scope).await?;
        if scope.is_tripped() {
            tracing::warn!(group_id, article_id, "collaborator interrupted, returning no article");
            return Ok(None);
        }
        Ok(Some(item))
    }

    /// Listing entries with a materialized tag containing `tag`.
    #[tracing::instrument(skip(self))]
    pub async fn by_tag(&self, tag: &str) -> Result<Vec<ResultItem>, AppError> {
        if tag.trim().is_empty() {
            return Err(AppError::invalid("tag must not be blank"));
        }
        let scope = self.scope();
        let mut items = self.listing(None, &scope).await?;
        items.retain(|item| item.tags.iter().any(|t| t.contains(tag)));
        Ok(items)
    }

    /// Listing entries with a materialized category containing `category`.
    #[tracing::instrument(skip(self))]
    pub async fn by_category(&self, category: &str) -> Result<Vec<ResultItem>, AppError> {
        if category.trim().is_empty() {
            return Err(AppError::invalid("category must not be blank"));
        }
        let scope = self.scope();
        let mut items = self.listing(None, &scope).await?;
        items.retain(|item| item.categories.iter().any(|c| c.contains(category)));
        Ok(items)
    }

    async fn listing(
        &self,
        locale: Option<&Locale>,
        scope: &CallScope,
    ) -> Result<Vec<ResultItem>, AppError> {
        let all = scope
            .run("fetch_all", "all articles", Vec::new(), || {
                self.repository.fetch_all()
            })
            .await?;

        let resolved = resolve(all, self.settings.resolution);
        let mut items = Vec::with_capacity(resolved.len());
        for article in resolved.values() {
            if scope.is_tripped() {
                break;
            }
            let language_id = match locale {
                Some(locale) => locale.language_id(),
                None => article.version.default_language_id.clone(),
            };
            items.push(self.project(article, &language_id, scope).await?);
        }
        if scope.is_tripped() {
            tracing::warn!(projected = items.len(), "collaborator interrupted, returning no listing");
            return Ok(Vec::new());
        }

        // Stable: equal timestamps keep enumeration order.
        items.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
        Ok(items)
    }

    /// Full ordered result of `criteria`.
    async fn collect(
        &self,
        criteria: &SearchCriteria,
        scope: &CallScope,
    ) -> Result<Vec<ResultItem>, AppError> {
        let resolved = self.resolve_taxonomy(criteria, scope).await?;
        if scope.is_tripped() {
            tracing::warn!("collaborator interrupted before repository lookup, returning no results");
            return Ok(Vec::new());
        }

        let predicate = compile(criteria, &resolved);
        tracing::debug!(%predicate, "compiled search predicate");

        let context = predicate.to_string();
        let matched = scope
            .run("fetch_matching", &context, Vec::new(), || {
                self.repository.fetch_matching(&predicate)
            })
            .await?;

        let mut seen: IndexSet<String> = IndexSet::new();
        let mut items = Vec::new();
        let language_id = criteria.locale.language_id();
        for raw in matched {
            if !seen.insert(raw.article_id().to_string()) {
                continue;
            }
            if scope.is_tripped() {
                break;
            }

            let current = self
                .fetch_current(raw.group_id(), raw.article_id(), scope)
                .await?;
            let item = match current {
                Some(current) => self.project(&current, &language_id, scope).await?,
                None => ResultItem::unlocalized(&raw),
            };
            items.push(item);
        }
        if scope.is_tripped() {
            tracing::warn!(
                collected = items.len(),
                "collaborator interrupted mid-query, returning no results"
            );
            return Ok(Vec::new());
        }

        tracing::debug!(matched = seen.len(), returned = items.len(), "search collected");
        Ok(items)
    }

    /// Resource keys for the advanced-search tag/category fields.
    async fn resolve_taxonomy(
        &self,
        criteria: &SearchCriteria,
        scope: &CallScope,
    ) -> Result<ResolvedTaxonomy, AppError> {
        let mut resolved = ResolvedTaxonomy::default();
        if SearchMode::of(criteria) != SearchMode::Advanced {
            return Ok(resolved);
        }

        if let Some(tag) = criteria.tag() {
            resolved.tag = Some(self.index.resolve_tag(tag, scope).await?);
        }
        if let Some(category) = criteria.category() {
            if !scope.is_tripped() {
                resolved.category = Some(self.index.resolve_category(category, scope).await?);
            }
        }
        Ok(resolved)
    }

    async fn fetch_current(
        &self,
        group_id: GroupId,
        article_id: &str,
        scope: &CallScope,
    ) -> Result<Option<ArticleVersion>, AppError> {
        let context = format!("groupId={} articleId={}", group_id, article_id);
        scope
            .run("fetch_current", &context, None, || {
                self.repository.fetch_current(group_id, article_id)
            })
            .await
    }

    /// Result item for `article` with title/content in `language_id`.
    async fn project(
        &self,
        article: &ArticleVersion,
        language_id: &str,
        scope: &CallScope,
    ) -> Result<ResultItem, AppError> {
        let localized = self.localizer.localize(article, language_id, scope).await?;
        let mut item = ResultItem::unlocalized(article);
        item.locale = localized.locale;
        item.title = localized.title;
        item.content = localized.content;
        Ok(item)
    }
}
