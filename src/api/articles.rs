//! Article listing and lookup endpoints.

use axum::extract::{Path, Query, State};
use serde::Deserialize;

use super::{parse_locale, success, ApiResult};
use crate::errors::AppError;
use crate::models::{GroupId, ResultItem};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    /// Locale to project into; each article's default language when absent.
    pub locale: Option<String>,
}

/// GET /api/articles - Latest approved version of every article.
pub async fn list_articles(
    State(state): State<AppState>,
    Query(params): Query<ListingQuery>,
) -> ApiResult<Vec<ResultItem>> {
    let locale = parse_locale(params.locale.as_deref())?;
    success(state.service.latest_versions(locale.as_ref()).await?)
}

/// GET /api/articles/{group_id}/{article_id} - Current version of one article.
pub async fn get_article(
    State(state): State<AppState>,
    Path((group_id, article_id)): Path<(GroupId, String)>,
) -> ApiResult<ResultItem> {
    match state.service.latest_version(group_id, &article_id).await? {
        Some(item) => success(item),
        None => Err(AppError::NotFound(format!(
            "Article {} not found in group {}",
            article_id, group_id
        ))),
    }
}

/// GET /api/tags/{tag}/articles - Listing entries carrying a matching tag.
pub async fn articles_by_tag(
    State(state): State<AppState>,
    Path(tag): Path<String>,
) -> ApiResult<Vec<ResultItem>> {
    success(state.service.by_tag(&tag).await?)
}

/// GET /api/categories/{category}/articles - Listing entries in a matching category.
pub async fn articles_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
) -> ApiResult<Vec<ResultItem>> {
    success(state.service.by_category(&category).await?)
}
