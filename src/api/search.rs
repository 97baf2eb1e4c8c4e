//! Search API endpoint.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{parse_locale, success, ApiResult};
use crate::models::{Page, ResultItem, SearchCriteria};
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub keywords: Option<String>,
    pub title: Option<String>,
    pub tag: Option<String>,
    pub category: Option<String>,
    /// Use the title/tag/category form instead of keywords.
    #[serde(default)]
    pub advanced: bool,
    /// Combine advanced fields with AND instead of OR.
    #[serde(default, rename = "and")]
    pub and_operator: bool,
    /// Include expired articles.
    #[serde(default)]
    pub archived: bool,
    pub locale: Option<String>,
    /// First result index, inclusive (default: 0).
    #[serde(default)]
    pub start: usize,
    /// Last result index, exclusive (default: start + 20).
    pub end: Option<usize>,
}

const DEFAULT_PAGE_SIZE: usize = 20;

/// One page of search results with the unpaginated total.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<ResultItem>,
    pub total: usize,
    pub start: usize,
    pub end: usize,
}

/// GET /api/search - Search articles.
pub async fn search_articles(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
) -> ApiResult<SearchResponse> {
    let end = params
        .end
        .unwrap_or_else(|| params.start.saturating_add(DEFAULT_PAGE_SIZE));
    let page = Page::new(params.start, end)?;

    let locale = parse_locale(params.locale.as_deref())?
        .unwrap_or_else(|| state.config.default_locale.clone());
    let mut criteria = SearchCriteria::new(locale);
    criteria.keywords = params.keywords;
    criteria.title = params.title;
    criteria.tag = params.tag;
    criteria.category = params.category;
    criteria.advanced_search = params.advanced;
    criteria.and_operator = params.and_operator;
    criteria.include_archived = params.archived;

    let (results, total) = state.service.search_with_total(&criteria, page).await?;

    success(SearchResponse {
        results,
        total,
        start: params.start,
        end,
    })
}
