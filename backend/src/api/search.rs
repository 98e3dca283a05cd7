//! Search API endpoints.

use axum::extract::{Query, State};
use serde::{Deserialize, Serialize};

use super::{error, success, ApiResult};
use crate::models::{TimelineEvent, WeeklyReport};
use crate::search::DocKind;
use crate::AppState;

/// Search query parameters.
#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    /// Search query string.
    pub q: String,
    /// Maximum number of results (default: 20).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

fn default_limit() -> usize {
    20
}

/// Search result with matched records and metadata.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub results: Vec<SearchResultItem>,
    pub total: usize,
    pub limit: usize,
    pub offset: usize,
}

/// The record behind a hit, tagged by kind.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", content = "item", rename_all = "lowercase")]
pub enum SearchHit {
    Report(WeeklyReport),
    Event(TimelineEvent),
}

/// Single search result item.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResultItem {
    #[serde(flatten)]
    pub hit: SearchHit,
    pub score: f32,
}

/// Maximum number of search results allowed.
const MAX_SEARCH_LIMIT: usize = 100;

/// GET /api/search - Full-text search over reports and timeline events.
pub async fn search(
    State(state): State<AppState>,
    Query(params): Query<SearchQuery>,
) -> ApiResult<SearchResponse> {
    let revision_id = state.repo.get_revision_id().await.unwrap_or(0);

    // Limit the maximum number of results
    let limit = params.limit.min(MAX_SEARCH_LIMIT);

    let search_results = match state.search.search(&params.q, limit, params.offset) {
        Ok(results) => results,
        Err(e) => return error(e, revision_id),
    };

    // Hits whose record was deleted since indexing are skipped
    let mut results = Vec::new();
    for sr in search_results {
        let hit = match sr.kind {
            DocKind::Report => state.repo.get_report(&sr.id).await.ok().flatten().map(SearchHit::Report),
            DocKind::Event => state.repo.get_event(&sr.id).await.ok().flatten().map(SearchHit::Event),
        };
        if let Some(hit) = hit {
            results.push(SearchResultItem {
                hit,
                score: sr.score,
            });
        }
    }

    let total = results.len();

    success(
        SearchResponse {
            results,
            total,
            limit,
            offset: params.offset,
        },
        revision_id,
    )
}
