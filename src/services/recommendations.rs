use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    error::{GatewayError, GatewayResult},
    gateway::{Gateway, GatewayRequest},
    models::{
        ContentSummary, ListEnvelope, ListKey, ListLimits, RecommendationList,
        RecommendationQuery, RecommendationStrategy,
    },
};

#[derive(Default)]
struct ListCache {
    lists: HashMap<ListKey, RecommendationList>,
    /// Number of the most recently issued fetch per key
    issued: HashMap<ListKey, u64>,
}

/// Fetches ranked post lists for each recommendation strategy
///
/// The service maps a strategy to its endpoint and passes the server's
/// ordering through untouched: no sorting, deduplication or filtering. The
/// last successful list per strategy/anchor pair is kept and fully replaced
/// by the next successful fetch for that pair. A response that lands after
/// a later fetch for the same pair was issued never reaches the cache.
pub struct RecommendationService {
    gateway: Arc<dyn Gateway>,
    limits: ListLimits,
    cache: Mutex<ListCache>,
}

impl RecommendationService {
    pub fn new(gateway: Arc<dyn Gateway>, limits: ListLimits) -> Self {
        Self {
            gateway,
            limits,
            cache: Mutex::new(ListCache::default()),
        }
    }

    pub fn limits(&self) -> ListLimits {
        self.limits
    }

    /// Translates a query into its backend request
    ///
    /// Fails with `Validation` when a similar-to-item query has no anchor or
    /// the limit is zero; nothing is sent in that case.
    pub fn build_request(&self, query: &RecommendationQuery) -> GatewayResult<GatewayRequest> {
        let limit = query
            .limit
            .unwrap_or_else(|| self.limits.limit_for(query.strategy));
        if limit == 0 {
            return Err(GatewayError::invalid("limit", "must be at least 1"));
        }

        let anchor = query.anchor_slug();

        let request = match query.strategy {
            RecommendationStrategy::Personalized => {
                let request = GatewayRequest::get("/recommendations/").query("limit", limit);
                match anchor {
                    Some(anchor) => request.query("blog", anchor),
                    None => request,
                }
            }
            RecommendationStrategy::SimilarToItem => {
                let anchor = anchor.ok_or_else(|| {
                    GatewayError::invalid("anchor", "similar recommendations need an anchor post")
                })?;
                GatewayRequest::get(format!("/recommendations/similar/{}/", anchor))
                    .query("limit", limit)
            }
            RecommendationStrategy::Trending => {
                let days = query.days.unwrap_or(self.limits.trending_days);
                if days == 0 {
                    return Err(GatewayError::invalid("days", "must be at least 1"));
                }
                GatewayRequest::get("/recommendations/trending/")
                    .query("limit", limit)
                    .query("days", days)
            }
        };

        Ok(request)
    }

    /// Fetches the list for `query`, replacing any cached list for its key
    pub async fn fetch(&self, query: &RecommendationQuery) -> GatewayResult<RecommendationList> {
        let request = self.build_request(query).map_err(|e| {
            tracing::warn!(strategy = %query.strategy, error = %e, "Rejected recommendation query");
            e
        })?;

        let key = query.key();
        let ticket = {
            let mut cache = self.cache.lock().await;
            let issued = cache.issued.entry(key.clone()).or_insert(0);
            *issued += 1;
            *issued
        };

        let response = self.gateway.request(request).await.map_err(|e| {
            tracing::warn!(
                strategy = %query.strategy,
                anchor = ?key.anchor,
                error = %e,
                "Recommendation fetch failed"
            );
            e
        })?;

        let items = response.json::<ListEnvelope<ContentSummary>>()?.into_items();

        let list = RecommendationList {
            strategy: key.strategy,
            anchor: key.anchor.clone(),
            items,
            fetched_at: Utc::now(),
        };

        tracing::info!(
            strategy = %list.strategy,
            anchor = ?list.anchor,
            results = list.len(),
            "Recommendations fetched"
        );

        let mut cache = self.cache.lock().await;
        if cache.issued.get(&key) == Some(&ticket) {
            cache.lists.insert(key, list.clone());
        } else {
            tracing::debug!(
                key = %key,
                ticket = ticket,
                "Newer fetch issued, not caching stale list"
            );
        }

        Ok(list)
    }

    /// Last successfully fetched list for a strategy/anchor pair
    pub async fn cached(&self, key: &ListKey) -> Option<RecommendationList> {
        self.cache.lock().await.lists.get(key).cloned()
    }

    /// Forgets the cached list for a pair, e.g. when its view unmounts
    pub async fn evict(&self, key: &ListKey) -> bool {
        self.cache.lock().await.lists.remove(key).is_some()
    }
}
