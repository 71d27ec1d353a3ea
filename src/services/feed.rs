use std::sync::Arc;
use tokio::sync::Mutex;

use crate::{
    error::GatewayError,
    models::{ContentSummary, ListKey, RecommendationList, RecommendationQuery},
    services::recommendations::RecommendationService,
};

/// What a recommendation section shows
#[derive(Debug, Clone, PartialEq)]
pub enum FeedState {
    Pending,
    /// Fetched list, possibly empty
    Populated(RecommendationList),
    Failed(GatewayError),
}

impl FeedState {
    pub fn items(&self) -> &[ContentSummary] {
        match self {
            FeedState::Populated(list) => &list.items,
            FeedState::Pending | FeedState::Failed(_) => &[],
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, FeedState::Pending)
    }
}

struct FeedInner {
    generation: u64,
    active: Option<RecommendationQuery>,
    state: FeedState,
}

/// State behind one recommendation section
///
/// Selecting a query clears the previous list immediately. A response that
/// arrives after a newer selection is discarded, so a slow earlier fetch can
/// never replace what a later one put on screen.
pub struct RecommendationFeed {
    service: Arc<RecommendationService>,
    inner: Mutex<FeedInner>,
}

impl RecommendationFeed {
    pub fn new(service: Arc<RecommendationService>) -> Self {
        Self {
            service,
            inner: Mutex::new(FeedInner {
                generation: 0,
                active: None,
                state: FeedState::Pending,
            }),
        }
    }

    /// Switches the section to `query` and fetches it
    ///
    /// Returns the state on screen once this fetch settles, which is a newer
    /// selection's state if one was made in the meantime.
    pub async fn show(&self, query: RecommendationQuery) -> FeedState {
        let generation = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            inner.active = Some(query.clone());
            inner.state = FeedState::Pending;
            inner.generation
        };

        let result = self.service.fetch(&query).await;

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            tracing::debug!(
                strategy = %query.strategy,
                anchor = ?query.anchor,
                "Discarding stale recommendation response"
            );
            return inner.state.clone();
        }

        inner.state = match result {
            Ok(list) => FeedState::Populated(list),
            Err(e) => FeedState::Failed(e),
        };
        inner.state.clone()
    }

    /// Fetches the active query again, e.g. after a user-triggered retry
    pub async fn refresh(&self) -> Option<FeedState> {
        let active = self.inner.lock().await.active.clone()?;
        Some(self.show(active).await)
    }

    pub async fn current(&self) -> FeedState {
        self.inner.lock().await.state.clone()
    }

    pub async fn active_key(&self) -> Option<ListKey> {
        self.inner
            .lock()
            .await
            .active
            .as_ref()
            .map(RecommendationQuery::key)
    }
}
