use std::collections::{hash_map::Entry, HashMap};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::{
    engagement::EngagementSynchronizer,
    gateway::Gateway,
    models::{ContentSummary, EngagementState, WeightTable},
    session::SessionStore,
};

/// Synchronizers for the posts currently in view, keyed by slug
///
/// State is seeded from the latest fetched snapshot when a post enters view
/// and dropped when it leaves; nothing persists between views.
#[derive(Clone)]
pub struct EngagementRegistry {
    gateway: Arc<dyn Gateway>,
    session: Arc<dyn SessionStore>,
    weights: WeightTable,
    items: Arc<RwLock<HashMap<String, Arc<EngagementSynchronizer>>>>,
}

impl EngagementRegistry {
    pub fn new(
        gateway: Arc<dyn Gateway>,
        session: Arc<dyn SessionStore>,
        weights: WeightTable,
    ) -> Self {
        Self {
            gateway,
            session,
            weights,
            items: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Brings a post into view, or re-seeds it if already there
    pub async fn attach(&self, summary: &ContentSummary) -> Arc<EngagementSynchronizer> {
        let seed = EngagementState::from(summary);

        let existing = self.items.read().await.get(&summary.slug).cloned();
        if let Some(sync) = existing {
            sync.initialize(seed).await;
            return sync;
        }

        let (sync, inserted) = {
            let mut items = self.items.write().await;
            match items.entry(summary.slug.clone()) {
                Entry::Occupied(entry) => (entry.get().clone(), false),
                Entry::Vacant(entry) => {
                    tracing::debug!(slug = %summary.slug, "Tracking engagement");
                    let sync = Arc::new(EngagementSynchronizer::new(
                        summary.slug.clone(),
                        seed,
                        self.gateway.clone(),
                        self.session.clone(),
                        self.weights,
                    ));
                    (entry.insert(sync).clone(), true)
                }
            }
        };

        // Another attach won the insert race; apply this snapshot too
        if !inserted {
            sync.initialize(seed).await;
        }
        sync
    }

    /// Attaches every post of a freshly fetched list
    pub async fn attach_all(&self, summaries: &[ContentSummary]) {
        for summary in summaries {
            self.attach(summary).await;
        }
    }

    pub async fn get(&self, slug: &str) -> Option<Arc<EngagementSynchronizer>> {
        self.items.read().await.get(slug).cloned()
    }

    /// Drops a post's state when it leaves view
    ///
    /// A toggle still in flight completes against the detached synchronizer
    /// and its result is not visible through the registry.
    pub async fn detach(&self, slug: &str) -> bool {
        let removed = self.items.write().await.remove(slug).is_some();
        if removed {
            tracing::debug!(slug = %slug, "Stopped tracking engagement");
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }
}
