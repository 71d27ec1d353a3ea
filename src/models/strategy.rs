use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use super::ContentSummary;

/// Recommendation retrieval mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecommendationStrategy {
    /// Ranked by the requesting user's inferred preference
    Personalized,
    /// Ranked by similarity to an anchor post
    SimilarToItem,
    /// Ranked by recent aggregate engagement over a lookback window
    Trending,
}

impl RecommendationStrategy {
    pub fn requires_anchor(&self) -> bool {
        match self {
            RecommendationStrategy::Personalized => false,
            RecommendationStrategy::SimilarToItem => true,
            RecommendationStrategy::Trending => false,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RecommendationStrategy::Personalized => "personalized",
            RecommendationStrategy::SimilarToItem => "similar",
            RecommendationStrategy::Trending => "trending",
        }
    }
}

impl Display for RecommendationStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Default result sizes per strategy, plus the trending lookback window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListLimits {
    pub personalized: u32,
    pub similar: u32,
    pub trending: u32,
    pub trending_days: u32,
}

impl Default for ListLimits {
    fn default() -> Self {
        Self {
            personalized: 6,
            similar: 4,
            trending: 6,
            trending_days: 7,
        }
    }
}

impl ListLimits {
    pub fn limit_for(&self, strategy: RecommendationStrategy) -> u32 {
        match strategy {
            RecommendationStrategy::Personalized => self.personalized,
            RecommendationStrategy::SimilarToItem => self.similar,
            RecommendationStrategy::Trending => self.trending,
        }
    }
}

/// Parameters for one recommendation fetch
///
/// `limit` and `days` fall back to the configured defaults when unset.
/// `days` only applies to the trending strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecommendationQuery {
    pub strategy: RecommendationStrategy,
    pub anchor: Option<String>,
    pub limit: Option<u32>,
    pub days: Option<u32>,
}

impl RecommendationQuery {
    pub fn new(strategy: RecommendationStrategy) -> Self {
        Self {
            strategy,
            anchor: None,
            limit: None,
            days: None,
        }
    }

    pub fn personalized() -> Self {
        Self::new(RecommendationStrategy::Personalized)
    }

    pub fn similar_to(slug: impl Into<String>) -> Self {
        Self::new(RecommendationStrategy::SimilarToItem).with_anchor(slug)
    }

    pub fn trending() -> Self {
        Self::new(RecommendationStrategy::Trending)
    }

    pub fn with_anchor(mut self, slug: impl Into<String>) -> Self {
        self.anchor = Some(slug.into());
        self
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }

    /// Anchor slug with surrounding whitespace removed; blank counts as absent
    pub fn anchor_slug(&self) -> Option<&str> {
        self.anchor
            .as_deref()
            .map(str::trim)
            .filter(|anchor| !anchor.is_empty())
    }

    pub fn key(&self) -> ListKey {
        ListKey {
            strategy: self.strategy,
            anchor: self.anchor_slug().map(str::to_string),
        }
    }
}

/// Identity of a recommendation list: one strategy/anchor pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListKey {
    pub strategy: RecommendationStrategy,
    pub anchor: Option<String>,
}

impl Display for ListKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.anchor {
            Some(anchor) => write!(f, "recs:{}:{}", self.strategy, anchor),
            None => write!(f, "recs:{}", self.strategy),
        }
    }
}

/// Ordered recommendation result, exactly as ranked by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationList {
    pub strategy: RecommendationStrategy,
    pub anchor: Option<String>,
    pub items: Vec<ContentSummary>,
    pub fetched_at: DateTime<Utc>,
}

impl RecommendationList {
    pub fn key(&self) -> ListKey {
        ListKey {
            strategy: self.strategy,
            anchor: self.anchor.clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn slugs(&self) -> Vec<&str> {
        self.items.iter().map(|item| item.slug.as_str()).collect()
    }
}
