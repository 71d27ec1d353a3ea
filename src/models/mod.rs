use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub mod interaction;
pub mod strategy;

pub use interaction::{InteractionKind, WeightTable, WeightTableError};
pub use strategy::{
    ListKey, ListLimits, RecommendationList, RecommendationQuery, RecommendationStrategy,
};

/// Account as embedded in posts and comments
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub id: u64,
    pub name: String,
    pub slug: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostStatus {
    Draft,
    #[default]
    Published,
}

/// Snapshot of a post as returned by list and recommendation endpoints
///
/// `is_liked` and `is_bookmarked` are scoped to the requesting user and are
/// false for anonymous requests. A snapshot is replaced wholesale by the next
/// fetch; only the engagement synchronizer tracks changes to it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentSummary {
    pub id: u64,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    pub author: User,
    #[serde(default)]
    pub featured_image: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    #[serde(default)]
    pub tags: Vec<Tag>,
    #[serde(default)]
    pub status: PostStatus,
    #[serde(rename = "views_count", default)]
    pub view_count: u64,
    #[serde(rename = "likes_count", default)]
    pub like_count: u64,
    #[serde(rename = "comments_count", default)]
    pub comment_count: u64,
    #[serde(default)]
    pub is_liked: bool,
    #[serde(default)]
    pub is_bookmarked: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
}

impl ContentSummary {
    /// Tags compared as a set, ignoring server order
    pub fn has_same_tags(&self, other: &ContentSummary) -> bool {
        let mut mine: Vec<&str> = self.tags.iter().map(|t| t.slug.as_str()).collect();
        let mut theirs: Vec<&str> = other.tags.iter().map(|t| t.slug.as_str()).collect();
        mine.sort_unstable();
        theirs.sort_unstable();
        mine == theirs
    }
}

/// Single post with body and top-level comments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentDetail {
    #[serde(flatten)]
    pub summary: ContentSummary,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: u64,
    #[serde(default)]
    pub blog: Option<u64>,
    pub author: User,
    pub content: String,
    #[serde(default)]
    pub parent: Option<u64>,
    #[serde(default)]
    pub replies: Vec<Comment>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Entry of the caller's saved-for-later list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkEntry {
    pub id: u64,
    pub blog: ContentSummary,
    pub created_at: DateTime<Utc>,
}

/// List responses arrive either bare or wrapped in a pagination envelope
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ListEnvelope<T> {
    Page {
        #[serde(default)]
        count: Option<u64>,
        #[serde(default)]
        next: Option<String>,
        #[serde(default)]
        previous: Option<String>,
        results: Vec<T>,
    },
    Bare(Vec<T>),
}

impl<T> ListEnvelope<T> {
    pub fn into_items(self) -> Vec<T> {
        match self {
            ListEnvelope::Page { results, .. } => results,
            ListEnvelope::Bare(items) => items,
        }
    }
}

/// Filters for the post list endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentFilter {
    pub category: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    pub search: Option<String>,
    pub ordering: Option<String>,
}

impl ContentFilter {
    pub fn to_query(&self) -> Vec<(String, String)> {
        [
            ("category", &self.category),
            ("tag", &self.tag),
            ("author", &self.author),
            ("search", &self.search),
            ("ordering", &self.ordering),
        ]
        .into_iter()
        .filter_map(|(name, value)| {
            value
                .as_ref()
                .filter(|v| !v.trim().is_empty())
                .map(|v| (name.to_string(), v.clone()))
        })
        .collect()
    }
}

/// Body for creating a post
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewPost {
    pub title: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<u64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<u64>,
    pub status: PostStatus,
}

/// Partial update for an existing post
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PostUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excerpt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<u64>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<PostStatus>,
}

/// Post fields echoed back after a create or update
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SavedPost {
    pub id: u64,
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub status: PostStatus,
}

// ============================================================================
// Engagement Types
// ============================================================================

/// Server response to a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggle {
    pub liked: bool,
    #[serde(alias = "likes_count", alias = "likeCount")]
    pub like_count: u64,
}

/// Server response to a bookmark toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookmarkToggle {
    pub bookmarked: bool,
}

/// Per-post engagement as last confirmed by the server
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngagementState {
    pub liked: bool,
    pub like_count: u64,
    pub bookmarked: bool,
}

impl From<&ContentSummary> for EngagementState {
    fn from(summary: &ContentSummary) -> Self {
        Self {
            liked: summary.is_liked,
            like_count: summary.like_count,
            bookmarked: summary.is_bookmarked,
        }
    }
}

// ============================================================================
// Auth Types
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub password: String,
}

/// Partial update of the signed-in user's profile
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
}

/// Response of login and register: an API token plus the account
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AuthToken {
    pub token: String,
    #[serde(default)]
    pub user: Option<User>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use serde_json::{json, Value};

    /// Post JSON shaped like the list serializer output
    pub fn summary_json(id: u64, slug: &str) -> Value {
        json!({
            "id": id,
            "title": format!("Post {}", slug),
            "slug": slug,
            "author": { "id": 7, "username": "ada" },
            "excerpt": "An excerpt",
            "featured_image": null,
            "category": { "id": 1, "name": "Rust", "slug": "rust", "description": "" },
            "tags": [
                { "id": 2, "name": "async", "slug": "async" },
                { "id": 3, "name": "tokio", "slug": "tokio" }
            ],
            "status": "published",
            "views_count": 120,
            "likes_count": 9,
            "comments_count": 2,
            "is_liked": false,
            "is_bookmarked": true,
            "created_at": "2024-05-01T10:00:00Z",
            "published_at": "2024-05-01T12:00:00+00:00"
        })
    }
}
