use serde_json::json;
use std::sync::Arc;

use crate::{
    error::{GatewayError, GatewayResult},
    gateway::{Gateway, GatewayRequest},
    models::{
        BookmarkEntry, Category, Comment, ContentDetail, ContentFilter, ContentSummary,
        InteractionKind, ListEnvelope, NewPost, PostUpdate, SavedPost, Tag, WeightTable,
    },
};

/// Read and write access to posts, comments and taxonomy
pub struct ContentService {
    gateway: Arc<dyn Gateway>,
    weights: WeightTable,
}

impl ContentService {
    pub fn new(gateway: Arc<dyn Gateway>, weights: WeightTable) -> Self {
        Self { gateway, weights }
    }

    async fn get_list<T: serde::de::DeserializeOwned>(
        &self,
        request: GatewayRequest,
    ) -> GatewayResult<Vec<T>> {
        let response = self.gateway.request(request).await?;
        Ok(response.json::<ListEnvelope<T>>()?.into_items())
    }

    /// Published posts matching `filter`
    pub async fn list(&self, filter: &ContentFilter) -> GatewayResult<Vec<ContentSummary>> {
        let posts: Vec<ContentSummary> = self
            .get_list(GatewayRequest::get("/blogs/").query_pairs(filter.to_query()))
            .await?;

        tracing::debug!(results = posts.len(), filter = ?filter, "Listed posts");
        Ok(posts)
    }

    /// Posts written by the signed-in user, drafts included
    pub async fn mine(&self) -> GatewayResult<Vec<ContentSummary>> {
        self.get_list(GatewayRequest::get("/blogs/my/")).await
    }

    /// Full post with comments; counts as a view
    pub async fn get(&self, slug: &str) -> GatewayResult<ContentDetail> {
        let slug = require_slug(slug)?;
        let detail: ContentDetail = self
            .gateway
            .request(GatewayRequest::get(format!("/blogs/{}/", slug)))
            .await?
            .json()?;

        self.weights.record(InteractionKind::View, slug);
        Ok(detail)
    }

    pub async fn create(&self, post: &NewPost) -> GatewayResult<SavedPost> {
        if post.title.trim().is_empty() {
            return Err(GatewayError::invalid("title", "This field may not be blank."));
        }

        let saved: SavedPost = self
            .gateway
            .request(GatewayRequest::post("/blogs/").json(post)?)
            .await?
            .json()?;

        tracing::info!(slug = %saved.slug, status = ?saved.status, "Post created");
        Ok(saved)
    }

    pub async fn update(&self, slug: &str, update: &PostUpdate) -> GatewayResult<SavedPost> {
        let slug = require_slug(slug)?;
        let saved: SavedPost = self
            .gateway
            .request(GatewayRequest::patch(format!("/blogs/{}/", slug)).json(update)?)
            .await?
            .json()?;

        tracing::info!(slug = %saved.slug, "Post updated");
        Ok(saved)
    }

    pub async fn delete(&self, slug: &str) -> GatewayResult<()> {
        let slug = require_slug(slug)?;
        self.gateway
            .request(GatewayRequest::delete(format!("/blogs/{}/", slug)))
            .await?;

        tracing::info!(slug = %slug, "Post deleted");
        Ok(())
    }

    /// Top-level comments of a post, replies nested
    pub async fn comments(&self, slug: &str) -> GatewayResult<Vec<Comment>> {
        let slug = require_slug(slug)?;
        self.get_list(GatewayRequest::get(format!("/blogs/{}/comments/", slug)))
            .await
    }

    /// Adds a comment, or a reply when `parent` is set
    pub async fn add_comment(
        &self,
        slug: &str,
        content: &str,
        parent: Option<u64>,
    ) -> GatewayResult<Comment> {
        let slug = require_slug(slug)?;
        if content.trim().is_empty() {
            return Err(GatewayError::invalid("content", "This field may not be blank."));
        }

        let body = match parent {
            Some(parent) => json!({ "content": content, "parent": parent }),
            None => json!({ "content": content }),
        };

        let comment: Comment = self
            .gateway
            .request(GatewayRequest::post(format!("/blogs/{}/comments/", slug)).json(&body)?)
            .await?
            .json()?;

        self.weights.record(InteractionKind::Comment, slug);
        Ok(comment)
    }

    pub async fn delete_comment(&self, id: u64) -> GatewayResult<()> {
        self.gateway
            .request(GatewayRequest::delete(format!("/comments/{}/", id)))
            .await?;
        Ok(())
    }

    /// The signed-in user's saved posts
    pub async fn bookmarks(&self) -> GatewayResult<Vec<BookmarkEntry>> {
        self.get_list(GatewayRequest::get("/bookmarks/")).await
    }

    pub async fn categories(&self) -> GatewayResult<Vec<Category>> {
        self.get_list(GatewayRequest::get("/categories/")).await
    }

    pub async fn tags(&self) -> GatewayResult<Vec<Tag>> {
        self.get_list(GatewayRequest::get("/tags/")).await
    }
}

fn require_slug(slug: &str) -> GatewayResult<&str> {
    let slug = slug.trim();
    if slug.is_empty() {
        return Err(GatewayError::invalid("slug", "a post slug is required"));
    }
    Ok(slug)
}
