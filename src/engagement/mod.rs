use serde::de::DeserializeOwned;
use std::{
    fmt::Display,
    sync::{
        atomic::{AtomicU32, AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::{Mutex, RwLock};

use crate::{
    error::{GatewayError, GatewayResult},
    gateway::{Gateway, GatewayRequest},
    models::{BookmarkToggle, EngagementState, InteractionKind, LikeToggle, WeightTable},
    session::SessionStore,
};

pub mod registry;

pub use registry::EngagementRegistry;

/// Independently toggled relationship between the user and a post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngagementField {
    Like,
    Bookmark,
}

impl EngagementField {
    fn path(&self, slug: &str) -> String {
        match self {
            EngagementField::Like => format!("/blogs/{}/like/", slug),
            EngagementField::Bookmark => format!("/blogs/{}/bookmark/", slug),
        }
    }

    fn interaction(&self) -> InteractionKind {
        match self {
            EngagementField::Like => InteractionKind::Like,
            EngagementField::Bookmark => InteractionKind::Bookmark,
        }
    }
}

impl Display for EngagementField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngagementField::Like => write!(f, "like"),
            EngagementField::Bookmark => write!(f, "bookmark"),
        }
    }
}

/// Request lifecycle of one field
///
/// `request_id` is the most recently issued toggle, `queued` counts toggles
/// waiting behind the one on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPhase {
    Idle,
    Pending { request_id: u64, queued: u32 },
}

/// Serializes toggles of one field and tracks how many are outstanding
#[derive(Default)]
struct FieldLane {
    turn: Mutex<()>,
    outstanding: AtomicU32,
    latest: AtomicU64,
}

impl FieldLane {
    fn phase(&self) -> FieldPhase {
        match self.outstanding.load(Ordering::SeqCst) {
            0 => FieldPhase::Idle,
            n => FieldPhase::Pending {
                request_id: self.latest.load(Ordering::SeqCst),
                queued: n - 1,
            },
        }
    }

    fn is_idle(&self) -> bool {
        self.phase() == FieldPhase::Idle
    }

    fn begin(&self, request_id: u64) -> LaneTicket<'_> {
        self.latest.store(request_id, Ordering::SeqCst);
        self.outstanding.fetch_add(1, Ordering::SeqCst);
        LaneTicket { lane: self }
    }
}

/// Marks a toggle as outstanding until dropped, including when the caller
/// abandons the future mid-flight
struct LaneTicket<'a> {
    lane: &'a FieldLane,
}

impl Drop for LaneTicket<'_> {
    fn drop(&mut self) {
        self.lane.outstanding.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Keeps one post's like and bookmark state in step with the server
///
/// Toggles are never applied optimistically: local state changes only to the
/// values the server returns. Toggles of the same field are issued one at a
/// time in the order they were started, so the last started toggle always
/// determines the final state. Like and bookmark lanes are independent.
pub struct EngagementSynchronizer {
    slug: String,
    gateway: Arc<dyn Gateway>,
    session: Arc<dyn SessionStore>,
    weights: WeightTable,
    state: RwLock<EngagementState>,
    next_request_id: AtomicU64,
    like: FieldLane,
    bookmark: FieldLane,
}

impl EngagementSynchronizer {
    pub fn new(
        slug: impl Into<String>,
        seed: EngagementState,
        gateway: Arc<dyn Gateway>,
        session: Arc<dyn SessionStore>,
        weights: WeightTable,
    ) -> Self {
        Self {
            slug: slug.into(),
            gateway,
            session,
            weights,
            state: RwLock::new(seed),
            next_request_id: AtomicU64::new(0),
            like: FieldLane::default(),
            bookmark: FieldLane::default(),
        }
    }

    pub fn slug(&self) -> &str {
        &self.slug
    }

    pub async fn state(&self) -> EngagementState {
        *self.state.read().await
    }

    pub fn phase(&self, field: EngagementField) -> FieldPhase {
        self.lane(field).phase()
    }

    fn lane(&self, field: EngagementField) -> &FieldLane {
        match field {
            EngagementField::Like => &self.like,
            EngagementField::Bookmark => &self.bookmark,
        }
    }

    /// Re-seeds local state from a fresh snapshot
    ///
    /// Overwrites every field whose lane is idle. A field with a toggle in
    /// flight keeps its value; the pending server response will settle it.
    pub async fn initialize(&self, seed: EngagementState) {
        let mut state = self.state.write().await;

        if self.like.is_idle() {
            state.liked = seed.liked;
            state.like_count = seed.like_count;
        } else {
            tracing::debug!(slug = %self.slug, "Like toggle in flight, keeping like state");
        }

        if self.bookmark.is_idle() {
            state.bookmarked = seed.bookmarked;
        } else {
            tracing::debug!(slug = %self.slug, "Bookmark toggle in flight, keeping bookmark state");
        }
    }

    /// Toggles the like and adopts the server's `liked` and count verbatim
    pub async fn toggle_like(&self) -> GatewayResult<LikeToggle> {
        self.toggle(EngagementField::Like, |state, toggle: &LikeToggle| {
            state.liked = toggle.liked;
            state.like_count = toggle.like_count;
            toggle.liked
        })
        .await
    }

    /// Toggles the bookmark and adopts the server's `bookmarked` verbatim
    pub async fn toggle_bookmark(&self) -> GatewayResult<BookmarkToggle> {
        self.toggle(EngagementField::Bookmark, |state, toggle: &BookmarkToggle| {
            state.bookmarked = toggle.bookmarked;
            toggle.bookmarked
        })
        .await
    }

    /// Issues one toggle on the field's lane and applies the response while
    /// still holding the lane, so a queued toggle cannot land first.
    ///
    /// `apply` writes the server values and reports whether the relationship
    /// is now on.
    async fn toggle<T, F>(&self, field: EngagementField, apply: F) -> GatewayResult<T>
    where
        T: DeserializeOwned,
        F: FnOnce(&mut EngagementState, &T) -> bool,
    {
        if self.session.token().is_none() {
            tracing::debug!(slug = %self.slug, field = %field, "Toggle refused for anonymous session");
            return Err(GatewayError::Unauthorized(format!(
                "sign in to {} posts",
                field
            )));
        }

        let lane = self.lane(field);
        let request_id = self.next_request_id.fetch_add(1, Ordering::SeqCst) + 1;
        let _ticket = lane.begin(request_id);
        let _turn = lane.turn.lock().await;

        tracing::debug!(
            slug = %self.slug,
            field = %field,
            request_id = request_id,
            "Issuing toggle"
        );

        let response = self
            .gateway
            .request(GatewayRequest::post(field.path(&self.slug)))
            .await
            .and_then(|response| response.json::<T>())
            .map_err(|e| {
                tracing::warn!(
                    slug = %self.slug,
                    field = %field,
                    request_id = request_id,
                    error = %e,
                    "Toggle failed, state left unchanged"
                );
                e
            })?;

        let now_on = {
            let mut state = self.state.write().await;
            apply(&mut *state, &response)
        };

        if now_on {
            self.weights.record(field.interaction(), &self.slug);
        }

        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        gateway::{testing::ScriptedGateway, GatewayResponse, MockGateway},
        session::{MemorySession, MockSessionStore},
    };
    use serde_json::json;
    use std::{sync::atomic::Ordering, time::Duration};

    fn seed(liked: bool, like_count: u64, bookmarked: bool) -> EngagementState {
        EngagementState {
            liked,
            like_count,
            bookmarked,
        }
    }

    fn like_reply(liked: bool, count: u64) -> GatewayResult<GatewayResponse> {
        Ok(GatewayResponse::ok(json!({ "liked": liked, "likes_count": count })))
    }

    fn bookmark_reply(bookmarked: bool) -> GatewayResult<GatewayResponse> {
        Ok(GatewayResponse::ok(json!({ "bookmarked": bookmarked })))
    }

    fn synchronizer(gateway: Arc<dyn Gateway>, initial: EngagementState) -> EngagementSynchronizer {
        EngagementSynchronizer::new(
            "rust-ownership",
            initial,
            gateway,
            Arc::new(MemorySession::with_token("token")),
            WeightTable::default(),
        )
    }

    #[tokio::test]
    async fn test_toggle_like_adopts_server_values() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request()
            .withf(|req| {
                req.method == crate::gateway::Method::Post && req.path == "/blogs/rust-ownership/like/"
            })
            .times(1)
            .returning(|_| like_reply(true, 13));

        let sync = synchronizer(Arc::new(gateway), seed(false, 12, false));
        let toggle = sync.toggle_like().await.unwrap();

        assert_eq!(
            toggle,
            LikeToggle {
                liked: true,
                like_count: 13
            }
        );
        assert_eq!(sync.state().await, seed(true, 13, false));
    }

    #[tokio::test]
    async fn test_toggle_like_uses_server_count_not_local_increment() {
        // Another reader liked the post in the meantime
        let mut gateway = MockGateway::new();
        gateway
            .expect_request()
            .times(1)
            .returning(|_| like_reply(true, 20));

        let sync = synchronizer(Arc::new(gateway), seed(false, 12, false));
        sync.toggle_like().await.unwrap();

        assert_eq!(sync.state().await.like_count, 20);
    }

    #[tokio::test]
    async fn test_failed_toggle_leaves_state_unchanged() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request()
            .times(1)
            .returning(|_| Err(GatewayError::Timeout(Duration::from_secs(10))));

        let sync = synchronizer(Arc::new(gateway), seed(true, 5, true));
        let err = sync.toggle_like().await.unwrap_err();

        assert_eq!(err, GatewayError::Timeout(Duration::from_secs(10)));
        assert_eq!(sync.state().await, seed(true, 5, true));
        assert_eq!(sync.phase(EngagementField::Like), FieldPhase::Idle);
    }

    #[tokio::test]
    async fn test_malformed_toggle_response_is_server_fault() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request()
            .times(1)
            .returning(|_| Ok(GatewayResponse::ok(json!({ "ok": true }))));

        let sync = synchronizer(Arc::new(gateway), seed(false, 1, false));
        let err = sync.toggle_like().await.unwrap_err();

        assert!(matches!(err, GatewayError::ServerFault { .. }));
        assert_eq!(sync.state().await, seed(false, 1, false));
    }

    #[tokio::test]
    async fn test_toggle_bookmark_independent_of_like() {
        let mut gateway = MockGateway::new();
        gateway
            .expect_request()
            .withf(|req| req.path == "/blogs/rust-ownership/bookmark/")
            .times(1)
            .returning(|_| bookmark_reply(true));

        let sync = synchronizer(Arc::new(gateway), seed(true, 4, false));
        let toggle = sync.toggle_bookmark().await.unwrap();

        assert_eq!(toggle, BookmarkToggle { bookmarked: true });
        assert_eq!(sync.state().await, seed(true, 4, true));
    }

    #[tokio::test]
    async fn test_anonymous_toggles_never_reach_gateway() {
        let mut gateway = MockGateway::new();
        gateway.expect_request().times(0);

        let mut session = MockSessionStore::new();
        session.expect_token().returning(|| None);

        let sync = EngagementSynchronizer::new(
            "rust-ownership",
            seed(false, 3, false),
            Arc::new(gateway),
            Arc::new(session),
            WeightTable::default(),
        );

        let like_err = sync.toggle_like().await.unwrap_err();
        let bookmark_err = sync.toggle_bookmark().await.unwrap_err();

        assert!(like_err.is_unauthorized());
        assert!(bookmark_err.is_unauthorized());
        assert_eq!(sync.state().await, seed(false, 3, false));
    }

    #[tokio::test]
    async fn test_overlapping_like_toggles_last_started_wins() {
        // The first reply is slower than the second; fired concurrently, the
        // first would land last and revert the visible state.
        let delay_pairs = [(60, 5), (5, 60), (30, 30), (0, 40)];

        for (first_delay, second_delay) in delay_pairs {
            let gateway = Arc::new(ScriptedGateway::new(vec![
                (first_delay, like_reply(true, 8)),
                (second_delay, like_reply(false, 7)),
            ]));
            let sync = synchronizer(gateway.clone(), seed(false, 7, false));

            let (first, second) = tokio::join!(sync.toggle_like(), sync.toggle_like());

            assert_eq!(first.unwrap().liked, true);
            assert_eq!(second.unwrap().liked, false);
            assert_eq!(sync.state().await, seed(false, 7, false));
            assert_eq!(gateway.max_in_flight.load(Ordering::SeqCst), 1);
            assert_eq!(sync.phase(EngagementField::Like), FieldPhase::Idle);
        }
    }

    #[tokio::test]
    async fn test_three_queued_toggles_settle_on_last() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            (40, like_reply(true, 2)),
            (20, like_reply(false, 1)),
            (1, like_reply(true, 3)),
        ]));
        let sync = synchronizer(gateway.clone(), seed(false, 1, false));

        let (a, b, c) = tokio::join!(sync.toggle_like(), sync.toggle_like(), sync.toggle_like());

        assert!(a.is_ok() && b.is_ok() && c.is_ok());
        assert_eq!(sync.state().await, seed(true, 3, false));
        assert_eq!(gateway.call_count(), 3);
        assert_eq!(gateway.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_later_failure_keeps_earlier_server_value() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            (20, like_reply(true, 6)),
            (1, Err(GatewayError::Unreachable("connection refused".to_string()))),
        ]));
        let sync = synchronizer(gateway, seed(false, 5, false));

        let (first, second) = tokio::join!(sync.toggle_like(), sync.toggle_like());

        assert!(first.is_ok());
        assert!(matches!(second, Err(GatewayError::Unreachable(_))));
        assert_eq!(sync.state().await, seed(true, 6, false));
    }

    #[tokio::test]
    async fn test_like_and_bookmark_lanes_run_concurrently() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            (30, like_reply(true, 2)),
            (30, bookmark_reply(true)),
        ]));
        let sync = synchronizer(gateway.clone(), seed(false, 1, false));

        let (like, bookmark) = tokio::join!(sync.toggle_like(), sync.toggle_bookmark());

        assert!(like.is_ok() && bookmark.is_ok());
        assert_eq!(sync.state().await, seed(true, 2, true));
        assert_eq!(gateway.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_initialize_overwrites_idle_state() {
        let gateway = Arc::new(ScriptedGateway::default());
        let sync = synchronizer(gateway, seed(false, 1, false));

        sync.initialize(seed(true, 40, true)).await;
        assert_eq!(sync.state().await, seed(true, 40, true));

        sync.initialize(seed(false, 39, false)).await;
        assert_eq!(sync.state().await, seed(false, 39, false));
    }

    #[tokio::test]
    async fn test_initialize_skips_field_with_toggle_in_flight() {
        let gateway = Arc::new(ScriptedGateway::new(vec![(50, like_reply(true, 11))]));
        let sync = Arc::new(synchronizer(gateway, seed(false, 10, false)));

        let toggling = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.toggle_like().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(matches!(
            sync.phase(EngagementField::Like),
            FieldPhase::Pending { queued: 0, .. }
        ));

        // Stale snapshot arrives while the like is on the wire
        sync.initialize(seed(false, 10, true)).await;
        assert_eq!(sync.state().await, seed(false, 10, true));

        toggling.await.unwrap().unwrap();
        assert_eq!(sync.state().await, seed(true, 11, true));
        assert_eq!(sync.phase(EngagementField::Like), FieldPhase::Idle);
    }

    #[tokio::test]
    async fn test_phase_counts_queued_toggles() {
        let gateway = Arc::new(ScriptedGateway::new(vec![
            (50, like_reply(true, 1)),
            (1, like_reply(false, 0)),
        ]));
        let sync = Arc::new(synchronizer(gateway, seed(false, 0, false)));

        let first = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.toggle_like().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = {
            let sync = sync.clone();
            tokio::spawn(async move { sync.toggle_like().await })
        };
        tokio::time::sleep(Duration::from_millis(5)).await;

        assert_eq!(
            sync.phase(EngagementField::Like),
            FieldPhase::Pending {
                request_id: 2,
                queued: 1
            }
        );
        assert_eq!(sync.phase(EngagementField::Bookmark), FieldPhase::Idle);

        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();
        assert_eq!(sync.state().await, seed(false, 0, false));
    }
}
