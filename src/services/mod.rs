pub mod auth;
pub mod content;
pub mod feed;
pub mod recommendations;

pub use auth::AuthService;
pub use content::ContentService;
pub use feed::{FeedState, RecommendationFeed};
pub use recommendations::RecommendationService;
