pub mod config;
pub mod engagement;
pub mod error;
pub mod gateway;
pub mod models;
pub mod services;
pub mod session;

pub use config::Config;
pub use engagement::{EngagementField, EngagementRegistry, EngagementSynchronizer, FieldPhase};
pub use error::{FieldErrors, GatewayError, GatewayResult};
pub use gateway::{Gateway, GatewayRequest, GatewayResponse, HttpGateway};
pub use services::{
    AuthService, ContentService, FeedState, RecommendationFeed, RecommendationService,
};
pub use session::{MemorySession, SessionStore};
