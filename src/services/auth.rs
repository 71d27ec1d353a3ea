use std::sync::Arc;

use crate::{
    error::{GatewayError, GatewayResult},
    gateway::{Gateway, GatewayRequest},
    models::{AuthToken, Credentials, ProfileUpdate, Registration, User},
    session::SessionStore,
};

/// Account lifecycle against the backend
///
/// Login and registration store the returned token in the session store, so
/// every later gateway call is authenticated.
pub struct AuthService {
    gateway: Arc<dyn Gateway>,
    session: Arc<dyn SessionStore>,
}

impl AuthService {
    pub fn new(gateway: Arc<dyn Gateway>, session: Arc<dyn SessionStore>) -> Self {
        Self { gateway, session }
    }

    pub fn is_signed_in(&self) -> bool {
        self.session.token().is_some()
    }

    pub async fn register(&self, registration: &Registration) -> GatewayResult<AuthToken> {
        for (field, value) in [
            ("username", &registration.username),
            ("email", &registration.email),
            ("password", &registration.password),
        ] {
            if value.trim().is_empty() {
                return Err(GatewayError::invalid(field, "This field may not be blank."));
            }
        }

        let token = self
            .exchange(GatewayRequest::post("/auth/register/").json(registration)?)
            .await?;
        tracing::info!(username = %registration.username, "Account registered");
        Ok(token)
    }

    pub async fn login(&self, credentials: &Credentials) -> GatewayResult<AuthToken> {
        let token = self
            .exchange(GatewayRequest::post("/auth/login/").json(credentials)?)
            .await?;
        tracing::info!(username = %credentials.username, "Signed in");
        Ok(token)
    }

    async fn exchange(&self, request: GatewayRequest) -> GatewayResult<AuthToken> {
        let token: AuthToken = self.gateway.request(request).await?.json()?;
        if token.token.trim().is_empty() {
            return Err(GatewayError::ServerFault {
                status: 200,
                message: "login response carried an empty token".to_string(),
            });
        }

        self.session.set_token(Some(token.token.clone()));
        Ok(token)
    }

    /// Signs out; the local token is dropped even if the server call fails
    pub async fn logout(&self) -> GatewayResult<()> {
        if !self.is_signed_in() {
            return Ok(());
        }

        let result = self.gateway.request(GatewayRequest::post("/auth/logout/")).await;
        self.session.set_token(None);

        match result {
            Ok(_) => {
                tracing::info!("Signed out");
                Ok(())
            }
            Err(e) => {
                tracing::warn!(error = %e, "Logout request failed, local session cleared");
                Err(e)
            }
        }
    }

    pub async fn profile(&self) -> GatewayResult<User> {
        if !self.is_signed_in() {
            return Err(GatewayError::Unauthorized("sign in to view your profile".to_string()));
        }
        self.gateway
            .request(GatewayRequest::get("/auth/profile/"))
            .await?
            .json()
    }

    /// Changes only the fields set in `update`
    pub async fn update_profile(&self, update: &ProfileUpdate) -> GatewayResult<User> {
        if !self.is_signed_in() {
            return Err(GatewayError::Unauthorized("sign in to edit your profile".to_string()));
        }

        let user: User = self
            .gateway
            .request(GatewayRequest::patch("/auth/profile/").json(update)?)
            .await?
            .json()?;

        tracing::info!(username = %user.username, "Profile updated");
        Ok(user)
    }
}
