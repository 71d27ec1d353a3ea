use std::sync::RwLock;

/// Source of the caller's API credential
///
/// The store itself lives outside this crate; the gateway only reads from it,
/// and the auth service writes the token obtained at login.
#[cfg_attr(test, mockall::automock)]
pub trait SessionStore: Send + Sync {
    /// Current API token, `None` when anonymous
    fn token(&self) -> Option<String>;

    /// Replaces the stored token (`None` signs out)
    fn set_token(&self, token: Option<String>);
}

/// Process-local session store
#[derive(Debug, Default)]
pub struct MemorySession {
    token: RwLock<Option<String>>,
}

impl MemorySession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts signed in, or anonymous when `token` is blank
    pub fn with_token(token: impl Into<String>) -> Self {
        let token: String = token.into();
        Self {
            token: RwLock::new(Some(token).filter(|t| !t.trim().is_empty())),
        }
    }
}

impl SessionStore for MemorySession {
    fn token(&self) -> Option<String> {
        match self.token.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn set_token(&self, token: Option<String>) {
        let token = token.filter(|t| !t.trim().is_empty());
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }
}
