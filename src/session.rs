use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::info;

use crate::client::TrackerApi;
use crate::error::AppError;
use crate::models::{LoginRequest, Role, User};

/// Who is signed in. The token itself stays in the client's cookie jar.
pub struct Session {
    api: Arc<dyn TrackerApi>,
    user: RwLock<Option<User>>,
}

impl Session {
    pub fn new(api: Arc<dyn TrackerApi>) -> Self {
        Self {
            api,
            user: RwLock::new(None),
        }
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, AppError> {
        let req = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        self.api
            .login(&req)
            .await
            .map_err(|e| AppError::upstream("log in", e))?;
        let user = self
            .api
            .current_user()
            .await
            .map_err(|e| AppError::upstream("load the current user", e))?;

        info!("signed in as {} ({})", user.email, user.role.as_str());
        *self.user.write().await = Some(user.clone());
        Ok(user)
    }

    pub async fn logout(&self) {
        if let Some(user) = self.user.write().await.take() {
            info!("signed out {}", user.email);
        }
    }

    pub async fn current(&self) -> Option<User> {
        self.user.read().await.clone()
    }

    /// The signed-in user, provided they hold `role`.
    pub async fn require(&self, role: Role) -> Result<User, AppError> {
        let user = self.current().await.ok_or(AppError::Unauthorized)?;
        if user.role != role {
            return Err(AppError::Forbidden(user.role.as_str().to_string()));
        }
        Ok(user)
    }
}
