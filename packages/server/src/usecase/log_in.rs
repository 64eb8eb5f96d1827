//! UseCase: ログイン
//!
//! ユーザー名とパスワードを検証し、新しいセッションを発行します。
//! 存在しないユーザーとパスワード不一致は区別せず `InvalidCredentials` を返します。

use std::sync::Arc;

use crate::domain::{PasswordHasher, SessionToken, UserRepository, Username};

use super::error::LogInError;

/// ログインのユースケース
pub struct LogInUseCase {
    repository: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl LogInUseCase {
    pub fn new(repository: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { repository, hasher }
    }

    pub async fn execute(
        &self,
        username: String,
        password: String,
    ) -> Result<(Username, SessionToken), LogInError> {
        let username = Username::new(username).map_err(|_| LogInError::InvalidCredentials)?;

        let user = self
            .repository
            .get_user(&username)
            .await?
            .ok_or(LogInError::InvalidCredentials)?;

        if !self.hasher.verify(&password, &user.hashed_password).await {
            tracing::debug!("Password mismatch for '{}'", username);
            return Err(LogInError::InvalidCredentials);
        }

        let token = SessionToken::generate();
        self.repository.create_session(&token, &user.username).await?;

        tracing::info!("User '{}' logged in", user.username);
        Ok((user.username, token))
    }
}
