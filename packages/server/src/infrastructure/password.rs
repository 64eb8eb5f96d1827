//! bcrypt password hasher.

use async_trait::async_trait;

use crate::domain::{PasswordError, PasswordHasher};

/// bcrypt を用いた `PasswordHasher` 実装
///
/// ハッシュ計算は CPU を占有するため blocking スレッドプールで実行します。
#[derive(Debug, Clone, Copy)]
pub struct BcryptPasswordHasher {
    cost: u32,
}

impl BcryptPasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptPasswordHasher {
    fn default() -> Self {
        Self::new(bcrypt::DEFAULT_COST)
    }
}

#[async_trait]
impl PasswordHasher for BcryptPasswordHasher {
    async fn hash(&self, password: &str) -> Result<String, PasswordError> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| PasswordError::Hash(e.to_string()))?
            .map_err(|e| PasswordError::Hash(e.to_string()))
    }

    async fn verify(&self, password: &str, hashed: &str) -> bool {
        let password = password.to_string();
        let hashed = hashed.to_string();
        match tokio::task::spawn_blocking(move || bcrypt::verify(password, &hashed)).await {
            Ok(Ok(matches)) => matches,
            Ok(Err(e)) => {
                tracing::warn!("Stored password hash is unreadable: {}", e);
                false
            }
            Err(e) => {
                tracing::error!("Password verification task failed: {}", e);
                false
            }
        }
    }
}
