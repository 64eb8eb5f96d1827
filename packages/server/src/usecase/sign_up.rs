//! UseCase: アカウント登録
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - SignUpUseCase::execute() メソッド
//! - ユーザー作成とセッション発行
//!
//! ### なぜこのテストが必要か
//! - ユーザー名の重複を防ぐ
//! - パスワードが平文で保存されないことを保証
//!
//! ### どのような状況を想定しているか
//! - 正常系：新規ユーザーの登録
//! - 異常系：既存ユーザー名、不正なユーザー名、空のパスワード

use std::sync::Arc;

use crate::domain::{PasswordHasher, RepositoryError, SessionToken, User, UserRepository, Username};

use super::error::SignUpError;

/// アカウント登録のユースケース
pub struct SignUpUseCase {
    repository: Arc<dyn UserRepository>,
    hasher: Arc<dyn PasswordHasher>,
}

impl SignUpUseCase {
    pub fn new(repository: Arc<dyn UserRepository>, hasher: Arc<dyn PasswordHasher>) -> Self {
        Self { repository, hasher }
    }

    /// ユーザーを作成し、新しいセッションを発行する
    ///
    /// # Returns
    ///
    /// * `Ok((Username, SessionToken))` - 登録成功
    /// * `Err(SignUpError)` - 登録失敗
    pub async fn execute(
        &self,
        username: String,
        password: String,
    ) -> Result<(Username, SessionToken), SignUpError> {
        let username = Username::new(username)?;
        if password.is_empty() {
            return Err(SignUpError::EmptyPassword);
        }

        if self
            .repository
            .get_user(&username)
            .await
            .map_err(SignUpError::Repository)?
            .is_some()
        {
            return Err(SignUpError::UsernameTaken(username.into_string()));
        }

        let hashed_password = self.hasher.hash(&password).await?;
        let user = User {
            username: username.clone(),
            hashed_password,
        };
        self.repository
            .create_user(&user)
            .await
            .map_err(|e| match e {
                // 同時登録で先を越された場合
                RepositoryError::Conflict(_) => {
                    SignUpError::UsernameTaken(username.as_str().to_string())
                }
                other => SignUpError::Repository(other),
            })?;

        let token = SessionToken::generate();
        self.repository
            .create_session(&token, &username)
            .await
            .map_err(SignUpError::Repository)?;

        tracing::info!("User '{}' signed up", username);
        Ok((username, token))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{password::BcryptPasswordHasher, repository::InMemoryStore};

    fn create_test_usecase() -> (SignUpUseCase, Arc<InMemoryStore>) {
        let store = Arc::new(InMemoryStore::new());
        let usecase = SignUpUseCase::new(store.clone(), Arc::new(BcryptPasswordHasher::new(4)));
        (usecase, store)
    }

    #[tokio::test]
    async fn test_sign_up_creates_user_and_session() {
        // テスト項目: 登録でユーザーが作成され、セッションが有効になる
        // given (前提条件):
        let (usecase, store) = create_test_usecase();

        // when (操作):
        let (username, token) = usecase
            .execute("alice".to_string(), "secret".to_string())
            .await
            .unwrap();

        // then (期待する結果):
        let user = store.get_user_by_session(&token).await.unwrap().unwrap();
        assert_eq!(user.username, username);
        assert_ne!(user.hashed_password, "secret");
    }

    #[tokio::test]
    async fn test_sign_up_rejects_taken_username() {
        // テスト項目: 既存のユーザー名では登録できない
        // given (前提条件):
        let (usecase, _store) = create_test_usecase();
        usecase
            .execute("alice".to_string(), "secret".to_string())
            .await
            .unwrap();

        // when (操作):
        let result = usecase
            .execute("alice".to_string(), "other".to_string())
            .await;

        // then (期待する結果):
        assert!(matches!(result, Err(SignUpError::UsernameTaken(name)) if name == "alice"));
    }

    #[tokio::test]
    async fn test_sign_up_validates_input() {
        // テスト項目: 不正なユーザー名と空のパスワードは拒否される
        // given (前提条件):
        let (usecase, _store) = create_test_usecase();

        // when (操作):
        let blank_name = usecase.execute("   ".to_string(), "secret".to_string()).await;
        let empty_password = usecase.execute("bob".to_string(), String::new()).await;

        // then (期待する結果):
        assert!(matches!(blank_name, Err(SignUpError::InvalidUsername(_))));
        assert!(matches!(empty_password, Err(SignUpError::EmptyPassword)));
    }
}
