// src/db/api_key_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::CredentialLookup, models::crm::AlbumCredential};

// Chaves de API do serviço de álbuns, uma por usuário
#[derive(Clone)]
pub struct ApiKeyRepository {
    pool: PgPool,
}

impl ApiKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_by_user(&self, user_id: Uuid) -> Result<AlbumCredential, AppError> {
        sqlx::query_as::<_, AlbumCredential>(
            "SELECT key, user_id FROM api_keys WHERE user_id = $1 LIMIT 1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("chave de API do serviço de álbuns"))
    }
}

#[async_trait]
impl CredentialLookup for ApiKeyRepository {
    async fn find_credential(&self, user_id: Uuid) -> Result<AlbumCredential, AppError> {
        self.find_by_user(user_id).await
    }
}
