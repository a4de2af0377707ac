// src/db/user_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::UserLookup, models::crm::UserSummary};

// O repositório de usuários. Aqui só lemos a projeção usada nas respostas.
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // Busca um usuário pelo seu ID (com o nome do departamento)
    pub async fn find_summary_by_id(&self, id: Uuid) -> Result<Option<UserSummary>, AppError> {
        let user = sqlx::query_as::<_, UserSummary>(
            r#"
            SELECT u.id, u.full_name, d.name AS dept_name, u.phone
            FROM users u
            LEFT JOIN departments d ON d.id = u.dept_id
            WHERE u.id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(user)
    }
}

#[async_trait]
impl UserLookup for UserRepository {
    async fn lookup_user(&self, id: Uuid) -> Result<UserSummary, AppError> {
        self.find_summary_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("usuário {}", id)))
    }
}
