// src/db/dept_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::DeptLookup, models::crm::Department};

#[derive(Clone)]
pub struct DeptRepository {
    pool: PgPool,
}

impl DeptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DeptLookup for DeptRepository {
    async fn lookup_dept(&self, id: Uuid) -> Result<Department, AppError> {
        sqlx::query_as::<_, Department>("SELECT id, name FROM departments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(format!("departamento {}", id)))
    }
}
