// src/db/product_repo.rs

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{common::error::AppError, db::store::ProductLookup, models::crm::ProductSummary};

// Produtos ("bikip") que os leads referenciam
#[derive(Clone)]
pub struct ProductRepository {
    pool: PgPool,
}

impl ProductRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ProductLookup for ProductRepository {
    async fn lookup_product(&self, id: Uuid) -> Result<ProductSummary, AppError> {
        sqlx::query_as::<_, ProductSummary>("SELECT id, title FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::not_found(format!("produto {}", id)))
    }
}
