// src/db/store.rs
//
// Contratos que o núcleo (enriquecimento e provisionamento de leads) usa para
// falar com o banco. Os repositórios Postgres implementam estes traits; os
// testes usam versões em memória.

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::crm::{
        AlbumCredential, Customer, CustomerFilter, CustomerLead, CustomerSort, Department,
        ProductSummary, UserSummary,
    },
};

#[async_trait]
pub trait UserLookup: Send + Sync {
    /// `AppError::NotFound` quando o usuário não existe.
    async fn lookup_user(&self, id: Uuid) -> Result<UserSummary, AppError>;
}

#[async_trait]
pub trait ProductLookup: Send + Sync {
    async fn lookup_product(&self, id: Uuid) -> Result<ProductSummary, AppError>;
}

#[async_trait]
pub trait DeptLookup: Send + Sync {
    async fn lookup_dept(&self, id: Uuid) -> Result<Department, AppError>;
}

#[async_trait]
pub trait CredentialLookup: Send + Sync {
    /// Chave do usuário no serviço de álbuns; `NotFound` se não houver.
    async fn find_credential(&self, user_id: Uuid) -> Result<AlbumCredential, AppError>;
}

#[async_trait]
pub trait CustomerStore: Send + Sync {
    async fn count_customers(&self, filter: &CustomerFilter) -> Result<i64, AppError>;

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        sort: CustomerSort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Customer>, AppError>;

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError>;

    /// Página de leads de um cliente, mais o total.
    async fn list_leads(
        &self,
        customer_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<CustomerLead>, i64), AppError>;

    /// Insere ou atualiza o cliente.
    async fn persist_customer(&self, customer: &Customer) -> Result<(), AppError>;

    /// Inserção em lote. Lote vazio não faz nada.
    async fn persist_leads(&self, leads: &[CustomerLead]) -> Result<(), AppError>;
}
