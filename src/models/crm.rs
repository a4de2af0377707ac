// src/models/crm.rs

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

// Categoria das fotos de cliente no serviço de álbuns
pub const CUSTOMER_PHOTO_CATEGORY: &str = "7";

// --- PROJEÇÕES (somente leitura, nunca persistidas) ---

// Resumo do usuário responsável, usado só para montar a resposta
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: Uuid,
    pub full_name: String,
    pub dept_name: Option<String>,
    pub phone: Option<String>,
}

// Resumo do produto ("bikip") referenciado por um lead
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: Uuid,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: Uuid,
    pub name: String,
}

// --- IMAGENS ---

/// Referência a uma imagem já enviada para a galeria.
/// `album` e `category` só são preenchidos depois de anexada a um álbum.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ImageRef {
    pub gallery_id: String,
    #[serde(default)]
    pub album: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
}

// --- LEAD ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerLead {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub user_id: Uuid,
    pub product_id: Option<Uuid>,
    pub comment: String,
    pub reg_at: DateTime<Utc>,

    // JSONB no Postgres
    #[sqlx(json)]
    pub images: Vec<ImageRef>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    // Campos derivados (enriquecimento)
    #[sqlx(skip)]
    pub user: Option<UserSummary>,
    #[sqlx(skip)]
    pub product: Option<ProductSummary>,
}

/// Primeira página de leads de um cliente, anexada na listagem.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadPage {
    pub items: Vec<CustomerLead>,
    pub total: i64,
}

// --- CLIENTE ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Customer {
    pub id: Uuid,
    pub full_name: String,
    pub birth_year: Option<i32>,
    pub city: Option<String>,
    pub address: Option<String>,

    // Último número de documento informado
    pub id_number: Option<String>,
    pub phone: Option<String>,
    pub budget: Option<Decimal>,
    pub note: Option<String>,

    pub zone: Option<String>,
    pub province: Option<String>,
    // No Postgres é TEXT[]
    pub districts: Vec<String>,
    pub status: i32,

    pub user_id: Uuid,
    pub dept_id: Uuid,

    // Álbum raiz do cliente no serviço externo
    pub album_id: Option<String>,

    // Cache desnormalizado: maior `reg_at` entre os leads.
    // Só o fluxo de provisionamento de leads atualiza este campo.
    pub lead_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    #[sqlx(skip)]
    pub user: Option<UserSummary>,
    #[sqlx(skip)]
    pub dept: Option<Department>,
    #[sqlx(skip)]
    pub leads: Option<LeadPage>,
}

impl Customer {
    /// Avança `lead_at` para `reg_at` se este for mais recente. Nunca retrocede.
    pub fn bump_lead_at(&mut self, reg_at: DateTime<Utc>) {
        if self.lead_at.is_none_or(|current| current < reg_at) {
            self.lead_at = Some(reg_at);
        }
    }
}

// --- ENTRADA DO FLUXO DE PROVISIONAMENTO ---

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeadSubmission {
    pub product_id: Uuid,
    #[serde(default)]
    pub comment: String,
    pub reg_at: DateTime<Utc>,
    #[serde(default)]
    pub images: Vec<ImageRef>,
}

/// Chave de API do usuário no serviço de álbuns.
#[derive(Debug, Clone, FromRow)]
pub struct AlbumCredential {
    pub key: String,
    pub user_id: Uuid,
}

// --- LISTAGEM ---

/// Filtro já resolvido (com as regras de visibilidade aplicadas).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerFilter {
    pub keyword: Option<String>,
    pub status: Option<i32>,
    pub districts: Vec<String>,
    pub budget_min: Option<Decimal>,
    pub budget_max: Option<Decimal>,
    pub dept_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustomerSort {
    CreatedAt,
    LeadAt,
}

impl CustomerSort {
    pub fn from_param(sort: Option<&str>) -> Self {
        match sort {
            Some("created") => CustomerSort::CreatedAt,
            _ => CustomerSort::LeadAt,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CustomerPage {
    pub items: Vec<Customer>,
    pub total: i64,
}

// =============================================================================
//  PAYLOADS (entrada da API)
// =============================================================================

// Listas chegam separadas por vírgula: `districts=Q1,Q3`, `budget=1.5,3`
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct CustomerQuery {
    pub keyword: Option<String>,
    pub districts: Option<String>,
    pub budget: Option<String>,
    pub status: Option<i32>,
    pub dept: Option<Uuid>,
    pub user: Option<Uuid>,
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    // "created" ordena por criação; qualquer outro valor por `lead_at`
    pub sort: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCustomerPayload {
    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Nguyễn Văn A")]
    pub full_name: String,

    #[validate(range(min = 1900, max = 2100, message = "Ano de nascimento inválido."))]
    pub birth_year: Option<i32>,
    pub city: Option<String>,
    pub address: Option<String>,
    pub id_number: Option<String>,
    pub phone: Option<String>,
    pub budget: Option<Decimal>,
    pub note: Option<String>,
    // Só grupos administrativos podem escolher a província
    pub province: Option<String>,

    #[serde(default)]
    pub districts: Vec<String>,

    #[serde(default)]
    pub leads: Vec<LeadSubmission>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCustomerPayload {
    #[validate(range(min = 1900, max = 2100, message = "Ano de nascimento inválido."))]
    pub birth_year: Option<i32>,
    pub city: Option<String>,
    pub id_number: Option<String>,
    pub phone: Option<String>,
    pub budget: Option<Decimal>,
    #[serde(default)]
    pub districts: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateStatusPayload {
    pub status: i32,
}
