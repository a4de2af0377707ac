// src/handlers/customers.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::AppError,
    config::AppState,
    middleware::auth::AuthenticatedUser,
    models::crm::{
        CreateCustomerPayload, Customer, CustomerLead, CustomerPage, CustomerQuery, LeadPage,
        LeadSubmission, PageQuery, UpdateCustomerPayload, UpdateStatusPayload,
    },
};

// =============================================================================
//  LEITURA
// =============================================================================

// GET /api/customers
#[utoipa::path(
    get,
    path = "/api/customers",
    tag = "Customers",
    params(CustomerQuery),
    responses(
        (status = 200, description = "Página de clientes enriquecida", body = CustomerPage),
        (status = 400, description = "Filtro inválido"),
        (status = 401, description = "Token ausente ou inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_customers(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Query(query): Query<CustomerQuery>,
) -> Result<impl IntoResponse, AppError> {
    let page = app_state.customer_service.list_customers(&claims, &query).await?;
    Ok((StatusCode::OK, Json(page)))
}

// GET /api/customers/{id}
#[utoipa::path(
    get,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    responses(
        (status = 200, description = "Cliente com responsável, departamento e leads", body = Customer),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_customer(
    State(app_state): State<AppState>,
    AuthenticatedUser(_claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state.customer_service.customer_detail(id).await?;
    Ok((StatusCode::OK, Json(customer)))
}

// GET /api/customers/{id}/leads
#[utoipa::path(
    get,
    path = "/api/customers/{id}/leads",
    tag = "Customers",
    params(
        ("id" = Uuid, Path, description = "ID do cliente"),
        PageQuery
    ),
    responses(
        (status = 200, description = "Leads do cliente", body = LeadPage),
        (status = 403, description = "Sem acesso aos leads deste cliente"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn list_leads(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Query(page): Query<PageQuery>,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state
        .customer_service
        .list_leads(&claims, id, page.offset, page.limit)
        .await?;
    Ok((StatusCode::OK, Json(leads)))
}

// =============================================================================
//  ESCRITA
// =============================================================================

// POST /api/customers
#[utoipa::path(
    post,
    path = "/api/customers",
    tag = "Customers",
    request_body = CreateCustomerPayload,
    responses(
        (status = 201, description = "Cliente criado com álbum e leads", body = Customer),
        (status = 400, description = "Dados inválidos"),
        (status = 422, description = "Falha no serviço de álbuns")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_customer(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Json(payload): Json<CreateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let customer = app_state.customer_service.create_customer(&claims, payload).await?;
    Ok((StatusCode::CREATED, Json(customer)))
}

// POST /api/customers/{id}/leads
#[utoipa::path(
    post,
    path = "/api/customers/{id}/leads",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = Vec<LeadSubmission>,
    responses(
        (status = 201, description = "Leads criados (submissões com falha são ignoradas)", body = Vec<CustomerLead>),
        (status = 400, description = "Lista de leads vazia"),
        (status = 403, description = "Cliente de outro responsável")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_leads(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(submissions): Json<Vec<LeadSubmission>>,
) -> Result<impl IntoResponse, AppError> {
    let leads = app_state.customer_service.add_leads(&claims, id, submissions).await?;
    Ok((StatusCode::CREATED, Json(leads)))
}

// PUT /api/customers/{id}
#[utoipa::path(
    put,
    path = "/api/customers/{id}",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = UpdateCustomerPayload,
    responses(
        (status = 200, description = "Cliente atualizado", body = Customer),
        (status = 403, description = "Cliente de outro responsável"),
        (status = 404, description = "Cliente não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_customer(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCustomerPayload>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let customer = app_state.customer_service.update_customer(&claims, id, payload).await?;
    Ok((StatusCode::OK, Json(customer)))
}

// PUT /api/customers/{id}/status
#[utoipa::path(
    put,
    path = "/api/customers/{id}/status",
    tag = "Customers",
    params(("id" = Uuid, Path, description = "ID do cliente")),
    request_body = UpdateStatusPayload,
    responses(
        (status = 200, description = "Status atualizado", body = Customer),
        (status = 403, description = "Cliente de outro responsável")
    ),
    security(("api_jwt" = []))
)]
pub async fn update_status(
    State(app_state): State<AppState>,
    AuthenticatedUser(claims): AuthenticatedUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateStatusPayload>,
) -> Result<impl IntoResponse, AppError> {
    let customer = app_state
        .customer_service
        .update_status(&claims, id, payload.status)
        .await?;
    Ok((StatusCode::OK, Json(customer)))
}
