// src/services/customer_service.rs

use std::{str::FromStr, sync::Arc};

use chrono::{SubsecRound, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    common::{
        error::AppError,
        text::{non_empty, trim_and_collapse, trim_edges},
    },
    db::store::{CredentialLookup, CustomerStore, DeptLookup, ProductLookup, UserLookup},
    models::{
        auth::{Claims, GROUP_SPECIALIST, PERM_ADMIN_MEMBER_VIEW, PERM_MEMBER_VIEW},
        crm::{
            CreateCustomerPayload, Customer, CustomerFilter, CustomerLead, CustomerPage,
            CustomerQuery, CustomerSort, LeadPage, LeadSubmission, UpdateCustomerPayload,
        },
    },
    services::{
        album_client::AlbumService,
        enrichment::{EnrichmentPipeline, LEAD_PAGE_LIMIT, LEAD_PAGE_OFFSET},
        lead_provisioning::{customer_album_name, FlowPolicies, LeadProvisioner},
    },
};

pub const DEFAULT_PAGE_LIMIT: i64 = 20;
pub const MAX_PAGE_LIMIT: i64 = 200;

#[derive(Clone)]
pub struct CustomerService {
    store: Arc<dyn CustomerStore>,
    credentials: Arc<dyn CredentialLookup>,
    users: Arc<dyn UserLookup>,
    depts: Arc<dyn DeptLookup>,
    products: Arc<dyn ProductLookup>,
    albums: Arc<dyn AlbumService>,
    enrichment: EnrichmentPipeline,
    provisioner: LeadProvisioner,
    policies: FlowPolicies,
}

impl CustomerService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn CustomerStore>,
        credentials: Arc<dyn CredentialLookup>,
        users: Arc<dyn UserLookup>,
        depts: Arc<dyn DeptLookup>,
        products: Arc<dyn ProductLookup>,
        albums: Arc<dyn AlbumService>,
        enrich_workers: usize,
        policies: FlowPolicies,
    ) -> Self {
        let enrichment = EnrichmentPipeline::new(
            Arc::clone(&users),
            Arc::clone(&products),
            Arc::clone(&store),
            enrich_workers,
        );
        let provisioner = LeadProvisioner::new(
            Arc::clone(&products),
            Arc::clone(&albums),
            Arc::clone(&store),
        );

        Self {
            store,
            credentials,
            users,
            depts,
            products,
            albums,
            enrichment,
            provisioner,
            policies,
        }
    }

    // =========================================================================
    //  LEITURA
    // =========================================================================

    pub async fn list_customers(
        &self,
        claims: &Claims,
        query: &CustomerQuery,
    ) -> Result<CustomerPage, AppError> {
        let filter = visibility_filter(claims, query)?;
        let (offset, limit) = page_bounds(query.offset, query.limit);

        let total = self.store.count_customers(&filter).await?;
        if total == 0 {
            return Ok(CustomerPage { items: Vec::new(), total: 0 });
        }

        let sort = CustomerSort::from_param(query.sort.as_deref());
        let customers = self.store.list_customers(&filter, sort, offset, limit).await?;
        let items = self.enrichment.enrich(customers).await;

        Ok(CustomerPage { items, total })
    }

    /// Detalhe de um cliente. Cada lead resolve o próprio responsável
    /// (diferente da listagem, onde os leads herdam o do cliente).
    pub async fn customer_detail(&self, id: Uuid) -> Result<Customer, AppError> {
        let customer = self.find_customer(id).await?;
        Ok(decorate_detail(
            self.users.as_ref(),
            self.depts.as_ref(),
            self.products.as_ref(),
            self.store.as_ref(),
            customer,
        )
        .await)
    }

    pub async fn list_leads(
        &self,
        claims: &Claims,
        customer_id: Uuid,
        offset: Option<i64>,
        limit: Option<i64>,
    ) -> Result<LeadPage, AppError> {
        if claims.group >= GROUP_SPECIALIST {
            return Err(AppError::Forbidden);
        }
        self.find_owned_customer(claims, customer_id).await?;

        let (offset, limit) = page_bounds(offset, limit);
        let (items, total) = self.store.list_leads(customer_id, offset, limit).await?;
        Ok(LeadPage { items, total })
    }

    // =========================================================================
    //  ESCRITA
    // =========================================================================

    /// Fluxo de criação: álbum raiz do cliente, depois os leads embutidos.
    /// Falha ao anexar fotos segue `policies.create_flow`.
    pub async fn create_customer(
        &self,
        claims: &Claims,
        payload: CreateCustomerPayload,
    ) -> Result<Customer, AppError> {
        let credential = self.credentials.find_credential(claims.sub).await?;

        let leads = payload.leads.clone();
        let mut customer = new_customer(claims, &payload);

        // Se o álbum raiz falhar o cliente não é criado
        let root_album = self
            .albums
            .create_album(&credential, &customer_album_name(&customer.full_name), &customer.full_name)
            .await?;
        customer.album_id = Some(root_album);

        let created = self
            .provisioner
            .provision_leads(&mut customer, claims.sub, leads, &credential, self.policies.create_flow)
            .await?;

        tracing::info!(customer_id = %customer.id, "✅ Cliente criado com {} leads", created.len());

        let total = created.len() as i64;
        customer.leads = Some(LeadPage { items: created, total });
        Ok(customer)
    }

    /// Fluxo de inclusão de leads num cliente existente.
    /// Falha ao anexar fotos segue `policies.append_flow`.
    pub async fn add_leads(
        &self,
        claims: &Claims,
        customer_id: Uuid,
        submissions: Vec<LeadSubmission>,
    ) -> Result<Vec<CustomerLead>, AppError> {
        if submissions.is_empty() {
            return Err(AppError::BadRequest("Informe ao menos um lead.".into()));
        }

        let mut customer = self.find_owned_customer(claims, customer_id).await?;
        let credential = self.credentials.find_credential(claims.sub).await?;

        // Clientes antigos podem não ter álbum raiz ainda
        if customer.album_id.is_none() {
            let root_album = self
                .albums
                .create_album(&credential, &customer_album_name(&customer.full_name), &customer.full_name)
                .await?;
            customer.album_id = Some(root_album);
        }

        self.provisioner
            .provision_leads(&mut customer, claims.sub, submissions, &credential, self.policies.append_flow)
            .await
    }

    pub async fn update_customer(
        &self,
        claims: &Claims,
        customer_id: Uuid,
        payload: UpdateCustomerPayload,
    ) -> Result<Customer, AppError> {
        let mut customer = self.find_owned_customer(claims, customer_id).await?;

        customer.birth_year = payload.birth_year;
        customer.city = payload.city;
        customer.id_number = payload.id_number.as_deref().map(trim_and_collapse).and_then(non_empty);
        customer.phone = payload.phone.as_deref().map(trim_and_collapse).and_then(non_empty);
        customer.budget = payload.budget;
        customer.districts = payload.districts;
        customer.updated_at = Utc::now().round_subsecs(0);

        self.store.persist_customer(&customer).await?;
        Ok(customer)
    }

    pub async fn update_status(
        &self,
        claims: &Claims,
        customer_id: Uuid,
        status: i32,
    ) -> Result<Customer, AppError> {
        let mut customer = self.find_owned_customer(claims, customer_id).await?;

        customer.status = status;
        customer.updated_at = Utc::now().round_subsecs(0);

        self.store.persist_customer(&customer).await?;
        Ok(customer)
    }

    // --- helpers ---

    async fn find_customer(&self, id: Uuid) -> Result<Customer, AppError> {
        self.store
            .find_customer(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("cliente {}", id)))
    }

    async fn find_owned_customer(&self, claims: &Claims, id: Uuid) -> Result<Customer, AppError> {
        let customer = self.find_customer(id).await?;
        if customer.user_id != claims.sub {
            return Err(AppError::Forbidden);
        }
        Ok(customer)
    }
}

/// Detalhe de um cliente: responsável, departamento e primeira página de
/// leads. Cada lead resolve o próprio responsável (na listagem eles herdam
/// o do cliente). Falhas só deixam o campo correspondente vazio.
async fn decorate_detail(
    users: &dyn UserLookup,
    depts: &dyn DeptLookup,
    products: &dyn ProductLookup,
    store: &dyn CustomerStore,
    mut customer: Customer,
) -> Customer {
    customer.user = users.lookup_user(customer.user_id).await.ok();
    customer.dept = depts.lookup_dept(customer.dept_id).await.ok();

    match store.list_leads(customer.id, LEAD_PAGE_OFFSET, LEAD_PAGE_LIMIT).await {
        Ok((mut items, total)) => {
            for lead in items.iter_mut() {
                lead.user = users.lookup_user(lead.user_id).await.ok();
                if let Some(product_id) = lead.product_id {
                    lead.product = products.lookup_product(product_id).await.ok();
                }
            }
            customer.leads = Some(LeadPage { items, total });
        }
        Err(e) => tracing::warn!(customer_id = %customer.id, "⚠️ Falha ao listar leads do cliente: {}", e),
    }

    customer
}

/// Filtro da listagem com as regras de visibilidade aplicadas:
/// sem permissão de ver membros, só os próprios clientes;
/// sem permissão administrativa, só o próprio departamento.
pub fn visibility_filter(claims: &Claims, query: &CustomerQuery) -> Result<CustomerFilter, AppError> {
    let can_view_members = claims.has_perm(PERM_MEMBER_VIEW) || claims.has_perm(PERM_ADMIN_MEMBER_VIEW);
    let can_view_all_depts = claims.has_perm(PERM_ADMIN_MEMBER_VIEW);

    let (budget_min, budget_max) = parse_budget(query.budget.as_deref())?;

    Ok(CustomerFilter {
        keyword: query.keyword.as_deref().map(str::trim).filter(|k| !k.is_empty()).map(String::from),
        status: query.status,
        districts: split_list(query.districts.as_deref()),
        budget_min,
        budget_max,
        dept_id: if can_view_all_depts { query.dept } else { Some(claims.dept) },
        user_id: if can_view_members { query.user } else { Some(claims.sub) },
    })
}

fn split_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|value| {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

// "min" ou "min,max"
fn parse_budget(raw: Option<&str>) -> Result<(Option<Decimal>, Option<Decimal>), AppError> {
    let parts = split_list(raw);
    let parse = |s: &String| {
        Decimal::from_str(s).map_err(|_| AppError::BadRequest(format!("Orçamento inválido: '{}'", s)))
    };

    match parts.as_slice() {
        [] => Ok((None, None)),
        [min] => Ok((Some(parse(min)?), None)),
        [min, max] => Ok((Some(parse(min)?), Some(parse(max)?))),
        _ => Err(AppError::BadRequest("Orçamento deve ter no máximo dois valores.".into())),
    }
}

fn page_bounds(offset: Option<i64>, limit: Option<i64>) -> (i64, i64) {
    let offset = offset.unwrap_or(0).max(0);
    let limit = limit.unwrap_or(DEFAULT_PAGE_LIMIT).clamp(1, MAX_PAGE_LIMIT);
    (offset, limit)
}

// Monta o cliente novo com os campos normalizados
fn new_customer(claims: &Claims, payload: &CreateCustomerPayload) -> Customer {
    let now = Utc::now().round_subsecs(0);

    let province = match &payload.province {
        Some(p) if !p.is_empty() && claims.is_admin_group() => Some(p.clone()),
        _ => claims.city.clone(),
    };

    Customer {
        id: Uuid::new_v4(),
        full_name: trim_edges(&payload.full_name),
        birth_year: payload.birth_year,
        city: payload.city.clone(),
        address: payload.address.clone(),
        id_number: payload.id_number.as_deref().map(trim_and_collapse).and_then(non_empty),
        phone: payload.phone.as_deref().map(trim_and_collapse).and_then(non_empty),
        budget: payload.budget,
        note: payload.note.as_deref().map(|n| n.trim_matches(' ').to_string()).and_then(non_empty),
        zone: claims.zone.clone(),
        province,
        districts: payload.districts.clone(),
        status: 0,
        user_id: claims.sub,
        dept_id: claims.dept,
        album_id: None,
        lead_at: None,
        created_at: now,
        updated_at: now,
        user: None,
        dept: None,
        leads: None,
    }
}
