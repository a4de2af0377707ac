// src/services/fakes.rs
//
// Colaboradores em memória para os testes do núcleo.

use std::{
    collections::{HashMap, HashSet},
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{CredentialLookup, CustomerStore, DeptLookup, ProductLookup, UserLookup},
    models::crm::{
        AlbumCredential, Customer, CustomerFilter, CustomerLead, CustomerSort, Department,
        ImageRef, LeadSubmission, ProductSummary, UserSummary,
    },
    services::album_client::AlbumService,
};

pub fn at(day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).unwrap()
}

pub fn customer(owner: Uuid) -> Customer {
    let now = Utc::now();
    Customer {
        id: Uuid::new_v4(),
        full_name: "Nguyễn Văn A".into(),
        birth_year: Some(1985),
        city: Some("Hà Nội".into()),
        address: None,
        id_number: None,
        phone: Some("0901234567".into()),
        budget: None,
        note: None,
        zone: None,
        province: None,
        districts: vec![],
        status: 0,
        user_id: owner,
        dept_id: Uuid::new_v4(),
        album_id: Some("root-album".into()),
        lead_at: None,
        created_at: now,
        updated_at: now,
        user: None,
        dept: None,
        leads: None,
    }
}

pub fn lead(customer_id: Uuid, product_id: Option<Uuid>) -> CustomerLead {
    let now = Utc::now();
    CustomerLead {
        id: Uuid::new_v4(),
        customer_id,
        user_id: Uuid::new_v4(),
        product_id,
        comment: String::new(),
        reg_at: now,
        images: vec![],
        created_at: now,
        updated_at: now,
        user: None,
        product: None,
    }
}

pub fn submission(product_id: Uuid, reg_at: DateTime<Utc>, images: &[&str]) -> LeadSubmission {
    LeadSubmission {
        product_id,
        comment: "khách quan tâm".into(),
        reg_at,
        images: images
            .iter()
            .map(|g| ImageRef { gallery_id: g.to_string(), album: None, category: None })
            .collect(),
    }
}

pub fn credential() -> AlbumCredential {
    AlbumCredential { key: "api-key".into(), user_id: Uuid::new_v4() }
}

fn lookup_failure(what: &str) -> AppError {
    AppError::InternalServerError(anyhow::anyhow!("falha simulada em {}", what))
}

// =============================================================================
//  USUÁRIOS
// =============================================================================

#[derive(Default)]
pub struct ConcurrencyProbe {
    current: AtomicUsize,
    peak: AtomicUsize,
}

impl ConcurrencyProbe {
    fn enter(&self) {
        let now = self.current.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
    }

    fn leave(&self) {
        self.current.fetch_sub(1, Ordering::SeqCst);
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[derive(Clone, Default)]
pub struct FakeUsers {
    users: Arc<Mutex<HashMap<Uuid, UserSummary>>>,
    delay: Option<Duration>,
    probe: Arc<ConcurrencyProbe>,
}

impl FakeUsers {
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn add_user(&self, name: &str) -> Uuid {
        let id = Uuid::new_v4();
        let user = UserSummary {
            id,
            full_name: name.to_string(),
            dept_name: Some("Kinh doanh".into()),
            phone: None,
        };
        self.users.lock().unwrap().insert(id, user);
        id
    }

    pub fn concurrency_probe(&self) -> Arc<ConcurrencyProbe> {
        Arc::clone(&self.probe)
    }
}

#[async_trait]
impl UserLookup for FakeUsers {
    async fn lookup_user(&self, id: Uuid) -> Result<UserSummary, AppError> {
        self.probe.enter();
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let found = self.users.lock().unwrap().get(&id).cloned();
        self.probe.leave();

        found.ok_or_else(|| AppError::not_found(format!("usuário {}", id)))
    }
}

// =============================================================================
//  PRODUTOS E DEPARTAMENTOS
// =============================================================================

#[derive(Clone, Default)]
pub struct FakeProducts {
    products: Arc<Mutex<HashMap<Uuid, ProductSummary>>>,
    failing: Arc<Mutex<HashSet<Uuid>>>,
}

impl FakeProducts {
    pub fn add_product(&self, title: &str) -> Uuid {
        let id = Uuid::new_v4();
        self.products
            .lock()
            .unwrap()
            .insert(id, ProductSummary { id, title: title.to_string() });
        id
    }

    // Id cuja busca falha com erro de infraestrutura (não NotFound)
    pub fn add_failing_product(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.failing.lock().unwrap().insert(id);
        id
    }
}

#[async_trait]
impl ProductLookup for FakeProducts {
    async fn lookup_product(&self, id: Uuid) -> Result<ProductSummary, AppError> {
        if self.failing.lock().unwrap().contains(&id) {
            return Err(lookup_failure("produtos"));
        }
        self.products
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("produto {}", id)))
    }
}

#[derive(Clone, Default)]
pub struct FakeDepts {
    depts: Arc<Mutex<HashMap<Uuid, Department>>>,
}

impl FakeDepts {
    pub fn add_dept(&self, id: Uuid, name: &str) {
        self.depts
            .lock()
            .unwrap()
            .insert(id, Department { id, name: name.to_string() });
    }
}

#[async_trait]
impl DeptLookup for FakeDepts {
    async fn lookup_dept(&self, id: Uuid) -> Result<Department, AppError> {
        self.depts
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| AppError::not_found(format!("departamento {}", id)))
    }
}

// =============================================================================
//  STORE
// =============================================================================

#[derive(Default)]
struct StoreInner {
    customers: Mutex<HashMap<Uuid, Customer>>,
    leads: Mutex<Vec<CustomerLead>>,
    failing_lists: Mutex<HashSet<Uuid>>,
    persisted_customers: Mutex<Vec<Customer>>,
    lead_batches: Mutex<Vec<Vec<CustomerLead>>>,
    fail_customer_persist: AtomicBool,
    fail_lead_persist: AtomicBool,
}

#[derive(Clone, Default)]
pub struct FakeStore {
    inner: Arc<StoreInner>,
}

impl FakeStore {
    pub fn add_customer(&self, customer: Customer) {
        self.inner.customers.lock().unwrap().insert(customer.id, customer);
    }

    pub fn add_lead(&self, lead: CustomerLead) {
        self.inner.leads.lock().unwrap().push(lead);
    }

    pub fn fail_list_leads_for(&self, customer_id: Uuid) {
        self.inner.failing_lists.lock().unwrap().insert(customer_id);
    }

    pub fn fail_customer_persist(&self) {
        self.inner.fail_customer_persist.store(true, Ordering::SeqCst);
    }

    pub fn fail_lead_persist(&self) {
        self.inner.fail_lead_persist.store(true, Ordering::SeqCst);
    }

    pub fn persisted_customers(&self) -> Vec<Customer> {
        self.inner.persisted_customers.lock().unwrap().clone()
    }

    pub fn lead_batches(&self) -> Vec<Vec<CustomerLead>> {
        self.inner.lead_batches.lock().unwrap().clone()
    }

    // Só os filtros que os testes usam: responsável, departamento e status
    fn matching(&self, filter: &CustomerFilter) -> Vec<Customer> {
        self.inner
            .customers
            .lock()
            .unwrap()
            .values()
            .filter(|c| filter.user_id.is_none_or(|id| c.user_id == id))
            .filter(|c| filter.dept_id.is_none_or(|id| c.dept_id == id))
            .filter(|c| filter.status.is_none_or(|status| c.status == status))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CustomerStore for FakeStore {
    async fn count_customers(&self, filter: &CustomerFilter) -> Result<i64, AppError> {
        Ok(self.matching(filter).len() as i64)
    }

    async fn list_customers(
        &self,
        filter: &CustomerFilter,
        sort: CustomerSort,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Customer>, AppError> {
        let mut found = self.matching(filter);
        match sort {
            CustomerSort::CreatedAt => found.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
            // `None` é menor que `Some`, então fica por último
            CustomerSort::LeadAt => found.sort_by(|a, b| b.lead_at.cmp(&a.lead_at)),
        }
        Ok(found.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn find_customer(&self, id: Uuid) -> Result<Option<Customer>, AppError> {
        Ok(self.inner.customers.lock().unwrap().get(&id).cloned())
    }

    async fn list_leads(
        &self,
        customer_id: Uuid,
        offset: i64,
        limit: i64,
    ) -> Result<(Vec<CustomerLead>, i64), AppError> {
        if self.inner.failing_lists.lock().unwrap().contains(&customer_id) {
            return Err(lookup_failure("leads"));
        }
        let mut leads: Vec<CustomerLead> = self
            .inner
            .leads
            .lock()
            .unwrap()
            .iter()
            .filter(|l| l.customer_id == customer_id)
            .cloned()
            .collect();
        leads.sort_by(|a, b| b.reg_at.cmp(&a.reg_at));

        let total = leads.len() as i64;
        let page = leads
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }

    async fn persist_customer(&self, customer: &Customer) -> Result<(), AppError> {
        if self.inner.fail_customer_persist.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        self.inner.persisted_customers.lock().unwrap().push(customer.clone());
        self.inner.customers.lock().unwrap().insert(customer.id, customer.clone());
        Ok(())
    }

    async fn persist_leads(&self, leads: &[CustomerLead]) -> Result<(), AppError> {
        if self.inner.fail_lead_persist.load(Ordering::SeqCst) {
            return Err(AppError::DatabaseError(sqlx::Error::PoolTimedOut));
        }
        self.inner.lead_batches.lock().unwrap().push(leads.to_vec());
        self.inner.leads.lock().unwrap().extend(leads.iter().cloned());
        Ok(())
    }
}

// =============================================================================
//  CREDENCIAIS
// =============================================================================

#[derive(Clone, Default)]
pub struct FakeCredentials {
    keys: Arc<Mutex<HashMap<Uuid, AlbumCredential>>>,
}

impl FakeCredentials {
    pub fn add_key(&self, user_id: Uuid) {
        self.keys
            .lock()
            .unwrap()
            .insert(user_id, AlbumCredential { key: format!("key-{}", user_id), user_id });
    }
}

#[async_trait]
impl CredentialLookup for FakeCredentials {
    async fn find_credential(&self, user_id: Uuid) -> Result<AlbumCredential, AppError> {
        self.keys
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .ok_or_else(|| AppError::not_found("chave de API do serviço de álbuns"))
    }
}

// =============================================================================
//  SERVIÇO DE ÁLBUNS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum AlbumCall {
    CreateAlbum { name: String },
    CreateSubAlbum { name: String, parent: String },
    Attach { photo_ids: Vec<String>, album_id: String },
}

#[derive(Default)]
struct AlbumsInner {
    calls: Mutex<Vec<AlbumCall>>,
    // Índices (1-based) das chamadas de sub-álbum que devem falhar
    failing_sub_albums: Mutex<HashSet<usize>>,
    sub_album_count: AtomicUsize,
    fail_root: AtomicBool,
    fail_attach: AtomicBool,
}

#[derive(Clone, Default)]
pub struct FakeAlbums {
    inner: Arc<AlbumsInner>,
}

impl FakeAlbums {
    pub fn fail_sub_album_call(&self, nth: usize) {
        self.inner.failing_sub_albums.lock().unwrap().insert(nth);
    }

    pub fn fail_root_album(&self) {
        self.inner.fail_root.store(true, Ordering::SeqCst);
    }

    pub fn fail_attach(&self) {
        self.inner.fail_attach.store(true, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<AlbumCall> {
        self.inner.calls.lock().unwrap().clone()
    }

    fn record(&self, call: AlbumCall) {
        self.inner.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl AlbumService for FakeAlbums {
    async fn create_album(
        &self,
        _credential: &AlbumCredential,
        name: &str,
        _description: &str,
    ) -> Result<String, AppError> {
        self.record(AlbumCall::CreateAlbum { name: name.to_string() });
        if self.inner.fail_root.load(Ordering::SeqCst) {
            return Err(AppError::RemoteProvisioning("cannot create album".into()));
        }
        Ok("root-album".into())
    }

    async fn create_sub_album(
        &self,
        _credential: &AlbumCredential,
        name: &str,
        _description: &str,
        parent_album_id: &str,
    ) -> Result<String, AppError> {
        let nth = self.inner.sub_album_count.fetch_add(1, Ordering::SeqCst) + 1;
        self.record(AlbumCall::CreateSubAlbum {
            name: name.to_string(),
            parent: parent_album_id.to_string(),
        });
        if self.inner.failing_sub_albums.lock().unwrap().contains(&nth) {
            return Err(AppError::RemoteProvisioning("timeout".into()));
        }
        Ok(format!("sub-{}", nth))
    }

    async fn attach_photos(
        &self,
        _credential: &AlbumCredential,
        photo_ids: &[String],
        album_id: &str,
    ) -> Result<(), AppError> {
        self.record(AlbumCall::Attach {
            photo_ids: photo_ids.to_vec(),
            album_id: album_id.to_string(),
        });
        if self.inner.fail_attach.load(Ordering::SeqCst) {
            return Err(AppError::RemoteProvisioning("status HTTP 500".into()));
        }
        Ok(())
    }
}
