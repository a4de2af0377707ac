// src/services/enrichment.rs
//
// Enriquecimento de uma página de clientes: responsável (UserSummary), primeira
// página de leads e, para cada lead, o resumo do produto.
//
// Um pool fixo de workers consome a página por uma fila limitada; cada cliente
// é processado por exatamente um worker. O resultado só é devolvido depois que
// todos os workers terminaram (barreira de fan-in), na mesma ordem da entrada.

use std::sync::Arc;

use tokio::{
    sync::{mpsc, Mutex},
    task::JoinSet,
};
use uuid::Uuid;

use crate::{
    db::store::{CustomerStore, ProductLookup, UserLookup},
    models::crm::{Customer, CustomerLead, LeadPage, UserSummary},
};

pub const DEFAULT_ENRICH_WORKERS: usize = 6;

// Primeira página de leads anexada a cada cliente
pub const LEAD_PAGE_OFFSET: i64 = 0;
pub const LEAD_PAGE_LIMIT: i64 = 10;

/// Resultado de um worker para um cliente.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordEnrichment {
    Enriched {
        owner: UserSummary,
        leads: Option<LeadPage>,
    },
    // Responsável não encontrado (ou worker perdido): sem campos derivados
    Degraded,
}

impl RecordEnrichment {
    fn apply(self, customer: &mut Customer) {
        match self {
            RecordEnrichment::Enriched { owner, leads } => {
                customer.user = Some(owner);
                customer.leads = leads;
            }
            RecordEnrichment::Degraded => {
                customer.user = None;
                customer.leads = None;
            }
        }
    }
}

struct Job {
    index: usize,
    customer_id: Uuid,
    owner_id: Uuid,
}

#[derive(Clone)]
pub struct EnrichmentPipeline {
    users: Arc<dyn UserLookup>,
    products: Arc<dyn ProductLookup>,
    store: Arc<dyn CustomerStore>,
    workers: usize,
}

impl EnrichmentPipeline {
    pub fn new(
        users: Arc<dyn UserLookup>,
        products: Arc<dyn ProductLookup>,
        store: Arc<dyn CustomerStore>,
        workers: usize,
    ) -> Self {
        Self {
            users,
            products,
            store,
            workers: workers.max(1),
        }
    }

    /// Devolve os mesmos clientes, na mesma ordem, com os campos derivados
    /// preenchidos. Falhas por cliente só removem os campos daquele cliente.
    pub async fn enrich(&self, mut records: Vec<Customer>) -> Vec<Customer> {
        if records.is_empty() {
            return records;
        }

        let worker_count = self.workers.min(records.len());
        let (tx, rx) = mpsc::channel::<Job>(worker_count);
        let rx = Arc::new(Mutex::new(rx));
        // Cada resultado sai do worker assim que fica pronto
        let (done_tx, mut done_rx) = mpsc::channel::<(usize, RecordEnrichment)>(records.len());

        // --- FAN-OUT ---
        let mut pool = JoinSet::new();
        for _ in 0..worker_count {
            let rx = Arc::clone(&rx);
            let done_tx = done_tx.clone();
            let pipeline = self.clone();
            pool.spawn(async move {
                loop {
                    let job = rx.lock().await.recv().await;
                    let Some(job) = job else { break };

                    // Um pânico no registro só derruba a task dele, não o worker
                    let Job { index, customer_id, owner_id } = job;
                    let one = pipeline.clone();
                    let task = tokio::spawn(async move { one.enrich_one(customer_id, owner_id).await });
                    let outcome = match task.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            tracing::error!(%customer_id, "🔥 Enriquecimento do cliente falhou: {}", e);
                            RecordEnrichment::Degraded
                        }
                    };
                    if done_tx.send((index, outcome)).await.is_err() {
                        break;
                    }
                }
            });
        }
        drop(rx);
        drop(done_tx);

        for (index, customer) in records.iter().enumerate() {
            let job = Job {
                index,
                customer_id: customer.id,
                owner_id: customer.user_id,
            };
            // Só falha se todos os workers morreram; o resto vira `Degraded`
            if tx.send(job).await.is_err() {
                tracing::error!("🔥 Todos os workers de enriquecimento pararam antes do fim da fila");
                break;
            }
        }
        drop(tx);

        // --- FAN-IN ---
        // O canal fecha quando o último worker termina (ou morre)
        let mut outcomes: Vec<Option<RecordEnrichment>> = (0..records.len()).map(|_| None).collect();
        while let Some((index, outcome)) = done_rx.recv().await {
            outcomes[index] = Some(outcome);
        }
        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                tracing::error!("🔥 Worker de enriquecimento falhou: {}", e);
            }
        }

        for (customer, outcome) in records.iter_mut().zip(outcomes) {
            outcome.unwrap_or(RecordEnrichment::Degraded).apply(customer);
        }

        records
    }

    async fn enrich_one(&self, customer_id: Uuid, owner_id: Uuid) -> RecordEnrichment {
        let owner = match self.users.lookup_user(owner_id).await {
            Ok(owner) => owner,
            Err(e) => {
                tracing::warn!(%customer_id, %owner_id, "⚠️ Responsável não resolvido, cliente sem enriquecimento: {}", e);
                return RecordEnrichment::Degraded;
            }
        };

        let leads = match self
            .store
            .list_leads(customer_id, LEAD_PAGE_OFFSET, LEAD_PAGE_LIMIT)
            .await
        {
            Ok((items, total)) => Some(LeadPage {
                items: self.decorate_leads(items, &owner).await,
                total,
            }),
            Err(e) => {
                tracing::warn!(%customer_id, "⚠️ Falha ao listar leads do cliente: {}", e);
                None
            }
        };

        RecordEnrichment::Enriched { owner, leads }
    }

    // Os leads herdam o responsável do cliente; o produto é resolvido por lead
    async fn decorate_leads(&self, mut leads: Vec<CustomerLead>, owner: &UserSummary) -> Vec<CustomerLead> {
        for lead in leads.iter_mut() {
            lead.user = Some(owner.clone());
            lead.product = match lead.product_id {
                Some(product_id) => match self.products.lookup_product(product_id).await {
                    Ok(product) => Some(product),
                    Err(e) => {
                        tracing::debug!(lead_id = %lead.id, %product_id, "Produto do lead não resolvido: {}", e);
                        None
                    }
                },
                None => None,
            };
        }
        leads
    }
}
