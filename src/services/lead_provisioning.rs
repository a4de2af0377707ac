// src/services/lead_provisioning.rs
//
// Provisionamento de leads de um cliente: para cada submissão, cria um
// sub-álbum no serviço externo (aninhado no álbum raiz do cliente), anexa as
// fotos e, no fim, grava o cliente (`lead_at`) e os leads que deram certo.
//
// As submissões são processadas uma por vez, na ordem recebida. A criação de
// álbuns é uma sequência de passos com estado no serviço externo e não pode
// ser disputada em paralelo para o mesmo cliente.
//
// Nada do que foi criado no serviço externo é desfeito se a gravação falhar:
// esses álbuns ficam órfãos.

use std::{str::FromStr, sync::Arc};

use chrono::{DateTime, SubsecRound, Utc};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::{CustomerStore, ProductLookup},
    models::crm::{AlbumCredential, Customer, CustomerLead, LeadSubmission, CUSTOMER_PHOTO_CATEGORY},
    services::album_client::AlbumService,
};

// Marcador de moeda ("bilhão" em vietnamita) que encerra o nome do álbum
pub const ALBUM_NAME_MARKER: &str = "tỷ";
pub const ALBUM_NAME_MAX_CHARS: usize = 90;
pub const LEAD_ALBUM_PREFIX: &str = "LEAD - ";
pub const CUSTOMER_ALBUM_PREFIX: &str = "KH - ";

/// O que fazer quando anexar as fotos de um lead falha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhotoAttachPolicy {
    // Fluxo de criação de cliente: o pedido inteiro falha, nada é gravado
    AbortRequest,
    // Fluxo de inclusão de leads: só aquele lead é descartado
    SkipLead,
}

impl FromStr for PhotoAttachPolicy {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "abort" | "abort_request" => Ok(PhotoAttachPolicy::AbortRequest),
            "skip" | "skip_lead" => Ok(PhotoAttachPolicy::SkipLead),
            other => anyhow::bail!("política de anexo de fotos desconhecida: '{}'", other),
        }
    }
}

/// Política de cada ponto de entrada do provisionamento.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowPolicies {
    pub create_flow: PhotoAttachPolicy,
    pub append_flow: PhotoAttachPolicy,
}

impl Default for FlowPolicies {
    fn default() -> Self {
        Self {
            create_flow: PhotoAttachPolicy::AbortRequest,
            append_flow: PhotoAttachPolicy::SkipLead,
        }
    }
}

/// Nome do álbum de um lead a partir do título do produto.
///
/// Corta logo após a primeira ocorrência (sem diferenciar maiúsculas) de
/// `ALBUM_NAME_MARKER`, limita a `ALBUM_NAME_MAX_CHARS` caracteres e prefixa
/// com `LEAD_ALBUM_PREFIX`.
pub fn lead_album_name(product_title: &str) -> String {
    let chars: Vec<char> = product_title.chars().collect();
    let marker: Vec<char> = ALBUM_NAME_MARKER.chars().collect();

    let mut end = chars.len();
    if let Some(start) = (0..chars.len()).find(|&i| matches_marker(&chars[i..], &marker)) {
        end = start + marker.len();
    }

    let name: String = chars[..end].iter().take(ALBUM_NAME_MAX_CHARS).collect();
    format!("{}{}", LEAD_ALBUM_PREFIX, name)
}

fn matches_marker(window: &[char], marker: &[char]) -> bool {
    window.len() >= marker.len()
        && window
            .iter()
            .zip(marker)
            .all(|(c, m)| c.to_lowercase().eq(m.to_lowercase()))
}

pub fn customer_album_name(full_name: &str) -> String {
    format!("{}{}", CUSTOMER_ALBUM_PREFIX, full_name)
}

#[derive(Clone)]
pub struct LeadProvisioner {
    products: Arc<dyn ProductLookup>,
    albums: Arc<dyn AlbumService>,
    store: Arc<dyn CustomerStore>,
}

impl LeadProvisioner {
    pub fn new(
        products: Arc<dyn ProductLookup>,
        albums: Arc<dyn AlbumService>,
        store: Arc<dyn CustomerStore>,
    ) -> Self {
        Self { products, albums, store }
    }

    /// Provisiona as submissões e grava o resultado.
    ///
    /// Devolve apenas os leads gravados. Submissões que falham em produto,
    /// álbum ou (com `SkipLead`) fotos são registradas no log e ignoradas.
    /// O cliente é sempre gravado (para o `lead_at`); o lote de leads só é
    /// gravado se não estiver vazio.
    pub async fn provision_leads(
        &self,
        customer: &mut Customer,
        submitter: Uuid,
        submissions: Vec<LeadSubmission>,
        credential: &AlbumCredential,
        policy: PhotoAttachPolicy,
    ) -> Result<Vec<CustomerLead>, AppError> {
        let now = Utc::now().round_subsecs(0);
        let submitted = submissions.len();
        let mut leads = Vec::with_capacity(submitted);

        for (position, submission) in submissions.into_iter().enumerate() {
            let lead = self
                .provision_one(customer, submitter, submission, credential, policy, now)
                .await
                .inspect_err(|e| {
                    tracing::error!(customer_id = %customer.id, position, "🔥 Provisionamento abortado: {}", e);
                })?;

            if let Some(lead) = lead {
                customer.bump_lead_at(lead.reg_at);
                leads.push(lead);
            }
        }

        self.store.persist_customer(customer).await?;
        if !leads.is_empty() {
            self.store.persist_leads(&leads).await?;
        }

        if leads.len() < submitted {
            tracing::warn!(
                customer_id = %customer.id,
                "⚠️ {} de {} leads provisionados",
                leads.len(),
                submitted
            );
        } else {
            tracing::info!(customer_id = %customer.id, "✅ {} leads provisionados", leads.len());
        }

        Ok(leads)
    }

    // `Ok(None)`: submissão ignorada. `Err`: o pedido inteiro deve falhar.
    async fn provision_one(
        &self,
        customer: &Customer,
        submitter: Uuid,
        submission: LeadSubmission,
        credential: &AlbumCredential,
        policy: PhotoAttachPolicy,
        now: DateTime<Utc>,
    ) -> Result<Option<CustomerLead>, AppError> {
        let product_id = submission.product_id;

        // 1. Produto
        let product = match self.products.lookup_product(product_id).await {
            Ok(product) => product,
            Err(e) => {
                tracing::warn!(customer_id = %customer.id, %product_id, "⚠️ Produto não resolvido, lead ignorado: {}", e);
                return Ok(None);
            }
        };

        // 2. Sub-álbum do lead, dentro do álbum raiz do cliente
        let Some(root_album) = customer.album_id.as_deref() else {
            tracing::warn!(customer_id = %customer.id, "⚠️ Cliente sem álbum raiz, lead ignorado");
            return Ok(None);
        };
        let album_name = lead_album_name(&product.title);
        let album_id = match self
            .albums
            .create_sub_album(credential, &album_name, &product.title, root_album)
            .await
        {
            Ok(album_id) => album_id,
            Err(e) => {
                tracing::warn!(customer_id = %customer.id, %product_id, "⚠️ Falha ao criar álbum do lead, lead ignorado: {}", e);
                return Ok(None);
            }
        };

        // 3. Fotos
        let mut images = submission.images;
        for image in images.iter_mut() {
            image.album = Some(album_id.clone());
            image.category = Some(CUSTOMER_PHOTO_CATEGORY.to_string());
        }

        if !images.is_empty() {
            let photo_ids: Vec<String> = images.iter().map(|img| img.gallery_id.clone()).collect();
            if let Err(e) = self.albums.attach_photos(credential, &photo_ids, &album_id).await {
                match policy {
                    PhotoAttachPolicy::AbortRequest => return Err(e),
                    PhotoAttachPolicy::SkipLead => {
                        tracing::warn!(customer_id = %customer.id, %album_id, "⚠️ Falha ao anexar fotos, lead ignorado: {}", e);
                        return Ok(None);
                    }
                }
            }
        }

        // 4. Lead
        Ok(Some(CustomerLead {
            id: Uuid::new_v4(),
            customer_id: customer.id,
            user_id: submitter,
            product_id: Some(product.id),
            comment: submission.comment,
            reg_at: submission.reg_at,
            images,
            created_at: now,
            updated_at: now,
            user: None,
            product: None,
        }))
    }
}
