// src/config.rs

use std::{env, sync::Arc, time::Duration};

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};

use crate::{
    db::{ApiKeyRepository, CustomerRepository, DeptRepository, ProductRepository, UserRepository},
    services::{
        album_client::{AlbumClientConfig, HttpAlbumClient},
        customer_service::CustomerService,
        enrichment::DEFAULT_ENRICH_WORKERS,
        lead_provisioning::{FlowPolicies, PhotoAttachPolicy},
    },
};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:3000";
const DEFAULT_ALBUM_TIMEOUT_SECS: u64 = 10;

/// Configuração lida uma única vez do ambiente (e do `.env`, se existir).
#[derive(Debug, Clone)]
pub struct Settings {
    pub database_url: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub album: AlbumClientConfig,
    pub enrich_workers: usize,
    pub policies: FlowPolicies,
}

impl Settings {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let required = |key: &str| var(key).with_context(|| format!("{} deve ser definida", key));
        let defaults = FlowPolicies::default();

        let timeout_secs = match var("ALBUM_TIMEOUT_SECS") {
            Some(v) => v.parse::<u64>().context("ALBUM_TIMEOUT_SECS inválido")?,
            None => DEFAULT_ALBUM_TIMEOUT_SECS,
        };
        let enrich_workers = match var("ENRICH_WORKERS") {
            Some(v) => v.parse::<usize>().context("ENRICH_WORKERS inválido")?,
            None => DEFAULT_ENRICH_WORKERS,
        };
        let policy = |key: &str, default: PhotoAttachPolicy| -> anyhow::Result<PhotoAttachPolicy> {
            match var(key) {
                Some(v) => v.parse().with_context(|| format!("{} inválida", key)),
                None => Ok(default),
            }
        };

        Ok(Self {
            database_url: required("DATABASE_URL")?,
            jwt_secret: required("JWT_SECRET")?,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            album: AlbumClientConfig {
                album_api_url: required("ALBUM_API_URL")?,
                photo_api_url: required("PHOTO_API_URL")?,
                album_password: required("ALBUM_PASSWORD")?,
                timeout: Duration::from_secs(timeout_secs),
            },
            enrich_workers,
            policies: FlowPolicies {
                create_flow: policy("CREATE_FLOW_ATTACH_POLICY", defaults.create_flow)?,
                append_flow: policy("APPEND_FLOW_ATTACH_POLICY", defaults.append_flow)?,
            },
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub db_pool: PgPool,
    pub jwt_secret: String,
    pub customer_service: CustomerService,
}

impl AppState {
    pub async fn new(settings: &Settings) -> anyhow::Result<Self> {
        let db_pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect(&settings.database_url)
            .await?;

        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        // --- Monta o gráfico de dependências ---
        let customer_service = CustomerService::new(
            Arc::new(CustomerRepository::new(db_pool.clone())),
            Arc::new(ApiKeyRepository::new(db_pool.clone())),
            Arc::new(UserRepository::new(db_pool.clone())),
            Arc::new(DeptRepository::new(db_pool.clone())),
            Arc::new(ProductRepository::new(db_pool.clone())),
            Arc::new(HttpAlbumClient::new(settings.album.clone())),
            settings.enrich_workers,
            settings.policies,
        );

        Ok(Self {
            db_pool,
            jwt_secret: settings.jwt_secret.clone(),
            customer_service,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| vars.get(key).cloned()
    }

    const REQUIRED: [(&str, &str); 5] = [
        ("DATABASE_URL", "postgres://localhost/crm"),
        ("JWT_SECRET", "segredo"),
        ("ALBUM_API_URL", "https://album.local/api/1/album/create"),
        ("PHOTO_API_URL", "https://album.local/api/1/image/edit"),
        ("ALBUM_PASSWORD", "123456"),
    ];

    #[test]
    fn applies_defaults() {
        let settings = Settings::from_lookup(lookup(&REQUIRED)).unwrap();

        assert_eq!(settings.bind_addr, DEFAULT_BIND_ADDR);
        assert_eq!(settings.album.timeout, Duration::from_secs(10));
        assert_eq!(settings.enrich_workers, DEFAULT_ENRICH_WORKERS);
        assert_eq!(settings.policies, FlowPolicies::default());
    }

    #[test]
    fn reads_overrides() {
        let mut pairs = REQUIRED.to_vec();
        pairs.extend([
            ("ENRICH_WORKERS", "3"),
            ("ALBUM_TIMEOUT_SECS", "4"),
            ("CREATE_FLOW_ATTACH_POLICY", "skip"),
        ]);

        let settings = Settings::from_lookup(lookup(&pairs)).unwrap();

        assert_eq!(settings.enrich_workers, 3);
        assert_eq!(settings.album.timeout, Duration::from_secs(4));
        assert_eq!(settings.policies.create_flow, PhotoAttachPolicy::SkipLead);
        assert_eq!(settings.policies.append_flow, PhotoAttachPolicy::SkipLead);
    }

    #[test]
    fn missing_or_bad_values_fail() {
        assert!(Settings::from_lookup(lookup(&REQUIRED[1..])).is_err());

        let mut pairs = REQUIRED.to_vec();
        pairs.push(("APPEND_FLOW_ATTACH_POLICY", "talvez"));
        assert!(Settings::from_lookup(lookup(&pairs)).is_err());
    }
}
