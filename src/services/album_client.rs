// src/services/album_client.rs
//
// Cliente do serviço externo de álbuns de fotos.
// O serviço é opaco: cada chamada pode falhar ou estourar o timeout de forma
// independente, e nada do que ele cria é desfeito se o pedido falhar depois.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    common::error::AppError,
    models::crm::{AlbumCredential, CUSTOMER_PHOTO_CATEGORY},
};

#[async_trait]
pub trait AlbumService: Send + Sync {
    /// Cria um álbum raiz e devolve o id (codificado) do álbum.
    async fn create_album(
        &self,
        credential: &AlbumCredential,
        name: &str,
        description: &str,
    ) -> Result<String, AppError>;

    /// Cria um álbum aninhado em `parent_album_id`.
    async fn create_sub_album(
        &self,
        credential: &AlbumCredential,
        name: &str,
        description: &str,
        parent_album_id: &str,
    ) -> Result<String, AppError>;

    /// Move as fotos da galeria para o álbum.
    async fn attach_photos(
        &self,
        credential: &AlbumCredential,
        photo_ids: &[String],
        album_id: &str,
    ) -> Result<(), AppError>;
}

#[derive(Debug, Clone)]
pub struct AlbumClientConfig {
    pub album_api_url: String,
    pub photo_api_url: String,
    pub album_password: String,
    pub timeout: Duration,
}

// Implementação HTTP (formulário urlencoded, resposta JSON).
// `ureq` é bloqueante, então cada chamada roda em `spawn_blocking`.
#[derive(Clone)]
pub struct HttpAlbumClient {
    agent: ureq::Agent,
    config: AlbumClientConfig,
}

#[derive(Debug, Deserialize)]
struct AlbumReply {
    album: AlbumInfo,
}

#[derive(Debug, Deserialize)]
struct AlbumInfo {
    id_encoded: String,
}

impl HttpAlbumClient {
    pub fn new(config: AlbumClientConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.timeout)
            .build();
        Self { agent, config }
    }

    fn album_form(
        &self,
        credential: &AlbumCredential,
        name: &str,
        description: &str,
        parent_album_id: Option<&str>,
    ) -> Vec<(String, String)> {
        let mut form = vec![
            ("key".to_string(), credential.key.clone()),
            ("type".to_string(), "album".to_string()),
            ("album[name]".to_string(), name.to_string()),
            ("album[description]".to_string(), description.to_string()),
            ("album[privacy]".to_string(), "password".to_string()),
            ("album[password]".to_string(), self.config.album_password.clone()),
            ("album[new]".to_string(), "true".to_string()),
        ];
        if let Some(parent) = parent_album_id {
            form.push(("album[parent_id]".to_string(), parent.to_string()));
        }
        form
    }

    async fn post_album_form(&self, form: Vec<(String, String)>) -> Result<String, AppError> {
        let agent = self.agent.clone();
        let url = self.config.album_api_url.clone();

        let body = run_blocking(move || post_form(&agent, &url, &form)).await?;
        album_id_from_reply(&body)
    }
}

#[async_trait]
impl AlbumService for HttpAlbumClient {
    async fn create_album(
        &self,
        credential: &AlbumCredential,
        name: &str,
        description: &str,
    ) -> Result<String, AppError> {
        let form = self.album_form(credential, name, description, None);
        self.post_album_form(form).await
    }

    async fn create_sub_album(
        &self,
        credential: &AlbumCredential,
        name: &str,
        description: &str,
        parent_album_id: &str,
    ) -> Result<String, AppError> {
        let form = self.album_form(credential, name, description, Some(parent_album_id));
        self.post_album_form(form).await
    }

    async fn attach_photos(
        &self,
        credential: &AlbumCredential,
        photo_ids: &[String],
        album_id: &str,
    ) -> Result<(), AppError> {
        let form = photo_edit_form(credential, photo_ids, album_id);
        let agent = self.agent.clone();
        let url = self.config.photo_api_url.clone();

        run_blocking(move || post_form(&agent, &url, &form)).await?;
        Ok(())
    }
}

fn photo_edit_form(
    credential: &AlbumCredential,
    photo_ids: &[String],
    album_id: &str,
) -> Vec<(String, String)> {
    let mut form = vec![
        ("key".to_string(), credential.key.clone()),
        ("edit".to_string(), "image".to_string()),
        ("editing[album_id]".to_string(), album_id.to_string()),
        ("editing[category_id]".to_string(), CUSTOMER_PHOTO_CATEGORY.to_string()),
    ];
    form.extend(
        photo_ids
            .iter()
            .map(|id| ("editing[ids][]".to_string(), id.clone())),
    );
    form
}

// Qualquer status diferente de 200 conta como falha
fn post_form(agent: &ureq::Agent, url: &str, form: &[(String, String)]) -> Result<String, AppError> {
    let pairs: Vec<(&str, &str)> = form.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();

    match agent.post(url).send_form(&pairs) {
        Ok(resp) if resp.status() == 200 => resp
            .into_string()
            .map_err(|e| AppError::RemoteProvisioning(format!("resposta ilegível: {}", e))),
        Ok(resp) => Err(AppError::RemoteProvisioning(format!("status HTTP {}", resp.status()))),
        Err(ureq::Error::Status(code, resp)) => {
            let body = resp.into_string().unwrap_or_default();
            Err(AppError::RemoteProvisioning(format!("status HTTP {}: {}", code, body)))
        }
        Err(ureq::Error::Transport(transport)) => {
            Err(AppError::RemoteProvisioning(format!("erro de transporte: {}", transport)))
        }
    }
}

fn album_id_from_reply(body: &str) -> Result<String, AppError> {
    let reply: AlbumReply = serde_json::from_str(body)
        .map_err(|e| AppError::RemoteProvisioning(format!("resposta sem álbum: {}", e)))?;
    Ok(reply.album.id_encoded)
}

async fn run_blocking<T, F>(f: F) -> Result<T, AppError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::RemoteProvisioning(format!("falha na task do cliente HTTP: {}", e)))?
}
