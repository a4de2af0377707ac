// src/models/auth.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// Permissões que controlam a visibilidade da listagem de clientes
pub const PERM_MEMBER_VIEW: &str = "member:view";
pub const PERM_ADMIN_MEMBER_VIEW: &str = "admin:member:view";

// Grupos: quanto menor, mais privilegiado.
// Até este grupo o usuário pode escolher a província do cliente.
pub const GROUP_ADMIN_MAX: i32 = 2;
// A partir deste grupo (especialistas) não se lista leads de um cliente.
pub const GROUP_SPECIALIST: i32 = 5;

// Estrutura de dados ("claims") dentro do JWT.
// O token é emitido pelo serviço de autenticação; aqui só validamos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,  // Subject (ID do usuário)
    pub dept: Uuid, // Departamento do usuário
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    pub group: i32,
    #[serde(default)]
    pub perms: Vec<String>,
    pub exp: usize, // Expiration time (quando o token expira)
}

impl Claims {
    pub fn has_perm(&self, perm: &str) -> bool {
        self.perms.iter().any(|p| p == perm)
    }

    pub fn is_admin_group(&self) -> bool {
        self.group <= GROUP_ADMIN_MAX
    }
}
