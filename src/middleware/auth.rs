// src/middleware/auth.rs

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{decode, DecodingKey, Validation};

use crate::{common::error::AppError, config::AppState, models::auth::Claims};

/// Valida o Bearer token e deixa as `Claims` nos extensions da requisição.
pub async fn auth_guard(
    State(app_state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get("Authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .ok_or(AppError::InvalidToken)?;

    let claims = validate_token(&app_state.jwt_secret, token)?;
    request.extensions_mut().insert(claims);

    Ok(next.run(request).await)
}

pub fn validate_token(secret: &str, token: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| {
        tracing::debug!("Token rejeitado: {}", e);
        AppError::InvalidToken
    })
}

// Extrator para obter o usuário autenticado diretamente nos handlers
#[derive(Debug, Clone)]
pub struct AuthenticatedUser(pub Claims);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Claims>()
            .cloned()
            .map(AuthenticatedUser)
            .ok_or(AppError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use uuid::Uuid;

    fn token(secret: &str, exp: i64) -> (Claims, String) {
        let claims = Claims {
            sub: Uuid::new_v4(),
            dept: Uuid::new_v4(),
            zone: None,
            city: Some("Hà Nội".into()),
            group: 3,
            perms: vec!["member:view".into()],
            exp: exp as usize,
        };
        let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_ref())).unwrap();
        (claims, token)
    }

    #[test]
    fn accepts_token_signed_with_our_secret() {
        let (claims, token) = token("segredo", Utc::now().timestamp() + 600);

        let decoded = validate_token("segredo", &token).unwrap();

        assert_eq!(decoded.sub, claims.sub);
        assert_eq!(decoded.perms, claims.perms);
    }

    #[test]
    fn rejects_wrong_secret_and_expired_token() {
        let (_, token_a) = token("outro", Utc::now().timestamp() + 600);
        let (_, token_b) = token("segredo", Utc::now().timestamp() - 3600);

        assert!(matches!(validate_token("segredo", &token_a), Err(AppError::InvalidToken)));
        assert!(matches!(validate_token("segredo", &token_b), Err(AppError::InvalidToken)));
    }
}
