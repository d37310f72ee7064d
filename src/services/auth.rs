// src/services/auth.rs

use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::error::AppError;

// Claims do token emitido pelo serviço de identidade hospedado
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub email: Option<String>,
    pub role: Option<String>,
    pub exp: usize,
}

// Usuário já validado, disponível nos extensions da requisição
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub email: Option<String>,
}

/// O backend não emite tokens nem guarda senhas: só valida o JWT (HS256).
#[derive(Clone)]
pub struct AuthService {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl AuthService {
    pub fn new(jwt_secret: &str, audience: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[audience]);
        Self {
            decoding_key: DecodingKey::from_secret(jwt_secret.as_bytes()),
            validation,
        }
    }

    pub fn validate_token(&self, token: &str) -> Result<AuthenticatedUser, AppError> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
            tracing::debug!("Token rejeitado: {}", e);
            AppError::InvalidToken
        })?;

        Ok(AuthenticatedUser {
            id: token_data.claims.sub,
            email: token_data.claims.email,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;

    const SECRET: &str = "segredo-de-teste";

    fn token(aud: &str, exp_offset: i64, secret: &str) -> String {
        let exp = chrono::Utc::now().timestamp() + exp_offset;
        let claims = json!({
            "sub": "7f9c24e8-3b12-4fef-91e0-3a6f1b2c4d5e",
            "email": "dono@example.com",
            "role": "authenticated",
            "aud": aud,
            "exp": exp,
        });
        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes())).unwrap()
    }

    #[test]
    fn accepts_a_valid_token() {
        let service = AuthService::new(SECRET, "authenticated");
        let user = service.validate_token(&token("authenticated", 3600, SECRET)).unwrap();
        assert_eq!(user.id.to_string(), "7f9c24e8-3b12-4fef-91e0-3a6f1b2c4d5e");
        assert_eq!(user.email.as_deref(), Some("dono@example.com"));
    }

    #[test]
    fn rejects_wrong_audience_secret_or_expired() {
        let service = AuthService::new(SECRET, "authenticated");
        for bad in [
            token("anon", 3600, SECRET),
            token("authenticated", 3600, "outro-segredo"),
            token("authenticated", -3600, SECRET),
        ] {
            assert!(matches!(service.validate_token(&bad), Err(AppError::InvalidToken)));
        }
    }
}
