use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub exp: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
}

/// Short-lived token for calls into the hold engine, carrying the booking
/// user's context so the callee can audit the caller.
pub fn create_service_jwt(
    user_id: &str,
    email: &str,
    name: Option<&str>,
    secret: &str,
) -> Result<String, jsonwebtoken::errors::Error> {
    let expiration = Utc::now() + Duration::hours(1);

    let claims = Claims {
        user_id: user_id.to_string(),
        email: email.to_string(),
        name: name.map(str::to_string),
        exp: expiration.timestamp() as usize,
        iss: Some("booking-service".to_string()),
        sub: Some("service-auth".to_string()),
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_token_round_trip() {
        let token =
            create_service_jwt("u1", "jo@example.com", Some("Jo"), "secret").expect("token");
        let claims = verify_jwt(&token, "secret").expect("claims");
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.email, "jo@example.com");
        assert_eq!(claims.name.as_deref(), Some("Jo"));
        assert_eq!(claims.iss.as_deref(), Some("booking-service"));
        assert_eq!(claims.sub.as_deref(), Some("service-auth"));
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let token = create_service_jwt("u1", "jo@example.com", None, "secret").expect("token");
        assert!(verify_jwt(&token, "other-secret").is_err());
    }
}
