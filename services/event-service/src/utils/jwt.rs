use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;

/// The claims this service reads from a bearer token. Expiry is enforced by
/// the decoder; unrecognized claims are ignored.
#[derive(Debug, Clone, Deserialize)]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(data.claims)
}
