use jsonwebtoken::{encode, EncodingKey, Header};
use rand::Rng;
use sha2::{Digest, Sha256};
use uuid::Uuid;

use duoq_shared::errors::AppError;
use duoq_shared::types::auth::{Claims, TokenPair};

pub fn create_access_token(
    user_id: Uuid,
    email: &str,
    secret: &str,
    ttl_secs: i64,
) -> Result<String, AppError> {
    let claims = Claims::new(user_id, email, ttl_secs);
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|e| AppError::internal(format!("JWT encoding failed: {e}")))
}

pub fn create_refresh_token() -> String {
    let mut rng = rand::thread_rng();
    let bytes: [u8; 32] = rng.gen();
    hex::encode(bytes)
}

pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Issues an access/refresh pair; returns the pair plus the refresh token's
/// hash, which is what gets persisted.
pub fn create_token_pair(
    user_id: Uuid,
    email: &str,
    secret: &str,
    access_ttl: i64,
) -> Result<(TokenPair, String), AppError> {
    let access_token = create_access_token(user_id, email, secret, access_ttl)?;
    let refresh_token = create_refresh_token();
    let refresh_hash = hash_token(&refresh_token);
    let pair = TokenPair::new(access_token, refresh_token, access_ttl);
    Ok((pair, refresh_hash))
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

    #[test]
    fn access_token_round_trips() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, "a@b.c", "test-secret", 3600).unwrap();

        let decoded = decode::<Claims>(
            &token,
            &DecodingKey::from_secret(b"test-secret"),
            &Validation::new(Algorithm::HS256),
        )
        .unwrap();
        assert_eq!(decoded.claims.sub, user_id);
        assert_eq!(decoded.claims.email, "a@b.c");
    }

    #[test]
    fn refresh_tokens_are_unique_and_hash_stably() {
        let t1 = create_refresh_token();
        let t2 = create_refresh_token();
        assert_ne!(t1, t2);
        assert_eq!(hash_token(&t1), hash_token(&t1));
        assert_ne!(hash_token(&t1), hash_token(&t2));
    }

    #[test]
    fn pair_exposes_the_raw_refresh_token_but_returns_its_hash() {
        let (pair, hash) = create_token_pair(Uuid::new_v4(), "a@b.c", "s", 60).unwrap();
        assert_eq!(hash, hash_token(&pair.refresh_token));
        assert_eq!(pair.token_type, "Bearer");
    }
}
