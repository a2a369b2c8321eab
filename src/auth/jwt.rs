use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::Error};
use uuid::Uuid;

use crate::models::{Claims, TokenSubject, TokenType};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

/// Signs a token of the given type. The claims are returned alongside so
/// refresh tokens can be recorded by `jti`.
pub fn generate_token(
    subject: &TokenSubject,
    token_type: TokenType,
    secret: &str,
    ttl: usize,
) -> Result<(String, Claims), Error> {
    let claims = Claims {
        user_id: subject.user_id,
        sub: subject.username.clone(),
        role: subject.role,
        exp: now() + ttl,
        jti: Uuid::new_v4().to_string(),
        token_type,
        tenant_id: subject.tenant_id,
        employee_id: subject.employee_id,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok((token, claims))
}

pub fn verify_token(token: &str, secret: &str) -> Result<Claims, Error> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subject() -> TokenSubject {
        TokenSubject {
            user_id: 12,
            username: "ada".into(),
            role: 4,
            tenant_id: Some(7),
            employee_id: Some(1001),
        }
    }

    #[test]
    fn issued_tokens_verify_with_the_same_secret() {
        let (token, issued) = generate_token(&subject(), TokenType::Access, "secret", 60).unwrap();
        let claims = verify_token(&token, "secret").unwrap();

        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.user_id, 12);
        assert_eq!(claims.tenant_id, Some(7));
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let (token, _) = generate_token(&subject(), TokenType::Refresh, "secret", 60).unwrap();
        assert!(verify_token(&token, "other").is_err());
    }

    #[test]
    fn each_token_gets_a_fresh_jti() {
        let (_, a) = generate_token(&subject(), TokenType::Refresh, "secret", 60).unwrap();
        let (_, b) = generate_token(&subject(), TokenType::Refresh, "secret", 60).unwrap();
        assert_ne!(a.jti, b.jti);
    }
}
