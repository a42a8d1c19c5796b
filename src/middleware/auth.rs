use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // subject - the user id
    pub exp: i64,    // expiration time (unix timestamp)
}

/// Validate a bearer token and extract its claims. Malformed, expired and
/// wrongly signed tokens all collapse to `Unauthorized`.
pub fn verify_jwt(token: &str, secret: &str) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::new(Algorithm::HS256),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::Unauthorized)
}

/// Validate the token and resolve it to a user id.
pub fn authenticate(token: &str, secret: &str) -> Result<Uuid, AppError> {
    let claims = verify_jwt(token, secret)?;
    Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)
}

pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Middleware that authenticates every REST request and puts the caller's
/// user id into the request extensions for the `AuthUser` extractor.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or(AppError::Unauthorized)?;
    let user_id = authenticate(&token, &state.config.jwt_secret)?;

    req.extensions_mut().insert(user_id);

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "unit-test-secret";

    fn token_for(sub: &str, exp: i64) -> String {
        let claims = Claims {
            sub: sub.to_string(),
            exp,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn valid_token_resolves_to_user() {
        let user_id = Uuid::new_v4();
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = token_for(&user_id.to_string(), exp);

        assert_eq!(authenticate(&token, SECRET).unwrap(), user_id);
    }

    #[test]
    fn expired_token_is_unauthorized() {
        let exp = chrono::Utc::now().timestamp() - 3600;
        let token = token_for(&Uuid::new_v4().to_string(), exp);

        assert!(matches!(
            authenticate(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn wrong_secret_is_unauthorized() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = token_for(&Uuid::new_v4().to_string(), exp);

        assert!(matches!(
            authenticate(&token, "other-secret"),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn non_uuid_subject_is_unauthorized() {
        let exp = chrono::Utc::now().timestamp() + 3600;
        let token = token_for("not-a-uuid", exp);

        assert!(matches!(
            authenticate(&token, SECRET),
            Err(AppError::Unauthorized)
        ));
    }
}
