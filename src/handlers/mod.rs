// Handlers HTTP do gateway
pub mod health;
pub mod messages;
pub mod templates;
pub mod webhook;

pub use health::*;
pub use messages::*;
pub use templates::*;
pub use webhook::*;

use axum::http::HeaderMap;
use whatsapp_oficial_gateway::utils::AppError;

/// Rotas administrativas exigem `Authorization: Bearer <admin_token>` do
/// tenant dono da conexão.
pub(crate) fn authorize_admin(headers: &HeaderMap, admin_token: &str) -> Result<(), AppError> {
    let provided = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| {
            AppError::ValidationError("Missing Authorization header".to_string())
        })?;

    if provided != admin_token {
        return Err(AppError::ValidationError(
            "Invalid admin token".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers_with(value: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("authorization", value.parse().unwrap());
        headers
    }

    #[test]
    fn test_authorize_admin_requires_matching_bearer() {
        assert!(authorize_admin(&headers_with("Bearer tok"), "tok").is_ok());
        assert!(authorize_admin(&headers_with("Bearer errado"), "tok").is_err());
        assert!(authorize_admin(&headers_with("tok"), "tok").is_err());
        assert!(authorize_admin(&HeaderMap::new(), "tok").is_err());
    }
}
