use axum::{http::StatusCode, Json};
use nanorand::Rng;
use serde::Serialize;

#[derive(Serialize)]
pub struct ErrorMessage {
    pub error: String,
}

pub type ErrorResponse = (StatusCode, Json<ErrorMessage>);

pub fn error_response(status: StatusCode, error: impl ToString) -> ErrorResponse {
    (
        status,
        Json(ErrorMessage {
            error: error.to_string(),
        }),
    )
}

pub fn generate_unique_id(len: usize) -> String {
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789-_";
    let mut result = String::new();
    let mut rng = nanorand::tls_rng();
    for _ in 0..len {
        result.push(char::from(CHARSET[rng.generate_range(0..CHARSET.len())]));
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_have_the_requested_length_and_are_url_safe() {
        let id = generate_unique_id(32);
        assert_eq!(id.len(), 32);
        assert!(id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        assert_ne!(id, generate_unique_id(32));
    }
}
