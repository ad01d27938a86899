use serde::Deserialize;
use thiserror::Error;

/// Error body returned by PostgREST, carrying the Postgres SQLSTATE in `code`.
#[derive(Debug, Clone, Deserialize)]
pub struct PostgrestError {
    pub code: Option<String>,
    pub message: Option<String>,
    pub details: Option<String>,
    pub hint: Option<String>,
}

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Write conflicts with existing row: {0}")]
    Conflict(String),

    #[error("Transaction could not be serialized: {0}")]
    SerializationFailure(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Client configuration error: {0}")]
    Configuration(String),

    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Decode error: {0}")]
    Decode(#[from] serde_json::Error),
}

impl DatabaseError {
    pub fn from_response(status: u16, body: String, detail: Option<PostgrestError>) -> Self {
        let code = detail.as_ref().and_then(|d| d.code.clone()).unwrap_or_default();
        let message = detail
            .as_ref()
            .and_then(|d| d.message.clone())
            .unwrap_or(body);

        match code.as_str() {
            // serialization_failure, deadlock_detected
            "40001" | "40P01" => return DatabaseError::SerializationFailure(message),
            // unique_violation, exclusion_violation
            "23505" | "23P01" => return DatabaseError::Conflict(message),
            _ => {}
        }

        match status {
            401 | 403 => DatabaseError::Auth(message),
            404 => DatabaseError::NotFound(message),
            409 => DatabaseError::Conflict(message),
            _ => DatabaseError::Api { status, message },
        }
    }
}
