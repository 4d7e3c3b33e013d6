use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum PlanillaError {
    #[error("Invalid planilla: {0}")]
    Validation(String),

    #[error("Planilla not found: {0}")]
    NotFound(Uuid),

    /// An identifier that cannot name any record, such as a malformed id.
    #[error("Planilla not found: {0}")]
    UnknownId(String),

    #[error("Duplicate planilla id: {0}")]
    DuplicateId(Uuid),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Store error: {0}")]
    Store(String),

    #[error("Config error: {0}")]
    Config(#[from] confique::Error),
}

impl PlanillaError {
    /// HTTP-equivalent status for the error, for callers that front the
    /// store with a request/response protocol.
    pub fn status_code(&self) -> u16 {
        match self {
            PlanillaError::Validation(_) => 400,
            PlanillaError::NotFound(_)
            | PlanillaError::UnknownId(_)
            | PlanillaError::FileNotFound(_) => 404,
            PlanillaError::DuplicateId(_) => 409,
            PlanillaError::Io(_)
            | PlanillaError::Serialization(_)
            | PlanillaError::Store(_)
            | PlanillaError::Config(_) => 500,
        }
    }

    /// Client errors never leave side effects behind.
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status_code())
    }
}

pub type Result<T> = std::result::Result<T, PlanillaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_taxonomy_to_status_codes() {
        assert_eq!(PlanillaError::Validation("x".into()).status_code(), 400);
        assert_eq!(PlanillaError::NotFound(Uuid::new_v4()).status_code(), 404);
        assert_eq!(PlanillaError::UnknownId("abc".into()).status_code(), 404);
        assert_eq!(PlanillaError::FileNotFound("a.png".into()).status_code(), 404);
        assert_eq!(PlanillaError::DuplicateId(Uuid::new_v4()).status_code(), 409);
        let io = std::io::Error::new(std::io::ErrorKind::Other, "disk");
        assert_eq!(PlanillaError::from(io).status_code(), 500);
    }

    #[test]
    fn client_errors_are_4xx() {
        assert!(PlanillaError::Validation("bad".into()).is_client_error());
        assert!(!PlanillaError::Store("boom".into()).is_client_error());
    }
}
