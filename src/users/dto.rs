use serde::Serialize;

use super::repo_types::User;

/// Response to a successful create or update.
#[derive(Debug, Serialize)]
pub struct UserEnvelope {
    pub message: &'static str,
    pub user: User,
}

/// Confirmation without a record, e.g. after a delete.
#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
    pub details: &'static str,
}
