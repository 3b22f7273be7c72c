//! Admin API request and response types.

use serde::{Deserialize, Serialize};

/// Result of clearing every winner record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetWinnersResponse {
    pub deleted_count: u64,
}
