use serde::{Deserialize, Serialize};

/// Who is performing a mutating call. Supplied by the authentication layer
/// and stamped on every ledger entry and repayment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub display_name: String,
}

impl Actor {
    pub fn new(id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Fallback when the caller supplies no user context.
    pub fn system() -> Self {
        Self::new("system", "System")
    }
}
