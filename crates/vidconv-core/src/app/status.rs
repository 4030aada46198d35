//! Status - registry counts for health reporting.

use serde::{Deserialize, Serialize};

/// Number of tracked artifacts, by role and state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryCounts {
    /// Active uploads waiting for (or never given) a conversion.
    pub intake: usize,
    /// Active conversion results waiting for download or expiry.
    pub result: usize,
    /// Claimed for deletion but not yet removed.
    pub pending_deletion: usize,
}

impl RegistryCounts {
    pub fn total(&self) -> usize {
        self.intake + self.result + self.pending_deletion
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_with_plain_field_names() {
        let counts = RegistryCounts {
            intake: 2,
            result: 1,
            pending_deletion: 1,
        };

        assert_eq!(counts.total(), 4);
        assert_eq!(
            serde_json::to_value(counts).unwrap(),
            serde_json::json!({ "intake": 2, "result": 1, "pending_deletion": 1 })
        );
    }
}
