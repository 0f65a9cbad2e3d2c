use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{AccountId, Actor, Amount, LedgerEntry, ReferenceId, SourceType};

/// A request to move money between two accounts. Transfers are not persisted
/// on their own: they exist as two ledger legs sharing one reference.
/// Corrections are made with an equal-and-opposite transfer, never by deleting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRequest {
    /// Source account (balance decreases)
    pub from_account: AccountId,
    /// Destination account (balance increases)
    pub to_account: AccountId,
    /// Always positive
    pub amount: Amount,
    pub description: String,
}

impl TransferRequest {
    pub fn new(
        from_account: AccountId,
        to_account: AccountId,
        amount: Amount,
        description: impl Into<String>,
    ) -> Self {
        Self {
            from_account,
            to_account,
            amount,
            description: description.into(),
        }
    }

    /// The request that undoes this one.
    pub fn reversed(&self) -> Self {
        Self::new(
            self.to_account,
            self.from_account,
            self.amount,
            format!("Reversal of: {}", self.description),
        )
    }

    /// Build both legs under a freshly generated reference.
    pub fn legs(&self, actor: &Actor) -> TransferLegs {
        let reference = Uuid::new_v4();
        TransferLegs {
            reference,
            outflow: LedgerEntry::new(
                self.from_account,
                SourceType::TransferOut,
                self.amount,
                reference,
                self.description.clone(),
                actor,
            ),
            inflow: LedgerEntry::new(
                self.to_account,
                SourceType::TransferIn,
                self.amount,
                reference,
                self.description.clone(),
                actor,
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransferLegs {
    pub reference: ReferenceId,
    pub outflow: LedgerEntry,
    pub inflow: LedgerEntry,
}

impl TransferLegs {
    /// Reassemble the original request from the two stored legs. Legs must
    /// share a reference and amount and be of opposite kinds.
    pub fn from_entries(entries: &[LedgerEntry]) -> Option<TransferLegs> {
        let outflow = entries
            .iter()
            .find(|e| e.source_type == SourceType::TransferOut)?;
        let inflow = entries
            .iter()
            .find(|e| e.source_type == SourceType::TransferIn)?;
        if entries.len() != 2
            || outflow.reference_id != inflow.reference_id
            || outflow.amount != inflow.amount
        {
            return None;
        }
        Some(TransferLegs {
            reference: outflow.reference_id,
            outflow: outflow.clone(),
            inflow: inflow.clone(),
        })
    }

    pub fn request(&self) -> TransferRequest {
        TransferRequest::new(
            self.outflow.account_id,
            self.inflow.account_id,
            self.outflow.amount,
            self.outflow.description.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Direction;

    fn sample_account_ids() -> (AccountId, AccountId) {
        (Uuid::new_v4(), Uuid::new_v4())
    }

    #[test]
    fn test_legs_share_reference_and_oppose() {
        let (from, to) = sample_account_ids();
        let request = TransferRequest::new(from, to, 3_000_000, "Setor ke bank");
        let legs = request.legs(&Actor::new("u-1", "Admin"));

        assert_eq!(legs.outflow.reference_id, legs.reference);
        assert_eq!(legs.inflow.reference_id, legs.reference);
        assert_eq!(legs.outflow.account_id, from);
        assert_eq!(legs.inflow.account_id, to);
        assert_eq!(legs.outflow.direction, Direction::Outflow);
        assert_eq!(legs.inflow.direction, Direction::Inflow);
        assert_eq!(legs.outflow.signed_amount() + legs.inflow.signed_amount(), 0);
    }

    #[test]
    fn test_each_call_generates_a_new_reference() {
        let (from, to) = sample_account_ids();
        let request = TransferRequest::new(from, to, 100, "");
        let actor = Actor::system();
        assert_ne!(request.legs(&actor).reference, request.legs(&actor).reference);
    }

    #[test]
    fn test_reversed_swaps_accounts() {
        let (from, to) = sample_account_ids();
        let request = TransferRequest::new(from, to, 5000, "Original");
        let reversal = request.reversed();

        assert_eq!(reversal.from_account, to);
        assert_eq!(reversal.to_account, from);
        assert_eq!(reversal.amount, 5000);
        assert_eq!(reversal.description, "Reversal of: Original");
    }

    #[test]
    fn test_from_entries_round_trip() {
        let (from, to) = sample_account_ids();
        let request = TransferRequest::new(from, to, 5000, "Kas ke bank");
        let legs = request.legs(&Actor::system());
        let stored = vec![legs.inflow.clone(), legs.outflow.clone()];

        let rebuilt = TransferLegs::from_entries(&stored).unwrap();
        assert_eq!(rebuilt.reference, legs.reference);
        assert_eq!(rebuilt.request(), request);
    }

    #[test]
    fn test_from_entries_rejects_incomplete_transfer() {
        let (from, to) = sample_account_ids();
        let legs = TransferRequest::new(from, to, 5000, "").legs(&Actor::system());
        assert!(TransferLegs::from_entries(&[legs.outflow]).is_none());
    }
}
