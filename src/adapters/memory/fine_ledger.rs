use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::domain::{Fine, FineId, FineStatus, MemberId, Payment};
use crate::ports::fine_ledger::{FineLedger, Result};

use super::{InMemoryUnitOfWork, conflict};

#[async_trait]
impl FineLedger for InMemoryUnitOfWork {
    async fn insert_fine(&mut self, fine: &Fine) -> Result<()> {
        // 貸出1件につき延滞料は1件まで
        if self.working.fines.values().any(|f| f.loan_id == fine.loan_id) {
            return Err(conflict("loan already has a fine"));
        }
        self.working.fines.insert(fine.fine_id, fine.clone());
        Ok(())
    }

    async fn find_fine(&mut self, fine_id: FineId) -> Result<Option<Fine>> {
        Ok(self.working.fines.get(&fine_id).cloned())
    }

    async fn mark_fine_paid(&mut self, fine_id: FineId) -> Result<bool> {
        match self.working.fines.get_mut(&fine_id) {
            Some(fine) if fine.status == FineStatus::Unpaid => {
                fine.status = FineStatus::Paid;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn update_fine_amount(&mut self, fine_id: FineId, amount: Decimal) -> Result<bool> {
        match self.working.fines.get_mut(&fine_id) {
            Some(fine) if fine.status == FineStatus::Unpaid => {
                fine.amount = amount;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        self.working.payments.push(payment.clone());
        Ok(())
    }

    async fn fines_for_member(&mut self, member_id: MemberId) -> Result<Vec<Fine>> {
        let mut fines: Vec<Fine> = self
            .working
            .fines
            .values()
            .filter(|f| f.member_id == member_id)
            .cloned()
            .collect();
        fines.sort_by_key(|f| f.created_at);
        Ok(fines)
    }

    async fn payments_for_member(&mut self, member_id: MemberId) -> Result<Vec<Payment>> {
        Ok(self
            .working
            .payments
            .iter()
            .filter(|p| p.member_id == member_id)
            .cloned()
            .collect())
    }
}
