use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Loan, LoanId, LoanStatus, MemberId};
use crate::ports::loan_registry::{LoanRegistry, Result};

use super::{InMemoryUnitOfWork, conflict};

#[async_trait]
impl LoanRegistry for InMemoryUnitOfWork {
    async fn insert_loan(&mut self, loan: &Loan) -> Result<()> {
        if self.working.loans.contains_key(&loan.loan_id) {
            return Err(conflict("loan id already exists"));
        }
        self.working.loans.insert(loan.loan_id, loan.clone());
        Ok(())
    }

    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        Ok(self.working.loans.get(&loan_id).cloned())
    }

    async fn close_loan(&mut self, loan: &Loan) -> Result<bool> {
        match self.working.loans.get_mut(&loan.loan_id) {
            Some(stored) if stored.status == LoanStatus::Borrowed => {
                *stored = loan.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn open_loans_for_member(&mut self, member_id: MemberId) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .working
            .loans
            .values()
            .filter(|l| l.member_id == member_id && l.is_open())
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.borrowed_at);
        Ok(loans)
    }

    async fn past_due_loans(&mut self, now: DateTime<Utc>) -> Result<Vec<Loan>> {
        let mut loans: Vec<Loan> = self
            .working
            .loans
            .values()
            .filter(|l| l.is_past_due(now))
            .cloned()
            .collect();
        loans.sort_by_key(|l| l.due_date);
        Ok(loans)
    }
}
