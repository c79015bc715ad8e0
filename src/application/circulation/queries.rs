use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::{Caller, Fine, FineStatus, Loan, MemberId, Payment, Reservation, access};
use crate::ports::UnitOfWork;

use super::circulation_service::finish;
use super::errors::{CirculationError, Result};

/// 会員の延滞料の集計
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FineSummary {
    pub fines: Vec<Fine>,
    pub unpaid_total: Decimal,
    pub fine_count: usize,
    pub unpaid_count: usize,
}

impl FineSummary {
    fn from_fines(fines: Vec<Fine>) -> Self {
        let unpaid = fines.iter().filter(|f| f.status == FineStatus::Unpaid);
        let unpaid_total = unpaid.clone().map(|f| f.amount).sum();
        let unpaid_count = unpaid.count();

        Self {
            fine_count: fines.len(),
            unpaid_total,
            unpaid_count,
            fines,
        }
    }
}

/// 会員の支払履歴
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentHistory {
    pub payments: Vec<Payment>,
    pub total_paid: Decimal,
}

/// 会員の貸出中の一覧（本人または職員）
pub async fn open_loans(
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    member_id: MemberId,
) -> Result<Vec<Loan>> {
    let outcome = match access::authorize(caller, member_id) {
        Ok(()) => uow
            .open_loans_for_member(member_id)
            .await
            .map_err(CirculationError::Store),
        Err(denied) => Err(denied.into()),
    };
    finish(uow, outcome).await
}

/// 会員の予約の一覧（予約日時の古い順）
pub async fn reservations_of(
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    member_id: MemberId,
) -> Result<Vec<Reservation>> {
    let outcome = match access::authorize(caller, member_id) {
        Ok(()) => uow
            .reservations_for_member(member_id)
            .await
            .map_err(CirculationError::Store),
        Err(denied) => Err(denied.into()),
    };
    finish(uow, outcome).await
}

/// 会員の延滞料の集計
pub async fn fine_summary(
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    member_id: MemberId,
) -> Result<FineSummary> {
    let outcome = match access::authorize(caller, member_id) {
        Ok(()) => uow
            .fines_for_member(member_id)
            .await
            .map(FineSummary::from_fines)
            .map_err(CirculationError::Store),
        Err(denied) => Err(denied.into()),
    };
    finish(uow, outcome).await
}

/// 会員の支払履歴と合計額
pub async fn payment_history(
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    member_id: MemberId,
) -> Result<PaymentHistory> {
    let outcome = match access::authorize(caller, member_id) {
        Ok(()) => uow
            .payments_for_member(member_id)
            .await
            .map(|payments| PaymentHistory {
                total_paid: payments.iter().map(|p| p.amount_paid).sum(),
                payments,
            })
            .map_err(CirculationError::Store),
        Err(denied) => Err(denied.into()),
    };
    finish(uow, outcome).await
}

/// 返却期限を過ぎた貸出中の一覧（職員のみ）
///
/// 「貸出中かつ期限切れ」は保存される状態ではなく、`now`から導出する。
pub async fn past_due_loans(
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    now: DateTime<Utc>,
) -> Result<Vec<Loan>> {
    let outcome = match access::require_staff(caller) {
        Ok(()) => uow
            .past_due_loans(now)
            .await
            .map_err(CirculationError::Store),
        Err(denied) => Err(denied.into()),
    };
    finish(uow, outcome).await
}
