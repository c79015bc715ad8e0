use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{BookId, FineId, LoanId, MemberId, PaymentMethod, ReservationId, ReservationStatus};

/// コマンド：書籍を借りる
///
/// `due_date`が`None`なら貸出期間の既定値を使う。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrow {
    pub member_id: MemberId,
    pub book_id: BookId,
    pub due_date: Option<DateTime<Utc>>,
    pub borrowed_at: DateTime<Utc>,
}

/// コマンド：書籍を返却する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnLoan {
    pub loan_id: LoanId,
    pub returned_at: DateTime<Utc>,
}

/// コマンド：書籍を予約する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reserve {
    pub member_id: MemberId,
    pub book_id: BookId,
    pub reserved_at: DateTime<Utc>,
}

/// コマンド：予約を取り消す
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReservation {
    pub reservation_id: ReservationId,
}

/// コマンド：予約の状態を変更する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReservationStatus {
    pub reservation_id: ReservationId,
    pub status: ReservationStatus,
    pub updated_at: DateTime<Utc>,
}

/// コマンド：延滞料を支払う
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PayFine {
    pub fine_id: FineId,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
}

/// コマンド：延滞料の金額を修正する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustFine {
    pub fine_id: FineId,
    pub amount: Decimal,
}

/// コマンド：任意の支払を記録する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordPayment {
    pub member_id: MemberId,
    pub loan_id: Option<LoanId>,
    pub amount: Decimal,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
}
