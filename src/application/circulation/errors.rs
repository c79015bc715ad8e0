use rust_decimal::Decimal;
use thiserror::Error;

use crate::config::ConfigValidationError;
use crate::domain::{
    AccessDenied, BookId, CloseLoanError, OpenLoanError, PayFineError, ReservationError,
    ReservationStatus,
};

/// 見つからなかったエンティティの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Book,
    Loan,
    Reservation,
    Fine,
}

impl std::fmt::Display for Entity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Entity::Book => "Book",
            Entity::Loan => "Loan",
            Entity::Reservation => "Reservation",
            Entity::Fine => "Fine",
        };
        f.write_str(name)
    }
}

/// 貸出管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum CirculationError {
    /// IDに該当するエンティティがない
    #[error("{0} not found")]
    NotFound(Entity),

    /// 予約の重複、または貸出可能な書籍への予約など
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 貸出が既に終了している
    #[error("Loan already closed")]
    AlreadyClosed,

    /// 延滞料が既に支払済み
    #[error("Fine already paid")]
    AlreadyPaid,

    /// 予約の不正な状態遷移
    #[error("Invalid reservation transition: {} -> {}", .from.as_str(), .to.as_str())]
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },

    /// 貸出可能な冊数がない
    #[error("No copies available")]
    OutOfStock,

    /// 本人でも職員でもない
    #[error("Forbidden")]
    Forbidden,

    /// 在庫の不変条件違反（呼び出し側のバグ）
    #[error("Inventory invariant violated for book {}", .0.value())]
    InventoryInvariantViolation(BookId),

    /// 返却期限が貸出日時より後でない
    #[error("Due date must be after the borrow date")]
    InvalidDueDate,

    /// 貸出ルールの設定値が不正
    #[error("Invalid circulation policy: {0}")]
    InvalidPolicy(#[from] ConfigValidationError),

    /// 金額が不正（負の延滞料、0以下の支払、1セント未満の端数）
    #[error("Invalid amount: {0}")]
    InvalidAmount(Decimal),

    /// ストアのエラー
    #[error("Store error")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<AccessDenied> for CirculationError {
    fn from(_: AccessDenied) -> Self {
        CirculationError::Forbidden
    }
}

impl From<OpenLoanError> for CirculationError {
    fn from(err: OpenLoanError) -> Self {
        match err {
            OpenLoanError::DueDateNotAfterBorrowDate => CirculationError::InvalidDueDate,
        }
    }
}

impl From<CloseLoanError> for CirculationError {
    fn from(err: CloseLoanError) -> Self {
        match err {
            CloseLoanError::AlreadyClosed(_) => CirculationError::AlreadyClosed,
        }
    }
}

impl From<PayFineError> for CirculationError {
    fn from(err: PayFineError) -> Self {
        match err {
            PayFineError::AlreadyPaid => CirculationError::AlreadyPaid,
        }
    }
}

impl From<ReservationError> for CirculationError {
    fn from(err: ReservationError) -> Self {
        match err {
            ReservationError::InvalidTransition { from, to } => {
                CirculationError::InvalidTransition { from, to }
            }
        }
    }
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, CirculationError>;
