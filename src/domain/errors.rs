use super::{LoanStatus, ReservationStatus};

/// 在庫操作のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    /// 貸出可能な冊数がない
    OutOfStock,
    /// 解放すると所蔵冊数を超える（取得していない冊の返却）
    ReleaseWithoutAcquire,
    /// 貸出可能冊数が所蔵冊数を超えている
    InvalidCounts { total: u32, available: u32 },
}

/// 貸出開始のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenLoanError {
    /// 返却期限が貸出日時より後でない
    DueDateNotAfterBorrowDate,
}

/// 返却（貸出終了）のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseLoanError {
    /// 既に終了している
    AlreadyClosed(LoanStatus),
}

/// 延滞料支払のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayFineError {
    /// 既に支払済み
    AlreadyPaid,
}

/// 延滞料金額修正のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdjustFineError {
    /// 既に支払済み
    AlreadyPaid,
    /// 負の金額
    NegativeAmount,
    /// 1セント未満の端数がある
    SubCentAmount,
}

/// 予約の状態遷移エラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReservationError {
    /// Pending以外からの遷移、またはPendingへの遷移
    InvalidTransition {
        from: ReservationStatus,
        to: ReservationStatus,
    },
}

/// 権限エラー（本人でも職員でもない）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessDenied;

/// 任意支払のエラー
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentError {
    /// 支払額が0以下
    NonPositiveAmount,
    /// 1セント未満の端数がある
    SubCentAmount,
}
