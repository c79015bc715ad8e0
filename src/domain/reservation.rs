use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, LoanId, MemberId, ReservationError, ReservationId, loan::add_days};

/// 予約の有効期間の既定値（日数）
pub const RESERVATION_HOLD_DAYS: i64 = 7;

/// 予約ステータス
///
/// Fulfilled, Cancelled, Expired は終端状態で、再びPendingには戻らない。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReservationStatus {
    Pending,
    Fulfilled,
    Cancelled,
    Expired,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "Pending",
            ReservationStatus::Fulfilled => "Fulfilled",
            ReservationStatus::Cancelled => "Cancelled",
            ReservationStatus::Expired => "Expired",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, ReservationStatus::Pending)
    }
}

impl std::str::FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Pending" => Ok(ReservationStatus::Pending),
            "Fulfilled" => Ok(ReservationStatus::Fulfilled),
            "Cancelled" => Ok(ReservationStatus::Cancelled),
            "Expired" => Ok(ReservationStatus::Expired),
            _ => Err(format!("Invalid reservation status: {}", s)),
        }
    }
}

/// 予約（取り置き）
///
/// `loan_id`は予約が充足されたときに作成された貸出を指す。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub reservation_id: ReservationId,
    pub member_id: MemberId,
    pub book_id: BookId,
    pub reserved_at: DateTime<Utc>,
    pub expiry_date: DateTime<Utc>,
    pub status: ReservationStatus,
    pub loan_id: Option<LoanId>,
}

impl Reservation {
    pub fn is_pending(&self) -> bool {
        self.status == ReservationStatus::Pending
    }

    /// Pendingのまま有効期限を過ぎているか
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && self.expiry_date < now
    }
}

/// 純粋関数：予約を作成する
///
/// 有効期限は予約日時 + `hold_days`日。
/// `hold_days`が正でない、または期限が日時の範囲を超える場合は`None`。
/// 在庫や重複の確認はサービス層で行う。
pub fn place_reservation(
    member_id: MemberId,
    book_id: BookId,
    reserved_at: DateTime<Utc>,
    hold_days: i64,
) -> Option<Reservation> {
    let expiry_date = add_days(reserved_at, hold_days)?;
    Some(Reservation {
        reservation_id: ReservationId::new(),
        member_id,
        book_id,
        reserved_at,
        expiry_date,
        status: ReservationStatus::Pending,
        loan_id: None,
    })
}

/// 純粋関数：予約の状態を遷移させる
///
/// Pendingから終端状態への遷移のみ許可する。
pub fn transition(
    reservation: &Reservation,
    to: ReservationStatus,
) -> Result<Reservation, ReservationError> {
    if !reservation.is_pending() || !to.is_terminal() {
        return Err(ReservationError::InvalidTransition {
            from: reservation.status,
            to,
        });
    }

    Ok(Reservation {
        status: to,
        ..reservation.clone()
    })
}

/// 純粋関数：予約を充足し、作成された貸出を記録する
pub fn fulfill(
    reservation: &Reservation,
    loan_id: LoanId,
) -> Result<Reservation, ReservationError> {
    let fulfilled = transition(reservation, ReservationStatus::Fulfilled)?;
    Ok(Reservation {
        loan_id: Some(loan_id),
        ..fulfilled
    })
}

/// 次に充足すべき予約（予約日時の古い順、同時刻なら先に並んだもの）
pub fn next_in_line<'a, I>(queue: I, book_id: BookId) -> Option<&'a Reservation>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    queue
        .into_iter()
        .filter(|r| r.book_id == book_id && r.is_pending())
        .min_by_key(|r| r.reserved_at)
}
