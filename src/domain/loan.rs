use chrono::{DateTime, Duration, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use super::{BookId, CloseLoanError, LoanId, MemberId, OpenLoanError, fine::MONEY_SCALE};

/// 貸出期間の既定値（日数）
pub const LOAN_PERIOD_DAYS: i64 = 14;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// 貸出ステータス
///
/// `Overdue`は「期限を過ぎて返却された（終了済み）」を意味する。
/// 「未返却かつ期限切れ」は保存されず、`Loan::is_past_due`で導出する。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// 貸出中
    Borrowed,
    /// 期限内に返却済み
    Returned,
    /// 期限後に返却済み
    Overdue,
}

impl LoanStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoanStatus::Borrowed => "Borrowed",
            LoanStatus::Returned => "Returned",
            LoanStatus::Overdue => "Overdue",
        }
    }

    pub fn is_open(&self) -> bool {
        matches!(self, LoanStatus::Borrowed)
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Borrowed" => Ok(LoanStatus::Borrowed),
            "Returned" => Ok(LoanStatus::Returned),
            "Overdue" => Ok(LoanStatus::Overdue),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

/// 貸出 - 1冊の書籍の1回の貸出
///
/// 不変条件：
/// - `returned_at`が設定されている ⇔ `status != Borrowed`
/// - `fine_amount`が設定されている ⇔ 終了済み
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub loan_id: LoanId,
    pub book_id: BookId,
    pub member_id: MemberId,
    pub borrowed_at: DateTime<Utc>,
    pub due_date: DateTime<Utc>,
    pub returned_at: Option<DateTime<Utc>>,
    pub status: LoanStatus,
    pub fine_amount: Option<Decimal>,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }

    /// 未返却のまま返却期限を過ぎているか
    pub fn is_past_due(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && now > self.due_date
    }
}

/// 返却の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoanClosure {
    pub status: LoanStatus,
    pub days_late: i64,
    pub fine_amount: Decimal,
}

/// `at`に正の日数を加算する。日数が正でない、または日時の範囲を超える場合は`None`
pub fn add_days(at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    if days <= 0 {
        return None;
    }
    Duration::try_days(days).and_then(|period| at.checked_add_signed(period))
}

/// 返却期限の既定値（貸出日時 + 貸出期間）
pub fn default_due_date(
    borrowed_at: DateTime<Utc>,
    loan_period_days: i64,
) -> Option<DateTime<Utc>> {
    add_days(borrowed_at, loan_period_days)
}

/// 純粋関数：貸出を開始する
///
/// ビジネスルール：
/// - 返却期限は貸出日時より厳密に後であること
/// - 状態はBorrowed
///
/// 在庫の変更は行わない（サービス層で合成する）。
pub fn open_loan(
    book_id: BookId,
    member_id: MemberId,
    borrowed_at: DateTime<Utc>,
    due_date: DateTime<Utc>,
) -> Result<Loan, OpenLoanError> {
    if due_date <= borrowed_at {
        return Err(OpenLoanError::DueDateNotAfterBorrowDate);
    }

    Ok(Loan {
        loan_id: LoanId::new(),
        book_id,
        member_id,
        borrowed_at,
        due_date,
        returned_at: None,
        status: LoanStatus::Borrowed,
        fine_amount: None,
    })
}

/// 延滞日数：`max(0, ceil((returned_at - due_date) / 1日))`
pub fn days_late(due_date: DateTime<Utc>, returned_at: DateTime<Utc>) -> i64 {
    let late_millis = (returned_at - due_date).num_milliseconds();
    if late_millis <= 0 {
        return 0;
    }
    (late_millis + MILLIS_PER_DAY - 1) / MILLIS_PER_DAY
}

/// 延滞料：延滞日数 × 日額
///
/// 保存精度（1セント）に四捨五入し、負にはならない。
pub fn fine_for(days_late: i64, rate_per_day: Decimal) -> Decimal {
    (Decimal::from(days_late.max(0)) * rate_per_day)
        .max(Decimal::ZERO)
        .round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// 純粋関数：貸出を終了する（返却）
///
/// ビジネスルール：
/// - Borrowed状態のみ返却可能
/// - 延滞日数 > 0 ならOverdue、それ以外はReturned
/// - 延滞料 = 延滞日数 × 日額（0の場合も記録する）
///
/// 副作用なし。終了後のLoanと結果を返す。
pub fn close_loan(
    loan: &Loan,
    returned_at: DateTime<Utc>,
    rate_per_day: Decimal,
) -> Result<(Loan, LoanClosure), CloseLoanError> {
    if !loan.is_open() {
        return Err(CloseLoanError::AlreadyClosed(loan.status));
    }

    let days_late = days_late(loan.due_date, returned_at);
    let fine_amount = fine_for(days_late, rate_per_day);
    let status = if days_late > 0 {
        LoanStatus::Overdue
    } else {
        LoanStatus::Returned
    };

    let closed = Loan {
        returned_at: Some(returned_at),
        status,
        fine_amount: Some(fine_amount),
        ..loan.clone()
    };

    let closure = LoanClosure {
        status,
        days_late,
        fine_amount,
    };

    Ok((closed, closure))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    fn sample_loan(borrowed_at: DateTime<Utc>, due_date: DateTime<Utc>) -> Loan {
        open_loan(BookId::new(), MemberId::new(), borrowed_at, due_date).unwrap()
    }

    #[test]
    fn test_open_loan_creates_borrowed_loan() {
        let book_id = BookId::new();
        let member_id = MemberId::new();
        let borrowed_at = at(2024, 1, 1);
        let due_date = default_due_date(borrowed_at, LOAN_PERIOD_DAYS).unwrap();

        let loan = open_loan(book_id, member_id, borrowed_at, due_date).unwrap();

        assert_eq!(loan.due_date, at(2024, 1, 15));
        assert_eq!(loan.status, LoanStatus::Borrowed);
        assert_eq!(loan.book_id, book_id);
        assert_eq!(loan.member_id, member_id);
        assert!(loan.returned_at.is_none());
        assert!(loan.fine_amount.is_none());
    }

    #[test]
    fn test_open_loan_rejects_due_date_not_in_future() {
        let borrowed_at = at(2024, 1, 10);

        let same = open_loan(BookId::new(), MemberId::new(), borrowed_at, borrowed_at);
        assert_eq!(same, Err(OpenLoanError::DueDateNotAfterBorrowDate));

        let past = open_loan(BookId::new(), MemberId::new(), borrowed_at, at(2024, 1, 9));
        assert_eq!(past, Err(OpenLoanError::DueDateNotAfterBorrowDate));
    }

    #[test]
    fn test_days_late_rounds_partial_days_up() {
        let due = at(2024, 1, 10);
        assert_eq!(days_late(due, due), 0);
        assert_eq!(days_late(due, due - Duration::days(3)), 0);
        assert_eq!(days_late(due, due + Duration::minutes(1)), 1);
        assert_eq!(days_late(due, due + Duration::days(1)), 1);
        assert_eq!(days_late(due, due + Duration::days(1) + Duration::seconds(1)), 2);
        assert_eq!(days_late(due, at(2024, 1, 15)), 5);
    }

    #[test]
    fn test_close_loan_on_time() {
        let loan = sample_loan(at(2024, 1, 1), at(2024, 1, 10));
        let returned_at = at(2024, 1, 9);

        let (closed, closure) = close_loan(&loan, returned_at, dec!(0.50)).unwrap();

        assert_eq!(closure.status, LoanStatus::Returned);
        assert_eq!(closure.days_late, 0);
        assert_eq!(closure.fine_amount, Decimal::ZERO);
        assert_eq!(closed.status, LoanStatus::Returned);
        assert_eq!(closed.returned_at, Some(returned_at));
        assert_eq!(closed.fine_amount, Some(Decimal::ZERO));
    }

    #[test]
    fn test_close_loan_late_charges_rate_per_day() {
        let loan = sample_loan(at(2024, 1, 1), at(2024, 1, 10));

        let (closed, closure) = close_loan(&loan, at(2024, 1, 15), dec!(0.50)).unwrap();

        assert_eq!(closure.status, LoanStatus::Overdue);
        assert_eq!(closure.days_late, 5);
        assert_eq!(closure.fine_amount, dec!(2.50));
        assert_eq!(closed.status, LoanStatus::Overdue);
        assert_eq!(closed.fine_amount, Some(dec!(2.50)));
    }

    #[test]
    fn test_close_loan_fails_when_already_closed() {
        let loan = sample_loan(at(2024, 1, 1), at(2024, 1, 10));
        let (closed, _) = close_loan(&loan, at(2024, 1, 12), dec!(0.50)).unwrap();

        let result = close_loan(&closed, at(2024, 1, 13), dec!(0.50));
        assert_eq!(
            result,
            Err(CloseLoanError::AlreadyClosed(LoanStatus::Overdue))
        );
    }

    #[test]
    fn test_returned_at_set_iff_not_borrowed() {
        let loan = sample_loan(at(2024, 1, 1), at(2024, 1, 10));
        assert_eq!(loan.returned_at.is_some(), loan.status != LoanStatus::Borrowed);

        for returned_at in [at(2024, 1, 5), at(2024, 2, 5)] {
            let (closed, _) = close_loan(&loan, returned_at, dec!(0.50)).unwrap();
            assert_eq!(
                closed.returned_at.is_some(),
                closed.status != LoanStatus::Borrowed
            );
            assert!(closed.fine_amount.is_some());
        }
    }

    #[test]
    fn test_is_past_due_only_for_open_loans() {
        let loan = sample_loan(at(2024, 1, 1), at(2024, 1, 10));
        assert!(!loan.is_past_due(at(2024, 1, 9)));
        assert!(loan.is_past_due(at(2024, 1, 11)));

        let (closed, _) = close_loan(&loan, at(2024, 1, 12), dec!(0.50)).unwrap();
        assert!(!closed.is_past_due(at(2024, 1, 20)));
    }

    #[test]
    fn test_loan_status_round_trips_through_str() {
        for status in [LoanStatus::Borrowed, LoanStatus::Returned, LoanStatus::Overdue] {
            assert_eq!(status.as_str().parse::<LoanStatus>(), Ok(status));
        }
        assert!("active".parse::<LoanStatus>().is_err());
    }

    #[test]
    fn test_default_due_date_rejects_unusable_periods() {
        let borrowed_at = at(2024, 1, 1);
        assert_eq!(default_due_date(borrowed_at, 14), Some(at(2024, 1, 15)));
        assert_eq!(default_due_date(borrowed_at, 0), None);
        assert_eq!(default_due_date(borrowed_at, -3), None);
        assert_eq!(default_due_date(borrowed_at, i64::MAX), None);
        assert_eq!(add_days(DateTime::<Utc>::MAX_UTC, 1), None);
    }

    #[test]
    fn test_fine_is_rounded_to_cents_and_never_negative() {
        assert_eq!(fine_for(1, dec!(0.125)), dec!(0.13));
        assert_eq!(fine_for(3, dec!(0.125)), dec!(0.38));
        assert_eq!(fine_for(5, dec!(-0.50)), Decimal::ZERO);
        assert_eq!(fine_for(0, dec!(0.50)), Decimal::ZERO);
    }
}
