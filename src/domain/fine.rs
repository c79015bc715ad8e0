use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::{
    AdjustFineError, FineId, LoanId, MemberId, PayFineError, PaymentError, PaymentId,
    PaymentMethod, loan::Loan,
};

/// 金額の小数点以下の桁数（保存時の精度、1セント単位）
pub const MONEY_SCALE: u32 = 2;

/// 金額を保存精度のまま表せるか（末尾の0は無視する）
pub fn is_cent_precise(amount: Decimal) -> bool {
    amount.normalize().scale() <= MONEY_SCALE
}

/// 延滞料ステータス
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FineStatus {
    Unpaid,
    Paid,
}

impl FineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FineStatus::Unpaid => "Unpaid",
            FineStatus::Paid => "Paid",
        }
    }
}

impl std::str::FromStr for FineStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Unpaid" => Ok(FineStatus::Unpaid),
            "Paid" => Ok(FineStatus::Paid),
            _ => Err(format!("Invalid fine status: {}", s)),
        }
    }
}

/// 延滞料 - 期限後に返却された貸出1件につき1件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fine {
    pub fine_id: FineId,
    pub member_id: MemberId,
    pub loan_id: LoanId,
    pub amount: Decimal,
    pub status: FineStatus,
    pub created_at: DateTime<Utc>,
}

/// 支払 - 追記のみ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub payment_id: PaymentId,
    pub member_id: MemberId,
    pub loan_id: Option<LoanId>,
    pub amount_paid: Decimal,
    pub method: PaymentMethod,
    pub paid_at: DateTime<Utc>,
}

/// 純粋関数：終了済みの貸出から延滞料を導出する
///
/// 延滞料が0より大きい終了済みの貸出のみ`Some`を返す。
/// 貸出の終了は1回しか起きないため、貸出と延滞料は1:1になる。
pub fn record_if_late(loan: &Loan, recorded_at: DateTime<Utc>) -> Option<Fine> {
    if loan.is_open() {
        return None;
    }

    let amount = loan.fine_amount.filter(|amount| *amount > Decimal::ZERO)?;

    Some(Fine {
        fine_id: FineId::new(),
        member_id: loan.member_id,
        loan_id: loan.loan_id,
        amount,
        status: FineStatus::Unpaid,
        created_at: recorded_at,
    })
}

/// 純粋関数：延滞料を支払う
///
/// 支払済みの延滞料と、延滞料の金額・貸出・会員を参照する支払を返す。
pub fn pay_fine(
    fine: &Fine,
    method: PaymentMethod,
    paid_at: DateTime<Utc>,
) -> Result<(Fine, Payment), PayFineError> {
    if fine.status == FineStatus::Paid {
        return Err(PayFineError::AlreadyPaid);
    }

    let paid = Fine {
        status: FineStatus::Paid,
        ..fine.clone()
    };

    let payment = Payment {
        payment_id: PaymentId::new(),
        member_id: fine.member_id,
        loan_id: Some(fine.loan_id),
        amount_paid: fine.amount,
        method,
        paid_at,
    };

    Ok((paid, payment))
}

/// 純粋関数：未払の延滞料の金額を修正する（職員による減免など）
pub fn adjust_fine(fine: &Fine, amount: Decimal) -> Result<Fine, AdjustFineError> {
    if fine.status == FineStatus::Paid {
        return Err(AdjustFineError::AlreadyPaid);
    }
    if amount < Decimal::ZERO {
        return Err(AdjustFineError::NegativeAmount);
    }
    if !is_cent_precise(amount) {
        return Err(AdjustFineError::SubCentAmount);
    }

    Ok(Fine {
        amount,
        ..fine.clone()
    })
}

/// 純粋関数：延滞料に紐づかない任意の支払を作成する
pub fn record_payment(
    member_id: MemberId,
    loan_id: Option<LoanId>,
    amount: Decimal,
    method: PaymentMethod,
    paid_at: DateTime<Utc>,
) -> Result<Payment, PaymentError> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::NonPositiveAmount);
    }
    if !is_cent_precise(amount) {
        return Err(PaymentError::SubCentAmount);
    }

    Ok(Payment {
        payment_id: PaymentId::new(),
        member_id,
        loan_id,
        amount_paid: amount,
        method,
        paid_at,
    })
}
