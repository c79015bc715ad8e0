use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::config::CirculationPolicy;
use crate::domain::{
    self, BookId, Caller, Fine, FineId, LoanId, LoanStatus, PaymentId, PaymentMethod,
    Reservation, ReservationId, ReservationStatus, access, commands::*,
};
use crate::ports::*;

use super::errors::{CirculationError, Entity, Result};

/// 貸出の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BorrowReceipt {
    pub loan_id: LoanId,
    pub due_date: DateTime<Utc>,
}

/// 予約充足の結果（返却された冊を受け取った予約と、そのために作成された貸出）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fulfillment {
    pub reservation_id: ReservationId,
    pub loan_id: LoanId,
}

/// 返却の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnReceipt {
    /// Returned または Overdue
    pub status: LoanStatus,
    pub fine_amount: Decimal,
    pub fine_id: Option<FineId>,
    pub fulfillment: Option<Fulfillment>,
}

/// 予約の結果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationReceipt {
    pub reservation_id: ReservationId,
    pub expiry_date: DateTime<Utc>,
}

/// 支払の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentReceipt {
    pub payment_id: PaymentId,
    pub amount_paid: Decimal,
    pub method: PaymentMethod,
}

/// 作業単位を完了させるヘルパー関数
///
/// 操作が成功した場合は確定し、失敗した場合はすべての書き込みを取り消してから
/// 元のエラーを返す。取り消し自体の失敗はログに残すだけで、元のエラーを優先する。
pub(super) async fn finish<T>(uow: Box<dyn UnitOfWork>, outcome: Result<T>) -> Result<T> {
    match outcome {
        Ok(value) => {
            uow.commit().await.map_err(CirculationError::Store)?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = uow.rollback().await {
                tracing::warn!(error = %rollback_err, "Failed to roll back unit of work");
            }
            Err(err)
        }
    }
}

/// 在庫の不変条件違反を運用ログに記録してエラーを作る
fn invariant_violation(book_id: BookId) -> CirculationError {
    tracing::error!(
        book_id = %book_id.value(),
        "Inventory invariant violated: copy count out of bounds"
    );
    CirculationError::InventoryInvariantViolation(book_id)
}

/// 既定の返却期限（日時の範囲を超える場合は返却期限の不正として扱う）
fn default_due_date(policy: &CirculationPolicy, at: DateTime<Utc>) -> Result<DateTime<Utc>> {
    domain::loan::default_due_date(at, policy.loan_period_days)
        .ok_or(CirculationError::InvalidDueDate)
}

/// 書籍を借りる
///
/// ビジネスルール：
/// - 本人、または職員が代理で借りること
/// - 書籍が存在すること
/// - 貸出可能冊数が1以上であること（条件付き更新の結果で判定する）
/// - 返却期限の指定がなければ貸出日時 + 貸出期間
/// - 貸出ルールの設定値が不正なら何も書き込まない
///
/// 在庫の取得と貸出の作成は同じ作業単位で確定する。
#[tracing::instrument(skip_all, fields(member_id = %cmd.member_id.value(), book_id = %cmd.book_id.value()))]
pub async fn borrow(
    policy: &CirculationPolicy,
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    cmd: Borrow,
) -> Result<BorrowReceipt> {
    let outcome = borrow_in(policy, uow.as_mut(), caller, &cmd).await;
    finish(uow, outcome).await
}

async fn borrow_in(
    policy: &CirculationPolicy,
    uow: &mut dyn UnitOfWork,
    caller: &Caller,
    cmd: &Borrow,
) -> Result<BorrowReceipt> {
    // 1. 設定値と権限の確認
    policy.validate()?;
    access::authorize(caller, cmd.member_id)?;

    // 2. 書籍の存在確認
    uow.find_stock(cmd.book_id)
        .await
        .map_err(CirculationError::Store)?
        .ok_or(CirculationError::NotFound(Entity::Book))?;

    // 3. 1冊取得（事前の読み取りではなく、更新できたかどうかで判定）
    let acquired = uow
        .try_acquire_copy(cmd.book_id)
        .await
        .map_err(CirculationError::Store)?;
    if !acquired {
        return Err(CirculationError::OutOfStock);
    }

    // 4. 貸出を作成
    let due_date = match cmd.due_date {
        Some(due_date) => due_date,
        None => default_due_date(policy, cmd.borrowed_at)?,
    };
    let loan = domain::loan::open_loan(cmd.book_id, cmd.member_id, cmd.borrowed_at, due_date)?;

    uow.insert_loan(&loan)
        .await
        .map_err(CirculationError::Store)?;

    tracing::info!(loan_id = %loan.loan_id.value(), %due_date, "Book borrowed");

    Ok(BorrowReceipt {
        loan_id: loan.loan_id,
        due_date,
    })
}

/// 書籍を返却する
///
/// ビジネスルール：
/// - 貸出が存在し、本人または職員であること
/// - Borrowed状態の貸出のみ返却可能（2回目の返却はAlreadyClosed）
/// - 延滞していれば延滞料を1件作成する
/// - 予約充足が有効なら、最も古いPending予約に返却された冊を渡す
///
/// 貸出の終了、在庫の解放、延滞料の作成、予約の充足は同じ作業単位で確定する。
#[tracing::instrument(skip_all, fields(loan_id = %cmd.loan_id.value()))]
pub async fn return_loan(
    policy: &CirculationPolicy,
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    cmd: ReturnLoan,
) -> Result<ReturnReceipt> {
    let outcome = return_loan_in(policy, uow.as_mut(), caller, &cmd).await;
    finish(uow, outcome).await
}

async fn return_loan_in(
    policy: &CirculationPolicy,
    uow: &mut dyn UnitOfWork,
    caller: &Caller,
    cmd: &ReturnLoan,
) -> Result<ReturnReceipt> {
    policy.validate()?;

    // 1. 貸出を取得（行ロック）
    let loan = uow
        .find_loan(cmd.loan_id)
        .await
        .map_err(CirculationError::Store)?
        .ok_or(CirculationError::NotFound(Entity::Loan))?;

    // 2. 権限確認
    access::authorize(caller, loan.member_id)?;

    // 3. ドメイン層の純粋関数で終了後の状態を計算
    let (closed, closure) =
        domain::loan::close_loan(&loan, cmd.returned_at, policy.fine_rate_per_day)?;

    // 4. Borrowedのときだけ書き込む（同時返却の2件目はここで弾かれる）
    let updated = uow
        .close_loan(&closed)
        .await
        .map_err(CirculationError::Store)?;
    if !updated {
        return Err(CirculationError::AlreadyClosed);
    }

    // 5. 在庫を解放
    let released = uow
        .release_copy(loan.book_id)
        .await
        .map_err(CirculationError::Store)?;
    if !released {
        return Err(invariant_violation(loan.book_id));
    }

    // 6. 延滞料
    let fine_id = match domain::fine::record_if_late(&closed, cmd.returned_at) {
        Some(fine) => {
            uow.insert_fine(&fine)
                .await
                .map_err(CirculationError::Store)?;
            Some(fine.fine_id)
        }
        None => None,
    };

    // 7. 予約の充足
    let fulfillment = if policy.fulfill_on_return {
        fulfill_next_reservation(policy, uow, loan.book_id, cmd.returned_at).await?
    } else {
        None
    };

    tracing::info!(
        book_id = %loan.book_id.value(),
        status = closure.status.as_str(),
        fine_amount = %closure.fine_amount,
        fulfilled = fulfillment.is_some(),
        "Book returned"
    );

    Ok(ReturnReceipt {
        status: closure.status,
        fine_amount: closure.fine_amount,
        fine_id,
        fulfillment,
    })
}

/// 返却された冊を最も古いPending予約に渡す
///
/// 有効期限切れの予約は先にExpiredにするため、充足の対象にならない。
/// 直前に解放した冊を取得できない場合は不変条件違反。
async fn fulfill_next_reservation(
    policy: &CirculationPolicy,
    uow: &mut dyn UnitOfWork,
    book_id: BookId,
    at: DateTime<Utc>,
) -> Result<Option<Fulfillment>> {
    uow.expire_pending(at, Some(book_id))
        .await
        .map_err(CirculationError::Store)?;

    let next = uow
        .next_pending_reservation(book_id)
        .await
        .map_err(CirculationError::Store)?;

    let Some(reservation) = next else {
        return Ok(None);
    };

    match hand_over_copy(policy, uow, &reservation, at).await {
        Ok(fulfilled) => Ok(Some(fulfilled)),
        Err(CirculationError::OutOfStock) => Err(invariant_violation(book_id)),
        Err(err) => Err(err),
    }
}

/// 予約者に1冊渡す：在庫を取得し、予約者の貸出を作成して予約をFulfilledにする
async fn hand_over_copy(
    policy: &CirculationPolicy,
    uow: &mut dyn UnitOfWork,
    reservation: &Reservation,
    at: DateTime<Utc>,
) -> Result<Fulfillment> {
    let due_date = default_due_date(policy, at)?;
    let loan =
        domain::loan::open_loan(reservation.book_id, reservation.member_id, at, due_date)?;
    let fulfilled = domain::reservation::fulfill(reservation, loan.loan_id)?;

    let acquired = uow
        .try_acquire_copy(reservation.book_id)
        .await
        .map_err(CirculationError::Store)?;
    if !acquired {
        return Err(CirculationError::OutOfStock);
    }

    uow.insert_loan(&loan)
        .await
        .map_err(CirculationError::Store)?;

    let transitioned = uow
        .transition_reservation(&fulfilled)
        .await
        .map_err(CirculationError::Store)?;
    if !transitioned {
        return Err(CirculationError::InvalidTransition {
            from: reservation.status,
            to: ReservationStatus::Fulfilled,
        });
    }

    tracing::info!(
        reservation_id = %reservation.reservation_id.value(),
        loan_id = %loan.loan_id.value(),
        "Reservation fulfilled"
    );

    Ok(Fulfillment {
        reservation_id: reservation.reservation_id,
        loan_id: loan.loan_id,
    })
}

/// 書籍を予約する
///
/// ビジネスルール：
/// - 本人、または職員が代理で予約すること
/// - 書籍が存在すること
/// - 貸出可能冊数が0であること（貸出可能なら予約は不要）
/// - 同じ書籍のPending予約を既に持っていないこと
/// - 有効期限は予約日時 + 予約有効期間
#[tracing::instrument(skip_all, fields(member_id = %cmd.member_id.value(), book_id = %cmd.book_id.value()))]
pub async fn reserve(
    policy: &CirculationPolicy,
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    cmd: Reserve,
) -> Result<ReservationReceipt> {
    let outcome = reserve_in(policy, uow.as_mut(), caller, &cmd).await;
    finish(uow, outcome).await
}

async fn reserve_in(
    policy: &CirculationPolicy,
    uow: &mut dyn UnitOfWork,
    caller: &Caller,
    cmd: &Reserve,
) -> Result<ReservationReceipt> {
    policy.validate()?;
    access::authorize(caller, cmd.member_id)?;

    let stock = uow
        .find_stock(cmd.book_id)
        .await
        .map_err(CirculationError::Store)?
        .ok_or(CirculationError::NotFound(Entity::Book))?;

    if stock.is_available() {
        return Err(CirculationError::Conflict(
            "Book is available for borrowing, reservation not needed".to_string(),
        ));
    }

    // 期限切れの予約が重複判定を妨げないよう、先に失効させる
    uow.expire_pending(cmd.reserved_at, Some(cmd.book_id))
        .await
        .map_err(CirculationError::Store)?;

    let duplicate = uow
        .has_pending_reservation(cmd.member_id, cmd.book_id)
        .await
        .map_err(CirculationError::Store)?;
    if duplicate {
        return Err(duplicate_reservation());
    }

    let reservation = domain::reservation::place_reservation(
        cmd.member_id,
        cmd.book_id,
        cmd.reserved_at,
        policy.reservation_hold_days,
    )
    .ok_or_else(|| {
        CirculationError::Conflict("Reservation expiry is out of range".to_string())
    })?;

    let inserted = uow
        .insert_reservation(&reservation)
        .await
        .map_err(CirculationError::Store)?;
    if !inserted {
        return Err(duplicate_reservation());
    }

    tracing::info!(
        reservation_id = %reservation.reservation_id.value(),
        expiry_date = %reservation.expiry_date,
        "Reservation created"
    );

    Ok(ReservationReceipt {
        reservation_id: reservation.reservation_id,
        expiry_date: reservation.expiry_date,
    })
}

fn duplicate_reservation() -> CirculationError {
    CirculationError::Conflict(
        "Member already has a pending reservation for this book".to_string(),
    )
}

/// 予約を取り消す
///
/// ビジネスルール：
/// - 予約が存在し、本人または職員であること
/// - Pendingの予約のみ取り消し可能
#[tracing::instrument(skip_all, fields(reservation_id = %cmd.reservation_id.value()))]
pub async fn cancel_reservation(
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    cmd: CancelReservation,
) -> Result<()> {
    let outcome = cancel_reservation_in(uow.as_mut(), caller, &cmd).await;
    finish(uow, outcome).await
}

async fn cancel_reservation_in(
    uow: &mut dyn UnitOfWork,
    caller: &Caller,
    cmd: &CancelReservation,
) -> Result<()> {
    let reservation = find_reservation(uow, cmd.reservation_id).await?;
    access::authorize(caller, reservation.member_id)?;

    let cancelled =
        domain::reservation::transition(&reservation, ReservationStatus::Cancelled)?;
    store_transition(uow, &reservation, &cancelled).await?;

    tracing::info!("Reservation cancelled");
    Ok(())
}

/// 予約の状態を変更する
///
/// ビジネスルール：
/// - Pendingから終端状態への遷移のみ
/// - 本人はCancelledへの変更のみ、職員は任意の終端状態に変更できる
/// - Fulfilledへの変更は返却時の充足と同じく、在庫を1冊取得して予約者の貸出を作成する
///
/// Fulfilledへの変更では返却と同じく書籍の行を先にロックし、その後で予約を読み直す。
#[tracing::instrument(skip_all, fields(reservation_id = %cmd.reservation_id.value(), status = cmd.status.as_str()))]
pub async fn update_reservation_status(
    policy: &CirculationPolicy,
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    cmd: UpdateReservationStatus,
) -> Result<Reservation> {
    let outcome = update_reservation_status_in(policy, uow.as_mut(), caller, &cmd).await;
    finish(uow, outcome).await
}

async fn update_reservation_status_in(
    policy: &CirculationPolicy,
    uow: &mut dyn UnitOfWork,
    caller: &Caller,
    cmd: &UpdateReservationStatus,
) -> Result<Reservation> {
    policy.validate()?;

    let reservation = find_reservation(uow, cmd.reservation_id).await?;
    access::authorize(caller, reservation.member_id)?;
    if cmd.status != ReservationStatus::Cancelled {
        access::require_staff(caller)?;
    }

    if cmd.status == ReservationStatus::Fulfilled {
        uow.find_stock(reservation.book_id)
            .await
            .map_err(CirculationError::Store)?
            .ok_or(CirculationError::NotFound(Entity::Book))?;
        let reservation = find_reservation(uow, cmd.reservation_id).await?;

        if reservation.is_lapsed(cmd.updated_at) {
            return Err(CirculationError::Conflict(
                "Reservation has passed its expiry date".to_string(),
            ));
        }
        let fulfillment = hand_over_copy(policy, uow, &reservation, cmd.updated_at).await?;
        return Ok(Reservation {
            status: ReservationStatus::Fulfilled,
            loan_id: Some(fulfillment.loan_id),
            ..reservation
        });
    }

    let updated = domain::reservation::transition(&reservation, cmd.status)?;
    store_transition(uow, &reservation, &updated).await?;

    tracing::info!("Reservation status updated");
    Ok(updated)
}

async fn find_reservation(
    uow: &mut dyn UnitOfWork,
    reservation_id: ReservationId,
) -> Result<Reservation> {
    uow.find_reservation(reservation_id)
        .await
        .map_err(CirculationError::Store)?
        .ok_or(CirculationError::NotFound(Entity::Reservation))
}

async fn store_transition(
    uow: &mut dyn UnitOfWork,
    before: &Reservation,
    after: &Reservation,
) -> Result<()> {
    let transitioned = uow
        .transition_reservation(after)
        .await
        .map_err(CirculationError::Store)?;
    if !transitioned {
        return Err(CirculationError::InvalidTransition {
            from: before.status,
            to: after.status,
        });
    }
    Ok(())
}

/// 延滞料を支払う
///
/// ビジネスルール：
/// - 延滞料が存在し、本人または職員であること
/// - 未払の延滞料のみ支払可能
/// - 支払済みへの変更と支払の記録は同じ作業単位で確定する
#[tracing::instrument(skip_all, fields(fine_id = %cmd.fine_id.value()))]
pub async fn pay_fine(
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    cmd: PayFine,
) -> Result<PaymentReceipt> {
    let outcome = pay_fine_in(uow.as_mut(), caller, &cmd).await;
    finish(uow, outcome).await
}

async fn pay_fine_in(
    uow: &mut dyn UnitOfWork,
    caller: &Caller,
    cmd: &PayFine,
) -> Result<PaymentReceipt> {
    let fine = find_fine(uow, cmd.fine_id).await?;
    access::authorize(caller, fine.member_id)?;

    let (_, payment) = domain::fine::pay_fine(&fine, cmd.method.clone(), cmd.paid_at)?;

    let marked = uow
        .mark_fine_paid(fine.fine_id)
        .await
        .map_err(CirculationError::Store)?;
    if !marked {
        return Err(CirculationError::AlreadyPaid);
    }

    uow.insert_payment(&payment)
        .await
        .map_err(CirculationError::Store)?;

    tracing::info!(
        payment_id = %payment.payment_id.value(),
        amount_paid = %payment.amount_paid,
        "Fine paid"
    );

    Ok(PaymentReceipt {
        payment_id: payment.payment_id,
        amount_paid: payment.amount_paid,
        method: payment.method,
    })
}

/// 延滞料の金額を修正する（職員のみ）
#[tracing::instrument(skip_all, fields(fine_id = %cmd.fine_id.value()))]
pub async fn adjust_fine(
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    cmd: AdjustFine,
) -> Result<Fine> {
    let outcome = adjust_fine_in(uow.as_mut(), caller, &cmd).await;
    finish(uow, outcome).await
}

async fn adjust_fine_in(
    uow: &mut dyn UnitOfWork,
    caller: &Caller,
    cmd: &AdjustFine,
) -> Result<Fine> {
    access::require_staff(caller)?;

    let fine = find_fine(uow, cmd.fine_id).await?;
    let adjusted = domain::fine::adjust_fine(&fine, cmd.amount).map_err(|e| match e {
        domain::AdjustFineError::AlreadyPaid => CirculationError::AlreadyPaid,
        domain::AdjustFineError::NegativeAmount | domain::AdjustFineError::SubCentAmount => {
            CirculationError::InvalidAmount(cmd.amount)
        }
    })?;

    let updated = uow
        .update_fine_amount(fine.fine_id, adjusted.amount)
        .await
        .map_err(CirculationError::Store)?;
    if !updated {
        return Err(CirculationError::AlreadyPaid);
    }

    tracing::info!(old_amount = %fine.amount, new_amount = %adjusted.amount, "Fine adjusted");
    Ok(adjusted)
}

async fn find_fine(uow: &mut dyn UnitOfWork, fine_id: FineId) -> Result<Fine> {
    uow.find_fine(fine_id)
        .await
        .map_err(CirculationError::Store)?
        .ok_or(CirculationError::NotFound(Entity::Fine))
}

/// 任意の支払を記録する
///
/// ビジネスルール：
/// - 本人、または職員が代理で記録すること
/// - 支払額は0より大きく、1セント単位であること
/// - 貸出を指定する場合、その会員の貸出であること
#[tracing::instrument(skip_all, fields(member_id = %cmd.member_id.value()))]
pub async fn record_payment(
    mut uow: Box<dyn UnitOfWork>,
    caller: &Caller,
    cmd: RecordPayment,
) -> Result<PaymentId> {
    let outcome = record_payment_in(uow.as_mut(), caller, &cmd).await;
    finish(uow, outcome).await
}

async fn record_payment_in(
    uow: &mut dyn UnitOfWork,
    caller: &Caller,
    cmd: &RecordPayment,
) -> Result<PaymentId> {
    access::authorize(caller, cmd.member_id)?;

    if let Some(loan_id) = cmd.loan_id {
        let loan = uow
            .find_loan(loan_id)
            .await
            .map_err(CirculationError::Store)?
            .ok_or(CirculationError::NotFound(Entity::Loan))?;
        if loan.member_id != cmd.member_id {
            return Err(CirculationError::Conflict(
                "Loan belongs to another member".to_string(),
            ));
        }
    }

    let payment = domain::fine::record_payment(
        cmd.member_id,
        cmd.loan_id,
        cmd.amount,
        cmd.method.clone(),
        cmd.paid_at,
    )
    .map_err(|_| CirculationError::InvalidAmount(cmd.amount))?;

    uow.insert_payment(&payment)
        .await
        .map_err(CirculationError::Store)?;

    tracing::info!(payment_id = %payment.payment_id.value(), amount_paid = %payment.amount_paid, "Payment recorded");
    Ok(payment.payment_id)
}
