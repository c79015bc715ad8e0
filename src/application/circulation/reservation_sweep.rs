use chrono::{DateTime, Utc};

use crate::ports::UnitOfWork;

use super::circulation_service::finish;
use super::errors::{CirculationError, Result};

/// 予約失効バッチ
///
/// 定期的に実行され、有効期限を過ぎたPending予約をExpiredにする。
///
/// ビジネスルール：
/// - 有効期限（expiry_date）が`now`より前のPending予約のみ対象
/// - 終端状態の予約は変更しない
/// - 予約・返却時にも同じ失効処理が書籍単位で走るため、バッチが遅れても結果は変わらない
///
/// # 戻り値
/// Expiredにした予約の件数
#[tracing::instrument(skip_all, fields(now = %now))]
pub async fn sweep_expired_reservations(
    mut uow: Box<dyn UnitOfWork>,
    now: DateTime<Utc>,
) -> Result<u64> {
    let outcome = uow
        .expire_pending(now, None)
        .await
        .map_err(CirculationError::Store);
    let expired = finish(uow, outcome).await?;

    if expired > 0 {
        tracing::info!(expired, "Expired lapsed reservations");
    } else {
        tracing::debug!("No lapsed reservations");
    }

    Ok(expired)
}
