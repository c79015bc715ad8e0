use crate::domain::{
    Reservation,
    value_objects::{BookId, MemberId, ReservationId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 予約キューポート
///
/// 書籍ごとのPending予約を予約日時の古い順（FIFO）で扱う。
#[async_trait]
pub trait ReservationQueue: Send {
    /// 予約を保存する
    ///
    /// 同じ会員・書籍のPending予約が既にある場合は保存せず`false`を返す。
    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<bool>;

    /// IDで予約を取得する
    ///
    /// 行はロックしない。状態の変更は`transition_reservation`の条件付き更新で判定する。
    async fn find_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>>;

    /// 会員が書籍のPending予約を持っているか
    async fn has_pending_reservation(
        &mut self,
        member_id: MemberId,
        book_id: BookId,
    ) -> Result<bool>;

    /// 書籍の最も古いPending予約（作業単位が終わるまでロック）
    async fn next_pending_reservation(&mut self, book_id: BookId) -> Result<Option<Reservation>>;

    /// Pendingの予約だけを終端状態で上書きする。更新できた場合に`true`
    async fn transition_reservation(&mut self, reservation: &Reservation) -> Result<bool>;

    /// 有効期限が`now`より前のPending予約をExpiredにする
    ///
    /// `book_id`が指定された場合はその書籍の予約だけを対象にする。
    /// 更新した件数を返す。
    async fn expire_pending(
        &mut self,
        now: DateTime<Utc>,
        book_id: Option<BookId>,
    ) -> Result<u64>;

    /// 会員の全予約（予約日時の古い順）
    async fn reservations_for_member(&mut self, member_id: MemberId) -> Result<Vec<Reservation>>;
}
