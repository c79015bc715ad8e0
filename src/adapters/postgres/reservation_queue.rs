use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::PgRow;

use crate::domain::{BookId, MemberId, Reservation, ReservationId};
use crate::ports::reservation_queue::{ReservationQueue, Result};

use super::{PgUnitOfWork, rows::map_row_to_reservation};

#[async_trait]
impl ReservationQueue for PgUnitOfWork {
    /// 部分一意インデックス（status = 'Pending'）に衝突した場合は挿入せずfalse
    async fn insert_reservation(&mut self, reservation: &Reservation) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO reservations (
                reservation_id,
                member_id,
                book_id,
                reserved_at,
                expiry_date,
                status,
                loan_id
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (member_id, book_id) WHERE status = 'Pending'
            DO NOTHING
            "#,
        )
        .bind(reservation.reservation_id.value())
        .bind(reservation.member_id.value())
        .bind(reservation.book_id.value())
        .bind(reservation.reserved_at)
        .bind(reservation.expiry_date)
        .bind(reservation.status.as_str())
        .bind(reservation.loan_id.map(|id| id.value()))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn find_reservation(
        &mut self,
        reservation_id: ReservationId,
    ) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT reservation_id, member_id, book_id, reserved_at, expiry_date, status, loan_id
            FROM reservations
            WHERE reservation_id = $1
            "#,
        )
        .bind(reservation_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_reservation).transpose()
    }

    async fn has_pending_reservation(
        &mut self,
        member_id: MemberId,
        book_id: BookId,
    ) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM reservations
                WHERE member_id = $1 AND book_id = $2 AND status = 'Pending'
            )
            "#,
        )
        .bind(member_id.value())
        .bind(book_id.value())
        .fetch_one(&mut *self.tx)
        .await?;

        Ok(exists)
    }

    /// 予約日時の古い順、同時刻なら挿入順（seq）
    async fn next_pending_reservation(&mut self, book_id: BookId) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT reservation_id, member_id, book_id, reserved_at, expiry_date, status, loan_id
            FROM reservations
            WHERE book_id = $1 AND status = 'Pending'
            ORDER BY reserved_at ASC, seq ASC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_reservation).transpose()
    }

    async fn transition_reservation(&mut self, reservation: &Reservation) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = $2, loan_id = $3
            WHERE reservation_id = $1 AND status = 'Pending'
            "#,
        )
        .bind(reservation.reservation_id.value())
        .bind(reservation.status.as_str())
        .bind(reservation.loan_id.map(|id| id.value()))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Pendingのみ対象なので、同じ`now`で何度実行しても結果は同じ
    async fn expire_pending(
        &mut self,
        now: DateTime<Utc>,
        book_id: Option<BookId>,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE reservations
            SET status = 'Expired'
            WHERE status = 'Pending'
              AND expiry_date < $1
              AND ($2::uuid IS NULL OR book_id = $2)
            "#,
        )
        .bind(now)
        .bind(book_id.map(|id| id.value()))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected())
    }

    async fn reservations_for_member(&mut self, member_id: MemberId) -> Result<Vec<Reservation>> {
        let rows: Vec<PgRow> = sqlx::query(
            r#"
            SELECT reservation_id, member_id, book_id, reserved_at, expiry_date, status, loan_id
            FROM reservations
            WHERE member_id = $1
            ORDER BY reserved_at ASC, seq ASC
            "#,
        )
        .bind(member_id.value())
        .fetch(&mut *self.tx)
        .try_collect()
        .await?;

        rows.iter().map(map_row_to_reservation).collect()
    }
}
