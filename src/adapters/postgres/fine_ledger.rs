use async_trait::async_trait;
use futures::TryStreamExt;
use rust_decimal::Decimal;
use sqlx::postgres::PgRow;

use crate::domain::{Fine, FineId, MemberId, Payment};
use crate::ports::fine_ledger::{FineLedger, Result};

use super::{
    PgUnitOfWork,
    rows::{map_row_to_fine, map_row_to_payment},
};

#[async_trait]
impl FineLedger for PgUnitOfWork {
    /// fines(loan_id)の一意制約で貸出1件につき1件に制限される
    async fn insert_fine(&mut self, fine: &Fine) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO fines (fine_id, member_id, loan_id, amount, status, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(fine.fine_id.value())
        .bind(fine.member_id.value())
        .bind(fine.loan_id.value())
        .bind(fine.amount)
        .bind(fine.status.as_str())
        .bind(fine.created_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_fine(&mut self, fine_id: FineId) -> Result<Option<Fine>> {
        let row = sqlx::query(
            r#"
            SELECT fine_id, member_id, loan_id, amount, status, created_at
            FROM fines
            WHERE fine_id = $1
            FOR UPDATE
            "#,
        )
        .bind(fine_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_fine).transpose()
    }

    async fn mark_fine_paid(&mut self, fine_id: FineId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE fines
            SET status = 'Paid'
            WHERE fine_id = $1 AND status = 'Unpaid'
            "#,
        )
        .bind(fine_id.value())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn update_fine_amount(&mut self, fine_id: FineId, amount: Decimal) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE fines
            SET amount = $2
            WHERE fine_id = $1 AND status = 'Unpaid'
            "#,
        )
        .bind(fine_id.value())
        .bind(amount)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn insert_payment(&mut self, payment: &Payment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO payments (payment_id, member_id, loan_id, amount_paid, method, paid_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(payment.payment_id.value())
        .bind(payment.member_id.value())
        .bind(payment.loan_id.map(|id| id.value()))
        .bind(payment.amount_paid)
        .bind(payment.method.as_str())
        .bind(payment.paid_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn fines_for_member(&mut self, member_id: MemberId) -> Result<Vec<Fine>> {
        let rows: Vec<PgRow> = sqlx::query(
            r#"
            SELECT fine_id, member_id, loan_id, amount, status, created_at
            FROM fines
            WHERE member_id = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(member_id.value())
        .fetch(&mut *self.tx)
        .try_collect()
        .await?;

        rows.iter().map(map_row_to_fine).collect()
    }

    async fn payments_for_member(&mut self, member_id: MemberId) -> Result<Vec<Payment>> {
        let rows: Vec<PgRow> = sqlx::query(
            r#"
            SELECT payment_id, member_id, loan_id, amount_paid, method, paid_at
            FROM payments
            WHERE member_id = $1
            ORDER BY paid_at ASC
            "#,
        )
        .bind(member_id.value())
        .fetch(&mut *self.tx)
        .try_collect()
        .await?;

        rows.iter().map(map_row_to_payment).collect()
    }
}
