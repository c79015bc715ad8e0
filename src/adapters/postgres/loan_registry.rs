use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use sqlx::postgres::PgRow;

use crate::domain::{Loan, LoanId, MemberId};
use crate::ports::loan_registry::{LoanRegistry, Result};

use super::{PgUnitOfWork, rows::map_row_to_loan};

#[async_trait]
impl LoanRegistry for PgUnitOfWork {
    async fn insert_loan(&mut self, loan: &Loan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                loan_id,
                book_id,
                member_id,
                borrowed_at,
                due_date,
                returned_at,
                status,
                fine_amount
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.book_id.value())
        .bind(loan.member_id.value())
        .bind(loan.borrowed_at)
        .bind(loan.due_date)
        .bind(loan.returned_at)
        .bind(loan.status.as_str())
        .bind(loan.fine_amount)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>> {
        let row = sqlx::query(
            r#"
            SELECT
                loan_id,
                book_id,
                member_id,
                borrowed_at,
                due_date,
                returned_at,
                status,
                fine_amount
            FROM loans
            WHERE loan_id = $1
            FOR UPDATE
            "#,
        )
        .bind(loan_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_loan).transpose()
    }

    /// Borrowedの貸出のみ終了状態に更新する
    async fn close_loan(&mut self, loan: &Loan) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE loans
            SET returned_at = $2, status = $3, fine_amount = $4
            WHERE loan_id = $1 AND status = 'Borrowed'
            "#,
        )
        .bind(loan.loan_id.value())
        .bind(loan.returned_at)
        .bind(loan.status.as_str())
        .bind(loan.fine_amount)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn open_loans_for_member(&mut self, member_id: MemberId) -> Result<Vec<Loan>> {
        let rows: Vec<PgRow> = sqlx::query(
            r#"
            SELECT
                loan_id,
                book_id,
                member_id,
                borrowed_at,
                due_date,
                returned_at,
                status,
                fine_amount
            FROM loans
            WHERE member_id = $1 AND status = 'Borrowed'
            ORDER BY borrowed_at ASC
            "#,
        )
        .bind(member_id.value())
        .fetch(&mut *self.tx)
        .try_collect()
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }

    /// 返却期限を過ぎた貸出中の貸出
    ///
    /// (status, due_date)の部分インデックスを使用する。
    async fn past_due_loans(&mut self, now: DateTime<Utc>) -> Result<Vec<Loan>> {
        let rows: Vec<PgRow> = sqlx::query(
            r#"
            SELECT
                loan_id,
                book_id,
                member_id,
                borrowed_at,
                due_date,
                returned_at,
                status,
                fine_amount
            FROM loans
            WHERE status = 'Borrowed' AND due_date < $1
            ORDER BY due_date ASC
            "#,
        )
        .bind(now)
        .fetch(&mut *self.tx)
        .try_collect()
        .await?;

        rows.iter().map(map_row_to_loan).collect()
    }
}
