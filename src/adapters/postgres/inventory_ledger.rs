use async_trait::async_trait;

use crate::domain::{BookId, BookStock};
use crate::ports::inventory_ledger::{InventoryLedger, Result};

use super::{PgUnitOfWork, rows::map_row_to_stock};

#[async_trait]
impl InventoryLedger for PgUnitOfWork {
    /// 在庫行を取得してロックする（予約判定と貸出・返却を同じ書籍で直列化）
    async fn find_stock(&mut self, book_id: BookId) -> Result<Option<BookStock>> {
        let row = sqlx::query(
            r#"
            SELECT book_id, total_copies, available_copies
            FROM books
            WHERE book_id = $1
            FOR UPDATE
            "#,
        )
        .bind(book_id.value())
        .fetch_optional(&mut *self.tx)
        .await?;

        row.as_ref().map(map_row_to_stock).transpose()
    }

    /// 条件付きで1冊減らす。更新された行がなければ在庫切れ
    async fn try_acquire_copy(&mut self, book_id: BookId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies - 1
            WHERE book_id = $1 AND available_copies > 0
            "#,
        )
        .bind(book_id.value())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// 条件付きで1冊増やす。更新された行がなければ不変条件違反
    async fn release_copy(&mut self, book_id: BookId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE books
            SET available_copies = available_copies + 1
            WHERE book_id = $1 AND available_copies < total_copies
            "#,
        )
        .bind(book_id.value())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
