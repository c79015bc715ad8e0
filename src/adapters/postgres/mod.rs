//! PostgreSQLのストア
//!
//! 作業単位ごとに`sqlx`のトランザクションを1つ使う。更新のために読む行は`FOR UPDATE`でロックし、
//! 状態の変更はすべて条件付き更新として`rows_affected`で判定する。
//! ロックの取得順は貸出、書籍、予約の順に揃える。

mod fine_ledger;
mod inventory_ledger;
mod loan_registry;
mod reservation_queue;
mod rows;

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use crate::domain::BookId;
use crate::ports::unit_of_work::{CirculationStore, Result, UnitOfWork};

/// CirculationStoreのPostgreSQL実装
#[derive(Debug, Clone)]
pub struct PgCirculationStore {
    pool: PgPool,
}

impl PgCirculationStore {
    /// PostgreSQLコネクションプールから新しいストアを作成
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 書籍の在庫行を登録する（全冊貸出可能）
    ///
    /// 書籍のメタデータ管理は外部の責務で、ここでは冊数だけを持つ。
    pub async fn register_book(&self, book_id: BookId, total_copies: u32) -> Result<()> {
        let total = i32::try_from(total_copies).map_err(|_| {
            rows::invalid_data(format!("total_copies out of range: {}", total_copies))
        })?;

        sqlx::query(
            r#"
            INSERT INTO books (book_id, total_copies, available_copies)
            VALUES ($1, $2, $2)
            "#,
        )
        .bind(book_id.value())
        .bind(total)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl CirculationStore for PgCirculationStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PgUnitOfWork { tx }))
    }
}

/// PostgreSQLの作業単位
///
/// `commit`されずに破棄された場合、sqlxがトランザクションをロールバックする。
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
