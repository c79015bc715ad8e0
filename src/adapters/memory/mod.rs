//! インメモリのストア
//!
//! 作業単位は生存期間中ずっとストアのロックを保持し、テーブルの複製を操作する。
//! 作業単位は直列に実行され、確定されなかった作業単位の書き込みは残らない。

mod fine_ledger;
mod inventory_ledger;
mod loan_registry;
mod reservation_queue;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::domain::{
    BookId, BookStock, Fine, FineId, Loan, LoanId, MemberId, Payment, Reservation, ReservationId,
};
use crate::ports::unit_of_work::{CirculationStore, Result, UnitOfWork};

#[derive(Debug, Clone, Default)]
struct Tables {
    stocks: HashMap<BookId, BookStock>,
    loans: HashMap<LoanId, Loan>,
    fines: HashMap<FineId, Fine>,
    payments: Vec<Payment>,
    // 挿入順を保持する（同時刻の予約はこの順で充足）
    reservations: Vec<Reservation>,
}

/// CirculationStoreのインメモリ実装
///
/// テストとローカル実行用。クローンは同じテーブルを共有する。
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// テスト用に書籍を登録（全冊貸出可能）
    pub async fn add_book(&self, total_copies: u32) -> BookId {
        let stock = BookStock::new(BookId::new(), total_copies);
        self.put_stock(stock).await;
        stock.book_id()
    }

    /// テスト用に在庫を直接設定
    pub async fn put_stock(&self, stock: BookStock) {
        self.tables
            .lock()
            .await
            .stocks
            .insert(stock.book_id(), stock);
    }

    pub async fn stock(&self, book_id: BookId) -> Option<BookStock> {
        self.tables.lock().await.stocks.get(&book_id).copied()
    }

    pub async fn loan(&self, loan_id: LoanId) -> Option<Loan> {
        self.tables.lock().await.loans.get(&loan_id).cloned()
    }

    pub async fn fine(&self, fine_id: FineId) -> Option<Fine> {
        self.tables.lock().await.fines.get(&fine_id).cloned()
    }

    pub async fn reservation(&self, reservation_id: ReservationId) -> Option<Reservation> {
        self.tables
            .lock()
            .await
            .reservations
            .iter()
            .find(|r| r.reservation_id == reservation_id)
            .cloned()
    }

    pub async fn fines_of(&self, member_id: MemberId) -> Vec<Fine> {
        self.tables
            .lock()
            .await
            .fines
            .values()
            .filter(|f| f.member_id == member_id)
            .cloned()
            .collect()
    }

    pub async fn payments_of(&self, member_id: MemberId) -> Vec<Payment> {
        self.tables
            .lock()
            .await
            .payments
            .iter()
            .filter(|p| p.member_id == member_id)
            .cloned()
            .collect()
    }

    pub async fn loan_count(&self) -> usize {
        self.tables.lock().await.loans.len()
    }
}

#[async_trait]
impl CirculationStore for InMemoryStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let guard = Arc::clone(&self.tables).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryUnitOfWork { guard, working }))
    }
}

/// インメモリの作業単位
///
/// 書き込みは`working`にだけ反映され、`commit`でストアに書き戻される。
pub struct InMemoryUnitOfWork {
    guard: OwnedMutexGuard<Tables>,
    working: Tables,
}

#[async_trait]
impl UnitOfWork for InMemoryUnitOfWork {
    async fn commit(self: Box<Self>) -> Result<()> {
        let InMemoryUnitOfWork { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

fn conflict(message: &str) -> Box<dyn std::error::Error + Send + Sync> {
    Box::new(std::io::Error::new(
        std::io::ErrorKind::AlreadyExists,
        message.to_string(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{InventoryLedger, LoanRegistry};
    use chrono::{Duration, Utc};

    #[tokio::test]
    async fn test_commit_publishes_writes() {
        let store = InMemoryStore::new();
        let book_id = store.add_book(1).await;

        let mut uow = store.begin().await.unwrap();
        assert!(uow.try_acquire_copy(book_id).await.unwrap());
        uow.commit().await.unwrap();

        assert_eq!(store.stock(book_id).await.unwrap().available_copies(), 0);
    }

    #[tokio::test]
    async fn test_rollback_discards_writes() {
        let store = InMemoryStore::new();
        let book_id = store.add_book(1).await;
        let now = Utc::now();
        let loan =
            crate::domain::loan::open_loan(book_id, MemberId::new(), now, now + Duration::days(1))
                .unwrap();

        let mut uow = store.begin().await.unwrap();
        assert!(uow.try_acquire_copy(book_id).await.unwrap());
        uow.insert_loan(&loan).await.unwrap();
        uow.rollback().await.unwrap();

        assert_eq!(store.stock(book_id).await.unwrap().available_copies(), 1);
        assert!(store.loan(loan.loan_id).await.is_none());
    }

    #[tokio::test]
    async fn test_dropped_unit_of_work_releases_lock() {
        let store = InMemoryStore::new();
        let book_id = store.add_book(1).await;

        {
            let mut uow = store.begin().await.unwrap();
            uow.try_acquire_copy(book_id).await.unwrap();
        }

        let mut uow = store.begin().await.unwrap();
        assert_eq!(
            uow.find_stock(book_id).await.unwrap().unwrap().available_copies(),
            1
        );
    }
}
