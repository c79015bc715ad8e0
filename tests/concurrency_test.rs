use std::sync::Arc;

use rust_decimal_macros::dec;
use rusty_library_circulation::adapters::memory::InMemoryStore;
use rusty_library_circulation::application::circulation::*;
use rusty_library_circulation::domain::commands::*;
use rusty_library_circulation::domain::*;
use rusty_library_circulation::ports::CirculationStore;
use tokio::sync::Barrier;

mod common;
use common::{day, policy};

// ============================================================================
// 同時実行：同じ冊・同じ貸出に対する競合
// ============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_borrows_of_last_copy() {
    // Arrange: Total=1, Available=1
    let store = InMemoryStore::new();
    let book_id = store.add_book(1).await;
    let barrier = Arc::new(Barrier::new(2));

    // Act: 2人が同時に借りる
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                let member_id = MemberId::new();
                barrier.wait().await;
                let uow = store.begin().await.unwrap();
                borrow(
                    &policy(),
                    uow,
                    &Caller::student(member_id),
                    Borrow {
                        member_id,
                        book_id,
                        due_date: None,
                        borrowed_at: day(2024, 1, 1),
                    },
                )
                .await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    // Assert: ちょうど1件だけ成功する
    let succeeded = results.iter().filter(|r| r.is_ok()).count();
    let out_of_stock = results
        .iter()
        .filter(|r| matches!(r, Err(CirculationError::OutOfStock)))
        .count();
    assert_eq!(succeeded, 1);
    assert_eq!(out_of_stock, 1);
    assert_eq!(store.stock(book_id).await.unwrap().available_copies(), 0);
    assert_eq!(store.loan_count().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_returns_of_same_loan() {
    // Arrange: 延滞した貸出
    let store = InMemoryStore::new();
    let book_id = store.add_book(1).await;
    let member_id = MemberId::new();
    let receipt = borrow(
        &policy(),
        store.begin().await.unwrap(),
        &Caller::student(member_id),
        Borrow {
            member_id,
            book_id,
            due_date: Some(day(2024, 1, 10)),
            borrowed_at: day(2024, 1, 1),
        },
    )
    .await
    .unwrap();
    let barrier = Arc::new(Barrier::new(2));

    // Act
    let handles: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            let barrier = Arc::clone(&barrier);
            tokio::spawn(async move {
                barrier.wait().await;
                let uow = store.begin().await.unwrap();
                return_loan(
                    &policy(),
                    uow,
                    &Caller::student(member_id),
                    ReturnLoan {
                        loan_id: receipt.loan_id,
                        returned_at: day(2024, 1, 12),
                    },
                )
                .await
            })
        })
        .collect();

    let mut results = Vec::new();
    for handle in handles {
        results.push(handle.await.unwrap());
    }

    // Assert: 2件目はAlreadyClosed、在庫と延滞料は1回分だけ
    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert_eq!(
        results
            .iter()
            .filter(|r| matches!(r, Err(CirculationError::AlreadyClosed)))
            .count(),
        1
    );
    assert_eq!(store.stock(book_id).await.unwrap().available_copies(), 1);

    let fines = store.fines_of(member_id).await;
    assert_eq!(fines.len(), 1);
    assert_eq!(fines[0].amount, dec!(1.00));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_many_borrowers_never_exceed_stock() {
    let store = InMemoryStore::new();
    let book_id = store.add_book(3).await;

    let handles: Vec<_> = (0..10)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move {
                let member_id = MemberId::new();
                let uow = store.begin().await.unwrap();
                borrow(
                    &policy(),
                    uow,
                    &Caller::student(member_id),
                    Borrow {
                        member_id,
                        book_id,
                        due_date: None,
                        borrowed_at: day(2024, 1, 1),
                    },
                )
                .await
                .is_ok()
            })
        })
        .collect();

    let mut succeeded = 0;
    for handle in handles {
        if handle.await.unwrap() {
            succeeded += 1;
        }
    }

    assert_eq!(succeeded, 3);
    assert_eq!(store.stock(book_id).await.unwrap().available_copies(), 0);
}
