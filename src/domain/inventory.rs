use serde::{Deserialize, Serialize};

use super::{BookId, InventoryError};

/// 書籍の在庫（所蔵冊数と貸出可能冊数の組）
///
/// 不変条件：`0 <= available_copies <= total_copies`
/// フィールドを非公開にし、`acquire`/`release`以外で貸出可能冊数を変更できないようにする。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookStock {
    book_id: BookId,
    total_copies: u32,
    available_copies: u32,
}

impl BookStock {
    /// 全冊が貸出可能な在庫を作成する
    pub fn new(book_id: BookId, total_copies: u32) -> Self {
        Self {
            book_id,
            total_copies,
            available_copies: total_copies,
        }
    }

    /// 永続化された値から復元する
    ///
    /// # エラー
    /// 貸出可能冊数が所蔵冊数を超える場合は`InventoryError::InvalidCounts`
    pub fn restore(
        book_id: BookId,
        total_copies: u32,
        available_copies: u32,
    ) -> Result<Self, InventoryError> {
        if available_copies > total_copies {
            return Err(InventoryError::InvalidCounts {
                total: total_copies,
                available: available_copies,
            });
        }
        Ok(Self {
            book_id,
            total_copies,
            available_copies,
        })
    }

    pub fn book_id(&self) -> BookId {
        self.book_id
    }

    pub fn total_copies(&self) -> u32 {
        self.total_copies
    }

    pub fn available_copies(&self) -> u32 {
        self.available_copies
    }

    pub fn is_available(&self) -> bool {
        self.available_copies > 0
    }

    /// 純粋関数：1冊取得する（貸出可能冊数 - 1）
    ///
    /// 貸出可能冊数が0の場合は`InventoryError::OutOfStock`
    pub fn acquire(self) -> Result<Self, InventoryError> {
        if self.available_copies == 0 {
            return Err(InventoryError::OutOfStock);
        }
        Ok(Self {
            available_copies: self.available_copies - 1,
            ..self
        })
    }

    /// 純粋関数：1冊解放する（貸出可能冊数 + 1）
    ///
    /// 既に全冊が貸出可能な場合は`InventoryError::ReleaseWithoutAcquire`
    pub fn release(self) -> Result<Self, InventoryError> {
        if self.available_copies >= self.total_copies {
            return Err(InventoryError::ReleaseWithoutAcquire);
        }
        Ok(Self {
            available_copies: self.available_copies + 1,
            ..self
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_stock_is_fully_available() {
        let stock = BookStock::new(BookId::new(), 3);
        assert_eq!(stock.total_copies(), 3);
        assert_eq!(stock.available_copies(), 3);
        assert!(stock.is_available());
    }

    #[test]
    fn test_acquire_decrements_available() {
        let stock = BookStock::new(BookId::new(), 2).acquire().unwrap();
        assert_eq!(stock.available_copies(), 1);
        assert_eq!(stock.total_copies(), 2);
    }

    #[test]
    fn test_acquire_fails_when_exhausted() {
        let stock = BookStock::new(BookId::new(), 1).acquire().unwrap();
        assert_eq!(stock.acquire(), Err(InventoryError::OutOfStock));
    }

    #[test]
    fn test_zero_copy_book_is_never_available() {
        let stock = BookStock::new(BookId::new(), 0);
        assert!(!stock.is_available());
        assert_eq!(stock.acquire(), Err(InventoryError::OutOfStock));
        assert_eq!(stock.release(), Err(InventoryError::ReleaseWithoutAcquire));
    }

    #[test]
    fn test_release_without_acquire_fails() {
        let stock = BookStock::new(BookId::new(), 2);
        assert_eq!(stock.release(), Err(InventoryError::ReleaseWithoutAcquire));
    }

    #[test]
    fn test_acquire_then_release_restores_counts() {
        let original = BookStock::new(BookId::new(), 1);
        let restored = original.acquire().unwrap().release().unwrap();
        assert_eq!(restored, original);
    }

    #[test]
    fn test_restore_rejects_available_above_total() {
        let result = BookStock::restore(BookId::new(), 1, 2);
        assert_eq!(
            result,
            Err(InventoryError::InvalidCounts {
                total: 1,
                available: 2
            })
        );
    }

    // 任意の取得・解放列で不変条件が崩れないこと
    #[test]
    fn test_counts_stay_within_bounds_for_any_sequence() {
        let mut stock = BookStock::new(BookId::new(), 3);
        let ops = [true, true, false, true, true, true, false, false, false, false, true];
        for acquire in ops {
            let next = if acquire { stock.acquire() } else { stock.release() };
            if let Ok(next) = next {
                stock = next;
            }
            assert!(stock.available_copies() <= stock.total_copies());
        }
    }
}
