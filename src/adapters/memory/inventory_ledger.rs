use async_trait::async_trait;

use crate::domain::{BookId, BookStock};
use crate::ports::inventory_ledger::{InventoryLedger, Result};

use super::InMemoryUnitOfWork;

#[async_trait]
impl InventoryLedger for InMemoryUnitOfWork {
    async fn find_stock(&mut self, book_id: BookId) -> Result<Option<BookStock>> {
        Ok(self.working.stocks.get(&book_id).copied())
    }

    async fn try_acquire_copy(&mut self, book_id: BookId) -> Result<bool> {
        let Some(stock) = self.working.stocks.get_mut(&book_id) else {
            return Ok(false);
        };
        match stock.acquire() {
            Ok(acquired) => {
                *stock = acquired;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }

    async fn release_copy(&mut self, book_id: BookId) -> Result<bool> {
        let Some(stock) = self.working.stocks.get_mut(&book_id) else {
            return Ok(false);
        };
        match stock.release() {
            Ok(released) => {
                *stock = released;
                Ok(true)
            }
            Err(_) => Ok(false),
        }
    }
}
