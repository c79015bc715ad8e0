use async_trait::async_trait;

use super::{FineLedger, InventoryLedger, LoanRegistry, ReservationQueue};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 作業単位（Unit of Work）
///
/// 1回の貸出操作の間だけ存在し、その中の書き込みはすべて一緒に確定するか、
/// すべて取り消される。`commit`を呼ばずに破棄した場合は取り消しと同じ。
#[async_trait]
pub trait UnitOfWork: InventoryLedger + LoanRegistry + FineLedger + ReservationQueue + Send {
    /// すべての書き込みを確定する
    async fn commit(self: Box<Self>) -> Result<()>;

    /// すべての書き込みを取り消す
    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// 作業単位を開始するストア
#[async_trait]
pub trait CirculationStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>>;
}
