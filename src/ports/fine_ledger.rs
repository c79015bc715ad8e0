use crate::domain::{
    Fine, Payment,
    value_objects::{FineId, MemberId},
};
use async_trait::async_trait;
use rust_decimal::Decimal;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 延滞料・支払台帳ポート
#[async_trait]
pub trait FineLedger: Send {
    /// 延滞料を保存する（貸出1件につき1件）
    async fn insert_fine(&mut self, fine: &Fine) -> Result<()>;

    /// IDで延滞料を取得する（作業単位が終わるまでロック）
    async fn find_fine(&mut self, fine_id: FineId) -> Result<Option<Fine>>;

    /// 未払の延滞料だけを支払済みにする。更新できた場合に`true`
    async fn mark_fine_paid(&mut self, fine_id: FineId) -> Result<bool>;

    /// 未払の延滞料だけ金額を変更する。更新できた場合に`true`
    async fn update_fine_amount(&mut self, fine_id: FineId, amount: Decimal) -> Result<bool>;

    /// 支払を追記する
    async fn insert_payment(&mut self, payment: &Payment) -> Result<()>;

    /// 会員の延滞料（作成日時の古い順）
    async fn fines_for_member(&mut self, member_id: MemberId) -> Result<Vec<Fine>>;

    /// 会員の支払（支払日時の古い順）
    async fn payments_for_member(&mut self, member_id: MemberId) -> Result<Vec<Payment>>;
}
