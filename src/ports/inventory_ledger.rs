use crate::domain::{BookStock, value_objects::BookId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 在庫台帳ポート
///
/// 貸出可能冊数を変更できるのはこのポートの2つの操作だけ。
/// どちらも「読んでから書く」のではなく、1回の条件付き更新として実装すること。
#[async_trait]
pub trait InventoryLedger: Send {
    /// 書籍の在庫を取得する
    async fn find_stock(&mut self, book_id: BookId) -> Result<Option<BookStock>>;

    /// 貸出可能冊数が1以上のときだけ1減らす
    ///
    /// 実際に更新された場合のみ`true`。書籍が存在しない場合も`false`。
    async fn try_acquire_copy(&mut self, book_id: BookId) -> Result<bool>;

    /// 貸出可能冊数が所蔵冊数未満のときだけ1増やす
    ///
    /// 実際に更新された場合のみ`true`。
    async fn release_copy(&mut self, book_id: BookId) -> Result<bool>;
}
