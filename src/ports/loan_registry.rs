use crate::domain::{
    Loan,
    value_objects::{LoanId, MemberId},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 貸出台帳ポート
#[async_trait]
pub trait LoanRegistry: Send {
    /// 新しい貸出を保存する
    async fn insert_loan(&mut self, loan: &Loan) -> Result<()>;

    /// IDで貸出を取得する
    ///
    /// 取得した行は作業単位が終わるまでロックされる。
    async fn find_loan(&mut self, loan_id: LoanId) -> Result<Option<Loan>>;

    /// 貸出を終了状態で上書きする
    ///
    /// 保存済みの状態がBorrowedのときだけ更新し、更新できた場合に`true`。
    async fn close_loan(&mut self, loan: &Loan) -> Result<bool>;

    /// 会員の未返却の貸出（貸出日時の古い順）
    async fn open_loans_for_member(&mut self, member_id: MemberId) -> Result<Vec<Loan>>;

    /// 返却期限が`now`より前の未返却の貸出（返却期限の古い順）
    async fn past_due_loans(&mut self, now: DateTime<Utc>) -> Result<Vec<Loan>>;
}
