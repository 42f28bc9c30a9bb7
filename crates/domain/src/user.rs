//! # 利用者
//!
//! 認証・利用者管理は外部の責務とし、このシステムでは
//! 利用者を不透明な識別子としてのみ扱う。

define_uuid_id! {
    /// 利用者の一意識別子
    ///
    /// 予約・貸出トランザクションの主体を表す。
    pub struct UserId;
}
