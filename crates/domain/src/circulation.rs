//! # 貸出可否の判定
//!
//! 蔵書の貸出では、蔵書のステータスと取り置き予約の有無を
//! 組み合わせて判定する必要がある。単一エンティティの遷移メソッドでは
//! 表現できないため、ここで純粋関数として定義する。

use crate::{
    DomainError,
    book_instance::{BookInstance, BookInstanceStatus},
    reservation::Reservation,
    user::UserId,
};

/// 貸出時に完了させる予約
#[derive(Debug, PartialEq)]
pub enum BorrowClearance {
    /// 予約なしで貸出可能
    Free,
    /// 予約者本人による貸出。予約を `completed` にする
    FulfilsReservation,
}

/// 利用者が蔵書を借りられるか判定する
///
/// - `available`: 誰でも借りられる
/// - `reserved`: 受け取り待ちの予約が利用者本人のものである場合のみ借りられる
/// - それ以外: `InvalidState`
///
/// `pending_reservation` には蔵書に紐づく `pending` の予約を渡す。
pub fn check_borrow_eligibility(
    instance: &BookInstance,
    user_id: &UserId,
    pending_reservation: Option<&Reservation>,
) -> Result<BorrowClearance, DomainError> {
    match instance.status() {
        BookInstanceStatus::Available => Ok(BorrowClearance::Free),
        BookInstanceStatus::Reserved => match pending_reservation {
            Some(r) if r.is_pending() && r.user_id() == user_id => {
                Ok(BorrowClearance::FulfilsReservation)
            }
            _ => Err(DomainError::Forbidden(
                "他の利用者が予約している蔵書です".to_string(),
            )),
        },
        status => Err(DomainError::InvalidState(format!(
            "貸出できない蔵書です（ステータス: {status}）"
        ))),
    }
}
