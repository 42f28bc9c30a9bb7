//! # 貸出・返却ユースケース
//!
//! 蔵書のステータス・貸出トランザクション・予約の更新を
//! 1 つの DB トランザクションで行う。
//!
//! 各操作は対象の蔵書行を `FOR UPDATE` でロックしてから判定し、
//! ステータス更新は期待するステータスを条件にした UPDATE で行う。
//! 同時に同じ蔵書を借りようとした場合、後続は `Conflict` になる。
//!
//! 受け取り期限切れの判定は受け取り時にのみ行う（定期的な掃除はしない）。

use std::sync::Arc;

use bookshelf_domain::{
    book_instance::{BookInstance, BookInstanceStatus, InstanceTag},
    circulation::{BorrowClearance, check_borrow_eligibility},
    clock::Clock,
    reservation::{PickupCode, Reservation, ReservationStatus},
    shelf::ShelfId,
    transaction::{NewBorrow, Transaction, TransactionId, TransactionStatus},
    user::UserId,
};
use bookshelf_infra::{
    db::{TransactionManager, TxContext},
    repository::{
        BookInstanceRepository,
        ReservationRepository,
        ShelfRepository,
        TransactionRepository,
    },
};
use chrono::{DateTime, Utc};

use crate::{
    error::ServiceError,
    usecase::helpers::{FindResultExt, release_reserved_instance},
};

/// 貸出・返却ユースケース
pub struct CirculationUseCaseImpl {
    instance_repo:    Arc<dyn BookInstanceRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    reservation_repo: Arc<dyn ReservationRepository>,
    shelf_repo:       Arc<dyn ShelfRepository>,
    tx_manager:       Arc<dyn TransactionManager>,
    clock:            Arc<dyn Clock>,
}

impl CirculationUseCaseImpl {
    pub fn new(
        instance_repo: Arc<dyn BookInstanceRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        reservation_repo: Arc<dyn ReservationRepository>,
        shelf_repo: Arc<dyn ShelfRepository>,
        tx_manager: Arc<dyn TransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            instance_repo,
            transaction_repo,
            reservation_repo,
            shelf_repo,
            tx_manager,
            clock,
        }
    }

    /// タグで指定した蔵書を貸し出す
    ///
    /// 取り置き中の蔵書は予約者本人のみ借りられ、その予約は `completed` になる。
    /// 作成する貸出トランザクションは返却まで `pending` のまま。
    ///
    /// # エラー
    ///
    /// - `NotFound`: タグに一致する蔵書がない
    /// - `Forbidden`: 他の利用者が予約している
    /// - `InvalidState`: 貸出中・破損など貸出できないステータス
    /// - `Conflict`: 同時に他の操作が蔵書を更新した
    pub async fn borrow(
        &self,
        user_id: UserId,
        instance_tag: String,
    ) -> Result<Transaction, ServiceError> {
        let tag = InstanceTag::new(instance_tag)?;
        let now = self.clock.now();

        let mut tx = self.tx_manager.begin().await?;
        let instance = self
            .instance_repo
            .find_by_tag_for_update(&mut tx, &tag)
            .await
            .or_not_found("蔵書")?;
        let transaction = self
            .borrow_instance(&mut tx, instance, &user_id, now)
            .await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id(),
            instance_id = %transaction.book_instance_id(),
            user_id = %user_id,
            "蔵書を貸し出しました"
        );
        Ok(transaction)
    }

    /// タグで指定した蔵書を返却する
    ///
    /// 返却待ちの貸出を `completed` にし、`completed` の返却トランザクションを追記する。
    /// `destination` を指定した場合のみ蔵書の書架を移動する。
    /// 未指定なら記録上の現在の書架に戻したものとして扱う。
    ///
    /// # エラー
    ///
    /// - `NotFound`: 蔵書または返却先の書架がない
    /// - `InvalidState`: 返却待ちの貸出がない
    pub async fn return_book(
        &self,
        instance_tag: String,
        destination: Option<ShelfId>,
    ) -> Result<Transaction, ServiceError> {
        let tag = InstanceTag::new(instance_tag)?;
        if let Some(shelf_id) = &destination {
            self.shelf_repo
                .find_by_id(shelf_id)
                .await
                .or_not_found("返却先の書架")?;
        }
        let now = self.clock.now();

        let mut tx = self.tx_manager.begin().await?;
        let instance = self
            .instance_repo
            .find_by_tag_for_update(&mut tx, &tag)
            .await
            .or_not_found("蔵書")?;
        let borrow = self
            .transaction_repo
            .find_open_borrow_for_update(&mut tx, instance.id())
            .await?
            .ok_or_else(|| ServiceError::InvalidState("貸出中の蔵書ではありません".to_string()))?;

        let return_shelf = destination
            .clone()
            .unwrap_or_else(|| instance.shelf_id().clone());
        let returned = Transaction::return_of(&borrow, TransactionId::new(), return_shelf, now)?;
        let completed = borrow.completed(now)?;
        self.transaction_repo
            .update_status(&mut tx, &completed, TransactionStatus::Pending)
            .await?;
        self.transaction_repo.insert(&mut tx, &returned).await?;

        let expected = instance.status();
        let available = instance.returned(destination, now)?;
        self.instance_repo
            .update_status(&mut tx, &available, expected)
            .await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %returned.id(),
            instance_id = %available.id(),
            shelf_id = %available.shelf_id(),
            user_id = %returned.user_id(),
            "蔵書が返却されました"
        );
        Ok(returned)
    }

    /// 書架を指定せずに返却する
    pub async fn return_quick(&self, instance_tag: String) -> Result<Transaction, ServiceError> {
        self.return_book(instance_tag, None).await
    }

    /// 受け取りコードで取り置き中の蔵書を受け取る（貸出）
    ///
    /// 期限を過ぎていた場合は予約を `expired` にし、蔵書の取り置きを解除して
    /// 確定したうえで `Expired` を返す。
    ///
    /// # エラー
    ///
    /// - `BadRequest`: コードの形式が不正
    /// - `NotFound`: 受け取り待ちの予約がない（期限切れ処理済みを含む）
    /// - `Expired`: 受け取り期限を過ぎている
    /// - `InvalidState`: 蔵書が取り置き中でない
    pub async fn pickup_by_code(&self, pickup_code: String) -> Result<Transaction, ServiceError> {
        let code = PickupCode::parse(pickup_code)?;
        let now = self.clock.now();

        let mut tx = self.tx_manager.begin().await?;
        let reservation = self
            .reservation_repo
            .find_pending_by_code_for_update(&mut tx, &code)
            .await
            .or_not_found("受け取り待ちの予約")?;

        if reservation.is_expired(now) {
            self.expire_reservation(tx, reservation, now).await?;
            return Err(ServiceError::Expired(
                "受け取り期限を過ぎています".to_string(),
            ));
        }

        let instance = self
            .instance_repo
            .find_by_id_for_update(&mut tx, reservation.book_instance_id())
            .await
            .or_not_found("蔵書")?;
        if instance.status() != BookInstanceStatus::Reserved {
            return Err(ServiceError::InvalidState(format!(
                "取り置き中の蔵書ではありません（ステータス: {}）",
                instance.status()
            )));
        }
        let transaction = self
            .borrow_instance(&mut tx, instance, reservation.user_id(), now)
            .await?;
        tx.commit().await?;

        tracing::info!(
            transaction_id = %transaction.id(),
            reservation_id = %reservation.id(),
            instance_id = %transaction.book_instance_id(),
            user_id = %reservation.user_id(),
            "予約された蔵書が受け取られました"
        );
        Ok(transaction)
    }

    /// 蔵書の貸出処理本体（ロック済みの蔵書を受け取る）
    async fn borrow_instance(
        &self,
        tx: &mut TxContext,
        instance: BookInstance,
        user_id: &UserId,
        now: DateTime<Utc>,
    ) -> Result<Transaction, ServiceError> {
        let pending_reservation = if instance.status() == BookInstanceStatus::Reserved {
            self.reservation_repo
                .find_pending_by_instance_for_update(tx, instance.id())
                .await?
        } else {
            None
        };

        let clearance = check_borrow_eligibility(&instance, user_id, pending_reservation.as_ref())?;
        if let (BorrowClearance::FulfilsReservation, Some(reservation)) =
            (clearance, pending_reservation)
        {
            let fulfilled = reservation.completed(now)?;
            self.reservation_repo
                .update_status(tx, &fulfilled, ReservationStatus::Pending)
                .await?;
        }

        let expected = instance.status();
        let borrowed = instance.borrowed(now)?;
        self.instance_repo
            .update_status(tx, &borrowed, expected)
            .await?;

        let transaction = Transaction::borrow(NewBorrow {
            id: TransactionId::new(),
            user_id: user_id.clone(),
            book_instance_id: borrowed.id().clone(),
            shelf_id: borrowed.shelf_id().clone(),
            due_date: None,
            now,
        });
        self.transaction_repo.insert(tx, &transaction).await?;

        Ok(transaction)
    }

    /// 期限切れの予約を `expired` にし、取り置きを解除して確定する
    async fn expire_reservation(
        &self,
        mut tx: TxContext,
        reservation: Reservation,
        now: DateTime<Utc>,
    ) -> Result<(), ServiceError> {
        let expired = reservation.expired(now)?;
        self.reservation_repo
            .update_status(&mut tx, &expired, ReservationStatus::Pending)
            .await?;
        release_reserved_instance(
            self.instance_repo.as_ref(),
            &mut tx,
            expired.book_instance_id(),
            now,
        )
        .await?;
        tx.commit().await?;

        tracing::warn!(
            reservation_id = %expired.id(),
            instance_id = %expired.book_instance_id(),
            exp_date = %expired.exp_date(),
            "受け取り期限切れの予約を失効させました"
        );
        Ok(())
    }
}
