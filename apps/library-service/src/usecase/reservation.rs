//! # 取り置き予約ユースケース
//!
//! 予約の作成では、蔵書を `reserved` にして予約を登録するまでを
//! 1 つのトランザクションで確定する。
//! 受け取りコードの QR 画像の保存はその後の別ステップで行い、
//! 失敗しても予約は取り消さない（警告ログのみ）。

use std::sync::Arc;

use bookshelf_domain::{
    book_instance::{BookInstanceId, BookInstanceStatus},
    clock::Clock,
    reservation::{
        NewReservation,
        PickupCode,
        Reservation,
        ReservationChanges,
        ReservationId,
        ReservationStatus,
    },
    user::UserId,
};
use bookshelf_infra::{
    InfraError,
    db::{TransactionManager, TxContext},
    qr,
    repository::{BookInstanceRepository, ReservationRepository},
    s3::ObjectStorage,
};
use chrono::{DateTime, Utc};

use crate::{
    error::ServiceError,
    usecase::helpers::{FindResultExt, release_reserved_instance},
};

/// 受け取りコードの生成を試みる回数
///
/// 受け取り待ちの予約が既に使っているコードは再生成する。
const PICKUP_CODE_ATTEMPTS: usize = 5;

/// 予約更新の入力（`None` の項目は変更しない）
#[derive(Default)]
pub struct UpdateReservationInput {
    pub status:   Option<ReservationStatus>,
    pub exp_date: Option<DateTime<Utc>>,
}

/// 取り置き予約ユースケース
pub struct ReservationUseCaseImpl {
    instance_repo:    Arc<dyn BookInstanceRepository>,
    reservation_repo: Arc<dyn ReservationRepository>,
    object_storage:   Arc<dyn ObjectStorage>,
    tx_manager:       Arc<dyn TransactionManager>,
    clock:            Arc<dyn Clock>,
}

impl ReservationUseCaseImpl {
    pub fn new(
        instance_repo: Arc<dyn BookInstanceRepository>,
        reservation_repo: Arc<dyn ReservationRepository>,
        object_storage: Arc<dyn ObjectStorage>,
        tx_manager: Arc<dyn TransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            instance_repo,
            reservation_repo,
            object_storage,
            tx_manager,
            clock,
        }
    }

    /// 蔵書を取り置き予約する
    ///
    /// 戻り値の予約は、QR 画像の保存に成功した場合のみ `qr_code_url` を持つ。
    ///
    /// # エラー
    ///
    /// - `NotFound`: 蔵書がない
    /// - `InvalidState`: 蔵書が `available` でない
    /// - `Conflict`: 受け取りコードを発行できない、または同時に予約された
    pub async fn reserve(
        &self,
        user_id: UserId,
        instance_id: BookInstanceId,
        exp_date: DateTime<Utc>,
    ) -> Result<Reservation, ServiceError> {
        let now = self.clock.now();

        let mut tx = self.tx_manager.begin().await?;
        let instance = self
            .instance_repo
            .find_by_id_for_update(&mut tx, &instance_id)
            .await
            .or_not_found("蔵書")?;
        let reserved = instance.reserved(now)?;

        let pickup_code = self.issue_pickup_code(&mut tx).await?;
        let reservation = Reservation::new(NewReservation {
            id: ReservationId::new(),
            user_id,
            book_instance_id: instance_id,
            exp_date,
            pickup_code,
            now,
        });

        self.instance_repo
            .update_status(&mut tx, &reserved, BookInstanceStatus::Available)
            .await?;
        self.reservation_repo.insert(&mut tx, &reservation).await?;
        tx.commit().await?;

        tracing::info!(
            reservation_id = %reservation.id(),
            instance_id = %reservation.book_instance_id(),
            user_id = %reservation.user_id(),
            exp_date = %reservation.exp_date(),
            "蔵書を取り置き予約しました"
        );

        Ok(self.attach_pickup_code_image(reservation).await)
    }

    /// 利用者の受け取り待ちの予約を取得する
    pub async fn list_for_user(&self, user_id: &UserId) -> Result<Vec<Reservation>, ServiceError> {
        Ok(self.reservation_repo.find_pending_by_user(user_id).await?)
    }

    /// 予約のステータス・期限を書き換える（管理操作）
    ///
    /// 受け取り待ちの予約を取消・期限切れにした場合は、同じトランザクションで
    /// 蔵書の取り置きを解除する。それ以外のステータス変更は蔵書に影響しない。
    ///
    /// # エラー
    ///
    /// - `NotFound`: 予約がない
    /// - `InvalidState`: 受け取り待ちへの変更、または受け取り待ちから取消・期限切れ以外への変更
    pub async fn update_reservation(
        &self,
        id: &ReservationId,
        input: UpdateReservationInput,
    ) -> Result<Reservation, ServiceError> {
        let now = self.clock.now();

        let mut tx = self.tx_manager.begin().await?;
        let reservation = self
            .reservation_repo
            .find_by_id_for_update(&mut tx, id)
            .await
            .or_not_found("予約")?;
        let was_pending = reservation.is_pending();
        let updated = reservation.updated(
            ReservationChanges {
                status:   input.status,
                exp_date: input.exp_date,
            },
            now,
        )?;
        self.reservation_repo.update(&mut tx, &updated).await?;

        if was_pending && !updated.is_pending() {
            let released = release_reserved_instance(
                self.instance_repo.as_ref(),
                &mut tx,
                updated.book_instance_id(),
                now,
            )
            .await?;
            tracing::info!(
                reservation_id = %updated.id(),
                instance_id = %updated.book_instance_id(),
                status = %updated.status(),
                released,
                "予約を終了しました"
            );
        }
        tx.commit().await?;

        Ok(updated)
    }

    /// 予約を削除する
    ///
    /// 受け取り待ちの予約で、蔵書が取り置き中であれば貸出可能に戻す。
    /// 予約レコードはステータスに関わらず削除する。
    pub async fn cancel_reservation(&self, id: &ReservationId) -> Result<(), ServiceError> {
        let now = self.clock.now();

        let mut tx = self.tx_manager.begin().await?;
        let reservation = self
            .reservation_repo
            .find_by_id_for_update(&mut tx, id)
            .await
            .or_not_found("予約")?;

        let released = if reservation.is_pending() {
            release_reserved_instance(
                self.instance_repo.as_ref(),
                &mut tx,
                reservation.book_instance_id(),
                now,
            )
            .await?
        } else {
            false
        };
        self.reservation_repo.delete(&mut tx, id).await?;
        tx.commit().await?;

        tracing::info!(
            reservation_id = %id,
            instance_id = %reservation.book_instance_id(),
            released,
            "予約を削除しました"
        );
        Ok(())
    }

    /// 受け取り待ちの予約と重複しない受け取りコードを発行する
    async fn issue_pickup_code(&self, tx: &mut TxContext) -> Result<PickupCode, ServiceError> {
        for _ in 0..PICKUP_CODE_ATTEMPTS {
            let code = PickupCode::generate();
            if !self.reservation_repo.exists_pending_code(tx, &code).await? {
                return Ok(code);
            }
        }
        Err(ServiceError::Conflict(
            "受け取りコードを発行できませんでした。時間をおいて再度お試しください".to_string(),
        ))
    }

    /// QR 画像を保存して予約に URL を設定する（ベストエフォート）
    async fn attach_pickup_code_image(&self, reservation: Reservation) -> Reservation {
        match self.store_pickup_code_image(&reservation).await {
            Ok(url) => reservation.with_qr_code_url(url, self.clock.now()),
            Err(e) => {
                tracing::warn!(
                    reservation_id = %reservation.id(),
                    error = %e,
                    "受け取りコード画像を保存できませんでした"
                );
                reservation
            }
        }
    }

    async fn store_pickup_code_image(&self, reservation: &Reservation) -> Result<String, InfraError> {
        let body = qr::render_pickup_code_svg(reservation.pickup_code())?;
        let key = qr::pickup_code_object_key(reservation.id());
        let url = self
            .object_storage
            .put_object(&key, qr::QR_CONTENT_TYPE, body)
            .await?;

        let mut tx = self.tx_manager.begin().await?;
        self.reservation_repo
            .set_qr_code_url(&mut tx, reservation.id(), &url, self.clock.now())
            .await?;
        tx.commit().await?;

        Ok(url)
    }
}
