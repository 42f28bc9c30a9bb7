//! ユースケース層の共通ヘルパー

use bookshelf_domain::book_instance::{BookInstanceId, BookInstanceStatus};
use bookshelf_infra::{InfraError, db::TxContext, repository::BookInstanceRepository};
use chrono::{DateTime, Utc};

use crate::error::ServiceError;

/// リポジトリの `Result<Option<T>, InfraError>` を `Result<T, ServiceError>` に変換する
///
/// ```ignore
/// let instance = self.instance_repo.find_by_id(&id).await.or_not_found("蔵書")?;
/// ```
pub(crate) trait FindResultExt<T> {
    /// `None` の場合は `ServiceError::NotFound`
    fn or_not_found(self, entity_name: &str) -> Result<T, ServiceError>;
}

impl<T> FindResultExt<T> for Result<Option<T>, InfraError> {
    fn or_not_found(self, entity_name: &str) -> Result<T, ServiceError> {
        self?
            .ok_or_else(|| ServiceError::NotFound(format!("{entity_name}が見つかりません")))
    }
}

/// 取り置き中の蔵書を貸出可能に戻す
///
/// 蔵書が存在しないか `reserved` でない場合は何もしない。戻した場合は `true`。
pub(crate) async fn release_reserved_instance(
    instance_repo: &dyn BookInstanceRepository,
    tx: &mut TxContext,
    instance_id: &BookInstanceId,
    now: DateTime<Utc>,
) -> Result<bool, ServiceError> {
    let instance = instance_repo
        .find_by_id_for_update(tx, instance_id)
        .await?
        .filter(|i| i.status() == BookInstanceStatus::Reserved);
    let Some(instance) = instance else {
        return Ok(false);
    };

    let released = instance.released(now)?;
    instance_repo
        .update_status(tx, &released, BookInstanceStatus::Reserved)
        .await?;
    Ok(true)
}
