//! 蔵書登録ユースケース
//!
//! 物理タグは全蔵書で一意。重複は `Conflict` として返す。

use std::sync::Arc;

use bookshelf_domain::{
    book::BookId,
    book_instance::{
        BookInstance,
        BookInstanceChanges,
        BookInstanceId,
        BookInstanceStatus,
        InstanceTag,
        NewBookInstance,
    },
    clock::Clock,
    shelf::ShelfId,
};
use bookshelf_infra::{
    db::TransactionManager,
    repository::{BookInstanceRepository, BookRepository, ShelfRepository},
};

use crate::{error::ServiceError, usecase::helpers::FindResultExt};

/// 蔵書登録の入力
pub struct CreateBookInstanceInput {
    pub book_id:   BookId,
    pub shelf_id:  ShelfId,
    pub shelf_pos: f64,
    pub tag:       String,
    pub status:    Option<BookInstanceStatus>,
}

/// 蔵書更新の入力（`None` の項目は変更しない）
#[derive(Default)]
pub struct UpdateBookInstanceInput {
    pub book_id:   Option<BookId>,
    pub shelf_id:  Option<ShelfId>,
    pub shelf_pos: Option<f64>,
    pub tag:       Option<String>,
    pub status:    Option<BookInstanceStatus>,
}

/// 蔵書登録ユースケース
pub struct BookInstanceUseCaseImpl {
    instance_repo: Arc<dyn BookInstanceRepository>,
    book_repo:     Arc<dyn BookRepository>,
    shelf_repo:    Arc<dyn ShelfRepository>,
    tx_manager:    Arc<dyn TransactionManager>,
    clock:         Arc<dyn Clock>,
}

impl BookInstanceUseCaseImpl {
    pub fn new(
        instance_repo: Arc<dyn BookInstanceRepository>,
        book_repo: Arc<dyn BookRepository>,
        shelf_repo: Arc<dyn ShelfRepository>,
        tx_manager: Arc<dyn TransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            instance_repo,
            book_repo,
            shelf_repo,
            tx_manager,
            clock,
        }
    }

    /// 蔵書を登録する
    ///
    /// 書誌・書架が存在しない場合は `NotFound`、タグが重複する場合は `Conflict`。
    /// `reserved` / `borrowed` での登録は `InvalidState`。
    pub async fn create_instance(
        &self,
        input: CreateBookInstanceInput,
    ) -> Result<BookInstance, ServiceError> {
        let tag = InstanceTag::new(input.tag)?;
        let status = input
            .status
            .unwrap_or_default()
            .ensure_settable_by_admin()?;
        self.ensure_references(Some(&input.book_id), Some(&input.shelf_id))
            .await?;

        let instance = BookInstance::new(NewBookInstance {
            id: BookInstanceId::new(),
            book_id: input.book_id,
            shelf_id: input.shelf_id,
            shelf_pos: input.shelf_pos,
            tag,
            status,
            now: self.clock.now(),
        })?;

        let mut tx = self.tx_manager.begin().await?;
        self.instance_repo.insert(&mut tx, &instance).await?;
        tx.commit().await?;

        tracing::info!(
            instance_id = %instance.id(),
            tag = %instance.tag(),
            "蔵書を登録しました"
        );
        Ok(instance)
    }

    pub async fn get_instance(&self, id: &BookInstanceId) -> Result<BookInstance, ServiceError> {
        self.instance_repo.find_by_id(id).await.or_not_found("蔵書")
    }

    /// 蔵書を部分更新する
    ///
    /// ステータスは `available` と `damaged` の間でのみ変更できる。
    /// 取り置き中・貸出中の蔵書のステータス変更は `InvalidState`。
    pub async fn update_instance(
        &self,
        id: &BookInstanceId,
        input: UpdateBookInstanceInput,
    ) -> Result<BookInstance, ServiceError> {
        let tag = input.tag.map(InstanceTag::new).transpose()?;
        self.ensure_references(input.book_id.as_ref(), input.shelf_id.as_ref())
            .await?;

        let mut tx = self.tx_manager.begin().await?;
        let instance = self
            .instance_repo
            .find_by_id_for_update(&mut tx, id)
            .await
            .or_not_found("蔵書")?;
        let updated = instance.updated(
            BookInstanceChanges {
                book_id: input.book_id,
                shelf_id: input.shelf_id,
                shelf_pos: input.shelf_pos,
                tag,
                status: input.status,
            },
            self.clock.now(),
        )?;
        self.instance_repo.update(&mut tx, &updated).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// 蔵書を削除する
    ///
    /// 貸出履歴や予約から参照されている場合は `Conflict`。
    pub async fn delete_instance(&self, id: &BookInstanceId) -> Result<(), ServiceError> {
        let mut tx = self.tx_manager.begin().await?;
        if !self.instance_repo.delete(&mut tx, id).await? {
            return Err(ServiceError::NotFound("蔵書が見つかりません".to_string()));
        }
        tx.commit().await?;
        Ok(())
    }

    async fn ensure_references(
        &self,
        book_id: Option<&BookId>,
        shelf_id: Option<&ShelfId>,
    ) -> Result<(), ServiceError> {
        if let Some(book_id) = book_id {
            self.book_repo.find_by_id(book_id).await.or_not_found("書誌")?;
        }
        if let Some(shelf_id) = shelf_id {
            self.shelf_repo.find_by_id(shelf_id).await.or_not_found("書架")?;
        }
        Ok(())
    }
}
