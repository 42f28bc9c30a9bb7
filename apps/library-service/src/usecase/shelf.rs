//! 書架管理ユースケース

use std::sync::Arc;

use bookshelf_domain::{
    book_instance::BookInstance,
    clock::Clock,
    shelf::{Coordinates, NewShelf, Shelf, ShelfChanges, ShelfId, ShelfName, ShelfStatus},
};
use bookshelf_infra::{
    db::TransactionManager,
    repository::{BookInstanceRepository, ShelfRepository},
};

use crate::{error::ServiceError, usecase::helpers::FindResultExt};

/// 書架登録の入力
pub struct CreateShelfInput {
    pub name:      String,
    pub capacity:  i32,
    pub latitude:  Option<f64>,
    pub longitude: Option<f64>,
    pub status:    Option<ShelfStatus>,
}

/// 書架更新の入力（`None` の項目は変更しない）
#[derive(Default)]
pub struct UpdateShelfInput {
    pub name:      Option<String>,
    pub capacity:  Option<i32>,
    pub latitude:  Option<f64>,
    pub longitude: Option<f64>,
    pub status:    Option<ShelfStatus>,
}

/// 書架管理ユースケース
pub struct ShelfUseCaseImpl {
    shelf_repo:    Arc<dyn ShelfRepository>,
    instance_repo: Arc<dyn BookInstanceRepository>,
    tx_manager:    Arc<dyn TransactionManager>,
    clock:         Arc<dyn Clock>,
}

impl ShelfUseCaseImpl {
    pub fn new(
        shelf_repo: Arc<dyn ShelfRepository>,
        instance_repo: Arc<dyn BookInstanceRepository>,
        tx_manager: Arc<dyn TransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            shelf_repo,
            instance_repo,
            tx_manager,
            clock,
        }
    }

    pub async fn list_shelves(&self) -> Result<Vec<Shelf>, ServiceError> {
        Ok(self.shelf_repo.find_all().await?)
    }

    pub async fn get_shelf(&self, id: &ShelfId) -> Result<Shelf, ServiceError> {
        self.shelf_repo.find_by_id(id).await.or_not_found("書架")
    }

    pub async fn create_shelf(&self, input: CreateShelfInput) -> Result<Shelf, ServiceError> {
        let shelf = Shelf::new(NewShelf {
            id:          ShelfId::new(),
            name:        ShelfName::new(input.name)?,
            capacity:    input.capacity,
            coordinates: Coordinates::from_optional(input.latitude, input.longitude)?,
            status:      input.status.unwrap_or_default(),
            now:         self.clock.now(),
        })?;

        let mut tx = self.tx_manager.begin().await?;
        self.shelf_repo.insert(&mut tx, &shelf).await?;
        tx.commit().await?;

        Ok(shelf)
    }

    /// 書架を部分更新する
    ///
    /// 緯度・経度は片方だけ指定された場合、もう片方は現在の値を引き継ぐ。
    pub async fn update_shelf(
        &self,
        id: &ShelfId,
        input: UpdateShelfInput,
    ) -> Result<Shelf, ServiceError> {
        let shelf = self.get_shelf(id).await?;

        let coordinates = match (input.latitude, input.longitude) {
            (None, None) => None,
            (latitude, longitude) => {
                let current = shelf.coordinates();
                Coordinates::from_optional(
                    latitude.or(current.map(|c| c.latitude())),
                    longitude.or(current.map(|c| c.longitude())),
                )?
            }
        };
        let changes = ShelfChanges {
            name: input.name.map(ShelfName::new).transpose()?,
            capacity: input.capacity,
            coordinates,
            status: input.status,
        };
        let updated = shelf.updated(changes, self.clock.now())?;

        let mut tx = self.tx_manager.begin().await?;
        self.shelf_repo.update(&mut tx, &updated).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// 書架を削除する
    ///
    /// 蔵書や履歴から参照されている場合は `Conflict`。
    pub async fn delete_shelf(&self, id: &ShelfId) -> Result<(), ServiceError> {
        let mut tx = self.tx_manager.begin().await?;
        if !self.shelf_repo.delete(&mut tx, id).await? {
            return Err(ServiceError::NotFound("書架が見つかりません".to_string()));
        }
        tx.commit().await?;
        Ok(())
    }

    /// 書架に置かれている蔵書を取得する
    pub async fn list_instances(&self, id: &ShelfId) -> Result<Vec<BookInstance>, ServiceError> {
        self.get_shelf(id).await?;
        Ok(self.instance_repo.find_by_shelf(id).await?)
    }
}
