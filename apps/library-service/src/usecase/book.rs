//! 書誌管理ユースケース

use std::sync::Arc;

use bookshelf_domain::{
    book::{AuthorName, Book, BookChanges, BookId, BookName, BookSearch, NewBook},
    book_instance::BookInstance,
    clock::Clock,
};
use bookshelf_infra::{
    db::TransactionManager,
    repository::{BookInstanceRepository, BookRepository},
};

use crate::{error::ServiceError, usecase::helpers::FindResultExt};

/// 書誌登録の入力
pub struct CreateBookInput {
    pub name:            String,
    pub author:          String,
    pub description:     Option<String>,
    pub cover_image_url: Option<String>,
    pub genre:           Option<String>,
}

/// 書誌更新の入力（`None` の項目は変更しない）
#[derive(Default)]
pub struct UpdateBookInput {
    pub name:            Option<String>,
    pub author:          Option<String>,
    pub description:     Option<String>,
    pub cover_image_url: Option<String>,
    pub genre:           Option<String>,
}

/// 書誌管理ユースケース
pub struct BookUseCaseImpl {
    book_repo:     Arc<dyn BookRepository>,
    instance_repo: Arc<dyn BookInstanceRepository>,
    tx_manager:    Arc<dyn TransactionManager>,
    clock:         Arc<dyn Clock>,
}

impl BookUseCaseImpl {
    pub fn new(
        book_repo: Arc<dyn BookRepository>,
        instance_repo: Arc<dyn BookInstanceRepository>,
        tx_manager: Arc<dyn TransactionManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            book_repo,
            instance_repo,
            tx_manager,
            clock,
        }
    }

    pub async fn create_book(&self, input: CreateBookInput) -> Result<Book, ServiceError> {
        let book = Book::new(NewBook {
            id:              BookId::new(),
            name:            BookName::new(input.name)?,
            author:          AuthorName::new(input.author)?,
            description:     input.description,
            cover_image_url: input.cover_image_url,
            genre:           input.genre,
            now:             self.clock.now(),
        });

        let mut tx = self.tx_manager.begin().await?;
        self.book_repo.insert(&mut tx, &book).await?;
        tx.commit().await?;

        Ok(book)
    }

    /// 書名・著者・ジャンルの部分一致（大文字小文字を区別しない AND）で検索する
    pub async fn list_books(&self, search: &BookSearch) -> Result<Vec<Book>, ServiceError> {
        Ok(self.book_repo.search(search).await?)
    }

    pub async fn get_book(&self, id: &BookId) -> Result<Book, ServiceError> {
        self.book_repo.find_by_id(id).await.or_not_found("書誌")
    }

    pub async fn update_book(
        &self,
        id: &BookId,
        input: UpdateBookInput,
    ) -> Result<Book, ServiceError> {
        let changes = BookChanges {
            name:            input.name.map(BookName::new).transpose()?,
            author:          input.author.map(AuthorName::new).transpose()?,
            description:     input.description,
            cover_image_url: input.cover_image_url,
            genre:           input.genre,
        };

        let book = self.get_book(id).await?;
        let updated = book.updated(changes, self.clock.now());

        let mut tx = self.tx_manager.begin().await?;
        self.book_repo.update(&mut tx, &updated).await?;
        tx.commit().await?;

        Ok(updated)
    }

    /// 書誌を削除する
    ///
    /// 蔵書から参照されている場合は `Conflict`。
    pub async fn delete_book(&self, id: &BookId) -> Result<(), ServiceError> {
        let mut tx = self.tx_manager.begin().await?;
        let deleted = self.book_repo.delete(&mut tx, id).await?;
        if !deleted {
            return Err(ServiceError::NotFound("書誌が見つかりません".to_string()));
        }
        tx.commit().await?;
        Ok(())
    }

    /// 書誌の貸出可能な蔵書を取得する
    pub async fn list_available_instances(
        &self,
        id: &BookId,
    ) -> Result<Vec<BookInstance>, ServiceError> {
        self.get_book(id).await?;
        Ok(self.instance_repo.find_available_by_book(id).await?)
    }
}

#[cfg(test)]
mod tests {
    use bookshelf_domain::book_instance::BookInstanceStatus;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::LibraryTestBuilder;

    fn create_input(name: &str, author: &str) -> CreateBookInput {
        CreateBookInput {
            name:            name.to_string(),
            author:          author.to_string(),
            description:     None,
            cover_image_url: None,
            genre:           Some("Novel".to_string()),
        }
    }

    #[tokio::test]
    async fn test_書誌を登録して取得できる() {
        let builder = LibraryTestBuilder::new();
        let sut = builder.book_usecase();

        let created = sut
            .create_book(create_input("War and Peace", "Leo Tolstoy"))
            .await
            .unwrap();
        let found = sut.get_book(created.id()).await.unwrap();

        assert_eq!(found, created);
        assert_eq!(found.created_at(), builder.now());
    }

    #[tokio::test]
    async fn test_書名が空なら登録できない() {
        let sut = LibraryTestBuilder::new().book_usecase();

        let result = sut.create_book(create_input("  ", "Leo Tolstoy")).await;

        assert!(matches!(result, Err(ServiceError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_検索条件で絞り込める() {
        let builder = LibraryTestBuilder::new();
        let sut = builder.book_usecase();
        let war = sut
            .create_book(create_input("War and Peace", "Leo Tolstoy"))
            .await
            .unwrap();
        sut.create_book(create_input("Crime and Punishment", "Fyodor Dostoevsky"))
            .await
            .unwrap();

        let result = sut
            .list_books(&BookSearch::new(
                Some("war".to_string()),
                Some("TOLSTOY".to_string()),
                None,
            ))
            .await
            .unwrap();

        assert_eq!(result, vec![war]);
    }

    #[tokio::test]
    async fn test_指定した項目だけ更新される() {
        let builder = LibraryTestBuilder::new();
        let sut = builder.book_usecase();
        let created = sut
            .create_book(create_input("War and Peace", "Leo Tolstoy"))
            .await
            .unwrap();

        let updated = sut
            .update_book(
                created.id(),
                UpdateBookInput {
                    description: Some("1869".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.description(), Some("1869"));
        assert_eq!(updated.name(), created.name());
        assert_eq!(updated.genre(), Some("Novel"));
    }

    #[tokio::test]
    async fn test_存在しない書誌の更新と削除はnot_found() {
        let sut = LibraryTestBuilder::new().book_usecase();
        let id = BookId::new();

        let updated = sut.update_book(&id, UpdateBookInput::default()).await;
        let deleted = sut.delete_book(&id).await;

        assert!(matches!(updated, Err(ServiceError::NotFound(_))));
        assert!(matches!(deleted, Err(ServiceError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_蔵書から参照されている書誌は削除できない() {
        let builder = LibraryTestBuilder::new();
        let instance = builder.add_instance("RFID-0001", BookInstanceStatus::Available);
        let sut = builder.book_usecase();

        let result = sut.delete_book(instance.book_id()).await;

        assert!(matches!(result, Err(ServiceError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_貸出可能な蔵書のみ返す() {
        let builder = LibraryTestBuilder::new();
        let book = builder.add_book("War and Peace");
        let shelf = builder.add_shelf("駅前の書架");
        let available =
            builder.add_instance_of(&book, &shelf, "RFID-0001", BookInstanceStatus::Available);
        builder.add_instance_of(&book, &shelf, "RFID-0002", BookInstanceStatus::Borrowed);
        let sut = builder.book_usecase();

        let result = sut.list_available_instances(book.id()).await.unwrap();

        assert_eq!(result, vec![available]);
    }

    #[tokio::test]
    async fn test_存在しない書誌の蔵書一覧はnot_found() {
        let sut = LibraryTestBuilder::new().book_usecase();

        let result = sut.list_available_instances(&BookId::new()).await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
    }
}
