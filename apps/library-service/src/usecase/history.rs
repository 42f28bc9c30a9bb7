//! 貸出履歴の参照ユースケース

use std::sync::Arc;

use bookshelf_domain::{transaction::Transaction, user::UserId};
use bookshelf_infra::repository::TransactionRepository;

use crate::error::ServiceError;

/// 管理者向け一覧の最大件数
pub const ADMIN_TRANSACTIONS_LIMIT: i64 = 100;

/// 貸出履歴の参照ユースケース
pub struct HistoryUseCaseImpl {
    transaction_repo: Arc<dyn TransactionRepository>,
}

impl HistoryUseCaseImpl {
    pub fn new(transaction_repo: Arc<dyn TransactionRepository>) -> Self {
        Self { transaction_repo }
    }

    /// 利用者の全トランザクションを新しい順で取得する
    pub async fn user_history(&self, user_id: &UserId) -> Result<Vec<Transaction>, ServiceError> {
        Ok(self.transaction_repo.find_by_user(user_id).await?)
    }

    /// 全利用者のトランザクションを新しい順で最大 100 件取得する
    pub async fn recent_transactions(&self) -> Result<Vec<Transaction>, ServiceError> {
        Ok(self
            .transaction_repo
            .find_recent(ADMIN_TRANSACTIONS_LIMIT)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use bookshelf_domain::{book_instance::BookInstanceStatus, transaction::TransactionType};
    use chrono::Duration;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::test_utils::LibraryTestBuilder;

    #[tokio::test]
    async fn test_利用者の履歴は新しい順() {
        // Arrange
        let builder = LibraryTestBuilder::new();
        builder.add_instance("RFID-0001", BookInstanceStatus::Available);
        let user_id = UserId::new();
        let circulation = builder.circulation_usecase();
        circulation
            .borrow(user_id.clone(), "RFID-0001".to_string())
            .await
            .unwrap();
        builder.clock.advance(Duration::minutes(30));
        circulation
            .return_quick("RFID-0001".to_string())
            .await
            .unwrap();
        builder.add_borrowed_instance("RFID-0002", &UserId::new());
        let sut = builder.history_usecase();

        // Act
        let history = sut.user_history(&user_id).await.unwrap();

        // Assert
        let types: Vec<_> = history.iter().map(|t| t.transaction_type()).collect();
        assert_eq!(types, vec![TransactionType::Return, TransactionType::Borrow]);
    }

    #[tokio::test]
    async fn test_管理者向け一覧は最大100件() {
        let builder = LibraryTestBuilder::new();
        for i in 0..(ADMIN_TRANSACTIONS_LIMIT + 5) {
            builder.add_borrowed_instance(&format!("RFID-{i:04}"), &UserId::new());
            builder.clock.advance(Duration::seconds(1));
        }
        let sut = builder.history_usecase();

        let recent = sut.recent_transactions().await.unwrap();

        assert_eq!(recent.len(), ADMIN_TRANSACTIONS_LIMIT as usize);
        assert!(recent.windows(2).all(|w| w[0].date() >= w[1].date()));
    }
}
