//! テスト共通フィクスチャ
//!
//! DB を使用する統合テストで共通利用するエンティティ生成ヘルパーと
//! 不変条件チェック。Rust の統合テスト規約に従い `tests/common/mod.rs` に配置。

// 各テストファイルが独立したクレートとしてコンパイルされるため、
// 使用しない関数に dead_code 警告が出る。モジュール全体で抑制する。
#![allow(dead_code)]

use bookshelf_domain::{
    book::{AuthorName, Book, BookId, BookName, NewBook},
    book_instance::{BookInstance, BookInstanceId, BookInstanceStatus, InstanceTag, NewBookInstance},
    shelf::{NewShelf, Shelf, ShelfId, ShelfName, ShelfStatus},
};
use bookshelf_infra::{
    db::{PgTransactionManager, TransactionManager},
    repository::{
        BookInstanceRepository,
        BookRepository,
        PostgresBookInstanceRepository,
        PostgresBookRepository,
        PostgresShelfRepository,
        ShelfRepository,
    },
};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// テスト用の固定日時
pub fn test_now() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

// =============================================================================
// エンティティ生成ヘルパー
// =============================================================================

pub fn create_test_book(name: &str, author: &str, genre: Option<&str>) -> Book {
    Book::new(NewBook {
        id:              BookId::new(),
        name:            BookName::new(name).unwrap(),
        author:          AuthorName::new(author).unwrap(),
        description:     None,
        cover_image_url: None,
        genre:           genre.map(str::to_string),
        now:             test_now(),
    })
}

pub fn create_test_shelf(name: &str) -> Shelf {
    Shelf::new(NewShelf {
        id:          ShelfId::new(),
        name:        ShelfName::new(name).unwrap(),
        capacity:    30,
        coordinates: None,
        status:      ShelfStatus::Active,
        now:         test_now(),
    })
    .unwrap()
}

pub fn create_test_instance(
    book: &Book,
    shelf: &Shelf,
    tag: &str,
    status: BookInstanceStatus,
) -> BookInstance {
    BookInstance::new(NewBookInstance {
        id: BookInstanceId::new(),
        book_id: book.id().clone(),
        shelf_id: shelf.id().clone(),
        shelf_pos: 1.0,
        tag: InstanceTag::new(tag).unwrap(),
        status,
        now: test_now(),
    })
    .unwrap()
}

// =============================================================================
// DB セットアップヘルパー
// =============================================================================

/// 書誌・書架・蔵書 1 冊を DB に作成する
pub async fn setup_instance(
    pool: &PgPool,
    tag: &str,
    status: BookInstanceStatus,
) -> (Book, Shelf, BookInstance) {
    let book = create_test_book("War and Peace", "Leo Tolstoy", Some("Novel"));
    let shelf = create_test_shelf("駅前スタンド");
    let instance = create_test_instance(&book, &shelf, tag, status);

    let tx_manager = PgTransactionManager::new(pool.clone());
    let mut tx = tx_manager.begin().await.unwrap();
    PostgresBookRepository::new(pool.clone())
        .insert(&mut tx, &book)
        .await
        .expect("書誌作成に失敗");
    PostgresShelfRepository::new(pool.clone())
        .insert(&mut tx, &shelf)
        .await
        .expect("書架作成に失敗");
    PostgresBookInstanceRepository::new(pool.clone())
        .insert(&mut tx, &instance)
        .await
        .expect("蔵書作成に失敗");
    tx.commit().await.unwrap();

    (book, shelf, instance)
}

// =============================================================================
// 不変条件チェック
// =============================================================================

/// 貸出・予約の不変条件を検証する
///
/// - `reserved` の蔵書には受け取り待ちの予約がちょうど 1 件あり、その逆も成り立つ
/// - `borrowed` の蔵書には返却待ちの貸出がちょうど 1 件あり、その逆も成り立つ
pub async fn assert_circulation_invariants(pool: &PgPool) {
    let reserved_mismatch: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM book_instances bi
        WHERE (bi.status = 'reserved') <> (
            (SELECT COUNT(*) FROM reservations r
             WHERE r.book_instance_id = bi.id AND r.status = 'pending') = 1
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .expect("不変条件チェック: DB エラー");
    assert_eq!(
        reserved_mismatch, 0,
        "reserved の蔵書と受け取り待ちの予約が対応していない"
    );

    let borrowed_mismatch: i64 = sqlx::query_scalar(
        r#"
        SELECT COUNT(*) FROM book_instances bi
        WHERE (bi.status = 'borrowed') <> (
            (SELECT COUNT(*) FROM transactions t
             WHERE t.book_instance_id = bi.id
               AND t.transaction_type = 'borrow'
               AND t.status = 'pending') = 1
        )
        "#,
    )
    .fetch_one(pool)
    .await
    .expect("不変条件チェック: DB エラー");
    assert_eq!(
        borrowed_mismatch, 0,
        "borrowed の蔵書と返却待ちの貸出が対応していない"
    );
}
