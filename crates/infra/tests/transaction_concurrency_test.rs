//! 貸出・予約の競合テスト
//!
//! 条件付きステータス更新（`WHERE status = $expected`）が同時操作の片方を
//! `Conflict` で失敗させ、トランザクションの原子性により不変条件が保持されることを検証する。
//!
//! sqlx::test は単一接続プール（savepoint ベース）のため、tokio::spawn による
//! 真の並行テストは不可能。古いスナップショットを使った逐次実行で同等の競合シナリオを検証する。
//!
//! 実行方法:
//! ```bash
//! cargo test -p bookshelf-infra --test transaction_concurrency_test
//! ```

mod common;

use bookshelf_domain::{
    book_instance::BookInstanceStatus,
    reservation::{NewReservation, PickupCode, Reservation, ReservationId},
    transaction::{NewBorrow, Transaction, TransactionId},
    user::UserId,
};
use bookshelf_infra::{
    db::{PgTransactionManager, TransactionManager},
    repository::{
        BookInstanceRepository,
        PostgresBookInstanceRepository,
        PostgresReservationRepository,
        PostgresTransactionRepository,
        ReservationRepository,
        TransactionRepository,
    },
};
use chrono::Duration;
use common::{assert_circulation_invariants, setup_instance, test_now};
use pretty_assertions::assert_eq;
use sqlx::PgPool;

/// 同じ蔵書への 2 件目の貸出は Conflict になる
///
/// シナリオ:
/// 1. `available` の蔵書を DB に挿入
/// 2. TX_A: 蔵書を `borrowed` にして貸出を記録 → コミット成功
/// 3. TX_B: TX_A 前に読んだ蔵書で同じ更新を試みる → Conflict
/// 4. 不変条件が保持されている
#[sqlx::test(migrations = "../../migrations")]
async fn test_同じ蔵書の2件目の貸出はconflictを返す(pool: PgPool) {
    let (_, _, instance) = setup_instance(&pool, "RFID-0001", BookInstanceStatus::Available).await;
    let now = test_now();

    let tx_manager = PgTransactionManager::new(pool.clone());
    let instance_repo = PostgresBookInstanceRepository::new(pool.clone());
    let transaction_repo = PostgresTransactionRepository::new(pool.clone());

    let borrow_by = |user_id: UserId| {
        Transaction::borrow(NewBorrow {
            id:               TransactionId::new(),
            user_id,
            book_instance_id: instance.id().clone(),
            shelf_id:         instance.shelf_id().clone(),
            due_date:         None,
            now,
        })
    };

    // TX_A: 貸出 → コミット成功
    let borrowed = instance.clone().borrowed(now).unwrap();
    let mut tx_a = tx_manager.begin().await.unwrap();
    instance_repo
        .update_status(&mut tx_a, &borrowed, BookInstanceStatus::Available)
        .await
        .unwrap();
    transaction_repo
        .insert(&mut tx_a, &borrow_by(UserId::new()))
        .await
        .unwrap();
    tx_a.commit().await.unwrap();

    // TX_B: 古いスナップショット（available）のまま貸出 → Conflict
    let mut tx_b = tx_manager.begin().await.unwrap();
    let result = instance_repo
        .update_status(&mut tx_b, &borrowed, BookInstanceStatus::Available)
        .await;

    assert!(
        result.as_ref().is_err_and(|e| e.is_conflict()),
        "期待と異なるステータスからの更新は Conflict を返すべき: {:?}",
        result
    );
    drop(tx_b);

    assert_circulation_invariants(&pool).await;
}

/// トランザクション原子性: 途中で Conflict が発生すると予約の登録もロールバックされる
///
/// シナリオ:
/// 1. `available` の蔵書を DB に挿入
/// 2. TX_A: 蔵書を貸し出してコミット
/// 3. TX_B: 予約を登録（成功）→ 蔵書を `reserved` に更新 → Conflict → drop
/// 4. TX_B の予約が残っていないことを検証
#[sqlx::test(migrations = "../../migrations")]
async fn test_conflict後は予約の登録もロールバックされる(pool: PgPool) {
    let (_, _, instance) = setup_instance(&pool, "RFID-0001", BookInstanceStatus::Available).await;
    let now = test_now();

    let tx_manager = PgTransactionManager::new(pool.clone());
    let instance_repo = PostgresBookInstanceRepository::new(pool.clone());
    let transaction_repo = PostgresTransactionRepository::new(pool.clone());
    let reservation_repo = PostgresReservationRepository::new(pool.clone());

    // TX_A: 貸出 → コミット成功
    let borrowed = instance.clone().borrowed(now).unwrap();
    let mut tx_a = tx_manager.begin().await.unwrap();
    instance_repo
        .update_status(&mut tx_a, &borrowed, BookInstanceStatus::Available)
        .await
        .unwrap();
    transaction_repo
        .insert(
            &mut tx_a,
            &Transaction::borrow(NewBorrow {
                id:               TransactionId::new(),
                user_id:          UserId::new(),
                book_instance_id: instance.id().clone(),
                shelf_id:         instance.shelf_id().clone(),
                due_date:         None,
                now,
            }),
        )
        .await
        .unwrap();
    tx_a.commit().await.unwrap();

    // TX_B: 予約登録 → 蔵書の取り置きで Conflict
    let reservation = Reservation::new(NewReservation {
        id:               ReservationId::new(),
        user_id:          UserId::new(),
        book_instance_id: instance.id().clone(),
        exp_date:         now + Duration::days(1),
        pickup_code:      PickupCode::parse("123456").unwrap(),
        now,
    });
    let reserved = instance.clone().reserved(now).unwrap();

    let mut tx_b = tx_manager.begin().await.unwrap();
    reservation_repo
        .insert(&mut tx_b, &reservation)
        .await
        .unwrap();
    let result = instance_repo
        .update_status(&mut tx_b, &reserved, BookInstanceStatus::Available)
        .await;
    assert!(result.unwrap_err().is_conflict());
    drop(tx_b);

    let found = reservation_repo.find_by_id(reservation.id()).await.unwrap();
    assert_eq!(found, None);

    let current = instance_repo.find_by_id(instance.id()).await.unwrap().unwrap();
    assert_eq!(current.status(), BookInstanceStatus::Borrowed);

    assert_circulation_invariants(&pool).await;
}
