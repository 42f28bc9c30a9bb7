//! ReservationRepository 統合テスト
//!
//! 実行方法:
//! ```bash
//! cargo test -p bookshelf-infra --test reservation_repository_test
//! ```

mod common;

use bookshelf_domain::{
    book_instance::{BookInstance, BookInstanceStatus},
    reservation::{NewReservation, PickupCode, Reservation, ReservationId, ReservationStatus},
    user::UserId,
};
use bookshelf_infra::{
    db::{PgTransactionManager, TransactionManager},
    repository::{
        BookInstanceRepository,
        PostgresBookInstanceRepository,
        PostgresReservationRepository,
        ReservationRepository,
    },
};
use chrono::Duration;
use common::{assert_circulation_invariants, create_test_instance, setup_instance, test_now};
use pretty_assertions::assert_eq;
use sqlx::PgPool;

fn reservation_of(instance: &BookInstance, user_id: &UserId, code: &str) -> Reservation {
    Reservation::new(NewReservation {
        id:               ReservationId::new(),
        user_id:          user_id.clone(),
        book_instance_id: instance.id().clone(),
        exp_date:         test_now() + Duration::hours(2),
        pickup_code:      PickupCode::parse(code).unwrap(),
        now:              test_now(),
    })
}

/// 蔵書を取り置き状態にして予約を登録する
async fn reserve(pool: &PgPool, instance: &BookInstance, reservation: &Reservation) {
    let tx_manager = PgTransactionManager::new(pool.clone());
    let mut tx = tx_manager.begin().await.unwrap();
    PostgresBookInstanceRepository::new(pool.clone())
        .update_status(
            &mut tx,
            &instance.clone().reserved(test_now()).unwrap(),
            BookInstanceStatus::Available,
        )
        .await
        .unwrap();
    PostgresReservationRepository::new(pool.clone())
        .insert(&mut tx, reservation)
        .await
        .unwrap();
    tx.commit().await.unwrap();
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_受け取りコードで受け取り待ちの予約を取得できる(pool: PgPool) {
    let (_, _, instance) = setup_instance(&pool, "RFID-0001", BookInstanceStatus::Available).await;
    let reservation = reservation_of(&instance, &UserId::new(), "042917");
    reserve(&pool, &instance, &reservation).await;
    assert_circulation_invariants(&pool).await;

    let sut = PostgresReservationRepository::new(pool.clone());
    let tx_manager = PgTransactionManager::new(pool.clone());
    let mut tx = tx_manager.begin().await.unwrap();

    let by_code = sut
        .find_pending_by_code_for_update(&mut tx, reservation.pickup_code())
        .await
        .unwrap();
    let by_instance = sut
        .find_pending_by_instance_for_update(&mut tx, instance.id())
        .await
        .unwrap();
    let exists = sut
        .exists_pending_code(&mut tx, reservation.pickup_code())
        .await
        .unwrap();
    let unknown = sut
        .find_pending_by_code_for_update(&mut tx, &PickupCode::parse("000000").unwrap())
        .await
        .unwrap();

    assert_eq!(by_code, Some(reservation.clone()));
    assert_eq!(by_instance, Some(reservation));
    assert!(exists);
    assert_eq!(unknown, None);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_同じ蔵書に受け取り待ちの予約は2件作れない(pool: PgPool) {
    let (_, _, instance) = setup_instance(&pool, "RFID-0001", BookInstanceStatus::Available).await;
    reserve(
        &pool,
        &instance,
        &reservation_of(&instance, &UserId::new(), "111111"),
    )
    .await;

    let sut = PostgresReservationRepository::new(pool.clone());
    let tx_manager = PgTransactionManager::new(pool.clone());
    let mut tx = tx_manager.begin().await.unwrap();
    let result = sut
        .insert(
            &mut tx,
            &reservation_of(&instance, &UserId::new(), "222222"),
        )
        .await;

    assert!(result.unwrap_err().is_conflict());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_受け取り待ちの予約間でコードは重複できない(pool: PgPool) {
    let (book, shelf, first) =
        setup_instance(&pool, "RFID-0001", BookInstanceStatus::Available).await;
    reserve(&pool, &first, &reservation_of(&first, &UserId::new(), "123456")).await;

    let second = create_test_instance(&book, &shelf, "RFID-0002", BookInstanceStatus::Reserved);
    let tx_manager = PgTransactionManager::new(pool.clone());
    let mut tx = tx_manager.begin().await.unwrap();
    PostgresBookInstanceRepository::new(pool.clone())
        .insert(&mut tx, &second)
        .await
        .unwrap();
    let result = PostgresReservationRepository::new(pool.clone())
        .insert(&mut tx, &reservation_of(&second, &UserId::new(), "123456"))
        .await;

    assert!(result.unwrap_err().is_conflict());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_期限切れにした予約のコードは再利用できる(pool: PgPool) {
    let (book, shelf, first) =
        setup_instance(&pool, "RFID-0001", BookInstanceStatus::Available).await;
    let old = reservation_of(&first, &UserId::new(), "123456");
    reserve(&pool, &first, &old).await;

    let sut = PostgresReservationRepository::new(pool.clone());
    let tx_manager = PgTransactionManager::new(pool.clone());

    // 受け取り時点で期限切れと判定されたものとして expired にする
    let mut tx = tx_manager.begin().await.unwrap();
    let expired = old.expired(test_now() + Duration::hours(3)).unwrap();
    sut.update_status(&mut tx, &expired, ReservationStatus::Pending)
        .await
        .unwrap();
    tx.commit().await.unwrap();

    let second = create_test_instance(&book, &shelf, "RFID-0002", BookInstanceStatus::Available);
    let mut tx = tx_manager.begin().await.unwrap();
    PostgresBookInstanceRepository::new(pool.clone())
        .insert(&mut tx, &second)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    reserve(&pool, &second, &reservation_of(&second, &UserId::new(), "123456")).await;

    let mut tx = tx_manager.begin().await.unwrap();
    let found = sut
        .find_pending_by_code_for_update(&mut tx, &PickupCode::parse("123456").unwrap())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.book_instance_id(), second.id());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_qrコードurlはステータスを変えずに設定される(pool: PgPool) {
    let (_, _, instance) = setup_instance(&pool, "RFID-0001", BookInstanceStatus::Available).await;
    let reservation = reservation_of(&instance, &UserId::new(), "654321");
    reserve(&pool, &instance, &reservation).await;

    let sut = PostgresReservationRepository::new(pool.clone());
    let tx_manager = PgTransactionManager::new(pool.clone());
    let mut tx = tx_manager.begin().await.unwrap();
    sut.set_qr_code_url(
        &mut tx,
        reservation.id(),
        "https://storage.test/pickup-codes/x.svg",
        test_now(),
    )
    .await
    .unwrap();
    tx.commit().await.unwrap();

    let found = sut.find_by_id(reservation.id()).await.unwrap().unwrap();
    assert_eq!(
        found.qr_code_url(),
        Some("https://storage.test/pickup-codes/x.svg")
    );
    assert_eq!(found.status(), ReservationStatus::Pending);
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_利用者の受け取り待ちの予約のみ返す(pool: PgPool) {
    let (book, shelf, first) =
        setup_instance(&pool, "RFID-0001", BookInstanceStatus::Available).await;
    let user_id = UserId::new();
    let pending = reservation_of(&first, &user_id, "100001");
    reserve(&pool, &first, &pending).await;

    // 同じ利用者の完了済み予約
    let second = create_test_instance(&book, &shelf, "RFID-0002", BookInstanceStatus::Available);
    let done = reservation_of(&second, &user_id, "100002")
        .completed(test_now())
        .unwrap();
    let tx_manager = PgTransactionManager::new(pool.clone());
    let sut = PostgresReservationRepository::new(pool.clone());
    let mut tx = tx_manager.begin().await.unwrap();
    PostgresBookInstanceRepository::new(pool.clone())
        .insert(&mut tx, &second)
        .await
        .unwrap();
    sut.insert(&mut tx, &done).await.unwrap();
    tx.commit().await.unwrap();

    let found = sut.find_pending_by_user(&user_id).await.unwrap();
    let others = sut.find_pending_by_user(&UserId::new()).await.unwrap();

    assert_eq!(found, vec![pending]);
    assert!(others.is_empty());
}

#[sqlx::test(migrations = "../../migrations")]
async fn test_予約を削除できる(pool: PgPool) {
    let (_, _, instance) = setup_instance(&pool, "RFID-0001", BookInstanceStatus::Available).await;
    let reservation = reservation_of(&instance, &UserId::new(), "777777");
    reserve(&pool, &instance, &reservation).await;

    let sut = PostgresReservationRepository::new(pool.clone());
    let tx_manager = PgTransactionManager::new(pool.clone());
    let mut tx = tx_manager.begin().await.unwrap();
    PostgresBookInstanceRepository::new(pool.clone())
        .update_status(
            &mut tx,
            &instance.clone().reserved(test_now()).unwrap().released(test_now()).unwrap(),
            BookInstanceStatus::Reserved,
        )
        .await
        .unwrap();
    assert!(sut.delete(&mut tx, reservation.id()).await.unwrap());
    tx.commit().await.unwrap();

    assert_eq!(sut.find_by_id(reservation.id()).await.unwrap(), None);
    assert_circulation_invariants(&pool).await;
}
