//! # ルーター構築
//!
//! リポジトリ・ストレージ・時刻プロバイダからユースケースを組み立て、
//! 全エンドポイントを束ねた [`Router`] を返す。
//!
//! `main` は Postgres / S3 実装を、テストはモック実装を渡す。

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use bookshelf_domain::clock::Clock;
use bookshelf_infra::{
    db::TransactionManager,
    repository::{
        BookInstanceRepository,
        BookRepository,
        ReservationRepository,
        ShelfRepository,
        TransactionRepository,
    },
    s3::ObjectStorage,
};
use tower_http::trace::TraceLayer;

use crate::{
    handler::{
        BookInstanceState,
        BookState,
        CirculationState,
        HistoryState,
        ReservationState,
        ShelfState,
        admin_transactions,
        borrow,
        create_book,
        create_instance,
        create_reservation,
        create_shelf,
        delete_book,
        delete_instance,
        delete_reservation,
        delete_shelf,
        get_book,
        get_instance,
        get_shelf,
        health_check,
        list_book_instances,
        list_books,
        list_shelf_books,
        list_shelves,
        list_user_reservations,
        pickup,
        return_book,
        return_quick,
        update_book,
        update_instance,
        update_reservation,
        update_shelf,
        user_history,
    },
    usecase::{
        BookInstanceUseCaseImpl,
        BookUseCaseImpl,
        CirculationUseCaseImpl,
        HistoryUseCaseImpl,
        ReservationUseCaseImpl,
        ShelfUseCaseImpl,
    },
};

/// ルーターが必要とする依存コンポーネント
pub struct Dependencies {
    pub book_repo:        Arc<dyn BookRepository>,
    pub shelf_repo:       Arc<dyn ShelfRepository>,
    pub instance_repo:    Arc<dyn BookInstanceRepository>,
    pub transaction_repo: Arc<dyn TransactionRepository>,
    pub reservation_repo: Arc<dyn ReservationRepository>,
    pub object_storage:   Arc<dyn ObjectStorage>,
    pub tx_manager:       Arc<dyn TransactionManager>,
    pub clock:            Arc<dyn Clock>,
}

/// 全エンドポイントを登録したルーターを構築する
pub fn build_app(deps: Dependencies) -> Router {
    let book_state = Arc::new(BookState {
        usecase: BookUseCaseImpl::new(
            deps.book_repo.clone(),
            deps.instance_repo.clone(),
            deps.tx_manager.clone(),
            deps.clock.clone(),
        ),
    });
    let shelf_state = Arc::new(ShelfState {
        usecase: ShelfUseCaseImpl::new(
            deps.shelf_repo.clone(),
            deps.instance_repo.clone(),
            deps.tx_manager.clone(),
            deps.clock.clone(),
        ),
    });
    let instance_state = Arc::new(BookInstanceState {
        usecase: BookInstanceUseCaseImpl::new(
            deps.instance_repo.clone(),
            deps.book_repo.clone(),
            deps.shelf_repo.clone(),
            deps.tx_manager.clone(),
            deps.clock.clone(),
        ),
    });
    let circulation_state = Arc::new(CirculationState {
        usecase: CirculationUseCaseImpl::new(
            deps.instance_repo.clone(),
            deps.transaction_repo.clone(),
            deps.reservation_repo.clone(),
            deps.shelf_repo.clone(),
            deps.tx_manager.clone(),
            deps.clock.clone(),
        ),
    });
    let reservation_state = Arc::new(ReservationState {
        usecase: ReservationUseCaseImpl::new(
            deps.instance_repo.clone(),
            deps.reservation_repo.clone(),
            deps.object_storage.clone(),
            deps.tx_manager.clone(),
            deps.clock.clone(),
        ),
    });
    let history_state = Arc::new(HistoryState {
        usecase: HistoryUseCaseImpl::new(deps.transaction_repo.clone()),
    });

    Router::new()
        .route("/health", get(health_check))
        // 書誌 API
        .route("/books", get(list_books).post(create_book))
        .route(
            "/books/{book_id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .route("/books/{book_id}/instances", get(list_book_instances))
        .with_state(book_state)
        // 蔵書 API
        .route("/book-instances", post(create_instance))
        .route(
            "/book-instances/{instance_id}",
            get(get_instance)
                .put(update_instance)
                .delete(delete_instance),
        )
        .with_state(instance_state)
        // 書架 API
        .route("/shelves", get(list_shelves).post(create_shelf))
        .route(
            "/shelves/{shelf_id}",
            get(get_shelf).put(update_shelf).delete(delete_shelf),
        )
        .route("/shelves/{shelf_id}/books", get(list_shelf_books))
        .with_state(shelf_state)
        // 貸出・返却 API
        .route("/borrow", post(borrow))
        .route("/return", post(return_book))
        .route("/return-quick", post(return_quick))
        .route("/reservations/pickup", post(pickup))
        .with_state(circulation_state)
        // 予約 API
        .route("/reservations", post(create_reservation))
        .route(
            "/reservations/{reservation_id}",
            put(update_reservation).delete(delete_reservation),
        )
        .route(
            "/users/{user_id}/reservations",
            get(list_user_reservations),
        )
        .with_state(reservation_state)
        // 履歴 API
        .route("/users/{user_id}/history", get(user_history))
        .route("/admin/transactions", get(admin_transactions))
        .with_state(history_state)
        .layer(TraceLayer::new_for_http())
}
