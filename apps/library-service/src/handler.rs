//! # HTTP リクエストハンドラ
//!
//! axum のルートに対応するハンドラ関数を定義する。
//!
//! ## 設計方針
//!
//! - リソースごとにサブモジュールを分け、ここで re-export する
//! - ハンドラは薄く保ち、ID の変換と DTO への詰め替えだけを行う
//! - 成功レスポンスは [`ApiResponse`](bookshelf_shared::ApiResponse) で包む

pub mod book;
pub mod book_instance;
pub mod circulation;
pub mod health;
pub mod history;
pub mod reservation;
pub mod shelf;

#[cfg(test)]
pub(crate) mod test_support;

pub use book::{
    BookState,
    create_book,
    delete_book,
    get_book,
    list_book_instances,
    list_books,
    update_book,
};
pub use book_instance::{
    BookInstanceState,
    create_instance,
    delete_instance,
    get_instance,
    update_instance,
};
pub use circulation::{CirculationState, borrow, pickup, return_book, return_quick};
pub use health::health_check;
pub use history::{HistoryState, admin_transactions, user_history};
pub use reservation::{
    ReservationState,
    create_reservation,
    delete_reservation,
    list_user_reservations,
    update_reservation,
};
pub use shelf::{
    ShelfState,
    create_shelf,
    delete_shelf,
    get_shelf,
    list_shelf_books,
    list_shelves,
    update_shelf,
};
