//! 図書館テストビルダー
//!
//! モックリポジトリ一式と固定時刻をまとめて用意し、
//! テストデータの登録とユースケースの組み立てを提供する。

use std::sync::Arc;

use bookshelf_domain::{
    book::{AuthorName, Book, BookId, BookName, NewBook},
    book_instance::{BookInstance, BookInstanceId, BookInstanceStatus, InstanceTag, NewBookInstance},
    clock::FixedClock,
    reservation::{NewReservation, PickupCode, Reservation, ReservationId},
    shelf::{NewShelf, Shelf, ShelfId, ShelfName, ShelfStatus},
    transaction::{NewBorrow, Transaction, TransactionId},
    user::UserId,
};
use bookshelf_infra::mock::{
    MockBookInstanceRepository,
    MockBookRepository,
    MockObjectStorage,
    MockReservationRepository,
    MockShelfRepository,
    MockTransactionManager,
    MockTransactionRepository,
};
use chrono::{DateTime, Duration, Utc};

use crate::{
    app_builder::Dependencies,
    usecase::{
        BookInstanceUseCaseImpl,
        BookUseCaseImpl,
        CirculationUseCaseImpl,
        HistoryUseCaseImpl,
        ReservationUseCaseImpl,
        ShelfUseCaseImpl,
    },
};

/// 図書館テストビルダー
///
/// モックは内部状態を共有するため、ユースケース実行後の状態を
/// `instances.get(..)` などで直接検証できる。
///
/// # 使用例
///
/// ```ignore
/// use bookshelf_library_service::test_utils::LibraryTestBuilder;
///
/// #[tokio::test]
/// async fn test_example() {
///     let builder = LibraryTestBuilder::new();
///     let instance = builder.add_instance("RFID-0001", BookInstanceStatus::Available);
///     let sut = builder.circulation_usecase();
///     // ... テスト本体 ...
/// }
/// ```
pub struct LibraryTestBuilder {
    pub books:        MockBookRepository,
    pub shelves:      MockShelfRepository,
    pub instances:    MockBookInstanceRepository,
    pub transactions: MockTransactionRepository,
    pub reservations: MockReservationRepository,
    pub storage:      MockObjectStorage,
    pub clock:        Arc<FixedClock>,
}

impl LibraryTestBuilder {
    /// 空のモックと固定時刻（2023-11-14T22:13:20Z）で作成する
    pub fn new() -> Self {
        let instances = MockBookInstanceRepository::new();
        Self {
            books:        MockBookRepository::with_instances(instances.clone()),
            shelves:      MockShelfRepository::with_instances(instances.clone()),
            instances,
            transactions: MockTransactionRepository::new(),
            reservations: MockReservationRepository::new(),
            storage:      MockObjectStorage::new(),
            clock:        Arc::new(FixedClock::new(Self::initial_now())),
        }
    }

    /// オブジェクトストレージを差し替える
    pub fn with_storage(mut self, storage: MockObjectStorage) -> Self {
        self.storage = storage;
        self
    }

    pub fn initial_now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).expect("固定時刻は有効な値")
    }

    pub fn now(&self) -> DateTime<Utc> {
        use bookshelf_domain::clock::Clock;
        self.clock.now()
    }

    // ===== テストデータ =====

    pub fn add_book(&self, name: &str) -> Book {
        let book = Book::new(NewBook {
            id:              BookId::new(),
            name:            BookName::new(name).expect("書名は有効"),
            author:          AuthorName::new("Leo Tolstoy").expect("著者名は有効"),
            description:     None,
            cover_image_url: None,
            genre:           Some("Novel".to_string()),
            now:             self.now(),
        });
        self.books.add(book.clone());
        book
    }

    pub fn add_shelf(&self, name: &str) -> Shelf {
        let shelf = Shelf::new(NewShelf {
            id:          ShelfId::new(),
            name:        ShelfName::new(name).expect("書架名は有効"),
            capacity:    50,
            coordinates: None,
            status:      ShelfStatus::Active,
            now:         self.now(),
        })
        .expect("書架は有効");
        self.shelves.add(shelf.clone());
        shelf
    }

    /// 指定した書誌・書架に蔵書を登録する
    pub fn add_instance_of(
        &self,
        book: &Book,
        shelf: &Shelf,
        tag: &str,
        status: BookInstanceStatus,
    ) -> BookInstance {
        let instance = BookInstance::new(NewBookInstance {
            id: BookInstanceId::new(),
            book_id: book.id().clone(),
            shelf_id: shelf.id().clone(),
            shelf_pos: 1.0,
            tag: InstanceTag::new(tag).expect("タグは有効"),
            status,
            now: self.now(),
        })
        .expect("蔵書は有効");
        self.instances.add(instance.clone());
        instance
    }

    /// 書誌と書架を新規に作成して蔵書を登録する
    pub fn add_instance(&self, tag: &str, status: BookInstanceStatus) -> BookInstance {
        let book = self.add_book("War and Peace");
        let shelf = self.add_shelf("駅前の書架");
        self.add_instance_of(&book, &shelf, tag, status)
    }

    /// 取り置き中の蔵書と、それに対応する受け取り待ちの予約を登録する
    pub fn add_reserved_instance(
        &self,
        tag: &str,
        user_id: &UserId,
        code: &str,
        valid_for: Duration,
    ) -> (BookInstance, Reservation) {
        let instance = self.add_instance(tag, BookInstanceStatus::Reserved);
        let reservation = Reservation::new(NewReservation {
            id:               ReservationId::new(),
            user_id:          user_id.clone(),
            book_instance_id: instance.id().clone(),
            exp_date:         self.now() + valid_for,
            pickup_code:      PickupCode::parse(code).expect("受け取りコードは有効"),
            now:              self.now(),
        });
        self.reservations.add(reservation.clone());
        (instance, reservation)
    }

    /// 貸出中の蔵書と、それに対応する返却待ちの貸出を登録する
    pub fn add_borrowed_instance(&self, tag: &str, user_id: &UserId) -> (BookInstance, Transaction) {
        let instance = self.add_instance(tag, BookInstanceStatus::Borrowed);
        let borrow = Transaction::borrow(NewBorrow {
            id:               TransactionId::new(),
            user_id:          user_id.clone(),
            book_instance_id: instance.id().clone(),
            shelf_id:         instance.shelf_id().clone(),
            due_date:         None,
            now:              self.now(),
        });
        self.transactions.add(borrow.clone());
        (instance, borrow)
    }

    // ===== ユースケース =====

    pub fn book_usecase(&self) -> BookUseCaseImpl {
        BookUseCaseImpl::new(
            Arc::new(self.books.clone()),
            Arc::new(self.instances.clone()),
            Arc::new(MockTransactionManager),
            self.clock.clone(),
        )
    }

    pub fn shelf_usecase(&self) -> ShelfUseCaseImpl {
        ShelfUseCaseImpl::new(
            Arc::new(self.shelves.clone()),
            Arc::new(self.instances.clone()),
            Arc::new(MockTransactionManager),
            self.clock.clone(),
        )
    }

    pub fn instance_usecase(&self) -> BookInstanceUseCaseImpl {
        BookInstanceUseCaseImpl::new(
            Arc::new(self.instances.clone()),
            Arc::new(self.books.clone()),
            Arc::new(self.shelves.clone()),
            Arc::new(MockTransactionManager),
            self.clock.clone(),
        )
    }

    pub fn circulation_usecase(&self) -> CirculationUseCaseImpl {
        CirculationUseCaseImpl::new(
            Arc::new(self.instances.clone()),
            Arc::new(self.transactions.clone()),
            Arc::new(self.reservations.clone()),
            Arc::new(self.shelves.clone()),
            Arc::new(MockTransactionManager),
            self.clock.clone(),
        )
    }

    pub fn reservation_usecase(&self) -> ReservationUseCaseImpl {
        ReservationUseCaseImpl::new(
            Arc::new(self.instances.clone()),
            Arc::new(self.reservations.clone()),
            Arc::new(self.storage.clone()),
            Arc::new(MockTransactionManager),
            self.clock.clone(),
        )
    }

    pub fn history_usecase(&self) -> HistoryUseCaseImpl {
        HistoryUseCaseImpl::new(Arc::new(self.transactions.clone()))
    }

    /// ルーター組み立て用の依存関係一式
    pub fn dependencies(&self) -> Dependencies {
        Dependencies {
            book_repo:        Arc::new(self.books.clone()),
            shelf_repo:       Arc::new(self.shelves.clone()),
            instance_repo:    Arc::new(self.instances.clone()),
            transaction_repo: Arc::new(self.transactions.clone()),
            reservation_repo: Arc::new(self.reservations.clone()),
            object_storage:   Arc::new(self.storage.clone()),
            tx_manager:       Arc::new(MockTransactionManager),
            clock:            self.clock.clone(),
        }
    }
}

impl Default for LibraryTestBuilder {
    fn default() -> Self {
        Self::new()
    }
}
