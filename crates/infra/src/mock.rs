//! # テスト用モックリポジトリ
//!
//! ユースケース・ハンドラテストで使用するインメモリモック。
//! `test-utils` feature を有効にすることで、他クレートからも利用可能。
//!
//! ```toml
//! [dev-dependencies]
//! bookshelf-infra = { workspace = true, features = ["test-utils"] }
//! ```
//!
//! 一意制約・条件付き更新は PostgreSQL と同じ判定で `Conflict` を返す。
//! ロールバックは再現しない（書き込みは即座に反映される）。

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bookshelf_domain::{
    book::{Book, BookId, BookSearch},
    book_instance::{BookInstance, BookInstanceId, BookInstanceStatus, InstanceTag},
    reservation::{PickupCode, Reservation, ReservationId, ReservationStatus},
    shelf::{Shelf, ShelfId},
    transaction::{Transaction, TransactionStatus},
    user::UserId,
};
use chrono::{DateTime, Utc};

use crate::{
    db::{TransactionManager, TxContext},
    error::InfraError,
    repository::{
        BookInstanceRepository,
        BookRepository,
        ReservationRepository,
        ShelfRepository,
        TransactionRepository,
    },
    s3::ObjectStorage,
};

// ===== MockTransactionManager =====

#[derive(Clone, Default)]
pub struct MockTransactionManager;

#[async_trait]
impl TransactionManager for MockTransactionManager {
    async fn begin(&self) -> Result<TxContext, InfraError> {
        Ok(TxContext::mock())
    }
}

// ===== MockBookRepository =====

#[derive(Clone, Default)]
pub struct MockBookRepository {
    books:     Arc<Mutex<Vec<Book>>>,
    /// 設定されている場合、蔵書から参照中の書誌の削除を拒否する
    instances: Option<MockBookInstanceRepository>,
}

impl MockBookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 外部キー（ON DELETE RESTRICT）相当の判定を有効にする
    pub fn with_instances(instances: MockBookInstanceRepository) -> Self {
        Self {
            books:     Arc::default(),
            instances: Some(instances),
        }
    }

    pub fn add(&self, book: Book) {
        self.books.lock().unwrap().push(book);
    }
}

#[async_trait]
impl BookRepository for MockBookRepository {
    async fn find_by_id(&self, id: &BookId) -> Result<Option<Book>, InfraError> {
        Ok(self
            .books
            .lock()
            .unwrap()
            .iter()
            .find(|b| b.id() == id)
            .cloned())
    }

    async fn search(&self, search: &BookSearch) -> Result<Vec<Book>, InfraError> {
        let mut found: Vec<Book> = self
            .books
            .lock()
            .unwrap()
            .iter()
            .filter(|b| search.matches(b))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        Ok(found)
    }

    async fn insert(&self, _tx: &mut TxContext, book: &Book) -> Result<(), InfraError> {
        self.books.lock().unwrap().push(book.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, book: &Book) -> Result<(), InfraError> {
        let mut books = self.books.lock().unwrap();
        let slot = books
            .iter_mut()
            .find(|b| b.id() == book.id())
            .ok_or_else(|| InfraError::conflict("Book", book.id().to_string()))?;
        *slot = book.clone();
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &BookId) -> Result<bool, InfraError> {
        let referenced = self
            .instances
            .as_ref()
            .is_some_and(|instances| instances.snapshot().iter().any(|i| i.book_id() == id));
        if referenced {
            return Err(InfraError::conflict("Book", id.to_string()));
        }
        let mut books = self.books.lock().unwrap();
        let before = books.len();
        books.retain(|b| b.id() != id);
        Ok(books.len() < before)
    }
}

// ===== MockShelfRepository =====

#[derive(Clone, Default)]
pub struct MockShelfRepository {
    shelves:   Arc<Mutex<Vec<Shelf>>>,
    instances: Option<MockBookInstanceRepository>,
}

impl MockShelfRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// 外部キー（ON DELETE RESTRICT）相当の判定を有効にする
    pub fn with_instances(instances: MockBookInstanceRepository) -> Self {
        Self {
            shelves:   Arc::default(),
            instances: Some(instances),
        }
    }

    pub fn add(&self, shelf: Shelf) {
        self.shelves.lock().unwrap().push(shelf);
    }
}

#[async_trait]
impl ShelfRepository for MockShelfRepository {
    async fn find_all(&self) -> Result<Vec<Shelf>, InfraError> {
        let mut shelves = self.shelves.lock().unwrap().clone();
        shelves.sort_by(|a, b| a.name().as_str().cmp(b.name().as_str()));
        Ok(shelves)
    }

    async fn find_by_id(&self, id: &ShelfId) -> Result<Option<Shelf>, InfraError> {
        Ok(self
            .shelves
            .lock()
            .unwrap()
            .iter()
            .find(|s| s.id() == id)
            .cloned())
    }

    async fn insert(&self, _tx: &mut TxContext, shelf: &Shelf) -> Result<(), InfraError> {
        self.shelves.lock().unwrap().push(shelf.clone());
        Ok(())
    }

    async fn update(&self, _tx: &mut TxContext, shelf: &Shelf) -> Result<(), InfraError> {
        let mut shelves = self.shelves.lock().unwrap();
        let slot = shelves
            .iter_mut()
            .find(|s| s.id() == shelf.id())
            .ok_or_else(|| InfraError::conflict("Shelf", shelf.id().to_string()))?;
        *slot = shelf.clone();
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &ShelfId) -> Result<bool, InfraError> {
        let referenced = self
            .instances
            .as_ref()
            .is_some_and(|instances| instances.snapshot().iter().any(|i| i.shelf_id() == id));
        if referenced {
            return Err(InfraError::conflict("Shelf", id.to_string()));
        }
        let mut shelves = self.shelves.lock().unwrap();
        let before = shelves.len();
        shelves.retain(|s| s.id() != id);
        Ok(shelves.len() < before)
    }
}

// ===== MockBookInstanceRepository =====

#[derive(Clone, Default)]
pub struct MockBookInstanceRepository {
    instances: Arc<Mutex<Vec<BookInstance>>>,
}

impl MockBookInstanceRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, instance: BookInstance) {
        self.instances.lock().unwrap().push(instance);
    }

    /// テストの検証用に現在の内容を取得する
    pub fn snapshot(&self) -> Vec<BookInstance> {
        self.instances.lock().unwrap().clone()
    }

    pub fn get(&self, id: &BookInstanceId) -> Option<BookInstance> {
        self.snapshot().into_iter().find(|i| i.id() == id)
    }

    fn ensure_unique_tag(
        instances: &[BookInstance],
        instance: &BookInstance,
    ) -> Result<(), InfraError> {
        if instances
            .iter()
            .any(|i| i.id() != instance.id() && i.tag() == instance.tag())
        {
            return Err(InfraError::conflict(
                "BookInstance",
                instance.tag().as_str(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl BookInstanceRepository for MockBookInstanceRepository {
    async fn find_by_id(&self, id: &BookInstanceId) -> Result<Option<BookInstance>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_by_id_for_update(
        &self,
        _tx: &mut TxContext,
        id: &BookInstanceId,
    ) -> Result<Option<BookInstance>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_by_tag_for_update(
        &self,
        _tx: &mut TxContext,
        tag: &InstanceTag,
    ) -> Result<Option<BookInstance>, InfraError> {
        Ok(self.snapshot().into_iter().find(|i| i.tag() == tag))
    }

    async fn find_available_by_book(
        &self,
        book_id: &BookId,
    ) -> Result<Vec<BookInstance>, InfraError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|i| i.book_id() == book_id && i.status() == BookInstanceStatus::Available)
            .collect())
    }

    async fn find_by_shelf(&self, shelf_id: &ShelfId) -> Result<Vec<BookInstance>, InfraError> {
        Ok(self
            .snapshot()
            .into_iter()
            .filter(|i| i.shelf_id() == shelf_id)
            .collect())
    }

    async fn insert(
        &self,
        _tx: &mut TxContext,
        instance: &BookInstance,
    ) -> Result<(), InfraError> {
        let mut instances = self.instances.lock().unwrap();
        Self::ensure_unique_tag(&instances, instance)?;
        instances.push(instance.clone());
        Ok(())
    }

    async fn update(
        &self,
        _tx: &mut TxContext,
        instance: &BookInstance,
    ) -> Result<(), InfraError> {
        let mut instances = self.instances.lock().unwrap();
        Self::ensure_unique_tag(&instances, instance)?;
        let slot = instances
            .iter_mut()
            .find(|i| i.id() == instance.id())
            .ok_or_else(|| InfraError::conflict("BookInstance", instance.id().to_string()))?;
        *slot = instance.clone();
        Ok(())
    }

    async fn update_status(
        &self,
        _tx: &mut TxContext,
        instance: &BookInstance,
        expected: BookInstanceStatus,
    ) -> Result<(), InfraError> {
        let mut instances = self.instances.lock().unwrap();
        let slot = instances
            .iter_mut()
            .find(|i| i.id() == instance.id() && i.status() == expected)
            .ok_or_else(|| InfraError::conflict("BookInstance", instance.id().to_string()))?;
        *slot = instance.clone();
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &BookInstanceId) -> Result<bool, InfraError> {
        let mut instances = self.instances.lock().unwrap();
        let before = instances.len();
        instances.retain(|i| i.id() != id);
        Ok(instances.len() < before)
    }
}

// ===== MockTransactionRepository =====

#[derive(Clone, Default)]
pub struct MockTransactionRepository {
    transactions: Arc<Mutex<Vec<Transaction>>>,
}

impl MockTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, transaction: Transaction) {
        self.transactions.lock().unwrap().push(transaction);
    }

    /// テストの検証用に現在の内容を取得する
    pub fn snapshot(&self) -> Vec<Transaction> {
        self.transactions.lock().unwrap().clone()
    }

    fn newest_first(mut transactions: Vec<Transaction>) -> Vec<Transaction> {
        transactions.sort_by(|a, b| {
            b.date()
                .cmp(&a.date())
                .then_with(|| b.id().as_uuid().cmp(a.id().as_uuid()))
        });
        transactions
    }
}

#[async_trait]
impl TransactionRepository for MockTransactionRepository {
    async fn insert(
        &self,
        _tx: &mut TxContext,
        transaction: &Transaction,
    ) -> Result<(), InfraError> {
        let mut transactions = self.transactions.lock().unwrap();
        if transaction.is_open_borrow()
            && transactions.iter().any(|t| {
                t.is_open_borrow() && t.book_instance_id() == transaction.book_instance_id()
            })
        {
            return Err(InfraError::conflict(
                "Transaction",
                transaction.book_instance_id().to_string(),
            ));
        }
        transactions.push(transaction.clone());
        Ok(())
    }

    async fn find_open_borrow_for_update(
        &self,
        _tx: &mut TxContext,
        instance_id: &BookInstanceId,
    ) -> Result<Option<Transaction>, InfraError> {
        Ok(Self::newest_first(self.snapshot())
            .into_iter()
            .find(|t| t.is_open_borrow() && t.book_instance_id() == instance_id))
    }

    async fn update_status(
        &self,
        _tx: &mut TxContext,
        transaction: &Transaction,
        expected: TransactionStatus,
    ) -> Result<(), InfraError> {
        let mut transactions = self.transactions.lock().unwrap();
        let slot = transactions
            .iter_mut()
            .find(|t| t.id() == transaction.id() && t.status() == expected)
            .ok_or_else(|| InfraError::conflict("Transaction", transaction.id().to_string()))?;
        *slot = transaction.clone();
        Ok(())
    }

    async fn find_by_user(&self, user_id: &UserId) -> Result<Vec<Transaction>, InfraError> {
        Ok(Self::newest_first(self.snapshot())
            .into_iter()
            .filter(|t| t.user_id() == user_id)
            .collect())
    }

    async fn find_recent(&self, limit: i64) -> Result<Vec<Transaction>, InfraError> {
        let limit = usize::try_from(limit).unwrap_or(0);
        Ok(Self::newest_first(self.snapshot())
            .into_iter()
            .take(limit)
            .collect())
    }
}

// ===== MockReservationRepository =====

#[derive(Clone, Default)]
pub struct MockReservationRepository {
    reservations: Arc<Mutex<Vec<Reservation>>>,
}

impl MockReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, reservation: Reservation) {
        self.reservations.lock().unwrap().push(reservation);
    }

    /// テストの検証用に現在の内容を取得する
    pub fn snapshot(&self) -> Vec<Reservation> {
        self.reservations.lock().unwrap().clone()
    }

    pub fn get(&self, id: &ReservationId) -> Option<Reservation> {
        self.snapshot().into_iter().find(|r| r.id() == id)
    }

    /// 受け取り待ちの予約について部分一意インデックス相当の判定を行う
    fn ensure_unique_pending(
        reservations: &[Reservation],
        reservation: &Reservation,
    ) -> Result<(), InfraError> {
        if !reservation.is_pending() {
            return Ok(());
        }
        let duplicated = reservations.iter().any(|r| {
            r.id() != reservation.id()
                && r.is_pending()
                && (r.book_instance_id() == reservation.book_instance_id()
                    || r.pickup_code() == reservation.pickup_code())
        });
        if duplicated {
            return Err(InfraError::conflict(
                "Reservation",
                reservation.id().to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl ReservationRepository for MockReservationRepository {
    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_by_id_for_update(
        &self,
        _tx: &mut TxContext,
        id: &ReservationId,
    ) -> Result<Option<Reservation>, InfraError> {
        Ok(self.get(id))
    }

    async fn find_pending_by_instance_for_update(
        &self,
        _tx: &mut TxContext,
        instance_id: &BookInstanceId,
    ) -> Result<Option<Reservation>, InfraError> {
        Ok(self
            .snapshot()
            .into_iter()
            .find(|r| r.is_pending() && r.book_instance_id() == instance_id))
    }

    async fn find_pending_by_code_for_update(
        &self,
        _tx: &mut TxContext,
        code: &PickupCode,
    ) -> Result<Option<Reservation>, InfraError> {
        Ok(self
            .snapshot()
            .into_iter()
            .find(|r| r.is_pending() && r.pickup_code() == code))
    }

    async fn exists_pending_code(
        &self,
        _tx: &mut TxContext,
        code: &PickupCode,
    ) -> Result<bool, InfraError> {
        Ok(self
            .snapshot()
            .iter()
            .any(|r| r.is_pending() && r.pickup_code() == code))
    }

    async fn find_pending_by_user(
        &self,
        user_id: &UserId,
    ) -> Result<Vec<Reservation>, InfraError> {
        let mut found: Vec<Reservation> = self
            .snapshot()
            .into_iter()
            .filter(|r| r.is_pending() && r.user_id() == user_id)
            .collect();
        found.sort_by_key(|r| std::cmp::Reverse(r.date()));
        Ok(found)
    }

    async fn insert(
        &self,
        _tx: &mut TxContext,
        reservation: &Reservation,
    ) -> Result<(), InfraError> {
        let mut reservations = self.reservations.lock().unwrap();
        Self::ensure_unique_pending(&reservations, reservation)?;
        reservations.push(reservation.clone());
        Ok(())
    }

    async fn update(
        &self,
        _tx: &mut TxContext,
        reservation: &Reservation,
    ) -> Result<(), InfraError> {
        let mut reservations = self.reservations.lock().unwrap();
        Self::ensure_unique_pending(&reservations, reservation)?;
        let slot = reservations
            .iter_mut()
            .find(|r| r.id() == reservation.id())
            .ok_or_else(|| InfraError::conflict("Reservation", reservation.id().to_string()))?;
        *slot = reservation.clone();
        Ok(())
    }

    async fn update_status(
        &self,
        _tx: &mut TxContext,
        reservation: &Reservation,
        expected: ReservationStatus,
    ) -> Result<(), InfraError> {
        let mut reservations = self.reservations.lock().unwrap();
        let slot = reservations
            .iter_mut()
            .find(|r| r.id() == reservation.id() && r.status() == expected)
            .ok_or_else(|| InfraError::conflict("Reservation", reservation.id().to_string()))?;
        *slot = reservation.clone();
        Ok(())
    }

    async fn set_qr_code_url(
        &self,
        _tx: &mut TxContext,
        id: &ReservationId,
        url: &str,
        now: DateTime<Utc>,
    ) -> Result<(), InfraError> {
        let mut reservations = self.reservations.lock().unwrap();
        if let Some(slot) = reservations.iter_mut().find(|r| r.id() == id) {
            *slot = slot.clone().with_qr_code_url(url.to_string(), now);
        }
        Ok(())
    }

    async fn delete(&self, _tx: &mut TxContext, id: &ReservationId) -> Result<bool, InfraError> {
        let mut reservations = self.reservations.lock().unwrap();
        let before = reservations.len();
        reservations.retain(|r| r.id() != id);
        Ok(reservations.len() < before)
    }
}

// ===== MockObjectStorage =====

/// 保存されたオブジェクト
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub key:          String,
    pub content_type: String,
    pub body:         Vec<u8>,
}

#[derive(Clone, Default)]
pub struct MockObjectStorage {
    objects: Arc<Mutex<Vec<StoredObject>>>,
    failing: bool,
}

impl MockObjectStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// 常にアップロードに失敗するストレージ
    pub fn failing() -> Self {
        Self {
            objects: Arc::default(),
            failing: true,
        }
    }

    pub fn objects(&self) -> Vec<StoredObject> {
        self.objects.lock().unwrap().clone()
    }
}

#[async_trait]
impl ObjectStorage for MockObjectStorage {
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, InfraError> {
        if self.failing {
            return Err(InfraError::s3("モックストレージは失敗するよう設定されています"));
        }
        self.objects.lock().unwrap().push(StoredObject {
            key: key.to_string(),
            content_type: content_type.to_string(),
            body,
        });
        Ok(format!("https://storage.test/{key}"))
    }
}
