//! # 書誌情報
//!
//! 書名・著者・ジャンルなどのカタログ情報。
//! 現物（[`BookInstance`](crate::book_instance::BookInstance)）は
//! `book_id` でこの書誌を参照する。

use chrono::{DateTime, Utc};

use crate::DomainError;

define_uuid_id! {
    /// 書誌の一意識別子
    pub struct BookId;
}

define_validated_string! {
    /// 書名（最大 255 文字）
    pub struct BookName {
        label: "書名",
        max_length: 255,
    }
}

define_validated_string! {
    /// 著者名（最大 255 文字）
    pub struct AuthorName {
        label: "著者名",
        max_length: 255,
    }
}

/// 書誌検索条件
///
/// 指定された項目ごとに大文字小文字を区別しない部分一致で絞り込み、
/// 複数指定時は AND で結合する。空文字列は未指定として扱う。
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookSearch {
    pub name:   Option<String>,
    pub author: Option<String>,
    pub genre:  Option<String>,
}

impl BookSearch {
    pub fn new(name: Option<String>, author: Option<String>, genre: Option<String>) -> Self {
        let normalize = |v: Option<String>| {
            v.map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
        };
        Self {
            name:   normalize(name),
            author: normalize(author),
            genre:  normalize(genre),
        }
    }

    /// 書誌が条件に一致するか判定する
    ///
    /// インメモリ実装用。Postgres 実装は `ILIKE` で同じ判定を行う。
    pub fn matches(&self, book: &Book) -> bool {
        fn contains(haystack: &str, needle: &str) -> bool {
            haystack.to_lowercase().contains(&needle.to_lowercase())
        }

        let name_ok = self
            .name
            .as_deref()
            .is_none_or(|n| contains(book.name().as_str(), n));
        let author_ok = self
            .author
            .as_deref()
            .is_none_or(|a| contains(book.author().as_str(), a));
        let genre_ok = self
            .genre
            .as_deref()
            .is_none_or(|g| book.genre().is_some_and(|bg| contains(bg, g)));

        name_ok && author_ok && genre_ok
    }
}

/// 書誌の新規作成パラメータ
pub struct NewBook {
    pub id:              BookId,
    pub name:            BookName,
    pub author:          AuthorName,
    pub description:     Option<String>,
    pub cover_image_url: Option<String>,
    pub genre:           Option<String>,
    pub now:             DateTime<Utc>,
}

/// 書誌の部分更新内容
///
/// `None` の項目は変更しない。
#[derive(Debug, Clone, Default)]
pub struct BookChanges {
    pub name:            Option<BookName>,
    pub author:          Option<AuthorName>,
    pub description:     Option<String>,
    pub cover_image_url: Option<String>,
    pub genre:           Option<String>,
}

/// 書誌エンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct Book {
    id: BookId,
    name: BookName,
    author: AuthorName,
    description: Option<String>,
    cover_image_url: Option<String>,
    genre: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Book {
    pub fn new(params: NewBook) -> Self {
        Self {
            id: params.id,
            name: params.name,
            author: params.author,
            description: params.description,
            cover_image_url: params.cover_image_url,
            genre: params.genre,
            created_at: params.now,
            updated_at: params.now,
        }
    }

    /// DB からエンティティを復元する
    #[allow(clippy::too_many_arguments)]
    pub fn from_db(
        id: BookId,
        name: BookName,
        author: AuthorName,
        description: Option<String>,
        cover_image_url: Option<String>,
        genre: Option<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            author,
            description,
            cover_image_url,
            genre,
            created_at,
            updated_at,
        }
    }

    /// 指定された項目のみを差し替えた書誌を返す
    pub fn updated(self, changes: BookChanges, now: DateTime<Utc>) -> Self {
        Self {
            name: changes.name.unwrap_or(self.name),
            author: changes.author.unwrap_or(self.author),
            description: changes.description.or(self.description),
            cover_image_url: changes.cover_image_url.or(self.cover_image_url),
            genre: changes.genre.or(self.genre),
            updated_at: now,
            ..self
        }
    }

    pub fn id(&self) -> &BookId {
        &self.id
    }

    pub fn name(&self) -> &BookName {
        &self.name
    }

    pub fn author(&self) -> &AuthorName {
        &self.author
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn cover_image_url(&self) -> Option<&str> {
        self.cover_image_url.as_deref()
    }

    pub fn genre(&self) -> Option<&str> {
        self.genre.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

/// 書誌が見つからない場合のエラーを生成する
pub fn book_not_found(id: &BookId) -> DomainError {
    DomainError::NotFound {
        entity_type: "Book",
        id:          id.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    fn now() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn book(name: &str, author: &str, genre: Option<&str>) -> Book {
        Book::new(NewBook {
            id:              BookId::new(),
            name:            BookName::new(name).unwrap(),
            author:          AuthorName::new(author).unwrap(),
            description:     None,
            cover_image_url: None,
            genre:           genre.map(str::to_string),
            now:             now(),
        })
    }

    #[test]
    fn test_書名は前後の空白が除去される() {
        let name = BookName::new("  罪と罰  ").unwrap();
        assert_eq!(name.as_str(), "罪と罰");
    }

    #[test]
    fn test_空の書名はバリデーションエラー() {
        assert!(matches!(
            BookName::new("   "),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn test_256文字の著者名はバリデーションエラー() {
        let long = "あ".repeat(256);
        assert!(AuthorName::new(long).is_err());
    }

    #[rstest]
    #[case(BookSearch::default(), true)]
    #[case(BookSearch::new(Some("war".into()), None, None), true)]
    #[case(BookSearch::new(Some("WAR AND".into()), Some("tolst".into()), None), true)]
    #[case(BookSearch::new(None, Some("dostoevsky".into()), None), false)]
    #[case(BookSearch::new(None, None, Some("novel".into())), true)]
    #[case(BookSearch::new(None, None, Some("poetry".into())), false)]
    #[case(BookSearch::new(Some("  ".into()), None, None), true)]
    fn test_検索条件の部分一致判定(#[case] search: BookSearch, #[case] expected: bool) {
        let sut = book("War and Peace", "Leo Tolstoy", Some("Novel"));
        assert_eq!(search.matches(&sut), expected);
    }

    #[test]
    fn test_ジャンル未設定の書誌はジャンル条件に一致しない() {
        let sut = book("War and Peace", "Leo Tolstoy", None);
        let search = BookSearch::new(None, None, Some("novel".into()));
        assert!(!search.matches(&sut));
    }

    #[test]
    fn test_updatedは指定項目のみ変更する() {
        let original = book("War and Peace", "Leo Tolstoy", Some("Novel"));
        let later = now() + chrono::Duration::minutes(5);

        let sut = original.clone().updated(
            BookChanges {
                genre: Some("Classic".to_string()),
                ..Default::default()
            },
            later,
        );

        assert_eq!(sut.name(), original.name());
        assert_eq!(sut.author(), original.author());
        assert_eq!(sut.genre(), Some("Classic"));
        assert_eq!(sut.created_at(), original.created_at());
        assert_eq!(sut.updated_at(), later);
    }
}
