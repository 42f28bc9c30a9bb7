//! # 書架
//!
//! 蔵書が物理的に置かれる場所。位置（緯度・経度）、収容数、稼働状態を持つ。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::DomainError;

define_uuid_id! {
    /// 書架の一意識別子
    pub struct ShelfId;
}

define_validated_string! {
    /// 書架名（最大 100 文字）
    pub struct ShelfName {
        label: "書架名",
        max_length: 100,
    }
}

/// 書架の稼働状態
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShelfStatus {
    /// 稼働中
    #[default]
    Active,
    /// 停止中
    Inactive,
    /// メンテナンス中
    Maintenance,
}

impl_status_from_str!(ShelfStatus, "書架ステータス", {
    "active" => Active,
    "inactive" => Inactive,
    "maintenance" => Maintenance,
});

impl ShelfStatus {
    pub fn as_str(&self) -> &'static str {
        self.into()
    }
}

/// 書架の位置
///
/// 緯度は -90〜90、経度は -180〜180 の範囲に制限する。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    latitude:  f64,
    longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, DomainError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(DomainError::Validation(format!(
                "緯度は -90〜90 の範囲である必要があります: {latitude}"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(DomainError::Validation(format!(
                "経度は -180〜180 の範囲である必要があります: {longitude}"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    /// 緯度・経度の片方だけが指定された場合はエラーにする
    pub fn from_optional(
        latitude: Option<f64>,
        longitude: Option<f64>,
    ) -> Result<Option<Self>, DomainError> {
        match (latitude, longitude) {
            (Some(lat), Some(lng)) => Self::new(lat, lng).map(Some),
            (None, None) => Ok(None),
            _ => Err(DomainError::Validation(
                "緯度と経度は両方指定する必要があります".to_string(),
            )),
        }
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

/// 収容数の検証
fn validate_capacity(capacity: i32) -> Result<i32, DomainError> {
    if capacity < 0 {
        return Err(DomainError::Validation(format!(
            "収容数は 0 以上である必要があります: {capacity}"
        )));
    }
    Ok(capacity)
}

/// 書架の新規作成パラメータ
pub struct NewShelf {
    pub id:          ShelfId,
    pub name:        ShelfName,
    pub capacity:    i32,
    pub coordinates: Option<Coordinates>,
    pub status:      ShelfStatus,
    pub now:         DateTime<Utc>,
}

/// 書架の部分更新内容
#[derive(Debug, Clone, Default)]
pub struct ShelfChanges {
    pub name:        Option<ShelfName>,
    pub capacity:    Option<i32>,
    pub coordinates: Option<Coordinates>,
    pub status:      Option<ShelfStatus>,
}

/// 書架エンティティ
#[derive(Debug, Clone, PartialEq)]
pub struct Shelf {
    id: ShelfId,
    name: ShelfName,
    capacity: i32,
    coordinates: Option<Coordinates>,
    status: ShelfStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Shelf {
    pub fn new(params: NewShelf) -> Result<Self, DomainError> {
        Ok(Self {
            id: params.id,
            name: params.name,
            capacity: validate_capacity(params.capacity)?,
            coordinates: params.coordinates,
            status: params.status,
            created_at: params.now,
            updated_at: params.now,
        })
    }

    /// DB からエンティティを復元する
    pub fn from_db(
        id: ShelfId,
        name: ShelfName,
        capacity: i32,
        coordinates: Option<Coordinates>,
        status: ShelfStatus,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name,
            capacity,
            coordinates,
            status,
            created_at,
            updated_at,
        }
    }

    pub fn updated(self, changes: ShelfChanges, now: DateTime<Utc>) -> Result<Self, DomainError> {
        let capacity = match changes.capacity {
            Some(c) => validate_capacity(c)?,
            None => self.capacity,
        };
        Ok(Self {
            name: changes.name.unwrap_or(self.name),
            capacity,
            coordinates: changes.coordinates.or(self.coordinates),
            status: changes.status.unwrap_or(self.status),
            updated_at: now,
            ..self
        })
    }

    pub fn id(&self) -> &ShelfId {
        &self.id
    }

    pub fn name(&self) -> &ShelfName {
        &self.name
    }

    pub fn capacity(&self) -> i32 {
        self.capacity
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        self.coordinates
    }

    pub fn status(&self) -> ShelfStatus {
        self.status
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
