//! # Library Service 設定
//!
//! 環境変数からサーバーの設定を読み込む。
//! 起動時に一度だけ構築し、必要なコンポーネントへ値で渡す。

use std::env;

use thiserror::Error;

/// 設定読み込みのエラー
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} が設定されていません")]
    Missing(&'static str),

    #[error("{key} の値が不正です: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Library Service の設定
#[derive(Debug, Clone, PartialEq)]
pub struct LibraryConfig {
    /// バインドアドレス
    pub host:           String,
    /// ポート番号
    pub port:           u16,
    /// PostgreSQL 接続 URL
    pub database_url:   String,
    /// 起動時にマイグレーションを適用するか
    pub run_migrations: bool,
    pub storage:        StorageConfig,
}

/// 受け取りコード画像の保存先
#[derive(Debug, Clone, PartialEq)]
pub struct StorageConfig {
    /// S3 互換エンドポイント（MinIO など）。未設定なら AWS S3
    pub endpoint_url:    Option<String>,
    pub bucket_name:     String,
    pub region:          String,
    /// アップロード後に返す URL のベース
    pub public_base_url: String,
}

impl LibraryConfig {
    /// 環境変数から設定を読み込む
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// 任意のキー参照関数から設定を読み込む
    ///
    /// `DATABASE_URL` が設定されていればそれを使い、
    /// なければ `BOOKSHELF_DB_*` から接続 URL を組み立てる。
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &'static str| lookup(key).filter(|v| !v.is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let database_url = match var("DATABASE_URL") {
            Some(url) => url,
            None => {
                let host = var("BOOKSHELF_DB_HOST").unwrap_or_else(|| "localhost".to_string());
                let port: u16 = parse_or(var("BOOKSHELF_DB_PORT"), "BOOKSHELF_DB_PORT", 5432)?;
                let user = required("BOOKSHELF_DB_USER")?;
                let password = required("BOOKSHELF_DB_PASSWORD")?;
                let name = required("BOOKSHELF_DB_NAME")?;
                format!("postgres://{user}:{password}@{host}:{port}/{name}")
            }
        };

        let endpoint_url = var("BOOKSHELF_S3_ENDPOINT_URL");
        let bucket_name = var("BOOKSHELF_S3_BUCKET_NAME").unwrap_or_else(|| "shelf".to_string());
        let public_base_url = match var("BOOKSHELF_S3_PUBLIC_BASE_URL") {
            Some(url) => url,
            None => default_public_base_url(endpoint_url.as_deref(), &bucket_name),
        };

        Ok(Self {
            host: var("BOOKSHELF_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(var("BOOKSHELF_PORT"), "BOOKSHELF_PORT", 8000)?,
            database_url,
            run_migrations: parse_or(
                var("BOOKSHELF_RUN_MIGRATIONS"),
                "BOOKSHELF_RUN_MIGRATIONS",
                true,
            )?,
            storage: StorageConfig {
                endpoint_url,
                bucket_name,
                region: var("BOOKSHELF_S3_REGION_NAME")
                    .unwrap_or_else(|| "ru-central1".to_string()),
                public_base_url,
            },
        })
    }
}

fn parse_or<T: std::str::FromStr>(
    value: Option<String>,
    key: &'static str,
    default: T,
) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.parse().map_err(|_| ConfigError::Invalid { key, value: v }),
        None => Ok(default),
    }
}

/// エンドポイント指定時はパススタイル、未指定時は AWS の仮想ホストスタイル
fn default_public_base_url(endpoint_url: Option<&str>, bucket_name: &str) -> String {
    match endpoint_url {
        Some(endpoint) => format!("{}/{bucket_name}", endpoint.trim_end_matches('/')),
        None => format!("https://{bucket_name}.s3.amazonaws.com"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use pretty_assertions::assert_eq;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_database_urlのみでデフォルト値が使われる() {
        let config =
            LibraryConfig::from_lookup(lookup_from(&[("DATABASE_URL", "postgres://db/lib")]))
                .unwrap();

        assert_eq!(
            config,
            LibraryConfig {
                host:           "0.0.0.0".to_string(),
                port:           8000,
                database_url:   "postgres://db/lib".to_string(),
                run_migrations: true,
                storage:        StorageConfig {
                    endpoint_url:    None,
                    bucket_name:     "shelf".to_string(),
                    region:          "ru-central1".to_string(),
                    public_base_url: "https://shelf.s3.amazonaws.com".to_string(),
                },
            }
        );
    }

    #[test]
    fn test_db接続情報から接続urlを組み立てる() {
        let config = LibraryConfig::from_lookup(lookup_from(&[
            ("BOOKSHELF_DB_HOST", "pg"),
            ("BOOKSHELF_DB_PORT", "6432"),
            ("BOOKSHELF_DB_USER", "librarian"),
            ("BOOKSHELF_DB_PASSWORD", "secret"),
            ("BOOKSHELF_DB_NAME", "library"),
        ]))
        .unwrap();

        assert_eq!(
            config.database_url,
            "postgres://librarian:secret@pg:6432/library"
        );
    }

    #[test]
    fn test_db名が未設定ならmissingエラー() {
        let result = LibraryConfig::from_lookup(lookup_from(&[
            ("BOOKSHELF_DB_USER", "librarian"),
            ("BOOKSHELF_DB_PASSWORD", "secret"),
        ]));

        assert_eq!(result, Err(ConfigError::Missing("BOOKSHELF_DB_NAME")));
    }

    #[test]
    fn test_ポートが数値でなければinvalidエラー() {
        let result = LibraryConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/lib"),
            ("BOOKSHELF_PORT", "eighty"),
        ]));

        assert_eq!(
            result,
            Err(ConfigError::Invalid {
                key:   "BOOKSHELF_PORT",
                value: "eighty".to_string(),
            })
        );
    }

    #[test]
    fn test_エンドポイント指定時の公開urlはパススタイル() {
        let config = LibraryConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://db/lib"),
            ("BOOKSHELF_S3_ENDPOINT_URL", "http://minio:9000/"),
            ("BOOKSHELF_S3_BUCKET_NAME", "pickup"),
            ("BOOKSHELF_RUN_MIGRATIONS", "false"),
        ]))
        .unwrap();

        assert_eq!(config.storage.public_base_url, "http://minio:9000/pickup");
        assert_eq!(
            config.storage.endpoint_url.as_deref(),
            Some("http://minio:9000/")
        );
        assert!(!config.run_migrations);
    }
}
