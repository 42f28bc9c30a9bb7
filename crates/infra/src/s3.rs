//! # S3 オブジェクトストレージ
//!
//! 受け取りコード画像の保存先。Amazon S3 / MinIO / S3 互換ストレージに対応する。
//!
//! ## 設計方針
//!
//! - **ローカル開発**: MinIO を使用（`BOOKSHELF_S3_ENDPOINT_URL` で接続先を指定）
//! - **本番環境**: デフォルト認証チェーンで S3 互換ストレージに接続
//! - **公開 URL**: アップロード後は `{public_base_url}/{key}` を永続 URL として返す
//!
//! ## 使用例
//!
//! ```rust,ignore
//! use bookshelf_infra::s3;
//!
//! async fn setup() {
//!     let client = s3::create_client(Some("http://localhost:9000"), "ru-central1").await;
//!     let storage = s3::AwsS3Client::new(client, "shelf".to_string(), "http://localhost:9000/shelf".to_string());
//! }
//! ```

use async_trait::async_trait;
use aws_sdk_s3::{Client, primitives::ByteStream};

use crate::InfraError;

/// オブジェクトストレージのインターフェース
///
/// テスト時はモックに差し替え可能。
#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// オブジェクトを保存し、永続 URL を返す
    ///
    /// # 引数
    ///
    /// * `key` - オブジェクトキー（例: `pickup-codes/019.../code.svg`）
    /// * `content_type` - MIME タイプ（例: `image/svg+xml`）
    /// * `body` - オブジェクトの中身
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, InfraError>;
}

/// AWS S3 クライアント実装
///
/// `aws-sdk-s3` を使用した [`ObjectStorage`] の実装。MinIO とも互換動作する。
pub struct AwsS3Client {
    client:          Client,
    bucket_name:     String,
    public_base_url: String,
}

impl AwsS3Client {
    /// 新しい S3 クライアントを作成する
    pub fn new(client: Client, bucket_name: String, public_base_url: String) -> Self {
        Self {
            client,
            bucket_name,
            public_base_url,
        }
    }
}

/// オブジェクトキーから永続 URL を組み立てる
fn object_url(public_base_url: &str, key: &str) -> String {
    format!("{}/{}", public_base_url.trim_end_matches('/'), key)
}

#[async_trait]
impl ObjectStorage for AwsS3Client {
    #[tracing::instrument(skip_all, level = "debug", fields(bucket = %self.bucket_name, %key))]
    async fn put_object(
        &self,
        key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<String, InfraError> {
        self.client
            .put_object()
            .bucket(&self.bucket_name)
            .key(key)
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| InfraError::s3(format!("PUT Object の実行に失敗: {e}")))?;

        Ok(object_url(&self.public_base_url, key))
    }
}

/// S3 クライアントを作成する
///
/// `endpoint` が `Some` の場合は MinIO 等のカスタムエンドポイントに接続し、
/// パススタイルのアドレッシングを有効にする。
///
/// 認証情報は SDK のデフォルト認証チェーンで解決する
/// （環境変数 `AWS_ACCESS_KEY_ID` / `AWS_SECRET_ACCESS_KEY` など）。
pub async fn create_client(endpoint: Option<&str>, region: &str) -> Client {
    let mut config_builder = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(region.to_string()));

    if let Some(endpoint_url) = endpoint {
        config_builder = config_builder.endpoint_url(endpoint_url);
    }

    let config = config_builder.load().await;

    let s3_config_builder = aws_sdk_s3::config::Builder::from(&config);
    let s3_config = if endpoint.is_some() {
        s3_config_builder.force_path_style(true).build()
    } else {
        s3_config_builder.build()
    };

    Client::from_conf(s3_config)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("http://localhost:9000/shelf")]
    #[case("http://localhost:9000/shelf/")]
    fn test_object_urlは公開ベースurlとキーを連結する(#[case] base: &str) {
        assert_eq!(
            object_url(base, "pickup-codes/abc.svg"),
            "http://localhost:9000/shelf/pickup-codes/abc.svg"
        );
    }
}
