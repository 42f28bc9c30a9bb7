//! # Library Service サーバー
//!
//! 無人書架の貸出・返却・取り置き予約を提供する HTTP サーバー。
//!
//! ## 環境変数
//!
//! | 変数名 | 必須 | 説明 |
//! |--------|------|------|
//! | `BOOKSHELF_HOST` | No | バインドアドレス（デフォルト: `0.0.0.0`） |
//! | `BOOKSHELF_PORT` | No | ポート番号（デフォルト: `8000`） |
//! | `DATABASE_URL` | ※ | PostgreSQL 接続 URL |
//! | `BOOKSHELF_DB_HOST` / `_PORT` / `_USER` / `_PASSWORD` / `_NAME` | ※ | `DATABASE_URL` 未設定時の接続情報 |
//! | `BOOKSHELF_RUN_MIGRATIONS` | No | 起動時にマイグレーションを適用するか（デフォルト: `true`） |
//! | `BOOKSHELF_S3_ENDPOINT_URL` | No | S3 互換エンドポイント |
//! | `BOOKSHELF_S3_BUCKET_NAME` | No | 受け取りコード画像のバケット（デフォルト: `shelf`） |
//! | `BOOKSHELF_S3_REGION_NAME` | No | リージョン |
//! | `BOOKSHELF_S3_PUBLIC_BASE_URL` | No | 画像 URL のベース |
//! | `LOG_FORMAT` | No | `json` で JSON ログ |
//!
//! ※ `DATABASE_URL` か `BOOKSHELF_DB_*` のいずれかが必要。
//!
//! ## 起動方法
//!
//! ```bash
//! DATABASE_URL=postgres://... cargo run -p bookshelf-library-service
//! ```

use std::{net::SocketAddr, sync::Arc};

use bookshelf_domain::clock::SystemClock;
use bookshelf_infra::{
    db::{self, PgTransactionManager},
    repository::{
        PostgresBookInstanceRepository,
        PostgresBookRepository,
        PostgresReservationRepository,
        PostgresShelfRepository,
        PostgresTransactionRepository,
    },
    s3::{self, AwsS3Client},
};
use bookshelf_library_service::{
    app_builder::{Dependencies, build_app},
    config::LibraryConfig,
};
use bookshelf_shared::observability::{TracingConfig, init_tracing};
use tokio::net::TcpListener;

/// Library Service サーバーのエントリーポイント
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env ファイルを読み込む（存在する場合）
    dotenvy::dotenv().ok();

    init_tracing(&TracingConfig::from_env("library-service"));

    let config = LibraryConfig::from_env()?;

    tracing::info!(
        "Library Service サーバーを起動します: {}:{}",
        config.host,
        config.port
    );

    // データベース接続プールを作成
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("データベースに接続しました");

    if config.run_migrations {
        db::run_migrations(&pool).await?;
        tracing::info!("マイグレーションを適用しました");
    }

    // 受け取りコード画像の保存先
    let s3_client = s3::create_client(
        config.storage.endpoint_url.as_deref(),
        &config.storage.region,
    )
    .await;
    let object_storage = AwsS3Client::new(
        s3_client,
        config.storage.bucket_name.clone(),
        config.storage.public_base_url.clone(),
    );

    let app = build_app(Dependencies {
        book_repo:        Arc::new(PostgresBookRepository::new(pool.clone())),
        shelf_repo:       Arc::new(PostgresShelfRepository::new(pool.clone())),
        instance_repo:    Arc::new(PostgresBookInstanceRepository::new(pool.clone())),
        transaction_repo: Arc::new(PostgresTransactionRepository::new(pool.clone())),
        reservation_repo: Arc::new(PostgresReservationRepository::new(pool.clone())),
        object_storage:   Arc::new(object_storage),
        tx_manager:       Arc::new(PgTransactionManager::new(pool)),
        clock:            Arc::new(SystemClock),
    });

    // サーバー起動
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;
    tracing::info!("Library Service サーバーが起動しました: {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
