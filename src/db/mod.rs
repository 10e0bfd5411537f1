use std::path::Path;

use log::info;
use sqlx::SqlitePool;
use sqlx::sqlite::*;

pub mod crud;
pub mod model;

pub use model::*;

pub type Database = SqlitePool;

/// 初始化数据库连接并执行迁移，仅离线构建流程使用
pub async fn init_db(filename: impl AsRef<Path>) -> Result<Database, sqlx::Error> {
    let filename = filename.as_ref();
    info!("初始化数据库连接: {}", filename.display());

    let options = SqliteConnectOptions::new()
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .filename(filename)
        .create_if_missing(true);

    let pool = SqlitePool::connect_with(options).await?;

    sqlx::migrate!().run(&pool).await?;

    Ok(pool)
}

/// 以只读模式打开数据库，服务进程使用，文件缺失直接报错
pub async fn open_db_readonly(filename: impl AsRef<Path>) -> Result<Database, sqlx::Error> {
    let filename = filename.as_ref();
    let options = SqliteConnectOptions::new().filename(filename).read_only(true);
    SqlitePool::connect_with(options).await
}
