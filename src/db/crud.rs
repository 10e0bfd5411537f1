use sqlx::{Result, SqlitePool};

use super::{CatalogEntry, Product};

/// 根据商品 ID 查询商品
pub async fn get_product(pool: &SqlitePool, product_id: i64) -> Result<Option<Product>> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT product_id, image_path, title FROM products WHERE product_id = ?
        "#,
    )
    .bind(product_id)
    .fetch_optional(pool)
    .await
}

/// 根据向量 ID 查询商品，通过 embeddings 映射表连接
pub async fn get_product_by_vector_id(pool: &SqlitePool, vector_id: i64) -> Result<Option<Product>> {
    sqlx::query_as::<_, Product>(
        r#"
        SELECT p.product_id, p.image_path, p.title
        FROM products p
        JOIN embeddings e ON p.product_id = e.product_id
        WHERE e.vector_id = ?
        "#,
    )
    .bind(vector_id)
    .fetch_optional(pool)
    .await
}

/// 以事务方式批量写入商品和向量映射
///
/// INSERT OR IGNORE 保证对同一目录重复构建时是幂等的
pub async fn insert_catalog_batch(pool: &SqlitePool, entries: &[CatalogEntry]) -> Result<()> {
    let mut tx = pool.begin().await?;
    for entry in entries {
        sqlx::query(
            r#"
            INSERT OR IGNORE INTO products (product_id, image_path, title)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(entry.product_id)
        .bind(&entry.image_path)
        .bind(&entry.title)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT OR IGNORE INTO embeddings (vector_id, product_id)
            VALUES (?, ?)
            "#,
        )
        .bind(entry.vector_id)
        .bind(entry.product_id)
        .execute(&mut *tx)
        .await?;
    }
    tx.commit().await?;
    Ok(())
}

/// 数据库中的商品数量
pub async fn count_products(pool: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM products").fetch_one(pool).await
}

/// 映射表中的向量数量
pub async fn count_embeddings(pool: &SqlitePool) -> Result<i64> {
    sqlx::query_scalar("SELECT COUNT(*) FROM embeddings").fetch_one(pool).await
}

/// 全部 (vector_id, product_id) 映射，按 vector_id 升序
pub async fn get_mappings(pool: &SqlitePool) -> Result<Vec<(i64, i64)>> {
    sqlx::query_as("SELECT vector_id, product_id FROM embeddings ORDER BY vector_id")
        .fetch_all(pool)
        .await
}
