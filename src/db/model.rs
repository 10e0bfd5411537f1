use serde::Serialize;
use sqlx::FromRow;

/// 商品记录，构建完成后在服务侧只读
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Product {
    pub product_id: i64,
    pub image_path: String,
    pub title: Option<String>,
}

/// 写入目录库的一条记录
///
/// products 行和 embeddings 行必须在同一个事务中提交，
/// 保证索引中的 vector_id 永远能解析出商品。
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub vector_id: i64,
    pub product_id: i64,
    pub image_path: String,
    pub title: Option<String>,
}
