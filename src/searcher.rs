use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Serialize;

use crate::db::{Database, crud};
use crate::embed::FeatureExtractor;
use crate::error::SearchError;
use crate::index::VectorIndex;

pub const DEFAULT_TOP_K: usize = 10;

/// 返回给上层的单条结果，按相似度降序
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankedResult {
    pub product_id: i64,
    pub image_path: PathBuf,
    pub similarity: f32,
}

/// 面向上层应用的结构化响应
///
/// 查询期的所有错误都在编排层收口，转换成 success=false 加可读 message，
/// 不会以异常形式穿透出去。
#[derive(Debug, Serialize)]
pub struct SearchResponse {
    pub success: bool,
    pub results: Vec<RankedResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// 搜索编排器，持有服务进程内全部长生命周期句柄。
/// 模型、索引、数据库都在启动时加载一次，之后只读，
/// 并发的搜索调用之间没有共享的可变状态。
pub struct Searcher {
    extractor: FeatureExtractor,
    index: VectorIndex,
    db: Database,
    thumbnails_dir: PathBuf,
    images_dir: PathBuf,
}

impl Searcher {
    pub fn new(
        extractor: FeatureExtractor,
        index: VectorIndex,
        db: Database,
        thumbnails_dir: PathBuf,
        images_dir: PathBuf,
    ) -> Self {
        Self { extractor, index, db, thumbnails_dir, images_dir }
    }

    /// 以图搜图：提取特征 → 索引查询 → 解析商品 → 解析展示路径
    ///
    /// 单条 vector_id 解析失败只跳过该条并告警，不中断整次搜索；
    /// 命中顺序由索引给出（距离升序），这里不再重排。
    pub async fn search(
        &self,
        image_path: impl AsRef<Path>,
        top_k: usize,
    ) -> Result<Vec<RankedResult>, SearchError> {
        let image_path = image_path.as_ref();
        if !image_path.exists() {
            return Err(SearchError::QueryImageMissing(image_path.to_path_buf()));
        }

        let vector = self.extractor.extract(image_path)?;
        let hits = self.index.search(&vector, top_k)?;
        debug!("查询 {} 命中 {} 条", image_path.display(), hits.len());

        let mut results = Vec::with_capacity(hits.len());
        for hit in hits {
            let Some(product) = crud::get_product_by_vector_id(&self.db, hit.vector_id as i64).await?
            else {
                warn!("向量 {} 在索引中存在但目录库没有对应映射，跳过", hit.vector_id);
                continue;
            };
            let image_path =
                resolve_display_path(&product.image_path, &self.thumbnails_dir, &self.images_dir);
            results.push(RankedResult {
                product_id: product.product_id,
                image_path,
                similarity: round4(hit.similarity),
            });
        }
        Ok(results)
    }

    /// 应用边界入口：任何查询错误都转换为失败响应，永不 panic
    pub async fn search_response(&self, image_path: impl AsRef<Path>, top_k: usize) -> SearchResponse {
        match self.search(image_path, top_k).await {
            Ok(results) => SearchResponse { success: true, results, message: None },
            Err(e) => {
                warn!("搜索失败: {e}");
                SearchResponse { success: false, results: vec![], message: Some(e.to_string()) }
            }
        }
    }
}

/// 展示路径探测：优先缩略图目录，其次原图目录，都按存储路径的文件名取候选。
/// 两者都不存在时仍然返回原图候选，最终的兜底由展示层负责。
pub fn resolve_display_path(stored_path: &str, thumbnails_dir: &Path, images_dir: &Path) -> PathBuf {
    let file_name = Path::new(stored_path).file_name().unwrap_or_default();
    let thumbnail = thumbnails_dir.join(file_name);
    if thumbnail.exists() {
        return thumbnail;
    }
    images_dir.join(file_name)
}

fn round4(x: f32) -> f32 {
    (x * 10_000.0).round() / 10_000.0
}
