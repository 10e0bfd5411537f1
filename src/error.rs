use std::path::PathBuf;

use thiserror::Error;

/// 特征提取阶段的错误
///
/// 模型缺失是致命错误，单张图片解码失败则是可恢复的，
/// 调用方据此决定中断还是跳过。
#[derive(Debug, Error)]
pub enum EmbedError {
    #[error("failed to load model from {path}")]
    ModelLoad {
        path: PathBuf,
        #[source]
        source: candle_core::Error,
    },
    #[error("failed to decode image {path}")]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("inference failed")]
    Inference(#[from] candle_core::Error),
}

/// 向量索引的错误
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index not found at {0}")]
    NotFound(PathBuf),
    #[error("vector id {0} already exists in index")]
    DuplicateId(usize),
    #[error("vector dimension mismatch: got {got}, expected {expected}")]
    Dimension { got: usize, expected: usize },
    #[error(transparent)]
    Io(#[from] anyhow::Error),
}

/// 在线搜索的错误，编排层统一收口转为失败响应
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("query image not found: {0}")]
    QueryImageMissing(PathBuf),
    #[error("failed to extract query feature")]
    Embed(#[from] EmbedError),
    #[error("index query failed")]
    Index(#[from] IndexError),
    #[error("catalog lookup failed")]
    Catalog(#[from] sqlx::Error),
}

/// 离线构建的错误，发生即中断整次构建
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("images directory not found: {0}")]
    ImagesDirMissing(PathBuf),
    #[error("feature extraction failed")]
    Embed(#[from] EmbedError),
    #[error("index update failed")]
    Index(#[from] IndexError),
    #[error("catalog write failed")]
    Catalog(#[from] sqlx::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
