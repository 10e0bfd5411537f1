use std::collections::HashSet;
use std::path::Path;

use hnsw_rs::prelude::*;
use log::info;

use crate::error::IndexError;

const MAX_NB_CONNECTION: usize = 16;
const MAX_LAYER: usize = 16;
const EF_CONSTRUCTION: usize = 200;
const EF_SEARCH: usize = 64;
const BASENAME: &str = "catalog";

/// 单条检索命中，按余弦距离升序返回
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub vector_id: usize,
    pub distance: f32,
    /// 1 - distance，收缩到 [0, 1]，避免浮点误差越界
    pub similarity: f32,
}

/// 余弦空间的 HNSW 向量索引
///
/// vector_id 由构建流程从 0 开始连续分配，索引内部因此总是稠密的，
/// 这也是 open 之后还能继续做重复 id 检查的前提。
/// 服务进程中索引只读，写入只发生在离线构建阶段。
pub struct VectorIndex {
    hnsw: Hnsw<'static, f32, DistCosine>,
    dim: usize,
    ids: HashSet<usize>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dim", &self.dim)
            .field("len", &self.ids.len())
            .finish_non_exhaustive()
    }
}

impl VectorIndex {
    /// 新建一个空索引，capacity 为预计插入的向量数
    pub fn new(dim: usize, capacity: usize) -> Self {
        let hnsw = Hnsw::<f32, _>::new(
            MAX_NB_CONNECTION,
            capacity.max(1),
            MAX_LAYER,
            EF_CONSTRUCTION,
            DistCosine {},
        );
        Self { hnsw, dim, ids: HashSet::new() }
    }

    /// 显式的降级模式：索引文件缺失时可用的空索引，任何查询都返回空结果。
    /// 调用方必须自己决定并记录这次降级，而不是默默 fallback。
    pub fn empty(dim: usize) -> Self {
        Self::new(dim, 1)
    }

    /// 从磁盘加载索引，文件缺失视为错误
    pub fn open(dir: impl AsRef<Path>, dim: usize) -> Result<Self, IndexError> {
        let dir = dir.as_ref();
        if !dir.join(format!("{BASENAME}.hnsw.graph")).exists() {
            return Err(IndexError::NotFound(dir.to_path_buf()));
        }
        let reloader = HnswIo::new(dir, BASENAME);
        // NOTE: 加载出的 HNSW 生命周期依赖 reloader，Box::leak 将其延长到 'static
        let reloader = Box::leak(Box::new(reloader));
        let hnsw = reloader.load_hnsw_with_dist(DistCosine {}).map_err(anyhow::Error::from)?;
        let ids = (0..hnsw.get_nb_point()).collect();
        info!("索引加载完成: {} ({} vectors)", dir.display(), hnsw.get_nb_point());
        Ok(Self { hnsw, dim, ids })
    }

    /// 插入一个向量，vector_id 不允许重复
    pub fn add(&mut self, vector: &[f32], vector_id: usize) -> Result<(), IndexError> {
        if vector.len() != self.dim {
            return Err(IndexError::Dimension { got: vector.len(), expected: self.dim });
        }
        if !self.ids.insert(vector_id) {
            return Err(IndexError::DuplicateId(vector_id));
        }
        self.hnsw.insert((vector, vector_id));
        Ok(())
    }

    /// 查询最近的 k 个向量，结果按距离升序，数量为 min(k, ntotal)
    pub fn search(&self, vector: &[f32], k: usize) -> Result<Vec<SearchHit>, IndexError> {
        if vector.len() != self.dim {
            return Err(IndexError::Dimension { got: vector.len(), expected: self.dim });
        }
        if self.ids.is_empty() || k == 0 {
            return Ok(vec![]);
        }
        let hits = self
            .hnsw
            .search(vector, k, EF_SEARCH.max(k))
            .into_iter()
            .map(|n| SearchHit {
                vector_id: n.d_id,
                distance: n.distance,
                similarity: (1.0 - n.distance).clamp(0.0, 1.0),
            })
            .collect();
        Ok(hits)
    }

    /// 持久化到目录，与 open 对应
    pub fn save(&self, dir: impl AsRef<Path>) -> Result<(), IndexError> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir).map_err(anyhow::Error::from)?;
        self.hnsw.file_dump(dir, BASENAME).map_err(anyhow::Error::from)?;
        Ok(())
    }

    pub fn ntotal(&self) -> usize {
        self.hnsw.get_nb_point()
    }

    pub fn dim(&self) -> usize {
        self.dim
    }
}
