use std::path::Path;

use candle_core::{Device, Tensor};
use image::imageops::FilterType;
use log::info;

use crate::error::EmbedError;

mod model;

use model::EmbedNet;
pub use model::{EMBED_DIM, IMAGE_SIZE};

/// 特征提取器，持有唯一的模型句柄
///
/// 构建索引和在线查询共用同一条预处理路径（extract），
/// 两侧预处理逐位一致是相似度正确性的前提。
pub struct FeatureExtractor {
    model: EmbedNet,
    device: Device,
}

impl std::fmt::Debug for FeatureExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FeatureExtractor")
            .field("dim", &self.model.dim())
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

impl FeatureExtractor {
    /// 从 safetensors 权重文件加载模型，进程内只加载一次
    pub fn load(path: impl AsRef<Path>) -> Result<Self, EmbedError> {
        let path = path.as_ref();
        let device = Device::Cpu;
        let model = EmbedNet::load(path, &device)
            .map_err(|source| EmbedError::ModelLoad { path: path.to_path_buf(), source })?;
        info!("模型加载完成: {} (dim={})", path.display(), model.dim());
        Ok(Self { model, device })
    }

    /// 特征向量的维度
    pub fn dim(&self) -> usize {
        self.model.dim()
    }

    /// 提取单位化的特征向量
    ///
    /// 解码 → 缩放到 224x224 → 去掉 alpha 通道 → 除以 255 → 推理 → L2 单位化
    pub fn extract(&self, image_path: impl AsRef<Path>) -> Result<Vec<f32>, EmbedError> {
        let xs = self.preprocess(image_path.as_ref())?;
        let ys = self.model.forward(&xs)?.squeeze(0)?;
        let ys = l2_normalize(&ys)?;
        Ok(ys.to_vec1()?)
    }

    fn preprocess(&self, path: &Path) -> Result<Tensor, EmbedError> {
        let img = image::open(path)
            .map_err(|source| EmbedError::Image { path: path.to_path_buf(), source })?;
        let img =
            img.resize_exact(IMAGE_SIZE as u32, IMAGE_SIZE as u32, FilterType::Triangle).to_rgb8();
        let data: Vec<f32> = img.into_raw().into_iter().map(|b| b as f32 / 255.0).collect();
        // HWC -> NCHW
        let xs = Tensor::from_vec(data, (IMAGE_SIZE, IMAGE_SIZE, 3), &self.device)?
            .permute((2, 0, 1))?
            .unsqueeze(0)?;
        Ok(xs)
    }
}

fn l2_normalize(v: &Tensor) -> candle_core::Result<Tensor> {
    let norm = v.sqr()?.sum_all()?.sqrt()?;
    if norm.to_scalar::<f32>()? < f32::EPSILON {
        candle_core::bail!("embedding has zero norm");
    }
    v.broadcast_div(&norm)
}
