use std::collections::HashMap;
use std::path::Path;

use candle_core::{D, Device, Tensor};
use candle_nn::{Conv2d, Conv2dConfig, Module};

/// 模型输入图片边长
pub const IMAGE_SIZE: usize = 224;
/// 参考部署的特征向量维度
pub const EMBED_DIM: usize = 2048;

/// 卷积嵌入网络：若干层 stride=2 的卷积，末端做全局平均池化。
/// 层数和通道数不做硬编码，而是从权重文件的形状推断，
/// 因此同一份代码可以加载不同规模的权重。
pub(crate) struct EmbedNet {
    layers: Vec<Conv2d>,
    dim: usize,
}

impl EmbedNet {
    pub fn load(path: &Path, device: &Device) -> candle_core::Result<Self> {
        let tensors = candle_core::safetensors::load(path, device)?;
        Self::from_tensors(tensors)
    }

    /// 权重命名约定：conv0.weight / conv0.bias，conv1.weight ... 依次类推
    pub fn from_tensors(mut tensors: HashMap<String, Tensor>) -> candle_core::Result<Self> {
        let mut layers = vec![];
        let mut dim = 0;
        for i in 0.. {
            let Some(weight) = tensors.remove(&format!("conv{i}.weight")) else {
                break;
            };
            let bias = tensors.remove(&format!("conv{i}.bias"));
            let kernel = weight.dim(D::Minus1)?;
            dim = weight.dim(0)?;
            let cfg = Conv2dConfig { padding: kernel / 2, stride: 2, ..Default::default() };
            layers.push(Conv2d::new(weight, bias, cfg));
        }
        if layers.is_empty() {
            candle_core::bail!("no conv layers found in weight file");
        }
        Ok(Self { layers, dim })
    }

    /// 输出维度，即最后一层卷积的通道数
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// [B, 3, H, W] -> [B, dim]
    pub fn forward(&self, xs: &Tensor) -> candle_core::Result<Tensor> {
        let mut xs = xs.clone();
        for conv in &self.layers {
            xs = conv.forward(&xs)?.relu()?;
        }
        xs.mean(D::Minus1)?.mean(D::Minus1)
    }
}

#[cfg(test)]
mod tests {
    use candle_core::DType;

    use super::*;

    fn random_net(channels: &[usize]) -> EmbedNet {
        let dev = Device::Cpu;
        let mut tensors = HashMap::new();
        let mut cin = 3;
        for (i, &cout) in channels.iter().enumerate() {
            let k = if i == 0 { 7 } else { 3 };
            let w = Tensor::randn(0f32, 0.1, (cout, cin, k, k), &dev).unwrap();
            let b = Tensor::zeros((cout,), DType::F32, &dev).unwrap();
            tensors.insert(format!("conv{i}.weight"), w);
            tensors.insert(format!("conv{i}.bias"), b);
            cin = cout;
        }
        EmbedNet::from_tensors(tensors).unwrap()
    }

    #[test]
    fn dim_follows_last_layer() {
        let net = random_net(&[8, 16]);
        assert_eq!(net.dim(), 16);
    }

    #[test]
    fn forward_shape() {
        let net = random_net(&[8, 16]);
        let xs = Tensor::zeros((1, 3, IMAGE_SIZE, IMAGE_SIZE), DType::F32, &Device::Cpu).unwrap();
        let ys = net.forward(&xs).unwrap();
        assert_eq!(ys.dims(), &[1, 16]);
    }

    #[test]
    fn empty_weight_file_rejected() {
        assert!(EmbedNet::from_tensors(HashMap::new()).is_err());
    }
}
