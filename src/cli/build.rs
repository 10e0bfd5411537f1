use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use log::info;

use crate::builder::{BuildOptions, build};
use crate::cli::SubCommandExtend;
use crate::config::Opts;

#[derive(Parser, Debug, Clone)]
pub struct BuildCommand {
    /// 商品图片目录，默认为数据目录下的 images/
    #[arg(long, value_name = "DIR")]
    pub images_dir: Option<PathBuf>,
    /// 模型权重文件，默认为数据目录下的 model.safetensors
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,
    /// 构建时一个批次处理的图片数量
    #[arg(long, value_name = "SIZE", default_value_t = 32)]
    pub batch_size: usize,
}

impl SubCommandExtend for BuildCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let data_dir = &opts.data_dir;
        let build_opts = BuildOptions {
            images_dir: self.images_dir.clone().unwrap_or_else(|| data_dir.images_dir()),
            model_path: self.model.clone().unwrap_or_else(|| data_dir.model()),
            db_path: data_dir.database(),
            index_dir: data_dir.index_dir(),
            batch_size: self.batch_size,
        };
        std::fs::create_dir_all(data_dir.path())?;

        let summary = build(&build_opts).await?;
        info!("构建完成: {} 张入库, {} 张跳过", summary.indexed, summary.skipped);
        Ok(())
    }
}
