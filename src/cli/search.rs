use std::convert::Infallible;
use std::path::PathBuf;
use std::str::FromStr;

use anyhow::Result;
use clap::{Parser, ValueEnum};
use log::warn;

use crate::cli::SubCommandExtend;
use crate::config::Opts;
use crate::db::open_db_readonly;
use crate::embed::FeatureExtractor;
use crate::error::IndexError;
use crate::index::VectorIndex;
use crate::searcher::{DEFAULT_TOP_K, SearchResponse, Searcher};

#[derive(Parser, Debug, Clone)]
pub struct SearchCommand {
    /// 查询图片路径
    pub image: PathBuf,
    /// 返回的结果数量
    #[arg(short = 'k', long, value_name = "COUNT", default_value_t = DEFAULT_TOP_K)]
    pub count: usize,
    /// 模型权重文件，默认为数据目录下的 model.safetensors
    #[arg(long, value_name = "FILE")]
    pub model: Option<PathBuf>,
    /// 索引文件缺失时进入降级模式（空索引，永远返回空结果）而不是报错
    #[arg(long)]
    pub degraded: bool,
    /// 输出格式
    #[arg(long, value_name = "FORMAT", default_value = "table")]
    pub output_format: OutputFormat,
}

impl SubCommandExtend for SearchCommand {
    async fn run(&self, opts: &Opts) -> Result<()> {
        let data_dir = &opts.data_dir;

        let extractor =
            FeatureExtractor::load(self.model.clone().unwrap_or_else(|| data_dir.model()))?;
        let index = match VectorIndex::open(data_dir.index_dir(), extractor.dim()) {
            Ok(index) => index,
            Err(IndexError::NotFound(path)) if self.degraded => {
                warn!("索引 {} 不存在，进入降级模式，所有查询都返回空结果", path.display());
                VectorIndex::empty(extractor.dim())
            }
            Err(e) => return Err(e.into()),
        };
        let db = open_db_readonly(data_dir.database()).await?;

        let searcher =
            Searcher::new(extractor, index, db, data_dir.thumbnails_dir(), data_dir.images_dir());
        let response = searcher.search_response(&self.image, self.count).await;

        print_result(&response, self)
    }
}

fn print_result(response: &SearchResponse, opts: &SearchCommand) -> Result<()> {
    match opts.output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(response)?);
            Ok(())
        }
        OutputFormat::Table => {
            if !response.success {
                anyhow::bail!(
                    "搜索失败: {}",
                    response.message.as_deref().unwrap_or("unknown error")
                );
            }
            for r in &response.results {
                println!("{:.4}\t{}\t{}", r.similarity, r.product_id, r.image_path.display());
            }
            Ok(())
        }
    }
}

#[derive(ValueEnum, Debug, Clone)]
pub enum OutputFormat {
    Json,
    Table,
}

impl FromStr for OutputFormat {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "table" => Ok(Self::Table),
            _ => unreachable!(),
        }
    }
}
