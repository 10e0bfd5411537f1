use std::convert::Infallible;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::LazyLock;

use clap::{Parser, Subcommand};
use directories::ProjectDirs;

use crate::cli::*;

static DATA_DIR: LazyLock<DataDir> = LazyLock::new(|| {
    let proj_dirs = ProjectDirs::from("", "", "visearch").expect("failed to get project dir");
    DataDir { path: proj_dirs.data_dir().to_path_buf() }
});

fn default_data_dir() -> &'static str {
    DATA_DIR.path().to_str().unwrap()
}

#[derive(Parser, Debug, Clone)]
#[command(name = "visearch", version)]
pub struct Opts {
    #[command(subcommand)]
    pub subcmd: SubCommand,
    /// 数据目录，存放数据库、索引和图片
    #[arg(short, long, default_value = default_data_dir())]
    pub data_dir: DataDir,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SubCommand {
    /// 扫描商品图片目录，生成向量并构建索引
    Build(BuildCommand),
    /// 以图搜图，返回相似的商品
    Search(SearchCommand),
}

/// 数据目录布局
#[derive(Debug, Clone)]
pub struct DataDir {
    path: PathBuf,
}

impl DataDir {
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 商品数据库文件的路径
    pub fn database(&self) -> PathBuf {
        self.path.join("products.db")
    }

    /// HNSW 索引文件所在目录
    pub fn index_dir(&self) -> PathBuf {
        self.path.join("index")
    }

    /// 模型权重文件的路径
    pub fn model(&self) -> PathBuf {
        self.path.join("model.safetensors")
    }

    /// 商品原图目录
    pub fn images_dir(&self) -> PathBuf {
        self.path.join("images")
    }

    /// 缩略图目录，仅用于展示路径探测
    pub fn thumbnails_dir(&self) -> PathBuf {
        self.path.join("thumbnails")
    }
}

impl FromStr for DataDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self { path: PathBuf::from(s) })
    }
}
