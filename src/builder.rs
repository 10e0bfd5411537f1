use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use indicatif::ProgressBar;
use log::{info, warn};
use regex::Regex;
use walkdir::WalkDir;

use crate::db::{CatalogEntry, crud, init_db};
use crate::embed::FeatureExtractor;
use crate::error::BuildError;
use crate::index::VectorIndex;
use crate::utils::pb_style;

pub struct BuildOptions {
    pub images_dir: PathBuf,
    pub model_path: PathBuf,
    pub db_path: PathBuf,
    pub index_dir: PathBuf,
    pub batch_size: usize,
}

#[derive(Debug)]
pub struct BuildSummary {
    pub indexed: usize,
    pub skipped: usize,
    pub elapsed: Duration,
}

/// 扫描图片目录，文件名在第一个 `.` 之前的十进制前缀即商品 ID。
/// 按商品 ID 排序后再顺序分配 vector_id，保证两次构建产出可互换的索引。
fn scan_images(images_dir: &Path) -> Vec<(i64, PathBuf)> {
    let re_id = Regex::new(r"^(\d+)\.").expect("failed to build regex");
    let re_ext = Regex::new(r"(?i)\.(jpg|jpeg|png|webp)$").expect("failed to build regex");

    let mut files = vec![];
    for entry in WalkDir::new(images_dir).max_depth(1).into_iter().filter_map(|e| e.ok()) {
        if !entry.file_type().is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy();
        if !re_ext.is_match(&name) {
            continue;
        }
        let Some(cap) = re_id.captures(&name) else {
            continue;
        };
        let Ok(product_id) = cap[1].parse::<i64>() else {
            continue;
        };
        files.push((product_id, entry.into_path()));
    }

    files.sort_by(|a, b| (a.0, &a.1).cmp(&(b.0, &b.1)));
    let before = files.len();
    files.dedup_by_key(|(id, _)| *id);
    if files.len() < before {
        warn!("发现 {} 个重复的商品 ID，每个 ID 只保留第一张图片", before - files.len());
    }
    files
}

/// 离线批量构建：提取特征 → 写入索引 → 按批次落库 → 持久化索引
///
/// 单张图片解码失败只计数跳过；图片目录或模型缺失则在任何写入前直接失败。
pub async fn build(opts: &BuildOptions) -> Result<BuildSummary, BuildError> {
    if !opts.images_dir.is_dir() {
        return Err(BuildError::ImagesDirMissing(opts.images_dir.clone()));
    }
    let extractor = FeatureExtractor::load(&opts.model_path)?;

    let files = scan_images(&opts.images_dir);
    info!("共发现 {} 张商品图片，batch_size = {}", files.len(), opts.batch_size);

    let pool = init_db(&opts.db_path).await?;
    let mut index = VectorIndex::new(extractor.dim(), files.len());

    let pb = ProgressBar::new(files.len() as u64).with_style(pb_style());
    let start = Instant::now();
    let mut next_vector_id = 0usize;
    let mut skipped = 0usize;

    for batch in files.chunks(opts.batch_size.max(1)) {
        let mut entries = Vec::with_capacity(batch.len());
        for (product_id, path) in batch {
            pb.inc(1);
            let vector = match extractor.extract(path) {
                Ok(v) => v,
                Err(e) => {
                    warn!("跳过 {}: {e}", path.display());
                    skipped += 1;
                    continue;
                }
            };
            let vector_id = next_vector_id;
            next_vector_id += 1;
            index.add(&vector, vector_id)?;
            entries.push(CatalogEntry {
                vector_id: vector_id as i64,
                product_id: *product_id,
                image_path: path.to_string_lossy().into_owned(),
                title: None,
            });
        }
        // 向量先拿到 id 进索引，对应目录行随后在同一个事务提交，
        // 中途崩溃的影响范围被限制在这一个批次内
        crud::insert_catalog_batch(&pool, &entries).await?;
    }
    pb.finish_and_clear();

    index.save(&opts.index_dir)?;
    pool.close().await;

    let summary = BuildSummary { indexed: next_vector_id, skipped, elapsed: start.elapsed() };
    info!(
        "索引构建完成: {} indexed, {} skipped, {:.1}s",
        summary.indexed,
        summary.skipped,
        summary.elapsed.as_secs_f32()
    );
    Ok(summary)
}
