use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::process::Command;

use anyhow::Result;
use assert_cmd::prelude::*;
use candle_core::{Device, Tensor};
use predicates::prelude::*;
use rstest::*;

macro_rules! cargo_run {
    ($($args:expr),*) => {
        {
            let mut cmd = Command::cargo_bin("visearch")?;
            $(cmd.arg($args);)*
            cmd.assert()
        }
    };
}

/// 随机初始化一份两层的小模型权重，足够让不同图片的向量可区分
fn write_model(path: &Path) -> Result<()> {
    let dev = Device::Cpu;
    let mut tensors = HashMap::new();
    let mut cin = 3;
    for (i, &cout) in [8usize, 16].iter().enumerate() {
        let k = if i == 0 { 7 } else { 3 };
        tensors.insert(format!("conv{i}.weight"), Tensor::randn(0f32, 0.1, (cout, cin, k, k), &dev)?);
        tensors.insert(format!("conv{i}.bias"), Tensor::full(0.01f32, (cout,), &dev)?);
        cin = cout;
    }
    candle_core::safetensors::save(&tensors, path)?;
    Ok(())
}

fn write_image(path: &Path, rgb: [u8; 3]) -> Result<()> {
    let img = image::RgbImage::from_fn(64, 64, |x, y| {
        let shade = ((x + y) % 64) as u8;
        image::Rgb([rgb[0].saturating_add(shade), rgb[1].saturating_add(shade / 2), rgb[2]])
    });
    img.save(path)?;
    Ok(())
}

/// 准备数据目录：模型权重 + 三张按商品 ID 命名的图片
fn make_data_dir() -> Result<assert_fs::TempDir> {
    let dir = assert_fs::TempDir::new()?;
    write_model(&dir.path().join("model.safetensors"))?;

    let images = dir.path().join("images");
    fs::create_dir_all(&images)?;
    write_image(&images.join("1.png"), [220, 20, 20])?;
    write_image(&images.join("2.png"), [20, 220, 20])?;
    write_image(&images.join("3.png"), [20, 20, 220])?;
    Ok(dir)
}

#[rstest]
#[case("table")]
#[case("json")]
fn build_then_search_finds_self(#[case] format: &str) -> Result<()> {
    let dir = make_data_dir()?;

    cargo_run!("-d", dir.path(), "build").success();

    let query = dir.path().join("images/1.png");
    let assert =
        cargo_run!("-d", dir.path(), "search", &query, "--output-format", format).success();

    match format {
        "json" => {
            assert
                .stdout(predicate::str::contains(r#""success": true"#))
                .stdout(predicate::str::contains(r#""product_id": 1"#));
        }
        _ => {
            assert.stdout(predicate::str::contains("1.png"));
        }
    }
    Ok(())
}

#[test]
fn search_missing_image_reports_failure() -> Result<()> {
    let dir = make_data_dir()?;

    cargo_run!("-d", dir.path(), "build").success();

    let query = dir.path().join("images/nope.png");
    cargo_run!("-d", dir.path(), "search", &query, "--output-format", "json")
        .success()
        .stdout(predicate::str::contains(r#""success": false"#))
        .stdout(predicate::str::contains("not found"));
    Ok(())
}

#[test]
fn missing_index_is_an_error_without_degraded() -> Result<()> {
    let dir = make_data_dir()?;

    cargo_run!("-d", dir.path(), "build").success();
    fs::remove_dir_all(dir.path().join("index"))?;

    let query = dir.path().join("images/1.png");
    cargo_run!("-d", dir.path(), "search", &query).failure();
    Ok(())
}

#[test]
fn degraded_mode_returns_empty_results() -> Result<()> {
    let dir = make_data_dir()?;

    cargo_run!("-d", dir.path(), "build").success();
    fs::remove_dir_all(dir.path().join("index"))?;

    let query = dir.path().join("images/1.png");
    cargo_run!("-d", dir.path(), "search", &query, "--degraded", "--output-format", "json")
        .success()
        .stdout(predicate::str::contains(r#""success": true"#))
        .stdout(predicate::str::contains(r#""results": []"#));
    Ok(())
}
