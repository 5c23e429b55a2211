//! Integration tests for the CLI commands

use std::path::{Path, PathBuf};

use assert_cmd::cargo::cargo_bin_cmd;
use image::{DynamicImage, RgbImage};
use predicates::prelude::*;

#[test]
fn test_version_command() {
    let mut cmd = cargo_bin_cmd!("figex");
    cmd.arg("version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("figex "));
}

#[test]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("figex");
    cmd.arg("--version");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("figex "));
}

#[test]
fn test_version_short_flag() {
    let mut cmd = cargo_bin_cmd!("figex");
    cmd.arg("-V");

    cmd.assert()
        .success()
        .stdout(predicate::str::starts_with("figex "));
}

const ANALYSIS: &str = r#"{
  "status": "succeeded",
  "analyzeResult": {
    "pages": [
      {
        "pageNumber": 1,
        "angle": 0,
        "lines": [
          {"content": "Figure 1. A cell", "polygon": [0, 80, 100, 80, 100, 85, 0, 85]}
        ]
      }
    ],
    "figures": [
      {"id": "1.1", "boundingRegions": [{"pageNumber": 1, "polygon": [10, 10, 60, 10, 60, 40, 10, 40]}]}
    ],
    "paragraphs": [
      {"content": "caption", "boundingRegions": [{"pageNumber": 1, "polygon": [65, 45, 120, 45, 120, 60, 65, 60]}]},
      {"content": "body", "boundingRegions": [{"pageNumber": 1, "polygon": [150, 80, 190, 80, 190, 95, 150, 95]}]}
    ]
  }
}"#;

fn write_inputs(dir: &Path) -> (PathBuf, PathBuf) {
    let image_path = dir.join("page.png");
    DynamicImage::ImageRgb8(RgbImage::new(200, 100))
        .save(&image_path)
        .unwrap();
    let analysis_path = dir.join("analysis.json");
    std::fs::write(&analysis_path, ANALYSIS).unwrap();
    (image_path, analysis_path)
}

#[test]
fn test_regions_command_prints_merged_region() {
    let dir = tempfile::tempdir().unwrap();
    let (image_path, analysis_path) = write_inputs(dir.path());

    let mut cmd = cargo_bin_cmd!("figex");
    cmd.arg("regions")
        .arg(&image_path)
        .arg("--analysis")
        .arg(&analysis_path)
        .args(["-m", "2"]);

    // Line height 5, margin 10: the figure grows to reach the caption only.
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"left\": 0.0"))
        .stdout(predicate::str::contains("\"right\": 120.0"))
        .stdout(predicate::str::contains("\"bottom\": 60.0"))
        .stdout(predicate::str::contains("190").not());
}

#[test]
fn test_regions_command_crops_figures() {
    let dir = tempfile::tempdir().unwrap();
    let (image_path, analysis_path) = write_inputs(dir.path());
    let crops = dir.path().join("crops");

    let mut cmd = cargo_bin_cmd!("figex");
    cmd.arg("regions")
        .arg(&image_path)
        .arg("--analysis")
        .arg(&analysis_path)
        .arg("--crop-dir")
        .arg(&crops)
        .args(["-m", "2"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("figure_1.jpg"));

    let crop = image::open(crops.join("page.png").join("figure_1.jpg")).unwrap();
    assert_eq!((crop.width(), crop.height()), (120, 60));
}

#[test]
fn test_regions_command_rejects_bad_analysis() {
    let dir = tempfile::tempdir().unwrap();
    let (image_path, analysis_path) = write_inputs(dir.path());
    std::fs::write(&analysis_path, r#"{"pages": [{"lines": []}]}"#).unwrap();

    let mut cmd = cargo_bin_cmd!("figex");
    cmd.arg("regions").arg(&image_path).arg("--analysis").arg(&analysis_path);

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("no angle"));
}

#[test]
fn test_folder_command_without_credentials_fails() {
    let dir = tempfile::tempdir().unwrap();

    let mut cmd = cargo_bin_cmd!("figex");
    cmd.current_dir(dir.path())
        .env_clear()
        .arg("folder")
        .arg(dir.path());

    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("AZURE_DOCUMENT_INTELLIGENCE_ENDPOINT"));
}
