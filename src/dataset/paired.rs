use std::path::{Path, PathBuf};

use burn::data::dataset::Dataset;
use image::ColorType;
use thiserror::Error;

use super::transform::{SamplePair, TransformPipeline};

const SUPPORTED_FILES: [&str; 4] = ["bmp", "jpg", "jpeg", "png"];

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("I/O error: `{0}`")]
    IOError(String),

    #[error("unpaired dataset: {inputs} input files vs {labels} label files in `{dir}`")]
    UnpairedFiles {
        inputs: usize,
        labels: usize,
        dir: String,
    },
}

/// Paired input/label image dataset for one split directory.
///
/// Files named `input*` and `label*` (bmp/jpg/jpeg/png) are paired by sorted
/// order. Images are loaded as single-channel f32 in [0, 1]; labels are
/// thresholded to {0, 1}. A malformed image or a spatial mismatch between a
/// pair is fatal at first access.
pub struct PairedImageDataset {
    items: Vec<PairedItemRaw>,
    pipeline: TransformPipeline,
}

#[derive(Debug, Clone)]
struct PairedItemRaw {
    input_path: PathBuf,
    label_path: PathBuf,
}

impl PairedImageDataset {
    pub fn from_dir<P: AsRef<Path>>(
        dir: P,
        pipeline: TransformPipeline,
    ) -> Result<Self, DatasetError> {
        let dir = dir.as_ref();
        if !dir.is_dir() {
            return Err(DatasetError::IOError(format!(
                "dataset directory does not exist: {}",
                dir.display()
            )));
        }

        let mut input_paths = Vec::new();
        let mut label_paths = Vec::new();

        for entry in std::fs::read_dir(dir)
            .map_err(|e| DatasetError::IOError(format!("{}: {e}", dir.display())))?
        {
            let entry = entry.map_err(|e| DatasetError::IOError(e.to_string()))?;
            let path = entry.path();
            if !path.is_file() || !has_supported_extension(&path) {
                continue;
            }

            let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if name.starts_with("input") {
                input_paths.push(path);
            } else if name.starts_with("label") {
                label_paths.push(path);
            }
        }

        if input_paths.len() != label_paths.len() {
            return Err(DatasetError::UnpairedFiles {
                inputs: input_paths.len(),
                labels: label_paths.len(),
                dir: dir.display().to_string(),
            });
        }

        input_paths.sort();
        label_paths.sort();

        let items = input_paths
            .into_iter()
            .zip(label_paths)
            .map(|(input_path, label_path)| PairedItemRaw {
                input_path,
                label_path,
            })
            .collect();

        Ok(Self { items, pipeline })
    }
}

impl Dataset<SamplePair> for PairedImageDataset {
    fn get(&self, index: usize) -> Option<SamplePair> {
        let item = self.items.get(index)?;

        let (input, width, height) = load_luma_f32(&item.input_path);
        let (label_raw, label_width, label_height) = load_luma_f32(&item.label_path);

        assert!(
            width == label_width && height == label_height,
            "input/label spatial mismatch for {}: {}x{} vs {}x{}",
            item.input_path.display(),
            width,
            height,
            label_width,
            label_height,
        );

        let label = label_raw
            .into_iter()
            .map(|v| if v > 0.5 { 1.0 } else { 0.0 })
            .collect();

        Some(self.pipeline.apply(SamplePair {
            input,
            label,
            height,
            width,
        }))
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_FILES
                .iter()
                .any(|&valid_ext| valid_ext.eq_ignore_ascii_case(ext))
        })
}

/// Load an image as a single grayscale channel scaled to [0, 1].
fn load_luma_f32(path: &Path) -> (Vec<f32>, usize, usize) {
    let image = image::open(path)
        .unwrap_or_else(|e| panic!("failed to open image {}: {e}", path.display()));
    let width = image.width() as usize;
    let height = image.height() as usize;

    let data = match image.color() {
        ColorType::L8 | ColorType::La8 => image
            .into_luma8()
            .iter()
            .map(|&x| x as f32 / 255.0)
            .collect(),
        ColorType::L16 | ColorType::La16 => image
            .into_luma16()
            .iter()
            .map(|&x| x as f32 / 65535.0)
            .collect(),
        ColorType::Rgb8 | ColorType::Rgba8 => image
            .into_luma8()
            .iter()
            .map(|&x| x as f32 / 255.0)
            .collect(),
        ColorType::Rgb16 | ColorType::Rgba16 => image
            .into_luma16()
            .iter()
            .map(|&x| x as f32 / 65535.0)
            .collect(),
        _ => panic!("Unrecognized image color type"),
    };

    (data, width, height)
}
