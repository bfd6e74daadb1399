//! Inference driver: reload the latest checkpoint, run the test split through
//! the network, and persist per-sample label/input/output artifacts.

use std::path::Path;

use anyhow::{Context, Result, ensure};
use burn::data::dataloader::DataLoaderBuilder;
use burn::data::dataset::Dataset;
use burn::module::AutodiffModule;
use burn::optim::AdamConfig;
use burn::tensor::ElementConversion;
use burn::tensor::backend::AutodiffBackend;

use crate::config::RunConfig;
use crate::dataset::{NORM_MEAN, NORM_STD, PairedImageDataset, SegBatcher, TransformPipeline};
use crate::export::{write_sample_array, write_sample_png};
use crate::model::UNetConfig;
use crate::post::Snapshot;
use crate::training::checkpoint;
use crate::training::loss::BceWithLogitsLossConfig;
use crate::training::trainer::mean_loss;

#[derive(Debug)]
pub struct InferenceReport {
    /// Epoch of the restored checkpoint; 0 means fresh weights.
    pub loaded_epoch: usize,
    pub samples: usize,
    pub mean_loss: f32,
}

/// Run the test split and write, for every sample, three PNGs and three raw
/// array dumps into `result_dir/png` and `result_dir/numpy`. Sample ids are
/// flat: `batch_size * batch_index + position_in_batch`.
pub fn run_inference<B: AutodiffBackend>(
    config: &RunConfig,
    device: &B::Device,
) -> Result<InferenceReport> {
    let data_dir = Path::new(&config.data_dir);
    let result_dir = Path::new(&config.result_dir);

    let test_dataset =
        PairedImageDataset::from_dir(data_dir.join("test"), TransformPipeline::inference())
            .context("loading test split")?;
    ensure!(test_dataset.len() > 0, "test split is empty");
    let num_batches = test_dataset.len().div_ceil(config.batch_size);

    let loader = DataLoaderBuilder::new(SegBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(config.batch_size)
        .num_workers(config.num_workers)
        .build(test_dataset);

    let model = UNetConfig::new()
        .with_base_channels(config.base_channels)
        .init::<B>(device);
    let optim = AdamConfig::new().init();
    let (model, _optim, loaded_epoch) =
        checkpoint::load(Path::new(&config.ckpt_dir), model, optim, device)?;
    println!("loaded checkpoint epoch {loaded_epoch}");

    let model = model.valid();
    let loss_fn = BceWithLogitsLossConfig::new().init::<B::InnerBackend>(device);

    let png_dir = result_dir.join("png");
    let numpy_dir = result_dir.join("numpy");
    std::fs::create_dir_all(&png_dir)?;
    std::fs::create_dir_all(&numpy_dir)?;

    let mut losses = Vec::new();
    let mut samples = 0;

    for (batch_index, batch) in loader.iter().enumerate() {
        let output = model.forward(batch.inputs.clone());
        let loss = loss_fn.forward(output.clone(), batch.labels.clone());
        losses.push(loss.into_scalar().elem::<f32>());

        println!(
            "test : batch {:04} / {:04} | loss {:.4}",
            batch_index + 1,
            num_batches,
            mean_loss(&losses).unwrap_or_default(),
        );

        let snapshot =
            Snapshot::from_batch(batch.labels, batch.inputs, output, NORM_MEAN, NORM_STD);

        for position in 0..snapshot.label.batch_size() {
            let id = config.batch_size * batch_index + position;

            for (tag, array) in [
                ("label", &snapshot.label),
                ("input", &snapshot.input),
                ("output", &snapshot.output),
            ] {
                write_sample_png(&png_dir.join(format!("{tag}_{id:04}.png")), array, position)?;
                write_sample_array(
                    &numpy_dir.join(format!("{tag}_{id:04}.np")),
                    array,
                    position,
                )?;
            }
            samples += 1;
        }
    }

    let mean = mean_loss(&losses).context("test split produced no batches")?;
    println!("average test loss : {mean:.4} over {samples} samples");

    Ok(InferenceReport {
        loaded_epoch,
        samples,
        mean_loss: mean,
    })
}
