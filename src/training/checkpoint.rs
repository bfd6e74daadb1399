//! Checkpoint store: model parameters, optimizer state, and the epoch counter
//! persisted under one directory, keyed by epoch number in the filename.

use std::path::Path;

use burn::module::Module;
use burn::optim::Optimizer;
use burn::record::{CompactRecorder, Recorder, RecorderError};
use burn::tensor::backend::AutodiffBackend;
use thiserror::Error;

use crate::model::UNet;

#[derive(Error, Debug)]
pub enum CheckpointError {
    #[error("checkpoint I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("checkpoint record error: {0}")]
    Record(#[from] RecorderError),
}

/// Persist `model-{epoch}.mpk` and `optim-{epoch}.mpk` under `ckpt_dir`,
/// creating the directory if needed. An existing checkpoint for the same
/// epoch is overwritten.
pub fn save<B, O>(
    ckpt_dir: &Path,
    model: &UNet<B>,
    optim: &O,
    epoch: usize,
) -> Result<(), CheckpointError>
where
    B: AutodiffBackend,
    O: Optimizer<UNet<B>, B>,
{
    std::fs::create_dir_all(ckpt_dir)?;
    let recorder = CompactRecorder::new();
    model
        .clone()
        .save_file(ckpt_dir.join(format!("model-{epoch}")), &recorder)?;
    recorder.record(optim.to_record(), ckpt_dir.join(format!("optim-{epoch}")))?;
    Ok(())
}

/// Restore the checkpoint with the highest epoch number. When the directory
/// is missing or holds no checkpoints, the inputs come back unchanged with
/// epoch 0. Malformed record content is a hard error.
pub fn load<B, O>(
    ckpt_dir: &Path,
    model: UNet<B>,
    optim: O,
    device: &B::Device,
) -> Result<(UNet<B>, O, usize), CheckpointError>
where
    B: AutodiffBackend,
    O: Optimizer<UNet<B>, B>,
{
    let Some(epoch) = latest_epoch(ckpt_dir)? else {
        return Ok((model, optim, 0));
    };

    let recorder = CompactRecorder::new();
    let model = model.load_file(ckpt_dir.join(format!("model-{epoch}")), &recorder, device)?;

    let optim_path = ckpt_dir.join(format!("optim-{epoch}.mpk"));
    let optim = if optim_path.exists() {
        let record = recorder.load(ckpt_dir.join(format!("optim-{epoch}")), device)?;
        optim.load_record(record)
    } else {
        optim
    };

    Ok((model, optim, epoch))
}

/// Highest epoch among `model-{N}.mpk` files, if any.
fn latest_epoch(ckpt_dir: &Path) -> Result<Option<usize>, CheckpointError> {
    if !ckpt_dir.is_dir() {
        return Ok(None);
    }

    let mut latest = None;
    for entry in std::fs::read_dir(ckpt_dir)? {
        let path = entry?.path();
        let Some(stem) = path.file_stem().and_then(|stem| stem.to_str()) else {
            continue;
        };
        if let Some(epoch) = parse_model_stem(stem) {
            latest = latest.max(Some(epoch));
        }
    }
    Ok(latest)
}

fn parse_model_stem(stem: &str) -> Option<usize> {
    stem.strip_prefix("model-")?.parse().ok()
}
