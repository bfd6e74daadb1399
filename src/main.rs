use anyhow::Result;
use burn::backend::Autodiff;
use burn::prelude::*;
use clap::Parser;

use unet_seg::{Mode, RunConfig, SegBackend, resolve_device, run_inference, run_training};

#[derive(Parser, Debug)]
#[command(name = "unet-seg", about = "Train and run a U-Net segmentation model", version)]
struct Args {
    #[arg(long, default_value_t = 1e-3)]
    lr: f64,

    #[arg(long = "batch_size", default_value_t = 4)]
    batch_size: usize,

    #[arg(long = "num_epochs", default_value_t = 100)]
    num_epochs: usize,

    #[arg(long = "data_dir", default_value = "./datasets")]
    data_dir: String,

    #[arg(long = "ckpt_dir", default_value = "./checkpoint")]
    ckpt_dir: String,

    #[arg(long = "log_dir", default_value = "./log")]
    log_dir: String,

    #[arg(long = "result_dir", default_value = "./result")]
    result_dir: String,

    /// "train" or anything else for test mode.
    #[arg(long, default_value = "train")]
    mode: String,

    /// "on" to resume from the latest checkpoint.
    #[arg(long = "train_continue", default_value = "off")]
    train_continue: String,

    #[arg(long, default_value_t = 42)]
    seed: u64,

    #[arg(long = "num_workers", default_value_t = 1)]
    num_workers: usize,
}

fn main() -> Result<()> {
    type Back = Autodiff<SegBackend>;

    let args = Args::parse();

    let config = RunConfig::new(Mode::from_flag(&args.mode))
        .with_lr(args.lr)
        .with_batch_size(args.batch_size)
        .with_num_epochs(args.num_epochs)
        .with_data_dir(args.data_dir)
        .with_ckpt_dir(args.ckpt_dir)
        .with_log_dir(args.log_dir)
        .with_result_dir(args.result_dir)
        .with_train_continue(args.train_continue == "on")
        .with_seed(args.seed)
        .with_num_workers(args.num_workers);

    println!("lr : {:.4e}", config.lr);
    println!("batch : {}", config.batch_size);

    let device = resolve_device();
    Back::seed(config.seed);

    match config.mode {
        Mode::Train => {
            let report = run_training::<Back>(&config, &device)?;
            println!(
                "training done : {} epochs | final loss {:?}",
                report.epochs_run, report.final_train_loss,
            );
        }
        Mode::Test => {
            let report = run_inference::<Back>(&config, &device)?;
            println!(
                "inference done : {} samples | mean loss {:.4}",
                report.samples, report.mean_loss,
            );
        }
    }

    Ok(())
}
