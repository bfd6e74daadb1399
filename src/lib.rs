pub mod config;
pub mod dataset;
pub mod export;
pub mod inference;
pub mod logging;
pub mod model;
pub mod post;
pub mod training;

pub use config::{Mode, RunConfig};
pub use dataset::{PairedImageDataset, SegBatch, SegBatcher, TransformPipeline};
pub use inference::{InferenceReport, run_inference};
pub use model::{UNet, UNetConfig};
pub use training::trainer::{TrainReport, run_training};

/// Default backend for training and inference (NdArray unless built with `wgpu`).
#[cfg(feature = "wgpu")]
pub type SegBackend = burn::backend::Wgpu<f32, i32>;
#[cfg(not(feature = "wgpu"))]
pub type SegBackend = burn::backend::NdArray<f32>;

/// Resolve the compute device once at startup; every tensor and module
/// placement goes through the value returned here.
pub fn resolve_device() -> <SegBackend as burn::tensor::backend::Backend>::Device {
    Default::default()
}

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
