mod batcher;
mod paired;
mod transform;

pub use batcher::{SegBatch, SegBatcher};
pub use paired::{DatasetError, PairedImageDataset};
pub use transform::{NORM_MEAN, NORM_STD, SamplePair, Transform, TransformPipeline};
