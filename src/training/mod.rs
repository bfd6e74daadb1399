pub mod checkpoint;
pub mod loss;
pub mod trainer;

pub use loss::{BceWithLogitsLoss, BceWithLogitsLossConfig};
pub use trainer::{TrainReport, run_training};
