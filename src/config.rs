use burn::prelude::*;

/// Which driver a run executes. Anything other than `train` on the command
/// line selects test mode.
#[derive(Config, Debug, PartialEq)]
pub enum Mode {
    Train,
    Test,
}

impl Mode {
    pub fn from_flag(flag: &str) -> Self {
        if flag == "train" { Mode::Train } else { Mode::Test }
    }
}

/// Immutable run configuration. Built once in `main` from the CLI and passed
/// by reference into the drivers; nothing reads hyperparameters from anywhere
/// else.
#[derive(Config, Debug)]
pub struct RunConfig {
    pub mode: Mode,

    #[config(default = 1e-3)]
    pub lr: f64,

    #[config(default = 4)]
    pub batch_size: usize,

    #[config(default = 100)]
    pub num_epochs: usize,

    #[config(default = "String::from(\"./datasets\")")]
    pub data_dir: String,

    #[config(default = "String::from(\"./checkpoint\")")]
    pub ckpt_dir: String,

    #[config(default = "String::from(\"./log\")")]
    pub log_dir: String,

    #[config(default = "String::from(\"./result\")")]
    pub result_dir: String,

    /// Resume from the latest checkpoint in `ckpt_dir`.
    #[config(default = false)]
    pub train_continue: bool,

    #[config(default = 42)]
    pub seed: u64,

    /// Prefetch workers for the data loaders.
    #[config(default = 1)]
    pub num_workers: usize,

    /// Channel width of the first encoder stage. Depth is fixed.
    #[config(default = 64)]
    pub base_channels: usize,
}
