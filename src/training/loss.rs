use std::marker::PhantomData;

use burn::prelude::*;

/// Configuration to create a [BCE-with-logits loss](BceWithLogitsLoss) using
/// the [init function](BceWithLogitsLossConfig::init).
#[derive(Config, Debug)]
pub struct BceWithLogitsLossConfig {}

impl BceWithLogitsLossConfig {
    pub fn init<B: Backend>(&self, _device: &B::Device) -> BceWithLogitsLoss<B> {
        BceWithLogitsLoss { _b: PhantomData }
    }
}

/// Binary cross-entropy on raw logits, mean-reduced over every pixel.
///
/// Uses the numerically stable form `max(x, 0) - x*y + ln(1 + e^-|x|)` so the
/// sigmoid never has to be materialized.
#[derive(Module, Debug)]
pub struct BceWithLogitsLoss<B: Backend> {
    _b: PhantomData<B>,
}

impl<B: Backend> BceWithLogitsLoss<B> {
    /// # Shapes
    ///
    /// - logits: `[batch_size, 1, height, width]`
    /// - targets: `[batch_size, 1, height, width]` with values in {0, 1}
    pub fn forward(&self, logits: Tensor<B, 4>, targets: Tensor<B, 4>) -> Tensor<B, 1> {
        self.assertions(&logits, &targets);

        let stable_log_term = logits.clone().abs().neg().exp().add_scalar(1.0).log();
        let loss = logits.clone().clamp_min(0.0) - logits * targets + stable_log_term;

        loss.mean()
    }

    fn assertions(&self, logits: &Tensor<B, 4>, targets: &Tensor<B, 4>) {
        let logit_dims = logits.dims();
        let target_dims = targets.dims();
        assert!(
            logit_dims == target_dims,
            "Shape mismatch: logits {logit_dims:?} vs targets {target_dims:?}",
        );
    }
}
