use burn::{data::dataloader::batcher::Batcher, prelude::*};

use super::transform::SamplePair;

/// Stacks host samples into device tensors. One batch is built per loader
/// iteration and dropped after the step completes.
#[derive(Clone)]
pub struct SegBatcher<B: Backend> {
    device: B::Device,
}

impl<B: Backend> SegBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

/// A stacked batch: `inputs` is B x 1 x H x W normalized floats, `labels` is
/// B x 1 x H x W floats in {0, 1}.
#[derive(Clone, Debug)]
pub struct SegBatch<B: Backend> {
    pub inputs: Tensor<B, 4>,
    pub labels: Tensor<B, 4>,
}

impl<B: Backend> Batcher<SamplePair, SegBatch<B>> for SegBatcher<B> {
    fn batch(&self, items: Vec<SamplePair>) -> SegBatch<B> {
        let mut inputs = Vec::with_capacity(items.len());
        let mut labels = Vec::with_capacity(items.len());

        for item in items {
            let shape = Shape::new([1, item.height, item.width]);
            inputs.push(Tensor::<B, 3>::from_data(
                TensorData::new(item.input, shape.clone()).convert::<B::FloatElem>(),
                &self.device,
            ));
            labels.push(Tensor::<B, 3>::from_data(
                TensorData::new(item.label, shape).convert::<B::FloatElem>(),
                &self.device,
            ));
        }

        SegBatch {
            inputs: Tensor::stack::<4>(inputs, 0),
            labels: Tensor::stack::<4>(labels, 0),
        }
    }
}
