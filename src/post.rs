//! Post-processing helpers shared by the metrics sink and the inference
//! exporter. All functions here are pure: they copy tensor data to the host
//! and never touch the source tensor's storage or gradient graph.

use burn::prelude::*;
use derive_new::new;

/// Dense channel-last host array: dims are `[batch, height, width, channels]`.
#[derive(Debug, Clone, PartialEq)]
pub struct HostArray {
    pub dims: [usize; 4],
    pub data: Vec<f32>,
}

impl HostArray {
    pub fn new(dims: [usize; 4], data: Vec<f32>) -> Self {
        assert_eq!(
            dims.iter().product::<usize>(),
            data.len(),
            "HostArray dims {dims:?} do not match buffer length {}",
            data.len()
        );
        Self { dims, data }
    }

    pub fn batch_size(&self) -> usize {
        self.dims[0]
    }

    pub fn height(&self) -> usize {
        self.dims[1]
    }

    pub fn width(&self) -> usize {
        self.dims[2]
    }

    pub fn channels(&self) -> usize {
        self.dims[3]
    }

    pub fn value(&self, sample: usize, y: usize, x: usize, channel: usize) -> f32 {
        let [_, height, width, channels] = self.dims;
        self.data[((sample * height + y) * width + x) * channels + channel]
    }

    /// The flat buffer of one sample, channel-last.
    pub fn sample(&self, index: usize) -> &[f32] {
        let stride = self.height() * self.width() * self.channels();
        &self.data[index * stride..(index + 1) * stride]
    }

    fn map(mut self, f: impl Fn(f32) -> f32) -> Self {
        for value in self.data.iter_mut() {
            *value = f(*value);
        }
        self
    }
}

/// Detach a B x C x H x W tensor from the gradient graph, move it to host
/// memory, and permute to channel-last layout. The source tensor is left
/// untouched; callers pass a clone.
pub fn to_array<B: Backend>(tensor: Tensor<B, 4>) -> HostArray {
    let [batch, channels, height, width] = tensor.dims();
    let data = tensor
        .detach()
        .permute([0, 2, 3, 1])
        .into_data()
        .iter::<f32>()
        .collect();

    HostArray::new([batch, height, width, channels], data)
}

/// Inverse of the dataset normalization: `v * std + mean`.
pub fn denormalize(array: HostArray, mean: f32, std: f32) -> HostArray {
    array.map(|v| v * std + mean)
}

/// Hard mask via an indicator at 0.5. The threshold is applied to the raw
/// score map, not to sigmoid probabilities (0.5 here is ~0.62 after a
/// sigmoid); kept as-is rather than silently corrected.
pub fn binarize(array: HostArray) -> HostArray {
    array.map(|v| if v > 0.5 { 1.0 } else { 0.0 })
}

/// The label/input/output triple emitted at every logging and export site.
#[derive(Debug, Clone, new)]
pub struct Snapshot {
    pub label: HostArray,
    pub input: HostArray,
    pub output: HostArray,
}

impl Snapshot {
    /// Apply the standard conversion to one batch: labels copied out as-is,
    /// inputs denormalized back to pixel range, outputs thresholded to a hard
    /// mask.
    pub fn from_batch<B: Backend>(
        labels: Tensor<B, 4>,
        inputs: Tensor<B, 4>,
        outputs: Tensor<B, 4>,
        mean: f32,
        std: f32,
    ) -> Self {
        Snapshot {
            label: to_array(labels),
            input: denormalize(to_array(inputs), mean, std),
            output: binarize(to_array(outputs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    fn tensor_from(data: Vec<f32>, dims: [usize; 4]) -> Tensor<NdArray, 4> {
        Tensor::from_data(
            TensorData::new(data, Shape::new(dims)),
            &Default::default(),
        )
    }

    #[test]
    fn to_array_permutes_nchw_to_nhwc() {
        // One sample, 2 channels, 2x2: channel-first values 0..8.
        let tensor = tensor_from((0..8).map(|v| v as f32).collect(), [1, 2, 2, 2]);
        let array = to_array(tensor);

        assert_eq!(array.dims, [1, 2, 2, 2]);
        // (y=0, x=0) should hold channel values (0, 4).
        assert_eq!(array.value(0, 0, 0, 0), 0.0);
        assert_eq!(array.value(0, 0, 0, 1), 4.0);
        // (y=1, x=0) should hold (2, 6).
        assert_eq!(array.value(0, 1, 0, 0), 2.0);
        assert_eq!(array.value(0, 1, 0, 1), 6.0);
    }

    #[test]
    fn to_array_leaves_source_tensor_intact() {
        let tensor = tensor_from(vec![0.25; 16], [1, 1, 4, 4]);
        let before = tensor.to_data().to_vec::<f32>().unwrap();

        let _ = to_array(tensor.clone());

        let after = tensor.to_data().to_vec::<f32>().unwrap();
        assert_eq!(before, after);
    }

    #[test]
    fn denormalize_inverts_normalization() {
        let normalized = HostArray::new([1, 1, 2, 2], vec![-1.0, -0.5, 0.5, 1.0]);
        let restored = denormalize(normalized, 0.5, 0.5);
        assert_eq!(restored.data, vec![0.0, 0.25, 0.75, 1.0]);
    }

    #[test]
    fn binarize_is_idempotent() {
        let raw = HostArray::new([1, 1, 2, 3], vec![-2.0, 0.0, 0.5, 0.51, 3.0, 0.49]);
        let once = binarize(raw);
        assert_eq!(once.data, vec![0.0, 0.0, 0.0, 1.0, 1.0, 0.0]);
        let twice = binarize(once.clone());
        assert_eq!(once, twice);
    }

    #[test]
    fn snapshot_applies_the_full_pipeline() {
        let labels = tensor_from(vec![1.0, 0.0, 1.0, 0.0], [1, 1, 2, 2]);
        let inputs = tensor_from(vec![-1.0, 0.0, 0.0, 1.0], [1, 1, 2, 2]);
        let outputs = tensor_from(vec![-3.0, 0.4, 0.6, 5.0], [1, 1, 2, 2]);

        let snap = Snapshot::from_batch(labels, inputs, outputs, 0.5, 0.5);
        assert_eq!(snap.label.data, vec![1.0, 0.0, 1.0, 0.0]);
        assert_eq!(snap.input.data, vec![0.0, 0.5, 0.5, 1.0]);
        assert_eq!(snap.output.data, vec![0.0, 0.0, 1.0, 1.0]);
    }
}
