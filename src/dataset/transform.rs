use rand::Rng;

pub const NORM_MEAN: f32 = 0.5;
pub const NORM_STD: f32 = 0.5;

/// One input/label pair on the host, single channel, values in [0, 1] before
/// normalization. Input and label always share spatial dimensions.
#[derive(Clone, Debug)]
pub struct SamplePair {
    pub input: Vec<f32>,
    pub label: Vec<f32>,
    pub height: usize,
    pub width: usize,
}

/// A per-sample transform. Normalization touches the input only; the label
/// stays in {0, 1}. Flips are applied identically to input and label so the
/// pair stays aligned.
#[derive(Clone, Debug)]
pub enum Transform {
    Normalize { mean: f32, std: f32 },
    RandomFlip,
}

impl Transform {
    fn apply(&self, mut sample: SamplePair) -> SamplePair {
        match self {
            Transform::Normalize { mean, std } => {
                normalize(&mut sample.input, *mean, *std);
                sample
            }
            Transform::RandomFlip => {
                let mut rng = rand::thread_rng();
                if rng.gen_bool(0.5) {
                    flip_horizontal(&mut sample.input, sample.height, sample.width);
                    flip_horizontal(&mut sample.label, sample.height, sample.width);
                }
                if rng.gen_bool(0.5) {
                    flip_vertical(&mut sample.input, sample.height, sample.width);
                    flip_vertical(&mut sample.label, sample.height, sample.width);
                }
                sample
            }
        }
    }
}

/// Ordered sequence of transforms applied on every dataset access.
#[derive(Clone, Debug, Default)]
pub struct TransformPipeline {
    transforms: Vec<Transform>,
}

impl TransformPipeline {
    pub fn new(transforms: Vec<Transform>) -> Self {
        Self { transforms }
    }

    /// Pipeline used for the train and val splits.
    pub fn training() -> Self {
        Self::new(vec![
            Transform::Normalize {
                mean: NORM_MEAN,
                std: NORM_STD,
            },
            Transform::RandomFlip,
        ])
    }

    /// Pipeline used for the test split: no augmentation.
    pub fn inference() -> Self {
        Self::new(vec![Transform::Normalize {
            mean: NORM_MEAN,
            std: NORM_STD,
        }])
    }

    pub fn apply(&self, sample: SamplePair) -> SamplePair {
        self.transforms
            .iter()
            .fold(sample, |sample, transform| transform.apply(sample))
    }
}

pub fn normalize(data: &mut [f32], mean: f32, std: f32) {
    for value in data.iter_mut() {
        *value = (*value - mean) / std;
    }
}

fn flip_horizontal(data: &mut [f32], height: usize, width: usize) {
    for y in 0..height {
        data[y * width..(y + 1) * width].reverse();
    }
}

fn flip_vertical(data: &mut [f32], height: usize, width: usize) {
    for y in 0..height / 2 {
        let opposite = height - 1 - y;
        for x in 0..width {
            data.swap(y * width + x, opposite * width + x);
        }
    }
}
