//! Artifact writers: PNG renditions and raw array dumps of [`HostArray`]
//! samples. Shared by the metrics sink and the inference exporter.

use std::path::Path;

use image::{GrayImage, RgbImage};
use thiserror::Error;

use crate::post::HostArray;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("encode error: {0}")]
    Encode(#[from] bincode::error::EncodeError),

    #[error("unsupported channel count for PNG export: {0}")]
    UnsupportedChannels(usize),
}

/// On-disk layout of a raw array dump (one sample, channel-last).
#[derive(Debug, Clone, PartialEq, bincode::Encode, bincode::Decode)]
pub struct ArrayDump {
    pub height: u32,
    pub width: u32,
    pub channels: u32,
    pub data: Vec<f32>,
}

fn to_byte(value: f32) -> u8 {
    (value.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Write one sample of the array as a PNG, grayscale for one channel and RGB
/// for three.
pub fn write_sample_png(
    path: &Path,
    array: &HostArray,
    sample: usize,
) -> Result<(), ExportError> {
    let (height, width) = (array.height() as u32, array.width() as u32);
    match array.channels() {
        1 => {
            let image = GrayImage::from_fn(width, height, |x, y| {
                image::Luma([to_byte(array.value(sample, y as usize, x as usize, 0))])
            });
            image.save(path)?;
        }
        3 => {
            let image = RgbImage::from_fn(width, height, |x, y| {
                let pixel = |c| to_byte(array.value(sample, y as usize, x as usize, c));
                image::Rgb([pixel(0), pixel(1), pixel(2)])
            });
            image.save(path)?;
        }
        channels => return Err(ExportError::UnsupportedChannels(channels)),
    }
    Ok(())
}

/// Write the whole batch as one horizontally tiled grayscale PNG (sample i
/// occupies columns [i*W, (i+1)*W)). Used for metric image snapshots.
pub fn write_batch_png(path: &Path, array: &HostArray) -> Result<(), ExportError> {
    if array.channels() != 1 {
        return Err(ExportError::UnsupportedChannels(array.channels()));
    }
    let (batch, height, width) = (array.batch_size(), array.height(), array.width());
    let image = GrayImage::from_fn((batch * width) as u32, height as u32, |x, y| {
        let x = x as usize;
        image::Luma([to_byte(array.value(x / width, y as usize, x % width, 0))])
    });
    image.save(path)?;
    Ok(())
}

/// Dump one sample as a bincode-encoded [`ArrayDump`].
pub fn write_sample_array(
    path: &Path,
    array: &HostArray,
    sample: usize,
) -> Result<(), ExportError> {
    let dump = ArrayDump {
        height: array.height() as u32,
        width: array.width() as u32,
        channels: array.channels() as u32,
        data: array.sample(sample).to_vec(),
    };
    let bytes = bincode::encode_to_vec(&dump, bincode::config::standard())?;
    std::fs::write(path, bytes)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn checkerboard(batch: usize) -> HostArray {
        let mut data = Vec::new();
        for _ in 0..batch {
            for y in 0..4 {
                for x in 0..4 {
                    data.push(((x + y) % 2) as f32);
                }
            }
        }
        HostArray::new([batch, 4, 4, 1], data)
    }

    #[test]
    fn sample_png_round_trips_through_image_crate() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output_0000.png");
        write_sample_png(&path, &checkerboard(1), 0).unwrap();

        let image = image::open(&path).unwrap().into_luma8();
        assert_eq!(image.dimensions(), (4, 4));
        assert_eq!(image.get_pixel(0, 0).0[0], 0);
        assert_eq!(image.get_pixel(1, 0).0[0], 255);
    }

    #[test]
    fn batch_png_tiles_horizontally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("label-000001.png");
        write_batch_png(&path, &checkerboard(3)).unwrap();

        let image = image::open(&path).unwrap().into_luma8();
        assert_eq!(image.dimensions(), (12, 4));
    }

    #[test]
    fn array_dump_decodes_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output_0000.np");
        let array = checkerboard(2);
        write_sample_array(&path, &array, 1).unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let (dump, _): (ArrayDump, usize) =
            bincode::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(dump.height, 4);
        assert_eq!(dump.width, 4);
        assert_eq!(dump.channels, 1);
        assert_eq!(dump.data, array.sample(1));
    }

    #[test]
    fn rejects_unsupported_channel_counts() {
        let dir = tempfile::tempdir().unwrap();
        let array = HostArray::new([1, 2, 2, 2], vec![0.0; 8]);
        let result = write_sample_png(&dir.path().join("bad.png"), &array, 0);
        assert!(matches!(result, Err(ExportError::UnsupportedChannels(2))));
    }
}
