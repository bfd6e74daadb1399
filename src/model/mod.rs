mod blocks;
mod unet;

pub use blocks::{
    ConvBlock, ConvBlockConfig, DecoderBlock, DecoderBlockConfig, EncoderBlock, EncoderBlockConfig,
};

pub use unet::{UNet, UNetConfig};
