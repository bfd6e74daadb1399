use burn::{nn::conv::{Conv2d, Conv2dConfig}, prelude::*};

use super::blocks::{
    ConvBlock, ConvBlockConfig, DecoderBlock, DecoderBlockConfig, EncoderBlock, EncoderBlockConfig,
};

/// Fixed-depth U-Net for binary segmentation: four encoder stages, a
/// bottleneck, four decoder stages with skip connections, and a 1x1 output
/// conv. The forward pass returns the raw per-pixel logit map; the loss and
/// the mask threshold both operate downstream of it.
#[derive(Module, Debug)]
pub struct UNet<B: Backend> {
    encoder_block_1: EncoderBlock<B>,
    encoder_block_2: EncoderBlock<B>,
    encoder_block_3: EncoderBlock<B>,
    encoder_block_4: EncoderBlock<B>,
    bottleneck: ConvBlock<B>,
    decoder_block_1: DecoderBlock<B>,
    decoder_block_2: DecoderBlock<B>,
    decoder_block_3: DecoderBlock<B>,
    decoder_block_4: DecoderBlock<B>,
    conv_1x1: Conv2d<B>,
}

#[derive(Config, Debug)]
pub struct UNetConfig {
    #[config(default = "1")]
    in_channels: usize,
    #[config(default = "64")]
    base_channels: usize,
}

impl UNetConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> UNet<B> {
        UNet {
            encoder_block_1: EncoderBlockConfig::new(ConvBlockConfig::new(
                self.in_channels,
                self.base_channels,
            ))
            .init(device),
            encoder_block_2: EncoderBlockConfig::new(ConvBlockConfig::new(
                self.base_channels,
                self.base_channels * 2,
            ))
            .init(device),
            encoder_block_3: EncoderBlockConfig::new(ConvBlockConfig::new(
                self.base_channels * 2,
                self.base_channels * 4,
            ))
            .init(device),
            encoder_block_4: EncoderBlockConfig::new(ConvBlockConfig::new(
                self.base_channels * 4,
                self.base_channels * 8,
            ))
            .init(device),
            bottleneck: ConvBlockConfig::new(self.base_channels * 8, self.base_channels * 16)
                .init(device),
            decoder_block_1: DecoderBlockConfig::new(
                self.base_channels * 16,
                self.base_channels * 8,
                ConvBlockConfig::new(self.base_channels * 16, self.base_channels * 8),
            )
            .init(device),
            decoder_block_2: DecoderBlockConfig::new(
                self.base_channels * 8,
                self.base_channels * 4,
                ConvBlockConfig::new(self.base_channels * 8, self.base_channels * 4),
            )
            .init(device),
            decoder_block_3: DecoderBlockConfig::new(
                self.base_channels * 4,
                self.base_channels * 2,
                ConvBlockConfig::new(self.base_channels * 4, self.base_channels * 2),
            )
            .init(device),
            decoder_block_4: DecoderBlockConfig::new(
                self.base_channels * 2,
                self.base_channels,
                ConvBlockConfig::new(self.base_channels * 2, self.base_channels),
            )
            .init(device),
            conv_1x1: Conv2dConfig::new([self.base_channels, 1], [1, 1]).init(device),
        }
    }
}

impl<B: Backend> UNet<B> {
    /// Input: B x C x H x W with H and W divisible by 16. Output: B x 1 x H x W
    /// unnormalized scores.
    pub fn forward(&self, images: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = images;

        let (x, skip_features_1) = self.encoder_block_1.forward(x);
        let (x, skip_features_2) = self.encoder_block_2.forward(x);
        let (x, skip_features_3) = self.encoder_block_3.forward(x);
        let (x, skip_features_4) = self.encoder_block_4.forward(x);

        let x = self.bottleneck.forward(x);

        let x = self.decoder_block_1.forward(x, skip_features_4);
        let x = self.decoder_block_2.forward(x, skip_features_3);
        let x = self.decoder_block_3.forward(x, skip_features_2);
        let x = self.decoder_block_4.forward(x, skip_features_1);

        self.conv_1x1.forward(x)
    }
}
