//! Image preprocessing for traffic-sign model inference.
//!
//! Turns uploaded image bytes into the NCHW float tensor the exported
//! network expects. The transforms mirror the ones applied at training time.

use image::{imageops::FilterType, DynamicImage, ImageError};

/// ImageNet normalization mean values (RGB)
pub const IMAGENET_MEAN: [f32; 3] = [0.485, 0.456, 0.406];
/// ImageNet normalization std values (RGB)
pub const IMAGENET_STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Decode an uploaded image. The format is detected from the content.
pub fn decode_image(bytes: &[u8]) -> Result<DynamicImage, ImageError> {
    image::load_from_memory(bytes)
}

/// Converts decoded images into model input tensors.
#[derive(Debug, Clone)]
pub struct ImagePreprocessor {
    /// Target width and height
    image_size: u32,
    /// Apply ImageNet mean/std normalization after scaling to [0, 1]
    normalize: bool,
}

impl ImagePreprocessor {
    pub fn new(image_size: u32, normalize: bool) -> Self {
        Self {
            image_size,
            normalize,
        }
    }

    /// Input shape as `[batch, channels, height, width]`
    pub fn input_shape(&self) -> [i64; 4] {
        let size = self.image_size as i64;
        [1, 3, size, size]
    }

    /// Produce the flattened CHW tensor data for one image.
    ///
    /// All red values come first, then green, then blue.
    pub fn tensor_data(&self, image: &DynamicImage) -> Vec<f32> {
        let resized = image.resize_exact(self.image_size, self.image_size, FilterType::Triangle);
        let rgb = resized.to_rgb8();
        let num_pixels = (self.image_size * self.image_size) as usize;

        let mut data = vec![0.0f32; 3 * num_pixels];

        for (i, pixel) in rgb.pixels().enumerate() {
            for c in 0..3 {
                let mut value = pixel[c] as f32 / 255.0;
                if self.normalize {
                    value = (value - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
                }
                data[c * num_pixels + i] = value;
            }
        }

        data
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgb, RgbImage};
    use std::io::Cursor;

    fn solid_image(width: u32, height: u32, color: [u8; 3]) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb(color)))
    }

    #[test]
    fn test_tensor_shape() {
        let preprocessor = ImagePreprocessor::new(32, true);
        let data = preprocessor.tensor_data(&solid_image(64, 48, [10, 20, 30]));

        assert_eq!(preprocessor.input_shape(), [1, 3, 32, 32]);
        assert_eq!(data.len(), 3 * 32 * 32);
    }

    #[test]
    fn test_channel_layout_without_normalization() {
        let preprocessor = ImagePreprocessor::new(4, false);
        let data = preprocessor.tensor_data(&solid_image(4, 4, [255, 0, 51]));
        let plane = 16;

        assert!(data[..plane].iter().all(|&v| (v - 1.0).abs() < 1e-6));
        assert!(data[plane..2 * plane].iter().all(|&v| v.abs() < 1e-6));
        assert!(data[2 * plane..].iter().all(|&v| (v - 0.2).abs() < 1e-6));
    }

    #[test]
    fn test_imagenet_normalization() {
        let preprocessor = ImagePreprocessor::new(2, true);
        let data = preprocessor.tensor_data(&solid_image(2, 2, [0, 0, 0]));

        let expected_red = -IMAGENET_MEAN[0] / IMAGENET_STD[0];
        assert!((data[0] - expected_red).abs() < 1e-5);
    }

    #[test]
    fn test_decode_png() {
        let mut bytes = Vec::new();
        solid_image(8, 8, [1, 2, 3])
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        let decoded = decode_image(&bytes).unwrap();
        assert_eq!(decoded.width(), 8);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode_image(b"definitely not an image").is_err());
    }
}
