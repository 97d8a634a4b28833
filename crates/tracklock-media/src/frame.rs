//! Decoded frames and the capture-side decoder.
//!
//! The capture source delivers encoded stills (JPEG from the camera reader).
//! [`FrameDecoder`] turns them into [`Frame`]s at the processing size:
//! decode, rotate a landscape sensor image into the portrait preview
//! orientation, then resize.

use crate::config::TrackingConfig;
use crate::error::{TrackError, TrackResult};
use image::imageops::{self, FilterType};
use image::{GrayImage, RgbImage};
use tracing::trace;
use tracklock_models::Extent;

/// One decoded image, valid for a single processing cycle.
///
/// Frames are moved from the capture path into the pipeline and dropped
/// once the cycle is over.
#[derive(Debug)]
pub struct Frame {
    image: RgbImage,
    sequence: u64,
}

impl Frame {
    pub fn new(image: RgbImage, sequence: u64) -> Self {
        Self { image, sequence }
    }

    /// Build a frame from a grayscale image (replicated into three channels).
    pub fn from_luma(gray: &GrayImage, sequence: u64) -> Self {
        let image = RgbImage::from_fn(gray.width(), gray.height(), |x, y| {
            let v = gray.get_pixel(x, y)[0];
            image::Rgb([v, v, v])
        });
        Self { image, sequence }
    }

    pub fn image(&self) -> &RgbImage {
        &self.image
    }

    /// Capture order of this frame.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn extent(&self) -> Extent {
        Extent::new(self.image.width(), self.image.height())
    }

    /// Grayscale copy for intensity-based matching.
    pub fn luma(&self) -> GrayImage {
        imageops::grayscale(&self.image)
    }
}

/// Decodes and orients captured stills into processing frames.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    target: Extent,
    rotate: bool,
}

impl FrameDecoder {
    pub fn new(target: Extent, rotate: bool) -> Self {
        Self { target, rotate }
    }

    pub fn from_config(config: &TrackingConfig) -> Self {
        Self::new(config.frame_extent, config.rotate_frames)
    }

    pub fn target(&self) -> Extent {
        self.target
    }

    /// Decode an encoded still (JPEG, PNG, ...) into a frame.
    ///
    /// Empty input means the reader had nothing to deliver.
    pub fn decode(&self, bytes: &[u8], sequence: u64) -> TrackResult<Frame> {
        if bytes.is_empty() {
            return Err(TrackError::CaptureUnavailable);
        }
        let image = image::load_from_memory(bytes)?.to_rgb8();
        self.prepare(image, sequence)
    }

    /// Orient and resize an already decoded image.
    pub fn prepare(&self, image: RgbImage, sequence: u64) -> TrackResult<Frame> {
        if self.target.is_empty() {
            return Err(TrackError::invalid_geometry(format!(
                "frame target extent {} has a zero side",
                self.target
            )));
        }
        if image.width() == 0 || image.height() == 0 {
            return Err(TrackError::CaptureUnavailable);
        }

        // Transpose + horizontal flip is a clockwise quarter turn.
        let oriented = if self.rotate {
            imageops::rotate90(&image)
        } else {
            image
        };

        let resized = if oriented.width() == self.target.width
            && oriented.height() == self.target.height
        {
            oriented
        } else {
            imageops::resize(
                &oriented,
                self.target.width,
                self.target.height,
                FilterType::Triangle,
            )
        };

        trace!(sequence, extent = %self.target, "Frame prepared");
        Ok(Frame::new(resized, sequence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, ImageOutputFormat, Rgb};
    use std::io::Cursor;

    fn encode_png(image: &RgbImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageRgb8(image.clone())
            .write_to(&mut Cursor::new(&mut buf), ImageOutputFormat::Png)
            .unwrap();
        buf
    }

    #[test]
    fn test_rotation_is_clockwise_quarter_turn() {
        // 4 wide, 2 tall; mark the top-left pixel
        let mut image = RgbImage::from_pixel(4, 2, Rgb([0, 0, 0]));
        image.put_pixel(0, 0, Rgb([255, 0, 0]));

        let decoder = FrameDecoder::new(Extent::new(2, 4), true);
        let frame = decoder.decode(&encode_png(&image), 7).unwrap();

        assert_eq!(frame.extent(), Extent::new(2, 4));
        assert_eq!(frame.sequence(), 7);
        // Top-left moves to top-right
        assert_eq!(frame.image().get_pixel(1, 0), &Rgb([255, 0, 0]));
        assert_eq!(frame.image().get_pixel(0, 0), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_resize_to_target() {
        let image = RgbImage::from_pixel(64, 48, Rgb([10, 20, 30]));
        let decoder = FrameDecoder::new(Extent::new(240, 320), true);
        let frame = decoder.prepare(image, 0).unwrap();
        assert_eq!(frame.extent(), Extent::new(240, 320));
    }

    #[test]
    fn test_empty_bytes_is_capture_unavailable() {
        let decoder = FrameDecoder::new(Extent::new(240, 320), false);
        assert!(matches!(
            decoder.decode(&[], 0),
            Err(TrackError::CaptureUnavailable)
        ));
    }

    #[test]
    fn test_garbage_bytes_is_decode_error() {
        let decoder = FrameDecoder::new(Extent::new(240, 320), false);
        let err = decoder.decode(b"not an image", 0).unwrap_err();
        assert_eq!(err.kind(), "decode");
    }

    #[test]
    fn test_luma_frame() {
        let gray = GrayImage::from_pixel(3, 3, image::Luma([77]));
        let frame = Frame::from_luma(&gray, 1);
        assert_eq!(frame.image().get_pixel(2, 2), &Rgb([77, 77, 77]));
        assert_eq!(frame.luma().get_pixel(1, 1)[0], 77);
    }
}
