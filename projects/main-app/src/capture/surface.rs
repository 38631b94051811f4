use image::{ExtendedColorType, RgbImage, codecs::jpeg::JpegEncoder};

use crate::core::errors::CycleError;

const CHANNELS: usize = 3;

/// Off-screen RGB8 buffer the current video frame is drawn into before
/// upload. Resizing reuses the backing allocation.
#[derive(Debug, Default)]
pub struct CaptureSurface {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

impl CaptureSurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Sets the surface size and clears it to black.
    pub fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels
            .resize(width as usize * height as usize * CHANNELS, 0);
    }

    /// Copies `frame` with its top-left corner at the origin. Anything outside
    /// the surface is dropped.
    pub fn draw(&mut self, frame: &RgbImage) {
        let cols = frame.width().min(self.width) as usize;
        let rows = frame.height().min(self.height) as usize;
        if cols == 0 {
            return;
        }

        let src_stride = frame.width() as usize * CHANNELS;
        let dst_stride = self.width as usize * CHANNELS;
        let row_bytes = cols * CHANNELS;
        let src = frame.as_raw();
        for row in 0..rows {
            let src_start = row * src_stride;
            let dst_start = row * dst_stride;
            self.pixels[dst_start..dst_start + row_bytes]
                .copy_from_slice(&src[src_start..src_start + row_bytes]);
        }
    }

    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>, CycleError> {
        if self.width == 0 || self.height == 0 {
            return Err(CycleError::EmptyFrame);
        }

        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode(self.pixels(), self.width, self.height, ExtendedColorType::Rgb8)
            .map_err(CycleError::Encode)?;
        Ok(out)
    }
}
