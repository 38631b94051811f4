use std::io::Cursor;

use bytes::{Bytes, BytesMut};
use image::{ImageFormat, ImageReader};

const JPEG_SOI: [u8; 2] = [0xFF, 0xD8];
const JPEG_EOI: [u8; 2] = [0xFF, 0xD9];
const MAX_BUFFER_BYTES: usize = 4 * 1024 * 1024;

/// Pulls complete JPEG images out of an MJPEG byte stream. Multipart
/// boundaries and headers between images are discarded.
#[derive(Default)]
pub struct JpegFrameAccumulator {
    buffer: BytesMut,
}

impl JpegFrameAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds one chunk and returns the newest frame completed by it, if any.
    /// Older frames completed in the same chunk are skipped.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Option<Bytes> {
        self.buffer.extend_from_slice(chunk);
        if self.buffer.len() > MAX_BUFFER_BYTES {
            let overflow = self.buffer.len() - MAX_BUFFER_BYTES;
            let _ = self.buffer.split_to(overflow);
        }

        let mut newest = None;
        while let Some(start) = find_marker(&self.buffer, &JPEG_SOI) {
            let _ = self.buffer.split_to(start);
            let Some(end_rel) = find_marker(&self.buffer[2..], &JPEG_EOI) else {
                return newest;
            };
            newest = Some(self.buffer.split_to(end_rel + 4).freeze());
        }

        // No start marker left. Keep a trailing 0xFF in case the next chunk
        // begins with 0xD8.
        let keep_tail = self.buffer.last() == Some(&0xFF);
        self.buffer.clear();
        if keep_tail {
            self.buffer.extend_from_slice(&[0xFF]);
        }
        newest
    }
}

fn find_marker(buffer: &[u8], marker: &[u8; 2]) -> Option<usize> {
    buffer.windows(2).position(|w| w == marker)
}

/// Reads width and height from a JPEG header without decoding the scan data.
pub fn jpeg_dimensions(jpeg: &[u8]) -> Option<(u32, u32)> {
    let mut reader = ImageReader::new(Cursor::new(jpeg));
    reader.set_format(ImageFormat::Jpeg);
    reader.into_dimensions().ok()
}

#[cfg(test)]
pub(crate) fn encode_test_jpeg(width: u32, height: u32) -> Vec<u8> {
    use image::{ExtendedColorType, codecs::jpeg::JpegEncoder};

    let pixels = vec![128_u8; (width * height * 3) as usize];
    let mut out = Vec::new();
    JpegEncoder::new(&mut out)
        .encode(&pixels, width, height, ExtendedColorType::Rgb8)
        .expect("test jpeg should encode");
    out
}

#[cfg(test)]
mod tests {
    use super::{JpegFrameAccumulator, encode_test_jpeg, jpeg_dimensions};

    fn fake_jpeg(payload: &[u8]) -> Vec<u8> {
        let mut out = vec![0xFF, 0xD8];
        out.extend_from_slice(payload);
        out.extend_from_slice(&[0xFF, 0xD9]);
        out
    }

    #[test]
    fn strips_multipart_headers_around_frame() {
        let mut acc = JpegFrameAccumulator::new();
        let frame = fake_jpeg(b"abc");
        let mut chunk = b"--emocam\r\nContent-Type: image/jpeg\r\n\r\n".to_vec();
        chunk.extend_from_slice(&frame);
        chunk.extend_from_slice(b"\r\n");

        let out = acc.push_chunk(&chunk).expect("frame should be found");
        assert_eq!(&out[..], &frame[..]);
    }

    #[test]
    fn joins_frame_split_across_chunks() {
        let mut acc = JpegFrameAccumulator::new();
        let frame = fake_jpeg(b"hello-world");
        let (first, second) = frame.split_at(5);

        assert!(acc.push_chunk(first).is_none());
        let out = acc
            .push_chunk(second)
            .expect("frame should be reconstructed");
        assert_eq!(&out[..], &frame[..]);
    }

    #[test]
    fn start_marker_split_between_chunks_is_not_lost() {
        let mut acc = JpegFrameAccumulator::new();
        let frame = fake_jpeg(b"xyz");
        let mut first = b"boundary".to_vec();
        first.push(frame[0]);

        assert!(acc.push_chunk(&first).is_none());
        let out = acc.push_chunk(&frame[1..]).expect("frame should be found");
        assert_eq!(&out[..], &frame[..]);
    }

    #[test]
    fn returns_newest_of_several_frames() {
        let mut acc = JpegFrameAccumulator::new();
        let older = fake_jpeg(b"111");
        let newer = fake_jpeg(b"222");
        let mut chunk = older;
        chunk.extend_from_slice(&newer);

        let out = acc.push_chunk(&chunk).expect("frame should be found");
        assert_eq!(&out[..], &newer[..]);
    }

    #[test]
    fn reads_dimensions_from_real_jpeg() {
        let jpeg = encode_test_jpeg(32, 24);
        assert_eq!(jpeg_dimensions(&jpeg), Some((32, 24)));
        assert_eq!(jpeg_dimensions(&fake_jpeg(b"junk")), None);
    }
}
