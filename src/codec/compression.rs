//! Block compression wrapper.
//!
//! Applied to the whole encoded message after type-directed encoding.
//!
//! Frame format:
//! ```text
//! +0  Flag (1 byte): 0x00 raw, 0x01 zstd
//! +1  Body (variable)
//! ```

use crate::core::*;

/// Compression configuration
#[derive(Debug, Clone)]
pub struct CompressionConfig {
    /// Minimum size to attempt compression
    pub min_size: usize,
    /// Compression level (1-22)
    pub level: i32,
    /// Maximum decompressed size
    pub max_decompressed_size: usize,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            min_size: MIN_COMPRESS_SIZE,
            level: DEFAULT_COMPRESSION_LEVEL,
            max_decompressed_size: DEFAULT_MAX_DECOMPRESSED_SIZE,
        }
    }
}

/// Compressor for message frames
#[derive(Debug, Clone, Default)]
pub struct Compressor {
    config: CompressionConfig,
}

impl Compressor {
    /// Create a new compressor with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a compressor with custom config
    pub fn with_config(config: CompressionConfig) -> Self {
        Self { config }
    }

    /// Set compression level
    pub fn set_level(&mut self, level: i32) {
        self.config.level = level.clamp(1, 22);
    }

    /// Get compression level
    pub fn level(&self) -> i32 {
        self.config.level
    }

    /// Active configuration
    pub fn config(&self) -> &CompressionConfig {
        &self.config
    }

    /// Compress data if it meets the minimum size threshold
    ///
    /// Returns the original data if compression isn't beneficial.
    pub fn compress(&self, data: &[u8]) -> Result<CompressResult, CompressionError> {
        if data.len() < self.config.min_size {
            return Ok(CompressResult::Uncompressed(data.to_vec()));
        }

        let compressed = self.encode_block(data)?;

        // Only use compression if it actually saves space
        match compressed {
            Some(compressed) if compressed.len() < data.len() => {
                Ok(CompressResult::Compressed(compressed))
            }
            _ => Ok(CompressResult::Uncompressed(data.to_vec())),
        }
    }

    #[cfg(feature = "compression")]
    fn encode_block(&self, data: &[u8]) -> Result<Option<Vec<u8>>, CompressionError> {
        zstd::encode_all(data, self.config.level)
            .map(Some)
            .map_err(|e| CompressionError::CompressionFailed(e.to_string()))
    }

    #[cfg(not(feature = "compression"))]
    fn encode_block(&self, _data: &[u8]) -> Result<Option<Vec<u8>>, CompressionError> {
        Ok(None)
    }

    /// Decompress data, bounded by the configured size limit
    pub fn decompress(&self, data: &[u8]) -> Result<Vec<u8>, CompressionError> {
        self.decompress_with_limit(data, self.config.max_decompressed_size)
    }

    /// Decompress data with explicit size limit
    #[cfg(feature = "compression")]
    pub fn decompress_with_limit(
        &self,
        data: &[u8],
        max_size: usize,
    ) -> Result<Vec<u8>, CompressionError> {
        use std::io::Read;

        let decoder = zstd::Decoder::new(data)
            .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;

        // Read one byte past the limit so an oversized payload is detected
        // without inflating all of it.
        let mut output = Vec::new();
        decoder
            .take(max_size as u64 + 1)
            .read_to_end(&mut output)
            .map_err(|e| CompressionError::DecompressionFailed(e.to_string()))?;

        if output.len() > max_size {
            return Err(CompressionError::SizeExceeded {
                size: output.len(),
                limit: max_size,
            });
        }

        Ok(output)
    }

    /// Decompress data with explicit size limit
    #[cfg(not(feature = "compression"))]
    pub fn decompress_with_limit(
        &self,
        _data: &[u8],
        _max_size: usize,
    ) -> Result<Vec<u8>, CompressionError> {
        Err(CompressionError::Unsupported)
    }

    /// Wrap an encoded message body into a frame.
    pub fn wrap(&self, body: &[u8], compress: bool) -> Result<Vec<u8>, CompressionError> {
        let result = if compress {
            self.compress(body)?
        } else {
            CompressResult::Uncompressed(body.to_vec())
        };

        let flag = if result.is_compressed() {
            FRAME_FLAG_ZSTD
        } else {
            FRAME_FLAG_RAW
        };
        let data = result.into_data();

        let mut frame = Vec::with_capacity(FRAME_HEADER_SIZE + data.len());
        frame.push(flag);
        frame.extend_from_slice(&data);
        Ok(frame)
    }

    /// Remove the frame wrapper and return the encoded body.
    pub fn unwrap_frame(&self, frame: &[u8]) -> Result<Vec<u8>, DecodeError> {
        let (&flag, body) = frame.split_first().ok_or(DecodeError::UnexpectedEof)?;
        match flag {
            FRAME_FLAG_RAW => Ok(body.to_vec()),
            FRAME_FLAG_ZSTD => Ok(self.decompress(body)?),
            other => Err(DecodeError::UnknownFrameFlag(other)),
        }
    }
}

/// Result of compression attempt
#[derive(Debug, Clone)]
pub enum CompressResult {
    /// Data was compressed
    Compressed(Vec<u8>),
    /// Data was not compressed (too small or compression not beneficial)
    Uncompressed(Vec<u8>),
}

impl CompressResult {
    /// Get the data bytes
    pub fn data(&self) -> &[u8] {
        match self {
            CompressResult::Compressed(data) => data,
            CompressResult::Uncompressed(data) => data,
        }
    }

    /// Check if data was compressed
    pub fn is_compressed(&self) -> bool {
        matches!(self, CompressResult::Compressed(_))
    }

    /// Consume and get the data
    pub fn into_data(self) -> Vec<u8> {
        match self {
            CompressResult::Compressed(data) => data,
            CompressResult::Uncompressed(data) => data,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compress_small_data() {
        let compressor = Compressor::new();
        let data = b"hello";

        let result = compressor.compress(data).unwrap();
        assert!(!result.is_compressed());
        assert_eq!(result.data(), data);
    }

    #[test]
    fn test_small_frame_is_raw() {
        let compressor = Compressor::new();
        let frame = compressor.wrap(b"hi", true).unwrap();
        assert_eq!(frame, vec![FRAME_FLAG_RAW, b'h', b'i']);
        assert_eq!(compressor.unwrap_frame(&frame).unwrap(), b"hi");
    }

    #[test]
    fn test_compression_disabled_by_caller() {
        let compressor = Compressor::new();
        let data = vec![0u8; 1000];
        let frame = compressor.wrap(&data, false).unwrap();
        assert_eq!(frame[0], FRAME_FLAG_RAW);
        assert_eq!(frame.len(), data.len() + FRAME_HEADER_SIZE);
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_frame_roundtrip_compressed() {
        let compressor = Compressor::new();
        let data: Vec<u8> = (0..2000).map(|i| (i % 256) as u8).collect();

        let frame = compressor.wrap(&data, true).unwrap();
        assert_eq!(frame[0], FRAME_FLAG_ZSTD);
        assert!(frame.len() < data.len());
        assert_eq!(compressor.unwrap_frame(&frame).unwrap(), data);
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_size_limit() {
        let compressor = Compressor::with_config(CompressionConfig {
            max_decompressed_size: 100,
            ..Default::default()
        });

        let data: Vec<u8> = vec![0; 200];
        let result = compressor.compress(&data).unwrap();
        assert!(result.is_compressed());

        let err = compressor.decompress(result.data());
        assert!(matches!(err, Err(CompressionError::SizeExceeded { .. })));
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_corrupt_zstd_frame() {
        let compressor = Compressor::new();
        let frame = vec![FRAME_FLAG_ZSTD, 0xde, 0xad, 0xbe, 0xef];
        assert!(matches!(
            compressor.unwrap_frame(&frame),
            Err(DecodeError::Compression(_))
        ));
    }

    #[test]
    fn test_unknown_flag() {
        let compressor = Compressor::new();
        assert_eq!(
            compressor.unwrap_frame(&[0x7f, 1, 2]),
            Err(DecodeError::UnknownFrameFlag(0x7f))
        );
        assert_eq!(compressor.unwrap_frame(&[]), Err(DecodeError::UnexpectedEof));
    }

    #[test]
    fn test_compression_level() {
        let mut compressor = Compressor::new();
        assert_eq!(compressor.level(), DEFAULT_COMPRESSION_LEVEL);

        compressor.set_level(10);
        assert_eq!(compressor.level(), 10);

        // Should clamp to valid range
        compressor.set_level(100);
        assert_eq!(compressor.level(), 22);

        compressor.set_level(0);
        assert_eq!(compressor.level(), 1);
    }
}
