// src/compression/mod.rs
//! Unified compression/decompression utilities
//!
//! Provides the pluggable codec used for reassembled archives (gzip, xz,
//! zstd or plain tar) and the decoders needed to read compressed files from
//! the local package database.

use std::io::{self, Read, Write};
use thiserror::Error;

/// Zstd level for package archives
const ZSTD_LEVEL: i32 = 19;

/// XZ preset for package archives (matches the `xz` tool default)
const XZ_PRESET: u32 = 6;

/// Compression-related errors
#[derive(Error, Debug)]
pub enum CompressionError {
    #[error("Failed to create {format} encoder: {source}")]
    EncoderCreation {
        format: &'static str,
        source: io::Error,
    },

    #[error("Failed to create {format} decoder: {source}")]
    DecoderCreation {
        format: &'static str,
        source: io::Error,
    },

    #[error("Failed to decompress {format} data: {source}")]
    Decompression {
        format: &'static str,
        source: io::Error,
    },

    #[error("Unsupported compression format: {0}")]
    UnsupportedFormat(String),
}

/// Supported compression formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompressionFormat {
    /// No compression (raw data)
    None,
    /// Gzip compression (.gz)
    Gzip,
    /// XZ/LZMA compression (.xz)
    #[default]
    Xz,
    /// Zstandard compression (.zst)
    Zstd,
}

impl CompressionFormat {
    /// Parse a codec name as accepted on the command line and in config files
    ///
    /// # Examples
    /// ```
    /// use pacrepack::compression::CompressionFormat;
    ///
    /// assert_eq!(CompressionFormat::from_name("xz").unwrap(), CompressionFormat::Xz);
    /// assert_eq!(CompressionFormat::from_name("zst").unwrap(), CompressionFormat::Zstd);
    /// assert!(CompressionFormat::from_name("bzip2").is_err());
    /// ```
    pub fn from_name(name: &str) -> Result<Self, CompressionError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "none" | "tar" => Ok(Self::None),
            "gz" | "gzip" => Ok(Self::Gzip),
            "xz" | "lzma" => Ok(Self::Xz),
            "zst" | "zstd" => Ok(Self::Zstd),
            other => Err(CompressionError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Detect compression format from magic bytes
    ///
    /// Inspects the first few bytes of data to identify the compression format.
    ///
    /// Magic bytes:
    /// - Gzip: `1f 8b`
    /// - XZ: `fd 37 7a 58 5a 00` (FD + "7zXZ" + NUL)
    /// - Zstd: `28 b5 2f fd`
    pub fn from_magic_bytes(data: &[u8]) -> Self {
        if data.starts_with(&[0x1f, 0x8b]) {
            Self::Gzip
        } else if data.starts_with(&[0xfd, 0x37, 0x7a, 0x58, 0x5a, 0x00]) {
            Self::Xz
        } else if data.starts_with(&[0x28, 0xb5, 0x2f, 0xfd]) {
            Self::Zstd
        } else {
            Self::None
        }
    }

    /// Get the file extension for this format, including the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::None => "",
            Self::Gzip => ".gz",
            Self::Xz => ".xz",
            Self::Zstd => ".zst",
        }
    }

    /// Get a human-readable name for this format
    pub fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Gzip => "gzip",
            Self::Xz => "xz",
            Self::Zstd => "zstd",
        }
    }
}

impl std::fmt::Display for CompressionFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A compressing writer for one of the supported formats
///
/// Must be closed with [`Encoder::finish`] so the trailing frame is written
/// and any error surfaces; dropping it may leave a truncated stream.
pub enum Encoder<W: Write> {
    None(W),
    Gzip(flate2::write::GzEncoder<W>),
    Xz(xz2::write::XzEncoder<W>),
    Zstd(zstd::Encoder<'static, W>),
}

impl<W: Write> Encoder<W> {
    /// Flush the codec trailer and return the inner writer
    pub fn finish(self) -> io::Result<W> {
        match self {
            Self::None(mut writer) => {
                writer.flush()?;
                Ok(writer)
            }
            Self::Gzip(encoder) => encoder.finish(),
            Self::Xz(encoder) => encoder.finish(),
            Self::Zstd(encoder) => encoder.finish(),
        }
    }
}

impl<W: Write> Write for Encoder<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Self::None(writer) => writer.write(buf),
            Self::Gzip(encoder) => encoder.write(buf),
            Self::Xz(encoder) => encoder.write(buf),
            Self::Zstd(encoder) => encoder.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::None(writer) => writer.flush(),
            Self::Gzip(encoder) => encoder.flush(),
            Self::Xz(encoder) => encoder.flush(),
            Self::Zstd(encoder) => encoder.flush(),
        }
    }
}

/// Create a compressing writer for the given format
pub fn create_encoder<W: Write>(
    writer: W,
    format: CompressionFormat,
) -> Result<Encoder<W>, CompressionError> {
    match format {
        CompressionFormat::None => Ok(Encoder::None(writer)),
        CompressionFormat::Gzip => Ok(Encoder::Gzip(flate2::write::GzEncoder::new(
            writer,
            flate2::Compression::default(),
        ))),
        CompressionFormat::Xz => Ok(Encoder::Xz(xz2::write::XzEncoder::new(writer, XZ_PRESET))),
        CompressionFormat::Zstd => {
            let encoder =
                zstd::Encoder::new(writer, ZSTD_LEVEL).map_err(|e| CompressionError::EncoderCreation {
                    format: "zstd",
                    source: e,
                })?;
            Ok(Encoder::Zstd(encoder))
        }
    }
}

/// Create a decompressing reader for the given format
///
/// Returns a boxed `Read` implementation that decompresses data on the fly.
/// For `CompressionFormat::None`, returns the reader unchanged.
pub fn create_decoder<'a, R: Read + 'a>(
    reader: R,
    format: CompressionFormat,
) -> Result<Box<dyn Read + 'a>, CompressionError> {
    match format {
        CompressionFormat::None => Ok(Box::new(reader)),
        CompressionFormat::Gzip => Ok(Box::new(flate2::read::GzDecoder::new(reader))),
        CompressionFormat::Xz => Ok(Box::new(xz2::read::XzDecoder::new(reader))),
        CompressionFormat::Zstd => {
            let decoder = zstd::Decoder::new(reader).map_err(|e| CompressionError::DecoderCreation {
                format: "zstd",
                source: e,
            })?;
            Ok(Box::new(decoder))
        }
    }
}

/// Decompress a byte slice to a Vec
///
/// Detects the format from magic bytes; unrecognized data is returned as is.
pub fn decompress_auto(data: &[u8]) -> Result<Vec<u8>, CompressionError> {
    let format = CompressionFormat::from_magic_bytes(data);
    decompress(data, format)
}

/// Decompress a byte slice using the specified format
pub fn decompress(data: &[u8], format: CompressionFormat) -> Result<Vec<u8>, CompressionError> {
    let mut decoder = create_decoder(data, format)?;
    let mut output = Vec::new();
    decoder
        .read_to_end(&mut output)
        .map_err(|e| CompressionError::Decompression {
            format: format.name(),
            source: e,
        })?;
    Ok(output)
}
