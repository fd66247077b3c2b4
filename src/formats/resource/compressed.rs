//! Block-compressed container framing
//!
//! Compressed containers start with the `RSCC` magic, then one of two
//! header shapes, then per-block compressed sizes and the blocks
//! themselves. All framing integers are little-endian. Two of the block
//! codecs (deflate and gzip) are decode-only here; saving re-wraps with
//! zstd when the original used it and degrades to a plain container
//! otherwise.

use std::io::Read;

use super::COMPRESSED_MAGIC;
use super::cursor::{Reader, Writer};
use crate::error::{Error, Result};

pub(crate) const MODE_DEFLATE: u32 = 1;
pub(crate) const MODE_ZSTD: u32 = 2;
pub(crate) const MODE_GZIP: u32 = 3;

/// Block size used by every known writer of this framing.
const DEFAULT_BLOCK_SIZE: u32 = 4096;

/// Shape of the compressed-container header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressedHeader {
    /// `mode, block_size, total_size: u32`. Identified by the leading
    /// word pair equalling `(2, 4096)`.
    Compact,
    /// `version, mode, block_size, total_size: u64`.
    Standard { version: u32 },
}

/// Compression framing recorded at decode time, so a save can re-wrap
/// the container the same way.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompressionInfo {
    pub header: CompressedHeader,
    pub mode: u32,
    pub block_size: u32,
}

/// Unwrap the optional compressed framing, returning the plain stream
/// and the framing parameters when one was present.
pub(crate) fn unwrap_container(data: &[u8]) -> Result<(Vec<u8>, Option<CompressionInfo>)> {
    if data.len() < 4 {
        return Err(Error::TruncatedInput);
    }
    if data[..4] != COMPRESSED_MAGIC {
        return Ok((data.to_vec(), None));
    }

    let mut r = Reader::new(data);
    r.skip(4);

    // Disambiguate the header shape by peeking the first two words
    let peek_pos = r.position() as u64;
    let word0 = r.get_u32()?;
    let word1 = r.get_u32()?;
    r.seek(peek_pos);

    let (header, mode, block_size, total_size) = if (word0, word1) == (MODE_ZSTD, DEFAULT_BLOCK_SIZE)
    {
        let mode = r.get_u32()?;
        let block_size = r.get_u32()?;
        let total_size = u64::from(r.get_u32()?);
        (CompressedHeader::Compact, mode, block_size, total_size)
    } else {
        let version = r.get_u32()?;
        let mode = r.get_u32()?;
        let block_size = r.get_u32()?;
        let total_size = r.get_u64()?;
        (CompressedHeader::Standard { version }, mode, block_size, total_size)
    };

    if block_size == 0 {
        return Err(Error::DecompressionFailed {
            message: "zero block size".into(),
        });
    }

    let block_count = total_size.div_ceil(u64::from(block_size)) as usize;
    let mut block_sizes = Vec::with_capacity(block_count);
    for _ in 0..block_count {
        block_sizes.push(r.get_u32()? as usize);
    }

    let mut plain = Vec::with_capacity(total_size as usize);
    for compressed_size in block_sizes {
        let block = r.get_bytes(compressed_size)?;
        plain.extend_from_slice(&decompress_block(mode, &block)?);
    }

    if plain.len() as u64 != total_size {
        return Err(Error::DecompressionFailed {
            message: format!(
                "decompressed {} bytes, header declared {total_size}",
                plain.len()
            ),
        });
    }

    let info = CompressionInfo {
        header,
        mode,
        block_size,
    };
    Ok((plain, Some(info)))
}

/// Whether a save can reproduce this framing. Only zstd has write
/// support; everything else degrades to a plain container.
pub(crate) fn can_rewrap(info: &CompressionInfo) -> bool {
    info.mode == MODE_ZSTD && cfg!(feature = "zstd")
}

/// Re-wrap a plain stream with the framing recorded at decode time,
/// recomputing per-block compressed sizes.
pub(crate) fn rewrap_container(plain: &[u8], info: &CompressionInfo) -> Result<Vec<u8>> {
    let mut w = Writer::new();
    w.write(&COMPRESSED_MAGIC)?;

    match info.header {
        CompressedHeader::Compact => {
            w.store_u32(info.mode)?;
            w.store_u32(info.block_size)?;
            w.store_u32(plain.len() as u32)?;
        }
        CompressedHeader::Standard { version } => {
            w.store_u32(version)?;
            w.store_u32(info.mode)?;
            w.store_u32(info.block_size)?;
            w.store_u64(plain.len() as u64)?;
        }
    }

    let blocks: Vec<Vec<u8>> = plain
        .chunks(info.block_size as usize)
        .map(|chunk| compress_block(info.mode, chunk))
        .collect::<Result<_>>()?;

    for block in &blocks {
        w.store_u32(block.len() as u32)?;
    }
    for block in &blocks {
        w.write(block)?;
    }
    Ok(w.into_bytes())
}

fn decompress_block(mode: u32, data: &[u8]) -> Result<Vec<u8>> {
    match mode {
        MODE_DEFLATE => {
            let mut out = Vec::new();
            flate2::read::ZlibDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| Error::DecompressionFailed {
                    message: format!("deflate: {e}"),
                })?;
            Ok(out)
        }
        MODE_ZSTD => decompress_zstd(data),
        MODE_GZIP => {
            let mut out = Vec::new();
            flate2::read::GzDecoder::new(data)
                .read_to_end(&mut out)
                .map_err(|e| Error::DecompressionFailed {
                    message: format!("gzip: {e}"),
                })?;
            Ok(out)
        }
        other => Err(Error::UnsupportedCompressionMode { mode: other }),
    }
}

fn compress_block(mode: u32, data: &[u8]) -> Result<Vec<u8>> {
    match mode {
        MODE_ZSTD => compress_zstd(data),
        other => Err(Error::UnsupportedCompressionMode { mode: other }),
    }
}

#[cfg(feature = "zstd")]
fn decompress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::decode_all(data).map_err(|e| Error::DecompressionFailed {
        message: format!("zstd: {e}"),
    })
}

#[cfg(not(feature = "zstd"))]
fn decompress_zstd(_data: &[u8]) -> Result<Vec<u8>> {
    Err(Error::UnsupportedCompressionMode { mode: MODE_ZSTD })
}

#[cfg(feature = "zstd")]
fn compress_zstd(data: &[u8]) -> Result<Vec<u8>> {
    zstd::stream::encode_all(data, zstd::DEFAULT_COMPRESSION_LEVEL).map_err(|e| {
        Error::DecompressionFailed {
            message: format!("zstd: {e}"),
        }
    })
}

#[cfg(not(feature = "zstd"))]
fn compress_zstd(_data: &[u8]) -> Result<Vec<u8>> {
    Err(Error::UnsupportedCompressionMode { mode: MODE_ZSTD })
}

/// Build a standard-header mode-1 wrapper around `plain` (test fixture;
/// deflate has no write support in the public API).
#[cfg(test)]
pub(crate) fn wrap_deflate(plain: &[u8], block_size: u32) -> Vec<u8> {
    use std::io::Write as _;

    let blocks: Vec<Vec<u8>> = plain
        .chunks(block_size as usize)
        .map(|chunk| {
            let mut encoder =
                flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
            encoder.write_all(chunk).unwrap();
            encoder.finish().unwrap()
        })
        .collect();

    let mut w = Writer::new();
    w.write(&COMPRESSED_MAGIC).unwrap();
    w.store_u32(0).unwrap(); // version
    w.store_u32(MODE_DEFLATE).unwrap();
    w.store_u32(block_size).unwrap();
    w.store_u64(plain.len() as u64).unwrap();
    for block in &blocks {
        w.store_u32(block.len() as u32).unwrap();
    }
    for block in &blocks {
        w.write(block).unwrap();
    }
    w.into_bytes()
}
