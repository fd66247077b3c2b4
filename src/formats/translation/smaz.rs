//! Bucket-element string decompression
//!
//! Elements whose compressed and uncompressed sizes differ hold
//! smaz-compressed text: control byte 254 escapes one verbatim byte, 255
//! a verbatim run of `next + 1` bytes, and any other byte indexes a
//! fixed codebook of short substrings. The scheme is decode-only here;
//! replacement strings are always written uncompressed.

use crate::error::{Error, Result};

/// The injected string-decompression capability. The table codec only
/// depends on this trait; where the codebook comes from is the caller's
/// concern.
pub trait MessageDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>>;
}

/// Default capability backed by the native smaz codec.
pub struct SmazDecompressor;

impl MessageDecompressor for SmazDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        smaz::decompress(data).map_err(|e| Error::StringDecompression(e.to_string()))
    }
}

/// Decompressor over a caller-supplied codebook, for sourcing the
/// substring table externally.
pub struct CodebookDecompressor {
    entries: Vec<Vec<u8>>,
}

impl CodebookDecompressor {
    pub fn new<I, E>(entries: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: AsRef<[u8]>,
    {
        Self {
            entries: entries
                .into_iter()
                .map(|entry| entry.as_ref().to_vec())
                .collect(),
        }
    }
}

impl MessageDecompressor for CodebookDecompressor {
    fn decompress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = Vec::new();
        let mut i = 0;
        while i < data.len() {
            match data[i] {
                254 => {
                    let byte = data.get(i + 1).ok_or(Error::TruncatedInput)?;
                    out.push(*byte);
                    i += 2;
                }
                255 => {
                    let run_len = *data.get(i + 1).ok_or(Error::TruncatedInput)? as usize + 1;
                    let run = data
                        .get(i + 2..i + 2 + run_len)
                        .ok_or(Error::TruncatedInput)?;
                    out.extend_from_slice(run);
                    i += 2 + run_len;
                }
                code => {
                    let entry =
                        self.entries
                            .get(code as usize)
                            .ok_or_else(|| {
                                Error::StringDecompression(format!(
                                    "codebook index {code} out of range"
                                ))
                            })?;
                    out.extend_from_slice(entry);
                    i += 1;
                }
            }
        }
        Ok(out)
    }
}
