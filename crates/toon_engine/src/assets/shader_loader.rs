//! SPIR-V shader loading

use std::fmt;
use std::path::Path;

use thiserror::Error;

/// First word of every SPIR-V module
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Pipeline stage a shader module is written for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    /// Vertex shader
    Vertex,
    /// Fragment shader
    Fragment,
}

impl fmt::Display for ShaderStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Vertex => f.write_str("vertex"),
            Self::Fragment => f.write_str("fragment"),
        }
    }
}

/// Shader loading errors
#[derive(Error, Debug)]
pub enum ShaderError {
    /// IO error
    #[error("IO error reading {path}: {source}")]
    Io {
        /// File that failed to open
        path: String,
        /// Underlying error
        source: std::io::Error,
    },
    /// Byte length is not a multiple of four
    #[error("SPIR-V size {0} is not a multiple of 4")]
    Misaligned(usize),
    /// Empty module or wrong magic number
    #[error("Not a SPIR-V module (magic {0:#010x})")]
    BadMagic(u32),
}

/// A validated SPIR-V module for one stage
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderSource {
    /// Name used in diagnostics, usually the file name
    pub name: String,
    /// Stage this module targets
    pub stage: ShaderStage,
    /// Module words
    pub code: Vec<u32>,
}

impl ShaderSource {
    /// Validate and wrap SPIR-V bytes
    pub fn from_bytes(name: impl Into<String>, stage: ShaderStage, bytes: &[u8]) -> Result<Self, ShaderError> {
        if bytes.len() % 4 != 0 {
            return Err(ShaderError::Misaligned(bytes.len()));
        }

        let code: Vec<u32> = bytes
            .chunks_exact(4)
            .map(|word| u32::from_le_bytes([word[0], word[1], word[2], word[3]]))
            .collect();

        match code.first() {
            Some(&SPIRV_MAGIC) => Ok(Self {
                name: name.into(),
                stage,
                code,
            }),
            Some(&other) => Err(ShaderError::BadMagic(other)),
            None => Err(ShaderError::BadMagic(0)),
        }
    }
}

/// Reads shader modules from disk
pub struct ShaderLoader;

impl ShaderLoader {
    /// Load a compiled SPIR-V file for `stage`
    pub fn load<P: AsRef<Path>>(path: P, stage: ShaderStage) -> Result<ShaderSource, ShaderError> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|source| ShaderError::Io {
            path: path.display().to_string(),
            source,
        })?;

        let name = path
            .file_name()
            .map_or_else(|| path.display().to_string(), |n| n.to_string_lossy().into_owned());

        log::debug!("Loaded {} shader {} ({} bytes)", stage, name, bytes.len());
        ShaderSource::from_bytes(name, stage, &bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_bytes(words: &[u32]) -> Vec<u8> {
        words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }

    #[test]
    fn test_accepts_valid_header() {
        let bytes = module_bytes(&[SPIRV_MAGIC, 0x0001_0000, 0, 1, 0]);
        let source = ShaderSource::from_bytes("toon.frag.spv", ShaderStage::Fragment, &bytes).unwrap();
        assert_eq!(source.code.len(), 5);
        assert_eq!(source.stage, ShaderStage::Fragment);
    }

    #[test]
    fn test_rejects_misaligned() {
        let mut bytes = module_bytes(&[SPIRV_MAGIC]);
        bytes.push(0);
        assert!(matches!(
            ShaderSource::from_bytes("bad", ShaderStage::Vertex, &bytes),
            Err(ShaderError::Misaligned(5))
        ));
    }

    #[test]
    fn test_rejects_wrong_magic_and_empty() {
        let bytes = module_bytes(&[0xdead_beef]);
        assert!(matches!(
            ShaderSource::from_bytes("bad", ShaderStage::Vertex, &bytes),
            Err(ShaderError::BadMagic(0xdead_beef))
        ));
        assert!(matches!(
            ShaderSource::from_bytes("empty", ShaderStage::Vertex, &[]),
            Err(ShaderError::BadMagic(0))
        ));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = ShaderLoader::load("missing/default.vert.spv", ShaderStage::Vertex).unwrap_err();
        assert!(err.to_string().contains("missing/default.vert.spv"));
    }
}
