//! Building SST files for bulk ingestion

use std::path::Path;

use graphkv_kvstore::{KvPair, StorageError, StorageResult, display_key};
use rocksdb::{Options, SstFileWriter};

use crate::classify;

/// Writes RocksDB-native SST files that [`RocksDbEngine::ingest`] accepts
///
/// [`RocksDbEngine::ingest`]: crate::RocksDbEngine
#[derive(Default)]
pub struct SstFileBuilder {
    options: Options,
}

impl SstFileBuilder {
    /// Create a builder using default table options
    pub fn new() -> Self {
        Self::default()
    }

    /// Write `pairs` to a new SST file at `path`
    ///
    /// Keys must be strictly ascending and the input must not be empty.
    pub fn write(&self, path: impl AsRef<Path>, pairs: &[KvPair]) -> StorageResult<()> {
        if pairs.is_empty() {
            return Err(StorageError::InvalidArgument(
                "Cannot build an SST file without entries".to_string(),
            ));
        }
        if let Some(w) = pairs.windows(2).find(|w| w[0].0 >= w[1].0) {
            return Err(StorageError::InvalidArgument(format!(
                "SST keys must be strictly ascending: {} precedes {}",
                display_key(&w[0].0),
                display_key(&w[1].0)
            )));
        }

        let mut writer = SstFileWriter::create(&self.options);
        writer.open(path.as_ref()).map_err(classify)?;
        for (key, value) in pairs {
            writer.put(key, value).map_err(classify)?;
        }
        writer.finish().map_err(classify)?;

        tracing::debug!(
            "Wrote {} entries to SST file {}",
            pairs.len(),
            path.as_ref().display()
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use graphkv_kvstore::ResultCode;
    use tempfile::TempDir;

    #[test]
    fn test_rejects_unsorted_input() {
        let temp_dir = TempDir::new().unwrap();
        let pairs = vec![
            (Bytes::from("b"), Bytes::from("2")),
            (Bytes::from("a"), Bytes::from("1")),
        ];

        let result = SstFileBuilder::new().write(temp_dir.path().join("bad.sst"), &pairs);
        assert!(matches!(result, Err(StorageError::InvalidArgument(_))));
        assert_eq!(ResultCode::of(&result), ResultCode::Unknown);
    }

    #[test]
    fn test_rejects_duplicates_and_empty_input() {
        let temp_dir = TempDir::new().unwrap();
        let builder = SstFileBuilder::new();

        let dup = vec![
            (Bytes::from("a"), Bytes::from("1")),
            (Bytes::from("a"), Bytes::from("2")),
        ];
        assert!(builder.write(temp_dir.path().join("dup.sst"), &dup).is_err());
        assert!(builder.write(temp_dir.path().join("empty.sst"), &[]).is_err());
    }

    #[test]
    fn test_writes_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("ok.sst");
        let pairs = vec![
            (Bytes::from("a"), Bytes::from("1")),
            (Bytes::from("b"), Bytes::from("2")),
        ];

        SstFileBuilder::new().write(&path, &pairs).unwrap();
        assert!(path.exists());
    }
}
