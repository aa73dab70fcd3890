use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by cache construction and snapshot persistence.
///
/// Lookups never fail: a missing key is reported through `Option` or `bool`.
#[derive(Error, Debug)]
pub enum Error {
    #[error("capacity must be greater than 0")]
    InvalidCapacity,

    #[error("shard count must be greater than 0")]
    InvalidShardCount,

    #[error("snapshot file {} does not exist", path.display())]
    NotFound { path: PathBuf },

    #[error("snapshot I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("cannot encode {what}: {source}")]
    Encode {
        what: &'static str,
        #[source]
        source: bincode::Error,
    },

    #[error("corrupt snapshot, cannot decode {what}: {source}")]
    Corrupt {
        what: &'static str,
        #[source]
        source: bincode::Error,
    },

    #[error("corrupt snapshot, cannot decode entry {index}: {source}")]
    CorruptEntry {
        index: u64,
        #[source]
        source: bincode::Error,
    },

    #[error("corrupt snapshot, invalid capacity {0}")]
    InvalidSnapshotCapacity(u64),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
