//! Saving a cache to, and restoring it from, a compressed byte stream.
//!
//! The stream is a zstd frame holding, each encoded with bincode:
//!
//! ```text
//! capacity: u64
//! total:    u64
//! total x (key, value)
//! ```
//!
//! Entries are written shard by shard in shard-index order. Within a shard they follow the
//! shard map's order, not the insertion order.
//!
//! Every item is encoded with fixed-size integers and may take at most [`MAX_ITEM_BYTES`]. Larger
//! entries fail to save, and length prefixes claiming more fail to load before anything is
//! allocated for them.

use crate::cache::{Cache, CacheBuilder, RandomState};
use crate::error::{Error, Result};
use bincode::Options;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs::{self, File};
use std::hash::{BuildHasher, Hash};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::num::NonZero;
use std::path::Path;
use std::thread;
use std::time::Instant;
use tracing::{debug, info, warn};

const TEMP_FILE_PREFIX: &str = ".fifo-cache.tmp.";

/// Upper bound on the encoded size of a single key-value pair.
pub(crate) const MAX_ITEM_BYTES: u64 = 256 * 1024 * 1024;

fn codec() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .allow_trailing_bytes()
        .with_limit(MAX_ITEM_BYTES)
}

impl<K, V, S> Cache<K, V, S>
where
    K: Clone + Eq + Hash + Serialize + Send + Sync,
    V: Clone + Serialize + Send + Sync,
    S: BuildHasher + Send + Sync,
{
    /// Writes all entries to `writer`, copying shards with as many threads as there are CPUs.
    ///
    /// Other threads may keep using the cache meanwhile. Each shard is copied atomically, but the
    /// snapshot as a whole is not a single point in time.
    pub fn save_to<W: Write>(&self, writer: W) -> Result<()> {
        self.save_to_concurrent(writer, 0)
    }

    /// Like [`Cache::save_to`], copying shards with `concurrency` threads.
    ///
    /// A `concurrency` of zero, or more than the available parallelism, uses the available
    /// parallelism. The output does not depend on the number of threads.
    pub fn save_to_concurrent<W: Write>(&self, writer: W, concurrency: usize) -> Result<()> {
        let started = Instant::now();
        let workers = self.snapshot_workers(concurrency);

        let mut encoder =
            zstd::stream::write::Encoder::new(writer, zstd::DEFAULT_COMPRESSION_LEVEL)?;
        encoder.include_checksum(true)?;

        codec().serialize_into(&mut encoder, &(self.capacity() as u64)).map_err(|source| {
            Error::Encode {
                what: "capacity",
                source,
            }
        })?;

        let shard_entries = self.collect_shards(workers);
        let total: usize = shard_entries.iter().map(Vec::len).sum();

        codec().serialize_into(&mut encoder, &(total as u64)).map_err(|source| Error::Encode {
            what: "entry count",
            source,
        })?;

        for (key, value) in shard_entries.iter().flatten() {
            codec().serialize_into(&mut encoder, &(key, value)).map_err(|source| {
                Error::Encode {
                    what: "entry",
                    source,
                }
            })?;
        }

        // the frame is incomplete until the encoder is finished
        let mut writer = encoder.finish()?;
        writer.flush()?;

        debug!(
            entries = total,
            workers,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cache snapshot written"
        );
        Ok(())
    }

    /// Atomically replaces the file at `path` with a snapshot of the cache.
    ///
    /// Missing parent directories are created. The snapshot is written to a temporary file next to
    /// `path` and renamed over it once complete; on failure the temporary file is removed and
    /// `path` is left as it was.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        self.save_to_file_concurrent(path, 0)
    }

    /// Like [`Cache::save_to_file`], copying shards with `concurrency` threads.
    pub fn save_to_file_concurrent<P: AsRef<Path>>(
        &self,
        path: P,
        concurrency: usize,
    ) -> Result<()> {
        let path = path.as_ref();
        let dir = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir)?;

        let mut temp_file = tempfile::Builder::new()
            .prefix(TEMP_FILE_PREFIX)
            .tempfile_in(dir)?;

        self.save_to_concurrent(BufWriter::new(&mut temp_file), concurrency)?;
        temp_file.as_file().sync_all()?;

        temp_file.persist(path).map_err(|err| Error::Io(err.error))?;

        info!(path = %path.display(), "cache snapshot saved");
        Ok(())
    }

    fn snapshot_workers(&self, concurrency: usize) -> usize {
        let available_parallelism = thread::available_parallelism()
            .map(NonZero::get)
            .unwrap_or(1);

        let workers = if concurrency == 0 || concurrency > available_parallelism {
            available_parallelism
        } else {
            concurrency
        };

        workers.min(self.shard_count())
    }

    /// Copies every shard on a pool of `workers` threads and returns the copies in shard order.
    fn collect_shards(&self, workers: usize) -> Vec<Vec<(K, V)>> {
        let shard_count = self.shards.len();
        let (job_sender, job_receiver) = crossbeam_channel::bounded(shard_count);
        let (result_sender, result_receiver) = crossbeam_channel::bounded(shard_count);

        for shard_idx in 0..shard_count {
            if job_sender.send(shard_idx).is_err() {
                break;
            }
        }
        drop(job_sender);

        thread::scope(|scope| {
            for _ in 0..workers {
                let job_receiver = job_receiver.clone();
                let result_sender = result_sender.clone();
                scope.spawn(move || {
                    for shard_idx in job_receiver {
                        let entries = self.shards[shard_idx].snapshot();
                        if result_sender.send((shard_idx, entries)).is_err() {
                            return;
                        }
                    }
                });
            }
        });
        drop(result_sender);

        let mut shard_entries: Vec<Vec<(K, V)>> = (0..shard_count).map(|_| Vec::new()).collect();
        for (shard_idx, entries) in result_receiver {
            shard_entries[shard_idx] = entries;
        }

        shard_entries
    }
}

impl<K, V> Cache<K, V, RandomState>
where
    K: Clone + Eq + Hash + DeserializeOwned,
    V: DeserializeOwned,
{
    /// Restores a cache from a stream written by [`Cache::save_to`].
    ///
    /// The new cache gets the saved capacity and the default shard layout. Entries are inserted one
    /// by one, so if the stream holds more entries than the capacity, the earliest ones are
    /// evicted again.
    pub fn load_from<R: Read>(reader: R) -> Result<Cache<K, V, RandomState>> {
        let started = Instant::now();
        let mut decoder = zstd::stream::read::Decoder::new(reader)?;

        let capacity: u64 = codec().deserialize_from(&mut decoder).map_err(|source| {
            Error::Corrupt {
                what: "capacity",
                source,
            }
        })?;
        // the header is untrusted, so shards grow with the entries actually read
        let cache = usize::try_from(capacity)
            .ok()
            .and_then(|capacity| {
                CacheBuilder::<K, V>::new(capacity)
                    .preallocate(false)
                    .build()
                    .ok()
            })
            .ok_or(Error::InvalidSnapshotCapacity(capacity))?;

        let total: u64 = codec().deserialize_from(&mut decoder).map_err(|source| {
            Error::Corrupt {
                what: "entry count",
                source,
            }
        })?;

        for index in 0..total {
            let (key, value): (K, V) = codec()
                .deserialize_from(&mut decoder)
                .map_err(|source| Error::CorruptEntry { index, source })?;
            cache.insert(key, value);
        }

        debug!(
            entries = total,
            capacity,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "cache snapshot read"
        );
        Ok(cache)
    }

    /// Restores a cache from a file written by [`Cache::save_to_file`].
    ///
    /// Returns [`Error::NotFound`] if there is no file at `path`.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Cache<K, V, RandomState>> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|err| match err.kind() {
            io::ErrorKind::NotFound => Error::NotFound {
                path: path.to_path_buf(),
            },
            _ => Error::Io(err),
        })?;

        let cache = Self::load_from(BufReader::new(file))?;

        info!(path = %path.display(), entries = cache.len(), "cache snapshot loaded");
        Ok(cache)
    }

    /// Restores a cache from `path`, or creates an empty one with `capacity` if that fails for any
    /// reason, including a missing or corrupt file. The error is logged and otherwise discarded.
    ///
    /// # Panics
    ///
    /// Panics if loading fails and `capacity` is zero.
    pub fn load_from_file_or_new<P: AsRef<Path>>(
        path: P,
        capacity: usize,
    ) -> Cache<K, V, RandomState> {
        let path = path.as_ref();
        match Self::load_from_file(path) {
            Ok(cache) => cache,
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "cannot load cache snapshot, starting empty"
                );
                Cache::with_capacity(capacity)
            }
        }
    }
}
