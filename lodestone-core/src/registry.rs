//! Per-library index ownership and lifecycle.
//!
//! The registry owns one index instance per `(library, algorithm)` key,
//! created lazily on first write and destroyed when the library is dropped.
//! It is the only dispatch point for the three algorithms and the only type
//! the layers above talk to for index mutation.
//!
//! Locking: the key map sits behind a readers-writer lock (instance lookup
//! takes the read lock, creation and drop take the write lock), and every
//! instance sits behind its own readers-writer lock (search/stats shared,
//! add/remove/build exclusive). All work under these locks is synchronous
//! and CPU-bound; nothing suspends while holding one.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::index::{AlgorithmTag, IndexStats, SearchHit, VectorIndex};
use crate::metadata::Metadata;
use crate::vector::{ChunkId, LibraryId};

type InstanceKey = (LibraryId, AlgorithmTag);
type SharedIndex = Arc<RwLock<VectorIndex>>;

/// Registry of per-library vector index instances.
///
/// Construct one at startup and share it (`Arc`) with every request handler;
/// all operations take `&self` and are safe from any thread or task.
///
/// # Example
///
/// ```
/// use lodestone_core::{CoreConfig, IndexRegistry, Metadata};
/// use uuid::Uuid;
///
/// let registry = IndexRegistry::new(CoreConfig::new(4));
/// let library = Uuid::new_v4();
/// let chunk = Uuid::new_v4();
///
/// registry
///     .add_chunk(library, chunk, &[1.0, 0.0, 0.0, 0.0], Metadata::new(), false)
///     .unwrap();
/// let hits = registry.query(library, &[1.0, 0.0, 0.0, 0.0], 5, None).unwrap();
/// assert_eq!(hits[0].chunk_id, chunk);
/// ```
pub struct IndexRegistry {
    config: CoreConfig,
    instances: RwLock<HashMap<InstanceKey, SharedIndex>>,
}

impl IndexRegistry {
    /// Creates an empty registry. Instances appear lazily on first insert.
    pub fn new(config: CoreConfig) -> Self {
        Self {
            config,
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// The configuration applied to every instance this registry creates.
    pub fn config(&self) -> &CoreConfig {
        &self.config
    }

    /// The algorithm used when callers do not name one.
    pub fn default_algorithm(&self) -> AlgorithmTag {
        self.config.default_algorithm
    }

    fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.config.dimension {
            return Err(Error::DimensionMismatch {
                expected: self.config.dimension,
                got: vector.len(),
            });
        }
        Ok(())
    }

    fn instance(&self, library_id: LibraryId, algorithm: AlgorithmTag) -> Option<SharedIndex> {
        self.instances.read().get(&(library_id, algorithm)).cloned()
    }

    fn instance_or_create(&self, library_id: LibraryId, algorithm: AlgorithmTag) -> SharedIndex {
        if let Some(instance) = self.instance(library_id, algorithm) {
            return instance;
        }
        let mut map = self.instances.write();
        map.entry((library_id, algorithm))
            .or_insert_with(|| {
                debug!(library = %library_id, algorithm = %algorithm, "creating index instance");
                Arc::new(RwLock::new(VectorIndex::for_algorithm(
                    algorithm,
                    &self.config,
                )))
            })
            .clone()
    }

    /// Indexes `vector` under `(library_id, chunk_id)`.
    ///
    /// Dispatches to the default algorithm's instance, or - with `build_all`
    /// - to every algorithm's instance (comparison tooling, not the hot
    /// path). Re-inserting an existing chunk id replaces its vector in
    /// place.
    pub fn add_chunk(
        &self,
        library_id: LibraryId,
        chunk_id: ChunkId,
        vector: &[f32],
        metadata: Metadata,
        build_all: bool,
    ) -> Result<()> {
        // Validated once up front so a fan-out insert is all-or-nothing.
        self.check_dimension(vector)?;

        if build_all {
            for algorithm in AlgorithmTag::ALL {
                let instance = self.instance_or_create(library_id, algorithm);
                instance.write().add(chunk_id, vector, metadata.clone())?;
            }
        } else {
            let instance = self.instance_or_create(library_id, self.config.default_algorithm);
            instance.write().add(chunk_id, vector, metadata)?;
        }
        Ok(())
    }

    /// Removes `chunk_id` from every instance that exists for the library.
    /// Returns whether any instance held it. Idempotent.
    pub fn remove_chunk(&self, library_id: LibraryId, chunk_id: ChunkId) -> bool {
        let mut removed = false;
        for algorithm in AlgorithmTag::ALL {
            if let Some(instance) = self.instance(library_id, algorithm) {
                removed |= instance.write().remove(chunk_id);
            }
        }
        removed
    }

    /// k-NN query against the requested (or default) algorithm's instance.
    ///
    /// An unknown library yields `Ok(vec![])` without creating an instance;
    /// a wrong-width query is an error.
    pub fn query(
        &self,
        library_id: LibraryId,
        query: &[f32],
        k: usize,
        algorithm: Option<AlgorithmTag>,
    ) -> Result<Vec<SearchHit>> {
        self.check_dimension(query)?;
        let algorithm = algorithm.unwrap_or(self.config.default_algorithm);
        match self.instance(library_id, algorithm) {
            Some(instance) => instance.read().search(query, k),
            None => Ok(Vec::new()),
        }
    }

    /// Builds the named algorithm's instance, or every existing instance for
    /// the library when `algorithm` is `None`. Returns whether anything was
    /// built.
    pub fn build(&self, library_id: LibraryId, algorithm: Option<AlgorithmTag>) -> bool {
        match algorithm {
            Some(algorithm) => match self.instance(library_id, algorithm) {
                Some(instance) => {
                    instance.write().build();
                    true
                }
                None => false,
            },
            None => {
                let mut built = false;
                for algorithm in AlgorithmTag::ALL {
                    if let Some(instance) = self.instance(library_id, algorithm) {
                        instance.write().build();
                        built = true;
                    }
                }
                built
            }
        }
    }

    /// Statistics for the requested (or default) algorithm's instance.
    /// `None` when the library has no such instance.
    pub fn stats(
        &self,
        library_id: LibraryId,
        algorithm: Option<AlgorithmTag>,
    ) -> Option<IndexStats> {
        let algorithm = algorithm.unwrap_or(self.config.default_algorithm);
        self.instance(library_id, algorithm)
            .map(|instance| instance.read().stats())
    }

    /// Destroys every instance keyed by `library_id`, freeing its memory.
    /// Returns whether any instance existed.
    pub fn drop_library(&self, library_id: LibraryId) -> bool {
        let mut map = self.instances.write();
        let before = map.len();
        map.retain(|(library, _), _| *library != library_id);
        let removed = map.len() != before;
        drop(map);
        if removed {
            debug!(library = %library_id, "dropped library indexes");
        }
        removed
    }

    /// Number of vectors in the library's default-algorithm instance.
    pub fn len(&self, library_id: LibraryId) -> usize {
        self.instance(library_id, self.config.default_algorithm)
            .map_or(0, |instance| instance.read().len())
    }

    /// Number of distinct libraries with at least one instance.
    pub fn library_count(&self) -> usize {
        let map = self.instances.read();
        let mut libraries: Vec<LibraryId> = map.keys().map(|(library, _)| *library).collect();
        libraries.sort_unstable();
        libraries.dedup();
        libraries.len()
    }

    /// Startup replay: indexes every `(library, chunk, vector)` triple into
    /// the default algorithm, in the order given. Returns the number of
    /// applied inserts; entries with the wrong width are skipped.
    pub fn rehydrate<I>(&self, entries: I) -> usize
    where
        I: IntoIterator<Item = (LibraryId, ChunkId, Vec<f32>)>,
    {
        let mut applied = 0;
        for (library_id, chunk_id, vector) in entries {
            match self.add_chunk(library_id, chunk_id, &vector, Metadata::new(), false) {
                Ok(()) => applied += 1,
                Err(error) => {
                    debug!(library = %library_id, chunk = %chunk_id, %error, "skipping stored vector");
                }
            }
        }
        applied
    }
}
