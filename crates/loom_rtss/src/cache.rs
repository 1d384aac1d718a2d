//! Compiled Program Cache
//!
//! Owns every compiled program pair and addresses it through a
//! [`ProgramSetId`].
//!
//! # Two-Level Caching (L1 / L2)
//!
//! - **L1** maps the final hash (renderable hash folded with the render-state
//!   hash) to an id. A hit means the pass needs no source generation at all.
//! - **L2** maps the xxh3-128 of the serialized source to an id. Different
//!   hashes that serialize to identical source share one compilation.
//!
//! Entries are never evicted. [`ProgramCache::clear`] is the only removal
//! path. Insertion requires `&mut self`, so cache writes happen on the single
//! thread that owns the generator.

use loom_core::{LoomError, Result};
use loom_shader::{GeneratedSource, ProgramType};
use rustc_hash::FxHashMap;
use xxhash_rust::xxh3::xxh3_128;

use crate::compiler::{GpuProgramHandle, ProgramCompiler};

/// Handle to a cached program pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProgramSetId(pub(crate) u32);

impl ProgramSetId {
    /// Raw index into the cache storage.
    #[inline]
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// The hashes a program pair was requested under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub renderable: u64,
    pub pass: u64,
    pub final_hash: u64,
}

#[derive(Debug, Clone)]
pub struct CachedProgramSet {
    pub vertex: GpuProgramHandle,
    pub fragment: GpuProgramHandle,
    pub geometry: Option<GpuProgramHandle>,
    pub source_hash: u128,
    /// Every key that resolved to this entry, in insertion order.
    pub keys: Vec<CacheKey>,
}

#[derive(Debug, Default)]
pub struct ProgramCache {
    entries: Vec<CachedProgramSet>,
    lookup: FxHashMap<u64, ProgramSetId>,
    source_lookup: FxHashMap<u128, ProgramSetId>,
}

impl ProgramCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// L1 lookup by final hash.
    #[inline]
    #[must_use]
    pub fn lookup(&self, final_hash: u64) -> Option<ProgramSetId> {
        self.lookup.get(&final_hash).copied()
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: ProgramSetId) -> Option<&CachedProgramSet> {
        self.entries.get(id.index())
    }

    /// Inserts `source` under `key`, compiling only if no entry holds the same
    /// source. A compile failure inserts nothing.
    pub fn insert(
        &mut self,
        key: CacheKey,
        source: &GeneratedSource,
        compiler: &mut dyn ProgramCompiler,
    ) -> Result<ProgramSetId> {
        let source_hash = hash_source(source);
        if let Some(&id) = self.source_lookup.get(&source_hash) {
            log::debug!("Program source shared by hash {:#018x}", key.final_hash);
            self.entries[id.index()].keys.push(key);
            self.lookup.insert(key.final_hash, id);
            return Ok(id);
        }

        let vertex = compile_stage(compiler, ProgramType::Vertex, &source.vertex)?;
        let fragment = compile_stage(compiler, ProgramType::Fragment, &source.fragment)?;
        let geometry = source
            .geometry
            .as_deref()
            .map(|geometry| compile_stage(compiler, ProgramType::Geometry, geometry))
            .transpose()?;

        let id = ProgramSetId(self.entries.len() as u32);
        self.entries.push(CachedProgramSet {
            vertex,
            fragment,
            geometry,
            source_hash,
            keys: vec![key],
        });
        self.lookup.insert(key.final_hash, id);
        self.source_lookup.insert(source_hash, id);
        Ok(id)
    }

    /// Number of distinct compiled program sets.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Ids handed out earlier become invalid.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.lookup.clear();
        self.source_lookup.clear();
    }
}

fn compile_stage(
    compiler: &mut dyn ProgramCompiler,
    stage: ProgramType,
    source: &str,
) -> Result<GpuProgramHandle> {
    compiler.compile(stage, source).map_err(|message| {
        log::error!("Failed to compile generated {} program: {message}", stage.as_str());
        LoomError::Compile {
            stage: stage.as_str(),
            message,
        }
    })
}

fn hash_source(source: &GeneratedSource) -> u128 {
    let mut text = String::with_capacity(
        source.vertex.len() + source.fragment.len() + source.geometry.as_ref().map_or(0, String::len) + 2,
    );
    text.push_str(&source.vertex);
    text.push('\0');
    text.push_str(&source.fragment);
    if let Some(geometry) = &source.geometry {
        text.push('\0');
        text.push_str(geometry);
    }
    xxh3_128(text.as_bytes())
}
