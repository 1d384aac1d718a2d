//! Foundational types shared by every loom crate: the error taxonomy, hash
//! folding helpers and the global string interner.

pub mod error;
pub mod hash;
pub mod interner;

pub use error::{ConfigError, LoomError, ResolveError, Result};
pub use hash::{HashFolder, hash_combine, hash_f32_bits};
pub use interner::Symbol;
