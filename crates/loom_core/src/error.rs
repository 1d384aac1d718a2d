//! Error Types
//!
//! Shader generation distinguishes two failure channels.
//!
//! # Overview
//!
//! - [`ResolveError`]: a generation-time failure. A sub-render-state could not
//!   resolve a parameter, input or library. These are ordinary results: the
//!   composition layer logs them and falls back to the fixed pipeline for the
//!   affected pass.
//! - [`ConfigError`]: a validation error in authored content or in engine
//!   setup (bad UV set, unknown token, vertex texture fetch, duplicate
//!   factory). These are returned to the caller unchanged and never turned
//!   into a fallback.
//!
//! [`LoomError`] wraps both, together with writer and compiler failures, and
//! is the error type of the crate-wide [`Result`] alias.

use thiserror::Error;

/// A failure while resolving parameters, dependencies or invocations for a
/// program set.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolveError {
    /// A parameter with the same identity already exists with another type.
    #[error("parameter `{name}` is already resolved as {existing}, cannot resolve it as {requested}")]
    TypeMismatch {
        name: String,
        existing: &'static str,
        requested: &'static str,
    },

    /// A parameter that an earlier sub-render-state should have provided is absent.
    #[error("no {usage} parameter with semantic {semantic} (index {index}) in the {program} program")]
    MissingParameter {
        program: &'static str,
        usage: &'static str,
        semantic: &'static str,
        index: u32,
    },

    /// Projective texturing was requested but no projector is bound.
    #[error("texture unit {unit} uses projective texturing without a projector")]
    MissingProjector { unit: u32 },

    /// A library dependency has no known source.
    #[error("shader library `{0}` is not available")]
    MissingLibrary(String),

    /// The program type has no entry for the requested stage.
    #[error("program set has no {0} program")]
    MissingProgram(&'static str),

    /// Two distinct uniforms would be declared under the same generated name.
    #[error("uniform name `{0}` is already declared by another parameter")]
    NameCollision(String),

    /// Invocations were requested before the parameters they read were resolved.
    #[error("{0} emitted invocations before resolving its parameters")]
    NotResolved(&'static str),
}

/// A precondition violation in authored content or generator setup.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Texture coordinate set index beyond the supported range.
    #[error("texture coordinate set {set} is out of range (max {max})")]
    UvSetOutOfRange { set: u32, max: u32 },

    /// A textual material token could not be parsed.
    #[error("invalid {kind} token `{token}`")]
    InvalidToken { kind: &'static str, token: String },

    /// The texture unit is bound to a stage the generator cannot sample from.
    #[error("texture unit {unit}: {reason}")]
    UnsupportedBinding { unit: u32, reason: &'static str },

    /// A texture unit index beyond the pass's unit list.
    #[error("texture unit {index} is out of range ({count} units)")]
    TextureUnitOutOfRange { index: usize, count: usize },

    /// The configuration needs more samplers than a fragment program can bind.
    #[error("{requested} texture samplers requested, at most {max} are supported")]
    TooManySamplers { requested: u32, max: u32 },

    /// A lit pass asks for more per-vertex lights than the generator emits.
    #[error("{requested} lights requested, at most {max} are supported")]
    TooManyLights { requested: u32, max: u32 },

    /// A factory with the same type name is already registered.
    #[error("a sub-render-state factory named `{0}` is already registered")]
    DuplicateFactory(String),

    /// No factory is registered under this type name.
    #[error("no sub-render-state factory named `{0}`")]
    UnknownFactory(String),

    /// The process-wide registry was queried before `initialize` or after `shutdown`.
    #[error("the sub-render-state registry is not initialized")]
    RegistryNotInitialized,

    /// `initialize` was called while a registry is already installed.
    #[error("the sub-render-state registry is already initialized")]
    RegistryAlreadyInitialized,

    /// Settings could not be parsed.
    #[error("invalid generator settings: {0}")]
    InvalidSettings(String),
}

/// The umbrella error type for the loom crates.
#[derive(Error, Debug)]
pub enum LoomError {
    // ========================================================================
    // Generation
    // ========================================================================
    /// Parameter or dependency resolution failed.
    #[error("resolution failed: {0}")]
    Resolve(#[from] ResolveError),

    /// Authored content or setup is invalid.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    // ========================================================================
    // Serialization & Compilation
    // ========================================================================
    /// The program template failed to render.
    #[error("template error: {0}")]
    Template(String),

    /// The target language cannot express the requested program stage.
    #[error("{language} does not support {stage} programs")]
    UnsupportedStage {
        language: &'static str,
        stage: &'static str,
    },

    /// The shader compiler rejected generated source.
    #[error("failed to compile {stage} program: {message}")]
    Compile {
        stage: &'static str,
        message: String,
    },
}

/// Alias for `Result<T, LoomError>`.
pub type Result<T> = std::result::Result<T, LoomError>;
