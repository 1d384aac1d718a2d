//! Shader compiler seam.
//!
//! The generator hands serialized source to a [`ProgramCompiler`] and stores
//! the returned handles in the program cache. A rendering backend implements
//! the trait on top of its own shader API; [`PassthroughCompiler`] accepts all
//! source and is used for offline generation and tests.

use loom_shader::ProgramType;

/// Backend handle of one compiled program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GpuProgramHandle(pub u64);

pub trait ProgramCompiler: Send {
    /// Compiles `source` for `stage`. The error string is the compiler log.
    fn compile(&mut self, stage: ProgramType, source: &str) -> Result<GpuProgramHandle, String>;
}

/// Accepts every program and hands out sequential handles.
#[derive(Debug, Default)]
pub struct PassthroughCompiler {
    next: u64,
}

impl PassthroughCompiler {
    /// Number of programs compiled so far.
    #[inline]
    #[must_use]
    pub fn compiled(&self) -> u64 {
        self.next
    }
}

impl ProgramCompiler for PassthroughCompiler {
    fn compile(&mut self, _stage: ProgramType, _source: &str) -> Result<GpuProgramHandle, String> {
        let handle = GpuProgramHandle(self.next);
        self.next += 1;
        Ok(handle)
    }
}
