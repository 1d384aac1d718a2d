//! Intermediate representation of generated shader programs.
//!
//! # Overview
//!
//! A [`ProgramSet`] pairs one [`Program`] per pipeline stage. Each program
//! owns an arena of [`Parameter`]s (addressed by [`ParamId`]) and a single
//! entry [`Function`] whose body is a list of [`FunctionInvocation`] atoms.
//! Atoms carry a `(group_order, internal_counter)` key; the
//! [`ProgramWriter`] emits them in ascending key order, which is the final
//! instruction order of the shader.
//!
//! At draw time, [`GpuProgramParameters`] holds the values bound to a
//! program's uniforms. Auto constants are refreshed from an
//! [`AutoParamDataSource`].

pub mod auto_params;
pub mod function;
pub mod gpu_params;
pub mod parameter;
pub mod program;
pub mod types;
pub mod writer;

pub use auto_params::{AutoParamDataSource, MAX_TEXTURE_UNITS};
pub use function::{Function, FunctionInvocation, FunctionStage, Operand, OperandDirection, OperandMask};
pub use gpu_params::{ConstantValue, GpuProgramParameters};
pub use parameter::{AutoBinding, AutoConstantType, Content, ParamId, Parameter, ParameterUsage, Semantic};
pub use program::{Program, ProgramSet, ProgramType};
pub use types::GpuConstantType;
pub use writer::{GeneratedSource, ProgramWriter, TargetLanguage};
