//! Programs, their parameter registry, and program sets.
//!
//! A [`Program`] is the sole owner of its parameters. Everything else (the
//! entry function, sub-render-states, bound parameter buffers) refers to
//! them through [`ParamId`] handles.
//!
//! # Resolution
//!
//! Every `resolve_*` method is an idempotent constructor: asking again for a
//! parameter with the same identity returns the existing handle instead of
//! declaring a second one. Identity is
//!
//! | Kind          | Identity                          |
//! |---------------|-----------------------------------|
//! | uniform       | suggested name + index            |
//! | auto uniform  | auto constant + data              |
//! | input/output  | semantic + index (or content)     |
//! | local         | name                              |
//!
//! Re-resolving an identity with a different type fails with
//! [`ResolveError::TypeMismatch`].

use loom_core::ResolveError;
use loom_core::interner::{self, Symbol};
use rustc_hash::FxHashMap;
use slotmap::SlotMap;

use crate::function::{Function, FunctionInvocation, FunctionStage, Operand};
use crate::parameter::{AutoBinding, AutoConstantType, Content, ParamId, Parameter, ParameterUsage, Semantic};
use crate::types::GpuConstantType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProgramType {
    Vertex,
    Fragment,
    Geometry,
}

impl ProgramType {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
            Self::Geometry => "geometry",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum UniformKey {
    Named { index: u32, name: String },
    Auto(AutoBinding),
}

#[derive(Debug, Clone)]
pub struct Program {
    program_type: ProgramType,
    parameters: SlotMap<ParamId, Parameter>,
    uniforms: Vec<ParamId>,
    uniform_lookup: FxHashMap<UniformKey, ParamId>,
    entry: Function,
    dependencies: Vec<Symbol>,
    unique_counter: u32,
}

impl Program {
    #[must_use]
    pub fn new(program_type: ProgramType) -> Self {
        Self {
            program_type,
            parameters: SlotMap::with_key(),
            uniforms: Vec::new(),
            uniform_lookup: FxHashMap::default(),
            entry: Function::new("main"),
            dependencies: Vec::new(),
            unique_counter: 0,
        }
    }

    #[inline]
    #[must_use]
    pub fn program_type(&self) -> ProgramType {
        self.program_type
    }

    // ─── Parameter Access ───────────────────────────────────────────────────

    /// Returns the parameter behind `id`. **Panics** if `id` belongs to
    /// another program.
    #[inline]
    #[must_use]
    pub fn parameter(&self, id: ParamId) -> &Parameter {
        &self.parameters[id]
    }

    #[inline]
    #[must_use]
    pub fn get_parameter(&self, id: ParamId) -> Option<&Parameter> {
        self.parameters.get(id)
    }

    /// Total number of parameters of every usage.
    #[inline]
    #[must_use]
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Uniforms in declaration order.
    pub fn uniforms(&self) -> impl Iterator<Item = (ParamId, &Parameter)> {
        self.uniforms.iter().map(|&id| (id, &self.parameters[id]))
    }

    #[inline]
    #[must_use]
    pub fn uniform_count(&self) -> usize {
        self.uniforms.len()
    }

    /// Finds a uniform by generated name.
    #[must_use]
    pub fn uniform_by_name(&self, name: &str) -> Option<ParamId> {
        self.uniforms
            .iter()
            .copied()
            .find(|&id| self.parameters[id].name == name)
    }

    // ─── Uniform Resolution ─────────────────────────────────────────────────

    /// Resolves a material-driven uniform.
    ///
    /// With `Some(index)` the uniform is named `<suggested_name><index>` and
    /// deduplicated. With `None` a fresh uniform named
    /// `<suggested_name>_u<n>` is created on every call, skipping names
    /// already declared.
    pub fn resolve_parameter(
        &mut self,
        ty: GpuConstantType,
        index: Option<u32>,
        suggested_name: &str,
    ) -> Result<ParamId, ResolveError> {
        let Some(index) = index else {
            let (name, counter) = loop {
                let counter = self.unique_counter;
                self.unique_counter += 1;
                let name = format!("{suggested_name}_u{counter}");
                if self.uniform_by_name(&name).is_none() {
                    break (name, counter);
                }
            };
            return Ok(self.push_uniform(name, ty, counter, None));
        };

        let key = UniformKey::Named {
            index,
            name: suggested_name.to_string(),
        };
        if let Some(&id) = self.uniform_lookup.get(&key) {
            return self.check_type(id, ty);
        }

        let name = format!("{suggested_name}{index}");
        if self.uniform_by_name(&name).is_some() {
            return Err(ResolveError::NameCollision(name));
        }
        let id = self.push_uniform(name, ty, index, None);
        self.uniform_lookup.insert(key, id);
        Ok(id)
    }

    /// Resolves an engine-computed uniform.
    pub fn resolve_auto_parameter(&mut self, kind: AutoConstantType, data: u32) -> ParamId {
        let binding = AutoBinding::new(kind, data);
        let key = UniformKey::Auto(binding);
        if let Some(&id) = self.uniform_lookup.get(&key) {
            return id;
        }

        let id = self.push_uniform(binding.parameter_name(), kind.constant_type(), data, Some(binding));
        self.uniform_lookup.insert(key, id);
        id
    }

    fn push_uniform(
        &mut self,
        name: String,
        ty: GpuConstantType,
        index: u32,
        auto: Option<AutoBinding>,
    ) -> ParamId {
        let id = self.parameters.insert(Parameter {
            name,
            ty,
            semantic: Semantic::Unknown,
            index,
            content: Content::Unknown,
            usage: ParameterUsage::Uniform,
            auto,
        });
        self.uniforms.push(id);
        id
    }

    // ─── Entry Function Parameters ──────────────────────────────────────────

    /// Resolves a stage input (vertex attribute or interpolant).
    pub fn resolve_input_parameter(
        &mut self,
        semantic: Semantic,
        index: u32,
        content: Content,
        ty: GpuConstantType,
    ) -> Result<ParamId, ResolveError> {
        if let Some(id) = self.find_in(&self.entry.inputs, semantic, index) {
            return self.check_type(id, ty);
        }

        let name = format!("i{}_{index}", semantic.name_fragment());
        let id = self.insert_parameter(name, ty, semantic, index, content, ParameterUsage::Input);
        self.entry.inputs.push(id);
        Ok(id)
    }

    /// Resolves a stage output.
    ///
    /// `None` as index reuses an output with the same semantic and content,
    /// or allocates the next free index for that semantic.
    pub fn resolve_output_parameter(
        &mut self,
        semantic: Semantic,
        index: Option<u32>,
        content: Content,
        ty: GpuConstantType,
    ) -> Result<ParamId, ResolveError> {
        let index = match index {
            Some(index) => {
                if let Some(id) = self.find_in(&self.entry.outputs, semantic, index) {
                    return self.check_type(id, ty);
                }
                index
            }
            None => {
                if content != Content::Unknown
                    && let Some(id) = self.entry.outputs.iter().copied().find(|&id| {
                        let p = &self.parameters[id];
                        p.semantic == semantic && p.content == content
                    })
                {
                    return self.check_type(id, ty);
                }
                self.entry
                    .outputs
                    .iter()
                    .map(|&id| &self.parameters[id])
                    .filter(|p| p.semantic == semantic)
                    .map(|p| p.index + 1)
                    .max()
                    .unwrap_or(0)
            }
        };

        let name = format!("o{}_{index}", semantic.name_fragment());
        let id = self.insert_parameter(name, ty, semantic, index, content, ParameterUsage::Output);
        self.entry.outputs.push(id);
        Ok(id)
    }

    /// Resolves a local variable of the entry function, identified by name.
    pub fn resolve_local_parameter(
        &mut self,
        semantic: Semantic,
        index: u32,
        name: &str,
        ty: GpuConstantType,
    ) -> Result<ParamId, ResolveError> {
        if let Some(id) = self
            .entry
            .locals
            .iter()
            .copied()
            .find(|&id| self.parameters[id].name == name)
        {
            return self.check_type(id, ty);
        }

        let id = self.insert_parameter(
            name.to_string(),
            ty,
            semantic,
            index,
            Content::Unknown,
            ParameterUsage::Local,
        );
        self.entry.locals.push(id);
        Ok(id)
    }

    #[must_use]
    pub fn find_input(&self, semantic: Semantic, index: u32) -> Option<ParamId> {
        self.find_in(&self.entry.inputs, semantic, index)
    }

    #[must_use]
    pub fn find_output(&self, semantic: Semantic, index: u32) -> Option<ParamId> {
        self.find_in(&self.entry.outputs, semantic, index)
    }

    #[must_use]
    pub fn find_local(&self, semantic: Semantic, index: u32) -> Option<ParamId> {
        self.find_in(&self.entry.locals, semantic, index)
    }

    fn find_in(&self, list: &[ParamId], semantic: Semantic, index: u32) -> Option<ParamId> {
        list.iter().copied().find(|&id| {
            let p = &self.parameters[id];
            p.semantic == semantic && p.index == index
        })
    }

    fn insert_parameter(
        &mut self,
        name: String,
        ty: GpuConstantType,
        semantic: Semantic,
        index: u32,
        content: Content,
        usage: ParameterUsage,
    ) -> ParamId {
        self.parameters.insert(Parameter {
            name,
            ty,
            semantic,
            index,
            content,
            usage,
            auto: None,
        })
    }

    fn check_type(&self, id: ParamId, requested: GpuConstantType) -> Result<ParamId, ResolveError> {
        let existing = &self.parameters[id];
        if existing.ty == requested {
            Ok(id)
        } else {
            Err(ResolveError::TypeMismatch {
                name: existing.name.clone(),
                existing: existing.ty.as_str(),
                requested: requested.as_str(),
            })
        }
    }

    // ─── Operands ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn op_in(&self, id: ParamId) -> Operand {
        Operand::input(self.parameters[id].name.as_str())
    }

    #[must_use]
    pub fn op_out(&self, id: ParamId) -> Operand {
        Operand::output(self.parameters[id].name.as_str())
    }

    #[must_use]
    pub fn op_in_out(&self, id: ParamId) -> Operand {
        Operand::in_out(self.parameters[id].name.as_str())
    }

    // ─── Entry Function ─────────────────────────────────────────────────────

    #[inline]
    #[must_use]
    pub fn entry_function(&self) -> &Function {
        &self.entry
    }

    /// Builder appending atoms to `group` of the entry function.
    pub fn stage(&mut self, group: i32) -> FunctionStage<'_> {
        self.entry.stage(group)
    }

    /// Adds an atom with an explicit `(group, counter)` position.
    pub fn add_invocation(&mut self, atom: FunctionInvocation) {
        self.entry.add_invocation(atom);
    }

    // ─── Library Dependencies ───────────────────────────────────────────────

    /// Declares a library the generated source must include. Idempotent.
    pub fn add_dependency(&mut self, library: &str) {
        let symbol = interner::intern(library);
        if !self.dependencies.contains(&symbol) {
            self.dependencies.push(symbol);
        }
    }

    /// Library names in first-declaration order.
    pub fn dependencies(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.dependencies.iter().map(|&symbol| interner::resolve(symbol))
    }

    #[inline]
    #[must_use]
    pub fn dependency_count(&self) -> usize {
        self.dependencies.len()
    }
}

/// The programs generated for one material pass.
#[derive(Debug, Clone)]
pub struct ProgramSet {
    vertex: Program,
    fragment: Program,
    geometry: Option<Program>,
}

impl Default for ProgramSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertex: Program::new(ProgramType::Vertex),
            fragment: Program::new(ProgramType::Fragment),
            geometry: None,
        }
    }

    #[must_use]
    pub fn with_geometry(mut self) -> Self {
        self.geometry = Some(Program::new(ProgramType::Geometry));
        self
    }

    #[inline]
    #[must_use]
    pub fn vertex(&self) -> &Program {
        &self.vertex
    }

    #[inline]
    pub fn vertex_mut(&mut self) -> &mut Program {
        &mut self.vertex
    }

    #[inline]
    #[must_use]
    pub fn fragment(&self) -> &Program {
        &self.fragment
    }

    #[inline]
    pub fn fragment_mut(&mut self) -> &mut Program {
        &mut self.fragment
    }

    #[inline]
    #[must_use]
    pub fn geometry(&self) -> Option<&Program> {
        self.geometry.as_ref()
    }

    #[inline]
    pub fn geometry_mut(&mut self) -> Option<&mut Program> {
        self.geometry.as_mut()
    }

    /// Borrows the vertex and fragment programs at once.
    pub fn split_mut(&mut self) -> (&mut Program, &mut Program) {
        (&mut self.vertex, &mut self.fragment)
    }

    #[must_use]
    pub fn get(&self, program_type: ProgramType) -> Option<&Program> {
        match program_type {
            ProgramType::Vertex => Some(&self.vertex),
            ProgramType::Fragment => Some(&self.fragment),
            ProgramType::Geometry => self.geometry.as_ref(),
        }
    }

    /// All present programs, vertex first.
    pub fn programs(&self) -> impl Iterator<Item = &Program> {
        [Some(&self.vertex), self.geometry.as_ref(), Some(&self.fragment)]
            .into_iter()
            .flatten()
    }
}
