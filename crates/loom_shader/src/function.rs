//! Functions and their invocation atoms.

use std::fmt;

use bitflags::bitflags;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::parameter::ParamId;

/// Library function used by [`FunctionStage::assign`].
pub const ASSIGN_FUNCTION: &str = "FFP_Assign";

bitflags! {
    /// Component selection applied to an operand. `W` is the alpha channel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct OperandMask: u8 {
        const X = 1;
        const Y = 1 << 1;
        const Z = 1 << 2;
        const W = 1 << 3;
        const XY = Self::X.bits() | Self::Y.bits();
        const XYZ = Self::X.bits() | Self::Y.bits() | Self::Z.bits();
        const ALL = Self::X.bits() | Self::Y.bits() | Self::Z.bits() | Self::W.bits();
    }
}

const SWIZZLES: [&str; 16] = [
    "", "x", "y", "xy", "z", "xz", "yz", "xyz", "w", "xw", "yw", "xyw", "zw", "xzw", "yzw", "",
];

impl OperandMask {
    /// Swizzle suffix without the leading dot; empty for a full selection.
    #[must_use]
    pub fn swizzle(self) -> &'static str {
        SWIZZLES[usize::from(self.bits() & 0xF)]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperandDirection {
    In,
    Out,
    InOut,
}

/// One argument of a [`FunctionInvocation`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Operand {
    name: String,
    direction: OperandDirection,
    mask: OperandMask,
    literal: bool,
}

impl Operand {
    #[must_use]
    pub fn input(name: impl Into<String>) -> Self {
        Self::parameter(name.into(), OperandDirection::In)
    }

    #[must_use]
    pub fn output(name: impl Into<String>) -> Self {
        Self::parameter(name.into(), OperandDirection::Out)
    }

    #[must_use]
    pub fn in_out(name: impl Into<String>) -> Self {
        Self::parameter(name.into(), OperandDirection::InOut)
    }

    /// A float constant, always written with a decimal point.
    #[must_use]
    pub fn literal(value: f32) -> Self {
        Self {
            name: float_literal(value),
            direction: OperandDirection::In,
            mask: OperandMask::ALL,
            literal: true,
        }
    }

    fn parameter(name: String, direction: OperandDirection) -> Self {
        Self {
            name,
            direction,
            mask: OperandMask::ALL,
            literal: false,
        }
    }

    #[must_use]
    pub fn with_mask(mut self, mask: OperandMask) -> Self {
        self.mask = mask;
        self
    }

    /// Parameter name (or literal text) without swizzle.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn direction(&self) -> OperandDirection {
        self.direction
    }

    #[inline]
    #[must_use]
    pub fn mask(&self) -> OperandMask {
        self.mask
    }

    #[inline]
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// Swizzle written after the name, if any. Literals never carry one.
    fn swizzle_suffix(&self) -> Option<&'static str> {
        let swizzle = self.mask.swizzle();
        (!self.literal && !swizzle.is_empty()).then_some(swizzle)
    }

    /// Appends the operand to `out` using `name` in place of the parameter name.
    pub fn push_as(&self, name: &str, out: &mut String) {
        out.push_str(name);
        if let Some(swizzle) = self.swizzle_suffix() {
            out.push('.');
            out.push_str(swizzle);
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)?;
        match self.swizzle_suffix() {
            Some(swizzle) => write!(f, ".{swizzle}"),
            None => Ok(()),
        }
    }
}

/// Formats `value` as a GLSL float literal.
#[must_use]
pub fn float_literal(value: f32) -> String {
    format!("{value:?}")
}

/// One call into a library function: a single instruction of the generated
/// program.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionInvocation {
    function_name: String,
    group_order: i32,
    internal_counter: u32,
    operands: SmallVec<[Operand; 4]>,
}

impl FunctionInvocation {
    #[must_use]
    pub fn new(function_name: impl Into<String>, group_order: i32, internal_counter: u32) -> Self {
        Self {
            function_name: function_name.into(),
            group_order,
            internal_counter,
            operands: SmallVec::new(),
        }
    }

    #[must_use]
    pub fn with_operands(mut self, operands: impl IntoIterator<Item = Operand>) -> Self {
        self.operands.extend(operands);
        self
    }

    pub fn push_operand(&mut self, operand: Operand) {
        self.operands.push(operand);
    }

    #[inline]
    #[must_use]
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    #[inline]
    #[must_use]
    pub fn group_order(&self) -> i32 {
        self.group_order
    }

    #[inline]
    #[must_use]
    pub fn internal_counter(&self) -> u32 {
        self.internal_counter
    }

    #[inline]
    #[must_use]
    pub fn operands(&self) -> &[Operand] {
        &self.operands
    }

    /// Sort key of the atom.
    #[inline]
    #[must_use]
    pub fn order_key(&self) -> (i32, u32) {
        (self.group_order, self.internal_counter)
    }
}

impl fmt::Display for FunctionInvocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}(", self.function_name)?;
        for (i, operand) in self.operands.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{operand}")?;
        }
        f.write_str(");")
    }
}

/// The entry point of a program.
#[derive(Debug, Clone, Default)]
pub struct Function {
    name: String,
    pub(crate) inputs: Vec<ParamId>,
    pub(crate) outputs: Vec<ParamId>,
    pub(crate) locals: Vec<ParamId>,
    atoms: Vec<FunctionInvocation>,
    next_counters: FxHashMap<i32, u32>,
}

impl Function {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn inputs(&self) -> &[ParamId] {
        &self.inputs
    }

    #[inline]
    #[must_use]
    pub fn outputs(&self) -> &[ParamId] {
        &self.outputs
    }

    #[inline]
    #[must_use]
    pub fn locals(&self) -> &[ParamId] {
        &self.locals
    }

    /// Atoms in insertion order.
    #[inline]
    #[must_use]
    pub fn invocations(&self) -> &[FunctionInvocation] {
        &self.atoms
    }

    #[inline]
    #[must_use]
    pub fn invocation_count(&self) -> usize {
        self.atoms.len()
    }

    /// Atoms in emission order: ascending `(group_order, internal_counter)`,
    /// insertion order among equal keys.
    #[must_use]
    pub fn sorted_invocations(&self) -> Vec<&FunctionInvocation> {
        let mut sorted: Vec<_> = self.atoms.iter().collect();
        sorted.sort_by_key(|atom| atom.order_key());
        sorted
    }

    /// Atoms of one group, in insertion order.
    pub fn invocations_in_group(&self, group: i32) -> impl Iterator<Item = &FunctionInvocation> {
        self.atoms.iter().filter(move |atom| atom.group_order == group)
    }

    /// Adds an atom at an explicit position.
    ///
    /// Later atoms added through [`stage`](Self::stage) for the same group
    /// continue after the highest counter seen.
    pub fn add_invocation(&mut self, atom: FunctionInvocation) {
        let next = self.next_counters.entry(atom.group_order).or_insert(0);
        *next = (*next).max(atom.internal_counter.saturating_add(1));
        self.atoms.push(atom);
    }

    /// A builder appending atoms to `group` with increasing counters.
    pub fn stage(&mut self, group: i32) -> FunctionStage<'_> {
        FunctionStage {
            function: self,
            group,
        }
    }

    fn next_counter(&mut self, group: i32) -> u32 {
        let next = self.next_counters.entry(group).or_insert(0);
        let counter = *next;
        *next = next.saturating_add(1);
        counter
    }
}

/// Appends atoms to one group of a [`Function`].
pub struct FunctionStage<'a> {
    function: &'a mut Function,
    group: i32,
}

impl FunctionStage<'_> {
    #[inline]
    #[must_use]
    pub fn group(&self) -> i32 {
        self.group
    }

    /// Appends `function_name(operands...)`.
    pub fn call(
        &mut self,
        function_name: &str,
        operands: impl IntoIterator<Item = Operand>,
    ) -> &mut Self {
        let counter = self.function.next_counter(self.group);
        self.function.atoms.push(
            FunctionInvocation::new(function_name, self.group, counter).with_operands(operands),
        );
        self
    }

    /// Appends `dst = src`.
    pub fn assign(&mut self, src: Operand, dst: Operand) -> &mut Self {
        self.call(ASSIGN_FUNCTION, [src, dst])
    }
}
