//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Block, Func, Type, Value};
use smallvec::SmallVec;
use std::slice;

/// The tag of an instruction, without any of its data.
///
/// The discriminants are laid out so that instruction classification is a
/// range check: `[Neg, BitNot]` are the unary arithmetic operations,
/// `[Add, Le]` are the binary ones (with `[Eq, Le]` being the comparisons),
/// and everything from `Ret` onward is a terminator.
#[repr(u8)]
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Opcode {
    /// `alloca T`, reserves a stack slot.
    Alloca,
    /// `load T, ptr`, reads through a pointer.
    Load,
    /// `store T val, ptr`, writes through a pointer.
    Store,
    /// `cast T val`, converts between scalar types.
    Cast,
    /// `call T @f(args...)`, calls a known function.
    Call,
    /// `neg T val`, arithmetic negation.
    Neg,
    /// `bitnot T val`, bitwise complement.
    BitNot,
    /// `add T a, b`
    Add,
    /// `sub T a, b`
    Sub,
    /// `mul T a, b`
    Mul,
    /// `div T a, b`, signed division.
    Div,
    /// `mod T a, b`, signed remainder.
    Mod,
    /// `bitand T a, b`
    BitAnd,
    /// `bitor T a, b`
    BitOr,
    /// `bitxor T a, b`
    BitXor,
    /// `eq T a, b`, yields `bool`.
    Eq,
    /// `ne T a, b`, yields `bool`.
    Ne,
    /// `lt T a, b`, signed less-than, yields `bool`.
    Lt,
    /// `le T a, b`, signed less-or-equal, yields `bool`.
    Le,
    /// `ret` / `ret T val`, returns from the function.
    Ret,
    /// `br target(args...)`, unconditional branch.
    Br,
    /// `condbr cond, then(args...), else(args...)`, conditional branch.
    CondBr,
}

impl Opcode {
    /// Checks if the opcode is one of the unary arithmetic operations.
    #[inline]
    pub fn is_unary(self) -> bool {
        Self::Neg <= self && self <= Self::BitNot
    }

    /// Checks if the opcode is one of the binary operations (including
    /// the comparisons).
    #[inline]
    pub fn is_binary(self) -> bool {
        Self::Add <= self && self <= Self::Le
    }

    /// Checks if the opcode is one of the comparisons.
    #[inline]
    pub fn is_comparison(self) -> bool {
        Self::Eq <= self && self <= Self::Le
    }

    /// Checks if the opcode is arithmetic in the value-numbering sense,
    /// i.e. a pure unary/binary computation over its operands.
    #[inline]
    pub fn is_arithmetic(self) -> bool {
        Self::Neg <= self && self <= Self::Le
    }

    /// Checks if the opcode is a terminator. Exactly one of these ends
    /// every basic block.
    #[inline]
    pub fn is_terminator(self) -> bool {
        Self::Ret <= self
    }

    /// The name of the opcode in the textual form of the IR.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Self::Alloca => "alloca",
            Self::Load => "load",
            Self::Store => "store",
            Self::Cast => "cast",
            Self::Call => "call",
            Self::Neg => "neg",
            Self::BitNot => "bitnot",
            Self::Add => "add",
            Self::Sub => "sub",
            Self::Mul => "mul",
            Self::Div => "div",
            Self::Mod => "mod",
            Self::BitAnd => "bitand",
            Self::BitOr => "bitor",
            Self::BitXor => "bitxor",
            Self::Eq => "eq",
            Self::Ne => "ne",
            Self::Lt => "lt",
            Self::Le => "le",
            Self::Ret => "ret",
            Self::Br => "br",
            Self::CondBr => "condbr",
        }
    }
}

/// A branch target along with the arguments being passed to it, i.e. the
/// `target(int %0, int %1)` part of a branch instruction.
///
/// This is the type the builders take for anything that jumps somewhere.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BlockWithParams {
    block: Block,
    args: SmallVec<[Value; 2]>,
}

impl BlockWithParams {
    /// Creates a target that passes the given arguments to `block`.
    pub fn new(block: Block, args: &[Value]) -> Self {
        Self {
            block,
            args: SmallVec::from_slice(args),
        }
    }

    /// Creates a target that passes no arguments to `block`.
    pub fn to(block: Block) -> Self {
        Self::new(block, &[])
    }

    /// The block being jumped to.
    pub fn block(&self) -> Block {
        self.block
    }

    /// The arguments being passed along the edge.
    pub fn args(&self) -> &[Value] {
        &self.args
    }
}

/// These are the properties that any transform or analysis pass needs to
/// be able to observe for any given instruction in any block.
pub trait Instruction {
    /// Gets the values that the instruction operates on.
    ///
    /// Note that this may be an empty array, it is not safe to assume that
    /// there is at least one operand. For branches this includes the
    /// arguments being passed to the target blocks.
    fn operands(&self) -> &[Value];

    /// Gets the type of the instruction's result after it has been
    /// evaluated.
    ///
    /// Not all instructions have one of these; terminators, `store`s and
    /// `call`s of `void` functions do not evaluate to anything.
    fn result_ty(&self) -> Option<Type>;
}

/// Models a terminator, i.e. the only instructions that are allowed at the
/// end of a basic block.
///
/// All terminators transfer control flow *somewhere* unless they end
/// execution, so users need to be able to query where control could be
/// transferred to.
pub trait Terminator: Instruction {
    /// Gets the possible blocks where control could be transferred to once
    /// this instruction is executed.
    ///
    /// Note that this might be empty, see `ret`.
    fn targets(&self) -> &[Block];
}

/// A single `alloca` instruction. Reserves storage in the function's stack
/// frame and yields the address of that storage.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AllocaInst {
    alloc: Type,
    result: Type,
}

impl AllocaInst {
    pub(in crate::ir) fn new(alloc: Type, result: Type) -> Self {
        Self { alloc, result }
    }

    /// The type being allocated. The instruction's result is a pointer
    /// to this type.
    pub fn alloc_ty(&self) -> Type {
        self.alloc
    }
}

impl Instruction for AllocaInst {
    fn operands(&self) -> &[Value] {
        &[]
    }

    fn result_ty(&self) -> Option<Type> {
        Some(self.result)
    }
}

/// A single `load` instruction.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LoadInst {
    operands: [Value; 1],
    result: Type,
}

impl LoadInst {
    pub(in crate::ir) fn new(pointer: Value, result: Type) -> Self {
        Self {
            operands: [pointer],
            result,
        }
    }

    /// The address being loaded from.
    pub fn pointer(&self) -> Value {
        self.operands[0]
    }
}

impl Instruction for LoadInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        Some(self.result)
    }
}

/// A single `store` instruction. Yields nothing.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StoreInst {
    // [value being stored, address being stored to]
    operands: [Value; 2],
}

impl StoreInst {
    pub(in crate::ir) fn new(stored: Value, pointer: Value) -> Self {
        Self {
            operands: [stored, pointer],
        }
    }

    /// The value being written to memory.
    pub fn stored(&self) -> Value {
        self.operands[0]
    }

    /// The address being written to.
    pub fn pointer(&self) -> Value {
        self.operands[1]
    }
}

impl Instruction for StoreInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        None
    }
}

/// A single `cast` instruction, converting a scalar value to a
/// different scalar type.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CastInst {
    operands: [Value; 1],
    result: Type,
}

impl CastInst {
    pub(in crate::ir) fn new(operand: Value, into: Type) -> Self {
        Self {
            operands: [operand],
            result: into,
        }
    }

    /// The value being converted.
    pub fn operand(&self) -> Value {
        self.operands[0]
    }
}

impl Instruction for CastInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        Some(self.result)
    }
}

/// One of the unary arithmetic instructions (`neg`, `bitnot`). The result
/// has the same type as the operand.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnaryInst {
    operands: [Value; 1],
    result: Type,
}

impl UnaryInst {
    pub(in crate::ir) fn new(ty: Type, operand: Value) -> Self {
        Self {
            operands: [operand],
            result: ty,
        }
    }

    /// The single operand of the instruction.
    pub fn operand(&self) -> Value {
        self.operands[0]
    }
}

impl Instruction for UnaryInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        Some(self.result)
    }
}

/// One of the binary arithmetic instructions. Both operands have the
/// instruction's type, and so does the result.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BinaryInst {
    operands: [Value; 2],
    result: Type,
}

impl BinaryInst {
    pub(in crate::ir) fn new(ty: Type, lhs: Value, rhs: Value) -> Self {
        Self {
            operands: [lhs, rhs],
            result: ty,
        }
    }

    /// The left-hand operand. For `add T %a, %b` this is `%a`.
    pub fn lhs(&self) -> Value {
        self.operands[0]
    }

    /// The right-hand operand. For `add T %a, %b` this is `%b`.
    pub fn rhs(&self) -> Value {
        self.operands[1]
    }
}

impl Instruction for BinaryInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        Some(self.result)
    }
}

/// One of the comparison instructions (`eq`, `ne`, `lt`, `le`). The
/// operands share a type and the result is always `bool`.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CmpInst {
    operands: [Value; 2],
}

impl CmpInst {
    pub(in crate::ir) fn new(lhs: Value, rhs: Value) -> Self {
        Self {
            operands: [lhs, rhs],
        }
    }

    /// The left-hand operand of the comparison.
    pub fn lhs(&self) -> Value {
        self.operands[0]
    }

    /// The right-hand operand of the comparison.
    pub fn rhs(&self) -> Value {
        self.operands[1]
    }
}

impl Instruction for CmpInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        Some(Type::bool())
    }
}

/// A single `call` instruction, calling a statically-known function.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallInst {
    callee: Func,
    func_ty: Type,
    result: Option<Type>,
    operands: SmallVec<[Value; 4]>,
}

impl CallInst {
    pub(in crate::ir) fn new(
        callee: Func,
        func_ty: Type,
        result: Option<Type>,
        args: &[Value],
    ) -> Self {
        Self {
            callee,
            func_ty,
            result,
            operands: SmallVec::from_slice(args),
        }
    }

    /// The function being called.
    pub fn callee(&self) -> Func {
        self.callee
    }

    /// The type of the function being called.
    pub fn func_ty(&self) -> Type {
        self.func_ty
    }

    /// The arguments being passed to the callee.
    pub fn args(&self) -> &[Value] {
        &self.operands
    }
}

impl Instruction for CallInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        self.result
    }
}

/// A single `ret` instruction. The operand is absent for `void` returns.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RetInst {
    operands: SmallVec<[Value; 1]>,
}

impl RetInst {
    pub(in crate::ir) fn new(value: Option<Value>) -> Self {
        Self {
            operands: value.into_iter().collect(),
        }
    }

    /// The value being returned, if the function returns one.
    pub fn value(&self) -> Option<Value> {
        self.operands.first().copied()
    }
}

impl Instruction for RetInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        None
    }
}

impl Terminator for RetInst {
    fn targets(&self) -> &[Block] {
        &[]
    }
}

/// A single unconditional `br` instruction. The operands are the arguments
/// being passed to the target block's parameters.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BrInst {
    target: Block,
    operands: SmallVec<[Value; 2]>,
}

impl BrInst {
    pub(in crate::ir) fn new(target: BlockWithParams) -> Self {
        Self {
            target: target.block,
            operands: target.args,
        }
    }

    /// The block being jumped to.
    pub fn target(&self) -> Block {
        self.target
    }

    /// The arguments being passed to the target's parameters.
    pub fn args(&self) -> &[Value] {
        &self.operands
    }

    pub(in crate::ir) fn set_target(&mut self, to: Block) {
        self.target = to;
    }

    pub(in crate::ir) fn push_arg(&mut self, arg: Value) {
        self.operands.push(arg);
    }

    pub(in crate::ir) fn remove_arg(&mut self, index: usize) -> Value {
        self.operands.remove(index)
    }
}

impl Instruction for BrInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        None
    }
}

impl Terminator for BrInst {
    fn targets(&self) -> &[Block] {
        slice::from_ref(&self.target)
    }
}

/// A single conditional `condbr` instruction.
///
/// The instruction stores a single operand vector laid out as
/// `[cond, then-args..., else-args...]`; the boundary between the two
/// argument lists is tracked by one offset, and every argument mutation
/// keeps that offset consistent.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CondBrInst {
    targets: [Block; 2],
    operands: SmallVec<[Value; 4]>,
    else_idx: u32,
}

impl CondBrInst {
    pub(in crate::ir) fn new(
        cond: Value,
        if_true: BlockWithParams,
        otherwise: BlockWithParams,
    ) -> Self {
        let mut operands = SmallVec::with_capacity(1 + if_true.args.len() + otherwise.args.len());

        operands.push(cond);
        operands.extend_from_slice(&if_true.args);

        let else_idx = operands.len() as u32;

        operands.extend_from_slice(&otherwise.args);

        Self {
            targets: [if_true.block, otherwise.block],
            operands,
            else_idx,
        }
    }

    /// The `bool` condition being branched on.
    pub fn condition(&self) -> Value {
        self.operands[0]
    }

    /// The block jumped to when the condition is true.
    pub fn true_branch(&self) -> Block {
        self.targets[0]
    }

    /// The block jumped to when the condition is false.
    pub fn false_branch(&self) -> Block {
        self.targets[1]
    }

    /// Both targets, true branch first.
    pub fn blocks(&self) -> &[Block] {
        &self.targets
    }

    /// The arguments passed along one side of the branch; side 0 is the
    /// true branch, side 1 the false branch.
    pub fn args_of(&self, side: usize) -> &[Value] {
        let else_idx = self.else_idx as usize;

        match side {
            0 => &self.operands[1..else_idx],
            1 => &self.operands[else_idx..],
            _ => panic!("conditional branches only have two sides"),
        }
    }

    pub(in crate::ir) fn set_target(&mut self, side: usize, to: Block) {
        self.targets[side] = to;
    }

    pub(in crate::ir) fn push_arg(&mut self, side: usize, arg: Value) {
        match side {
            0 => {
                self.operands.insert(self.else_idx as usize, arg);
                self.else_idx += 1;
            }
            1 => self.operands.push(arg),
            _ => panic!("conditional branches only have two sides"),
        }
    }

    pub(in crate::ir) fn remove_arg(&mut self, side: usize, index: usize) -> Value {
        match side {
            0 => {
                debug_assert!(1 + index < self.else_idx as usize);

                self.else_idx -= 1;

                self.operands.remove(1 + index)
            }
            1 => self.operands.remove(self.else_idx as usize + index),
            _ => panic!("conditional branches only have two sides"),
        }
    }
}

impl Instruction for CondBrInst {
    fn operands(&self) -> &[Value] {
        &self.operands
    }

    fn result_ty(&self) -> Option<Type> {
        None
    }
}

impl Terminator for CondBrInst {
    fn targets(&self) -> &[Block] {
        &self.targets
    }
}

/// This holds both the opcode of a given instruction and all the state that
/// makes up that specific instruction.
///
/// While each instruction may have wildly different actual data, they are
/// all stored in the same table and all inside the same `InstData` type.
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InstData {
    /// An `alloca` instruction.
    Alloca(AllocaInst),
    /// A `load` instruction.
    Load(LoadInst),
    /// A `store` instruction.
    Store(StoreInst),
    /// A `cast` instruction.
    Cast(CastInst),
    /// A `call` instruction.
    Call(CallInst),
    /// A `neg` instruction.
    Neg(UnaryInst),
    /// A `bitnot` instruction.
    BitNot(UnaryInst),
    /// An `add` instruction.
    Add(BinaryInst),
    /// A `sub` instruction.
    Sub(BinaryInst),
    /// A `mul` instruction.
    Mul(BinaryInst),
    /// A `div` instruction.
    Div(BinaryInst),
    /// A `mod` instruction.
    Mod(BinaryInst),
    /// A `bitand` instruction.
    BitAnd(BinaryInst),
    /// A `bitor` instruction.
    BitOr(BinaryInst),
    /// A `bitxor` instruction.
    BitXor(BinaryInst),
    /// An `eq` comparison.
    Eq(CmpInst),
    /// An `ne` comparison.
    Ne(CmpInst),
    /// An `lt` comparison.
    Lt(CmpInst),
    /// An `le` comparison.
    Le(CmpInst),
    /// A `ret` terminator.
    Ret(RetInst),
    /// An unconditional `br` terminator.
    Br(BrInst),
    /// A conditional `condbr` terminator.
    CondBr(CondBrInst),
}

impl InstData {
    /// Gets the opcode of the instruction, without any of its data.
    pub fn opcode(&self) -> Opcode {
        match self {
            Self::Alloca(_) => Opcode::Alloca,
            Self::Load(_) => Opcode::Load,
            Self::Store(_) => Opcode::Store,
            Self::Cast(_) => Opcode::Cast,
            Self::Call(_) => Opcode::Call,
            Self::Neg(_) => Opcode::Neg,
            Self::BitNot(_) => Opcode::BitNot,
            Self::Add(_) => Opcode::Add,
            Self::Sub(_) => Opcode::Sub,
            Self::Mul(_) => Opcode::Mul,
            Self::Div(_) => Opcode::Div,
            Self::Mod(_) => Opcode::Mod,
            Self::BitAnd(_) => Opcode::BitAnd,
            Self::BitOr(_) => Opcode::BitOr,
            Self::BitXor(_) => Opcode::BitXor,
            Self::Eq(_) => Opcode::Eq,
            Self::Ne(_) => Opcode::Ne,
            Self::Lt(_) => Opcode::Lt,
            Self::Le(_) => Opcode::Le,
            Self::Ret(_) => Opcode::Ret,
            Self::Br(_) => Opcode::Br,
            Self::CondBr(_) => Opcode::CondBr,
        }
    }

    /// If the instruction is a terminator, gets the blocks that it could
    /// transfer control to. `ret` yields an empty list; non-terminators
    /// yield `None`.
    pub fn branch_targets(&self) -> Option<&[Block]> {
        match self {
            Self::Ret(ret) => Some(ret.targets()),
            Self::Br(br) => Some(br.targets()),
            Self::CondBr(condbr) => Some(condbr.targets()),
            _ => None,
        }
    }

    pub(in crate::ir) fn operands_mut(&mut self) -> &mut [Value] {
        match self {
            Self::Alloca(_) => &mut [],
            Self::Load(i) => &mut i.operands,
            Self::Store(i) => &mut i.operands,
            Self::Cast(i) => &mut i.operands,
            Self::Call(i) => &mut i.operands,
            Self::Neg(i) | Self::BitNot(i) => &mut i.operands,
            Self::Add(i)
            | Self::Sub(i)
            | Self::Mul(i)
            | Self::Div(i)
            | Self::Mod(i)
            | Self::BitAnd(i)
            | Self::BitOr(i)
            | Self::BitXor(i) => &mut i.operands,
            Self::Eq(i) | Self::Ne(i) | Self::Lt(i) | Self::Le(i) => &mut i.operands,
            Self::Ret(i) => &mut i.operands,
            Self::Br(i) => &mut i.operands,
            Self::CondBr(i) => &mut i.operands,
        }
    }
}

impl Instruction for InstData {
    fn operands(&self) -> &[Value] {
        match self {
            Self::Alloca(i) => i.operands(),
            Self::Load(i) => i.operands(),
            Self::Store(i) => i.operands(),
            Self::Cast(i) => i.operands(),
            Self::Call(i) => i.operands(),
            Self::Neg(i) | Self::BitNot(i) => i.operands(),
            Self::Add(i)
            | Self::Sub(i)
            | Self::Mul(i)
            | Self::Div(i)
            | Self::Mod(i)
            | Self::BitAnd(i)
            | Self::BitOr(i)
            | Self::BitXor(i) => i.operands(),
            Self::Eq(i) | Self::Ne(i) | Self::Lt(i) | Self::Le(i) => i.operands(),
            Self::Ret(i) => i.operands(),
            Self::Br(i) => i.operands(),
            Self::CondBr(i) => i.operands(),
        }
    }

    fn result_ty(&self) -> Option<Type> {
        match self {
            Self::Alloca(i) => i.result_ty(),
            Self::Load(i) => i.result_ty(),
            Self::Store(i) => i.result_ty(),
            Self::Cast(i) => i.result_ty(),
            Self::Call(i) => i.result_ty(),
            Self::Neg(i) | Self::BitNot(i) => i.result_ty(),
            Self::Add(i)
            | Self::Sub(i)
            | Self::Mul(i)
            | Self::Div(i)
            | Self::Mod(i)
            | Self::BitAnd(i)
            | Self::BitOr(i)
            | Self::BitXor(i) => i.result_ty(),
            Self::Eq(i) | Self::Ne(i) | Self::Lt(i) | Self::Le(i) => i.result_ty(),
            Self::Ret(i) => i.result_ty(),
            Self::Br(i) => i.result_ty(),
            Self::CondBr(i) => i.result_ty(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::ArenaKey;

    #[test]
    fn opcode_ranges() {
        assert!(Opcode::Neg.is_unary());
        assert!(Opcode::BitNot.is_unary());
        assert!(!Opcode::Add.is_unary());

        assert!(Opcode::Add.is_binary());
        assert!(Opcode::Le.is_binary());
        assert!(!Opcode::Neg.is_binary());
        assert!(!Opcode::Ret.is_binary());

        assert!(Opcode::Eq.is_comparison());
        assert!(!Opcode::BitXor.is_comparison());

        assert!(Opcode::Ret.is_terminator());
        assert!(Opcode::Br.is_terminator());
        assert!(Opcode::CondBr.is_terminator());
        assert!(!Opcode::Call.is_terminator());

        assert!(Opcode::Neg.is_arithmetic());
        assert!(Opcode::Le.is_arithmetic());
        assert!(!Opcode::Load.is_arithmetic());
        assert!(!Opcode::Br.is_arithmetic());
    }

    #[test]
    fn condbr_arg_offset_stays_consistent() {
        let (a, b, c) = (Value::new(0), Value::new(1), Value::new(2));
        let (t, f) = (Block::new(0), Block::new(1));

        let mut br = CondBrInst::new(a, BlockWithParams::new(t, &[b]), BlockWithParams::to(f));

        assert_eq!(br.args_of(0), &[b]);
        assert_eq!(br.args_of(1), &[]);

        br.push_arg(1, c);
        br.push_arg(0, c);

        assert_eq!(br.args_of(0), &[b, c]);
        assert_eq!(br.args_of(1), &[c]);
        assert_eq!(br.condition(), a);

        let removed = br.remove_arg(0, 0);

        assert_eq!(removed, b);
        assert_eq!(br.args_of(0), &[c]);
        assert_eq!(br.args_of(1), &[c]);
    }
}
