//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::{ArenaKey, ArenaMap, SecondaryMap};
use crate::dense_arena_key;
use crate::ir::{BasicBlock, Block, DebugInfo, GlobalVar, InstData, Instruction, Type};
use crate::utility::{SaHashMap, Str};
use smallvec::{smallvec, SmallVec};
use static_assertions::assert_eq_size;

dense_arena_key! {
    struct EntityRef;

    /// A basic reference to some value, either the result of some
    /// computation, a block parameter, an interned constant, or the address
    /// of a global. Since everything is function-scoped in this IR, this is
    /// effectively equivalent to an `llvm::Value*`.
    ///
    /// These are completely useless without the [`DataFlowGraph`] they came
    /// from, as they are just keys into a giant table. The graph contains
    /// all the information that actually makes these useful.
    pub struct Value;

    /// While [`Value`]s refer to a result of some sort, [`Inst`]s refer to
    /// the instructions themselves. This has a subtly different meaning: an
    /// [`Inst`] may not actually refer to something that produces a
    /// *result*.
    ///
    /// Some instructions only perform side effects (e.g. `store` and
    /// `call`s of `void` functions), some model control flow (`ret`, `br`).
    /// These can never be referred to with [`Value`]s, but they *can* be
    /// referred to with [`Inst`]s.
    pub struct Inst;
}

// this enables us to turn `Value`s into `Inst`s or `EntityRef`s and back,
// which is what lets all the entities live in one homogeneous table
impl Value {
    pub(in crate::ir) fn raw_from(key: impl ArenaKey) -> Self {
        Self::new(key.index())
    }

    pub(in crate::ir) fn raw_into<T: ArenaKey>(self) -> T {
        T::new(self.index())
    }
}

impl Inst {
    pub(in crate::ir) fn raw_from(key: impl ArenaKey) -> Self {
        Self::new(key.index())
    }

    pub(in crate::ir) fn raw_into<T: ArenaKey>(self) -> T {
        T::new(self.index())
    }
}

/// The payload of an interned constant.
///
/// Constants are values without a defining instruction; they are created
/// through the interning methods on [`DataFlowGraph`] and always compare
/// equal (as [`Value`]s) when their payloads are equal.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ConstantData {
    /// An integer constant of a given integer type.
    Int {
        /// The type the constant has when used as an operand.
        ty: Type,
        /// The value, stored sign-extended regardless of `ty`.
        value: i64,
    },
    /// A `bool` constant.
    Bool(bool),
    /// A typed `undef` value, used for reads of uninitialized memory.
    Undef(Type),
}

#[derive(Debug, Clone, Hash, Eq, PartialEq)]
enum EntityData {
    Inst(InstData),
    Param(Block),
    Const(ConstantData),
    Global(GlobalVar),
}

/// Models where a given value came from.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValueDef {
    /// The value is the result yielded by an instruction.
    Inst(Inst),
    /// The value is the n-th block parameter of a block.
    Param(Block, u32),
    /// The value is an interned constant.
    Const,
    /// The value is the address of a module-level global.
    Global(GlobalVar),
}

assert_eq_size!(ValueDef, [u32; 3]);

#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
struct ValueDefinition {
    ty: Type,
    data: ValueDef,
}

/// Owns all of the instructions, basic blocks, values, and everything else
/// in a given function. Also models all the data-flow information between
/// instructions, although it does not model any of the actual code layout
/// information (block ordering, instruction ordering; see
/// [`Layout`](crate::ir::Layout)).
///
/// The def-use edges are bidirectional: every operand edge from an
/// instruction to a value is also recorded in the used value's user list,
/// once per edge, and every branch is recorded in its target blocks' user
/// lists. Predecessor sets are derived from exactly those lists.
#[derive(Debug, Clone, Default)]
pub struct DataFlowGraph {
    //
    // fundamental magic for this whole data structure:
    //   1. every 'entity' (instruction, block param, constant, global ref)
    //      has a slot in `entities`
    //   2. every Inst has the same key value as its associated entity
    //   3. every Value has the same key value as the entity that *yields*
    //      it, and also has a slot in `values`
    //
    // this means that (valid) Insts and Values can **always** be used as
    // EntityRefs, but Insts and Values themselves can only be converted
    // into each other when the instruction is known to have a result
    blocks: ArenaMap<Block, BasicBlock>,
    block_names: SaHashMap<Str, Block>,
    entities: ArenaMap<EntityRef, EntityData>,
    values: SecondaryMap<Value, ValueDefinition>,
    debug: SecondaryMap<EntityRef, DebugInfo>,
    uses: SecondaryMap<Value, SmallVec<[Inst; 4]>>,
    branch_users: SecondaryMap<Block, SmallVec<[Inst; 2]>>,
    constants: SaHashMap<ConstantData, Value>,
    globals: SaHashMap<GlobalVar, Value>,
}

impl DataFlowGraph {
    /// Creates a new data-flow graph for a new function.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a basic block with a given name into the graph. It starts
    /// with an empty list of block parameters, these can be appended later.
    pub fn create_block(&mut self, name: Str) -> Block {
        let bb = self.blocks.insert(BasicBlock::new(name));

        self.block_names.insert(name, bb);

        bb
    }

    /// Finds a block by name, if one with that name was created.
    pub fn find_block(&self, name: Str) -> Option<Block> {
        self.block_names.get(&name).copied()
    }

    /// Resolves a block key into a full [`BasicBlock`].
    pub fn block(&self, block: Block) -> &BasicBlock {
        &self.blocks[block]
    }

    /// Checks if the graph contains a given block.
    pub fn is_block_inserted(&self, block: Block) -> bool {
        self.blocks.contains(block)
    }

    /// Gets the parameters of a block, in declaration order.
    pub fn block_params(&self, block: Block) -> &[Value] {
        self.blocks[block].params()
    }

    /// Appends a block parameter of a given type to a block, and returns
    /// the value that refers to it.
    pub fn append_block_param(&mut self, bb: Block, ty: Type, debug: DebugInfo) -> Value {
        let index = self.blocks[bb].params().len() as u32;
        let k = self.entities.insert(EntityData::Param(bb));
        let val = Value::raw_from(k);

        self.debug.insert(k, debug);
        self.values.insert(
            val,
            ValueDefinition {
                ty,
                data: ValueDef::Param(bb, index),
            },
        );
        self.blocks[bb].append_param(val);

        val
    }

    /// Removes a block parameter from its block, keeping the indices of
    /// the surviving parameters in sync.
    ///
    /// The caller is responsible for having rewritten any branch arguments
    /// and uses that referred to the parameter.
    pub fn remove_block_param(&mut self, bb: Block, param: Value) {
        let index = match self.values[param].data {
            ValueDef::Param(block, index) => {
                debug_assert_eq!(block, bb, "parameter does not belong to this block");

                index as usize
            }
            _ => panic!("tried to remove a value that isn't a block parameter"),
        };

        let removed = self.blocks[bb].remove_param_at(index);

        debug_assert_eq!(removed, param);

        // everything after `index` shifted down by one
        let survivors: SmallVec<[Value; 4]> =
            self.blocks[bb].params()[index..].iter().copied().collect();

        for (offset, survivor) in survivors.into_iter().enumerate() {
            self.values[survivor].data = ValueDef::Param(bb, (index + offset) as u32);
        }
    }

    /// Inserts an instruction into the graph and returns a reference to it.
    /// If the instruction yields a result (and thus can be used as an
    /// operand for other instructions), that value is the second return.
    ///
    /// Every operand edge is registered in the operand's user list, and
    /// branches are registered with their target blocks.
    pub fn create_inst(&mut self, data: InstData, debug: DebugInfo) -> (Inst, Option<Value>) {
        let result = data.result_ty();
        let operands: SmallVec<[Value; 4]> = SmallVec::from_slice(data.operands());
        let targets: SmallVec<[Block; 2]> = match data.branch_targets() {
            Some(targets) => SmallVec::from_slice(targets),
            None => SmallVec::new(),
        };

        let k = self.entities.insert(EntityData::Inst(data));
        let inst = Inst::raw_from(k);

        self.debug.insert(k, debug);

        for op in operands {
            self.add_use(op, inst);
        }

        for target in targets {
            self.branch_users_mut(target).push(inst);
        }

        match result {
            Some(ty) => {
                let val = Value::raw_from(k);

                self.values.insert(
                    val,
                    ValueDefinition {
                        ty,
                        data: ValueDef::Inst(inst),
                    },
                );

                (inst, Some(val))
            }
            None => (inst, None),
        }
    }

    // breaks every edge the instruction participates in: its operand edges
    // are removed from the used values' user lists, and its target edges
    // are removed from the blocks' branch-user lists. called exactly once,
    // when the instruction is removed from the layout.
    pub(in crate::ir) fn detach_inst(&mut self, inst: Inst) {
        let data = self.data(inst);
        let operands: SmallVec<[Value; 4]> = SmallVec::from_slice(data.operands());
        let targets: SmallVec<[Block; 2]> = match data.branch_targets() {
            Some(targets) => SmallVec::from_slice(targets),
            None => SmallVec::new(),
        };

        for op in operands {
            self.remove_one_use(op, inst);
        }

        for target in targets {
            self.remove_one_branch_user(target, inst);
        }
    }

    /// Gets a single instruction's [`InstData`].
    pub fn data(&self, inst: Inst) -> &InstData {
        match &self.entities[inst.raw_into()] {
            EntityData::Inst(data) => data,
            _ => unreachable!("got an `Inst` that did not refer to an instruction"),
        }
    }

    fn data_mut(&mut self, inst: Inst) -> &mut InstData {
        match &mut self.entities[inst.raw_into()] {
            EntityData::Inst(data) => data,
            _ => unreachable!("got an `Inst` that did not refer to an instruction"),
        }
    }

    /// Gets a single instruction's [`DebugInfo`].
    pub fn inst_debug(&self, inst: Inst) -> DebugInfo {
        self.debug[inst.raw_into()]
    }

    /// Gets a single value's [`DebugInfo`].
    pub fn debug(&self, value: Value) -> DebugInfo {
        self.debug[value.raw_into()]
    }

    /// Gets the type of the value that a given [`Value`] evaluates to.
    pub fn ty(&self, value: Value) -> Type {
        self.values[value].ty
    }

    /// Gets the definition of a given value.
    pub fn value_def(&self, value: Value) -> ValueDef {
        self.values[value].data
    }

    /// Converts a [`Value`] into an [`Inst`] if and only if that value
    /// refers to an instruction's result.
    pub fn value_to_inst(&self, value: Value) -> Option<Inst> {
        match self.values[value].data {
            ValueDef::Inst(_) => Some(value.raw_into()),
            _ => None,
        }
    }

    /// Converts an [`Inst`] into a [`Value`] referring to its result if and
    /// only if that instruction actually yields a result.
    pub fn inst_to_result(&self, inst: Inst) -> Option<Value> {
        self.values.get(inst.raw_into()).map(|_| inst.raw_into())
    }

    /// Checks if a given value is a block parameter.
    pub fn is_block_param(&self, value: Value) -> bool {
        matches!(self.values[value].data, ValueDef::Param(_, _))
    }

    /// Checks if a given value is an interned constant.
    pub fn is_constant(&self, value: Value) -> bool {
        matches!(self.values[value].data, ValueDef::Const)
    }

    /// Interns an integer constant of a given integer type.
    ///
    /// Asking for the same `(type, value)` pair twice yields the same
    /// [`Value`] both times.
    pub fn iconst(&mut self, ty: Type, value: i64) -> Value {
        debug_assert!(ty.is_integer(), "integer constants must have integer type");

        self.constant(ConstantData::Int { ty, value }, ty)
    }

    /// Interns an integer literal, choosing its type the way the front-end
    /// does: an i32-representable literal gets type `int`, anything larger
    /// gets `long`.
    pub fn int_literal(&mut self, value: i64) -> Value {
        let ty = if i32::try_from(value).is_ok() {
            Type::int()
        } else {
            Type::long()
        };

        self.iconst(ty, value)
    }

    /// Interns a `bool` constant.
    pub fn bconst(&mut self, value: bool) -> Value {
        self.constant(ConstantData::Bool(value), Type::bool())
    }

    /// Interns a typed `undef` value.
    pub fn undef(&mut self, ty: Type) -> Value {
        self.constant(ConstantData::Undef(ty), ty)
    }

    /// If `value` is an interned constant, returns its payload.
    pub fn constant_data(&self, value: Value) -> Option<&ConstantData> {
        match &self.entities[value.raw_into()] {
            EntityData::Const(data) => Some(data),
            _ => None,
        }
    }

    /// If `value` is an integer constant, returns it as an `i64`.
    pub fn value_as_int(&self, value: Value) -> Option<i64> {
        match self.constant_data(value) {
            Some(ConstantData::Int { value, .. }) => Some(*value),
            _ => None,
        }
    }

    /// If `value` is a `bool` constant, returns it.
    pub fn value_as_bool(&self, value: Value) -> Option<bool> {
        match self.constant_data(value) {
            Some(ConstantData::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    /// Imports the address of a module-level global into the function,
    /// interned by global. `ptr_ty` is the pointer-to-underlying type the
    /// address has when used as an operand.
    pub fn import_global(&mut self, global: GlobalVar, ptr_ty: Type) -> Value {
        if let Some(&existing) = self.globals.get(&global) {
            return existing;
        }

        let k = self.entities.insert(EntityData::Global(global));
        let val = Value::raw_from(k);

        self.debug.insert(k, DebugInfo::fake());
        self.values.insert(
            val,
            ValueDefinition {
                ty: ptr_ty,
                data: ValueDef::Global(global),
            },
        );
        self.globals.insert(global, val);

        val
    }

    /// Gets every instruction currently using `value` as an operand, one
    /// entry per operand edge.
    pub fn users(&self, value: Value) -> &[Inst] {
        self.uses.get(value).map(|list| list.as_slice()).unwrap_or(&[])
    }

    /// Gets every branch instruction currently targeting `block`, one
    /// entry per edge. The block's predecessors are exactly the blocks
    /// containing these instructions.
    pub fn block_branch_users(&self, block: Block) -> &[Inst] {
        self.branch_users
            .get(block)
            .map(|list| list.as_slice())
            .unwrap_or(&[])
    }

    /// Rewrites every use of `old` (including branch arguments) to refer
    /// to `new` instead, updating the user lists on both ends.
    pub fn replace_uses_with(&mut self, old: Value, new: Value) {
        if old == new {
            return;
        }

        let list = match self.uses.remove(old) {
            Some(list) => list,
            None => return,
        };

        // the list has one entry per edge, so an instruction using `old`
        // several times appears several times. we rewrite all of its edges
        // the first time we see it and skip the duplicates.
        let mut seen: SmallVec<[Inst; 8]> = SmallVec::new();

        for user in list {
            if seen.contains(&user) {
                continue;
            }

            seen.push(user);

            let mut replaced = 0usize;

            {
                let data = self.data_mut(user);

                for op in data.operands_mut() {
                    if *op == old {
                        *op = new;
                        replaced += 1;
                    }
                }
            }

            for _ in 0..replaced {
                self.add_use(new, user);
            }
        }
    }

    /// The number of sides a branch has: 1 for `br`, 2 for `condbr`,
    /// 0 for anything else.
    pub fn branch_sides(&self, inst: Inst) -> usize {
        match self.data(inst) {
            InstData::Br(_) => 1,
            InstData::CondBr(_) => 2,
            _ => 0,
        }
    }

    /// The target block of one side of a branch.
    pub fn branch_side_target(&self, inst: Inst, side: usize) -> Block {
        match self.data(inst) {
            InstData::Br(br) => {
                debug_assert_eq!(side, 0);

                br.target()
            }
            InstData::CondBr(condbr) => condbr.blocks()[side],
            _ => panic!("instruction is not a branch"),
        }
    }

    /// The arguments passed along one side of a branch.
    pub fn branch_side_args(&self, inst: Inst, side: usize) -> &[Value] {
        match self.data(inst) {
            InstData::Br(br) => {
                debug_assert_eq!(side, 0);

                br.args()
            }
            InstData::CondBr(condbr) => condbr.args_of(side),
            _ => panic!("instruction is not a branch"),
        }
    }

    /// Every side of a branch that targets `block`. A conditional branch
    /// can target the same block on both sides.
    pub fn branch_sides_to(&self, inst: Inst, block: Block) -> SmallVec<[usize; 2]> {
        (0..self.branch_sides(inst))
            .filter(|&side| self.branch_side_target(inst, side) == block)
            .collect()
    }

    /// Points one side of a branch at a different block, keeping the
    /// branch-user bookkeeping consistent. The arguments on that side are
    /// left untouched.
    pub fn set_branch_side_target(&mut self, inst: Inst, side: usize, to: Block) {
        let from = self.branch_side_target(inst, side);

        if from == to {
            return;
        }

        match self.data_mut(inst) {
            InstData::Br(br) => br.set_target(to),
            InstData::CondBr(condbr) => condbr.set_target(side, to),
            _ => unreachable!(),
        }

        self.remove_one_branch_user(from, inst);
        self.branch_users_mut(to).push(inst);
    }

    /// Appends an argument to one side of a branch, registering the
    /// new operand edge.
    pub fn append_branch_side_arg(&mut self, inst: Inst, side: usize, arg: Value) {
        match self.data_mut(inst) {
            InstData::Br(br) => {
                debug_assert_eq!(side, 0);

                br.push_arg(arg);
            }
            InstData::CondBr(condbr) => condbr.push_arg(side, arg),
            _ => panic!("instruction is not a branch"),
        }

        self.add_use(arg, inst);
    }

    /// Removes the `index`-th argument from one side of a branch,
    /// unregistering the operand edge, and returns the removed value.
    pub fn remove_branch_side_arg(&mut self, inst: Inst, side: usize, index: usize) -> Value {
        let removed = match self.data_mut(inst) {
            InstData::Br(br) => {
                debug_assert_eq!(side, 0);

                br.remove_arg(index)
            }
            InstData::CondBr(condbr) => condbr.remove_arg(side, index),
            _ => panic!("instruction is not a branch"),
        };

        self.remove_one_use(removed, inst);

        removed
    }

    /// Appends an argument on *every* side of a branch that targets
    /// `block`.
    pub fn append_branch_arg(&mut self, inst: Inst, block: Block, arg: Value) {
        for side in self.branch_sides_to(inst, block) {
            self.append_branch_side_arg(inst, side, arg);
        }
    }

    /// Removes the `index`-th argument on *every* side of a branch that
    /// targets `block`.
    pub fn remove_branch_arg(&mut self, inst: Inst, block: Block, index: usize) {
        for side in self.branch_sides_to(inst, block) {
            self.remove_branch_side_arg(inst, side, index);
        }
    }

    fn constant(&mut self, data: ConstantData, ty: Type) -> Value {
        if let Some(&existing) = self.constants.get(&data) {
            return existing;
        }

        let k = self.entities.insert(EntityData::Const(data));
        let val = Value::raw_from(k);

        self.debug.insert(k, DebugInfo::fake());
        self.values.insert(
            val,
            ValueDefinition {
                ty,
                data: ValueDef::Const,
            },
        );
        self.constants.insert(data, val);

        val
    }

    fn add_use(&mut self, value: Value, user: Inst) {
        match self.uses.get_mut(value) {
            Some(list) => list.push(user),
            None => {
                self.uses.insert(value, smallvec![user]);
            }
        }
    }

    fn remove_one_use(&mut self, value: Value, user: Inst) {
        let list = self.uses.get_mut(value).expect("use lists out of sync");
        let pos = list
            .iter()
            .position(|inst| *inst == user)
            .expect("use lists out of sync");

        list.remove(pos);
    }

    fn branch_users_mut(&mut self, block: Block) -> &mut SmallVec<[Inst; 2]> {
        if !self.branch_users.contains(block) {
            self.branch_users.insert(block, SmallVec::new());
        }

        &mut self.branch_users[block]
    }

    fn remove_one_branch_user(&mut self, block: Block, user: Inst) {
        let list = self
            .branch_users
            .get_mut(block)
            .expect("branch user lists out of sync");
        let pos = list
            .iter()
            .position(|inst| *inst == user)
            .expect("branch user lists out of sync");

        list.remove(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryInst, BlockWithParams, BrInst, StoreInst};
    use crate::utility::StringPool;

    fn name(pool: &mut StringPool, s: &str) -> Str {
        pool.insert(s)
    }

    #[test]
    fn literal_typing_rule() {
        let mut dfg = DataFlowGraph::new();

        let small = dfg.int_literal(42);
        let negative = dfg.int_literal(-1);
        let big = dfg.int_literal(i64::MAX);

        assert_eq!(dfg.ty(small), Type::int());
        assert_eq!(dfg.ty(negative), Type::int());
        assert_eq!(dfg.ty(big), Type::long());
    }

    #[test]
    fn constants_are_interned() {
        let mut dfg = DataFlowGraph::new();

        let a = dfg.iconst(Type::int(), 7);
        let b = dfg.iconst(Type::int(), 7);
        let c = dfg.iconst(Type::long(), 7);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(dfg.value_as_int(a), Some(7));
        assert!(dfg.is_constant(a));
    }

    #[test]
    fn uses_track_operand_edges() {
        let mut dfg = DataFlowGraph::new();

        let x = dfg.iconst(Type::int(), 1);
        let y = dfg.iconst(Type::int(), 2);
        let (add, result) = dfg.create_inst(
            InstData::Add(BinaryInst::new(Type::int(), x, y)),
            DebugInfo::fake(),
        );

        assert_eq!(dfg.users(x), &[add]);
        assert_eq!(dfg.users(y), &[add]);

        // an instruction using the same value twice appears twice
        let (double, _) = dfg.create_inst(
            InstData::Add(BinaryInst::new(Type::int(), x, x)),
            DebugInfo::fake(),
        );

        assert_eq!(dfg.users(x), &[add, double, double]);

        let result = result.unwrap();
        let (_, _) = dfg.create_inst(
            InstData::Store(StoreInst::new(result, x)),
            DebugInfo::fake(),
        );

        assert_eq!(dfg.users(result).len(), 1);
    }

    #[test]
    fn replace_uses_rewrites_all_edges() {
        let mut dfg = DataFlowGraph::new();

        let x = dfg.iconst(Type::int(), 1);
        let y = dfg.iconst(Type::int(), 2);
        let (add, _) = dfg.create_inst(
            InstData::Add(BinaryInst::new(Type::int(), x, x)),
            DebugInfo::fake(),
        );

        dfg.replace_uses_with(x, y);

        assert!(dfg.users(x).is_empty());
        assert_eq!(dfg.users(y), &[add, add]);

        match dfg.data(add) {
            InstData::Add(i) => {
                assert_eq!(i.lhs(), y);
                assert_eq!(i.rhs(), y);
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn branches_register_with_targets() {
        let mut pool = StringPool::new();
        let mut dfg = DataFlowGraph::new();

        let target = dfg.create_block(name(&mut pool, "target"));
        let arg = dfg.iconst(Type::int(), 3);
        let (br, _) = dfg.create_inst(
            InstData::Br(BrInst::new(BlockWithParams::new(target, &[arg]))),
            DebugInfo::fake(),
        );

        assert_eq!(dfg.block_branch_users(target), &[br]);
        assert_eq!(dfg.users(arg), &[br]);
        assert_eq!(dfg.branch_side_args(br, 0), &[arg]);

        dfg.detach_inst(br);

        assert!(dfg.block_branch_users(target).is_empty());
        assert!(dfg.users(arg).is_empty());
    }

    #[test]
    fn param_removal_renumbers() {
        let mut pool = StringPool::new();
        let mut dfg = DataFlowGraph::new();

        let bb = dfg.create_block(name(&mut pool, "bb"));
        let p0 = dfg.append_block_param(bb, Type::int(), DebugInfo::fake());
        let p1 = dfg.append_block_param(bb, Type::long(), DebugInfo::fake());
        let p2 = dfg.append_block_param(bb, Type::bool(), DebugInfo::fake());

        assert_eq!(dfg.value_def(p2), ValueDef::Param(bb, 2));

        dfg.remove_block_param(bb, p1);

        assert_eq!(dfg.block_params(bb), &[p0, p2]);
        assert_eq!(dfg.value_def(p0), ValueDef::Param(bb, 0));
        assert_eq!(dfg.value_def(p2), ValueDef::Param(bb, 1));
    }
}
