//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::*;
use smallvec::SmallVec;

/// Models the position that a cursor is "pointing at."
///
/// A cursor can be pointing at some block (either before the first
/// instruction in the block or after the last), at a specific instruction
/// in a specific block, or pointing at nothing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Hash)]
pub enum CursorPos {
    /// Pointing at nothing.
    Nothing,
    /// Pointing "before" the first instruction in a given block.
    ///
    /// ```none
    /// entry:
    ///   ; <-- here
    ///   %0 = add int %x, %y
    ///   ; ...
    /// ```
    Before(Block),
    /// Pointing at a specific instruction in a given block.
    ///
    /// ```none
    /// entry:
    ///   %0 = add int %x, %y ; <-- here
    ///   ; ...
    /// ```
    At(Block, Inst),
    /// Pointing at the end of a specific block.
    ///
    /// ```none
    /// entry:
    ///   %0 = add int %x, %y
    ///   br next
    ///   ; <-- here
    /// ```
    After(Block),
}

#[inline(always)]
fn move_to_block_internal(this: &mut impl Cursor, next: Option<Block>) -> Option<Block> {
    this.set_pos(next.map_or_else(|| CursorPos::Nothing, CursorPos::Before));

    next
}

#[inline(always)]
fn move_to_inst_internal(this: &mut impl Cursor, next: Option<(Block, Inst)>) -> Option<Inst> {
    this.set_pos(next.map_or_else(
        || CursorPos::Nothing,
        |(block, inst)| CursorPos::At(block, inst),
    ));

    next.map(|(_, inst)| inst)
}

/// Models basic cursor operations that **view** a function. None of these
/// operations require mutable access to a given function, so they can be
/// used inside of analyses.
pub trait Cursor: Sized {
    /// Gets the current cursor position.
    fn pos(&self) -> CursorPos;

    /// Sets the current cursor position.
    fn set_pos(&mut self, pos: CursorPos);

    /// Returns the definition of the function being viewed.
    fn def(&self) -> &FunctionDefinition;

    /// Gets the layout associated with the function being viewed.
    fn layout(&self) -> &Layout {
        &self.def().layout
    }

    /// Gets the data-flow graph associated with the function being viewed.
    fn dfg(&self) -> &DataFlowGraph {
        &self.def().dfg
    }

    /// Gets the current block being viewed by the cursor, if any.
    fn current_block(&self) -> Option<Block> {
        match self.pos() {
            CursorPos::Nothing => None,
            CursorPos::Before(block) | CursorPos::After(block) | CursorPos::At(block, _) => {
                Some(block)
            }
        }
    }

    /// Gets the current instruction being viewed by the cursor, if any.
    fn current_inst(&self) -> Option<Inst> {
        if let CursorPos::At(_, inst) = self.pos() {
            Some(inst)
        } else {
            None
        }
    }

    /// Gets the debug info of the current instruction, if there is one.
    fn current_inst_dbg(&self) -> Option<DebugInfo> {
        self.current_inst().map(|inst| self.dfg().inst_debug(inst))
    }

    /// Shorthand for resolving an instruction's data through the graph.
    fn inst_data(&self, inst: Inst) -> &InstData {
        self.dfg().data(inst)
    }

    /// Shorthand for getting the block that contains an instruction.
    fn inst_block(&self, inst: Inst) -> Block {
        self.layout().inst_block(inst)
    }

    /// Shorthand for getting a value's type.
    fn ty(&self, value: Value) -> Type {
        self.dfg().ty(value)
    }

    /// Shorthand for getting a value's definition.
    fn value_def(&self, value: Value) -> ValueDef {
        self.dfg().value_def(value)
    }

    /// Shorthand for converting an instruction to its result value.
    fn inst_to_result(&self, inst: Inst) -> Option<Value> {
        self.dfg().inst_to_result(inst)
    }

    /// Shorthand for converting a value to its defining instruction.
    fn value_to_inst(&self, value: Value) -> Option<Inst> {
        self.dfg().value_to_inst(value)
    }

    /// Shorthand for getting a block's parameters.
    fn block_params(&self, block: Block) -> &[Value] {
        self.dfg().block_params(block)
    }

    /// Gets the entry block of the function, if any blocks exist.
    fn entry_block(&self) -> Option<Block> {
        self.layout().entry_block()
    }

    /// Computes the predecessors of a block from the branch-user list of
    /// the block, in a deterministic order with duplicates removed.
    fn block_preds(&self, block: Block) -> SmallVec<[Block; 4]> {
        let mut preds = SmallVec::new();

        for &br in self.dfg().block_branch_users(block) {
            let bb = self.layout().inst_block(br);

            if !preds.contains(&bb) {
                preds.push(bb);
            }
        }

        preds
    }

    /// Moves the position to `Before(block)`.
    fn goto_before(&mut self, block: Block) {
        debug_assert!(self.layout().is_block_inserted(block));

        self.set_pos(CursorPos::Before(block));
    }

    /// Moves the position to `After(block)`.
    fn goto_after(&mut self, block: Block) {
        debug_assert!(self.layout().is_block_inserted(block));

        self.set_pos(CursorPos::After(block));
    }

    /// Moves the position to `At(block, first_inst_in_block)`.
    fn goto_first_inst(&mut self, block: Block) {
        self.goto_before(block);

        self.next_inst();
    }

    /// Moves the position to `At(block, last_inst_in_block)`.
    fn goto_last_inst(&mut self, block: Block) {
        self.goto_after(block);

        self.prev_inst();
    }

    /// Moves the position to `At(containing, inst)`.
    fn goto_inst(&mut self, inst: Inst) {
        debug_assert!(self.layout().is_inst_inserted(inst));

        let block = self.layout().inst_block(inst);

        self.set_pos(CursorPos::At(block, inst));
    }

    /// Moves the cursor to the next block in the function. If the cursor is
    /// currently not pointing anywhere, this moves it to `Before(entry)`.
    /// If the cursor is at the last block, this moves it to `Nothing`.
    fn next_block(&mut self) -> Option<Block> {
        let bb = self.current_block().map_or_else(
            || self.layout().entry_block(),
            |block| self.layout().block_next(block),
        );

        move_to_block_internal(self, bb)
    }

    /// Moves the cursor to the block before the current one. If the cursor
    /// is pointing at the first block (or nothing), it moves to `Nothing`.
    fn prev_block(&mut self) -> Option<Block> {
        let bb = self
            .current_block()
            .and_then(|block| self.layout().block_prev(block));

        move_to_block_internal(self, bb)
    }

    /// Moves the cursor to the next instruction in the current block. If
    /// the cursor points before the block, this is the first instruction.
    /// If it points after, or at nothing, this does nothing.
    fn next_inst(&mut self) -> Option<Inst> {
        let block_and_inst = match self.pos() {
            CursorPos::Nothing | CursorPos::After(_) => None,
            CursorPos::At(block, inst) => self.layout().inst_next(inst).map(|inst| (block, inst)),
            CursorPos::Before(block) => self
                .layout()
                .block_first_inst(block)
                .map(|inst| (block, inst)),
        };

        move_to_inst_internal(self, block_and_inst)
    }

    /// Moves the cursor to the previous instruction in the current block.
    /// If the cursor points after the block, this is the last instruction.
    /// If it points before, or at nothing, this does nothing.
    fn prev_inst(&mut self) -> Option<Inst> {
        let block_and_inst = match self.pos() {
            CursorPos::Nothing | CursorPos::Before(_) => None,
            CursorPos::At(block, inst) => self.layout().inst_prev(inst).map(|inst| (block, inst)),
            CursorPos::After(block) => self
                .layout()
                .block_last_inst(block)
                .map(|inst| (block, inst)),
        };

        move_to_inst_internal(self, block_and_inst)
    }
}

/// Models cursor operations that **mutate** a function: inserting
/// instructions at the cursor, removing them, and rewriting uses.
pub trait CursorMut: Cursor {
    /// Returns the definition of the function being mutated.
    fn def_mut(&mut self) -> &mut FunctionDefinition;

    /// Gets the context of the module that owns the function.
    fn ctx(&self) -> &ModuleContext;

    /// Gets the data-flow graph of the function being mutated.
    fn dfg_mut(&mut self) -> &mut DataFlowGraph {
        &mut self.def_mut().dfg
    }

    /// Gets the layout of the function being mutated.
    fn layout_mut(&mut self) -> &mut Layout {
        &mut self.def_mut().layout
    }

    /// Returns a builder that creates instructions at the current cursor
    /// position: directly before the current instruction, at the end of the
    /// block when the cursor points after one, or at the beginning when it
    /// points before one.
    fn insert(&mut self) -> InsertBuilder<'_> {
        let ctx = self.ctx().clone();
        let pos = self.pos();

        InsertBuilder {
            def: self.def_mut(),
            ctx,
            pos,
        }
    }

    /// Creates a new block (appended to the end of the block list) with a
    /// given name, and returns it. The cursor does not move.
    fn create_block(&mut self, name: &str) -> Block {
        let interned = self.ctx().strings_mut().insert(name);
        let block = self.dfg_mut().create_block(interned);

        self.layout_mut().append_block(block);

        block
    }

    /// Removes the current instruction, breaking all of the operand edges
    /// it participates in. The cursor moves to the *next* instruction (or
    /// to `After` the block), making this suitable for backward walks.
    ///
    /// If the instruction yields a result, the caller is responsible for
    /// having rewritten that result's uses beforehand.
    fn remove_inst(&mut self) {
        let inst = self.current_inst().expect("no current instruction");
        let block = self.current_block().unwrap();
        let next = self.layout().inst_next(inst);

        self.dfg_mut().detach_inst(inst);
        self.layout_mut().remove_inst(inst);

        self.set_pos(match next {
            Some(next) => CursorPos::At(block, next),
            None => CursorPos::After(block),
        });
    }

    /// Like [`Self::remove_inst`], but the cursor moves to the *previous*
    /// instruction (or to `Before` the block), making this suitable for
    /// forward walks driven by [`Cursor::next_inst`].
    fn remove_inst_and_move_back(&mut self) {
        let inst = self.current_inst().expect("no current instruction");
        let block = self.current_block().unwrap();
        let prev = self.layout().inst_prev(inst);

        self.dfg_mut().detach_inst(inst);
        self.layout_mut().remove_inst(inst);

        self.set_pos(match prev {
            Some(prev) => CursorPos::At(block, prev),
            None => CursorPos::Before(block),
        });
    }

    /// Rewrites every use of `old` to refer to `new` instead.
    fn replace_uses_with(&mut self, old: Value, new: Value) {
        self.dfg_mut().replace_uses_with(old, new);
    }

    /// Removes a block from the function entirely, removing each of its
    /// instructions first. The caller is responsible for the block no
    /// longer being branched to and for its parameters being unused.
    fn remove_block(&mut self, block: Block) {
        while let Some(inst) = self.layout().block_first_inst(block) {
            self.dfg_mut().detach_inst(inst);
            self.layout_mut().remove_inst(inst);
        }

        self.layout_mut().remove_block(block);

        if self.current_block() == Some(block) {
            self.set_pos(CursorPos::Nothing);
        }
    }
}

/// Effectively a [`FuncCursor`] without any of the operations that mutate
/// the function.
pub struct FuncView<'f> {
    func: &'f Function,
    pos: CursorPos,
}

impl<'f> Cursor for FuncView<'f> {
    fn pos(&self) -> CursorPos {
        self.pos
    }

    fn set_pos(&mut self, pos: CursorPos) {
        self.pos = pos;
    }

    fn def(&self) -> &FunctionDefinition {
        self.func
            .definition()
            .expect("cannot view function without a definition")
    }
}

impl<'f> FuncView<'f> {
    /// Creates a [`FuncView`] that allows the given function to be viewed.
    pub fn over(func: &'f Function) -> Self {
        Self {
            func,
            pos: CursorPos::Nothing,
        }
    }
}

/// A cursor for in-place modification of functions. This is the main tool
/// the transform passes manipulate IR with.
pub struct FuncCursor<'f> {
    func: &'f mut Function,
    pos: CursorPos,
}

impl<'f> Cursor for FuncCursor<'f> {
    fn pos(&self) -> CursorPos {
        self.pos
    }

    fn set_pos(&mut self, pos: CursorPos) {
        self.pos = pos;
    }

    fn def(&self) -> &FunctionDefinition {
        self.func
            .definition()
            .expect("cannot mutate function without a definition")
    }
}

impl<'f> CursorMut for FuncCursor<'f> {
    fn def_mut(&mut self) -> &mut FunctionDefinition {
        self.func
            .definition_mut()
            .expect("cannot mutate function without a definition")
    }

    fn ctx(&self) -> &ModuleContext {
        self.func.ctx()
    }
}

impl<'f> FuncCursor<'f> {
    /// Creates a [`FuncCursor`] that allows the given function to be
    /// mutated in place.
    pub fn over(func: &'f mut Function) -> Self {
        Self {
            func,
            pos: CursorPos::Nothing,
        }
    }
}

/// The builder returned by [`CursorMut::insert`]. Creates instructions at
/// whatever position the cursor had when the builder was created.
pub struct InsertBuilder<'c> {
    def: &'c mut FunctionDefinition,
    ctx: ModuleContext,
    pos: CursorPos,
}

impl<'c> InstBuilder for InsertBuilder<'c> {
    fn dfg(&self) -> &DataFlowGraph {
        &self.def.dfg
    }

    fn ctx(&self) -> &ModuleContext {
        &self.ctx
    }

    fn build(self, data: InstData, debug: DebugInfo) -> (Inst, Option<Value>) {
        let (inst, val) = self.def.dfg.create_inst(data, debug);

        match self.pos {
            CursorPos::At(_, current) => self.def.layout.insert_inst_before(inst, current),
            CursorPos::After(block) => self.def.layout.append_inst(inst, block),
            CursorPos::Before(block) => match self.def.layout.block_first_inst(block) {
                Some(first) => self.def.layout.insert_inst_before(inst, first),
                None => self.def.layout.append_inst(inst, block),
            },
            CursorPos::Nothing => panic!("cannot insert with a cursor pointing at nothing"),
        }

        (inst, val)
    }
}
