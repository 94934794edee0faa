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
use crate::utility::Str;
use smallvec::SmallVec;

/// Helper type that appends to the current block of a [`FuncBuilder`].
/// Implements the [`InstBuilder`] trait to allow easy instruction creation.
pub struct AppendBuilder<'b> {
    def: &'b mut FunctionDefinition,
    ctx: ModuleContext,
    current: Block,
}

impl<'b> InstBuilder for AppendBuilder<'b> {
    fn dfg(&self) -> &DataFlowGraph {
        &self.def.dfg
    }

    fn ctx(&self) -> &ModuleContext {
        &self.ctx
    }

    fn build(self, data: InstData, debug: DebugInfo) -> (Inst, Option<Value>) {
        let (inst, val) = self.def.dfg.create_inst(data, debug);

        self.def.layout.append_inst(inst, self.current);

        (inst, val)
    }
}

/// Helper type for building a function from scratch.
///
/// The builder owns the definition-under-construction; nothing is visible
/// in the module until [`Self::define`] is called.
#[derive(Debug)]
pub struct FuncBuilder<'m> {
    module: &'m mut Module,
    func: Func,
    def: FunctionDefinition,
    current: Option<Block>,
}

impl<'m> FuncBuilder<'m> {
    pub(in crate::ir) fn new(module: &'m mut Module, func: Func) -> Self {
        Self {
            module,
            func,
            def: FunctionDefinition::default(),
            current: None,
        }
    }

    /// Finishes defining the function, and actually installs the
    /// definition into the module. Until this method is called, the
    /// function is not actually defined.
    pub fn define(self) -> Func {
        self.module
            .function_mut(self.func)
            .replace_definition(self.def);

        self.func
    }

    /// Creates a single basic block and returns it. The block is appended
    /// to the end of the block list.
    ///
    /// Note that this does not switch the builder to insert into that
    /// block, you still need to call [`Self::switch_to`].
    pub fn create_block(&mut self, name: &str) -> Block {
        let block = self.create_block_with_name(name);

        self.def.layout.append_block(block);

        block
    }

    /// Equivalent to [`Self::create_block`], except it inserts the block
    /// before `before` instead of appending it.
    pub fn create_block_before(&mut self, name: &str, before: Block) -> Block {
        let block = self.create_block_with_name(name);

        self.def.layout.insert_block_before(block, before);

        block
    }

    /// Equivalent to [`Self::create_block`], except it inserts the block
    /// after `after` instead of appending it.
    pub fn create_block_after(&mut self, name: &str, after: Block) -> Block {
        let block = self.create_block_with_name(name);

        self.def.layout.insert_block_after(block, after);

        block
    }

    /// Switches to inserting at the end of a specific block.
    pub fn switch_to(&mut self, block: Block) {
        debug_assert!(self.def.layout.is_block_inserted(block));

        self.current = Some(block);
    }

    /// Finds a block by its name, if a block with that name was created.
    pub fn find_block(&mut self, name: &str) -> Option<Block> {
        let interned = self.module.insert_string(name);
        let bb = self.def.dfg.find_block(interned)?;

        self.def.layout.is_block_inserted(bb).then_some(bb)
    }

    /// Gets the name of a block.
    pub fn block_name(&self, block: Block) -> Str {
        self.def.dfg.block(block).name()
    }

    /// Gets the block parameters of a given block.
    pub fn block_params(&self, block: Block) -> &[Value] {
        self.def.dfg.block_params(block)
    }

    /// Adds a single block parameter of `ty` to `block` and returns the
    /// value that refers to it.
    pub fn append_block_param(&mut self, block: Block, ty: Type, debug: DebugInfo) -> Value {
        self.def.dfg.append_block_param(block, ty, debug)
    }

    /// Appends one block parameter for each parameter of the function's
    /// type. This is meant for creating the entry block, as the entry
    /// block's parameters *are* the function's formal parameters.
    pub fn append_entry_params(&mut self, block: Block, debug: DebugInfo) -> SmallVec<[Value; 4]> {
        let tys: SmallVec<[Type; 4]> = {
            let pool = self.module.context().types();

            self.module
                .function(self.func)
                .ty()
                .fn_params(&pool)
                .iter()
                .copied()
                .collect()
        };

        tys.into_iter()
            .map(|ty| self.def.dfg.append_block_param(block, ty, debug))
            .collect()
    }

    /// Gets the type of a value that was previously created through
    /// the builder.
    pub fn ty(&self, value: Value) -> Type {
        self.def.dfg.ty(value)
    }

    /// Returns a builder that appends an instruction to the current block.
    ///
    /// If there is no current block, this panics.
    pub fn append(&mut self) -> AppendBuilder<'_> {
        AppendBuilder {
            ctx: self.module.context().clone(),
            def: &mut self.def,
            current: self.current.expect("cannot append without a current block"),
        }
    }

    /// Interns an integer constant of a given type in the function.
    pub fn iconst(&mut self, ty: Type, value: i64) -> Value {
        self.def.dfg.iconst(ty, value)
    }

    /// Interns an integer literal, typed `int` when i32-representable
    /// and `long` otherwise.
    pub fn int_literal(&mut self, value: i64) -> Value {
        self.def.dfg.int_literal(value)
    }

    /// Interns a `bool` constant in the function.
    pub fn bconst(&mut self, value: bool) -> Value {
        self.def.dfg.bconst(value)
    }

    /// Interns a typed `undef` value in the function.
    pub fn undef(&mut self, ty: Type) -> Value {
        self.def.dfg.undef(ty)
    }

    /// Imports the address of a module-level global into the function,
    /// returning a pointer-typed value.
    pub fn import_global(&mut self, global: GlobalVar) -> Value {
        let underlying = self.module.global(global).ty();
        let ptr = self.module.ptr_type(underlying);

        self.def.dfg.import_global(global, ptr)
    }

    /// Converts an [`Inst`] into a [`Value`] that refers to the result of
    /// the instruction, for instructions that actually yield results.
    pub fn inst_to_result(&self, inst: Inst) -> Option<Value> {
        self.def.dfg.inst_to_result(inst)
    }

    /// Gets the context of the module containing this function.
    pub fn ctx(&self) -> &ModuleContext {
        self.module.context()
    }

    /// Resolves a [`Func`] into a real function object.
    pub fn function(&self, func: Func) -> &Function {
        self.module.function(func)
    }

    /// Finds a [`Func`] with a given name in the module.
    pub fn find_function_by_name(&self, func: &str) -> Option<Func> {
        self.module.find_function_by_name(func)
    }

    /// Checks if a given block is the entry block of the function.
    pub fn is_entry_block(&self, block: Block) -> bool {
        self.def.layout.entry_block() == Some(block)
    }

    /// Gets the entry block of the function, if any blocks have
    /// been appended.
    pub fn entry_block(&self) -> Option<Block> {
        self.def.layout.entry_block()
    }

    /// Gets a [`Func`] referring to the function being built.
    pub fn current_func(&self) -> Func {
        self.func
    }

    /// Returns the data-flow graph of the function being built.
    pub fn dfg(&self) -> &DataFlowGraph {
        &self.def.dfg
    }

    /// Returns the layout of the function being built.
    pub fn layout(&self) -> &Layout {
        &self.def.layout
    }

    fn create_block_with_name(&mut self, name: &str) -> Block {
        let interned = self.module.insert_string(name);

        self.def.dfg.create_block(interned)
    }
}
