//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::dense_arena_key;
use crate::ir::{DataFlowGraph, Layout, ModuleContext, Type};

dense_arena_key! {
    /// The reference type for a [`Function`]. These can be looked up
    /// at the [`Module`](crate::ir::Module) level.
    pub struct Func;
}

/// The definition of a function.
///
/// This provides the storage for everything in the function, and the
/// layout information that actually makes up a meaningful chunk of IR.
#[derive(Debug, Clone, Default)]
pub struct FunctionDefinition {
    /// The "data-flow graph" (DFG) of the function. This is effectively
    /// the storage for every entity (instruction, value, block, constant)
    /// that is used inside the function.
    ///
    /// This also contains the data-flow information, it can tell you the
    /// data dependencies between each value.
    pub dfg: DataFlowGraph,
    /// The layout of a function. This maps the data in the DFG into a
    /// structure that actually makes up a function, it models the
    /// relationships *between* entities from the DFG.
    ///
    /// This contains the lists that make up basic blocks, and the
    /// block ordering.
    pub layout: Layout,
}

/// Models a single function in the IR.
///
/// A function is a name, a function [`Type`], and (if it isn't just a
/// declaration) a [`FunctionDefinition`]. The function's formal parameters
/// are the parameters of its entry block.
#[derive(Debug, Clone)]
pub struct Function {
    name: String,
    ty: Type,
    func: Func,
    context: ModuleContext,
    definition: Option<FunctionDefinition>,
}

impl Function {
    pub(in crate::ir) fn new(name: String, ty: Type, func: Func, ctx: ModuleContext) -> Self {
        debug_assert!(ty.is_func(), "functions must have function type");

        Self {
            name,
            ty,
            func,
            context: ctx,
            definition: None,
        }
    }

    /// Gets the function type of the function.
    #[inline]
    pub fn ty(&self) -> Type {
        self.ty
    }

    /// Gets the return type of the function. This is [`Type::Void`]
    /// for functions that don't return anything.
    #[inline]
    pub fn return_ty(&self) -> Type {
        self.ty.fn_return(&self.context.types())
    }

    /// Checks if the function is a declaration, i.e. whether or not it
    /// actually has a definition.
    #[inline]
    pub fn is_decl(&self) -> bool {
        self.definition.is_none()
    }

    /// Gets the function definition, if it exists.
    #[inline]
    pub fn definition(&self) -> Option<&FunctionDefinition> {
        self.definition.as_ref()
    }

    /// Gets the function definition, if it exists.
    #[inline]
    pub fn definition_mut(&mut self) -> Option<&mut FunctionDefinition> {
        self.definition.as_mut()
    }

    /// Gets the name of the function, without the leading `@`.
    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets a [`Func`] that refers to `self`. This can be used when a
    /// [`Module`](crate::ir::Module) is not available to get [`Func`]s from.
    #[inline]
    pub fn func(&self) -> Func {
        self.func
    }

    /// Gets the module context associated with the module that contains
    /// this function, allowing the type and string pools to be accessed.
    #[inline]
    pub fn ctx(&self) -> &ModuleContext {
        &self.context
    }

    pub(in crate::ir) fn replace_definition(&mut self, def: FunctionDefinition) {
        self.definition.replace(def);
    }
}
