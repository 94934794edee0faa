//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::ArenaMap;
use crate::dense_arena_key;
use crate::ir::{Func, FuncBuilder, Function, Type, TypePool};
use crate::utility::{SaHashMap, Str, StringPool};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

dense_arena_key! {
    /// The reference type for a [`GlobalVariable`]. These can be looked up
    /// at the [`Module`] level, and imported into functions as address
    /// values through the data-flow graph.
    pub struct GlobalVar;
}

/// A module-level global variable.
///
/// The variable names storage of its underlying type; when a function
/// refers to the global, the value it gets is the *address* of that
/// storage (typed pointer-to-underlying).
#[derive(Debug, Clone)]
pub struct GlobalVariable {
    name: String,
    ty: Type,
}

impl GlobalVariable {
    /// Gets the name of the global, without the leading `@`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Gets the underlying type of the global's storage.
    pub fn ty(&self) -> Type {
        self.ty
    }
}

#[derive(Debug, Default)]
struct InnerModuleContext {
    types: RwLock<TypePool>,
    strings: RwLock<StringPool>,
}

impl Clone for InnerModuleContext {
    fn clone(&self) -> Self {
        let types = self.types.read().unwrap();
        let strings = self.strings.read().unwrap();

        Self {
            types: RwLock::new(types.clone()),
            strings: RwLock::new(strings.clone()),
        }
    }
}

/// Models shared ownership of the state that every entity in a module
/// needs access to: the type pool and the string pool.
///
/// Different builders and passes may need to access/mutate that data at
/// different times, so this hands out locked guards. Internally this is an
/// [`Arc`] referring to [`RwLock`]s holding a [`TypePool`] and a
/// [`StringPool`].
#[derive(Debug, Clone, Default)]
pub struct ModuleContext {
    data: Arc<InnerModuleContext>,
}

impl ModuleContext {
    /// Returns a guard that allows the type pool to be read.
    ///
    /// Since the underlying lock is a [`RwLock`], this is usually going to
    /// be able to lock immediately.
    pub fn types(&self) -> RwLockReadGuard<'_, TypePool> {
        self.data.types.read().expect("lock was poisoned")
    }

    /// Returns a guard that allows the type pool to be written to.
    ///
    /// Make sure the guard is only held for the minimum necessary, i.e.
    /// try to batch writes where possible instead of re-locking.
    pub fn types_mut(&self) -> RwLockWriteGuard<'_, TypePool> {
        self.data.types.write().expect("lock was poisoned")
    }

    /// Returns a guard that allows the string pool to be read.
    pub fn strings(&self) -> RwLockReadGuard<'_, StringPool> {
        self.data.strings.read().expect("lock was poisoned")
    }

    /// Returns a guard that allows the string pool to be written to.
    pub fn strings_mut(&self) -> RwLockWriteGuard<'_, StringPool> {
        self.data.strings.write().expect("lock was poisoned")
    }
}

/// Contains all the data necessary for a single module of IR.
///
/// This models all of the information that would be represented inside a
/// textual module: the globals, the functions (declared and defined), and
/// the shared type/string pools.
#[derive(Debug, Clone)]
pub struct Module {
    name: String,
    context: ModuleContext,
    functions: ArenaMap<Func, Function>,
    func_names: SaHashMap<String, Func>,
    globals: ArenaMap<GlobalVar, GlobalVariable>,
    global_names: SaHashMap<String, GlobalVar>,
}

impl Module {
    /// Creates a new, empty module with a given name.
    ///
    /// The name is expected to be unique across different [`Module`]s, but
    /// it doesn't *have* to be for the correctness of any transforms.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            context: ModuleContext::default(),
            functions: ArenaMap::default(),
            func_names: SaHashMap::default(),
            globals: ArenaMap::default(),
            global_names: SaHashMap::default(),
        }
    }

    /// Gets the name of the module.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolves a [`Func`] into a real function object.
    pub fn function(&self, func: Func) -> &Function {
        &self.functions[func]
    }

    /// Resolves a [`Func`] into a real function object.
    pub fn function_mut(&mut self, func: Func) -> &mut Function {
        &mut self.functions[func]
    }

    /// Finds a [`Func`] with a given name. If no function with that name
    /// has been added to the module, `None` is returned.
    pub fn find_function_by_name(&self, name: &str) -> Option<Func> {
        self.func_names.get(name).copied()
    }

    /// Declares a function without providing it a definition. It can be
    /// defined later with [`Self::define_existing_function`], or it can be
    /// left as-is if the function is opaque.
    pub fn declare_function(&mut self, name: &str, ty: Type) -> Func {
        debug_assert!(self.find_function_by_name(name).is_none());

        let name = name.to_owned();
        let ctx = self.context.clone();
        let new = Function::new(name.clone(), ty, self.functions.next_key(), ctx);
        let func = self.functions.insert(new);

        self.func_names.insert(name, func);

        func
    }

    /// Declares and then defines a new function.
    pub fn define_function(&mut self, name: &str, ty: Type) -> FuncBuilder<'_> {
        let func = self.declare_function(name, ty);

        self.define_existing_function(func)
    }

    /// Returns a [`FuncBuilder`] that will create a body for a
    /// previously-declared function.
    ///
    /// If the function already has a body, using the builder will
    /// completely replace the previous body.
    pub fn define_existing_function(&mut self, func: Func) -> FuncBuilder<'_> {
        FuncBuilder::new(self, func)
    }

    /// Looks up a function by name, declaring it with the given type if
    /// the name is not yet taken.
    ///
    /// Note that when the name *is* taken, the existing function is
    /// returned without any type check: the front-end is trusted to be
    /// consistent about the types it declares things with.
    pub fn get_or_insert_function(&mut self, ty: Type, name: &str) -> Func {
        match self.find_function_by_name(name) {
            Some(existing) => existing,
            None => self.declare_function(name, ty),
        }
    }

    /// Looks up a global variable by name, creating it with the given
    /// underlying type if the name is not yet taken.
    ///
    /// As with [`Self::get_or_insert_function`], no type check is
    /// performed when the name is already taken.
    pub fn get_or_insert_global(&mut self, ty: Type, name: &str) -> GlobalVar {
        if let Some(&existing) = self.global_names.get(name) {
            return existing;
        }

        let global = self.globals.insert(GlobalVariable {
            name: name.to_owned(),
            ty,
        });

        self.global_names.insert(name.to_owned(), global);

        global
    }

    /// Resolves a [`GlobalVar`] into a real global object.
    pub fn global(&self, global: GlobalVar) -> &GlobalVariable {
        &self.globals[global]
    }

    /// Returns an iterator over all of the functions in the module, in
    /// declaration order.
    ///
    /// The iterator doesn't borrow the module, so functions can be
    /// mutated while walking.
    pub fn functions(&self) -> impl Iterator<Item = Func> {
        self.functions.keys()
    }

    /// Returns an iterator over all of the globals in the module, in
    /// declaration order.
    pub fn globals(&self) -> impl Iterator<Item = GlobalVar> {
        self.globals.keys()
    }

    /// Gets the [`ModuleContext`] owned by this module. This can be cloned
    /// as necessary, clones refer to the same pools.
    pub fn context(&self) -> &ModuleContext {
        &self.context
    }

    /// Convenience method for quickly inserting a string into the module
    /// and getting a [`Str`] that refers to it.
    pub fn insert_string(&self, string: &str) -> Str {
        self.context.strings_mut().insert(string)
    }

    /// Convenience method for interning a function type in the module's
    /// type pool.
    pub fn function_type(&self, ret: Type, params: &[Type], vararg: bool) -> Type {
        Type::func(&mut self.context.types_mut(), ret, params, vararg)
    }

    /// Convenience method for interning a pointer type in the module's
    /// type pool.
    pub fn ptr_type(&self, pointee: Type) -> Type {
        Type::ptr(&mut self.context.types_mut(), pointee)
    }
}
