//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::{Function, Module};
use crate::pass::*;

/// Manages running a set of passes over the IR of an entire module.
///
/// An important note is that this is actually a module pass itself, it's
/// a pass that simply runs other passes.
#[derive(Default)]
pub struct ModulePassManager {
    passes: Vec<Box<dyn ModuleTransformPass>>,
}

impl ModulePassManager {
    /// Creates a new, empty module pass manager.
    pub fn new() -> Self {
        Self {
            passes: Vec::default(),
        }
    }

    /// Adds a transformation pass to the pass manager. The pass's order is
    /// defined relative to other calls to [`Self::add_pass`].
    pub fn add_pass<T: ModuleTransformPass + 'static>(&mut self, pass: T) {
        self.passes.push(Box::new(pass));
    }
}

impl ModuleTransformPass for ModulePassManager {
    fn run(&mut self, module: &mut Module, am: &mut ModuleAnalysisManager) -> PreservedAnalyses {
        let mut preserved = PreservedAnalyses::all();

        for pass in self.passes.iter_mut() {
            let other = pass.run(module, am);

            am.invalidate(&other);

            preserved = preserved.intersect(other);
        }

        preserved
    }
}

/// Manages running a set of passes over individual functions.
///
/// Like [`ModulePassManager`], this is itself a pass that simply runs
/// other passes.
#[derive(Default)]
pub struct FunctionPassManager {
    passes: Vec<Box<dyn FunctionTransformPass>>,
}

impl FunctionPassManager {
    /// Creates a new, empty function pass manager.
    pub fn new() -> Self {
        Self {
            passes: Vec::default(),
        }
    }

    /// Adds a transformation pass to the pass manager.
    pub fn add_pass<T: FunctionTransformPass + 'static>(&mut self, pass: T) {
        self.passes.push(Box::new(pass));
    }
}

impl FunctionTransformPass for FunctionPassManager {
    fn run(&mut self, func: &mut Function, am: &mut FunctionAnalysisManager) -> PreservedAnalyses {
        let mut preserved = PreservedAnalyses::all();

        for pass in self.passes.iter_mut() {
            let other = pass.run(func, am);

            am.invalidate(func.func(), &other);

            preserved = preserved.intersect(other);
        }

        preserved
    }
}

/// Adapts a function transform into a module pass that runs the function
/// transform over every *defined* function in the module.
///
/// This is mostly used when building the final pass pipeline.
pub struct FunctionToModulePassAdapter {
    pass: Box<dyn FunctionTransformPass>,
}

impl FunctionToModulePassAdapter {
    /// Adapts a given pass into a [`FunctionToModulePassAdapter`] that can
    /// then be used as a module pass.
    pub fn adapt<T: FunctionTransformPass + 'static>(pass: T) -> Self {
        Self {
            pass: Box::new(pass),
        }
    }
}

impl ModuleTransformPass for FunctionToModulePassAdapter {
    fn run(&mut self, module: &mut Module, am: &mut ModuleAnalysisManager) -> PreservedAnalyses {
        let mut preserved = PreservedAnalyses::all();

        for func in module.functions() {
            if module.function(func).is_decl() {
                continue;
            }

            let fam = am.function_analysis_manager();
            let other = self.pass.run(module.function_mut(func), fam);

            fam.invalidate(func, &other);

            preserved = preserved.intersect(other);
        }

        preserved
    }
}
