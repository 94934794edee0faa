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
use crate::pass::{FunctionAnalysisManager, ModuleAnalysisManager, PreservedAnalyses};

/// A transformation that operates over an entire module at once.
///
/// Most optimizations are function transforms instead; module transforms
/// are for whole-module work (printing, verification) and for adapters.
pub trait ModuleTransformPass {
    /// Runs the pass over `module`, returning which analyses the pass
    /// left intact.
    fn run(&mut self, module: &mut Module, am: &mut ModuleAnalysisManager) -> PreservedAnalyses;
}

/// A transformation that operates over single functions in isolation.
///
/// These can be adapted into module passes with
/// [`FunctionToModulePassAdapter`](crate::pass::FunctionToModulePassAdapter).
pub trait FunctionTransformPass {
    /// Runs the pass over `func`, returning which analyses the pass
    /// left intact.
    fn run(&mut self, func: &mut Function, am: &mut FunctionAnalysisManager) -> PreservedAnalyses;
}
