//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

#![allow(dead_code)]
#![deny(
    unreachable_pub,
    missing_docs,
    missing_abi,
    rust_2018_idioms,
    rustdoc::broken_intra_doc_links,
    rustdoc::private_intra_doc_links
)]
#![allow(unused_variables)]

//! # Beryl
//!
//! The SSA middle-end of a small C compiler: the APIs for building,
//! analyzing, optimizing and printing BIR ("Beryl IR").
//!
//! The front-end (preprocessing, parsing, lowering) and the back-end
//! (code generation) are separate components; this crate is the part in
//! the middle that both of them link against. The supported pipeline is
//! `unify-returns` followed by `mem2reg`, `gvn` and `dce`.

pub mod analysis;
pub mod arena;
pub mod ir;
pub mod pass;
pub mod transforms;
pub mod utility;

use crate::pass::{
    FunctionAnalysisManager, FunctionToModulePassAdapter, ModuleAnalysisManager,
    ModulePassManager, ModuleTransformPass,
};
use crate::transforms::{
    AggressiveDCEPass, GVNPass, Mem2RegPass, ModuleWriterPass, SimplifyCFGPass, UnifyReturnsPass,
    VerifyModulePass,
};
use crate::analysis::{
    ControlFlowGraphAnalysis, DominatorTreeAnalysis, ModuleStringifyAnalysis,
    PostDominatorTreeAnalysis,
};

/// A helper function that handles "run these passes specified by the user"
/// in a way that multiple tools can share.
///
/// This is not intended for pre-determined pass pipelines (see
/// [`run_default_pipeline`] for the standard one), but is useful for tools
/// that take a pass list on the command line.
///
/// - `verify` is whether to insert verification between all passes
/// - `passes` is the user-specified list of passes
/// - `extra` are passes that must run after `passes`, provided by the tool
pub fn run_passes(module: &mut ir::Module, verify: bool, passes: &[String], extra: &[&str]) {
    let mut fam = FunctionAnalysisManager::new();

    fam.add_analysis(ControlFlowGraphAnalysis);
    fam.add_analysis(DominatorTreeAnalysis);
    fam.add_analysis(PostDominatorTreeAnalysis);

    let mut mam = ModuleAnalysisManager::new();

    mam.add_analysis(ModuleStringifyAnalysis);
    mam.set_function_analysis_manager(fam);

    let mut mpm = ModulePassManager::new();

    if verify {
        mpm.add_pass(VerifyModulePass);
    }

    for pass in passes
        .iter()
        .map(|s| s.as_str())
        .chain(extra.iter().copied())
    {
        match pass {
            "unify-returns" => mpm.add_pass(FunctionToModulePassAdapter::adapt(UnifyReturnsPass)),
            "mem2reg" => mpm.add_pass(FunctionToModulePassAdapter::adapt(Mem2RegPass)),
            "gvn" => mpm.add_pass(FunctionToModulePassAdapter::adapt(GVNPass)),
            "dce" => mpm.add_pass(FunctionToModulePassAdapter::adapt(AggressiveDCEPass)),
            "simplifycfg" => mpm.add_pass(FunctionToModulePassAdapter::adapt(SimplifyCFGPass)),
            "verify" => mpm.add_pass(VerifyModulePass),
            "module-stdout" => mpm.add_pass(ModuleWriterPass::stdout()),
            "module-stderr" => mpm.add_pass(ModuleWriterPass::stderr()),
            _ => {
                unreachable!("unknown pass '{pass}'")
            }
        }

        if verify {
            mpm.add_pass(VerifyModulePass);
        }
    }

    mpm.run(module, &mut mam);
}

/// Runs the standard optimization pipeline over a module:
/// return unification, then `mem2reg`, `gvn` and `dce`.
pub fn run_default_pipeline(module: &mut ir::Module) {
    run_passes(module, false, &[], &["unify-returns", "mem2reg", "gvn", "dce"]);
}
