//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::stringify_module;
use crate::ir::Module;
use crate::pass::{ModuleAnalysisManager, ModuleTransformPass, PreservedAnalyses};
use std::io;
use std::io::Write;

enum Destination {
    Stdout,
    Stderr,
}

/// A "transform" that doesn't transform anything: it writes the textual
/// form of the module to `stdout` or `stderr`.
///
/// This is the tool-facing way of getting IR out of a pass pipeline, e.g.
/// after the optimizer has run.
pub struct ModuleWriterPass {
    dest: Destination,
}

impl ModuleWriterPass {
    /// Creates a writer pass that prints to `stdout`.
    pub fn stdout() -> Self {
        Self {
            dest: Destination::Stdout,
        }
    }

    /// Creates a writer pass that prints to `stderr`.
    pub fn stderr() -> Self {
        Self {
            dest: Destination::Stderr,
        }
    }
}

impl ModuleTransformPass for ModuleWriterPass {
    fn run(&mut self, module: &mut Module, _: &mut ModuleAnalysisManager) -> PreservedAnalyses {
        let text = stringify_module(module);

        let result = match self.dest {
            Destination::Stdout => writeln!(io::stdout(), "{text}"),
            Destination::Stderr => writeln!(io::stderr(), "{text}"),
        };

        result.expect("failed to write module to output");

        PreservedAnalyses::all()
    }
}
