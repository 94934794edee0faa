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
use crate::ir::Value;
use crate::utility::Str;
use smallvec::SmallVec;

dense_arena_key! {
    /// References a single basic block in a function.
    ///
    /// Must be resolved with a [`DataFlowGraph`](crate::ir::DataFlowGraph)
    /// into an actual [`BasicBlock`] object.
    pub struct Block;
}

/// Models a single basic block in a function within the IR.
///
/// These are made up of two key things:
///
///   1. A linear sequence of instructions ending in a terminator (stored
///      in the function's [`Layout`](crate::ir::Layout), not here).
///   2. Zero or more basic-block parameters modeling the φs that the
///      block has as input.
///
/// ```none
/// something(int %x):
///   %0 = mul int %x, %x
///   br next(int %0)
/// ```
#[derive(Debug, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BasicBlock {
    name: Str,
    params: SmallVec<[Value; 4]>,
}

impl BasicBlock {
    pub(in crate::ir) fn new(name: Str) -> Self {
        Self {
            name,
            params: SmallVec::default(),
        }
    }

    /// Gets the name of the block.
    pub fn name(&self) -> Str {
        self.name
    }

    /// Gets the parameters of the block, in declaration order. The i-th
    /// value here is the i-th parameter.
    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub(in crate::ir) fn append_param(&mut self, val: Value) {
        self.params.push(val);
    }

    pub(in crate::ir) fn remove_param_at(&mut self, index: usize) -> Value {
        self.params.remove(index)
    }
}
