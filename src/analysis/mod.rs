//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Analyses over the IR: the control-flow graph, the dominator and
//! post-dominator trees, and the textual writer.
//!
//! Everything in here is read-only over the IR it is given; results are
//! cached and invalidated through the pass managers.

mod dominators;
mod flowgraph;
mod writer;

pub use dominators::*;
pub use flowgraph::*;
pub use writer::*;
