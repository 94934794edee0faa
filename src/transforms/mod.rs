//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Defines the "transform" passes of the optimizer.
//!
//! These are the passes that can (potentially) modify the IR, and don't
//! logically yield a result.
//!
//! Some of these "transforms" are not actually transformations (the
//! verifier and the writers manipulate no IR), but most of them are. All
//! of them logically yield nothing except the IR that exists after they
//! run.

mod dce;
mod gvn;
mod mem2reg;
mod printers;
mod simplifycfg;
mod unify_returns;
mod verify;

pub use dce::*;
pub use gvn::*;
pub use mem2reg::*;
pub use printers::*;
pub use simplifycfg::*;
pub use unify_returns::*;
pub use verify::*;
