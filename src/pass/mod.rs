//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! The pass infrastructure: analyses that compute cached results over
//! functions/modules, transforms that mutate the IR, and the managers that
//! sequence them and keep the caches honest.

mod analysis;
mod manager;
mod transform;

pub use analysis::*;
pub use manager::*;
pub use transform::*;
