//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

//! Type-safe arena keys and maps.
//!
//! Everything in the IR is stored in flat arenas and referred to by small
//! copyable keys, instead of being separately allocated and referred to by
//! pointer. This module provides the key macros, the primary map that
//! actually owns data, and the secondary maps that associate extra data
//! with an existing arena's keys.

mod key;
mod map;
mod secondary;

pub use key::*;
pub use map::*;
pub use secondary::*;
