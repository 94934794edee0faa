//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::utility::{PackedOption, Str};
use static_assertions::assert_eq_size;

/// Holds the "debug info" for an instruction, i.e. where it came from.
///
/// Every entity created through the builders carries one of these. The
/// expectation of where the info came from depends on where the entity
/// came from:
///
///   1. The entity was compiled from some line of source code, in which
///      case multiple IR entities may share the same debug information.
///
///   2. The entity was created by a pass, in which case the pass either
///      forwards the info of whatever it replaced or uses a blank one.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DebugInfo {
    name: PackedOption<Str>,
    col: u32,
    line: u32,
    file: PackedOption<Str>,
}

impl DebugInfo {
    /// Creates a new [`DebugInfo`] object that has all the fields filled
    /// in (except the name).
    ///
    /// This is intended for creating IR from a higher-level language
    /// where `col` is actually meaningful.
    pub fn new(line: u32, col: u32, file: Str) -> Self {
        Self {
            name: PackedOption::none(),
            line,
            col,
            file: PackedOption::some(file),
        }
    }

    /// Creates a new [`DebugInfo`] object that has all the fields filled
    /// in, including a name that printers will try to preserve.
    pub fn with_name(name: Str, line: u32, col: u32, file: Str) -> Self {
        Self {
            name: PackedOption::some(name),
            line,
            col,
            file: PackedOption::some(file),
        }
    }

    /// Creates a blank [`DebugInfo`] that refers to no source location.
    ///
    /// This is what passes and tests use when they synthesize IR that has
    /// no meaningful location to point at.
    pub fn fake() -> Self {
        Self {
            name: PackedOption::none(),
            line: 0,
            col: 0,
            file: PackedOption::none(),
        }
    }

    /// Returns the line in the original file that the entity came from.
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Returns the column in the original file that the entity came from.
    pub fn col(&self) -> u32 {
        self.col
    }

    /// A reference to the filename, if the entity came from a real file.
    /// This can be resolved with the [`StringPool`] of the module the
    /// entity lives in.
    ///
    /// [`StringPool`]: crate::utility::StringPool
    pub fn file(&self) -> Option<Str> {
        self.file.expand()
    }

    /// A reference to a name for the value in the IR, if one was given.
    pub fn name(&self) -> Option<Str> {
        self.name.expand()
    }

    /// Returns a copy of the info with the name removed, for passes that
    /// derive new values from named ones.
    pub fn strip_name(self) -> Self {
        Self {
            name: PackedOption::none(),
            ..self
        }
    }
}

assert_eq_size!(DebugInfo, (usize, usize));
