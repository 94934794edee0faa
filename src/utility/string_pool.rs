//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::utility::Packable;
use ahash::AHashMap;
use std::ops::Index;
use std::rc::Rc;

/// A reference to a string inside of a given [`StringPool`]. These are
/// significantly more compact than both [`String`]s and `&str`s, and are
/// thus better for usage inside IR storage where space is precious.
///
/// They must be resolved to real strings through [`StringPool::get`] or
/// the index operator, and can only be safely obtained through
/// [`StringPool::insert`].
///
/// ```
/// # use beryl::utility::*;
/// let mut pool = StringPool::new();
/// let s = pool.insert("Hello!");
///
/// assert_eq!(&pool[s], "Hello!");
/// ```
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Str(u32);

impl Packable for Str {
    fn reserved() -> Self {
        Self(u32::MAX)
    }

    fn is_reserved(&self) -> bool {
        self.0 == u32::MAX
    }
}

/// Contains a number of heap-allocated strings, and provides an API to map
/// [`Str`]s to those heap-allocated strings. All strings are de-duplicated
/// internally, so two [`Str`]s from two calls to [`Self::insert`] with the
/// same string value will be equivalent.
///
/// Note that a pool provides no protection against using [`Str`]s with
/// the wrong pool, as for data compactness reasons that is simply not stored.
///
/// ```
/// # use beryl::utility::*;
/// let mut pool = StringPool::new();
///
/// let k1 = pool.insert("Hello!");
/// let k2 = pool.insert("Goodbye!");
/// let k3 = pool.insert("Hello!");
///
/// assert_eq!(&pool[k1], "Hello!");
/// assert_eq!(&pool[k2], "Goodbye!");
/// assert_eq!(k1, k3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct StringPool {
    // the `Rc` is what lets us have both hash lookups keyed on `&str` and
    // index-based lookups without duplicating the string data itself
    strings: Vec<Rc<str>>,
    refs: AHashMap<Rc<str>, Str>,
}

impl StringPool {
    /// Creates an empty string pool that has no valid indices into it.
    pub fn new() -> Self {
        Self {
            strings: Vec::default(),
            refs: AHashMap::default(),
        }
    }

    /// Inserts a string into the pool and returns a reference that can
    /// be used to access the string.
    ///
    /// If the string is already in the pool, the existing reference
    /// is returned instead of storing a second copy.
    pub fn insert(&mut self, string: &str) -> Str {
        if let Some(s) = self.refs.get(string) {
            return *s;
        }

        let boxed: Rc<str> = Rc::from(String::from(string).into_boxed_str());
        let next = Str(self.strings.len() as u32);

        self.strings.push(Rc::clone(&boxed));
        self.refs.insert(boxed, next);

        next
    }

    /// Resolves a [`Str`] into the real string it refers to, if it refers
    /// to a string that is actually in the pool.
    pub fn get(&self, string: Str) -> Option<&str> {
        self.strings.get(string.0 as usize).map(|rc| rc.as_ref())
    }

    /// Returns how many (unique) strings are in the pool.
    pub fn len(&self) -> usize {
        self.strings.len()
    }

    /// Checks whether the pool contains no strings at all.
    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

impl Index<Str> for StringPool {
    type Output = str;

    fn index(&self, index: Str) -> &Self::Output {
        self.get(index).expect("`Str` did not refer to this pool")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deduplicates() {
        let mut pool = StringPool::new();

        let a = pool.insert("x");
        let b = pool.insert("y");
        let c = pool.insert("x");

        assert_eq!(a, c);
        assert_ne!(a, b);
        assert_eq!(pool.len(), 2);
    }

    #[test]
    fn resolves() {
        let mut pool = StringPool::new();
        let a = pool.insert("entry");

        assert_eq!(pool.get(a), Some("entry"));
        assert_eq!(&pool[a], "entry");
    }
}
