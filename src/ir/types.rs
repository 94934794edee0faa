//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use ahash::AHashMap;
use smallvec::SmallVec;
use static_assertions::assert_eq_size;
use std::hash::{Hash, Hasher};

// this is the type stored inside of `Type`, it's packed so that the whole
// type handle ends up being 16 bytes including the discriminant.
#[repr(packed)]
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub(crate) struct PackedTypeRef(u64, u32);

// the serde derives take references to fields, which `#[repr(packed)]`
// forbids, so these go through unpacked copies instead
#[cfg(feature = "enable-serde")]
impl serde::Serialize for PackedTypeRef {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let PackedTypeRef(hash, index) = *self;

        (hash, index).serialize(serializer)
    }
}

#[cfg(feature = "enable-serde")]
impl<'de> serde::Deserialize<'de> for PackedTypeRef {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let (hash, index) = <(u64, u32)>::deserialize(deserializer)?;

        Ok(PackedTypeRef(hash, index))
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
enum CompoundData {
    Ptr(Type),
    Array {
        element: Type,
        len: u32,
        size: u64,
        align: u64,
    },
    Struct {
        members: SmallVec<[Type; 4]>,
        size: u64,
        align: u64,
    },
    Union {
        members: SmallVec<[Type; 4]>,
        size: u64,
        align: u64,
    },
    Func {
        ret: Type,
        params: SmallVec<[Type; 4]>,
        vararg: bool,
    },
}

fn align_to(offset: u64, align: u64) -> u64 {
    (offset + align - 1) / align * align
}

/// Owns the actual data for all of the compound types in a given module.
/// Types are de-duplicated on creation, to ensure that equality on their
/// handles is equivalent to comparison by value.
///
/// # Implementation
/// The underlying structure is a hash table mapping the hash of the compound
/// type to a list of compound types with that hash, where the "key" is both
/// the hash of the type (to look up inside the map) and the index into that
/// list. This guarantees that hash collisions don't break everything
/// (however unlikely they are, given the full `u64` hash is used), while
/// still allowing uniqueness to be determined trivially when a type with
/// the same hash doesn't already exist.
#[derive(Debug, Clone, Default)]
pub struct TypePool {
    lookup: AHashMap<u64, SmallVec<[CompoundData; 1]>>,
}

impl TypePool {
    /// Creates an empty pool that is ready for use in a module.
    pub fn new() -> Self {
        Self {
            lookup: AHashMap::default(),
        }
    }

    fn create_ptr(&mut self, pointee: Type) -> PackedTypeRef {
        let mut hasher = ahash::AHasher::default();

        0u8.hash(&mut hasher);
        pointee.hash(&mut hasher);

        self.intern(CompoundData::Ptr(pointee), hasher.finish())
    }

    fn create_array(&mut self, element: Type, len: u32) -> PackedTypeRef {
        let size = element.size(self) * (len as u64);
        let align = element.align(self);
        let mut hasher = ahash::AHasher::default();

        1u8.hash(&mut hasher);
        element.hash(&mut hasher);
        len.hash(&mut hasher);

        self.intern(
            CompoundData::Array {
                element,
                len,
                size,
                align,
            },
            hasher.finish(),
        )
    }

    fn create_struct(&mut self, members: &[Type]) -> PackedTypeRef {
        let align = members.iter().map(|ty| ty.align(self)).max().unwrap_or(1);
        let mut size = 0u64;

        for member in members {
            size = align_to(size, member.align(self)) + member.size(self);
        }

        let mut hasher = ahash::AHasher::default();

        2u8.hash(&mut hasher);
        members.hash(&mut hasher);

        self.intern(
            CompoundData::Struct {
                members: SmallVec::from_slice(members),
                size: align_to(size, align).max(align),
                align,
            },
            hasher.finish(),
        )
    }

    fn create_union(&mut self, members: &[Type]) -> PackedTypeRef {
        let align = members.iter().map(|ty| ty.align(self)).max().unwrap_or(1);
        let size = members.iter().map(|ty| ty.size(self)).max().unwrap_or(0);
        let mut hasher = ahash::AHasher::default();

        3u8.hash(&mut hasher);
        members.hash(&mut hasher);

        self.intern(
            CompoundData::Union {
                members: SmallVec::from_slice(members),
                size: align_to(size.max(1), align),
                align,
            },
            hasher.finish(),
        )
    }

    fn create_func(&mut self, ret: Type, params: &[Type], vararg: bool) -> PackedTypeRef {
        let mut hasher = ahash::AHasher::default();

        4u8.hash(&mut hasher);
        ret.hash(&mut hasher);
        params.hash(&mut hasher);
        vararg.hash(&mut hasher);

        self.intern(
            CompoundData::Func {
                ret,
                params: SmallVec::from_slice(params),
                vararg,
            },
            hasher.finish(),
        )
    }

    fn intern(&mut self, data: CompoundData, hash: u64) -> PackedTypeRef {
        let bucket = self.lookup.entry(hash).or_default();

        match bucket.iter().position(|existing| *existing == data) {
            Some(n) => PackedTypeRef(hash, n as u32),
            None => {
                bucket.push(data);

                PackedTypeRef(hash, (bucket.len() - 1) as u32)
            }
        }
    }

    fn info_for(&self, ty_ref: PackedTypeRef) -> &CompoundData {
        let PackedTypeRef(hash, index) = ty_ref;

        &self.lookup[&hash][index as usize]
    }
}

/// A reference to a type. Copyable, compact, lightweight, and able to model
/// every type in the IR.
///
/// The fundamental types carry all their information in the handle itself
/// (and are therefore process-wide singletons by construction), while the
/// compound types (pointers, arrays, structures, unions and function types)
/// carry a reference into the [`TypePool`] of the module being operated on.
///
/// ```
/// # use beryl::ir::*;
/// let t1 = Type::bool();
/// let t2 = Type::int();
/// assert_ne!(t1, t2);
/// ```
#[repr(u32)]
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "enable-serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Type {
    /// The `void` type. Only meaningful as a function return type and as a
    /// pointee for untyped memory.
    Void,
    /// The `bool` type, the result of the comparison instructions.
    Bool,
    /// The C `char` type, a signed 8-bit integer.
    Char,
    /// The C `short` type, a signed 16-bit integer.
    Short,
    /// The C `int` type, a signed 32-bit integer.
    Int,
    /// The C `long` type, a signed 64-bit integer.
    Long,
    /// A C enumeration. Enumerators are `int`-sized.
    Enum,
    /// A typed pointer, `T*`.
    Ptr(PackedTypeRef),
    /// A fixed-length array, `T[N]`.
    Array(PackedTypeRef),
    /// A structure type with ordered members.
    Struct(PackedTypeRef),
    /// A union type. All members share storage.
    Union(PackedTypeRef),
    /// A function type, `ret (params...)`, possibly variadic.
    Func(PackedTypeRef),
}

// the handle should be exactly 2 words on modern systems. we abuse
// `#[repr(packed)]` on the inner ref so the discriminant of `Type` can live
// in the 4 bytes that would otherwise be padding.
assert_eq_size!(Type, [usize; 2]);

impl Type {
    /// Creates the `void` type.
    pub fn void() -> Self {
        Self::Void
    }

    /// Creates the `bool` type.
    pub fn bool() -> Self {
        Self::Bool
    }

    /// Creates the `char` type.
    pub fn char() -> Self {
        Self::Char
    }

    /// Creates the `short` type.
    pub fn short() -> Self {
        Self::Short
    }

    /// Creates the `int` type.
    pub fn int() -> Self {
        Self::Int
    }

    /// Creates the `long` type.
    pub fn long() -> Self {
        Self::Long
    }

    /// Creates an enumeration type.
    pub fn enumeration() -> Self {
        Self::Enum
    }

    /// Creates a pointer type with a given pointee. Note that these need to
    /// be stored inside a pool.
    ///
    /// ```
    /// # use beryl::ir::*;
    /// let mut pool = TypePool::new();
    /// let t1 = Type::ptr(&mut pool, Type::int());
    /// let t2 = Type::ptr(&mut pool, Type::int());
    /// assert_eq!(t1, t2);
    /// ```
    pub fn ptr(pool: &mut TypePool, pointee: Type) -> Self {
        Self::Ptr(pool.create_ptr(pointee))
    }

    /// Creates an array type with a given element type and length.
    ///
    /// ```
    /// # use beryl::ir::*;
    /// let mut pool = TypePool::new();
    /// let t1 = Type::array(&mut pool, Type::char(), 16);
    /// assert_eq!(t1.size(&pool), 16);
    /// ```
    pub fn array(pool: &mut TypePool, element: Type, len: u32) -> Self {
        Self::Array(pool.create_array(element, len))
    }

    /// Creates a structure type with ordered members.
    ///
    /// ```
    /// # use beryl::ir::*;
    /// let mut pool = TypePool::new();
    /// let t1 = Type::structure(&mut pool, &[Type::char(), Type::int()]);
    /// assert_eq!(t1.size(&pool), 8);
    /// assert_eq!(t1.align(&pool), 4);
    /// ```
    pub fn structure(pool: &mut TypePool, members: &[Type]) -> Self {
        Self::Struct(pool.create_struct(members))
    }

    /// Creates a union type. All members share storage, so the size is the
    /// largest member size rounded up to the largest alignment.
    pub fn union_of(pool: &mut TypePool, members: &[Type]) -> Self {
        Self::Union(pool.create_union(members))
    }

    /// Creates a function type with a given return type and parameter list.
    ///
    /// ```
    /// # use beryl::ir::*;
    /// let mut pool = TypePool::new();
    /// let t1 = Type::func(&mut pool, Type::int(), &[Type::int()], false);
    /// assert_eq!(t1.fn_return(&pool), Type::int());
    /// ```
    pub fn func(pool: &mut TypePool, ret: Type, params: &[Type], vararg: bool) -> Self {
        Self::Func(pool.create_func(ret, params, vararg))
    }

    /// Checks if the type is `void`.
    pub fn is_void(&self) -> bool {
        matches!(self, Self::Void)
    }

    /// Checks if the type is `bool`.
    pub fn is_bool(&self) -> bool {
        matches!(self, Self::Bool)
    }

    /// Checks if the type is one of the signed integer types
    /// (`char`, `short`, `int`, `long`) or an enumeration.
    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            Self::Char | Self::Short | Self::Int | Self::Long | Self::Enum
        )
    }

    /// Checks if the type is an integer or a `bool`.
    pub fn is_bool_or_integer(&self) -> bool {
        self.is_bool() || self.is_integer()
    }

    /// Checks if the type is a pointer.
    pub fn is_ptr(&self) -> bool {
        matches!(self, Self::Ptr(_))
    }

    /// Checks if the type is an array.
    pub fn is_array(&self) -> bool {
        matches!(self, Self::Array(_))
    }

    /// Checks if the type is a structure.
    pub fn is_struct(&self) -> bool {
        matches!(self, Self::Struct(_))
    }

    /// Checks if the type is a union.
    pub fn is_union(&self) -> bool {
        matches!(self, Self::Union(_))
    }

    /// Checks if the type is a function type.
    pub fn is_func(&self) -> bool {
        matches!(self, Self::Func(_))
    }

    /// Returns the size of a value of this type, in bytes.
    ///
    /// Sizes follow the usual 64-bit C ABI: `char` is 1, `short` is 2,
    /// `int` and enumerations are 4, `long` and pointers are 8. `void`
    /// has size 1 so that `void*` arithmetic behaves like GCC's.
    pub fn size(&self, pool: &TypePool) -> u64 {
        match self {
            Self::Void | Self::Bool | Self::Char => 1,
            Self::Short => 2,
            Self::Int | Self::Enum => 4,
            Self::Long | Self::Ptr(_) => 8,
            Self::Array(r) => match pool.info_for(*r) {
                CompoundData::Array { size, .. } => *size,
                _ => unreachable!("array handle referred to non-array data"),
            },
            Self::Struct(r) => match pool.info_for(*r) {
                CompoundData::Struct { size, .. } => *size,
                _ => unreachable!("struct handle referred to non-struct data"),
            },
            Self::Union(r) => match pool.info_for(*r) {
                CompoundData::Union { size, .. } => *size,
                _ => unreachable!("union handle referred to non-union data"),
            },
            Self::Func(_) => 1,
        }
    }

    /// Returns the alignment of a value of this type, in bytes.
    pub fn align(&self, pool: &TypePool) -> u64 {
        match self {
            Self::Void | Self::Bool | Self::Char | Self::Func(_) => 1,
            Self::Short => 2,
            Self::Int | Self::Enum => 4,
            Self::Long | Self::Ptr(_) => 8,
            Self::Array(r) => match pool.info_for(*r) {
                CompoundData::Array { align, .. } => *align,
                _ => unreachable!("array handle referred to non-array data"),
            },
            Self::Struct(r) => match pool.info_for(*r) {
                CompoundData::Struct { align, .. } => *align,
                _ => unreachable!("struct handle referred to non-struct data"),
            },
            Self::Union(r) => match pool.info_for(*r) {
                CompoundData::Union { align, .. } => *align,
                _ => unreachable!("union handle referred to non-union data"),
            },
        }
    }

    /// Returns the pointee of a pointer type.
    ///
    /// Panics if the type is not a pointer.
    pub fn pointee(&self, pool: &TypePool) -> Type {
        match self {
            Self::Ptr(r) => match pool.info_for(*r) {
                CompoundData::Ptr(pointee) => *pointee,
                _ => unreachable!("pointer handle referred to non-pointer data"),
            },
            _ => panic!("`Type::pointee` called on non-pointer type '{self:?}'"),
        }
    }

    /// Returns the element type of an array type.
    pub fn element(&self, pool: &TypePool) -> Type {
        match self {
            Self::Array(r) => match pool.info_for(*r) {
                CompoundData::Array { element, .. } => *element,
                _ => unreachable!("array handle referred to non-array data"),
            },
            _ => panic!("`Type::element` called on non-array type '{self:?}'"),
        }
    }

    /// Returns the number of elements of an array type.
    pub fn array_len(&self, pool: &TypePool) -> u32 {
        match self {
            Self::Array(r) => match pool.info_for(*r) {
                CompoundData::Array { len, .. } => *len,
                _ => unreachable!("array handle referred to non-array data"),
            },
            _ => panic!("`Type::array_len` called on non-array type '{self:?}'"),
        }
    }

    /// Returns the ordered members of a structure or union type.
    pub fn members<'p>(&self, pool: &'p TypePool) -> &'p [Type] {
        match self {
            Self::Struct(r) => match pool.info_for(*r) {
                CompoundData::Struct { members, .. } => members,
                _ => unreachable!("struct handle referred to non-struct data"),
            },
            Self::Union(r) => match pool.info_for(*r) {
                CompoundData::Union { members, .. } => members,
                _ => unreachable!("union handle referred to non-union data"),
            },
            _ => panic!("`Type::members` called on non-aggregate type '{self:?}'"),
        }
    }

    /// Returns the return type of a function type. This may be
    /// [`Type::Void`].
    pub fn fn_return(&self, pool: &TypePool) -> Type {
        match self {
            Self::Func(r) => match pool.info_for(*r) {
                CompoundData::Func { ret, .. } => *ret,
                _ => unreachable!("function handle referred to non-function data"),
            },
            _ => panic!("`Type::fn_return` called on non-function type '{self:?}'"),
        }
    }

    /// Returns the parameter types of a function type.
    pub fn fn_params<'p>(&self, pool: &'p TypePool) -> &'p [Type] {
        match self {
            Self::Func(r) => match pool.info_for(*r) {
                CompoundData::Func { params, .. } => params,
                _ => unreachable!("function handle referred to non-function data"),
            },
            _ => panic!("`Type::fn_params` called on non-function type '{self:?}'"),
        }
    }

    /// Checks whether a function type is variadic.
    pub fn fn_vararg(&self, pool: &TypePool) -> bool {
        match self {
            Self::Func(r) => match pool.info_for(*r) {
                CompoundData::Func { vararg, .. } => *vararg,
                _ => unreachable!("function handle referred to non-function data"),
            },
            _ => panic!("`Type::fn_vararg` called on non-function type '{self:?}'"),
        }
    }
}

impl Hash for CompoundData {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match self {
            CompoundData::Ptr(pointee) => {
                0u8.hash(state);
                pointee.hash(state);
            }
            CompoundData::Array { element, len, .. } => {
                1u8.hash(state);
                element.hash(state);
                len.hash(state);
            }
            CompoundData::Struct { members, .. } => {
                2u8.hash(state);
                members.hash(state);
            }
            CompoundData::Union { members, .. } => {
                3u8.hash(state);
                members.hash(state);
            }
            CompoundData::Func {
                ret,
                params,
                vararg,
            } => {
                4u8.hash(state);
                ret.hash(state);
                params.hash(state);
                vararg.hash(state);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn primitive_sizes() {
        let pool = TypePool::new();

        assert_eq!(Type::char().size(&pool), 1);
        assert_eq!(Type::short().size(&pool), 2);
        assert_eq!(Type::int().size(&pool), 4);
        assert_eq!(Type::long().size(&pool), 8);
        assert_eq!(Type::enumeration().size(&pool), 4);
    }

    #[test]
    fn pointers_are_interned() {
        let mut pool = TypePool::new();

        let p1 = Type::ptr(&mut pool, Type::int());
        let p2 = Type::ptr(&mut pool, Type::int());
        let p3 = Type::ptr(&mut pool, Type::long());

        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
        assert_eq!(p1.pointee(&pool), Type::int());
        assert_eq!(p1.size(&pool), 8);
    }

    #[test]
    fn struct_layout() {
        let mut pool = TypePool::new();

        // { char, int } -> char at 0, int padded to offset 4
        let s = Type::structure(&mut pool, &[Type::char(), Type::int()]);

        assert_eq!(s.size(&pool), 8);
        assert_eq!(s.align(&pool), 4);
        assert_eq!(s.members(&pool), &[Type::char(), Type::int()]);
    }

    #[test]
    fn union_layout() {
        let mut pool = TypePool::new();
        let u = Type::union_of(&mut pool, &[Type::char(), Type::long()]);

        assert_eq!(u.size(&pool), 8);
        assert_eq!(u.align(&pool), 8);
    }

    #[test]
    fn function_types() {
        let mut pool = TypePool::new();

        let f1 = Type::func(&mut pool, Type::int(), &[Type::int(), Type::int()], false);
        let f2 = Type::func(&mut pool, Type::int(), &[Type::int(), Type::int()], false);
        let f3 = Type::func(&mut pool, Type::void(), &[], true);

        assert_eq!(f1, f2);
        assert_ne!(f1, f3);
        assert_eq!(f1.fn_params(&pool), &[Type::int(), Type::int()]);
        assert!(f3.fn_vararg(&pool));
        assert!(f3.fn_return(&pool).is_void());
    }

    #[test]
    fn arrays_multiply() {
        let mut pool = TypePool::new();
        let a = Type::array(&mut pool, Type::int(), 10);

        assert_eq!(a.size(&pool), 40);
        assert_eq!(a.align(&pool), 4);
        assert_eq!(a.element(&pool), Type::int());
        assert_eq!(a.array_len(&pool), 10);
    }
}
