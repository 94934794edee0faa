//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::ir::*;

macro_rules! integer_binary {
    ($name:ident, $variant:ident) => {
        #[doc = concat!("Builds a `", stringify!($name), "` instruction.")]
        #[doc = ""]
        #[doc = "Both operands must share the instruction's (integer) type."]
        fn $name(self, lhs: Value, rhs: Value, debug: DebugInfo) -> Value {
            let ty = self.dfg().ty(lhs);

            debug_assert_eq!(ty, self.dfg().ty(rhs), "operands must share a type");
            debug_assert!(ty.is_integer(), "operands must be integers");

            self.build_result(InstData::$variant(BinaryInst::new(ty, lhs, rhs)), debug)
        }
    };
}

macro_rules! bitwise_binary {
    ($name:ident, $variant:ident) => {
        #[doc = concat!("Builds a `", stringify!($name), "` instruction.")]
        #[doc = ""]
        #[doc = "Both operands must share the instruction's type, which may"]
        #[doc = "be any integer type or `bool`."]
        fn $name(self, lhs: Value, rhs: Value, debug: DebugInfo) -> Value {
            let ty = self.dfg().ty(lhs);

            debug_assert_eq!(ty, self.dfg().ty(rhs), "operands must share a type");
            debug_assert!(ty.is_bool_or_integer(), "operands must be integral");

            self.build_result(InstData::$variant(BinaryInst::new(ty, lhs, rhs)), debug)
        }
    };
}

macro_rules! comparison {
    ($name:ident, $variant:ident, $mnemonic:literal) => {
        #[doc = concat!("Builds an `", $mnemonic, "` comparison, yielding `bool`.")]
        fn $name(self, lhs: Value, rhs: Value, debug: DebugInfo) -> Value {
            debug_assert_eq!(
                self.dfg().ty(lhs),
                self.dfg().ty(rhs),
                "operands must share a type"
            );
            debug_assert!({
                let ty = self.dfg().ty(lhs);

                ty.is_bool_or_integer() || ty.is_ptr()
            });

            self.build_result(InstData::$variant(CmpInst::new(lhs, rhs)), debug)
        }
    };
}

/// Helper trait that allows easy creation of instructions. This trait
/// provides one factory method per instruction variant, building the
/// instruction and inserting it in whatever way the trait implementor
/// defines.
///
/// This is what the append builder and the cursor's insert builder both
/// implement, along with any more situational ones.
///
/// Note that the builders do **not** validate dominance of operands or
/// argument/parameter agreement on branches; validation is the verifier's
/// job, and is a property checked between passes rather than enforced
/// during construction.
pub trait InstBuilder: Sized {
    /// Gets the data-flow graph in use for the inserter.
    fn dfg(&self) -> &DataFlowGraph;

    /// Gets the context of the module the function belongs to, for type
    /// and string pool access.
    fn ctx(&self) -> &ModuleContext;

    /// "Builds" a single instruction and inserts it in whatever way the
    /// particular [`InstBuilder`] sees fit.
    ///
    /// This returns a reference to the instruction, and possibly a
    /// reference to the result of that instruction.
    fn build(self, data: InstData, debug: DebugInfo) -> (Inst, Option<Value>);

    /// Builds an instruction and returns its result.
    fn build_result(self, data: InstData, debug: DebugInfo) -> Value {
        self.build(data, debug)
            .1
            .expect("expected a result for instruction")
    }

    /// Builds an instruction and returns the instruction itself.
    fn build_inst(self, data: InstData, debug: DebugInfo) -> Inst {
        self.build(data, debug).0
    }

    /// Builds an `alloca` instruction reserving storage for a value of
    /// type `ty`. The result is a pointer to `ty`.
    fn alloca(self, ty: Type, debug: DebugInfo) -> Value {
        let result = Type::ptr(&mut self.ctx().types_mut(), ty);

        self.build_result(InstData::Alloca(AllocaInst::new(ty, result)), debug)
    }

    /// Builds a `load` instruction reading through `ptr`. The result type
    /// is the pointee type of `ptr`.
    fn load(self, ptr: Value, debug: DebugInfo) -> Value {
        debug_assert!(self.dfg().ty(ptr).is_ptr(), "can only load through pointers");

        let result = self.dfg().ty(ptr).pointee(&self.ctx().types());

        self.build_result(InstData::Load(LoadInst::new(ptr, result)), debug)
    }

    /// Builds a `store` instruction writing `val` through `ptr`.
    fn store(self, val: Value, ptr: Value, debug: DebugInfo) -> Inst {
        debug_assert!(
            self.dfg().ty(ptr).is_ptr(),
            "can only store through pointers"
        );
        debug_assert_eq!(
            self.dfg().ty(ptr).pointee(&self.ctx().types()),
            self.dfg().ty(val),
            "stored value must match the pointee type"
        );

        self.build_inst(InstData::Store(StoreInst::new(val, ptr)), debug)
    }

    /// Builds a `cast` instruction converting `val` into `into`.
    fn cast(self, into: Type, val: Value, debug: DebugInfo) -> Value {
        debug_assert!(
            into.is_bool_or_integer() || into.is_ptr(),
            "casts produce scalars"
        );
        debug_assert!(
            {
                let from = self.dfg().ty(val);

                from.is_bool_or_integer() || from.is_ptr()
            },
            "casts consume scalars"
        );

        self.build_result(InstData::Cast(CastInst::new(val, into)), debug)
    }

    /// Builds a `call` instruction calling `callee`, which must have been
    /// declared with the function type `func_ty`.
    ///
    /// If the callee returns `void` the call yields no result.
    fn call(self, callee: Func, func_ty: Type, args: &[Value], debug: DebugInfo) -> Inst {
        let result = {
            let pool = self.ctx().types();
            let ret = func_ty.fn_return(&pool);

            debug_assert!(
                args.len() == func_ty.fn_params(&pool).len()
                    || (func_ty.fn_vararg(&pool) && args.len() >= func_ty.fn_params(&pool).len()),
                "argument count must match the callee's parameters"
            );

            (!ret.is_void()).then_some(ret)
        };

        self.build_inst(
            InstData::Call(CallInst::new(callee, func_ty, result, args)),
            debug,
        )
    }

    /// Builds a `neg` instruction.
    fn neg(self, val: Value, debug: DebugInfo) -> Value {
        let ty = self.dfg().ty(val);

        debug_assert!(ty.is_integer(), "can only negate integers");

        self.build_result(InstData::Neg(UnaryInst::new(ty, val)), debug)
    }

    /// Builds a `bitnot` instruction.
    fn bitnot(self, val: Value, debug: DebugInfo) -> Value {
        let ty = self.dfg().ty(val);

        debug_assert!(ty.is_bool_or_integer(), "can only complement integrals");

        self.build_result(InstData::BitNot(UnaryInst::new(ty, val)), debug)
    }

    integer_binary!(add, Add);
    integer_binary!(sub, Sub);
    integer_binary!(mul, Mul);
    integer_binary!(div, Div);
    integer_binary!(rem, Mod);

    bitwise_binary!(bitand, BitAnd);
    bitwise_binary!(bitor, BitOr);
    bitwise_binary!(bitxor, BitXor);

    comparison!(cmp_eq, Eq, "eq");
    comparison!(cmp_ne, Ne, "ne");
    comparison!(cmp_lt, Lt, "lt");
    comparison!(cmp_le, Le, "le");

    /// Builds a `ret` instruction that possibly returns a value and
    /// possibly returns `void`.
    fn ret(self, value: Option<Value>, debug: DebugInfo) -> Inst {
        self.build_inst(InstData::Ret(RetInst::new(value)), debug)
    }

    /// Shorthand for [`Self::ret`] with a `Some`.
    fn ret_val(self, value: Value, debug: DebugInfo) -> Inst {
        self.ret(Some(value), debug)
    }

    /// Shorthand for [`Self::ret`] with a `None`.
    fn ret_void(self, debug: DebugInfo) -> Inst {
        self.ret(None, debug)
    }

    /// Builds an unconditional `br` instruction.
    fn br(self, target: BlockWithParams, debug: DebugInfo) -> Inst {
        debug_assert!(self.dfg().is_block_inserted(target.block()));

        self.build_inst(InstData::Br(BrInst::new(target)), debug)
    }

    /// Builds a conditional `condbr` instruction.
    fn condbr(
        self,
        cond: Value,
        if_true: BlockWithParams,
        otherwise: BlockWithParams,
        debug: DebugInfo,
    ) -> Inst {
        debug_assert!(self.dfg().is_block_inserted(if_true.block()));
        debug_assert!(self.dfg().is_block_inserted(otherwise.block()));
        debug_assert_eq!(
            self.dfg().ty(cond),
            Type::bool(),
            "branch conditions must be `bool`"
        );

        self.build_inst(
            InstData::CondBr(CondBrInst::new(cond, if_true, otherwise)),
            debug,
        )
    }
}
