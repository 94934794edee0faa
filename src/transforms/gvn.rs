//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{DominatorTree, DominatorTreeAnalysis};
use crate::ir::*;
use crate::pass::{FunctionAnalysisManager, FunctionTransformPass, PreservedAnalyses};
use crate::utility::{PackedOption, SaHashMap};
use smallvec::SmallVec;
use std::hash::Hash;

/// A dominator-scoped GVN (global value numbering) pass, with constant
/// folding built in.
///
/// Arithmetic and comparison instructions are keyed on
/// `(opcode, lhs, rhs)`; two instructions with the same key along a
/// dominator-tree path compute the same value, so the dominated one is
/// replaced by the dominating one. Instructions whose operands are all
/// integer constants are folded outright.
///
/// This pass works best when the code is already out of memory form, so
/// run `mem2reg` first. Dead computations it leaves behind are `dce`'s
/// problem.
pub struct GVNPass;

impl FunctionTransformPass for GVNPass {
    fn run(&mut self, func: &mut Function, am: &mut FunctionAnalysisManager) -> PreservedAnalyses {
        gvn(func, &am.get::<DominatorTreeAnalysis>(func));

        PreservedAnalyses::all()
    }
}

/// Runs global value numbering over `func` to fold constants and remove
/// redundant expressions.
pub fn gvn(func: &mut Function, domtree: &DominatorTree) {
    let mut tables = ScopedHashMap::new();
    let mut scope_stack = SmallVec::<[Block; 16]>::new();
    let mut cursor = FuncCursor::over(func);

    for bb in domtree.reverse_postorder() {
        // since we aren't directly DFS-ing the dominator tree, we keep an
        // explicit stack of scopes and leave any scope whose block doesn't
        // dominate the one we arrived at. what remains is exactly the
        // dominator chain of `bb`, so every substitution is dominated.
        while let Some(prev) = scope_stack.last().copied() {
            if domtree.dominates(bb, prev) {
                break;
            }

            scope_stack.pop();
            tables.leave_scope();
        }

        scope_stack.push(bb);
        tables.enter_scope();

        cursor.goto_before(bb);

        while let Some(inst) = cursor.next_inst() {
            if !cursor.inst_data(inst).opcode().is_arithmetic() {
                continue;
            }

            let result = cursor
                .inst_to_result(inst)
                .expect("arithmetic instructions always have results");

            if let Some(folded) = try_fold(&mut cursor, inst) {
                cursor.replace_uses_with(result, folded);
                cursor.remove_inst_and_move_back();

                continue;
            }

            let key = ExprKey::of(cursor.dfg(), inst);

            match tables.closest(&key) {
                Some(canonical) => {
                    cursor.replace_uses_with(result, canonical);
                    cursor.remove_inst_and_move_back();
                }
                None => {
                    tables.insert(key, result);
                }
            }
        }
    }
}

// evaluates an arithmetic instruction whose operands are all integer
// constants, on signed 64-bit with two's-complement wrap. comparisons
// intern `bool`s, everything else interns an integer of the instruction's
// own type. division and remainder by a constant zero are never folded.
fn try_fold(cursor: &mut FuncCursor<'_>, inst: Inst) -> Option<Value> {
    enum Folded {
        Int(i64),
        Bool(bool),
    }

    let data = cursor.inst_data(inst);
    let opcode = data.opcode();
    let operands = data.operands();

    let folded = if opcode.is_unary() {
        let x = cursor.dfg().value_as_int(operands[0])?;

        match opcode {
            Opcode::Neg => Folded::Int(x.wrapping_neg()),
            Opcode::BitNot => Folded::Int(!x),
            _ => unreachable!(),
        }
    } else {
        let lhs = cursor.dfg().value_as_int(operands[0])?;
        let rhs = cursor.dfg().value_as_int(operands[1])?;

        match opcode {
            Opcode::Add => Folded::Int(lhs.wrapping_add(rhs)),
            Opcode::Sub => Folded::Int(lhs.wrapping_sub(rhs)),
            Opcode::Mul => Folded::Int(lhs.wrapping_mul(rhs)),
            Opcode::Div if rhs == 0 => return None,
            Opcode::Div => Folded::Int(lhs.wrapping_div(rhs)),
            Opcode::Mod if rhs == 0 => return None,
            Opcode::Mod => Folded::Int(lhs.wrapping_rem(rhs)),
            Opcode::BitAnd => Folded::Int(lhs & rhs),
            Opcode::BitOr => Folded::Int(lhs | rhs),
            Opcode::BitXor => Folded::Int(lhs ^ rhs),
            Opcode::Eq => Folded::Bool(lhs == rhs),
            Opcode::Ne => Folded::Bool(lhs != rhs),
            Opcode::Lt => Folded::Bool(lhs < rhs),
            Opcode::Le => Folded::Bool(lhs <= rhs),
            _ => unreachable!(),
        }
    };

    let ty = cursor
        .inst_data(inst)
        .result_ty()
        .expect("arithmetic instructions always have results");

    Some(match folded {
        Folded::Int(value) => cursor.dfg_mut().iconst(ty, value),
        Folded::Bool(value) => cursor.dfg_mut().bconst(value),
    })
}

// the value-numbering key. deliberately *not* commutative-aware:
// `add a, b` and `add b, a` are different keys.
#[derive(Debug, Copy, Clone, Hash, Eq, PartialEq)]
struct ExprKey {
    opcode: Opcode,
    lhs: Value,
    rhs: PackedOption<Value>,
}

impl ExprKey {
    fn of(dfg: &DataFlowGraph, inst: Inst) -> Self {
        let data = dfg.data(inst);
        let operands = data.operands();

        Self {
            opcode: data.opcode(),
            lhs: operands[0],
            rhs: operands.get(1).copied().into(),
        }
    }
}

#[derive(Debug, Clone)]
struct ScopedHashMap<K, V> {
    inner: Vec<SaHashMap<K, V>>,
}

impl<K, V> ScopedHashMap<K, V>
where
    K: Hash + Eq,
    V: Copy,
{
    fn new() -> Self {
        Self {
            inner: Vec::default(),
        }
    }

    fn enter_scope(&mut self) {
        self.inner.push(SaHashMap::default());
    }

    fn leave_scope(&mut self) {
        self.inner.pop();
    }

    fn insert(&mut self, key: K, value: V) {
        self.inner
            .last_mut()
            .expect("cannot insert without a scope")
            .insert(key, value);
    }

    fn closest(&self, key: &K) -> Option<V> {
        for scope in self.inner.iter().rev() {
            if let Some(value) = scope.get(key) {
                return Some(*value);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ControlFlowGraph;

    fn run(module: &mut Module, f: Func) {
        let func = module.function_mut(f);
        let cfg = ControlFlowGraph::compute(func);
        let domtree = DominatorTree::compute(func, &cfg);

        gvn(func, &domtree);
    }

    fn opcodes_in(func: &Function, opcode: Opcode) -> usize {
        let def = func.definition().unwrap();

        def.layout
            .blocks()
            .flat_map(|bb| def.layout.insts_in_block(bb))
            .filter(|&inst| def.dfg.data(inst).opcode() == opcode)
            .count()
    }

    #[test]
    fn folds_constant_arithmetic() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[], false);
        let mut b = module.define_function("main", sig);

        // return 3 + 4;
        let entry = b.create_block("entry");
        let three = b.iconst(Type::int(), 3);
        let four = b.iconst(Type::int(), 4);

        b.switch_to(entry);
        let sum = b.append().add(three, four, DebugInfo::fake());
        b.append().ret_val(sum, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert_eq!(opcodes_in(func, Opcode::Add), 0);

        let ret = def.layout.block_last_inst(entry).unwrap();

        match def.dfg.data(ret) {
            InstData::Ret(ret) => {
                assert_eq!(def.dfg.value_as_int(ret.value().unwrap()), Some(7));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn folding_cascades() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[], false);
        let mut b = module.define_function("main", sig);

        // (1 + 2) * (1 + 2) -> 9, via the RAUW of the first fold
        let entry = b.create_block("entry");
        let one = b.iconst(Type::int(), 1);
        let two = b.iconst(Type::int(), 2);

        b.switch_to(entry);
        let sum = b.append().add(one, two, DebugInfo::fake());
        let product = b.append().mul(sum, sum, DebugInfo::fake());
        b.append().ret_val(product, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert_eq!(opcodes_in(func, Opcode::Add), 0);
        assert_eq!(opcodes_in(func, Opcode::Mul), 0);

        let ret = def.layout.block_last_inst(entry).unwrap();

        match def.dfg.data(ret) {
            InstData::Ret(ret) => {
                assert_eq!(def.dfg.value_as_int(ret.value().unwrap()), Some(9));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn division_by_zero_is_left_alone() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[], false);
        let mut b = module.define_function("main", sig);

        let entry = b.create_block("entry");
        let one = b.iconst(Type::int(), 1);
        let zero = b.iconst(Type::int(), 0);

        b.switch_to(entry);
        let div = b.append().div(one, zero, DebugInfo::fake());
        let rem = b.append().rem(one, zero, DebugInfo::fake());
        let sum = b.append().add(div, rem, DebugInfo::fake());
        b.append().ret_val(sum, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);

        assert_eq!(opcodes_in(func, Opcode::Div), 1);
        assert_eq!(opcodes_in(func, Opcode::Mod), 1);
        assert_eq!(opcodes_in(func, Opcode::Add), 1);
    }

    #[test]
    fn reuses_repeated_expression() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::int(), Type::int()], false);
        let mut b = module.define_function("h", sig);

        // int h(int a, int b) { return (a + b) + (a + b); }
        let entry = b.create_block("entry");
        let params = b.append_entry_params(entry, DebugInfo::fake());
        let (a, bb) = (params[0], params[1]);

        b.switch_to(entry);
        let s1 = b.append().add(a, bb, DebugInfo::fake());
        let s2 = b.append().add(a, bb, DebugInfo::fake());
        let outer = b.append().add(s1, s2, DebugInfo::fake());
        b.append().ret_val(outer, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        // one inner add (used twice) and the outer add survive
        assert_eq!(opcodes_in(func, Opcode::Add), 2);

        let outer = def
            .layout
            .insts_in_block(entry)
            .filter(|&inst| def.dfg.data(inst).opcode() == Opcode::Add)
            .nth(1)
            .unwrap();

        match def.dfg.data(outer) {
            InstData::Add(add) => assert_eq!(add.lhs(), add.rhs()),
            _ => unreachable!(),
        }
    }

    #[test]
    fn compare_of_equal_values_is_not_folded() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::bool(), &[Type::int()], false);
        let mut b = module.define_function("k", sig);

        // `x == x` needs value analysis, not constant folding: it stays
        let entry = b.create_block("entry");
        let x = b.append_entry_params(entry, DebugInfo::fake())[0];

        b.switch_to(entry);
        let cond = b.append().cmp_eq(x, x, DebugInfo::fake());
        b.append().ret_val(cond, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        assert_eq!(opcodes_in(module.function(f), Opcode::Eq), 1);
    }

    #[test]
    fn keys_are_not_commutative() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::int(), Type::int()], false);
        let mut b = module.define_function("h", sig);

        // a + b and b + a are deliberately distinct keys
        let entry = b.create_block("entry");
        let params = b.append_entry_params(entry, DebugInfo::fake());
        let (a, bb) = (params[0], params[1]);

        b.switch_to(entry);
        let s1 = b.append().add(a, bb, DebugInfo::fake());
        let s2 = b.append().add(bb, a, DebugInfo::fake());
        let outer = b.append().add(s1, s2, DebugInfo::fake());
        b.append().ret_val(outer, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        assert_eq!(opcodes_in(module.function(f), Opcode::Add), 3);
    }

    #[test]
    fn sibling_scopes_do_not_share() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::bool(), Type::int()], false);
        let mut b = module.define_function("h", sig);

        // the add in `then` doesn't dominate the add in `else`, so the
        // second one must survive
        let entry = b.create_block("entry");
        let params = b.append_entry_params(entry, DebugInfo::fake());
        let (cond, x) = (params[0], params[1]);
        let then = b.create_block("then");
        let otherwise = b.create_block("else");
        let join = b.create_block("join");
        let p = b.append_block_param(join, Type::int(), DebugInfo::fake());

        b.switch_to(entry);
        b.append().condbr(
            cond,
            BlockWithParams::to(then),
            BlockWithParams::to(otherwise),
            DebugInfo::fake(),
        );

        b.switch_to(then);
        let s1 = b.append().add(x, x, DebugInfo::fake());
        b.append()
            .br(BlockWithParams::new(join, &[s1]), DebugInfo::fake());

        b.switch_to(otherwise);
        let s2 = b.append().add(x, x, DebugInfo::fake());
        b.append()
            .br(BlockWithParams::new(join, &[s2]), DebugInfo::fake());

        b.switch_to(join);
        b.append().ret_val(p, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        assert_eq!(opcodes_in(module.function(f), Opcode::Add), 2);
    }

    #[test]
    fn dominating_expression_is_reused_in_children() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::bool(), Type::int()], false);
        let mut b = module.define_function("h", sig);

        // the add in `entry` dominates the identical add in `then`, so
        // the dominated one is replaced
        let entry = b.create_block("entry");
        let params = b.append_entry_params(entry, DebugInfo::fake());
        let (cond, x) = (params[0], params[1]);
        let then = b.create_block("then");
        let otherwise = b.create_block("else");

        b.switch_to(entry);
        let s1 = b.append().add(x, x, DebugInfo::fake());
        b.append().condbr(
            cond,
            BlockWithParams::to(then),
            BlockWithParams::to(otherwise),
            DebugInfo::fake(),
        );

        b.switch_to(then);
        let s2 = b.append().add(x, x, DebugInfo::fake());
        b.append().ret_val(s2, DebugInfo::fake());

        b.switch_to(otherwise);
        b.append().ret_val(s1, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert_eq!(opcodes_in(func, Opcode::Add), 1);

        // both returns now consume the dominating add
        let then_ret = def.layout.block_last_inst(then).unwrap();

        match def.dfg.data(then_ret) {
            InstData::Ret(ret) => assert_eq!(ret.value(), Some(s1)),
            _ => unreachable!(),
        }
    }
}
