//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{ControlFlowGraph, DominatorTree};
use crate::arena::SecondaryMap;
use crate::ir::*;
use crate::pass::{ModuleAnalysisManager, ModuleTransformPass, PreservedAnalyses};
use crate::utility::SaHashMap;
use std::fmt::Write as _;

/// An IR validity verification pass.
///
/// This scans the entire module, and does nothing if the module is valid.
/// If the module isn't valid, it prints the module and the problems found,
/// then aborts.
pub struct VerifyModulePass;

impl ModuleTransformPass for VerifyModulePass {
    fn run(&mut self, module: &mut Module, _: &mut ModuleAnalysisManager) -> PreservedAnalyses {
        verify_module_panic(module);

        PreservedAnalyses::all()
    }
}

macro_rules! verify_assert {
    ($self:expr, $info:expr, $cond:expr, $($explanation:tt)*) => {
        if !($cond) {
            let mut message = String::new();

            let _ = write!(message, $($explanation)*);

            $self.errors.push((message, $info));
        }
    };
}

/// Verifies that an entire module is valid IR.
///
/// This checks the structural invariants the passes rely on: every block
/// ends in exactly one terminator, branch argument lists agree with their
/// targets' parameters, the def-use bookkeeping is symmetric, the operand
/// type contracts hold, and SSA dominance is respected.
///
/// On failure, the list of problems is returned along with the
/// [`DebugInfo`] of the IR that caused each one.
pub fn verify_module(module: &Module) -> Result<(), Vec<(String, DebugInfo)>> {
    let mut verifier = Verifier {
        module,
        errors: Vec::default(),
    };

    for func in module.functions() {
        let function = module.function(func);

        if function.is_decl() {
            continue;
        }

        verifier.function(function);
    }

    if verifier.errors.is_empty() {
        Ok(())
    } else {
        Err(verifier.errors)
    }
}

/// This is [`verify_module`], except that it prints the module and any
/// errors before panicking on failure.
pub fn verify_module_panic(module: &Module) {
    if let Err(errors) = verify_module(module) {
        println!();
        crate::analysis::print_module(module);
        println!();

        for (error, spot) in errors {
            let (line, col) = (spot.line(), spot.col());

            println!("{line}:{col}: {error}");
        }

        panic!("module failed to verify");
    }
}

struct Verifier<'m> {
    module: &'m Module,
    errors: Vec<(String, DebugInfo)>,
}

impl<'m> Verifier<'m> {
    fn function(&mut self, func: &Function) {
        let def = func.definition().unwrap();
        let before = self.errors.len();

        self.check_terminators(def);

        let structurally_sound = self.errors.len() == before;

        self.check_branches(def);
        self.check_uses(def);
        self.check_types(func, def);

        // the dominance check builds a CFG, which requires every block to
        // actually end in a terminator
        if structurally_sound {
            self.check_dominance(func, def);
        }
    }

    fn check_terminators(&mut self, def: &FunctionDefinition) {
        for block in def.layout.blocks() {
            let last = match def.layout.block_last_inst(block) {
                Some(last) => last,
                None => {
                    self.errors
                        .push(("block has no instructions".into(), DebugInfo::fake()));

                    continue;
                }
            };

            verify_assert!(
                self,
                def.dfg.inst_debug(last),
                def.dfg.data(last).opcode().is_terminator(),
                "block does not end in a terminator"
            );

            for inst in def.layout.insts_in_block(block) {
                verify_assert!(
                    self,
                    def.dfg.inst_debug(inst),
                    inst == last || !def.dfg.data(inst).opcode().is_terminator(),
                    "terminator in the middle of a block"
                );
            }
        }
    }

    fn check_branches(&mut self, def: &FunctionDefinition) {
        let pool = self.module.context().types();

        for block in def.layout.blocks() {
            let Some(terminator) = def.layout.block_last_inst(block) else {
                continue;
            };

            for side in 0..def.dfg.branch_sides(terminator) {
                let target = def.dfg.branch_side_target(terminator, side);
                let args = def.dfg.branch_side_args(terminator, side);
                let params = def.dfg.block_params(target);

                verify_assert!(
                    self,
                    def.dfg.inst_debug(terminator),
                    args.len() == params.len(),
                    "branch passes {} argument(s) to a block with {} parameter(s)",
                    args.len(),
                    params.len()
                );

                for (&arg, &param) in args.iter().zip(params) {
                    verify_assert!(
                        self,
                        def.dfg.inst_debug(terminator),
                        def.dfg.ty(arg) == def.dfg.ty(param),
                        "branch argument type '{}' does not match parameter type '{}'",
                        crate::analysis::stringify_ty(&pool, def.dfg.ty(arg)),
                        crate::analysis::stringify_ty(&pool, def.dfg.ty(param))
                    );
                }
            }
        }
    }

    // both directions of invariant bookkeeping: every operand edge appears
    // in the used value's user list exactly once per edge, and every user
    // entry is backed by a real operand of a live instruction
    fn check_uses(&mut self, def: &FunctionDefinition) {
        for block in def.layout.blocks() {
            for inst in def.layout.insts_in_block(block) {
                let mut counts: SaHashMap<Value, usize> = SaHashMap::default();

                for &op in def.dfg.data(inst).operands() {
                    *counts.entry(op).or_default() += 1;
                }

                for (op, count) in counts {
                    let registered = def
                        .dfg
                        .users(op)
                        .iter()
                        .filter(|&&user| user == inst)
                        .count();

                    verify_assert!(
                        self,
                        def.dfg.inst_debug(inst),
                        registered == count,
                        "instruction uses a value along {count} edge(s) but is registered {registered} time(s)"
                    );

                    for &user in def.dfg.users(op) {
                        verify_assert!(
                            self,
                            def.dfg.inst_debug(inst),
                            def.layout.is_inst_inserted(user),
                            "a value is used by an instruction that is not in the function"
                        );
                    }
                }
            }
        }
    }

    fn check_types(&mut self, func: &Function, def: &FunctionDefinition) {
        let pool = self.module.context().types();
        let return_ty = func.ty().fn_return(&pool);

        for block in def.layout.blocks() {
            for inst in def.layout.insts_in_block(block) {
                let dbg = def.dfg.inst_debug(inst);
                let data = def.dfg.data(inst);

                match data {
                    InstData::Alloca(alloca) => {
                        let result = def.dfg.inst_to_result(inst).unwrap();

                        verify_assert!(
                            self,
                            dbg,
                            def.dfg.ty(result).is_ptr()
                                && def.dfg.ty(result).pointee(&pool) == alloca.alloc_ty(),
                            "alloca must yield a pointer to its allocated type"
                        );
                    }
                    InstData::Load(load) => {
                        let ptr_ty = def.dfg.ty(load.pointer());
                        let result = def.dfg.inst_to_result(inst).unwrap();

                        verify_assert!(self, dbg, ptr_ty.is_ptr(), "load through a non-pointer");

                        if ptr_ty.is_ptr() {
                            verify_assert!(
                                self,
                                dbg,
                                ptr_ty.pointee(&pool) == def.dfg.ty(result),
                                "load result type does not match the pointee"
                            );
                        }
                    }
                    InstData::Store(store) => {
                        let ptr_ty = def.dfg.ty(store.pointer());

                        verify_assert!(self, dbg, ptr_ty.is_ptr(), "store through a non-pointer");

                        if ptr_ty.is_ptr() {
                            verify_assert!(
                                self,
                                dbg,
                                ptr_ty.pointee(&pool) == def.dfg.ty(store.stored()),
                                "stored value type does not match the pointee"
                            );
                        }
                    }
                    InstData::Neg(unary) | InstData::BitNot(unary) => {
                        let result = def.dfg.inst_to_result(inst).unwrap();

                        verify_assert!(
                            self,
                            dbg,
                            def.dfg.ty(unary.operand()) == def.dfg.ty(result),
                            "unary arithmetic must preserve its operand type"
                        );
                    }
                    InstData::Add(bin)
                    | InstData::Sub(bin)
                    | InstData::Mul(bin)
                    | InstData::Div(bin)
                    | InstData::Mod(bin)
                    | InstData::BitAnd(bin)
                    | InstData::BitOr(bin)
                    | InstData::BitXor(bin) => {
                        let result = def.dfg.inst_to_result(inst).unwrap();

                        verify_assert!(
                            self,
                            dbg,
                            def.dfg.ty(bin.lhs()) == def.dfg.ty(result)
                                && def.dfg.ty(bin.rhs()) == def.dfg.ty(result),
                            "binary arithmetic operands must share the instruction's type"
                        );
                    }
                    InstData::Eq(cmp)
                    | InstData::Ne(cmp)
                    | InstData::Lt(cmp)
                    | InstData::Le(cmp) => {
                        let result = def.dfg.inst_to_result(inst).unwrap();

                        verify_assert!(
                            self,
                            dbg,
                            def.dfg.ty(cmp.lhs()) == def.dfg.ty(cmp.rhs()),
                            "comparison operands must share a type"
                        );
                        verify_assert!(
                            self,
                            dbg,
                            def.dfg.ty(result).is_bool(),
                            "comparisons must yield `bool`"
                        );
                    }
                    InstData::Ret(ret) => match ret.value() {
                        Some(value) => {
                            verify_assert!(
                                self,
                                dbg,
                                def.dfg.ty(value) == return_ty,
                                "returned value does not match the function's return type"
                            );
                        }
                        None => {
                            verify_assert!(
                                self,
                                dbg,
                                return_ty.is_void(),
                                "non-void function returns nothing"
                            );
                        }
                    },
                    InstData::CondBr(condbr) => {
                        verify_assert!(
                            self,
                            dbg,
                            def.dfg.ty(condbr.condition()).is_bool(),
                            "branch conditions must be `bool`"
                        );
                    }
                    InstData::Cast(_) | InstData::Call(_) | InstData::Br(_) => {}
                }
            }
        }
    }

    fn check_dominance(&mut self, func: &Function, def: &FunctionDefinition) {
        let cfg = ControlFlowGraph::compute(func);
        let domtree = DominatorTree::compute(func, &cfg);

        // per-block ordinals, for the defined-earlier check
        let mut position: SecondaryMap<Inst, u32> = SecondaryMap::default();

        for block in def.layout.blocks() {
            for (i, inst) in def.layout.insts_in_block(block).enumerate() {
                position.insert(inst, i as u32);
            }
        }

        for block in def.layout.blocks() {
            if !domtree.is_reachable(block) {
                continue;
            }

            for inst in def.layout.insts_in_block(block) {
                for &op in def.dfg.data(inst).operands() {
                    match def.dfg.value_def(op) {
                        ValueDef::Const | ValueDef::Global(_) => {}
                        ValueDef::Param(param_block, _) => {
                            verify_assert!(
                                self,
                                def.dfg.inst_debug(inst),
                                param_block == block || domtree.dominates(block, param_block),
                                "operand parameter's block does not dominate the use"
                            );
                        }
                        ValueDef::Inst(def_inst) => {
                            if !def.layout.is_inst_inserted(def_inst) {
                                verify_assert!(
                                    self,
                                    def.dfg.inst_debug(inst),
                                    false,
                                    "operand refers to an instruction that was removed"
                                );

                                continue;
                            }

                            let def_block = def.layout.inst_block(def_inst);

                            if def_block == block {
                                verify_assert!(
                                    self,
                                    def.dfg.inst_debug(inst),
                                    position[def_inst] < position[inst],
                                    "operand is defined after its use in the same block"
                                );
                            } else {
                                verify_assert!(
                                    self,
                                    def.dfg.inst_debug(inst),
                                    domtree.dominates(block, def_block),
                                    "operand definition does not dominate the use"
                                );
                            }
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_module_verifies() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::int(), Type::int()], false);
        let mut b = module.define_function("sum", sig);

        let entry = b.create_block("entry");
        let params = b.append_entry_params(entry, DebugInfo::fake());

        b.switch_to(entry);
        let result = b.append().add(params[0], params[1], DebugInfo::fake());
        b.append().ret_val(result, DebugInfo::fake());

        b.define();

        assert!(verify_module(&module).is_ok());
    }

    #[test]
    fn branch_arity_mismatch_is_caught() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[Type::int()], false);
        let mut b = module.define_function("f", sig);

        let entry = b.create_block("entry");
        let x = b.append_entry_params(entry, DebugInfo::fake())[0];
        let next = b.create_block("next");

        // `next` has no parameters, but the branch passes an argument;
        // the builders don't validate this, the verifier must
        b.switch_to(entry);
        b.append()
            .br(BlockWithParams::new(next, &[x]), DebugInfo::fake());

        b.switch_to(next);
        b.append().ret_void(DebugInfo::fake());

        b.define();

        let errors = verify_module(&module).unwrap_err();

        assert!(errors
            .iter()
            .any(|(message, _)| message.contains("argument")));
    }

    #[test]
    fn use_before_def_is_caught() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::bool(), Type::int()], false);
        let mut b = module.define_function("f", sig);

        // the add lives in `other`, which does not dominate `user`
        let entry = b.create_block("entry");
        let params = b.append_entry_params(entry, DebugInfo::fake());
        let (cond, x) = (params[0], params[1]);
        let other = b.create_block("other");
        let user = b.create_block("user");

        b.switch_to(entry);
        b.append().condbr(
            cond,
            BlockWithParams::to(other),
            BlockWithParams::to(user),
            DebugInfo::fake(),
        );

        b.switch_to(other);
        let sum = b.append().add(x, x, DebugInfo::fake());
        b.append().ret_val(sum, DebugInfo::fake());

        b.switch_to(user);
        b.append().ret_val(sum, DebugInfo::fake());

        b.define();

        let errors = verify_module(&module).unwrap_err();

        assert!(errors
            .iter()
            .any(|(message, _)| message.contains("dominate")));
    }

    #[test]
    fn missing_terminator_is_caught() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::int()], false);
        let mut b = module.define_function("f", sig);

        let entry = b.create_block("entry");
        let x = b.append_entry_params(entry, DebugInfo::fake())[0];

        b.switch_to(entry);
        b.append().add(x, x, DebugInfo::fake());

        b.define();

        let errors = verify_module(&module).unwrap_err();

        assert!(errors
            .iter()
            .any(|(message, _)| message.contains("terminator")));
    }
}
