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
use crate::pass::{FunctionAnalysisManager, FunctionTransformPass, PreservedAnalyses};

/// Rewrites a function with several `ret`s into one with a single return
/// block, so that the reverse CFG has a unique root.
///
/// Every return block stores its value into a fresh slot at the top of the
/// entry block and jumps to one new block that loads the slot and returns;
/// `mem2reg` then promotes the slot away again. `void` functions skip the
/// slot and just branch. Functions that already have a single return are
/// left alone (the return block is just moved to the end of the layout).
///
/// This is expected to run before the optimization pipeline, the way the
/// lowering stage would arrange it.
pub struct UnifyReturnsPass;

impl FunctionTransformPass for UnifyReturnsPass {
    fn run(&mut self, func: &mut Function, _: &mut FunctionAnalysisManager) -> PreservedAnalyses {
        unify_return_blocks(func);

        PreservedAnalyses::none()
    }
}

/// Gives `func` a single return block, as described on
/// [`UnifyReturnsPass`].
pub fn unify_return_blocks(func: &mut Function) {
    let ret_ty = func.return_ty();
    let mut cursor = FuncCursor::over(func);

    let ret_blocks: Vec<Block> = {
        let def = cursor.def();

        def.layout
            .blocks()
            .filter(|&bb| {
                matches!(
                    def.layout
                        .block_last_inst(bb)
                        .map(|inst| def.dfg.data(inst).opcode()),
                    Some(Opcode::Ret)
                )
            })
            .collect()
    };

    if ret_blocks.len() <= 1 {
        if let Some(&ret_block) = ret_blocks.first() {
            cursor.layout_mut().move_block_to_end(ret_block);
        }

        return;
    }

    let entry = cursor.entry_block().expect("function has no entry block");

    // the slot all the old return blocks will funnel their value through
    let slot = if ret_ty.is_void() {
        None
    } else {
        cursor.goto_before(entry);

        Some(cursor.insert().alloca(ret_ty, DebugInfo::fake()))
    };

    let unified = cursor.create_block("ret.unified");

    cursor.goto_after(unified);

    match slot {
        Some(slot) => {
            let value = cursor.insert().load(slot, DebugInfo::fake());

            cursor.insert().ret_val(value, DebugInfo::fake());
        }
        None => {
            cursor.insert().ret_void(DebugInfo::fake());
        }
    }

    for block in ret_blocks {
        let ret = cursor.layout().block_last_inst(block).unwrap();
        let value = match cursor.inst_data(ret) {
            InstData::Ret(ret) => ret.value(),
            _ => unreachable!(),
        };

        cursor.goto_inst(ret);
        cursor.remove_inst();

        if let (Some(slot), Some(value)) = (slot, value) {
            cursor.insert().store(value, slot, DebugInfo::fake());
        }

        cursor
            .insert()
            .br(BlockWithParams::to(unified), DebugInfo::fake());
    }
}

/// Checks that a function has at most one `ret`, which is what the rest of
/// the pipeline (the post-dominator tree in particular) prefers.
pub fn has_unified_returns(func: &Function) -> bool {
    let def = match func.definition() {
        Some(def) => def,
        None => return true,
    };

    let rets = def
        .layout
        .blocks()
        .flat_map(|block| def.layout.insts_in_block(block))
        .filter(|&inst| def.dfg.data(inst).opcode() == Opcode::Ret)
        .count();

    rets <= 1
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::ControlFlowGraph;
    use crate::transforms::mem2reg;

    #[test]
    fn two_returns_become_one() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::bool()], false);
        let mut b = module.define_function("f", sig);

        // int f(bool x) { if (x) return 1; return 2; }
        let entry = b.create_block("entry");
        let x = b.append_entry_params(entry, DebugInfo::fake())[0];
        let then = b.create_block("then");
        let otherwise = b.create_block("else");
        let one = b.iconst(Type::int(), 1);
        let two = b.iconst(Type::int(), 2);

        b.switch_to(entry);
        b.append().condbr(
            x,
            BlockWithParams::to(then),
            BlockWithParams::to(otherwise),
            DebugInfo::fake(),
        );

        b.switch_to(then);
        b.append().ret_val(one, DebugInfo::fake());

        b.switch_to(otherwise);
        b.append().ret_val(two, DebugInfo::fake());

        let f = b.define();

        unify_return_blocks(module.function_mut(f));

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert!(has_unified_returns(func));

        // one ret, two stores, two branches into the unified block
        let rets = def
            .layout
            .blocks()
            .flat_map(|bb| def.layout.insts_in_block(bb))
            .filter(|&inst| def.dfg.data(inst).opcode() == Opcode::Ret)
            .count();

        assert_eq!(rets, 1);

        let unified = def.layout.last_block().unwrap();

        assert_eq!(def.dfg.block_branch_users(unified).len(), 2);

        // and mem2reg dissolves the slot again
        let func = module.function_mut(f);
        let cfg = ControlFlowGraph::compute(func);

        mem2reg(func, &cfg);

        let def = module.function(f).definition().unwrap();
        let allocas = def
            .layout
            .blocks()
            .flat_map(|bb| def.layout.insts_in_block(bb))
            .filter(|&inst| def.dfg.data(inst).opcode() == Opcode::Alloca)
            .count();

        assert_eq!(allocas, 0);
    }

    #[test]
    fn void_functions_skip_the_slot() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[Type::bool()], false);
        let mut b = module.define_function("f", sig);

        let entry = b.create_block("entry");
        let x = b.append_entry_params(entry, DebugInfo::fake())[0];
        let then = b.create_block("then");
        let otherwise = b.create_block("else");

        b.switch_to(entry);
        b.append().condbr(
            x,
            BlockWithParams::to(then),
            BlockWithParams::to(otherwise),
            DebugInfo::fake(),
        );

        b.switch_to(then);
        b.append().ret_void(DebugInfo::fake());

        b.switch_to(otherwise);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();

        unify_return_blocks(module.function_mut(f));

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert!(has_unified_returns(func));

        let allocas = def
            .layout
            .blocks()
            .flat_map(|bb| def.layout.insts_in_block(bb))
            .filter(|&inst| def.dfg.data(inst).opcode() == Opcode::Alloca)
            .count();

        assert_eq!(allocas, 0);
    }

    #[test]
    fn single_return_is_untouched() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[], false);
        let mut b = module.define_function("f", sig);

        let entry = b.create_block("entry");

        b.switch_to(entry);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();

        let before = crate::analysis::stringify_module(&module);

        unify_return_blocks(module.function_mut(f));

        let after = crate::analysis::stringify_module(&module);

        assert_eq!(before, after);
    }
}
