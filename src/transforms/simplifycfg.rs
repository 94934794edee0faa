//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::compute_postorder;
use crate::ir::*;
use crate::pass::{FunctionAnalysisManager, FunctionTransformPass, PreservedAnalyses};
use smallvec::SmallVec;

/// A control-flow graph simplification pass.
///
/// Iterates the following rewrites over fresh post-orders until a full
/// sweep changes nothing:
///
/// 1. A conditional branch whose sides are identical (same target, same
///    arguments) becomes unconditional.
/// 2. A block containing nothing but an unconditional branch that passes
///    its own parameters straight through is dissolved: predecessors jump
///    directly to its successor.
/// 3. A parameter-free block containing nothing but an unconditional
///    branch with hard-coded arguments is dissolved the same way, the
///    arguments moving into the predecessors' branches.
/// 4. A block whose successor has no other predecessor swallows that
///    successor whole.
/// 5. An unconditional jump to a block containing nothing but a
///    conditional branch is threaded through it when the block's
///    parameter forwarding is pure (or trivially, when it has none).
///
/// The function's entry block is never deleted.
pub struct SimplifyCFGPass;

impl FunctionTransformPass for SimplifyCFGPass {
    fn run(&mut self, func: &mut Function, _: &mut FunctionAnalysisManager) -> PreservedAnalyses {
        simplify_control_flow(func);

        PreservedAnalyses::none()
    }
}

/// Runs the control-flow simplification rewrites over `func` until they
/// reach a fixed point.
pub fn simplify_control_flow(func: &mut Function) {
    let mut changed = true;

    while changed {
        changed = false;

        let po = compute_postorder(func);
        let mut cursor = FuncCursor::over(func);

        for bb in po {
            // earlier rewrites in this sweep may have deleted the block
            if !cursor.layout().is_block_inserted(bb) {
                continue;
            }

            let terminator = match cursor.layout().block_last_inst(bb) {
                Some(inst) => inst,
                None => continue,
            };

            if cursor.inst_data(terminator).opcode() != Opcode::Ret {
                changed |= simplify_block(&mut cursor, bb);
            }
        }
    }
}

// does the block pass exactly its own parameters to the target of its
// (unconditional) branch?
fn forwards_own_params(dfg: &DataFlowGraph, bb: Block, br: Inst) -> bool {
    let params = dfg.block_params(bb);
    let args = dfg.branch_side_args(br, 0);

    params.len() == args.len() && params.iter().zip(args).all(|(p, a)| p == a)
}

// the conditional-branch shape of the same question, for both sides
fn forwards_own_params_cond(dfg: &DataFlowGraph, bb: Block, br: Inst) -> bool {
    let params = dfg.block_params(bb);
    let args0 = dfg.branch_side_args(br, 0);
    let args1 = dfg.branch_side_args(br, 1);

    params.len() == args0.len()
        && params.len() == args1.len()
        && params.iter().zip(args0).all(|(p, a)| p == a)
        && params.iter().zip(args1).all(|(p, a)| p == a)
}

fn simplify_block(cursor: &mut FuncCursor<'_>, i: Block) -> bool {
    let mut changed = false;
    let entry = cursor.entry_block().expect("function has no blocks");

    // 1. redundant conditional branch
    let terminator = cursor.layout().block_last_inst(i).unwrap();

    if let InstData::CondBr(condbr) = cursor.inst_data(terminator) {
        if condbr.true_branch() == condbr.false_branch() && condbr.args_of(0) == condbr.args_of(1) {
            let target = condbr.true_branch();
            let args: SmallVec<[Value; 4]> = SmallVec::from_slice(condbr.args_of(0));

            cursor.goto_inst(terminator);
            cursor.remove_inst();
            cursor
                .insert()
                .br(BlockWithParams::new(target, &args), DebugInfo::fake());

            changed = true;
        }
    }

    // everything below applies to blocks ending in an unconditional jump
    let jmp = cursor.layout().block_last_inst(i).unwrap();
    let j = match cursor.inst_data(jmp) {
        InstData::Br(br) => br.target(),
        _ => return changed,
    };

    let single_inst = cursor.layout().block_first_inst(i) == Some(jmp);

    if single_inst && i != entry && i != j {
        // 2. pure forwarding: predecessors can jump straight to `j`,
        // their argument lists carry over unchanged
        if forwards_own_params(cursor.dfg(), i, jmp) {
            loop {
                let pred_br = match cursor.dfg().block_branch_users(i).first() {
                    Some(&br) => br,
                    None => break,
                };

                for side in cursor.dfg().branch_sides_to(pred_br, i) {
                    cursor.dfg_mut().set_branch_side_target(pred_br, side, j);
                }
            }

            let iparams: SmallVec<[Value; 4]> = cursor.block_params(i).iter().copied().collect();
            let jparams: SmallVec<[Value; 4]> = cursor.block_params(j).iter().copied().collect();

            for (p, q) in iparams.into_iter().zip(jparams) {
                cursor.replace_uses_with(p, q);
            }

            cursor.remove_block(i);

            return true;
        }

        // 3. param-free block with hard-coded arguments: forward them
        // from the predecessors directly
        if cursor.block_params(i).is_empty()
            && !cursor.block_params(j).is_empty()
            && !cursor.dfg().block_branch_users(i).is_empty()
        {
            let args: SmallVec<[Value; 4]> =
                SmallVec::from_slice(cursor.dfg().branch_side_args(jmp, 0));

            loop {
                let pred_br = match cursor.dfg().block_branch_users(i).first() {
                    Some(&br) => br,
                    None => break,
                };

                for side in cursor.dfg().branch_sides_to(pred_br, i) {
                    cursor.dfg_mut().set_branch_side_target(pred_br, side, j);

                    for &arg in args.iter() {
                        cursor.dfg_mut().append_branch_side_arg(pred_br, side, arg);
                    }
                }
            }

            cursor.remove_block(i);

            return true;
        }
    }

    // 4. coalescing: `j`'s only predecessor is `i`, so `j`'s body can be
    // spliced onto the end of `i`
    if i != j && j != entry {
        let users = cursor.dfg().block_branch_users(j);

        if users.len() == 1 && users[0] == jmp {
            let args: SmallVec<[Value; 4]> =
                SmallVec::from_slice(cursor.dfg().branch_side_args(jmp, 0));
            let jparams: SmallVec<[Value; 4]> = cursor.block_params(j).iter().copied().collect();

            for (&q, a) in jparams.iter().zip(args) {
                cursor.replace_uses_with(q, a);
            }

            cursor.goto_inst(jmp);
            cursor.remove_inst();

            while let Some(inst) = cursor.layout().block_first_inst(j) {
                cursor.layout_mut().remove_inst(inst);
                cursor.layout_mut().append_inst(inst, i);
            }

            cursor.layout_mut().remove_block(j);

            return true;
        }
    }

    // 5. jump-to-conditional threading
    if i != j {
        let jterm = cursor.layout().block_last_inst(j).unwrap();
        let j_single = cursor.layout().block_first_inst(j) == Some(jterm);

        if j_single && cursor.inst_data(jterm).opcode() == Opcode::CondBr {
            let jmp_args: SmallVec<[Value; 4]> =
                SmallVec::from_slice(cursor.dfg().branch_side_args(jmp, 0));
            let (cond, t0, t1, args0, args1) = match cursor.inst_data(jterm) {
                InstData::CondBr(condbr) => (
                    condbr.condition(),
                    condbr.true_branch(),
                    condbr.false_branch(),
                    SmallVec::<[Value; 4]>::from_slice(condbr.args_of(0)),
                    SmallVec::<[Value; 4]>::from_slice(condbr.args_of(1)),
                ),
                _ => unreachable!(),
            };

            if forwards_own_params_cond(cursor.dfg(), j, jterm) {
                // the branch's condition and arguments are all either
                // loop-invariant or `i`'s own argument list
                let cond = match cursor.value_def(cond) {
                    ValueDef::Param(pb, index) if pb == j => jmp_args[index as usize],
                    _ => cond,
                };

                cursor.goto_inst(jmp);
                cursor.remove_inst();
                cursor.insert().condbr(
                    cond,
                    BlockWithParams::new(t0, &jmp_args),
                    BlockWithParams::new(t1, &jmp_args),
                    DebugInfo::fake(),
                );

                return true;
            }

            if cursor.block_params(j).is_empty() && (!args0.is_empty() || !args1.is_empty()) {
                cursor.goto_inst(jmp);
                cursor.remove_inst();
                cursor.insert().condbr(
                    cond,
                    BlockWithParams::new(t0, &args0),
                    BlockWithParams::new(t1, &args1),
                    DebugInfo::fake(),
                );

                return true;
            }
        }
    }

    changed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(module: &mut Module, f: Func) {
        simplify_control_flow(module.function_mut(f));
    }

    #[test]
    fn redundant_condbr_becomes_br() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[Type::bool()], false);
        let mut b = module.define_function("f", sig);

        let entry = b.create_block("entry");
        let cond = b.append_entry_params(entry, DebugInfo::fake())[0];
        let next = b.create_block("next");

        b.switch_to(entry);
        b.append().condbr(
            cond,
            BlockWithParams::to(next),
            BlockWithParams::to(next),
            DebugInfo::fake(),
        );

        b.switch_to(next);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        // the redundant branch collapses, and the coalescing rule then
        // swallows `next` into the entry block entirely
        assert_eq!(def.layout.len_blocks(), 1);

        let last = def.layout.block_last_inst(entry).unwrap();

        assert_eq!(def.dfg.data(last).opcode(), Opcode::Ret);
    }

    #[test]
    fn chain_of_jumps_collapses() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[], false);
        let mut b = module.define_function("f", sig);

        let entry = b.create_block("entry");
        let a = b.create_block("a");
        let bb = b.create_block("b");

        b.switch_to(entry);
        b.append().br(BlockWithParams::to(a), DebugInfo::fake());

        b.switch_to(a);
        b.append().br(BlockWithParams::to(bb), DebugInfo::fake());

        b.switch_to(bb);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert_eq!(def.layout.len_blocks(), 1);
        assert_eq!(def.layout.entry_block(), Some(entry));
        assert_eq!(
            def.dfg
                .data(def.layout.block_last_inst(entry).unwrap())
                .opcode(),
            Opcode::Ret
        );
    }

    #[test]
    fn forwarding_block_is_dissolved() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::bool(), Type::int()], false);
        let mut b = module.define_function("f", sig);

        // entry passes %x through `mid` to `exit`; `mid` must vanish with
        // the argument surviving on the rewired edges
        let entry = b.create_block("entry");
        let params = b.append_entry_params(entry, DebugInfo::fake());
        let (cond, x) = (params[0], params[1]);
        let mid = b.create_block("mid");
        let mid_param = b.append_block_param(mid, Type::int(), DebugInfo::fake());
        let exit = b.create_block("exit");
        let exit_param = b.append_block_param(exit, Type::int(), DebugInfo::fake());

        b.switch_to(entry);
        b.append().condbr(
            cond,
            BlockWithParams::new(mid, &[x]),
            BlockWithParams::new(exit, &[x]),
            DebugInfo::fake(),
        );

        b.switch_to(mid);
        b.append()
            .br(BlockWithParams::new(exit, &[mid_param]), DebugInfo::fake());

        b.switch_to(exit);
        b.append().ret_val(exit_param, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        // `mid` dissolves, which makes the entry branch redundant (both
        // sides `exit(%x)`), which in turn lets `exit` be swallowed: the
        // whole function collapses to `ret %x`
        assert!(!def.layout.is_block_inserted(mid));
        assert_eq!(def.layout.len_blocks(), 1);

        let ret = def.layout.block_last_inst(entry).unwrap();

        match def.dfg.data(ret) {
            InstData::Ret(ret) => assert_eq!(ret.value(), Some(x)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn hardcoded_arguments_move_into_predecessors() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::bool()], false);
        let mut b = module.define_function("f", sig);

        let entry = b.create_block("entry");
        let cond = b.append_entry_params(entry, DebugInfo::fake())[0];
        let lhs = b.create_block("lhs");
        let rhs = b.create_block("rhs");
        let join = b.create_block("join");
        let join_param = b.append_block_param(join, Type::int(), DebugInfo::fake());
        let one = b.iconst(Type::int(), 1);
        let two = b.iconst(Type::int(), 2);

        b.switch_to(entry);
        b.append().condbr(
            cond,
            BlockWithParams::to(lhs),
            BlockWithParams::to(rhs),
            DebugInfo::fake(),
        );

        b.switch_to(lhs);
        b.append()
            .br(BlockWithParams::new(join, &[one]), DebugInfo::fake());

        b.switch_to(rhs);
        b.append()
            .br(BlockWithParams::new(join, &[two]), DebugInfo::fake());

        b.switch_to(join);
        b.append().ret_val(join_param, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        // both singleton blocks dissolve; the entry branch feeds the
        // join's parameter directly
        assert!(!def.layout.is_block_inserted(lhs));
        assert!(!def.layout.is_block_inserted(rhs));

        let br = def.layout.block_last_inst(entry).unwrap();

        assert_eq!(def.dfg.branch_side_target(br, 0), join);
        assert_eq!(def.dfg.branch_side_target(br, 1), join);
        assert_eq!(def.dfg.branch_side_args(br, 0), &[one]);
        assert_eq!(def.dfg.branch_side_args(br, 1), &[two]);
    }

    #[test]
    fn jump_to_conditional_is_threaded() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[Type::bool()], false);
        let mut b = module.define_function("f", sig);

        let entry = b.create_block("entry");
        let cond = b.append_entry_params(entry, DebugInfo::fake())[0];
        let hop = b.create_block("hop");
        let spin = b.create_block("spin");
        let done = b.create_block("done");

        b.switch_to(entry);
        b.append().br(BlockWithParams::to(hop), DebugInfo::fake());

        b.switch_to(hop);
        b.append().condbr(
            cond,
            BlockWithParams::to(spin),
            BlockWithParams::to(done),
            DebugInfo::fake(),
        );

        b.switch_to(spin);
        b.append().br(BlockWithParams::to(hop), DebugInfo::fake());

        b.switch_to(done);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        // `spin` was an empty forwarding block, so the loop collapses to a
        // self-loop on `hop`, and the entry's jump threads through `hop`
        assert!(!def.layout.is_block_inserted(spin));

        let br = def.layout.block_last_inst(entry).unwrap();

        assert_eq!(def.dfg.data(br).opcode(), Opcode::CondBr);
        assert_eq!(def.dfg.branch_side_target(br, 0), hop);
        assert_eq!(def.dfg.branch_side_target(br, 1), done);

        let hop_br = def.layout.block_last_inst(hop).unwrap();

        assert_eq!(def.dfg.branch_side_target(hop_br, 0), hop);
    }

    #[test]
    fn entry_block_is_never_deleted() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[], false);
        let mut b = module.define_function("f", sig);

        // entry is itself a pure-forwarding singleton, but it must stay
        let entry = b.create_block("entry");
        let next = b.create_block("next");

        b.switch_to(entry);
        b.append().br(BlockWithParams::to(next), DebugInfo::fake());

        b.switch_to(next);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert_eq!(def.layout.entry_block(), Some(entry));
        assert_eq!(
            def.dfg
                .data(def.layout.block_last_inst(entry).unwrap())
                .opcode(),
            Opcode::Ret
        );
    }
}
