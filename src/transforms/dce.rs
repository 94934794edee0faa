//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{
    compute_postorder, ControlFlowGraph, ControlFlowGraphAnalysis, PostDominatorTree,
    PostDominatorTreeAnalysis,
};
use crate::arena::SecondaryMap;
use crate::ir::*;
use crate::pass::{FunctionAnalysisManager, FunctionTransformPass, PreservedAnalyses};
use crate::transforms::simplify_control_flow;
use crate::utility::SaHashSet;
use smallvec::SmallVec;
use std::collections::VecDeque;

/// Aggressive dead code elimination.
///
/// Everything is assumed dead until proven otherwise. The proofs start
/// from the *critical* instructions (returns, stores to globals, and
/// unconditional branches, which carry the CFG's connectivity) and flow
/// backwards through operands, through block parameters into the branch
/// arguments that feed them, and through control dependence: a marked
/// instruction keeps the conditional branches its block's execution
/// depends on, found via the reverse dominance frontier.
///
/// Unreachable blocks are deleted up front. In the sweep, a dead
/// conditional branch is replaced by a jump to the nearest useful
/// post-dominator of its block. The pass finishes with a round of
/// control-flow simplification (see
/// [`SimplifyCFGPass`](crate::transforms::SimplifyCFGPass)).
pub struct AggressiveDCEPass;

impl FunctionTransformPass for AggressiveDCEPass {
    fn run(&mut self, func: &mut Function, am: &mut FunctionAnalysisManager) -> PreservedAnalyses {
        let cfg = am.get::<ControlFlowGraphAnalysis>(func);
        let pdt = am.get::<PostDominatorTreeAnalysis>(func);

        aggressive_dce(func, &cfg, &pdt);
        simplify_control_flow(func);

        PreservedAnalyses::none()
    }
}

/// Runs the mark/sweep portion of aggressive DCE over `func`.
///
/// The post-dominator tree should come from the same state of the function
/// as the control-flow graph. Callers that want the full cleanup should
/// also run [`simplify_control_flow`] afterwards, which is what
/// [`AggressiveDCEPass`] does.
pub fn aggressive_dce(func: &mut Function, cfg: &ControlFlowGraph, pdt: &PostDominatorTree) {
    remove_unreachable_blocks(func);

    let rdf = control_dependence(func, cfg, pdt);
    let (marked, useful) = mark(func, &rdf);

    sweep(func, &marked, &useful, pdt);
}

fn remove_unreachable_blocks(func: &mut Function) {
    let reachable: SaHashSet<Block> = compute_postorder(func).into_iter().collect();
    let all: Vec<Block> = func
        .definition()
        .expect("cannot run DCE on a declaration")
        .layout
        .blocks()
        .collect();
    let mut cursor = FuncCursor::over(func);

    for block in all {
        if !reachable.contains(&block) {
            cursor.remove_block(block);
        }
    }
}

// for every block, the set of branch blocks it is control-dependent on:
// `b ∈ rdf[r]` means a side of `b`'s branch decides whether `r` runs.
//
// this is the dominance-frontier algorithm run on the reverse graph: for
// every block with two or more successors, each successor climbs the
// post-dominator tree until it meets the block's immediate post-dominator,
// and the block lands in the frontier of everything visited on the way.
fn control_dependence(
    func: &Function,
    cfg: &ControlFlowGraph,
    pdt: &PostDominatorTree,
) -> SecondaryMap<Block, SmallVec<[Block; 2]>> {
    let def = func.definition().unwrap();
    let mut rdf: SecondaryMap<Block, SmallVec<[Block; 2]>> = SecondaryMap::default();

    for block in def.layout.blocks() {
        rdf.insert(block, SmallVec::new());
    }

    for block in def.layout.blocks() {
        if cfg.num_successors(block) < 2 {
            continue;
        }

        let limit = pdt.ipdom(block);

        for succ in cfg.successors(block) {
            let mut runner = succ;

            loop {
                if Some(runner) == limit || runner == block {
                    break;
                }

                let frontier = &mut rdf[runner];

                if !frontier.contains(&block) {
                    frontier.push(block);
                }

                // a runner that can't reach the exit has no post-dominator
                // chain to climb; just stop there
                match pdt.ipdom(runner) {
                    Some(next) => runner = next,
                    None => break,
                }
            }
        }
    }

    rdf
}

#[derive(Default)]
struct Marked {
    insts: SaHashSet<Inst>,
    params: SaHashSet<Value>,
}

enum Item {
    Inst(Inst),
    Param(Value),
}

fn is_critical(dfg: &DataFlowGraph, inst: Inst) -> bool {
    match dfg.data(inst) {
        InstData::Ret(_) => true,
        // unconditional branches carry the CFG's connectivity
        InstData::Br(_) => true,
        // a store is only observable after the function returns if it
        // goes to a global
        InstData::Store(store) => matches!(dfg.value_def(store.pointer()), ValueDef::Global(_)),
        _ => false,
    }
}

fn mark_value(dfg: &DataFlowGraph, value: Value, marked: &mut Marked, work: &mut VecDeque<Item>) {
    match dfg.value_def(value) {
        ValueDef::Inst(inst) => {
            if marked.insts.insert(inst) {
                work.push_back(Item::Inst(inst));
            }
        }
        ValueDef::Param(_, _) => {
            if marked.params.insert(value) {
                work.push_back(Item::Param(value));
            }
        }
        ValueDef::Const | ValueDef::Global(_) => {}
    }
}

fn mark(
    func: &Function,
    rdf: &SecondaryMap<Block, SmallVec<[Block; 2]>>,
) -> (Marked, SaHashSet<Block>) {
    let def = func.definition().unwrap();
    let mut marked = Marked::default();
    let mut useful: SaHashSet<Block> = SaHashSet::default();
    let mut work: VecDeque<Item> = VecDeque::new();

    for block in def.layout.blocks() {
        for inst in def.layout.insts_in_block(block) {
            if is_critical(&def.dfg, inst) {
                marked.insts.insert(inst);
                work.push_back(Item::Inst(inst));
            }
        }
    }

    while let Some(item) = work.pop_front() {
        let block = match item {
            Item::Inst(inst) => {
                match def.dfg.data(inst) {
                    // a branch's arguments are only needed if the
                    // parameter they feed is, which is handled below
                    InstData::Br(_) => {}
                    InstData::CondBr(condbr) => {
                        mark_value(&def.dfg, condbr.condition(), &mut marked, &mut work);
                    }
                    data => {
                        for &op in data.operands() {
                            mark_value(&def.dfg, op, &mut marked, &mut work);
                        }
                    }
                }

                def.layout.inst_block(inst)
            }
            Item::Param(param) => {
                let (block, index) = match def.dfg.value_def(param) {
                    ValueDef::Param(block, index) => (block, index as usize),
                    _ => unreachable!("non-parameter in the parameter worklist"),
                };

                // a live parameter keeps every branch feeding it, and the
                // value passed along each of those edges
                for &br in def.dfg.block_branch_users(block) {
                    if marked.insts.insert(br) {
                        work.push_back(Item::Inst(br));
                    }

                    for side in def.dfg.branch_sides_to(br, block) {
                        let arg = def.dfg.branch_side_args(br, side)[index];

                        mark_value(&def.dfg, arg, &mut marked, &mut work);
                    }
                }

                block
            }
        };

        useful.insert(block);

        // the branches this block's execution depends on are live too
        for &controller in rdf[block].iter() {
            let terminator = def.layout.block_last_inst(controller).unwrap();

            if marked.insts.insert(terminator) {
                work.push_back(Item::Inst(terminator));
            }
        }
    }

    (marked, useful)
}

fn nearest_useful_postdom(
    block: Block,
    useful: &SaHashSet<Block>,
    pdt: &PostDominatorTree,
) -> Option<Block> {
    let mut target = pdt.ipdom(block)?;

    while !useful.contains(&target) {
        target = pdt.ipdom(target)?;
    }

    Some(target)
}

fn sweep(func: &mut Function, marked: &Marked, useful: &SaHashSet<Block>, pdt: &PostDominatorTree) {
    let mut cursor = FuncCursor::over(func);
    let blocks: Vec<Block> = cursor.layout().blocks().collect();
    let entry = cursor.entry_block();

    // dead parameters first: strip the matching argument from every
    // branch side feeding the block, then drop the parameter. the entry
    // block's parameters are the function's signature and always stay.
    for &block in blocks.iter() {
        if Some(block) == entry {
            continue;
        }

        let params: SmallVec<[Value; 4]> = cursor.block_params(block).iter().copied().collect();

        for param in params {
            if marked.params.contains(&param) {
                continue;
            }

            let index = match cursor.value_def(param) {
                ValueDef::Param(_, index) => index as usize,
                _ => unreachable!(),
            };
            let brs: SmallVec<[Inst; 4]> =
                cursor.dfg().block_branch_users(block).iter().copied().collect();

            for br in brs {
                cursor.dfg_mut().remove_branch_arg(br, block, index);
            }

            cursor.dfg_mut().remove_block_param(block, param);
        }
    }

    for block in blocks {
        cursor.goto_before(block);

        while let Some(inst) = cursor.next_inst() {
            if marked.insts.contains(&inst) {
                continue;
            }

            if cursor.inst_data(inst).opcode() == Opcode::CondBr {
                // a dead conditional still has to get control *somewhere*:
                // jump straight to the part of the function that matters
                let target = match nearest_useful_postdom(block, useful, pdt) {
                    Some(target) => target,
                    None => continue,
                };

                assert!(
                    cursor.block_params(target).is_empty(),
                    "the nearest useful post-dominator cannot take arguments"
                );

                cursor.remove_inst();
                cursor
                    .insert()
                    .br(BlockWithParams::to(target), DebugInfo::fake());
            } else {
                cursor.remove_inst_and_move_back();
            }
        }
    }
}
