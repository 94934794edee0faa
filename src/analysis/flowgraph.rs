//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::arena::SecondaryMap;
use crate::ir::{Block, Function};
use crate::pass::{FunctionAnalysisManager, FunctionAnalysisPass};
use smallvec::SmallVec;

#[derive(Debug, Clone, Default)]
struct CFGNode {
    predecessors: SmallVec<[Block; 4]>,
    successors: SmallVec<[Block; 2]>,
}

/// Models successor/predecessor information about the control-flow graph
/// of a given function, as a snapshot taken at computation time.
///
/// Edges are stored as *ordered, de-duplicated* lists rather than sets:
/// passes that walk predecessors twice (mem2reg wires block arguments in
/// predecessor order) rely on the two walks agreeing, and deterministic
/// ordering keeps whole-pipeline runs reproducible.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    nodes: SecondaryMap<Block, CFGNode>,
}

impl ControlFlowGraph {
    /// Directly computes flowgraph information for a given function.
    ///
    /// This should not be used directly in normal compiler passes, it
    /// should be requested from the
    /// [`FunctionAnalysisManager`] through [`ControlFlowGraphAnalysis`].
    pub fn compute(func: &Function) -> Self {
        let def = func
            .definition()
            .expect("cannot compute CFG of a declaration");
        let mut nodes = SecondaryMap::default();

        // make sure every block gets a node, even unreachable ones
        // and ones with no edges at all
        for block in def.layout.blocks() {
            nodes.insert(block, CFGNode::default());
        }

        for block in def.layout.blocks() {
            let terminator = match def.layout.block_last_inst(block) {
                Some(inst) => inst,
                None => continue,
            };

            let targets = match def.dfg.data(terminator).branch_targets() {
                Some(targets) => targets,
                None => panic!("invalid block, does not end in a terminator"),
            };

            for &target in targets {
                let node = &mut nodes[block];

                if !node.successors.contains(&target) {
                    node.successors.push(target);
                }

                let node = &mut nodes[target];

                if !node.predecessors.contains(&block) {
                    node.predecessors.push(block);
                }
            }
        }

        Self { nodes }
    }

    /// Returns an iterator over the predecessors of a given block, in a
    /// deterministic order without duplicates.
    pub fn predecessors(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.nodes[block].predecessors.iter().copied()
    }

    /// Returns an iterator over the successors of a given block, in a
    /// deterministic order without duplicates.
    pub fn successors(&self, block: Block) -> impl Iterator<Item = Block> + '_ {
        self.nodes[block].successors.iter().copied()
    }

    /// Returns the number of (unique) predecessors a block has.
    pub fn num_predecessors(&self, block: Block) -> usize {
        self.nodes[block].predecessors.len()
    }

    /// Returns the number of (unique) successors a block has.
    pub fn num_successors(&self, block: Block) -> usize {
        self.nodes[block].successors.len()
    }

    /// Checks if `pred` is a predecessor of `block`.
    pub fn is_pred_of(&self, block: Block, pred: Block) -> bool {
        self.nodes[block].predecessors.contains(&pred)
    }

    /// Checks if `succ` is a successor of `block`.
    pub fn is_succ_of(&self, block: Block, succ: Block) -> bool {
        self.nodes[block].successors.contains(&succ)
    }
}

/// An analysis pass that wraps up a [`ControlFlowGraph`] into something
/// that can actually be cached and reused by transform passes.
pub struct ControlFlowGraphAnalysis;

impl FunctionAnalysisPass for ControlFlowGraphAnalysis {
    type Result = ControlFlowGraph;

    fn run(&mut self, func: &Function, _: &FunctionAnalysisManager) -> Self::Result {
        ControlFlowGraph::compute(func)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;
    use std::iter;

    #[test]
    fn one_block() {
        let mut m = Module::new("test");
        let sig = m.function_type(Type::void(), &[], false);
        let mut b = m.define_function("main", sig);

        // fn void @main() {
        // entry:
        //   ret void
        // }
        let entry = b.create_block("entry");
        b.switch_to(entry);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        let cfg = ControlFlowGraph::compute(m.function(f));

        assert_eq!(cfg.predecessors(entry).next(), None);
        assert_eq!(cfg.successors(entry).next(), None);
    }

    #[test]
    fn merge() {
        let mut m = Module::new("test");
        let sig = m.function_type(Type::void(), &[Type::bool()], false);
        let mut b = m.define_function("main", sig);

        //
        // fn void @main(bool) {
        // entry(bool %0):
        //   condbr %0, if.true, otherwise
        //
        // if.true:
        //   br merge
        //
        // otherwise:
        //   br merge
        //
        // merge:
        //   ret void
        // }
        //
        let entry = b.create_block("entry");
        let entry_params = b.append_entry_params(entry, DebugInfo::fake());
        let if_true = b.create_block("if.true");
        let otherwise = b.create_block("otherwise");
        let merge = b.create_block("merge");

        b.switch_to(entry);
        b.append().condbr(
            entry_params[0],
            BlockWithParams::to(if_true),
            BlockWithParams::to(otherwise),
            DebugInfo::fake(),
        );

        b.switch_to(if_true);
        b.append().br(BlockWithParams::to(merge), DebugInfo::fake());

        b.switch_to(otherwise);
        b.append().br(BlockWithParams::to(merge), DebugInfo::fake());

        b.switch_to(merge);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        let cfg = ControlFlowGraph::compute(m.function(f));

        assert_eq!(cfg.predecessors(entry).next(), None);
        assert!(cfg.is_pred_of(if_true, entry));
        assert!(cfg.is_pred_of(otherwise, entry));
        assert!(cfg.is_pred_of(merge, if_true));
        assert!(cfg.is_pred_of(merge, otherwise));
        assert!(cfg.is_succ_of(entry, if_true));
        assert!(cfg.is_succ_of(entry, otherwise));
        assert!(cfg.successors(if_true).eq(iter::once(merge)));
        assert!(cfg.successors(otherwise).eq(iter::once(merge)));
        assert_eq!(cfg.successors(merge).next(), None);
    }

    #[test]
    fn infinite_loop() {
        let mut m = Module::new("test");
        let sig = m.function_type(Type::void(), &[], false);
        let mut b = m.define_function("main", sig);

        //
        // fn void @main() {
        // entry:
        //   br entry
        // }
        //
        let entry = b.create_block("entry");
        b.switch_to(entry);
        b.append().br(BlockWithParams::to(entry), DebugInfo::fake());

        let f = b.define();
        let cfg = ControlFlowGraph::compute(m.function(f));

        assert!(cfg.predecessors(entry).eq(iter::once(entry)));
        assert!(cfg.successors(entry).eq(iter::once(entry)));
    }

    #[test]
    fn unreachable_block() {
        let mut m = Module::new("test");
        let sig = m.function_type(Type::void(), &[], false);
        let mut b = m.define_function("main", sig);

        //
        // fn void @main() {
        // entry:
        //   br entry
        //
        // island:
        //   ret void
        // }
        //
        let entry = b.create_block("entry");
        let island = b.create_block("island");
        b.switch_to(entry);
        b.append().br(BlockWithParams::to(entry), DebugInfo::fake());

        b.switch_to(island);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        let cfg = ControlFlowGraph::compute(m.function(f));

        assert!(cfg.predecessors(entry).eq(iter::once(entry)));
        assert_eq!(cfg.predecessors(island).next(), None);
        assert_eq!(cfg.successors(island).next(), None);
    }

    #[test]
    fn canonical_loop() {
        let mut m = Module::new("test");
        let sig = m.function_type(Type::void(), &[], false);
        let mut b = m.define_function("main", sig);

        //
        // fn void @main() {
        // entry:
        //   br loop.head(bool true)
        //
        // loop.head(bool %1):
        //   condbr %1, loop.body, exit
        //
        // loop.body:
        //   br loop.latch
        //
        // loop.latch:
        //   br loop.head(bool false)
        //
        // exit:
        //   ret void
        // }
        //
        let entry = b.create_block("entry");
        let loop_head = b.create_block("loop.head");
        let loop_body = b.create_block("loop.body");
        let loop_latch = b.create_block("loop.latch");
        let exit = b.create_block("exit");

        let v1 = b.append_block_param(loop_head, Type::bool(), DebugInfo::fake());

        b.switch_to(entry);
        let v0 = b.bconst(true);
        b.append()
            .br(BlockWithParams::new(loop_head, &[v0]), DebugInfo::fake());

        b.switch_to(loop_head);
        b.append().condbr(
            v1,
            BlockWithParams::to(loop_body),
            BlockWithParams::to(exit),
            DebugInfo::fake(),
        );

        b.switch_to(loop_body);
        b.append()
            .br(BlockWithParams::to(loop_latch), DebugInfo::fake());

        b.switch_to(loop_latch);
        let v2 = b.bconst(false);
        b.append()
            .br(BlockWithParams::new(loop_head, &[v2]), DebugInfo::fake());

        b.switch_to(exit);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        let cfg = ControlFlowGraph::compute(m.function(f));

        assert_eq!(cfg.predecessors(entry).next(), None);
        assert!(cfg.successors(entry).eq(iter::once(loop_head)));

        let loop_head_preds: Vec<_> = cfg.predecessors(loop_head).collect();
        let loop_head_succs: Vec<_> = cfg.successors(loop_head).collect();
        assert!(loop_head_preds.contains(&entry));
        assert!(loop_head_preds.contains(&loop_latch));
        assert!(loop_head_succs.contains(&loop_body));
        assert!(loop_head_succs.contains(&exit));

        assert!(cfg.predecessors(loop_body).eq(iter::once(loop_head)));
        assert!(cfg.successors(loop_body).eq(iter::once(loop_latch)));

        assert!(cfg.predecessors(exit).eq(iter::once(loop_head)));
        assert_eq!(cfg.successors(exit).next(), None);
    }
}
