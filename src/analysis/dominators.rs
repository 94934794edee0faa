//======---------------------------------------------------------------======//
//                                                                           //
// Copyright 2022-2023 Evan Cox <evanacox00@gmail.com>. All rights reserved. //
//                                                                           //
// Use of this source code is governed by a BSD-style license that can be    //
// found in the LICENSE.txt file at the root of this project, or at the      //
// following link: https://opensource.org/licenses/BSD-3-Clause              //
//                                                                           //
//======---------------------------------------------------------------======//

use crate::analysis::{ControlFlowGraph, ControlFlowGraphAnalysis};
use crate::arena::SecondaryMap;
use crate::ir::{Block, Function, FunctionDefinition};
use crate::pass::{FunctionAnalysisManager, FunctionAnalysisPass};
use crate::utility::{Packable, SaHashSet};
use smallvec::SmallVec;

/// Directly computes a valid post-ordering of the blocks in `func`'s
/// (forward) control-flow graph, rooted at the entry block.
///
/// This should not be used directly in most cases, you probably want to
/// get this information through [`DominatorTree`] or
/// [`DominatorTreeAnalysis`].
pub fn compute_postorder(func: &Function) -> Vec<Block> {
    let def = func
        .definition()
        .expect("cannot traverse a function without a definition");
    let mut po = Vec::new();
    let mut seen = SaHashSet::default();

    // if there are no blocks, the postorder is empty anyway
    if let Some(entry) = def.layout.entry_block() {
        forward_po_recursive(def, entry, &mut seen, &mut po);
    }

    po
}

fn forward_po_recursive(
    def: &FunctionDefinition,
    block: Block,
    seen: &mut SaHashSet<Block>,
    out: &mut Vec<Block>,
) {
    // mark as seen **before** visiting targets, in case of self-loops
    // or loops back to this block
    seen.insert(block);

    let targets: SmallVec<[Block; 2]> = def
        .layout
        .block_last_inst(block)
        .and_then(|terminator| def.dfg.data(terminator).branch_targets())
        .map(SmallVec::from_slice)
        .unwrap_or_default();

    for target in targets {
        if !seen.contains(&target) {
            forward_po_recursive(def, target, seen, out);
        }
    }

    out.push(block);
}

// the same traversal over the *reverse* graph: children are predecessors,
// and the roots are the function's exit blocks (`ret` terminators).
// returns the postorder together with the roots it started from.
fn compute_reverse_postorder(
    func: &Function,
    cfg: &ControlFlowGraph,
) -> (Vec<Block>, SmallVec<[Block; 2]>) {
    let def = func
        .definition()
        .expect("cannot traverse a function without a definition");
    let mut exits = SmallVec::new();

    for block in def.layout.blocks() {
        let is_exit = matches!(
            def.layout
                .block_last_inst(block)
                .map(|terminator| def.dfg.data(terminator).branch_targets()),
            Some(Some([]))
        );

        if is_exit {
            exits.push(block);
        }
    }

    let mut po = Vec::new();
    let mut seen = SaHashSet::default();

    for &exit in exits.iter() {
        if !seen.contains(&exit) {
            reverse_po_recursive(cfg, exit, &mut seen, &mut po);
        }
    }

    (po, exits)
}

fn reverse_po_recursive(
    cfg: &ControlFlowGraph,
    block: Block,
    seen: &mut SaHashSet<Block>,
    out: &mut Vec<Block>,
) {
    seen.insert(block);

    let preds: SmallVec<[Block; 4]> = cfg.predecessors(block).collect();

    for pred in preds {
        if !seen.contains(&pred) {
            reverse_po_recursive(cfg, pred, seen, out);
        }
    }

    out.push(block);
}

//
// the solver below implements the dominator algorithm described in
// "A Simple, Fast Dominance Algorithm" by Cooper et. al. See the paper:
// http://www.hipersoft.rice.edu/grads/publications/dom14.pdf.
//
// it is shared between the two tree orientations: for the dominator tree
// the graph is the forward CFG (one root, the entry), for the
// post-dominator tree it is the reverse CFG (rooted at the exits, with
// `preds` returning forward successors). a multi-rooted reverse graph gets
// an implicit virtual root, represented by the reserved block sentinel.
//
fn compute_idoms<P>(po: &[Block], roots: &[Block], preds: P) -> SecondaryMap<Block, Block>
where
    P: Fn(Block) -> SmallVec<[Block; 4]>,
{
    // map block -> postorder number, i.e. the index of the block in `po`.
    // the root(s) carry the highest numbers, and `intersect` always climbs
    // from the smaller number toward them.
    let mut po_numbers = SecondaryMap::default();

    for (i, &bb) in po.iter().enumerate() {
        po_numbers.insert(bb, i);
    }

    let mut idoms: SecondaryMap<Block, Block> = SecondaryMap::default();

    // for the purposes of the algorithm, a root is its own idom
    for &root in roots {
        idoms.insert(root, root);
    }

    let mut changed = true;

    while changed {
        changed = false;

        for &block in po.iter().rev() {
            if roots.contains(&block) {
                continue;
            }

            // every non-root node in reverse postorder has at least one
            // processed predecessor, since the node that discovered it was
            // processed before it
            let processed: SmallVec<[Block; 16]> = preds(block)
                .into_iter()
                .filter(|pred| idoms.contains(*pred))
                .collect();

            let mut iter = processed.into_iter();
            let mut idom = match iter.next() {
                Some(pred) => pred,
                None => continue,
            };

            for pred in iter {
                // the virtual root absorbs everything
                if idom.is_reserved() {
                    break;
                }

                idom = intersect(&po_numbers, &idoms, pred, idom);
            }

            if idoms.insert(block, idom) != Some(idom) {
                changed = true;
            }
        }
    }

    // remove the root -> root relationships, mark the sentinel that
    // the accessors look for instead
    for &root in roots {
        idoms.insert(root, Block::reserved());
    }

    idoms
}

fn intersect(
    po_numbers: &SecondaryMap<Block, usize>,
    idoms: &SecondaryMap<Block, Block>,
    bb1: Block,
    bb2: Block,
) -> Block {
    let mut f1 = bb1;
    let mut f2 = bb2;

    while f1 != f2 {
        // whichever finger is deeper (smaller postorder number) climbs
        // toward the root. a finger that reaches a root (its own idom) or
        // the virtual-root sentinel has no common ancestor with the other.
        while po_numbers[f1] < po_numbers[f2] {
            let up = idoms[f1];

            if up.is_reserved() || up == f1 {
                return Block::reserved();
            }

            f1 = up;
        }

        while po_numbers[f2] < po_numbers[f1] {
            let up = idoms[f2];

            if up.is_reserved() || up == f2 {
                return Block::reserved();
            }

            f2 = up;
        }
    }

    f1
}

/// Models the dominator tree for a given control-flow graph. This analysis
/// also provides a post-order (and therefore reverse post-order) of the
/// reachable blocks, as this is required for calculating dominators and is
/// useful information for other passes to have as well.
///
/// # Implementation
/// The algorithm used is described in "A Simple, Fast Dominance Algorithm"
/// by Cooper et. al. The tree is stored inside a secondary map instead of
/// as separately allocated nodes, but the rough "dominator tree" structure
/// still exists: it is walked by repeatedly looking up immediate
/// dominators.
pub struct DominatorTree {
    // maps B -> idom(B) for a given block B. "tree" structure comes from
    // going farther up the tree, e.g. tree[idom(b)].
    tree: SecondaryMap<Block, Block>,
    // a valid postorder of the reachable blocks in the CFG
    postorder: Vec<Block>,
}

impl DominatorTree {
    /// Computes dominance information for a function.
    pub fn compute(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let po = compute_postorder(func);
        let roots: SmallVec<[Block; 2]> = po.last().copied().into_iter().collect();
        let tree = compute_idoms(&po, &roots, |block| cfg.predecessors(block).collect());

        Self {
            tree,
            postorder: po,
        }
    }

    /// Gets the immediate dominator of `block`, if one exists. The only
    /// reachable block without an immediate dominator is the entry block.
    pub fn idom(&self, block: Block) -> Option<Block> {
        self.tree
            .get(block)
            .copied()
            .filter(|idom| !idom.is_reserved())
    }

    /// Checks if `possible_dominator` dominates `block`. Both blocks must
    /// actually be in the flowgraph.
    ///
    /// This follows the dominance property directly, so it returns `true`
    /// when `block` and `possible_dominator` are the same block.
    /// [`Self::strictly_dominates`] does not.
    pub fn dominates(&self, block: Block, possible_dominator: Block) -> bool {
        (block == possible_dominator) || self.strictly_dominates(block, possible_dominator)
    }

    /// Checks if `possible_dominator` strictly dominates `block`, i.e.
    /// dominates it and isn't equal to it.
    pub fn strictly_dominates(&self, block: Block, possible_dominator: Block) -> bool {
        let mut curr = block;

        while let Some(idom) = self.idom(curr) {
            if idom == possible_dominator {
                return true;
            }

            curr = idom;
        }

        false
    }

    /// Returns the root (entry) node of the CFG.
    pub fn root(&self) -> Block {
        self.postorder
            .last()
            .copied()
            .expect("should have a root node")
    }

    /// Returns the reachable blocks in a valid post-ordering of the CFG.
    pub fn postorder(&self) -> &[Block] {
        &self.postorder
    }

    /// Returns an iterator over the reachable blocks in reverse postorder.
    pub fn reverse_postorder(&self) -> impl Iterator<Item = Block> + '_ {
        self.postorder.iter().copied().rev()
    }

    /// Checks if a block is reachable from the entry node.
    pub fn is_reachable(&self, block: Block) -> bool {
        self.tree.contains(block)
    }
}

/// Wrapper analysis that generates a [`DominatorTree`].
pub struct DominatorTreeAnalysis;

impl FunctionAnalysisPass for DominatorTreeAnalysis {
    type Result = DominatorTree;

    fn run(&mut self, func: &Function, am: &FunctionAnalysisManager) -> Self::Result {
        let cfg = am.get::<ControlFlowGraphAnalysis>(func);

        DominatorTree::compute(func, &cfg)
    }
}

/// Models the post-dominator tree for a function: dominance over the
/// reverse CFG, rooted at the function's exit block(s).
///
/// A function that went through return unification has exactly one exit
/// and therefore a proper tree; with several exits the exits all hang off
/// a virtual root, and blocks whose post-dominator would be that virtual
/// root report no immediate post-dominator at all. Blocks that cannot
/// reach any exit (infinite loops) are not in the tree.
pub struct PostDominatorTree {
    tree: SecondaryMap<Block, Block>,
    postorder: Vec<Block>,
}

impl PostDominatorTree {
    /// Computes post-dominance information for a function.
    pub fn compute(func: &Function, cfg: &ControlFlowGraph) -> Self {
        let (po, roots) = compute_reverse_postorder(func, cfg);
        let tree = compute_idoms(&po, &roots, |block| cfg.successors(block).collect());

        Self {
            tree,
            postorder: po,
        }
    }

    /// Gets the immediate post-dominator of `block`, if one exists.
    pub fn ipdom(&self, block: Block) -> Option<Block> {
        self.tree
            .get(block)
            .copied()
            .filter(|idom| !idom.is_reserved())
    }

    /// Checks if `possible_postdom` post-dominates `block` (reflexively).
    pub fn postdominates(&self, block: Block, possible_postdom: Block) -> bool {
        if block == possible_postdom {
            return true;
        }

        let mut curr = block;

        while let Some(ipdom) = self.ipdom(curr) {
            if ipdom == possible_postdom {
                return true;
            }

            curr = ipdom;
        }

        false
    }

    /// Checks if a block can reach an exit at all. Blocks inside infinite
    /// loops cannot, and have no post-dominance information.
    pub fn is_exit_reachable(&self, block: Block) -> bool {
        self.tree.contains(block)
    }

    /// Returns the blocks that can reach an exit, in a valid post-ordering
    /// of the *reverse* graph.
    pub fn postorder(&self) -> &[Block] {
        &self.postorder
    }
}

/// Wrapper analysis that generates a [`PostDominatorTree`].
pub struct PostDominatorTreeAnalysis;

impl FunctionAnalysisPass for PostDominatorTreeAnalysis {
    type Result = PostDominatorTree;

    fn run(&mut self, func: &Function, am: &FunctionAnalysisManager) -> Self::Result {
        let cfg = am.get::<ControlFlowGraphAnalysis>(func);

        PostDominatorTree::compute(func, &cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::*;

    #[test]
    fn postorder_simple() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[Type::bool()], false);
        let mut b = module.define_function("test", sig);

        //
        // fn void @test(bool) {
        // entry(bool %0):
        //   condbr %0, bb1, bb2
        //
        // bb1:
        //   br merge
        //
        // bb2:
        //   br merge
        //
        // merge:
        //   ret void
        // }
        //
        let entry = b.create_block("entry");
        let v0 = b.append_entry_params(entry, DebugInfo::fake())[0];
        let bb1 = b.create_block("bb1");
        let bb2 = b.create_block("bb2");
        let merge = b.create_block("merge");

        b.switch_to(entry);
        b.append().condbr(
            v0,
            BlockWithParams::to(bb1),
            BlockWithParams::to(bb2),
            DebugInfo::fake(),
        );

        b.switch_to(bb1);
        b.append().br(BlockWithParams::to(merge), DebugInfo::fake());

        b.switch_to(bb2);
        b.append().br(BlockWithParams::to(merge), DebugInfo::fake());

        b.switch_to(merge);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        let func = module.function(f);

        let po = compute_postorder(func);

        // while there are multiple valid postorders for this graph, we know
        // which order the DFS visits targets in, so a test may rely on it
        assert_eq!(po, [merge, bb1, bb2, entry]);
    }

    #[test]
    fn postorder_self_loop() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[], false);
        let mut b = module.define_function("test", sig);

        let entry = b.create_block("entry");

        b.switch_to(entry);
        b.append().br(BlockWithParams::to(entry), DebugInfo::fake());

        let f = b.define();
        let po = compute_postorder(module.function(f));

        assert_eq!(po, [entry]);
    }

    #[test]
    fn domtree_simple() {
        let mut module = Module::new("test");
        let sig_rand = module.function_type(Type::bool(), &[], false);
        let rand = module.declare_function("rand", sig_rand);
        let sig = module.function_type(Type::void(), &[], false);
        let mut b = module.define_function("test", sig);

        //
        // fn bool @rand()
        //
        // fn void @test() {
        // one:
        //   %0 = call bool @rand()
        //   condbr %0, two, three
        //
        // two:
        //   %1 = call bool @rand()
        //   condbr %1, five, nine
        //
        // three:
        //   br four
        //
        // four:
        //   br two
        //
        // five:
        //   %2 = call bool @rand()
        //   condbr %2, eight, six
        //
        // six:
        //   %3 = call bool @rand()
        //   condbr %3, three, seven
        //
        // seven:
        //   %4 = call bool @rand()
        //   condbr %4, one, four
        //
        // eight:
        //   br seven
        //
        // nine:
        //   %5 = call bool @rand()
        //   condbr %5, five, eight
        // }
        //
        let one = b.create_block("one");
        let two = b.create_block("two");
        let three = b.create_block("three");
        let four = b.create_block("four");
        let five = b.create_block("five");
        let six = b.create_block("six");
        let seven = b.create_block("seven");
        let eight = b.create_block("eight");
        let nine = b.create_block("nine");

        b.switch_to(one);
        let v0 = b.append().call(rand, sig_rand, &[], DebugInfo::fake());
        let v0 = b.inst_to_result(v0).unwrap();
        b.append().condbr(
            v0,
            BlockWithParams::to(two),
            BlockWithParams::to(three),
            DebugInfo::fake(),
        );

        b.switch_to(two);
        let v1 = b.append().call(rand, sig_rand, &[], DebugInfo::fake());
        let v1 = b.inst_to_result(v1).unwrap();
        b.append().condbr(
            v1,
            BlockWithParams::to(five),
            BlockWithParams::to(nine),
            DebugInfo::fake(),
        );

        b.switch_to(three);
        b.append().br(BlockWithParams::to(four), DebugInfo::fake());

        b.switch_to(four);
        b.append().br(BlockWithParams::to(two), DebugInfo::fake());

        b.switch_to(five);
        let v2 = b.append().call(rand, sig_rand, &[], DebugInfo::fake());
        let v2 = b.inst_to_result(v2).unwrap();
        b.append().condbr(
            v2,
            BlockWithParams::to(eight),
            BlockWithParams::to(six),
            DebugInfo::fake(),
        );

        b.switch_to(six);
        let v3 = b.append().call(rand, sig_rand, &[], DebugInfo::fake());
        let v3 = b.inst_to_result(v3).unwrap();
        b.append().condbr(
            v3,
            BlockWithParams::to(three),
            BlockWithParams::to(seven),
            DebugInfo::fake(),
        );

        b.switch_to(seven);
        let v4 = b.append().call(rand, sig_rand, &[], DebugInfo::fake());
        let v4 = b.inst_to_result(v4).unwrap();
        b.append().condbr(
            v4,
            BlockWithParams::to(one),
            BlockWithParams::to(four),
            DebugInfo::fake(),
        );

        b.switch_to(eight);
        b.append().br(BlockWithParams::to(seven), DebugInfo::fake());

        b.switch_to(nine);
        let v5 = b.append().call(rand, sig_rand, &[], DebugInfo::fake());
        let v5 = b.inst_to_result(v5).unwrap();
        b.append().condbr(
            v5,
            BlockWithParams::to(five),
            BlockWithParams::to(eight),
            DebugInfo::fake(),
        );

        let f = b.define();
        let func = module.function(f);
        let cfg = ControlFlowGraph::compute(func);
        let domtree = DominatorTree::compute(func, &cfg);

        assert_eq!(domtree.idom(one), None);
        assert_eq!(domtree.idom(two), Some(one));
        assert_eq!(domtree.idom(three), Some(one));
        assert_eq!(domtree.idom(four), Some(one));
        assert_eq!(domtree.idom(five), Some(two));
        assert_eq!(domtree.idom(six), Some(five));
        assert_eq!(domtree.idom(seven), Some(two));
        assert_eq!(domtree.idom(eight), Some(two));
        assert_eq!(domtree.idom(nine), Some(two));

        assert!(domtree.dominates(one, one));
        assert!(domtree.dominates(two, one));
        assert!(domtree.dominates(five, two));
        assert!(domtree.dominates(six, five));
        assert!(domtree.dominates(six, two));

        assert!(!domtree.strictly_dominates(one, one));
        assert!(domtree.strictly_dominates(two, one));
        assert!(domtree.strictly_dominates(five, two));
        assert!(domtree.strictly_dominates(six, five));
    }

    #[test]
    fn postdom_diamond() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[Type::bool()], false);
        let mut b = module.define_function("test", sig);

        let entry = b.create_block("entry");
        let v0 = b.append_entry_params(entry, DebugInfo::fake())[0];
        let then = b.create_block("then");
        let otherwise = b.create_block("otherwise");
        let merge = b.create_block("merge");

        b.switch_to(entry);
        b.append().condbr(
            v0,
            BlockWithParams::to(then),
            BlockWithParams::to(otherwise),
            DebugInfo::fake(),
        );

        b.switch_to(then);
        b.append().br(BlockWithParams::to(merge), DebugInfo::fake());

        b.switch_to(otherwise);
        b.append().br(BlockWithParams::to(merge), DebugInfo::fake());

        b.switch_to(merge);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        let func = module.function(f);
        let cfg = ControlFlowGraph::compute(func);
        let pdt = PostDominatorTree::compute(func, &cfg);

        assert_eq!(pdt.ipdom(merge), None);
        assert_eq!(pdt.ipdom(then), Some(merge));
        assert_eq!(pdt.ipdom(otherwise), Some(merge));
        assert_eq!(pdt.ipdom(entry), Some(merge));

        assert!(pdt.postdominates(entry, merge));
        assert!(pdt.postdominates(then, merge));
        assert!(!pdt.postdominates(entry, then));
        assert!(pdt.postdominates(merge, merge));
    }

    #[test]
    fn postdom_ignores_infinite_loops() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::void(), &[Type::bool()], false);
        let mut b = module.define_function("test", sig);

        // spin never reaches the exit, so it has no post-dominance info
        let entry = b.create_block("entry");
        let v0 = b.append_entry_params(entry, DebugInfo::fake())[0];
        let spin = b.create_block("spin");
        let exit = b.create_block("exit");

        b.switch_to(entry);
        b.append().condbr(
            v0,
            BlockWithParams::to(spin),
            BlockWithParams::to(exit),
            DebugInfo::fake(),
        );

        b.switch_to(spin);
        b.append().br(BlockWithParams::to(spin), DebugInfo::fake());

        b.switch_to(exit);
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        let func = module.function(f);
        let cfg = ControlFlowGraph::compute(func);
        let pdt = PostDominatorTree::compute(func, &cfg);

        assert!(!pdt.is_exit_reachable(spin));
        assert!(pdt.is_exit_reachable(entry));
        assert_eq!(pdt.ipdom(entry), Some(exit));
    }
}
