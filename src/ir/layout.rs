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
use crate::ir::{Block, Inst};
use crate::utility::PackedOption;

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct InstNode {
    prev: PackedOption<Inst>,
    next: PackedOption<Inst>,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq)]
struct BlockNode {
    prev: PackedOption<Block>,
    next: PackedOption<Block>,
    first: PackedOption<Inst>,
    last: PackedOption<Inst>,
}

/// Allows the blocks in a layout to be iterated over in program order.
///
/// There isn't necessarily any relationship between this order and the
/// actual execution order of the code besides the fact that the first
/// block is the entry block.
#[derive(Copy, Clone, Debug)]
pub struct BlockIter<'layout> {
    next: Option<Block>,
    layout: &'layout Layout,
}

impl<'l> Iterator for BlockIter<'l> {
    type Item = Block;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|block| {
            self.next = self.layout.blocks[block].next.expand();

            block
        })
    }
}

/// Allows all of the instructions in a given block to be iterated over.
#[derive(Copy, Clone, Debug)]
pub struct InstIter<'layout> {
    next: Option<Inst>,
    layout: &'layout Layout,
}

impl<'l> Iterator for InstIter<'l> {
    type Item = Inst;

    fn next(&mut self) -> Option<Self::Item> {
        self.next.map(|inst| {
            self.next = self.layout.nodes[inst].next.expand();

            inst
        })
    }
}

/// Models the layout of an entire function and every basic block in it.
///
/// Each block's instruction list is modeled as a doubly-linked list to
/// allow easy splicing and in-place editing, and the list of blocks is
/// also modeled as a linked list for similar reasons. Both lists store
/// their links inside secondary maps rather than in the entities.
#[derive(Default, Clone, Debug)]
pub struct Layout {
    // forms a doubly-linked list of blocks, with `None` at the head/tail
    blocks: SecondaryMap<Block, BlockNode>,
    // forms a doubly-linked list of instructions, with `None` at the head/tail
    nodes: SecondaryMap<Inst, InstNode>,
    // maps instructions -> the blocks that contain them
    inst_blocks: SecondaryMap<Inst, Block>,
    head: PackedOption<Block>,
    tail: PackedOption<Block>,
    block_len: usize,
    inst_len: usize,
}

impl Layout {
    /// Creates a new, empty layout.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an instruction to the end of the specified block. If this is
    /// the final instruction being appended to the block, it must be a
    /// terminator instruction.
    pub fn append_inst(&mut self, inst: Inst, block: Block) {
        debug_assert!(
            !self.nodes.contains(inst),
            "cannot insert same inst multiple times"
        );

        let block_node = &mut self.blocks[block];
        let prev = block_node.last.replace(inst);

        // if there was no previous last instruction, we're the first
        // instruction in the block
        match prev {
            Some(prev) => {
                self.nodes[prev].next = PackedOption::some(inst);
            }
            None => {
                block_node.first.replace(inst);
            }
        }

        self.insert_node(inst, block, prev.into(), PackedOption::none());
    }

    /// Inserts `inst` into the same block as `before`, directly before it.
    pub fn insert_inst_before(&mut self, inst: Inst, before: Inst) {
        debug_assert!(
            !self.nodes.contains(inst),
            "cannot insert same inst multiple times"
        );

        debug_assert!(
            self.nodes.contains(before),
            "cannot insert before instruction that isn't in the layout"
        );

        let prev = self.nodes[before].prev.replace(inst);

        // if `before` had no previous instruction, we're now the first
        // instruction of the block
        match prev {
            Some(prev) => {
                self.nodes[prev].next = PackedOption::some(inst);
            }
            None => {
                self.block_node_of_inst_mut(before).first = PackedOption::some(inst);
            }
        }

        self.insert_node(
            inst,
            self.inst_blocks[before],
            prev.into(),
            PackedOption::some(before),
        );
    }

    /// Inserts `inst` into the same block as `after`, directly after it.
    pub fn insert_inst_after(&mut self, inst: Inst, after: Inst) {
        debug_assert!(
            !self.nodes.contains(inst),
            "cannot insert same inst multiple times"
        );

        debug_assert!(
            self.nodes.contains(after),
            "cannot insert after instruction that isn't in the layout"
        );

        let next = self.nodes[after].next.replace(inst);

        // if `after` had no next instruction, we're now the last
        // instruction of the block
        match next {
            Some(next) => {
                self.nodes[next].prev = PackedOption::some(inst);
            }
            None => {
                self.block_node_of_inst_mut(after).last = PackedOption::some(inst);
            }
        }

        self.insert_node(
            inst,
            self.inst_blocks[after],
            PackedOption::some(after),
            next.into(),
        );
    }

    /// Removes an instruction from the layout. It is expected that the
    /// instruction exists, because removing a non-existent instruction is
    /// almost certainly a bug.
    pub fn remove_inst(&mut self, inst: Inst) {
        let node = self.nodes[inst];

        // update `node.prev` to point to `node.next` as its own next
        match node.prev.expand() {
            Some(prev) => {
                self.nodes[prev].next = node.next;
            }
            None => {
                self.block_node_of_inst_mut(inst).first = node.next;
            }
        }

        // update `node.next` to point to `node.prev` as its own prev
        match node.next.expand() {
            Some(next) => {
                self.nodes[next].prev = node.prev;
            }
            None => {
                self.block_node_of_inst_mut(inst).last = node.prev;
            }
        }

        // make sure there aren't ghost references to the instruction in the
        // layout anymore, it must be as-if the inst was never inserted
        self.nodes.remove(inst);
        self.inst_blocks.remove(inst);
        self.inst_len -= 1;
    }

    /// Appends a block to the layout, putting it at the end of the block list.
    pub fn append_block(&mut self, block: Block) {
        debug_assert!(
            !self.blocks.contains(block),
            "cannot insert block that is already inserted"
        );

        let prev = self.tail.replace(block);

        // if a tail existed we need to link it up, if it didn't we also
        // need to update the head since the list was empty
        match prev {
            Some(bb) => {
                self.blocks[bb].next.replace(block);
            }
            None => {
                self.head.replace(block);
            }
        }

        self.insert_block(block, prev, None);
    }

    /// Inserts a block before another block in the list.
    pub fn insert_block_before(&mut self, block: Block, before: Block) {
        debug_assert!(
            self.blocks.contains(before),
            "cannot insert before a block that isn't in the layout"
        );

        debug_assert!(
            !self.blocks.contains(block),
            "cannot insert block that is already inserted"
        );

        let prev = self.blocks[before].prev.replace(block);

        match prev {
            Some(prev) => {
                self.blocks[prev].next.replace(block);
            }
            None => {
                self.head.replace(block);
            }
        }

        self.insert_block(block, prev, Some(before));
    }

    /// Inserts a basic block after another basic block.
    pub fn insert_block_after(&mut self, block: Block, after: Block) {
        debug_assert!(
            self.blocks.contains(after),
            "cannot insert after a block that isn't in the layout"
        );

        debug_assert!(
            !self.blocks.contains(block),
            "cannot insert block that is already inserted"
        );

        let next = self.blocks[after].next.replace(block);

        match next {
            Some(next) => {
                self.blocks[next].prev.replace(block);
            }
            None => {
                self.tail.replace(block);
            }
        }

        self.insert_block(block, Some(after), next);
    }

    /// Removes a block from the layout. The block must be empty, remove
    /// its instructions first.
    pub fn remove_block(&mut self, block: Block) {
        let node = self.blocks[block];

        debug_assert!(
            node.first.is_none(),
            "cannot remove a block that still has instructions"
        );

        match node.prev.expand() {
            Some(prev) => self.blocks[prev].next = node.next,
            None => self.head = node.next,
        }

        match node.next.expand() {
            Some(next) => self.blocks[next].prev = node.prev,
            None => self.tail = node.prev,
        }

        self.blocks.remove(block);
        self.block_len -= 1;
    }

    /// Unlinks a block (with its instructions intact) and re-links it at
    /// the end of the block list.
    pub fn move_block_to_end(&mut self, block: Block) {
        if self.tail.expand() == Some(block) {
            return;
        }

        let node = self.blocks[block];

        match node.prev.expand() {
            Some(prev) => self.blocks[prev].next = node.next,
            None => self.head = node.next,
        }

        match node.next.expand() {
            Some(next) => self.blocks[next].prev = node.prev,
            None => self.tail = node.prev,
        }

        let prev = self.tail.replace(block);

        if let Some(bb) = prev {
            self.blocks[bb].next.replace(block);
        }

        let node = &mut self.blocks[block];

        node.prev = prev.into();
        node.next = PackedOption::none();
    }

    /// Returns the number of blocks in the layout.
    pub fn len_blocks(&self) -> usize {
        self.block_len
    }

    /// Returns the number of instructions in the layout.
    pub fn len_insts(&self) -> usize {
        self.inst_len
    }

    /// Checks if a block is currently inside the layout.
    pub fn is_block_inserted(&self, block: Block) -> bool {
        self.blocks.contains(block)
    }

    /// Checks if an instruction is currently inside the layout.
    pub fn is_inst_inserted(&self, inst: Inst) -> bool {
        self.nodes.contains(inst)
    }

    /// Gets an iterator over the blocks of the layout, in program order.
    pub fn blocks(&self) -> BlockIter<'_> {
        BlockIter {
            next: self.head.expand(),
            layout: self,
        }
    }

    /// Gets an iterator over every instruction in a given block.
    pub fn insts_in_block(&self, block: Block) -> InstIter<'_> {
        InstIter {
            next: self.blocks[block].first.expand(),
            layout: self,
        }
    }

    /// Gets the entry block for the layout, if any blocks exist.
    pub fn entry_block(&self) -> Option<Block> {
        self.head.expand()
    }

    /// Gets the last block in the layout, if any blocks exist.
    pub fn last_block(&self) -> Option<Block> {
        self.tail.expand()
    }

    /// Gets the block that comes after `block`, if one exists.
    pub fn block_next(&self, block: Block) -> Option<Block> {
        self.blocks[block].next.expand()
    }

    /// Gets the block that comes before `block`, if one exists.
    pub fn block_prev(&self, block: Block) -> Option<Block> {
        self.blocks[block].prev.expand()
    }

    /// Gets the first instruction in `block`, if the block is non-empty.
    pub fn block_first_inst(&self, block: Block) -> Option<Inst> {
        self.blocks[block].first.expand()
    }

    /// Gets the last instruction in `block`, if the block is non-empty.
    /// For a complete function this is the block's terminator.
    pub fn block_last_inst(&self, block: Block) -> Option<Inst> {
        self.blocks[block].last.expand()
    }

    /// Gets the instruction that comes after `inst` in its block.
    pub fn inst_next(&self, inst: Inst) -> Option<Inst> {
        self.nodes[inst].next.expand()
    }

    /// Gets the instruction that comes before `inst` in its block.
    pub fn inst_prev(&self, inst: Inst) -> Option<Inst> {
        self.nodes[inst].prev.expand()
    }

    /// Gets the block that an instruction is in.
    pub fn inst_block(&self, inst: Inst) -> Block {
        self.inst_blocks[inst]
    }

    fn insert_node(
        &mut self,
        inst: Inst,
        block: Block,
        prev: PackedOption<Inst>,
        next: PackedOption<Inst>,
    ) {
        self.nodes.insert(inst, InstNode { prev, next });
        self.inst_blocks.insert(inst, block);
        self.inst_len += 1;
    }

    fn insert_block(&mut self, block: Block, prev: Option<Block>, next: Option<Block>) {
        self.block_len += 1;
        self.blocks.insert(
            block,
            BlockNode {
                prev: prev.into(),
                next: next.into(),
                first: PackedOption::none(),
                last: PackedOption::none(),
            },
        );
    }

    fn block_node_of_inst_mut(&mut self, inst: Inst) -> &mut BlockNode {
        &mut self.blocks[self.inst_blocks[inst]]
    }
}
