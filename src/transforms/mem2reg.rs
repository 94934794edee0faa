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
    ControlFlowGraph, ControlFlowGraphAnalysis, DominatorTreeAnalysis, PostDominatorTreeAnalysis,
};
use crate::arena::SecondaryMap;
use crate::ir::*;
use crate::pass::{FunctionAnalysisManager, FunctionTransformPass, PreservedAnalyses};
use crate::utility::{SaHashMap, SaHashSet};
use smallvec::SmallVec;

/// Promotes `alloca`s that only have `load`s and `store`s as users into
/// SSA values, inserting block parameters at the joins where several
/// definitions meet.
///
/// Parameters are created lazily: a load walks backwards through its
/// block's (unique) predecessors until it finds a definition, and only
/// mints a parameter when the search hits a join. Parameters that turn out
/// to receive the same value along every edge (or that only feed
/// themselves through a back edge) are dissolved again before any branch
/// arguments are materialized.
///
/// # Limitations
/// - Only `alloca`s in the entry block are considered.
/// - An `alloca` whose address escapes in **any way** is not promoted: its
///   users must all be `load`s, or `store`s that store *through* it. Even
///   storing the address into other promotable memory disqualifies it.
pub struct Mem2RegPass;

impl FunctionTransformPass for Mem2RegPass {
    fn run(&mut self, func: &mut Function, am: &mut FunctionAnalysisManager) -> PreservedAnalyses {
        let cfg = am.get::<ControlFlowGraphAnalysis>(func);

        mem2reg(func, &cfg);

        // no edges change, so everything CFG-shaped survives
        let mut preserved = PreservedAnalyses::none();

        preserved.preserve::<ControlFlowGraphAnalysis>();
        preserved.preserve::<DominatorTreeAnalysis>();
        preserved.preserve::<PostDominatorTreeAnalysis>();

        preserved
    }
}

/// Promotes function-local memory that doesn't escape into SSA values.
///
/// This is effectively an SSA construction pass; since the IR is always
/// formally in SSA form, it is also the pass that makes the rest of the
/// optimizer able to see through local variables.
pub fn mem2reg(func: &mut Function, cfg: &ControlFlowGraph) {
    let mut cursor = FuncCursor::over(func);
    let alloca_ty = find_promotable_allocas(&mut cursor);

    if alloca_ty.is_empty() {
        return;
    }

    // snapshot the predecessor lists once: argument filling walks them a
    // second time and has to see them in the same order as the first walk
    let mut preds = SecondaryMap::default();
    let blocks: Vec<Block> = cursor.layout().blocks().collect();

    for &bb in blocks.iter() {
        preds.insert(bb, cfg.predecessors(bb).collect());
    }

    let mut state = Promotion {
        alloca_ty,
        preds,
        m2r: SecondaryMap::default(),
        r2r: SaHashMap::default(),
        param_to_var: SaHashMap::default(),
        param_to_args: SaHashMap::default(),
        erased: Vec::new(),
        visited: SaHashSet::default(),
        pending: Vec::new(),
    };

    state.scan(&mut cursor);
    state.wire(&mut cursor);
    state.erase_trivial(&mut cursor);
    state.fill_args(&mut cursor);
    state.rewrite(&mut cursor);
}

fn can_promote(dfg: &DataFlowGraph, alloca: Value) -> bool {
    dfg.users(alloca).iter().all(|&user| match dfg.data(user) {
        InstData::Load(_) => true,
        // a store *through* the slot is fine, a store *of* the slot means
        // the address escaped
        InstData::Store(store) => store.stored() != alloca,
        _ => false,
    })
}

// finds the promotable allocas in the entry block, mapping each one to the
// type of the value it holds
fn find_promotable_allocas(cursor: &mut FuncCursor<'_>) -> SaHashMap<Value, Type> {
    let mut allocas = SaHashMap::default();
    let entry = match cursor.entry_block() {
        Some(entry) => entry,
        None => return allocas,
    };

    cursor.goto_before(entry);

    while let Some(inst) = cursor.next_inst() {
        let alloc_ty = match cursor.inst_data(inst) {
            InstData::Alloca(alloca) => alloca.alloc_ty(),
            _ => continue,
        };

        let result = cursor.inst_to_result(inst).unwrap();

        if can_promote(cursor.dfg(), result) {
            allocas.insert(result, alloc_ty);
        }
    }

    allocas
}

// the pass-local state of a single promotion run. `m2r` is the per-block
// "current SSA value of each slot" cache, `r2r` is the transitive rewrite
// map that loads and dissolved parameters are resolved through.
struct Promotion {
    alloca_ty: SaHashMap<Value, Type>,
    preds: SecondaryMap<Block, SmallVec<[Block; 4]>>,
    m2r: SecondaryMap<Block, SaHashMap<Value, Value>>,
    r2r: SaHashMap<Value, Value>,
    param_to_var: SaHashMap<Value, Value>,
    param_to_args: SaHashMap<Value, SmallVec<[Value; 4]>>,
    erased: Vec<(Block, Value)>,
    visited: SaHashSet<Value>,
    pending: Vec<Value>,
}

impl Promotion {
    // one forward walk over the function: stores define the slot's current
    // value, loads get resolved (lazily) and recorded in `r2r`
    fn scan(&mut self, cursor: &mut FuncCursor<'_>) {
        let blocks: Vec<Block> = cursor.layout().blocks().collect();

        for bb in blocks {
            cursor.goto_before(bb);

            while let Some(inst) = cursor.next_inst() {
                let (is_store, ptr, stored) = match cursor.inst_data(inst) {
                    InstData::Store(store) => (true, store.pointer(), Some(store.stored())),
                    InstData::Load(load) => (false, load.pointer(), None),
                    _ => continue,
                };

                if !self.alloca_ty.contains_key(&ptr) {
                    continue;
                }

                if is_store {
                    let value = stored.unwrap();

                    self.m2r_mut(bb).insert(ptr, value);
                } else {
                    let result = cursor.inst_to_result(inst).unwrap();
                    let value = self.find_trivial(cursor, ptr, bb);

                    self.r2r.insert(result, value);
                }
            }
        }
    }

    // resolves the value of `var` on entry to `block` without wiring any
    // predecessor arguments yet; that happens in `wire`
    fn find_trivial(&mut self, cursor: &mut FuncCursor<'_>, var: Value, block: Block) -> Value {
        if let Some(&cached) = self.m2r.get(block).and_then(|map| map.get(&var)) {
            return cached;
        }

        let preds = self.preds[block].clone();

        // a load with no reaching definition at all reads uninitialized
        // memory, that's what `undef` is for
        if preds.is_empty() {
            let undef = cursor.dfg_mut().undef(self.alloca_ty[&var]);

            self.m2r_mut(block).insert(var, undef);

            return undef;
        }

        if preds.len() == 1 {
            let value = self.find_trivial(cursor, var, preds[0]);

            self.m2r_mut(block).insert(var, value);

            return value;
        }

        self.mint_param(cursor, var, block)
    }

    // like `find_trivial` but used during wiring: parameters met along the
    // way are themselves wired eagerly, and the rewrite map is chased so
    // dissolved parameters never leak out
    fn find_val(&mut self, cursor: &mut FuncCursor<'_>, var: Value, block: Block) -> Value {
        if let Some(&cached) = self.m2r.get(block).and_then(|map| map.get(&var)) {
            let chased = self.chase(cached);

            if cursor.dfg().is_block_param(chased) && self.param_to_var.contains_key(&chased) {
                self.set_arg(cursor, chased);
            }

            return self.chase(cached);
        }

        let preds = self.preds[block].clone();

        if preds.is_empty() {
            let undef = cursor.dfg_mut().undef(self.alloca_ty[&var]);

            self.m2r_mut(block).insert(var, undef);

            return undef;
        }

        if preds.len() == 1 {
            let value = self.find_val(cursor, var, preds[0]);

            self.m2r_mut(block).insert(var, value);

            return value;
        }

        let param = self.mint_param(cursor, var, block);

        debug_assert!(!self.r2r.contains_key(&param));

        self.set_arg(cursor, param)
    }

    fn mint_param(&mut self, cursor: &mut FuncCursor<'_>, var: Value, block: Block) -> Value {
        let ty = self.alloca_ty[&var];
        let dbg = cursor.dfg().debug(var).strip_name();
        let param = cursor.dfg_mut().append_block_param(block, ty, dbg);

        self.m2r_mut(block).insert(var, param);
        self.param_to_var.insert(param, var);
        self.pending.push(param);

        param
    }

    // wires every parameter this pass minted
    fn wire(&mut self, cursor: &mut FuncCursor<'_>) {
        while let Some(param) = self.pending.pop() {
            self.set_arg(cursor, param);
        }
    }

    // computes the per-predecessor values of a minted parameter and
    // classifies it: dissolved into a single value, dissolved through a
    // back-edge self reference, or kept (with its argument list recorded
    // for `fill_args`)
    fn set_arg(&mut self, cursor: &mut FuncCursor<'_>, param: Value) -> Value {
        if self.visited.contains(&param) {
            return param;
        }

        self.visited.insert(param);

        let block = match cursor.value_def(param) {
            ValueDef::Param(block, _) => block,
            _ => unreachable!("wired a value that isn't a block parameter"),
        };
        let var = self.param_to_var[&param];
        let preds = self.preds[block].clone();

        let mut record: SmallVec<[Value; 4]> = SmallVec::new();
        let mut distinct: SmallVec<[Value; 4]> = SmallVec::new();

        for &pred in preds.iter() {
            let value = self.find_val(cursor, var, pred);

            record.push(value);

            if !distinct.contains(&value) {
                distinct.push(value);
            }
        }

        let substitute = if distinct.len() == 1 {
            Some(distinct[0])
        } else if distinct.len() == 2 && distinct.contains(&param) {
            // every edge either feeds the parameter back into itself or
            // supplies one other value, so the parameter *is* that value
            Some(if distinct[0] == param {
                distinct[1]
            } else {
                distinct[0]
            })
        } else {
            None
        };

        match substitute {
            Some(value) => {
                debug_assert_ne!(value, param);

                self.r2r.insert(param, value);
                self.m2r_mut(block).insert(var, value);
                self.erased.push((block, param));

                value
            }
            None => {
                self.param_to_args.insert(param, record);

                param
            }
        }
    }

    // dissolved parameters never received branch arguments, so they can
    // simply be unhooked from their blocks
    fn erase_trivial(&mut self, cursor: &mut FuncCursor<'_>) {
        for (block, param) in std::mem::take(&mut self.erased) {
            cursor.dfg_mut().remove_block_param(block, param);
        }
    }

    // appends the recorded per-predecessor values to each incoming branch,
    // on every side of the branch that targets the parameter's block
    fn fill_args(&mut self, cursor: &mut FuncCursor<'_>) {
        let blocks: Vec<Block> = cursor.layout().blocks().collect();

        for bb in blocks {
            let params: SmallVec<[Value; 4]> = cursor.block_params(bb).iter().copied().collect();

            for param in params {
                let args = match self.param_to_args.get(&param) {
                    Some(args) => args.clone(),
                    None => continue,
                };
                let preds = self.preds[bb].clone();

                debug_assert_eq!(args.len(), preds.len());

                for (i, &pred) in preds.iter().enumerate() {
                    let branch = cursor
                        .layout()
                        .block_last_inst(pred)
                        .expect("predecessor has no terminator");

                    cursor.dfg_mut().append_branch_arg(branch, bb, args[i]);
                }
            }
        }
    }

    // replaces every load of a promoted slot with its resolved value, then
    // deletes the loads, the stores, and finally the allocas themselves
    fn rewrite(&mut self, cursor: &mut FuncCursor<'_>) {
        // hash-map iteration order isn't deterministic, and we promised
        // deterministic output
        let mut allocas: SmallVec<[Value; 16]> = self.alloca_ty.keys().copied().collect();

        allocas.sort();

        for alloca in allocas {
            let users: SmallVec<[Inst; 8]> = cursor.dfg().users(alloca).iter().copied().collect();

            for user in users {
                let is_load = matches!(cursor.inst_data(user), InstData::Load(_));

                if is_load {
                    let result = cursor.inst_to_result(user).unwrap();
                    let replacement = self.chase(result);

                    cursor.replace_uses_with(result, replacement);
                }

                cursor.goto_inst(user);
                cursor.remove_inst();
            }

            let inst = cursor.value_to_inst(alloca).unwrap();

            cursor.goto_inst(inst);
            cursor.remove_inst();
        }
    }

    // transitive lookup through the rewrite map, with path compression
    fn chase(&mut self, val: Value) -> Value {
        let mut cur = val;

        while let Some(&next) = self.r2r.get(&cur) {
            cur = next;
        }

        if cur != val {
            self.r2r.insert(val, cur);
        }

        cur
    }

    fn m2r_mut(&mut self, block: Block) -> &mut SaHashMap<Value, Value> {
        if !self.m2r.contains(block) {
            self.m2r.insert(block, SaHashMap::default());
        }

        &mut self.m2r[block]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(module: &mut Module, f: Func) {
        let func = module.function_mut(f);
        let cfg = ControlFlowGraph::compute(func);

        mem2reg(func, &cfg);
    }

    fn count_opcode(func: &Function, opcode: Opcode) -> usize {
        let def = func.definition().unwrap();

        def.layout
            .blocks()
            .flat_map(|bb| def.layout.insts_in_block(bb))
            .filter(|&inst| def.dfg.data(inst).opcode() == opcode)
            .count()
    }

    #[test]
    fn straight_line_promotion() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[], false);
        let mut b = module.define_function("main", sig);

        // int main() { int a = 3; int b = 4; return a + b; }
        let entry = b.create_block("entry");
        let three = b.iconst(Type::int(), 3);
        let four = b.iconst(Type::int(), 4);

        b.switch_to(entry);
        let a = b.append().alloca(Type::int(), DebugInfo::fake());
        let bb = b.append().alloca(Type::int(), DebugInfo::fake());
        b.append().store(three, a, DebugInfo::fake());
        b.append().store(four, bb, DebugInfo::fake());
        let x = b.append().load(a, DebugInfo::fake());
        let y = b.append().load(bb, DebugInfo::fake());
        let sum = b.append().add(x, y, DebugInfo::fake());
        b.append().ret_val(sum, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert_eq!(count_opcode(func, Opcode::Alloca), 0);
        assert_eq!(count_opcode(func, Opcode::Load), 0);
        assert_eq!(count_opcode(func, Opcode::Store), 0);

        // the add now consumes the constants directly
        let add = def
            .layout
            .insts_in_block(entry)
            .find(|&inst| def.dfg.data(inst).opcode() == Opcode::Add)
            .unwrap();

        match def.dfg.data(add) {
            InstData::Add(add) => {
                assert_eq!(def.dfg.value_as_int(add.lhs()), Some(3));
                assert_eq!(def.dfg.value_as_int(add.rhs()), Some(4));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn diamond_join_gets_one_param() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::bool()], false);
        let mut b = module.define_function("f", sig);

        // int f(bool x) { int y; if (x) y = 1; else y = 2; return y; }
        let entry = b.create_block("entry");
        let x = b.append_entry_params(entry, DebugInfo::fake())[0];
        let then = b.create_block("if.then");
        let otherwise = b.create_block("if.else");
        let join = b.create_block("if.end");
        let one = b.iconst(Type::int(), 1);
        let two = b.iconst(Type::int(), 2);

        b.switch_to(entry);
        let y = b.append().alloca(Type::int(), DebugInfo::fake());
        b.append().condbr(
            x,
            BlockWithParams::to(then),
            BlockWithParams::to(otherwise),
            DebugInfo::fake(),
        );

        b.switch_to(then);
        b.append().store(one, y, DebugInfo::fake());
        b.append().br(BlockWithParams::to(join), DebugInfo::fake());

        b.switch_to(otherwise);
        b.append().store(two, y, DebugInfo::fake());
        b.append().br(BlockWithParams::to(join), DebugInfo::fake());

        b.switch_to(join);
        let v = b.append().load(y, DebugInfo::fake());
        b.append().ret_val(v, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert_eq!(count_opcode(func, Opcode::Alloca), 0);
        assert_eq!(def.dfg.block_params(join).len(), 1);
        assert_eq!(def.dfg.ty(def.dfg.block_params(join)[0]), Type::int());

        // both incoming branches pass their stored constant
        let then_br = def.layout.block_last_inst(then).unwrap();
        let else_br = def.layout.block_last_inst(otherwise).unwrap();

        assert_eq!(def.dfg.branch_side_args(then_br, 0), &[one]);
        assert_eq!(def.dfg.branch_side_args(else_br, 0), &[two]);

        // the return consumes the parameter
        let ret = def.layout.block_last_inst(join).unwrap();

        match def.dfg.data(ret) {
            InstData::Ret(ret) => {
                assert_eq!(ret.value(), Some(def.dfg.block_params(join)[0]));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn loop_header_gets_two_params() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::int()], false);
        let mut b = module.define_function("g", sig);

        // int g(int n) { int s = 0; int i = 0; while (i < n) { s = s + i;
        // i = i + 1; } return s; }
        let entry = b.create_block("entry");
        let n = b.append_entry_params(entry, DebugInfo::fake())[0];
        let header = b.create_block("loop.head");
        let body = b.create_block("loop.body");
        let exit = b.create_block("loop.exit");
        let zero = b.iconst(Type::int(), 0);
        let one = b.iconst(Type::int(), 1);

        b.switch_to(entry);
        let sa = b.append().alloca(Type::int(), DebugInfo::fake());
        let ia = b.append().alloca(Type::int(), DebugInfo::fake());
        b.append().store(zero, sa, DebugInfo::fake());
        b.append().store(zero, ia, DebugInfo::fake());
        b.append().br(BlockWithParams::to(header), DebugInfo::fake());

        b.switch_to(header);
        let i = b.append().load(ia, DebugInfo::fake());
        let cond = b.append().cmp_lt(i, n, DebugInfo::fake());
        b.append().condbr(
            cond,
            BlockWithParams::to(body),
            BlockWithParams::to(exit),
            DebugInfo::fake(),
        );

        b.switch_to(body);
        let s = b.append().load(sa, DebugInfo::fake());
        let i2 = b.append().load(ia, DebugInfo::fake());
        let ns = b.append().add(s, i2, DebugInfo::fake());
        b.append().store(ns, sa, DebugInfo::fake());
        let ni = b.append().add(i2, one, DebugInfo::fake());
        b.append().store(ni, ia, DebugInfo::fake());
        b.append().br(BlockWithParams::to(header), DebugInfo::fake());

        b.switch_to(exit);
        let r = b.append().load(sa, DebugInfo::fake());
        b.append().ret_val(r, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert_eq!(count_opcode(func, Opcode::Alloca), 0);
        assert_eq!(count_opcode(func, Opcode::Load), 0);
        assert_eq!(count_opcode(func, Opcode::Store), 0);

        // `s` and `i` both flow around the loop
        assert_eq!(def.dfg.block_params(header).len(), 2);

        // every branch into the header carries both values
        let entry_br = def.layout.block_last_inst(entry).unwrap();
        let latch_br = def.layout.block_last_inst(body).unwrap();

        assert_eq!(def.dfg.branch_side_args(entry_br, 0), &[zero, zero]);
        assert_eq!(def.dfg.branch_side_args(latch_br, 0).len(), 2);
    }

    #[test]
    fn same_value_join_is_dissolved() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::bool()], false);
        let mut b = module.define_function("h", sig);

        // both sides store 5, so the join parameter is trivial and
        // must not survive
        let entry = b.create_block("entry");
        let x = b.append_entry_params(entry, DebugInfo::fake())[0];
        let then = b.create_block("then");
        let otherwise = b.create_block("else");
        let join = b.create_block("join");
        let five = b.iconst(Type::int(), 5);

        b.switch_to(entry);
        let y = b.append().alloca(Type::int(), DebugInfo::fake());
        b.append().condbr(
            x,
            BlockWithParams::to(then),
            BlockWithParams::to(otherwise),
            DebugInfo::fake(),
        );

        b.switch_to(then);
        b.append().store(five, y, DebugInfo::fake());
        b.append().br(BlockWithParams::to(join), DebugInfo::fake());

        b.switch_to(otherwise);
        b.append().store(five, y, DebugInfo::fake());
        b.append().br(BlockWithParams::to(join), DebugInfo::fake());

        b.switch_to(join);
        let v = b.append().load(y, DebugInfo::fake());
        b.append().ret_val(v, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();

        assert_eq!(def.dfg.block_params(join).len(), 0);

        let ret = def.layout.block_last_inst(join).unwrap();

        match def.dfg.data(ret) {
            InstData::Ret(ret) => assert_eq!(ret.value(), Some(five)),
            _ => unreachable!(),
        }
    }

    #[test]
    fn escaped_alloca_is_not_promoted() {
        let mut module = Module::new("test");
        let ptr_int = module.ptr_type(Type::int());
        let sig = module.function_type(Type::void(), &[], false);
        let mut b = module.define_function("escape", sig);

        let entry = b.create_block("entry");

        b.switch_to(entry);
        let a = b.append().alloca(Type::int(), DebugInfo::fake());
        let holder = b.append().alloca(ptr_int, DebugInfo::fake());
        // the *address* of `a` is stored, so `a` escapes
        b.append().store(a, holder, DebugInfo::fake());
        b.append().ret_void(DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);

        // `holder` was promotable (its only user is a store through it),
        // `a` was not
        assert_eq!(count_opcode(func, Opcode::Alloca), 1);
        assert_eq!(count_opcode(func, Opcode::Store), 0);
    }

    #[test]
    fn uninitialized_load_becomes_undef() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[], false);
        let mut b = module.define_function("uninit", sig);

        let entry = b.create_block("entry");

        b.switch_to(entry);
        let a = b.append().alloca(Type::int(), DebugInfo::fake());
        let v = b.append().load(a, DebugInfo::fake());
        b.append().ret_val(v, DebugInfo::fake());

        let f = b.define();
        run(&mut module, f);

        let func = module.function(f);
        let def = func.definition().unwrap();
        let ret = def.layout.block_last_inst(entry).unwrap();

        match def.dfg.data(ret) {
            InstData::Ret(ret) => {
                let value = ret.value().unwrap();

                assert!(matches!(
                    def.dfg.constant_data(value),
                    Some(ConstantData::Undef(ty)) if *ty == Type::int()
                ));
            }
            _ => unreachable!(),
        }
    }

    #[test]
    fn second_run_changes_nothing() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::bool()], false);
        let mut b = module.define_function("f", sig);

        let entry = b.create_block("entry");
        let x = b.append_entry_params(entry, DebugInfo::fake())[0];
        let then = b.create_block("then");
        let otherwise = b.create_block("else");
        let join = b.create_block("join");
        let one = b.iconst(Type::int(), 1);
        let two = b.iconst(Type::int(), 2);

        b.switch_to(entry);
        let y = b.append().alloca(Type::int(), DebugInfo::fake());
        b.append().condbr(
            x,
            BlockWithParams::to(then),
            BlockWithParams::to(otherwise),
            DebugInfo::fake(),
        );

        b.switch_to(then);
        b.append().store(one, y, DebugInfo::fake());
        b.append().br(BlockWithParams::to(join), DebugInfo::fake());

        b.switch_to(otherwise);
        b.append().store(two, y, DebugInfo::fake());
        b.append().br(BlockWithParams::to(join), DebugInfo::fake());

        b.switch_to(join);
        let v = b.append().load(y, DebugInfo::fake());
        b.append().ret_val(v, DebugInfo::fake());

        let f = b.define();

        run(&mut module, f);
        let after_first = crate::analysis::stringify_module(&module);

        run(&mut module, f);
        let after_second = crate::analysis::stringify_module(&module);

        assert_eq!(after_first, after_second);
    }
}
