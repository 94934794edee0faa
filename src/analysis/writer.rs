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
use crate::ir::*;
use crate::pass::{ModuleAnalysisManager, ModuleAnalysisPass};
use std::fmt::Write;

/// Stringifies a type into its spelling in the textual IR.
pub fn stringify_ty(pool: &TypePool, ty: Type) -> String {
    match ty {
        Type::Void => "void".into(),
        Type::Bool => "bool".into(),
        Type::Char => "char".into(),
        Type::Short => "short".into(),
        Type::Int => "int".into(),
        Type::Long => "long".into(),
        Type::Enum => "enum".into(),
        Type::Ptr(_) => "ptr".into(),
        Type::Array(_) => format!(
            "[{}; {}]",
            stringify_ty(pool, ty.element(pool)),
            ty.array_len(pool)
        ),
        Type::Struct(_) => {
            let members: Vec<String> = ty
                .members(pool)
                .iter()
                .map(|member| stringify_ty(pool, *member))
                .collect();

            format!("{{ {} }}", members.join(", "))
        }
        Type::Union(_) => {
            let members: Vec<String> = ty
                .members(pool)
                .iter()
                .map(|member| stringify_ty(pool, *member))
                .collect();

            format!("union {{ {} }}", members.join(", "))
        }
        Type::Func(_) => {
            let params: Vec<String> = ty
                .fn_params(pool)
                .iter()
                .map(|param| stringify_ty(pool, *param))
                .collect();

            format!(
                "{} ({})",
                stringify_ty(pool, ty.fn_return(pool)),
                params.join(", ")
            )
        }
    }
}

/// The diagnostic module -> text writer.
///
/// The output is readable, not re-parsable: it exists for tests, debug
/// printing, and the writer passes. Value numbering is per-function and
/// assigned on first print.
#[derive(Debug, Clone)]
pub struct ModuleWriter {
    whole: String,
}

impl ModuleWriter {
    /// Stringifies a whole module.
    pub fn from(module: &Module) -> Self {
        let mut writer = WriterImpl {
            module,
            out: String::default(),
            names: SecondaryMap::default(),
            next: 0,
        };

        writer.walk();

        Self { whole: writer.out }
    }

    /// Returns the entire module as a string.
    pub fn module(&self) -> &str {
        &self.whole
    }
}

/// Stringifies an entire module, producing the diagnostic textual form.
pub fn stringify_module(module: &Module) -> String {
    ModuleWriter::from(module).whole
}

/// Prints an entire module to `stdout`.
///
/// Wrapper for when setting up a pass/analysis manager and running a
/// writer pass is too much ceremony.
pub fn print_module(module: &Module) {
    println!("{}", stringify_module(module));
}

/// This is an analysis that provides a [`ModuleWriter`] to any code that
/// wants it, so multiple consumers can share one stringification.
pub struct ModuleStringifyAnalysis;

impl ModuleAnalysisPass for ModuleStringifyAnalysis {
    type Result = ModuleWriter;

    fn run(&mut self, module: &Module, _: &ModuleAnalysisManager) -> Self::Result {
        ModuleWriter::from(module)
    }
}

struct WriterImpl<'m> {
    module: &'m Module,
    out: String,
    // per-function numbering state, reset in `function`
    names: SecondaryMap<Value, u32>,
    next: u32,
}

impl<'m> WriterImpl<'m> {
    fn walk(&mut self) {
        for gv in self.module.globals() {
            let global = self.module.global(gv);
            let pool = self.module.context().types();
            let ty = stringify_ty(&pool, global.ty());

            let _ = writeln!(self.out, "@{} = global {}", global.name(), ty);
        }

        if self.module.globals().next().is_some() {
            self.out.push('\n');
        }

        for func in self.module.functions() {
            self.function(func);
        }
    }

    fn function(&mut self, func: Func) {
        self.names = SecondaryMap::default();
        self.next = 0;

        let func = self.module.function(func);
        let prototype = {
            let pool = self.module.context().types();
            let ret = stringify_ty(&pool, func.ty().fn_return(&pool));
            let params: Vec<String> = func
                .ty()
                .fn_params(&pool)
                .iter()
                .map(|param| stringify_ty(&pool, *param))
                .collect();

            format!("fn {} @{}({})", ret, func.name(), params.join(", "))
        };

        let def = match func.definition() {
            Some(def) => def,
            None => {
                let _ = writeln!(self.out, "{prototype}\n");

                return;
            }
        };

        let _ = writeln!(self.out, "{prototype} {{");

        let mut first = true;

        for block in def.layout.blocks() {
            if !first {
                self.out.push('\n');
            }

            first = false;

            self.block(def, block);
        }

        self.out.push_str("}\n\n");
    }

    fn block(&mut self, def: &FunctionDefinition, block: Block) {
        let name = self.block_name(def, block);

        self.out.push_str(&name);

        if !def.dfg.block_params(block).is_empty() {
            let params: Vec<String> = def
                .dfg
                .block_params(block)
                .iter()
                .map(|&param| {
                    let pool = self.module.context().types();
                    let ty = stringify_ty(&pool, def.dfg.ty(param));

                    drop(pool);

                    format!("{} %{}", ty, self.number(param))
                })
                .collect();

            let _ = write!(self.out, "({})", params.join(", "));
        }

        self.out.push(':');

        // preds are derived from the branches targeting this block
        let preds = {
            let mut preds: Vec<String> = Vec::new();

            for &br in def.dfg.block_branch_users(block) {
                let pred = self.block_name(def, def.layout.inst_block(br));

                if !preds.contains(&pred) {
                    preds.push(pred);
                }
            }

            preds
        };

        if !preds.is_empty() {
            let _ = write!(self.out, "\t; preds = {}", preds.join(", "));
        }

        self.out.push('\n');

        for inst in def.layout.insts_in_block(block) {
            self.inst(def, inst);
        }
    }

    fn inst(&mut self, def: &FunctionDefinition, inst: Inst) {
        let data = def.dfg.data(inst);
        let opcode = data.opcode();

        self.out.push_str("  ");

        if let Some(result) = def.dfg.inst_to_result(inst) {
            let number = self.number(result);

            let _ = write!(self.out, "%{number} = ");
        }

        let line = match data {
            InstData::Alloca(alloca) => {
                format!("alloca {}", self.ty(alloca.alloc_ty()))
            }
            InstData::Load(load) => {
                let result = def.dfg.ty(def.dfg.inst_to_result(inst).unwrap());

                format!("load {} {}", self.ty(result), self.val(def, load.pointer()))
            }
            InstData::Store(store) => format!(
                "store {} {}, {}",
                self.ty(def.dfg.ty(store.stored())),
                self.val(def, store.stored()),
                self.val(def, store.pointer())
            ),
            InstData::Cast(cast) => {
                let result = def.dfg.ty(def.dfg.inst_to_result(inst).unwrap());

                format!("cast {} {}", self.ty(result), self.val(def, cast.operand()))
            }
            InstData::Call(call) => {
                let args: Vec<String> = call
                    .args()
                    .iter()
                    .map(|&arg| self.val(def, arg))
                    .collect();
                let ret = {
                    let pool = self.module.context().types();

                    stringify_ty(&pool, call.func_ty().fn_return(&pool))
                };
                let callee = self.module.function(call.callee()).name().to_owned();

                format!("call {} @{}({})", ret, callee, args.join(", "))
            }
            InstData::Neg(unary) | InstData::BitNot(unary) => format!(
                "{} {} {}",
                opcode.mnemonic(),
                self.ty(def.dfg.ty(unary.operand())),
                self.val(def, unary.operand())
            ),
            InstData::Add(bin)
            | InstData::Sub(bin)
            | InstData::Mul(bin)
            | InstData::Div(bin)
            | InstData::Mod(bin)
            | InstData::BitAnd(bin)
            | InstData::BitOr(bin)
            | InstData::BitXor(bin) => format!(
                "{} {} {}, {}",
                opcode.mnemonic(),
                self.ty(def.dfg.ty(bin.lhs())),
                self.val(def, bin.lhs()),
                self.val(def, bin.rhs())
            ),
            InstData::Eq(cmp) | InstData::Ne(cmp) | InstData::Lt(cmp) | InstData::Le(cmp) => {
                format!(
                    "{} {} {}, {}",
                    opcode.mnemonic(),
                    self.ty(def.dfg.ty(cmp.lhs())),
                    self.val(def, cmp.lhs()),
                    self.val(def, cmp.rhs())
                )
            }
            InstData::Ret(ret) => match ret.value() {
                Some(value) => format!(
                    "ret {} {}",
                    self.ty(def.dfg.ty(value)),
                    self.val(def, value)
                ),
                None => "ret void".into(),
            },
            InstData::Br(br) => {
                format!("br {}", self.target(def, br.target(), br.args()))
            }
            InstData::CondBr(condbr) => format!(
                "condbr {}, {}, {}",
                self.val(def, condbr.condition()),
                self.target(def, condbr.true_branch(), condbr.args_of(0)),
                self.target(def, condbr.false_branch(), condbr.args_of(1))
            ),
        };

        self.out.push_str(&line);
        self.out.push('\n');
    }

    fn target(&mut self, def: &FunctionDefinition, block: Block, args: &[Value]) -> String {
        let name = self.block_name(def, block);

        if args.is_empty() {
            name
        } else {
            let args: Vec<String> = args.iter().map(|&arg| self.val(def, arg)).collect();

            format!("{}({})", name, args.join(", "))
        }
    }

    fn val(&mut self, def: &FunctionDefinition, value: Value) -> String {
        match def.dfg.value_def(value) {
            ValueDef::Const => match *def.dfg.constant_data(value).unwrap() {
                ConstantData::Int { ty, value } => format!("{} {}", self.ty(ty), value),
                ConstantData::Bool(value) => format!("bool {value}"),
                ConstantData::Undef(ty) => format!("{} undef", self.ty(ty)),
            },
            ValueDef::Global(gv) => format!("ptr @{}", self.module.global(gv).name()),
            _ => format!("%{}", self.number(value)),
        }
    }

    fn ty(&self, ty: Type) -> String {
        let pool = self.module.context().types();

        stringify_ty(&pool, ty)
    }

    fn block_name(&self, def: &FunctionDefinition, block: Block) -> String {
        let strings = self.module.context().strings();

        strings[def.dfg.block(block).name()].to_owned()
    }

    fn number(&mut self, value: Value) -> u32 {
        if let Some(&existing) = self.names.get(value) {
            return existing;
        }

        let number = self.next;

        self.names.insert(value, number);
        self.next += 1;

        number
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prints_simple_function() {
        let mut module = Module::new("test");
        let sig = module.function_type(Type::int(), &[Type::int(), Type::int()], false);
        let mut b = module.define_function("sum", sig);

        let entry = b.create_block("entry");
        let params = b.append_entry_params(entry, DebugInfo::fake());

        b.switch_to(entry);
        let result = b.append().add(params[0], params[1], DebugInfo::fake());
        b.append().ret_val(result, DebugInfo::fake());

        b.define();

        let text = stringify_module(&module);

        assert!(text.contains("fn int @sum(int, int) {"));
        assert!(text.contains("entry(int %0, int %1):"));
        assert!(text.contains("%2 = add int %0, %1"));
        assert!(text.contains("ret int %2"));
    }

    #[test]
    fn prints_globals_and_constants() {
        let mut module = Module::new("test");
        let g = module.get_or_insert_global(Type::int(), "counter");
        let sig = module.function_type(Type::void(), &[], false);
        let mut b = module.define_function("bump", sig);

        let entry = b.create_block("entry");
        let addr = b.import_global(g);
        let one = b.iconst(Type::int(), 1);

        b.switch_to(entry);
        let old = b.append().load(addr, DebugInfo::fake());
        let new = b.append().add(old, one, DebugInfo::fake());
        b.append().store(new, addr, DebugInfo::fake());
        b.append().ret_void(DebugInfo::fake());

        b.define();

        let text = stringify_module(&module);

        assert!(text.contains("@counter = global int"));
        assert!(text.contains("load int ptr @counter"));
        assert!(text.contains("add int %0, int 1"));
        assert!(text.contains("ret void"));
    }
}
