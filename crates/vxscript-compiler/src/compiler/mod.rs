//! Per-function bytecode compiler.
//!
//! A [`Compiler`] compiles exactly one script function, or one global
//! variable initializer, against the module's symbol tables. Expressions are
//! compiled bottom-up into [`ExprContext`]s that carry their bytecode and a
//! [`TypeInfo`] describing where the value lives: in a frame slot, as a
//! compile-time constant, as an address in the register, or as a pointer on
//! the value stack.
//!
//! ## Architecture
//!
//! - `conversion`: implicit conversions, constant folding of conversions and
//!   the helpers that move values into frame slots
//! - `assign`: assignment, lvalue checks and temporary objects
//! - `call`: argument preparation, overload matching and call emission
//! - `expr`: expressions, operators, values and function calls
//! - `stmt`: blocks, declarations, control flow and `switch`
//!
//! Errors are recorded as messages and short-circuit the expression or
//! statement being compiled with [`Reported`]; the statement loop resumes at
//! the next statement so a function yields as many diagnostics as possible.

mod assign;
mod call;
mod context;
mod conversion;
mod expr;
mod scope;
mod stmt;
mod type_info;
mod variables;

use vxscript_core::{
    Behaviours, BuildConfig, DataType, DiagnosticKind, FunctionDescriptor, FunctionId, ObjectType, Span, TypeFlags,
    TypeHash,
};
use vxscript_parser::{Cst, NodeId, NodeKind, SourceUnit};

use crate::builder::symbols::ModuleSymbols;
use crate::bytecode::{ByteCode, OpCode};
use crate::module::{CompiledFunction, NO_CONSTRUCTOR, ObjectVariable};

pub(crate) use context::{DeferredParam, ExprContext};
pub(crate) use type_info::TypeInfo;

use scope::ScopeStack;
use variables::{DUMMY_OFFSET, VariableAllocator};

/// A diagnostic raised while compiling, positioned by source line of the
/// unit being compiled.
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub kind: DiagnosticKind,
    pub span: Span,
    pub text: String,
}

/// An error that has already been recorded in the message list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Reported;

pub(crate) type CResult<T = ()> = Result<T, Reported>;

/// Result of compiling one script function.
#[derive(Debug)]
pub struct FunctionOutcome {
    /// `None` when the function had errors.
    pub function: Option<CompiledFunction>,
    pub messages: Vec<Message>,
    /// `(allocated, released)` temporaries.
    pub temporaries: (usize, usize),
}

/// Result of compiling one global variable initializer.
#[derive(Debug)]
pub struct GlobalOutcome {
    /// Initializer fragment for the module init function. `None` on error.
    pub code: Option<ByteCode>,
    pub variable_space: u32,
    pub object_variables: Vec<ObjectVariable>,
    /// Folded value when a read-only primitive is initialized by a constant.
    pub constant: Option<u64>,
    pub messages: Vec<Message>,
}

/// Storage being initialized by a declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum InitTarget {
    Local(i16),
    Global(u32),
}

impl InitTarget {
    /// Push the address of the storage.
    pub(crate) fn push_address(self, bc: &mut ByteCode) {
        match self {
            InitTarget::Local(offset) => bc.instr_w(OpCode::PSF, offset),
            InitTarget::Global(index) => bc.instr_dword(OpCode::PGA, index),
        }
    }
}

/// Compiles one function or global initializer.
pub struct Compiler<'a, 'r> {
    /// Module symbol tables; string constants and array instances are
    /// added while compiling.
    symbols: &'a mut ModuleSymbols<'r>,
    config: &'a BuildConfig,
    /// The unit that declares the code being compiled.
    unit: &'a SourceUnit,
    /// Syntax tree of `unit`.
    cst: &'a Cst,
    messages: Vec<Message>,
    has_errors: bool,
    /// Frame slots of locals and temporaries.
    vars: VariableAllocator,
    scopes: ScopeStack,
    next_label: u32,
    /// Targets of `break`, innermost last.
    break_labels: Vec<u32>,
    /// Targets of `continue`, innermost last.
    continue_labels: Vec<u32>,
    /// Compiling a global initializer: assignments, calls and `++`/`--`
    /// are not allowed.
    is_global_expression: bool,
    is_processing_deferred: bool,
    return_type: DataType,
}

impl<'a, 'r> Compiler<'a, 'r> {
    pub fn new(
        symbols: &'a mut ModuleSymbols<'r>,
        config: &'a BuildConfig,
        unit: &'a SourceUnit,
        cst: &'a Cst,
    ) -> Self {
        Self {
            symbols,
            config,
            unit,
            cst,
            messages: Vec::new(),
            has_errors: false,
            vars: VariableAllocator::new(),
            scopes: ScopeStack::new(),
            next_label: 0,
            break_labels: Vec::new(),
            continue_labels: Vec::new(),
            is_global_expression: false,
            is_processing_deferred: false,
            return_type: DataType::void(),
        }
    }

    // ==========================================================================
    // Entry points
    // ==========================================================================

    /// Compile script function `index` of the symbol table.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_function(mut self, index: usize) -> FunctionOutcome {
        let Some(func) = self.symbols.functions.get(index).cloned() else {
            return FunctionOutcome {
                function: None,
                messages: Vec::new(),
                temporaries: (0, 0),
            };
        };
        let desc = func.descriptor;
        self.return_type = desc.return_type;

        // Label 0 is the function exit.
        self.next_label = 1;
        self.scopes.push(false, false);

        self.declare_parameters(&desc, &func.param_names, func.node);

        let mut body = ByteCode::new();
        match self.cst.last_child(func.node).filter(|&n| self.cst.kind(n) == NodeKind::StatementBlock) {
            Some(block) => {
                self.line_instr(&mut body, block);
                let has_return = self.compile_statement_block(block, false, &mut body);
                self.line_instr_at_end(&mut body, block);
                if !self.return_type.is_void() && !has_return {
                    self.error(block, "Not all paths return a value");
                }
            }
            None => {
                self.error(func.node, "Function has no body");
            }
        }

        let var_size = self.vars.variable_space();
        let mut code = ByteCode::new();
        if var_size > 0 {
            code.push(var_size);
        }
        code.add_code(body);

        if let Some(scope) = self.scopes.pop() {
            for v in scope.variables.iter().rev().filter(|v| v.offset > 0) {
                self.compile_destructor(v.data_type, v.offset, &mut code);
                self.vars.deallocate(v.offset);
            }
        }

        code.label(0);

        let mut offset = 0i16;
        for param in &desc.params {
            if !param.is_reference {
                self.compile_destructor(*param, offset, &mut code);
            }
            offset -= param.size_on_stack_dwords() as i16;
        }

        if var_size > 0 {
            code.pop(var_size);
        }
        code.ret(desc.space_needed_for_arguments());

        let temporaries = self.vars.temporary_counts();
        if self.has_errors {
            return FunctionOutcome {
                function: None,
                messages: self.messages,
                temporaries,
            };
        }
        debug_assert_eq!(self.vars.live_temporaries(), 0, "temporaries left in {}", desc.name);

        let final_code = match code.finalize() {
            Ok(fc) => fc,
            Err(e) => {
                self.error(func.node, format!("Internal compiler error: {e}"));
                return FunctionOutcome {
                    function: None,
                    messages: self.messages,
                    temporaries,
                };
            }
        };

        let declaration = desc.declaration(|dt| self.symbols.type_name(dt));
        let function = CompiledFunction {
            name: desc.name.clone(),
            id: desc.id,
            declaration,
            instructions: final_code.instructions,
            code: final_code.code,
            stack_size: final_code.stack_size,
            variable_space: var_size,
            object_variables: self.object_variables(),
            line_table: final_code.line_table,
        };

        FunctionOutcome {
            function: Some(function),
            messages: self.messages,
            temporaries,
        }
    }

    /// Compile the initializer of global variable `index`.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn compile_global_variable(mut self, index: usize) -> GlobalOutcome {
        self.is_global_expression = true;
        self.scopes.push(false, false);

        let mut ctx = ExprContext::new();
        let mut constant = None;
        if let Some(gvar) = self.symbols.globals.get(index).cloned() {
            let target = InitTarget::Global(gvar.index);
            // Errors are already in the message list.
            let _ = self.compile_initializer(target, gvar.data_type, gvar.init, gvar.name_node, &mut ctx, &mut constant);
        }

        let variable_space = self.vars.variable_space();
        let mut code = ByteCode::new();
        if variable_space > 0 {
            code.push(variable_space);
        }
        code.add_code(ctx.take_code());
        self.scopes.pop();
        if variable_space > 0 {
            code.pop(variable_space);
        }

        if self.has_errors {
            return GlobalOutcome {
                code: None,
                variable_space,
                object_variables: Vec::new(),
                constant: None,
                messages: self.messages,
            };
        }
        debug_assert_eq!(self.vars.live_temporaries(), 0);

        GlobalOutcome {
            code: Some(code),
            variable_space,
            object_variables: self.object_variables(),
            constant,
            messages: self.messages,
        }
    }

    /// Declare the parameters of `desc`. The first parameter sits at offset
    /// 0 and the following ones below it.
    fn declare_parameters(&mut self, desc: &FunctionDescriptor, names: &[Option<String>], func_node: NodeId) {
        let nodes = self.parameter_nodes(func_node);
        let mut declared: Vec<(String, DataType, i16)> = Vec::new();
        let mut offset = 0i16;

        for (i, dt) in desc.params.iter().enumerate() {
            let (type_node, name_node) = nodes.get(i).copied().unwrap_or((func_node, None));
            if dt.size_on_stack_dwords() == 0 {
                let name = self.type_name(dt);
                self.error(type_node, format!("Parameter type can't be '{name}'"));
            }
            if let Some(Some(name)) = names.get(i) {
                if declared.iter().any(|(n, _, _)| n == name) {
                    self.error(name_node.unwrap_or(type_node), "Parameter already declared");
                } else {
                    declared.push((name.clone(), *dt, offset));
                }
            }
            offset -= dt.size_on_stack_dwords() as i16;
        }

        // Declared last to first so they unwind in declaration order.
        for (name, dt, offset) in declared.into_iter().rev() {
            if self.scopes.declare(&name, dt, offset).is_ok()
                && let Some(v) = self.scopes.lookup_mut(&name)
            {
                v.is_initialized = true;
            }
        }
    }

    /// `(DataType node, name node)` of each parameter of a `Function` node.
    fn parameter_nodes(&self, func_node: NodeId) -> Vec<(NodeId, Option<NodeId>)> {
        let Some(list) = self.cst.children(func_node).find(|&n| self.cst.kind(n) == NodeKind::ParameterList) else {
            return Vec::new();
        };
        let mut params = Vec::new();
        let mut children = self.cst.children(list).peekable();
        while let Some(node) = children.next() {
            if self.cst.kind(node) != NodeKind::DataType {
                continue;
            }
            // TypeMod
            children.next();
            let name = children.next_if(|&n| self.cst.kind(n) == NodeKind::Identifier);
            params.push((node, name));
        }
        params
    }

    fn object_variables(&self) -> Vec<ObjectVariable> {
        self.vars
            .slots()
            .filter(|(_, dt)| dt.is_object() && !dt.is_reference)
            .filter_map(|(offset, dt)| dt.object_hash().map(|type_hash| ObjectVariable { type_hash, offset }))
            .collect()
    }

    // ==========================================================================
    // Messages
    // ==========================================================================

    pub(crate) fn error(&mut self, node: NodeId, text: impl Into<String>) -> Reported {
        self.has_errors = true;
        self.messages.push(Message {
            kind: DiagnosticKind::Error,
            span: self.cst.span(node),
            text: text.into(),
        });
        Reported
    }

    pub(crate) fn warning(&mut self, node: NodeId, text: impl Into<String>) {
        self.messages.push(Message {
            kind: DiagnosticKind::Warning,
            span: self.cst.span(node),
            text: text.into(),
        });
    }

    // ==========================================================================
    // Source helpers
    // ==========================================================================

    pub(crate) fn text(&self, node: NodeId) -> &'a str {
        self.cst.text(node, &self.unit.code)
    }

    pub(crate) fn kind(&self, node: NodeId) -> NodeKind {
        self.cst.kind(node)
    }

    pub(crate) fn next_label(&mut self) -> u32 {
        let label = self.next_label;
        self.next_label += 1;
        label
    }

    /// Record the source position of `node`.
    pub(crate) fn line_instr(&self, bc: &mut ByteCode, node: NodeId) {
        if self.config.emit_line_info {
            let span = self.cst.span(node);
            bc.line(self.unit.row(span.line), span.col);
        }
    }

    /// Record the position of the last character of `node`.
    fn line_instr_at_end(&self, bc: &mut ByteCode, node: NodeId) {
        if !self.config.emit_line_info {
            return;
        }
        let n = self.cst.get(node);
        let end = (n.offset + n.len).saturating_sub(1) as usize;
        let (line, col) = self.position_at(end);
        bc.line(self.unit.row(line), col);
    }

    /// 1-based line and column of a byte offset.
    fn position_at(&self, offset: usize) -> (u32, u32) {
        let code = &self.unit.code;
        let offset = offset.min(code.len());
        let before = &code.as_bytes()[..offset];
        let line = before.iter().filter(|&&b| b == b'\n').count() as u32 + 1;
        let line_start = before.iter().rposition(|&b| b == b'\n').map_or(0, |p| p + 1);
        (line, (offset - line_start) as u32 + 1)
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    pub(crate) fn type_name(&self, dt: &DataType) -> String {
        self.symbols.type_name(dt)
    }

    pub(crate) fn object_type_of(&self, dt: &DataType) -> Option<&ObjectType> {
        dt.object_hash().and_then(|hash| self.symbols.object_type(hash))
    }

    pub(crate) fn behaviours(&self, dt: &DataType) -> Behaviours {
        self.object_type_of(dt).map(|t| t.behaviours.clone()).unwrap_or_default()
    }

    pub(crate) fn type_flags(&self, dt: &DataType) -> TypeFlags {
        self.object_type_of(dt).map_or(TypeFlags::empty(), |t| t.flags)
    }

    /// Script structs and arrays are constructed with their type on the stack.
    pub(crate) fn needs_type_argument(&self, dt: &DataType) -> bool {
        self.type_flags(dt).intersects(TypeFlags::SCRIPT_STRUCT | TypeFlags::ARRAY)
    }

    /// Dwords copied by a bytewise object copy.
    pub(crate) fn object_size_dwords(&self, dt: &DataType) -> u32 {
        self.object_type_of(dt).map_or(0, |t| t.size.div_ceil(4))
    }

    pub(crate) fn sub_type(&self, dt: &DataType) -> Option<DataType> {
        self.object_type_of(dt).and_then(|t| t.sub_type)
    }

    /// Descriptor of `id`, with built-in behaviours instantiated for `owner`.
    pub(crate) fn describe(&mut self, node: NodeId, id: FunctionId, owner: Option<TypeHash>) -> CResult<FunctionDescriptor> {
        match self.symbols.describe(id, owner) {
            Some(desc) => Ok(desc),
            None => Err(self.error(node, format!("Internal compiler error: unknown function {id}"))),
        }
    }

    // ==========================================================================
    // Frame slots
    // ==========================================================================

    pub(crate) fn allocate(&mut self, dt: DataType, is_temporary: bool) -> i16 {
        self.vars.allocate(dt.with_reference(false), is_temporary)
    }

    pub(crate) fn allocate_not_in(&mut self, dt: DataType, is_temporary: bool, exclude: &[i16]) -> i16 {
        self.vars.allocate_not_in(dt.with_reference(false), is_temporary, exclude)
    }

    pub(crate) fn deallocate(&mut self, offset: i16) {
        if offset != DUMMY_OFFSET {
            self.vars.deallocate(offset);
        }
    }

    /// Destroy and free a temporary. Does nothing for other values.
    pub(crate) fn release_temporary(&mut self, ti: &mut TypeInfo, bc: &mut ByteCode) {
        if ti.is_temporary {
            self.release_temporary_offset(ti.stack_offset, bc);
            ti.is_temporary = false;
        }
    }

    pub(crate) fn release_temporary_offset(&mut self, offset: i16, bc: &mut ByteCode) {
        if let Some(dt) = self.vars.slot_type(offset) {
            self.compile_destructor(dt, offset, bc);
        }
        self.deallocate(offset);
    }

    // ==========================================================================
    // Construction and destruction
    // ==========================================================================

    /// `ALLOC` with the default constructor. The object address is on the
    /// stack.
    pub(crate) fn default_constructor(&mut self, bc: &mut ByteCode, dt: DataType) {
        let Some(hash) = dt.object_hash() else {
            return;
        };
        let ctor = self.behaviours(&dt).default_construct.map_or(NO_CONSTRUCTOR, FunctionId::index);
        if self.needs_type_argument(&dt) {
            bc.instr_type(OpCode::OBJTYPE, hash);
            bc.alloc(hash, ctor, 2);
        } else {
            bc.alloc(hash, ctor, 1);
        }
    }

    /// Construct the object in slot `offset`.
    pub(crate) fn compile_constructor(&mut self, dt: DataType, offset: i16, bc: &mut ByteCode) {
        if dt.is_object() && !dt.is_object_handle() {
            bc.instr_w(OpCode::PSF, offset);
            self.default_constructor(bc, dt);
        }
    }

    /// Free the object or handle in slot `offset`.
    pub(crate) fn compile_destructor(&mut self, dt: DataType, offset: i16, bc: &mut ByteCode) {
        if dt.is_reference {
            return;
        }
        if let Some(hash) = dt.object_hash() {
            bc.instr_w(OpCode::PSF, offset);
            bc.instr_type(OpCode::FREE, hash);
        }
    }

    // ==========================================================================
    // Scopes
    // ==========================================================================

    pub(crate) fn add_variable_scope(&mut self, is_break_scope: bool, is_continue_scope: bool) {
        self.scopes.push(is_break_scope, is_continue_scope);
    }

    /// Pop the innermost scope, freeing its locals.
    pub(crate) fn remove_variable_scope(&mut self) {
        if let Some(scope) = self.scopes.pop() {
            for v in scope.variables.iter().rev().filter(|v| v.offset > 0) {
                self.deallocate(v.offset);
            }
        }
    }

    /// Restore compiler state after an abandoned statement.
    pub(crate) fn recover(&mut self, scope_depth: usize, breaks: usize, continues: usize) {
        self.vars.release_all_temporaries();
        self.is_processing_deferred = false;
        while self.scopes.depth() > scope_depth {
            self.remove_variable_scope();
        }
        self.break_labels.truncate(breaks);
        self.continue_labels.truncate(continues);
    }
}

#[cfg(test)]
mod tests {
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok};

    #[test]
    fn empty_function_is_a_bare_return() {
        let module = build_ok("void main() {}");
        module.function("main").unwrap().assert_opcodes(&[OpCode::RET]);
    }

    #[test]
    fn locals_are_reserved_and_released() {
        let module = build_ok("void main() { int a = 1; double b = 2; }");
        let f = module.function("main").unwrap();
        assert!(f.variable_space >= 3);
        assert_eq!(f.opcodes().first(), Some(&OpCode::PUSH));
        assert_eq!(&f.opcodes()[f.opcodes().len() - 2..], &[OpCode::POP, OpCode::RET]);
    }

    #[test]
    fn missing_return_is_reported() {
        let (_, diags) = build("int f() { }");
        assert!(diags.errors().any(|d| d.message == "Not all paths return a value"));
    }

    #[test]
    fn duplicate_parameter_names_are_rejected() {
        let (_, diags) = build("void f(int a, float a) {}");
        assert!(diags.errors().any(|d| d.message == "Parameter already declared"));
    }

    #[test]
    fn return_pops_argument_space() {
        let module = build_ok("int add(int a, double b) { return a; }");
        let f = module.function("add").unwrap();
        let ret = f.instructions.iter().rev().find(|i| i.op == OpCode::RET).unwrap();
        assert_eq!(ret.w[0], 3);
    }

    #[test]
    fn line_table_records_statements() {
        let module = build_ok("void main()\n{\n  int a = 1;\n}\n");
        let f = module.function("main").unwrap();
        assert!(f.line_table.iter().any(|&(_, packed)| packed & 0xFFFFF == 3));
    }
}
