//! Global variable initialization.
//!
//! An initializer may read globals declared after it, so initializers are
//! compiled to a fixed point: every pass retries the globals that failed
//! before, until a pass makes no progress. Primitives go first; once they
//! stop progressing the object globals join in. Whatever never compiles is
//! reported with the messages of its last attempt.
//!
//! The compiled fragments are concatenated, in the order they compiled, into
//! the module init function.

use vxscript_core::FunctionId;

use super::ModuleBuild;
use crate::bytecode::ByteCode;
use crate::compiler::{Compiler, Message};
use crate::module::{CompiledFunction, ObjectVariable};

/// Name of the synthesized init function.
pub const INIT_FUNCTION_NAME: &str = "$init";

/// Initializer code of one global.
struct InitFragment {
    code: ByteCode,
    variable_space: u32,
    object_variables: Vec<ObjectVariable>,
}

impl ModuleBuild<'_, '_> {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn compile_global_variables(&mut self) -> Option<CompiledFunction> {
        let count = self.symbols.globals.len();
        let mut fragments = Vec::new();
        let mut failures: Vec<Option<Vec<Message>>> = vec![None; count];
        let mut primitives_only = true;

        loop {
            if self
                .config
                .max_global_passes
                .is_some_and(|max| self.stats.global_passes >= max)
            {
                break;
            }
            self.stats.global_passes += 1;

            let mut progress = false;
            for index in 0..count {
                let global = &self.symbols.globals[index];
                if global.is_compiled || (primitives_only && !global.data_type.is_primitive()) {
                    continue;
                }
                let unit = global.unit;
                let heading = format!("Compiling {} {}", self.symbols.type_name(&global.data_type), global.name);
                let position = self.trees[unit].span(global.init.unwrap_or(global.name_node));

                let outcome = Compiler::new(&mut self.symbols, self.config, &self.units[unit], &self.trees[unit])
                    .compile_global_variable(index);
                let Some(code) = outcome.code else {
                    failures[index] = Some(outcome.messages);
                    continue;
                };

                progress = true;
                failures[index] = None;
                let global = &mut self.symbols.globals[index];
                global.is_compiled = true;
                global.constant = outcome.constant;
                self.stats.globals += 1;
                self.report_messages(unit, (position, heading), outcome.messages);
                fragments.push(InitFragment {
                    code,
                    variable_space: outcome.variable_space,
                    object_variables: outcome.object_variables,
                });
            }

            if !progress {
                if primitives_only {
                    primitives_only = false;
                    continue;
                }
                break;
            }
        }

        for index in 0..count {
            let global = &self.symbols.globals[index];
            if global.is_compiled {
                continue;
            }
            let unit = global.unit;
            let heading = format!("Compiling {} {}", self.symbols.type_name(&global.data_type), global.name);
            let position = self.trees[unit].span(global.init.unwrap_or(global.name_node));
            match failures[index].take() {
                Some(messages) => self.report_messages(unit, (position, heading), messages),
                None => {
                    let message = format!(
                        "Global variable '{}' was not initialized within {} passes",
                        global.name, self.stats.global_passes
                    );
                    let node = global.name_node;
                    self.error(unit, node, message);
                }
            }
        }

        self.assemble_init_function(fragments)
    }

    /// Concatenate initializer fragments into one function.
    fn assemble_init_function(&mut self, fragments: Vec<InitFragment>) -> Option<CompiledFunction> {
        if fragments.iter().all(|f| f.code.is_empty()) {
            return None;
        }

        let mut code = ByteCode::new();
        let mut next_label = 0;
        let mut variable_space = 0;
        let mut object_variables: Vec<ObjectVariable> = Vec::new();
        for mut fragment in fragments {
            // Every fragment numbers its labels from zero.
            fragment.code.relabel(next_label);
            if let Some(max) = fragment.code.max_label() {
                next_label = max + 1;
            }
            variable_space = variable_space.max(fragment.variable_space);
            for variable in fragment.object_variables {
                if !object_variables.contains(&variable) {
                    object_variables.push(variable);
                }
            }
            code.add_code(fragment.code);
        }
        code.ret(0);

        match code.finalize() {
            Ok(finished) => Some(CompiledFunction {
                name: INIT_FUNCTION_NAME.to_string(),
                id: FunctionId::Script(self.symbols.functions.len() as u32),
                declaration: format!("void {INIT_FUNCTION_NAME}()"),
                instructions: finished.instructions,
                code: finished.code,
                stack_size: finished.stack_size,
                variable_space,
                object_variables,
                line_table: finished.line_table,
            }),
            Err(error) => {
                let section = self.symbols.module_name().to_string();
                self.diagnostics.error(&section, 0, 0, format!("Internal compiler error: {error}"));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use vxscript_core::BuildConfig;
    use vxscript_parser::SourceUnit;
    use vxscript_registry::Registry;

    use super::INIT_FUNCTION_NAME;
    use crate::builder::Builder;
    use crate::bytecode::OpCode;
    use crate::test_utils::{build, build_ok, build_with_host};

    #[test]
    fn forward_references_resolve() {
        let module = build_ok("int b = a + 1; const int a = 2;");
        assert_eq!(module.global("a").unwrap().constant, Some(2));
        assert_eq!(module.global("b").unwrap().index, 0);
        let init = module.init_function.as_ref().unwrap();
        assert_eq!(init.name, INIT_FUNCTION_NAME);
        init.assert_contains_opcodes(&[OpCode::LDG, OpCode::RET]);
    }

    #[test]
    fn constants_fold_only_from_constants() {
        let module = build_ok("const int a = 1; const int b = 2; const int c = a + b;");
        assert_eq!(module.global("c").unwrap().constant, Some(3));

        let module = build_ok("int a = 1; const int b = 2; const int c = a + b;");
        assert_eq!(module.global("c").unwrap().constant, None);
    }

    #[test]
    fn uninitialized_reads_are_reported() {
        let (module, diags) = build("int a = b; int b = a;");
        assert!(module.is_none());
        let errors: Vec<&str> = diags.errors().map(|d| d.message.as_str()).collect();
        assert_eq!(
            errors,
            [
                "Use of uninitialized global variable 'b'",
                "Use of uninitialized global variable 'a'"
            ]
        );
        assert!(diags.iter().any(|d| d.message == "Compiling int a"));
    }

    #[test]
    fn globals_without_initializers() {
        let module = build_ok("int counter; float ratio; void f() { counter = 1; }");
        assert_eq!(module.globals.len(), 2);
        assert_eq!(module.global("ratio").unwrap().index, 1);
    }

    #[test]
    fn void_globals_are_rejected() {
        let (_, diags) = build("void nothing;");
        assert!(diags.errors().any(|d| d.message == "Data type can't be 'void'"));
    }

    #[test]
    fn objects_initialize_after_primitives() {
        let module = build_with_host("Counter c(n); int n = 3;");
        assert!(module.init_function.is_some());
        assert_eq!(module.global("c").unwrap().index, 0);
    }

    #[test]
    fn pass_limit_stops_the_fixed_point() {
        let registry = Registry::new();
        let mut builder =
            Builder::new(&registry, "main").with_config(BuildConfig::default().with_max_global_passes(Some(1)));
        builder.add_source(SourceUnit::new("main", "int b = a; int a = 1;"));
        let output = builder.build();
        assert!(output.module.is_none());
        assert_eq!(output.stats.global_passes, 1);
        assert!(output.diagnostics.errors().any(|d| d.message == "Use of uninitialized global variable 'a'"));
    }

    #[test]
    fn fragments_keep_their_own_labels() {
        let module = build_ok("bool x = true; int a = x ? 1 : 2; int b = x ? 3 : 4;");
        let init = module.init_function.as_ref().unwrap();
        assert!(init.count_op(OpCode::JZ) + init.count_op(OpCode::JNZ) >= 2);
        assert_eq!(init.opcodes().last(), Some(&OpCode::RET));
    }

    #[test]
    fn constant_only_globals_need_no_init_code() {
        let module = build_ok("const int a = 4; const float b = 2.5;");
        assert!(module.globals.iter().all(|g| g.constant.is_some()));
    }
}
