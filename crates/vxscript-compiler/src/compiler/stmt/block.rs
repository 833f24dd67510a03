//! Statement blocks.

use vxscript_parser::{NodeId, NodeKind};

use super::super::Compiler;
use crate::bytecode::ByteCode;

impl Compiler<'_, '_> {
    /// Compile the statements of a `StatementBlock`.
    ///
    /// With `own_scope` the block's locals live in a new scope that is
    /// destroyed when control falls out of the block. A function body shares
    /// the scope of the parameters instead.
    ///
    /// Returns whether the block always ends in a `return`.
    pub(crate) fn compile_statement_block(&mut self, block: NodeId, own_scope: bool, bc: &mut ByteCode) -> bool {
        if own_scope {
            self.add_variable_scope(false, false);
        }

        let mut has_return = false;
        let mut is_finished = false;
        let mut warned = false;

        let statements: Vec<NodeId> = self.cst.children(block).collect();
        for node in statements {
            if is_finished && !warned {
                self.warning(node, "Unreachable code");
                warned = true;
            }

            let live = self.vars.live_temporaries();
            let mut statement = ByteCode::new();
            let returns = self.compile_statement(node, &mut statement);
            debug_assert!(
                self.has_errors || self.vars.live_temporaries() == live,
                "statement left {} temporaries live, expected {live}",
                self.vars.live_temporaries()
            );
            if returns {
                has_return = true;
                is_finished = true;
            }
            if matches!(self.kind(node), NodeKind::Break | NodeKind::Continue) {
                is_finished = true;
            }

            self.line_instr(bc, node);
            bc.add_code(statement);
        }

        if own_scope {
            // Paths that left through break, continue or return already
            // destroyed these locals.
            self.close_scope(bc, !is_finished);
        }
        has_return
    }
}
