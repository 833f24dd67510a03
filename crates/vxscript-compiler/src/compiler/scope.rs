//! Lexical variable scopes.

use thiserror::Error;
use vxscript_core::DataType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeclareError {
    #[error("no open scope")]
    NoScope,
    #[error("name already declared in this scope")]
    AlreadyDeclared,
}

/// A declared local variable or parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub data_type: DataType,
    /// Frame offset. Parameters sit at zero and below.
    pub offset: i16,
    pub is_initialized: bool,
    /// Value of a read-only variable with a constant initializer.
    pub constant: Option<u64>,
}

#[derive(Debug, Default, Clone)]
pub struct VariableScope {
    pub variables: Vec<Variable>,
    /// `break` jumps out of this scope.
    pub is_break_scope: bool,
    /// `continue` jumps out of this scope.
    pub is_continue_scope: bool,
}

// ============================================================================
// Scope stack
// ============================================================================

/// Innermost scope last.
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<VariableScope>,
}

impl ScopeStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, is_break_scope: bool, is_continue_scope: bool) {
        self.scopes.push(VariableScope {
            variables: Vec::new(),
            is_break_scope,
            is_continue_scope,
        });
    }

    pub fn pop(&mut self) -> Option<VariableScope> {
        self.scopes.pop()
    }

    pub fn depth(&self) -> usize {
        self.scopes.len()
    }

    /// Declare in the innermost scope.
    pub fn declare(&mut self, name: &str, data_type: DataType, offset: i16) -> Result<(), DeclareError> {
        let scope = self.scopes.last_mut().ok_or(DeclareError::NoScope)?;
        if scope.variables.iter().any(|v| v.name == name) {
            return Err(DeclareError::AlreadyDeclared);
        }
        scope.variables.push(Variable {
            name: name.to_string(),
            data_type,
            offset,
            is_initialized: false,
            constant: None,
        });
        Ok(())
    }

    /// Innermost variable with this name.
    pub fn lookup(&self, name: &str) -> Option<&Variable> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.variables.iter().rev().find(|v| v.name == name))
    }

    pub fn lookup_mut(&mut self, name: &str) -> Option<&mut Variable> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.variables.iter_mut().rev().find(|v| v.name == name))
    }

    pub fn by_offset_mut(&mut self, offset: i16) -> Option<&mut Variable> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.variables.iter_mut().find(|v| v.offset == offset))
    }

    /// Scopes from the innermost outward.
    pub fn iter_inner_to_outer(&self) -> impl Iterator<Item = &VariableScope> {
        self.scopes.iter().rev()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shadowing_in_inner_scope() {
        let mut scopes = ScopeStack::new();
        scopes.push(false, false);
        scopes.declare("a", DataType::int(), 1).unwrap();
        scopes.push(false, false);
        scopes.declare("a", DataType::bool(), 2).unwrap();
        assert_eq!(scopes.lookup("a").map(|v| v.offset), Some(2));
        scopes.pop();
        assert_eq!(scopes.lookup("a").map(|v| v.offset), Some(1));
    }

    #[test]
    fn redeclaration_in_same_scope_fails() {
        let mut scopes = ScopeStack::new();
        scopes.push(false, false);
        scopes.declare("x", DataType::int(), 1).unwrap();
        assert_eq!(
            scopes.declare("x", DataType::int(), 2),
            Err(DeclareError::AlreadyDeclared)
        );
    }

    #[test]
    fn declaration_needs_an_open_scope() {
        let mut scopes = ScopeStack::new();
        assert_eq!(scopes.declare("x", DataType::int(), 1), Err(DeclareError::NoScope));
    }

    #[test]
    fn lookup_by_offset() {
        let mut scopes = ScopeStack::new();
        scopes.push(true, true);
        scopes.declare("i", DataType::int(), 3).unwrap();
        scopes.by_offset_mut(3).unwrap().is_initialized = true;
        assert!(scopes.lookup("i").unwrap().is_initialized);
        assert!(scopes.iter_inner_to_outer().next().unwrap().is_break_scope);
    }
}
