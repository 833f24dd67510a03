//! Named source units.

/// One script section handed to the builder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceUnit {
    /// Section name reported in diagnostics.
    pub name: String,
    pub code: String,
    /// Line number of the first line, for sections cut from a larger file.
    pub line_offset: u32,
}

impl SourceUnit {
    pub fn new(name: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code: code.into(),
            line_offset: 0,
        }
    }

    pub fn with_line_offset(mut self, line_offset: u32) -> Self {
        self.line_offset = line_offset;
        self
    }

    /// Row reported for a 1-based line inside this section.
    #[inline]
    pub fn row(&self, line: u32) -> u32 {
        line + self.line_offset
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_applies_offset() {
        let unit = SourceUnit::new("main", "void f() {}").with_line_offset(10);
        assert_eq!(unit.row(1), 11);
        assert_eq!(SourceUnit::new("a", "").row(3), 3);
    }
}
