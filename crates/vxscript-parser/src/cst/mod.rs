//! Concrete syntax tree.
//!
//! Nodes live in an arena and are addressed by [`NodeId`]. Each node is owned
//! by exactly one parent slot at a time: [`Cst::disconnect`] takes a subtree
//! out of its parent, [`Cst::add_child_last`] moves it under a new one, and
//! [`Cst::destroy`] frees a detached subtree so its slots can be reused.

mod node;

pub use node::{Node, NodeId, NodeKind};

use vxscript_core::Span;

use crate::lexer::Token;

#[derive(Debug, Clone, Default)]
pub struct Cst {
    nodes: Vec<Node>,
    free: Vec<NodeId>,
    root: Option<NodeId>,
}

impl Cst {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = Some(root);
    }

    /// Number of live nodes.
    pub fn len(&self) -> usize {
        self.nodes.len() - self.free.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Create a detached node, reusing a freed slot when one exists.
    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.nodes[id.index()] = Node::new(kind);
                id
            }
            None => {
                let id = NodeId(self.nodes.len() as u32);
                self.nodes.push(Node::new(kind));
                id
            }
        }
    }

    /// Create a detached node covering `token`.
    pub fn alloc_token(&mut self, kind: NodeKind, token: &Token<'_>) -> NodeId {
        let id = self.alloc(kind);
        self.set_token(id, token);
        id
    }

    #[inline]
    pub fn get(&self, id: NodeId) -> &Node {
        &self.nodes[id.index()]
    }

    #[inline]
    pub fn kind(&self, id: NodeId) -> NodeKind {
        self.get(id).kind
    }

    #[inline]
    pub fn span(&self, id: NodeId) -> Span {
        self.get(id).span
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).parent
    }

    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).first_child
    }

    pub fn last_child(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).last_child
    }

    pub fn next_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).next
    }

    pub fn prev_sibling(&self, id: NodeId) -> Option<NodeId> {
        self.get(id).prev
    }

    pub fn children(&self, id: NodeId) -> Children<'_> {
        Children {
            cst: self,
            next: self.first_child(id),
        }
    }

    pub fn child_count(&self, id: NodeId) -> usize {
        self.children(id).count()
    }

    /// Set the token of a node and extend its source range over it.
    pub fn set_token(&mut self, id: NodeId, token: &Token<'_>) {
        let node = &mut self.nodes[id.index()];
        node.token = Some(token.kind);
        node.update_source_pos(token.offset, token.len(), token.span);
    }

    /// Extend the source range of a node over a token without changing its kind.
    pub fn update_source_pos(&mut self, id: NodeId, token: &Token<'_>) {
        self.nodes[id.index()].update_source_pos(token.offset, token.len(), token.span);
    }

    /// Append a detached node as the last child of `parent`.
    pub fn add_child_last(&mut self, parent: NodeId, child: NodeId) {
        debug_assert!(self.get(child).parent.is_none(), "child is already attached");
        let prev = self.nodes[parent.index()].last_child;
        {
            let node = &mut self.nodes[child.index()];
            node.parent = Some(parent);
            node.prev = prev;
            node.next = None;
        }
        match prev {
            Some(prev) => self.nodes[prev.index()].next = Some(child),
            None => self.nodes[parent.index()].first_child = Some(child),
        }
        self.nodes[parent.index()].last_child = Some(child);

        let (offset, len, span) = {
            let c = self.get(child);
            (c.offset, c.len, c.span)
        };
        if span.line != 0 {
            self.nodes[parent.index()].update_source_pos(offset, len, span);
        }
    }

    /// Take a node and its subtree out of its parent. The caller owns the result.
    pub fn disconnect(&mut self, id: NodeId) {
        let (parent, prev, next) = {
            let node = self.get(id);
            (node.parent, node.prev, node.next)
        };
        if let Some(prev) = prev {
            self.nodes[prev.index()].next = next;
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].first_child = next;
        }
        if let Some(next) = next {
            self.nodes[next.index()].prev = prev;
        } else if let Some(parent) = parent {
            self.nodes[parent.index()].last_child = prev;
        }
        let node = &mut self.nodes[id.index()];
        node.parent = None;
        node.prev = None;
        node.next = None;
        if self.root == Some(id) {
            self.root = None;
        }
    }

    /// Free a node and its whole subtree.
    pub fn destroy(&mut self, id: NodeId) {
        if self.get(id).parent.is_some() || self.root == Some(id) {
            self.disconnect(id);
        }
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(current));
            self.nodes[current.index()] = Node::new(NodeKind::Undefined);
            self.free.push(current);
        }
    }

    /// Text covered by a node.
    pub fn text<'a>(&self, id: NodeId, source: &'a str) -> &'a str {
        let node = self.get(id);
        let start = node.offset as usize;
        let end = (start + node.len as usize).min(source.len());
        source.get(start..end).unwrap_or("")
    }

    /// Indented dump of a subtree, one node per line.
    pub fn dump(&self, id: NodeId, source: &str) -> String {
        let mut out = String::new();
        self.dump_into(id, source, 0, &mut out);
        out
    }

    fn dump_into(&self, id: NodeId, source: &str, depth: usize, out: &mut String) {
        let node = self.get(id);
        out.push_str(&"  ".repeat(depth));
        out.push_str(&format!("{:?}", node.kind));
        if node.token.is_some() && node.first_child.is_none() {
            out.push_str(&format!(" '{}'", self.text(id, source)));
        }
        out.push('\n');
        for child in self.children(id) {
            self.dump_into(child, source, depth + 1, out);
        }
    }
}

/// Iterator over the direct children of a node.
pub struct Children<'a> {
    cst: &'a Cst,
    next: Option<NodeId>,
}

impl Iterator for Children<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let current = self.next?;
        self.next = self.cst.next_sibling(current);
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::TokenKind;

    fn token(kind: TokenKind, lexeme: &str, offset: u32) -> Token<'_> {
        Token::new(kind, lexeme, offset, Span::new(1, offset + 1, lexeme.len() as u32))
    }

    #[test]
    fn children_in_order_and_range_grows() {
        let mut cst = Cst::new();
        let parent = cst.alloc(NodeKind::ArgList);
        let a = cst.alloc_token(NodeKind::Identifier, &token(TokenKind::Identifier, "a", 1));
        let b = cst.alloc_token(NodeKind::Identifier, &token(TokenKind::Identifier, "bc", 4));
        cst.add_child_last(parent, a);
        cst.add_child_last(parent, b);

        assert_eq!(cst.children(parent).collect::<Vec<_>>(), vec![a, b]);
        assert_eq!(cst.parent(b), Some(parent));
        assert_eq!(cst.prev_sibling(b), Some(a));
        assert_eq!(cst.get(parent).offset, 1);
        assert_eq!(cst.get(parent).len, 5);
        assert_eq!(cst.text(parent, " a, bc"), "a, bc");
    }

    #[test]
    fn disconnect_and_reattach_moves_ownership() {
        let mut cst = Cst::new();
        let first = cst.alloc(NodeKind::Script);
        let second = cst.alloc(NodeKind::Import);
        let x = cst.alloc(NodeKind::Function);
        let y = cst.alloc(NodeKind::GlobalVar);
        cst.add_child_last(first, x);
        cst.add_child_last(first, y);

        cst.disconnect(x);
        assert_eq!(cst.children(first).collect::<Vec<_>>(), vec![y]);
        assert_eq!(cst.parent(x), None);

        cst.add_child_last(second, x);
        assert_eq!(cst.parent(x), Some(second));
        assert_eq!(cst.first_child(first), Some(y));
        assert_eq!(cst.last_child(first), Some(y));
    }

    #[test]
    fn disconnect_middle_child_relinks_siblings() {
        let mut cst = Cst::new();
        let parent = cst.alloc(NodeKind::StatementBlock);
        let ids: Vec<_> = (0..3).map(|_| cst.alloc(NodeKind::Break)).collect();
        for &id in &ids {
            cst.add_child_last(parent, id);
        }
        cst.disconnect(ids[1]);
        assert_eq!(cst.next_sibling(ids[0]), Some(ids[2]));
        assert_eq!(cst.prev_sibling(ids[2]), Some(ids[0]));
        assert_eq!(cst.child_count(parent), 2);
    }

    #[test]
    fn destroy_frees_subtree_for_reuse() {
        let mut cst = Cst::new();
        let root = cst.alloc(NodeKind::Script);
        cst.set_root(root);
        let func = cst.alloc(NodeKind::Function);
        let ident = cst.alloc(NodeKind::Identifier);
        cst.add_child_last(root, func);
        cst.add_child_last(func, ident);
        assert_eq!(cst.len(), 3);

        cst.destroy(func);
        assert_eq!(cst.len(), 1);
        assert_eq!(cst.first_child(root), None);

        let reused = cst.alloc(NodeKind::Return);
        assert!(reused == func || reused == ident);
        assert_eq!(cst.kind(reused), NodeKind::Return);
        assert_eq!(cst.len(), 2);
    }

    #[test]
    fn destroying_root_clears_it() {
        let mut cst = Cst::new();
        let root = cst.alloc(NodeKind::Script);
        cst.set_root(root);
        cst.destroy(root);
        assert_eq!(cst.root(), None);
        assert!(cst.is_empty());
    }

    #[test]
    fn dump_shows_structure() {
        let source = "x";
        let mut cst = Cst::new();
        let value = cst.alloc(NodeKind::ExprValue);
        let ident = cst.alloc_token(NodeKind::Identifier, &token(TokenKind::Identifier, "x", 0));
        cst.add_child_last(value, ident);
        assert_eq!(cst.dump(value, source), "ExprValue\n  Identifier 'x'\n");
    }
}
