//! Script struct layout and validation.
//!
//! Members are laid out in declaration order. Object members that are not
//! handles are stored as pointers to separately allocated instances, so every
//! object member takes one pointer slot.
//!
//! A struct may not contain itself by value, directly or through other
//! structs or arrays of them. Containment is checked over a graph of
//! struct-contains-struct edges; handles break containment.
//!
//! Types that can take part in reference cycles are flagged
//! [`TypeFlags::GC`]: anything holding a handle or a garbage-collected
//! member, and everything containing such a type.

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::Dfs;
use rustc_hash::FxHashMap;

use vxscript_core::{DataType, PropertyDescriptor, TypeFlags, TypeHash};
use vxscript_parser::{NodeId, NodeKind};

use super::ModuleBuild;

/// Pointer size as seen by the VM.
const POINTER_SIZE: u32 = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum ValidState {
    Unvalidated,
    Valid,
    Invalid,
}

/// A struct declared in script.
#[derive(Debug, Clone, Copy)]
pub(super) struct StructDecl {
    pub unit: usize,
    /// The `Struct` node.
    pub node: NodeId,
    pub hash: TypeHash,
    pub state: ValidState,
}

/// Offset of the next member of `size` bytes.
fn align(offset: u32, size: u32) -> u32 {
    match size {
        2 => (offset + 1) & !1,
        s if s > 2 => (offset + 3) & !3,
        _ => offset,
    }
}

impl ModuleBuild<'_, '_> {
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub(super) fn compile_structs(&mut self) {
        for index in 0..self.structs.len() {
            self.layout_struct(index);
        }
        self.validate_structs();

        if self.diagnostics.has_errors() {
            return;
        }
        self.flag_gc_types();
    }

    fn layout_struct(&mut self, index: usize) {
        let StructDecl { unit, node, hash, .. } = self.structs[index];
        let members: Vec<NodeId> = self.trees[unit].children(node).skip(1).collect();

        let mut properties: Vec<PropertyDescriptor> = Vec::new();
        let mut member_type = None;
        let mut size = 0;
        for member in members {
            match self.trees[unit].kind(member) {
                NodeKind::DataType => {
                    let dt = self.resolve_type(unit, member);
                    if dt.is_read_only {
                        self.error(unit, member, "Struct properties cannot be declared as const");
                    }
                    member_type = Some(dt.with_read_only(false));
                }
                NodeKind::Identifier => {
                    let Some(dt) = member_type else {
                        continue;
                    };
                    let name = self.text(unit, member);
                    if properties.iter().any(|p| p.name == name) {
                        self.error(unit, member, format!("Name conflict. '{name}' is an object property."));
                        continue;
                    }

                    let (bytes, data_type) = if dt.is_object() {
                        let stored = if dt.is_object_handle() { dt } else { dt.with_reference(true) };
                        (POINTER_SIZE, stored)
                    } else {
                        (dt.size_in_memory_bytes(), dt)
                    };
                    if bytes == 0 {
                        let type_name = self.symbols.type_name(&dt);
                        self.error(unit, member, format!("Data type can't be '{type_name}'"));
                        continue;
                    }

                    size = align(size, bytes);
                    properties.push(PropertyDescriptor {
                        name,
                        data_type,
                        byte_offset: size,
                    });
                    size += bytes;
                }
                _ => {}
            }
        }

        if let Some(ty) = self.symbols.script_type_mut(hash) {
            ty.size = size;
            ty.properties = properties;
        }
    }

    /// The struct a member with type `dt` contains by value, looking
    /// through arrays of values.
    fn contained_type(&self, mut dt: DataType) -> Option<TypeHash> {
        loop {
            if !dt.is_object() || dt.is_object_handle() {
                return None;
            }
            let hash = dt.object_hash()?;
            match self.symbols.object_type(hash) {
                Some(ty) if ty.is_array() => dt = ty.sub_type?,
                _ => return Some(hash),
            }
        }
    }

    fn validate_structs(&mut self) {
        let mut graph: DiGraph<usize, ()> = DiGraph::new();
        let nodes: Vec<NodeIndex> = (0..self.structs.len()).map(|i| graph.add_node(i)).collect();
        let index_of: FxHashMap<TypeHash, usize> =
            self.structs.iter().enumerate().map(|(i, decl)| (decl.hash, i)).collect();

        for (i, decl) in self.structs.iter().enumerate() {
            let Some(ty) = self.symbols.object_type(decl.hash) else {
                continue;
            };
            for property in &ty.properties {
                if let Some(&member) = self.contained_type(property.data_type).and_then(|h| index_of.get(&h)) {
                    graph.update_edge(nodes[i], nodes[member], ());
                }
            }
        }

        let mut pending: Vec<usize> = (0..self.structs.len()).rev().collect();
        while !pending.is_empty() {
            let before = pending.len();
            let mut again = Vec::new();

            while let Some(i) = pending.pop() {
                let mut state = ValidState::Valid;
                for member in graph.neighbors(nodes[i]).map(|n| graph[n]) {
                    if member == i {
                        let decl = self.structs[i];
                        self.error(decl.unit, decl.node, "Illegal member type");
                        state = ValidState::Invalid;
                        break;
                    }
                    match self.structs[member].state {
                        ValidState::Valid => {}
                        other => {
                            state = other;
                            break;
                        }
                    }
                }
                match state {
                    ValidState::Unvalidated => again.push(i),
                    state => self.structs[i].state = state,
                }
            }

            // Nothing resolved: the remaining structs contain each other.
            if again.len() == before {
                if let Some(&first) = again.last() {
                    let decl = self.structs[first];
                    self.error(decl.unit, decl.node, "Illegal member type");
                }
                for i in again {
                    self.structs[i].state = ValidState::Invalid;
                }
                break;
            }
            again.reverse();
            pending = again;
        }
    }

    fn flag_gc_types(&mut self) {
        let mut graph: DiGraph<TypeHash, ()> = DiGraph::new();
        let mut index: FxHashMap<TypeHash, NodeIndex> = FxHashMap::default();
        for ty in self.symbols.script_types() {
            index.insert(ty.hash, graph.add_node(ty.hash));
        }

        let mut seeds = Vec::new();
        for ty in self.symbols.script_types() {
            let owner = index[&ty.hash];
            if ty.is_gc() {
                seeds.push(owner);
            }
            let members = ty.properties.iter().map(|p| p.data_type).chain(ty.sub_type);
            for dt in members {
                if !dt.is_object() {
                    continue;
                }
                if dt.is_object_handle() {
                    seeds.push(owner);
                    continue;
                }
                let Some(hash) = dt.object_hash() else {
                    continue;
                };
                match index.get(&hash) {
                    Some(&member) => {
                        graph.update_edge(member, owner, ());
                    }
                    None => {
                        if self.symbols.object_type(hash).is_some_and(|t| t.is_gc()) {
                            seeds.push(owner);
                        }
                    }
                }
            }
        }

        let mut flagged = Vec::new();
        for seed in seeds {
            let mut dfs = Dfs::new(&graph, seed);
            while let Some(node) = dfs.next(&graph) {
                flagged.push(graph[node]);
            }
        }
        for hash in flagged {
            if let Some(ty) = self.symbols.script_type_mut(hash) {
                ty.flags |= TypeFlags::GC;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::align;
    use crate::test_utils::{build, build_ok, build_with_host};

    #[test]
    fn alignment() {
        assert_eq!(align(1, 1), 1);
        assert_eq!(align(1, 2), 2);
        assert_eq!(align(3, 4), 4);
        assert_eq!(align(6, 8), 8);
        assert_eq!(align(8, 4), 8);
    }

    #[test]
    fn members_are_laid_out_in_order() {
        let module = build_ok("struct S { int8 a; int16 b; int8 c; double d; int e; }");
        let s = module.object_type("S").unwrap();
        let offsets: Vec<(&str, u32)> = s.properties.iter().map(|p| (p.name.as_str(), p.byte_offset)).collect();
        assert_eq!(offsets, [("a", 0), ("b", 2), ("c", 4), ("d", 8), ("e", 16)]);
        assert_eq!(s.size, 20);
    }

    #[test]
    fn object_members_are_pointers() {
        let module = build_ok("struct Inner { int x; } struct Outer { int8 flag; Inner inner; Inner@ other; }");
        let outer = module.object_type("Outer").unwrap();
        let inner = outer.property("inner").unwrap();
        assert_eq!(inner.byte_offset, 4);
        assert!(inner.data_type.is_reference);
        let other = outer.property("other").unwrap();
        assert_eq!(other.byte_offset, 8);
        assert!(other.data_type.is_handle);
        assert_eq!(outer.size, 12);
    }

    #[test]
    fn const_members_are_rejected() {
        let (_, diags) = build("struct S { const int a; }");
        assert!(diags.errors().any(|d| d.message == "Struct properties cannot be declared as const"));
    }

    #[test]
    fn duplicate_members_are_rejected() {
        let (_, diags) = build("struct S { int a; float a; }");
        assert!(diags.errors().any(|d| d.message == "Name conflict. 'a' is an object property."));
    }

    #[test]
    fn self_containment_is_illegal() {
        let (_, diags) = build("struct S { int a; S inner; }");
        assert!(diags.errors().any(|d| d.message == "Illegal member type"));
    }

    #[test]
    fn mutual_containment_is_illegal() {
        let (module, diags) = build("struct A { B b; } struct B { A a; }");
        assert!(module.is_none());
        assert_eq!(diags.errors().filter(|d| d.message == "Illegal member type").count(), 1);
    }

    #[test]
    fn containment_through_arrays_is_illegal() {
        let (_, diags) = build("struct P { int x; P[] children; }");
        assert!(diags.errors().any(|d| d.message == "Illegal member type"));
    }

    #[test]
    fn handles_break_containment_and_need_gc() {
        let module = build_ok("struct Link { int value; Link@ next; } struct Plain { int a; float b; }");
        assert!(module.object_type("Link").unwrap().is_gc());
        assert!(!module.object_type("Plain").unwrap().is_gc());
    }

    #[test]
    fn gc_flag_spreads_to_containers() {
        let module = build_ok("struct Link { Link@ next; } struct Holder { Link link; } struct Far { Holder h; int x; }");
        assert!(module.object_type("Holder").unwrap().is_gc());
        assert!(module.object_type("Far").unwrap().is_gc());
    }

    #[test]
    fn arrays_of_gc_types_are_gc() {
        let module = build_ok("struct Link { Link@ next; } void f() { Link[] links; }");
        assert!(module.object_type("Link[]").unwrap().is_gc());
    }

    #[test]
    fn host_members() {
        let module = build_with_host("struct Tally { Counter c; int n; }");
        let tally = module.object_type("Tally").unwrap();
        assert_eq!(tally.property("n").unwrap().byte_offset, 4);
        assert!(!tally.is_gc());
    }
}
