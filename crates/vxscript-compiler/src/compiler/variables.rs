//! Frame slot allocator.
//!
//! Slots are laid out from offset 1 upward; a two dword slot is addressed by
//! its last dword. Released slots go on a free list and are reused for a
//! later allocation of the same (normalized) type and temporary flag, which
//! keeps frames small. Every primitive of one dword shares the `int` bucket
//! and every primitive of two dwords the `double` bucket.

use vxscript_core::{DataType, PrimitiveKind};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Slot {
    data_type: DataType,
    is_temporary: bool,
}

/// Offset used for the placeholder of an undeclared identifier.
pub const DUMMY_OFFSET: i16 = i16::MAX;

#[derive(Debug, Default)]
pub struct VariableAllocator {
    slots: Vec<Slot>,
    free: Vec<usize>,
    /// Offsets of live temporaries.
    temporaries: Vec<i16>,
    temp_allocations: usize,
    temp_releases: usize,
}

impl VariableAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    fn normalize(data_type: DataType) -> DataType {
        if data_type.is_primitive() {
            match data_type.size_in_memory_dwords() {
                1 => return data_type.with_kind(PrimitiveKind::Int32),
                2 => return data_type.with_kind(PrimitiveKind::Double),
                _ => {}
            }
        }
        data_type
    }

    pub fn allocate(&mut self, data_type: DataType, is_temporary: bool) -> i16 {
        self.allocate_not_in(data_type, is_temporary, &[])
    }

    /// Allocate a slot whose offset is not in `exclude`.
    pub fn allocate_not_in(&mut self, data_type: DataType, is_temporary: bool, exclude: &[i16]) -> i16 {
        let normalized = Self::normalize(data_type);

        let reusable = self.free.iter().position(|&slot| {
            let s = self.slots[slot];
            s.is_temporary == is_temporary
                && s.data_type.equal_except_const(&normalized)
                && !exclude.contains(&self.offset_of(slot))
        });

        let offset = match reusable {
            Some(index) => {
                let slot = self.free.swap_remove(index);
                self.offset_of(slot)
            }
            None => {
                self.slots.push(Slot {
                    data_type: normalized,
                    is_temporary,
                });
                self.offset_of(self.slots.len() - 1)
            }
        };

        if is_temporary {
            self.temporaries.push(offset);
            self.temp_allocations += 1;
        }
        offset
    }

    fn offset_of(&self, slot: usize) -> i16 {
        let before: u32 = self.slots[..slot].iter().map(|s| s.data_type.size_on_stack_dwords()).sum();
        let size = self.slots.get(slot).map_or(1, |s| s.data_type.size_on_stack_dwords());
        (1 + before + size.saturating_sub(1)) as i16
    }

    fn slot_of(&self, offset: i16) -> Option<usize> {
        (0..self.slots.len()).find(|&slot| self.offset_of(slot) == offset)
    }

    /// Type stored in the slot at `offset`.
    pub fn slot_type(&self, offset: i16) -> Option<DataType> {
        self.slot_of(offset).map(|slot| self.slots[slot].data_type)
    }

    /// Return the slot at `offset` to the free list.
    pub fn deallocate(&mut self, offset: i16) {
        if let Some(index) = self.temporaries.iter().position(|&o| o == offset) {
            self.temporaries.swap_remove(index);
            self.temp_releases += 1;
        }
        if let Some(slot) = self.slot_of(offset) {
            debug_assert!(!self.free.contains(&slot), "slot {offset} released twice");
            self.free.push(slot);
        } else {
            debug_assert_eq!(offset, DUMMY_OFFSET, "release of unknown slot {offset}");
        }
    }

    /// Drop every live temporary, returning their offsets. Used to resume
    /// after an error abandoned a statement.
    pub fn release_all_temporaries(&mut self) -> Vec<i16> {
        let live = self.temporaries.clone();
        for &offset in &live {
            self.deallocate(offset);
        }
        live
    }

    pub fn live_temporaries(&self) -> usize {
        self.temporaries.len()
    }

    /// `(allocations, releases)` of temporaries so far.
    pub fn temporary_counts(&self) -> (usize, usize) {
        (self.temp_allocations, self.temp_releases)
    }

    /// Dwords needed for all slots.
    pub fn variable_space(&self) -> u32 {
        self.slots.iter().map(|s| s.data_type.size_on_stack_dwords()).sum()
    }

    /// `(offset, type)` of every slot ever allocated.
    pub fn slots(&self) -> impl Iterator<Item = (i16, DataType)> + '_ {
        (0..self.slots.len()).map(|slot| (self.offset_of(slot), self.slots[slot].data_type))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vxscript_core::TypeHash;

    #[test]
    fn offsets_address_the_last_dword() {
        let mut vars = VariableAllocator::new();
        assert_eq!(vars.allocate(DataType::int(), false), 1);
        assert_eq!(vars.allocate(DataType::primitive(PrimitiveKind::Double), false), 3);
        assert_eq!(vars.allocate(DataType::bool(), true), 4);
        assert_eq!(vars.variable_space(), 4);
    }

    #[test]
    fn freed_slots_are_reused_by_bucket() {
        let mut vars = VariableAllocator::new();
        let a = vars.allocate(DataType::primitive(PrimitiveKind::Float), true);
        vars.deallocate(a);
        // float and int share the one dword bucket
        assert_eq!(vars.allocate(DataType::int(), true), a);
        // a non-temporary never takes a temporary's slot
        let b = vars.allocate(DataType::int(), false);
        assert_ne!(a, b);
    }

    #[test]
    fn exclusion_forces_a_new_slot() {
        let mut vars = VariableAllocator::new();
        let a = vars.allocate(DataType::int(), true);
        vars.deallocate(a);
        let b = vars.allocate_not_in(DataType::int(), true, &[a]);
        assert_ne!(a, b);
    }

    #[test]
    fn objects_do_not_share_with_primitives() {
        let mut vars = VariableAllocator::new();
        let obj = DataType::object(TypeHash::from_name("Obj"));
        let a = vars.allocate(obj, true);
        vars.deallocate(a);
        let b = vars.allocate(DataType::int(), true);
        assert_ne!(a, b);
        assert_eq!(vars.allocate(obj, true), a);
    }

    #[test]
    fn temporary_balance() {
        let mut vars = VariableAllocator::new();
        let a = vars.allocate(DataType::int(), true);
        let b = vars.allocate(DataType::int(), true);
        assert_eq!(vars.live_temporaries(), 2);
        vars.deallocate(b);
        vars.deallocate(a);
        assert_eq!(vars.temporary_counts(), (2, 2));
        assert_eq!(vars.live_temporaries(), 0);
        let reused = vars.allocate(DataType::int(), true);
        assert!(reused == a || reused == b);
    }

    #[test]
    fn release_all_after_error() {
        let mut vars = VariableAllocator::new();
        vars.allocate(DataType::int(), true);
        vars.allocate(DataType::bool(), true);
        assert_eq!(vars.release_all_temporaries().len(), 2);
        assert_eq!(vars.live_temporaries(), 0);
    }

    #[test]
    fn dummy_offset_is_ignored() {
        let mut vars = VariableAllocator::new();
        vars.deallocate(DUMMY_OFFSET);
        assert_eq!(vars.temporary_counts(), (0, 0));
        assert_eq!(vars.variable_space(), 0);
    }
}
