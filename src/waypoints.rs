//! Ordered waypoint list with stable slot identity.
//!
//! A slot's id is assigned once and never reused; its display index is
//! derived from position on demand. Mutators are crate-private: the only
//! writer is [`crate::sync::WaypointSync`].

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::coordinate::Coordinate;

/// Opaque, never-reused slot identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct SlotId(u64);

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WaypointRole {
    Start,
    Via,
    End,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WaypointSlot {
    pub id: SlotId,
    pub role: WaypointRole,
    pub coordinate: Option<Coordinate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WaypointError {
    #[error("unknown waypoint {0}")]
    UnknownSlot(SlotId),

    #[error("cannot insert a via point after {0}")]
    InvalidPosition(SlotId),

    #[error("cannot remove {0}: a route needs a start and an end")]
    CannotRemoveTerminal(SlotId),
}

/// The waypoint list. Always holds exactly one Start (first) and one End
/// (last), with zero or more Via slots between them.
#[derive(Debug, Clone)]
pub struct WaypointStore {
    slots: Vec<WaypointSlot>,
    next_id: u64,
}

impl Default for WaypointStore {
    fn default() -> Self {
        Self::init_empty()
    }
}

impl WaypointStore {
    pub fn new() -> Self {
        Self::init_empty()
    }

    /// Empty route: an unfilled Start and an unfilled End.
    pub fn init_empty() -> Self {
        let mut store = Self {
            slots: Vec::with_capacity(2),
            next_id: 0,
        };
        let start = store.allocate(WaypointRole::Start);
        let end = store.allocate(WaypointRole::End);
        store.slots.push(start);
        store.slots.push(end);
        store
    }

    pub fn slots(&self) -> &[WaypointSlot] {
        &self.slots
    }

    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// True while no slot holds a coordinate, however many slots exist.
    pub fn has_no_coordinates(&self) -> bool {
        self.slots.iter().all(|slot| slot.coordinate.is_none())
    }

    pub fn get(&self, id: SlotId) -> Option<&WaypointSlot> {
        self.slots.iter().find(|slot| slot.id == id)
    }

    pub fn position(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|slot| slot.id == id)
    }

    pub fn start_id(&self) -> SlotId {
        self.slots[0].id
    }

    pub fn end_id(&self) -> SlotId {
        self.slots[self.slots.len() - 1].id
    }

    pub fn via_count(&self) -> usize {
        self.slots.len() - 2
    }

    /// First slot in role order that has no coordinate yet.
    pub fn first_unfilled(&self) -> Option<SlotId> {
        self.slots
            .iter()
            .find(|slot| slot.coordinate.is_none())
            .map(|slot| slot.id)
    }

    /// Present coordinates in route order. Unfilled slots are skipped, so
    /// callers must check for at least two entries before routing.
    pub fn snapshot_ordered_coordinates(&self) -> Vec<Coordinate> {
        self.slots.iter().filter_map(|slot| slot.coordinate).collect()
    }

    /// 1-based display index per slot, Start = 1.
    pub fn reindex(&self) -> BTreeMap<SlotId, usize> {
        self.slots
            .iter()
            .enumerate()
            .map(|(idx, slot)| (slot.id, idx + 1))
            .collect()
    }

    pub(crate) fn set_coordinate(
        &mut self,
        id: SlotId,
        coord: Coordinate,
    ) -> Result<(), WaypointError> {
        self.slot_mut(id)?.coordinate = Some(coord);
        Ok(())
    }

    pub(crate) fn clear_coordinate(&mut self, id: SlotId) -> Result<(), WaypointError> {
        self.slot_mut(id)?.coordinate = None;
        Ok(())
    }

    /// Inserts an empty Via directly after `after`. Inserting after Start
    /// puts the new slot first among the Via slots.
    pub(crate) fn insert_via(&mut self, after: SlotId) -> Result<SlotId, WaypointError> {
        let idx = self
            .position(after)
            .ok_or(WaypointError::InvalidPosition(after))?;
        if self.slots[idx].role == WaypointRole::End {
            return Err(WaypointError::InvalidPosition(after));
        }
        let slot = self.allocate(WaypointRole::Via);
        let id = slot.id;
        self.slots.insert(idx + 1, slot);
        Ok(id)
    }

    /// Inserts an empty Via directly before End.
    pub(crate) fn append_via(&mut self) -> SlotId {
        let slot = self.allocate(WaypointRole::Via);
        let id = slot.id;
        let end = self.slots.len() - 1;
        self.slots.insert(end, slot);
        id
    }

    /// Removes a slot. Removing a terminal promotes its neighbouring Via;
    /// with no Via left to promote the removal is refused.
    pub(crate) fn remove_slot(&mut self, id: SlotId) -> Result<WaypointSlot, WaypointError> {
        let idx = self.position(id).ok_or(WaypointError::UnknownSlot(id))?;
        let role = self.slots[idx].role;
        if role != WaypointRole::Via && self.via_count() == 0 {
            return Err(WaypointError::CannotRemoveTerminal(id));
        }

        let removed = self.slots.remove(idx);
        self.assign_roles();
        Ok(removed)
    }

    /// Moves a slot to `to_index` (0-based, clamped) and reassigns roles by
    /// position.
    pub(crate) fn move_slot(&mut self, id: SlotId, to_index: usize) -> Result<(), WaypointError> {
        let idx = self.position(id).ok_or(WaypointError::UnknownSlot(id))?;
        let slot = self.slots.remove(idx);
        let to_index = to_index.min(self.slots.len());
        self.slots.insert(to_index, slot);
        self.assign_roles();
        Ok(())
    }

    /// Grows or shrinks the Via section to exactly `count` slots. Shrinking
    /// drops Via slots from the end.
    pub(crate) fn set_via_count(&mut self, count: usize) {
        while self.via_count() < count {
            self.append_via();
        }
        while self.via_count() > count {
            let last_via = self.slots.len() - 2;
            self.slots.remove(last_via);
        }
    }

    /// Back to the empty route. The terminal slots keep their ids.
    pub(crate) fn clear(&mut self) {
        let start = self.start_id();
        let end = self.end_id();
        self.slots.retain(|slot| slot.id == start || slot.id == end);
        for slot in &mut self.slots {
            slot.coordinate = None;
        }
    }

    /// Clears the list and refills it from `coords`: first is Start, last is
    /// End, the rest become fresh Via slots. Fewer than two coordinates
    /// leave the remaining terminal unfilled.
    pub(crate) fn replace_all(&mut self, coords: &[Coordinate]) {
        self.clear();
        let Some((first, rest)) = coords.split_first() else {
            return;
        };
        self.slots[0].coordinate = Some(*first);

        let Some((last, middle)) = rest.split_last() else {
            return;
        };
        for coord in middle {
            let id = self.append_via();
            if let Ok(slot) = self.slot_mut(id) {
                slot.coordinate = Some(*coord);
            }
        }
        let end = self.slots.len() - 1;
        self.slots[end].coordinate = Some(*last);
    }

    fn allocate(&mut self, role: WaypointRole) -> WaypointSlot {
        let id = SlotId(self.next_id);
        self.next_id += 1;
        WaypointSlot {
            id,
            role,
            coordinate: None,
        }
    }

    fn slot_mut(&mut self, id: SlotId) -> Result<&mut WaypointSlot, WaypointError> {
        self.slots
            .iter_mut()
            .find(|slot| slot.id == id)
            .ok_or(WaypointError::UnknownSlot(id))
    }

    fn assign_roles(&mut self) {
        let last = self.slots.len() - 1;
        for (idx, slot) in self.slots.iter_mut().enumerate() {
            slot.role = match idx {
                0 => WaypointRole::Start,
                i if i == last => WaypointRole::End,
                _ => WaypointRole::Via,
            };
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coord(lon: f64, lat: f64) -> Coordinate {
        Coordinate::new(lon, lat).unwrap()
    }

    fn roles(store: &WaypointStore) -> Vec<WaypointRole> {
        store.slots().iter().map(|slot| slot.role).collect()
    }

    #[test]
    fn test_init_empty_has_two_unfilled_terminals() {
        let store = WaypointStore::init_empty();
        assert_eq!(roles(&store), vec![WaypointRole::Start, WaypointRole::End]);
        assert_eq!(store.slot_count(), 2);
        assert!(store.has_no_coordinates());
        assert!(store.snapshot_ordered_coordinates().is_empty());
        assert_ne!(store.start_id(), store.end_id());
    }

    #[test]
    fn test_set_coordinate_unknown_slot() {
        let mut store = WaypointStore::new();
        let missing = SlotId(99);
        assert_eq!(
            store.set_coordinate(missing, coord(1.0, 1.0)),
            Err(WaypointError::UnknownSlot(missing))
        );
    }

    #[test]
    fn test_insert_via_after_start_goes_first() {
        let mut store = WaypointStore::new();
        let a = store.append_via();
        let b = store.insert_via(store.start_id()).unwrap();
        let ids: Vec<SlotId> = store.slots().iter().map(|slot| slot.id).collect();
        assert_eq!(ids, vec![store.start_id(), b, a, store.end_id()]);
    }

    #[test]
    fn test_insert_via_after_end_is_invalid() {
        let mut store = WaypointStore::new();
        let end = store.end_id();
        assert_eq!(store.insert_via(end), Err(WaypointError::InvalidPosition(end)));
        assert_eq!(
            store.insert_via(SlotId(42)),
            Err(WaypointError::InvalidPosition(SlotId(42)))
        );
    }

    #[test]
    fn test_remove_terminal_without_via_fails() {
        let mut store = WaypointStore::new();
        let start = store.start_id();
        assert_eq!(
            store.remove_slot(start),
            Err(WaypointError::CannotRemoveTerminal(start))
        );
        assert_eq!(store.slot_count(), 2);
    }

    #[test]
    fn test_remove_terminal_promotes_neighbour() {
        let mut store = WaypointStore::new();
        let via = store.append_via();
        store.set_coordinate(via, coord(2.0, 2.0)).unwrap();
        let start = store.start_id();
        store.remove_slot(start).unwrap();
        assert_eq!(store.start_id(), via);
        assert_eq!(roles(&store), vec![WaypointRole::Start, WaypointRole::End]);
    }

    #[test]
    fn test_remove_via_keeps_ids() {
        let mut store = WaypointStore::new();
        let a = store.append_via();
        let b = store.append_via();
        let c = store.append_via();
        store.remove_slot(b).unwrap();

        let index = store.reindex();
        assert_eq!(index[&a], 2);
        assert_eq!(index[&c], 3);
        assert!(!index.contains_key(&b));

        // Fresh ids never reuse a removed one.
        let d = store.append_via();
        assert_ne!(d, b);
    }

    #[test]
    fn test_snapshot_skips_unfilled() {
        let mut store = WaypointStore::new();
        let via = store.append_via();
        store.set_coordinate(store.end_id(), coord(3.0, 3.0)).unwrap();
        store.set_coordinate(via, coord(2.0, 2.0)).unwrap();
        assert_eq!(
            store.snapshot_ordered_coordinates(),
            vec![coord(2.0, 2.0), coord(3.0, 3.0)]
        );
        assert_eq!(store.first_unfilled(), Some(store.start_id()));
    }

    #[test]
    fn test_move_slot_reassigns_roles() {
        let mut store = WaypointStore::new();
        let via = store.append_via();
        let old_start = store.start_id();
        store.move_slot(via, 0).unwrap();
        assert_eq!(store.start_id(), via);
        assert_eq!(store.get(old_start).unwrap().role, WaypointRole::Via);
        assert_eq!(roles(&store).len(), 3);
    }

    #[test]
    fn test_set_via_count() {
        let mut store = WaypointStore::new();
        store.set_via_count(3);
        assert_eq!(store.via_count(), 3);
        let first_via = store.slots()[1].id;
        store.set_via_count(1);
        assert_eq!(store.via_count(), 1);
        assert_eq!(store.slots()[1].id, first_via);
    }

    #[test]
    fn test_clear_keeps_terminal_ids() {
        let mut store = WaypointStore::new();
        let start = store.start_id();
        let end = store.end_id();
        store.append_via();
        store.set_coordinate(start, coord(1.0, 1.0)).unwrap();
        store.clear();
        assert_eq!(store.slot_count(), 2);
        assert_eq!((store.start_id(), store.end_id()), (start, end));
        assert!(store.has_no_coordinates());
    }

    #[test]
    fn test_replace_all() {
        let mut store = WaypointStore::new();
        let coords = vec![coord(1.0, 1.0), coord(2.0, 2.0), coord(3.0, 3.0), coord(4.0, 4.0)];
        store.replace_all(&coords);
        assert_eq!(store.slot_count(), 4);
        assert_eq!(store.snapshot_ordered_coordinates(), coords);
        assert_eq!(
            roles(&store),
            vec![
                WaypointRole::Start,
                WaypointRole::Via,
                WaypointRole::Via,
                WaypointRole::End
            ]
        );
    }
}
