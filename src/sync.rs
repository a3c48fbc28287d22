//! Keeps the waypoint store, the input fields and the map markers in step.
//!
//! Every change enters through [`WaypointSync::dispatch`]. A handled event
//! mutates the store at most once and then re-renders each view that did
//! not originate the change, so an edit is never echoed back into the view
//! the user is working in.

use thiserror::Error;
use tracing::debug;

use crate::coordinate::{self, Coordinate, CoordinateError};
use crate::traits::{InputView, MarkerView, NoopView, SlotView};
use crate::waypoints::{SlotId, WaypointError, WaypointStore};

/// Where a map click should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickTarget {
    /// Behave like a drag of this slot's marker.
    Slot(SlotId),
    /// Fill the first unfilled slot, or add a Via before End.
    Auto,
}

#[derive(Debug, Clone, PartialEq)]
pub enum WaypointEvent {
    WaypointEdited { slot: SlotId, text: String },
    MarkerDragged { slot: SlotId, to: Coordinate },
    MapClicked { at: Coordinate, target: ClickTarget },
    ViaInserted { after: SlotId },
    ViaAppended,
    SlotRemoved { slot: SlotId },
    SlotMoved { slot: SlotId, to_index: usize },
    ViaCountSet { count: usize },
    Cleared,
    ImportRequested { coordinates: Vec<Coordinate> },
}

/// What a handled event did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reaction {
    /// Slot created or filled by the event, when there is one.
    pub slot: Option<SlotId>,
    /// The routable coordinate sequence differs from before the event.
    pub coordinates_changed: bool,
}

impl Reaction {
    /// An auto-requery is worth considering only if the route input moved.
    pub fn wants_requery(&self) -> bool {
        self.coordinates_changed
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SyncError {
    #[error("invalid coordinate for {slot}: {source}")]
    Validation {
        slot: SlotId,
        #[source]
        source: CoordinateError,
    },

    #[error(transparent)]
    Store(#[from] WaypointError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Origin {
    Inputs,
    Markers,
    Elsewhere,
}

pub struct WaypointSync {
    store: WaypointStore,
    inputs: Box<dyn InputView>,
    markers: Box<dyn MarkerView>,
}

impl Default for WaypointSync {
    fn default() -> Self {
        Self::new(Box::new(NoopView), Box::new(NoopView))
    }
}

impl WaypointSync {
    pub fn new(inputs: Box<dyn InputView>, markers: Box<dyn MarkerView>) -> Self {
        Self {
            store: WaypointStore::init_empty(),
            inputs,
            markers,
        }
    }

    pub fn store(&self) -> &WaypointStore {
        &self.store
    }

    /// Applies one event. On error the store is untouched and no view is
    /// re-rendered.
    pub fn dispatch(&mut self, event: WaypointEvent) -> Result<Reaction, SyncError> {
        let before = self.store.snapshot_ordered_coordinates();

        let (origin, slot) = match event {
            WaypointEvent::WaypointEdited { slot, text } => {
                (Origin::Inputs, Some(self.apply_text(slot, &text)?))
            }
            WaypointEvent::MarkerDragged { slot, to } => {
                self.store.set_coordinate(slot, to)?;
                (Origin::Markers, Some(slot))
            }
            WaypointEvent::MapClicked { at, target } => {
                (Origin::Elsewhere, Some(self.apply_click(at, target)?))
            }
            WaypointEvent::ViaInserted { after } => {
                (Origin::Elsewhere, Some(self.store.insert_via(after)?))
            }
            WaypointEvent::ViaAppended => (Origin::Elsewhere, Some(self.store.append_via())),
            WaypointEvent::SlotRemoved { slot } => {
                self.store.remove_slot(slot)?;
                (Origin::Elsewhere, None)
            }
            WaypointEvent::SlotMoved { slot, to_index } => {
                self.store.move_slot(slot, to_index)?;
                (Origin::Elsewhere, Some(slot))
            }
            WaypointEvent::ViaCountSet { count } => {
                self.store.set_via_count(count);
                (Origin::Elsewhere, None)
            }
            WaypointEvent::Cleared => {
                self.store.clear();
                (Origin::Elsewhere, None)
            }
            WaypointEvent::ImportRequested { coordinates } => {
                self.store.replace_all(&coordinates);
                debug!(count = coordinates.len(), "replaced waypoints from import");
                (Origin::Elsewhere, None)
            }
        };

        let coordinates_changed = self.store.snapshot_ordered_coordinates() != before;
        self.flush(origin);

        Ok(Reaction {
            slot,
            coordinates_changed,
        })
    }

    /// A text field changed. Empty text clears the slot; unparseable text
    /// is flagged on the field and leaves the store alone.
    pub fn on_view_edited(&mut self, slot: SlotId, text: &str) -> Result<Reaction, SyncError> {
        self.dispatch(WaypointEvent::WaypointEdited {
            slot,
            text: text.to_string(),
        })
    }

    pub fn on_marker_dragged(
        &mut self,
        slot: SlotId,
        to: Coordinate,
    ) -> Result<Reaction, SyncError> {
        self.dispatch(WaypointEvent::MarkerDragged { slot, to })
    }

    pub fn on_map_clicked(
        &mut self,
        at: Coordinate,
        target: ClickTarget,
    ) -> Result<Reaction, SyncError> {
        self.dispatch(WaypointEvent::MapClicked { at, target })
    }

    /// Re-renders both views from the store. The focused input keeps its
    /// text.
    pub fn push_store_to_views(&mut self) {
        self.flush(Origin::Elsewhere);
    }

    /// The store as views see it.
    pub fn slot_views(&self) -> Vec<SlotView> {
        self.store
            .slots()
            .iter()
            .enumerate()
            .map(|(idx, slot)| SlotView {
                id: slot.id,
                role: slot.role,
                display_index: idx + 1,
                coordinate: slot.coordinate,
            })
            .collect()
    }

    fn apply_text(&mut self, slot: SlotId, text: &str) -> Result<SlotId, SyncError> {
        if self.store.get(slot).is_none() {
            return Err(WaypointError::UnknownSlot(slot).into());
        }

        if text.trim().is_empty() {
            self.store.clear_coordinate(slot)?;
            return Ok(slot);
        }

        match coordinate::parse(text) {
            Ok(coord) => {
                self.store.set_coordinate(slot, coord)?;
                Ok(slot)
            }
            Err(source) => {
                debug!(%slot, text, error = %source, "rejected waypoint text");
                self.inputs.flag_invalid(slot, &source.to_string());
                Err(SyncError::Validation { slot, source })
            }
        }
    }

    fn apply_click(&mut self, at: Coordinate, target: ClickTarget) -> Result<SlotId, SyncError> {
        let slot = match target {
            ClickTarget::Slot(slot) => slot,
            ClickTarget::Auto => match self.store.first_unfilled() {
                Some(slot) => slot,
                None => self.store.append_via(),
            },
        };
        self.store.set_coordinate(slot, at)?;
        Ok(slot)
    }

    fn flush(&mut self, origin: Origin) {
        let views = self.slot_views();
        if origin != Origin::Inputs {
            let focused = self.inputs.focused();
            self.inputs.render_fields(&views, focused);
        }
        if origin != Origin::Markers {
            self.markers.render_markers(&views);
        }
    }
}
