//! Pointer contact tracking and pan/pinch disambiguation
//!
//! Contacts are kept in insertion order. With one contact the tracker pans,
//! with exactly two it pinch-zooms about the midpoint of the pair. Any other
//! count only updates bookkeeping.
//!
//! Pinch roles: the earlier-inserted contact is the anchor unless it is the
//! one moving, in which case the roles swap. Distance and midpoint use the
//! moving contact's new position and the anchor's stored one.

use log::trace;

use super::momentum::ConfigError;
use super::state::{DirtyFlag, ViewportState};

/// Scale change per pixel of pinch distance change
pub const DEFAULT_PINCH_SENSITIVITY: f64 = 0.005;
/// Pinch distance changes at or below this many pixels are ignored
pub const DEFAULT_PINCH_DEAD_ZONE: f64 = 1.0;

/// Latest known screen position of one active contact
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PointerContact {
    pub id: i64,
    pub x: f64,
    pub y: f64,
}

impl PointerContact {
    #[must_use]
    pub fn distance_to(&self, other: &Self) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }

    #[must_use]
    pub fn midpoint(&self, other: &Self) -> (f64, f64) {
        ((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Active contacts keyed by id, in insertion order.
#[derive(Clone, Debug, Default)]
pub struct ContactMap {
    contacts: Vec<PointerContact>,
}

impl ContactMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: i64) -> Option<&PointerContact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    /// Insert a contact, or update its position in place if already present.
    pub fn upsert(&mut self, contact: PointerContact) {
        match self.contacts.iter_mut().find(|c| c.id == contact.id) {
            Some(existing) => *existing = contact,
            None => self.contacts.push(contact),
        }
    }

    pub fn remove(&mut self, id: i64) -> Option<PointerContact> {
        let index = self.contacts.iter().position(|c| c.id == id)?;
        Some(self.contacts.remove(index))
    }

    pub fn iter(&self) -> impl Iterator<Item = &PointerContact> {
        self.contacts.iter()
    }

    /// For exactly two contacts, returns `(anchor, other)` where `other` is
    /// the contact with id `moving`.
    ///
    /// If `moving` is not one of the pair the earlier-inserted contact is the
    /// anchor.
    #[must_use]
    pub fn pinch_pair(&self, moving: i64) -> Option<(PointerContact, PointerContact)> {
        let [first, second] = self.contacts.as_slice() else {
            return None;
        };
        if first.id == moving {
            Some((*second, *first))
        } else {
            Some((*first, *second))
        }
    }
}

/// Pinch baseline
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PinchState {
    /// Distance between the pair as of the last applied pinch step
    pub last_distance: Option<f64>,
}

impl PinchState {
    pub fn reset(&mut self) {
        self.last_distance = None;
    }
}

/// Tunables for pinch handling
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GestureConfig {
    /// The K in `s = 1 + delta * K`
    pinch_sensitivity: f64,
    /// Dead zone, in pixels of distance change
    pinch_dead_zone: f64,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            pinch_sensitivity: DEFAULT_PINCH_SENSITIVITY,
            pinch_dead_zone: DEFAULT_PINCH_DEAD_ZONE,
        }
    }
}

impl GestureConfig {
    pub fn new(pinch_sensitivity: f64, pinch_dead_zone: f64) -> Result<Self, ConfigError> {
        if !(pinch_sensitivity.is_finite() && pinch_sensitivity > 0.0) {
            return Err(ConfigError::PinchSensitivity(pinch_sensitivity));
        }
        if !(pinch_dead_zone.is_finite() && pinch_dead_zone >= 0.0) {
            return Err(ConfigError::DeadZone(pinch_dead_zone));
        }
        Ok(Self {
            pinch_sensitivity,
            pinch_dead_zone,
        })
    }

    #[must_use]
    pub fn pinch_sensitivity(&self) -> f64 {
        self.pinch_sensitivity
    }

    #[must_use]
    pub fn pinch_dead_zone(&self) -> f64 {
        self.pinch_dead_zone
    }
}

/// Converts contact lifecycle events into viewport mutations.
#[derive(Clone, Debug, Default)]
pub struct GestureTracker {
    contacts: ContactMap,
    pinch: PinchState,
    config: GestureConfig,
}

impl GestureTracker {
    #[must_use]
    pub fn new(config: GestureConfig) -> Self {
        Self {
            contacts: ContactMap::new(),
            pinch: PinchState::default(),
            config,
        }
    }

    #[must_use]
    pub fn active_contacts(&self) -> usize {
        self.contacts.len()
    }

    #[must_use]
    pub fn contacts(&self) -> &ContactMap {
        &self.contacts
    }

    #[must_use]
    pub fn pinch(&self) -> PinchState {
        self.pinch
    }

    #[must_use]
    pub fn config(&self) -> GestureConfig {
        self.config
    }

    /// Register a new contact. Does not touch the viewport.
    pub fn on_contact_start(&mut self, id: i64, x: f64, y: f64) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        let before = self.contacts.len();
        self.contacts.upsert(PointerContact { id, x, y });
        self.after_count_change(before);
    }

    /// Remove a contact. Unknown ids are ignored.
    pub fn on_contact_end(&mut self, id: i64) {
        let before = self.contacts.len();
        if self.contacts.remove(id).is_some() {
            self.after_count_change(before);
        }
    }

    /// Process a move for a tracked contact.
    pub fn on_contact_move(
        &mut self,
        id: i64,
        x: f64,
        y: f64,
        viewport: &mut ViewportState,
        dirty: &mut DirtyFlag,
    ) {
        if !(x.is_finite() && y.is_finite()) {
            return;
        }
        let Some(previous) = self.contacts.get(id).copied() else {
            return;
        };
        let moved = PointerContact { id, x, y };

        match self.contacts.len() {
            2 => self.pinch_step(moved, viewport, dirty),
            1 => {
                let dx = x - previous.x;
                let dy = y - previous.y;
                viewport.pan_by(dx, dy);
                dirty.mark();
                trace!("pan by ({dx}, {dy})");
            }
            _ => {}
        }

        self.contacts.upsert(moved);
    }

    fn pinch_step(
        &mut self,
        moved: PointerContact,
        viewport: &mut ViewportState,
        dirty: &mut DirtyFlag,
    ) {
        let Some((anchor, _)) = self.contacts.pinch_pair(moved.id) else {
            return;
        };
        let distance = anchor.distance_to(&moved);
        let (cx, cy) = anchor.midpoint(&moved);

        let Some(last_distance) = self.pinch.last_distance else {
            self.pinch.last_distance = Some(distance);
            trace!("pinch baseline {distance}");
            return;
        };

        let delta = distance - last_distance;
        if delta.abs() <= self.config.pinch_dead_zone {
            return;
        }

        let multiplier = 1.0 + delta * self.config.pinch_sensitivity;
        viewport.zoom_about(multiplier, cx, cy);
        self.pinch.last_distance = Some(distance);
        dirty.mark();
        trace!(
            "pinch x{multiplier} about ({cx}, {cy}) -> scale {}",
            viewport.scale()
        );
    }

    fn after_count_change(&mut self, before: usize) {
        if before == 2 && self.contacts.len() != 2 {
            self.pinch.reset();
        }
    }
}
