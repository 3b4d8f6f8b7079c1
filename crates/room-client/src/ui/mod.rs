//! Rendering layer.
//!
//! The client renders into [`Surface`]s handed out by a [`Canvas`]: one main
//! slot plus one thumbnail tile per participant. Surfaces only hold media
//! elements; layout beyond that belongs to the host.

pub mod stage;

pub use stage::Stage;

use crate::sdk::MediaElement;

use common::types::{ElementId, ParticipantSid};
use std::fmt;
use std::sync::Arc;

/// Thumbnail tile key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TileKey {
    Local,
    Remote(ParticipantSid),
}

/// A rendering slot on the canvas.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    /// Primary viewing area, occupied by the pinned participant.
    Main,
    Thumbnail(TileKey),
}

/// A container that holds rendered media elements.
pub trait Surface: Send + Sync + fmt::Debug {
    /// Mount an element.
    fn append(&self, element: MediaElement);

    /// Remove one element. Returns false if it was not mounted.
    fn remove(&self, element: &ElementId) -> bool;

    /// Strip every media element still mounted. Returns how many were removed.
    fn clear_media(&self) -> usize;
}

/// Hands out the surface backing each slot.
pub trait Canvas: Send + Sync + fmt::Debug {
    fn surface(&self, slot: &Slot) -> Arc<dyn Surface>;
}
