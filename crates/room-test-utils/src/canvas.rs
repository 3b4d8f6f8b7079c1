//! Fake rendering surfaces.

use common::types::ElementId;
use room_client::sdk::{ElementLayout, MediaElement};
use room_client::ui::{Canvas, Slot, Surface};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Fake surface recording mounted elements.
#[derive(Debug, Default)]
pub struct FakeSurface {
    elements: Mutex<Vec<MediaElement>>,
    appends: AtomicUsize,
}

impl FakeSurface {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Elements currently mounted.
    pub fn elements(&self) -> Vec<MediaElement> {
        self.elements.lock().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.elements.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total number of `append` calls.
    pub fn append_calls(&self) -> usize {
        self.appends.load(Ordering::SeqCst)
    }

    /// Whether every mounted element fills its container.
    pub fn all_fill_container(&self) -> bool {
        self.elements
            .lock()
            .unwrap()
            .iter()
            .all(|e| e.layout == ElementLayout::FillCover)
    }
}

impl Surface for FakeSurface {
    fn append(&self, element: MediaElement) {
        self.appends.fetch_add(1, Ordering::SeqCst);
        self.elements.lock().unwrap().push(element);
    }

    fn remove(&self, element: &ElementId) -> bool {
        let mut elements = self.elements.lock().unwrap();
        let before = elements.len();
        elements.retain(|e| &e.id != element);
        elements.len() != before
    }

    fn clear_media(&self) -> usize {
        let mut elements = self.elements.lock().unwrap();
        let count = elements.len();
        elements.clear();
        count
    }
}

/// Fake canvas creating one surface per slot on first use.
#[derive(Debug, Default)]
pub struct FakeCanvas {
    surfaces: Mutex<HashMap<Slot, Arc<FakeSurface>>>,
}

impl FakeCanvas {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// The fake behind `slot`, created if needed.
    pub fn surface_for(&self, slot: &Slot) -> Arc<FakeSurface> {
        self.surfaces
            .lock()
            .unwrap()
            .entry(slot.clone())
            .or_insert_with(FakeSurface::new)
            .clone()
    }

    /// Number of elements mounted in `slot`.
    pub fn element_count(&self, slot: &Slot) -> usize {
        self.surface_for(slot).len()
    }

    /// Number of elements mounted across every slot.
    pub fn total_elements(&self) -> usize {
        self.surfaces
            .lock()
            .unwrap()
            .values()
            .map(|surface| surface.len())
            .sum()
    }
}

impl Canvas for FakeCanvas {
    fn surface(&self, slot: &Slot) -> Arc<dyn Surface> {
        self.surface_for(slot)
    }
}
