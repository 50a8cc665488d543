//! Map widget boundary
//!
//! The widget draws icons and moves the viewport. It never owns report data;
//! handles are looked up by report id in the registry, not the reverse.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing::debug;

use crate::model::{Glyph, Location};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MarkerHandle(pub u64);

pub trait MapWidget: Send + Sync {
    fn place_marker(&self, location: Location, glyph: Glyph) -> MarkerHandle;
    fn remove_marker(&self, handle: MarkerHandle);
    fn set_view(&self, center: Location, zoom: u8);
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlacedMarker {
    pub location: Location,
    pub glyph: Glyph,
}

/// In-process widget that remembers what is on screen. Backs the console
/// client and the tests.
#[derive(Default)]
pub struct RecordingMap {
    next: AtomicU64,
    markers: Mutex<HashMap<MarkerHandle, PlacedMarker>>,
    view: Mutex<Option<(Location, u8)>>,
}

impl RecordingMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn marker_count(&self) -> usize {
        self.markers.lock().map(|m| m.len()).unwrap_or(0)
    }

    pub fn marker(&self, handle: MarkerHandle) -> Option<PlacedMarker> {
        self.markers.lock().ok().and_then(|m| m.get(&handle).cloned())
    }

    pub fn markers_with(&self, glyph: Glyph) -> usize {
        self.markers
            .lock()
            .map(|m| m.values().filter(|p| p.glyph == glyph).count())
            .unwrap_or(0)
    }

    pub fn view(&self) -> Option<(Location, u8)> {
        self.view.lock().ok().and_then(|v| *v)
    }
}

impl MapWidget for RecordingMap {
    fn place_marker(&self, location: Location, glyph: Glyph) -> MarkerHandle {
        let handle = MarkerHandle(self.next.fetch_add(1, Ordering::SeqCst));
        if let Ok(mut markers) = self.markers.lock() {
            markers.insert(handle, PlacedMarker { location, glyph });
        }
        debug!("map: placed {} {} at {}", glyph.icon, glyph.label, location);
        handle
    }

    fn remove_marker(&self, handle: MarkerHandle) {
        if let Ok(mut markers) = self.markers.lock() {
            markers.remove(&handle);
        }
        debug!("map: removed marker {:?}", handle);
    }

    fn set_view(&self, center: Location, zoom: u8) {
        if let Ok(mut view) = self.view.lock() {
            *view = Some((center, zoom));
        }
        debug!("map: view {} zoom {}", center, zoom);
    }
}
