//! Per-arc resources kept in step with the simulation's event queue

use std::collections::HashMap;

use crate::sim::{Arc, ArcId, GlobeEvent, GlobeState};

/// One resource per active arc, created on `ArcSpawned` and handed back on
/// `ArcRemoved`
#[derive(Debug)]
pub struct ArcResources<T> {
    entries: HashMap<ArcId, T>,
}

impl<T> Default for ArcResources<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ArcResources<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Follow arc events. Spawn events for arcs already gone from `state`
    /// create nothing.
    pub fn apply(
        &mut self,
        state: &GlobeState,
        events: &[GlobeEvent],
        mut create: impl FnMut(&Arc) -> T,
        mut release: impl FnMut(T),
    ) {
        for event in events {
            match *event {
                GlobeEvent::ArcSpawned(id) => {
                    let Some(arc) = state.arc(id) else {
                        continue;
                    };
                    if let Some(old) = self.entries.insert(id, create(arc)) {
                        release(old);
                    }
                }
                GlobeEvent::ArcRemoved(id) => {
                    if let Some(resource) = self.entries.remove(&id) {
                        release(resource);
                    }
                }
                GlobeEvent::DotsPlaced { .. } => {}
            }
        }
    }

    #[inline]
    pub fn get(&self, id: ArcId) -> Option<&T> {
        self.entries.get(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Tracked ids in ascending order
    pub fn ids(&self) -> Vec<ArcId> {
        let mut ids: Vec<ArcId> = self.entries.keys().copied().collect();
        ids.sort_unstable();
        ids
    }
}
