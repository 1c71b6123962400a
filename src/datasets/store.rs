//! Keyed per-level dataset store
//!
//! Entries are keyed by `(level, component)` and written one key at a time, so
//! completions for different keys never overwrite each other. An entry, once
//! written, is never replaced or removed.

use crate::core::lod::Level;
use crate::data::population::PopulationDataset;
use crate::data::region::BoundaryDataset;
use fxhash::FxHashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// The two independently loaded halves of a level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Component {
    Boundaries,
    Population,
}

impl Component {
    pub const ALL: [Component; 2] = [Component::Boundaries, Component::Population];
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Component::Boundaries => "boundaries",
            Component::Population => "population",
        })
    }
}

/// A decoded component, shared with every reader
#[derive(Debug, Clone)]
pub enum ComponentData {
    Boundaries(Arc<BoundaryDataset>),
    Population(Arc<PopulationDataset>),
}

impl ComponentData {
    pub fn component(&self) -> Component {
        match self {
            ComponentData::Boundaries(_) => Component::Boundaries,
            ComponentData::Population(_) => Component::Population,
        }
    }
}

/// Both components of a level, available together
#[derive(Debug, Clone)]
pub struct ReadyLevel {
    pub level: Level,
    pub boundaries: Arc<BoundaryDataset>,
    pub population: Arc<PopulationDataset>,
}

#[derive(Debug, Default)]
pub struct DatasetStore {
    entries: Mutex<FxHashMap<(Level, Component), ComponentData>>,
}

impl DatasetStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, FxHashMap<(Level, Component), ComponentData>> {
        // entries are insert-only, so a poisoned map is still consistent
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Inserts the entry for its own key only. Returns `false` and keeps the
    /// existing value when the key is already present.
    pub fn merge(&self, level: Level, data: ComponentData) -> bool {
        let key = (level, data.component());
        let mut entries = self.lock();
        if entries.contains_key(&key) {
            log::debug!("{} {} already cached, keeping existing entry", level, key.1);
            return false;
        }
        entries.insert(key, data);
        true
    }

    pub fn contains(&self, level: Level, component: Component) -> bool {
        self.lock().contains_key(&(level, component))
    }

    pub fn boundaries(&self, level: Level) -> Option<Arc<BoundaryDataset>> {
        match self.lock().get(&(level, Component::Boundaries)) {
            Some(ComponentData::Boundaries(data)) => Some(Arc::clone(data)),
            _ => None,
        }
    }

    pub fn population(&self, level: Level) -> Option<Arc<PopulationDataset>> {
        match self.lock().get(&(level, Component::Population)) {
            Some(ComponentData::Population(data)) => Some(Arc::clone(data)),
            _ => None,
        }
    }

    /// Both components, or `None` while either is missing
    pub fn ready(&self, level: Level) -> Option<ReadyLevel> {
        let entries = self.lock();
        let boundaries = match entries.get(&(level, Component::Boundaries)) {
            Some(ComponentData::Boundaries(data)) => Arc::clone(data),
            _ => return None,
        };
        let population = match entries.get(&(level, Component::Population)) {
            Some(ComponentData::Population(data)) => Arc::clone(data),
            _ => return None,
        };
        Some(ReadyLevel {
            level,
            boundaries,
            population,
        })
    }

    pub fn is_ready(&self, level: Level) -> bool {
        let entries = self.lock();
        Component::ALL
            .iter()
            .all(|component| entries.contains_key(&(level, *component)))
    }

    /// Components currently held for `level`
    pub fn present(&self, level: Level) -> Vec<Component> {
        let entries = self.lock();
        Component::ALL
            .into_iter()
            .filter(|component| entries.contains_key(&(level, *component)))
            .collect()
    }
}
