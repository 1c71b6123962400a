//! Level-of-detail selection
//!
//! Maps the continuous viewport zoom onto a discrete administrative level and
//! folds both transition triggers (zoom changes and region selections) into a
//! single transition function.

use crate::core::constants::{REGION_ZOOM_THRESHOLD, SUBREGION_ZOOM_THRESHOLD};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Administrative granularity, ordered coarsest to finest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[serde(alias = "ADM0")]
    Country,
    #[serde(alias = "ADM1")]
    Region,
    #[serde(alias = "ADM2")]
    Subregion,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Country, Level::Region, Level::Subregion];

    /// geoBoundaries administrative code for this level
    pub fn code(&self) -> &'static str {
        match self {
            Level::Country => "ADM0",
            Level::Region => "ADM1",
            Level::Subregion => "ADM2",
        }
    }

    /// The next finer level, if any
    pub fn finer(&self) -> Option<Level> {
        match self {
            Level::Country => Some(Level::Region),
            Level::Region => Some(Level::Subregion),
            Level::Subregion => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Level::Country => "country",
            Level::Region => "region",
            Level::Subregion => "subregion",
        };
        f.write_str(name)
    }
}

/// Derives the level for a zoom value.
///
/// `zoom > 7` is a subregion, `4 < zoom <= 7` a region, anything else a country.
pub fn derive_level(zoom: f64) -> Level {
    if zoom > SUBREGION_ZOOM_THRESHOLD {
        Level::Subregion
    } else if zoom > REGION_ZOOM_THRESHOLD {
        Level::Region
    } else {
        Level::Country
    }
}

/// Input to the level state machine
#[derive(Debug, Clone, PartialEq)]
pub enum LevelEvent {
    /// The viewport finished zooming
    ZoomChanged(f64),
    /// The user selected a feature; carries its country-code-like property, if any
    RegionSelected(Option<String>),
}

/// What caused a level change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionTrigger {
    Zoom,
    Selection,
}

/// A level change emitted by [`LevelOfDetailManager::apply`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelTransition {
    pub from: Level,
    pub to: Level,
    pub trigger: TransitionTrigger,
}

/// Pure transition function: next level given the current one and an event.
///
/// A selection whose code satisfies `expands` descends one level regardless of
/// zoom; any other selection leaves the level unchanged.
pub fn transition<F>(current: Level, event: &LevelEvent, expands: F) -> Level
where
    F: Fn(&str) -> bool,
{
    match event {
        LevelEvent::ZoomChanged(zoom) => derive_level(*zoom),
        LevelEvent::RegionSelected(Some(code)) if expands(code) => {
            current.finer().unwrap_or(current)
        }
        LevelEvent::RegionSelected(_) => current,
    }
}

type ExpandPredicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Tracks the active level and reports transitions
pub struct LevelOfDetailManager {
    active: Level,
    expands: ExpandPredicate,
}

impl LevelOfDetailManager {
    /// Starts at the level derived from the initial zoom, with no expand codes
    pub fn new(initial_zoom: f64) -> Self {
        Self {
            active: derive_level(initial_zoom),
            expands: Box::new(|_| false),
        }
    }

    /// Sets the predicate deciding which selected codes force a finer level
    pub fn with_expand_predicate<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        self.expands = Box::new(predicate);
        self
    }

    pub fn active(&self) -> Level {
        self.active
    }

    /// Applies an event; returns a transition only when the level actually changes
    pub fn apply(&mut self, event: &LevelEvent) -> Option<LevelTransition> {
        let next = transition(self.active, event, |code| (self.expands)(code));
        if next == self.active {
            return None;
        }

        let trigger = match event {
            LevelEvent::ZoomChanged(_) => TransitionTrigger::Zoom,
            LevelEvent::RegionSelected(_) => TransitionTrigger::Selection,
        };
        let change = LevelTransition {
            from: self.active,
            to: next,
            trigger,
        };
        log::info!("level {} -> {} ({:?})", change.from, change.to, trigger);
        self.active = next;
        Some(change)
    }
}

impl fmt::Debug for LevelOfDetailManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LevelOfDetailManager")
            .field("active", &self.active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derive_level_thresholds() {
        assert_eq!(derive_level(0.0), Level::Country);
        assert_eq!(derive_level(4.0), Level::Country);
        assert_eq!(derive_level(4.01), Level::Region);
        assert_eq!(derive_level(7.0), Level::Region);
        assert_eq!(derive_level(7.01), Level::Subregion);
        assert_eq!(derive_level(18.0), Level::Subregion);
    }

    #[test]
    fn test_level_order_and_finer() {
        assert!(Level::Country < Level::Region);
        assert!(Level::Region < Level::Subregion);
        assert_eq!(Level::Country.finer(), Some(Level::Region));
        assert_eq!(Level::Subregion.finer(), None);
    }

    #[test]
    fn test_zoom_within_level_emits_nothing() {
        let mut lod = LevelOfDetailManager::new(5.0);
        assert_eq!(lod.active(), Level::Region);
        assert_eq!(lod.apply(&LevelEvent::ZoomChanged(6.0)), None);
        assert_eq!(lod.apply(&LevelEvent::ZoomChanged(7.0)), None);

        let change = lod.apply(&LevelEvent::ZoomChanged(8.0)).unwrap();
        assert_eq!(change.from, Level::Region);
        assert_eq!(change.to, Level::Subregion);
        assert_eq!(change.trigger, TransitionTrigger::Zoom);
    }

    #[test]
    fn test_selection_expands_regardless_of_zoom() {
        let mut lod = LevelOfDetailManager::new(2.0).with_expand_predicate(|code| code == "US");

        assert_eq!(lod.apply(&LevelEvent::RegionSelected(Some("FR".into()))), None);
        assert_eq!(lod.apply(&LevelEvent::RegionSelected(None)), None);

        let change = lod
            .apply(&LevelEvent::RegionSelected(Some("US".into())))
            .unwrap();
        assert_eq!(change.to, Level::Region);
        assert_eq!(change.trigger, TransitionTrigger::Selection);

        // zoom is still authoritative on the next zoom event
        let change = lod.apply(&LevelEvent::ZoomChanged(3.0)).unwrap();
        assert_eq!(change.to, Level::Country);
    }

    #[test]
    fn test_selection_at_finest_level_stays() {
        let next = transition(
            Level::Subregion,
            &LevelEvent::RegionSelected(Some("US".into())),
            |_| true,
        );
        assert_eq!(next, Level::Subregion);
    }

    #[test]
    fn test_level_serde_accepts_adm_codes() {
        let level: Level = serde_json::from_str("\"ADM2\"").unwrap();
        assert_eq!(level, Level::Subregion);
        let level: Level = serde_json::from_str("\"country\"").unwrap();
        assert_eq!(level, Level::Country);
        assert_eq!(Level::Region.code(), "ADM1");
    }
}
