//! Viewport-driven choropleth controller
//!
//! Wires viewport events to the level manager, loads the active level through
//! the dataset cache, styles every region and reports the region under the
//! viewport center. Failures become sink notices; nothing here is fatal.
//!
//! Events never wait for a load. A transition to a level that is not ready
//! yet leaves a pending load behind; it is rendered once it finishes, either
//! on the next event or when [`ChoroplethMap::settle`] is awaited. A pending
//! load that the viewport has moved away from is dropped, but the retrievals
//! it started keep running and their results are still cached.

use crate::core::config::{ChoroplethConfig, ExpandPolicy};
use crate::core::geo::LatLng;
use crate::core::lod::{Level, LevelEvent, LevelOfDetailManager, LevelTransition};
use crate::core::viewport::{Viewport, ViewportEvent};
use crate::data::region::{property_string, Region};
use crate::datasets::cache::{DatasetCache, LevelLoadError};
use crate::datasets::retrieval::Retriever;
use crate::datasets::store::ReadyLevel;
use crate::spatial::locator::PointLocator;
use crate::style::choropleth::ChoroplethStyler;
use crate::traits::{Diagnostic, RenderSink};
use crate::Result;
use futures::future::{BoxFuture, FutureExt};
use std::sync::Arc;

type LoadResult = std::result::Result<ReadyLevel, LevelLoadError>;

/// A level load the controller is waiting on
struct PendingLoad {
    level: Level,
    load: BoxFuture<'static, LoadResult>,
}

pub struct ChoroplethMap<S: RenderSink> {
    viewport: Viewport,
    lod: LevelOfDetailManager,
    cache: DatasetCache,
    styler: ChoroplethStyler,
    expand: ExpandPolicy,
    pending: Option<PendingLoad>,
    sink: S,
}

impl<S: RenderSink> ChoroplethMap<S> {
    pub fn new(config: &ChoroplethConfig, retriever: Arc<dyn Retriever>, sink: S) -> Result<Self> {
        config.validate()?;
        let cache = DatasetCache::new(config, retriever);
        Self::with_cache(config, cache, sink)
    }

    /// Builds a controller over an existing cache, e.g. one shared with a prefetcher
    pub fn with_cache(config: &ChoroplethConfig, cache: DatasetCache, sink: S) -> Result<Self> {
        config.validate()?;

        let mut viewport = Viewport::new(config.initial_view.center(), config.initial_view.zoom);
        viewport.set_zoom_limits(config.min_zoom, config.max_zoom);
        let lod = LevelOfDetailManager::new(viewport.zoom)
            .with_expand_predicate(config.expand.predicate());

        Ok(Self {
            viewport,
            lod,
            cache,
            styler: ChoroplethStyler::from_palette(config.palette.clone()),
            expand: config.expand.clone(),
            pending: None,
            sink,
        })
    }

    /// Loads and renders the initial level
    pub async fn start(&mut self) -> bool {
        log::info!(
            "starting at zoom {} ({} level)",
            self.viewport.zoom,
            self.lod.active()
        );
        self.refresh().await
    }

    /// Applies one viewport event without waiting for any retrieval.
    ///
    /// Returns the level transition it caused, if any. The new level is
    /// rendered right away when it is cached, otherwise its load is started
    /// and left pending.
    pub fn handle_event(&mut self, event: ViewportEvent) -> Option<LevelTransition> {
        self.poll_pending();

        let transition = match event {
            ViewportEvent::ZoomChanged { zoom } => {
                self.viewport.set_zoom(zoom);
                self.lod.apply(&LevelEvent::ZoomChanged(self.viewport.zoom))
            }
            ViewportEvent::CenterChanged { lat, lon } => {
                self.viewport.set_center(LatLng::new(lat, lon));
                self.locate_center();
                None
            }
            ViewportEvent::FeatureSelected { properties } => {
                let code = properties
                    .get(&self.expand.code_property)
                    .and_then(property_string);
                log::debug!("selected feature with code {:?}", code);
                self.lod.apply(&LevelEvent::RegionSelected(code))
            }
        };

        if let Some(transition) = &transition {
            self.activate(transition.to);
        }
        transition
    }

    /// Starts loading the active level and waits until it is rendered or has
    /// failed. Returns whether the level was rendered.
    pub async fn refresh(&mut self) -> bool {
        self.activate(self.lod.active());
        self.settle().await
    }

    /// Waits for the pending load, if any, and renders it. Returns whether the
    /// active level is rendered from cached data.
    pub async fn settle(&mut self) -> bool {
        if let Some(PendingLoad { level, load }) = self.pending.take() {
            let result = load.await;
            self.finish(level, result);
        }
        self.cache.is_ready(self.lod.active())
    }

    /// Level whose load is still outstanding
    pub fn pending_level(&self) -> Option<Level> {
        self.pending.as_ref().map(|pending| pending.level)
    }

    fn activate(&mut self, level: Level) {
        if let Some(stale) = self.pending.take() {
            log::debug!("no longer waiting on {} level", stale.level);
        }

        if let Some(ready) = self.cache.ready(level) {
            self.render(&ready);
            return;
        }

        let cache = self.cache.clone();
        self.pending = Some(PendingLoad {
            level,
            load: async move { cache.ensure_level(level).await }.boxed(),
        });
        // first poll issues the retrievals
        self.poll_pending();
    }

    /// Finishes the pending load if it is already done, without blocking
    fn poll_pending(&mut self) {
        let finished = match self.pending.as_mut() {
            Some(pending) => pending
                .load
                .as_mut()
                .now_or_never()
                .map(|result| (pending.level, result)),
            None => None,
        };
        if let Some((level, result)) = finished {
            self.pending = None;
            self.finish(level, result);
        }
    }

    fn finish(&mut self, level: Level, result: LoadResult) {
        match result {
            Ok(ready) if level == self.lod.active() => self.render(&ready),
            Ok(_) => log::debug!("{} level loaded after the viewport moved on", level),
            Err(err) => {
                log::warn!("{}", err);
                for diagnostic in Diagnostic::from_load_error(&err) {
                    self.sink.notice(&diagnostic);
                }
            }
        }
    }

    fn render(&mut self, ready: &ReadyLevel) {
        self.sink.clear(ready.level);
        for region in ready.boundaries.regions() {
            let style = self.styler.style_for(region, &ready.population);
            let label = self.styler.label_for(region, &ready.population);
            self.sink.draw_region(region, &style, &label);
        }
        log::debug!("rendered {} {} regions", ready.boundaries.len(), ready.level);
        self.report_center(ready);
    }

    /// Re-runs the center lookup on the active level, when it is ready
    pub fn locate_center(&mut self) {
        if let Some(ready) = self.cache.ready(self.lod.active()) {
            self.report_center(&ready);
        }
    }

    fn report_center(&mut self, ready: &ReadyLevel) {
        let found = PointLocator::locate_in(&self.viewport.center, &ready.boundaries);
        match found {
            Some(region) => log::debug!("center is in {}", region.display_name),
            None => log::debug!("center is in no {} region", ready.level),
        }
        self.sink.center_region(ready.level, found);
    }

    /// The active-level region containing `point`, if the level is ready
    pub fn region_at(&self, point: &LatLng) -> Option<Region> {
        let ready = self.cache.ready(self.lod.active())?;
        PointLocator::locate_in(point, &ready.boundaries).cloned()
    }

    pub fn active_level(&self) -> Level {
        self.lod.active()
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn cache(&self) -> &DatasetCache {
        &self.cache
    }

    pub fn styler(&self) -> &ChoroplethStyler {
        &self.styler
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }
}

impl<S: RenderSink + std::fmt::Debug> std::fmt::Debug for ChoroplethMap<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChoroplethMap")
            .field("viewport", &self.viewport)
            .field("lod", &self.lod)
            .field("cache", &self.cache)
            .field("pending", &self.pending_level())
            .field("sink", &self.sink)
            .finish_non_exhaustive()
    }
}
