mod support;

#[cfg(test)]
mod dataset_cache_tests {
    use super::support::{
        collection, flat_config, init_logging, rect_feature, GatedRetriever,
    };
    use choroplet::prelude::*;
    use serde_json::json;

    fn retriever() -> GatedRetriever {
        GatedRetriever::new()
            .with_document(
                "region.geojson",
                collection(vec![
                    rect_feature(json!({"name": "West"}), -125.0, 25.0, -100.0, 50.0),
                    rect_feature(json!({"name": "East"}), -100.0, 25.0, -65.0, 50.0),
                ]),
            )
            .with_document(
                "region-pop.json",
                json!([{"name": "West", "population": 100}, {"name": "East", "population": 300}]),
            )
            .with_document(
                "subregion.geojson",
                collection(vec![rect_feature(
                    json!({"name": "Kings"}),
                    -74.05,
                    40.55,
                    -73.85,
                    40.75,
                )]),
            )
            .with_document("subregion-pop.json", json!([{"name": "Kings", "population": "2559903"}]))
    }

    async fn yield_until(cache: &DatasetCache, level: Level, component: Component) {
        while !cache.store().contains(level, component) {
            tokio::task::yield_now().await;
        }
    }

    #[tokio::test]
    async fn test_second_ensure_level_issues_no_retrievals() {
        init_logging();
        let retriever = Arc::new(retriever());
        let cache = DatasetCache::new(&flat_config(&[Level::Region]), retriever.clone());

        let first = cache.ensure_level(Level::Region).await.unwrap();
        assert_eq!(first.boundaries.len(), 2);
        assert_eq!(retriever.total_calls(), 2);
        assert_eq!(cache.retrievals_issued(), 2);

        let second = cache.ensure_level(Level::Region).await.unwrap();
        assert_eq!(retriever.total_calls(), 2);
        assert!(Arc::ptr_eq(&first.boundaries, &second.boundaries));
    }

    #[tokio::test]
    async fn test_concurrent_callers_share_one_retrieval() {
        let retriever = Arc::new(retriever());
        let cache = DatasetCache::new(&flat_config(&[Level::Region]), retriever.clone());
        let gate = retriever.gate("region.geojson");

        let (a, b, _) = futures::join!(
            cache.ensure_level(Level::Region),
            cache.ensure_level(Level::Region),
            async {
                yield_until(&cache, Level::Region, Component::Population).await;
                gate.send(()).unwrap();
            }
        );

        assert!(a.is_ok() && b.is_ok());
        assert_eq!(retriever.calls_for("region.geojson"), 1);
        assert_eq!(retriever.calls_for("region-pop.json"), 1);
    }

    /// Boundary-for-region and population-for-subregion resolve in the given
    /// order; returns what the store holds afterwards.
    async fn race(region_boundaries_first: bool) -> Vec<(Level, Vec<Component>)> {
        let retriever = Arc::new(retriever());
        let cache = DatasetCache::new(
            &flat_config(&[Level::Region, Level::Subregion]),
            retriever.clone(),
        );
        let region_gate = retriever.gate("region.geojson");
        let subregion_gate = retriever.gate("subregion-pop.json");

        let (region, subregion, _) = futures::join!(
            cache.ensure_level(Level::Region),
            cache.ensure_level(Level::Subregion),
            async {
                if region_boundaries_first {
                    region_gate.send(()).unwrap();
                    yield_until(&cache, Level::Region, Component::Boundaries).await;
                    assert!(!cache.store().contains(Level::Subregion, Component::Population));
                    subregion_gate.send(()).unwrap();
                } else {
                    subregion_gate.send(()).unwrap();
                    yield_until(&cache, Level::Subregion, Component::Population).await;
                    assert!(!cache.store().contains(Level::Region, Component::Boundaries));
                    region_gate.send(()).unwrap();
                }
            }
        );

        assert!(region.is_ok(), "{:?}", region.err());
        assert!(subregion.is_ok(), "{:?}", subregion.err());

        [Level::Region, Level::Subregion]
            .into_iter()
            .map(|level| (level, cache.store().present(level)))
            .collect()
    }

    #[tokio::test]
    async fn test_racing_completions_are_both_kept() {
        init_logging();
        let boundaries_first = race(true).await;
        let population_first = race(false).await;

        let everything = vec![
            (Level::Region, vec![Component::Boundaries, Component::Population]),
            (Level::Subregion, vec![Component::Boundaries, Component::Population]),
        ];
        assert_eq!(boundaries_first, everything);
        assert_eq!(population_first, everything);
    }

    #[tokio::test]
    async fn test_failed_component_is_recoverable() {
        let retriever = Arc::new(retriever());
        let cache = DatasetCache::new(&flat_config(&[Level::Subregion]), retriever.clone());
        retriever.fail("subregion-pop.json");

        let err = cache.ensure_level(Level::Subregion).await.unwrap_err();
        assert_eq!(err.level, Level::Subregion);
        assert_eq!(err.failures.len(), 1);
        assert!(matches!(
            &err.failures[0],
            DatasetError::Retrieval {
                component: Component::Population,
                source: RetrievalError::Network { .. },
                ..
            }
        ));
        assert!(!cache.is_ready(Level::Subregion));
        assert_eq!(cache.store().present(Level::Subregion), vec![Component::Boundaries]);

        // a later explicit request fetches only what is missing
        retriever.heal("subregion-pop.json");
        let ready = cache.ensure_level(Level::Subregion).await.unwrap();
        assert_eq!(ready.population.get("Kings"), Some(2559903.0));
        assert_eq!(retriever.calls_for("subregion.geojson"), 1);
        assert_eq!(retriever.calls_for("subregion-pop.json"), 2);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_dropped_waiter_does_not_cancel_retrieval() {
        let retriever = Arc::new(retriever());
        let cache = DatasetCache::new(&flat_config(&[Level::Subregion]), retriever.clone());
        let gate = retriever.gate("subregion-pop.json");

        let abandoned = tokio::time::timeout(
            std::time::Duration::from_millis(50),
            cache.ensure_level(Level::Subregion),
        )
        .await;
        assert!(abandoned.is_err());
        assert!(!cache.is_ready(Level::Subregion));

        gate.send(()).unwrap();
        let cached = tokio::time::timeout(
            std::time::Duration::from_secs(5),
            yield_until(&cache, Level::Subregion, Component::Population),
        )
        .await;
        assert!(cached.is_ok());
        assert!(cache.is_ready(Level::Subregion));
        assert_eq!(retriever.calls_for("subregion-pop.json"), 1);

        // nothing left in flight, nothing fetched twice
        cache.ensure_level(Level::Subregion).await.unwrap();
        assert_eq!(retriever.total_calls(), 2);
    }

    #[cfg(feature = "tokio-runtime")]
    #[tokio::test]
    async fn test_prefetch_completes_without_a_waiter() {
        let retriever = Arc::new(retriever());
        let cache = DatasetCache::new(&flat_config(&[Level::Region]), retriever.clone());

        let handle = cache.prefetch(Level::Region);
        handle.await.unwrap().unwrap();

        assert!(cache.is_ready(Level::Region));
        cache.ensure_level(Level::Region).await.unwrap();
        assert_eq!(retriever.total_calls(), 2);
    }
}
