//! Property tests for the resolution cache size bound and LRU order

use habmap_core::config::CacheSettings;
use habmap_core::models::{
    Bounds, Crs, GeometryKind, LayerDescriptor, LayerId, LayerStyle, NormalizedGeometryTable,
};
use habmap_core::Result;
use habmap_store::{BatchLru, GeometrySource, ResolutionCache};
use proptest::prelude::*;
use std::collections::VecDeque;
use std::path::PathBuf;

struct EmptySource;

impl GeometrySource for EmptySource {
    fn load(&self, _layer: &LayerDescriptor) -> Result<NormalizedGeometryTable> {
        Ok(NormalizedGeometryTable::new(Vec::new()))
    }
}

fn descriptor(index: u8) -> LayerDescriptor {
    let name = format!("layer_{}", index);
    let source_file = format!("{}.geojson", name);
    LayerDescriptor {
        id: LayerId::new(&source_file, &name),
        file_path: PathBuf::from("/data").join(&source_file),
        layer_name: name.clone(),
        display_name: name,
        geometry_type: GeometryKind::Polygon,
        feature_count: 0,
        bounds: Bounds::new(0.0, 0.0, 0.0, 0.0),
        crs: Crs::wgs84(),
        source_file,
        category: "vector".to_string(),
        style: LayerStyle::polygon(),
    }
}

proptest! {
    #[test]
    fn resolution_cache_never_exceeds_max(
        max_entries in 1usize..8,
        evict_batch in 1usize..5,
        accesses in prop::collection::vec(0u8..20, 0..200),
    ) {
        let cache = ResolutionCache::new(
            EmptySource,
            CacheSettings { max_entries, evict_batch, ..Default::default() },
        );

        for index in accesses {
            cache.get(&descriptor(index)).unwrap();
            prop_assert!(cache.len() <= max_entries);
            prop_assert!(cache.contains(&descriptor(index)));
        }
    }

    #[test]
    fn single_evictions_match_reference_lru(accesses in prop::collection::vec(0u8..10, 0..100)) {
        let mut lru = BatchLru::new(4, 1);
        // Most-recently-used at the front
        let mut reference: VecDeque<u8> = VecDeque::new();

        for key in accesses {
            if lru.get(&key).is_none() {
                lru.insert(key, ());
            }

            reference.retain(|k| *k != key);
            reference.push_front(key);
            reference.truncate(4);

            let actual: Vec<u8> = lru.keys().copied().collect();
            prop_assert_eq!(actual, reference.iter().copied().collect::<Vec<_>>());
        }
    }
}
