use geocluster::api::{ClusterRow, LinkTemplate, NoLinks, ViewportRequest, query_json, query_rows};
use geocluster::{
    ClusterStore, Config, EntityId, MemoryStore, NoProgress, PointSource, Reclusterer, Result,
    SourcePoint, Viewport,
};
use std::sync::Arc;
use std::thread;

fn people() -> Vec<SourcePoint> {
    vec![
        SourcePoint::new(51.5074, -0.1278, 1),
        SourcePoint::new(51.5079, -0.1290, 2),
        SourcePoint::new(48.8566, 2.3522, 3),
        SourcePoint::new(40.7128, -74.0060, 4),
        SourcePoint::new(-33.8688, 151.2093, 5),
        SourcePoint::new(35.6762, 139.6503, 6),
    ]
}

fn reclusterer(store: &Arc<MemoryStore>) -> Reclusterer<MemoryStore> {
    Reclusterer::new(Arc::clone(store), Config::default().with_zoom_range(0, 16))
        .expect("valid config")
}

/// A source that pages through a larger dataset lazily.
struct PagedSource {
    pages: usize,
    per_page: usize,
}

impl PointSource for PagedSource {
    fn points(&self) -> Result<Box<dyn Iterator<Item = SourcePoint> + '_>> {
        Ok(Box::new((0..self.pages).flat_map(move |page| {
            (0..self.per_page).map(move |i| {
                let id = (page * self.per_page + i) as i64;
                SourcePoint::new(
                    -40.0 + page as f64 * 8.0,
                    -170.0 + i as f64 * 3.0,
                    id,
                )
            })
        })))
    }
}

#[test]
fn test_recompute_is_idempotent() {
    let store = Arc::new(MemoryStore::new());
    let reclusterer = reclusterer(&store);

    reclusterer.run(&people()).expect("first run");
    let levels = store.zoom_levels().unwrap();
    let first: Vec<_> = levels.iter().map(|&z| store.clusters_at(z).unwrap()).collect();
    let first_generation = store.stats().unwrap().generation;

    reclusterer.run(&people()).expect("second run");
    let second: Vec<_> = levels.iter().map(|&z| store.clusters_at(z).unwrap()).collect();

    assert_eq!(first, second);
    assert_eq!(store.zoom_levels().unwrap(), levels);
    assert_ne!(store.stats().unwrap().generation, first_generation);
    assert_eq!(store.stats().unwrap().replacements, 2);
}

#[test]
fn test_recompute_replaces_everything() {
    let store = Arc::new(MemoryStore::new());
    let reclusterer = reclusterer(&store);

    reclusterer.run(&people()).unwrap();
    reclusterer
        .run(&vec![SourcePoint::new(0.0, 0.0, "null-island")])
        .unwrap();

    for zoom in store.zoom_levels().unwrap() {
        let rows = store.clusters_at(zoom).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity, Some(EntityId::from("null-island")));
    }
}

#[test]
fn test_empty_source() {
    let store = Arc::new(MemoryStore::new());
    let reclusterer = reclusterer(&store);

    reclusterer.run(&people()).unwrap();
    let summary = reclusterer
        .run_with_progress(&Vec::<SourcePoint>::new(), &mut NoProgress)
        .unwrap();

    assert_eq!(summary.accepted, 0);
    assert_eq!(summary.rows_written, 0);
    assert_eq!(summary.zoom_levels, 17);
    assert!(store.is_empty().unwrap());
    assert_eq!(store.zoom_levels().unwrap().len(), 17);

    for zoom in [0, 8, 16, 25] {
        let request = ViewportRequest::new(zoom, Viewport::world()).unwrap();
        assert!(query_rows(store.as_ref(), &request, &NoLinks).unwrap().is_empty());
    }
}

#[test]
fn test_lazy_point_source() {
    let store = Arc::new(MemoryStore::new());
    let reclusterer = reclusterer(&store);

    let summary = reclusterer
        .run_with_progress(&PagedSource { pages: 10, per_page: 100 }, &mut NoProgress)
        .unwrap();

    assert_eq!(summary.accepted, 1000);
    let finest = store.clusters_at(16).unwrap();
    assert_eq!(finest.len(), 1000);
    assert!(finest.iter().all(|row| row.is_degenerate()));
    let total: u32 = store.clusters_at(0).unwrap().iter().map(|r| r.count).sum();
    assert_eq!(total, 1000);
}

#[test]
fn test_coarse_zoom_groups_cities() {
    let store = Arc::new(MemoryStore::new());
    reclusterer(&store).run(&people()).unwrap();

    let europe = Viewport::new(-10.0, 40.0, 10.0, 60.0);
    let coarse = store.query(3, &europe).unwrap();
    assert_eq!(coarse.iter().map(|r| r.count).sum::<u32>(), 3);
    assert!(coarse.len() < 3);

    let fine = store.query(16, &europe).unwrap();
    assert_eq!(fine.len(), 3);
    assert!(fine.iter().all(|row| row.is_degenerate()));
}

#[test]
fn test_json_rows_for_map() {
    let store = Arc::new(MemoryStore::new());
    let config = Config::default().with_zoom_range(0, 16);
    let linker = LinkTemplate::from_config(&config);
    Reclusterer::new(Arc::clone(&store), config)
        .unwrap()
        .run(&people())
        .unwrap();

    let request = ViewportRequest::parse("-80", "35", "-70", "45", "12").unwrap();
    let json = query_json(store.as_ref(), &request, &linker).unwrap();
    assert!(json.starts_with("[[-74.00"));
    assert!(json.ends_with(r#",1,"/people/4/"]]"#));

    let rows: Vec<ClusterRow> = serde_json::from_str(&json).unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].count(), 1);
    assert!((rows[0].longitude() - -74.0060).abs() < 1e-9);
    assert_eq!(rows[0].link(), Some("/people/4/"));
    assert!((rows[0].latitude() - 40.7128).abs() < 1e-9);
}

#[test]
fn test_queries_during_recompute() {
    let store = Arc::new(MemoryStore::new());
    let reclusterer = reclusterer(&store);
    reclusterer.run(&people()).unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..200 {
                    let generation = store.current();
                    let total: u32 = generation
                        .query(0, &Viewport::world())
                        .iter()
                        .map(|row| row.count)
                        .sum();
                    assert!(total == 6 || total == 1000, "mixed table: {}", total);
                }
            })
        })
        .collect();

    let source = PagedSource { pages: 10, per_page: 100 };
    for _ in 0..3 {
        reclusterer.run_with_progress(&source, &mut NoProgress).unwrap();
        reclusterer.run_with_progress(&people(), &mut NoProgress).unwrap();
    }

    for reader in readers {
        reader.join().unwrap();
    }
}
