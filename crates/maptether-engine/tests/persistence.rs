//! Engine-level persistence: store round trips and corrupted-state
//! recovery.

use std::cell::Cell;
use std::rc::Rc;

use maptether_core::geo::{GeoPoint, PixelPoint};
use maptether_core::project::to_geo;
use maptether_core::viewport::{ViewportError, ViewportProvider, ViewportState};
use maptether_engine::storage::keys;
use maptether_engine::{
    EngineConfig, JsonFileStore, KeyValueStore, MarkerId, MemoryStore, OverlayEngine,
    TetherGeometry, TetherSurface,
};

#[derive(Clone)]
struct StubViewport {
    state: Rc<Cell<Option<ViewportState>>>,
}

impl StubViewport {
    fn ready() -> Self {
        Self {
            state: Rc::new(Cell::new(Some(ViewportState::new(
                GeoPoint::new(37.77, -122.42),
                12.0,
                1000.0,
                800.0,
            )))),
        }
    }
}

impl ViewportProvider for StubViewport {
    fn viewport(&self) -> Result<ViewportState, ViewportError> {
        self.state.get().ok_or(ViewportError::BoundsUnavailable)
    }

    fn set_panning_enabled(&mut self, _enabled: bool) {}
}

struct NullSurface;

impl TetherSurface for NullSurface {
    fn apply(&mut self, _id: &MarkerId, _tether: &TetherGeometry) {}
    fn remove(&mut self, _id: &MarkerId) {}
}

fn engine() -> OverlayEngine<StubViewport> {
    OverlayEngine::new(
        StubViewport::ready(),
        Box::new(NullSurface),
        EngineConfig::default(),
    )
}

fn geo_at(px: f64, py: f64) -> GeoPoint {
    let vp = ViewportState::new(GeoPoint::new(37.77, -122.42), 12.0, 1000.0, 800.0);
    to_geo(PixelPoint::new(px, py), &vp).unwrap()
}

#[test]
fn persist_then_load_restores_everything() {
    let mut first = engine();
    let a = MarkerId::from("a");
    first.open_panel(a.clone(), geo_at(200.0, 200.0));
    first.open_panel(MarkerId::from("b"), geo_at(700.0, 500.0));
    first.pointer_down(&a, PixelPoint::new(200.0, 200.0));
    first.pointer_move(&a, PixelPoint::new(320.0, 260.0));
    first.pointer_up(&a, PixelPoint::new(320.0, 260.0));
    first.set_category_filters(vec!["fire".into(), "flood".into()]);
    first.save_snapshot("checkpoint", 1_700_000_000_000).unwrap();

    let mut store = MemoryStore::new();
    first.persist(&mut store).unwrap();

    let mut second = engine();
    second.load(&store).unwrap();

    assert_eq!(second.registry().to_map(), first.registry().to_map());
    assert_eq!(second.category_filters(), first.category_filters());
    assert_eq!(second.snapshots().len(), 1);
    assert_eq!(
        second.snapshots().iter().next().unwrap().title,
        "checkpoint"
    );
}

#[test]
fn corrupted_store_loads_as_defaults_without_panicking() {
    let mut store = MemoryStore::new();
    store.set(keys::PANELS, "{{{{").unwrap();
    store.set(keys::FILTERS, "not json at all").unwrap();
    store.set(keys::SNAPSHOTS, "[1, 2, 3]").unwrap();

    let mut target = engine();
    target.open_panel(MarkerId::from("stale"), geo_at(100.0, 100.0));
    target.load(&store).unwrap();

    assert!(target.registry().is_empty());
    assert!(target.category_filters().is_empty());
    assert!(target.snapshots().is_empty());
}

#[test]
fn load_replaces_previous_live_state_wholesale() {
    let mut source = engine();
    source.open_panel(MarkerId::from("persisted"), geo_at(400.0, 300.0));
    let mut store = MemoryStore::new();
    source.persist(&mut store).unwrap();

    let mut target = engine();
    target.open_panel(MarkerId::from("live-only"), geo_at(600.0, 300.0));
    target.load(&store).unwrap();

    assert!(target.registry().has(&MarkerId::from("persisted")));
    assert!(!target.registry().has(&MarkerId::from("live-only")));
}

#[test]
fn file_backed_store_round_trips_engine_state() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("overlay-state.json");

    {
        let mut first = engine();
        first.open_panel(MarkerId::from("a"), geo_at(250.0, 250.0));
        first.set_category_filters(vec!["earthquake".into()]);
        let mut store = JsonFileStore::new(&path);
        first.persist(&mut store).unwrap();
    }

    let store = JsonFileStore::new(&path);
    let mut second = engine();
    second.load(&store).unwrap();
    assert!(second.registry().has(&MarkerId::from("a")));
    assert_eq!(second.category_filters(), ["earthquake".to_string()]);
}

#[test]
fn snapshot_cap_is_enforced_on_load() {
    let mut source = engine();
    source.open_panel(MarkerId::from("a"), geo_at(250.0, 250.0));
    for i in 0..30u64 {
        source.save_snapshot(format!("s{i}"), i).unwrap();
    }
    assert_eq!(source.snapshots().len(), EngineConfig::default().max_snapshots);

    let mut store = MemoryStore::new();
    source.persist(&mut store).unwrap();
    let mut target = engine();
    target.load(&store).unwrap();
    assert_eq!(target.snapshots().len(), EngineConfig::default().max_snapshots);
    // Most recent first survives.
    assert_eq!(target.snapshots().iter().next().unwrap().title, "s29");
}
