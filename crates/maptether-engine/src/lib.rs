#![forbid(unsafe_code)]

//! Info-window overlay placement and collision-avoidance engine.
//!
//! # Role in maptether
//! `maptether-engine` owns every piece of state in the system: the panel
//! registry (the single source of truth for open panels), the per-panel
//! drag/resize state machines, the tether renderer, the two automatic
//! arrangement strategies, and the snapshot store. It consumes the pure
//! geometry in `maptether-core` and talks to the host map exclusively
//! through the `ViewportProvider` seam.
//!
//! # Primary responsibilities
//! - **PanelRegistry**: marker id → panel state, with idempotent open and
//!   logged no-op semantics for unknown ids.
//! - **GestureController**: Idle/Dragging/Resizing state machines; pixel
//!   space during the gesture, one geo conversion at commit.
//! - **TetherRenderer**: reactive marker↔panel line recomputation on every
//!   viewport event, with a cancellable zoom settle loop.
//! - **Arrangement**: radial and edge-aligned planners plus the
//!   overlap-avoidance fallback for newly opened panels.
//! - **SnapshotStore**: named, timestamped, capped registry snapshots with
//!   wholesale restore.
//!
//! # Concurrency model
//! The engine runs on a single-threaded, event-driven UI thread. Mutations
//! go through `&mut` access, so the single-writer discipline is enforced by
//! the borrow checker rather than by locks; each registry mutation replaces
//! the affected entry wholesale before control returns to the event loop.

pub mod arrange;
pub mod config;
pub mod engine;
pub mod events;
pub mod gesture;
pub mod registry;
pub mod snapshot;
pub mod storage;
pub mod tether;

pub use arrange::{ArrangeItem, EdgePlacement, ViewportEdge, avoid_overlap, edge_plan, radial_plan};
pub use config::EngineConfig;
pub use engine::OverlayEngine;
pub use events::{EventHub, SubscriptionHandle, ViewportChanged, ViewportEventKind};
pub use gesture::{GestureConfig, GestureController, GestureEffect, GesturePhase};
pub use registry::{MarkerId, PanelRegistry, PanelState};
pub use snapshot::{Snapshot, SnapshotError, SnapshotId, SnapshotStore};
pub use storage::{JsonFileStore, KeyValueStore, MemoryStore, StorageError};
pub use tether::{TetherGeometry, TetherRenderer, TetherSurface, ZoomRedrawDriver};
