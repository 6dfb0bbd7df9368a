//! Journey graph: the canonical node/edge collection and its layout.
//!
//! `GraphStore` owns nodes and edges in insertion order and enforces the
//! node status state machine (`Locked -> Active -> Completed`). The graph is
//! append-only: nodes are never removed and ids are never reused.
//!
//! `LayoutEngine` is a pure function of the store's contents. It ranks the
//! primary chain top to bottom and fans broader siblings out beside their
//! parent, alternating right and left.

pub mod layout;
pub mod store;

pub use layout::{EdgeRoute, Layout, LayoutEngine, NodePosition, Position, Side};
pub use store::GraphStore;
