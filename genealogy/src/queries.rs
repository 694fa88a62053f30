//! Read-only queries over a `GraphSnapshot`
//!
//! Every query takes the snapshot explicitly and never mutates it.

pub mod events;
pub mod kinship;
pub mod stats;
pub mod tree;

pub use events::{upcoming_events, upcoming_events_with, EventKind, EventOptions, EventProjection};
pub use kinship::{kinship, kinship_with, InLaw, InLawSide, KinshipResult, Relationship};
pub use stats::{compute_stats, compute_stats_with, AgeBucket, LongLived, StatsData};
pub use tree::{build_subtree, Direction, TreeNode};
