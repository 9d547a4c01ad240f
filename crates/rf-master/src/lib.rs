//! # rf-master
//!
//! The RankForge master coordinator. Owns the active model and its version,
//! the user index, and the cluster node table; runs two supervised
//! background loops (fit and search) plus the node-expiry sweep, and
//! persists a durable snapshot so serving can warm-start after a restart.

pub mod artifacts;
pub mod cluster;
pub mod config;
pub mod master;
pub mod snapshot;
pub mod supervisor;

pub use cluster::NodeTable;
pub use config::{Config, DatabaseConfig, MasterConfig, RecommendConfig};
pub use master::Master;
pub use snapshot::LocalSnapshot;
pub use supervisor::{CycleOutcome, SupervisedTask};
