pub mod boundary_marker;
pub mod config_loader;
pub mod notifier;
pub mod palette;
pub mod rank_tier;
pub mod row_sync;
pub mod rows;
pub mod scoreboard;
pub mod snapshot_loader;
pub mod visibility;
