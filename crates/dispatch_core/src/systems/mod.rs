mod claims;

pub mod controller_step;
pub mod diversion_scan;
pub mod global_assignment;
pub mod position_report;
pub mod requester_spawner;
pub mod telemetry_snapshot;
pub mod wait_time;
