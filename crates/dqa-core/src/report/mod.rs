pub mod aggregate;
pub mod model;
pub mod render;
pub mod write;

pub use aggregate::{AuditReport, aggregate, gate};
pub use model::{FlagsArtifact, RunInfo, SeverityCounts, Summary};
