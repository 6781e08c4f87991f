pub mod catalog;
pub mod fingerprint;
pub mod model;

pub use catalog::{FindingId, Severity};
pub use fingerprint::fingerprint;
pub use model::Finding;
