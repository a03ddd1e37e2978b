// Build pipeline: parameter resolution, CAD compilation, mesh validation.
// Each build owns one job directory under the configured output root.
pub mod emblem;
pub mod handlers;
pub mod jobs;
pub mod params;
pub mod runner;
pub mod validate;
