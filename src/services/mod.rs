//! Quiz logic, independent of the HTTP layer.

pub mod delivery;
pub mod otp;
pub mod question_cache;
pub mod questions;
pub mod recorder;
pub mod refresh;
pub mod results;
pub mod scoring;
pub mod start_marker;
pub mod summary;
