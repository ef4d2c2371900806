//! Read-only diagnostics over a borrowed frame.
//!
//! None of these analyzers mutate their input. They all tolerate empty and
//! fully populated frames, returning empty or zero results.

mod duplicates;
mod final_frame;
mod missing;

pub use duplicates::DuplicateAnalyzer;
pub use final_frame::FinalFrameAnalyzer;
pub use missing::MissingValueAnalyzer;
