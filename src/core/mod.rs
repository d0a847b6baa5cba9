// Core modules: buffer pipeline, fault barriers, share codec, and error modeling.
pub mod error;
pub mod outcome;
pub mod pipeline;
pub mod safe;
pub mod share;
