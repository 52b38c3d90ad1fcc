// Flashpoint: screening weapon-keyword posts for hate speech paired with
// weapon imagery.
//
// This is the library root. Each module corresponds to a stage of the
// ingest -> store -> screen -> report pipeline.

pub mod config;
pub mod db;
pub mod detection;
pub mod download;
pub mod error;
pub mod ingest;
pub mod media;
pub mod output;
pub mod pipeline;
pub mod status;
pub mod toxicity;
