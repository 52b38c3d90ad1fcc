// Screening pipeline.
//
// analyzer: one post -> flagged / clean / inconclusive, via the AND gate.
// screener: the whole corpus through a bounded worker pool.

pub mod analyzer;
pub mod screener;
