//! Structured error types, one per fallible subsystem boundary: a
//! `thiserror` enum per boundary rather than one crate-wide error or
//! `anyhow`-style boxing.

use thiserror::Error;

use crate::entities::TriangleId;

/// Cut establishment failed.
#[derive(Debug, Error, PartialEq)]
pub enum CutFailure {
    #[error(
        "degenerate cut between domain triangle {domain_tri:?} and surface triangle \
         {surface_tri:?}: {hit_count} intersection(s) found (expected 0 or 2)"
    )]
    Degenerate {
        domain_tri: TriangleId,
        surface_tri: TriangleId,
        hit_count: usize,
    },
}

/// Fatal pipeline-level errors. Any variant aborts
/// `Domain::run` with no partial emission.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("primal mesh interface is null or was never attached")]
    NullPrimal,

    #[error("cutting surface has no triangles")]
    EmptySurface,

    #[error("degenerate intersection while establishing cuts: {source}")]
    DegenerateIntersection {
        #[source]
        source: CutFailure,
    },

    #[error("cutting surface is not watertight: paint verification failed on poly {poly:?}")]
    NonWatertightSurface { poly: crate::entities::PolyId },

    #[error("internal sizing mismatch: expected {expected}, got {got}")]
    SizeMismatch { expected: usize, got: usize },

    #[error("invariant violated: {detail}")]
    Inconsistent { detail: String },
}
