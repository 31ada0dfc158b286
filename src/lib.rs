//! Cut-cell geometry engine: builds the dual median polyhedra around a
//! tetrahedral primal mesh's nodes, Boolean-subtracts a triangulated cutting
//! surface from each, and emits the resulting active sub-triangle fragments.
//!
//! Module layout: leaf geometric primitives in [`geometry`], the spatial
//! index in [`spatial`], the arena-backed entity graph plus cut
//! establishment in [`entities`], per-triangle triangulation in
//! [`triangulator`], per-triangle region labelling in [`mask`],
//! per-polyhedron painting in [`poly`], and the pipeline driver in
//! [`domain`].

pub mod config;
pub mod domain;
pub mod emission;
pub mod entities;
pub mod error;
pub mod geometry;
pub mod mask;
pub mod poly;
pub mod spatial;
pub mod triangulator;

pub use config::{PipelineConfig, Tolerance};
pub use domain::{Domain, Lookup, Primal, Surface};
pub use emission::{BoundaryFragment, IntersectionDescriptor, PolyEmission, RegionSummary, SurfaceFragment};
pub use error::{CutFailure, DomainError};
pub use poly::{Poly, Topology};
