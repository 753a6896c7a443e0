// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Error taxonomy for the solver
//!
//! Three classes of failure exist: precondition violations ([`ShapeError`]),
//! unresolvable mesh pairings in a transform ([`TransformError`]), and
//! numeric failures during pointwise inversion ([`SolverError`]). A failure
//! at any single sample point aborts the enclosing call; no partial results
//! are ever returned.

use miette::Diagnostic;

/// Disagreement between operand shapes or mesh metadata
///
/// These are checked eagerly, before any parallel region is entered.
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum ShapeError {
    /// The orbital dimensions of two operands differ
    #[error("orbital dimension mismatch: expected {expected}, found {found}")]
    OrbitalDimension {
        /// Orbital dimension of the reference operand
        expected: usize,
        /// Orbital dimension of the offending operand
        found: usize,
    },
    /// Two meshes which must pair point for point have different sizes
    #[error("mesh size mismatch: expected {expected} points, found {found}")]
    MeshSize {
        /// Size of the reference mesh
        expected: usize,
        /// Size of the offending mesh
        found: usize,
    },
    /// Two operands live on meshes with different domain metadata
    #[error("operands live on incompatible {axis} meshes")]
    MeshDomain {
        /// The axis on which the metadata disagrees
        axis: &'static str,
    },
    /// An axis carries the wrong representation for the requested operation
    #[error("expected a {expected} axis, found {found}")]
    AxisDomain {
        /// The representation the operation requires
        expected: &'static str,
        /// The representation the operand carries
        found: &'static str,
    },
    /// The operand is missing a required mesh axis
    #[error("operand carries no {axis} axis")]
    MissingAxis {
        /// The missing axis
        axis: &'static str,
    },
    /// A lattice-resolved operand was passed where a local one is required
    #[error("expected a momentum-independent (local) operand")]
    NotLocal,
}

/// Failure to pair a frequency mesh with a time mesh
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum TransformError {
    /// The target mesh is too small to resolve the source samples
    #[error("{frequencies} frequencies cannot be resolved on {times} time points")]
    #[diagnostic(help("the time mesh must hold at least as many points as the frequency mesh"))]
    UnresolvableMesh {
        /// Number of frequency samples
        frequencies: usize,
        /// Number of time samples
        times: usize,
    },
    /// A shape precondition failed before the transform started
    #[error(transparent)]
    Shape(#[from] ShapeError),
}

/// Fatal error raised by a solver stage
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum SolverError {
    /// A sampled matrix could not be inverted
    #[error("matrix inversion failed in {stage} at point {index}")]
    #[diagnostic(help("the sampled matrix is singular; the call is aborted without partial results"))]
    SingularMatrix {
        /// The pipeline stage that attempted the inversion
        stage: &'static str,
        /// Flattened index of the offending sample point
        index: usize,
    },
    /// The density estimator was handed a non-fermionic operand
    #[error("the density estimator requires a fermionic Matsubara mesh")]
    NonFermionicDensity,
    /// A shape precondition failed before the solve started
    #[error(transparent)]
    Shape(#[from] ShapeError),
    /// A representation transform inside the pipeline failed
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Failure to construct the worker pool
#[derive(thiserror::Error, Debug, Diagnostic)]
pub enum DispatchError {
    /// The underlying thread pool could not be built
    #[error(transparent)]
    Pool(#[from] rayon::ThreadPoolBuildError),
}
