// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Lattice-gw computes single-particle and effective two-particle lattice
//! quantities for finite-temperature many-body simulations.
//!
//! # Overview
//! The crate solves the lattice Dyson equation on a Matsubara-frequency and
//! momentum grid, moves the resulting Green's functions between the
//! momentum/real-space and frequency/imaginary-time representations, and
//! chains these primitives into a GW-type self-energy construction: the
//! particle-hole polarization bubble, the screened interaction obtained by a
//! coupled spin-block (Schur complement) elimination, the dynamical
//! self-energy, and the static Hartree and Fock mean-field terms.
//!
//! All pointwise work — matrix inversion per (frequency, momentum) sample,
//! transform application per slice, screening per bosonic frequency — is
//! mapped over a [`dispatch::Dispatcher`], a worker pool of caller-chosen
//! size. Results are independent of the worker count: every parallel loop
//! partitions disjoint output locations and shares only read-only plans.
//!
//! # Usage
//! ```no_run
//! use lattice_gw::dispatch::Dispatcher;
//! use lattice_gw::greens::Dispersion;
//! use lattice_gw::mesh::{LatticeDomain, LatticeMesh, MatsubaraMesh, Statistic};
//! use nalgebra::DMatrix;
//! use num_complex::Complex;
//!
//! let kmesh = LatticeMesh::new(&[8, 8], LatticeDomain::Momentum);
//! let e_k = Dispersion::from_fn(kmesh, 1, |k| {
//!     DMatrix::from_element(1, 1, Complex::from(-2.0 * (k[0].cos() + k[1].cos())))
//! })
//! .unwrap();
//! let wmesh = MatsubaraMesh::new(10.0, Statistic::Fermion, 32);
//! let dispatcher = Dispatcher::new(4).unwrap();
//! let g0 = lattice_gw::dyson::lattice_g0(0.0, &e_k, &wmesh, &dispatcher).unwrap();
//! ```

#![warn(missing_docs)]

/// Compact spectral representation on a real-frequency pole grid
pub mod basis;

/// Two-particle vertex index grouping
pub mod channel;

/// Density matrices and the total density from a Green's function
pub mod density;

/// Worker-pool dispatch of data-parallel maps
pub mod dispatch;

/// The lattice Dyson solver
pub mod dyson;

/// Error handling
pub mod error;

/// Green's function containers
pub mod greens;

/// Green's functions, self-energies and mean-field terms of the GW approximation
pub mod gw;

/// Frequency, time and lattice meshes
pub mod mesh;

/// Representation transforms between momentum/real-space and frequency/time
pub mod transform;

pub use error::{DispatchError, ShapeError, SolverError, TransformError};
