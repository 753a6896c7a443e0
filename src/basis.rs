//! Compact spectral representation on a real-frequency pole grid
//!
//! A Green's function sampled on a finite Matsubara window is represented
//! as a sum of simple poles on the real axis,
//! `G(iω) = Σ_p c_p / (iω − ε_p)`. The pole grid is derived from the mesh
//! metadata alone: one pole per sampled frequency, placed on Chebyshev-type
//! nodes scaled to the sampled bandwidth. With distinct poles the fitting
//! matrix is Cauchy-structured and invertible, so the coefficients are the
//! solution of a square linear system and the fit reproduces the samples
//! exactly. The equal-time limit of the representation yields the density
//! matrix (see [`crate::density`]).

use crate::mesh::{MatsubaraMesh, Statistic};
use nalgebra::DMatrix;
use num_complex::Complex;
use std::f64::consts::PI;

/// A real-frequency pole grid matched to one Matsubara mesh
#[derive(Clone, Debug, PartialEq)]
pub struct PoleBasis {
    beta: f64,
    statistic: Statistic,
    poles: Vec<f64>,
}

impl PoleBasis {
    /// Derives the pole grid for a frequency mesh
    ///
    /// The rank equals the mesh size. Nodes are
    /// `ε_p = ω_max·cos(π(2p+1)/(2r+1))`: strictly decreasing, never zero
    /// (the odd denominator keeps the midpoint off the grid, where the
    /// bosonic kernel is singular).
    pub fn from_mesh(mesh: &MatsubaraMesh) -> Self {
        let rank = mesh.len();
        let omega_max = mesh.max_frequency().max(PI / mesh.beta());
        let poles = (0..rank)
            .map(|p| omega_max * (PI * (2 * p + 1) as f64 / (2 * rank + 1) as f64).cos())
            .collect();
        Self {
            beta: mesh.beta(),
            statistic: mesh.statistic(),
            poles,
        }
    }

    /// Number of poles in the grid
    pub fn rank(&self) -> usize {
        self.poles.len()
    }

    /// The pole locations, in grid order
    pub fn poles(&self) -> &[f64] {
        &self.poles
    }

    /// Inverse temperature the basis was derived at
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// The imaginary-frequency kernel sampled on `mesh`:
    /// `K[n, p] = 1/(iω_n − ε_p)`
    pub fn fit_matrix(&self, mesh: &MatsubaraMesh) -> DMatrix<Complex<f64>> {
        DMatrix::from_fn(mesh.len(), self.rank(), |n, p| {
            (mesh.frequency(n) - self.poles[p]).inv()
        })
    }

    /// The thermal occupation of a pole, `f(ε) = 1/(1 + e^{βε})`, evaluated
    /// in overflow-safe form
    pub fn fermi_weight(&self, pole: f64) -> f64 {
        let x = self.beta * pole;
        if x >= 0.0 {
            let e = (-x).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + x.exp())
        }
    }
}
