//! Density matrices and the total density from a Green's function
//!
//! The per-orbital density matrix is the equal-time (τ → β⁻) limit of the
//! compact spectral representation: fitting `G_ij(iω) = Σ_p c_p/(iω − ε_p)`
//! on the sampled window and evaluating the limit gives
//! `ρ_ij = Σ_p c_p f(ε_p)` with `f` the thermal occupation of a pole.
//! The fit is a square linear solve shared by every orbital element, so the
//! whole reduction collapses to one weight row computed once per call;
//! orbital rows are then evaluated independently and in parallel.

use crate::basis::PoleBasis;
use crate::dispatch::Dispatcher;
use crate::error::SolverError;
use crate::greens::{BlockGreensFunction, Spin};
use crate::mesh::{MatsubaraMesh, Statistic, TemporalMesh};
use nalgebra::DMatrix;
use num_complex::Complex;

fn fermionic_mesh(g: &BlockGreensFunction) -> Result<MatsubaraMesh, SolverError> {
    g.up().check_local()?;
    match g.up().temporal() {
        TemporalMesh::Frequency(mesh) if mesh.statistic() == Statistic::Fermion => {
            Ok(mesh.clone())
        }
        _ => Err(SolverError::NonFermionicDensity),
    }
}

/// The equal-time density matrices of both spin blocks
///
/// Returns one complex `norb×norb` matrix per block, `[ρ_up, ρ_down]`.
pub fn density_matrix(
    g: &BlockGreensFunction,
    dispatcher: &Dispatcher,
) -> Result<[DMatrix<Complex<f64>>; 2], SolverError> {
    let mesh = fermionic_mesh(g)?;
    let norb = g.norb();
    let frequencies = mesh.len();
    tracing::debug!(frequencies, norb, "estimating the density matrix");

    let basis = PoleBasis::from_mesh(&mesh);
    let kernel_inverse =
        basis
            .fit_matrix(&mesh)
            .try_inverse()
            .ok_or(SolverError::SingularMatrix {
                stage: "density",
                index: 0,
            })?;
    // One weight per sampled frequency: u_n = Σ_p (K⁻¹)[p, n]·f(ε_p), so
    // that ρ_ij = Σ_n u_n·G_ij(iω_n).
    let weights: Vec<Complex<f64>> = (0..frequencies)
        .map(|n| {
            (0..basis.rank())
                .map(|p| kernel_inverse[(p, n)] * basis.fermi_weight(basis.poles()[p]))
                .sum()
        })
        .collect();

    let rows = dispatcher.map(norb, |i| {
        Spin::BOTH.map(|spin| {
            let member = g.block(spin);
            (0..norb)
                .map(|j| {
                    (0..frequencies)
                        .map(|n| weights[n] * member.at(n, 0)[(i, j)])
                        .sum::<Complex<f64>>()
                })
                .collect::<Vec<_>>()
        })
    });

    let mut rho = [DMatrix::zeros(norb, norb), DMatrix::zeros(norb, norb)];
    for (i, row_pair) in rows.into_iter().enumerate() {
        for (block, row) in rho.iter_mut().zip(row_pair) {
            for (j, value) in row.into_iter().enumerate() {
                block[(i, j)] = value;
            }
        }
    }
    Ok(rho)
}

/// The total particle number: the real diagonal density summed over both
/// spin blocks and all orbitals
pub fn total_density(g: &BlockGreensFunction, dispatcher: &Dispatcher) -> Result<f64, SolverError> {
    let rho = density_matrix(g, dispatcher)?;
    let norb = g.norb();
    Ok(rho
        .iter()
        .flat_map(|block| (0..norb).map(move |i| block[(i, i)].re))
        .sum())
}
