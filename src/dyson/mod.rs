//! The lattice Dyson solver
//!
//! Turns a dispersion relation, a chemical potential and (optionally) a
//! momentum-independent self-energy into a lattice Green's function by
//! pointwise matrix inversion. Every sample point is independent, so the
//! parallel loops partition the momentum (or flattened point) index; the
//! iteration order never influences the output. A singular matrix at any
//! point is fatal and aborts the whole call.

use crate::dispatch::Dispatcher;
use crate::error::{ShapeError, SolverError};
use crate::greens::{BlockGreensFunction, Dispersion, GreensFunction, Spin};
use crate::mesh::{MatsubaraMesh, TemporalMesh};
use nalgebra::DMatrix;
use num_complex::Complex;

/// The non-interacting lattice Green's function
///
/// `G₀(iω, k) = [(iω + μ)·I − e(k)]⁻¹` for every pair of frequency and
/// momentum samples.
pub fn lattice_g0(
    mu: f64,
    dispersion: &Dispersion,
    mesh: &MatsubaraMesh,
    dispatcher: &Dispatcher,
) -> Result<GreensFunction, SolverError> {
    lattice_dyson(mu, dispersion, mesh, None, "lattice_g0", dispatcher)
}

/// The interacting lattice Green's function with a local self-energy
///
/// `G(iω, k) = [(iω + μ)·I − e(k) − Σ(iω)]⁻¹`; the output frequency mesh is
/// the self-energy's mesh.
pub fn lattice_g(
    mu: f64,
    dispersion: &Dispersion,
    sigma: &GreensFunction,
    dispatcher: &Dispatcher,
) -> Result<GreensFunction, SolverError> {
    sigma.check_local()?;
    let mesh = sigma.require_frequency_mesh()?.clone();
    if sigma.norb() != dispersion.norb() {
        return Err(ShapeError::OrbitalDimension {
            expected: dispersion.norb(),
            found: sigma.norb(),
        }
        .into());
    }
    lattice_dyson(mu, dispersion, &mesh, Some(sigma), "lattice_g", dispatcher)
}

fn lattice_dyson(
    mu: f64,
    dispersion: &Dispersion,
    mesh: &MatsubaraMesh,
    sigma: Option<&GreensFunction>,
    stage: &'static str,
    dispatcher: &Dispatcher,
) -> Result<GreensFunction, SolverError> {
    let norb = dispersion.norb();
    let momenta = dispersion.mesh().len();
    let frequencies = mesh.len();
    tracing::info!(frequencies, momenta, stage, "solving the lattice Dyson equation");

    let identity = DMatrix::<Complex<f64>>::identity(norb, norb);
    let columns = dispatcher.try_map(momenta, |k| {
        (0..frequencies)
            .map(|w| {
                let z = mesh.frequency(w) + mu;
                let mut matrix = &identity * z - dispersion.at(k);
                if let Some(sigma) = sigma {
                    matrix -= sigma.at(w, 0);
                }
                matrix.try_inverse().ok_or(SolverError::SingularMatrix {
                    stage,
                    index: w * momenta + k,
                })
            })
            .collect::<Result<Vec<_>, _>>()
    })?;

    let mut g = GreensFunction::zeros(
        TemporalMesh::Frequency(mesh.clone()),
        Some(dispersion.mesh().clone()),
        norb,
    );
    for (k, column) in columns.into_iter().enumerate() {
        for (w, sample) in column.into_iter().enumerate() {
            *g.at_mut(w, k) = sample;
        }
    }
    Ok(g)
}

/// Shifts the chemical potential of a block Green's function
///
/// For every sample point `G' = [G⁻¹ − μ·I]⁻¹`. Pure: the input is left
/// untouched and a new block function is returned.
pub fn dyson_mu(
    g: &BlockGreensFunction,
    mu: f64,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    reinvert(g, mu, None, "dyson_mu", dispatcher)
}

/// Shifts the chemical potential and folds in a local self-energy
///
/// For every sample point `G' = [G⁻¹ − μ·I − Σ(iω)]⁻¹`, the self-energy
/// sampled at the matching frequency of each block.
pub fn dyson_mu_sigma(
    g: &BlockGreensFunction,
    mu: f64,
    sigma: &BlockGreensFunction,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    sigma.up().check_local()?;
    sigma.up().require_frequency_mesh()?;
    if sigma.norb() != g.norb() {
        return Err(ShapeError::OrbitalDimension {
            expected: g.norb(),
            found: sigma.norb(),
        }
        .into());
    }
    if sigma.up().num_temporal() != g.up().num_temporal() {
        return Err(ShapeError::MeshSize {
            expected: g.up().num_temporal(),
            found: sigma.up().num_temporal(),
        }
        .into());
    }
    reinvert(g, mu, Some(sigma), "dyson_mu_sigma", dispatcher)
}

/// The pointwise inverse of a block Green's function
pub fn invert(
    g: &BlockGreensFunction,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    g.try_map(|member| {
        let data = dispatcher.try_map(member.len(), |index| {
            member
                .point(index)
                .clone()
                .try_inverse()
                .ok_or(SolverError::SingularMatrix {
                    stage: "invert",
                    index,
                })
        })?;
        Ok(GreensFunction::from_points(
            member.temporal().clone(),
            member.spatial().cloned(),
            member.norb(),
            data,
        ))
    })
}

fn reinvert(
    g: &BlockGreensFunction,
    mu: f64,
    sigma: Option<&BlockGreensFunction>,
    stage: &'static str,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    let norb = g.norb();
    let mu_shift = DMatrix::<Complex<f64>>::identity(norb, norb) * Complex::from(mu);
    let mut members = Vec::with_capacity(2);
    for spin in Spin::BOTH {
        let member = g.block(spin);
        let spatial_stride = member.num_spatial();
        let data = dispatcher.try_map(member.len(), |index| {
            let inverse = member
                .point(index)
                .clone()
                .try_inverse()
                .ok_or(SolverError::SingularMatrix { stage, index })?;
            let mut matrix = inverse - &mu_shift;
            if let Some(sigma) = sigma {
                matrix -= sigma.block(spin).at(index / spatial_stride, 0);
            }
            matrix
                .try_inverse()
                .ok_or(SolverError::SingularMatrix { stage, index })
        })?;
        members.push(GreensFunction::from_points(
            member.temporal().clone(),
            member.spatial().cloned(),
            norb,
            data,
        ));
    }
    let down = members.pop().expect("two members were just built");
    let up = members.pop().expect("two members were just built");
    Ok(BlockGreensFunction::new(up, down)?)
}
