// Copyright 2022 Chris Gubbin
//
// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

//! Green's functions, self-energies and mean-field terms of the GW
//! approximation
//!
//! The dynamical pipeline is a fixed chain with a full barrier between
//! stages: the Green's function moves to imaginary time, the particle-hole
//! bubble forms the polarization, the polarization moves to bosonic
//! frequency, the screened interaction solves a coupled 2×2 spin-block
//! linear system per frequency, and the dynamical self-energy is the
//! time-domain product of the dynamical part of the screening with the
//! Green's function. The static Hartree and Fock terms branch off the
//! Green's function independently through the density estimator.
//!
//! All stages share the `self_interactions` policy: when false, the working
//! interaction `V_t` is `V` with its diagonal zeroed wherever same-spin
//! contractions appear, while opposite-spin cross terms always use the raw
//! `V`.

use crate::density;
use crate::dispatch::Dispatcher;
use crate::error::{ShapeError, SolverError};
use crate::greens::{BlockGreensFunction, GreensFunction, Spin};
use crate::mesh::{ImTimeMesh, MatsubaraMesh, Statistic, TemporalMesh};
use crate::transform;
use itertools::iproduct;
use nalgebra::DMatrix;
use num_complex::Complex;

/// Lifts the interaction to complex scalars and derives the working copy
/// `V_t`, with the diagonal zeroed unless self-interactions are kept
fn working_interaction(
    v: &DMatrix<f64>,
    self_interactions: bool,
) -> (DMatrix<Complex<f64>>, DMatrix<Complex<f64>>) {
    let full = v.map(Complex::from);
    let mut working = full.clone();
    if !self_interactions {
        for i in 0..working.nrows() {
            working[(i, i)] = Complex::new(0.0, 0.0);
        }
    }
    (full, working)
}

fn check_interaction(v: &DMatrix<f64>, norb: usize) -> Result<(), ShapeError> {
    if v.nrows() != norb || v.ncols() != norb {
        return Err(ShapeError::OrbitalDimension {
            expected: norb,
            found: v.nrows(),
        });
    }
    Ok(())
}

fn check_beta(left: f64, right: f64) -> Result<(), ShapeError> {
    if left == right {
        Ok(())
    } else {
        Err(ShapeError::MeshDomain { axis: "temporal" })
    }
}

/// The particle-hole polarization of a local block Green's function
///
/// The Green's function is moved to imaginary time, the antiperiodic-image
/// bubble `P_s(t; a,b) = −G_s(t; a,b)·G_s(T−1−t; b,a)` is formed on a
/// bosonic time grid of the same size, and the result is transformed onto
/// the caller's bosonic frequency mesh.
pub fn polarization(
    g: &BlockGreensFunction,
    bosonic_mesh: &MatsubaraMesh,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    g.up().check_local()?;
    let fermionic = g.up().require_frequency_mesh()?.clone();
    if bosonic_mesh.statistic() != Statistic::Boson {
        return Err(ShapeError::AxisDomain {
            expected: "bosonic frequency",
            found: "fermionic frequency",
        }
        .into());
    }
    check_beta(fermionic.beta(), bosonic_mesh.beta())?;

    // A common time grid keeps the pointwise product well defined for
    // every combination of window sizes.
    let time_points = fermionic
        .default_time_points()
        .max(bosonic_mesh.default_time_points());
    tracing::info!(time_points, "building the polarization bubble");

    let g_t = transform::to_imaginary_time_block(g, time_points, dispatcher)?;
    let bubble = polarization_bubble(&g_t, dispatcher)?;
    Ok(transform::to_frequency_block(
        &bubble,
        bosonic_mesh.len(),
        dispatcher,
    )?)
}

/// The time-domain bubble of an imaginary-time block Green's function
pub(crate) fn polarization_bubble(
    g_t: &BlockGreensFunction,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    let time = g_t.up().require_time_mesh()?.clone();
    let norb = g_t.norb();
    let points = time.len();
    let bosonic_time = ImTimeMesh::new(time.beta(), Statistic::Boson, points);

    let mut members = Vec::with_capacity(2);
    for spin in Spin::BOTH {
        let member = g_t.block(spin);
        let data = dispatcher.map(points, |t| {
            let direct = member.at(t, 0);
            let reflected = member.at(points - 1 - t, 0);
            let mut sample = DMatrix::zeros(norb, norb);
            for (a, b) in iproduct!(0..norb, 0..norb) {
                sample[(a, b)] = -direct[(a, b)] * reflected[(b, a)];
            }
            sample
        });
        members.push(GreensFunction::from_points(
            TemporalMesh::Time(bosonic_time.clone()),
            None,
            norb,
            data,
        ));
    }
    let down = members.pop().expect("two members were just built");
    let up = members.pop().expect("two members were just built");
    Ok(BlockGreensFunction::new(up, down)?)
}

/// The screened interaction from the polarization
///
/// Per bosonic frequency point the coupled spin-block system
/// `A = I − V_t·P_up`, `B = −V·P_dn`, `C = −V·P_up`, `D = I − V_t·P_dn`
/// is eliminated through the Schur complement `S = (D − C·A⁻¹·B)⁻¹`:
/// `W_up = (A⁻¹ + A⁻¹·B·S·C·A⁻¹)·V_t − A⁻¹·B·S·V` and
/// `W_dn = −S·C·A⁻¹·V + S·V_t`. Every frequency point is independent.
pub fn screened_potential(
    p: &BlockGreensFunction,
    v: &DMatrix<f64>,
    self_interactions: bool,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    p.up().check_local()?;
    p.up().require_frequency_mesh()?;
    let norb = p.norb();
    check_interaction(v, norb)?;
    let (full, working) = working_interaction(v, self_interactions);
    let identity = DMatrix::<Complex<f64>>::identity(norb, norb);
    let frequencies = p.up().num_temporal();
    tracing::info!(frequencies, "solving the screened interaction");

    let pairs = dispatcher.try_map(frequencies, |i| {
        let p_up = p.up().at(i, 0);
        let p_dn = p.down().at(i, 0);

        let a = &identity - &working * p_up;
        let b = -(&full * p_dn);
        let c = -(&full * p_up);
        let d = &identity - &working * p_dn;

        let a_inverse = a.try_inverse().ok_or(SolverError::SingularMatrix {
            stage: "screened_potential",
            index: i,
        })?;
        let schur = (&d - &c * &a_inverse * &b)
            .try_inverse()
            .ok_or(SolverError::SingularMatrix {
                stage: "screened_potential",
                index: i,
            })?;

        let w_up = (&a_inverse + &a_inverse * &b * &schur * &c * &a_inverse) * &working
            - &a_inverse * &b * &schur * &full;
        let w_dn = -(&schur * &c * &a_inverse * &full) + &schur * &working;
        Ok::<_, SolverError>((w_up, w_dn))
    })?;

    let mut up = Vec::with_capacity(frequencies);
    let mut down = Vec::with_capacity(frequencies);
    for (w_up, w_dn) in pairs {
        up.push(w_up);
        down.push(w_dn);
    }
    let temporal = p.temporal().clone();
    Ok(BlockGreensFunction::new(
        GreensFunction::from_points(temporal.clone(), None, norb, up),
        GreensFunction::from_points(temporal, None, norb, down),
    )?)
}

/// The dynamical self-energy from the screened interaction
///
/// The static interaction is removed (`W_dyn = W − V_t`), both `W_dyn` and
/// `G` are moved onto a common time grid, the pointwise product
/// `Σ_dyn(t; a,b) = −W_dyn(t; a,b)·G(t; a,b)` is formed per orbital pair
/// and spin block, and the result is transformed back onto the fermionic
/// frequency mesh of `G`.
pub fn dynamical_self_energy(
    g: &BlockGreensFunction,
    w: &BlockGreensFunction,
    v: &DMatrix<f64>,
    self_interactions: bool,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    g.up().check_local()?;
    w.up().check_local()?;
    let fermionic = g.up().require_frequency_mesh()?.clone();
    let bosonic = w.up().require_frequency_mesh()?.clone();
    check_beta(fermionic.beta(), bosonic.beta())?;
    let norb = g.norb();
    check_interaction(v, norb)?;
    if w.norb() != norb {
        return Err(ShapeError::OrbitalDimension {
            expected: norb,
            found: w.norb(),
        }
        .into());
    }
    let (_, working) = working_interaction(v, self_interactions);

    // Remove the static part of the screening before the time transform.
    let w_dyn = w.try_map(|member| -> Result<GreensFunction, SolverError> {
        let data = dispatcher.map(member.num_temporal(), |j| member.at(j, 0) - &working);
        Ok(GreensFunction::from_points(
            member.temporal().clone(),
            None,
            norb,
            data,
        ))
    })?;

    let time_points = fermionic
        .default_time_points()
        .max(bosonic.default_time_points());
    tracing::info!(time_points, "building the dynamical self-energy");
    let w_dyn_t = transform::to_imaginary_time_block(&w_dyn, time_points, dispatcher)?;
    let g_t = transform::to_imaginary_time_block(g, time_points, dispatcher)?;

    let sigma_t = {
        let mut members = Vec::with_capacity(2);
        for spin in Spin::BOTH {
            let screening = w_dyn_t.block(spin);
            let member = g_t.block(spin);
            let data = dispatcher.map(time_points, |t| {
                -screening.at(t, 0).component_mul(member.at(t, 0))
            });
            members.push(GreensFunction::from_points(
                member.temporal().clone(),
                None,
                norb,
                data,
            ));
        }
        let down = members.pop().expect("two members were just built");
        let up = members.pop().expect("two members were just built");
        BlockGreensFunction::new(up, down)?
    };

    Ok(transform::to_frequency_block(
        &sigma_t,
        fermionic.len(),
        dispatcher,
    )?)
}

/// The static Hartree self-energy
///
/// Diagonal only: `Σ^H_s(i,i) = Σ_j V_t(i,j)·Re ρ_s(j,j) +
/// V(i,j)·Re ρ_s̄(j,j)`, broadcast identically to every frequency point of
/// the input mesh.
pub fn hartree_self_energy(
    g: &BlockGreensFunction,
    v: &DMatrix<f64>,
    self_interactions: bool,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    let norb = g.norb();
    check_interaction(v, norb)?;
    let working = real_working_interaction(v, self_interactions);
    let rho = density::density_matrix(g, dispatcher)?;
    tracing::info!(norb, "assembling the Hartree self-energy");

    let mut hartree = [DMatrix::<f64>::zeros(norb, norb), DMatrix::zeros(norb, norb)];
    for (i, j) in iproduct!(0..norb, 0..norb) {
        hartree[0][(i, i)] += working[(i, j)] * rho[0][(j, j)].re + v[(i, j)] * rho[1][(j, j)].re;
        hartree[1][(i, i)] += v[(i, j)] * rho[0][(j, j)].re + working[(i, j)] * rho[1][(j, j)].re;
    }
    broadcast_static(g, &hartree, dispatcher)
}

/// The static Fock (exchange) self-energy
///
/// `Σ^F_s(i,j) = −V_t(i,j)·Re ρ_s(i,j)`, broadcast identically to every
/// frequency point of the input mesh.
pub fn fock_self_energy(
    g: &BlockGreensFunction,
    v: &DMatrix<f64>,
    self_interactions: bool,
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    let norb = g.norb();
    check_interaction(v, norb)?;
    let working = real_working_interaction(v, self_interactions);
    let rho = density::density_matrix(g, dispatcher)?;
    tracing::info!(norb, "assembling the Fock self-energy");

    let mut fock = [DMatrix::<f64>::zeros(norb, norb), DMatrix::zeros(norb, norb)];
    for (block, rho_block) in fock.iter_mut().zip(&rho) {
        for (i, j) in iproduct!(0..norb, 0..norb) {
            block[(i, j)] = -working[(i, j)] * rho_block[(i, j)].re;
        }
    }
    broadcast_static(g, &fock, dispatcher)
}

fn real_working_interaction(v: &DMatrix<f64>, self_interactions: bool) -> DMatrix<f64> {
    let mut working = v.clone();
    if !self_interactions {
        for i in 0..working.nrows() {
            working[(i, i)] = 0.0;
        }
    }
    working
}

/// Broadcasts a static matrix per spin block to every frequency point of
/// `g`'s mesh
fn broadcast_static(
    g: &BlockGreensFunction,
    terms: &[DMatrix<f64>; 2],
    dispatcher: &Dispatcher,
) -> Result<BlockGreensFunction, SolverError> {
    let norb = g.norb();
    let frequencies = g.up().num_temporal();
    let mut members = Vec::with_capacity(2);
    for term in terms {
        let sample = term.map(Complex::from);
        let data = dispatcher.map(frequencies, |_| sample.clone());
        members.push(GreensFunction::from_points(
            g.temporal().clone(),
            None,
            norb,
            data,
        ));
    }
    let down = members.pop().expect("two members were just built");
    let up = members.pop().expect("two members were just built");
    Ok(BlockGreensFunction::new(up, down)?)
}

#[cfg(test)]
mod test {
    use super::{
        dynamical_self_energy, fock_self_energy, hartree_self_energy, polarization,
        polarization_bubble, screened_potential,
    };
    use crate::dispatch::Dispatcher;
    use crate::greens::{BlockGreensFunction, GreensFunction};
    use crate::mesh::{ImTimeMesh, MatsubaraMesh, Statistic, TemporalMesh};
    use matrixcompare::assert_matrix_eq;
    use nalgebra::DMatrix;
    use num_complex::Complex;
    use rand::Rng;

    fn random_local_block(temporal: TemporalMesh, norb: usize) -> BlockGreensFunction {
        let mut rng = rand::thread_rng();
        let mut build = || {
            let mut g = GreensFunction::zeros(temporal.clone(), None, norb);
            for t in 0..g.num_temporal() {
                *g.at_mut(t, 0) = DMatrix::from_fn(norb, norb, |_, _| {
                    Complex::new(rng.gen_range(-1.0..1.0), rng.gen_range(-1.0..1.0))
                });
            }
            g
        };
        let up = build();
        let down = build();
        BlockGreensFunction::new(up, down).unwrap()
    }

    fn symmetric_interaction(norb: usize) -> DMatrix<f64> {
        let mut rng = rand::thread_rng();
        let seed = DMatrix::<f64>::from_fn(norb, norb, |_, _| rng.gen_range(0.1..1.0));
        &seed + seed.transpose()
    }

    #[test]
    fn bubble_is_symmetric_under_swap_and_time_reflection() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let time = TemporalMesh::Time(ImTimeMesh::new(2.0, Statistic::Fermion, 8));
        let g_t = random_local_block(time, 2);
        let bubble = polarization_bubble(&g_t, &dispatcher).unwrap();
        for t in 0..8 {
            for a in 0..2 {
                for b in 0..2 {
                    let forward = bubble.up().at(t, 0)[(a, b)];
                    let reflected = bubble.up().at(7 - t, 0)[(b, a)];
                    assert!((forward - reflected).norm() < 1e-14);
                    let expected =
                        -g_t.up().at(t, 0)[(a, b)] * g_t.up().at(7 - t, 0)[(b, a)];
                    assert!((forward - expected).norm() < 1e-14);
                }
            }
        }
    }

    #[test]
    fn polarization_lands_on_the_requested_bosonic_mesh() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let fermionic = MatsubaraMesh::new(4.0, Statistic::Fermion, 6);
        let bosonic = MatsubaraMesh::new(4.0, Statistic::Boson, 5);
        let g = random_local_block(TemporalMesh::Frequency(fermionic), 2);
        let p = polarization(&g, &bosonic, &dispatcher).unwrap();
        assert_eq!(p.up().frequency_mesh(), Some(&bosonic));
        assert_eq!(p.norb(), 2);
    }

    #[test]
    fn screened_potential_vanishes_for_zero_interaction() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let bosonic = MatsubaraMesh::new(1.0, Statistic::Boson, 5);
        let p = random_local_block(TemporalMesh::Frequency(bosonic), 2);
        let v = DMatrix::<f64>::zeros(2, 2);
        let w = screened_potential(&p, &v, true, &dispatcher).unwrap();
        for t in 0..5 {
            assert!(w.up().at(t, 0).norm() < 1e-14);
            assert!(w.down().at(t, 0).norm() < 1e-14);
        }
    }

    #[test]
    fn removing_self_interactions_zeroes_exactly_the_diagonal_coupling() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let mesh = MatsubaraMesh::new(2.0, Statistic::Fermion, 6);
        let g = random_local_block(TemporalMesh::Frequency(mesh), 3);
        let v = symmetric_interaction(3);

        let kept = fock_self_energy(&g, &v, true, &dispatcher).unwrap();
        let excluded = fock_self_energy(&g, &v, false, &dispatcher).unwrap();
        for i in 0..3 {
            assert_eq!(excluded.up().at(0, 0)[(i, i)], Complex::from(0.0));
            for j in 0..3 {
                if i != j {
                    assert_eq!(excluded.up().at(0, 0)[(i, j)], kept.up().at(0, 0)[(i, j)]);
                }
            }
        }
    }

    #[test]
    fn keeping_self_interactions_leaves_the_working_interaction_untouched() {
        let v = symmetric_interaction(3);
        let kept = super::real_working_interaction(&v, true);
        assert_matrix_eq!(kept, v, comp = abs, tol = 1e-15);

        let excluded = super::real_working_interaction(&v, false);
        for i in 0..3 {
            assert_eq!(excluded[(i, i)], 0.0);
        }
    }

    #[test]
    fn hartree_term_is_diagonal_and_frequency_independent() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let mesh = MatsubaraMesh::new(2.0, Statistic::Fermion, 6);
        let g = random_local_block(TemporalMesh::Frequency(mesh), 2);
        let v = symmetric_interaction(2);
        let hartree = hartree_self_energy(&g, &v, false, &dispatcher).unwrap();
        for t in 0..6 {
            assert_eq!(hartree.up().at(t, 0), hartree.up().at(0, 0));
            assert_eq!(hartree.up().at(t, 0)[(0, 1)], Complex::from(0.0));
            assert_eq!(hartree.up().at(t, 0)[(1, 0)], Complex::from(0.0));
        }
    }

    #[test]
    fn purely_static_screening_carries_no_dynamical_self_energy() {
        let dispatcher = Dispatcher::new(2).unwrap();
        let fermionic = MatsubaraMesh::new(1.5, Statistic::Fermion, 4);
        let bosonic = MatsubaraMesh::new(1.5, Statistic::Boson, 3);
        let g = random_local_block(TemporalMesh::Frequency(fermionic.clone()), 2);
        let v = symmetric_interaction(2);

        // W equal to the static V_t at every bosonic point: W_dyn is zero,
        // so the whole dynamical term must vanish.
        let mut v_t = v.map(Complex::from);
        v_t[(0, 0)] = Complex::from(0.0);
        v_t[(1, 1)] = Complex::from(0.0);
        let mut member =
            GreensFunction::zeros(TemporalMesh::Frequency(bosonic.clone()), None, 2);
        for t in 0..bosonic.len() {
            *member.at_mut(t, 0) = v_t.clone();
        }
        let w = BlockGreensFunction::from_shared(member);

        let sigma = dynamical_self_energy(&g, &w, &v, false, &dispatcher).unwrap();
        assert_eq!(sigma.up().frequency_mesh(), Some(&fermionic));
        for t in 0..fermionic.len() {
            assert!(sigma.up().at(t, 0).norm() < 1e-12);
            assert!(sigma.down().at(t, 0).norm() < 1e-12);
        }
    }

    #[test]
    fn the_pipeline_is_independent_of_the_worker_count() {
        let sequential = Dispatcher::new(1).unwrap();
        let pooled = Dispatcher::new(4).unwrap();
        let fermionic = MatsubaraMesh::new(2.0, Statistic::Fermion, 4);
        let bosonic = MatsubaraMesh::new(2.0, Statistic::Boson, 3);
        let g = random_local_block(TemporalMesh::Frequency(fermionic), 2);
        let v = symmetric_interaction(2);

        let p_seq = polarization(&g, &bosonic, &sequential).unwrap();
        let p_par = polarization(&g, &bosonic, &pooled).unwrap();
        assert_eq!(p_seq, p_par);

        let w_seq = screened_potential(&p_seq, &v, false, &sequential).unwrap();
        let w_par = screened_potential(&p_par, &v, false, &pooled).unwrap();
        assert_eq!(w_seq, w_par);

        assert_eq!(
            dynamical_self_energy(&g, &w_seq, &v, false, &sequential).unwrap(),
            dynamical_self_energy(&g, &w_par, &v, false, &pooled).unwrap()
        );
        assert_eq!(
            hartree_self_energy(&g, &v, false, &sequential).unwrap(),
            hartree_self_energy(&g, &v, false, &pooled).unwrap()
        );
    }
}
