//! Discrete sample meshes along the physical axes of a Green's function
//!
//! A mesh is an ordered, finite set of sample points along one axis:
//! Matsubara frequency, imaginary time, momentum, or real-space lattice
//! vector, together with its domain metadata (inverse temperature, particle
//! statistic, lattice geometry). Each mesh kind knows its canonical
//! Fourier-dual — the *adjoint* mesh — and derives it deterministically from
//! metadata alone; adjoints are recomputed at every call, never cached.

mod lattice;
mod temporal;

pub use lattice::{LatticeDomain, LatticeMesh};
pub use temporal::{ImTimeMesh, MatsubaraMesh, Statistic};

/// The first axis of a Green's function: frequency or imaginary time
#[derive(Clone, Debug, PartialEq)]
pub enum TemporalMesh {
    /// Matsubara-frequency samples
    Frequency(MatsubaraMesh),
    /// Imaginary-time samples
    Time(ImTimeMesh),
}

impl TemporalMesh {
    /// Number of sample points
    pub fn len(&self) -> usize {
        match self {
            Self::Frequency(mesh) => mesh.len(),
            Self::Time(mesh) => mesh.len(),
        }
    }

    /// A mesh always holds at least one point
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Inverse temperature of the underlying domain
    pub fn beta(&self) -> f64 {
        match self {
            Self::Frequency(mesh) => mesh.beta(),
            Self::Time(mesh) => mesh.beta(),
        }
    }

    /// Particle statistic of the underlying domain
    pub fn statistic(&self) -> Statistic {
        match self {
            Self::Frequency(mesh) => mesh.statistic(),
            Self::Time(mesh) => mesh.statistic(),
        }
    }

    /// Short name of the representation, used in error reports
    pub fn representation(&self) -> &'static str {
        match self {
            Self::Frequency(_) => "frequency",
            Self::Time(_) => "imaginary-time",
        }
    }
}
