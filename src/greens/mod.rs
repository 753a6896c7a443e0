//! Green's function containers
//!
//! A [`GreensFunction`] maps one or two mesh points to a square complex
//! matrix of fixed orbital dimension; the matrix shape is invariant across
//! every point. A [`BlockGreensFunction`] is the fixed two-element
//! {up, down} spin grouping used throughout the GW pipeline, with the
//! caller-visible invariant that both blocks always share identical meshes
//! and orbital dimension. Every pipeline stage produces a fresh value; no
//! stage mutates a caller-supplied function.

use crate::error::ShapeError;
use crate::mesh::{ImTimeMesh, LatticeDomain, LatticeMesh, MatsubaraMesh, TemporalMesh};
use nalgebra::DMatrix;
use num_complex::Complex;
use std::ops::Index;

/// Spin projection labelling the members of a block Green's function
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Spin {
    /// Majority block
    Up,
    /// Minority block
    Down,
}

impl Spin {
    /// Both spin labels, in block order
    pub const BOTH: [Spin; 2] = [Spin::Up, Spin::Down];

    /// The opposite spin projection
    pub fn flipped(self) -> Self {
        match self {
            Self::Up => Self::Down,
            Self::Down => Self::Up,
        }
    }
}

/// A Green's function sampled on one temporal axis and, optionally, one
/// spatial axis
///
/// Data is stored first-axis-major: the sample at temporal index `t` and
/// spatial index `s` lives at flattened index `t·n_spatial + s`.
#[derive(Clone, Debug, PartialEq)]
pub struct GreensFunction {
    temporal: TemporalMesh,
    spatial: Option<LatticeMesh>,
    norb: usize,
    data: Vec<DMatrix<Complex<f64>>>,
}

impl GreensFunction {
    /// A zero-initialised Green's function on the given meshes
    ///
    /// # Panics
    /// If `norb` is zero.
    pub fn zeros(temporal: TemporalMesh, spatial: Option<LatticeMesh>, norb: usize) -> Self {
        assert!(norb > 0, "the orbital dimension must be positive");
        let points = temporal.len() * spatial.as_ref().map_or(1, LatticeMesh::len);
        Self {
            temporal,
            spatial,
            norb,
            data: vec![DMatrix::zeros(norb, norb); points],
        }
    }

    /// Assembles a Green's function from per-point matrices in
    /// first-axis-major order
    ///
    /// # Panics
    /// If the number of matrices does not match the mesh sizes, or any
    /// matrix is not `norb×norb`.
    pub fn from_points(
        temporal: TemporalMesh,
        spatial: Option<LatticeMesh>,
        norb: usize,
        data: Vec<DMatrix<Complex<f64>>>,
    ) -> Self {
        let points = temporal.len() * spatial.as_ref().map_or(1, LatticeMesh::len);
        assert_eq!(data.len(), points, "point count must match the mesh sizes");
        assert!(
            data.iter().all(|m| m.nrows() == norb && m.ncols() == norb),
            "every sample must be an norb×norb matrix"
        );
        Self {
            temporal,
            spatial,
            norb,
            data,
        }
    }

    /// The temporal (first) axis
    pub fn temporal(&self) -> &TemporalMesh {
        &self.temporal
    }

    /// The spatial (second) axis, if any
    pub fn spatial(&self) -> Option<&LatticeMesh> {
        self.spatial.as_ref()
    }

    /// The frequency mesh, when the first axis is a frequency axis
    pub fn frequency_mesh(&self) -> Option<&MatsubaraMesh> {
        match &self.temporal {
            TemporalMesh::Frequency(mesh) => Some(mesh),
            TemporalMesh::Time(_) => None,
        }
    }

    /// The time mesh, when the first axis is an imaginary-time axis
    pub fn time_mesh(&self) -> Option<&ImTimeMesh> {
        match &self.temporal {
            TemporalMesh::Time(mesh) => Some(mesh),
            TemporalMesh::Frequency(_) => None,
        }
    }

    /// Orbital dimension of every sample matrix
    pub fn norb(&self) -> usize {
        self.norb
    }

    /// Number of temporal samples
    pub fn num_temporal(&self) -> usize {
        self.temporal.len()
    }

    /// Number of spatial samples (one for a local function)
    pub fn num_spatial(&self) -> usize {
        self.spatial.as_ref().map_or(1, LatticeMesh::len)
    }

    /// Total number of sample points
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// A Green's function always holds at least one point
    pub fn is_empty(&self) -> bool {
        false
    }

    /// The sample at temporal index `t` and spatial index `s`
    pub fn at(&self, t: usize, s: usize) -> &DMatrix<Complex<f64>> {
        &self.data[t * self.num_spatial() + s]
    }

    /// Mutable access to the sample at temporal index `t`, spatial index `s`
    pub fn at_mut(&mut self, t: usize, s: usize) -> &mut DMatrix<Complex<f64>> {
        let stride = self.num_spatial();
        &mut self.data[t * stride + s]
    }

    /// The sample at a flattened point index
    pub fn point(&self, index: usize) -> &DMatrix<Complex<f64>> {
        &self.data[index]
    }

    /// Checks that `self` and `other` live on identical meshes with the same
    /// orbital dimension
    pub fn check_same_shape(&self, other: &Self) -> Result<(), ShapeError> {
        if self.norb != other.norb {
            return Err(ShapeError::OrbitalDimension {
                expected: self.norb,
                found: other.norb,
            });
        }
        if self.temporal.len() != other.temporal.len() {
            return Err(ShapeError::MeshSize {
                expected: self.temporal.len(),
                found: other.temporal.len(),
            });
        }
        if self.temporal != other.temporal {
            return Err(ShapeError::MeshDomain { axis: "temporal" });
        }
        if self.spatial != other.spatial {
            return Err(ShapeError::MeshDomain { axis: "spatial" });
        }
        Ok(())
    }

    /// Checks that the function carries no spatial axis
    pub fn check_local(&self) -> Result<(), ShapeError> {
        match self.spatial {
            None => Ok(()),
            Some(_) => Err(ShapeError::NotLocal),
        }
    }

    /// Checks that the first axis is a frequency axis and returns its mesh
    pub fn require_frequency_mesh(&self) -> Result<&MatsubaraMesh, ShapeError> {
        self.frequency_mesh().ok_or(ShapeError::AxisDomain {
            expected: "frequency",
            found: self.temporal.representation(),
        })
    }

    /// Checks that the first axis is a time axis and returns its mesh
    pub fn require_time_mesh(&self) -> Result<&ImTimeMesh, ShapeError> {
        self.time_mesh().ok_or(ShapeError::AxisDomain {
            expected: "imaginary-time",
            found: self.temporal.representation(),
        })
    }
}

/// The fixed {up, down} spin block of a Green's function
///
/// Both members always share identical meshes and orbital dimension; the
/// constructor enforces the invariant.
#[derive(Clone, Debug, PartialEq)]
pub struct BlockGreensFunction {
    up: GreensFunction,
    down: GreensFunction,
}

impl BlockGreensFunction {
    /// Groups two equal-shape Green's functions into a spin block
    pub fn new(up: GreensFunction, down: GreensFunction) -> Result<Self, ShapeError> {
        up.check_same_shape(&down)?;
        Ok(Self { up, down })
    }

    /// A spin block with both members equal to `member`
    pub fn from_shared(member: GreensFunction) -> Self {
        Self {
            up: member.clone(),
            down: member,
        }
    }

    /// The member carrying the given spin label
    pub fn block(&self, spin: Spin) -> &GreensFunction {
        match spin {
            Spin::Up => &self.up,
            Spin::Down => &self.down,
        }
    }

    /// The spin-up member
    pub fn up(&self) -> &GreensFunction {
        &self.up
    }

    /// The spin-down member
    pub fn down(&self) -> &GreensFunction {
        &self.down
    }

    /// Orbital dimension shared by both members
    pub fn norb(&self) -> usize {
        self.up.norb()
    }

    /// The temporal axis shared by both members
    pub fn temporal(&self) -> &TemporalMesh {
        self.up.temporal()
    }

    /// Applies a fallible construction to both members and regroups
    pub fn try_map<E, F>(&self, mut op: F) -> Result<Self, E>
    where
        F: FnMut(&GreensFunction) -> Result<GreensFunction, E>,
    {
        Ok(Self {
            up: op(&self.up)?,
            down: op(&self.down)?,
        })
    }
}

impl Index<Spin> for BlockGreensFunction {
    type Output = GreensFunction;

    fn index(&self, spin: Spin) -> &GreensFunction {
        self.block(spin)
    }
}

/// A dispersion relation sampled on a momentum mesh
///
/// This is the single-particle energy matrix `e(k)`, one square complex
/// matrix per momentum point.
#[derive(Clone, Debug, PartialEq)]
pub struct Dispersion {
    mesh: LatticeMesh,
    norb: usize,
    data: Vec<DMatrix<Complex<f64>>>,
}

impl Dispersion {
    /// Samples a dispersion function on every point of a momentum mesh
    ///
    /// The function receives the momentum components of each mesh point and
    /// must return an `norb×norb` matrix.
    pub fn from_fn<F>(mesh: LatticeMesh, norb: usize, op: F) -> Result<Self, ShapeError>
    where
        F: Fn(&[f64]) -> DMatrix<Complex<f64>>,
    {
        if mesh.domain() != LatticeDomain::Momentum {
            return Err(ShapeError::AxisDomain {
                expected: "momentum",
                found: mesh.domain().name(),
            });
        }
        let data = (0..mesh.len())
            .map(|index| {
                let matrix = op(&mesh.point(index));
                if matrix.nrows() == norb && matrix.ncols() == norb {
                    Ok(matrix)
                } else {
                    Err(ShapeError::OrbitalDimension {
                        expected: norb,
                        found: matrix.nrows(),
                    })
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { mesh, norb, data })
    }

    /// The underlying momentum mesh
    pub fn mesh(&self) -> &LatticeMesh {
        &self.mesh
    }

    /// Orbital dimension of the energy matrices
    pub fn norb(&self) -> usize {
        self.norb
    }

    /// The energy matrix at the `k_index`-th momentum point
    pub fn at(&self, k_index: usize) -> &DMatrix<Complex<f64>> {
        &self.data[k_index]
    }
}
