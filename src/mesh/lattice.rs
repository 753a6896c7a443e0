//! Hypercubic lattice meshes in momentum and real space

use std::f64::consts::PI;

/// Which side of the spatial Fourier pair a lattice mesh samples
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LatticeDomain {
    /// The Brillouin zone of the lattice
    Momentum,
    /// The periodic lattice itself
    RealSpace,
}

impl LatticeDomain {
    /// Short name of the domain, used in error reports
    pub fn name(self) -> &'static str {
        match self {
            Self::Momentum => "momentum",
            Self::RealSpace => "real-space",
        }
    }
}

/// A hypercubic lattice mesh with periodic boundaries
///
/// Points are indexed row-major over the per-dimension extents. The
/// momentum point with integer coordinates `m` sits at `k_d = 2π m_d / n_d`;
/// the real-space point with coordinates `m` is the lattice vector `m` in
/// units of the primitive vectors.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LatticeMesh {
    extents: Vec<usize>,
    domain: LatticeDomain,
}

impl LatticeMesh {
    /// Builds a lattice mesh from per-dimension extents
    ///
    /// # Panics
    /// If `extents` is empty or any extent is zero.
    pub fn new(extents: &[usize], domain: LatticeDomain) -> Self {
        assert!(!extents.is_empty(), "a lattice needs at least one dimension");
        assert!(
            extents.iter().all(|&n| n > 0),
            "every lattice dimension needs at least one site"
        );
        Self {
            extents: extents.to_vec(),
            domain,
        }
    }

    /// Total number of lattice points
    pub fn len(&self) -> usize {
        self.extents.iter().product()
    }

    /// A mesh always holds at least one point
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Which side of the Fourier pair this mesh samples
    pub fn domain(&self) -> LatticeDomain {
        self.domain
    }

    /// Per-dimension extents
    pub fn extents(&self) -> &[usize] {
        &self.extents
    }

    /// Integer coordinates of the `index`-th point (row-major unraveling)
    pub fn coordinates(&self, index: usize) -> Vec<usize> {
        debug_assert!(index < self.len());
        let mut remainder = index;
        let mut coordinates = vec![0; self.extents.len()];
        for (coordinate, &extent) in coordinates.iter_mut().zip(&self.extents).rev() {
            *coordinate = remainder % extent;
            remainder /= extent;
        }
        coordinates
    }

    /// The physical point at `index`: a momentum in the Brillouin zone or a
    /// lattice vector, depending on the domain
    pub fn point(&self, index: usize) -> Vec<f64> {
        let coordinates = self.coordinates(index);
        match self.domain {
            LatticeDomain::Momentum => coordinates
                .iter()
                .zip(&self.extents)
                .map(|(&m, &n)| 2.0 * PI * m as f64 / n as f64)
                .collect(),
            LatticeDomain::RealSpace => coordinates.iter().map(|&m| m as f64).collect(),
        }
    }

    /// The Fourier phase `k·r` between the momentum point `k_index` and the
    /// real-space point `r_index` (either index order works, the phase is
    /// symmetric)
    pub fn phase(&self, k_index: usize, r_index: usize) -> f64 {
        let k = self.coordinates(k_index);
        let r = self.coordinates(r_index);
        self.extents
            .iter()
            .zip(k.iter().zip(&r))
            .map(|(&n, (&a, &b))| 2.0 * PI * (a as f64) * (b as f64) / n as f64)
            .sum()
    }

    /// The adjoint mesh: same geometry, dual domain
    pub fn adjoint(&self) -> LatticeMesh {
        let domain = match self.domain {
            LatticeDomain::Momentum => LatticeDomain::RealSpace,
            LatticeDomain::RealSpace => LatticeDomain::Momentum,
        };
        Self {
            extents: self.extents.clone(),
            domain,
        }
    }
}

#[cfg(test)]
mod test {
    use super::{LatticeDomain, LatticeMesh};
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn coordinates_unravel_row_major() {
        let mesh = LatticeMesh::new(&[2, 3], LatticeDomain::Momentum);
        assert_eq!(mesh.len(), 6);
        assert_eq!(mesh.coordinates(0), vec![0, 0]);
        assert_eq!(mesh.coordinates(2), vec![0, 2]);
        assert_eq!(mesh.coordinates(5), vec![1, 2]);
    }

    #[test]
    fn momentum_points_tile_the_brillouin_zone() {
        let mesh = LatticeMesh::new(&[4], LatticeDomain::Momentum);
        let k: Vec<f64> = (0..4).map(|i| mesh.point(i)[0]).collect();
        for (value, expected) in k.into_iter().zip([0.0, 0.5, 1.0, 1.5]) {
            assert_relative_eq!(value, expected * PI);
        }
    }

    #[test]
    fn adjoint_of_the_adjoint_is_the_original_mesh() {
        let mesh = LatticeMesh::new(&[3, 2, 2], LatticeDomain::RealSpace);
        assert_eq!(mesh.adjoint().adjoint(), mesh);
        assert_eq!(mesh.adjoint().domain(), LatticeDomain::Momentum);
    }
}
