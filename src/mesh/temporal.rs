//! Matsubara-frequency and imaginary-time meshes

use num_complex::Complex;
use std::f64::consts::PI;

/// Exchange statistic of the particles sampled on a thermal mesh
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Statistic {
    /// Antiperiodic in imaginary time, odd Matsubara frequencies
    Fermion,
    /// Periodic in imaginary time, even Matsubara frequencies
    Boson,
}

/// A finite window of Matsubara frequencies
///
/// The window of `points` indices is centered on zero: fermionic meshes
/// cover `n ∈ [-points/2, points/2)` with `iω_n = i(2n+1)π/β`, bosonic
/// meshes cover `n ∈ [-(points-1)/2, ..]` with `iΩ_n = i·2nπ/β`, so a
/// bosonic window always contains the zero frequency.
#[derive(Clone, Debug, PartialEq)]
pub struct MatsubaraMesh {
    beta: f64,
    statistic: Statistic,
    points: usize,
}

impl MatsubaraMesh {
    /// Builds a frequency mesh of `points` samples at inverse temperature `beta`
    ///
    /// # Panics
    /// If `beta` is not positive or `points` is zero.
    pub fn new(beta: f64, statistic: Statistic, points: usize) -> Self {
        assert!(beta > 0.0, "inverse temperature must be positive");
        assert!(points > 0, "a frequency mesh needs at least one point");
        Self {
            beta,
            statistic,
            points,
        }
    }

    /// Number of sampled frequencies
    pub fn len(&self) -> usize {
        self.points
    }

    /// A mesh always holds at least one point
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Inverse temperature β
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Particle statistic
    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    /// Matsubara index of the first sample in the window
    pub fn first_index(&self) -> i64 {
        match self.statistic {
            Statistic::Fermion => -(self.points as i64 / 2),
            Statistic::Boson => -((self.points as i64 - 1) / 2),
        }
    }

    /// Matsubara index of the last sample in the window
    pub fn last_index(&self) -> i64 {
        self.first_index() + self.points as i64 - 1
    }

    /// Matsubara index of the `i`-th sample
    pub fn index(&self, i: usize) -> i64 {
        debug_assert!(i < self.points);
        self.first_index() + i as i64
    }

    /// The purely imaginary frequency `iω` of the `i`-th sample
    pub fn frequency(&self, i: usize) -> Complex<f64> {
        let n = self.index(i) as f64;
        let omega = match self.statistic {
            Statistic::Fermion => (2.0 * n + 1.0) * PI / self.beta,
            Statistic::Boson => 2.0 * n * PI / self.beta,
        };
        Complex::new(0.0, omega)
    }

    /// Magnitude of the largest sampled frequency
    pub fn max_frequency(&self) -> f64 {
        self.frequency(0)
            .im
            .abs()
            .max(self.frequency(self.points - 1).im.abs())
    }

    /// Size of the adjoint time mesh when the caller does not request one:
    /// four times the positive-frequency count
    pub fn default_time_points(&self) -> usize {
        4 * (self.last_index() + 1) as usize
    }

    /// The adjoint imaginary-time mesh
    ///
    /// `time_points` selects the target size; a value of zero selects the
    /// documented default of [`Self::default_time_points`].
    pub fn adjoint(&self, time_points: usize) -> ImTimeMesh {
        let points = if time_points == 0 {
            self.default_time_points()
        } else {
            time_points
        };
        ImTimeMesh::new(self.beta, self.statistic, points)
    }
}

/// A uniform imaginary-time mesh on `[0, β)`
///
/// Sample `j` sits at `τ_j = βj/points`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImTimeMesh {
    beta: f64,
    statistic: Statistic,
    points: usize,
}

impl ImTimeMesh {
    /// Builds a time mesh of `points` samples at inverse temperature `beta`
    ///
    /// # Panics
    /// If `beta` is not positive or `points` is zero.
    pub fn new(beta: f64, statistic: Statistic, points: usize) -> Self {
        assert!(beta > 0.0, "inverse temperature must be positive");
        assert!(points > 0, "a time mesh needs at least one point");
        Self {
            beta,
            statistic,
            points,
        }
    }

    /// Number of sampled times
    pub fn len(&self) -> usize {
        self.points
    }

    /// A mesh always holds at least one point
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Inverse temperature β
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Particle statistic
    pub fn statistic(&self) -> Statistic {
        self.statistic
    }

    /// The imaginary time `τ_j` of the `j`-th sample
    pub fn time(&self, j: usize) -> f64 {
        debug_assert!(j < self.points);
        self.beta * j as f64 / self.points as f64
    }

    /// Size of the adjoint frequency mesh when the caller does not request one
    pub fn default_frequency_points(&self) -> usize {
        (self.points / 4).max(1)
    }

    /// The adjoint Matsubara mesh
    ///
    /// `frequency_points` selects the target size; a value of zero selects
    /// the documented default of [`Self::default_frequency_points`].
    pub fn adjoint(&self, frequency_points: usize) -> MatsubaraMesh {
        let points = if frequency_points == 0 {
            self.default_frequency_points()
        } else {
            frequency_points
        };
        MatsubaraMesh::new(self.beta, self.statistic, points)
    }
}
