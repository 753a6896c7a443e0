//! Two-particle vertex index grouping
//!
//! A two-particle object carries six indices in the standard layout
//! `(ν₁, ν₂, a, b, c, d) ↔ (0, 1, 2, 3, 4, 5)`: two fermionic Matsubara
//! frequencies followed by four target-space (orbital) indices. Matricizing
//! such an object — pairing one frequency with two orbitals on each side —
//! depends on the physical scattering channel. Each channel is one member
//! of a small closed set and carries its own static slot-permutation table,
//! selected at the call site.

/// The closed set of two-particle scattering channels
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Channel {
    /// Particle-hole: rows `(ν₁, a, b)`, columns `(ν₂, d, c)`
    ParticleHole,
    /// Crossed particle-hole: rows `(ν₁, a, d)`, columns `(ν₂, c, b)`
    ParticleHoleBar,
    /// Particle-particle: rows `(ν₁, a, c)`, columns `(ν₂, b, d)`
    ParticleParticle,
}

impl Channel {
    /// The slot permutation grouping the six standard-layout indices into
    /// the row triple followed by the column triple
    pub const fn stride_order(self) -> [usize; 6] {
        match self {
            Channel::ParticleHole => [0, 2, 3, 1, 5, 4],
            Channel::ParticleHoleBar => [0, 2, 5, 1, 4, 3],
            Channel::ParticleParticle => [0, 2, 4, 1, 3, 5],
        }
    }

    /// The matricized (row, column) of one vertex entry under this
    /// channel's grouping, row-major within each index triple
    ///
    /// `indices` and `extents` are given in the standard layout.
    pub fn grouped_index(self, indices: [usize; 6], extents: [usize; 6]) -> (usize, usize) {
        debug_assert!(indices
            .iter()
            .zip(&extents)
            .all(|(index, extent)| index < extent));
        let order = self.stride_order();
        let fold = |slots: &[usize]| {
            slots
                .iter()
                .fold(0, |flat, &slot| flat * extents[slot] + indices[slot])
        };
        (fold(&order[..3]), fold(&order[3..]))
    }
}
