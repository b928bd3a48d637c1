//! Recover the particle records behind jet constituents
//!
//! Jet clustering only sees momenta, so the sole link between a
//! constituent and the generated particle is the momentum itself. A
//! constituent matches a record if the summed absolute difference of
//! all four momentum components is below [MATCH_TOLERANCE].
use noisy_float::prelude::*;
use thiserror::Error;

use crate::{cluster::Jet, event::{Particle, ParticleIndex}, four_vector::FourVector};

/// Maximum summed absolute component difference for matching momenta
///
/// Tight enough to separate distinct soft particles, loose enough to
/// absorb round-off from recombination inside the clustering.
pub const MATCH_TOLERANCE: f64 = 1e-10;

/// A jet constituent together with its particle record
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ResolvedConstituent<'a> {
    pub momentum: FourVector,
    pub particle: &'a Particle,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("No particle matches constituent {0:?}")]
    NoMatch(FourVector),
    #[error("Constituent {momentum:?} matches both particle {first} and particle {second}")]
    Ambiguous {
        momentum: FourVector,
        first: ParticleIndex,
        second: ParticleIndex,
    },
    #[error("Constituents {first} and {second} both resolve to particle {particle}")]
    Duplicate {
        first: usize,
        second: usize,
        particle: ParticleIndex,
    },
}

/// Summed absolute difference of the momentum components
pub fn momentum_mismatch(p: &FourVector, q: &FourVector) -> N64 {
    p.abs_diff_sum(q)
}

/// Whether two momenta agree within [MATCH_TOLERANCE]
pub fn matches(p: &FourVector, q: &FourVector) -> bool {
    momentum_mismatch(p, q) < MATCH_TOLERANCE
}

/// Find the record matching the given constituent momentum
///
/// Records are scanned in order and the first match is returned. A
/// second match is reported as an error instead of silently picking
/// one of the candidates.
pub fn resolve<'a>(
    constituent: &FourVector,
    records: &'a [Particle],
) -> Result<&'a Particle, ResolveError> {
    let mut candidates = records.iter().filter(|r| matches(constituent, &r.p));
    let Some(first) = candidates.next() else {
        return Err(ResolveError::NoMatch(*constituent));
    };
    if let Some(second) = candidates.next() {
        return Err(ResolveError::Ambiguous {
            momentum: *constituent,
            first: first.index,
            second: second.index,
        });
    }
    Ok(first)
}

/// Resolve all constituents of a jet, in constituent order
///
/// Fails if any constituent cannot be resolved or if two constituents
/// resolve to the same particle.
pub fn resolve_jet<'a>(
    jet: &Jet,
    records: &'a [Particle],
) -> Result<Vec<ResolvedConstituent<'a>>, ResolveError> {
    let mut resolved: Vec<ResolvedConstituent<'a>> =
        Vec::with_capacity(jet.constituents().len());
    for (n, momentum) in jet.constituents().iter().enumerate() {
        let particle = resolve(momentum, records)?;
        if let Some(prev) = resolved
            .iter()
            .position(|c| c.particle.index == particle.index)
        {
            return Err(ResolveError::Duplicate {
                first: prev,
                second: n,
                particle: particle.index,
            });
        }
        resolved.push(ResolvedConstituent {
            momentum: *momentum,
            particle,
        });
    }
    Ok(resolved)
}
