use noisy_float::prelude::*;
use particle_id::ParticleID;
use serde::{Deserialize, Serialize};

use crate::{cluster::Jet, event::Particle, species::is_heavy_quark};

/// Index of the jet nearest to the given direction and its distance
///
/// Distances are measured in the rapidity-azimuth plane. For equal
/// distances the jet that comes first wins. Since jets are sorted by
/// descending transverse momentum, this favours the harder jet.
pub fn nearest_jet(jets: &[Jet], parton: &Particle) -> Option<(usize, N64)> {
    let mut nearest: Option<(usize, N64)> = None;
    for (n, jet) in jets.iter().enumerate() {
        let delta_r = jet.momentum().delta_r(&parton.p);
        match nearest {
            Some((_, min)) if delta_r >= min => {}
            _ => nearest = Some((n, delta_r)),
        }
    }
    nearest
}

/// Whether the parton is a charm, bottom, or top quark
pub fn is_heavy_flavour(id: ParticleID) -> bool {
    is_heavy_quark(id)
}

/// Transverse momentum requirement for the associated jet
#[derive(Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq)]
pub struct Acceptance {
    /// Jets must have a transverse momentum strictly above this value
    pub min_pt: f64,
}

impl Acceptance {
    pub fn new(min_pt: f64) -> Self {
        Self { min_pt }
    }

    pub fn accepts(&self, jet: &Jet) -> bool {
        jet.momentum().pt() > self.min_pt
    }
}

/// Outcome of associating the reference parton with a jet
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Association {
    /// The event has no jets
    NoJets,
    /// The nearest jet fails the transverse momentum requirement
    BelowCutoff(JetMatch),
    /// The nearest jet is accepted
    Accepted(JetMatch),
}

/// The jet nearest to the reference parton
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct JetMatch {
    /// Position of the jet in the jet list
    pub jet: usize,
    pub delta_r: N64,
    pub parton: ParticleID,
    pub heavy_flavour: bool,
}

/// Select the jet nearest to `parton` and apply the acceptance requirement
pub fn associate(jets: &[Jet], parton: &Particle, acceptance: &Acceptance) -> Association {
    let Some((jet, delta_r)) = nearest_jet(jets, parton) else {
        return Association::NoJets;
    };
    let jet_match = JetMatch {
        jet,
        delta_r,
        parton: parton.id,
        heavy_flavour: is_heavy_flavour(parton.id),
    };
    if acceptance.accepts(&jets[jet]) {
        Association::Accepted(jet_match)
    } else {
        Association::BelowCutoff(jet_match)
    }
}
