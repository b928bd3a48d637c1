use std::{
    collections::HashMap,
    fmt::{self, Display},
    str::FromStr,
};

use jetty::{anti_kt_f, cambridge_aachen_f, kt_f, ClusterHistory, ClusterStep, PseudoJet};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{four_vector::FourVector, traits::Clustering};

/// A jet: the combined momentum of its constituents
///
/// Constituents are bare momenta without any particle identity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Jet {
    p: FourVector,
    constituents: Vec<FourVector>,
}

impl Jet {
    /// A jet with the momentum sum of the given constituents
    pub fn from_constituents(constituents: Vec<FourVector>) -> Self {
        let p = constituents.iter().copied().sum();
        Self { p, constituents }
    }

    /// A jet with the given momentum and constituents
    pub fn new(p: FourVector, constituents: Vec<FourVector>) -> Self {
        Self { p, constituents }
    }

    pub fn momentum(&self) -> &FourVector {
        &self.p
    }

    pub fn constituents(&self) -> &[FourVector] {
        &self.constituents
    }
}

/// Placeholder for an unknown jet algorithm
#[derive(Debug, Clone, Error)]
pub struct UnknownJetAlgorithm(String);

impl Display for UnknownJetAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown jet algorithm: {}", self.0)
    }
}

impl FromStr for JetAlgorithm {
    type Err = UnknownJetAlgorithm;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "anti_kt" | "antikt" | "anti-kt" => Ok(Self::AntiKt),
            "kt" => Ok(Self::Kt),
            "Cambridge/Aachen" | "Cambridge-Aachen" | "Cambridge_Aachen"
            | "cambridge/aachen" | "cambridge-aachen" | "cambridge_aachen" => {
                Ok(Self::CambridgeAachen)
            }
            _ => Err(UnknownJetAlgorithm(s.to_string())),
        }
    }
}

/// Jet clustering algorithms
#[derive(Deserialize, Serialize, Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum JetAlgorithm {
    /// The [anti-kt](https://arxiv.org/abs/0802.1189) algorithm
    #[default]
    AntiKt,
    /// The [Cambridge](https://arxiv.org/abs/hep-ph/9707323)/[Aachen](https://arxiv.org/abs/hep-ph/9907280) algorithm
    CambridgeAachen,
    /// The [kt](https://arxiv.org/abs/hep-ph/9305266) algorithm
    Kt,
}

impl Display for JetAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            JetAlgorithm::AntiKt => "anti-kt",
            JetAlgorithm::CambridgeAachen => "Cambridge/Aachen",
            JetAlgorithm::Kt => "kt",
        };
        write!(f, "{name}")
    }
}

/// Definition of a jet
#[derive(Deserialize, Serialize, Debug, Copy, Clone, PartialEq)]
pub struct JetDefinition {
    /// Jet algorithm
    pub algorithm: JetAlgorithm,
    /// Jet radius parameter
    pub radius: f64,
    /// Minimum jet transverse momentum
    pub min_pt: f64,
}

impl Default for JetDefinition {
    fn default() -> Self {
        Self {
            algorithm: JetAlgorithm::AntiKt,
            radius: 0.7,
            min_pt: 0.,
        }
    }
}

impl JetDefinition {
    fn history(&self, partons: Vec<PseudoJet>) -> ClusterHistory<'static> {
        let r = self.radius;
        match self.algorithm {
            JetAlgorithm::AntiKt => ClusterHistory::new(partons, anti_kt_f(r)),
            JetAlgorithm::Kt => ClusterHistory::new(partons, kt_f(r)),
            JetAlgorithm::CambridgeAachen => {
                ClusterHistory::new(partons, cambridge_aachen_f(r))
            }
        }
    }
}

// Input indices of the pseudojets that are still being clustered.
// Identical momenta share a key, so each key holds a stack of groups.
#[derive(Debug, Default)]
struct Constituents(HashMap<PseudoJet, Vec<Vec<usize>>>);

impl Constituents {
    fn insert(&mut self, p: PseudoJet, inputs: Vec<usize>) {
        self.0.entry(p).or_default().push(inputs)
    }

    fn remove(&mut self, p: &PseudoJet) -> Vec<usize> {
        let Some(groups) = self.0.get_mut(p) else {
            return Vec::new();
        };
        let inputs = groups.pop().unwrap_or_default();
        if groups.is_empty() {
            self.0.remove(p);
        }
        inputs
    }
}

impl Clustering for JetDefinition {
    /// Exclusive sequential recombination in the E scheme
    ///
    /// Jets are kept if their transverse momentum exceeds `min_pt`.
    /// The constituents of each jet are listed in input order.
    fn cluster(&self, inputs: &[FourVector]) -> Vec<Jet> {
        let partons: Vec<PseudoJet> = inputs.iter().map(|p| p.into()).collect();
        let mut constituents = Constituents::default();
        for (n, p) in partons.iter().enumerate() {
            constituents.insert(*p, vec![n]);
        }
        let min_pt2 = self.min_pt * self.min_pt;
        let mut jets = Vec::new();
        for step in self.history(partons) {
            match step {
                ClusterStep::Combine([p1, p2]) => {
                    let mut merged = constituents.remove(&p1);
                    merged.extend(constituents.remove(&p2));
                    constituents.insert(p1 + p2, merged);
                }
                ClusterStep::Jet(jet) => {
                    let mut members = constituents.remove(&jet);
                    if jet.pt2() > min_pt2 {
                        members.sort_unstable();
                        let members =
                            members.into_iter().map(|n| inputs[n]).collect();
                        jets.push(Jet::new(jet.into(), members));
                    }
                }
            }
        }
        debug_assert!(constituents.0.is_empty());
        jets.sort_by(|a, b| b.momentum().pt().cmp(&a.momentum().pt()));
        jets
    }

    fn description(&self) -> String {
        format!(
            "Longitudinally invariant {} algorithm with R = {} and E scheme recombination, jet pt > {} GeV",
            self.algorithm, self.radius, self.min_pt
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use noisy_float::prelude::*;

    fn inputs() -> Vec<FourVector> {
        vec![
            FourVector::from_pt_rap_phi(30., 0.1, 1.0),
            FourVector::from_pt_rap_phi(2., -2.0, 4.0),
            FourVector::from_pt_rap_phi(10., 0.0, 1.2),
            FourVector::from_pt_rap_phi(50., -1.0, 4.0),
            FourVector::from_pt_rap_phi(5., -1.2, 4.1),
        ]
    }

    #[test]
    fn parse_algorithm() {
        assert_eq!("anti-kt".parse::<JetAlgorithm>().unwrap(), JetAlgorithm::AntiKt);
        assert_eq!("kt".parse::<JetAlgorithm>().unwrap(), JetAlgorithm::Kt);
        assert_eq!(
            "cambridge_aachen".parse::<JetAlgorithm>().unwrap(),
            JetAlgorithm::CambridgeAachen
        );
        assert!("siscone".parse::<JetAlgorithm>().is_err());
    }

    #[test]
    fn anti_kt() {
        let jet_def = JetDefinition {
            algorithm: JetAlgorithm::AntiKt,
            radius: 0.4,
            min_pt: 0.,
        };
        let inputs = inputs();
        let jets = jet_def.cluster(&inputs);
        assert_eq!(jets.len(), 3);
        assert_eq!(jets[0].constituents(), [inputs[3], inputs[4]]);
        assert_eq!(jets[1].constituents(), [inputs[0], inputs[2]]);
        assert_eq!(jets[2].constituents(), [inputs[1]]);
        assert!(jets.windows(2).all(|j| j[0].momentum().pt() >= j[1].momentum().pt()));
    }

    #[test]
    fn every_input_in_one_jet() {
        for algorithm in [JetAlgorithm::AntiKt, JetAlgorithm::Kt, JetAlgorithm::CambridgeAachen] {
            let jet_def = JetDefinition {
                algorithm,
                radius: 0.7,
                min_pt: 0.,
            };
            let inputs = inputs();
            let jets = jet_def.cluster(&inputs);
            let nconstituents: usize = jets.iter().map(|j| j.constituents().len()).sum();
            assert_eq!(nconstituents, inputs.len());
            for p in &inputs {
                let n = jets
                    .iter()
                    .filter(|j| j.constituents().contains(p))
                    .count();
                assert_eq!(n, 1);
            }
            for jet in &jets {
                let sum: FourVector = jet.constituents().iter().copied().sum();
                assert!(sum.abs_diff_sum(jet.momentum()) < n64(1e-9));
            }
        }
    }

    #[test]
    fn min_pt() {
        let jet_def = JetDefinition {
            algorithm: JetAlgorithm::AntiKt,
            radius: 0.4,
            min_pt: 20.,
        };
        let jets = jet_def.cluster(&inputs());
        assert_eq!(jets.len(), 2);
        assert!(jets.iter().all(|j| j.momentum().pt() > 20.));
    }

    #[test]
    fn many_inputs() {
        // enough inputs for the tiled clustering strategy
        let inputs: Vec<_> = (0..120)
            .map(|n| {
                let n = n as f64;
                FourVector::from_pt_rap_phi(
                    1. + (n * 0.37) % 20.,
                    -3. + (n * 0.71) % 6.,
                    (n * 1.13) % 6.,
                )
            })
            .collect();
        let jets = JetDefinition::default().cluster(&inputs);
        let nconstituents: usize = jets.iter().map(|j| j.constituents().len()).sum();
        assert_eq!(nconstituents, inputs.len());
        for jet in &jets {
            let sum: FourVector = jet.constituents().iter().copied().sum();
            assert!(sum.abs_diff_sum(jet.momentum()) < n64(1e-8));
        }
    }

    #[test]
    fn identical_inputs() {
        let p = FourVector::from_pt_rap_phi(10., 0.5, 2.);
        let jets = JetDefinition::default().cluster(&[p, p]);
        assert_eq!(jets.len(), 1);
        assert_eq!(jets[0].constituents(), [p, p]);
    }

    #[test]
    fn no_inputs() {
        assert!(JetDefinition::default().cluster(&[]).is_empty());
    }
}
