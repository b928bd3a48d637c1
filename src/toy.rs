//! A toy event generator
//!
//! Produces event records with the layout of a Pythia event listing:
//! two beam protons, two incoming partons, the two outgoing partons of
//! the hard scattering at indices 5 and 6, followed by showered hadrons
//! and their decay products. The physics is crude. What matters is that
//! the records have realistic structure: collimated sprays of hadrons
//! around the outgoing partons, heavy-flavour hadrons decaying at
//! displaced vertices, semileptonic decays with neutrinos, and soft beam
//! remnants.
use std::f64::consts::PI;

use log::trace;
use particle_id::{
    baryons::{neutron, proton},
    mesons::{π_0, π_plus, B_0, B_plus, D_0, D_plus, K_0_L, K_plus},
    sm_elementary_particles::{
        bottom, charm, down, electron, electron_neutrino, gluon, photon, strange, up,
    },
    ParticleID,
};
use rand::{seq::SliceRandom, Rng, SeedableRng};
use rand_xoshiro::Xoshiro256Plus;
use thiserror::Error;

use crate::{
    event::{Event, EventBuilder, ParticleIndex, Vertex, NO_PARENT},
    four_vector::FourVector,
    traits::Generate,
};

/// Centre-of-mass energy in GeV
pub const DEFAULT_SQRT_S: f64 = 200.;
/// Index of the first outgoing parton of the hard scattering
pub const HARD_PARTON_INDEX: ParticleIndex = 5;

const MAX_TRIES: usize = 100;

// status codes following the Pythia conventions
const STATUS_BEAM: i32 = -12;
const STATUS_INCOMING: i32 = -21;
const STATUS_OUTGOING: i32 = -23;
const STATUS_SHOWER: i32 = -51;
const STATUS_DECAYED: i32 = -91;
const STATUS_FINAL: i32 = 91;
const STATUS_REMNANT: i32 = 63;

const PROTON_MASS: f64 = 0.938272;
const PION_MASS: f64 = 0.13957;
const PI0_MASS: f64 = 0.1349768;
const KAON_MASS: f64 = 0.493677;
const NEUTRON_MASS: f64 = 0.939565;

// (species, mass, relative abundance) of hadrons produced in showers
const SHOWER_HADRONS: &[(ParticleID, f64, u32)] = &[
    (π_plus, PION_MASS, 30),
    (π_plus.anti(), PION_MASS, 30),
    (π_0, PI0_MASS, 20),
    (K_plus, KAON_MASS, 5),
    (K_plus.anti(), KAON_MASS, 5),
    (K_0_L, 0.497611, 4),
    (proton, PROTON_MASS, 2),
    (proton.anti(), PROTON_MASS, 2),
    (neutron, NEUTRON_MASS, 1),
    (photon, 0., 1),
];

// products of hadronic heavy-flavour decays
const DECAY_PRODUCTS: [(ParticleID, f64); 4] = [
    (π_plus, PION_MASS),
    (π_plus.anti(), PION_MASS),
    (π_0, PI0_MASS),
    (K_plus.anti(), KAON_MASS),
];

fn conjugate(id: ParticleID, anti: bool) -> ParticleID {
    if anti {
        id.anti()
    } else {
        id
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ToyError {
    #[error("Event generation failed")]
    Failed,
    #[error("No valid hard scattering kinematics after {0} attempts")]
    Kinematics(usize),
}

/// Seeded toy event generator
#[derive(Clone, Debug)]
pub struct ToyGenerator<R = Xoshiro256Plus> {
    rng: R,
    sqrt_s: f64,
    min_pt: f64,
    max_rap: f64,
    failure_probability: f64,
}

impl ToyGenerator<Xoshiro256Plus> {
    /// Generator with default settings and the given random seed
    pub fn from_seed(seed: u64) -> Self {
        Self::new(Xoshiro256Plus::seed_from_u64(seed))
    }
}

impl<R: Rng> ToyGenerator<R> {
    pub fn new(rng: R) -> Self {
        Self {
            rng,
            sqrt_s: DEFAULT_SQRT_S,
            min_pt: 10.,
            max_rap: 1.5,
            failure_probability: 0.,
        }
    }

    /// Minimum transverse momentum of the hard scattering
    pub fn min_pt(mut self, min_pt: f64) -> Self {
        self.min_pt = min_pt;
        self
    }

    /// Probability that generating an event fails
    pub fn failure_probability(mut self, p: f64) -> Self {
        self.failure_probability = p;
        self
    }

    fn hard_flavours(&mut self) -> [ParticleID; 4] {
        let anti = self.rng.gen_bool(0.5);
        let r: f64 = self.rng.gen();
        if r < 0.35 {
            // gg -> gg
            [gluon; 4]
        } else if r < 0.8 {
            // qg -> qg
            let q = *[down, up, strange].choose(&mut self.rng).unwrap_or(&up);
            let q = conjugate(q, anti);
            [q, gluon, q, gluon]
        } else {
            // gg -> QQbar
            let q = if self.rng.gen_bool(0.5) { charm } else { bottom };
            [gluon, gluon, conjugate(q, anti), conjugate(q, !anti)]
        }
    }

    fn hard_kinematics(&mut self) -> Option<[FourVector; 4]> {
        let e_beam = self.sqrt_s / 2.;
        // steeply falling transverse momentum spectrum
        let u: f64 = self.rng.gen();
        let pt = self.min_pt / (1. - 0.9 * u).sqrt();
        let y3 = self.rng.gen_range(-self.max_rap..self.max_rap);
        let y4 = self.rng.gen_range(-self.max_rap..self.max_rap);
        let x1 = pt / self.sqrt_s * (y3.exp() + y4.exp());
        let x2 = pt / self.sqrt_s * ((-y3).exp() + (-y4).exp());
        if x1 >= 1. || x2 >= 1. {
            return None;
        }
        let phi = self.rng.gen_range(0. ..2. * PI);
        Some([
            FourVector::from_px_py_pz_e(0., 0., x1 * e_beam, x1 * e_beam),
            FourVector::from_px_py_pz_e(0., 0., -x2 * e_beam, x2 * e_beam),
            FourVector::from_pt_rap_phi(pt, y3, phi),
            FourVector::from_pt_rap_phi(pt, y4, phi + PI),
        ])
    }

    fn hadron_species(&mut self) -> (ParticleID, f64) {
        let &(id, m, _) = SHOWER_HADRONS
            .choose_weighted(&mut self.rng, |h| h.2)
            .unwrap_or(&SHOWER_HADRONS[0]);
        (id, m)
    }

    // Fragment the parton with the given index into a spray of hadrons
    fn shower(
        &mut self,
        ev: &mut EventBuilder,
        parton: ParticleIndex,
        p: FourVector,
        id: ParticleID,
    ) {
        let sp = ev.add_particle(id, STATUS_SHOWER, false, p, Vertex::default(), parton);
        let heavy = [charm, bottom].contains(&id.abs());
        let nhadrons = self.rng.gen_range(3..=10);
        let mut weights: Vec<f64> =
            (0..nhadrons).map(|_| self.rng.gen::<f64>() + 0.05).collect();
        if heavy {
            // the heavy hadron takes the leading share
            weights[0] = weights.iter().sum::<f64>() * 2.;
        }
        let norm: f64 = weights.iter().sum();
        let pt = f64::from(p.pt());
        let rap = f64::from(p.rap());
        let phi = f64::from(p.phi());
        for (n, w) in weights.into_iter().enumerate() {
            let z = w / norm;
            let spread = 0.25 * (1. - z);
            let hpt = z * pt;
            let hrap = rap + self.rng.gen_range(-spread..=spread);
            let hphi = phi + self.rng.gen_range(-spread..=spread);
            if heavy && n == 0 {
                self.heavy_hadron(ev, sp, id, hpt, hrap, hphi);
                continue;
            }
            let (hid, m) = self.hadron_species();
            let hp = FourVector::from_pt_rap_phi_m(hpt, hrap, hphi, m);
            self.add_hadron(ev, hid, hp, Vertex::default(), sp);
        }
    }

    // Add a hadron, decaying neutral pions into photon pairs
    fn add_hadron(
        &mut self,
        ev: &mut EventBuilder,
        id: ParticleID,
        p: FourVector,
        vertex: Vertex,
        parent: ParticleIndex,
    ) {
        if id != π_0 {
            ev.add_particle(id, STATUS_FINAL, true, p, vertex, parent);
            return;
        }
        let pi0 = ev.add_particle(id, STATUS_DECAYED, false, p, vertex, parent);
        let z = self.rng.gen_range(0.1..0.9);
        let pt = f64::from(p.pt());
        let rap = f64::from(p.rap());
        let phi = f64::from(p.phi());
        let dphi = self.rng.gen_range(-0.02..0.02);
        for (frac, dphi) in [(z, dphi), (1. - z, -dphi)] {
            let gamma = FourVector::from_pt_rap_phi(frac * pt, rap, phi + dphi);
            ev.add_particle(photon, STATUS_FINAL, true, gamma, vertex, pi0);
        }
    }

    // Heavy-flavour hadron decaying at a displaced vertex
    fn heavy_hadron(
        &mut self,
        ev: &mut EventBuilder,
        parent: ParticleIndex,
        quark: ParticleID,
        pt: f64,
        rap: f64,
        phi: f64,
    ) {
        // (species, mass, c tau in mm) of the hadron containing the quark
        let candidates = if quark.abs() == bottom {
            [(B_plus, 5.279, 0.491), (B_0, 5.280, 0.455)]
        } else {
            [(D_0, 1.865, 0.123), (D_plus, 1.870, 0.312)]
        };
        let (species, m, ctau) = *candidates.choose(&mut self.rng).unwrap_or(&candidates[0]);
        // a b quark hadronises into an anti-B meson
        let anti = quark.is_anti_particle() != (quark.abs() == bottom);
        let p = FourVector::from_pt_rap_phi_m(pt, rap, phi, m);
        let hadron = ev.add_particle(
            conjugate(species, anti),
            STATUS_DECAYED,
            false,
            p,
            Vertex::default(),
            parent,
        );

        let pabs = f64::from(p.spatial_norm());
        let e = f64::from(p.e());
        let decay_length = -ctau * (1. - self.rng.gen::<f64>()).ln() * pabs / m;
        let dir = [p.px(), p.py(), p.pz()].map(|c| f64::from(c) / pabs);
        let vertex = Vertex::new(
            decay_length * dir[0],
            decay_length * dir[1],
            decay_length * dir[2],
            decay_length * e / pabs,
        );

        let semileptonic = self.rng.gen_bool(0.2);
        let nproducts = self.rng.gen_range(2..=4);
        let mut weights: Vec<f64> =
            (0..nproducts).map(|_| self.rng.gen::<f64>() + 0.1).collect();
        let norm: f64 = weights.iter().sum();
        weights.iter_mut().for_each(|w| *w /= norm);
        for (n, z) in weights.into_iter().enumerate() {
            let dpt = z * pt;
            let drap = rap + self.rng.gen_range(-0.1..0.1);
            let dphi = phi + self.rng.gen_range(-0.1..0.1);
            let (id, m) = match (semileptonic, n) {
                (true, 0) => (conjugate(electron, !anti), 0.000511),
                (true, 1) => (conjugate(electron_neutrino, anti), 0.),
                _ => *DECAY_PRODUCTS.choose(&mut self.rng).unwrap_or(&DECAY_PRODUCTS[0]),
            };
            let dp = FourVector::from_pt_rap_phi_m(dpt, drap, dphi, m);
            self.add_hadron(ev, id, dp, vertex, hadron);
        }
    }

    fn beam_remnants(&mut self, ev: &mut EventBuilder, beam: ParticleIndex, forward: bool) {
        let n = self.rng.gen_range(1..=3);
        for _ in 0..n {
            let pt = self.rng.gen_range(0.2..1.5);
            let rap = self.rng.gen_range(3.0..5.0);
            let rap = if forward { rap } else { -rap };
            let phi = self.rng.gen_range(0. ..2. * PI);
            let id = *[π_plus, π_plus.anti(), neutron]
                .choose(&mut self.rng)
                .unwrap_or(&π_plus);
            let m = if id == neutron { NEUTRON_MASS } else { PION_MASS };
            let p = FourVector::from_pt_rap_phi_m(pt, rap, phi, m);
            ev.add_particle(id, STATUS_REMNANT, true, p, Vertex::default(), beam);
        }
    }

    fn generate_event(&mut self) -> Result<Event, ToyError> {
        if self.failure_probability > 0. && self.rng.gen_bool(self.failure_probability) {
            return Err(ToyError::Failed);
        }
        let kinematics = (0..MAX_TRIES).find_map(|_| self.hard_kinematics());
        let Some([pa, pb, pc, pd]) = kinematics else {
            return Err(ToyError::Kinematics(MAX_TRIES));
        };
        let [a, b, c, d] = self.hard_flavours();

        let e_beam = self.sqrt_s / 2.;
        let pz_beam = (e_beam * e_beam - PROTON_MASS * PROTON_MASS).sqrt();
        let mut ev = EventBuilder::with_capacity(64);
        let zero = Vertex::default();
        let beam1 = ev.add_particle(
            proton,
            STATUS_BEAM,
            false,
            FourVector::from_px_py_pz_e(0., 0., pz_beam, e_beam),
            zero,
            NO_PARENT,
        );
        let beam2 = ev.add_particle(
            proton,
            STATUS_BEAM,
            false,
            FourVector::from_px_py_pz_e(0., 0., -pz_beam, e_beam),
            zero,
            NO_PARENT,
        );
        let inc1 = ev.add_particle(a, STATUS_INCOMING, false, pa, zero, beam1);
        ev.add_particle(b, STATUS_INCOMING, false, pb, zero, beam2);
        let out1 = ev.add_particle(c, STATUS_OUTGOING, false, pc, zero, inc1);
        let out2 = ev.add_particle(d, STATUS_OUTGOING, false, pd, zero, inc1);
        debug_assert_eq!(out1, HARD_PARTON_INDEX);

        self.shower(&mut ev, out1, pc, c);
        self.shower(&mut ev, out2, pd, d);
        self.beam_remnants(&mut ev, beam1, true);
        self.beam_remnants(&mut ev, beam2, false);
        trace!("Generated event with {} particles", ev.len());
        Ok(ev.build())
    }
}

impl<R: Rng> Generate for ToyGenerator<R> {
    type Error = ToyError;

    fn generate(&mut self) -> Result<Option<Event>, Self::Error> {
        self.generate_event().map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::species::{is_heavy_quark, is_neutrino};

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    #[test]
    fn record_layout() {
        log_init();
        let mut gen = ToyGenerator::from_seed(1);
        for _ in 0..50 {
            let ev = gen.generate().unwrap().unwrap();
            for (n, p) in ev.particles().iter().enumerate() {
                assert_eq!(p.index, n + 1);
                assert!(p.parent < p.index);
                if p.is_final {
                    assert!(p.status > 0);
                } else {
                    assert!(p.status < 0);
                }
            }
            let parton = ev.get(HARD_PARTON_INDEX).unwrap();
            assert_eq!(parton.status, STATUS_OUTGOING);
            assert!(parton.p.pt() >= 10.);
            assert!(ev.final_state().count() > 6);
        }
    }

    #[test]
    fn reproducible() {
        let mut gen1 = ToyGenerator::from_seed(42);
        let mut gen2 = ToyGenerator::from_seed(42);
        for _ in 0..5 {
            assert_eq!(gen1.generate().unwrap(), gen2.generate().unwrap());
        }
        let mut gen3 = ToyGenerator::from_seed(43);
        assert_ne!(gen1.generate().unwrap(), gen3.generate().unwrap());
    }

    #[test]
    fn heavy_flavour_decays() {
        let mut gen = ToyGenerator::from_seed(7);
        let mut displaced = 0;
        let mut neutrinos = 0;
        for _ in 0..200 {
            let ev = gen.generate().unwrap().unwrap();
            let parton = ev.get(HARD_PARTON_INDEX).unwrap();
            let has_displaced = ev.final_state().any(|p| !p.vertex.is_origin());
            if has_displaced {
                assert!(is_heavy_quark(parton.id));
                displaced += 1;
            }
            neutrinos += ev.final_state().filter(|p| is_neutrino(p.id)).count();
        }
        assert!(displaced > 0);
        assert!(neutrinos > 0);
    }

    #[test]
    fn hard_scattering_threshold() {
        let mut gen = ToyGenerator::from_seed(3).min_pt(30.);
        for _ in 0..20 {
            let ev = gen.generate().unwrap().unwrap();
            for index in [HARD_PARTON_INDEX, HARD_PARTON_INDEX + 1] {
                assert!(ev.get(index).unwrap().p.pt() >= 30. - 1e-9);
            }
        }
    }

    #[test]
    fn failures() {
        let mut gen = ToyGenerator::from_seed(5).failure_probability(0.5);
        let results: Vec<_> = (0..100).map(|_| gen.generate()).collect();
        assert!(results.iter().any(|r| r == &Err(ToyError::Failed)));
        assert!(results.iter().any(|r| r.is_ok()));
    }
}
