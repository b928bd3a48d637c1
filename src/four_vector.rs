use std::f64::consts::PI;

use jetty::PseudoJet;
use noisy_float::prelude::*;
use serde::{Deserialize, Serialize};

/// Rapidity assigned to momenta without a transverse component
pub const MAX_RAP: f64 = 1e5;

/// A basic four-vector
///
/// The zero component is the energy/time component. The remainder are
/// the spatial components
#[derive(
    Deserialize,
    Serialize,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Debug,
    Clone,
    Copy,
    Default,
)]
pub struct FourVector {
    pt: N64,
    p: [N64; 4],
}

impl FourVector {
    /// Construct a new four-vector
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct from momentum components in the order px, py, pz, E
    pub fn from_px_py_pz_e(px: f64, py: f64, pz: f64, e: f64) -> Self {
        [n64(e), n64(px), n64(py), n64(pz)].into()
    }

    /// Construct a massless vector from transverse momentum, rapidity, and azimuth
    pub fn from_pt_rap_phi(pt: f64, rap: f64, phi: f64) -> Self {
        Self::from_pt_rap_phi_m(pt, rap, phi, 0.)
    }

    /// Construct a vector from transverse momentum, rapidity, azimuth, and mass
    pub fn from_pt_rap_phi_m(pt: f64, rap: f64, phi: f64, m: f64) -> Self {
        let mt = (pt * pt + m * m).sqrt();
        Self::from_px_py_pz_e(
            pt * phi.cos(),
            pt * phi.sin(),
            mt * rap.sinh(),
            mt * rap.cosh(),
        )
    }

    pub fn e(&self) -> N64 {
        self.p[0]
    }

    pub fn px(&self) -> N64 {
        self.p[1]
    }

    pub fn py(&self) -> N64 {
        self.p[2]
    }

    pub fn pz(&self) -> N64 {
        self.p[3]
    }

    /// The spatial norm \sqrt{\sum v_i^2} with i = 1,2,3
    pub fn spatial_norm(&self) -> N64 {
        self.spatial_norm_sq().sqrt()
    }

    /// The square \sum v_i^2 with i = 1,2,3 of the spatial norm
    pub fn spatial_norm_sq(&self) -> N64 {
        self.p.iter().skip(1).map(|e| *e * *e).sum()
    }

    /// The scalar transverse momentum
    pub fn pt(&self) -> N64 {
        self.pt
    }

    const fn len() -> usize {
        4
    }

    fn update_pt(&mut self) {
        self.pt = (self.p[1] * self.p[1] + self.p[2] * self.p[2]).sqrt();
    }

    /// The invariant mass square v_0^2 - \sum v_i^2 with i = 1,2,3
    pub fn m_sq(&self) -> N64 {
        self.p[0] * self.p[0] - self.spatial_norm_sq()
    }

    /// The rapidity 1/2 log((E + pz)/(E - pz))
    ///
    /// Vectors with E <= |pz| are assigned a rapidity of ±[MAX_RAP].
    pub fn rap(&self) -> N64 {
        let e = f64::from(self.e());
        let pz = f64::from(self.pz());
        if e <= pz.abs() {
            let rap = if pz >= 0. { MAX_RAP } else { -MAX_RAP };
            return n64(rap);
        }
        n64(0.5 * ((e + pz) / (e - pz)).ln())
    }

    /// The pseudorapidity asinh(pz/pt)
    pub fn eta(&self) -> N64 {
        let pt = f64::from(self.pt);
        let pz = f64::from(self.pz());
        if pt == 0. {
            let eta = if pz >= 0. { MAX_RAP } else { -MAX_RAP };
            return n64(eta);
        }
        n64((pz / pt).asinh())
    }

    /// The azimuthal angle in [0, 2π)
    pub fn phi(&self) -> N64 {
        let phi = f64::from(self.py()).atan2(f64::from(self.px()));
        if phi < 0. {
            n64(phi + 2. * PI)
        } else {
            n64(phi)
        }
    }

    /// Azimuthal distance in [0, π]
    pub fn delta_phi(&self, other: &FourVector) -> N64 {
        let dphi = (self.phi() - other.phi()).abs();
        if dphi > PI {
            n64(2. * PI) - dphi
        } else {
            dphi
        }
    }

    /// Euclidean distance in the rapidity-azimuth plane
    pub fn delta_r(&self, other: &FourVector) -> N64 {
        let drap = self.rap() - other.rap();
        let dphi = self.delta_phi(other);
        (drap * drap + dphi * dphi).sqrt()
    }

    /// The sum of the absolute differences of all components
    pub fn abs_diff_sum(&self, other: &FourVector) -> N64 {
        self.p
            .iter()
            .zip(other.p.iter())
            .map(|(a, b)| (*a - *b).abs())
            .sum()
    }
}

impl std::convert::From<[N64; 4]> for FourVector {
    fn from(p: [N64; 4]) -> FourVector {
        let mut res = FourVector {
            p,
            pt: std::default::Default::default(),
        };
        res.update_pt();
        res
    }
}

impl std::ops::Index<usize> for FourVector {
    type Output = N64;

    fn index(&self, i: usize) -> &Self::Output {
        &self.p[i]
    }
}

impl std::ops::AddAssign for FourVector {
    fn add_assign(&mut self, rhs: FourVector) {
        for i in 0..Self::len() {
            self.p[i] += rhs[i]
        }
        self.update_pt();
    }
}

impl std::ops::Add for FourVector {
    type Output = Self;

    fn add(mut self, rhs: FourVector) -> Self::Output {
        self += rhs;
        self
    }
}

impl std::ops::MulAssign<N64> for FourVector {
    fn mul_assign(&mut self, rhs: N64) {
        for p in &mut self.p {
            *p *= rhs
        }
        self.update_pt();
    }
}

impl std::ops::Mul<N64> for FourVector {
    type Output = Self;

    fn mul(mut self, rhs: N64) -> Self::Output {
        self *= rhs;
        self
    }
}

impl std::iter::Sum for FourVector {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(FourVector::new(), |acc, p| acc + p)
    }
}

impl From<PseudoJet> for FourVector {
    fn from(p: PseudoJet) -> Self {
        [p.e(), p.px(), p.py(), p.pz()].into()
    }
}

impl From<FourVector> for PseudoJet {
    fn from(p: FourVector) -> Self {
        (&p).into()
    }
}

impl From<&FourVector> for PseudoJet {
    fn from(p: &FourVector) -> Self {
        [p[0], p[1], p[2], p[3]].into()
    }
}
