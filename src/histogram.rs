//! Weighted two-dimensional histogram of the first event
use std::{f64::consts::PI, io::Write};

use serde::{Deserialize, Serialize};

use crate::event::Event;

/// Uniformly binned axis
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct Axis {
    pub min: f64,
    pub max: f64,
    pub nbins: usize,
}

impl Axis {
    pub fn new(min: f64, max: f64, nbins: usize) -> Self {
        Self { min, max, nbins }
    }

    /// Bin containing `value`, or `None` if outside the axis range
    pub fn bin(&self, value: f64) -> Option<usize> {
        if !(value >= self.min && value < self.max) {
            return None;
        }
        let pos = (value - self.min) / (self.max - self.min) * self.nbins as f64;
        Some((pos as usize).min(self.nbins - 1))
    }
}

/// Two-dimensional histogram with weighted entries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram2D {
    pub name: String,
    pub x: Axis,
    pub y: Axis,
    /// Sum of weights, indexed as `bins[x][y]`
    pub bins: Vec<Vec<f64>>,
    /// Sum of weights of entries outside the axis ranges
    pub outside: f64,
    pub entries: u64,
}

impl Histogram2D {
    pub fn new(name: impl Into<String>, x: Axis, y: Axis) -> Self {
        Self {
            name: name.into(),
            x,
            y,
            bins: vec![vec![0.; y.nbins]; x.nbins],
            outside: 0.,
            entries: 0,
        }
    }

    /// Pseudorapidity-azimuth distribution with 100 x 100 bins
    ///
    /// Pseudorapidity ranges over [-12, 12] and the azimuth over [-π, π].
    pub fn eta_phi() -> Self {
        Self::new(
            "jetsDistribution",
            Axis::new(-12., 12., 100),
            Axis::new(-PI, PI, 100),
        )
    }

    pub fn fill(&mut self, x: f64, y: f64, weight: f64) {
        self.entries += 1;
        match (self.x.bin(x), self.y.bin(y)) {
            (Some(i), Some(j)) => self.bins[i][j] += weight,
            _ => self.outside += weight,
        }
    }

    /// Fill with the final-state particles of an event, weighted by
    /// transverse momentum
    pub fn fill_event(&mut self, event: &Event) {
        for particle in event.final_state() {
            let mut phi = f64::from(particle.p.phi());
            if phi >= PI {
                phi -= 2. * PI;
            }
            let eta = f64::from(particle.p.eta());
            self.fill(eta, phi, f64::from(particle.p.pt()));
        }
    }

    /// Sum of all weights inside the axis ranges
    pub fn integral(&self) -> f64 {
        self.bins.iter().flatten().sum()
    }

    pub fn write(&self, out: impl Write) -> Result<(), serde_yaml::Error> {
        serde_yaml::to_writer(out, self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use particle_id::ParticleID;

    use crate::{
        event::{EventBuilder, Vertex, NO_PARENT},
        four_vector::FourVector,
    };

    #[test]
    fn axis_bins() {
        let axis = Axis::new(-12., 12., 100);
        assert_eq!(axis.bin(-12.), Some(0));
        assert_eq!(axis.bin(0.), Some(50));
        assert_eq!(axis.bin(11.99), Some(99));
        assert_eq!(axis.bin(12.), None);
        assert_eq!(axis.bin(-12.5), None);
        assert_eq!(axis.bin(f64::NAN), None);
    }

    #[test]
    fn fill_from_event() {
        let mut ev = EventBuilder::new();
        let v = Vertex::default();
        let beam = FourVector::from_px_py_pz_e(0., 0., 100., 100.);
        ev.add_particle(ParticleID::new(2212), -12, false, beam, v, NO_PARENT);
        let p1 = FourVector::from_pt_rap_phi(10., 0.5, 0.3);
        ev.add_particle(ParticleID::new(211), 1, true, p1, v, 1);
        // azimuth above π ends up at negative values
        let p2 = FourVector::from_pt_rap_phi(4., -1., 1.5 * PI);
        ev.add_particle(ParticleID::new(22), 1, true, p2, v, 1);
        let ev = ev.build();

        let mut hist = Histogram2D::eta_phi();
        hist.fill_event(&ev);
        assert_eq!(hist.entries, 2);
        assert!((hist.integral() - 14.).abs() < 1e-12);
        assert_eq!(hist.outside, 0.);
        let i = hist.x.bin(f64::from(p2.eta())).unwrap();
        let j = hist.y.bin(-0.5 * PI).unwrap();
        assert!((hist.bins[i][j] - 4.).abs() < 1e-12);
    }

    #[test]
    fn yaml_output() {
        let mut hist = Histogram2D::new("test", Axis::new(0., 1., 2), Axis::new(0., 1., 2));
        hist.fill(0.25, 0.75, 3.);
        hist.fill(2., 0.5, 1.);
        let mut buf = Vec::new();
        hist.write(&mut buf).unwrap();
        let parsed: Histogram2D = serde_yaml::from_slice(&buf).unwrap();
        assert_eq!(parsed, hist);
        assert_eq!(parsed.bins, [[0., 3.], [0., 0.]]);
        assert_eq!(parsed.outside, 1.);
    }
}
