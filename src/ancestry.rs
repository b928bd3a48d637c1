use std::fmt::Write;

use particle_id::ParticleID;
use thiserror::Error;

use crate::{
    event::{Event, ParticleIndex, NO_PARENT},
    species,
};

/// One link in a decay chain
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AncestryStep {
    pub id: ParticleID,
    pub index: ParticleIndex,
}

#[derive(Debug, Copy, Clone, Error, PartialEq, Eq)]
pub enum AncestryError {
    #[error("Particle index {index} is out of range for event with {len} particles")]
    OutOfRange { index: ParticleIndex, len: usize },
    #[error("Ancestry of particle {start} does not terminate after {steps} steps")]
    Cycle { start: ParticleIndex, steps: usize },
}

/// Walk from a particle through its parents up to the event root
///
/// The first step is the particle itself. Iteration stops at a parent
/// index of [NO_PARENT]. A chain can never be longer than the number of
/// particles in the event, so exceeding that length means the parent
/// links form a cycle and an error is returned. Iteration ends after
/// the first error.
#[derive(Clone, Debug)]
pub struct Ancestry<'a> {
    event: &'a Event,
    start: ParticleIndex,
    next: ParticleIndex,
    steps: usize,
}

impl<'a> Ancestry<'a> {
    pub fn new(event: &'a Event, index: ParticleIndex) -> Self {
        Self {
            event,
            start: index,
            next: index,
            steps: 0,
        }
    }

    fn stop(&mut self) {
        self.next = NO_PARENT;
    }
}

impl<'a> Iterator for Ancestry<'a> {
    type Item = Result<AncestryStep, AncestryError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next == NO_PARENT {
            return None;
        }
        let Some(particle) = self.event.get(self.next) else {
            let index = self.next;
            self.stop();
            return Some(Err(AncestryError::OutOfRange {
                index,
                len: self.event.len(),
            }));
        };
        if self.steps >= self.event.len() {
            let steps = self.steps;
            self.stop();
            return Some(Err(AncestryError::Cycle {
                start: self.start,
                steps,
            }));
        }
        self.steps += 1;
        self.next = particle.parent;
        Some(Ok(AncestryStep {
            id: particle.id,
            index: particle.index,
        }))
    }
}

/// Render the decay chain of a particle as `name<-name(index:i)<-...`
pub fn format_chain(event: &Event, index: ParticleIndex) -> Result<String, AncestryError> {
    let mut chain = String::new();
    for (n, step) in Ancestry::new(event, index).enumerate() {
        let step = step?;
        let name = species::name(step.id);
        if n == 0 {
            chain.push_str(&name);
        } else {
            // writing to a String can't fail
            let _ = write!(chain, "<-{name}(index:{})", step.index);
        }
    }
    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::event::{EventBuilder, Vertex};
    use crate::four_vector::FourVector;

    fn chain(depth: usize) -> Event {
        let mut ev = EventBuilder::new();
        let p = FourVector::from_px_py_pz_e(1., 0., 0., 1.);
        let mut parent = NO_PARENT;
        for _ in 0..depth {
            parent = ev.add_particle(ParticleID::new(21), -51, false, p, Vertex::default(), parent);
        }
        ev.build()
    }

    #[test]
    fn terminates_at_root() {
        for depth in 1..10 {
            let ev = chain(depth);
            let steps: Result<Vec<_>, _> = Ancestry::new(&ev, depth).collect();
            let steps = steps.unwrap();
            assert_eq!(steps.len(), depth);
            assert_eq!(steps.first().unwrap().index, depth);
            assert_eq!(steps.last().unwrap().index, 1);
        }
    }

    #[test]
    fn restartable() {
        let ev = chain(4);
        let ancestry = Ancestry::new(&ev, 3);
        assert_eq!(ancestry.clone().count(), 3);
        assert_eq!(ancestry.count(), 3);
    }

    #[test]
    fn cycle() {
        let mut ev = EventBuilder::new();
        let p = FourVector::from_px_py_pz_e(1., 0., 0., 1.);
        let a = ev.add_particle(ParticleID::new(1), -51, false, p, Vertex::default(), NO_PARENT);
        let b = ev.add_particle(ParticleID::new(2), -51, false, p, Vertex::default(), a);
        let c = ev.add_particle(ParticleID::new(3), -51, false, p, Vertex::default(), b);
        ev.set_parent(a, c);
        let ev = ev.build();

        let steps: Vec<_> = Ancestry::new(&ev, c).collect();
        assert_eq!(steps.len(), ev.len() + 1);
        assert_eq!(
            steps.last().unwrap(),
            &Err(AncestryError::Cycle { start: c, steps: 3 })
        );
        assert!(format_chain(&ev, c).is_err());
    }

    #[test]
    fn out_of_range() {
        let mut ev = EventBuilder::new();
        let p = FourVector::from_px_py_pz_e(1., 0., 0., 1.);
        ev.add_particle(ParticleID::new(211), 1, true, p, Vertex::default(), 9);
        let ev = ev.build();
        let steps: Vec<_> = Ancestry::new(&ev, 1).collect();
        assert_eq!(steps.len(), 2);
        assert_eq!(steps[1], Err(AncestryError::OutOfRange { index: 9, len: 1 }));
    }

    #[test]
    fn chain_names() {
        let mut ev = EventBuilder::new();
        let p = FourVector::from_px_py_pz_e(1., 0., 0., 1.);
        let v = Vertex::default();
        let proton = ev.add_particle(ParticleID::new(2212), -12, false, p, v, NO_PARENT);
        let b = ev.add_particle(ParticleID::new(5), -23, false, p, Vertex::default(), proton);
        let meson = ev.add_particle(ParticleID::new(-521), -83, false, p, Vertex::default(), b);
        let pion = ev.add_particle(ParticleID::new(-211), 1, true, p, Vertex::default(), meson);
        let ev = ev.build();
        assert_eq!(
            format_chain(&ev, pion).unwrap(),
            "pi-<-B-(index:3)<-b(index:2)<-p+(index:1)"
        );
    }
}
