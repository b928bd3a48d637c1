use crate::four_vector::FourVector;

use noisy_float::prelude::*;
use particle_id::ParticleID;
use serde::{Deserialize, Serialize};

/// Index of a particle within its event
///
/// Indices start at 1. The value [NO_PARENT] marks the absence of a parent.
pub type ParticleIndex = usize;

/// Parent index of particles without a parent, e.g. beam particles
pub const NO_PARENT: ParticleIndex = 0;

/// Production vertex of a particle
#[derive(
    Deserialize, Serialize, Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord,
)]
pub struct Vertex {
    pub x: N64,
    pub y: N64,
    pub z: N64,
    pub t: N64,
}

impl Vertex {
    pub fn new(x: f64, y: f64, z: f64, t: f64) -> Self {
        Self {
            x: n64(x),
            y: n64(y),
            z: n64(z),
            t: n64(t),
        }
    }

    pub fn is_origin(&self) -> bool {
        *self == Self::default()
    }
}

/// A generated particle with identity, kinematics, and parentage
#[derive(Deserialize, Serialize, Copy, Clone, Debug, PartialEq, Eq)]
pub struct Particle {
    pub id: ParticleID,
    /// Status code as assigned by the generator
    pub status: i32,
    /// Whether the particle is part of the final state
    pub is_final: bool,
    pub p: FourVector,
    pub vertex: Vertex,
    pub index: ParticleIndex,
    pub parent: ParticleIndex,
}

/// Build an [Event] particle by particle
///
/// Particles are indexed in the order in which they are added,
/// starting with 1.
#[derive(Clone, Debug, Default)]
pub struct EventBuilder {
    particles: Vec<Particle>,
}

impl EventBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(cap: usize) -> Self {
        Self {
            particles: Vec::with_capacity(cap),
        }
    }

    /// Add a particle and return its index
    pub fn add_particle(
        &mut self,
        id: ParticleID,
        status: i32,
        is_final: bool,
        p: FourVector,
        vertex: Vertex,
        parent: ParticleIndex,
    ) -> ParticleIndex {
        let index = self.particles.len() + 1;
        self.particles.push(Particle {
            id,
            status,
            is_final,
            p,
            vertex,
            index,
            parent,
        });
        index
    }

    /// Change the parent of an already added particle
    pub fn set_parent(&mut self, index: ParticleIndex, parent: ParticleIndex) {
        if let Some(particle) = index.checked_sub(1).and_then(|i| self.particles.get_mut(i)) {
            particle.parent = parent;
        }
    }

    /// Change the final-state flag of an already added particle
    pub fn set_final(&mut self, index: ParticleIndex, is_final: bool) {
        if let Some(particle) = index.checked_sub(1).and_then(|i| self.particles.get_mut(i)) {
            particle.is_final = is_final;
        }
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn build(self) -> Event {
        Event {
            particles: self.particles,
        }
    }
}

impl From<EventBuilder> for Event {
    fn from(b: EventBuilder) -> Self {
        b.build()
    }
}

/// All particles generated in a single collision event
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq, Eq)]
pub struct Event {
    particles: Vec<Particle>,
}

impl Event {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a particle by its 1-based index
    pub fn get(&self, index: ParticleIndex) -> Option<&Particle> {
        index.checked_sub(1).and_then(|i| self.particles.get(i))
    }

    /// The parent of the given particle, if any
    pub fn parent(&self, particle: &Particle) -> Option<&Particle> {
        self.get(particle.parent)
    }

    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    pub fn len(&self) -> usize {
        self.particles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    pub fn final_state(&self) -> impl Iterator<Item = &Particle> {
        self.particles.iter().filter(|p| p.is_final)
    }
}
