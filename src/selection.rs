use crate::{
    event::{Event, Particle},
    four_vector::FourVector,
    species::is_neutrino,
};

/// Clusterable final-state particles of one event
///
/// Holds two position-aligned views of the same particles: the bare
/// momenta handed to the jet clustering and the full particle
/// records. Entry `i` of [kinematics](Self::kinematics) is the momentum
/// of entry `i` of [records](Self::records). The clustering output
/// carries no particle identity, so this ordering is the only link
/// back to the records.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FinalStateSelection {
    kinematics: Vec<FourVector>,
    records: Vec<Particle>,
}

impl FinalStateSelection {
    /// Select all final-state particles that are not neutrinos, in event order
    pub fn select(event: &Event) -> Self {
        let mut res = Self::default();
        for particle in event.final_state().filter(|p| !is_neutrino(p.id)) {
            res.push(*particle);
        }
        debug_assert!(res.is_aligned());
        res
    }

    fn push(&mut self, particle: Particle) {
        self.kinematics.push(particle.p);
        self.records.push(particle);
    }

    /// Momenta to be clustered
    pub fn kinematics(&self) -> &[FourVector] {
        &self.kinematics
    }

    /// Full particle records
    pub fn records(&self) -> &[Particle] {
        &self.records
    }

    pub fn len(&self) -> usize {
        debug_assert_eq!(self.kinematics.len(), self.records.len());
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Check that both views have the same length and identical momenta
    pub fn is_aligned(&self) -> bool {
        self.kinematics.len() == self.records.len()
            && self
                .kinematics
                .iter()
                .zip(self.records.iter())
                .all(|(p, rec)| *p == rec.p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::event::{EventBuilder, Vertex, NO_PARENT};
    use crate::toy::ToyGenerator;
    use crate::traits::Generate;

    use particle_id::ParticleID;

    fn add(ev: &mut EventBuilder, id: i32, is_final: bool, px: f64) {
        let p = FourVector::from_px_py_pz_e(px, 1., 2., 10.);
        ev.add_particle(ParticleID::new(id), 1, is_final, p, Vertex::default(), NO_PARENT);
    }

    #[test]
    fn excludes_neutrinos_and_intermediates() {
        let mut ev = EventBuilder::new();
        add(&mut ev, 211, true, 1.);
        add(&mut ev, 12, true, 2.);
        add(&mut ev, -14, true, 3.);
        add(&mut ev, 22, true, 4.);
        add(&mut ev, 113, false, 5.);
        add(&mut ev, 16, true, 6.);
        add(&mut ev, -211, true, 7.);
        let ev = ev.build();

        let sel = FinalStateSelection::select(&ev);
        assert!(sel.is_aligned());
        let ids: Vec<_> = sel.records().iter().map(|p| p.id.id()).collect();
        assert_eq!(ids, [211, 22, -211]);
        let indices: Vec<_> = sel.records().iter().map(|p| p.index).collect();
        assert_eq!(indices, [1, 4, 7]);
        assert_eq!(sel.kinematics()[2], ev.get(7).unwrap().p);
    }

    #[test]
    fn empty_event() {
        let sel = FinalStateSelection::select(&Event::new());
        assert!(sel.is_empty());
        assert!(sel.is_aligned());
    }

    #[test]
    fn generated_events() {
        let mut gen = ToyGenerator::from_seed(3);
        for _ in 0..20 {
            let ev = gen.generate().unwrap().unwrap();
            let sel = FinalStateSelection::select(&ev);
            assert!(sel.is_aligned());
            assert!(sel.records().windows(2).all(|w| w[0].index < w[1].index));
            assert!(sel.records().iter().all(|p| p.is_final && !is_neutrino(p.id)));
            let expected = ev
                .final_state()
                .filter(|p| !is_neutrino(p.id))
                .count();
            assert_eq!(sel.len(), expected);
        }
    }
}
