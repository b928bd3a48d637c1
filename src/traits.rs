use crate::{cluster::Jet, event::Event, four_vector::FourVector};

/// Source of collision events
pub trait Generate {
    type Error;

    /// Produce the next event
    ///
    /// Returns `Ok(None)` once the source is exhausted. An error means
    /// that this particular event could not be generated; later calls
    /// may still succeed.
    fn generate(&mut self) -> Result<Option<Event>, Self::Error>;
}

impl<G: Generate + ?Sized> Generate for Box<G> {
    type Error = G::Error;

    fn generate(&mut self) -> Result<Option<Event>, Self::Error> {
        (**self).generate()
    }
}

/// Jet clustering
pub trait Clustering {
    /// Cluster the given momenta into jets, sorted by descending transverse momentum
    fn cluster(&self, inputs: &[FourVector]) -> Vec<Jet>;

    /// Human-readable description of the clustering
    fn description(&self) -> String;
}

/// Progress indicator
pub trait Progress {
    fn inc(&self, i: u64);
    fn finish(&self);
}
