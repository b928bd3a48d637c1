//! `jetorigin` turns simulated collision events into training data
//! for jet-flavour classification.
//!
//! For each event, the final-state particles are clustered into jets,
//! the jet nearest to a reference parton of the hard scattering is
//! selected, and every constituent of that jet is traced back to the
//! generated particle it came from. The result is one text record per
//! event, labelled with the identity of the parton.
//!
//! # How to use
//!
//! The [pipeline] module ties everything together. It needs an event
//! source implementing [traits::Generate], for example a
//! [toy::ToyGenerator] or a [hepmc2::HepMCReader], and a jet clustering
//! implementing [traits::Clustering], usually a
//! [cluster::JetDefinition].
//!
//! ## Most relevant modules
//!
//! - [event] for the internal event format
//! - [selection] for the particles that enter jet clustering
//! - [resolve] to find the particle behind a jet constituent
//! - [ancestry] to follow a particle's parents
//! - [associate] to pick the jet belonging to the reference parton
//! - [record] for the training data format
//!

/// Ancestry chains
pub mod ancestry;
/// Association of jets with partons
pub mod associate;
/// Jet clustering
pub mod cluster;
/// Output compression
pub mod compression;
/// Run settings
pub mod config;
/// Scattering event class
pub mod event;
/// Four-vector class
pub mod four_vector;
/// HepMC2 interface
pub mod hepmc2;
/// Histogram of the first event
pub mod histogram;
pub mod pipeline;
/// Progress bar
pub mod progress_bar;
/// Training records
pub mod record;
/// Constituent resolution
pub mod resolve;
/// Final-state particle selection
pub mod selection;
/// Particle species properties
pub mod species;
/// Toy event generator
pub mod toy;
/// Common traits
pub mod traits;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_REV: Option<&str> = option_env!("VERGEN_GIT_SHA");
pub const GIT_BRANCH: Option<&str> = option_env!("VERGEN_GIT_BRANCH");
