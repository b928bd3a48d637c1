//! Per-event processing and the run loop
//!
//! Each event goes through selection, clustering, association, and
//! constituent resolution before its training record is written.
//! Events that fail at any stage are skipped without affecting the
//! remainder of the run.
use std::{
    fs::File,
    io::BufWriter,
    path::{Path, PathBuf},
};

use log::{debug, error, info, log, log_enabled, warn, Level};
use serde::Serialize;
use strum::Display;
use thiserror::Error;
use typed_builder::TypedBuilder;

use crate::{
    ancestry::format_chain,
    associate::{associate, Acceptance, Association},
    cluster::Jet,
    event::{Event, ParticleIndex},
    histogram::Histogram2D,
    progress_bar::{Progress, ProgressBar},
    record::{TrainingRecord, TrainingWriter},
    resolve::{resolve, resolve_jet},
    selection::FinalStateSelection,
    traits::{Clustering, Generate},
};

/// Index of the first outgoing parton of the hard process in a
/// Pythia-ordered event record
pub const DEFAULT_PARTON_INDEX: ParticleIndex = 5;

/// What happened to a single event
#[derive(Copy, Clone, Debug, Display, PartialEq, Eq)]
#[strum(serialize_all = "snake_case")]
pub enum Outcome {
    /// A training record was written
    Emitted,
    /// The clustering produced no jets
    NoJets,
    /// The jet nearest to the reference parton fails the pt cutoff
    BelowCutoff,
    /// A constituent could not be traced back to a unique particle
    Unresolved,
    /// The event has no particle at the reference parton index
    MissingParton,
    /// The event generator failed
    GenerationFailed,
}

/// Number of events per outcome
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub emitted: u64,
    pub no_jets: u64,
    pub below_cutoff: u64,
    pub unresolved: u64,
    pub missing_parton: u64,
    pub generation_failed: u64,
    /// Emitted records with a heavy-flavour label
    pub heavy_flavour: u64,
}

impl RunStats {
    fn count(&mut self, outcome: Outcome) {
        use Outcome::*;
        let counter = match outcome {
            Emitted => &mut self.emitted,
            NoJets => &mut self.no_jets,
            BelowCutoff => &mut self.below_cutoff,
            Unresolved => &mut self.unresolved,
            MissingParton => &mut self.missing_parton,
            GenerationFailed => &mut self.generation_failed,
        };
        *counter += 1;
    }

    /// Total number of events handed to the pipeline
    pub fn total(&self) -> u64 {
        self.emitted
            + self.no_jets
            + self.below_cutoff
            + self.unresolved
            + self.missing_parton
            + self.generation_failed
    }
}

/// State accumulated over one run
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunState {
    processed: u64,
    observed_ids: Vec<i32>,
    stats: RunStats,
}

impl RunState {
    /// Whether no event has been processed yet
    pub fn is_first_event(&self) -> bool {
        self.processed == 0
    }

    /// Distinct final-state particle codes, in order of first appearance
    pub fn observed_ids(&self) -> &[i32] {
        &self.observed_ids
    }

    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    fn observe(&mut self, event: &Event) {
        for particle in event.final_state() {
            let code = particle.id.id();
            if !self.observed_ids.contains(&code) {
                self.observed_ids.push(code);
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Failed to write training record")]
    Write(#[source] std::io::Error),
}

/// Failure to write the first-event histogram
///
/// The histogram is a diagnostic, so this never ends the run.
#[derive(Debug, Error)]
pub enum HistogramError {
    #[error("Failed to create histogram file {0:?}: {1}")]
    Create(PathBuf, #[source] std::io::Error),
    #[error("Failed to write histogram to {0:?}: {1}")]
    Write(PathBuf, #[source] serde_yaml::Error),
}

/// Jet-origin pipeline over the events from a generator
#[derive(Debug, TypedBuilder)]
pub struct Pipeline<G, C> {
    generator: G,
    clustering: C,
    writer: TrainingWriter,
    #[builder(default)]
    acceptance: Acceptance,
    /// 1-based index of the reference parton
    #[builder(default = DEFAULT_PARTON_INDEX)]
    parton_index: ParticleIndex,
    /// List particles, jets, and constituent ancestry for every event
    #[builder(default)]
    verbose: bool,
    /// Where to write the histogram of the first event
    #[builder(default, setter(strip_option))]
    histogram: Option<PathBuf>,
    #[builder(default, setter(skip))]
    state: RunState,
    #[builder(default, setter(skip))]
    announced: bool,
}

impl<G, C> Pipeline<G, C>
where
    G: Generate,
    G::Error: std::fmt::Display,
    C: Clustering,
{
    /// Generate and process up to `n_events` events
    ///
    /// Stops early if the generator runs out of events.
    pub fn run(mut self, n_events: u64) -> Result<RunState, PipelineError> {
        self.announce();
        let progress = if self.verbose {
            ProgressBar::hidden()
        } else {
            ProgressBar::new(n_events, "Generating events:")
        };
        for event_number in 0..n_events {
            match self.generator.generate() {
                Ok(Some(event)) => {
                    self.process_event(event_number, &event)?;
                }
                Ok(None) => {
                    info!("Event source exhausted after {event_number} events");
                    break;
                }
                Err(err) => {
                    warn!("Failed to generate event {event_number}: {err}");
                    self.state.stats.count(Outcome::GenerationFailed);
                }
            }
            progress.inc(1);
        }
        progress.finish();
        self.finish()
    }
}

impl<G, C: Clustering> Pipeline<G, C> {
    /// Run a single event through the pipeline
    ///
    /// Only failures to write output are errors. Everything else that
    /// prevents a training record is reported through the [Outcome].
    pub fn process_event(
        &mut self,
        event_number: u64,
        event: &Event,
    ) -> Result<Outcome, PipelineError> {
        let outcome = self.process(event_number, event)?;
        debug!("Event {event_number}: {outcome}");
        self.state.processed += 1;
        self.state.stats.count(outcome);
        Ok(outcome)
    }

    fn process(&mut self, event_number: u64, event: &Event) -> Result<Outcome, PipelineError> {
        self.state.observe(event);
        let listing = if self.verbose { Level::Info } else { Level::Debug };
        if log_enabled!(listing) {
            list_particles(listing, event);
        }

        let selection = FinalStateSelection::select(event);
        let jets = self.clustering.cluster(selection.kinematics());

        self.announce();
        if self.state.is_first_event() {
            if let Some(path) = &self.histogram {
                if let Err(err) = write_histogram(path, event) {
                    warn!("{err}");
                }
            }
        }
        if log_enabled!(listing) {
            list_jets(listing, event, &selection, &jets);
        }

        let Some(parton) = event.get(self.parton_index) else {
            warn!(
                "Event {event_number} has no reference parton at index {}",
                self.parton_index
            );
            return Ok(Outcome::MissingParton);
        };

        let jet_match = match associate(&jets, parton, &self.acceptance) {
            Association::NoJets => return Ok(Outcome::NoJets),
            Association::BelowCutoff(m) => {
                debug!(
                    "Event {event_number}: nearest jet has pt {} <= {}",
                    jets[m.jet].momentum().pt(),
                    self.acceptance.min_pt
                );
                return Ok(Outcome::BelowCutoff);
            }
            Association::Accepted(m) => m,
        };
        let jet = &jets[jet_match.jet];
        let constituents = match resolve_jet(jet, selection.records()) {
            Ok(c) => c,
            Err(err) => {
                error!("Event {event_number}, jet {}: {err}", jet_match.jet);
                return Ok(Outcome::Unresolved);
            }
        };
        let record = TrainingRecord::new(&jet_match, jet, &constituents);
        self.writer.write(&record).map_err(PipelineError::Write)?;
        if record.heavy_flavour {
            self.state.stats.heavy_flavour += 1;
        }
        Ok(Outcome::Emitted)
    }

    fn announce(&mut self) {
        if !self.announced {
            info!("Ran {}", self.clustering.description());
            self.announced = true;
        }
    }

    pub fn state(&self) -> &RunState {
        &self.state
    }

    /// Flush the output and return the accumulated run state
    pub fn finish(self) -> Result<RunState, PipelineError> {
        info!(
            "Wrote {} training records to {:?}",
            self.writer.nrecords(),
            self.writer.path()
        );
        self.writer.finish().map_err(PipelineError::Write)?;
        Ok(self.state)
    }
}

fn write_histogram(path: &Path, event: &Event) -> Result<(), HistogramError> {
    let mut hist = Histogram2D::eta_phi();
    hist.fill_event(event);
    let file =
        File::create(path).map_err(|err| HistogramError::Create(path.to_owned(), err))?;
    hist.write(BufWriter::new(file))
        .map_err(|err| HistogramError::Write(path.to_owned(), err))?;
    debug!(
        "Wrote first event histogram to {path:?}: {} entries, total pt {} GeV",
        hist.entries,
        hist.integral()
    );
    Ok(())
}

fn list_particles(level: Level, event: &Event) {
    for p in event.final_state() {
        log!(
            level,
            "Particle {}: id = {}, status = {}, pT = {}, eta = {}, phi = {}",
            p.index,
            p.id.id(),
            p.status,
            p.p.pt(),
            p.p.eta(),
            p.p.phi()
        );
    }
}

fn list_jets(level: Level, event: &Event, selection: &FinalStateSelection, jets: &[Jet]) {
    log!(level, "        pt y phi");
    for (n, jet) in jets.iter().enumerate() {
        let p = jet.momentum();
        log!(level, "jet {n}: {} {} {}", p.pt(), p.rap(), p.phi());
        for (m, constituent) in jet.constituents().iter().enumerate() {
            let chain = resolve(constituent, selection.records())
                .map_err(|err| err.to_string())
                .and_then(|particle| {
                    format_chain(event, particle.index).map_err(|err| err.to_string())
                });
            match chain {
                Ok(chain) => log!(
                    level,
                    "    constituent {m}'s pt: {} chain: {chain}",
                    constituent.pt()
                ),
                Err(err) => warn!("    constituent {m}: {err}"),
            }
        }
    }
}
