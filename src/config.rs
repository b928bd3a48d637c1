use std::path::Path;

use nom::{
    bytes::complete::tag,
    character::complete::{multispace0, space0, u32, u64},
    number::complete::double,
    sequence::{delimited, preceded},
    IResult,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run settings read from the input file
///
/// The file consists of four `key:value` lines in fixed order:
///
/// ```text
/// EventNum:1000
/// PrintOption:0
/// JetPtCutoff:20
/// Thread:0
/// ```
#[derive(Deserialize, Serialize, Copy, Clone, Debug, PartialEq)]
pub struct RunConfig {
    /// Number of events to generate
    pub n_events: u64,
    /// Whether to list particles and jets for every event
    pub verbose: bool,
    /// Minimum transverse momentum of the associated jet in GeV
    pub jet_pt_cutoff: f64,
    /// Worker identifier, used to name the output file
    pub thread: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Cannot open input file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Malformed input file: {0}")]
    Parse(String),
    #[error("Number of events has to be positive")]
    InvalidEventCount,
    #[error("Jet pt cutoff has to be a non-negative number, got {0}")]
    InvalidCutoff(f64),
}

impl From<nom::Err<nom::error::Error<&str>>> for ConfigError {
    fn from(source: nom::Err<nom::error::Error<&str>>) -> Self {
        Self::Parse(source.to_string())
    }
}

impl RunConfig {
    /// Read and validate settings from a file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let input = std::fs::read_to_string(path)?;
        input.parse()
    }

    fn validate(self) -> Result<Self, ConfigError> {
        if self.n_events == 0 {
            return Err(ConfigError::InvalidEventCount);
        }
        if !(self.jet_pt_cutoff >= 0.) {
            return Err(ConfigError::InvalidCutoff(self.jet_pt_cutoff));
        }
        Ok(self)
    }
}

impl std::str::FromStr for RunConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (rest, n_events) = entry("EventNum", u64)(s)?;
        let (rest, print) = entry("PrintOption", u32)(rest)?;
        let (rest, jet_pt_cutoff) = entry("JetPtCutoff", double)(rest)?;
        let (rest, thread) = entry("Thread", u32)(rest)?;
        if !rest.trim().is_empty() {
            return Err(ConfigError::Parse(format!("Trailing input: {rest}")));
        }
        RunConfig {
            n_events,
            verbose: print != 0,
            jet_pt_cutoff,
            thread,
        }
        .validate()
    }
}

// `key:value` with optional surrounding whitespace
fn entry<'a, O, F>(
    key: &'static str,
    value: F,
) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(
        preceded(multispace0, tag(key)),
        preceded(preceded(space0, tag(":")), preceded(space0, value)),
        space0,
    )
}
