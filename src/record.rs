//! Training records for jet-flavour classification
//!
//! Each record describes the jet nearest to the reference parton:
//!
//! ```text
//! <constituents> <parton id> <px> <py> <pz> <E>
//! <n> <id> <px> <py> <pz> <E> <x> <y> <z> <t>
//! ...
//! ```
//!
//! with one line per constituent and `n` counting from 1. Floating
//! point numbers are written in the shortest exponent notation that
//! reads back to exactly the same value.
use std::{
    fmt::{self, Display},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use log::trace;
use noisy_float::prelude::*;
use nom::{
    character::complete::{i32, space0, u32},
    multi::count,
    number::complete::double,
    sequence::preceded,
    IResult,
};
use particle_id::ParticleID;
use thiserror::Error;

use crate::{
    associate::JetMatch,
    cluster::Jet,
    compression::{compress_writer, Compression},
    event::Vertex,
    four_vector::FourVector,
    resolve::ResolvedConstituent,
};

/// One constituent of a training record
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct ConstituentEntry {
    pub id: ParticleID,
    pub p: FourVector,
    pub vertex: Vertex,
}

/// Training record for a single event
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrainingRecord {
    /// Identity of the reference parton
    pub label: ParticleID,
    pub heavy_flavour: bool,
    pub jet: FourVector,
    pub constituents: Vec<ConstituentEntry>,
}

impl TrainingRecord {
    /// Record for an accepted jet and its resolved constituents
    pub fn new(
        jet_match: &JetMatch,
        jet: &Jet,
        constituents: &[ResolvedConstituent<'_>],
    ) -> Self {
        let constituents = constituents
            .iter()
            .map(|c| ConstituentEntry {
                id: c.particle.id,
                p: c.particle.p,
                vertex: c.particle.vertex,
            })
            .collect();
        Self {
            label: jet_match.parton,
            heavy_flavour: jet_match.heavy_flavour,
            jet: *jet.momentum(),
            constituents,
        }
    }

    /// Parse a record from its text representation
    ///
    /// Returns the record and the remaining input. The heavy-flavour
    /// flag is reconstructed from the label.
    pub fn parse(input: &str) -> Result<(Self, &str), RecordParseError> {
        let (rest, (nconstituents, label, jet)) = header(input)?;
        let (rest, constituents) = count(constituent_line, nconstituents as usize)(rest)?;
        let mut entries = Vec::with_capacity(constituents.len());
        for (n, (seq, entry)) in constituents.into_iter().enumerate() {
            if seq as usize != n + 1 {
                return Err(RecordParseError::Sequence {
                    expected: n + 1,
                    found: seq,
                });
            }
            entries.push(entry);
        }
        let label = ParticleID::new(label);
        let record = Self {
            label,
            heavy_flavour: crate::associate::is_heavy_flavour(label),
            jet,
            constituents: entries,
        };
        Ok((record, rest))
    }
}

struct Momentum<'a>(&'a FourVector);

impl Display for Momentum<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.0;
        write!(
            f,
            "{:e} {:e} {:e} {:e}",
            f64::from(p.px()),
            f64::from(p.py()),
            f64::from(p.pz()),
            f64::from(p.e())
        )
    }
}

impl Display for TrainingRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} {}",
            self.constituents.len(),
            self.label.id(),
            Momentum(&self.jet)
        )?;
        for (n, c) in self.constituents.iter().enumerate() {
            let v = c.vertex;
            writeln!(
                f,
                "{} {} {} {:e} {:e} {:e} {:e}",
                n + 1,
                c.id.id(),
                Momentum(&c.p),
                f64::from(v.x),
                f64::from(v.y),
                f64::from(v.z),
                f64::from(v.t)
            )?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum RecordParseError {
    #[error("Error parsing training record: {0}")]
    Syntax(String),
    #[error("Expected constituent number {expected}, found {found}")]
    Sequence { expected: usize, found: u32 },
}

impl From<nom::Err<nom::error::Error<&str>>> for RecordParseError {
    fn from(source: nom::Err<nom::error::Error<&str>>) -> Self {
        Self::Syntax(source.to_string())
    }
}

fn entry_f64(input: &str) -> IResult<&str, f64> {
    preceded(space0, double)(input)
}

fn four_vector(input: &str) -> IResult<&str, FourVector> {
    let (rest, p) = count(entry_f64, 4)(input)?;
    Ok((rest, FourVector::from_px_py_pz_e(p[0], p[1], p[2], p[3])))
}

fn line_end(input: &str) -> IResult<&str, &str> {
    preceded(space0, nom::character::complete::line_ending)(input)
}

fn header(input: &str) -> IResult<&str, (u32, i32, FourVector)> {
    let input = input.trim_start();
    let (rest, nconstituents) = u32(input)?;
    let (rest, label) = preceded(space0, i32)(rest)?;
    let (rest, jet) = four_vector(rest)?;
    let (rest, _) = line_end(rest)?;
    Ok((rest, (nconstituents, label, jet)))
}

fn constituent_line(input: &str) -> IResult<&str, (u32, ConstituentEntry)> {
    let (rest, seq) = u32(input)?;
    let (rest, id) = preceded(space0, i32)(rest)?;
    let (rest, p) = four_vector(rest)?;
    let (rest, v) = count(entry_f64, 4)(rest)?;
    let (rest, _) = line_end(rest)?;
    let entry = ConstituentEntry {
        id: ParticleID::new(id),
        p,
        vertex: Vertex {
            x: n64(v[0]),
            y: n64(v[1]),
            z: n64(v[2]),
            t: n64(v[3]),
        },
    };
    Ok((rest, (seq, entry)))
}

/// Name of the training data file for the given worker
pub fn output_filename(thread: u32, compression: Option<Compression>) -> PathBuf {
    let mut name = format!("training_data_thread{thread}.txt");
    if let Some(compression) = compression {
        name.push('.');
        name.push_str(compression.extension());
    }
    name.into()
}

/// Append-only sink for training records
pub struct TrainingWriter {
    path: PathBuf,
    sink: Box<dyn Write>,
    nrecords: u64,
}

impl TrainingWriter {
    /// Create (or truncate) the output file
    pub fn create(
        path: impl AsRef<Path>,
        compression: Option<Compression>,
    ) -> Result<Self, std::io::Error> {
        let path = path.as_ref().to_owned();
        let file = std::fs::File::create(&path)?;
        let sink = compress_writer(BufWriter::new(file), compression)?;
        Ok(Self {
            path,
            sink,
            nrecords: 0,
        })
    }

    /// Write to an arbitrary sink
    pub fn from_writer(sink: Box<dyn Write>) -> Self {
        Self {
            path: PathBuf::new(),
            sink,
            nrecords: 0,
        }
    }

    pub fn write(&mut self, record: &TrainingRecord) -> Result<(), std::io::Error> {
        trace!("Writing training record:\n{record}");
        write!(self.sink, "{record}")?;
        self.nrecords += 1;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of records written so far
    pub fn nrecords(&self) -> u64 {
        self.nrecords
    }

    /// Flush all pending output
    pub fn finish(mut self) -> Result<(), std::io::Error> {
        self.sink.flush()
    }
}

impl fmt::Debug for TrainingWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrainingWriter")
            .field("path", &self.path)
            .field("nrecords", &self.nrecords)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::event::{EventBuilder, NO_PARENT};

    fn record() -> TrainingRecord {
        TrainingRecord {
            label: ParticleID::new(-5),
            heavy_flavour: true,
            jet: FourVector::from_px_py_pz_e(0.1 + 0.2, -12.345678901234567, 1e-300, 45.),
            constituents: vec![
                ConstituentEntry {
                    id: ParticleID::new(211),
                    p: FourVector::from_px_py_pz_e(1. / 3., -2.5, 7.125, 9.75),
                    vertex: Vertex::default(),
                },
                ConstituentEntry {
                    id: ParticleID::new(-321),
                    p: FourVector::from_px_py_pz_e(-0.1, 2. / 7., 1e10, 1e10 + 1.),
                    vertex: Vertex::new(1.5e-3, -2e-2, 0.3, 0.31),
                },
            ],
        }
    }

    #[test]
    fn format() {
        let record = TrainingRecord {
            label: ParticleID::new(21),
            heavy_flavour: false,
            jet: FourVector::from_px_py_pz_e(15., 0., 2.5, 16.),
            constituents: vec![ConstituentEntry {
                id: ParticleID::new(22),
                p: FourVector::from_px_py_pz_e(15., 0., 2.5, 16.),
                vertex: Vertex::new(0., 0., 1., 2.),
            }],
        };
        assert_eq!(
            record.to_string(),
            "1 21 1.5e1 0e0 2.5e0 1.6e1\n1 22 1.5e1 0e0 2.5e0 1.6e1 0e0 0e0 1e0 2e0\n"
        );
    }

    #[test]
    fn full_precision() {
        let record = record();
        let text = record.to_string();
        let (parsed, rest) = TrainingRecord::parse(&text).unwrap();
        assert!(rest.is_empty());
        assert_eq!(parsed, record);
    }

    #[test]
    fn bad_sequence() {
        let text = "1 5 1 2 3 4\n2 211 1 2 3 4 0 0 0 0\n";
        assert!(matches!(
            TrainingRecord::parse(text),
            Err(RecordParseError::Sequence { expected: 1, found: 2 })
        ));
        assert!(TrainingRecord::parse("2 5 1 2 3 4\n1 211 1 2 3 4 0 0 0 0\n").is_err());
    }

    #[test]
    fn from_resolved() {
        let mut ev = EventBuilder::new();
        let p = FourVector::from_px_py_pz_e(3., 4., 0., 5.);
        let v = Vertex::new(0.1, 0.2, 0.3, 0.4);
        let i = ev.add_particle(ParticleID::new(-211), 1, true, p, v, NO_PARENT);
        let ev = ev.build();
        let particle = ev.get(i).unwrap();
        let jet = Jet::from_constituents(vec![p]);
        let jet_match = JetMatch {
            jet: 0,
            delta_r: n64(0.1),
            parton: ParticleID::new(4),
            heavy_flavour: true,
        };
        let resolved = [ResolvedConstituent { momentum: p, particle }];
        let record = TrainingRecord::new(&jet_match, &jet, &resolved);
        assert_eq!(record.label, ParticleID::new(4));
        assert_eq!(record.jet, p);
        assert_eq!(
            record.constituents,
            [ConstituentEntry { id: ParticleID::new(-211), p, vertex: v }]
        );
    }

    #[test]
    fn write_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(output_filename(3, None));
        assert!(path.ends_with("training_data_thread3.txt"));
        let mut writer = TrainingWriter::create(&path, None).unwrap();
        writer.write(&record()).unwrap();
        writer.write(&record()).unwrap();
        assert_eq!(writer.nrecords(), 2);
        writer.finish().unwrap();

        let text = std::fs::read_to_string(&path).unwrap();
        let (first, rest) = TrainingRecord::parse(&text).unwrap();
        let (second, rest) = TrainingRecord::parse(rest).unwrap();
        assert!(rest.is_empty());
        assert_eq!(first, record());
        assert_eq!(second, record());
    }
}
