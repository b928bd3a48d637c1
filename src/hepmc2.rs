//! Events from (potentially compressed) HepMC2 files
use std::{
    collections::HashMap,
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};

use audec::auto_decompress;
use log::{debug, trace};
use nom::{
    bytes::complete::take_while1,
    character::complete::{i32, space1, u32},
    number::complete::double,
    sequence::preceded,
    IResult,
};
use particle_id::ParticleID;
use thiserror::Error;

use crate::{
    event::{Event, EventBuilder, ParticleIndex, Vertex, NO_PARENT},
    four_vector::FourVector,
    traits::Generate,
};

const HEPMC_OUTGOING: i32 = 1;
const NO_VERTEX: i32 = 0;

/// Error reading a HepMC event record
#[derive(Debug, Error)]
pub enum HepMCError {
    /// Parse error
    #[error("Error parsing line in event record: {0}")]
    ParseError(String),
    /// Invalid start of record
    #[error("Record does not start with 'E': {0}")]
    BadRecordStart(String),
    /// Unrecognized entry
    #[error("Line does not correspond to a known entry type: {0}")]
    BadEntry(String),
    /// Record is not valid UTF-8
    #[error("Event record is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
    /// I/O error
    #[error("I/O error")]
    IOError(#[from] std::io::Error),
    /// Invalid energy unit
    #[error("Invalid energy unit: {0}")]
    InvalidEnergyUnit(String),
    /// Invalid length unit
    #[error("Invalid length unit: {0}")]
    InvalidLengthUnit(String),
}

impl From<nom::Err<nom::error::Error<&str>>> for HepMCError {
    fn from(source: nom::Err<nom::error::Error<&str>>) -> Self {
        Self::ParseError(source.to_string())
    }
}

/// Event source reading HepMC2 records one at a time
pub struct HepMCReader {
    source: Box<dyn BufRead>,
}

impl HepMCReader {
    /// Open a (potentially compressed) HepMC2 event file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, std::io::Error> {
        let path = path.as_ref();
        debug!("Reading events from {path:?}");
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }

    /// Read HepMC2 records from an arbitrary source
    pub fn from_reader(reader: impl BufRead + 'static) -> Result<Self, std::io::Error> {
        let mut source = auto_decompress(reader);

        // read until start of first event
        let mut dump = Vec::new();
        let mut at_start = true;
        loop {
            dump.clear();
            if source.read_until(b'E', &mut dump)? == 0 {
                break;
            }
            if dump.ends_with(b"\nE") || (at_start && dump == b"E") {
                break;
            }
            at_start = false;
        }
        Ok(Self { source })
    }

    fn read_record(&mut self) -> Option<Result<String, HepMCError>> {
        let mut record = vec![b'E'];
        loop {
            match self.source.read_until(b'E', &mut record) {
                Ok(0) => {
                    if record.len() > 1 {
                        break;
                    } else {
                        return None;
                    }
                }
                Ok(_) => {}
                Err(err) => return Some(Err(err.into())),
            }
            if record.ends_with(b"\nE") {
                record.truncate(record.len() - 2);
                break;
            }
        }
        let record = match String::from_utf8(record) {
            Ok(record) => record,
            Err(err) => return Some(Err(err.into())),
        };
        trace!("Read HepMC record:\n{record}");
        Some(Ok(record))
    }
}

impl Generate for HepMCReader {
    type Error = HepMCError;

    fn generate(&mut self) -> Result<Option<Event>, Self::Error> {
        let Some(record) = self.read_record() else {
            return Ok(None);
        };
        let event = parse_event(&record?)?;
        Ok(Some(event))
    }
}

#[derive(Copy, Clone, Debug, PartialEq)]
struct Units {
    energy: f64,
    length: f64,
}

impl Default for Units {
    fn default() -> Self {
        Self {
            energy: 1.,
            length: 1.,
        }
    }
}

#[derive(Copy, Clone, Debug, Default)]
struct CurrentVertex {
    barcode: i32,
    position: Vertex,
    orphans_left: u32,
}

// Production and end vertex barcodes of a particle
#[derive(Copy, Clone, Debug)]
struct Links {
    production: Option<i32>,
    end: i32,
}

/// Parse a single HepMC2 event record
///
/// Particles are indexed in order of appearance. The parent of a
/// particle is the first particle whose end vertex is its production
/// vertex. Energies are converted to GeV and lengths to mm.
pub fn parse_event(mut record: &str) -> Result<Event, HepMCError> {
    if !record.starts_with('E') {
        return Err(HepMCError::BadRecordStart(record.to_owned()));
    }
    let mut event = EventBuilder::new();
    let mut units = Units::default();
    let mut vertex = CurrentVertex::default();
    let mut links = Vec::new();
    while let Some(pos) = record.find('\n') {
        record = &record[(pos + 1)..];
        match record.as_bytes().first() {
            Some(b'N') | Some(b'C') | Some(b'H') | Some(b'F') => {}
            Some(b'U') => (units, record) = parse_units_line(record)?,
            Some(b'V') => (vertex, record) = parse_vertex_line(record, units)?,
            Some(b'P') => {
                let link;
                (link, record) = parse_particle_line(record, units, &mut vertex, &mut event)?;
                links.push(link);
            }
            _ => {
                if !record.trim().is_empty() {
                    return Err(HepMCError::BadEntry(record.to_owned()));
                }
            }
        }
    }
    assign_parents(&mut event, &links);
    Ok(event.build())
}

fn assign_parents(event: &mut EventBuilder, links: &[Links]) {
    let mut incoming: HashMap<i32, ParticleIndex> = HashMap::new();
    for (n, link) in links.iter().enumerate() {
        if link.end != NO_VERTEX {
            incoming.entry(link.end).or_insert(n + 1);
        }
    }
    for (n, link) in links.iter().enumerate() {
        let parent = link
            .production
            .and_then(|v| incoming.get(&v).copied())
            .unwrap_or(NO_PARENT);
        if parent != NO_PARENT {
            event.set_parent(n + 1, parent);
        }
    }
}

fn parse_units_line(record: &str) -> Result<(Units, &str), HepMCError> {
    debug_assert!(record.starts_with('U'));
    let (rest, energy) = any_entry(&record[1..])?;
    let (rest, length) = any_entry(rest)?;
    let energy = match energy {
        "GEV" => 1.,
        "MEV" => 1e-3,
        _ => return Err(HepMCError::InvalidEnergyUnit(energy.to_owned())),
    };
    let length = match length {
        "MM" => 1.,
        "CM" => 10.,
        _ => return Err(HepMCError::InvalidLengthUnit(length.to_owned())),
    };
    Ok((Units { energy, length }, rest))
}

fn parse_vertex_line(record: &str, units: Units) -> Result<(CurrentVertex, &str), HepMCError> {
    debug_assert!(record.starts_with('V'));
    let (rest, barcode) = i32_entry(&record[1..])?;
    let (rest, _id) = any_entry(rest)?;
    let (rest, x) = double_entry(rest)?;
    let (rest, y) = double_entry(rest)?;
    let (rest, z) = double_entry(rest)?;
    let (rest, ctau) = double_entry(rest)?;
    let (rest, orphans_left) = u32_entry(rest)?;
    let l = units.length;
    let vertex = CurrentVertex {
        barcode,
        position: Vertex::new(l * x, l * y, l * z, l * ctau),
        orphans_left,
    };
    Ok((vertex, rest))
}

fn parse_particle_line<'a>(
    record: &'a str,
    units: Units,
    vertex: &mut CurrentVertex,
    event: &mut EventBuilder,
) -> Result<(Links, &'a str), HepMCError> {
    debug_assert!(record.starts_with('P'));
    let (rest, _barcode) = any_entry(&record[1..])?;
    let (rest, id) = i32_entry(rest)?;
    let (rest, px) = double_entry(rest)?;
    let (rest, py) = double_entry(rest)?;
    let (rest, pz) = double_entry(rest)?;
    let (rest, e) = double_entry(rest)?;
    let (rest, _m) = any_entry(rest)?;
    let (rest, status) = i32_entry(rest)?;
    let (rest, _theta) = any_entry(rest)?;
    let (rest, _phi) = any_entry(rest)?;
    let (rest, end) = i32_entry(rest)?;

    // orphan incoming particles are listed before the outgoing ones
    let (production, position) = if vertex.orphans_left > 0 {
        vertex.orphans_left -= 1;
        (None, Vertex::default())
    } else if vertex.barcode == NO_VERTEX {
        (None, Vertex::default())
    } else {
        (Some(vertex.barcode), vertex.position)
    };
    let s = units.energy;
    let p = FourVector::from_px_py_pz_e(s * px, s * py, s * pz, s * e);
    event.add_particle(
        ParticleID::new(id),
        status,
        status == HEPMC_OUTGOING,
        p,
        position,
        NO_PARENT,
    );
    Ok((Links { production, end }, rest))
}

fn double_entry(line: &str) -> IResult<&str, f64> {
    preceded(space1, double)(line)
}

fn any_entry(line: &str) -> IResult<&str, &str> {
    preceded(space1, non_space)(line)
}

fn u32_entry(line: &str) -> IResult<&str, u32> {
    preceded(space1, u32)(line)
}

fn i32_entry(line: &str) -> IResult<&str, i32> {
    preceded(space1, i32)(line)
}

fn non_space(line: &str) -> IResult<&str, &str> {
    take_while1(|c: char| !c.is_ascii_whitespace())(line)
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Write;

    const RECORD: &str = r#"
HepMC::Version 2.06.09
HepMC::IO_GenEvent-START_EVENT_LISTING
E 0 -1 -1 -1 -1 0 -1 2 1 2 0 1 1
N 1 "0"
U GEV MM
C 1 0
V -1 0 0 0 0 0 2 3 0
P 1 2212 0 0 100 100 0.938 4 0 0 -1 0
P 2 2212 0 0 -100 100 0.938 4 0 0 -1 0
P 3 5 10 0 5 11.2 0 2 0 0 -2 0
P 4 -5 -10 0 -5 11.2 0 1 0 0 0 0
P 5 22 0 1 0 1 0 1 0 0 0 0
V -2 0 0.1 0.2 0.3 0.4 0 2 0
P 6 211 6 0 3 6.7 0.1396 1 0 0 0 0
P 7 12 4 0 2 4.5 0 1 0 0 0 0
E 1 -1 -1 -1 -1 0 -1 1 1 0 0 1 1
U MEV CM
V -1 0 1 0 0 2 1 1 0
P 1 2212 0 0 100000 100000 938 4 0 0 -1 0
P 2 22 1000 0 0 1000 0 1 0 0 0 0
HepMC::IO_GenEvent-END_EVENT_LISTING
"#;

    fn log_init() {
        let _ = env_logger::builder().is_test(true).try_init();
    }

    fn reader() -> HepMCReader {
        HepMCReader::from_reader(std::io::Cursor::new(RECORD.as_bytes())).unwrap()
    }

    #[test]
    fn parents_and_vertices() {
        log_init();
        let mut reader = reader();
        let ev = reader.generate().unwrap().unwrap();
        assert_eq!(ev.len(), 7);

        let beam = ev.get(1).unwrap();
        assert_eq!(beam.id, ParticleID::new(2212));
        assert_eq!(beam.parent, NO_PARENT);
        assert!(beam.vertex.is_origin());
        assert!(!beam.is_final);

        let b = ev.get(3).unwrap();
        assert_eq!(b.parent, 1);
        assert!(!b.is_final);
        assert_eq!(b.p, FourVector::from_px_py_pz_e(10., 0., 5., 11.2));

        for index in [6, 7] {
            let p = ev.get(index).unwrap();
            assert_eq!(p.parent, 3);
            assert_eq!(p.vertex, Vertex::new(0.1, 0.2, 0.3, 0.4));
            assert!(p.is_final);
        }
        let finals: Vec<_> = ev.final_state().map(|p| p.index).collect();
        assert_eq!(finals, [4, 5, 6, 7]);
    }

    #[test]
    fn units() {
        let mut reader = reader();
        reader.generate().unwrap();
        let ev = reader.generate().unwrap().unwrap();
        assert_eq!(ev.len(), 2);
        let photon = ev.get(2).unwrap();
        assert_eq!(photon.p, FourVector::from_px_py_pz_e(1., 0., 0., 1.));
        assert_eq!(photon.vertex, Vertex::new(10., 0., 0., 20.));
        assert_eq!(photon.parent, 1);

        assert!(reader.generate().unwrap().is_none());
    }

    #[test]
    fn compressed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        {
            let mut encoder =
                flate2::write::GzEncoder::new(&mut file, flate2::Compression::default());
            encoder.write_all(RECORD.as_bytes()).unwrap();
            encoder.finish().unwrap();
        }
        let mut reader = HepMCReader::open(file.path()).unwrap();
        let mut nevents = 0;
        while reader.generate().unwrap().is_some() {
            nevents += 1;
        }
        assert_eq!(nevents, 2);
    }

    #[test]
    fn bad_records() {
        assert!(matches!(parse_event("P 1 2 3"), Err(HepMCError::BadRecordStart(_))));
        assert!(matches!(
            parse_event("E 0\nU EV MM\n"),
            Err(HepMCError::InvalidEnergyUnit(_))
        ));
        assert!(matches!(parse_event("E 0\nX 1 2\n"), Err(HepMCError::BadEntry(_))));
        assert!(matches!(
            parse_event("E 0\nV -1 0 0 0 0 0 0 1 0\nP 1 22 a 0 0 1 0 1 0 0 0 0\n"),
            Err(HepMCError::ParseError(_))
        ));
    }
}
