use std::path::PathBuf;

use clap::Parser;
use jetorigin::cluster::JetAlgorithm;
use jetorigin::compression::{parse_compr, Compression};

/// Where events come from
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Source {
    /// The built-in toy generator
    Toy,
    /// A (potentially compressed) HepMC2 event file
    File(PathBuf),
}

fn parse_source(s: &str) -> Result<Source, std::convert::Infallible> {
    if s == "toy" {
        Ok(Source::Toy)
    } else {
        Ok(Source::File(s.into()))
    }
}

fn parse_probability(s: &str) -> Result<f64, String> {
    match s.parse::<f64>() {
        Ok(p) if (0. ..=1.).contains(&p) => Ok(p),
        Ok(p) => Err(format!("{p} is not a probability")),
        Err(err) => Err(err.to_string()),
    }
}

#[derive(Debug, Copy, Clone, Parser)]
pub(crate) struct JetDefinition {
    /// Jet algorithm.
    #[clap(
        short = 'a',
        long,
        default_value = "anti-kt",
        help = "Jet algorithm.\nPossible settings are 'anti-kt', 'kt', 'Cambridge-Aachen'."
    )]
    pub jetalgorithm: JetAlgorithm,
    /// Jet radius parameter.
    #[clap(short = 'R', long, default_value = "0.7")]
    pub jetradius: f64,
    #[clap(short = 'p', long, default_value = "0.")]
    /// Minimum jet transverse momentum in GeV.
    pub jetpt: f64,
}

impl From<JetDefinition> for jetorigin::cluster::JetDefinition {
    fn from(j: JetDefinition) -> Self {
        Self {
            algorithm: j.jetalgorithm,
            radius: j.jetradius,
            min_pt: j.jetpt,
        }
    }
}

#[derive(Debug, Parser)]
#[clap(about, author, version)]
pub(crate) struct Opt {
    /// Run settings file.
    ///
    /// Lists the number of events, the print option, the jet pt
    /// cutoff, and the worker id, in this order, e.g.
    /// 'EventNum:1000', 'PrintOption:0', 'JetPtCutoff:20', 'Thread:0'.
    #[clap(short, long, default_value = "input.dat")]
    pub(crate) config: PathBuf,

    /// Output directory.
    #[clap(short, long, default_value = ".")]
    pub(crate) outdir: PathBuf,

    #[clap(long, value_parser = parse_compr,
                help = "Compress output file.
Possible settings are 'bzip2', 'gzip', 'zstd', 'lz4'.
Compression levels can be set with algorithm_level e.g. 'zstd_5'.
Maximum levels are 'gzip_9', 'zstd_19', 'lz4_16'.")]
    pub(crate) compression: Option<Compression>,

    /// Event source: 'toy' or the path to a HepMC2 event file.
    #[clap(short, long, default_value = "toy", value_parser = parse_source)]
    pub(crate) source: Source,

    /// Random number generator seed for the toy generator.
    ///
    /// If not given, a seed is chosen at random and logged.
    #[clap(long)]
    pub(crate) seed: Option<u64>,

    /// Minimum transverse momentum of the toy hard scattering in GeV.
    #[clap(long, default_value = "10")]
    pub(crate) toy_min_pt: f64,

    /// Probability for the toy generator to fail an event.
    #[clap(long, default_value = "0", value_parser = parse_probability)]
    pub(crate) failure_probability: f64,

    /// Position of the reference parton in the event record, starting at 1.
    #[clap(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
    pub(crate) parton_index: u64,

    #[clap(flatten)]
    pub(crate) jet_def: JetDefinition,

    /// Output file for the histogram of the first event, relative to the output directory.
    #[clap(long, default_value = "first_event_histogram.yaml")]
    pub(crate) histogram: PathBuf,

    /// Verbosity level
    #[clap(
        short,
        long,
        default_value = "Info",
        help = "Verbosity level.
Possible values with increasing amount of output are
'off', 'error', 'warn', 'info', 'debug', 'trace'.\n"
    )]
    pub(crate) loglevel: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let opt = Opt::parse_from(["jetorigin"]);
        assert_eq!(opt.config, PathBuf::from("input.dat"));
        assert_eq!(opt.source, Source::Toy);
        assert_eq!(opt.parton_index, 5);
        assert_eq!(opt.jet_def.jetalgorithm, JetAlgorithm::AntiKt);
        assert_eq!(opt.jet_def.jetradius, 0.7);
        assert!(opt.compression.is_none());
        assert_eq!(opt.toy_min_pt, 10.);
    }

    #[test]
    fn options() {
        let opt = Opt::parse_from([
            "jetorigin",
            "--source",
            "events.hepmc.gz",
            "--compression",
            "zstd_5",
            "-a",
            "kt",
            "--parton-index",
            "6",
        ]);
        assert_eq!(opt.source, Source::File("events.hepmc.gz".into()));
        assert_eq!(opt.compression, Some(Compression::Zstd(5)));
        assert_eq!(opt.jet_def.jetalgorithm, JetAlgorithm::Kt);
        assert_eq!(opt.parton_index, 6);

        assert!(Opt::try_parse_from(["jetorigin", "--parton-index", "0"]).is_err());
        assert!(Opt::try_parse_from(["jetorigin", "--failure-probability", "2"]).is_err());
    }
}
