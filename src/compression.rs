use std::io::Write;

use bzip2::write::BzEncoder;
use flate2::write::GzEncoder;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

const GZIP_DEFAULT_LEVEL: u8 = 6;
const LZ4_DEFAULT_LEVEL: u8 = 0;
const ZSTD_DEFAULT_LEVEL: u8 = 0;

/// Compression format
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Compression {
    /// The bzip2 format
    Bzip2,
    /// The gzip format with compression level as associated value
    Gzip(u8),
    /// The lz4 format with compression level as associated value
    Lz4(u8),
    /// The zstd format with compression level as associated value
    Zstd(u8),
}

impl Compression {
    /// Conventional file name extension
    pub fn extension(&self) -> &'static str {
        match self {
            Compression::Bzip2 => "bz2",
            Compression::Gzip(_) => "gz",
            Compression::Lz4(_) => "lz4",
            Compression::Zstd(_) => "zst",
        }
    }
}

/// Convert into a writer that compresses to the given format
pub fn compress_writer<'a, W: 'a + Write>(
    writer: W,
    compression: Option<Compression>,
) -> Result<Box<dyn Write + 'a>, std::io::Error> {
    match compression {
        Some(Compression::Bzip2) => {
            let encoder = BzEncoder::new(writer, bzip2::Compression::best());
            Ok(Box::new(encoder))
        }
        Some(Compression::Gzip(lvl)) => {
            let encoder =
                GzEncoder::new(writer, flate2::Compression::new(lvl.into()));
            Ok(Box::new(encoder))
        }
        Some(Compression::Lz4(lvl)) => {
            let encoder = lz4::EncoderBuilder::new()
                .auto_flush(true)
                .level(lvl.into())
                .build(writer)?;
            Ok(Box::new(encoder))
        }
        Some(Compression::Zstd(lvl)) => {
            let encoder = zstd::Encoder::new(writer, lvl.into())?;
            Ok(Box::new(encoder.auto_finish()))
        }
        None => Ok(Box::new(writer)),
    }
}

lazy_static! {
    static ref COMPRESSION_RE: Regex =
        Regex::new(r"^(?P<algo>[[:alnum:]]+)(?P<lvl>_\d+)?$").unwrap();
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseCompressionErr {
    #[error("Unknown compression algorithm: {0}")]
    UnknownAlgorithm(String),
    #[error("Level {1} not supported for {0} compression")]
    UnsupportedLevel(String, String),
}

/// Parse a compression setting of the form `algorithm` or `algorithm_level`
pub fn parse_compr(s: &str) -> Result<Compression, ParseCompressionErr> {
    use Compression::*;
    use ParseCompressionErr::*;

    let lower_case = s.to_ascii_lowercase();
    let Some(captures) = COMPRESSION_RE.captures(&lower_case) else {
        return Err(UnknownAlgorithm(s.to_owned()));
    };
    let algo = &captures["algo"];
    let lvl = captures.name("lvl").map(|l| l.as_str());
    let parse_lvl = |max: u8, default: u8| -> Result<u8, ParseCompressionErr> {
        match lvl {
            None => Ok(default),
            Some(lvl_str) => match lvl_str[1..].parse::<u8>() {
                Ok(lvl) if lvl <= max => Ok(lvl),
                _ => Err(UnsupportedLevel(algo.into(), lvl_str.to_owned())),
            },
        }
    };
    match algo {
        "bzip2" | "bz2" => {
            if let Some(lvl_str) = lvl {
                Err(UnsupportedLevel(algo.into(), lvl_str.to_owned()))
            } else {
                Ok(Bzip2)
            }
        }
        "gzip" | "gz" => parse_lvl(9, GZIP_DEFAULT_LEVEL).map(Gzip),
        "lz4" => parse_lvl(16, LZ4_DEFAULT_LEVEL).map(Lz4),
        "zstd" | "zstandard" => parse_lvl(19, ZSTD_DEFAULT_LEVEL).map(Zstd),
        _ => Err(UnknownAlgorithm(s.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::Read;

    #[test]
    fn parse() {
        assert_eq!(parse_compr("bzip2"), Ok(Compression::Bzip2));
        assert_eq!(parse_compr("gz"), Ok(Compression::Gzip(GZIP_DEFAULT_LEVEL)));
        assert_eq!(parse_compr("Zstd_5"), Ok(Compression::Zstd(5)));
        assert_eq!(parse_compr("lz4_16"), Ok(Compression::Lz4(16)));
        assert!(matches!(parse_compr("lz4_17"), Err(ParseCompressionErr::UnsupportedLevel(_, _))));
        assert!(matches!(parse_compr("bz2_3"), Err(ParseCompressionErr::UnsupportedLevel(_, _))));
        assert!(matches!(parse_compr("xz"), Err(ParseCompressionErr::UnknownAlgorithm(_))));
    }

    #[test]
    fn gzip_output() {
        let mut buf = Vec::new();
        {
            let mut writer = compress_writer(&mut buf, Some(Compression::Gzip(6))).unwrap();
            writer.write_all(b"1 5 1e0 2e0 3e0 4e0\n").unwrap();
        }
        let mut decoded = String::new();
        flate2::read::GzDecoder::new(buf.as_slice())
            .read_to_string(&mut decoded)
            .unwrap();
        assert_eq!(decoded, "1 5 1e0 2e0 3e0 4e0\n");
    }
}
