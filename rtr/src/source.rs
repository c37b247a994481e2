// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

use crate::error::Error;
use crate::log::cache_log;
use crate::types::{Prefix, Roa};
use crate::MOD_REFRESH;
use serde::Deserialize;
use slog::Logger;
use std::path::{Path, PathBuf};

/// Somewhere validated ROAs come from.
pub trait RoaSource: Send + 'static {
    /// Short description for logs.
    fn name(&self) -> String;

    fn load(&self) -> Result<Vec<Roa>, Error>;
}

/// A JSON ROA export on the local filesystem, in the form produced by common
/// relying party software:
///
/// ```json
/// {"roas": [{"prefix": "10.0.0.0/8", "maxLength": 24, "asn": "AS13335"}]}
/// ```
pub struct JsonFileSource {
    path: PathBuf,
    log: Logger,
}

impl JsonFileSource {
    pub fn new<P: AsRef<Path>>(path: P, log: Logger) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            log,
        }
    }
}

impl RoaSource for JsonFileSource {
    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<Roa>, Error> {
        let text = std::fs::read_to_string(&self.path)?;
        let parsed = parse_roas(&text)?;
        if parsed.skipped > 0 {
            cache_log!(self.log, MOD_REFRESH, warn,
                "skipped {} invalid roa records in {}",
                parsed.skipped,
                self.path.display();
                "skipped" => parsed.skipped,
                "loaded" => parsed.roas.len()
            );
        }
        Ok(parsed.roas)
    }
}

#[derive(Debug, Default)]
pub struct ParsedRoas {
    pub roas: Vec<Roa>,
    /// Records that were present but could not be turned into a `Roa`.
    pub skipped: usize,
}

#[derive(Deserialize)]
struct RoaFile {
    roas: Vec<serde_json::Value>,
}

#[derive(Deserialize)]
struct RoaRecord {
    prefix: String,
    #[serde(rename = "maxLength")]
    max_length: Option<u8>,
    asn: Asn,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Asn {
    Number(u32),
    Text(String),
}

impl Asn {
    fn value(&self) -> Result<u32, Error> {
        match self {
            Asn::Number(n) => Ok(*n),
            Asn::Text(s) => {
                let digits = s
                    .strip_prefix("AS")
                    .or_else(|| s.strip_prefix("as"))
                    .unwrap_or(s);
                digits
                    .parse()
                    .map_err(|_| Error::InvalidRoa(format!("asn '{s}'")))
            }
        }
    }
}

impl RoaRecord {
    fn to_roa(&self) -> Result<Roa, Error> {
        let prefix: Prefix = self.prefix.parse()?;
        // An absent max length means exactly the prefix length.
        let max_length = self.max_length.unwrap_or(prefix.length());
        Roa::new(prefix, max_length, self.asn.value()?)
    }
}

/// Parse a JSON ROA export. The document itself must be well formed, but
/// individual records that do not describe a valid ROA are skipped and
/// counted.
pub fn parse_roas(text: &str) -> Result<ParsedRoas, Error> {
    let file: RoaFile = serde_json::from_str(text)?;
    let mut parsed = ParsedRoas::default();
    for value in file.roas {
        match serde_json::from_value::<RoaRecord>(value)
            .map_err(Error::from)
            .and_then(|r| r.to_roa())
        {
            Ok(roa) => parsed.roas.push(roa),
            Err(_) => parsed.skipped += 1,
        }
    }
    Ok(parsed)
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use rtr_common::log::discard_logger;

    #[test]
    fn parse_export() {
        let text = r#"{
            "metadata": {"generated": 1700000000},
            "roas": [
                {"prefix": "10.0.0.0/8", "maxLength": 8, "asn": "AS100",
                 "ta": "ripe"},
                {"prefix": "2001:db8::/32", "maxLength": 48, "asn": 200,
                 "ta": "arin"},
                {"prefix": "192.0.2.0/24", "asn": "AS65000"}
            ]
        }"#;
        let parsed = parse_roas(text).expect("parse");
        assert_eq!(parsed.skipped, 0);
        let roas: Vec<String> =
            parsed.roas.iter().map(|r| r.to_string()).collect();
        assert_eq!(
            roas,
            vec![
                "10.0.0.0/8-8 AS100",
                "2001:db8::/32-48 AS200",
                "192.0.2.0/24-24 AS65000",
            ]
        );
    }

    #[test]
    fn bad_records_are_skipped() {
        let text = r#"{"roas": [
            {"prefix": "10.0.0.0/8", "maxLength": 8, "asn": "AS100"},
            {"prefix": "10.0.0.0/33", "maxLength": 33, "asn": "AS1"},
            {"prefix": "10.0.0.0/16", "maxLength": 8, "asn": "AS1"},
            {"prefix": "10.0.0.0/16", "maxLength": 16, "asn": "ASX"},
            {"prefix": "bogus", "maxLength": 16, "asn": 1},
            {"maxLength": 16, "asn": 1}
        ]}"#;
        let parsed = parse_roas(text).expect("parse");
        assert_eq!(parsed.roas.len(), 1);
        assert_eq!(parsed.skipped, 5);
    }

    #[test]
    fn broken_document_is_an_error() {
        assert!(matches!(parse_roas("{\"roas\": ["), Err(Error::Json(_))));
        assert!(matches!(parse_roas("{}"), Err(Error::Json(_))));
    }

    #[test]
    fn load_from_file() {
        let path = std::env::temp_dir().join(format!(
            "rtr-roas-{}-{}.json",
            std::process::id(),
            rand::random::<u32>()
        ));
        std::fs::write(
            &path,
            r#"{"roas": [
                {"prefix": "10.0.0.0/8", "maxLength": 24, "asn": "AS13335"}
            ]}"#,
        )
        .expect("write");
        let source = JsonFileSource::new(&path, discard_logger());
        let roas = source.load().expect("load");
        assert_eq!(roas.len(), 1);
        assert_eq!(roas[0].origin_asn(), 13335);
        assert_eq!(roas[0].max_length(), 24);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(source.load(), Err(Error::Io(_))));
    }
}
