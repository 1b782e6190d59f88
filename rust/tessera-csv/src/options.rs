//! CSV scan options, as bound from the caller's option map.

use std::collections::HashMap;

use tessera_common::{Error, Result};

pub const DEFAULT_DELIMITER: u8 = b',';
pub const DEFAULT_QUOTE: u8 = b'"';
pub const DEFAULT_ESCAPE: u8 = b'"';
pub const DEFAULT_SAMPLE_SIZE: u64 = 256;

#[derive(Debug, Clone)]
pub struct CsvOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub escape: u8,
    pub has_header: bool,
    pub skip_rows: u64,
    pub sample_size: u64,
    pub null_strings: Vec<String>,
    pub ignore_errors: bool,
    pub allow_unbraced_list: bool,
    pub auto_detect: bool,
    pub parallel: bool,
}

impl Default for CsvOptions {
    fn default() -> CsvOptions {
        CsvOptions {
            delimiter: DEFAULT_DELIMITER,
            quote: DEFAULT_QUOTE,
            escape: DEFAULT_ESCAPE,
            has_header: false,
            skip_rows: 0,
            sample_size: DEFAULT_SAMPLE_SIZE,
            null_strings: Vec::new(),
            ignore_errors: false,
            allow_unbraced_list: false,
            auto_detect: true,
            parallel: true,
        }
    }
}

impl CsvOptions {
    /// Builds options from a bound option map. Unrecognized keys are
    /// rejected; single-character options accept backslash-escaped
    /// spellings such as `\t`.
    ///
    /// Parallel scanning is forced off whenever rows are skipped, since
    /// skipping is not parallel-safe.
    pub fn from_option_map(map: &HashMap<String, String>) -> Result<CsvOptions> {
        let mut options = CsvOptions::default();
        for (key, value) in map {
            match key.to_ascii_uppercase().as_str() {
                "DELIM" | "DELIMITER" => options.delimiter = parse_single_char(key, value)?,
                "QUOTE" => options.quote = parse_single_char(key, value)?,
                "ESCAPE" => options.escape = parse_single_char(key, value)?,
                "HEADER" => options.has_header = parse_bool(key, value)?,
                "SKIP" => {
                    options.skip_rows = value
                        .parse()
                        .map_err(|_| Error::invalid_arg(key, "expected a non-negative integer"))?;
                }
                "SAMPLE_SIZE" => {
                    options.sample_size = value
                        .parse()
                        .map_err(|_| Error::invalid_arg(key, "expected a non-negative integer"))?;
                }
                "NULL_STRINGS" => {
                    options.null_strings =
                        value.split(',').map(|s| s.trim().to_string()).collect();
                }
                "IGNORE_ERRORS" => options.ignore_errors = parse_bool(key, value)?,
                "ALLOW_UNBRACED_LIST" => options.allow_unbraced_list = parse_bool(key, value)?,
                "AUTO_DETECT" => options.auto_detect = parse_bool(key, value)?,
                "PARALLEL" => options.parallel = parse_bool(key, value)?,
                _ => return Err(Error::invalid_arg(key, "unrecognized CSV option")),
            }
        }
        if options.skip_rows > 0 {
            options.parallel = false;
        }
        Ok(options)
    }

    /// Whether `value` matches one of the configured null markers.
    pub fn is_null_string(&self, value: &str) -> bool {
        value.is_empty() || self.null_strings.iter().any(|n| n == value)
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" => Ok(true),
        "false" | "0" => Ok(false),
        _ => Err(Error::invalid_arg(key, "expected a boolean")),
    }
}

fn parse_single_char(key: &str, value: &str) -> Result<u8> {
    let bytes = value.as_bytes();
    match bytes {
        [c] => Ok(*c),
        [b'\\', c] => Ok(match c {
            b't' => b'\t',
            b'n' => b'\n',
            b'r' => b'\r',
            b'\\' => b'\\',
            b'\'' => b'\'',
            b'"' => b'"',
            _ => {
                return Err(Error::invalid_arg(key, "unknown escape sequence"));
            }
        }),
        _ => Err(Error::invalid_arg(
            key,
            "expected a single character separator",
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults() {
        let options = CsvOptions::from_option_map(&HashMap::new()).unwrap();
        assert_eq!(options.delimiter, b',');
        assert_eq!(options.quote, b'"');
        assert!(options.parallel);
    }

    #[test]
    fn test_escaped_delimiter() {
        let options = CsvOptions::from_option_map(&map(&[("DELIM", "\\t")])).unwrap();
        assert_eq!(options.delimiter, b'\t');
    }

    #[test]
    fn test_multi_char_delimiter_rejected() {
        assert!(CsvOptions::from_option_map(&map(&[("DELIM", "ab")])).is_err());
    }

    #[test]
    fn test_skip_forces_serial() {
        let options =
            CsvOptions::from_option_map(&map(&[("SKIP", "3"), ("PARALLEL", "true")])).unwrap();
        assert_eq!(options.skip_rows, 3);
        assert!(!options.parallel);
    }

    #[test]
    fn test_null_strings() {
        let options =
            CsvOptions::from_option_map(&map(&[("NULL_STRINGS", "NULL, N/A")])).unwrap();
        assert!(options.is_null_string("NULL"));
        assert!(options.is_null_string("N/A"));
        assert!(options.is_null_string(""));
        assert!(!options.is_null_string("0"));
    }

    #[test]
    fn test_unknown_option_rejected() {
        assert!(CsvOptions::from_option_map(&map(&[("FROBNICATE", "1")])).is_err());
    }
}
