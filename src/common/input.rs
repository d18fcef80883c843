use anyhow::{Context, Result};
use flate2::read::GzDecoder;
use log::{info, warn};
use serde::de::DeserializeOwned;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use super::ReadStats;

/// Only the first few malformed lines are logged individually
const MAX_LOGGED_FAILURES: usize = 5;

/// Open a file for line reading, decompressing when it ends in `.gz`
pub fn open_lines<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open file: {}", path.display()))?;

    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(GzDecoder::new(file))
    } else {
        Box::new(file)
    };

    Ok(Box::new(BufReader::new(reader)))
}

/// Read a JSONL file of `T` records. Lines that fail to parse are skipped
/// with a warning; I/O errors are fatal.
pub fn read_jsonl<T, P>(path: P) -> Result<(Vec<T>, ReadStats)>
where
    T: DeserializeOwned,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let reader = open_lines(path)?;
    read_jsonl_from(reader, &path.display().to_string())
}

pub fn read_jsonl_from<T, R>(reader: R, source: &str) -> Result<(Vec<T>, ReadStats)>
where
    T: DeserializeOwned,
    R: BufRead,
{
    let mut records = Vec::new();
    let mut stats = ReadStats::default();

    for line_result in reader.lines() {
        let line = line_result.with_context(|| format!("Failed to read line from {}", source))?;
        stats.lines_read += 1;

        if line.trim().is_empty() {
            continue;
        }

        match serde_json::from_str::<T>(&line) {
            Ok(record) => {
                records.push(record);
                stats.records_parsed += 1;
            }
            Err(e) => {
                if stats.records_skipped < MAX_LOGGED_FAILURES {
                    warn!("Skipping malformed record at {}:{}: {}", source, stats.lines_read, e);
                }
                stats.records_skipped += 1;
            }
        }
    }

    if stats.records_skipped > 0 {
        warn!("Skipped {} malformed records in {}", stats.records_skipped, source);
    }
    info!("Read {} records from {}", stats.records_parsed, source);

    Ok((records, stats))
}
