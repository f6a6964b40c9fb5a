//! Capture files: JSON sample arrays and CSV exports
//!
//! CSV rows are `index,time_ms,mode,value1,value2,value3[,value4,value5]`.
//! A header line is skipped; an empty or `nan` field is a missing reading.

use anyhow::{anyhow, bail, Context, Result};
use glove_core::{Capture, MeasurementMode, Sample};
use std::fs;
use std::path::Path;

/// Capture file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureFormat {
    Json,
    Csv,
}

impl CaptureFormat {
    /// Format from the file extension, JSON unless it is `.csv`
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => CaptureFormat::Csv,
            _ => CaptureFormat::Json,
        }
    }
}

pub fn load_capture(path: &Path) -> Result<Capture> {
    let text = fs::read_to_string(path).with_context(|| format!("reading capture {}", path.display()))?;
    let capture = match CaptureFormat::from_path(path) {
        CaptureFormat::Csv => parse_csv(&text),
        CaptureFormat::Json => serde_json::from_str(&text).map_err(anyhow::Error::from),
    };
    capture.with_context(|| format!("parsing capture {}", path.display()))
}

pub fn parse_csv(text: &str) -> Result<Capture> {
    let mut samples = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let parts: Vec<&str> = line.split(',').map(str::trim).collect();
        if samples.is_empty() && parts[0].parse::<i64>().is_err() {
            // header
            continue;
        }
        samples.push(parse_row(&parts).with_context(|| format!("line {}", line_no + 1))?);
    }
    Ok(Capture::new(samples)?)
}

fn parse_row(parts: &[&str]) -> Result<Sample> {
    if parts.len() != 6 && parts.len() != 8 {
        bail!("expected 6 or 8 fields, found {}", parts.len());
    }
    let index: i64 = parts[0].parse().map_err(|_| anyhow!("bad index '{}'", parts[0]))?;
    let time_ms: i64 = parts[1].parse().map_err(|_| anyhow!("bad time '{}'", parts[1]))?;
    let mode: MeasurementMode = parts[2].parse()?;
    let values = parts[3..]
        .iter()
        .map(|p| parse_value(p))
        .collect::<Result<Vec<f64>>>()?;

    Ok(match values.as_slice() {
        [v1, v2, v3] => Sample::legacy(index, time_ms, mode, [*v1, *v2, *v3]),
        [v1, v2, v3, v4, v5] => Sample::new(index, time_ms, mode, [*v1, *v2, *v3, *v4, *v5]),
        _ => bail!("expected 3 or 5 readings, found {}", values.len()),
    })
}

fn parse_value(field: &str) -> Result<f64> {
    if field.is_empty() {
        return Ok(f64::NAN);
    }
    field.parse().map_err(|_| anyhow!("bad reading '{}'", field))
}

pub fn write_capture(capture: &Capture, path: &Path, format: CaptureFormat) -> Result<()> {
    let text = match format {
        CaptureFormat::Json => serde_json::to_string_pretty(capture)?,
        CaptureFormat::Csv => to_csv(capture),
    };
    fs::write(path, text).with_context(|| format!("writing capture {}", path.display()))
}

pub fn to_csv(capture: &Capture) -> String {
    let mut out = String::from("index,time_ms,mode,value1,value2,value3");
    if !capture.is_legacy() {
        out.push_str(",value4,value5");
    }
    out.push('\n');

    for s in capture.samples() {
        out.push_str(&format!("{},{},{},{},{},{}", s.index, s.time_ms, s.mode.tag(), s.value1, s.value2, s.value3));
        if let (Some(v4), Some(v5)) = (s.value4, s.value5) {
            out.push_str(&format!(",{},{}", v4, v5));
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use glove_core::Channel;

    #[test]
    fn test_parse_current_format_with_header() {
        let text = "index,time_ms,mode,value1,value2,value3,value4,value5\n\
                    0,0,1,2048,0.1,0.98,0,0\n\
                    1,10,1,2050,0.2,0.97,0,0\n";
        let capture = parse_csv(text).unwrap();
        assert_eq!(capture.len(), 2);
        assert_eq!(capture.mode(), MeasurementMode::Tremor);
        assert!(!capture.is_legacy());
        assert_eq!(capture.channel(Channel::Value1).unwrap(), vec![2048.0, 2050.0]);
    }

    #[test]
    fn test_parse_legacy_rows_and_missing_readings() {
        let text = "0,0,3,1.5,,0\n1,10,3,nan,2.0,0\n";
        let capture = parse_csv(text).unwrap();
        assert!(capture.is_legacy());
        let v1 = capture.channel(Channel::Value1).unwrap();
        assert!(v1[1].is_nan());
        assert!(capture.channel(Channel::Value2).unwrap()[0].is_nan());
    }

    #[test]
    fn test_rejects_malformed_rows() {
        assert!(parse_csv("0,0,1,1,2\n").is_err());
        assert!(parse_csv("0,0,9,1,2,3\n").is_err());
        assert!(parse_csv("0,x,1,1,2,3\n1,10,1,1,2,3\n").is_err());
    }

    #[test]
    fn test_csv_export_reads_back() {
        let capture = parse_csv("0,0,2,100,10.5,0,0,0\n1,10,2,110,11.5,0,0,0\n").unwrap();
        assert_eq!(parse_csv(&to_csv(&capture)).unwrap(), capture);
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(CaptureFormat::from_path(Path::new("run.CSV")), CaptureFormat::Csv);
        assert_eq!(CaptureFormat::from_path(Path::new("run.json")), CaptureFormat::Json);
    }
}
