//! Fill-level readings scraped from a sensor's serial console.

use std::io::{self, BufRead};

use binwatch_core::{model::Measurement, ports::MeasurementSource};
use tracing::debug;

const FILL_LEVEL_MARKER: &str = "Fill Level:";

/// Readings taken from console lines, e.g. the sensor firmware's serial log.
pub(crate) struct LineSource<R> {
    reader: R,
    line: Vec<u8>,
}

impl<R: BufRead> LineSource<R> {
    pub(crate) fn new(reader: R) -> Self {
        Self {
            reader,
            line: Vec::new(),
        }
    }
}

impl<R: BufRead> MeasurementSource for LineSource<R> {
    fn next_reading(&mut self) -> Result<Option<Measurement>, io::Error> {
        loop {
            self.line.clear();
            if self.reader.read_until(b'\n', &mut self.line)? == 0 {
                return Ok(None);
            }
            // Boot ROM output at the wrong baud rate is not UTF-8; it must not end the stream.
            let text = String::from_utf8_lossy(&self.line);
            match parse_reading(&text) {
                Some(fill_level) => return Ok(Some(Measurement::new(fill_level))),
                None => debug!(line = text.trim_end(), "skipping line without a reading"),
            }
        }
    }
}

/// Extract the fill level from `I (1234) sensor: Fill Level: 42.50%`.
///
/// Lines without the marker are never readings, even when they hold a bare number.
pub(crate) fn parse_reading(line: &str) -> Option<f32> {
    let (_, raw) = line.split_once(FILL_LEVEL_MARKER)?;
    raw.trim().trim_end_matches('%').trim_end().parse().ok()
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    #[test]
    fn parses_firmware_log_line() {
        assert_eq!(
            parse_reading("I (48213) ULTRASONIC: Fill Level: 42.50%\n"),
            Some(42.5),
            "log line not parsed"
        );
    }

    #[test]
    fn strips_percent_suffix_and_spacing() {
        assert_eq!(parse_reading("Fill Level:  -3 % "), Some(-3.0), "suffix not stripped");
        assert_eq!(parse_reading("Fill Level: 17.25"), Some(17.25), "plain value not parsed");
    }

    #[test]
    fn bare_numbers_are_not_readings() {
        assert_eq!(parse_reading("17.25"), None, "stray number parsed");
        assert_eq!(parse_reading("42\n"), None, "stray integer parsed");
    }

    #[test]
    fn ignores_unrelated_lines() {
        assert_eq!(parse_reading("I (12) wifi: connected"), None, "noise parsed");
        assert_eq!(parse_reading("Fill Level: n/a"), None, "placeholder parsed");
        assert_eq!(parse_reading(""), None, "empty line parsed");
    }

    #[test]
    fn source_skips_noise_and_ends_with_input() {
        let input = "boot\nFill Level: 10.0%\nDistance: 23 cm\n55\nFill Level: 55%\n";
        let mut source = LineSource::new(Cursor::new(input));

        let mut readings = Vec::new();
        while let Some(measurement) = source.next_reading().expect("in-memory read") {
            readings.push(measurement.fill_level);
        }

        assert_eq!(readings, vec![10.0, 55.0], "wrong readings extracted");
    }

    #[test]
    fn source_survives_non_utf8_lines() {
        let input: &[u8] = b"\xff\xfe boot garbage\nFill Level: 10.0%\n\x80\nFill Level: 20.0%\n";
        let mut source = LineSource::new(Cursor::new(input));

        let mut readings = Vec::new();
        while let Some(measurement) = source.next_reading().expect("garbage is skipped") {
            readings.push(measurement.fill_level);
        }

        assert_eq!(readings, vec![10.0, 20.0], "readings after garbage lost");
    }
}
