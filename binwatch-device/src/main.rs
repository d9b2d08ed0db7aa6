//! Device-side forwarder that posts fill-level readings to the binwatch backend.

mod source;

use std::io::{self, BufRead};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::{Context, Result};
use binwatch_core::{MeasurementSource, Settings, TelemetryReporter};
use binwatch_transport_http::HttpTransport;
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::source::LineSource;

/// Waste-bin fill-level reporter
#[derive(Parser, Debug)]
#[command(version, about = "Report waste-bin fill levels to binwatch", long_about = None)]
struct Args {
    /// Configuration file; `binwatch.toml` in the working directory is used when present
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Report a single reading and exit with its outcome
    Send {
        /// Fill level in percent
        #[arg(allow_negative_numbers = true)]
        fill_level: f32,
    },

    /// Report every reading found on standard input, e.g. a sensor's serial console
    Forward,
}

fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Args::parse();

    let settings = Settings::load(args.config.as_deref()).context("loading settings")?;
    let transport =
        HttpTransport::from_settings(&settings.delivery).context("building HTTP client")?;
    let reporter = TelemetryReporter::from_settings(Arc::new(transport), &settings)?;
    info!(endpoint = %reporter.endpoint(), "reporter ready");

    match args.command {
        Commands::Send { fill_level } => {
            if reporter.report(fill_level).is_delivered() {
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }
        Commands::Forward => {
            let reported = forward(&reporter, io::stdin().lock())?;
            info!(reported, "measurement stream closed");
            Ok(ExitCode::SUCCESS)
        }
    }
}

// Failed deliveries are logged by the reporter and never end the loop.
// Returns how many readings were handed to the reporter.
fn forward(reporter: &TelemetryReporter, input: impl BufRead) -> Result<u64> {
    let mut source = LineSource::new(input);
    let mut reported = 0_u64;
    while let Some(measurement) = source.next_reading().context("reading measurements")? {
        reporter.report(measurement.fill_level);
        reported += 1;
    }
    Ok(reported)
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;

    use binwatch_core::{RequestConfig, RequestHandle, Transport, TransportError, TransportResponse};

    use super::*;

    /// Bodies seen by [`FlakyTransport`], shared with its request handles.
    #[derive(Default)]
    struct Recorded {
        bodies: Mutex<Vec<Vec<u8>>>,
    }

    /// Refuses the first connection, accepts the rest, and records every body sent.
    #[derive(Default)]
    struct FlakyTransport {
        recorded: Arc<Recorded>,
    }

    struct FlakyRequest {
        recorded: Arc<Recorded>,
    }

    impl Transport for FlakyTransport {
        fn open(&self, _config: &RequestConfig) -> Result<Box<dyn RequestHandle>, TransportError> {
            Ok(Box::new(FlakyRequest {
                recorded: Arc::clone(&self.recorded),
            }))
        }
    }

    impl RequestHandle for FlakyRequest {
        fn set_header(&mut self, _name: &str, _value: &str) -> Result<(), TransportError> {
            Ok(())
        }

        fn perform(&mut self, body: &[u8]) -> Result<TransportResponse, TransportError> {
            let mut bodies = self.recorded.bodies.lock().expect("bodies lock");
            bodies.push(body.to_vec());
            if bodies.len() == 1 {
                return Err(TransportError::Connect("connection refused".to_owned()));
            }
            Ok(TransportResponse { status: 200 })
        }
    }

    fn reporter_over(transport: FlakyTransport) -> TelemetryReporter {
        TelemetryReporter::from_settings(Arc::new(transport), &Settings::default())
            .expect("default settings are valid")
    }

    fn reported_levels(recorded: &Recorded) -> Vec<f64> {
        recorded
            .bodies
            .lock()
            .expect("bodies lock")
            .iter()
            .map(|body| {
                let text = String::from_utf8_lossy(body);
                let (_, rest) = text
                    .split_once(r#""non_recyclable":"#)
                    .expect("fill level field");
                let (value, _) = rest.split_once(',').expect("field separator");
                value.parse().expect("numeric fill level")
            })
            .collect()
    }

    #[test]
    fn failed_delivery_does_not_stop_forwarding() {
        let transport = FlakyTransport::default();
        let recorded = Arc::clone(&transport.recorded);
        let reporter = reporter_over(transport);
        let input: &[u8] = b"\xff\xfe rom garbage\n\
            I (10) sensor: Fill Level: 10.0%\n\
            I (20) sensor: Fill Level: 20.0%\n\
            I (25) wifi: rssi -61\n\
            I (30) sensor: Fill Level: 30.0%\n";

        let reported = forward(&reporter, Cursor::new(input)).expect("stream ends cleanly");

        assert_eq!(reported, 3, "every reading must be handed to the reporter");
        assert_eq!(
            reported_levels(&recorded),
            vec![10.0, 20.0, 30.0],
            "readings after the refused one were not sent"
        );
    }

    #[test]
    fn empty_stream_reports_nothing() {
        let transport = FlakyTransport::default();
        let recorded = Arc::clone(&transport.recorded);
        let reporter = reporter_over(transport);

        let reported = forward(&reporter, Cursor::new(Vec::new())).expect("empty stream");

        assert_eq!(reported, 0, "nothing to report");
        assert!(reported_levels(&recorded).is_empty(), "transport used without input");
    }
}
