//! Command-level tests against a temporary data directory

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;
use tirair_cli::cli::{GapPolicy, TrainArgs};
use tirair_cli::commands::{history, predict, status, train};
use tirair_cli::AppContext;
use tirair_connectors::{MessageHandler, MqttConfig};
use tirair_core::{FixedClock, SensorRecord};
use tirair_ml::Trainer;

struct Farm {
    _dir: TempDir,
    ctx: AppContext,
    clock: FixedClock,
}

impl Farm {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2024, 5, 1, 6, 0, 0).unwrap());
        let ctx = AppContext::new(dir.path(), MqttConfig::new("localhost", 1883))
            .with_clock(Arc::new(clock.clone()));
        Self {
            _dir: dir,
            ctx,
            clock,
        }
    }

    /// Feed payloads through the same handler the ingest command uses
    fn ingest_hourly(&self, payloads: &[&str]) {
        let store = self.ctx.open_store().unwrap();
        let mut handler = tirair_connectors::IngestionHandler::new(store, self.ctx.clock.clone());
        for (i, payload) in payloads.iter().enumerate() {
            if i > 0 {
                self.clock.advance(Duration::hours(1));
            }
            assert!(handler.handle("cpc357", payload.as_bytes()).is_stored());
        }
    }

    fn output<F>(&self, f: F) -> String
    where
        F: FnOnce(&AppContext, &mut Vec<u8>) -> anyhow::Result<()>,
    {
        let mut out = Vec::new();
        f(&self.ctx, &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }
}

const MORNING: [&str; 3] = [
    "Temperature: 20 C, Humidity: 70 %, Raining: false, Valve: Closed",
    "Temperature: 25 C, Humidity: 65 %, Raining: false, Valve: Open",
    "Temperature: 30 C, Humidity: 60 %, Raining: true, Valve: Closed",
];

#[tokio::test]
async fn train_then_predict_latest() {
    let farm = Farm::new();
    farm.ingest_hourly(&MORNING);

    let args = TrainArgs {
        every: None,
        leading_gap: GapPolicy::ZeroFill,
    };
    let mut out = Vec::new();
    train::run(&farm.ctx, &args, &mut out).await.unwrap();
    let report = String::from_utf8(out).unwrap();
    assert!(report.starts_with("Trained on 3 sample(s) from 3 record(s)"));
    assert!(farm.ctx.artifacts.exists());

    let text = farm.output(|ctx, out| predict::run(ctx, None, out));
    assert_eq!(text, "Next activation: In 1.17 hours (at 30 °C)\n");
}

#[test]
fn predict_explicit_temperature() {
    let farm = Farm::new();
    farm.ingest_hourly(&MORNING);
    train::train_once(&farm.ctx, &Trainer::new()).unwrap();

    let prediction = predict::predict(&farm.ctx, Some(25.0)).unwrap();
    assert!((prediction.hours - 2.0 / 3.0).abs() < 1e-9);
}

#[test]
fn predict_without_model_fails_with_guidance() {
    let farm = Farm::new();
    farm.ingest_hourly(&MORNING[..1]);

    let err = predict::predict(&farm.ctx, None).unwrap_err();
    assert!(err.to_string().contains("run `tirair train` first"));
}

#[test]
fn training_one_record_fails_and_keeps_previous_model() {
    let farm = Farm::new();
    farm.ingest_hourly(&MORNING);
    train::train_once(&farm.ctx, &Trainer::new()).unwrap();
    let before = std::fs::read(farm.ctx.artifacts.path()).unwrap();

    // Another data directory holding one record and a copy of that model
    let lonely = Farm::new();
    lonely.ingest_hourly(&MORNING[..1]);
    std::fs::copy(farm.ctx.artifacts.path(), lonely.ctx.artifacts.path()).unwrap();

    let err = train::train_once(&lonely.ctx, &Trainer::new()).unwrap_err();
    assert!(format!("{:#}", err).contains("insufficient data"));
    assert_eq!(std::fs::read(lonely.ctx.artifacts.path()).unwrap(), before);
}

#[test]
fn status_without_model_still_shows_readings() {
    let farm = Farm::new();
    farm.ingest_hourly(&MORNING);

    let text = farm.output(|ctx, out| status::run(ctx, out));
    assert!(text.contains("Temperature:     30 °C"));
    assert!(text.contains("Rain:            Currently Raining"));
    assert!(text.contains("Next activation: unavailable"));
    assert!(text.contains("Records stored:  3"));
    assert!(text.contains("Model trained:   never"));
}

#[test]
fn status_with_model() {
    let farm = Farm::new();
    farm.ingest_hourly(&MORNING);
    train::train_once(&farm.ctx, &Trainer::new()).unwrap();

    let text = farm.output(|ctx, out| status::run(ctx, out));
    assert!(text.contains("Next activation: In 1.17 hours"));
    assert!(text.contains("Model trained:   2024-05-01T08:00:00Z (3 samples)"));
}

#[test]
fn history_json_lines_decode_as_records() {
    let farm = Farm::new();
    farm.ingest_hourly(&MORNING);

    let text = farm.output(|ctx, out| history::run(ctx, Some(2), true, out));
    let records: Vec<SensorRecord> = text
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].temperature, 25.0);
    assert_eq!(records[1].temperature, 30.0);
}

#[test]
fn history_table() {
    let farm = Farm::new();
    farm.ingest_hourly(&MORNING);

    let text = farm.output(|ctx, out| history::run(ctx, None, false, out));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("2024-05-01T06:00:00Z"));
    assert!(lines[2].contains("raining"));
}
