// Integration tests for the replay pipeline with a synthetic session
//
// This test suite validates the complete workflow:
// 1. Build a raw session the way a fetch would produce it
// 2. Archive it to JSONL and read it back
// 3. Assemble it and drive the sync engine through play, seek and restart
// 4. Verify the driver-switch resume semantics at the engine level

use std::time::{Duration, Instant};

use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use pitwall::replay::SyncEngine;
use pitwall::session::{
    self, CarSample, DriverInfo, IntervalSample, LapSample, LocationSample, PitSample,
    PositionSample, RaceControlMessage, RawSession, SessionInfo, SessionPreset, StintSample,
    TeamRadioSample, WeatherSample,
};
use pitwall::{PitwallError, writer};

fn date(seconds: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 9, 17, 12, 0, 0).unwrap() + TimeDelta::seconds(seconds)
}

fn car(seconds: i64, speed: f64) -> CarSample {
    CarSample {
        date: date(seconds),
        speed,
        throttle: 80.,
        brake: 0.,
        rpm: 10_500.,
        gear: 6,
        drs: 0,
    }
}

fn location(seconds: i64, x: f64, y: f64) -> LocationSample {
    LocationSample {
        date: date(seconds),
        x,
        y,
        z: 0.,
    }
}

fn lap(lap_number: i32, start_s: i64, duration: Option<f64>) -> LapSample {
    LapSample {
        lap_number,
        date_start: Some(date(start_s)),
        lap_duration: duration,
        duration_sector_1: None,
        duration_sector_2: None,
        duration_sector_3: None,
        i1_speed: Some(280),
        i2_speed: Some(152),
        st_speed: Some(295),
        is_pit_out_lap: Some(lap_number == 1),
    }
}

/// A 600 s session with every channel populated. Telemetry and timing share
/// one session key, so no time shift applies.
fn synthetic_raw() -> RawSession {
    let preset = SessionPreset::for_session(9999, None, 1);
    let mut raw = RawSession::new(preset);

    raw.session = Some(SessionInfo {
        meeting_key: 1219,
        session_key: 9999,
        location: "Marina Bay".to_string(),
        session_name: "Race".to_string(),
        country_name: "Singapore".to_string(),
        circuit_short_name: "Singapore".to_string(),
        date_start: date(0),
        date_end: date(600),
        year: 2023,
    });
    raw.drivers = vec![
        DriverInfo {
            driver_number: 1,
            full_name: "Max Verstappen".to_string(),
            name_acronym: "VER".to_string(),
            team_name: "Red Bull Racing".to_string(),
            team_colour: "3671C6".to_string(),
            headshot_url: None,
        },
        DriverInfo {
            driver_number: 44,
            full_name: "Lewis Hamilton".to_string(),
            name_acronym: "HAM".to_string(),
            team_name: "Mercedes".to_string(),
            team_colour: "6CD3BF".to_string(),
            headshot_url: None,
        },
    ];
    raw.cars = (0..=600).map(|s| car(s, 150. + (s % 120) as f64)).collect();
    raw.locations = (0..=600)
        .map(|s| {
            let angle = s as f64 / 600. * std::f64::consts::TAU;
            location(s, angle.cos() * 1000., angle.sin() * 800.)
        })
        .collect();
    raw.positions = vec![
        PositionSample {
            date: date(0),
            position: 2,
            driver_number: 1,
        },
        PositionSample {
            date: date(200),
            position: 1,
            driver_number: 1,
        },
    ];
    raw.laps = (1..=7)
        .map(|n| {
            let start = (n as i64 - 1) * 90;
            let duration = if n == 1 { None } else { Some(88.0 + n as f64) };
            lap(n, start, duration)
        })
        .collect();
    raw.stints = vec![
        StintSample {
            stint_number: 1,
            lap_start: 1,
            lap_end: Some(3),
            compound: "MEDIUM".to_string(),
            tyre_age_at_start: Some(0),
        },
        StintSample {
            stint_number: 2,
            lap_start: 4,
            lap_end: None,
            compound: "HARD".to_string(),
            tyre_age_at_start: Some(2),
        },
    ];
    raw.pits = vec![PitSample {
        date: date(275),
        lap_number: 3,
        pit_duration: Some(23.4),
    }];
    raw.weather = vec![
        WeatherSample {
            date: date(0),
            air_temperature: Some(29.4),
            track_temperature: Some(34.0),
            humidity: Some(70.),
            pressure: Some(1008.1),
            rainfall: Some(0.),
            wind_speed: Some(0.8),
            wind_direction: Some(120.),
        },
        WeatherSample {
            date: date(300),
            air_temperature: Some(28.9),
            track_temperature: Some(32.6),
            humidity: Some(74.),
            pressure: Some(1008.0),
            rainfall: Some(0.),
            wind_speed: Some(1.1),
            wind_direction: Some(135.),
        },
    ];
    raw.race_control = vec![RaceControlMessage {
        date: date(5),
        driver_number: None,
        lap_number: Some(1),
        category: "Flag".to_string(),
        flag: Some("GREEN".to_string()),
        scope: Some("Track".to_string()),
        sector: None,
        message: "GREEN LIGHT - PIT EXIT OPEN".to_string(),
    }];
    raw.team_radio = vec![TeamRadioSample {
        date: date(320),
        recording_url: "https://example.com/radio/1.mp3".to_string(),
    }];
    raw.intervals = vec![IntervalSample {
        date: date(250),
        gap_to_leader: Some(1.2),
        interval: Some(1.2),
        driver_number: 1,
    }];
    raw
}

#[test]
fn test_end_to_end_playback_over_synthetic_session() {
    let data = session::assemble(synthetic_raw());
    let mut engine = SyncEngine::new(data, 0.).expect("synthetic session must load");
    engine.set_rate(1.);

    // drive the engine at a simulated 20 Hz for 5 wall-clock seconds
    let start = Instant::now();
    engine.tick(start);
    for step in 1..=100u64 {
        engine.tick(start + Duration::from_millis(50 * step));
    }

    let snapshot = engine.snapshot();
    assert!((snapshot.offset_s - 5.).abs() < 1e-6);
    assert_eq!(snapshot.duration_s, 600.);
    assert_eq!(snapshot.car.as_ref().map(|c| c.date), Some(date(5)));
    assert_eq!(snapshot.lap.as_ref().map(|l| l.lap_number), Some(1));
    assert_eq!(snapshot.stint.as_ref().map(|s| s.stint_number), Some(1));
    assert!(snapshot.race_control.is_some());
    assert!(snapshot.last_completed_lap_s.is_none());
    assert_eq!(snapshot.speed_trace.len(), 6);

    // scrub to the middle of the session
    engine.seek(0.5);
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.offset_s, 300.);
    assert_eq!(snapshot.progress, 0.5);
    assert_eq!(snapshot.lap.as_ref().map(|l| l.lap_number), Some(4));
    assert_eq!(snapshot.stint.as_ref().map(|s| s.compound.as_str()), Some("HARD"));
    assert_eq!(snapshot.position.as_ref().map(|p| p.position), Some(1));
    assert_eq!(snapshot.pit.as_ref().map(|p| p.lap_number), Some(3));
    assert_eq!(snapshot.last_completed_lap_s, Some(92.0));
    assert_eq!(snapshot.best_lap_time_s, Some(90.0));

    // and back to the start
    engine.restart();
    let snapshot = engine.snapshot();
    assert_eq!(snapshot.offset_s, 0.);
    assert_eq!(snapshot.lap.as_ref().map(|l| l.lap_number), Some(1));
    assert!(snapshot.position.is_some());
}

#[test]
fn test_archive_round_trip_preserves_every_channel() {
    let raw = synthetic_raw();
    let dir = tempfile::tempdir().expect("Could not create temp dir");
    let path = dir.path().join("session.jsonl");

    writer::write_archive(&path, &raw).expect("Could not write archive");
    let read = session::read_archive(&path).expect("Could not read archive");

    assert_eq!(raw, read);
}

#[test]
fn test_archived_replay_matches_network_replay() {
    let raw = synthetic_raw();
    let dir = tempfile::tempdir().expect("Could not create temp dir");
    let path = dir.path().join("session.jsonl");
    writer::write_archive(&path, &raw).expect("Could not write archive");

    let from_archive = session::load_archive(&path).expect("Could not load archive");
    let from_network = session::assemble(raw);
    assert_eq!(from_network, from_archive);
}

#[test]
fn test_archive_without_preset_header_is_rejected() {
    let dir = tempfile::tempdir().expect("Could not create temp dir");
    let path = dir.path().join("bad.jsonl");
    std::fs::write(
        &path,
        "{\"Car\":{\"date\":\"2023-09-17T12:00:00+00:00\",\"speed\":100,\"throttle\":50,\"brake\":0,\"rpm\":9000,\"n_gear\":4,\"drs\":0}}\n",
    )
    .expect("Could not write file");

    let result = session::read_archive(&path);
    assert!(matches!(
        result,
        Err(PitwallError::InvalidArchiveFile { .. })
    ));
}

#[test]
fn test_missing_archive_file_is_an_error() {
    let result = session::read_archive(std::path::Path::new("/nonexistent/session.jsonl"));
    assert!(matches!(result, Err(PitwallError::ArchiveReadError { .. })));
}

#[test]
fn test_driver_switch_resumes_at_previous_offset() {
    let data = session::assemble(synthetic_raw());
    let mut engine = SyncEngine::new(data, 0.).expect("synthetic session must load");
    engine.seek(0.4);
    let resume_offset_s = engine.snapshot().offset_s;
    assert!((resume_offset_s - 240.).abs() < 1e-9);

    // switching drivers re-creates the engine from a fresh load, resuming at
    // the offset the previous engine reported
    let reloaded = session::assemble(synthetic_raw());
    let replacement =
        SyncEngine::new(reloaded, resume_offset_s).expect("synthetic session must load");
    assert_eq!(replacement.snapshot().offset_s, 240.);
    assert_eq!(
        replacement.snapshot().lap,
        engine.snapshot().lap,
        "both engines must sit on the same lap after the switch"
    );
}

#[test]
fn test_empty_raw_session_fails_to_load() {
    let raw = RawSession::new(SessionPreset::for_session(1234, None, 1));
    let data = session::assemble(raw);
    let result = SyncEngine::new(data, 0.);
    assert!(matches!(result, Err(PitwallError::EmptyReplayWindow)));
}
