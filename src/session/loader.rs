use std::path::Path;

use log::{info, warn};
use serde_jsonlines::json_lines;

use crate::PitwallError;

use super::{
    ArchiveRecord, LapSample, OpenF1Client, RawSession, SessionData, SessionPreset, TrackBounds,
    TrackPoint,
};

/// Target size of the decimated track outline handed to the map view.
const TRACK_OUTLINE_POINTS: usize = 1400;

/// Fetch every channel of a session concurrently, without post-processing.
///
/// The raw result is what gets archived to disk, so offline replays run
/// through the exact same assembly pipeline as network replays.
pub fn fetch_raw(preset: &SessionPreset, driver_number: i32) -> Result<RawSession, PitwallError> {
    let preset = SessionPreset {
        driver_number,
        ..preset.clone()
    };
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| PitwallError::FetchRuntimeError { source: e })?;

    let client = OpenF1Client::default();
    let primary = preset.session_key;
    let telemetry = preset.telemetry_session_key;

    let (
        session,
        drivers,
        cars,
        locations,
        positions,
        laps,
        stints,
        pits,
        weather,
        race_control,
        team_radio,
        intervals,
    ) = runtime.block_on(async {
        tokio::try_join!(
            client.session(primary),
            client.drivers(primary),
            client.car_data(telemetry, driver_number),
            client.location(telemetry, driver_number),
            client.positions(primary, driver_number),
            client.laps(primary, driver_number),
            client.stints(primary, driver_number),
            client.pit_stops(primary, driver_number),
            client.weather(primary),
            client.race_control(primary),
            client.team_radio(primary, driver_number),
            client.intervals(primary, driver_number),
        )
    })?;

    info!(
        "fetched session {}: {} car samples, {} location samples, {} laps",
        primary,
        cars.len(),
        locations.len(),
        laps.len()
    );

    Ok(RawSession {
        preset,
        session,
        drivers,
        cars,
        locations,
        positions,
        laps,
        stints,
        pits,
        weather,
        race_control,
        team_radio,
        intervals,
    })
}

/// Read a JSONL session archive back into a [`RawSession`].
pub fn read_archive(input: &Path) -> Result<RawSession, PitwallError> {
    let records = json_lines(input)
        .map_err(|e| PitwallError::ArchiveReadError { source: e })?
        .collect::<Result<Vec<ArchiveRecord>, std::io::Error>>()
        .map_err(|e| PitwallError::ArchiveReadError { source: e })?;

    let mut records = records.into_iter();
    let preset = match records.next() {
        Some(ArchiveRecord::Preset(preset)) => preset,
        _ => {
            return Err(PitwallError::InvalidArchiveFile {
                path: input.display().to_string(),
            });
        }
    };

    let mut raw = RawSession::new(preset);
    for record in records {
        match record {
            ArchiveRecord::Preset(_) => warn!("duplicate preset record in archive, ignoring"),
            ArchiveRecord::Session(session) => raw.session = Some(session),
            ArchiveRecord::Driver(driver) => raw.drivers.push(driver),
            ArchiveRecord::Car(sample) => raw.cars.push(sample),
            ArchiveRecord::Location(sample) => raw.locations.push(sample),
            ArchiveRecord::Position(sample) => raw.positions.push(sample),
            ArchiveRecord::Lap(sample) => raw.laps.push(sample),
            ArchiveRecord::Stint(sample) => raw.stints.push(sample),
            ArchiveRecord::Pit(sample) => raw.pits.push(sample),
            ArchiveRecord::Weather(sample) => raw.weather.push(sample),
            ArchiveRecord::RaceControl(message) => raw.race_control.push(message),
            ArchiveRecord::TeamRadio(sample) => raw.team_radio.push(sample),
            ArchiveRecord::Interval(sample) => raw.intervals.push(sample),
        }
    }
    Ok(raw)
}

/// Load and assemble an archived session.
pub fn load_archive(input: &Path) -> Result<SessionData, PitwallError> {
    let raw = read_archive(input)?;
    Ok(assemble(raw))
}

/// Turn a raw fetch result into the replay input.
///
/// Sorts every channel ascending by timestamp (stable, so the feed order
/// breaks ties), drops laps that cannot be placed on the timeline, computes
/// the load-time derived values, shifts the timing channels onto the
/// telemetry timeline when the two recordings differ, and resolves the
/// selected driver.
pub fn assemble(raw: RawSession) -> SessionData {
    let RawSession {
        mut preset,
        session,
        mut drivers,
        mut cars,
        mut locations,
        mut positions,
        laps,
        mut stints,
        mut pits,
        mut weather,
        mut race_control,
        mut team_radio,
        mut intervals,
    } = raw;

    cars.sort_by_key(|s| s.date);
    locations.sort_by_key(|s| s.date);
    positions.sort_by_key(|s| s.date);
    pits.sort_by_key(|s| s.date);
    weather.sort_by_key(|s| s.date);
    race_control.sort_by_key(|s| s.date);
    team_radio.sort_by_key(|s| s.date);
    intervals.sort_by_key(|s| s.date);
    stints.sort_by_key(|s| s.stint_number);
    drivers.sort_by_key(|d| d.driver_number);

    // the best lap is computed before dropping undated rows: a lap can carry
    // a valid duration even when its start date never made it into the feed
    let best_lap_time = laps.iter().filter_map(|l| l.lap_duration).reduce(f64::min);
    let mut laps: Vec<LapSample> = laps.into_iter().filter(|l| l.date_start.is_some()).collect();
    laps.sort_by_key(|l| l.date_start);

    let track_bounds = TrackBounds::from_locations(&locations);
    let stride = (locations.len() / TRACK_OUTLINE_POINTS).max(1);
    let track_outline = locations
        .iter()
        .step_by(stride)
        .map(|l| TrackPoint { x: l.x, y: l.y })
        .collect();

    let base = [
        cars.first().map(|s| s.date),
        locations.first().map(|s| s.date),
    ]
    .into_iter()
    .flatten()
    .min();

    // When the car/location channels come from a different recording than the
    // timing channels, every timing timestamp is shifted by the offset
    // between the two sessions' start instants so all channels share one
    // timeline. Assumes both recordings' clocks drift identically.
    if preset.telemetry_session_key != preset.session_key {
        if let (Some(base), Some(primary_start)) = (base, session.as_ref().map(|s| s.date_start)) {
            let shift = base.signed_duration_since(primary_start);
            info!(
                "aligning timing channels to the telemetry timeline ({} ms shift)",
                shift.num_milliseconds()
            );
            for s in &mut positions {
                s.date = s.date + shift;
            }
            for l in &mut laps {
                l.date_start = l.date_start.map(|start| start + shift);
            }
            for p in &mut pits {
                p.date = p.date + shift;
            }
            for w in &mut weather {
                w.date = w.date + shift;
            }
            for m in &mut race_control {
                m.date = m.date + shift;
            }
            for r in &mut team_radio {
                r.date = r.date + shift;
            }
            for i in &mut intervals {
                i.date = i.date + shift;
            }
        }
    }

    let driver = drivers
        .iter()
        .find(|d| d.driver_number == preset.driver_number)
        .or_else(|| drivers.first())
        .cloned();
    if let Some(driver) = &driver {
        preset.driver_number = driver.driver_number;
    }

    SessionData {
        preset,
        session,
        drivers,
        driver,
        cars,
        locations,
        positions,
        laps,
        stints,
        pits,
        weather,
        race_control,
        team_radio,
        intervals,
        track_bounds,
        track_outline,
        best_lap_time,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{CarSample, DriverInfo, LocationSample, PositionSample, SessionInfo};
    use chrono::{DateTime, TimeDelta, TimeZone, Utc};

    fn date(seconds: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2023, 9, 17, 12, 0, 0).unwrap() + TimeDelta::seconds(seconds)
    }

    fn car(seconds: i64, speed: f64) -> CarSample {
        CarSample {
            date: date(seconds),
            speed,
            throttle: 0.,
            brake: 0.,
            rpm: 0.,
            gear: 0,
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

    fn lap(lap_number: i32, start_s: Option<i64>, duration: Option<f64>) -> LapSample {
        LapSample {
            lap_number,
            date_start: start_s.map(date),
            lap_duration: duration,
            duration_sector_1: None,
            duration_sector_2: None,
            duration_sector_3: None,
            i1_speed: None,
            i2_speed: None,
            st_speed: None,
            is_pit_out_lap: None,
        }
    }

    fn driver(driver_number: i32) -> DriverInfo {
        DriverInfo {
            driver_number,
            full_name: format!("Driver {driver_number}"),
            name_acronym: format!("D{driver_number}"),
            team_name: "Team".to_string(),
            team_colour: "3671C6".to_string(),
            headshot_url: None,
        }
    }

    fn session_info(start_s: i64) -> SessionInfo {
        SessionInfo {
            meeting_key: 1219,
            session_key: 9165,
            location: "Marina Bay".to_string(),
            session_name: "Race".to_string(),
            country_name: "Singapore".to_string(),
            circuit_short_name: "Singapore".to_string(),
            date_start: date(start_s),
            date_end: date(start_s + 7200),
            year: 2023,
        }
    }

    fn raw_session() -> RawSession {
        RawSession::new(SessionPreset::singapore_race())
    }

    #[test]
    fn test_assemble_sorts_channels_by_timestamp() {
        let mut raw = raw_session();
        raw.cars = vec![car(10, 100.), car(0, 50.), car(5, 75.)];
        raw.locations = vec![location(3, 1., 1.), location(1, 0., 0.)];

        let data = assemble(raw);
        let speeds: Vec<f64> = data.cars.iter().map(|s| s.speed).collect();
        assert_eq!(speeds, vec![50., 75., 100.]);
        assert_eq!(data.locations[0].date, date(1));
    }

    #[test]
    fn test_assemble_sort_is_stable_on_timestamp_ties() {
        let mut raw = raw_session();
        raw.cars = vec![car(5, 1.), car(0, 0.), car(5, 2.), car(5, 3.)];

        let data = assemble(raw);
        let speeds: Vec<f64> = data.cars.iter().map(|s| s.speed).collect();
        // tied timestamps keep the fetch order
        assert_eq!(speeds, vec![0., 1., 2., 3.]);
    }

    #[test]
    fn test_assemble_drops_undated_laps_but_keeps_their_best_time() {
        let mut raw = raw_session();
        raw.cars = vec![car(0, 0.), car(300, 0.)];
        raw.laps = vec![
            lap(1, Some(0), None),
            lap(2, Some(95), Some(92.5)),
            lap(3, None, Some(80.0)),
            lap(4, Some(190), Some(91.2)),
        ];

        let data = assemble(raw);
        assert_eq!(data.laps.len(), 3);
        assert!(data.laps.iter().all(|l| l.date_start.is_some()));
        // the undated lap still counts toward the session best
        assert_eq!(data.best_lap_time, Some(80.0));
    }

    #[test]
    fn test_assemble_shifts_timing_channels_when_recordings_differ() {
        let mut raw = raw_session();
        assert_ne!(
            raw.preset.session_key, raw.preset.telemetry_session_key,
            "preset under test must use a split recording"
        );
        raw.session = Some(session_info(100));
        raw.cars = vec![car(0, 0.), car(600, 0.)];
        raw.positions = vec![PositionSample {
            date: date(150),
            position: 3,
            driver_number: 1,
        }];
        raw.laps = vec![lap(1, Some(130), Some(92.0))];

        let data = assemble(raw);
        // telemetry starts 100 s before the timing session, so timing
        // channels move back by 100 s
        assert_eq!(data.positions[0].date, date(50));
        assert_eq!(data.laps[0].date_start, Some(date(30)));
    }

    #[test]
    fn test_assemble_does_not_shift_when_recordings_match() {
        let mut raw = raw_session();
        raw.preset.telemetry_session_key = raw.preset.session_key;
        raw.session = Some(session_info(100));
        raw.cars = vec![car(0, 0.)];
        raw.positions = vec![PositionSample {
            date: date(150),
            position: 3,
            driver_number: 1,
        }];

        let data = assemble(raw);
        assert_eq!(data.positions[0].date, date(150));
    }

    #[test]
    fn test_assemble_decimates_track_outline() {
        let mut raw = raw_session();
        raw.locations = (0..3000).map(|i| location(i, i as f64, 0.)).collect();

        let data = assemble(raw);
        assert_eq!(data.track_outline.len(), 1500);
        assert_eq!(data.track_outline[0].x, 0.);
        assert_eq!(data.track_outline[1].x, 2.);
    }

    #[test]
    fn test_assemble_keeps_small_outlines_whole() {
        let mut raw = raw_session();
        raw.locations = (0..100).map(|i| location(i, i as f64, 0.)).collect();

        let data = assemble(raw);
        assert_eq!(data.track_outline.len(), 100);
    }

    #[test]
    fn test_assemble_resolves_selected_driver() {
        let mut raw = raw_session();
        raw.preset.driver_number = 44;
        raw.drivers = vec![driver(1), driver(44), driver(81)];

        let data = assemble(raw);
        assert_eq!(data.driver.as_ref().unwrap().driver_number, 44);
        assert_eq!(data.preset.driver_number, 44);
    }

    #[test]
    fn test_assemble_falls_back_to_first_driver() {
        let mut raw = raw_session();
        raw.preset.driver_number = 99;
        raw.drivers = vec![driver(81), driver(1)];

        let data = assemble(raw);
        // drivers are sorted by number before the fallback applies
        assert_eq!(data.driver.as_ref().unwrap().driver_number, 1);
        assert_eq!(data.preset.driver_number, 1);
    }
}
