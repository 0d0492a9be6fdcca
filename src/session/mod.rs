pub(crate) mod client;
pub(crate) mod loader;

pub use client::OpenF1Client;
pub use loader::{assemble, fetch_raw, load_archive, read_archive};

use chrono::{DateTime, Utc};
use itertools::{Itertools, MinMaxResult};
use serde::{Deserialize, Serialize};

/// A sample that can be placed on the session timeline.
///
/// Every replayable channel implements this; the replay core only ever looks
/// at samples through their timestamp, so it stays generic over the channel
/// payloads.
pub trait Timestamped {
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Timestamp handling for the OpenF1 wire format.
///
/// The API mixes RFC 3339 timestamps with and without a UTC offset, sometimes
/// with fractional seconds and sometimes without, so plain chrono serde
/// support rejects part of the feed.
pub mod datefmt {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de};

    pub fn parse_utc(value: &str) -> Option<DateTime<Utc>> {
        if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
            return Some(parsed.with_timezone(&Utc));
        }
        // offset-less timestamps are UTC
        NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    pub fn serialize<S: Serializer>(
        date: &DateTime<Utc>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&date.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<Utc>, D::Error> {
        let value = String::deserialize(deserializer)?;
        parse_utc(&value).ok_or_else(|| de::Error::custom(format!("invalid timestamp: {value}")))
    }

    pub mod option {
        use chrono::{DateTime, Utc};
        use serde::{Deserialize, Deserializer, Serializer, de};

        pub fn serialize<S: Serializer>(
            date: &Option<DateTime<Utc>>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match date {
                Some(date) => serializer.serialize_some(&date.to_rfc3339()),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<String>::deserialize(deserializer)? {
                None => Ok(None),
                Some(value) => super::parse_utc(&value)
                    .map(Some)
                    .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {value}"))),
            }
        }
    }
}

/// Session metadata from the `sessions` endpoint.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionInfo {
    pub meeting_key: i32,
    pub session_key: i32,
    pub location: String,
    pub session_name: String,
    pub country_name: String,
    pub circuit_short_name: String,
    #[serde(with = "datefmt")]
    pub date_start: DateTime<Utc>,
    #[serde(with = "datefmt")]
    pub date_end: DateTime<Utc>,
    pub year: i32,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DriverInfo {
    pub driver_number: i32,
    pub full_name: String,
    pub name_acronym: String,
    pub team_name: String,
    pub team_colour: String,
    pub headshot_url: Option<String>,
}

/// One car telemetry reading, ~3.7 Hz in the source feed.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct CarSample {
    #[serde(with = "datefmt")]
    pub date: DateTime<Utc>,
    /// Speed in km/h
    pub speed: f64,
    /// Throttle application, 0-100
    pub throttle: f64,
    /// Brake application, 0-100
    pub brake: f64,
    /// Engine revolutions per minute
    pub rpm: f64,
    /// Selected gear, 0 is neutral
    #[serde(rename = "n_gear")]
    pub gear: i32,
    /// Raw DRS status code from the source feed
    pub drs: i32,
}

/// Car position on the circuit, in the source feed's local coordinate space.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LocationSample {
    #[serde(with = "datefmt")]
    pub date: DateTime<Utc>,
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PositionSample {
    #[serde(with = "datefmt")]
    pub date: DateTime<Utc>,
    pub position: i32,
    pub driver_number: i32,
}

/// One lap row. Laps that never started (or were never timed) carry no
/// `date_start`/`lap_duration`; the loader drops undated rows before playback.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LapSample {
    pub lap_number: i32,
    #[serde(default, with = "datefmt::option")]
    pub date_start: Option<DateTime<Utc>>,
    pub lap_duration: Option<f64>,
    pub duration_sector_1: Option<f64>,
    pub duration_sector_2: Option<f64>,
    pub duration_sector_3: Option<f64>,
    pub i1_speed: Option<i32>,
    pub i2_speed: Option<i32>,
    pub st_speed: Option<i32>,
    pub is_pit_out_lap: Option<bool>,
}

/// A run of laps on one set of tyres. `lap_end` is absent while the stint is
/// still open.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct StintSample {
    pub stint_number: i32,
    pub lap_start: i32,
    pub lap_end: Option<i32>,
    pub compound: String,
    pub tyre_age_at_start: Option<i32>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PitSample {
    #[serde(with = "datefmt")]
    pub date: DateTime<Utc>,
    pub lap_number: i32,
    pub pit_duration: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct WeatherSample {
    #[serde(with = "datefmt")]
    pub date: DateTime<Utc>,
    pub air_temperature: Option<f64>,
    pub track_temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub pressure: Option<f64>,
    pub rainfall: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct RaceControlMessage {
    #[serde(with = "datefmt")]
    pub date: DateTime<Utc>,
    pub driver_number: Option<i32>,
    pub lap_number: Option<i32>,
    pub category: String,
    pub flag: Option<String>,
    pub scope: Option<String>,
    pub sector: Option<i32>,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TeamRadioSample {
    #[serde(with = "datefmt")]
    pub date: DateTime<Utc>,
    pub recording_url: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct IntervalSample {
    #[serde(with = "datefmt")]
    pub date: DateTime<Utc>,
    pub gap_to_leader: Option<f64>,
    pub interval: Option<f64>,
    pub driver_number: i32,
}

impl Timestamped for CarSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Timestamped for LocationSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Timestamped for PositionSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Timestamped for LapSample {
    // undated laps never reach a cursor (the loader filters them); MIN_UTC
    // keeps the impl total
    fn timestamp(&self) -> DateTime<Utc> {
        self.date_start.unwrap_or(DateTime::<Utc>::MIN_UTC)
    }
}

impl Timestamped for PitSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Timestamped for WeatherSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Timestamped for RaceControlMessage {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Timestamped for TeamRadioSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

impl Timestamped for IntervalSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.date
    }
}

/// A point of the decimated track outline or of the rolling position trail.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackPoint {
    pub x: f64,
    pub y: f64,
}

/// Bounding box of the location series, used to scale the track map.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TrackBounds {
    pub min_x: f64,
    pub max_x: f64,
    pub min_y: f64,
    pub max_y: f64,
}

impl TrackBounds {
    pub const ZERO: TrackBounds = TrackBounds {
        min_x: 0.,
        max_x: 1.,
        min_y: 0.,
        max_y: 1.,
    };

    pub fn from_locations(locations: &[LocationSample]) -> Self {
        if locations.is_empty() {
            return Self::ZERO;
        }
        let (min_x, max_x) = axis_bounds(locations.iter().map(|l| l.x));
        let (min_y, max_y) = axis_bounds(locations.iter().map(|l| l.y));
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
        }
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

impl Default for TrackBounds {
    fn default() -> Self {
        Self::ZERO
    }
}

fn axis_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    match values.minmax() {
        MinMaxResult::NoElements => (0., 1.),
        MinMaxResult::OneElement(only) => (only, only),
        MinMaxResult::MinMax(lo, hi) => (lo, hi),
    }
}

/// Which session (and driver) to replay.
///
/// Some meetings publish car and location telemetry under a different session
/// key than the timing data; `telemetry_session_key` points at that recording
/// and equals `session_key` when no split exists.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SessionPreset {
    pub session_key: i32,
    pub telemetry_session_key: i32,
    pub driver_number: i32,
    pub label: String,
    pub subtitle: String,
}

impl SessionPreset {
    /// The 2023 Singapore GP race, whose telemetry lives under the practice
    /// session key.
    pub fn singapore_race() -> Self {
        Self {
            session_key: 9165,
            telemetry_session_key: 9158,
            driver_number: 1,
            label: "Singapore 2023".to_string(),
            subtitle: "Race - Replay".to_string(),
        }
    }

    pub fn for_session(
        session_key: i32,
        telemetry_session_key: Option<i32>,
        driver_number: i32,
    ) -> Self {
        Self {
            session_key,
            telemetry_session_key: telemetry_session_key.unwrap_or(session_key),
            driver_number,
            label: format!("Session {session_key}"),
            subtitle: "Replay".to_string(),
        }
    }
}

/// Everything fetched for one session, exactly as the API returned it:
/// unsorted, unshifted, unfiltered. `assemble` turns this into a
/// [`SessionData`].
#[derive(Clone, Debug, PartialEq)]
pub struct RawSession {
    pub preset: SessionPreset,
    pub session: Option<SessionInfo>,
    pub drivers: Vec<DriverInfo>,
    pub cars: Vec<CarSample>,
    pub locations: Vec<LocationSample>,
    pub positions: Vec<PositionSample>,
    pub laps: Vec<LapSample>,
    pub stints: Vec<StintSample>,
    pub pits: Vec<PitSample>,
    pub weather: Vec<WeatherSample>,
    pub race_control: Vec<RaceControlMessage>,
    pub team_radio: Vec<TeamRadioSample>,
    pub intervals: Vec<IntervalSample>,
}

impl RawSession {
    pub fn new(preset: SessionPreset) -> Self {
        Self {
            preset,
            session: None,
            drivers: Vec::new(),
            cars: Vec::new(),
            locations: Vec::new(),
            positions: Vec::new(),
            laps: Vec::new(),
            stints: Vec::new(),
            pits: Vec::new(),
            weather: Vec::new(),
            race_control: Vec::new(),
            team_radio: Vec::new(),
            intervals: Vec::new(),
        }
    }
}

/// One line of a JSONL session archive. The first record of a valid archive
/// is always `Preset`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub enum ArchiveRecord {
    Preset(SessionPreset),
    Session(SessionInfo),
    Driver(DriverInfo),
    Car(CarSample),
    Location(LocationSample),
    Position(PositionSample),
    Lap(LapSample),
    Stint(StintSample),
    Pit(PitSample),
    Weather(WeatherSample),
    RaceControl(RaceControlMessage),
    TeamRadio(TeamRadioSample),
    Interval(IntervalSample),
}

/// The assembled replay input: every series sorted ascending by timestamp
/// (stable, so fetch order breaks ties), undated laps dropped, timing
/// channels shifted onto the telemetry timeline, and the load-time derived
/// values computed. Never mutated after assembly; replaced wholesale when the
/// driver or session changes.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionData {
    pub preset: SessionPreset,
    pub session: Option<SessionInfo>,
    pub drivers: Vec<DriverInfo>,
    pub driver: Option<DriverInfo>,
    pub cars: Vec<CarSample>,
    pub locations: Vec<LocationSample>,
    pub positions: Vec<PositionSample>,
    pub laps: Vec<LapSample>,
    pub stints: Vec<StintSample>,
    pub pits: Vec<PitSample>,
    pub weather: Vec<WeatherSample>,
    pub race_control: Vec<RaceControlMessage>,
    pub team_radio: Vec<TeamRadioSample>,
    pub intervals: Vec<IntervalSample>,
    pub track_bounds: TrackBounds,
    pub track_outline: Vec<TrackPoint>,
    pub best_lap_time: Option<f64>,
}

impl SessionData {
    /// The playable span: earliest first timestamp to latest last timestamp
    /// across the two primary channels (car and location). `None` when
    /// neither channel produced a sample, in which case playback must not
    /// start.
    pub fn session_window(&self) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        let base = [
            self.cars.first().map(|s| s.date),
            self.locations.first().map(|s| s.date),
        ]
        .into_iter()
        .flatten()
        .min()?;
        let end = [
            self.cars.last().map(|s| s.date),
            self.locations.last().map(|s| s.date),
        ]
        .into_iter()
        .flatten()
        .max()?;
        Some((base, end))
    }
}
