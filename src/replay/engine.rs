use std::time::Instant;

use chrono::{DateTime, TimeDelta, Utc};
use log::{debug, warn};

use crate::PitwallError;
use crate::session::{
    CarSample, DriverInfo, IntervalSample, LapSample, LocationSample, PitSample, PositionSample,
    RaceControlMessage, SessionData, SessionInfo, SessionPreset, StintSample, TeamRadioSample,
    TrackBounds, TrackPoint, WeatherSample,
};

use super::clock::{PlaybackClock, TickOutcome};
use super::cursor::StreamCursor;
use super::window::RollingWindow;

/// Samples kept in the rolling speed trace.
pub const SPEED_TRACE_CAPACITY: usize = 140;
/// Points kept in the rolling position trail.
pub const TRAIL_CAPACITY: usize = 200;

/// The combined playback state published after every tick or seek.
///
/// Consumers must treat a snapshot as immutable between ticks; it is either
/// fully updated or left entirely intact, never partially patched.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Snapshot {
    pub is_playing: bool,
    pub rate: f64,
    /// Elapsed virtual time in seconds.
    pub offset_s: f64,
    /// Total playable span in seconds.
    pub duration_s: f64,
    /// `offset_s / duration_s`, clamped to `[0, 1]`.
    pub progress: f64,
    pub car: Option<CarSample>,
    pub location: Option<LocationSample>,
    pub position: Option<PositionSample>,
    pub lap: Option<LapSample>,
    pub stint: Option<StintSample>,
    pub pit: Option<PitSample>,
    pub weather: Option<WeatherSample>,
    pub race_control: Option<RaceControlMessage>,
    pub team_radio: Option<TeamRadioSample>,
    pub interval: Option<IntervalSample>,
    /// Fastest recorded lap of the whole session, in seconds.
    pub best_lap_time_s: Option<f64>,
    /// Most recent lap at or before the cursor with a recorded duration.
    pub last_completed_lap_s: Option<f64>,
    /// Rolling speed history, oldest first.
    pub speed_trace: Vec<f64>,
    /// Rolling position history, oldest first.
    pub trail: Vec<TrackPoint>,
}

/// The playback synchronization engine.
///
/// Owns the virtual clock, one cursor per replayable channel, the stint
/// table and the rolling history windows, and publishes a consistent
/// [`Snapshot`] per tick. Construction replaces every series wholesale (the
/// load operation); switching drivers builds a new engine.
///
/// All operations take `&mut self`, so the single-writer discipline the tick
/// loop requires is enforced by the borrow checker: a seek or rate change
/// issued between ticks is fully applied before the next tick can run. The
/// engine never blocks, sleeps or spawns; an external scheduler calls
/// `tick(Instant::now())` at whatever cadence it likes.
pub struct SyncEngine {
    base: DateTime<Utc>,
    clock: PlaybackClock,
    cars: StreamCursor<CarSample>,
    locations: StreamCursor<LocationSample>,
    positions: StreamCursor<PositionSample>,
    laps: StreamCursor<LapSample>,
    pits: StreamCursor<PitSample>,
    weather: StreamCursor<WeatherSample>,
    race_control: StreamCursor<RaceControlMessage>,
    team_radio: StreamCursor<TeamRadioSample>,
    intervals: StreamCursor<IntervalSample>,
    stints: Vec<StintSample>,
    speed_trace: RollingWindow<f64>,
    trail: RollingWindow<TrackPoint>,
    snapshot: Snapshot,
    preset: SessionPreset,
    session: Option<SessionInfo>,
    drivers: Vec<DriverInfo>,
    driver: Option<DriverInfo>,
    track_bounds: TrackBounds,
    track_outline: Vec<TrackPoint>,
}

impl SyncEngine {
    /// Build an engine for an assembled session, positioned at
    /// `resume_offset_s` (clamped to the session span) and playing.
    ///
    /// Fails when no primary channel produced a sample: an empty session
    /// window means there is nothing to replay.
    pub fn new(data: SessionData, resume_offset_s: f64) -> Result<Self, PitwallError> {
        let Some((base, end)) = data.session_window() else {
            return Err(PitwallError::EmptyReplayWindow);
        };
        let duration_s = (end - base).num_milliseconds() as f64 / 1000.;

        let SessionData {
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
        } = data;

        let mut engine = Self {
            base,
            clock: PlaybackClock::new(duration_s),
            cars: StreamCursor::new(cars),
            locations: StreamCursor::new(locations),
            positions: StreamCursor::new(positions),
            laps: StreamCursor::new(laps),
            pits: StreamCursor::new(pits),
            weather: StreamCursor::new(weather),
            race_control: StreamCursor::new(race_control),
            team_radio: StreamCursor::new(team_radio),
            intervals: StreamCursor::new(intervals),
            stints,
            speed_trace: RollingWindow::new(SPEED_TRACE_CAPACITY),
            trail: RollingWindow::new(TRAIL_CAPACITY),
            snapshot: Snapshot {
                best_lap_time_s: best_lap_time,
                duration_s,
                ..Snapshot::default()
            },
            preset,
            session,
            drivers,
            driver,
            track_bounds,
            track_outline,
        };
        engine.seek_offset(resume_offset_s);
        Ok(engine)
    }

    /// Advance playback to `now` and publish the resulting snapshot.
    ///
    /// Every cursor is advanced every tick, even when only one of them
    /// moves: downstream consumers read one combined view. Reaching the end
    /// of the session while playing loops back to the start.
    pub fn tick(&mut self, now: Instant) -> &Snapshot {
        match self.clock.tick(now) {
            TickOutcome::EndReached => {
                self.restart();
            }
            TickOutcome::Advanced(offset_s) => {
                let instant = self.instant_at(offset_s);
                if self.cars.advance_to(instant) {
                    self.apply_car();
                }
                if self.locations.advance_to(instant) {
                    self.apply_location();
                }
                if self.positions.advance_to(instant) {
                    self.snapshot.position = self.positions.current().cloned();
                }
                if self.laps.advance_to(instant) {
                    self.apply_lap();
                }
                if self.pits.advance_to(instant) {
                    self.snapshot.pit = self.pits.current().cloned();
                }
                if self.weather.advance_to(instant) {
                    self.snapshot.weather = self.weather.current().cloned();
                }
                if self.race_control.advance_to(instant) {
                    self.snapshot.race_control = self.race_control.current().cloned();
                }
                if self.team_radio.advance_to(instant) {
                    self.snapshot.team_radio = self.team_radio.current().cloned();
                }
                if self.intervals.advance_to(instant) {
                    self.snapshot.interval = self.intervals.current().cloned();
                }
                self.refresh_transport();
            }
        }
        &self.snapshot
    }

    /// Seek to a fraction of the session, clamped to `[0, 1]`.
    pub fn seek(&mut self, progress: f64) {
        let clamped = if progress.is_finite() {
            progress.clamp(0., 1.)
        } else {
            0.
        };
        self.seek_offset(self.clock.duration() * clamped);
    }

    /// Seek to an absolute virtual offset, clamped to the session span.
    ///
    /// Every cursor is repositioned through a binary search — backward
    /// motion never scans — and the rolling windows and derived fields are
    /// rebuilt from scratch.
    pub fn seek_offset(&mut self, offset_s: f64) {
        let offset_s = self.clock.seek_to(offset_s);
        let instant = self.instant_at(offset_s);
        debug!("seek to {offset_s:.3}s");
        self.cars.seek_to(instant);
        self.locations.seek_to(instant);
        self.positions.seek_to(instant);
        self.laps.seek_to(instant);
        self.pits.seek_to(instant);
        self.weather.seek_to(instant);
        self.race_control.seek_to(instant);
        self.team_radio.seek_to(instant);
        self.intervals.seek_to(instant);
        self.rebuild_snapshot();
    }

    pub fn restart(&mut self) {
        self.seek_offset(0.);
    }

    pub fn toggle_play(&mut self) {
        self.clock.toggle();
        self.refresh_transport();
    }

    pub fn pause(&mut self) {
        self.clock.pause();
        self.refresh_transport();
    }

    pub fn resume(&mut self) {
        self.clock.resume();
        self.refresh_transport();
    }

    /// Change the playback rate. Invalid rates are rejected and the current
    /// rate kept.
    pub fn set_rate(&mut self, rate: f64) {
        if !self.clock.set_rate(rate) {
            warn!("ignoring invalid playback rate {rate}");
        }
        self.refresh_transport();
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn preset(&self) -> &SessionPreset {
        &self.preset
    }

    pub fn session(&self) -> Option<&SessionInfo> {
        self.session.as_ref()
    }

    pub fn drivers(&self) -> &[DriverInfo] {
        &self.drivers
    }

    pub fn driver(&self) -> Option<&DriverInfo> {
        self.driver.as_ref()
    }

    pub fn track_bounds(&self) -> TrackBounds {
        self.track_bounds
    }

    pub fn track_outline(&self) -> &[TrackPoint] {
        &self.track_outline
    }

    fn instant_at(&self, offset_s: f64) -> DateTime<Utc> {
        self.base + TimeDelta::milliseconds((offset_s * 1000.).round() as i64)
    }

    fn apply_car(&mut self) {
        if let Some(sample) = self.cars.current() {
            self.speed_trace.push(sample.speed);
            self.snapshot.car = Some(sample.clone());
            self.snapshot.speed_trace = self.speed_trace.to_vec();
        }
    }

    fn apply_location(&mut self) {
        if let Some(sample) = self.locations.current() {
            self.trail.push(TrackPoint {
                x: sample.x,
                y: sample.y,
            });
            self.snapshot.location = Some(sample.clone());
            self.snapshot.trail = self.trail.to_vec();
        }
    }

    fn apply_lap(&mut self) {
        let lap = self.laps.current().cloned();
        self.snapshot.last_completed_lap_s =
            last_completed_lap(self.laps.samples(), self.laps.index());
        self.snapshot.stint =
            active_stint(&self.stints, lap.as_ref().map(|l| l.lap_number)).cloned();
        self.snapshot.lap = lap;
    }

    fn rebuild_snapshot(&mut self) {
        self.speed_trace
            .rebuild_from(self.cars.samples(), self.cars.index(), |s| s.speed);
        self.trail
            .rebuild_from(self.locations.samples(), self.locations.index(), |s| {
                TrackPoint { x: s.x, y: s.y }
            });

        self.snapshot.car = self.cars.current().cloned();
        self.snapshot.location = self.locations.current().cloned();
        self.snapshot.position = self.positions.current().cloned();
        self.snapshot.pit = self.pits.current().cloned();
        self.snapshot.weather = self.weather.current().cloned();
        self.snapshot.race_control = self.race_control.current().cloned();
        self.snapshot.team_radio = self.team_radio.current().cloned();
        self.snapshot.interval = self.intervals.current().cloned();
        self.apply_lap();

        self.snapshot.speed_trace = self.speed_trace.to_vec();
        self.snapshot.trail = self.trail.to_vec();
        self.refresh_transport();
    }

    fn refresh_transport(&mut self) {
        self.snapshot.is_playing = self.clock.is_playing();
        self.snapshot.rate = self.clock.rate();
        self.snapshot.offset_s = self.clock.offset();
        self.snapshot.duration_s = self.clock.duration();
        self.snapshot.progress = self.clock.progress();
    }
}

/// Most recent lap at or before `index` with a recorded duration. Laps
/// without one (in progress, invalidated) are skipped, never read as zero.
fn last_completed_lap(laps: &[LapSample], index: Option<usize>) -> Option<f64> {
    let index = index?;
    laps.get(..=index)?.iter().rev().find_map(|l| l.lap_duration)
}

/// The stint whose lap range contains `lap_number`. An open-ended stint
/// matches every lap from its start onward.
fn active_stint(stints: &[StintSample], lap_number: Option<i32>) -> Option<&StintSample> {
    let lap = lap_number?;
    stints
        .iter()
        .find(|s| lap >= s.lap_start && s.lap_end.is_none_or(|end| lap <= end))
}
