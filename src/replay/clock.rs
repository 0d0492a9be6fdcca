use std::time::Instant;

/// Default playback rate.
pub const DEFAULT_PLAYBACK_RATE: f64 = 1.35;

/// Result of one clock tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TickOutcome {
    /// Playback continues; the contained value is the bounded virtual offset
    /// in seconds.
    Advanced(f64),
    /// The virtual clock reached the end of the session while playing. The
    /// caller decides what a restart means (the engine seeks back to zero).
    EndReached,
}

/// The virtual session clock.
///
/// One continuous virtual offset is shared by the Playing and Paused modes;
/// each tick converts the real time elapsed since the previous tick into
/// virtual time through the playback rate. Keeping "real time since last
/// tick" separate from the rate lets scrubbing and variable-speed replay
/// share the clock without accumulating drift from fixed-step assumptions.
#[derive(Debug, Clone)]
pub struct PlaybackClock {
    duration_s: f64,
    offset_s: f64,
    rate: f64,
    playing: bool,
    last_tick: Option<Instant>,
}

impl PlaybackClock {
    pub fn new(duration_s: f64) -> Self {
        Self {
            duration_s: duration_s.max(0.),
            offset_s: 0.,
            rate: DEFAULT_PLAYBACK_RATE,
            playing: true,
            last_tick: None,
        }
    }

    /// Advance the virtual offset from a wall-clock reading.
    ///
    /// The first tick after construction, a seek or a resume only records
    /// `now`; there is no previous reading to take a delta from. Ticking is
    /// expected to continue while paused (the delta is simply not applied),
    /// which keeps the next resume free of a stale gap.
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        if let Some(last_tick) = self.last_tick {
            if self.playing {
                self.offset_s += now.duration_since(last_tick).as_secs_f64() * self.rate;
            }
        }
        self.last_tick = Some(now);

        if self.offset_s >= self.duration_s {
            if self.playing {
                return TickOutcome::EndReached;
            }
            self.offset_s = self.duration_s;
        }
        TickOutcome::Advanced(self.offset_s)
    }

    /// Change the playback rate, effective from the next tick. Virtual time
    /// already elapsed is never rescaled. Non-positive or non-finite rates
    /// are rejected and the previous rate kept.
    pub fn set_rate(&mut self, rate: f64) -> bool {
        if !rate.is_finite() || rate <= 0. {
            return false;
        }
        self.rate = rate;
        true
    }

    /// Jump the virtual offset, clamped to the session span. Clears the last
    /// tick reading so the jump does not bleed into the next delta. Returns
    /// the clamped offset.
    pub fn seek_to(&mut self, offset_s: f64) -> f64 {
        self.offset_s = if offset_s.is_finite() {
            offset_s.clamp(0., self.duration_s)
        } else {
            0.
        };
        self.last_tick = None;
        self.offset_s
    }

    pub fn pause(&mut self) {
        self.playing = false;
    }

    /// A caller may have stopped ticking while paused; the stale reading is
    /// dropped so the paused span is not replayed.
    pub fn resume(&mut self) {
        self.playing = true;
        self.last_tick = None;
    }

    pub fn toggle(&mut self) {
        if self.playing {
            self.pause();
        } else {
            self.resume();
        }
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn offset(&self) -> f64 {
        self.offset_s
    }

    pub fn duration(&self) -> f64 {
        self.duration_s
    }

    pub fn progress(&self) -> f64 {
        if self.duration_s > 0. {
            (self.offset_s / self.duration_s).clamp(0., 1.)
        } else {
            0.
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ticked_clock(duration_s: f64, rate: f64) -> (PlaybackClock, Instant) {
        let mut clock = PlaybackClock::new(duration_s);
        assert!(clock.set_rate(rate));
        let start = Instant::now();
        clock.tick(start);
        (clock, start)
    }

    #[test]
    fn test_first_tick_applies_no_delta() {
        let mut clock = PlaybackClock::new(60.);
        let start = Instant::now();
        assert_eq!(clock.tick(start), TickOutcome::Advanced(0.));
    }

    #[test]
    fn test_tick_scales_real_time_by_rate() {
        let (mut clock, start) = ticked_clock(60., 2.);
        clock.tick(start + Duration::from_secs(1));
        assert_eq!(clock.offset(), 2.);
        clock.tick(start + Duration::from_secs(3));
        assert_eq!(clock.offset(), 6.);
    }

    #[test]
    fn test_rate_change_is_not_retroactive() {
        let (mut clock, start) = ticked_clock(60., 1.);
        clock.tick(start + Duration::from_secs(10));
        assert_eq!(clock.offset(), 10.);
        assert!(clock.set_rate(3.));
        clock.tick(start + Duration::from_secs(11));
        assert_eq!(clock.offset(), 13.);
    }

    #[test]
    fn test_set_rate_rejects_invalid_values() {
        let mut clock = PlaybackClock::new(60.);
        assert!(clock.set_rate(2.));
        assert!(!clock.set_rate(0.));
        assert!(!clock.set_rate(-1.5));
        assert!(!clock.set_rate(f64::NAN));
        assert!(!clock.set_rate(f64::INFINITY));
        assert_eq!(clock.rate(), 2.);
    }

    #[test]
    fn test_pause_freezes_virtual_time() {
        let (mut clock, start) = ticked_clock(60., 1.);
        clock.tick(start + Duration::from_secs(5));
        clock.pause();
        clock.tick(start + Duration::from_secs(25));
        assert_eq!(clock.offset(), 5.);
        assert!(!clock.is_playing());
    }

    #[test]
    fn test_resume_drops_stale_tick_reading() {
        let (mut clock, start) = ticked_clock(60., 1.);
        clock.tick(start + Duration::from_secs(5));
        clock.pause();
        // the caller stops ticking entirely while paused
        clock.resume();
        clock.tick(start + Duration::from_secs(65));
        // no delta on the first tick after the resume
        assert_eq!(clock.offset(), 5.);
        clock.tick(start + Duration::from_secs(66));
        assert_eq!(clock.offset(), 6.);
    }

    #[test]
    fn test_seek_clamps_and_clears_last_tick() {
        let (mut clock, start) = ticked_clock(60., 1.);
        assert_eq!(clock.seek_to(-10.), 0.);
        assert_eq!(clock.seek_to(120.), 60.);
        assert_eq!(clock.seek_to(30.), 30.);
        // the tick right after a seek must not turn the seek gap into a delta
        clock.tick(start + Duration::from_secs(500));
        assert_eq!(clock.offset(), 30.);
    }

    #[test]
    fn test_end_reached_while_playing() {
        let (mut clock, start) = ticked_clock(60., 1.);
        assert_eq!(
            clock.tick(start + Duration::from_secs(59)),
            TickOutcome::Advanced(59.)
        );
        assert_eq!(
            clock.tick(start + Duration::from_secs(61)),
            TickOutcome::EndReached
        );
    }

    #[test]
    fn test_end_clamps_while_paused() {
        let mut clock = PlaybackClock::new(60.);
        clock.seek_to(60.);
        clock.pause();
        let start = Instant::now();
        clock.tick(start);
        assert_eq!(
            clock.tick(start + Duration::from_secs(5)),
            TickOutcome::Advanced(60.)
        );
        assert_eq!(clock.offset(), 60.);
        assert_eq!(clock.progress(), 1.);
    }

    #[test]
    fn test_sixty_second_session_at_double_rate_wraps_at_step_thirty() {
        // 60 s session, rate 2.0, one simulated tick per real second
        let (mut clock, start) = ticked_clock(60., 2.);
        for step in 1..30 {
            let outcome = clock.tick(start + Duration::from_secs(step));
            assert_eq!(
                outcome,
                TickOutcome::Advanced(2. * step as f64),
                "unexpected outcome at step {step}"
            );
        }
        // 2.0 * 30 = 60: the clock hits the end exactly at step 30
        assert_eq!(
            clock.tick(start + Duration::from_secs(30)),
            TickOutcome::EndReached
        );
        assert_eq!(clock.offset(), 60.);
    }

    #[test]
    fn test_progress_is_zero_for_empty_session() {
        let clock = PlaybackClock::new(0.);
        assert_eq!(clock.progress(), 0.);
    }
}
