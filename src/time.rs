use crate::units::{D_TO_MS, H_TO_MS, J2000_MS, MS_TO_H, S_TO_H, UNIX_EPOCH_JD};

/// Absolute simulation instant, in milliseconds since the unix epoch.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimInstant(pub i64);

impl SimInstant {
    pub const J2000: SimInstant = SimInstant(J2000_MS);

    pub fn from_millis(millis: i64) -> Self {
        Self(millis)
    }

    pub fn from_julian_date(jd: f64) -> Self {
        Self(((jd - UNIX_EPOCH_JD) * D_TO_MS).round() as i64)
    }

    pub fn millis(self) -> i64 {
        self.0
    }

    pub fn julian_date(self) -> f64 {
        self.0 as f64 / D_TO_MS + UNIX_EPOCH_JD
    }

    /// Milliseconds elapsed between the given Julian date and this instant.
    pub fn ms_since_jd(self, jd: f64) -> f64 {
        self.0 as f64 - (jd - UNIX_EPOCH_JD) * D_TO_MS
    }

    pub fn hours_since_j2000(self) -> f64 {
        (self.0 - J2000_MS) as f64 * MS_TO_H
    }

    pub fn offset_hours(self, hours: f64) -> Self {
        Self(self.0 + (hours * H_TO_MS).round() as i64)
    }
}

/// Time source consumed by the scene update.
///
/// Read-only during a traversal. `hdiff` is the simulation delta of the
/// current frame in hours; a zero value means positions do not need to be
/// refreshed.
pub trait TimeFrame {
    /// Current simulation instant.
    fn instant(&self) -> SimInstant;

    /// Simulation time difference in hours.
    fn hdiff(&self) -> f64;

    /// Frame time difference in seconds.
    fn dt(&self) -> f64;

    /// Real time elapsed since the session started, in milliseconds. Drives
    /// visibility crossfades, which are independent of time warp.
    fn session_ms(&self) -> i64;
}

/// Simulation clock with time warp.
#[derive(Clone, Debug)]
pub struct GlobalClock {
    time: SimInstant,
    hdiff: f64,
    dt: f64,
    session_secs: f64,
    pub warp_factor: f64,
    pub time_on: bool,
    /// Fixed frame rate in frames per second, if any.
    pub fixed_rate: Option<f32>,
}

impl GlobalClock {
    pub fn new(time: SimInstant, warp_factor: f64) -> Self {
        Self {
            time,
            hdiff: 0.0,
            dt: 0.0,
            session_secs: 0.0,
            warp_factor,
            time_on: true,
            fixed_rate: None,
        }
    }

    /// Advances the clock by `dt` seconds of real time.
    pub fn update(&mut self, dt: f64) {
        let dt = match self.fixed_rate {
            Some(rate) if rate > 0.0 => 1.0 / rate as f64,
            _ => dt,
        };
        self.dt = dt;
        self.session_secs += dt;

        if self.time_on {
            let hours = dt * self.warp_factor * S_TO_H;
            self.time = self.time.offset_hours(hours);
            self.hdiff = hours;
        } else {
            self.hdiff = 0.0;
        }
    }

    /// Jumps to the given instant without producing a simulation delta.
    pub fn set_time(&mut self, time: SimInstant) {
        self.time = time;
        self.hdiff = 0.0;
    }

    /// Forces a tiny non-zero delta so the next traversal refreshes every
    /// time-dependent node. Follow with [`GlobalClock::settle`].
    pub fn touch(&mut self) {
        self.hdiff = 1e-9;
    }

    pub fn settle(&mut self) {
        self.hdiff = 0.0;
    }

    pub fn is_fixed_rate(&self) -> bool {
        self.fixed_rate.is_some()
    }
}

impl TimeFrame for GlobalClock {
    fn instant(&self) -> SimInstant {
        self.time
    }

    fn hdiff(&self) -> f64 {
        self.hdiff
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn session_ms(&self) -> i64 {
        (self.session_secs * 1000.0) as i64
    }
}

/// A frozen time frame, useful for deterministic updates.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedTime {
    pub instant: SimInstant,
    pub hdiff: f64,
    pub dt: f64,
    pub session_ms: i64,
}

impl TimeFrame for FixedTime {
    fn instant(&self) -> SimInstant {
        self.instant
    }

    fn hdiff(&self) -> f64 {
        self.hdiff
    }

    fn dt(&self) -> f64 {
        self.dt
    }

    fn session_ms(&self) -> i64 {
        self.session_ms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn julian_date_of_j2000() {
        assert_eq!(SimInstant::J2000.julian_date(), 2_451_545.0);
        assert_eq!(SimInstant::from_julian_date(2_451_545.0), SimInstant::J2000);
    }

    #[test]
    fn clock_applies_warp() {
        let mut clock = GlobalClock::new(SimInstant::J2000, 3600.0);
        clock.update(2.0);
        assert_eq!(clock.hdiff(), 2.0);
        assert_eq!(clock.instant().millis() - J2000_MS, 7_200_000);
        assert!((clock.instant().hours_since_j2000() - 2.0).abs() < 1e-12);
        assert_eq!(clock.session_ms(), 2000);
    }

    #[test]
    fn paused_clock_has_no_delta() {
        let mut clock = GlobalClock::new(SimInstant::J2000, 3600.0);
        clock.time_on = false;
        clock.update(1.0);
        assert_eq!(clock.hdiff(), 0.0);
        assert_eq!(clock.instant(), SimInstant::J2000);
        assert_eq!(clock.session_ms(), 1000);
    }

    #[test]
    fn touch_then_settle() {
        let mut clock = GlobalClock::new(SimInstant::J2000, 1.0);
        clock.touch();
        assert!(clock.hdiff() != 0.0);
        clock.settle();
        assert_eq!(clock.hdiff(), 0.0);
    }
}
