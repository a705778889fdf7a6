use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};

/// A discrete position on the simulation clock.
///
/// Time is counted in ticks, grouped into frames: one frame represents one
/// simulated second at simulation speed 1, and the fixed `ticks_per_frame`
/// resolution decides how many ticks make up a frame. Advancing past the end
/// of a frame carries into the next one, so the tick component always stays
/// in `[0, ticks_per_frame)`.
///
/// Two times order by frame first, then by tick within the frame. The
/// resolution never participates in ordering, equality, or hashing - it is
/// carried along so that conversions between seconds and ticks stay local to
/// the value. Comparing times built with different resolutions is a logical
/// error the type does not attempt to detect.
#[derive(Clone, Copy, Debug)]
pub struct SimTime {
    frame: u64,
    tick: u32,
    ticks_per_frame: u32,
}

impl SimTime {
    /// Construct a time at frame 0, tick 0 with the given resolution.
    ///
    /// # Panics
    ///
    /// Panics if `ticks_per_frame` is zero.
    pub fn new(ticks_per_frame: u32) -> Self {
        Self::at(ticks_per_frame, 0, 0)
    }

    /// Construct a time at an explicit frame and tick.
    ///
    /// # Panics
    ///
    /// Panics if `ticks_per_frame` is zero or if `tick` is outside
    /// `[0, ticks_per_frame)`.
    pub fn at(ticks_per_frame: u32, frame: u64, tick: u32) -> Self {
        assert!(ticks_per_frame > 0, "ticks_per_frame cannot be zero");
        assert!(
            tick < ticks_per_frame,
            "tick {tick} is outside the frame resolution {ticks_per_frame}"
        );
        Self {
            frame,
            tick,
            ticks_per_frame,
        }
    }

    /// The frame component of this time.
    pub fn frame(&self) -> u64 {
        self.frame
    }

    /// The tick component of this time, always less than [`ticks_per_frame()`].
    ///
    /// [`ticks_per_frame()`]: SimTime::ticks_per_frame
    pub fn tick(&self) -> u32 {
        self.tick
    }

    /// The fixed number of ticks making up one frame.
    pub fn ticks_per_frame(&self) -> u32 {
        self.ticks_per_frame
    }

    /// Duration of a single tick in simulated seconds, for converting tick
    /// counts back into time spans.
    pub fn tick_length(&self) -> f64 {
        1.0 / f64::from(self.ticks_per_frame)
    }

    /// Move this time forward by the given number of ticks, carrying whole
    /// frames out of the tick component. Advancing by 0 is a no-op.
    pub fn advance(&mut self, tick_count: u64) {
        let ticks_per_frame = u64::from(self.ticks_per_frame);
        let total = u64::from(self.tick) + tick_count;
        self.frame += total / ticks_per_frame;
        // the remainder is less than ticks_per_frame, so it fits back in u32
        self.tick = (total % ticks_per_frame) as u32;
    }

    /// Move this time forward by at least the given number of simulated
    /// seconds, rounded up to whole ticks. Non-positive amounts advance
    /// nothing.
    pub fn advance_secs(&mut self, seconds: f64) {
        self.advance(ticks_for(self.ticks_per_frame, seconds));
    }
}

/// Smallest whole number of ticks covering `seconds` at the given resolution.
pub(crate) fn ticks_for(ticks_per_frame: u32, seconds: f64) -> u64 {
    let ticks = (f64::from(ticks_per_frame) * seconds).ceil();
    if ticks.is_sign_negative() {
        0
    } else {
        ticks as u64
    }
}

impl PartialEq for SimTime {
    fn eq(&self, other: &Self) -> bool {
        self.frame == other.frame && self.tick == other.tick
    }
}

impl Eq for SimTime {}

impl Hash for SimTime {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.frame.hash(state);
        self.tick.hash(state);
    }
}

impl PartialOrd for SimTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SimTime {
    fn cmp(&self, other: &Self) -> Ordering {
        self.frame
            .cmp(&other.frame)
            .then_with(|| self.tick.cmp(&other.tick))
    }
}

impl Display for SimTime {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        write!(f, "{}:{}/{}", self.frame, self.tick, self.ticks_per_frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_ticks_carry_into_frame() {
        let mut time = SimTime::new(4);
        for _ in 0..4 {
            time.advance(1);
        }
        assert_eq!(time.frame(), 1);
        assert_eq!(time.tick(), 0);
    }

    #[test]
    fn bulk_advance_carries_whole_frames() {
        let mut time = SimTime::new(4);
        time.advance(8);
        assert_eq!(time.frame(), 2);
        assert_eq!(time.tick(), 0);

        time.advance(7);
        assert_eq!(time.frame(), 3);
        assert_eq!(time.tick(), 3);
    }

    #[test]
    fn advance_zero_is_a_no_op() {
        let mut time = SimTime::at(4, 2, 3);
        time.advance(0);
        assert_eq!(time, SimTime::at(4, 2, 3));
    }

    #[test]
    fn seconds_round_up_to_whole_ticks() {
        let mut time = SimTime::new(4);
        time.advance_secs(0.1);
        assert_eq!(time, SimTime::at(4, 0, 1));

        time.advance_secs(1.0);
        assert_eq!(time, SimTime::at(4, 1, 1));

        time.advance_secs(-3.0);
        assert_eq!(time, SimTime::at(4, 1, 1));
    }

    #[test]
    fn ordering_is_frame_then_tick() {
        let early = SimTime::at(4, 0, 3);
        let late = SimTime::at(4, 1, 0);
        assert!(early < late);
        assert!(late > early);
        assert!(SimTime::at(4, 1, 1) < SimTime::at(4, 1, 2));
        assert_eq!(SimTime::at(4, 1, 1), SimTime::at(4, 1, 1));
    }

    #[test]
    fn tick_length_is_frame_fraction() {
        assert_eq!(SimTime::new(4).tick_length(), 0.25);
        assert_eq!(SimTime::new(10).tick_length(), 0.1);
    }

    #[test]
    fn renders_frame_tick_resolution() {
        assert_eq!(SimTime::at(4, 2, 3).to_string(), "2:3/4");
    }

    #[test]
    #[should_panic(expected = "ticks_per_frame cannot be zero")]
    fn zero_resolution_is_rejected() {
        SimTime::new(0);
    }

    #[test]
    #[should_panic(expected = "outside the frame resolution")]
    fn out_of_range_tick_is_rejected() {
        SimTime::at(4, 0, 4);
    }
}
