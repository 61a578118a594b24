//! Time axis
//!
//! Maps instants onto a horizontal pixel axis. The axis spans the tasks
//! with one hour of lead and two hours of trail, at a density set by the
//! view mode and zoom level.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::{Deserialize, Serialize};

const MS_PER_HOUR: i64 = 3_600_000;

pub const MIN_ZOOM: f64 = 0.25;
pub const MAX_ZOOM: f64 = 4.0;
pub const ZOOM_STEP: f64 = 0.25;

/// Clamps a zoom level into the supported range
///
/// Non-finite input falls back to 1.0.
pub fn clamp_zoom(zoom: f64) -> f64 {
    if zoom.is_finite() {
        zoom.clamp(MIN_ZOOM, MAX_ZOOM)
    } else {
        1.0
    }
}

pub fn zoom_in(zoom: f64) -> f64 {
    clamp_zoom(zoom + ZOOM_STEP)
}

pub fn zoom_out(zoom: f64) -> f64 {
    clamp_zoom(zoom - ZOOM_STEP)
}

/// Time granularity of the chart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    Hour,
    #[default]
    Day,
    Week,
}

impl ViewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ViewMode::Hour => "hour",
            ViewMode::Day => "day",
            ViewMode::Week => "week",
        }
    }

    /// Pixels per hour at zoom 1.0
    pub fn base_pixels_per_hour(&self) -> f64 {
        match self {
            ViewMode::Hour => 100.0,
            ViewMode::Day => 30.0,
            ViewMode::Week => 10.0,
        }
    }

    /// Spacing of the time grid
    pub fn tick_step(&self) -> Duration {
        match self {
            ViewMode::Hour | ViewMode::Day => Duration::minutes(30),
            ViewMode::Week => Duration::hours(24),
        }
    }

    pub fn next(&self) -> Self {
        match self {
            ViewMode::Hour => ViewMode::Day,
            ViewMode::Day => ViewMode::Week,
            ViewMode::Week => ViewMode::Hour,
        }
    }
}

impl fmt::Display for ViewMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ViewMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "hour" | "h" => Ok(ViewMode::Hour),
            "day" | "d" => Ok(ViewMode::Day),
            "week" | "w" => Ok(ViewMode::Week),
            other => Err(format!("unknown view '{}' (expected hour, day or week)", other)),
        }
    }
}

/// Horizontal placement of a bar
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Span {
    pub left: f64,
    pub width: f64,
}

impl Span {
    pub fn right(&self) -> f64 {
        self.left + self.width
    }
}

/// A grid line on the time axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tick {
    pub at: DateTime<Utc>,
    pub x: f64,
    /// True on whole hours (drawn stronger)
    pub on_hour: bool,
}

/// Pixel scale fitted to a set of tasks
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeScale {
    min_ms: i64,
    max_ms: i64,
    pixels_per_ms: f64,
    total_width: f64,
}

impl TimeScale {
    pub const LEAD: i64 = MS_PER_HOUR;
    pub const TRAIL: i64 = 2 * MS_PER_HOUR;
    pub const MIN_WIDTH: f64 = 1000.0;

    /// Fits a scale around `(start, end)` spans
    ///
    /// Returns `None` for an empty set, since there is no range to bound.
    pub fn fit<I>(spans: I, view: ViewMode, zoom: f64) -> Option<Self>
    where
        I: IntoIterator<Item = (DateTime<Utc>, DateTime<Utc>)>,
    {
        let mut bounds: Option<(i64, i64)> = None;
        for (start, end) in spans {
            let (a, b) = (start.timestamp_millis(), end.timestamp_millis());
            let (lo, hi) = (a.min(b), a.max(b));
            bounds = Some(match bounds {
                Some((min, max)) => (min.min(lo), max.max(hi)),
                None => (lo, hi),
            });
        }
        let (min, max) = bounds?;

        let min_ms = min - Self::LEAD;
        let max_ms = max + Self::TRAIL;
        let pixels_per_ms = view.base_pixels_per_hour() * clamp_zoom(zoom) / MS_PER_HOUR as f64;
        let total_width = ((max_ms - min_ms) as f64 * pixels_per_ms).max(Self::MIN_WIDTH);

        Some(Self {
            min_ms,
            max_ms,
            pixels_per_ms,
            total_width,
        })
    }

    /// Scale with an explicit origin and density
    #[cfg(test)]
    pub(crate) fn with_density(origin: DateTime<Utc>, pixels_per_ms: f64) -> Self {
        let min_ms = origin.timestamp_millis();
        Self {
            min_ms,
            max_ms: min_ms + (Self::MIN_WIDTH / pixels_per_ms) as i64,
            pixels_per_ms,
            total_width: Self::MIN_WIDTH,
        }
    }

    pub fn pixels_per_ms(&self) -> f64 {
        self.pixels_per_ms
    }

    pub fn total_width(&self) -> f64 {
        self.total_width
    }

    pub fn min_time(&self) -> DateTime<Utc> {
        from_millis(self.min_ms)
    }

    pub fn max_time(&self) -> DateTime<Utc> {
        from_millis(self.max_ms)
    }

    /// Offset of an instant from the axis origin
    pub fn x_of(&self, at: DateTime<Utc>) -> f64 {
        (at.timestamp_millis() - self.min_ms) as f64 * self.pixels_per_ms
    }

    pub fn span(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Span {
        Span {
            left: self.x_of(start),
            width: (end.timestamp_millis() - start.timestamp_millis()) as f64 * self.pixels_per_ms,
        }
    }

    /// Time covered by a horizontal pixel delta
    pub fn duration_for(&self, dx: f64) -> Duration {
        Duration::milliseconds((dx / self.pixels_per_ms).round() as i64)
    }

    /// Grid ticks from the origin's hour up to the axis end
    pub fn ticks(&self, view: ViewMode) -> Vec<Tick> {
        let step = view.tick_step().num_milliseconds();
        let mut at = self.min_ms - self.min_ms.rem_euclid(MS_PER_HOUR);
        let mut ticks = Vec::new();

        while at <= self.max_ms {
            let x = (at - self.min_ms) as f64 * self.pixels_per_ms;
            if x >= 0.0 {
                ticks.push(Tick {
                    at: from_millis(at),
                    x,
                    on_hour: at.rem_euclid(MS_PER_HOUR) == 0,
                });
            }
            at += step;
        }

        ticks
    }
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn t(minutes: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 3, 8, 0, 0).unwrap() + Duration::minutes(minutes)
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn empty_input_has_no_scale() {
        let spans: Vec<(DateTime<Utc>, DateTime<Utc>)> = Vec::new();
        assert!(TimeScale::fit(spans, ViewMode::Day, 1.0).is_none());
    }

    #[test]
    fn fit_pads_one_hour_before_two_after() {
        let scale = TimeScale::fit([(t(0), t(60))], ViewMode::Hour, 1.0).unwrap();
        assert_eq!(scale.min_time(), t(-60));
        assert_eq!(scale.max_time(), t(180));
        // 4 hours at 100 px/h is under the floor
        assert_eq!(scale.total_width(), TimeScale::MIN_WIDTH);
        assert!(approx(scale.x_of(t(0)), 100.0));
    }

    #[test]
    fn density_follows_view_and_zoom() {
        let spans = [(t(0), t(24 * 60))];
        let day = TimeScale::fit(spans, ViewMode::Day, 1.0).unwrap();
        let day_zoomed = TimeScale::fit(spans, ViewMode::Day, 2.0).unwrap();
        let week = TimeScale::fit(spans, ViewMode::Week, 1.0).unwrap();

        assert!(approx(day.pixels_per_ms() * 3_600_000.0, 30.0));
        assert!(approx(day_zoomed.pixels_per_ms(), day.pixels_per_ms() * 2.0));
        assert!(approx(week.pixels_per_ms() * 3_600_000.0, 10.0));
        // 24h of tasks plus 3h of padding at 60 px/h
        assert!(approx(day_zoomed.total_width(), 27.0 * 60.0));
    }

    #[test]
    fn pixel_delta_converts_to_time() {
        let scale = TimeScale::with_density(t(0), 0.01);
        assert_eq!(scale.duration_for(50.0), Duration::milliseconds(5000));
        assert_eq!(scale.duration_for(-50.0), Duration::milliseconds(-5000));
    }

    #[test]
    fn ticks_start_on_the_hour() {
        let scale = TimeScale::fit([(t(15), t(75))], ViewMode::Hour, 1.0).unwrap();
        let ticks = scale.ticks(ViewMode::Hour);

        // Origin is 07:15, so the 07:00 tick is skipped
        assert_eq!(ticks[0].at, t(-30));
        assert!(!ticks[0].on_hour);
        assert_eq!(ticks[1].at, t(0));
        assert!(ticks[1].on_hour);
        assert!(ticks.iter().all(|tick| tick.x >= 0.0));
        assert!(ticks.last().unwrap().at <= scale.max_time());
    }

    #[test]
    fn week_ticks_are_daily() {
        let scale = TimeScale::fit([(t(0), t(3 * 24 * 60))], ViewMode::Week, 1.0).unwrap();
        let ticks = scale.ticks(ViewMode::Week);
        for pair in ticks.windows(2) {
            assert_eq!(pair[1].at - pair[0].at, Duration::hours(24));
        }
    }

    #[test]
    fn zoom_is_clamped() {
        assert_eq!(zoom_in(4.0), 4.0);
        assert_eq!(zoom_out(0.25), 0.25);
        assert_eq!(zoom_in(1.0), 1.25);
        assert_eq!(clamp_zoom(f64::NAN), 1.0);
    }

    #[test]
    fn view_mode_parse() {
        assert_eq!("WEEK".parse::<ViewMode>().unwrap(), ViewMode::Week);
        assert!("month".parse::<ViewMode>().is_err());
        assert_eq!(ViewMode::Week.next(), ViewMode::Hour);
    }

    fn view_strategy() -> impl Strategy<Value = ViewMode> {
        prop_oneof![Just(ViewMode::Hour), Just(ViewMode::Day), Just(ViewMode::Week)]
    }

    proptest! {
        #[test]
        fn bars_stay_inside_the_axis(
            tasks in prop::collection::vec((0i64..20_000, 0i64..600), 1..30),
            view in view_strategy(),
            zoom in 0.25f64..4.0,
        ) {
            let spans: Vec<_> = tasks.iter().map(|&(s, d)| (t(s), t(s + d))).collect();
            let scale = TimeScale::fit(spans.iter().copied(), view, zoom).unwrap();

            for (start, end) in spans {
                let span = scale.span(start, end);
                prop_assert!(span.left >= 0.0);
                prop_assert!(span.width >= 0.0);
                prop_assert!(span.right() <= scale.total_width() + 1e-6);
            }
        }

        #[test]
        fn rescaling_preserves_order_and_overlap(
            tasks in prop::collection::vec((0i64..5_000, 1i64..300), 2..20),
            a in (view_strategy(), 0.25f64..4.0),
            b in (view_strategy(), 0.25f64..4.0),
        ) {
            let spans: Vec<_> = tasks.iter().map(|&(s, d)| (t(s), t(s + d))).collect();
            let sa = TimeScale::fit(spans.iter().copied(), a.0, a.1).unwrap();
            let sb = TimeScale::fit(spans.iter().copied(), b.0, b.1).unwrap();

            for &(s1, e1) in &spans {
                for &(s2, e2) in &spans {
                    let before_a = sa.x_of(s1) < sa.x_of(s2);
                    let before_b = sb.x_of(s1) < sb.x_of(s2);
                    prop_assert_eq!(before_a, before_b);

                    let overlap_a = sa.x_of(s1) < sa.x_of(e2) && sa.x_of(s2) < sa.x_of(e1);
                    let overlap_b = sb.x_of(s1) < sb.x_of(e2) && sb.x_of(s2) < sb.x_of(e1);
                    prop_assert_eq!(overlap_a, overlap_b);
                }
            }
        }
    }
}
