//! Derived cycle metrics for the dashboard.
//!
//! Everything in here is pure: the caller supplies the records, the stored
//! profile and the current date, and gets the same answer back every time.
//! Record order never matters; each function sorts what it needs.

use chrono::{Duration, NaiveDate};
use serde::Serialize;

use crate::models::{CycleRecord, FlowIntensity, PainLevel, UserProfile, DEFAULT_CYCLE_LENGTH};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Lateness beyond this many days asks for a check-up.
pub const LATE_CHECKUP_DAYS: i64 = 7;

/// Allowed spread between the two most recent cycle gaps before flagging irregularity.
pub const IRREGULAR_GAP_SPREAD: i64 = 5;

/// Whole days covered by `delta`, rounded toward positive infinity.
pub fn ceil_days(delta: Duration) -> i64 {
    let millis = delta.num_milliseconds();
    millis.div_euclid(MILLIS_PER_DAY) + i64::from(millis.rem_euclid(MILLIS_PER_DAY) != 0)
}

/// Signed day count from `from` to `to`.
pub fn days_between(from: NaiveDate, to: NaiveDate) -> i64 {
    ceil_days(to - from)
}

/// `numerator / denominator` rounded half up. Numerator must be non-negative
/// and denominator positive.
pub fn round_half_up_div(numerator: i64, denominator: i64) -> i64 {
    debug_assert!(numerator >= 0 && denominator > 0);
    (2 * numerator + denominator) / (2 * denominator)
}

fn sorted_by_start(records: &[CycleRecord]) -> Vec<&CycleRecord> {
    let mut sorted: Vec<&CycleRecord> = records.iter().collect();
    sorted.sort_by_key(|r| (r.start_date, r.created_at));
    sorted
}

/// Record with the latest start date; same-day ties go to the one logged last.
pub fn most_recent(records: &[CycleRecord]) -> Option<&CycleRecord> {
    records.iter().max_by_key(|r| (r.start_date, r.created_at))
}

/// Average spacing between logged cycle starts.
///
/// With fewer than two records there is nothing to measure and `fallback`
/// (the stored profile average) is returned. Records sharing a start date
/// still count toward the divisor.
pub fn average_cycle_length(records: &[CycleRecord], fallback: i32) -> i32 {
    if records.len() < 2 {
        return fallback;
    }

    let sorted = sorted_by_start(records);
    let (first, last) = (sorted[0], sorted[sorted.len() - 1]);
    let span = days_between(first.start_date, last.start_date);
    let average = round_half_up_div(span, (records.len() - 1) as i64);

    // every start on the same day measures nothing
    if average <= 0 {
        fallback
    } else {
        average as i32
    }
}

/// Average the server stores on the profile after each log mutation: the
/// mean recorded cycle length of non-missed records, or the default when
/// there are fewer than two of them.
pub fn profile_average_cycle_length(records: &[CycleRecord]) -> i32 {
    let lengths: Vec<i64> = records
        .iter()
        .filter(|r| !r.is_missed)
        .map(|r| match r.cycle_length {
            0 => i64::from(DEFAULT_CYCLE_LENGTH),
            n => i64::from(n),
        })
        .collect();

    if lengths.len() < 2 {
        return DEFAULT_CYCLE_LENGTH;
    }

    round_half_up_div(lengths.iter().sum(), lengths.len() as i64) as i32
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum NextPeriod {
    NoData,
    #[serde(rename_all = "camelCase")]
    DueToday { expected_date: NaiveDate },
    #[serde(rename_all = "camelCase")]
    Late { days: i64, expected_date: NaiveDate },
    #[serde(rename_all = "camelCase")]
    DueIn { days: i64, expected_date: NaiveDate },
}

impl NextPeriod {
    pub fn text(&self) -> String {
        match self {
            NextPeriod::NoData => "No data yet".to_string(),
            NextPeriod::DueToday { .. } => "Due today".to_string(),
            NextPeriod::Late { days, .. } => format!("Late by {days} days"),
            NextPeriod::DueIn { days, .. } => format!("Due in {days} days"),
        }
    }

    pub fn detail(&self) -> String {
        match self {
            NextPeriod::NoData => "Log your first period".to_string(),
            NextPeriod::DueToday { .. } => "Get ready!".to_string(),
            NextPeriod::Late { .. } => "Cycle might be irregular".to_string(),
            NextPeriod::DueIn { expected_date, .. } => {
                format!("Predicted: {}", expected_date.format("%Y-%m-%d"))
            }
        }
    }

    pub fn days_late(&self) -> Option<i64> {
        match self {
            NextPeriod::Late { days, .. } => Some(*days),
            _ => None,
        }
    }
}

/// Predict the next period from the latest record and the average cycle length.
pub fn predict_next_period(
    most_recent: Option<&CycleRecord>,
    average_cycle_length: i32,
    today: NaiveDate,
) -> NextPeriod {
    let Some(record) = most_recent else {
        return NextPeriod::NoData;
    };

    let expected_date = record.start_date + Duration::days(i64::from(average_cycle_length));
    let diff = days_between(today, expected_date);

    match diff {
        0 => NextPeriod::DueToday { expected_date },
        d if d < 0 => NextPeriod::Late { days: -d, expected_date },
        d => NextPeriod::DueIn { days: d, expected_date },
    }
}

/// Most frequent flow intensity. Ties resolve in Light, Normal, Heavy order;
/// records without flow (missed or pregnant) are not counted.
pub fn typical_flow(records: &[CycleRecord]) -> FlowIntensity {
    let mut best = FlowIntensity::None;
    let mut best_count = 0;

    for flow in FlowIntensity::TALLIED {
        let count = records.iter().filter(|r| r.flow_intensity == flow).count();
        if count > best_count {
            best = flow;
            best_count = count;
        }
    }

    best
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthState {
    #[serde(rename = "No data")]
    NoData,
    #[serde(rename = "Check-up needed")]
    CheckUpNeeded,
    Monitor,
    Irregular,
    Stable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub message: &'static str,
}

impl HealthStatus {
    fn new(status: HealthState, message: &'static str) -> Self {
        Self { status, message }
    }
}

/// Classify overall cycle health. Rules are checked in order and the first
/// match wins, so lateness outranks pain, which outranks irregularity.
pub fn classify_health_status(records: &[CycleRecord], prediction: &NextPeriod) -> HealthStatus {
    if records.is_empty() {
        return HealthStatus::new(HealthState::NoData, "Start logging to track");
    }

    if prediction.days_late().is_some_and(|days| days > LATE_CHECKUP_DAYS) {
        return HealthStatus::new(HealthState::CheckUpNeeded, "Cycle is significantly late");
    }

    if most_recent(records).is_some_and(|r| r.pain_level == PainLevel::High) {
        return HealthStatus::new(HealthState::Monitor, "High pain reported recently");
    }

    if records.len() >= 3 {
        let sorted = sorted_by_start(records);
        let n = sorted.len();
        let latest_gap = days_between(sorted[n - 2].start_date, sorted[n - 1].start_date);
        let previous_gap = days_between(sorted[n - 3].start_date, sorted[n - 2].start_date);
        if (latest_gap - previous_gap).abs() > IRREGULAR_GAP_SPREAD {
            return HealthStatus::new(HealthState::Irregular, "High variation in cycles");
        }
    }

    HealthStatus::new(HealthState::Stable, "Cycle appears healthy")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    pub date: NaiveDate,
    pub cycle: i64,
    pub duration: i32,
}

/// Chronological cycle/duration series. The first point, and any point
/// sharing a start date with its predecessor, shows the average instead.
pub fn cycle_trend(records: &[CycleRecord], average_cycle_length: i32) -> Vec<TrendPoint> {
    let sorted = sorted_by_start(records);

    sorted
        .iter()
        .enumerate()
        .map(|(i, record)| {
            let gap = match i {
                0 => 0,
                _ => days_between(sorted[i - 1].start_date, record.start_date),
            };
            TrendPoint {
                date: record.start_date,
                cycle: if gap == 0 { i64::from(average_cycle_length) } else { gap },
                duration: record.duration,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowCount {
    pub name: FlowIntensity,
    pub value: usize,
}

pub fn flow_distribution(records: &[CycleRecord]) -> Vec<FlowCount> {
    FlowIntensity::TALLIED
        .iter()
        .map(|&flow| FlowCount {
            name: flow,
            value: records
                .iter()
                .filter(|r| !r.is_missed && r.flow_intensity == flow)
                .count(),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NextPeriodSummary {
    #[serde(flatten)]
    pub prediction: NextPeriod,
    pub text: String,
    pub detail: String,
}

impl From<NextPeriod> for NextPeriodSummary {
    fn from(prediction: NextPeriod) -> Self {
        Self {
            text: prediction.text(),
            detail: prediction.detail(),
            prediction,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub average_cycle_length: i32,
    pub next_period: NextPeriodSummary,
    pub typical_flow: FlowIntensity,
    pub health: HealthStatus,
    pub record_count: usize,
    pub trend: Vec<TrendPoint>,
    pub flow_distribution: Vec<FlowCount>,
}

/// Everything the dashboard shows, derived from one snapshot of records.
pub fn compute(records: &[CycleRecord], profile: &UserProfile, today: NaiveDate) -> DashboardMetrics {
    let average = average_cycle_length(records, profile.average_cycle_length);
    let prediction = predict_next_period(most_recent(records), average, today);
    let health = classify_health_status(records, &prediction);

    DashboardMetrics {
        average_cycle_length: average,
        next_period: prediction.into(),
        typical_flow: typical_flow(records),
        health,
        record_count: records.len(),
        trend: cycle_trend(records, average),
        flow_distribution: flow_distribution(records),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewCycleRecord, UserProfile};
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn d(offset: i64) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Duration::days(offset)
    }

    fn record(start: NaiveDate, flow: FlowIntensity, pain: PainLevel) -> CycleRecord {
        let missed = flow == FlowIntensity::None;
        NewCycleRecord {
            start_date: start,
            end_date: start,
            duration: if missed { 0 } else { 5 },
            cycle_length: 28,
            flow_intensity: flow,
            pain_level: pain,
            symptoms: vec![],
            is_missed: missed,
            is_pregnant: false,
            notes: String::new(),
        }
        .into_record(Uuid::new_v4(), Uuid::nil(), Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
    }

    fn at(start: NaiveDate) -> CycleRecord {
        record(start, FlowIntensity::Normal, PainLevel::Low)
    }

    #[test]
    fn ceil_days_rounds_partial_days_up() {
        assert_eq!(ceil_days(Duration::hours(36)), 2);
        assert_eq!(ceil_days(Duration::hours(-36)), -1);
        assert_eq!(ceil_days(Duration::days(3)), 3);
        assert_eq!(ceil_days(Duration::zero()), 0);
    }

    #[test]
    fn round_half_up_rounds_halves_up() {
        assert_eq!(round_half_up_div(57, 2), 29);
        assert_eq!(round_half_up_div(56, 2), 28);
        assert_eq!(round_half_up_div(55, 3), 18);
        assert_eq!(round_half_up_div(0, 4), 0);
    }

    #[test]
    fn single_record_average_is_the_fallback() {
        assert_eq!(average_cycle_length(&[at(d(0))], 31), 31);
        assert_eq!(average_cycle_length(&[], 26), 26);
    }

    #[test]
    fn average_ignores_input_order() {
        let forward = [at(d(0)), at(d(28))];
        let backward = [at(d(28)), at(d(0))];
        assert_eq!(average_cycle_length(&forward, 30), 28);
        assert_eq!(average_cycle_length(&backward, 30), 28);
    }

    #[test]
    fn average_spans_first_to_last_start() {
        let records = [at(d(56)), at(d(0)), at(d(30))];
        assert_eq!(average_cycle_length(&records, 40), 28);
    }

    #[test]
    fn duplicate_start_dates_pull_the_average_down() {
        let records = [at(d(0)), at(d(28)), at(d(28))];
        assert_eq!(average_cycle_length(&records, 30), 14);
    }

    #[test]
    fn all_same_day_starts_fall_back() {
        let records = [at(d(5)), at(d(5))];
        assert_eq!(average_cycle_length(&records, 27), 27);
    }

    #[test]
    fn prediction_without_records_has_no_data() {
        assert_eq!(predict_next_period(None, 28, d(0)), NextPeriod::NoData);
    }

    #[test]
    fn prediction_due_today() {
        let last = at(d(0));
        let prediction = predict_next_period(Some(&last), 28, d(28));
        assert_eq!(prediction, NextPeriod::DueToday { expected_date: d(28) });
        assert_eq!(prediction.text(), "Due today");
    }

    #[test]
    fn prediction_late_by_seven_days() {
        let last = at(d(0));
        let prediction = predict_next_period(Some(&last), 28, d(35));
        assert_eq!(prediction, NextPeriod::Late { days: 7, expected_date: d(28) });
        assert_eq!(prediction.text(), "Late by 7 days");
    }

    #[test]
    fn prediction_due_in_days_carries_the_date() {
        let last = at(d(0));
        let prediction = predict_next_period(Some(&last), 28, d(20));
        assert_eq!(prediction, NextPeriod::DueIn { days: 8, expected_date: d(28) });
        assert_eq!(prediction.detail(), "Predicted: 2024-01-29");
    }

    #[test]
    fn typical_flow_picks_the_mode() {
        let records = [
            record(d(0), FlowIntensity::Light, PainLevel::Low),
            record(d(28), FlowIntensity::Normal, PainLevel::Low),
            record(d(56), FlowIntensity::Normal, PainLevel::Low),
            record(d(84), FlowIntensity::Heavy, PainLevel::Low),
        ];
        assert_eq!(typical_flow(&records), FlowIntensity::Normal);
    }

    #[test]
    fn typical_flow_ties_go_to_the_lighter_flow() {
        let records = [
            record(d(0), FlowIntensity::Heavy, PainLevel::Low),
            record(d(28), FlowIntensity::Light, PainLevel::Low),
        ];
        assert_eq!(typical_flow(&records), FlowIntensity::Light);
    }

    #[test]
    fn typical_flow_skips_missed_records() {
        let records = [record(d(0), FlowIntensity::None, PainLevel::None)];
        assert_eq!(typical_flow(&records), FlowIntensity::None);
        assert_eq!(typical_flow(&[]), FlowIntensity::None);
    }

    #[test]
    fn health_without_records_is_no_data() {
        let status = classify_health_status(&[], &NextPeriod::NoData);
        assert_eq!(status.status, HealthState::NoData);
    }

    #[test]
    fn high_pain_on_time_is_monitor() {
        let records = [record(d(0), FlowIntensity::Normal, PainLevel::High)];
        let prediction = predict_next_period(most_recent(&records), 28, d(10));
        assert_eq!(classify_health_status(&records, &prediction).status, HealthState::Monitor);
    }

    #[test]
    fn lateness_outranks_pain() {
        let records = [record(d(0), FlowIntensity::Normal, PainLevel::High)];
        let prediction = predict_next_period(most_recent(&records), 28, d(38));
        assert_eq!(prediction.days_late(), Some(10));
        assert_eq!(
            classify_health_status(&records, &prediction).status,
            HealthState::CheckUpNeeded
        );
    }

    #[test]
    fn exactly_seven_days_late_is_not_a_checkup() {
        let records = [at(d(0))];
        let prediction = predict_next_period(most_recent(&records), 28, d(35));
        assert_eq!(classify_health_status(&records, &prediction).status, HealthState::Stable);
    }

    #[test]
    fn pain_is_read_from_the_latest_record_only() {
        let records = [
            record(d(0), FlowIntensity::Normal, PainLevel::High),
            record(d(28), FlowIntensity::Normal, PainLevel::Low),
        ];
        let prediction = predict_next_period(most_recent(&records), 28, d(30));
        assert_eq!(classify_health_status(&records, &prediction).status, HealthState::Stable);
    }

    #[test]
    fn diverging_gaps_are_irregular() {
        // gaps of 20 then 35 days
        let records = [at(d(55)), at(d(0)), at(d(20))];
        let prediction = predict_next_period(most_recent(&records), 28, d(60));
        let status = classify_health_status(&records, &prediction);
        assert_eq!(status.status, HealthState::Irregular);
        assert_eq!(status.message, "High variation in cycles");
    }

    #[test]
    fn five_day_spread_is_still_stable() {
        let records = [at(d(0)), at(d(26)), at(d(57))];
        let prediction = predict_next_period(most_recent(&records), 28, d(60));
        assert_eq!(classify_health_status(&records, &prediction).status, HealthState::Stable);
    }

    #[test]
    fn profile_average_uses_non_missed_cycle_lengths() {
        let mut a = at(d(0));
        a.cycle_length = 30;
        let mut b = at(d(30));
        b.cycle_length = 27;
        let missed = record(d(57), FlowIntensity::None, PainLevel::None);

        assert_eq!(profile_average_cycle_length(&[a.clone(), b, missed.clone()]), 29);
        assert_eq!(profile_average_cycle_length(&[a, missed]), DEFAULT_CYCLE_LENGTH);
        assert_eq!(profile_average_cycle_length(&[]), DEFAULT_CYCLE_LENGTH);
    }

    #[test]
    fn trend_uses_average_for_the_first_point() {
        let records = [at(d(30)), at(d(0)), at(d(56))];
        let trend = cycle_trend(&records, 28);
        let cycles: Vec<i64> = trend.iter().map(|p| p.cycle).collect();
        assert_eq!(cycles, vec![28, 30, 26]);
        assert_eq!(trend[0].date, d(0));
    }

    #[test]
    fn flow_distribution_counts_each_category() {
        let records = [
            record(d(0), FlowIntensity::Heavy, PainLevel::Low),
            record(d(28), FlowIntensity::Heavy, PainLevel::Low),
            record(d(56), FlowIntensity::None, PainLevel::None),
        ];
        let counts: Vec<usize> = flow_distribution(&records).iter().map(|c| c.value).collect();
        assert_eq!(counts, vec![0, 0, 2]);
    }

    #[test]
    fn compute_is_repeatable() {
        let records = vec![at(d(0)), at(d(30)), at(d(56))];
        let profile = UserProfile::default();
        let first = compute(&records, &profile, d(70));
        let second = compute(&records, &profile, d(70));

        assert_eq!(first, second);
        assert_eq!(first.average_cycle_length, 28);
        assert_eq!(first.record_count, 3);
        assert_eq!(first.next_period.text, "Due in 14 days");
    }

    #[test]
    fn next_period_serializes_flat() {
        let summary: NextPeriodSummary = NextPeriod::Late { days: 3, expected_date: d(28) }.into();
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["status"], "late");
        assert_eq!(json["days"], 3);
        assert_eq!(json["expectedDate"], "2024-01-29");
        assert_eq!(json["text"], "Late by 3 days");
    }

    #[test]
    fn health_states_serialize_as_display_labels() {
        let labels: Vec<serde_json::Value> = [
            HealthState::NoData,
            HealthState::CheckUpNeeded,
            HealthState::Monitor,
            HealthState::Irregular,
            HealthState::Stable,
        ]
        .iter()
        .map(|state| serde_json::to_value(state).unwrap())
        .collect();
        assert_eq!(
            labels,
            vec!["No data", "Check-up needed", "Monitor", "Irregular", "Stable"]
        );

        let status = classify_health_status(&[], &NextPeriod::NoData);
        let json = serde_json::to_value(status).unwrap();
        assert_eq!(json["status"], "No data");
        assert_eq!(json["message"], status.message);
    }
}
