//! End-to-end tests over full-length recordings.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;

use vivarium_flux::encoder::ReportEncoder;
use vivarium_flux::types::{Axis, Point, SubjectId, Table};
use vivarium_flux::{
    activity_series, load_cohort, process_cohort, ComputeError, DirectorySource, Series,
    SeriesTransformer, TableAdapter, TableFormat, TransformConfig, UndefinedPolicy, View,
};

const FULL_RECORDING: usize = 14 * 1440;

/// Activity peaks during the dark phase (hours 12-23) of every day
fn circadian_table(subjects: &[&str], scale: f64) -> Table {
    let ids = subjects.iter().map(|s| SubjectId::from(*s)).collect();
    let rows = (0..FULL_RECORDING)
        .map(|minute| {
            let hour = (minute % 1440) / 60;
            let base = if hour >= 12 { 40.0 } else { 10.0 };
            (0..subjects.len())
                .map(|i| base * scale * (i + 1) as f64)
                .collect()
        })
        .collect();
    Table::new(ids, rows).unwrap()
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("vivarium-{}-{}", name, std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn two_subject_example() {
    let table = TableAdapter::parse_table(
        r#"[{"A": 10, "B": 20}, {"A": 20, "B": 10}]"#,
        TableFormat::Json,
    )
    .unwrap();

    let series = SeriesTransformer::default()
        .transform(&table, View::Activity)
        .unwrap();

    assert_eq!(
        series,
        Series::new(Axis::Minute, vec![Point::new(0, 0.75), Point::new(1, 0.75)])
    );
}

#[test]
fn smoothing_example() {
    let series = Series::from_values(Axis::Minute, [1.0, 3.0, 5.0]);
    let smoothed = vivarium_flux::smoothing::moving_average(&series, 1);
    assert_eq!(smoothed.values().collect::<Vec<_>>(), vec![1.0, 2.0, 4.0]);
}

#[test]
fn full_recording_periodic_cardinality() {
    let table = circadian_table(&["F1", "F2", "F3"], 1.0);
    let transformer = SeriesTransformer::default();

    let hourly = transformer.transform(&table, View::Hourly).unwrap();
    let daily = transformer.transform(&table, View::Daily).unwrap();

    assert_eq!(hourly.len(), 24);
    assert_eq!(daily.len(), 14);
    assert_eq!(
        daily.points.iter().map(|p| p.index).collect::<Vec<_>>(),
        (1..=14).collect::<Vec<_>>()
    );

    // mean of subjects 1x, 2x, 3x the base level
    assert_eq!(hourly.points[3].value, 20.0);
    assert_eq!(hourly.points[18].value, 80.0);
    assert_eq!(daily.points[0].value, 50.0);
}

#[test]
fn smoothed_activity_tracks_phase_change() {
    let table = circadian_table(&["F1", "F2"], 1.0);
    let series = activity_series(&table, 30);

    assert_eq!(series.len(), FULL_RECORDING);
    // light phase is a quarter of the maximum, dark phase is the maximum
    assert!((series.points[600].value - 0.25).abs() < 1e-12);
    assert!((series.points[720 + 30].value - 1.0).abs() < 1e-12);
    // halfway through the transition window
    let mid = series.points[720 + 14].value;
    assert!(mid > 0.25 && mid < 1.0);
}

#[test]
fn cohort_from_directory() {
    let dir = temp_dir("cohort");
    let write = |name: &str, table: &Table| {
        let records: Vec<serde_json::Value> = table
            .rows()
            .iter()
            .map(|row| {
                let obj: serde_json::Map<String, serde_json::Value> = table
                    .subjects()
                    .iter()
                    .zip(row)
                    .map(|(s, v)| (s.to_string(), serde_json::json!(v)))
                    .collect();
                serde_json::Value::Object(obj)
            })
            .collect();
        fs::write(dir.join(name), serde_json::to_string(&records).unwrap()).unwrap();
    };

    write("Female_Act.json", &circadian_table(&["F1", "F2"], 1.0));
    write("Male_Act.json", &circadian_table(&["M1", "M2", "M3"], 2.0));
    write("Female_Temp.json", &circadian_table(&["F1", "F2"], 0.1));
    write("Male_Temp.json", &circadian_table(&["M1", "M2", "M3"], 0.1));

    let tables = load_cohort(&DirectorySource::new(&dir)).unwrap();
    let report = process_cohort(&tables, &TransformConfig::default()).unwrap();

    assert_eq!(report.activity.female.len(), FULL_RECORDING);
    assert_eq!(report.hourly_activity.male.len(), 24);
    assert_eq!(report.daily_activity.female.len(), 14);
    assert_eq!(report.temperature.male.axis, Axis::Minute);
    assert_eq!(report.subject_totals.len(), 5);
    assert_eq!(report.activity_temperature.len(), 2 * FULL_RECORDING);
    assert_eq!(report.estrus_minutes, vec![1440, 7200, 12960, 18720]);

    let json = ReportEncoder::new()
        .report_to_json(report, &TransformConfig::default())
        .unwrap();
    let payload: serde_json::Value = serde_json::from_str(&json).unwrap();
    assert_eq!(payload["config"]["window"], 30);
    assert_eq!(payload["report"]["subject_totals"][2]["sex"], "male");

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_dataset_skips_processing() {
    let dir = temp_dir("partial");
    fs::write(dir.join("Female_Act.json"), r#"[{"F1": 1}]"#).unwrap();
    fs::write(dir.join("Male_Act.json"), r#"[{"M1": 1}]"#).unwrap();
    fs::write(dir.join("Female_Temp.json"), r#"[{"F1": 37}]"#).unwrap();

    let result = load_cohort(&DirectorySource::new(&dir));
    match result {
        Err(ComputeError::DatasetLoad { dataset, .. }) => assert_eq!(dataset, "male_temperature"),
        other => panic!("expected load failure, got {:?}", other.map(|_| ())),
    }

    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn short_recording_strict_and_lenient() {
    // two days only
    let rows = vec![vec![5.0, 7.0]; 2 * 1440];
    let table = Table::new(vec!["F1".into(), "F2".into()], rows).unwrap();

    let lenient = SeriesTransformer::default();
    let daily = lenient.transform(&table, View::Daily).unwrap();
    assert_eq!(daily.len(), 14);
    assert_eq!(daily.points[1].value, 6.0);
    assert!(daily.points[2..].iter().all(|p| p.value.is_nan()));

    let strict = SeriesTransformer::new(
        TransformConfig::default().with_undefined_policy(UndefinedPolicy::Reject),
    )
    .unwrap();
    assert!(matches!(
        strict.transform(&table, View::Daily),
        Err(ComputeError::UndefinedValue { index: 3, .. })
    ));
    // hourly buckets each still see two days of data
    assert!(strict.transform(&table, View::Hourly).is_ok());
}

#[test]
fn single_missing_reading_leaves_views_defined() {
    let mut records = vec![r#"{"F1": 4, "F2": 5}"#.to_string(); FULL_RECORDING];
    records[1] = r#"{"F1": null, "F2": 5}"#.to_string();
    let table = TableAdapter::parse_table(&records.join("\n"), TableFormat::Ndjson).unwrap();
    assert!(table.row(1).unwrap()[0].is_nan());

    let transformer = SeriesTransformer::new(
        TransformConfig::default().with_undefined_policy(UndefinedPolicy::Reject),
    )
    .unwrap();

    let temperature = transformer.transform(&table, View::Temperature).unwrap();
    assert_eq!(temperature.points[0].value, 4.5);
    assert_eq!(temperature.points[1].value, 5.0);

    let hourly = transformer.transform(&table, View::Hourly).unwrap();
    let expected = (14.0 * 60.0 * 9.0 - 4.0) / (14.0 * 60.0 * 2.0 - 1.0);
    assert!((hourly.points[0].value - expected).abs() < 1e-12);

    let daily = transformer.transform(&table, View::Daily).unwrap();
    let expected = (1439.0 * 4.5 + 5.0) / 1440.0;
    assert!((daily.points[0].value - expected).abs() < 1e-12);
    assert_eq!(daily.points[1].value, 4.5);

    // every subject sits at its maximum, with or without the gap
    let smoothed = transformer.transform(&table, View::SmoothedActivity).unwrap();
    assert!(smoothed.values().all(|v| (v - 1.0).abs() < 1e-12));
}
