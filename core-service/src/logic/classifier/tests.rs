use super::*;
use crate::logic::model::FnScorer;
use std::sync::atomic::{AtomicUsize, Ordering};

fn series(n: usize) -> Vec<f32> {
    (0..n).map(|i| i as f32).collect()
}

#[test]
fn test_single_window_below_threshold_all_idle() {
    let scorer = FnScorer::new(900, |_: &[f32]| 0.05);
    let result = classify(&series(900), &scorer, &ClassifierConfig::default()).unwrap();

    assert_eq!(result.windows.len(), 1);
    assert_eq!(result.labels.len(), 900);
    assert!(result.labels.iter().all(|l| *l == Some(Label::Idle)));
}

#[test]
fn test_inclusive_backfill_labels_boundary_reading() {
    let scorer = FnScorer::new(900, |_: &[f32]| 0.5);
    let result = classify(&series(950), &scorer, &ClassifierConfig::default()).unwrap();

    assert_eq!(result.windows.len(), 1);
    for i in 0..=900 {
        assert_eq!(result.labels[i], Some(Label::Charging), "row {}", i);
    }
    for i in 901..950 {
        assert_eq!(result.labels[i], None, "row {}", i);
    }
}

#[test]
fn test_exclusive_backfill_leaves_full_remainder() {
    let scorer = FnScorer::new(900, |_: &[f32]| 0.5);
    let config = ClassifierConfig {
        backfill: Backfill::Exclusive,
        ..Default::default()
    };
    let result = classify(&series(950), &scorer, &config).unwrap();

    assert_eq!(result.labeled_count(), 900);
    assert!(result.labels[900..].iter().all(|l| l.is_none()));
}

#[test]
fn test_next_window_overwrites_boundary() {
    // First window charging, second idle: reading 4 ends up idle.
    let scorer = FnScorer::new(4, |w: &[f32]| if w[0] == 0.0 { 0.9 } else { 0.0 });
    let config = ClassifierConfig::with_window_len(4);
    let result = classify(&series(8), &scorer, &config).unwrap();

    assert_eq!(result.windows.len(), 2);
    assert_eq!(result.labels[3], Some(Label::Charging));
    assert_eq!(result.labels[4], Some(Label::Idle));
    assert_eq!(result.charging_windows(), 1);
}

#[test]
fn test_window_count_and_remainder() {
    let scorer = FnScorer::new(10, |_: &[f32]| 0.0);
    let config = ClassifierConfig {
        window_len: 10,
        backfill: Backfill::Exclusive,
        ..Default::default()
    };

    for n in [10usize, 19, 20, 37] {
        let result = classify(&series(n), &scorer, &config).unwrap();
        assert_eq!(result.windows.len(), n / 10);
        assert_eq!(result.labels.len() - result.labeled_count(), n % 10);
    }
}

#[test]
fn test_windows_are_aligned_and_scored_in_order() {
    let scorer = FnScorer::new(3, |w: &[f32]| w[0]);
    let config = ClassifierConfig {
        window_len: 3,
        threshold: ThresholdConfig::new(100.0),
        backfill: Backfill::Inclusive,
    };
    let result = classify(&series(10), &scorer, &config).unwrap();

    let starts: Vec<usize> = result.windows.iter().map(|w| w.start).collect();
    assert_eq!(starts, vec![0, 3, 6]);
    let scores: Vec<f32> = result.windows.iter().map(|w| w.score).collect();
    assert_eq!(scores, vec![0.0, 3.0, 6.0]);
}

#[test]
fn test_threshold_equality_is_idle() {
    let scorer = FnScorer::new(5, |_: &[f32]| 0.10);
    let result = classify(&series(5), &scorer, &ClassifierConfig::with_window_len(5)).unwrap();
    assert_eq!(result.windows[0].label, Label::Idle);
}

#[test]
fn test_empty_series_rejected_before_scoring() {
    let calls = AtomicUsize::new(0);
    let scorer = FnScorer::new(900, |_: &[f32]| {
        calls.fetch_add(1, Ordering::SeqCst);
        1.0
    });

    let err = classify(&[], &scorer, &ClassifierConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_short_series_rejected() {
    let scorer = FnScorer::new(900, |_: &[f32]| 1.0);
    let err = classify(&series(899), &scorer, &ClassifierConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Validation(ref msg) if msg.contains("899")));
}

#[test]
fn test_scorer_window_mismatch_is_configuration_error() {
    let scorer = FnScorer::new(60, |_: &[f32]| 1.0);
    let err = classify(&series(900), &scorer, &ClassifierConfig::default()).unwrap_err();
    assert!(matches!(err, Error::Configuration(_)));
}

#[test]
fn test_non_finite_threshold_rejected_before_scoring() {
    let calls = AtomicUsize::new(0);
    let scorer = FnScorer::new(4, |_: &[f32]| {
        calls.fetch_add(1, Ordering::SeqCst);
        1e9
    });

    for threshold in [f32::NAN, -5.0] {
        let config = ClassifierConfig {
            threshold: ThresholdConfig::new(threshold),
            ..ClassifierConfig::with_window_len(4)
        };
        let err = classify(&series(4), &scorer, &config).unwrap_err();
        assert!(matches!(err, Error::Configuration(_)));
    }
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_classification_is_idempotent() {
    let scorer = FnScorer::new(7, |w: &[f32]| w.iter().sum::<f32>() / 1000.0);
    let config = ClassifierConfig::with_window_len(7);
    let data = series(50);

    let first = classify(&data, &scorer, &config).unwrap();
    let second = classify(&data, &scorer, &config).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_backfill_parse() {
    assert_eq!("Inclusive".parse::<Backfill>().unwrap(), Backfill::Inclusive);
    assert_eq!("exclusive".parse::<Backfill>().unwrap(), Backfill::Exclusive);
    assert!("both".parse::<Backfill>().is_err());
}
