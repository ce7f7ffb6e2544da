use chrono::{Duration, NaiveDate};
use salescope::{compute_kpis, DateRange, NormalizedSeries, NA};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Deterministic series with scattered missing values
fn generated_series(days: usize, metrics: usize) -> NormalizedSeries {
    let start = date(2021, 1, 1);
    let dates = (0..days).map(|i| start + Duration::days(i as i64)).collect();
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    let columns = (0..metrics)
        .map(|m| {
            let values = (0..days)
                .map(|_| {
                    state = state
                        .wrapping_mul(6_364_136_223_846_793_005)
                        .wrapping_add(1_442_695_040_888_963_407);
                    let draw = (state >> 33) % 1000;
                    if draw < 80 {
                        NA::NA
                    } else {
                        NA::Value(draw as f64 / 4.0)
                    }
                })
                .collect();
            (format!("Metric_{}", m), values)
        })
        .collect();
    NormalizedSeries::new("Date", dates, columns).unwrap()
}

#[test]
fn test_product_scenario() {
    let series = NormalizedSeries::new(
        "Date",
        vec![date(2020, 1, 1), date(2020, 2, 1), date(2020, 3, 1)],
        vec![(
            "Product_1".to_string(),
            vec![NA::Value(100.0), NA::Value(120.0), NA::Value(110.0)],
        )],
    )
    .unwrap();

    let kpis = compute_kpis(&series, None);
    let product = kpis.get("Product_1").unwrap();
    assert_eq!(product.total, NA::Value(330.0));
    assert_eq!(product.mean, NA::Value(110.0));
    assert!((product.growth_rate.get().unwrap() - 0.10).abs() < 1e-12);
    assert_eq!(product.peak_date, Some(date(2020, 2, 1)));
    assert_eq!(product.max, NA::Value(120.0));
}

#[test]
fn test_total_matches_brute_force_sum() {
    let series = generated_series(90, 3);
    let range = DateRange::new(date(2021, 1, 20), date(2021, 3, 10)).unwrap();
    let kpis = compute_kpis(&series, Some(range));

    let mut aggregate = 0.0;
    for metric in series.metric_names() {
        let mut expected = 0.0;
        for (d, v) in series.dates().iter().zip(series.column(metric).unwrap()) {
            if range.contains(*d) {
                if let NA::Value(x) = v {
                    expected += x;
                }
            }
        }
        aggregate += expected;
        let total = kpis.get(metric).unwrap().total.get().unwrap();
        assert!((total - expected).abs() < 1e-9, "{}: {} vs {}", metric, total, expected);
    }

    let total = kpis.aggregate.total.get().unwrap();
    assert!((total - aggregate).abs() < 1e-9);
    assert_eq!(kpis.aggregate.periods, 50);
}

#[test]
fn test_all_missing_metric_is_undefined_not_zero() {
    let series = NormalizedSeries::new(
        "Date",
        vec![date(2020, 1, 1), date(2020, 1, 2)],
        vec![
            ("Empty".to_string(), vec![NA::NA, NA::NA]),
            ("Full".to_string(), vec![NA::Value(1.0), NA::Value(2.0)]),
        ],
    )
    .unwrap();

    let kpis = compute_kpis(&series, None);
    let empty = kpis.get("Empty").unwrap();
    assert_eq!(empty.total, NA::NA);
    assert_eq!(empty.min, NA::NA);
    assert_eq!(empty.max, NA::NA);
    assert_eq!(empty.missing, 2);
    assert_eq!(kpis.aggregate.total, NA::Value(3.0));

    let json = serde_json::to_value(&kpis).unwrap();
    assert!(json["metrics"][0]["total"].is_null());
}
