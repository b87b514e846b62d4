//! End-to-end tests: CSV on disk through the cache to a finished report.

use std::fs::File;
use std::io::Write;
use std::time::{Duration, SystemTime};

use churn_dash::ui::App;
use churn_dash::{
    cross_tab, derive, group_summary, DashboardReport, Dimension, GroupOrder, PanelConfig, Percent,
    SnapshotCache,
};
use tempfile::NamedTempFile;

const HEADER: &str = "customerID,gender,CitizensStatus,Partner,Dependents,tenure,PhoneService,Contract,TechSupport,InternetService,PaymentMethod,MonthlyCharges,TotalCharges,Churn";

/// A handful of rows shaped like the public telco export.
fn create_test_csv() -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    let rows = [
        "7590-VHVEG,Female,No,Yes,No,1,No,Month-to-month,No,DSL,Electronic check,29.85,29.85,No",
        "5575-GNVDE,Male,No,No,No,34,Yes,One year,No,DSL,Mailed check,56.95,1889.5,No",
        "3668-QPYBK,Male,No,No,No,2,Yes,Month-to-month,No,DSL,Mailed check,53.85,108.15,Yes",
        "7795-CFOCW,Male,No,No,No,45,No,One year,Yes,DSL,Bank transfer (automatic),42.3,1840.75,No",
        "9237-HQITU,Female,No,No,No,2,Yes,Month-to-month,No,Fiber optic,Electronic check,70.7,151.65,Yes",
        "9305-CDSKC,Female,No,No,No,8,Yes,Month-to-month,No,Fiber optic,Electronic check,99.65,820.5,Yes",
        "1452-KIOVK,Male,No,No,Yes,22,Yes,Month-to-month,No,Fiber optic,Credit card (automatic),89.1,1949.4,No",
        "6713-OKOMC,Female,No,No,No,10,No,Month-to-month,No,DSL,Mailed check,29.75,301.9,No",
        "7892-POOKP,Female,No,Yes,No,28,Yes,Month-to-month,Yes,Fiber optic,Electronic check,104.8,3046.05,Yes",
        "4472-LVYGI,Female,No,Yes,Yes,0,No,Two year,Yes,DSL,Bank transfer (automatic),52.55, ,No",
    ];
    for row in rows {
        writeln!(file, "{row}").unwrap();
    }
    file
}

#[test]
fn test_end_to_end_report() {
    let csv = create_test_csv();
    let mut cache = SnapshotCache::new(csv.path());
    let (table, _) = cache.snapshot().unwrap();
    assert_eq!(table.len(), 10);

    let derived = derive(table);
    let report = DashboardReport::build(&derived, &PanelConfig::default());
    assert_eq!(report.failed_panels(), 0);
    assert_eq!(report.metrics.total_customers, 10);
    assert_eq!(
        report.metrics.churn_rate.ready(),
        Some(&Percent::Value(40.0))
    );

    let contract = group_summary(&derived, Dimension::Contract, GroupOrder::ByCountDesc).unwrap();
    let first = &contract.rows[0];
    assert_eq!(first.value, "Month-to-month");
    assert_eq!((first.total, first.churned), (7, 4));
    assert_eq!(first.percentage, Percent::Value(57.14));

    let extremes = report.total_charges.ready().unwrap();
    assert_eq!(extremes.min, Some(29.85));
    assert_eq!(extremes.max, Some(3046.05));

    // the blank TotalCharges row lands outside the heatmap, not in a bucket
    let heatmap = cross_tab(&derived, Dimension::TotalChargeRange, Dimension::Contract).unwrap();
    assert_eq!(heatmap.outside, 1);
    assert_eq!(heatmap.total(), 9);

    let text = report.to_string();
    assert!(text.contains("== Churn by Payment Method"));
    assert!(text.contains("Electronic check"));
    let json: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();
    assert_eq!(json["metrics"]["total_customers"], 10);
}

#[test]
fn test_charge_range_panel_keeps_bucket_order() {
    let csv = create_test_csv();
    let mut cache = SnapshotCache::new(csv.path());
    let derived = derive(cache.snapshot().unwrap().0);

    let summary = group_summary(&derived, Dimension::ChargeRange, GroupOrder::Natural).unwrap();
    let labels: Vec<&str> = summary.rows.iter().map(|r| r.value.as_str()).collect();
    assert_eq!(labels, ["0-20", "21-40", "41-60", "61-80", "81-100", "101-120"]);
    assert_eq!(summary.rows[0].total, 0);
    assert!(summary.rows[0].percentage.is_undefined());
    assert_eq!(summary.rows[1].total, 2);
    assert_eq!(summary.grouped_total() + summary.missing, 10);
}

#[test]
fn test_app_follows_source_changes_and_failures() {
    let csv = create_test_csv();
    let path = csv.path().to_path_buf();
    let config = PanelConfig::default();
    let mut cache = SnapshotCache::new(&path);
    let mut app = App::new();

    assert!(app.refresh(&mut cache, &config));
    assert_eq!(app.view.as_ref().unwrap().metrics.total_customers, 10);
    assert!(!app.refresh(&mut cache, &config));

    // a broken file replaces the whole dashboard with the load error
    {
        let mut file = File::create(&path).unwrap();
        writeln!(file, "customerID,gender").unwrap();
        writeln!(file, "X,Male").unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(10)).unwrap();
    }
    assert!(app.refresh(&mut cache, &config));
    let message = app.view.as_ref().unwrap_err();
    assert!(message.contains("missing required column"));
    assert!(!app.refresh(&mut cache, &config));

    {
        let mut file = File::create(&path).unwrap();
        writeln!(file, "{HEADER}").unwrap();
        writeln!(
            file,
            "0001-AAAAA,Male,No,No,No,5,Yes,Two year,Yes,DSL,Mailed check,19.5,97.5,No"
        )
        .unwrap();
        file.set_modified(SystemTime::now() + Duration::from_secs(20)).unwrap();
    }
    assert!(app.refresh(&mut cache, &config));
    assert_eq!(app.view.as_ref().unwrap().metrics.total_customers, 1);
}

#[test]
fn test_missing_source_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = SnapshotCache::new(dir.path().join("telecom_churned_data.csv"));
    let err = cache.snapshot().unwrap_err();
    assert!(err.to_string().contains("telecom_churned_data.csv"));
}

#[test]
fn test_padded_churn_cells_agree_across_panels() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "{HEADER}").unwrap();
    writeln!(
        file,
        "0001-AAAAA,Male,No,No,No,5,Yes,One year,Yes,DSL,Mailed check,19.5,97.5,Yes "
    )
    .unwrap();
    writeln!(
        file,
        "0002-BBBBB,Female,No,No,No,7,Yes,One year,No,DSL,Mailed check,25.0,175.0,Yes"
    )
    .unwrap();

    let mut cache = SnapshotCache::new(file.path());
    let derived = derive(cache.snapshot().unwrap().0);

    let churn = group_summary(&derived, Dimension::Churn, GroupOrder::Natural).unwrap();
    let yes = churn.row("Yes").unwrap();
    assert_eq!(yes.churned, yes.total);
    assert_eq!(yes.total, 2);

    let contract = group_summary(&derived, Dimension::Contract, GroupOrder::Natural).unwrap();
    assert_eq!(contract.row("One year").unwrap().percentage, Percent::Value(100.0));

    let report = DashboardReport::build(&derived, &PanelConfig::default());
    assert_eq!(report.metrics.churn_rate.ready(), Some(&Percent::Value(100.0)));
    assert!(!report.churn_vs_charges.is_failed());
}
