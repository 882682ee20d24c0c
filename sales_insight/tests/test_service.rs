use chrono::{Duration, NaiveDate};
use pretty_assertions::assert_eq;
use rstest::rstest;
use sales_insight::config::AppConfig;
use sales_insight::service::{
    ClusterResponse, ErrorResponse, ForecastRequest, ForecastResponse, SalesInsightService,
};
use sales_insight::utils::parse_date;
use sales_insight::{CategoryEncoder, InsightError, SalesDataset, SalesRecord};
use serde_json::Value;

/// 90 days for S001/Battery and S002/Battery plus a few other pairs
fn service() -> SalesInsightService {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let mut records = Vec::new();
    for store in 0..2u32 {
        for day in 0..90i64 {
            let sales = 20.0 + 10.0 * store as f64 + 0.1 * day as f64;
            records.push(SalesRecord::new(start + Duration::days(day), store, 2, 3, 1, sales));
        }
    }
    for (store, product, category) in [(2u32, 6u32, 4u32), (3, 17, 2), (4, 0, 0)] {
        for day in 0..10i64 {
            records.push(SalesRecord::new(
                start + Duration::days(day),
                store,
                product,
                category,
                0,
                5.0 * (store + 1) as f64,
            ));
        }
    }

    let dataset = SalesDataset::from_records(records).unwrap();
    SalesInsightService::new(dataset, CategoryEncoder::builtin(), &AppConfig::default())
}

fn request(store: &str, product: &str, start: &str, end: &str) -> ForecastRequest {
    ForecastRequest {
        store_id: store.to_string(),
        product_name: product.to_string(),
        start_date: start.to_string(),
        end_date: end.to_string(),
    }
}

#[test]
fn test_forecast_response_contract() {
    let service = service();
    let response = service
        .handle_forecast(&request("S001", "Battery", "2023-03-25", "2023-04-05"))
        .unwrap();

    assert_eq!(response.store_id, "S001");
    assert_eq!(response.product_name, "Battery");
    // History ends on 2023-03-31
    assert_eq!(response.actual_sales.len(), 7);
    assert_eq!(response.predicted_sales.len(), 12);

    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["actual_sales"][0]["date"], "2023-03-25");
    assert!(json["actual_sales"][0]["actual"].is_number());

    let predicted = &json["predicted_sales"][11];
    assert_eq!(predicted["date"], "2023-04-05");
    for key in ["predicted", "lower_bound", "upper_bound"] {
        assert!(predicted[key].is_number(), "missing {key}");
    }
    assert!(json["accuracy"]["rmse"].is_number());

    let parsed: ForecastResponse = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, response);
}

#[test]
fn test_inverted_range_returns_empty_lists() {
    let response = service()
        .handle_forecast(&request("S002", "Battery", "2023-03-01", "2023-02-01"))
        .unwrap();

    assert!(response.actual_sales.is_empty());
    assert!(response.predicted_sales.is_empty());

    let json = serde_json::to_value(&response).unwrap();
    assert!(json.get("accuracy").is_none());
}

#[rstest]
#[case::unknown_store(request("S009", "Battery", "2023-01-01", "2023-01-31"), 400)]
#[case::lowercase_store(request("s001", "Battery", "2023-01-01", "2023-01-31"), 400)]
#[case::unknown_product(request("S001", "Flux Capacitor", "2023-01-01", "2023-01-31"), 400)]
#[case::malformed_start(request("S001", "Battery", "2023-13-01", "2023-01-31"), 400)]
#[case::malformed_end(request("S001", "Battery", "2023-01-01", "January"), 400)]
#[case::trailing_text(request("S001", "Battery", "2023-01-01xyz", "2023-01-31"), 400)]
#[case::extra_day_digit(request("S001", "Battery", "2023-01-011", "2023-01-31"), 400)]
#[case::trailing_statement(request("S001", "Battery", "2023-01-01", "2023-01-31; DROP"), 400)]
#[case::partial_time(request("S001", "Battery", "2023-01-01T", "2023-01-31"), 400)]
#[case::no_rows(request("S005", "Wires", "2023-01-01", "2023-01-31"), 404)]
fn test_forecast_errors(#[case] req: ForecastRequest, #[case] status: u16) {
    let err = service().handle_forecast(&req).unwrap_err();
    assert_eq!(err.status_code(), status);

    let (code, payload) = ErrorResponse::from_error(&err);
    assert_eq!(code, status);
    assert_eq!(payload.error, err.to_string());
}

#[rstest]
#[case::plain("2023-02-01")]
#[case::padded(" 2023-02-01 ")]
#[case::space_time("2023-02-01 00:00:00")]
#[case::iso_time("2023-02-01T13:45:00")]
#[case::fractional_seconds("2023-02-01T13:45:00.250")]
fn test_date_layouts_accepted(#[case] raw: &str) {
    assert_eq!(
        parse_date(raw).unwrap(),
        NaiveDate::from_ymd_opt(2023, 2, 1).unwrap()
    );
}

#[test]
fn test_two_year_history_window() {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
    let end = NaiveDate::from_ymd_opt(2024, 12, 31).unwrap();
    let records: Vec<SalesRecord> = start
        .iter_days()
        .take_while(|date| *date <= end)
        .enumerate()
        .map(|(day, date)| {
            let weekly = if day % 7 < 2 { 6.0 } else { 0.0 };
            SalesRecord::new(date, 0, 2, 3, 1, 30.0 + 0.01 * day as f64 + weekly)
        })
        .collect();
    assert_eq!(records.len(), 731);

    let dataset = SalesDataset::from_records(records).unwrap();
    let service =
        SalesInsightService::new(dataset, CategoryEncoder::builtin(), &AppConfig::default());
    let response = service
        .handle_forecast(&request("S001", "Battery", "2024-01-01", "2024-06-01"))
        .unwrap();

    assert_eq!(response.actual_sales.len(), 153);
    assert_eq!(response.predicted_sales.len(), 153);
    let actual_dates: Vec<NaiveDate> = response.actual_sales.iter().map(|a| a.date).collect();
    let predicted_dates: Vec<NaiveDate> =
        response.predicted_sales.iter().map(|p| p.date).collect();
    assert_eq!(actual_dates, predicted_dates);
    assert_eq!(actual_dates[0], NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    assert_eq!(actual_dates[152], NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
    assert_eq!(response.accuracy.as_ref().map(|a| a.points), Some(153));
}

#[test]
fn test_labels_are_checked_before_dates() {
    let err = service()
        .handle_forecast(&request("S009", "Battery", "not a date", "2023-01-31"))
        .unwrap_err();
    assert!(matches!(err, InsightError::UnknownCategory { .. }));
}

#[test]
fn test_error_payload_shape() {
    let err = service()
        .handle_forecast(&request("S001", "Battery", "2023-01-01", "yesterday"))
        .unwrap_err();
    let (status, payload) = ErrorResponse::from_error(&err);

    assert_eq!(status, 400);
    let json = serde_json::to_value(&payload).unwrap();
    let object = json.as_object().unwrap();
    assert_eq!(object.len(), 1);
    assert!(matches!(object.get("error"), Some(Value::String(_))));
}

#[test]
fn test_cluster_response_contract() {
    let service = service();
    let response = service.handle_clustering().unwrap();

    // (category, store) pairs: (3, 0), (3, 1), (4, 2), (2, 3), (0, 4)
    assert_eq!(response.clusters.len(), 5);
    assert_eq!(response.inertia.len(), 5);
    // two large Battery totals against three small ones
    assert_eq!(response.optimal_k, 2);

    let first = &response.clusters[0];
    assert_eq!((first.category, first.store_id), (0, 4));

    let json = serde_json::to_value(&response).unwrap();
    let entry = json["clusters"][0].as_object().unwrap();
    let mut keys: Vec<&str> = entry.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["category", "cluster", "sales", "store_id"]);
    assert!(json["clusters"][0]["category"].is_u64());
    assert!(json["clusters"][0]["sales"].is_f64());
    assert!(json["optimal_k"].is_u64());

    let parsed: ClusterResponse = serde_json::from_value(json).unwrap();
    assert_eq!(parsed, response);
}

#[test]
fn test_service_is_shareable_across_threads() {
    let service = std::sync::Arc::new(service());
    let req = request("S001", "Battery", "2023-03-01", "2023-03-31");
    let expected = service.handle_forecast(&req).unwrap();

    std::thread::scope(|scope| {
        for _ in 0..3 {
            let service = std::sync::Arc::clone(&service);
            let req = req.clone();
            let expected = &expected;
            scope.spawn(move || {
                assert_eq!(&service.handle_forecast(&req).unwrap(), expected);
                assert!(service.handle_clustering().is_ok());
            });
        }
    });
}
