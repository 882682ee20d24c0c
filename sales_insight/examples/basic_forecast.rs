use chrono::{Duration, NaiveDate};
use sales_insight::config::AppConfig;
use sales_insight::service::{ForecastRequest, SalesInsightService};
use sales_insight::{CategoryEncoder, SalesDataset, SalesRecord};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Sales Insight: Basic Forecasting Example");
    println!("========================================\n");

    println!("Creating sample data...");
    let dataset = create_sample_dataset()?;
    println!("Sample data created: {} records\n", dataset.len());

    let service = SalesInsightService::new(dataset, CategoryEncoder::builtin(), &AppConfig::default());

    let response = service.handle_forecast(&ForecastRequest {
        store_id: "S001".to_string(),
        product_name: "Battery".to_string(),
        start_date: "2023-12-20".to_string(),
        end_date: "2024-01-10".to_string(),
    })?;

    println!("Actual sales in window: {}", response.actual_sales.len());
    for point in &response.predicted_sales {
        println!(
            "  {}: {:.2} ({:.2}, {:.2})",
            point.date, point.predicted, point.lower_bound, point.upper_bound
        );
    }
    if let Some(accuracy) = &response.accuracy {
        println!("\n{accuracy}");
    }

    let clusters = service.handle_clustering()?;
    println!("Chosen k: {}", clusters.optimal_k);
    for entry in &clusters.clusters {
        println!(
            "  category {} store {}: {:.1} -> cluster {}",
            entry.category, entry.store_id, entry.sales, entry.cluster
        );
    }

    Ok(())
}

/// One year of daily sales for three stores selling a battery (category 3)
fn create_sample_dataset() -> Result<SalesDataset, Box<dyn std::error::Error>> {
    let start = NaiveDate::from_ymd_opt(2023, 1, 1).ok_or("invalid start date")?;
    let mut records = Vec::new();

    for store in 0..3u32 {
        let base = 40.0 + 25.0 * store as f64;
        for day in 0..365i64 {
            let weekly = 5.0 * (2.0 * std::f64::consts::PI * day as f64 / 7.0).sin();
            let sales = base + 0.05 * day as f64 + weekly;
            records.push(SalesRecord::new(
                start + Duration::days(day),
                store,
                2,
                3,
                store % 4,
                sales,
            ));
        }
    }

    Ok(SalesDataset::from_records(records)?)
}
