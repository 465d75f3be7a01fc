use chrono::{Duration, NaiveDate};
use clothalytics::dataset::RawTable;
use clothalytics::storage::{keys, DatasetStore, DiskStore, MemoryStore};
use clothalytics::{Error, ProductOutcome, SalesPipeline};

const COLUMNS: [&str; 6] = [
    "Product Name",
    "Quantity",
    "Sell Price",
    "Date Sold",
    "Product Category",
    "Store Name",
];

fn raw_table(rows: Vec<Vec<String>>) -> RawTable {
    let mut table = RawTable::new(COLUMNS.iter().map(|c| c.to_string()).collect());
    for row in rows {
        table.push_row(row).unwrap();
    }
    table
}

fn row(product: &str, quantity: u32, price: f64, date: NaiveDate, category: &str, store: &str) -> Vec<String> {
    vec![
        product.to_string(),
        quantity.to_string(),
        price.to_string(),
        date.format("%d-%m-%Y").to_string(),
        category.to_string(),
        store.to_string(),
    ]
}

/// Two products in two stores with ten weeks of non-zero sales each
fn ten_week_upload() -> RawTable {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(); // a Monday
    let mut rows = Vec::new();
    for week in 0..10u32 {
        let date = start + Duration::weeks(i64::from(week));
        rows.push(row("T-Shirt", 4 + week % 5, 19.99, date, "Men", "Store A"));
        rows.push(row("T-Shirt", 2 + week % 3, 21.5, date, "Men", "Store B"));
        rows.push(row("Dress", 6 + (week * 2) % 5, 49.0, date, "Women", "Store A"));
        rows.push(row("Dress", 3 + week % 4, 52.0, date, "Women", "Store B"));
    }
    raw_table(rows)
}

#[test]
fn test_ingest_persists_artifacts_and_reloads() {
    let mut pipeline = SalesPipeline::new(MemoryStore::new());
    let (dataset, report) = pipeline.ingest(&ten_week_upload()).unwrap();

    assert_eq!(report.rows_dropped(), 0);
    assert!(pipeline.store().contains(keys::UPLOADED_DATASET));
    assert!(pipeline.store().contains(keys::PREPROCESSED_DATASET));

    let reloaded = pipeline.load_cached().unwrap();
    assert_eq!(reloaded.len(), dataset.len());
    assert_eq!(reloaded.date_range(), dataset.date_range());
}

#[test]
fn test_preprocessed_artifact_uses_day_month_year_dates() {
    let mut pipeline = SalesPipeline::new(MemoryStore::new());
    pipeline.ingest(&ten_week_upload()).unwrap();

    let artifact = pipeline
        .store()
        .load(keys::PREPROCESSED_DATASET)
        .unwrap()
        .unwrap();
    let date_col = artifact.column_index("Date Sold").unwrap();
    assert_eq!(artifact.rows()[0][date_col], "01-01-2024");
}

#[test]
fn test_extra_columns_survive_in_preprocessed_artifact() {
    let mut table = RawTable::new(
        [
            "Product Name",
            "Quantity",
            "Sell Price",
            "Date Sold",
            "Product Category",
            "Store Name",
            "Revenue",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect(),
    );
    table
        .push_row(
            ["T-Shirt", "3", "19.99", "01-01-2024", "Men", "Store A", "59.97"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        )
        .unwrap();

    let mut pipeline = SalesPipeline::new(MemoryStore::new());
    pipeline.ingest(&table).unwrap();

    let artifact = pipeline
        .store()
        .load(keys::PREPROCESSED_DATASET)
        .unwrap()
        .unwrap();
    let revenue = artifact
        .column_index("Revenue")
        .expect("extra column kept in preprocessed artifact");
    assert_eq!(artifact.rows()[0][revenue], "59.97");

    // Reloading from the cache keeps carrying the column
    let reloaded = pipeline.load_cached().unwrap();
    assert_eq!(reloaded.extra_columns(), &["Revenue".to_string()]);
}

#[test]
fn test_load_cached_without_upload_halts() {
    let pipeline = SalesPipeline::new(MemoryStore::new());
    assert!(matches!(pipeline.load_cached(), Err(Error::NoDataset)));
}

#[test]
fn test_missing_column_halts_before_anything_is_persisted() {
    let mut table = RawTable::new(
        ["Product Name", "Quantity", "Date Sold", "Product Category", "Store Name"]
            .iter()
            .map(|c| c.to_string())
            .collect(),
    );
    table
        .push_row(
            ["T-Shirt", "3", "01-01-2024", "Men", "Store A"]
                .iter()
                .map(|c| c.to_string())
                .collect(),
        )
        .unwrap();

    let mut pipeline = SalesPipeline::new(MemoryStore::new());
    let err = pipeline.ingest(&table).unwrap_err();
    assert!(matches!(err, Error::MissingColumn(_)));

    // No downstream stage ran, no artifact was written
    assert!(!pipeline.store().contains(keys::UPLOADED_DATASET));
    assert!(!pipeline.store().contains(keys::PREPROCESSED_DATASET));
}

#[test]
fn test_two_products_two_stores_scenario() {
    let mut pipeline = SalesPipeline::new(MemoryStore::new());
    let (dataset, _) = pipeline.ingest(&ten_week_upload()).unwrap();

    let analytics = pipeline.analytics(&dataset).unwrap();
    // Exactly one aggregate row per observed (store, category) combination
    assert_eq!(analytics.sales_by_store_category.len(), 4);
    assert_eq!(analytics.best_store_per_category.len(), 2);
    assert_eq!(analytics.recommended_inventory.len(), 4);
    assert!(pipeline.store().contains(keys::BEST_STORE_FOR_CATEGORY));
    assert!(pipeline.store().contains(keys::RECOMMENDED_INVENTORY));

    // Forecasts on both products score against the held-out weeks
    for product in ["T-Shirt", "Dress"] {
        let forecast = pipeline.forecast(&dataset, product).unwrap();
        assert_eq!(forecast.predictions.len(), 2); // round(0.2 * 10)
        assert!(forecast.accuracy.mae >= 0.0);
        assert!(forecast.accuracy.rmse >= 0.0);
    }
}

#[test]
fn test_one_degenerate_product_does_not_abort_the_batch() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let mut rows = Vec::new();
    for week in 0..12u32 {
        let date = start + Duration::weeks(i64::from(week));
        rows.push(row("Jeans", 3 + week % 6, 40.0, date, "Men", "Store A"));
        // A product that only ever records zero-quantity sales
        rows.push(row("Scarf", 0, 9.0, date, "Unisex", "Store A"));
    }

    let mut pipeline = SalesPipeline::new(MemoryStore::new());
    let (dataset, _) = pipeline.ingest(&raw_table(rows)).unwrap();

    let outcomes = pipeline.forecast_all(&dataset, 30);
    assert_eq!(outcomes.len(), 2);

    let jeans = outcomes
        .iter()
        .find_map(|o| o.completed().filter(|f| f.product == "Jeans"))
        .expect("jeans forecast should complete");
    assert!(jeans.accuracy.rmse >= 0.0);

    let scarf = outcomes
        .iter()
        .find(|o| o.is_failed())
        .expect("scarf fit should fail");
    match scarf {
        ProductOutcome::Failed { product, reason } => {
            assert_eq!(product, "Scarf");
            assert!(!reason.is_empty());
        }
        ProductOutcome::Completed(_) => unreachable!(),
    }

    // Stationarity still reports for every product, zeros included
    let reports = pipeline.stationarity_all(&dataset, 30);
    assert_eq!(reports.len(), 2);
    assert!(reports.iter().all(|r| !r.is_failed()));
}

#[test]
fn test_disk_store_survives_sessions() {
    let dir = tempfile::tempdir().unwrap();

    {
        let store = DiskStore::new(dir.path()).unwrap();
        let mut pipeline = SalesPipeline::new(store);
        pipeline.ingest(&ten_week_upload()).unwrap();
    }

    // A fresh session over the same directory picks the dataset back up
    let pipeline = SalesPipeline::new(DiskStore::new(dir.path()).unwrap());
    let dataset = pipeline.load_cached().unwrap();
    assert_eq!(dataset.len(), 40);
}
