//! Integration test: full batch pipeline (ingest → transform → train → evaluate)

use serde_json::json;
use visibility_ml::config::{ArtifactPaths, ParamGrid, ParamValue, PipelineParams, SchemaConfig};
use visibility_ml::contract::feature_names;
use visibility_ml::error::VisibilityError;
use visibility_ml::ingestion::{load_table, Document, InMemoryStore};
use visibility_ml::pipeline::Pipeline;
use visibility_ml::training::{ModelArtifact, ModelKind};
use visibility_ml::transformation::{ProcessedMatrix, StandardScaler};

const COLLECTION: &str = "visibility_data";

fn weather_documents(n: usize) -> Vec<Document> {
    (0..n)
        .map(|i| {
            let x = i as f64;
            let humidity = 30.0 + (i * 7 % 60) as f64;
            let wind = 2.0 + (i * 3 % 17) as f64;
            let visibility = 10.0 - humidity / 12.0 + wind / 10.0;
            json!({
                "_id": format!("doc{}", i),
                "DATE": format!("2015-03-{:02}T{:02}:00", i % 28 + 1, i % 24),
                "STATION": "WBAN:94728",
                "DRYBULBTEMPF": 35.0 + (x * 0.7) % 40.0,
                "RelativeHumidity": humidity,
                "WindSpeed": wind,
                "WindDirection": (i * 37 % 360) as f64,
                "SeaLevelPressure": 29.6 + (i % 9) as f64 * 0.08,
                "VISIBILITY": visibility
            })
            .as_object()
            .unwrap()
            .clone()
        })
        .collect()
}

fn store(n: usize) -> InMemoryStore {
    let store = InMemoryStore::new();
    store.insert_many(COLLECTION, weather_documents(n));
    store
}

fn pipeline(dir: &std::path::Path, params: PipelineParams) -> Pipeline {
    Pipeline::new(
        params,
        SchemaConfig::new(["DATE", "STATION"]),
        ArtifactPaths::rooted_at(dir),
    )
    .unwrap()
}

#[test]
fn test_full_pipeline_linear_regression() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), PipelineParams::new("Linear Regression"));

    let report = pipeline.run_all(store(60)).unwrap();
    assert_eq!(report.model_name, "Linear Regression");
    assert_eq!(report.test_rows, 12);
    assert_eq!(report.train_rows, 48);
    assert_eq!(report.n_features, 5);
    assert!(report.cv_score.is_none());
    // target is an exact linear function of two features
    assert!(report.metrics.r2 > 0.99, "r2 = {}", report.metrics.r2);

    let paths = pipeline.paths();
    for path in [
        &paths.raw_train,
        &paths.raw_test,
        &paths.processed_train,
        &paths.processed_test,
        &paths.scaler,
        &paths.model,
        &paths.metrics,
    ] {
        assert!(path.exists(), "{} missing", path.display());
    }

    let raw_train = load_table(&paths.raw_train).unwrap();
    assert!(raw_train.column("DATE").is_err());
    assert!(raw_train.column("STATION").is_err());
    assert!(raw_train.column("_id").is_err());
}

#[test]
fn test_scaler_fitted_on_training_split_only() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), PipelineParams::new("Linear Regression"));
    pipeline.run_ingestion(store(40)).unwrap();
    let (train, test) = pipeline.run_transformation().unwrap();

    let scaler = StandardScaler::load(&pipeline.paths().scaler).unwrap();
    assert_eq!(scaler.n_samples_seen(), train.n_samples());
    assert_eq!(scaler.feature_names(), feature_names().as_slice());

    // scaled training columns are centered
    for j in 0..train.features.ncols() {
        let mean = train.features.column(j).mean().unwrap();
        assert!(mean.abs() < 1e-9);
    }

    let reloaded = ProcessedMatrix::load(&pipeline.paths().processed_test).unwrap();
    assert_eq!(reloaded.n_samples(), test.n_samples());
    assert_eq!(reloaded.target_column, "VISIBILITY");
}

#[test]
fn test_grid_search_pipeline_records_selection() {
    let dir = tempfile::tempdir().unwrap();
    let mut grid = ParamGrid::new();
    grid.insert(
        "max_depth".to_string(),
        vec![ParamValue::Int(2), ParamValue::Int(6)],
    );
    grid.insert(
        "min_samples_leaf".to_string(),
        vec![ParamValue::Int(1), ParamValue::Int(3)],
    );
    let params = PipelineParams::new("DecisionTreeRegressor").with_grid("DecisionTreeRegressor", grid);
    let pipeline = pipeline(dir.path(), params);

    let report = pipeline.run_all(store(50)).unwrap();
    assert!(report.cv_score.is_some());

    let artifact = ModelArtifact::load(&pipeline.paths().model).unwrap();
    assert_eq!(artifact.model.kind(), ModelKind::DecisionTreeRegressor);
    assert_eq!(artifact.feature_names, feature_names());
    assert!(artifact.model.params().contains_key("max_depth"));
    assert!(artifact.model.params().contains_key("min_samples_leaf"));
}

#[test]
fn test_same_seed_reproduces_split() {
    let a = tempfile::tempdir().unwrap();
    let b = tempfile::tempdir().unwrap();
    let (train_a, _) = pipeline(a.path(), PipelineParams::new("Linear Regression"))
        .run_ingestion(store(30))
        .unwrap();
    let (train_b, _) = pipeline(b.path(), PipelineParams::new("Linear Regression"))
        .run_ingestion(store(30))
        .unwrap();
    assert!(train_a.equals(&train_b));
}

#[test]
fn test_missing_schema_column_aborts_ingestion() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = Pipeline::new(
        PipelineParams::new("Linear Regression"),
        SchemaConfig::new(["DATE", "NOT_A_COLUMN"]),
        ArtifactPaths::rooted_at(dir.path()),
    )
    .unwrap();

    let err = pipeline.run_ingestion(store(20)).unwrap_err();
    assert!(matches!(err, VisibilityError::Schema(_)));
    assert!(err.to_string().contains("NOT_A_COLUMN"));
    assert!(!pipeline.paths().raw_train.exists());
}

#[test]
fn test_unsupported_model_aborts_training() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), PipelineParams::new("XGBRegressor"));
    pipeline.run_ingestion(store(20)).unwrap();
    pipeline.run_transformation().unwrap();

    assert!(matches!(
        pipeline.run_training(),
        Err(VisibilityError::UnsupportedModel(_))
    ));
    assert!(!pipeline.paths().model.exists());
}

#[test]
fn test_from_yaml_files() {
    let dir = tempfile::tempdir().unwrap();
    let params = dir.path().join("params.yaml");
    let schema = dir.path().join("schema.yaml");
    std::fs::write(
        &params,
        r#"
data_ingestion:
  test_size: 0.25
  random_state: 7
model_trainer:
  chosen_model: Ridge Regression
model_selection:
  model:
    Ridge Regression:
      search_param_grid:
        alpha: [0.1, 1.0]
"#,
    )
    .unwrap();
    std::fs::write(&schema, "drop_columns:\n  - DATE\n  - STATION\n").unwrap();

    let pipeline = Pipeline::from_files(&params, &schema, dir.path()).unwrap();
    let report = pipeline.run_all(store(40)).unwrap();
    assert_eq!(report.model_name, "Ridge Regression");
    assert_eq!(report.test_rows, 10);
    assert!(report.cv_score.is_some());
}
