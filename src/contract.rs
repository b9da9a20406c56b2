//! Column contract shared by training and serving

/// Feature columns, in the order the scaler and model consume them
pub const FEATURE_ORDER: [&str; 5] = [
    "DRYBULBTEMPF",
    "RelativeHumidity",
    "WindSpeed",
    "WindDirection",
    "SeaLevelPressure",
];

/// Regression target: horizontal visibility, in miles in the training data
pub const TARGET_COLUMN: &str = "VISIBILITY";

/// Number of model features
pub const N_FEATURES: usize = FEATURE_ORDER.len();

/// Owned copy of [`FEATURE_ORDER`]
pub fn feature_names() -> Vec<String> {
    FEATURE_ORDER.iter().map(|s| s.to_string()).collect()
}

/// True when `names` matches [`FEATURE_ORDER`] exactly, order included
pub fn matches_feature_order(names: &[String]) -> bool {
    names.len() == N_FEATURES && names.iter().zip(FEATURE_ORDER.iter()).all(|(a, b)| a == b)
}
