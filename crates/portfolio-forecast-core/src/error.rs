use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForecastError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Data integrity failure: {0}")]
    DataIntegrity(String),

    #[error("Plan '{plan}' references asset '{asset}' which is missing from the supplied history")]
    MissingAsset { plan: String, asset: String },

    #[error("Plan catalog rejected plan '{plan}': {reason}")]
    CatalogValidation { plan: String, reason: String },

    #[error("Projection failure: {0}")]
    Projection(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl ForecastError {
    /// Errors that only invalidate the plan being computed. The forecast
    /// service records these and carries on with the remaining plans; every
    /// other variant aborts the request.
    pub fn is_plan_scoped(&self) -> bool {
        matches!(
            self,
            ForecastError::MissingAsset { .. } | ForecastError::Projection(_)
        )
    }
}

impl From<serde_json::Error> for ForecastError {
    fn from(e: serde_json::Error) -> Self {
        ForecastError::SerializationError(e.to_string())
    }
}
