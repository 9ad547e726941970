use thiserror::Error;

#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Malformed magnitude string: {0}")]
    Format(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("API error: {0}")]
    Api(String),
}
