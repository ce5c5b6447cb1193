/// Failures of the design store and constraint parsing.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Design already exists")]
    DesignExists,

    #[error("Create a design first: create_design <name>")]
    NoActiveDesign,

    #[error("{0}")]
    Validation(String),
}
