pub mod dedup;
pub mod embed;
pub mod ingest;
pub mod normalize;
pub mod process;

/// Maps every command's underlying error onto the command surface's two
/// failure exit codes: argument/payload validation (`2`) vs. everything
/// else (`1`).
#[derive(Debug)]
pub enum CliError {
    Validation(String),
    Runtime(String),
}

pub type CliResult = Result<(), CliError>;

impl From<store::StoreError> for CliError {
    fn from(err: store::StoreError) -> Self {
        CliError::Runtime(err.to_string())
    }
}
