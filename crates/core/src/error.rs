use thiserror::Error;

type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Raised by the dataset loader when an upload cannot be turned into a dataset.
///
/// The inner error is kept both as `source()` and stringified into the
/// message, so callers that only display the error still see the cause.
#[derive(Error, Debug)]
#[error("{message}; reference error message: {reference}")]
pub struct DataIoInputError {
    message: String,
    reference: String,
    #[source]
    source: BoxedError,
}

impl DataIoInputError {
    pub fn new(message: impl Into<String>, source: impl Into<BoxedError>) -> Self {
        let source = source.into();
        Self {
            message: message.into(),
            reference: source.to_string(),
            source,
        }
    }

    /// Outer message without the chained reference.
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Stable error strings reported back to users for failed tasks.
pub struct TaskErrorMessages;

impl TaskErrorMessages {
    pub const CLEANING_RESULT_EMPTY: &'static str = "Error: Cleaning resulted in empty dataset";
    pub const CLEANING_RESULT_NOT_FLOAT32: &'static str =
        "Error: Cleaning result contained values that were not float32: \n";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Error, Debug)]
    #[error("")]
    struct ValueError;

    #[derive(Error, Debug)]
    #[error("could not parse line 3")]
    struct ParseFailure;

    #[test]
    fn data_io_input_chains_empty_inner_message() {
        let err = DataIoInputError::new("this is test message", ValueError);
        assert_eq!(
            err.to_string(),
            "this is test message; reference error message: "
        );
    }

    #[test]
    fn data_io_input_keeps_source() {
        let err = DataIoInputError::new("upload rejected", ParseFailure);
        assert_eq!(
            err.to_string(),
            "upload rejected; reference error message: could not parse line 3"
        );
        assert_eq!(err.message(), "upload rejected");

        let source = std::error::Error::source(&err).expect("source should be kept");
        assert_eq!(source.to_string(), "could not parse line 3");
    }

    #[test]
    fn data_io_input_accepts_string_source() {
        let err = DataIoInputError::new("bad file", "row 2 has 3 cells");
        assert_eq!(
            err.to_string(),
            "bad file; reference error message: row 2 has 3 cells"
        );
    }

    #[test]
    fn task_error_message_literals() {
        assert_eq!(
            TaskErrorMessages::CLEANING_RESULT_EMPTY,
            "Error: Cleaning resulted in empty dataset"
        );
        assert_eq!(
            TaskErrorMessages::CLEANING_RESULT_NOT_FLOAT32,
            "Error: Cleaning result contained values that were not float32: \n"
        );
    }
}
