use thiserror::Error;

#[derive(Error, Debug)]
/// CSV error
pub enum CsvError {
    /// The dialect or a builder option is invalid.
    #[error("Configuration: {0}")]
    Configuration(String),

    /// The input bytes are not valid in the declared encoding.
    #[error("Decoding: invalid {encoding} byte sequence at offset {offset}")]
    Decoding {
        encoding: &'static str,
        offset: u64,
    },

    /// The input text does not form a valid record.
    #[error("MalformedRecord at line {line}: {message}")]
    MalformedRecord { line: usize, message: String },

    /// A field cannot be written under the current dialect.
    #[error("UnrepresentableValue: {0}")]
    UnrepresentableValue(String),

    /// A row handed to a dict writer carries keys outside its field names.
    #[error("UnknownFields: {0:?}")]
    UnknownFields(Vec<String>),

    /// The underlying stream failed to read, write or flush.
    #[error("Io: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type used across the crate.
pub type Result<T> = std::result::Result<T, CsvError>;
