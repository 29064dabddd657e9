use thiserror::Error;

#[derive(Error, Debug)]
pub enum CritmarkError {
    #[error("Invalid document package '{file}': {message}")]
    InvalidPackage { file: String, message: String },

    #[error("XML parsing error at {location}: {message}")]
    XmlParse { message: String, location: String },

    #[error("Invalid settings: {0}")]
    Settings(String),

    #[error("Invalid figure registry: {0}")]
    Registry(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, CritmarkError>;
