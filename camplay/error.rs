use flexi_logger::FlexiLoggerError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum App {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("TOML parsing error: {0}")]
    TomlParsing(String),

    #[error("Logger initialization error: {0}")]
    Logger(String),

    #[error("Terminal error: {0}")]
    Terminal(String),

    #[error("GStreamer initialization error: {0}")]
    Init(String),

    #[error("GStreamer element error: {0}")]
    Element(String),

    #[error("GStreamer link error: {0}")]
    Link(String),

    #[error("GStreamer pipeline error: {0}")]
    Pipeline(String),

    /// A state change requested by the controller did not reach its target.
    #[error("Pipeline command error: {0}")]
    PipelineCommand(String),

    /// An error reported by the running pipeline. Always fatal.
    #[error("Pipeline failure: {0}")]
    PipelineFailure(String),
}

impl From<io::Error> for App {
    fn from(error: io::Error) -> Self {
        App::Io(error.to_string())
    }
}

impl From<toml::de::Error> for App {
    fn from(error: toml::de::Error) -> Self {
        App::TomlParsing(error.to_string())
    }
}

impl From<FlexiLoggerError> for App {
    fn from(error: FlexiLoggerError) -> Self {
        App::Logger(error.to_string())
    }
}

impl From<glib::Error> for App {
    fn from(error: glib::Error) -> Self {
        App::Init(error.to_string())
    }
}
