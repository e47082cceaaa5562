/// Main error type for the library.
#[derive(Debug)]
pub enum Error {
    /// Used when the user pass a logical invalid parameter to a function.
    InvalidParameter(String),
    Io(std::io::Error),
    Parser(String),
    Image(image::ImageError),
    /// The dataset has a different number of color and depth images.
    FrameCountMismatch { color: usize, depth: usize },
    /// Failure reported by the geometry engine. Passed through untouched.
    Engine(String),
    /// A reconstruction system run is already active.
    AlreadyRunning,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Error::Io(err) => write!(f, "IO error: {err}"),
            Error::Parser(err) => write!(f, "Parser error: {err}"),
            Error::InvalidParameter(err) => write!(f, "Parameter error: {err}"),
            Error::Image(err) => write!(f, "Image error: {err}"),
            Error::FrameCountMismatch { color, depth } => write!(
                f,
                "The number of color images {color} must equal to the number of depth images {depth}."
            ),
            Error::Engine(err) => write!(f, "Geometry engine error: {err}"),
            Error::AlreadyRunning => write!(f, "The system is already running."),
        }
    }
}

impl Error {
    /// Create a error with the kind `InvalidParameter`.
    /// # Arguments
    /// * `msg` - The error message.
    pub fn invalid_parameter<T: ToString>(msg: T) -> Self {
        Error::InvalidParameter(msg.to_string())
    }

    /// Create a error with the kind `Engine`.
    pub fn engine<T: ToString>(msg: T) -> Self {
        Error::Engine(msg.to_string())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            Error::Image(err) => Some(err),
            Error::Parser(_)
            | Error::InvalidParameter(_)
            | Error::FrameCountMismatch { .. }
            | Error::Engine(_)
            | Error::AlreadyRunning => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err)
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Parser(err.to_string())
    }
}

impl From<glob::PatternError> for Error {
    fn from(err: glob::PatternError) -> Self {
        Error::Parser(err.to_string())
    }
}
