use bson::{DecoderError, EncoderError, oid};
use std::{error, fmt, result, sync};

/// A type for results generated by mongomap operations.
pub type Result<T> = result::Result<T, Error>;

/// The error type for all mapper and store operations.
#[derive(Debug)]
pub enum Error {
    /// The caller supplied an invalid argument.
    ArgumentError(String),
    /// The store rejected the declared credentials.
    AuthenticationError(String),
    /// An error decoding a stored BSON document.
    DecoderError(DecoderError),
    /// A miscellaneous error with no additional structure.
    DefaultError(String),
    /// An error encoding a document into BSON.
    EncoderError(EncoderError),
    /// The store misbehaved during the authentication handshake.
    MaliciousServerError(MaliciousServerErrorType),
    /// An error generating an object id.
    OIDError(oid::Error),
    /// An operation was attempted that could not be completed.
    OperationError(String),
    /// A lock guarding shared state was poisoned.
    PoisonLockError,
    /// The store returned a reply the driver could not interpret.
    ResponseError(String),
}

/// The manner in which the store deviated from the authentication protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MaliciousServerErrorType {
    InvalidRnonce,
    InvalidServerSignature,
    NoServerSignature,
}

impl<'a> From<&'a str> for Error {
    fn from(s: &str) -> Error {
        Error::DefaultError(s.to_owned())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Error {
        Error::DefaultError(s)
    }
}

impl From<EncoderError> for Error {
    fn from(err: EncoderError) -> Error {
        Error::EncoderError(err)
    }
}

impl From<DecoderError> for Error {
    fn from(err: DecoderError) -> Error {
        Error::DecoderError(err)
    }
}

impl From<oid::Error> for Error {
    fn from(err: oid::Error) -> Error {
        Error::OIDError(err)
    }
}

impl<T> From<sync::PoisonError<T>> for Error {
    fn from(_: sync::PoisonError<T>) -> Error {
        Error::PoisonLockError
    }
}

impl fmt::Display for Error {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::ArgumentError(ref inner) => inner.fmt(fmt),
            Error::AuthenticationError(ref inner) => {
                write!(fmt, "Authentication failed: {}", inner)
            }
            Error::DecoderError(ref inner) => inner.fmt(fmt),
            Error::DefaultError(ref inner) => inner.fmt(fmt),
            Error::EncoderError(ref inner) => inner.fmt(fmt),
            Error::MaliciousServerError(ref err) => err.fmt(fmt),
            Error::OIDError(ref inner) => inner.fmt(fmt),
            Error::OperationError(ref inner) => inner.fmt(fmt),
            Error::PoisonLockError => write!(fmt, "Store lock poisoned."),
            Error::ResponseError(ref inner) => inner.fmt(fmt),
        }
    }
}

impl fmt::Display for MaliciousServerErrorType {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MaliciousServerErrorType::InvalidRnonce => {
                write!(fmt, "The server returned an invalid rnonce.")
            }
            MaliciousServerErrorType::InvalidServerSignature => {
                write!(fmt, "The server returned an invalid signature.")
            }
            MaliciousServerErrorType::NoServerSignature => {
                write!(fmt, "The server did not sign its final message.")
            }
        }
    }
}

impl error::Error for Error {
    fn description(&self) -> &str {
        match *self {
            Error::ArgumentError(ref inner) => inner,
            Error::AuthenticationError(ref inner) => inner,
            Error::DecoderError(ref inner) => inner.description(),
            Error::DefaultError(ref inner) => inner,
            Error::EncoderError(ref inner) => inner.description(),
            Error::MaliciousServerError(_) => "The server was malicious",
            Error::OIDError(ref inner) => inner.description(),
            Error::OperationError(ref inner) => inner,
            Error::PoisonLockError => "Store lock poisoned",
            Error::ResponseError(ref inner) => inner,
        }
    }

    fn cause(&self) -> Option<&error::Error> {
        match *self {
            Error::DecoderError(ref inner) => Some(inner),
            Error::EncoderError(ref inner) => Some(inner),
            Error::OIDError(ref inner) => Some(inner),
            _ => None,
        }
    }
}
