use std::error;
use std::fmt;

use crate::signature::SignatureError;

/// Result alias defaulting to the error type of this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised while parsing an introspection descriptor.
///
/// The error records the element path at which parsing failed, such as
/// `node/interface/method`.
#[derive(Debug)]
pub struct Error {
    path: Box<str>,
    kind: ErrorKind,
}

impl Error {
    pub(crate) fn new<P, K>(path: P, kind: K) -> Self
    where
        Box<str>: From<P>,
        ErrorKind: From<K>,
    {
        Self {
            path: path.into(),
            kind: kind.into(),
        }
    }

    /// The element path at which the error was raised.
    pub fn path(&self) -> &str {
        &self.path
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.path.is_empty() {
            self.kind.fmt(f)
        } else {
            write!(f, "{}: {}", self.path, self.kind)
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::XmlParser(error) => Some(error),
            ErrorKind::Signature(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    XmlParser(xmlparser::Error),
    Signature(SignatureError),
    UnsupportedElementStart(Box<str>),
    UnsupportedElementEnd,
    UnsupportedText,
    MismatchingEnd {
        expected: Box<str>,
        actual: Box<str>,
    },
    UnterminatedElement(Box<str>),
    MissingRoot,
    MissingMethodName,
    MissingSignalName,
    MissingInterfaceName,
    MissingNodeName,
    MissingPropertyName,
    MissingPropertyType,
    MissingPropertyAccess,
    UnsupportedPropertyAccess(Box<str>),
    MissingAnnotationName,
    MissingAnnotationValue,
    MissingArgumentType,
    UnsupportedArgumentDirection(Box<str>),
    SignalArgumentDirection,
}

impl From<xmlparser::Error> for ErrorKind {
    #[inline]
    fn from(error: xmlparser::Error) -> Self {
        ErrorKind::XmlParser(error)
    }
}

impl From<SignatureError> for ErrorKind {
    #[inline]
    fn from(error: SignatureError) -> Self {
        ErrorKind::Signature(error)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::XmlParser(error) => error.fmt(f),
            ErrorKind::Signature(error) => error.fmt(f),
            ErrorKind::UnsupportedElementStart(element) => {
                write!(f, "Unsupported element: {element}")
            }
            ErrorKind::UnsupportedElementEnd => {
                write!(f, "Unsupported element end")
            }
            ErrorKind::UnsupportedText => {
                write!(f, "Unsupported text")
            }
            ErrorKind::MismatchingEnd { expected, actual } => {
                write!(f, "Mismatching end: expected {expected}, found {actual}",)
            }
            ErrorKind::UnterminatedElement(element) => {
                write!(f, "Element <{element}> was never closed")
            }
            ErrorKind::MissingRoot => {
                write!(f, "Document has no root <node> element")
            }
            ErrorKind::MissingMethodName => {
                write!(f, "Missing method name")
            }
            ErrorKind::MissingSignalName => {
                write!(f, "Missing signal name")
            }
            ErrorKind::MissingInterfaceName => {
                write!(f, "Missing interface name")
            }
            ErrorKind::MissingNodeName => {
                write!(f, "Missing name on child node")
            }
            ErrorKind::MissingPropertyName => {
                write!(f, "Missing property name")
            }
            ErrorKind::MissingPropertyType => {
                write!(f, "Missing property type")
            }
            ErrorKind::MissingPropertyAccess => {
                write!(f, "Missing property access")
            }
            ErrorKind::UnsupportedPropertyAccess(value) => {
                write!(f, "Unsupported property access `{value}`")
            }
            ErrorKind::MissingAnnotationName => {
                write!(f, "Missing annotation name")
            }
            ErrorKind::MissingAnnotationValue => {
                write!(f, "Missing annotation value")
            }
            ErrorKind::MissingArgumentType => {
                write!(f, "Missing argument type")
            }
            ErrorKind::UnsupportedArgumentDirection(value) => {
                write!(f, "Unsupported argument direction `{value}`")
            }
            ErrorKind::SignalArgumentDirection => {
                write!(f, "Signal arguments can only have direction `out`")
            }
        }
    }
}
