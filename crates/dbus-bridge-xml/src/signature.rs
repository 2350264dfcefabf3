use std::error;
use std::fmt;

/// Maximum length of a signature.
const MAX_SIGNATURE: usize = 255;
/// Maximum nesting of arrays or structs.
const MAX_CONTAINER_DEPTH: usize = 32;

/// An error validating the type signature of an argument or property.
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct SignatureError {
    kind: SignatureErrorKind,
}

impl SignatureError {
    const fn new(kind: SignatureErrorKind) -> Self {
        Self { kind }
    }
}

#[derive(Debug, PartialEq, Eq)]
enum SignatureErrorKind {
    Empty,
    SignatureTooLong,
    UnknownTypeCode(char),
    ExceededMaximumArrayRecursion,
    ExceededMaximumStructRecursion,
    MissingArrayElementType,
    StructHasNoFields,
    StructNotClosed,
    DictEntryNotInsideArray,
    DictKeyMustBeBasicType,
    DictEntryNotClosed,
    NotSingleCompleteType,
}

impl fmt::Display for SignatureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            SignatureErrorKind::Empty => write!(f, "Empty type signature"),
            SignatureErrorKind::SignatureTooLong => write!(f, "Signature too long"),
            SignatureErrorKind::UnknownTypeCode(c) => write!(f, "Unknown type code `{c}`"),
            SignatureErrorKind::ExceededMaximumArrayRecursion => {
                write!(f, "Exceeded maximum array recursion")
            }
            SignatureErrorKind::ExceededMaximumStructRecursion => {
                write!(f, "Exceeded maximum struct recursion")
            }
            SignatureErrorKind::MissingArrayElementType => write!(f, "Missing array element type"),
            SignatureErrorKind::StructHasNoFields => write!(f, "Struct has no fields"),
            SignatureErrorKind::StructNotClosed => write!(f, "Struct was not closed"),
            SignatureErrorKind::DictEntryNotInsideArray => {
                write!(f, "Dict entry is not inside of an array")
            }
            SignatureErrorKind::DictKeyMustBeBasicType => {
                write!(f, "Dict key must be a basic type")
            }
            SignatureErrorKind::DictEntryNotClosed => {
                write!(f, "Dict entry must have exactly two fields")
            }
            SignatureErrorKind::NotSingleCompleteType => {
                write!(f, "Expected a single complete type")
            }
        }
    }
}

impl error::Error for SignatureError {}

/// Validate that `signature` is exactly one complete D-Bus type.
pub(crate) fn validate_single(signature: &str) -> Result<(), SignatureError> {
    use SignatureErrorKind::*;

    let bytes = signature.as_bytes();

    if bytes.is_empty() {
        return Err(SignatureError::new(Empty));
    }

    if bytes.len() > MAX_SIGNATURE {
        return Err(SignatureError::new(SignatureTooLong));
    }

    let mut validator = Validator {
        bytes,
        at: 0,
        arrays: 0,
        structs: 0,
    };

    validator.complete_type()?;

    if validator.at != bytes.len() {
        return Err(SignatureError::new(NotSingleCompleteType));
    }

    Ok(())
}

struct Validator<'a> {
    bytes: &'a [u8],
    at: usize,
    arrays: usize,
    structs: usize,
}

impl Validator<'_> {
    fn next(&mut self) -> Option<u8> {
        let b = *self.bytes.get(self.at)?;
        self.at += 1;
        Some(b)
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.at).copied()
    }

    fn basic_type(&mut self) -> Result<(), SignatureError> {
        match self.next() {
            Some(b'y' | b'b' | b'n' | b'q' | b'i' | b'u' | b'x' | b't' | b'd' | b's' | b'o'
            | b'g' | b'h') => Ok(()),
            Some(b'a' | b'(' | b'{' | b'v') => {
                Err(SignatureError::new(SignatureErrorKind::DictKeyMustBeBasicType))
            }
            Some(b) => Err(SignatureError::new(SignatureErrorKind::UnknownTypeCode(
                b as char,
            ))),
            None => Err(SignatureError::new(SignatureErrorKind::DictEntryNotClosed)),
        }
    }

    fn complete_type(&mut self) -> Result<(), SignatureError> {
        use SignatureErrorKind::*;

        let Some(b) = self.next() else {
            return Err(SignatureError::new(MissingArrayElementType));
        };

        match b {
            b'y' | b'b' | b'n' | b'q' | b'i' | b'u' | b'x' | b't' | b'd' | b's' | b'o' | b'g'
            | b'h' | b'v' => Ok(()),
            b'a' => {
                if self.arrays == MAX_CONTAINER_DEPTH {
                    return Err(SignatureError::new(ExceededMaximumArrayRecursion));
                }

                self.arrays += 1;

                if self.peek() == Some(b'{') {
                    self.at += 1;
                    self.basic_type()?;
                    self.complete_type()?;

                    if self.next() != Some(b'}') {
                        return Err(SignatureError::new(DictEntryNotClosed));
                    }
                } else {
                    self.complete_type()?;
                }

                self.arrays -= 1;
                Ok(())
            }
            b'(' => {
                if self.structs == MAX_CONTAINER_DEPTH {
                    return Err(SignatureError::new(ExceededMaximumStructRecursion));
                }

                self.structs += 1;

                if self.peek() == Some(b')') {
                    return Err(SignatureError::new(StructHasNoFields));
                }

                loop {
                    match self.peek() {
                        Some(b')') => {
                            self.at += 1;
                            break;
                        }
                        Some(_) => self.complete_type()?,
                        None => return Err(SignatureError::new(StructNotClosed)),
                    }
                }

                self.structs -= 1;
                Ok(())
            }
            b'{' => Err(SignatureError::new(DictEntryNotInsideArray)),
            b => Err(SignatureError::new(UnknownTypeCode(b as char))),
        }
    }
}
