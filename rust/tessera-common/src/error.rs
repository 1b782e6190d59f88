use thiserror::Error;

#[derive(Debug, Error)]
#[error(transparent)]
pub struct Error(Box<ErrorKind>);

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.0.as_ref()
    }

    pub fn into_kind(self) -> ErrorKind {
        *self.0
    }

    /// An attempt to read past the end of a bounded buffer. Always fatal for
    /// the current file or page: it indicates truncated or adversarial input.
    #[cold]
    pub fn out_of_buffer(requested: usize, remaining: usize) -> Error {
        Error(
            ErrorKind::OutOfBuffer {
                requested,
                remaining,
            }
            .into(),
        )
    }

    #[cold]
    pub fn invalid_encoding(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidEncoding {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    #[cold]
    pub fn invalid_utf8(context: impl Into<String>, bytes: &[u8]) -> Error {
        Error(
            ErrorKind::InvalidUtf8 {
                context: context.into(),
                bytes: bytes.to_vec(),
            }
            .into(),
        )
    }

    #[cold]
    pub fn unsupported_codec(codec: impl Into<String>) -> Error {
        Error(
            ErrorKind::UnsupportedCodec {
                codec: codec.into(),
            }
            .into(),
        )
    }

    #[cold]
    pub fn schema_mismatch(element: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::SchemaMismatch {
                element: element.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    #[cold]
    pub fn invalid_arg(name: impl Into<String>, message: impl Into<String>) -> Error {
        Error(
            ErrorKind::InvalidArgument {
                name: name.into(),
                message: message.into(),
            }
            .into(),
        )
    }

    #[cold]
    pub fn not_implemented(message: impl Into<String>) -> Error {
        Error(
            ErrorKind::NotImplemented {
                message: message.into(),
            }
            .into(),
        )
    }

    #[cold]
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Error {
        Error(
            ErrorKind::Io {
                context: context.into(),
                source,
            }
            .into(),
        )
    }
}

#[derive(Debug, Error)]
pub enum ErrorKind {
    #[error("attempt to read {requested} bytes with {remaining} remaining in buffer")]
    OutOfBuffer { requested: usize, remaining: usize },

    #[error("invalid encoding in '{element}': {message}")]
    InvalidEncoding { element: String, message: String },

    #[error("invalid UTF-8 string in {context}: bytes {bytes:?}")]
    InvalidUtf8 { context: String, bytes: Vec<u8> },

    #[error("unsupported compression codec '{codec}'")]
    UnsupportedCodec { codec: String },

    #[error("schema mismatch in '{element}': {message}")]
    SchemaMismatch { element: String, message: String },

    #[error("invalid argument {name}: {message}")]
    InvalidArgument { name: String, message: String },

    #[error("not yet implemented: {message}")]
    NotImplemented { message: String },

    #[error("IO error for '{context}': {source}")]
    Io {
        context: String,
        source: std::io::Error,
    },
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Self {
        Error(kind.into())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::io("", e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_buffer_message() {
        let e = Error::out_of_buffer(16, 3);
        assert!(e.to_string().contains("16"));
        assert!(e.to_string().contains("3"));
        assert!(matches!(e.kind(), ErrorKind::OutOfBuffer { .. }));
    }

    #[test]
    fn test_invalid_utf8_carries_bytes() {
        let e = Error::invalid_utf8("STRING column", &[0xff, 0xfe]);
        match e.into_kind() {
            ErrorKind::InvalidUtf8 { bytes, .. } => assert_eq!(bytes, vec![0xff, 0xfe]),
            other => panic!("unexpected kind: {other:?}"),
        }
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let e: Error = io.into();
        assert!(matches!(e.kind(), ErrorKind::Io { .. }));
    }
}
