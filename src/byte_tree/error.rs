use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ByteTreeError {
    #[error("unexpected end of input")]
    Truncated,

    #[error("unknown tag byte {0:#04x}")]
    UnknownTag(u8),

    #[error("{0} trailing bytes after byte tree")]
    TrailingBytes(usize),

    #[error("byte tree nested deeper than {0} levels")]
    TooDeep(usize),

    #[error("expected a leaf, found a node")]
    ExpectedLeaf,

    #[error("expected a node, found a leaf")]
    ExpectedNode,

    #[error("expected {expected} children, found {actual}")]
    WrongArity { expected: usize, actual: usize },

    #[error("{0} entries do not fit a u32 length prefix")]
    TooLong(usize),

    #[error("invalid encoding of {0}")]
    InvalidValue(&'static str),
}
