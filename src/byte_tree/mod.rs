//! Length-prefixed tree encoding used for every message exchanged between parties.
//!
//! A leaf is `0x01 || u32_be(len) || bytes`, a node is `0x00 || u32_be(count)`
//! followed by the encodings of its children.

mod error;

pub use error::ByteTreeError;

use ark_serialize::{CanonicalDeserialize, CanonicalSerialize};

use crate::crypto::canonical_serialize_bytes;

const LOG_TARGET: &str = "verimix::byte_tree";

const NODE_TAG: u8 = 0x00;
const LEAF_TAG: u8 = 0x01;
const MAX_DEPTH: usize = 64;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum ByteTree {
    Leaf(Vec<u8>),
    Node(Vec<ByteTree>),
}

pub trait ToByteTree {
    fn to_byte_tree(&self) -> ByteTree;
}

pub trait FromByteTree: Sized {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError>;
}

impl ByteTree {
    pub fn leaf(bytes: impl Into<Vec<u8>>) -> Self {
        ByteTree::Leaf(bytes.into())
    }

    pub fn node(children: Vec<ByteTree>) -> Self {
        ByteTree::Node(children)
    }

    pub fn empty() -> Self {
        ByteTree::Node(Vec::new())
    }

    pub fn from_u32(value: u32) -> Self {
        ByteTree::Leaf(value.to_be_bytes().to_vec())
    }

    pub fn as_u32(&self) -> Result<u32, ByteTreeError> {
        let bytes: [u8; 4] = self
            .as_leaf()?
            .try_into()
            .map_err(|_| ByteTreeError::InvalidValue("u32"))?;
        Ok(u32::from_be_bytes(bytes))
    }

    pub fn as_leaf(&self) -> Result<&[u8], ByteTreeError> {
        match self {
            ByteTree::Leaf(bytes) => Ok(bytes),
            ByteTree::Node(_) => Err(ByteTreeError::ExpectedLeaf),
        }
    }

    pub fn children(&self) -> Result<&[ByteTree], ByteTreeError> {
        match self {
            ByteTree::Node(children) => Ok(children),
            ByteTree::Leaf(_) => Err(ByteTreeError::ExpectedNode),
        }
    }

    /// Children of a node that must have exactly `expected` of them.
    pub fn children_exact(&self, expected: usize) -> Result<&[ByteTree], ByteTreeError> {
        let children = self.children()?;
        if children.len() != expected {
            return Err(ByteTreeError::WrongArity {
                expected,
                actual: children.len(),
            });
        }
        Ok(children)
    }

    pub fn encoded_len(&self) -> usize {
        match self {
            ByteTree::Leaf(bytes) => 5 + bytes.len(),
            ByteTree::Node(children) => 5 + children.iter().map(Self::encoded_len).sum::<usize>(),
        }
    }

    /// Fails only for a leaf or node too large for its `u32` length prefix.
    pub fn to_bytes(&self) -> Result<Vec<u8>, ByteTreeError> {
        let mut out = Vec::with_capacity(self.encoded_len());
        self.write_to(&mut out)?;
        Ok(out)
    }

    fn write_to(&self, out: &mut Vec<u8>) -> Result<(), ByteTreeError> {
        match self {
            ByteTree::Leaf(bytes) => {
                out.push(LEAF_TAG);
                write_len(out, bytes.len())?;
                out.extend_from_slice(bytes);
            }
            ByteTree::Node(children) => {
                out.push(NODE_TAG);
                write_len(out, children.len())?;
                for child in children {
                    child.write_to(out)?;
                }
            }
        }
        Ok(())
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ByteTreeError> {
        let mut cursor = 0usize;
        let tree = Self::parse(bytes, &mut cursor, 0)?;
        if cursor != bytes.len() {
            return Err(ByteTreeError::TrailingBytes(bytes.len() - cursor));
        }
        Ok(tree)
    }

    fn parse(bytes: &[u8], cursor: &mut usize, depth: usize) -> Result<Self, ByteTreeError> {
        if depth > MAX_DEPTH {
            return Err(ByteTreeError::TooDeep(MAX_DEPTH));
        }
        let tag = *bytes.get(*cursor).ok_or(ByteTreeError::Truncated)?;
        *cursor += 1;
        let len = read_u32(bytes, cursor)? as usize;
        match tag {
            LEAF_TAG => {
                let end = cursor.checked_add(len).ok_or(ByteTreeError::Truncated)?;
                let data = bytes.get(*cursor..end).ok_or(ByteTreeError::Truncated)?;
                *cursor = end;
                Ok(ByteTree::Leaf(data.to_vec()))
            }
            NODE_TAG => {
                // Every child takes at least five bytes; bound the allocation by what is left.
                let remaining = bytes.len() - *cursor;
                if len > remaining / 5 {
                    return Err(ByteTreeError::Truncated);
                }
                let mut children = Vec::with_capacity(len);
                for _ in 0..len {
                    children.push(Self::parse(bytes, cursor, depth + 1)?);
                }
                Ok(ByteTree::Node(children))
            }
            other => Err(ByteTreeError::UnknownTag(other)),
        }
    }
}

fn write_len(out: &mut Vec<u8>, len: usize) -> Result<(), ByteTreeError> {
    let len = u32::try_from(len).map_err(|_| ByteTreeError::TooLong(len))?;
    out.extend_from_slice(&len.to_be_bytes());
    Ok(())
}

fn read_u32(bytes: &[u8], cursor: &mut usize) -> Result<u32, ByteTreeError> {
    let end = *cursor + 4;
    let raw: [u8; 4] = bytes
        .get(*cursor..end)
        .ok_or(ByteTreeError::Truncated)?
        .try_into()
        .map_err(|_| ByteTreeError::Truncated)?;
    *cursor = end;
    Ok(u32::from_be_bytes(raw))
}

impl ToByteTree for ByteTree {
    fn to_byte_tree(&self) -> ByteTree {
        self.clone()
    }
}

impl FromByteTree for ByteTree {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        Ok(tree.clone())
    }
}

/// Leaf holding the compressed canonical encoding of an algebraic value.
pub fn element_leaf<T: CanonicalSerialize>(value: &T) -> ByteTree {
    ByteTree::Leaf(canonical_serialize_bytes(value))
}

/// Decode a leaf written by [`element_leaf`], validating group membership.
pub fn element_from_leaf<T: CanonicalDeserialize>(tree: &ByteTree) -> Result<T, ByteTreeError> {
    let bytes = tree.as_leaf()?;
    T::deserialize_compressed(bytes).map_err(|_| ByteTreeError::InvalidValue("algebraic element"))
}

pub fn elements_node<T: CanonicalSerialize>(values: &[T]) -> ByteTree {
    ByteTree::Node(values.iter().map(element_leaf).collect())
}

/// Decode a node of element leaves, requiring `expected_len` entries when given.
pub fn elements_from_node<T: CanonicalDeserialize>(
    tree: &ByteTree,
    expected_len: Option<usize>,
) -> Result<Vec<T>, ByteTreeError> {
    let children = match expected_len {
        Some(expected) => tree.children_exact(expected)?,
        None => tree.children()?,
    };
    children.iter().map(element_from_leaf).collect()
}

/// Parse peer-supplied data, substituting `default` when it is malformed.
///
/// Used wherever a corrupt message must not abort the protocol but only make
/// the corresponding check fail.
pub fn parse_or_default<T>(
    result: Result<T, ByteTreeError>,
    default: impl FnOnce() -> T,
    what: &str,
) -> T {
    match result {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(target: LOG_TARGET, %err, what, "Malformed peer data, substituting default");
            default()
        }
    }
}
