use rand::RngCore;
use thiserror::Error;

use crate::byte_tree::{ByteTree, ByteTreeError, FromByteTree, ToByteTree};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PermutationError {
    #[error("index {0} is out of range for a permutation of size {1}")]
    OutOfRange(usize, usize),

    #[error("index {0} appears more than once")]
    Duplicate(usize),
}

/// Permutation of `0..n`, stored together with its inverse.
///
/// Applying it moves the element at position `i` to position `table[i]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Permutation {
    table: Vec<usize>,
    inverse: Vec<usize>,
}

impl Permutation {
    pub fn identity(n: usize) -> Self {
        Self {
            table: (0..n).collect(),
            inverse: (0..n).collect(),
        }
    }

    pub fn from_table(table: Vec<usize>) -> Result<Self, PermutationError> {
        let n = table.len();
        let mut inverse = vec![usize::MAX; n];
        for (i, &target) in table.iter().enumerate() {
            if target >= n {
                return Err(PermutationError::OutOfRange(target, n));
            }
            if inverse[target] != usize::MAX {
                return Err(PermutationError::Duplicate(target));
            }
            inverse[target] = i;
        }
        Ok(Self { table, inverse })
    }

    /// Fisher-Yates with every index drawn from `log2(n) + statdist` random bits.
    pub fn random<R: RngCore + ?Sized>(n: usize, rng: &mut R, statdist: u32) -> Self {
        let mut table: Vec<usize> = (0..n).collect();
        let draw_len = ((usize::BITS - n.leading_zeros()) + statdist).div_ceil(8) as usize;
        let mut bytes = vec![0u8; draw_len];
        for i in (1..n).rev() {
            rng.fill_bytes(&mut bytes);
            let bound = (i + 1) as u128;
            let j = bytes
                .iter()
                .fold(0u128, |acc, b| ((acc << 8) | *b as u128) % bound) as usize;
            table.swap(i, j);
        }
        let mut inverse = vec![0usize; n];
        for (i, &target) in table.iter().enumerate() {
            inverse[target] = i;
        }
        Self { table, inverse }
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    pub fn map(&self, i: usize) -> usize {
        self.table[i]
    }

    pub fn inverse(&self) -> Permutation {
        Self {
            table: self.inverse.clone(),
            inverse: self.table.clone(),
        }
    }

    /// `out[table[i]] = values[i]`.
    pub fn apply<T: Clone>(&self, values: &[T]) -> Vec<T> {
        debug_assert_eq!(values.len(), self.len());
        self.inverse.iter().map(|&i| values[i].clone()).collect()
    }

    /// `out[i] = values[table[i]]`, undoing [`Permutation::apply`].
    pub fn apply_inverse<T: Clone>(&self, values: &[T]) -> Vec<T> {
        debug_assert_eq!(values.len(), self.len());
        self.table.iter().map(|&i| values[i].clone()).collect()
    }
}

impl ToByteTree for Permutation {
    fn to_byte_tree(&self) -> ByteTree {
        ByteTree::node(
            self.table
                .iter()
                .map(|&i| ByteTree::from_u32(i as u32))
                .collect(),
        )
    }
}

impl FromByteTree for Permutation {
    fn from_byte_tree(tree: &ByteTree) -> Result<Self, ByteTreeError> {
        let table = tree
            .children()?
            .iter()
            .map(|child| child.as_u32().map(|i| i as usize))
            .collect::<Result<Vec<_>, _>>()?;
        Permutation::from_table(table).map_err(|_| ByteTreeError::InvalidValue("permutation"))
    }
}
