use std::fmt;

#[cfg(feature = "serde")]
use serde::Deserialize;

/// A single edit primitive, interpreted against a cursor walking the base text.
///
/// Counts are measured in `char`s (Unicode scalar values).
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize),
    serde(try_from = "crate::wire::WireOperation")
)]
pub enum Operation {
    /// Copy the next `n` chars of the base text.
    Retain(usize),
    /// Emit text without advancing the cursor.
    Insert(String),
    /// Skip the next `n` chars of the base text.
    Delete(usize),
}

impl Operation {
    pub fn retain(n: usize) -> Self {
        Operation::Retain(n)
    }

    pub fn insert(text: impl Into<String>) -> Self {
        Operation::Insert(text.into())
    }

    pub fn delete(n: usize) -> Self {
        Operation::Delete(n)
    }

    /// Number of chars this operation retains, inserts, or deletes.
    pub fn len(&self) -> usize {
        match self {
            Operation::Retain(n) | Operation::Delete(n) => *n,
            Operation::Insert(text) => text.chars().count(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Operation::Retain(n) | Operation::Delete(n) => *n == 0,
            Operation::Insert(text) => text.is_empty(),
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Retain(n) => write!(f, "retain({n})"),
            Operation::Insert(text) => write!(f, "insert({text:?})"),
            Operation::Delete(n) => write!(f, "delete({n})"),
        }
    }
}

/// An ordered, normalized list of operations describing one edit of a base text.
///
/// Invariants maintained by every constructor and builder method:
/// - no zero-length operations;
/// - no two adjacent operations of the same kind;
/// - an `Insert` adjacent to a `Delete` is always placed first.
///
/// The empty sequence is the identity edit and applies to a text of any length.
/// Merged counts saturate at `usize::MAX`; such a sequence fits no real text.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(Deserialize),
    serde(try_from = "Vec<crate::wire::WireOperation>")
)]
pub struct OperationSeq {
    ops: Vec<Operation>,
}

impl OperationSeq {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn retain(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        if let Some(Operation::Retain(last)) = self.ops.last_mut() {
            *last = last.saturating_add(n);
        } else {
            self.ops.push(Operation::Retain(n));
        }
        self
    }

    pub fn insert(&mut self, text: &str) -> &mut Self {
        if text.is_empty() {
            return self;
        }
        match self.ops.as_mut_slice() {
            [.., Operation::Insert(last)] | [.., Operation::Insert(last), Operation::Delete(_)] => {
                last.push_str(text);
                return self;
            }
            _ => {}
        }
        let insert = Operation::Insert(text.to_owned());
        match self.ops.last() {
            Some(Operation::Delete(_)) => {
                let at = self.ops.len() - 1;
                self.ops.insert(at, insert);
            }
            _ => self.ops.push(insert),
        }
        self
    }

    pub fn delete(&mut self, n: usize) -> &mut Self {
        if n == 0 {
            return self;
        }
        if let Some(Operation::Delete(last)) = self.ops.last_mut() {
            *last = last.saturating_add(n);
        } else {
            self.ops.push(Operation::Delete(n));
        }
        self
    }

    /// Append any operation, merging it into the tail when possible.
    pub fn push(&mut self, op: Operation) -> &mut Self {
        match op {
            Operation::Retain(n) => self.retain(n),
            Operation::Insert(text) => self.insert(&text),
            Operation::Delete(n) => self.delete(n),
        }
    }

    pub fn ops(&self) -> &[Operation] {
        &self.ops
    }

    pub fn into_ops(self) -> Vec<Operation> {
        self.ops
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Operation> {
        self.ops.iter()
    }

    /// Number of operations (not chars).
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Length of the text this sequence consumes.
    pub fn base_len(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                Operation::Retain(n) | Operation::Delete(n) => *n,
                Operation::Insert(_) => 0,
            })
            .fold(0, usize::saturating_add)
    }

    /// Length of the text this sequence produces.
    pub fn target_len(&self) -> usize {
        self.ops
            .iter()
            .map(|op| match op {
                Operation::Retain(n) => *n,
                Operation::Insert(text) => text.chars().count(),
                Operation::Delete(_) => 0,
            })
            .fold(0, usize::saturating_add)
    }

    /// True when applying the sequence leaves any base text unchanged.
    pub fn is_noop(&self) -> bool {
        self.ops.iter().all(|op| matches!(op, Operation::Retain(_)))
    }

    /// Whether this sequence can be applied to a text of `len` chars.
    pub fn fits(&self, len: usize) -> bool {
        self.is_empty() || self.base_len() == len
    }
}

/// Merge adjacent same-kind operations and drop empty ones.
pub fn normalize<I>(ops: I) -> OperationSeq
where
    I: IntoIterator<Item = Operation>,
{
    ops.into_iter().collect()
}

impl FromIterator<Operation> for OperationSeq {
    fn from_iter<T: IntoIterator<Item = Operation>>(iter: T) -> Self {
        let mut seq = OperationSeq::new();
        for op in iter {
            seq.push(op);
        }
        seq
    }
}

impl Extend<Operation> for OperationSeq {
    fn extend<T: IntoIterator<Item = Operation>>(&mut self, iter: T) {
        for op in iter {
            self.push(op);
        }
    }
}

impl From<Vec<Operation>> for OperationSeq {
    fn from(ops: Vec<Operation>) -> Self {
        normalize(ops)
    }
}

impl From<OperationSeq> for Vec<Operation> {
    fn from(seq: OperationSeq) -> Self {
        seq.ops
    }
}

impl<'a> IntoIterator for &'a OperationSeq {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.iter()
    }
}

impl IntoIterator for OperationSeq {
    type Item = Operation;
    type IntoIter = std::vec::IntoIter<Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.ops.into_iter()
    }
}

impl fmt::Display for OperationSeq {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{op}")?;
        }
        f.write_str("]")
    }
}

/// Split `text` after its first `n` chars.
pub(crate) fn split_chars(text: &str, n: usize) -> (&str, &str) {
    match text.char_indices().nth(n) {
        Some((idx, _)) => text.split_at(idx),
        None => (text, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_adjacent_same_kind_operations() {
        let seq = normalize(vec![
            Operation::retain(2),
            Operation::retain(3),
            Operation::insert("ab"),
            Operation::insert("c"),
            Operation::delete(1),
            Operation::delete(4),
        ]);
        assert_eq!(
            seq.ops(),
            &[
                Operation::Retain(5),
                Operation::Insert("abc".into()),
                Operation::Delete(5),
            ]
        );
    }

    #[test]
    fn drops_zero_length_operations() {
        let seq = normalize(vec![
            Operation::retain(0),
            Operation::insert(""),
            Operation::delete(0),
        ]);
        assert!(seq.is_empty());

        let seq = normalize(vec![
            Operation::retain(1),
            Operation::delete(0),
            Operation::retain(1),
        ]);
        assert_eq!(seq.ops(), &[Operation::Retain(2)]);
    }

    #[test]
    fn insert_is_placed_before_adjacent_delete() {
        let seq = normalize(vec![
            Operation::retain(1),
            Operation::delete(2),
            Operation::insert("x"),
            Operation::delete(1),
            Operation::insert("y"),
        ]);
        assert_eq!(
            seq.ops(),
            &[
                Operation::Retain(1),
                Operation::Insert("xy".into()),
                Operation::Delete(3),
            ]
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        let once = normalize(vec![
            Operation::delete(1),
            Operation::insert("a"),
            Operation::retain(2),
            Operation::retain(1),
            Operation::insert("b"),
        ]);
        let twice = normalize(once.clone().into_ops());
        assert_eq!(once, twice);
    }

    #[test]
    fn lengths_count_chars() {
        let seq = normalize(vec![
            Operation::retain(2),
            Operation::insert("héllo"),
            Operation::delete(3),
        ]);
        assert_eq!(seq.base_len(), 5);
        assert_eq!(seq.target_len(), 7);
        assert!(!seq.is_noop());
        assert!(normalize(vec![Operation::retain(4)]).is_noop());
    }

    #[test]
    fn huge_counts_saturate_instead_of_overflowing() {
        let seq = normalize(vec![
            Operation::retain(usize::MAX),
            Operation::retain(usize::MAX),
            Operation::insert("x"),
            Operation::delete(usize::MAX),
            Operation::delete(1),
        ]);
        assert_eq!(
            seq.ops(),
            &[
                Operation::Retain(usize::MAX),
                Operation::Insert("x".into()),
                Operation::Delete(usize::MAX),
            ]
        );
        assert_eq!(seq.base_len(), usize::MAX);
        assert_eq!(seq.target_len(), usize::MAX);
        assert!(!seq.fits(3));
    }

    #[test]
    fn split_chars_respects_char_boundaries() {
        assert_eq!(split_chars("añb", 2), ("añ", "b"));
        assert_eq!(split_chars("ab", 5), ("ab", ""));
        assert_eq!(split_chars("ab", 0), ("", "ab"));
    }

    #[test]
    fn display_lists_operations() {
        let seq = normalize(vec![Operation::retain(1), Operation::insert("x")]);
        assert_eq!(seq.to_string(), "[retain(1), insert(\"x\")]");
    }
}
