use crate::compose::remainder;
use crate::error::{Error, Result};
use crate::ops::{Operation, OperationSeq};

/// Which side's insert lands first when both sequences insert at the same offset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Side {
    /// The sequence being transformed wins ties.
    #[default]
    Left,
    /// The concurrent sequence wins ties.
    Right,
}

/// Adjust `a` so it applies after the concurrent edit `b` (both share one base text).
///
/// Inserts in `a` are never suppressed and win ties against inserts in `b`; text deleted
/// by both sides is deleted once.
pub fn transform(a: &OperationSeq, b: &OperationSeq) -> Result<OperationSeq> {
    transform_with(a, b, Side::Left)
}

/// Transform both concurrent edits against each other.
///
/// Returns `(a', b')` with `apply(apply(T, a), b') == apply(apply(T, b), a')`; on an insert
/// tie `a`'s text comes first on both paths.
pub fn transform_pair(
    a: &OperationSeq,
    b: &OperationSeq,
) -> Result<(OperationSeq, OperationSeq)> {
    Ok((
        transform_with(a, b, Side::Left)?,
        transform_with(b, a, Side::Right)?,
    ))
}

pub fn transform_with(a: &OperationSeq, b: &OperationSeq, side: Side) -> Result<OperationSeq> {
    if b.is_empty() {
        return Ok(a.clone());
    }
    if a.is_empty() {
        return Ok(OperationSeq::new());
    }
    if a.base_len() != b.base_len() {
        return Err(Error::LengthMismatch {
            expected: b.base_len(),
            actual: a.base_len(),
        });
    }

    let mut out = OperationSeq::new();
    let mut ops_a = a.iter().cloned();
    let mut ops_b = b.iter().cloned();
    let mut op_a = ops_a.next();
    let mut op_b = ops_b.next();

    loop {
        match (op_a.take(), op_b.take()) {
            (None, None) => break,
            (Some(Operation::Insert(mine)), Some(Operation::Insert(theirs)))
                if side == Side::Right =>
            {
                out.retain(theirs.chars().count());
                op_a = Some(Operation::Insert(mine));
                op_b = ops_b.next();
            }
            (Some(Operation::Insert(text)), rest_b) => {
                out.insert(&text);
                op_a = ops_a.next();
                op_b = rest_b;
            }
            (rest_a, Some(Operation::Insert(text))) => {
                out.retain(text.chars().count());
                op_a = rest_a;
                op_b = ops_b.next();
            }
            // Leftover retains/deletes on one side have nothing to act on.
            (None, Some(_)) => op_b = ops_b.next(),
            (Some(_), None) => op_a = ops_a.next(),
            (Some(Operation::Retain(i)), Some(Operation::Retain(j))) => {
                let n = i.min(j);
                out.retain(n);
                op_a = remainder(Operation::Retain(i - n), &mut ops_a);
                op_b = remainder(Operation::Retain(j - n), &mut ops_b);
            }
            (Some(Operation::Delete(i)), Some(Operation::Retain(j))) => {
                let n = i.min(j);
                out.delete(n);
                op_a = remainder(Operation::Delete(i - n), &mut ops_a);
                op_b = remainder(Operation::Retain(j - n), &mut ops_b);
            }
            (Some(Operation::Retain(i)), Some(Operation::Delete(j))) => {
                let n = i.min(j);
                op_a = remainder(Operation::Retain(i - n), &mut ops_a);
                op_b = remainder(Operation::Delete(j - n), &mut ops_b);
            }
            (Some(Operation::Delete(i)), Some(Operation::Delete(j))) => {
                let n = i.min(j);
                op_a = remainder(Operation::Delete(i - n), &mut ops_a);
                op_b = remainder(Operation::Delete(j - n), &mut ops_b);
            }
        }
    }

    Ok(out)
}
