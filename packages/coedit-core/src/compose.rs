use crate::error::{Error, Result};
use crate::ops::{split_chars, Operation, OperationSeq};

/// Merge two consecutive edits into one.
///
/// `b` must be relative to the text produced by `a`; the result is relative to `a`'s base
/// and satisfies `apply(base, compose(a, b)) == apply(apply(base, a), b)`.
pub fn compose(a: &OperationSeq, b: &OperationSeq) -> Result<OperationSeq> {
    if a.is_empty() {
        return Ok(b.clone());
    }
    if b.is_empty() {
        return Ok(a.clone());
    }
    if a.target_len() != b.base_len() {
        return Err(Error::LengthMismatch {
            expected: a.target_len(),
            actual: b.base_len(),
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
            // Text deleted by `a` never reaches `b`.
            (Some(Operation::Delete(n)), rest_b) => {
                out.delete(n);
                op_a = ops_a.next();
                op_b = rest_b;
            }
            (rest_a, Some(Operation::Insert(text))) => {
                out.insert(&text);
                op_a = rest_a;
                op_b = ops_b.next();
            }
            (None, Some(op)) => {
                out.push(op);
                op_b = ops_b.next();
            }
            (Some(op), None) => {
                out.push(op);
                op_a = ops_a.next();
            }
            (Some(Operation::Retain(i)), Some(Operation::Retain(j))) => {
                let n = i.min(j);
                out.retain(n);
                op_a = remainder(Operation::Retain(i - n), &mut ops_a);
                op_b = remainder(Operation::Retain(j - n), &mut ops_b);
            }
            (Some(Operation::Retain(i)), Some(Operation::Delete(j))) => {
                let n = i.min(j);
                out.delete(n);
                op_a = remainder(Operation::Retain(i - n), &mut ops_a);
                op_b = remainder(Operation::Delete(j - n), &mut ops_b);
            }
            // `b` walks over text inserted by `a` like any other text.
            (Some(Operation::Insert(text)), Some(Operation::Retain(j))) => {
                let n = text.chars().count().min(j);
                let (kept, rest) = split_chars(&text, n);
                out.insert(kept);
                op_a = remainder(Operation::Insert(rest.to_owned()), &mut ops_a);
                op_b = remainder(Operation::Retain(j - n), &mut ops_b);
            }
            (Some(Operation::Insert(text)), Some(Operation::Delete(j))) => {
                let n = text.chars().count().min(j);
                let (_, rest) = split_chars(&text, n);
                op_a = remainder(Operation::Insert(rest.to_owned()), &mut ops_a);
                op_b = remainder(Operation::Delete(j - n), &mut ops_b);
            }
        }
    }

    Ok(out)
}

/// Fold a run of consecutive edits into a single edit.
pub fn compose_all<'a, I>(seqs: I) -> Result<OperationSeq>
where
    I: IntoIterator<Item = &'a OperationSeq>,
{
    seqs.into_iter()
        .try_fold(OperationSeq::new(), |acc, next| compose(&acc, next))
}

/// Keep the unconsumed part of an operation, or move on to the next one.
pub(crate) fn remainder<I>(op: Operation, iter: &mut I) -> Option<Operation>
where
    I: Iterator<Item = Operation>,
{
    if op.is_empty() {
        iter.next()
    } else {
        Some(op)
    }
}
