use crate::error::{Error, Result};
use crate::ops::{Operation, OperationSeq};

/// Replay `ops` over `base`.
///
/// Every `Retain`/`Delete` must stay within `base`, and the sequence must consume all of
/// it: unconsumed trailing text is an error rather than being copied through.
pub fn apply(base: &str, ops: &OperationSeq) -> Result<String> {
    if ops.is_empty() {
        return Ok(base.to_owned());
    }

    let len = base.chars().count();
    let mut chars = base.chars();
    let mut cursor = 0usize;
    let mut out = String::with_capacity(base.len());

    for op in ops {
        match op {
            Operation::Retain(n) => {
                check_span(cursor, *n, len)?;
                out.extend(chars.by_ref().take(*n));
                cursor += n;
            }
            Operation::Insert(text) => out.push_str(text),
            Operation::Delete(n) => {
                check_span(cursor, *n, len)?;
                chars.by_ref().take(*n).for_each(drop);
                cursor += n;
            }
        }
    }

    if cursor != len {
        return Err(Error::LengthMismatch {
            expected: len,
            actual: cursor,
        });
    }
    Ok(out)
}

pub(crate) fn check_span(offset: usize, count: usize, len: usize) -> Result<()> {
    match offset.checked_add(count) {
        Some(end) if end <= len => Ok(()),
        _ => Err(Error::OutOfRange { offset, count, len }),
    }
}
