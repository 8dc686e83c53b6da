use crate::apply::check_span;
use crate::error::{Error, Result};
use crate::ops::{Operation, OperationSeq};

/// Build the edit that undoes `ops`, given the text `ops` was applied to.
///
/// `apply(apply(original, ops), invert(ops, original)) == original`.
pub fn invert(ops: &OperationSeq, original: &str) -> Result<OperationSeq> {
    let mut out = OperationSeq::new();
    if ops.is_empty() {
        return Ok(out);
    }

    let len = original.chars().count();
    let mut chars = original.chars();
    let mut cursor = 0usize;

    for op in ops {
        match op {
            Operation::Retain(n) => {
                check_span(cursor, *n, len)?;
                chars.by_ref().take(*n).for_each(drop);
                out.retain(*n);
                cursor += n;
            }
            Operation::Insert(text) => {
                out.delete(text.chars().count());
            }
            Operation::Delete(n) => {
                check_span(cursor, *n, len)?;
                let removed: String = chars.by_ref().take(*n).collect();
                out.insert(&removed);
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply;
    use crate::delta::generate_delta;
    use crate::ops::normalize;

    #[test]
    fn inverse_restores_original() {
        let original = "Hello World";
        let ops = normalize(vec![
            Operation::retain(6),
            Operation::insert("Amazing "),
            Operation::delete(5),
        ]);
        let edited = apply(original, &ops).unwrap();
        assert_eq!(edited, "Hello Amazing ");

        let undo = invert(&ops, original).unwrap();
        assert_eq!(
            undo.ops(),
            &[
                Operation::Retain(6),
                Operation::Insert("World".into()),
                Operation::Delete(8),
            ]
        );
        assert_eq!(apply(&edited, &undo).unwrap(), original);
    }

    #[test]
    fn inverse_of_generated_delta() {
        for (old, new) in [("", "abc"), ("abc", ""), ("añb", "aüb"), ("same", "same")] {
            let delta = generate_delta(old, new);
            let undo = invert(&delta, old).unwrap();
            assert_eq!(apply(new, &undo).unwrap(), old);
        }
    }

    #[test]
    fn rejects_sequence_that_does_not_fit() {
        let ops = normalize(vec![Operation::retain(2), Operation::delete(3)]);
        assert_eq!(
            invert(&ops, "abc"),
            Err(Error::OutOfRange {
                offset: 2,
                count: 3,
                len: 3
            })
        );
        let ops = normalize(vec![Operation::retain(1)]);
        assert!(matches!(
            invert(&ops, "abc"),
            Err(Error::LengthMismatch { .. })
        ));
    }
}
