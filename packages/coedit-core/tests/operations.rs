use coedit_core::{
    apply, compose, generate_delta, invert, normalize, transform, transform_pair, Error,
    Operation, OperationSeq,
};

const BASE: &str = "Hello World";

fn retain_insert(offset: usize, text: &str, len: usize) -> OperationSeq {
    normalize(vec![
        Operation::retain(offset),
        Operation::insert(text),
        Operation::retain(len - offset),
    ])
}

#[test]
fn generated_delta_inserts_the_new_word() {
    let delta = generate_delta(BASE, "Hello Beautiful World");
    assert!(delta
        .iter()
        .any(|op| matches!(op, Operation::Insert(text) if text == "Beautiful ")));
    assert_eq!(apply(BASE, &delta).unwrap(), "Hello Beautiful World");
}

#[test]
fn concurrent_inserts_at_one_offset_keep_both_words() {
    let beautiful = retain_insert(6, "Beautiful ", 11);
    let amazing = retain_insert(6, "Amazing ", 11);

    // Transform one against the other, then compose onto the edit it follows.
    let amazing_after = transform(&amazing, &beautiful).unwrap();
    let combined = compose(&beautiful, &amazing_after).unwrap();
    let merged = apply(BASE, &combined).unwrap();
    assert_eq!(merged, "Hello Amazing Beautiful World");

    let (a_prime, b_prime) = transform_pair(&beautiful, &amazing).unwrap();
    let via_a = apply(&apply(BASE, &beautiful).unwrap(), &b_prime).unwrap();
    let via_b = apply(&apply(BASE, &amazing).unwrap(), &a_prime).unwrap();
    assert_eq!(via_a, via_b);
    assert_eq!(via_a, "Hello Beautiful Amazing World");
}

#[test]
fn insert_before_deleted_word_survives() {
    let delete_world = normalize(vec![Operation::retain(6), Operation::delete(5)]);
    let insert_amazing = retain_insert(6, "Amazing ", 11);

    let transformed = transform(&insert_amazing, &delete_world).unwrap();
    let after_delete = apply(BASE, &delete_world).unwrap();
    assert_eq!(apply(&after_delete, &transformed).unwrap(), "Hello Amazing ");
}

#[test]
fn full_overlap_deletes_leave_an_empty_string() {
    let short = normalize(vec![Operation::delete(6), Operation::retain(5)]);
    let full = normalize(vec![Operation::delete(11)]);

    let (short_prime, full_prime) = transform_pair(&short, &full).unwrap();
    let via_short = apply(&apply(BASE, &short).unwrap(), &full_prime).unwrap();
    let via_full = apply(&apply(BASE, &full).unwrap(), &short_prime).unwrap();
    assert_eq!(via_short, "");
    assert_eq!(via_full, "");
}

#[test]
fn undo_round_trip_through_invert() {
    let delta = generate_delta(BASE, "Goodbye cruel World");
    let edited = apply(BASE, &delta).unwrap();
    let undo = invert(&delta, BASE).unwrap();
    assert_eq!(apply(&edited, &undo).unwrap(), BASE);
    let there_and_back = compose(&delta, &undo).unwrap();
    assert_eq!(apply(BASE, &there_and_back).unwrap(), BASE);
}

#[test]
fn applier_rejects_over_and_under_consumption() {
    let over = normalize(vec![Operation::retain(12)]);
    assert!(matches!(apply(BASE, &over), Err(Error::OutOfRange { .. })));

    let under = normalize(vec![Operation::retain(3), Operation::insert("!")]);
    assert_eq!(
        apply(BASE, &under),
        Err(Error::LengthMismatch {
            expected: 11,
            actual: 3
        })
    );
}
