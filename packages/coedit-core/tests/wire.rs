#![cfg(feature = "serde")]

use coedit_core::{AuthorId, Operation, OperationSeq, VersionId, VersionNode, WireOperation};

#[test]
fn version_node_json_uses_tagged_operations() {
    let node = VersionNode {
        version_id: VersionId::from("v1"),
        parent_id: None,
        timestamp: 1_700_000_000_000,
        author_id: AuthorId::from("ada"),
        operations: vec![Operation::retain(6), Operation::insert("Beautiful ")].into(),
        seq: 0,
    };

    let json = serde_json::to_value(&node).unwrap();
    assert_eq!(json["version_id"], "v1");
    assert_eq!(json["operations"][0]["type"], "retain");
    assert_eq!(json["operations"][0]["count"], 6);
    assert_eq!(json["operations"][1]["text"], "Beautiful ");

    let back: VersionNode = serde_json::from_value(json).unwrap();
    assert_eq!(back, node);
}

#[test]
fn deserializing_a_bad_record_fails() {
    let err = serde_json::from_str::<OperationSeq>(r#"[{"type":"retain","count":-1}]"#);
    assert!(err.is_err());

    let wire = WireOperation {
        kind: "delete".into(),
        count: Some(3),
        text: None,
    };
    assert_eq!(Operation::try_from(wire).unwrap(), Operation::Delete(3));
}
