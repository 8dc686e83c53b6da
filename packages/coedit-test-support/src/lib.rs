//! Backend-agnostic conformance checks for [`VersionStore`] implementations.
//!
//! Every check takes a room prefix so suites can share one database; callers pass a
//! unique prefix per run (or reset the rooms beforehand).

use coedit_core::{
    generate_delta, AuthorId, LogicalClock, RoomId, VersionGraph, VersionId,
    VersionNode, VersionStore,
};

/// A parent-linked chain of nodes whose texts are `texts` in order.
pub fn linear_history(texts: &[&str]) -> Vec<VersionNode> {
    let mut nodes = Vec::with_capacity(texts.len());
    let mut prev = "";
    let mut parent: Option<VersionId> = None;
    for (seq, text) in texts.iter().copied().enumerate() {
        let id = VersionId::new(format!("v{seq}"));
        nodes.push(VersionNode {
            version_id: id.clone(),
            parent_id: parent.replace(id),
            timestamp: 1_000 + seq as i64,
            author_id: AuthorId::from("conformance"),
            operations: generate_delta(prev, text),
            seq: seq as u64,
        });
        prev = text;
    }
    nodes
}

fn room(prefix: &str, name: &str) -> RoomId {
    RoomId::new(format!("{prefix}-{name}"))
}

pub fn append_then_load_preserves_seq_order<S: VersionStore>(store: &mut S, prefix: &str) {
    let room = room(prefix, "order");
    let nodes = linear_history(&["a", "ab", "abc", "abcd"]);
    // Append out of order; loads must come back sorted by seq.
    for idx in [2usize, 0, 3, 1] {
        assert!(store.append(&room, &nodes[idx]).expect("append"));
    }
    let loaded = store.load_room(&room).expect("load_room");
    assert_eq!(loaded, nodes);
}

pub fn append_is_idempotent<S: VersionStore>(store: &mut S, prefix: &str) {
    let room = room(prefix, "idempotent");
    let nodes = linear_history(&["x"]);
    assert!(store.append(&room, &nodes[0]).expect("first append"));
    assert!(!store.append(&room, &nodes[0]).expect("second append"));
    assert_eq!(store.load_room(&room).expect("load_room").len(), 1);
}

pub fn rooms_are_isolated<S: VersionStore>(store: &mut S, prefix: &str) {
    let left = room(prefix, "left");
    let right = room(prefix, "right");
    let nodes = linear_history(&["l", "lr"]);
    store.append(&left, &nodes[0]).expect("append left");
    store.append(&left, &nodes[1]).expect("append left");
    // Same version id in another room is a different row.
    assert!(store.append(&right, &nodes[0]).expect("append right"));

    assert_eq!(store.load_room(&left).expect("load left").len(), 2);
    assert_eq!(store.load_room(&right).expect("load right").len(), 1);
    assert!(store
        .load_room(&room(prefix, "missing"))
        .expect("load missing")
        .is_empty());

    let rooms = store.rooms().expect("rooms");
    assert!(rooms.contains(&left));
    assert!(rooms.contains(&right));
}

pub fn get_finds_single_versions<S: VersionStore>(store: &mut S, prefix: &str) {
    let room = room(prefix, "get");
    let nodes = linear_history(&["hello", "hello world"]);
    for node in &nodes {
        store.append(&room, node).expect("append");
    }
    let found = store
        .get(&room, &nodes[1].version_id)
        .expect("get")
        .expect("node present");
    assert_eq!(found, nodes[1]);
    assert_eq!(found.operations, generate_delta("hello", "hello world"));
    assert!(store
        .get(&room, &VersionId::from("nope"))
        .expect("get missing")
        .is_none());
}

/// Commit through a graph, persist each node, and rebuild the graph from the store.
pub fn graph_survives_reload<S: VersionStore>(store: &mut S, prefix: &str) {
    let room = room(prefix, "reload");
    let mut graph = VersionGraph::new(room.clone(), LogicalClock::default());

    let texts = ["", "Hello", "Hello World", "Hello Beautiful World"];
    let mut head: Option<VersionId> = None;
    for pair in texts.windows(2) {
        let node = graph
            .prepare(
                head.as_ref(),
                AuthorId::from("ada"),
                generate_delta(pair[0], pair[1]),
            )
            .expect("prepare");
        store.append(&room, &node).expect("append");
        head = Some(node.version_id.clone());
        graph.commit_node(node).expect("commit_node");
    }
    // A branch off the root.
    let root = graph.root().expect("root").version_id.clone();
    let branch = graph
        .prepare(Some(&root), AuthorId::from("bob"), generate_delta("Hello", "Hi"))
        .expect("prepare branch");
    store.append(&room, &branch).expect("append branch");
    graph.commit_node(branch.clone()).expect("commit branch");

    let reloaded = VersionGraph::from_nodes(
        room.clone(),
        LogicalClock::default(),
        store.load_room(&room).expect("load_room"),
    )
    .expect("from_nodes");
    let head = head.expect("head");
    assert_eq!(reloaded.len(), 4);
    assert_eq!(
        reloaded.reconstruct(&head).expect("reconstruct"),
        "Hello Beautiful World"
    );
    assert_eq!(
        reloaded.reconstruct(&branch.version_id).expect("reconstruct"),
        "Hi"
    );
    assert_eq!(
        reloaded
            .common_ancestor(&head, &branch.version_id)
            .expect("common_ancestor"),
        Some(root)
    );
    assert!(reloaded
        .composed_chain(&head, &head)
        .expect("composed_chain")
        .is_empty());
    assert_eq!(reloaded.history().len(), 4);
}

pub fn run_all<S: VersionStore>(store: &mut S, prefix: &str) {
    append_then_load_preserves_seq_order(store, prefix);
    append_is_idempotent(store, prefix);
    rooms_are_isolated(store, prefix);
    get_finds_single_versions(store, prefix);
    graph_survives_reload(store, prefix);
}

#[cfg(test)]
mod tests {
    use super::*;
    use coedit_core::MemoryVersionStore;

    #[test]
    fn memory_store_conforms() {
        run_all(&mut MemoryVersionStore::new(), "memory");
    }

    #[test]
    fn linear_history_links_parents() {
        let nodes = linear_history(&["a", "ab"]);
        assert_eq!(nodes[0].parent_id, None);
        assert_eq!(nodes[1].parent_id, Some(nodes[0].version_id.clone()));
    }
}
