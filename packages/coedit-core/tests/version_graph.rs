use coedit_core::{
    apply, generate_delta, AuthorId, LogicalClock, MemoryVersionStore, RoomId, VersionGraph,
    VersionId, VersionStore,
};

fn commit(
    graph: &mut VersionGraph<LogicalClock>,
    parent: Option<&VersionId>,
    from: &str,
    to: &str,
) -> VersionId {
    graph
        .commit(parent, AuthorId::from("ada"), generate_delta(from, to))
        .unwrap()
}

#[test]
fn common_ancestor_of_diverging_chains() {
    let mut graph = VersionGraph::new(RoomId::from("doc"), LogicalClock::default());
    let root = commit(&mut graph, None, "", "Hello");
    let v1 = commit(&mut graph, Some(&root), "Hello", "Hello World");
    let v2 = commit(&mut graph, Some(&v1), "Hello World", "Hello Beautiful World");
    let v3 = commit(&mut graph, Some(&v1), "Hello World", "Hello Amazing World");

    assert_eq!(graph.common_ancestor(&v2, &v3).unwrap(), Some(v1));
}

#[test]
fn reconstruct_replays_root_then_each_descendant() {
    let mut graph = VersionGraph::new(RoomId::from("doc"), LogicalClock::default());
    let root = commit(&mut graph, None, "", "Hello");
    let v1 = commit(&mut graph, Some(&root), "Hello", "Hello World");
    let v2 = commit(&mut graph, Some(&v1), "Hello World", "Hello Beautiful World");

    let path = graph.path_from_root(&v2).unwrap();
    let ids: Vec<_> = path.iter().map(|n| n.version_id.clone()).collect();
    assert_eq!(ids, vec![root, v1, v2.clone()]);

    let manual = path
        .iter()
        .try_fold(String::new(), |text, node| apply(&text, &node.operations))
        .unwrap();
    assert_eq!(manual, "Hello Beautiful World");
    assert_eq!(graph.reconstruct(&v2).unwrap(), manual);
}

#[test]
fn history_survives_a_round_trip_through_the_store() {
    let room = RoomId::from("doc");
    let mut store = MemoryVersionStore::new();
    let mut graph = VersionGraph::new(room.clone(), LogicalClock::default());

    let mut parent: Option<VersionId> = None;
    let mut text = String::new();
    for next in ["a", "ab", "abc", "xabc"] {
        let node = graph
            .prepare(parent.as_ref(), AuthorId::from("ada"), generate_delta(&text, next))
            .unwrap();
        store.append(&room, &node).unwrap();
        parent = Some(node.version_id.clone());
        graph.commit_node(node).unwrap();
        text = next.to_owned();
    }

    let reloaded =
        VersionGraph::from_nodes(room.clone(), LogicalClock::default(), store.load_room(&room).unwrap())
            .unwrap();
    let head = reloaded.head().unwrap().version_id.clone();
    assert_eq!(Some(&head), parent.as_ref());
    assert_eq!(reloaded.reconstruct(&head).unwrap(), "xabc");
    assert_eq!(reloaded.history().len(), 4);
}
