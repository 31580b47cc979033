use chrono::Utc;
use taskmirror::hierarchy::{build_tree, find, flatten};
use taskmirror::model::{Task, TaskStatus};

fn task(id: &str, parent: Option<&str>, position: &str) -> Task {
    Task {
        id: id.to_string(),
        parent_id: parent.map(str::to_string),
        title: format!("task {id}"),
        notes: String::new(),
        due: None,
        status: TaskStatus::NeedsAction,
        position: position.to_string(),
        updated_at: Utc::now(),
        extras: Default::default(),
    }
}

#[test]
fn test_depth_is_parent_depth_plus_one() {
    let tasks = vec![
        task("root", None, "1"),
        task("child", Some("root"), "1"),
        task("grandchild", Some("child"), "1"),
        task("other-root", None, "2"),
    ];

    let tree = build_tree(&tasks);
    assert_eq!(tree.len(), 2);
    assert_eq!(find(&tree, "root").unwrap().depth, 0);
    assert_eq!(find(&tree, "other-root").unwrap().depth, 0);
    assert_eq!(find(&tree, "child").unwrap().depth, 1);
    assert_eq!(find(&tree, "grandchild").unwrap().depth, 2);
}

#[test]
fn test_children_attach_to_their_parent() {
    let tasks = vec![
        task("a", None, "1"),
        task("a1", Some("a"), "1"),
        task("a2", Some("a"), "2"),
        task("b", None, "2"),
    ];

    let tree = build_tree(&tasks);
    let a = tree.iter().find(|n| n.task.id == "a").unwrap();
    let ids: Vec<&str> = a.children.iter().map(|c| c.task.id.as_str()).collect();
    assert_eq!(ids, vec!["a1", "a2"]);

    let b = tree.iter().find(|n| n.task.id == "b").unwrap();
    assert!(b.children.is_empty());
}

#[test]
fn test_unresolvable_parent_becomes_root() {
    // Parent outside the input batch: treated as a root, not dropped.
    let tasks = vec![task("orphan", Some("not-fetched"), "5"), task("a", None, "1")];

    let tree = build_tree(&tasks);
    assert_eq!(tree.len(), 2);
    let orphan = find(&tree, "orphan").unwrap();
    assert_eq!(orphan.depth, 0);
}

#[test]
fn test_siblings_sort_lexicographically_by_position() {
    let tasks = vec![
        task("c", None, "00003"),
        task("a", None, "00001"),
        task("b", None, "00002"),
    ];

    let tree = build_tree(&tasks);
    let ids: Vec<&str> = tree.iter().map(|n| n.task.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b", "c"]);
}

#[test]
fn test_equal_positions_preserve_input_order() {
    let tasks = vec![
        task("first", None, "same"),
        task("second", None, "same"),
        task("third", None, "same"),
    ];

    let tree = build_tree(&tasks);
    let ids: Vec<&str> = tree.iter().map(|n| n.task.id.as_str()).collect();
    assert_eq!(ids, vec!["first", "second", "third"]);

    // Re-sorting an already sorted input must not shuffle ties.
    let resorted = build_tree(&tasks);
    let ids2: Vec<&str> = resorted.iter().map(|n| n.task.id.as_str()).collect();
    assert_eq!(ids, ids2);
}

#[test]
fn test_flatten_is_depth_first() {
    let tasks = vec![
        task("a", None, "1"),
        task("b", None, "2"),
        task("a1", Some("a"), "1"),
        task("a1x", Some("a1"), "1"),
    ];

    let tree = build_tree(&tasks);
    let order: Vec<&str> = flatten(&tree).iter().map(|n| n.task.id.as_str()).collect();
    assert_eq!(order, vec!["a", "a1", "a1x", "b"]);
}

#[test]
fn test_empty_input() {
    assert!(build_tree(&[]).is_empty());
}
