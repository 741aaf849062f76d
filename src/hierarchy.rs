//! Hierarchy indexing over the flat task arena.
//!
//! Tasks form a forest via parent ids; nothing here mutates the arena. The
//! indexer annotates an already-filtered task list with dotted WBS indexes
//! ("1.2.3") and 1-based depths, in pre-order. All traversals carry explicit
//! visited sets so a corrupt parent pointer can never loop.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::task::Task;

/// Maximum permitted depth from a root. Descendants beyond this level are
/// neither created nor traversed.
pub const MAX_DEPTH: usize = 5;

/// One task's position in the indexed outline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WbsRow {
    pub task_id: u64,
    /// Dotted index, e.g. "1.2.3".
    pub index: String,
    /// 1-based distance from the visual root.
    pub depth: usize,
    /// Whether any task in the filtered set names this one as parent.
    pub has_children: bool,
}

/// Assign dotted indexes to a filtered task list.
///
/// A task whose parent was filtered out becomes a visual root. Roots and
/// siblings keep their relative input order and number 1, 2, 3…; the walk
/// stops at [`MAX_DEPTH`], so deeper descendants do not appear at all.
pub fn assign_indexes(tasks: &[&Task]) -> Vec<WbsRow> {
    let present: HashSet<u64> = tasks.iter().map(|t| t.id).collect();
    let mut children: HashMap<u64, Vec<u64>> = HashMap::new();
    let mut roots: Vec<u64> = Vec::new();
    for t in tasks {
        match t.parent {
            Some(p) if present.contains(&p) && p != t.id => {
                children.entry(p).or_default().push(t.id)
            }
            _ => roots.push(t.id),
        }
    }

    let mut out = Vec::with_capacity(tasks.len());
    let mut visited = HashSet::new();
    for (i, &root) in roots.iter().enumerate() {
        walk(
            root,
            &format!("{}", i + 1),
            1,
            &children,
            &mut visited,
            &mut out,
        );
    }
    out
}

fn walk(
    id: u64,
    index: &str,
    depth: usize,
    children: &HashMap<u64, Vec<u64>>,
    visited: &mut HashSet<u64>,
    out: &mut Vec<WbsRow>,
) {
    if !visited.insert(id) {
        return;
    }
    let kids = children.get(&id);
    out.push(WbsRow {
        task_id: id,
        index: index.to_string(),
        depth,
        has_children: kids.is_some_and(|k| !k.is_empty()),
    });
    if depth >= MAX_DEPTH {
        return;
    }
    if let Some(kids) = kids {
        for (i, &child) in kids.iter().enumerate() {
            walk(
                child,
                &format!("{}.{}", index, i + 1),
                depth + 1,
                children,
                visited,
                out,
            );
        }
    }
}

/// 1-based depth of a task within the full arena.
///
/// Terminates on a revisited id or a dangling parent pointer, in at most
/// one step per stored task.
pub fn depth_of(id: u64, tasks: &[Task]) -> usize {
    let index: HashMap<u64, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut seen = HashSet::new();
    seen.insert(id);
    let mut depth = 1;
    let mut cur = index.get(&id).and_then(|t| t.parent);
    while let Some(p) = cur {
        if !seen.insert(p) {
            break;
        }
        depth += 1;
        cur = index.get(&p).and_then(|t| t.parent);
    }
    depth
}

/// Build a map of parent task IDs to their children's IDs.
pub fn build_children_map(tasks: &[Task]) -> BTreeMap<u64, Vec<u64>> {
    let mut map: BTreeMap<u64, Vec<u64>> = BTreeMap::new();
    for t in tasks {
        if let Some(p) = t.parent {
            map.entry(p).or_default().push(t.id);
        }
    }
    for v in map.values_mut() {
        v.sort_unstable();
    }
    map
}

/// Recursively collect all descendant task IDs from a root task.
pub fn collect_descendants(root: u64, child_map: &BTreeMap<u64, Vec<u64>>, out: &mut HashSet<u64>) {
    if let Some(children) = child_map.get(&root) {
        for &c in children {
            if out.insert(c) {
                collect_descendants(c, child_map, out);
            }
        }
    }
}

/// Collect all ancestor task IDs by following parent references, closest
/// first. Stops on a dangling pointer or a revisit.
pub fn collect_ancestors(id: u64, tasks: &[Task]) -> Vec<u64> {
    let index: HashMap<u64, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut seen = HashSet::new();
    seen.insert(id);
    let mut chain = Vec::new();
    let mut cur = index.get(&id).and_then(|t| t.parent);
    while let Some(p) = cur {
        if !seen.insert(p) {
            break;
        }
        chain.push(p);
        cur = index.get(&p).and_then(|t| t.parent);
    }
    chain
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fields::Status;

    fn task(id: u64, parent: Option<u64>) -> Task {
        Task {
            id,
            title: format!("Task {id}"),
            alias: None,
            description: None,
            main_category: None,
            sub_category: None,
            planned_start: None,
            planned_end: None,
            actual_start: None,
            status: Status::Todo,
            time_units: Vec::new(),
            total_time_spent: 0,
            parent,
            outputs: Vec::new(),
            labels: Vec::new(),
            assignee: None,
            reporter: None,
            created_at_ms: 0,
            updated_at_ms: 0,
        }
    }

    fn rows_of(tasks: &[Task]) -> Vec<WbsRow> {
        let refs: Vec<&Task> = tasks.iter().collect();
        assign_indexes(&refs)
    }

    #[test]
    fn assigns_dotted_indexes_in_preorder() {
        let tasks = vec![
            task(1, None),
            task(2, Some(1)),
            task(3, Some(1)),
            task(4, Some(3)),
            task(5, None),
        ];
        let rows = rows_of(&tasks);
        let got: Vec<(&str, usize)> = rows.iter().map(|r| (r.index.as_str(), r.depth)).collect();
        assert_eq!(
            got,
            vec![("1", 1), ("1.1", 2), ("1.2", 2), ("1.2.1", 3), ("2", 1)]
        );
        assert!(rows[0].has_children);
        assert!(!rows[1].has_children);
    }

    #[test]
    fn filtered_out_parent_promotes_child_to_root() {
        // Parent 1 exists in the store but not in the filtered input.
        let child = task(2, Some(1));
        let other = task(3, None);
        let refs = vec![&child, &other];
        let rows = assign_indexes(&refs);
        assert_eq!(rows[0].index, "1");
        assert_eq!(rows[0].depth, 1);
        assert_eq!(rows[1].index, "2");
    }

    #[test]
    fn stops_at_depth_cap() {
        let tasks = vec![
            task(1, None),
            task(2, Some(1)),
            task(3, Some(2)),
            task(4, Some(3)),
            task(5, Some(4)),
            task(6, Some(5)),
            task(7, Some(6)),
        ];
        let rows = rows_of(&tasks);
        assert_eq!(rows.len(), 5);
        assert!(rows.iter().all(|r| r.depth <= MAX_DEPTH));
        assert!(!rows.iter().any(|r| r.task_id == 6));
    }

    #[test]
    fn terminates_on_parent_cycle() {
        let tasks = vec![task(1, Some(2)), task(2, Some(1)), task(3, None)];
        let rows = rows_of(&tasks);
        // Both cycle members reference a present parent, so neither is a
        // root; only the standalone task survives.
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].task_id, 3);

        assert!(depth_of(1, &tasks) <= tasks.len());
        assert_eq!(collect_ancestors(1, &tasks), vec![2]);
    }

    #[test]
    fn self_parent_is_treated_as_root() {
        let tasks = vec![task(1, Some(1))];
        let rows = rows_of(&tasks);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].depth, 1);
        assert_eq!(depth_of(1, &tasks), 1);
    }

    #[test]
    fn depth_of_counts_from_root() {
        let tasks = vec![task(1, None), task(2, Some(1)), task(3, Some(2))];
        assert_eq!(depth_of(1, &tasks), 1);
        assert_eq!(depth_of(3, &tasks), 3);
        // Dangling parent pointer: chain stops at the lookup failure.
        let orphan = vec![task(9, Some(42))];
        assert_eq!(depth_of(9, &orphan), 1);
    }

    #[test]
    fn descendants_and_ancestors() {
        let tasks = vec![
            task(1, None),
            task(2, Some(1)),
            task(3, Some(2)),
            task(4, Some(1)),
        ];
        let map = build_children_map(&tasks);
        let mut out = HashSet::new();
        collect_descendants(1, &map, &mut out);
        assert_eq!(out, HashSet::from([2, 3, 4]));
        assert_eq!(collect_ancestors(3, &tasks), vec![2, 1]);
    }
}
