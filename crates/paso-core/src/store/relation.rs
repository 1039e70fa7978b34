use std::collections::HashMap;

use crate::error::{InvariantViolation, PasoError};
use crate::types::{ChangeDescriptor, ChangeKind, EntityKind, RelationType, TaskId};

use super::Store;

impl Store {
    /// Adds a relation between two tasks. Writes both directions of the
    /// edge in one transaction (e.g. `Parent` on one side always implies
    /// `Child` on the other). For `Parent`/`Child` relations, rejects the
    /// write with `RelationCycle` if it would create a cycle anywhere in
    /// the project's parent/child graph; `Blocks`/`BlockedBy` relations are
    /// not required to be acyclic.
    pub async fn add_relation(
        &self,
        from: TaskId,
        to: TaskId,
        relation_type: RelationType,
    ) -> Result<ChangeDescriptor, PasoError> {
        if from == to {
            return Err(PasoError::invariant(InvariantViolation::SelfRelation));
        }

        let task = self.get_task(from).await?;

        if relation_type.participates_in_hierarchy() {
            let edges = self.hierarchy_edges(task.project_id.0).await?;
            let candidate = match relation_type {
                RelationType::Parent => (from, to),
                RelationType::Child => (to, from),
                _ => unreachable!("checked above"),
            };
            if would_create_cycle(&edges, candidate) {
                return Err(PasoError::invariant(InvariantViolation::RelationCycle));
            }
        }

        let from_raw = from.0;
        let to_raw = to.0;
        let fwd = relation_type.as_str();
        let rev = relation_type.inverse().as_str();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "INSERT OR IGNORE INTO task_relations (from_task, to_task, relation_type) VALUES (?1, ?2, ?3)",
                    rusqlite::params![from_raw, to_raw, fwd],
                )?;
                tx.execute(
                    "INSERT OR IGNORE INTO task_relations (from_task, to_task, relation_type) VALUES (?1, ?2, ?3)",
                    rusqlite::params![to_raw, from_raw, rev],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        Ok(ChangeDescriptor { project_id: task.project_id, entity_kind: EntityKind::Relation, entity_id: Some(from_raw), kind: ChangeKind::Updated })
    }

    pub async fn remove_relation(&self, from: TaskId, to: TaskId, relation_type: RelationType) -> Result<ChangeDescriptor, PasoError> {
        let task = self.get_task(from).await?;
        let from_raw = from.0;
        let to_raw = to.0;
        let fwd = relation_type.as_str();
        let rev = relation_type.inverse().as_str();

        self.conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                tx.execute(
                    "DELETE FROM task_relations WHERE from_task = ?1 AND to_task = ?2 AND relation_type = ?3",
                    rusqlite::params![from_raw, to_raw, fwd],
                )?;
                tx.execute(
                    "DELETE FROM task_relations WHERE from_task = ?1 AND to_task = ?2 AND relation_type = ?3",
                    rusqlite::params![to_raw, from_raw, rev],
                )?;
                tx.commit()?;
                Ok(())
            })
            .await?;

        Ok(ChangeDescriptor { project_id: task.project_id, entity_kind: EntityKind::Relation, entity_id: Some(from_raw), kind: ChangeKind::Updated })
    }

    /// All existing `Parent`-typed edges in a project, as `(child, parent)`
    /// pairs — `Child` rows are the same edges seen from the other side and
    /// are skipped to avoid double-counting.
    async fn hierarchy_edges(&self, project_id: i64) -> Result<Vec<(TaskId, TaskId)>, PasoError> {
        self.conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    "SELECT r.from_task, r.to_task FROM task_relations r
                     JOIN tasks t ON t.id = r.from_task
                     WHERE t.project_id = ?1 AND r.relation_type = 'parent'",
                )?;
                let mut rows = stmt.query(rusqlite::params![project_id])?;
                let mut out = Vec::new();
                while let Some(row) = rows.next()? {
                    out.push((TaskId(row.get(0)?), TaskId(row.get(1)?)));
                }
                Ok(out)
            })
            .await
            .map_err(PasoError::from)
    }
}

/// Three-color DFS cycle detection over a directed graph, adapted to
/// `TaskId`-keyed edges: white (unvisited), gray (on the current DFS
/// stack), black (fully explored). A back-edge into a gray node means a
/// cycle.
fn would_create_cycle(existing: &[(TaskId, TaskId)], candidate: (TaskId, TaskId)) -> bool {
    let mut adjacency: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
    for (from, to) in existing.iter().chain(std::iter::once(&candidate)) {
        adjacency.entry(*from).or_default().push(*to);
    }

    #[derive(Clone, Copy, PartialEq)]
    enum Color {
        White,
        Gray,
        Black,
    }

    let mut colors: HashMap<TaskId, Color> = HashMap::new();
    for node in adjacency.keys() {
        colors.entry(*node).or_insert(Color::White);
    }

    fn visit(node: TaskId, adjacency: &HashMap<TaskId, Vec<TaskId>>, colors: &mut HashMap<TaskId, Color>) -> bool {
        colors.insert(node, Color::Gray);
        if let Some(neighbours) = adjacency.get(&node) {
            for &next in neighbours {
                match colors.get(&next).copied().unwrap_or(Color::White) {
                    Color::Gray => return true,
                    Color::White => {
                        if visit(next, adjacency, colors) {
                            return true;
                        }
                    }
                    Color::Black => {}
                }
            }
        }
        colors.insert(node, Color::Black);
        false
    }

    let nodes: Vec<TaskId> = colors.keys().copied().collect();
    for node in nodes {
        if colors.get(&node).copied() == Some(Color::White) && visit(node, &adjacency, &mut colors) {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::super::Store;
    use crate::error::{InvariantViolation, PasoError};
    use crate::types::RelationType;

    #[tokio::test]
    async fn parent_child_round_trips_both_directions() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (col, _) = store.create_column(project.id, "Todo", None).await.unwrap();
        let (a, _) = store.create_task(project.id, col.id, "epic", None).await.unwrap();
        let (b, _) = store.create_task(project.id, col.id, "subtask", None).await.unwrap();

        store.add_relation(b.id, a.id, RelationType::Parent).await.unwrap();
        let detail = store.task_detail(b.id).await.unwrap();
        assert_eq!(detail.parents.len(), 1);
        let parent_detail = store.task_detail(a.id).await.unwrap();
        assert_eq!(parent_detail.children.len(), 1);
    }

    #[tokio::test]
    async fn self_relation_is_rejected() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (col, _) = store.create_column(project.id, "Todo", None).await.unwrap();
        let (a, _) = store.create_task(project.id, col.id, "solo", None).await.unwrap();

        let err = store.add_relation(a.id, a.id, RelationType::Parent).await.unwrap_err();
        assert!(matches!(err, PasoError::InvariantViolation(InvariantViolation::SelfRelation)));
    }

    #[tokio::test]
    async fn cycle_in_parent_chain_is_rejected() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (col, _) = store.create_column(project.id, "Todo", None).await.unwrap();
        let (a, _) = store.create_task(project.id, col.id, "a", None).await.unwrap();
        let (b, _) = store.create_task(project.id, col.id, "b", None).await.unwrap();
        let (c, _) = store.create_task(project.id, col.id, "c", None).await.unwrap();

        store.add_relation(b.id, a.id, RelationType::Parent).await.unwrap();
        store.add_relation(c.id, b.id, RelationType::Parent).await.unwrap();

        let err = store.add_relation(a.id, c.id, RelationType::Parent).await.unwrap_err();
        assert!(matches!(err, PasoError::InvariantViolation(InvariantViolation::RelationCycle)));
    }

    #[tokio::test]
    async fn blocks_relation_need_not_be_acyclic() {
        let store = Store::open_in_memory().await.unwrap();
        let (project, _) = store.create_project("demo").await.unwrap();
        let (col, _) = store.create_column(project.id, "Todo", None).await.unwrap();
        let (a, _) = store.create_task(project.id, col.id, "a", None).await.unwrap();
        let (b, _) = store.create_task(project.id, col.id, "b", None).await.unwrap();

        store.add_relation(a.id, b.id, RelationType::Blocks).await.unwrap();
        store.add_relation(b.id, a.id, RelationType::Blocks).await.unwrap();
    }
}
