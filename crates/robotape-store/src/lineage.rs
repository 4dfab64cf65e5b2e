//! Parent-chain traversal shared by every store.

use std::collections::HashSet;

use robotape_contracts::{
    error::{RobotapeError, RobotapeResult},
    tape::TapeId,
};

use crate::to_storage_err;

/// Walk `parent_id` links from `start` to its root.
///
/// `parent_of` returns `None` when a tape is absent and `Some(parent)` when
/// it exists. The result starts with `start` and ends with the root.
///
/// # Errors
///
/// `TapeNotFound` if `start` is absent, `Storage` if an ancestor is missing,
/// `LineageCycle` as soon as any tape is reached a second time.
pub fn walk_lineage<F>(start: TapeId, mut parent_of: F) -> RobotapeResult<Vec<TapeId>>
where
    F: FnMut(&TapeId) -> RobotapeResult<Option<Option<TapeId>>>,
{
    let mut chain = Vec::new();
    let mut visited = HashSet::new();
    let mut current = start;

    loop {
        if !visited.insert(current) {
            return Err(RobotapeError::LineageCycle {
                tape_id: current.to_string(),
            });
        }
        let parent = match parent_of(&current)? {
            Some(parent) => parent,
            None if current == start => {
                return Err(RobotapeError::TapeNotFound {
                    tape_id: start.to_string(),
                })
            }
            None => {
                return Err(to_storage_err(format!(
                    "tape '{}' names missing parent '{current}'",
                    chain.last().map(ToString::to_string).unwrap_or_default()
                )))
            }
        };
        chain.push(current);
        match parent {
            Some(parent) => current = parent,
            None => return Ok(chain),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(
        links: &HashMap<TapeId, Option<TapeId>>,
    ) -> impl FnMut(&TapeId) -> RobotapeResult<Option<Option<TapeId>>> + '_ {
        move |id| Ok(links.get(id).copied())
    }

    #[test]
    fn root_has_chain_of_one() {
        let root = TapeId::new();
        let links = HashMap::from([(root, None)]);
        assert_eq!(walk_lineage(root, lookup(&links)).unwrap(), vec![root]);
    }

    #[test]
    fn chain_runs_from_child_to_root() {
        let (root, mid, leaf) = (TapeId::new(), TapeId::new(), TapeId::new());
        let links = HashMap::from([(root, None), (mid, Some(root)), (leaf, Some(mid))]);
        assert_eq!(
            walk_lineage(leaf, lookup(&links)).unwrap(),
            vec![leaf, mid, root]
        );
    }

    #[test]
    fn absent_start_is_not_found() {
        let links = HashMap::new();
        let err = walk_lineage(TapeId::new(), lookup(&links)).unwrap_err();
        assert!(matches!(err, RobotapeError::TapeNotFound { .. }));
    }

    #[test]
    fn missing_ancestor_is_storage_error() {
        let (child, ghost) = (TapeId::new(), TapeId::new());
        let links = HashMap::from([(child, Some(ghost))]);
        let err = walk_lineage(child, lookup(&links)).unwrap_err();
        assert!(matches!(err, RobotapeError::Storage { .. }));
    }

    #[test]
    fn two_tape_cycle_is_detected() {
        let (a, b) = (TapeId::new(), TapeId::new());
        let links = HashMap::from([(a, Some(b)), (b, Some(a))]);
        let err = walk_lineage(a, lookup(&links)).unwrap_err();
        assert_eq!(
            err,
            RobotapeError::LineageCycle {
                tape_id: a.to_string()
            }
        );
    }
}
