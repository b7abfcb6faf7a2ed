//! 范围解析 - 包含关系树
//!
//! Objects form a tree: community → (sub-community | collection) → item →
//! bitstream. A scope root restricts a run to that object and everything it
//! contains transitively.

use crate::db::{MetadataRepository, StorageResult};
use crate::utils::{CheckerError, CheckerResult};
use shared::error::ErrorCode;
use shared::{DsoRecord, DsoRef};

/// Longest parent chain followed before giving up (guards against cycles)
const MAX_DEPTH: usize = 64;

/// Resolve a `TYPE.ID` reference or a handle to a stored object.
///
/// Handles may carry an `hdl:` prefix. Returns `None` when nothing matches.
pub fn resolve(repo: &dyn MetadataRepository, token: &str) -> StorageResult<Option<DsoRef>> {
    let token = token.trim();

    if let Ok(object) = token.parse::<DsoRef>() {
        return Ok(repo.find_object(&object)?.map(|record| record.object));
    }

    let handle = token.strip_prefix("hdl:").unwrap_or(token);
    Ok(repo.find_by_handle(handle)?.map(|record| record.object))
}

/// Resolve a caller-supplied root, failing when nothing matches
pub fn resolve_root(repo: &dyn MetadataRepository, token: &str) -> CheckerResult<DsoRef> {
    resolve(repo, token)?.ok_or_else(|| {
        CheckerError::configuration(ErrorCode::ScopeNotFound, format!("No such object {}", token))
    })
}

/// Is `object` equal to `root` or (transitively) contained in it?
pub fn contains(repo: &dyn MetadataRepository, root: &DsoRef, object: DsoRef) -> StorageResult<bool> {
    if object == *root {
        return Ok(true);
    }
    if !root.is_container() {
        return Ok(false);
    }

    let mut current = object;
    for _ in 0..MAX_DEPTH {
        match repo.find_object(&current)?.and_then(|record| record.parent) {
            Some(parent) if parent == *root => return Ok(true),
            Some(parent) => current = parent,
            None => return Ok(false),
        }
    }

    tracing::warn!(object = %object, root = %root, "Containment chain too deep, treating as outside scope");
    Ok(false)
}

/// Containers above `object`, nearest first
pub fn ancestors(repo: &dyn MetadataRepository, object: DsoRef) -> StorageResult<Vec<DsoRecord>> {
    let mut chain = Vec::new();
    let mut next = repo.find_object(&object)?.and_then(|record| record.parent);

    while let Some(parent) = next {
        if chain.len() >= MAX_DEPTH {
            break;
        }
        let Some(record) = repo.find_object(&parent)? else {
            break;
        };
        next = record.parent;
        chain.push(record);
    }

    Ok(chain)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::ChecksumStorage;
    use shared::{BitstreamInfo, DsoType};

    /// community 1 → collection 2 → item 3 → bitstream 10; item 4 → bitstream 11 (orphan)
    fn build_tree() -> ChecksumStorage {
        let storage = ChecksumStorage::open_in_memory().unwrap();
        let community = DsoRef::new(DsoType::Community, 1);
        let collection = DsoRef::new(DsoType::Collection, 2);
        let item = DsoRef::new(DsoType::Item, 3);
        let orphan = DsoRef::new(DsoType::Item, 4);

        for (object, handle, parent) in [
            (community, "123456789/1", None),
            (collection, "123456789/2", Some(community)),
            (item, "123456789/3", Some(collection)),
            (orphan, "123456789/4", None),
        ] {
            storage
                .register_object(&DsoRecord {
                    object,
                    handle: Some(handle.to_string()),
                    parent,
                })
                .unwrap();
        }

        for (id, parent) in [(10, item), (11, orphan)] {
            let info = BitstreamInfo {
                bitstream_id: id,
                internal_id: id.to_string(),
                checksum: String::new(),
                checksum_algorithm: "MD5".to_string(),
                deleted: false,
            };
            storage.register_bitstream(&info, Some(parent)).unwrap();
        }
        storage
    }

    #[test]
    fn test_resolve_reference_and_handle() {
        let storage = build_tree();
        assert_eq!(
            resolve(&storage, "collection.2").unwrap(),
            Some(DsoRef::new(DsoType::Collection, 2))
        );
        assert_eq!(
            resolve(&storage, "hdl:123456789/3").unwrap(),
            Some(DsoRef::new(DsoType::Item, 3))
        );
        assert_eq!(resolve(&storage, "ITEM.99").unwrap(), None);
        assert_eq!(resolve(&storage, "123456789/99").unwrap(), None);
    }

    #[test]
    fn test_resolve_root_unknown_is_configuration_error() {
        let storage = build_tree();
        assert_eq!(
            resolve_root(&storage, "123456789/2").unwrap(),
            DsoRef::new(DsoType::Collection, 2)
        );

        let err = resolve_root(&storage, "hdl:123456789/99").unwrap_err();
        assert!(err.is_configuration());
        assert_eq!(err.error_code(), ErrorCode::ScopeNotFound);
        assert_eq!(err.to_string(), "No such object hdl:123456789/99");
    }

    #[test]
    fn test_contains_walks_parents() {
        let storage = build_tree();
        let community = DsoRef::new(DsoType::Community, 1);

        assert!(contains(&storage, &community, DsoRef::bitstream(10)).unwrap());
        assert!(!contains(&storage, &community, DsoRef::bitstream(11)).unwrap());
        assert!(contains(&storage, &DsoRef::bitstream(10), DsoRef::bitstream(10)).unwrap());
        assert!(!contains(&storage, &DsoRef::bitstream(10), DsoRef::bitstream(11)).unwrap());
        // unknown objects are outside every scope
        assert!(!contains(&storage, &community, DsoRef::bitstream(99)).unwrap());
    }

    #[test]
    fn test_ancestors_nearest_first() {
        let storage = build_tree();
        let chain: Vec<DsoRef> = ancestors(&storage, DsoRef::bitstream(10))
            .unwrap()
            .into_iter()
            .map(|record| record.object)
            .collect();
        assert_eq!(
            chain,
            vec![
                DsoRef::new(DsoType::Item, 3),
                DsoRef::new(DsoType::Collection, 2),
                DsoRef::new(DsoType::Community, 1),
            ]
        );
    }
}
