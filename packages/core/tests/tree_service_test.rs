//! Integration tests for TreeService
//!
//! Tests cover:
//! - Single-node create/update with depth, duplicate and cycle checks
//! - Subtree deletion
//! - Atomic multi-level bulk insertion and rollback
//! - Forest and subtree reads
//! - Concurrent creators racing on the same code

use anyhow::Result;
use divtree_core::{
    db::{DatabaseService, NodeOps, TursoStore},
    models::{BulkNodeRequest, NewNode, Node, NodeId, NodeUpdate, TreeNode},
    services::{ErrorKind, TreeConfig, TreeService, TreeServiceError},
};
use std::collections::HashSet;
use std::sync::Arc;
use tempfile::TempDir;

/// Test helper: Create a test environment
async fn create_test_env() -> Result<(TreeService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db = DatabaseService::new(temp_dir.path().join("test.db")).await?;
    let service = TreeService::new(Arc::new(TursoStore::new(Arc::new(db))));
    Ok((service, temp_dir))
}

async fn create(service: &TreeService, code: &str, parent_id: Option<NodeId>) -> Result<Node> {
    Ok(service
        .create_node(NewNode::new(code, format!("Division {}", code), parent_id))
        .await?)
}

/// Create a straight chain of `len` nodes, root first
async fn create_chain(service: &TreeService, prefix: &str, len: usize) -> Result<Vec<Node>> {
    let mut nodes = Vec::new();
    let mut parent = None;
    for level in 1..=len {
        let node = create(service, &format!("{}{}", prefix, level), parent).await?;
        parent = Some(node.id);
        nodes.push(node);
    }
    Ok(nodes)
}

async fn count_nodes(service: &TreeService) -> Result<usize> {
    Ok(service.store().get_all_nodes().await?.len())
}

async fn depth_of(service: &TreeService, id: NodeId) -> Result<usize> {
    Ok(service
        .checker()
        .compute_depth(service.store().as_ref(), id)
        .await?)
}

fn preorder_ids(forest: &[TreeNode], out: &mut Vec<NodeId>) {
    for tree in forest {
        out.push(tree.node.id);
        preorder_ids(&tree.list_division, out);
    }
}

// =========================================================================
// Create
// =========================================================================

#[tokio::test]
async fn test_create_root_and_child() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let root = service
        .create_node(NewNode::new("R", "Root", None))
        .await?;
    assert_eq!(depth_of(&service, root.id).await?, 1);
    assert!(root.is_root());

    let child = service
        .create_node(NewNode::new("C1", "Child", Some(root.id)))
        .await?;
    assert_eq!(child.parent_id, Some(root.id));
    assert_eq!(depth_of(&service, child.id).await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_create_under_depth_five_parent_is_rejected() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let chain = create_chain(&service, "L", 5).await?;

    let err = create(&service, "L6", Some(chain[4].id)).await.unwrap_err();
    let err = err.downcast::<TreeServiceError>()?;
    assert_eq!(err.kind(), ErrorKind::DepthExceeded);
    assert_eq!(count_nodes(&service).await?, 5);
    Ok(())
}

#[tokio::test]
async fn test_create_duplicate_code_is_rejected() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let root = create(&service, "HQ", None).await?;

    let err = service
        .create_node(NewNode::new("HQ", "Another", Some(root.id)))
        .await
        .unwrap_err();
    assert!(matches!(err, TreeServiceError::DuplicateCode { ref code } if code == "HQ"));
    assert_eq!(count_nodes(&service).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_create_with_missing_parent_is_not_found() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let err = service
        .create_node(NewNode::new("X", "Orphan", Some(404)))
        .await
        .unwrap_err();
    assert!(matches!(err, TreeServiceError::NodeNotFound { id: 404 }));
    Ok(())
}

#[tokio::test]
async fn test_create_requires_code_and_name() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let err = service
        .create_node(NewNode::new("", "Nameless code", None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(count_nodes(&service).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_create_with_preassigned_id() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let root = create(&service, "R", None).await?;

    let node = service
        .create_node(NewNode::new("P", "Preassigned", Some(root.id)).with_id(500))
        .await?;
    assert_eq!(node.id, 500);
    assert_eq!(node.parent_id, Some(root.id));
    Ok(())
}

#[tokio::test]
async fn test_respects_configured_max_depth() -> Result<()> {
    let temp_dir = TempDir::new()?;
    let db = DatabaseService::new(temp_dir.path().join("test.db")).await?;
    let service = TreeService::with_config(
        Arc::new(TursoStore::new(Arc::new(db))),
        TreeConfig { max_depth: 2 },
    );

    let chain = create_chain(&service, "L", 2).await?;
    let err = service
        .create_node(NewNode::new("L3", "Too deep", Some(chain[1].id)))
        .await
        .unwrap_err();
    assert!(matches!(err, TreeServiceError::DepthExceeded { max_depth: 2 }));
    Ok(())
}

// =========================================================================
// Update
// =========================================================================

#[tokio::test]
async fn test_update_fields() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let a = create(&service, "A", None).await?;
    let b = create(&service, "B", None).await?;

    let updated = service
        .update_node(b.id, NodeUpdate::new("B2", "Renamed", Some(a.id)))
        .await?;
    assert_eq!(updated.id, b.id);
    assert_eq!(updated.code, "B2");
    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.parent_id, Some(a.id));
    assert!(updated.updated_at >= b.updated_at);
    assert_eq!(updated.created_at, b.created_at);
    Ok(())
}

#[tokio::test]
async fn test_update_keeping_own_code_is_allowed() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let a = create(&service, "A", None).await?;

    let updated = service
        .update_node(a.id, NodeUpdate::new("A", "Same code", None))
        .await?;
    assert_eq!(updated.name, "Same code");
    Ok(())
}

#[tokio::test]
async fn test_update_to_taken_code_is_rejected() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    create(&service, "A", None).await?;
    let b = create(&service, "B", None).await?;

    let err = service
        .update_node(b.id, NodeUpdate::new("A", "Clash", None))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateCode);
    Ok(())
}

#[tokio::test]
async fn test_update_missing_node_is_not_found() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let err = service
        .update_node(77, NodeUpdate::new("Z", "Zed", None))
        .await
        .unwrap_err();
    assert!(matches!(err, TreeServiceError::NodeNotFound { id: 77 }));
    Ok(())
}

#[tokio::test]
async fn test_update_under_own_descendant_is_rejected_and_unchanged() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let chain = create_chain(&service, "N", 3).await?;
    let subject = &chain[0];

    let err = service
        .update_node(
            subject.id,
            NodeUpdate::new("CHANGED", "Changed", Some(chain[2].id)),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntegrityViolation);

    let stored = service.store().get_node(subject.id).await?.unwrap();
    assert_eq!(&stored, subject);
    Ok(())
}

#[tokio::test]
async fn test_update_under_itself_is_rejected() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let a = create(&service, "A", None).await?;

    let err = service
        .update_node(a.id, NodeUpdate::new("A", "Self", Some(a.id)))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::IntegrityViolation);
    Ok(())
}

#[tokio::test]
async fn test_update_does_not_revalidate_depth() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let deep = create_chain(&service, "D", 5).await?;
    let subtree = create_chain(&service, "S", 2).await?;

    // Moving a two-level subtree under a depth-5 node is accepted
    service
        .update_node(
            subtree[0].id,
            NodeUpdate::new("S1", "Moved", Some(deep[4].id)),
        )
        .await?;

    let moved = service.store().get_node(subtree[0].id).await?.unwrap();
    assert_eq!(moved.parent_id, Some(deep[4].id));
    assert_eq!(depth_of(&service, moved.id).await?, 6);
    Ok(())
}

// =========================================================================
// Delete
// =========================================================================

#[tokio::test]
async fn test_delete_removes_whole_subtree() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let root = create(&service, "R", None).await?;
    let c1 = create(&service, "C1", Some(root.id)).await?;
    let c2 = create(&service, "C2", Some(root.id)).await?;
    create(&service, "G1", Some(c1.id)).await?;
    create(&service, "G2", Some(c2.id)).await?;
    let keeper = create(&service, "KEEP", None).await?;

    let deleted = service.delete_node_with_children(root.id).await?;
    assert_eq!(deleted, 5);

    let remaining = service.store().get_all_nodes().await?;
    assert_eq!(remaining, vec![keeper]);
    Ok(())
}

#[tokio::test]
async fn test_delete_leaves_no_dangling_parents() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let root = create(&service, "R", None).await?;
    let mid = create(&service, "M", Some(root.id)).await?;
    create(&service, "L", Some(mid.id)).await?;
    create(&service, "S", Some(root.id)).await?;

    service.delete_node_with_children(mid.id).await?;

    let remaining = service.store().get_all_nodes().await?;
    let ids: HashSet<NodeId> = remaining.iter().map(|n| n.id).collect();
    assert_eq!(remaining.len(), 2);
    for node in &remaining {
        if let Some(parent_id) = node.parent_id {
            assert!(ids.contains(&parent_id));
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_delete_absent_node_is_noop() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    create(&service, "R", None).await?;

    let deleted = service.delete_node_with_children(12345).await?;
    assert_eq!(deleted, 0);
    assert_eq!(count_nodes(&service).await?, 1);
    Ok(())
}

// =========================================================================
// Bulk insert
// =========================================================================

fn three_level_batch() -> Vec<BulkNodeRequest> {
    vec![
        BulkNodeRequest::new("FIN", "Finance").with_children(vec![
            BulkNodeRequest::new("FIN-AP", "Accounts Payable")
                .with_children(vec![BulkNodeRequest::new("FIN-AP-1", "Vendors")]),
            BulkNodeRequest::new("FIN-AR", "Accounts Receivable"),
        ]),
        BulkNodeRequest::new("HR", "Human Resources"),
    ]
}

#[tokio::test]
async fn test_bulk_insert_creates_all_levels() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let inserted = service.bulk_insert(&three_level_batch(), None).await?;
    assert_eq!(inserted, 5);

    let forest = service.get_tree().await?;
    assert_eq!(forest.len(), 2);
    assert_eq!(forest[0].node.code, "FIN");
    assert_eq!(forest[0].list_division[0].node.code, "FIN-AP");
    assert_eq!(forest[0].list_division[0].list_division[0].node.code, "FIN-AP-1");
    assert_eq!(forest[0].list_division[1].node.code, "FIN-AR");
    assert_eq!(forest[1].node.code, "HR");
    Ok(())
}

#[tokio::test]
async fn test_bulk_insert_duplicate_inside_batch_rolls_back_everything() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let batch = vec![BulkNodeRequest::new("TOP", "Top").with_children(vec![
        BulkNodeRequest::new("MID-1", "Mid one")
            .with_children(vec![BulkNodeRequest::new("LEAF", "Leaf")]),
        BulkNodeRequest::new("TOP", "Duplicate of level one"),
    ])];

    let err = service.bulk_insert(&batch, None).await.unwrap_err();
    assert!(matches!(err, TreeServiceError::DuplicateCode { ref code } if code == "TOP"));
    assert_eq!(count_nodes(&service).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_bulk_insert_duplicate_of_existing_node_rolls_back() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    create(&service, "HR", None).await?;

    let err = service
        .bulk_insert(&three_level_batch(), None)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DuplicateCode);
    assert_eq!(count_nodes(&service).await?, 1);
    Ok(())
}

fn chain_request(depth: usize) -> BulkNodeRequest {
    let mut request = BulkNodeRequest::new(format!("B{}", depth), "Deepest");
    for level in (1..depth).rev() {
        request = BulkNodeRequest::new(format!("B{}", level), "Level").with_children(vec![request]);
    }
    request
}

#[tokio::test]
async fn test_bulk_insert_five_levels_is_allowed() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let inserted = service.bulk_insert(&[chain_request(5)], None).await?;
    assert_eq!(inserted, 5);

    let deepest = service.store().get_node_by_code("B5").await?.unwrap();
    assert_eq!(depth_of(&service, deepest.id).await?, 5);
    Ok(())
}

#[tokio::test]
async fn test_bulk_insert_sixth_level_rolls_back() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let err = service
        .bulk_insert(&[chain_request(6)], None)
        .await
        .unwrap_err();
    assert!(matches!(err, TreeServiceError::DepthExceeded { max_depth: 5 }));
    assert_eq!(count_nodes(&service).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_bulk_insert_under_parent_counts_parent_depth() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let chain = create_chain(&service, "P", 3).await?;

    // Parent at depth 3: two more levels fit, three do not
    let inserted = service
        .bulk_insert(&[chain_request(2)], Some(chain[2].id))
        .await?;
    assert_eq!(inserted, 2);
    let b1 = service.store().get_node_by_code("B1").await?.unwrap();
    assert_eq!(b1.parent_id, Some(chain[2].id));

    let err = service
        .bulk_insert(
            &[BulkNodeRequest::new("X1", "X").with_children(vec![
                BulkNodeRequest::new("X2", "X").with_children(vec![BulkNodeRequest::new("X3", "X")]),
            ])],
            Some(chain[2].id),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::DepthExceeded);
    assert!(service.store().get_node_by_code("X1").await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_bulk_insert_under_missing_parent_is_not_found() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let err = service
        .bulk_insert(&three_level_batch(), Some(999))
        .await
        .unwrap_err();
    assert!(matches!(err, TreeServiceError::NodeNotFound { id: 999 }));
    assert_eq!(count_nodes(&service).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_bulk_insert_invalid_item_inserts_nothing() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    let batch = vec![BulkNodeRequest::new("OK", "Fine")
        .with_children(vec![BulkNodeRequest::new("BAD", " ")])];

    let err = service.bulk_insert(&batch, None).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(count_nodes(&service).await?, 0);
    Ok(())
}

#[tokio::test]
async fn test_bulk_insert_empty_batch() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    assert_eq!(service.bulk_insert(&[], None).await?, 0);
    Ok(())
}

// =========================================================================
// Reads
// =========================================================================

#[tokio::test]
async fn test_get_tree_covers_every_node_parent_first() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    service.bulk_insert(&three_level_batch(), None).await?;
    let extra = create(&service, "EXTRA", None).await?;
    create(&service, "EXTRA-1", Some(extra.id)).await?;

    let all = service.store().get_all_nodes().await?;
    let forest = service.get_tree().await?;

    let mut ids = Vec::new();
    preorder_ids(&forest, &mut ids);
    assert_eq!(ids.len(), all.len());

    let expected: HashSet<NodeId> = all.iter().map(|n| n.id).collect();
    let actual: HashSet<NodeId> = ids.iter().copied().collect();
    assert_eq!(actual, expected);

    let position = |id: NodeId| ids.iter().position(|x| *x == id).unwrap();
    for node in &all {
        if let Some(parent_id) = node.parent_id {
            assert!(position(parent_id) < position(node.id));
        }
    }
    Ok(())
}

#[tokio::test]
async fn test_get_tree_empty() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    assert!(service.get_tree().await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_get_node_by_id_returns_subtree() -> Result<()> {
    let (service, _temp) = create_test_env().await?;
    service.bulk_insert(&three_level_batch(), None).await?;
    let ap = service.store().get_node_by_code("FIN-AP").await?.unwrap();

    let subtree = service.get_node_by_id(ap.id).await?;
    assert_eq!(subtree.node, ap);
    assert_eq!(subtree.size(), 2);
    assert_eq!(subtree.list_division[0].node.code, "FIN-AP-1");
    Ok(())
}

#[tokio::test]
async fn test_get_node_by_id_missing_is_not_found() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let err = service.get_node_by_id(3).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
    Ok(())
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_creates_with_same_code_leave_one_node() -> Result<()> {
    let (service, _temp) = create_test_env().await?;

    let mut handles = Vec::new();
    for i in 0..4 {
        let service = service.clone();
        handles.push(tokio::spawn(async move {
            service
                .create_node(NewNode::new("RACE", format!("Contender {}", i), None))
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        match handle.await? {
            Ok(_) => successes += 1,
            Err(err) => assert_eq!(err.kind(), ErrorKind::DuplicateCode),
        }
    }

    assert_eq!(successes, 1);
    let racers = service
        .store()
        .get_all_nodes()
        .await?
        .into_iter()
        .filter(|n| n.code == "RACE")
        .count();
    assert_eq!(racers, 1);
    Ok(())
}
