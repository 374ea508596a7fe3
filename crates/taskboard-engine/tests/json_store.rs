use std::sync::Arc;
use taskboard_domain::{BoardScope, TaskDraft, TaskStatus};
use taskboard_engine::BoardManager;
use taskboard_persistence::JsonFileRemote;
use tempfile::tempdir;

#[tokio::test]
async fn test_board_changes_reach_the_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tasks.json");

    let board = BoardManager::new(Arc::new(JsonFileRemote::new(&path)));
    board.load(BoardScope::Unscoped).await.unwrap();

    let first = board.create(TaskDraft::new("first")).unwrap().wait().await.unwrap();
    let second = board.create(TaskDraft::new("second")).unwrap().wait().await.unwrap();
    board
        .move_task(second.id, TaskStatus::Todo, TaskStatus::InProgress, 0)
        .unwrap()
        .wait()
        .await
        .unwrap();

    // A second session reading the same file sees the same board.
    let other = BoardManager::new(Arc::new(JsonFileRemote::new(&path)));
    other.load(BoardScope::Unscoped).await.unwrap();
    assert_eq!(other.snapshot(), board.snapshot());
    assert_eq!(other.get(first.id).unwrap().status, TaskStatus::Todo);
    assert_eq!(other.get(second.id).unwrap().status, TaskStatus::InProgress);

    board.delete(first.id).unwrap().wait().await.unwrap();
    other.refresh().await.unwrap();
    assert_eq!(other.tasks().len(), 1);
}
