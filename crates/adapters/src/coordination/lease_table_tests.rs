// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

fn key(name: &str) -> ResourceKey {
    ResourceKey::parse(name).unwrap()
}

fn adapter(dir: &Path) -> LeaseTableAdapter {
    LeaseTableAdapter::new(dir).with_poll_interval(Duration::from_millis(5))
}

#[test]
fn file_names_are_flat_and_encoded() {
    assert_eq!(lock_file_name(&key("deploy")), "deploy.lock");
    assert_eq!(lock_file_name(&key("db/users")), "db%2fusers.lock");
    assert_eq!(lock_file_name(&key("svc:a")), "svc%3aa.lock");
}

#[tokio::test]
async fn open_session_creates_directory() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("locks");

    let session = adapter(&dir).open_session(Duration::from_secs(30)).await.unwrap();

    assert!(dir.is_dir());
    assert_eq!(session.lease_ttl(), Duration::from_secs(30));
    assert!(!session.id().is_empty());
}

#[tokio::test]
async fn open_session_fails_when_path_is_a_file() {
    let temp = tempfile::tempdir().unwrap();
    let path = temp.path().join("not-a-dir");
    std::fs::write(&path, "x").unwrap();

    let result = adapter(&path).open_session(Duration::from_secs(30)).await;

    assert!(matches!(result, Err(CoordinationError::Connect { .. })));
}

#[tokio::test]
async fn lock_writes_holder_and_unlock_clears_it() {
    let temp = tempfile::tempdir().unwrap();
    let session = adapter(temp.path())
        .open_session(Duration::from_secs(30))
        .await
        .unwrap();
    let mut mutex = session.new_mutex(&key("deploy"));

    mutex.lock(Duration::from_secs(1)).await.unwrap();
    let contents = std::fs::read_to_string(mutex.path()).unwrap();
    assert_eq!(contents.trim(), session.id());

    mutex.unlock(Duration::from_secs(1)).await.unwrap();
    let contents = std::fs::read_to_string(mutex.path()).unwrap();
    assert!(contents.is_empty());
}

#[tokio::test]
async fn second_session_times_out_while_held() {
    let temp = tempfile::tempdir().unwrap();
    let table = adapter(temp.path());
    let first = table.open_session(Duration::from_secs(30)).await.unwrap();
    let second = table.open_session(Duration::from_secs(30)).await.unwrap();

    let mut held = first.new_mutex(&key("a"));
    held.lock(Duration::from_secs(1)).await.unwrap();

    let mut waiting = second.new_mutex(&key("a"));
    let result = waiting.lock(Duration::from_millis(30)).await;
    assert_eq!(result, Err(CoordinationError::Timeout(Duration::from_millis(30))));

    held.unlock(Duration::from_secs(1)).await.unwrap();
    waiting.lock(Duration::from_secs(1)).await.unwrap();
}

#[tokio::test]
async fn waiting_lock_acquires_once_released() {
    let temp = tempfile::tempdir().unwrap();
    let table = adapter(temp.path());
    let first = table.open_session(Duration::from_secs(30)).await.unwrap();
    let second = table.open_session(Duration::from_secs(30)).await.unwrap();

    let mut held = first.new_mutex(&key("a"));
    held.lock(Duration::from_secs(1)).await.unwrap();

    let waiter = tokio::spawn(async move {
        let mut waiting = second.new_mutex(&key("a"));
        waiting.lock(Duration::from_secs(5)).await
    });

    tokio::time::sleep(Duration::from_millis(20)).await;
    held.unlock(Duration::from_secs(1)).await.unwrap();

    assert!(waiter.await.unwrap().is_ok());
}

#[tokio::test]
async fn different_keys_do_not_contend() {
    let temp = tempfile::tempdir().unwrap();
    let table = adapter(temp.path());
    let first = table.open_session(Duration::from_secs(30)).await.unwrap();
    let second = table.open_session(Duration::from_secs(30)).await.unwrap();

    let mut a = first.new_mutex(&key("a"));
    let mut b = second.new_mutex(&key("b"));
    a.lock(Duration::from_millis(50)).await.unwrap();
    b.lock(Duration::from_millis(50)).await.unwrap();
}

#[tokio::test]
async fn unlock_without_lock_is_not_held() {
    let temp = tempfile::tempdir().unwrap();
    let session = adapter(temp.path())
        .open_session(Duration::from_secs(30))
        .await
        .unwrap();
    let mut mutex = session.new_mutex(&key("a"));

    let result = mutex.unlock(Duration::from_secs(1)).await;

    assert_eq!(result, Err(CoordinationError::NotHeld("a".to_string())));
}

#[tokio::test]
async fn dropping_a_held_mutex_frees_the_key() {
    let temp = tempfile::tempdir().unwrap();
    let table = adapter(temp.path());
    let first = table.open_session(Duration::from_secs(30)).await.unwrap();
    let second = table.open_session(Duration::from_secs(30)).await.unwrap();

    let mut held = first.new_mutex(&key("a"));
    held.lock(Duration::from_secs(1)).await.unwrap();
    drop(held);

    let mut next = second.new_mutex(&key("a"));
    next.lock(Duration::from_millis(50)).await.unwrap();
}

#[tokio::test]
async fn unlock_keeps_the_lock_file_for_the_next_holder() {
    let temp = tempfile::tempdir().unwrap();
    let table = adapter(temp.path());
    let first = table.open_session(Duration::from_secs(30)).await.unwrap();
    let second = table.open_session(Duration::from_secs(30)).await.unwrap();

    let mut held = first.new_mutex(&key("deploy"));
    held.lock(Duration::from_secs(1)).await.unwrap();
    held.unlock(Duration::from_secs(1)).await.unwrap();
    assert!(held.path().exists());

    let mut next = second.new_mutex(&key("deploy"));
    next.lock(Duration::from_millis(50)).await.unwrap();
    assert_eq!(next.path(), held.path());
    let contents = std::fs::read_to_string(next.path()).unwrap();
    assert_eq!(contents.trim(), second.id());

    let files = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(files, 1);
}
