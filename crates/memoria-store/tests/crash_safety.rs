//! Crash-safety: a failure at any durable step leaves the store either fully
//! old or fully new after the next open.

mod common;

use std::sync::Arc;

use common::{config, open, CrashingBackend, FailOn, NEW_PASSWORD, PASSWORD};
use memoria_core::{EntryPatch, ErrorKind, MemoryType, NewEntry};
use memoria_store::{Journal, RekeyRecovery, StorageBackend};
use tempfile::TempDir;

async fn open_crashing(dir: &std::path::Path, fail_on: FailOn) -> (Journal, Arc<CrashingBackend>) {
    let backend = CrashingBackend::new(dir, fail_on);
    let shared: Arc<dyn StorageBackend> = backend.clone();
    let journal = Journal::open_with_backend(config(dir), shared).await.unwrap();
    (journal, backend)
}

fn entry(title: &str) -> NewEntry {
    NewEntry::new(title, format!("{title} body"), MemoryType::Text)
}

#[tokio::test]
async fn test_torn_update_leaves_old_entry() {
    let dir = TempDir::new().unwrap();
    let (journal, backend) = open_crashing(dir.path(), FailOn::WritePrefix("entries/")).await;
    let created = journal.create_entry(entry("before"), false).await.unwrap();

    backend.arm();
    let err = journal
        .update_entry(
            &created.id,
            EntryPatch {
                title: Some("after".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageIoFailure);
    assert_eq!(journal.get_entry(&created.id).await.unwrap().title, "before");
    drop(journal);

    let reopened = open(dir.path()).await;
    let report = reopened.recovery_report().await;
    assert_eq!(report.temp_files_removed, 1);

    let loaded = reopened.get_entry(&created.id).await.unwrap();
    assert_eq!(loaded.title, "before");
    assert_eq!(loaded.content, "before body");
    assert_eq!(loaded.updated_at, created.updated_at);
}

#[tokio::test]
async fn test_torn_create_leaves_nothing() {
    let dir = TempDir::new().unwrap();
    let (journal, backend) = open_crashing(dir.path(), FailOn::WritePrefix("entries/")).await;

    backend.arm();
    assert!(journal.create_entry(entry("lost"), false).await.is_err());
    assert!(journal.get_all_entries().await.unwrap().is_empty());
    drop(journal);

    let reopened = open(dir.path()).await;
    assert!(reopened.get_all_entries().await.unwrap().is_empty());
    assert_eq!(reopened.recovery_report().await.temp_files_removed, 1);
}

#[tokio::test]
async fn test_attachment_without_record_is_removed() {
    let dir = TempDir::new().unwrap();
    let (journal, backend) = open_crashing(dir.path(), FailOn::WritePrefix("entries/")).await;
    let created = journal.create_entry(entry("photo"), false).await.unwrap();

    // Blob lands, the record that would reference it does not
    backend.arm();
    assert!(journal
        .add_attachment(&created.id, "a.png", "image/png", b"png")
        .await
        .is_err());
    drop(journal);

    let reopened = open(dir.path()).await;
    let report = reopened.recovery_report().await;
    assert_eq!(report.orphan_blobs_removed, 1);
    assert!(reopened
        .get_entry(&created.id)
        .await
        .unwrap()
        .attachments
        .is_empty());
}

#[tokio::test]
async fn test_change_password_reseals_everything() {
    let dir = TempDir::new().unwrap();
    let journal = open(dir.path()).await;
    journal.set_master_password(PASSWORD).await.unwrap();
    let sealed = journal.create_entry(entry("secret"), true).await.unwrap();
    let plain = journal.create_entry(entry("open"), false).await.unwrap();
    let attachment = journal
        .add_attachment(&sealed.id, "note.txt", "text/plain", b"attached")
        .await
        .unwrap();

    journal.change_password(PASSWORD, NEW_PASSWORD).await.unwrap();
    assert!(journal.is_authenticated().await);
    drop(journal);

    let reopened = open(dir.path()).await;
    assert!(reopened.recovery_report().await.is_clean());
    assert!(!reopened.verify_master_password(PASSWORD).await.unwrap());
    assert!(reopened.verify_master_password(NEW_PASSWORD).await.unwrap());

    assert_eq!(reopened.get_entry(&sealed.id).await.unwrap().content, "secret body");
    assert_eq!(reopened.get_entry(&plain.id).await.unwrap().content, "open body");
    let (_, data) = reopened
        .read_attachment(&sealed.id, &attachment.id)
        .await
        .unwrap();
    assert_eq!(data, b"attached");
}

#[tokio::test]
async fn test_change_password_wrong_old_password() {
    let dir = TempDir::new().unwrap();
    let journal = open(dir.path()).await;
    journal.set_master_password(PASSWORD).await.unwrap();

    let err = journal
        .change_password("not-the-password", NEW_PASSWORD)
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AuthenticationFailed);
    assert!(journal.verify_master_password(PASSWORD).await.unwrap());
}

#[tokio::test]
async fn test_rekey_failure_before_commit_keeps_old_password() {
    let dir = TempDir::new().unwrap();
    let (journal, backend) = open_crashing(dir.path(), FailOn::WritePrefix("rekey.commit")).await;
    journal.set_master_password(PASSWORD).await.unwrap();
    let sealed = journal.create_entry(entry("secret"), true).await.unwrap();

    backend.arm();
    assert!(journal.change_password(PASSWORD, NEW_PASSWORD).await.is_err());
    // The running journal still holds the old key
    assert_eq!(journal.get_entry(&sealed.id).await.unwrap().content, "secret body");
    drop(journal);

    let reopened = open(dir.path()).await;
    assert_eq!(reopened.recovery_report().await.rekey, RekeyRecovery::None);
    assert!(!reopened.verify_master_password(NEW_PASSWORD).await.unwrap());
    assert!(reopened.verify_master_password(PASSWORD).await.unwrap());
    assert_eq!(reopened.get_entry(&sealed.id).await.unwrap().content, "secret body");
}

#[tokio::test]
async fn test_rekey_failure_while_staging_keeps_old_password() {
    let dir = TempDir::new().unwrap();
    let (journal, backend) = open_crashing(dir.path(), FailOn::WritePrefix("rekey/")).await;
    journal.set_master_password(PASSWORD).await.unwrap();
    let sealed = journal.create_entry(entry("secret"), true).await.unwrap();

    backend.arm();
    assert!(journal.change_password(PASSWORD, NEW_PASSWORD).await.is_err());
    drop(journal);

    let reopened = open(dir.path()).await;
    assert!(reopened.verify_master_password(PASSWORD).await.unwrap());
    assert_eq!(reopened.get_entry(&sealed.id).await.unwrap().content, "secret body");
}

#[tokio::test]
async fn test_rekey_failure_after_commit_rolls_forward() {
    let dir = TempDir::new().unwrap();
    let (journal, backend) = open_crashing(dir.path(), FailOn::RenameFrom("rekey/")).await;
    journal.set_master_password(PASSWORD).await.unwrap();
    let sealed = journal.create_entry(entry("secret"), true).await.unwrap();
    let attachment = journal
        .add_attachment(&sealed.id, "note.txt", "text/plain", b"attached")
        .await
        .unwrap();

    backend.arm();
    assert!(journal.change_password(PASSWORD, NEW_PASSWORD).await.is_err());
    // Committed: the running journal already uses the new key
    assert!(journal.is_authenticated().await);
    drop(journal);

    let reopened = open(dir.path()).await;
    assert_eq!(
        reopened.recovery_report().await.rekey,
        RekeyRecovery::RolledForward
    );
    assert!(!reopened.verify_master_password(PASSWORD).await.unwrap());
    assert!(reopened.verify_master_password(NEW_PASSWORD).await.unwrap());
    assert_eq!(reopened.get_entry(&sealed.id).await.unwrap().content, "secret body");
    let (_, data) = reopened
        .read_attachment(&sealed.id, &attachment.id)
        .await
        .unwrap();
    assert_eq!(data, b"attached");
}

#[tokio::test]
async fn test_writes_wait_for_committed_rekey_to_land() {
    let dir = TempDir::new().unwrap();
    let (journal, backend) = open_crashing(dir.path(), FailOn::RenameFrom("rekey/")).await;
    journal.set_master_password(PASSWORD).await.unwrap();
    let sealed = journal.create_entry(entry("secret"), true).await.unwrap();
    let attachment = journal
        .add_attachment(&sealed.id, "note.txt", "text/plain", b"attached")
        .await
        .unwrap();

    backend.arm();
    assert!(journal.change_password(PASSWORD, NEW_PASSWORD).await.is_err());

    // The move is still blocked, so the edit must not land on the old file
    let edit = EntryPatch {
        content: Some("NEW body".to_string()),
        ..Default::default()
    };
    let err = journal
        .update_entry(&sealed.id, edit.clone())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageIoFailure);
    let err = journal.backup(dir.path().join("copy")).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::StorageIoFailure);

    // Reads still see the re-sealed state
    assert_eq!(journal.get_entry(&sealed.id).await.unwrap().content, "secret body");
    let (_, data) = journal
        .read_attachment(&sealed.id, &attachment.id)
        .await
        .unwrap();
    assert_eq!(data, b"attached");

    backend.disarm();
    let updated = journal.update_entry(&sealed.id, edit).await.unwrap();
    assert_eq!(updated.content, "NEW body");
    assert!(!dir.path().join("rekey.commit").exists());
    drop(journal);

    let reopened = open(dir.path()).await;
    assert_eq!(reopened.recovery_report().await.rekey, RekeyRecovery::None);
    assert!(!reopened.verify_master_password(PASSWORD).await.unwrap());
    assert!(reopened.verify_master_password(NEW_PASSWORD).await.unwrap());
    assert_eq!(reopened.get_entry(&sealed.id).await.unwrap().content, "NEW body");
    let (_, data) = reopened
        .read_attachment(&sealed.id, &attachment.id)
        .await
        .unwrap();
    assert_eq!(data, b"attached");
}
