//! File-backed state store tests
//!
//! These open a snapshot in a temp directory, mutate it, and reopen it to
//! check that every committed change survives and nothing else does.

use camino::Utf8PathBuf;
use serde_json::json;
use strata_core::types::{ModuleRelease, ModuleSelector, NewModule, ReleaseRequest};
use strata_core::Error;
use strata_store::{ComponentRecords, ModuleRepository, StateStore};
use tempfile::TempDir;

fn state_path(dir: &TempDir) -> Utf8PathBuf {
    Utf8PathBuf::from_path_buf(dir.path().join("nested").join("state.json")).unwrap()
}

#[tokio::test]
async fn test_state_survives_reopen() {
    let dir = TempDir::new().unwrap();
    let path = state_path(&dir);

    {
        let store = StateStore::open(path.clone()).unwrap();
        let module = store
            .insert_module(NewModule::new("web", "1.0.0", "chart: []"))
            .await
            .unwrap();
        let release = store
            .insert_module_release(ModuleRelease::draft(
                &ReleaseRequest::new("r1", "replicas: 2"),
                &module,
                1,
            ))
            .await
            .unwrap();
        store
            .insert_component("chart", "r1-web", release.id, json!({"name": "web"}))
            .await
            .unwrap();
    }

    assert!(path.exists());
    let reopened = StateStore::open(path).unwrap();
    let release = reopened.get_module_release("r1").await.unwrap();
    assert_eq!(release.revision, 1);
    assert_eq!(release.values, "replicas: 2");
    assert_eq!(
        reopened
            .components_by_release("chart", release.id)
            .await
            .unwrap(),
        vec![json!({"name": "web"})]
    );

    // ids keep increasing after a reopen
    let next = reopened
        .insert_module(NewModule::new("web", "2.0.0", "chart: []"))
        .await
        .unwrap();
    assert!(next.id > release.id);
    let latest = reopened
        .get_module(&ModuleSelector::latest("web"))
        .await
        .unwrap();
    assert_eq!(latest.version, "2.0.0");
}

#[tokio::test]
async fn test_rejected_mutation_is_not_persisted() {
    let dir = TempDir::new().unwrap();
    let path = state_path(&dir);

    let store = StateStore::open(path.clone()).unwrap();
    store
        .insert_module(NewModule::new("web", "1.0.0", "a"))
        .await
        .unwrap();
    let err = store
        .insert_module(NewModule::new("web", "1.0.0", "b"))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));

    let reopened = StateStore::open(path).unwrap();
    let modules = reopened.list_modules().await.unwrap();
    assert_eq!(modules.len(), 1);
    assert_eq!(modules[0].spec, "a");
}

#[test]
fn test_corrupt_snapshot_is_store_error() {
    let dir = TempDir::new().unwrap();
    let path = Utf8PathBuf::from_path_buf(dir.path().join("state.json")).unwrap();
    std::fs::write(&path, "{ not json").unwrap();

    let err = StateStore::open(path).err().unwrap();
    assert!(matches!(err, Error::Store(_)));
}

#[test]
fn test_missing_snapshot_starts_empty() {
    let dir = TempDir::new().unwrap();
    let store = StateStore::open(state_path(&dir)).unwrap();
    assert!(store.path().is_some());
}

#[tokio::test]
async fn test_two_handles_on_one_file_keep_both_writes() {
    let dir = TempDir::new().unwrap();
    let path = state_path(&dir);

    let first = StateStore::open(path.clone()).unwrap();
    let second = StateStore::open(path.clone()).unwrap();
    first
        .insert_module(NewModule::new("m", "1.0.0", "a"))
        .await
        .unwrap();
    second
        .insert_module(NewModule::new("n", "1.0.0", "b"))
        .await
        .unwrap();

    // each handle sees the other's commit
    assert!(first
        .get_module(&ModuleSelector::latest("n"))
        .await
        .is_ok());

    let reopened = StateStore::open(path).unwrap();
    let mut names: Vec<_> = reopened
        .list_modules()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    names.sort();
    assert_eq!(names, vec!["m", "n"]);

    let ids: Vec<_> = reopened.list_modules().await.unwrap().iter().map(|m| m.id).collect();
    assert_ne!(ids[0], ids[1]);
}

#[tokio::test]
async fn test_supersede_sees_revision_committed_by_other_handle() {
    let dir = TempDir::new().unwrap();
    let path = state_path(&dir);

    let first = StateStore::open(path.clone()).unwrap();
    let second = StateStore::open(path).unwrap();
    let module = first
        .insert_module(NewModule::new("web", "1.0.0", "chart: []"))
        .await
        .unwrap();
    let request = ReleaseRequest::new("r1", "");
    let live = first
        .insert_module_release(ModuleRelease::draft(&request, &module, 1))
        .await
        .unwrap();

    // both handles read revision 1, then race to supersede it
    let seen = second.get_module_release("r1").await.unwrap();
    assert_eq!(seen.id, live.id);
    first
        .supersede_module_release(&live, ModuleRelease::draft(&request, &module, 2))
        .await
        .unwrap();
    let err = second
        .supersede_module_release(&seen, ModuleRelease::draft(&request, &module, 2))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Conflict(_)));
    assert_eq!(second.get_all_module_release().await.unwrap(), vec!["r1"]);

    // and a second install of the same name is rejected too
    let dup = second
        .insert_module_release(ModuleRelease::draft(&request, &module, 1))
        .await
        .unwrap_err();
    assert!(matches!(dup, Error::Conflict(_)));
}
