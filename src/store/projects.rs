use std::sync::Arc;

use log::{error, info, warn};
use tokio::sync::Mutex;

use crate::error::StoreError;
use crate::models::{suggest_name, Project, Run};

use super::KeyValueStore;

/// Key the whole project collection is stored under.
pub const PROJECTS_KEY: &str = "projects";

/// Durable, ordered collection of projects.
///
/// Every mutation is a read-modify-write of the entire collection. Those
/// cycles are serialized through `write_lock`, so concurrent writers sharing
/// one store cannot lose each other's updates. Clones share the lock.
pub struct ProjectStore<K> {
    backend: Arc<K>,
    write_lock: Arc<Mutex<()>>,
}

impl<K> Clone for ProjectStore<K> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            write_lock: Arc::clone(&self.write_lock),
        }
    }
}

impl<K: KeyValueStore> ProjectStore<K> {
    pub fn new(backend: K) -> Self {
        Self {
            backend: Arc::new(backend),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    #[cfg(test)]
    pub(crate) fn backend(&self) -> &K {
        &self.backend
    }

    /// All projects in insertion order. An absent collection is empty.
    pub async fn load_all(&self) -> Result<Vec<Project>, StoreError> {
        let raw = self
            .backend
            .get_item(PROJECTS_KEY)
            .await
            .map_err(|err| StoreError::StorageUnavailable(format!("{err:#}")))?;

        match raw {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|err| {
                StoreError::StorageUnavailable(format!("stored projects are unreadable: {err}"))
            }),
        }
    }

    /// Like [`load_all`](Self::load_all), but an unreadable store yields an
    /// empty list.
    pub async fn load_or_empty(&self) -> Vec<Project> {
        match self.load_all().await {
            Ok(projects) => projects,
            Err(err) => {
                warn!("Showing empty project list: {err}");
                Vec::new()
            }
        }
    }

    pub async fn find_by_id(&self, project_id: &str) -> Result<Project, StoreError> {
        self.load_all()
            .await?
            .into_iter()
            .find(|project| project.id == project_id)
            .ok_or_else(|| StoreError::NotFound(project_id.to_string()))
    }

    pub async fn create(&self, project: Project) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut projects = self.load_all().await?;
        let project_id = project.id.clone();
        projects.push(project);
        self.write_all(&projects).await?;

        info!("Created project {project_id}");
        Ok(())
    }

    /// Appends `run` to the project's history. Existing runs are untouched.
    pub async fn append_run(&self, project_id: &str, run: Run) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().await;

        let mut projects = self.load_all().await?;
        let project = projects
            .iter_mut()
            .find(|project| project.id == project_id)
            .ok_or_else(|| StoreError::NotFound(project_id.to_string()))?;

        let run_name = run.name.clone();
        project.runs.push(run);
        self.write_all(&projects).await?;

        info!("Saved {run_name} to project {project_id}");
        Ok(())
    }

    /// Default name for the next project, avoiding names already in use.
    pub async fn suggest_name(&self) -> String {
        suggest_name(&self.load_or_empty().await)
    }

    async fn write_all(&self, projects: &[Project]) -> Result<(), StoreError> {
        let serialized = serde_json::to_string(projects)
            .map_err(|err| StoreError::StorageWriteFailed(err.to_string()))?;

        self.backend
            .set_item(PROJECTS_KEY, &serialized)
            .await
            .map_err(|err| {
                error!("Failed to persist projects: {err:#}");
                StoreError::StorageWriteFailed(format!("{err:#}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use anyhow::{anyhow, Result};
    use chrono::Utc;

    use super::*;
    use crate::models::{run_label, NewProject};
    use crate::store::MemoryStore;
    use crate::timer::TimerMode;

    /// Memory store whose reads or writes can be switched off, and which
    /// yields between the read and write halves of every mutation.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        fail_reads: AtomicBool,
        fail_writes: AtomicBool,
    }

    impl KeyValueStore for FlakyStore {
        async fn get_item(&self, key: &str) -> Result<Option<String>> {
            if self.fail_reads.load(Ordering::SeqCst) {
                return Err(anyhow!("disk unreadable"));
            }
            let value = self.inner.get_item(key).await;
            tokio::task::yield_now().await;
            value
        }

        async fn set_item(&self, key: &str, value: &str) -> Result<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(anyhow!("disk full"));
            }
            self.inner.set_item(key, value).await
        }
    }

    fn project(name: &str, minutes: u32) -> Project {
        NewProject {
            name: name.into(),
            minutes,
            word_count: 400,
            ..Default::default()
        }
        .into_project()
        .unwrap()
    }

    fn run(existing: usize, duration: u32) -> Run {
        Run::new(run_label(existing), Utc::now(), duration, TimerMode::Countdown)
    }

    #[tokio::test]
    async fn empty_store_loads_no_projects() {
        let store = ProjectStore::new(MemoryStore::new());
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn created_project_is_found_unchanged() {
        let store = ProjectStore::new(MemoryStore::new());
        let keynote = project("Keynote", 5);
        store.create(keynote.clone()).await.unwrap();

        let found = store.find_by_id(&keynote.id).await.unwrap();
        assert_eq!(found, keynote);
        assert!(found.runs.is_empty());
    }

    #[tokio::test]
    async fn create_preserves_insertion_order() {
        let store = ProjectStore::new(MemoryStore::new());
        for name in ["First", "Second", "Third"] {
            store.create(project(name, 1)).await.unwrap();
        }

        let names: Vec<_> = store
            .load_all()
            .await
            .unwrap()
            .into_iter()
            .map(|project| project.name)
            .collect();
        assert_eq!(names, ["First", "Second", "Third"]);
    }

    #[tokio::test]
    async fn unknown_id_is_not_found() {
        let store = ProjectStore::new(MemoryStore::new());
        store.create(project("Pitch", 2)).await.unwrap();

        assert!(matches!(
            store.find_by_id("missing").await,
            Err(StoreError::NotFound(id)) if id == "missing"
        ));
        assert!(matches!(
            store.append_run("missing", run(0, 10)).await,
            Err(StoreError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn append_run_adds_one_and_keeps_history() {
        let store = ProjectStore::new(MemoryStore::new());
        let pitch = project("Pitch", 2);
        let other = project("Other", 3);
        store.create(pitch.clone()).await.unwrap();
        store.create(other.clone()).await.unwrap();

        for existing in 0..3 {
            store
                .append_run(&pitch.id, run(existing, 60 + existing as u32))
                .await
                .unwrap();
        }
        let before = store.find_by_id(&pitch.id).await.unwrap().runs;

        let next = run(before.len(), 118);
        store.append_run(&pitch.id, next.clone()).await.unwrap();

        let after = store.find_by_id(&pitch.id).await.unwrap().runs;
        assert_eq!(after.len(), before.len() + 1);
        assert_eq!(after[..before.len()], before[..]);
        assert_eq!(after.last(), Some(&next));
        assert_eq!(next.name, "Run #4");

        assert!(store.find_by_id(&other.id).await.unwrap().runs.is_empty());
    }

    #[tokio::test]
    async fn unreadable_store_degrades_to_empty_list() {
        let backend = FlakyStore::default();
        backend.fail_reads.store(true, Ordering::SeqCst);
        let store = ProjectStore::new(backend);

        assert!(matches!(
            store.load_all().await,
            Err(StoreError::StorageUnavailable(_))
        ));
        assert!(store.load_or_empty().await.is_empty());
    }

    #[tokio::test]
    async fn corrupt_collection_is_unavailable() {
        let backend = MemoryStore::new();
        backend.set_item(PROJECTS_KEY, "{not json").await.unwrap();
        let store = ProjectStore::new(backend);

        assert!(matches!(
            store.load_all().await,
            Err(StoreError::StorageUnavailable(_))
        ));
    }

    #[tokio::test]
    async fn failed_write_is_reported_and_nothing_changes() {
        let store = ProjectStore::new(FlakyStore::default());
        let pitch = project("Pitch", 2);
        store.create(pitch.clone()).await.unwrap();

        store.backend.fail_writes.store(true, Ordering::SeqCst);
        assert!(matches!(
            store.append_run(&pitch.id, run(0, 30)).await,
            Err(StoreError::StorageWriteFailed(_))
        ));
        assert!(matches!(
            store.create(project("Another", 1)).await,
            Err(StoreError::StorageWriteFailed(_))
        ));

        store.backend.fail_writes.store(false, Ordering::SeqCst);
        let projects = store.load_all().await.unwrap();
        assert_eq!(projects.len(), 1);
        assert!(projects[0].runs.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_appends_are_not_lost() {
        let store = ProjectStore::new(FlakyStore::default());
        let pitch = project("Pitch", 2);
        store.create(pitch.clone()).await.unwrap();

        let mut tasks = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            let project_id = pitch.id.clone();
            tasks.push(tokio::spawn(async move {
                store.append_run(&project_id, run(i, i as u32)).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let runs = store.find_by_id(&pitch.id).await.unwrap().runs;
        assert_eq!(runs.len(), 16);
    }

    #[tokio::test]
    async fn suggested_name_skips_existing_projects() {
        let store = ProjectStore::new(MemoryStore::new());
        assert_eq!(store.suggest_name().await, "Untitled");
        store.create(project("Untitled", 1)).await.unwrap();
        assert_eq!(store.suggest_name().await, "Untitled 1");
    }
}
