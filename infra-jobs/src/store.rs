use std::io::{Cursor, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};

use async_trait::async_trait;
use photon_domain::{AudioBuffer, DomainError, JobId, JobOutcome, JobStatus, JobStorePort};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

const INPUT_EXTENSION: &str = "wav";
const RESULT_EXTENSION: &str = "json";
const TEMP_EXTENSION: &str = "tmp";
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(10);

#[derive(Debug, Clone)]
pub struct DiskJobStoreConfig {
    pub root: PathBuf,
    pub max_result_age: Duration,
    pub cleanup_interval: Duration,
}

/// Job records as plain files under one directory: `<id>.wav` while pending,
/// `<id>.json` once a result exists.
pub struct DiskJobStore {
    config: DiskJobStoreConfig,
    last_sweep: Mutex<Option<Instant>>,
}

impl DiskJobStore {
    pub async fn open(config: DiskJobStoreConfig) -> Result<Self, DomainError> {
        tokio::fs::create_dir_all(&config.root)
            .await
            .map_err(|err| storage("create output root", &config.root, err))?;
        tracing::info!(root = %config.root.display(), "job store ready");
        Ok(Self {
            config,
            last_sweep: Mutex::new(None),
        })
    }

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    fn input_path(&self, id: JobId) -> PathBuf {
        self.config.root.join(format!("{id}.{INPUT_EXTENSION}"))
    }

    fn result_path(&self, id: JobId) -> PathBuf {
        self.config.root.join(format!("{id}.{RESULT_EXTENSION}"))
    }

    async fn write_atomically(&self, path: &Path, bytes: Vec<u8>) -> Result<(), DomainError> {
        let mut temp = path.as_os_str().to_owned();
        temp.push(".");
        temp.push(TEMP_EXTENSION);
        let temp = PathBuf::from(temp);
        tokio::fs::write(&temp, bytes)
            .await
            .map_err(|err| storage("write", &temp, err))?;
        tokio::fs::rename(&temp, path)
            .await
            .map_err(|err| storage("rename", path, err))
    }
}

fn storage(action: &str, path: &Path, err: std::io::Error) -> DomainError {
    DomainError::Storage(format!("{action} {}: {err}", path.display()))
}

fn encode_input(audio: &AudioBuffer) -> Result<Vec<u8>, DomainError> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: audio.sample_rate_hz,
        bits_per_sample: 32,
        sample_format: hound::SampleFormat::Float,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec)
            .map_err(|err| DomainError::Storage(format!("stage input: {err}")))?;
        for sample in &audio.samples {
            writer
                .write_sample(*sample)
                .map_err(|err| DomainError::Storage(format!("stage input: {err}")))?;
        }
        writer
            .finalize()
            .map_err(|err| DomainError::Storage(format!("stage input: {err}")))?;
    }
    Ok(cursor.into_inner())
}

fn decode_input(bytes: &[u8]) -> Result<AudioBuffer, DomainError> {
    let mut reader = hound::WavReader::new(Cursor::new(bytes))
        .map_err(|err| DomainError::Storage(format!("load input: {err}")))?;
    let sample_rate_hz = reader.spec().sample_rate;
    let samples = reader
        .samples::<f32>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(|err| DomainError::Storage(format!("load input: {err}")))?;
    Ok(AudioBuffer::new(sample_rate_hz, samples))
}

#[async_trait]
impl JobStorePort for DiskJobStore {
    async fn stage_input(&self, id: JobId, audio: &AudioBuffer) -> Result<(), DomainError> {
        let bytes = encode_input(audio)?;
        self.write_atomically(&self.input_path(id), bytes).await?;
        tracing::debug!(job_id = %id, samples = audio.samples.len(), "staged job input");
        Ok(())
    }

    async fn load_input(&self, id: JobId) -> Result<AudioBuffer, DomainError> {
        let path = self.input_path(id);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|err| storage("read", &path, err))?;
        decode_input(&bytes)
    }

    async fn remove_input(&self, id: JobId) -> Result<(), DomainError> {
        let path = self.input_path(id);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(storage("remove", &path, err)),
        }
    }

    async fn write_result(&self, id: JobId, outcome: &JobOutcome) -> Result<(), DomainError> {
        let bytes = serde_json::to_vec(outcome)
            .map_err(|err| DomainError::Storage(format!("serialize result: {err}")))?;
        self.write_atomically(&self.result_path(id), bytes).await?;
        tracing::debug!(job_id = %id, "wrote job result");
        Ok(())
    }

    async fn read_result(&self, id: JobId) -> Result<Option<JobOutcome>, DomainError> {
        let path = self.result_path(id);
        let bytes = match tokio::fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(storage("read", &path, err)),
        };
        serde_json::from_slice(&bytes)
            .map(Some)
            .map_err(|err| DomainError::Storage(format!("parse {}: {err}", path.display())))
    }

    async fn status(&self, id: JobId) -> Result<JobStatus, DomainError> {
        let result_path = self.result_path(id);
        let result_exists = tokio::fs::try_exists(&result_path)
            .await
            .map_err(|err| storage("stat", &result_path, err))?;
        if result_exists {
            return Ok(JobStatus::Done);
        }
        let input_path = self.input_path(id);
        let input_exists = tokio::fs::try_exists(&input_path)
            .await
            .map_err(|err| storage("stat", &input_path, err))?;
        Ok(JobStatus::from_presence(false, input_exists))
    }

    async fn pending_count(&self) -> Result<usize, DomainError> {
        let root = &self.config.root;
        let mut entries = tokio::fs::read_dir(root)
            .await
            .map_err(|err| storage("list", root, err))?;
        let mut count = 0;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|err| storage("list", root, err))?
        {
            if entry.path().extension().is_some_and(|ext| ext == INPUT_EXTENSION) {
                count += 1;
            }
        }
        Ok(count)
    }

    async fn sweep(&self, now: SystemTime, max_age: Duration) -> Result<usize, DomainError> {
        let root = &self.config.root;
        let mut entries = tokio::fs::read_dir(root)
            .await
            .map_err(|err| storage("list", root, err))?;
        let mut removed = 0;
        loop {
            let entry = match entries.next_entry().await {
                Ok(Some(entry)) => entry,
                Ok(None) => break,
                Err(err) => {
                    tracing::warn!(error = %err, "failed to list job store entry");
                    break;
                }
            };
            let path = entry.path();
            // results, plus temp files a crash left between write and rename
            if !path
                .extension()
                .is_some_and(|ext| ext == RESULT_EXTENSION || ext == TEMP_EXTENSION)
            {
                continue;
            }
            let modified = match entry.metadata().await.and_then(|meta| meta.modified()) {
                Ok(modified) => modified,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "cannot stat result");
                    continue;
                }
            };
            // clock skew: files from the future are never expired
            let Ok(age) = now.duration_since(modified) else {
                continue;
            };
            if age <= max_age {
                continue;
            }
            match tokio::fs::remove_file(&path).await {
                Ok(()) => removed += 1,
                Err(err) => {
                    tracing::warn!(path = %path.display(), error = %err, "failed to remove expired result")
                }
            }
        }
        if removed > 0 {
            tracing::info!(removed, "swept expired job results");
        }
        Ok(removed)
    }

    async fn sweep_if_due(&self) -> Result<usize, DomainError> {
        {
            let mut last_sweep = self.last_sweep.lock().await;
            if last_sweep.is_some_and(|at| at.elapsed() < self.config.cleanup_interval) {
                return Ok(0);
            }
            *last_sweep = Some(Instant::now());
        }
        self.sweep(SystemTime::now(), self.config.max_result_age)
            .await
    }
}

/// Calls `sweep_if_due` every `period` until the runtime shuts down.
pub fn spawn_periodic_sweep(store: Arc<dyn JobStorePort>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period.max(MIN_SWEEP_PERIOD));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(err) = store.sweep_if_due().await {
                tracing::warn!(error = %err, "periodic sweep failed");
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use photon_domain::TranscriptSegment;

    async fn store(dir: &Path, cleanup_interval: Duration) -> DiskJobStore {
        DiskJobStore::open(DiskJobStoreConfig {
            root: dir.join("jobs"),
            max_result_age: Duration::from_secs(86_400),
            cleanup_interval,
        })
        .await
        .expect("store opens")
    }

    fn segments() -> JobOutcome {
        JobOutcome::Completed(vec![TranscriptSegment {
            text: "hello".into(),
            start_ms: 0,
            end_ms: 500,
            words: Vec::new(),
            speaker: Some("SPEAKER_00".into()),
        }])
    }

    #[tokio::test]
    async fn status_follows_files_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), Duration::from_secs(3_600)).await;
        let id = JobId::generate();

        assert_eq!(store.status(id).await.unwrap(), JobStatus::NotFound);

        store
            .stage_input(id, &AudioBuffer::new(16_000, vec![0.1, -0.2, 0.3]))
            .await
            .unwrap();
        assert_eq!(store.status(id).await.unwrap(), JobStatus::Pending);
        assert_eq!(store.pending_count().await.unwrap(), 1);

        let staged = store.load_input(id).await.unwrap();
        assert_eq!(staged.sample_rate_hz, 16_000);
        assert_eq!(staged.samples, vec![0.1, -0.2, 0.3]);

        store.write_result(id, &segments()).await.unwrap();
        assert_eq!(store.status(id).await.unwrap(), JobStatus::Done);
        store.remove_input(id).await.unwrap();
        assert_eq!(store.status(id).await.unwrap(), JobStatus::Done);
        assert_eq!(store.pending_count().await.unwrap(), 0);
        assert_eq!(store.read_result(id).await.unwrap(), Some(segments()));
    }

    #[tokio::test]
    async fn result_write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), Duration::from_secs(3_600)).await;
        let id = JobId::generate();
        store
            .write_result(id, &JobOutcome::Failed { error: "boom".into() })
            .await
            .unwrap();

        let names: Vec<String> = std::fs::read_dir(store.root())
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![format!("{id}.json")]);
        let raw = std::fs::read_to_string(store.root().join(format!("{id}.json"))).unwrap();
        assert_eq!(raw, r#"{"error":"boom"}"#);
    }

    #[tokio::test]
    async fn missing_result_reads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), Duration::from_secs(3_600)).await;
        assert_eq!(store.read_result(JobId::generate()).await.unwrap(), None);
        store.remove_input(JobId::generate()).await.unwrap();
    }

    #[tokio::test]
    async fn sweep_removes_only_expired_results() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), Duration::from_secs(3_600)).await;
        let done = JobId::generate();
        let pending = JobId::generate();
        store.write_result(done, &segments()).await.unwrap();
        store
            .stage_input(pending, &AudioBuffer::new(16_000, vec![0.0; 4]))
            .await
            .unwrap();

        let day = Duration::from_secs(86_400);
        assert_eq!(store.sweep(SystemTime::now(), day).await.unwrap(), 0);
        assert_eq!(store.status(done).await.unwrap(), JobStatus::Done);

        let later = SystemTime::now() + day * 2;
        assert_eq!(store.sweep(later, day).await.unwrap(), 1);
        assert_eq!(store.status(done).await.unwrap(), JobStatus::NotFound);
        assert_eq!(store.status(pending).await.unwrap(), JobStatus::Pending);
    }

    #[tokio::test]
    async fn sweep_if_due_is_rate_limited() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskJobStore::open(DiskJobStoreConfig {
            root: dir.path().to_path_buf(),
            max_result_age: Duration::ZERO,
            cleanup_interval: Duration::from_secs(3_600),
        })
        .await
        .unwrap();

        assert_eq!(store.sweep_if_due().await.unwrap(), 0);
        let id = JobId::generate();
        store.write_result(id, &segments()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert_eq!(store.sweep_if_due().await.unwrap(), 0);
        assert_eq!(store.status(id).await.unwrap(), JobStatus::Done);
    }

    #[tokio::test]
    async fn sweep_removes_stale_temp_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path(), Duration::from_secs(3_600)).await;
        let id = JobId::generate();
        let result_tmp = store.root().join(format!("{id}.json.tmp"));
        let input_tmp = store.root().join(format!("{id}.wav.tmp"));
        std::fs::write(&result_tmp, b"{\"err").unwrap();
        std::fs::write(&input_tmp, b"RIFF").unwrap();

        let day = Duration::from_secs(86_400);
        assert_eq!(store.sweep(SystemTime::now(), day).await.unwrap(), 0);
        assert!(result_tmp.exists());

        assert_eq!(store.sweep(SystemTime::now() + day * 2, day).await.unwrap(), 2);
        assert!(!result_tmp.exists());
        assert!(!input_tmp.exists());
    }

    #[tokio::test]
    async fn periodic_sweeper_expires_results_without_traffic() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(
            DiskJobStore::open(DiskJobStoreConfig {
                root: dir.path().to_path_buf(),
                max_result_age: Duration::ZERO,
                cleanup_interval: Duration::ZERO,
            })
            .await
            .unwrap(),
        );
        let id = JobId::generate();
        store.write_result(id, &segments()).await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        let sweeper = spawn_periodic_sweep(store.clone(), Duration::from_millis(20));
        let mut status = JobStatus::Done;
        for _ in 0..100 {
            status = store.status(id).await.unwrap();
            if status == JobStatus::NotFound {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        sweeper.abort();
        assert_eq!(status, JobStatus::NotFound);
    }
}
