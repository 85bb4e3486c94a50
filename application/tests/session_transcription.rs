use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime};

use async_trait::async_trait;
use futures::future::BoxFuture;

use photon_application::{
    ApplicationError, TranscribeRequest, TranscribeResponse, TranscriptionPipeline,
    TranscriptionPolicy, TranscriptionUseCase, TranscriptionUseCaseImpl, UploadParams,
};
use photon_domain::{
    AlignmentPort, AudioBuffer, AudioCodecPort, BackgroundTaskPort, ContentSourcePort,
    DiarizationPort, DomainError, JobId, JobOutcome, JobStatus, JobStorePort, SpeakerTurn,
    Transcript, TranscriptSegment, TranscriptionPort, TranscriptionRequest,
};

/// Resolves a reference to its own bytes so tests can encode durations directly.
struct EchoSource;

#[async_trait]
impl ContentSourcePort for EchoSource {
    async fn fetch(&self, reference: &str) -> Result<Vec<u8>, DomainError> {
        if reference.starts_with("http://unreachable") {
            return Err(DomainError::external_service_error("http", "connection refused"));
        }
        Ok(reference.as_bytes().to_vec())
    }
}

/// Treats the payload as a number of seconds of silence.
struct SecondsCodec;

impl AudioCodecPort for SecondsCodec {
    fn decode(&self, bytes: &[u8], target_sample_rate_hz: u32) -> Result<AudioBuffer, DomainError> {
        let seconds: usize = std::str::from_utf8(bytes)
            .ok()
            .and_then(|raw| raw.trim().parse().ok())
            .ok_or_else(|| DomainError::invalid_input("not audio"))?;
        Ok(AudioBuffer::new(
            target_sample_rate_hz,
            vec![0.0; seconds * target_sample_rate_hz as usize],
        ))
    }

    fn encode_wav(&self, _audio: &AudioBuffer) -> Result<Vec<u8>, DomainError> {
        Ok(Vec::new())
    }
}

struct FixedTranscriber;

#[async_trait]
impl TranscriptionPort for FixedTranscriber {
    async fn transcribe(&self, request: TranscriptionRequest) -> Result<Transcript, DomainError> {
        Ok(Transcript {
            language: request.language.unwrap_or_else(|| "en".to_string()),
            segments: vec![TranscriptSegment {
                text: "hello world".to_string(),
                start_ms: 0,
                end_ms: 900,
                words: Vec::new(),
                speaker: None,
            }],
        })
    }
}

struct CrashingTranscriber;

#[async_trait]
impl TranscriptionPort for CrashingTranscriber {
    async fn transcribe(&self, _request: TranscriptionRequest) -> Result<Transcript, DomainError> {
        Err(DomainError::external_service_error("whisper", "decoder crashed"))
    }
}

struct PassthroughAligner;

#[async_trait]
impl AlignmentPort for PassthroughAligner {
    async fn align(
        &self,
        transcript: Transcript,
        _audio: &AudioBuffer,
    ) -> Result<Transcript, DomainError> {
        Ok(transcript)
    }
}

struct SingleSpeaker {
    fail: bool,
}

#[async_trait]
impl DiarizationPort for SingleSpeaker {
    async fn diarize(
        &self,
        _audio: &AudioBuffer,
        _speakers: Option<(u32, u32)>,
    ) -> Result<Vec<SpeakerTurn>, DomainError> {
        if self.fail {
            return Err(DomainError::external_service_error("diarization", "no active speech"));
        }
        Ok(vec![SpeakerTurn {
            speaker: "SPEAKER_00".to_string(),
            start_ms: 0,
            end_ms: 1_000,
        }])
    }
}

#[derive(Default)]
struct MemoryJobStore {
    inputs: Mutex<HashMap<JobId, AudioBuffer>>,
    results: Mutex<HashMap<JobId, JobOutcome>>,
}

#[async_trait]
impl JobStorePort for MemoryJobStore {
    async fn stage_input(&self, id: JobId, audio: &AudioBuffer) -> Result<(), DomainError> {
        self.inputs.lock().unwrap().insert(id, audio.clone());
        Ok(())
    }

    async fn load_input(&self, id: JobId) -> Result<AudioBuffer, DomainError> {
        self.inputs
            .lock()
            .unwrap()
            .get(&id)
            .cloned()
            .ok_or_else(|| DomainError::not_found("input"))
    }

    async fn remove_input(&self, id: JobId) -> Result<(), DomainError> {
        self.inputs.lock().unwrap().remove(&id);
        Ok(())
    }

    async fn write_result(&self, id: JobId, outcome: &JobOutcome) -> Result<(), DomainError> {
        self.results.lock().unwrap().insert(id, outcome.clone());
        Ok(())
    }

    async fn read_result(&self, id: JobId) -> Result<Option<JobOutcome>, DomainError> {
        Ok(self.results.lock().unwrap().get(&id).cloned())
    }

    async fn status(&self, id: JobId) -> Result<JobStatus, DomainError> {
        let done = self.results.lock().unwrap().contains_key(&id);
        let pending = self.inputs.lock().unwrap().contains_key(&id);
        Ok(JobStatus::from_presence(done, pending))
    }

    async fn pending_count(&self) -> Result<usize, DomainError> {
        Ok(self.inputs.lock().unwrap().len())
    }

    async fn sweep(&self, _now: SystemTime, _max_age: Duration) -> Result<usize, DomainError> {
        Ok(0)
    }

    async fn sweep_if_due(&self) -> Result<usize, DomainError> {
        Ok(0)
    }
}

struct SpawningBackground;

impl BackgroundTaskPort for SpawningBackground {
    fn submit(&self, _label: &'static str, task: BoxFuture<'static, ()>) -> Result<(), DomainError> {
        tokio::spawn(task);
        Ok(())
    }
}

fn usecase(fail_diarization: bool) -> (TranscriptionUseCaseImpl, Arc<MemoryJobStore>) {
    usecase_with(Arc::new(FixedTranscriber), fail_diarization)
}

fn usecase_with(
    transcriber: Arc<dyn TranscriptionPort>,
    fail_diarization: bool,
) -> (TranscriptionUseCaseImpl, Arc<MemoryJobStore>) {
    let jobs = Arc::new(MemoryJobStore::default());
    let pipeline = Arc::new(TranscriptionPipeline::new(
        transcriber,
        Arc::new(PassthroughAligner),
        Arc::new(SingleSpeaker {
            fail: fail_diarization,
        }),
    ));
    let usecase = TranscriptionUseCaseImpl::new(
        pipeline,
        Arc::new(EchoSource),
        Arc::new(SecondsCodec),
        jobs.clone(),
        Arc::new(SpawningBackground),
        TranscriptionPolicy {
            supported_languages: vec!["en".to_string(), "fr".to_string()],
            sync_threshold: Duration::from_secs(2),
            max_duration: Duration::from_secs(10),
        },
    );
    (usecase, jobs)
}

fn request(input: &str) -> TranscribeRequest {
    TranscribeRequest {
        input: input.to_string(),
        language: None,
        min_speakers: None,
        max_speakers: None,
        transcribe_only: false,
    }
}

async fn wait_for_done(usecase: &TranscriptionUseCaseImpl, task_id: &str) {
    for _ in 0..100 {
        let status = usecase.status(task_id).await.expect("status").status;
        if status == JobStatus::Done {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("task {task_id} never completed");
}

#[tokio::test]
async fn short_audio_is_transcribed_inline_with_speakers() {
    let (usecase, _) = usecase(false);
    let response = usecase.run(request("1")).await.expect("inline run");

    let TranscribeResponse::Segments(segments) = response else {
        panic!("expected inline segments");
    };
    assert_eq!(segments.len(), 1);
    assert_eq!(segments[0].speaker.as_deref(), Some("SPEAKER_00"));
}

#[tokio::test]
async fn transcribe_only_skips_diarization() {
    let (usecase, _) = usecase(false);
    let mut req = request("1");
    req.transcribe_only = true;

    let TranscribeResponse::Segments(segments) = usecase.run(req).await.expect("inline run") else {
        panic!("expected inline segments");
    };
    assert_eq!(segments[0].speaker, None);
}

#[tokio::test]
async fn diarization_failure_keeps_aligned_segments() {
    let (usecase, _) = usecase(true);
    let TranscribeResponse::Segments(segments) = usecase.run(request("1")).await.expect("run")
    else {
        panic!("expected inline segments");
    };
    assert_eq!(segments[0].text, "hello world");
    assert_eq!(segments[0].speaker, None);
}

#[tokio::test]
async fn medium_audio_becomes_a_background_job() {
    let (usecase, jobs) = usecase(false);
    let TranscribeResponse::Task(handle) = usecase.run(request("5")).await.expect("queued") else {
        panic!("expected a task handle");
    };

    wait_for_done(&usecase, &handle.task_id).await;
    let outcome = usecase.result(&handle.task_id).await.expect("result");
    let JobOutcome::Completed(segments) = outcome else {
        panic!("expected a completed job");
    };
    assert_eq!(segments[0].text, "hello world");
    assert_eq!(jobs.pending_count().await.unwrap(), 0);
    assert_eq!(usecase.queue_length().await.unwrap(), 0);
}

#[tokio::test]
async fn failed_background_job_reports_done_with_an_error_result() {
    let (usecase, jobs) = usecase_with(Arc::new(CrashingTranscriber), false);
    let TranscribeResponse::Task(handle) = usecase.run(request("5")).await.expect("queued") else {
        panic!("expected a task handle");
    };

    wait_for_done(&usecase, &handle.task_id).await;
    let outcome = usecase.result(&handle.task_id).await.expect("result");
    let JobOutcome::Failed { error } = outcome else {
        panic!("expected a failed job");
    };
    assert!(error.contains("decoder crashed"), "{error}");
    assert!(jobs.inputs.lock().unwrap().is_empty());
    assert_eq!(usecase.queue_length().await.unwrap(), 0);
}

#[tokio::test]
async fn uploads_always_run_in_background() {
    let (usecase, _) = usecase(false);
    let handle = usecase
        .run_upload(b"1".to_vec(), UploadParams::default())
        .await
        .expect("queued upload");

    wait_for_done(&usecase, &handle.task_id).await;
    assert!(matches!(
        usecase.result(&handle.task_id).await,
        Ok(JobOutcome::Completed(_))
    ));
}

#[tokio::test]
async fn overlong_audio_is_rejected() {
    let (usecase, _) = usecase(false);
    let err = usecase.run(request("11")).await.unwrap_err();
    assert!(matches!(err, ApplicationError::Validation(message) if message.contains("not supported")));
}

#[tokio::test]
async fn rejects_unknown_language() {
    let (usecase, _) = usecase(false);
    let mut req = request("1");
    req.language = Some("xx".to_string());
    let err = usecase.run(req).await.unwrap_err();
    assert!(matches!(err, ApplicationError::Validation(message) if message.starts_with("Unsupported language: xx")));
}

#[tokio::test]
async fn rejects_inverted_speaker_bounds() {
    let (usecase, _) = usecase(false);
    let mut req = request("1");
    req.min_speakers = Some(3);
    req.max_speakers = Some(1);
    let err = usecase.run(req).await.unwrap_err();
    assert!(matches!(err, ApplicationError::Domain(DomainError::InvalidInput(_))));
}

#[tokio::test]
async fn undecodable_input_is_a_validation_error() {
    let (usecase, _) = usecase(false);
    assert!(matches!(
        usecase.run(request("not audio")).await,
        Err(ApplicationError::Validation(_))
    ));
    assert!(matches!(
        usecase.run(request("http://unreachable/audio.wav")).await,
        Err(ApplicationError::Validation(_))
    ));
}

#[tokio::test]
async fn status_distinguishes_invalid_and_unknown_ids() {
    let (usecase, _) = usecase(false);
    assert_eq!(
        usecase.status("definitely-not-a-uuid").await.unwrap().status,
        JobStatus::InvalidId
    );
    let unknown = JobId::generate().to_string();
    assert_eq!(usecase.status(&unknown).await.unwrap().status, JobStatus::NotFound);
    assert!(matches!(
        usecase.result(&unknown).await,
        Err(ApplicationError::NotFound(_))
    ));
}
