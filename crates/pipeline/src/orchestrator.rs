//! Pipeline orchestration
//!
//! `VoicePipeline::process` drives one request end to end: sniff, decode,
//! recognize, build the prompt, generate, clean, synthesize. It never
//! returns `Err`; every failure mode collapses into a typed
//! [`PipelineResult`] so the HTTP layer has exactly one shape to serialize.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use tracing::{debug, info, warn};

use voice_qna_config::Settings;
use voice_qna_core::{
    AnswerBackend, AudioBlob, CanonicalPcm, ErrorKind, LessonContext, LessonLookup,
    PipelineResult, SpeechToText, TextToSpeech, Transcript,
};
use voice_qna_llm::{build_prompt, clean_for_speech};

use crate::decode::{self, DecodeCapabilities, DecodeOutcome};
use crate::sniff::detect_format;
use crate::stt::Recognizer;
use crate::tts::synthesize_base64;

/// One voice Q&A request as the pipeline sees it
#[derive(Debug, Clone)]
pub struct PipelineRequest {
    /// Raw uploaded audio, content type untrusted
    pub audio: Vec<u8>,
    /// Lesson to pull context from, if any
    pub lesson_id: Option<i64>,
    /// Student grade level for answer register, if known
    pub grade_level: Option<u8>,
}

pub struct VoicePipeline {
    recognizer: Recognizer,
    answer_backend: Arc<dyn AnswerBackend>,
    tts: Arc<dyn TextToSpeech>,
    lessons: Arc<dyn LessonLookup>,
    caps: DecodeCapabilities,
    settings: Settings,
}

impl VoicePipeline {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        answer_backend: Arc<dyn AnswerBackend>,
        tts: Arc<dyn TextToSpeech>,
        lessons: Arc<dyn LessonLookup>,
        settings: Settings,
    ) -> Self {
        let caps = DecodeCapabilities::detect(settings.decode.enable_probe_decoder);
        let recognizer = Recognizer::new(stt, settings.recognizer.clone());
        Self {
            recognizer,
            answer_backend,
            tts,
            lessons,
            caps,
            settings,
        }
    }

    pub fn capabilities(&self) -> DecodeCapabilities {
        self.caps
    }

    pub async fn stt_ready(&self) -> bool {
        self.recognizer.is_available().await
    }

    pub async fn generation_ready(&self) -> bool {
        self.answer_backend.is_available().await
    }

    pub fn model_name(&self) -> &str {
        self.answer_backend.model_name()
    }

    /// Readiness of the mandatory backends (synthesis is best-effort and
    /// deliberately excluded).
    pub async fn backends_ready(&self) -> bool {
        self.stt_ready().await && self.generation_ready().await
    }

    /// Run one request to completion.
    pub async fn process(&self, request: PipelineRequest) -> PipelineResult {
        let started = Instant::now();
        counter!("pipeline_requests_total").increment(1);

        let result = self.run(request).await;

        let elapsed = started.elapsed();
        histogram!("pipeline_duration_seconds").record(elapsed.as_secs_f64());
        match result.error_kind() {
            None => info!(elapsed_ms = elapsed.as_millis() as u64, "pipeline run succeeded"),
            Some(kind) => {
                counter!("pipeline_failures_total", "kind" => kind.as_str()).increment(1);
                info!(
                    elapsed_ms = elapsed.as_millis() as u64,
                    kind = kind.as_str(),
                    "pipeline run failed"
                );
            }
        }
        result
    }

    async fn run(&self, request: PipelineRequest) -> PipelineResult {
        let format = detect_format(&request.audio);
        info!(
            format = %format,
            bytes = request.audio.len(),
            lesson_id = request.lesson_id,
            grade_level = request.grade_level,
            "processing voice question"
        );
        let blob = AudioBlob::new(request.audio, format);

        let transcript = match self.decode_and_recognize(blob).await {
            Ok(transcript) => transcript,
            Err(kind) => return PipelineResult::failure(kind),
        };
        debug!(locale = %transcript.locale, "question recognized");

        let lesson = self.fetch_lesson(request.lesson_id).await;

        let question = transcript.text;
        let prompt = build_prompt(&question, lesson.as_ref(), request.grade_level);

        let answer = match self.generate(&prompt).await {
            Ok(answer) => answer,
            Err(kind) => return PipelineResult::failure(kind),
        };

        let spoken = clean_for_speech(&answer);
        if spoken.is_empty() {
            warn!("generated answer was empty after cleanup");
            return PipelineResult::failure(ErrorKind::GenerationError);
        }

        let audio = synthesize_base64(&self.tts, &spoken, &self.settings.synthesis.language).await;

        PipelineResult::success(question, spoken, audio)
    }

    /// Decode the blob and recognize speech, interleaving the two when only
    /// raw reconstruction is left.
    ///
    /// The failure taxonomy pivots on whether the PCM was structurally
    /// validated: validated PCM that the recognizer cannot transcribe is
    /// unintelligible audio, while raw candidates that all fail recognition
    /// mean the bytes were never audio in the first place.
    async fn decode_and_recognize(&self, blob: AudioBlob) -> Result<Transcript, ErrorKind> {
        // Decode and resample are CPU-bound over blobs up to the upload
        // limit; keep them off the async workers.
        let caps = self.caps;
        let rates = self.settings.decode.raw_fallback_rates.clone();
        let outcome =
            tokio::task::spawn_blocking(move || decode::decode(&blob, caps, &rates))
                .await
                .map_err(|e| {
                    warn!(error = %e, "decode task failed");
                    ErrorKind::DecodeError
                })?
                .map_err(|e| {
                    warn!(error = %e, "decode chain exhausted");
                    ErrorKind::DecodeError
                })?;

        match outcome {
            DecodeOutcome::Decoded { pcm, strategy } => {
                match self.recognize(&pcm).await? {
                    Some(transcript) => Ok(transcript),
                    None => {
                        debug!(strategy, "decoded audio carried no recognizable speech");
                        Err(ErrorKind::UnintelligibleAudio)
                    }
                }
            }
            DecodeOutcome::RawCandidates(candidates) => {
                for candidate in candidates {
                    if let Some(transcript) = self.recognize(&candidate.pcm).await? {
                        debug!(
                            assumed_rate = candidate.assumed_rate,
                            "raw reconstruction recognized"
                        );
                        counter!("decode_raw_recognized_total").increment(1);
                        return Ok(transcript);
                    }
                }
                debug!("no raw reconstruction produced recognizable speech");
                Err(ErrorKind::DecodeError)
            }
        }
    }

    async fn recognize(&self, pcm: &CanonicalPcm) -> Result<Option<Transcript>, ErrorKind> {
        self.recognizer.recognize(pcm).await.map_err(|e| {
            warn!(error = %e, "recognition backend failed");
            ErrorKind::BackendUnavailable
        })
    }

    /// Lesson context is additive: lookup failures degrade to no context
    /// rather than failing the question.
    async fn fetch_lesson(&self, lesson_id: Option<i64>) -> Option<LessonContext> {
        let lesson_id = lesson_id?;
        match self.lessons.lookup(lesson_id).await {
            Ok(Some(lesson)) => Some(lesson),
            Ok(None) => {
                debug!(lesson_id, "no such lesson, answering without context");
                None
            }
            Err(e) => {
                warn!(lesson_id, error = %e, "lesson lookup failed, answering without context");
                counter!("lesson_lookup_failures_total").increment(1);
                None
            }
        }
    }

    async fn generate(&self, prompt: &voice_qna_core::PromptSpec) -> Result<String, ErrorKind> {
        if !self.answer_backend.is_available().await {
            warn!(
                model = self.answer_backend.model_name(),
                "generation backend unavailable"
            );
            return Err(ErrorKind::BackendUnavailable);
        }

        let timeout = Duration::from_secs(self.settings.generation.timeout_secs);
        let generated = tokio::time::timeout(timeout, self.answer_backend.generate(prompt)).await;

        match generated {
            Ok(Ok(answer)) => Ok(answer),
            Ok(Err(voice_qna_core::Error::GenerationTimeout)) => {
                warn!("generation backend reported a timeout");
                Err(ErrorKind::GenerationTimeout)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "generation failed");
                Err(ErrorKind::GenerationError)
            }
            Err(_) => {
                warn!(timeout_secs = timeout.as_secs(), "generation timed out");
                Err(ErrorKind::GenerationTimeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use voice_qna_core::{Error, PromptSpec, Result};

    struct StubStt {
        transcript: Option<String>,
        fail: bool,
        calls: Mutex<usize>,
    }

    impl StubStt {
        fn hears(text: &str) -> Self {
            Self {
                transcript: Some(text.to_string()),
                fail: false,
                calls: Mutex::new(0),
            }
        }

        fn hears_nothing() -> Self {
            Self {
                transcript: None,
                fail: false,
                calls: Mutex::new(0),
            }
        }

        fn broken() -> Self {
            Self {
                transcript: None,
                fail: true,
                calls: Mutex::new(0),
            }
        }
    }

    #[async_trait]
    impl SpeechToText for StubStt {
        async fn recognize(&self, _audio: &CanonicalPcm, _locale: &str) -> Result<Option<String>> {
            *self.calls.lock() += 1;
            if self.fail {
                return Err(Error::SttBackend("connection refused".to_string()));
            }
            Ok(self.transcript.clone())
        }

        async fn is_available(&self) -> bool {
            !self.fail
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    struct StubAnswer {
        answer: Result<String>,
        available: bool,
    }

    impl StubAnswer {
        fn says(text: &str) -> Self {
            Self {
                answer: Ok(text.to_string()),
                available: true,
            }
        }
    }

    #[async_trait]
    impl AnswerBackend for StubAnswer {
        async fn generate(&self, _prompt: &PromptSpec) -> Result<String> {
            match &self.answer {
                Ok(text) => Ok(text.clone()),
                Err(Error::GenerationTimeout) => Err(Error::GenerationTimeout),
                Err(e) => Err(Error::Generation(e.to_string())),
            }
        }

        async fn is_available(&self) -> bool {
            self.available
        }

        fn model_name(&self) -> &str {
            "stub-model"
        }
    }

    struct StubTts {
        works: bool,
    }

    #[async_trait]
    impl TextToSpeech for StubTts {
        async fn synthesize(&self, _text: &str, _language: &str) -> Result<Vec<u8>> {
            if self.works {
                Ok(vec![0x52, 0x49, 0x46, 0x46])
            } else {
                Err(Error::Synthesis("engine crashed".to_string()))
            }
        }

        async fn is_available(&self) -> bool {
            self.works
        }

        fn name(&self) -> &str {
            "stub"
        }
    }

    struct StubLessons {
        lesson: Option<LessonContext>,
    }

    #[async_trait]
    impl LessonLookup for StubLessons {
        async fn lookup(&self, _lesson_id: i64) -> Result<Option<LessonContext>> {
            Ok(self.lesson.clone())
        }
    }

    fn pipeline(
        stt: StubStt,
        answer: StubAnswer,
        tts_works: bool,
    ) -> VoicePipeline {
        VoicePipeline::new(
            Arc::new(stt),
            Arc::new(answer),
            Arc::new(StubTts { works: tts_works }),
            Arc::new(StubLessons { lesson: None }),
            Settings::default(),
        )
    }

    /// One second of clearly-voiced WAV (quiet head, loud tail)
    fn speech_wav() -> Vec<u8> {
        let mut samples = vec![5i16; 4800];
        samples.extend((0..11_200).map(|i| if i % 2 == 0 { 12_000i16 } else { -12_000 }));
        CanonicalPcm::from_samples(samples).to_wav_bytes().unwrap()
    }

    fn request(audio: Vec<u8>) -> PipelineRequest {
        PipelineRequest {
            audio,
            lesson_id: None,
            grade_level: Some(4),
        }
    }

    #[tokio::test]
    async fn test_happy_path() {
        let pipeline = pipeline(
            StubStt::hears("why is the sky blue"),
            StubAnswer::says("Because sunlight scatters."),
            true,
        );
        let result = pipeline.process(request(speech_wav())).await;

        assert!(result.success);
        assert_eq!(result.question.as_deref(), Some("why is the sky blue"));
        assert_eq!(result.answer.as_deref(), Some("Because sunlight scatters."));
        assert!(!result.audio_response.as_deref().unwrap().is_empty());
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_random_bytes_are_a_decode_error() {
        let pipeline = pipeline(
            StubStt::hears_nothing(),
            StubAnswer::says("unused"),
            true,
        );
        let bytes: Vec<u8> = (0..200u32).map(|i| (i.wrapping_mul(73) % 249) as u8).collect();
        let result = pipeline.process(request(bytes)).await;

        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ErrorKind::DecodeError));
    }

    #[tokio::test]
    async fn test_raw_fallback_stops_at_first_recognized_candidate() {
        struct CountingStt {
            calls: Mutex<usize>,
            succeed_on: usize,
        }

        #[async_trait]
        impl SpeechToText for CountingStt {
            async fn recognize(
                &self,
                _audio: &CanonicalPcm,
                _locale: &str,
            ) -> Result<Option<String>> {
                let mut calls = self.calls.lock();
                *calls += 1;
                if *calls == self.succeed_on {
                    Ok(Some("recovered question".to_string()))
                } else {
                    Ok(None)
                }
            }

            async fn is_available(&self) -> bool {
                true
            }

            fn name(&self) -> &str {
                "counting"
            }
        }

        // Both locales miss on the first raw candidate; the primary locale
        // hits on the second. No further candidates get tried.
        let stt = Arc::new(CountingStt {
            calls: Mutex::new(0),
            succeed_on: 3,
        });
        let pipeline = VoicePipeline::new(
            stt.clone(),
            Arc::new(StubAnswer::says("An answer.")),
            Arc::new(StubTts { works: true }),
            Arc::new(StubLessons { lesson: None }),
            Settings::default(),
        );

        let bytes: Vec<u8> = (0..200u32).map(|i| (i.wrapping_mul(73) % 249) as u8).collect();
        let result = pipeline.process(request(bytes)).await;

        assert!(result.success);
        assert_eq!(result.question.as_deref(), Some("recovered question"));
        assert_eq!(*stt.calls.lock(), 3);
    }

    #[tokio::test]
    async fn test_decoded_but_unrecognized_is_unintelligible() {
        let pipeline = pipeline(
            StubStt::hears_nothing(),
            StubAnswer::says("unused"),
            true,
        );
        let result = pipeline.process(request(speech_wav())).await;

        assert!(!result.success);
        assert_eq!(result.error_kind(), Some(ErrorKind::UnintelligibleAudio));
    }

    #[tokio::test]
    async fn test_stt_backend_failure_is_backend_unavailable() {
        let pipeline = pipeline(StubStt::broken(), StubAnswer::says("unused"), true);
        let result = pipeline.process(request(speech_wav())).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::BackendUnavailable));
    }

    #[tokio::test]
    async fn test_generation_backend_down_is_backend_unavailable() {
        let answer = StubAnswer {
            answer: Ok("unused".to_string()),
            available: false,
        };
        let pipeline = pipeline(StubStt::hears("hello"), answer, true);
        let result = pipeline.process(request(speech_wav())).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::BackendUnavailable));
    }

    #[tokio::test]
    async fn test_generation_timeout_kind() {
        let answer = StubAnswer {
            answer: Err(Error::GenerationTimeout),
            available: true,
        };
        let pipeline = pipeline(StubStt::hears("hello"), answer, true);
        let result = pipeline.process(request(speech_wav())).await;

        assert_eq!(result.error_kind(), Some(ErrorKind::GenerationTimeout));
    }

    #[tokio::test]
    async fn test_synthesis_failure_degrades_not_fails() {
        let pipeline = pipeline(
            StubStt::hears("what is rain"),
            StubAnswer::says("Water falling from clouds."),
            false,
        );
        let result = pipeline.process(request(speech_wav())).await;

        assert!(result.success);
        assert_eq!(result.audio_response.as_deref(), Some(""));
        assert!(result.error.is_none());
    }

    #[tokio::test]
    async fn test_markdown_is_cleaned_before_synthesis() {
        let pipeline = pipeline(
            StubStt::hears("what is rain"),
            StubAnswer::says("## Rain\n\n**Water** falling from clouds"),
            true,
        );
        let result = pipeline.process(request(speech_wav())).await;

        let answer = result.answer.unwrap();
        assert!(!answer.contains('#'));
        assert!(!answer.contains('*'));
        assert!(answer.ends_with('.'));
    }

    #[tokio::test]
    async fn test_lesson_context_reaches_prompt() {
        struct CapturingAnswer {
            prompts: Mutex<Vec<String>>,
        }

        #[async_trait]
        impl AnswerBackend for CapturingAnswer {
            async fn generate(&self, prompt: &PromptSpec) -> Result<String> {
                self.prompts.lock().push(prompt.text.clone());
                Ok("An answer.".to_string())
            }

            async fn is_available(&self) -> bool {
                true
            }

            fn model_name(&self) -> &str {
                "capturing"
            }
        }

        let answer = Arc::new(CapturingAnswer {
            prompts: Mutex::new(Vec::new()),
        });
        let pipeline = VoicePipeline::new(
            Arc::new(StubStt::hears("what is photosynthesis")),
            answer.clone(),
            Arc::new(StubTts { works: true }),
            Arc::new(StubLessons {
                lesson: Some(LessonContext::new(
                    "Plant Biology",
                    "How plants turn light into food.",
                )),
            }),
            Settings::default(),
        );

        let result = pipeline
            .process(PipelineRequest {
                audio: speech_wav(),
                lesson_id: Some(7),
                grade_level: Some(4),
            })
            .await;

        assert!(result.success);
        let prompts = answer.prompts.lock();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Plant Biology"));
        assert!(prompts[0].contains("what is photosynthesis"));
        assert!(prompts[0].contains("Grade 4"));
    }
}
