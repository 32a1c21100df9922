#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use iching_core::divination::{DivinationResult, HexagramGenerator};
use iching_core::testing::{complete_catalog, ScriptedCoins};
use iching_oracle::clock::ManualClock;
use iching_oracle::coordination::InMemoryCoordinationStore;
use iching_oracle::model::ModelClient;
use iching_oracle::records::InMemoryRecordStore;
use iching_oracle::{AiOrchestrator, ModelError, OrchestratorSettings};
use rand::rngs::StdRng;
use rand::SeedableRng;

pub const JSON_REPLY: &str =
    r#"{"summary":"Heaven above heaven.","detailed_analysis":"Strength upon strength.","advice":"Persevere."}"#;

/// Model double that counts calls and replays scripted replies. Once the
/// script is exhausted it keeps returning [`JSON_REPLY`].
pub struct CountingModel {
    calls: AtomicUsize,
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    prompts: Mutex<Vec<String>>,
    delay: Duration,
    delays: Mutex<VecDeque<Duration>>,
    clock_step: Mutex<Option<(Arc<ManualClock>, chrono::Duration)>>,
}

impl CountingModel {
    pub fn new() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn scripted(replies: Vec<Result<String, ModelError>>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
            delay: Duration::ZERO,
            delays: Mutex::new(VecDeque::new()),
            clock_step: Mutex::new(None),
        }
    }

    /// Sleep this long inside every call, so concurrent callers overlap.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Per-call delays, consumed in order before falling back to the
    /// fixed delay.
    pub fn with_delays(self, delays: Vec<Duration>) -> Self {
        *self.delays.lock().unwrap() = delays.into();
        self
    }

    /// Move `clock` forward by `step` at the start of every call, as a slow
    /// model would.
    pub fn advance_clock_on_call(&self, clock: Arc<ManualClock>, step: chrono::Duration) {
        *self.clock_step.lock().unwrap() = Some((clock, step));
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ModelClient for CountingModel {
    fn model_id(&self) -> &str {
        "counting-model"
    }

    async fn complete(&self, prompt: &str) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some((clock, step)) = self.clock_step.lock().unwrap().as_ref() {
            clock.advance(*step);
        }
        let delay = self.delays.lock().unwrap().pop_front().unwrap_or(self.delay);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(JSON_REPLY.to_string()))
    }
}

pub struct Harness {
    pub orchestrator: AiOrchestrator,
    pub records: Arc<InMemoryRecordStore>,
    pub coordination: Arc<InMemoryCoordinationStore>,
    pub model: Arc<CountingModel>,
    pub clock: Arc<ManualClock>,
}

pub fn harness(model: CountingModel, settings: OrchestratorSettings) -> Harness {
    let clock = Arc::new(ManualClock::new(
        Utc.with_ymd_and_hms(2026, 6, 1, 10, 0, 0).unwrap(),
    ));
    let records = Arc::new(InMemoryRecordStore::new());
    let coordination = Arc::new(InMemoryCoordinationStore::with_clock(clock.clone()));
    let model = Arc::new(model);
    let orchestrator = AiOrchestrator::new(
        records.clone(),
        coordination.clone(),
        model.clone(),
        settings,
    )
    .with_clock(clock.clone());
    Harness {
        orchestrator,
        records,
        coordination,
        model,
        clock,
    }
}

pub fn settings(rate_limit_per_hour: u32) -> OrchestratorSettings {
    OrchestratorSettings {
        rate_limit_per_hour,
        ..OrchestratorSettings::default()
    }
}

/// Cast with fixed head counts against the complete synthetic catalog.
pub async fn cast(counts: [u8; 6]) -> DivinationResult {
    HexagramGenerator::new(complete_catalog())
        .cast_with(
            &mut ScriptedCoins::from_head_counts(counts),
            &mut StdRng::seed_from_u64(42),
        )
        .await
        .unwrap()
}
