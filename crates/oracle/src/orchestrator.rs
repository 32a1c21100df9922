//! AI interpretation orchestrator.
//!
//! One call walks a fixed pipeline: rate check, record fetch, early return
//! for an existing interpretation, shared-cache lookup, per-record lock,
//! prompt, model call, reply parsing, persistence, lock release. All shared
//! state lives in the [`CoordinationStore`], so any number of processes can
//! run the pipeline for the same record and the model is still called at
//! most once.

use std::sync::Arc;
use std::time::Duration;

use iching_core::hashing::sha256_hex;
use iching_core::record::{AiInterpretation, DivinationRecord, DivinationRecordStore, RecordPatch};
use iching_core::types::{DbId, Timestamp};

use crate::clock::{Clock, SystemClock};
use crate::config::OracleConfig;
use crate::coordination::CoordinationStore;
use crate::error::OracleError;
use crate::lock::GenerationLock;
use crate::model::ModelClient;
use crate::parse::parse_reply;
use crate::prompt::build_prompt;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of the rate-limit window; counters are bucketed per clock hour.
pub const RATE_WINDOW_SECS: i64 = 3600;

/// Stands in for the question in cache keys when none was asked.
pub const NO_QUESTION_SENTINEL: &str = "__none__";

/// Hex characters of the question digest kept in cache keys.
const CACHE_DIGEST_CHARS: usize = 16;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    pub rate_limit_per_hour: u32,
    pub cache_ttl: Duration,
    pub lock_ttl: Duration,
    pub key_prefix: String,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self::from(&OracleConfig::default())
    }
}

impl From<&OracleConfig> for OrchestratorSettings {
    fn from(config: &OracleConfig) -> Self {
        Self {
            rate_limit_per_hour: config.rate_limit_per_hour,
            cache_ttl: config.cache_ttl(),
            lock_ttl: config.lock_ttl(),
            key_prefix: config.key_prefix.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Reuse an existing or cached interpretation when there is one.
    Generate,
    /// Always call the model and overwrite.
    Regenerate,
}

// ---------------------------------------------------------------------------
// Orchestrator
// ---------------------------------------------------------------------------

pub struct AiOrchestrator {
    records: Arc<dyn DivinationRecordStore>,
    coordination: Arc<dyn CoordinationStore>,
    model: Arc<dyn ModelClient>,
    clock: Arc<dyn Clock>,
    settings: OrchestratorSettings,
}

impl AiOrchestrator {
    pub fn new(
        records: Arc<dyn DivinationRecordStore>,
        coordination: Arc<dyn CoordinationStore>,
        model: Arc<dyn ModelClient>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            records,
            coordination,
            model,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn settings(&self) -> &OrchestratorSettings {
        &self.settings
    }

    /// Return the record's AI interpretation, generating it on first use.
    ///
    /// `question` overrides the question stored on the record; when both are
    /// absent the reading is generated without one.
    pub async fn generate_ai_interpretation(
        &self,
        record_id: DbId,
        user_id: DbId,
        question: Option<&str>,
    ) -> Result<AiInterpretation, OracleError> {
        self.check_rate_limit(user_id).await?;
        let record = self.fetch_record(record_id, user_id).await?;

        if let Some(existing) = record.ai_interpretation {
            tracing::debug!(record_id, user_id, "AI interpretation already present");
            return Ok(existing);
        }

        let question = effective_question(question, &record);
        let cache_key = self.cache_key(record.result.primary.sequence, question.as_deref());
        if let Some(cached) = self.read_cache(&cache_key).await? {
            return self.persist_cached(record_id, cached).await;
        }

        self.run_locked(record, question, cache_key, Mode::Generate)
            .await
    }

    /// Discard any existing interpretation and ask the model again.
    ///
    /// Still rate limited and still serialised by the per-record lock.
    pub async fn regenerate_ai_interpretation(
        &self,
        record_id: DbId,
        user_id: DbId,
        question: Option<&str>,
    ) -> Result<AiInterpretation, OracleError> {
        self.check_rate_limit(user_id).await?;
        let record = self.fetch_record(record_id, user_id).await?;
        let question = effective_question(question, &record);
        let cache_key = self.cache_key(record.result.primary.sequence, question.as_deref());

        self.run_locked(record, question, cache_key, Mode::Regenerate)
            .await
    }

    // ---- keys ----

    pub fn rate_key(&self, user_id: DbId, now: Timestamp) -> String {
        format!(
            "{}:ai:rate:{user_id}:{}",
            self.settings.key_prefix,
            now.timestamp().div_euclid(RATE_WINDOW_SECS)
        )
    }

    pub fn cache_key(&self, sequence: u8, question: Option<&str>) -> String {
        let digest = sha256_hex(question.unwrap_or(NO_QUESTION_SENTINEL).as_bytes());
        format!(
            "{}:ai:cache:{sequence}:{}",
            self.settings.key_prefix,
            &digest[..CACHE_DIGEST_CHARS]
        )
    }

    pub fn lock_key(&self, record_id: DbId) -> String {
        format!("{}:ai:lock:{record_id}", self.settings.key_prefix)
    }

    // ---- pipeline steps ----

    async fn check_rate_limit(&self, user_id: DbId) -> Result<(), OracleError> {
        let now = self.clock.now();
        let window = Duration::from_secs(RATE_WINDOW_SECS as u64);
        let count = self
            .coordination
            .increment_with_expiry(&self.rate_key(user_id, now), window)
            .await?;

        let limit = self.settings.rate_limit_per_hour;
        if count > u64::from(limit) {
            let retry_after_secs = (RATE_WINDOW_SECS - now.timestamp().rem_euclid(RATE_WINDOW_SECS)) as u64;
            tracing::warn!(user_id, count, limit, retry_after_secs, "AI interpretation rate limit exceeded");
            return Err(OracleError::RateLimited {
                limit,
                retry_after_secs,
            });
        }
        Ok(())
    }

    async fn fetch_record(
        &self,
        record_id: DbId,
        user_id: DbId,
    ) -> Result<DivinationRecord, OracleError> {
        self.records
            .find_by_id(record_id, user_id)
            .await?
            .ok_or(OracleError::RecordNotFound { record_id })
    }

    /// A cache entry that fails to deserialize is treated as a miss.
    async fn read_cache(&self, cache_key: &str) -> Result<Option<AiInterpretation>, OracleError> {
        let Some(raw) = self.coordination.get(cache_key).await? else {
            tracing::debug!(cache_key, "AI interpretation cache miss");
            return Ok(None);
        };
        match serde_json::from_str(&raw) {
            Ok(interpretation) => {
                tracing::debug!(cache_key, "AI interpretation cache hit");
                Ok(Some(interpretation))
            }
            Err(e) => {
                tracing::warn!(cache_key, error = %e, "Corrupt AI interpretation cache entry, ignoring");
                Ok(None)
            }
        }
    }

    async fn persist_cached(
        &self,
        record_id: DbId,
        mut interpretation: AiInterpretation,
    ) -> Result<AiInterpretation, OracleError> {
        interpretation.served_from_cache = true;
        self.records
            .update(record_id, RecordPatch::ai_interpretation(interpretation.clone()))
            .await?;
        tracing::info!(record_id, "AI interpretation served from cache");
        Ok(interpretation)
    }

    async fn run_locked(
        &self,
        record: DivinationRecord,
        question: Option<String>,
        cache_key: String,
        mode: Mode,
    ) -> Result<AiInterpretation, OracleError> {
        let record_id = record.id;
        let lock = GenerationLock::try_acquire(
            Arc::clone(&self.coordination),
            self.lock_key(record_id),
            self.settings.lock_ttl,
        )
        .await?
        .ok_or(OracleError::GenerationInProgress {
            record_id,
            retry_after_secs: self.settings.lock_ttl.as_secs(),
        })?;

        let outcome = self
            .generate_locked(&lock, record, question, &cache_key, mode)
            .await;

        if let Err(e) = lock.release().await {
            tracing::warn!(record_id, error = %e, "Failed to release generation lock; it will expire");
        }
        outcome
    }

    async fn generate_locked(
        &self,
        lock: &GenerationLock,
        record: DivinationRecord,
        question: Option<String>,
        cache_key: &str,
        mode: Mode,
    ) -> Result<AiInterpretation, OracleError> {
        let record = match mode {
            Mode::Regenerate => record,
            Mode::Generate => {
                // Another holder may have finished between our first check
                // and taking the lock.
                let fresh = self.fetch_record(record.id, record.user_id).await?;
                if let Some(existing) = fresh.ai_interpretation {
                    return Ok(existing);
                }
                if let Some(cached) = self.read_cache(cache_key).await? {
                    return self.persist_cached(fresh.id, cached).await;
                }
                fresh
            }
        };
        let (record_id, user_id) = (record.id, record.user_id);

        let prompt = build_prompt(&record.result, question.as_deref());
        tracing::info!(
            record_id,
            user_id,
            model = self.model.model_id(),
            primary = record.result.primary.sequence,
            regenerate = mode == Mode::Regenerate,
            "Generating AI interpretation",
        );

        let reply = self.model.complete(&prompt.text).await.map_err(|e| {
            tracing::error!(record_id, code = e.code(), error = %e, "Model call failed");
            OracleError::from(e)
        })?;

        match lock.is_held().await {
            Ok(true) => {}
            Ok(false) => tracing::warn!(
                record_id,
                lock_key = lock.key(),
                "Generation lock lapsed during the model call",
            ),
            Err(e) => tracing::warn!(record_id, error = %e, "Could not confirm generation lock"),
        }

        // A holder whose lock lapsed may have stored a reading meanwhile;
        // plain generation never overwrites one.
        if mode == Mode::Generate {
            if let Some(existing) = self
                .fetch_record(record_id, user_id)
                .await?
                .ai_interpretation
            {
                tracing::info!(record_id, "AI interpretation stored concurrently, discarding reply");
                return Ok(existing);
            }
        }

        let parsed = parse_reply(&reply);
        if !parsed.structured {
            tracing::warn!(record_id, "Model reply was not JSON, split into sections instead");
        }

        let interpretation = AiInterpretation {
            summary: parsed.summary,
            detailed_analysis: parsed.detailed_analysis,
            advice: parsed.advice,
            model_id: self.model.model_id().to_string(),
            prompt_digest: Some(prompt.digest),
            created_at: self.clock.now(),
            served_from_cache: false,
        };

        self.records
            .update(record_id, RecordPatch::ai_interpretation(interpretation.clone()))
            .await?;

        let payload = serde_json::to_string(&interpretation)?;
        if let Err(e) = self
            .coordination
            .set_with_expiry(cache_key, &payload, self.settings.cache_ttl)
            .await
        {
            tracing::warn!(record_id, cache_key, error = %e, "Failed to cache AI interpretation");
        }

        tracing::info!(record_id, user_id, "AI interpretation persisted");
        Ok(interpretation)
    }
}

/// The request's question wins; otherwise fall back to the record's.
fn effective_question(requested: Option<&str>, record: &DivinationRecord) -> Option<String> {
    requested
        .or(record.question.as_deref())
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::coordination::InMemoryCoordinationStore;
    use crate::error::ModelError;
    use crate::model::ModelClient;
    use crate::records::InMemoryRecordStore;

    struct NeverCalled;

    #[async_trait::async_trait]
    impl ModelClient for NeverCalled {
        fn model_id(&self) -> &str {
            "never"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
            Err(ModelError::Generic("unexpected call".into()))
        }
    }

    fn orchestrator(prefix: &str) -> AiOrchestrator {
        AiOrchestrator::new(
            Arc::new(InMemoryRecordStore::new()),
            Arc::new(InMemoryCoordinationStore::new()),
            Arc::new(NeverCalled),
            OrchestratorSettings {
                key_prefix: prefix.into(),
                ..OrchestratorSettings::default()
            },
        )
    }

    #[test]
    fn key_formats() {
        let o = orchestrator("iching");
        let now = Utc.with_ymd_and_hms(1970, 1, 1, 2, 30, 0).unwrap();
        assert_eq!(o.rate_key(5, now), "iching:ai:rate:5:2");
        assert_eq!(o.lock_key(9), "iching:ai:lock:9");

        let digest = sha256_hex(NO_QUESTION_SENTINEL.as_bytes());
        assert_eq!(
            o.cache_key(11, None),
            format!("iching:ai:cache:11:{}", &digest[..16])
        );
        assert_ne!(o.cache_key(11, None), o.cache_key(11, Some("career?")));
        assert_ne!(o.cache_key(11, None), o.cache_key(12, None));
    }

    #[test]
    fn prefix_is_configurable() {
        assert!(orchestrator("staging").lock_key(1).starts_with("staging:ai:lock:"));
    }

    #[test]
    fn defaults_match_config_defaults() {
        let settings = OrchestratorSettings::default();
        assert_eq!(settings.rate_limit_per_hour, 10);
        assert_eq!(settings.lock_ttl, Duration::from_secs(60));
        assert_eq!(settings.cache_ttl, Duration::from_secs(86_400));
    }
}
