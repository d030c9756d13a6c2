//! Live monitor
//!
//! Scores the current vitals snapshot on demand. In auto mode a timer drifts
//! the snapshot with a bounded random walk and scores every tick; in manual
//! mode drift stops and only explicit edits trigger scoring.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::adapters::{HistoryService, ScoringService};
use crate::error::ForecastError;
use crate::noise::{NoiseSource, RngNoise};
use crate::normalizer::{Normalizer, Range, AQI, HUMIDITY, RESP_RATE, SPO2, TEMP_C};
use crate::trends::{clamp_history_limit, DEFAULT_HISTORY_LIMIT};
use crate::types::{HistoryEntry, Prediction, VitalField, VitalsSnapshot};

/// Heart rate walks inside a narrower band than manual entry allows
pub const DRIFT_HEART_RATE: Range = Range::new(55.0, 160.0);

/// Per-tick drift amplitudes
const HEART_RATE_STEP: f64 = 10.0;
const RESP_RATE_STEP: f64 = 3.0;
const SPO2_STEP: f64 = 2.0;
const AQI_STEP: f64 = 35.0;
const HUMIDITY_STEP: f64 = 10.0;
const TEMP_STEP: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorMode {
    /// Timer-driven drift and scoring
    Auto,
    /// Drift suspended; edits score immediately
    Manual,
}

/// Input accepted by a running monitor
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorCommand {
    /// Manual edit of one field; scores immediately
    Edit(VitalField, f64),
    SetMode(MonitorMode),
}

impl MonitorCommand {
    /// Parse `auto`, `manual` or `<field>=<value>` (e.g. `hr=120`)
    pub fn parse(line: &str) -> Result<Self, ForecastError> {
        let line = line.trim();
        match line.to_ascii_lowercase().as_str() {
            "auto" => return Ok(Self::SetMode(MonitorMode::Auto)),
            "manual" => return Ok(Self::SetMode(MonitorMode::Manual)),
            _ => {}
        }

        let (name, value) = line.split_once('=').ok_or_else(|| {
            ForecastError::InvalidInput(format!(
                "expected auto, manual or field=value, got {line:?}"
            ))
        })?;
        let field = VitalField::parse(name)
            .ok_or_else(|| ForecastError::InvalidInput(format!("unknown field {name:?}")))?;
        let value: f64 = value
            .trim()
            .parse()
            .map_err(|_| ForecastError::InvalidInput(format!("{value:?} is not a number")))?;
        Ok(Self::Edit(field, value))
    }
}

/// Everything the monitor owns between ticks
#[derive(Debug, Clone, PartialEq)]
pub struct MonitorState {
    pub vitals: VitalsSnapshot,
    pub mode: MonitorMode,
    pub last_prediction: Option<Prediction>,
}

/// One random-walk step; personal best is never drifted
pub fn drift(vitals: &VitalsSnapshot, noise: &mut dyn NoiseSource) -> VitalsSnapshot {
    VitalsSnapshot {
        heart_rate: DRIFT_HEART_RATE.clamp(vitals.heart_rate + noise.symmetric(HEART_RATE_STEP)),
        resp_rate: RESP_RATE.clamp(vitals.resp_rate + noise.symmetric(RESP_RATE_STEP)),
        spo2: SPO2.clamp(vitals.spo2 + noise.symmetric(SPO2_STEP)),
        temp_c: TEMP_C.clamp(vitals.temp_c + noise.symmetric(TEMP_STEP)),
        humidity: HUMIDITY.clamp(vitals.humidity + noise.symmetric(HUMIDITY_STEP)),
        aqi: AQI.clamp(vitals.aqi + noise.symmetric(AQI_STEP)),
        personal_best_peak_flow: vitals.personal_best_peak_flow,
    }
}

pub struct LiveMonitor {
    scorer: Arc<dyn ScoringService>,
    history_service: Option<Arc<dyn HistoryService>>,
    noise: Box<dyn NoiseSource>,
    state: MonitorState,
    history: Vec<HistoryEntry>,
    history_limit: usize,
}

impl LiveMonitor {
    /// Start in auto mode from `vitals`
    pub fn new(scorer: Arc<dyn ScoringService>, vitals: VitalsSnapshot) -> Self {
        Self {
            scorer,
            history_service: None,
            noise: Box::new(RngNoise::from_entropy()),
            state: MonitorState {
                vitals: Normalizer::clamp(&vitals),
                mode: MonitorMode::Auto,
                last_prediction: None,
            },
            history: Vec::new(),
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    pub fn with_noise(mut self, noise: Box<dyn NoiseSource>) -> Self {
        self.noise = noise;
        self
    }

    /// Refresh the history view after every successful score
    pub fn with_history(mut self, service: Arc<dyn HistoryService>, limit: usize) -> Self {
        self.history_service = Some(service);
        self.history_limit = clamp_history_limit(limit);
        self
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn mode(&self) -> MonitorMode {
        self.state.mode
    }

    pub fn vitals(&self) -> &VitalsSnapshot {
        &self.state.vitals
    }

    pub fn last_prediction(&self) -> Option<&Prediction> {
        self.state.last_prediction.as_ref()
    }

    /// Latest history fetch, newest first
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Switch modes without scoring. Auto resumes from the current vitals.
    pub fn set_mode(&mut self, mode: MonitorMode) {
        if self.state.mode != mode {
            info!(?mode, "monitor mode changed");
            self.state.mode = mode;
        }
    }

    /// One timer step: drift and score in auto mode, nothing in manual mode.
    ///
    /// Returns `Ok(None)` when the tick was skipped. On a scoring failure the
    /// drifted vitals are kept and the previous prediction stays.
    pub async fn tick(&mut self) -> Result<Option<Prediction>, ForecastError> {
        if self.state.mode == MonitorMode::Manual {
            return Ok(None);
        }
        self.state.vitals = drift(&self.state.vitals, self.noise.as_mut());
        self.score_now().await.map(Some)
    }

    /// Apply a manual edit (clamped) and score once
    pub async fn edit(
        &mut self,
        field: VitalField,
        value: f64,
    ) -> Result<Prediction, ForecastError> {
        if self.state.mode != MonitorMode::Manual {
            return Err(ForecastError::InvalidInput(
                "vitals can only be edited in manual mode".to_string(),
            ));
        }
        if !value.is_finite() {
            return Err(ForecastError::InvalidInput(format!(
                "{field:?} must be a finite number"
            )));
        }
        self.state
            .vitals
            .set(field, Normalizer::clamp_field(field, value));
        self.score_now().await
    }

    /// Apply one command. Mode switches never score.
    pub async fn apply(
        &mut self,
        command: MonitorCommand,
    ) -> Result<Option<Prediction>, ForecastError> {
        match command {
            MonitorCommand::Edit(field, value) => self.edit(field, value).await.map(Some),
            MonitorCommand::SetMode(mode) => {
                self.set_mode(mode);
                Ok(None)
            }
        }
    }

    /// Score the current vitals and store the result
    pub async fn score_now(&mut self) -> Result<Prediction, ForecastError> {
        let prediction = self.scorer.predict(&self.state.vitals).await?;
        info!(
            zone = %prediction.zone,
            percent = prediction.peak_flow_percent,
            "live vitals scored"
        );
        self.state.last_prediction = Some(prediction.clone());
        self.refresh_history().await;
        Ok(prediction)
    }

    /// Re-read history; a failed read keeps the previous view
    pub async fn refresh_history(&mut self) {
        let Some(service) = self.history_service.clone() else {
            return;
        };
        match service.history(self.history_limit).await {
            Ok(entries) => self.history = entries,
            Err(e) => warn!(error = %e, "history refresh failed"),
        }
    }

    /// Score once, then tick every `period` and apply `commands` as they
    /// arrive, until `shutdown` turns true or closes.
    ///
    /// Ticks are skipped while in manual mode. A closed command channel only
    /// stops command handling. Scoring failures are logged and never stop the loop.
    pub async fn run(
        &mut self,
        period: Duration,
        mut commands: mpsc::Receiver<MonitorCommand>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        if let Err(e) = self.score_now().await {
            warn!(error = %e, "initial score failed");
        }

        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);
        // the first tick completes immediately
        ticker.tick().await;

        info!(period_ms = period.as_millis() as u64, "live monitor started");
        let mut accepting = true;
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.tick().await {
                        warn!(error = %e, "live scoring failed");
                    }
                }
                command = commands.recv(), if accepting => match command {
                    Some(command) => {
                        if let Err(e) = self.apply(command).await {
                            warn!(?command, error = %e, "monitor command failed");
                        }
                    }
                    None => accepting = false,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("live monitor stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::FixedNoise;
    use crate::types::Zone;
    use crate::zone::classify;
    use async_trait::async_trait;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingScorer {
        seen: Mutex<Vec<VitalsSnapshot>>,
        failing: AtomicBool,
    }

    impl RecordingScorer {
        fn calls(&self) -> usize {
            self.seen.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ScoringService for RecordingScorer {
        async fn predict(&self, vitals: &VitalsSnapshot) -> Result<Prediction, ForecastError> {
            self.seen.lock().unwrap().push(vitals.clone());
            if self.failing.load(Ordering::SeqCst) {
                return Err(ForecastError::Status {
                    code: 503,
                    body: "model not loaded".to_string(),
                });
            }
            let percent = 160.0 - vitals.heart_rate;
            Ok(Prediction {
                zone: classify(percent),
                peak_flow_percent: percent,
                predicted_peak_flow: percent * 6.0,
                message: Some(classify(percent).message().to_string()),
                warning: None,
            })
        }
    }

    struct StaticHistory(Vec<HistoryEntry>);

    #[async_trait]
    impl HistoryService for StaticHistory {
        async fn history(&self, limit: usize) -> Result<Vec<HistoryEntry>, ForecastError> {
            Ok(self.0.iter().take(limit).cloned().collect())
        }
    }

    fn monitor(scorer: &Arc<RecordingScorer>) -> LiveMonitor {
        LiveMonitor::new(scorer.clone(), VitalsSnapshot::default())
            .with_noise(Box::new(RngNoise::seeded(11)))
    }

    #[test]
    fn test_drift_stays_in_bounds() {
        let mut noise = RngNoise::seeded(3);
        let mut vitals = VitalsSnapshot::default();
        for _ in 0..500 {
            vitals = drift(&vitals, &mut noise);
            assert!(DRIFT_HEART_RATE.contains(vitals.heart_rate));
            assert!(RESP_RATE.contains(vitals.resp_rate));
            assert!(SPO2.contains(vitals.spo2));
            assert!(TEMP_C.contains(vitals.temp_c));
            assert!(HUMIDITY.contains(vitals.humidity));
            assert!(AQI.contains(vitals.aqi));
            assert_eq!(vitals.personal_best_peak_flow, 600.0);
        }
    }

    #[test]
    fn test_drift_step_size() {
        let vitals = VitalsSnapshot::default();
        let up = drift(&vitals, &mut FixedNoise::new(1.0, false));
        assert_eq!(up.heart_rate, 95.0);
        assert_eq!(up.resp_rate, 21.0);
        assert_eq!(up.spo2, 98.0);
        assert_eq!(up.temp_c, 12.0);
        assert_eq!(up.humidity, 80.0);
        assert_eq!(up.aqi, 145.0);

        let low = VitalsSnapshot {
            heart_rate: 58.0,
            ..VitalsSnapshot::default()
        };
        let down = drift(&low, &mut FixedNoise::new(-1.0, false));
        assert_eq!(down.heart_rate, 55.0);
    }

    #[tokio::test]
    async fn test_manual_edit_scores_once_without_drift() {
        let scorer = Arc::new(RecordingScorer::default());
        let mut monitor = monitor(&scorer);
        monitor.set_mode(MonitorMode::Manual);

        let prediction = monitor.edit(VitalField::HeartRate, 120.0).await.unwrap();
        assert_eq!(scorer.calls(), 1);
        assert_eq!(scorer.seen.lock().unwrap()[0].heart_rate, 120.0);
        assert_eq!(prediction.zone, Zone::Red);

        for _ in 0..3 {
            assert_eq!(monitor.tick().await.unwrap(), None);
        }
        assert_eq!(scorer.calls(), 1);
        assert_eq!(monitor.vitals().heart_rate, 120.0);
        assert_eq!(monitor.vitals().resp_rate, 18.0);
        assert_eq!(monitor.last_prediction(), Some(&prediction));
    }

    #[tokio::test]
    async fn test_edit_clamps_and_requires_manual() {
        let scorer = Arc::new(RecordingScorer::default());
        let mut monitor = monitor(&scorer);

        assert!(matches!(
            monitor.edit(VitalField::Spo2, 80.0).await,
            Err(ForecastError::InvalidInput(_))
        ));
        assert_eq!(scorer.calls(), 0);

        monitor.set_mode(MonitorMode::Manual);
        monitor.edit(VitalField::Spo2, 80.0).await.unwrap();
        assert_eq!(monitor.vitals().spo2, 88.0);
        assert!(monitor.edit(VitalField::Aqi, f64::NAN).await.is_err());
        assert_eq!(scorer.calls(), 1);
    }

    #[tokio::test]
    async fn test_auto_resumes_from_edited_vitals() {
        let scorer = Arc::new(RecordingScorer::default());
        let mut monitor = LiveMonitor::new(scorer.clone(), VitalsSnapshot::default())
            .with_noise(Box::new(FixedNoise::centered()));

        monitor.set_mode(MonitorMode::Manual);
        monitor.edit(VitalField::HeartRate, 120.0).await.unwrap();
        monitor.set_mode(MonitorMode::Auto);
        assert_eq!(scorer.calls(), 1);

        let scored = monitor.tick().await.unwrap();
        assert!(scored.is_some());
        assert_eq!(scorer.calls(), 2);
        assert_eq!(scorer.seen.lock().unwrap()[1].heart_rate, 120.0);
    }

    #[tokio::test]
    async fn test_failed_score_keeps_prediction() {
        let scorer = Arc::new(RecordingScorer::default());
        let mut monitor = monitor(&scorer);

        let first = monitor.tick().await.unwrap().unwrap();
        scorer.failing.store(true, Ordering::SeqCst);
        assert!(monitor.tick().await.is_err());

        assert_eq!(monitor.last_prediction(), Some(&first));
        assert_eq!(scorer.calls(), 2);
    }

    #[tokio::test]
    async fn test_history_refreshed_after_score() {
        let entries: Vec<HistoryEntry> = (0..80)
            .map(|i| HistoryEntry {
                ts: format!("2025-03-01T08:{:02}:00", i % 60),
                predicted_peak_flow: 500.0,
                peak_flow_percent: 83.3,
                zone: Zone::Green,
            })
            .collect();
        let scorer = Arc::new(RecordingScorer::default());
        let mut monitor =
            monitor(&scorer).with_history(Arc::new(StaticHistory(entries)), DEFAULT_HISTORY_LIMIT);

        assert!(monitor.history().is_empty());
        monitor.score_now().await.unwrap();
        assert_eq!(monitor.history().len(), 60);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_shutdown() {
        let scorer = Arc::new(RecordingScorer::default());
        let mut monitor = monitor(&scorer);
        let (tx, rx) = watch::channel(false);
        // no commands will ever arrive
        let (_, commands) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            monitor.run(Duration::from_millis(4_000), commands, rx).await;
            monitor
        });

        tokio::time::sleep(Duration::from_millis(12_100)).await;
        tx.send(true).unwrap();
        let monitor = handle.await.unwrap();

        // initial score plus ticks at 4s, 8s and 12s
        assert_eq!(scorer.calls(), 4);
        assert!(monitor.last_prediction().is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_switches_to_manual_mid_run() {
        let scorer = Arc::new(RecordingScorer::default());
        let mut monitor = monitor(&scorer);
        let (tx, rx) = watch::channel(false);
        let (commands_tx, commands) = mpsc::channel(8);

        let handle = tokio::spawn(async move {
            monitor.run(Duration::from_millis(4_000), commands, rx).await;
            monitor
        });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(scorer.calls(), 1);
        commands_tx
            .send(MonitorCommand::SetMode(MonitorMode::Manual))
            .await
            .unwrap();
        commands_tx
            .send(MonitorCommand::Edit(VitalField::HeartRate, 120.0))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_millis(12_000)).await;
        tx.send(true).unwrap();
        let monitor = handle.await.unwrap();

        // the edit scored once; the ticks at 4s, 8s and 12s were skipped
        assert_eq!(scorer.calls(), 2);
        assert_eq!(scorer.seen.lock().unwrap()[1].heart_rate, 120.0);
        assert_eq!(monitor.mode(), MonitorMode::Manual);
        assert_eq!(monitor.vitals().heart_rate, 120.0);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(
            MonitorCommand::parse(" Manual ").unwrap(),
            MonitorCommand::SetMode(MonitorMode::Manual)
        );
        assert_eq!(
            MonitorCommand::parse("auto").unwrap(),
            MonitorCommand::SetMode(MonitorMode::Auto)
        );
        assert_eq!(
            MonitorCommand::parse("hr=120").unwrap(),
            MonitorCommand::Edit(VitalField::HeartRate, 120.0)
        );
        assert_eq!(
            MonitorCommand::parse("temp_c = -4.5").unwrap(),
            MonitorCommand::Edit(VitalField::TempC, -4.5)
        );
        assert!(MonitorCommand::parse("pulse=90").is_err());
        assert!(MonitorCommand::parse("hr=fast").is_err());
        assert!(MonitorCommand::parse("faster").is_err());
    }

    #[tokio::test]
    async fn test_apply_routes_commands() {
        let scorer = Arc::new(RecordingScorer::default());
        let mut monitor = monitor(&scorer);

        let rejected = monitor
            .apply(MonitorCommand::Edit(VitalField::RespRate, 25.0))
            .await;
        assert!(matches!(rejected, Err(ForecastError::InvalidInput(_))));

        let switched = monitor
            .apply(MonitorCommand::SetMode(MonitorMode::Manual))
            .await
            .unwrap();
        assert_eq!(switched, None);
        assert_eq!(scorer.calls(), 0);

        let scored = monitor
            .apply(MonitorCommand::Edit(VitalField::RespRate, 25.0))
            .await
            .unwrap();
        assert!(scored.is_some());
        assert_eq!(monitor.vitals().resp_rate, 25.0);
    }
}
