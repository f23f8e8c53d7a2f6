//! Scenario runner: drives every configured device through the player checks

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use signage_common::{DeviceStatus, DeviceTarget, Settings};

use crate::campaign::Campaign;
use crate::client::Transport;
use crate::device::{Device, SCREENSHOT_TIMEOUT, STATUS_TIMEOUT};
use crate::error::E2eResult;
use crate::visual::{Comparison, ImageComparator};

/// Screenshot attempts per content check
pub const DEFAULT_ATTEMPTS: usize = 3;

/// Time a freshly started campaign gets before the first screenshot
pub const DEFAULT_SETTLE: Duration = Duration::from_secs(5);

/// A check run against each device
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Scenario {
    /// Capture a screenshot and make sure it is a valid image
    Screenshot,

    /// Escape playback, wait for pause, continue, wait for playback
    EscapeAndContinue,

    /// Play a campaign and compare the screen against a reference image
    Content { campaign: String, reference: PathBuf },
}

impl Scenario {
    pub fn name(&self) -> String {
        match self {
            Scenario::Screenshot => "screenshot".to_string(),
            Scenario::EscapeAndContinue => "escape_and_continue".to_string(),
            Scenario::Content { campaign, .. } => format!("content:{}", campaign),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    pub error: Option<String>,
}

/// Result of one scenario on one device
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestResult {
    pub name: String,
    pub device: String,
    pub success: bool,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepResult>,
    /// Best similarity score of a content check
    pub score: Option<f64>,
    /// Files written while running, e.g. mismatching screenshots
    pub artifacts: Vec<PathBuf>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSuiteResult {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub duration_ms: u64,
    pub results: Vec<TestResult>,
}

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub scenarios: Vec<Scenario>,
    /// Only run devices whose name matches
    pub device_filter: Option<String>,
    pub output_dir: PathBuf,
    pub settle: Duration,
    pub attempts: usize,
    pub status_timeout: Duration,
    pub screenshot_timeout: Duration,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            scenarios: vec![Scenario::Screenshot, Scenario::EscapeAndContinue],
            device_filter: None,
            output_dir: PathBuf::from("test-results"),
            settle: DEFAULT_SETTLE,
            attempts: DEFAULT_ATTEMPTS,
            status_timeout: STATUS_TIMEOUT,
            screenshot_timeout: SCREENSHOT_TIMEOUT,
        }
    }
}

/// Named steps of a running scenario
#[derive(Default)]
struct Steps {
    results: Vec<StepResult>,
}

impl Steps {
    fn run<R, F>(&mut self, name: impl Into<String>, f: F) -> E2eResult<R>
    where
        F: FnOnce() -> E2eResult<R>,
    {
        let name = name.into();
        info!("Step: {}", name);
        let start = Instant::now();
        let result = f();

        self.results.push(StepResult {
            name,
            success: result.is_ok(),
            duration_ms: start.elapsed().as_millis() as u64,
            error: result.as_ref().err().map(|e| e.to_string()),
        });
        result
    }
}

/// What a scenario body reports besides its verdict
#[derive(Default)]
struct Outcome {
    passed: bool,
    score: Option<f64>,
    artifacts: Vec<PathBuf>,
    failure: Option<String>,
}

impl Outcome {
    fn pass() -> Self {
        Self {
            passed: true,
            ..Default::default()
        }
    }
}

pub struct TestRunner<'a, T: Transport> {
    transport: T,
    settings: &'a Settings,
    config: RunnerConfig,
    polling_interval: Duration,
}

impl<'a, T: Transport> TestRunner<'a, T> {
    pub fn new(transport: T, settings: &'a Settings, config: RunnerConfig) -> Self {
        Self {
            transport,
            settings,
            config,
            polling_interval: settings.polling_interval(),
        }
    }

    /// Override the polling interval taken from the settings
    pub fn with_polling_interval(mut self, interval: Duration) -> Self {
        self.polling_interval = interval;
        self
    }

    fn devices(&self) -> Vec<&DeviceTarget> {
        self.settings
            .devices
            .iter()
            .filter(|d| match &self.config.device_filter {
                Some(name) => &d.name == name,
                None => true,
            })
            .collect()
    }

    /// Run every scenario against every selected device
    pub fn run_all(&self) -> TestSuiteResult {
        let start = Instant::now();
        let devices = self.devices();
        let mut results = Vec::new();

        info!(
            "Running {} scenario(s) on {} device(s)...",
            self.config.scenarios.len(),
            devices.len()
        );

        for scenario in &self.config.scenarios {
            for device in &devices {
                let result = self.run_scenario(scenario, device);
                if result.success {
                    info!("✓ {} [{}] ({} ms)", result.name, result.device, result.duration_ms);
                } else {
                    error!(
                        "✗ {} [{}] - {}",
                        result.name,
                        result.device,
                        result.error.as_deref().unwrap_or("unknown error")
                    );
                }
                results.push(result);
            }
        }

        let passed = results.iter().filter(|r| r.success).count();
        let failed = results.len() - passed;
        let duration_ms = start.elapsed().as_millis() as u64;

        info!("Test Results: {} passed, {} failed ({} ms)", passed, failed, duration_ms);

        TestSuiteResult {
            total: results.len(),
            passed,
            failed,
            duration_ms,
            results,
        }
    }

    /// Run one scenario on one device; failures are captured in the result
    pub fn run_scenario(&self, scenario: &Scenario, target: &DeviceTarget) -> TestResult {
        let started_at = Utc::now();
        let start = Instant::now();
        let mut steps = Steps::default();
        debug!("Running {} on {} (#{})", scenario.name(), target.name, target.id);

        let outcome = match scenario {
            Scenario::Screenshot => self.check_screenshot(target, &mut steps),
            Scenario::EscapeAndContinue => self.check_escape_and_continue(target, &mut steps),
            Scenario::Content { campaign, reference } => {
                self.check_playing_content(target, campaign, reference, &mut steps)
            }
        };

        let (outcome, error) = match outcome {
            Ok(outcome) => {
                let error = outcome.failure.clone();
                (outcome, error)
            }
            Err(e) => (Outcome::default(), Some(e.to_string())),
        };

        TestResult {
            name: scenario.name(),
            device: target.name.clone(),
            success: outcome.passed && error.is_none(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
            steps: steps.results,
            score: outcome.score,
            artifacts: outcome.artifacts,
            error,
        }
    }

    fn device(&self) -> Device<&T> {
        Device::new(&self.transport, self.settings)
            .with_polling_interval(self.polling_interval)
            .with_status_timeout(self.config.status_timeout)
            .with_screenshot_timeout(self.config.screenshot_timeout)
    }

    fn check_screenshot(&self, target: &DeviceTarget, steps: &mut Steps) -> E2eResult<Outcome> {
        let device = self.device();
        steps.run("Retrieve screenshot from device", || {
            let screenshot = device.retrieve_screenshot(target.id)?;
            crate::visual::verify_integrity(&screenshot).map(|_| ())
        })?;
        Ok(Outcome::pass())
    }

    fn check_escape_and_continue(&self, target: &DeviceTarget, steps: &mut Steps) -> E2eResult<Outcome> {
        let device = self.device();
        steps.run("Escape playback", || device.escape_playback(target.id))?;
        steps.run("Waiting for device to be in \"Pause\" status", || {
            device.wait_for_status(target.id, DeviceStatus::Pause)
        })?;
        steps.run("Continue playback", || device.continue_playback(target.id))?;
        steps.run("Waiting for device to be in \"Playback\" status", || {
            device.wait_for_status(target.id, DeviceStatus::Playback)
        })?;
        Ok(Outcome::pass())
    }

    fn check_playing_content(
        &self,
        target: &DeviceTarget,
        campaign_name: &str,
        reference: &Path,
        steps: &mut Steps,
    ) -> E2eResult<Outcome> {
        let campaign_id = self.settings.campaign_id(campaign_name)?;
        let device = self.device();
        let campaign = Campaign::new(&self.transport, self.settings);
        let mut comparator = ImageComparator::new();

        steps.run(format!("Load source image \"{}\"", reference.display()), || {
            comparator.load_source_file(reference)
        })?;
        steps.run(
            format!("Play campaign \"{}\" #{}", campaign_name, campaign_id),
            || campaign.play_campaign(campaign_id),
        )?;
        std::thread::sleep(self.config.settle);

        let compared = steps.run(
            format!("Retrieve screenshot from {} and compare with source image", target.name),
            || self.capture_until_match(&device, target, &mut comparator),
        );

        // the campaign is paused even when capturing failed
        let paused = steps.run(
            format!("Pause campaign \"{}\" #{}", campaign_name, campaign_id),
            || campaign.pause_campaign(campaign_id),
        );

        let (best, last_shot) = compared?;
        paused?;

        let mut outcome = Outcome {
            passed: best.matches,
            score: Some(best.score),
            ..Default::default()
        };
        if !best.matches {
            outcome.failure = Some(format!(
                "screen does not match \"{}\": best score {:.3}",
                reference.display(),
                best.score
            ));
            if let Some(shot) = last_shot {
                outcome.artifacts.push(self.save_screenshot(&target.name, &shot)?);
            }
        }
        Ok(outcome)
    }

    /// Capture up to `attempts` screenshots, stopping at the first match.
    ///
    /// Returns the best comparison and, on mismatch, the last capture.
    fn capture_until_match(
        &self,
        device: &Device<&T>,
        target: &DeviceTarget,
        comparator: &mut ImageComparator,
    ) -> E2eResult<(Comparison, Option<Vec<u8>>)> {
        let mut best = Comparison { score: 0.0, matches: false };
        let mut last_shot = None;

        for attempt in 1..=self.config.attempts.max(1) {
            let shot = device.retrieve_screenshot(target.id)?;
            comparator.load_target_bytes(&shot)?;
            let comparison = comparator.evaluate()?;

            if comparison.matches {
                return Ok((comparison, None));
            }
            warn!(
                "Attempt {}/{}: score {:.3} on {}",
                attempt, self.config.attempts, comparison.score, target.name
            );
            if comparison.score >= best.score {
                best = comparison;
            }
            last_shot = Some(shot);
        }

        Ok((best, last_shot))
    }

    /// Store a captured screenshot under the output directory, named by content hash
    fn save_screenshot(&self, device_name: &str, raw: &[u8]) -> E2eResult<PathBuf> {
        let dir = self.config.output_dir.join("screenshots");
        std::fs::create_dir_all(&dir)?;

        let digest = hex::encode(Sha256::digest(raw));
        let path = dir.join(format!("{}-{}.jpg", device_name, &digest[..16]));
        std::fs::write(&path, raw)?;
        info!("Saved mismatching screenshot to {}", path.display());
        Ok(path)
    }

    /// Write suite results as JSON
    pub fn write_results(&self, results: &TestSuiteResult) -> E2eResult<PathBuf> {
        std::fs::create_dir_all(&self.config.output_dir)?;

        let path = self.config.output_dir.join("test-results.json");
        let json = serde_json::to_string_pretty(results)?;
        std::fs::write(&path, json)?;

        info!("Results written to: {}", path.display());
        Ok(path)
    }
}
