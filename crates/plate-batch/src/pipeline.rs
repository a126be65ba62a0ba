use std::fmt;

use indicatif::{ProgressBar, ProgressStyle};
use log::warn;
use plate_batch_client::{ClientError, RecognitionRequest, Recognizer};
use plate_batch_redact::{RedactError, Redactor};
use plate_batch_source::{ImageSource, SourceError};
use plate_batch_types::{RecognitionResult, Report};
use tokio::task;

use crate::settings::{ConfigError, EffectiveSettings};

#[derive(Debug)]
pub enum RunError {
    Config(ConfigError),
    Client(ClientError),
    Source(SourceError),
    Redact(RedactError),
    Emit(serde_json::Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::Config(err) => write!(f, "{err}"),
            RunError::Client(err) => write!(f, "{err}"),
            RunError::Source(err) => write!(f, "{err}"),
            RunError::Redact(err) => write!(f, "{err}"),
            RunError::Emit(err) => write!(f, "failed to serialize report: {err}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RunError::Config(err) => Some(err),
            RunError::Client(err) => Some(err),
            RunError::Source(err) => Some(err),
            RunError::Redact(err) => Some(err),
            RunError::Emit(err) => Some(err),
        }
    }
}

impl From<ConfigError> for RunError {
    fn from(value: ConfigError) -> Self {
        RunError::Config(value)
    }
}

impl From<ClientError> for RunError {
    fn from(value: ClientError) -> Self {
        RunError::Client(value)
    }
}

impl From<SourceError> for RunError {
    fn from(value: SourceError) -> Self {
        RunError::Source(value)
    }
}

impl From<RedactError> for RunError {
    fn from(value: RedactError) -> Self {
        RunError::Redact(value)
    }
}

/// Per-submission knobs carried into every request.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub regions: Vec<String>,
    pub camera_id: Option<String>,
    pub mmc: bool,
}

impl PipelineConfig {
    pub fn from_settings(settings: &EffectiveSettings) -> Self {
        Self {
            regions: settings.regions.clone(),
            camera_id: settings.camera_id.clone(),
            mmc: settings.mmc,
        }
    }
}

/// One full pass over the sourced images, strictly in listing order.
///
/// A fetch failure aborts the run; a submission failure is recorded as that
/// image's report entry and the run continues, so the report stays
/// index-aligned with the source regardless of retries or errors along the
/// way.
pub async fn run_pipeline<R: Recognizer>(
    source: &ImageSource,
    recognizer: &R,
    redactor: Option<&Redactor>,
    config: &PipelineConfig,
) -> Result<Report, RunError> {
    if source.is_empty() {
        warn!("no images matched the requested source");
        return Ok(Report::new());
    }

    let progress = ProgressBar::new(source.len() as u64);
    progress.set_style(
        ProgressStyle::with_template(
            "{bar:40.cyan/blue} {pos}/{len} images [{elapsed_precise}] {msg}",
        )
        .unwrap(),
    );

    let names = source.names();
    let mut report = Report::new();
    for (index, name) in names.into_iter().enumerate() {
        progress.set_message(name);
        let image = task::block_in_place(|| source.fetch(index))?;

        let request = RecognitionRequest::new(image)
            .with_regions(config.regions.clone())
            .with_camera_id(config.camera_id.clone())
            .with_mmc(config.mmc);

        let result = match recognizer.submit(&request).await {
            Ok(result) => result,
            Err(err) => {
                warn!("{}: submission failed: {err}", request.image().name());
                RecognitionResult::from_failure(request.image().name(), err.to_string())
            }
        };

        if let Some(redactor) = redactor {
            let detections = result.detections();
            task::block_in_place(|| redactor.redact(request.image(), &detections))?;
        }

        report.push(result);
        progress.inc(1);
    }

    progress.finish_and_clear();
    Ok(report)
}
