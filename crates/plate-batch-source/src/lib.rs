//! Image sources for the batch pipeline: local filesystem globs and remote
//! SFTP directories behind one interface.
//!
//! Listings are resolved eagerly so connection, authentication, and pattern
//! errors abort a run before any submission; image bytes are fetched lazily
//! as the orchestrator advances.

mod error;
mod local;
mod sftp;

pub use error::SourceError;
pub use local::LocalSource;
pub use sftp::{SftpAuth, SftpConfig, SftpSource};

use plate_batch_types::ImageHandle;

pub enum ImageSource {
    Local(LocalSource),
    Sftp(SftpSource),
}

impl ImageSource {
    pub fn local(patterns: &[String]) -> Result<Self, SourceError> {
        Ok(Self::Local(LocalSource::new(patterns)?))
    }

    pub fn sftp(config: &SftpConfig) -> Result<Self, SourceError> {
        Ok(Self::Sftp(SftpSource::connect(config)?))
    }

    pub fn len(&self) -> usize {
        match self {
            Self::Local(source) => source.len(),
            Self::Sftp(source) => source.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn names(&self) -> Vec<String> {
        match self {
            Self::Local(source) => source.names(),
            Self::Sftp(source) => source.names(),
        }
    }

    /// Stages the image at `index` into memory. Fetch failures are fatal to
    /// the run; the caller decides what to do with work already recorded.
    pub fn fetch(&self, index: usize) -> Result<ImageHandle, SourceError> {
        match self {
            Self::Local(source) => source.fetch(index),
            Self::Sftp(source) => source.fetch(index),
        }
    }
}
