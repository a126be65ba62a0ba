use std::io::Read;
use std::net::TcpStream;
use std::path::{Path, PathBuf};

use log::{debug, info};
use plate_batch_types::ImageHandle;
use ssh2::{FileStat, Session, Sftp};

use crate::error::SourceError;

/// SFTP credential, resolved before any connection is attempted.
///
/// Password and private-key login are mutually exclusive; providing both or
/// neither is a configuration error rather than an implicit precedence.
#[derive(Debug, Clone)]
pub enum SftpAuth {
    Password(String),
    KeyFile(PathBuf),
}

impl SftpAuth {
    pub fn from_options(
        password: Option<String>,
        pkey: Option<PathBuf>,
    ) -> Result<Self, SourceError> {
        match (password, pkey) {
            (Some(password), None) => Ok(Self::Password(password)),
            (None, Some(path)) => Ok(Self::KeyFile(path)),
            (Some(_), Some(_)) => Err(SourceError::configuration(
                "provide either an sftp password or a private key path, not both",
            )),
            (None, None) => Err(SourceError::configuration(
                "sftp login requires a password or a private key path",
            )),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub folder: PathBuf,
    pub auth: SftpAuth,
}

/// Remote SFTP source. The connection, authentication, and directory listing
/// all happen at construction so a broken source aborts the run before any
/// submission; file contents are staged into memory one at a time on fetch.
pub struct SftpSource {
    _session: Session,
    sftp: Sftp,
    files: Vec<PathBuf>,
}

impl SftpSource {
    pub fn connect(config: &SftpConfig) -> Result<Self, SourceError> {
        let stream = TcpStream::connect((config.host.as_str(), config.port)).map_err(|source| {
            SourceError::Connect {
                host: config.host.clone(),
                port: config.port,
                source,
            }
        })?;

        let mut session = Session::new()?;
        session.set_tcp_stream(stream);
        session.handshake()?;

        match &config.auth {
            SftpAuth::Password(password) => session
                .userauth_password(&config.user, password)
                .map_err(|source| SourceError::Auth {
                    user: config.user.clone(),
                    source,
                })?,
            SftpAuth::KeyFile(path) => session
                .userauth_pubkey_file(&config.user, None, path, None)
                .map_err(|source| SourceError::Auth {
                    user: config.user.clone(),
                    source,
                })?,
        }

        let sftp = session.sftp()?;
        let entries = sftp.readdir(&config.folder)?;
        let files = regular_files(entries);
        info!(
            "sftp listing of {} yielded {} file(s)",
            config.folder.display(),
            files.len()
        );

        Ok(Self {
            _session: session,
            sftp,
            files,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.files.iter().map(|path| display_name(path)).collect()
    }

    pub fn fetch(&self, index: usize) -> Result<ImageHandle, SourceError> {
        let path = &self.files[index];
        let mut remote = self.sftp.open(path)?;
        let mut data = Vec::new();
        remote
            .read_to_end(&mut data)
            .map_err(|source| SourceError::io(path.clone(), source))?;
        debug!("staged {} ({} bytes)", path.display(), data.len());
        Ok(ImageHandle::new(display_name(path), data))
    }
}

/// Keeps regular files from a directory listing, in listing order.
/// Subdirectories are skipped without recursion.
fn regular_files(entries: Vec<(PathBuf, FileStat)>) -> Vec<PathBuf> {
    entries
        .into_iter()
        .filter(|(_, stat)| stat.is_file())
        .map(|(path, _)| path)
        .collect()
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(perm: u32) -> FileStat {
        FileStat {
            size: None,
            uid: None,
            gid: None,
            perm: Some(perm),
            atime: None,
            mtime: None,
        }
    }

    #[test]
    fn listing_keeps_regular_files_in_order() {
        let entries = vec![
            (PathBuf::from("/images/car-1.jpg"), stat(0o100644)),
            (PathBuf::from("/images/archive"), stat(0o040755)),
            (PathBuf::from("/images/car-2.jpg"), stat(0o100644)),
        ];
        let files = regular_files(entries);
        assert_eq!(
            files,
            vec![
                PathBuf::from("/images/car-1.jpg"),
                PathBuf::from("/images/car-2.jpg"),
            ]
        );
    }

    #[test]
    fn auth_options_are_mutually_exclusive() {
        assert!(matches!(
            SftpAuth::from_options(Some("secret".into()), Some("/key".into())),
            Err(SourceError::Configuration { .. })
        ));
        assert!(matches!(
            SftpAuth::from_options(None, None),
            Err(SourceError::Configuration { .. })
        ));
        assert!(matches!(
            SftpAuth::from_options(Some("secret".into()), None),
            Ok(SftpAuth::Password(_))
        ));
    }
}
