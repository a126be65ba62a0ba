use url::Url;

use crate::error::ClientError;

pub const CLOUD_API_URL: &str = "https://api.platerecognizer.com/v1/plate-reader/";

/// Recognition target, resolved once before any image is processed.
///
/// Exactly one of the cloud API token or a self-hosted SDK URL must be
/// configured; providing both or neither is rejected up front instead of
/// falling back to an implicit precedence.
#[derive(Debug, Clone)]
pub enum Endpoint {
    Cloud { api_token: String, url: Url },
    SelfHosted { url: Url },
}

impl Endpoint {
    pub fn cloud(api_token: impl Into<String>) -> Self {
        let url = Url::parse(CLOUD_API_URL).expect("cloud API url is valid");
        Self::Cloud {
            api_token: api_token.into(),
            url,
        }
    }

    /// Self-hosted SDK endpoint; the recognition route lives at `<base>/alpr`.
    pub fn self_hosted(base: &str) -> Result<Self, ClientError> {
        let joined = format!("{}/alpr", base.trim_end_matches('/'));
        let url = Url::parse(&joined).map_err(|_| ClientError::InvalidUrl {
            value: base.to_string(),
        })?;
        Ok(Self::SelfHosted { url })
    }

    pub fn from_options(
        api_token: Option<String>,
        sdk_url: Option<String>,
    ) -> Result<Self, ClientError> {
        match (api_token, sdk_url) {
            (Some(token), None) => Ok(Self::cloud(token)),
            (None, Some(base)) => Self::self_hosted(&base),
            (Some(_), Some(_)) => Err(ClientError::configuration(
                "provide either an api token or a self-hosted sdk url, not both",
            )),
            (None, None) => Err(ClientError::configuration(
                "an api token or a self-hosted sdk url is required",
            )),
        }
    }

    pub fn url(&self) -> &Url {
        match self {
            Self::Cloud { url, .. } => url,
            Self::SelfHosted { url } => url,
        }
    }

    pub fn is_cloud(&self) -> bool {
        matches!(self, Self::Cloud { .. })
    }
}
