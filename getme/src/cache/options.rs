//! Per-invocation fetch options.

/// Options threaded through every fetch of one invocation.
///
/// Built once, then passed by reference; nothing reads these from global
/// state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FetchOptions {
    /// API authentication token.
    pub auth_token: Option<String>,

    /// Name of an environment variable holding the API token.
    pub auth_token_env_variable: Option<String>,

    /// Amazon S3 access key.
    pub s3_access_key: Option<String>,

    /// Amazon S3 secret key.
    pub s3_secret_key: Option<String>,

    /// Expected SHA-256 of the artifact (hex).
    pub sha256: Option<String>,

    /// Re-fetch even when a cached copy exists.
    pub force: bool,
}

impl FetchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Some(token.into());
        self
    }

    pub fn with_auth_token_env_variable(mut self, name: impl Into<String>) -> Self {
        self.auth_token_env_variable = Some(name.into());
        self
    }

    pub fn with_s3_keys(mut self, access_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        self.s3_access_key = Some(access_key.into());
        self.s3_secret_key = Some(secret_key.into());
        self
    }

    pub fn with_sha256(mut self, sha256: impl Into<String>) -> Self {
        self.sha256 = Some(sha256.into());
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Expected checksum, ignoring blank values.
    pub fn sha256(&self) -> Option<&str> {
        non_blank(self.sha256.as_deref())
    }

    /// Token to authenticate API calls with.
    ///
    /// An explicit token wins over the environment variable.
    pub fn resolved_token(&self) -> Option<String> {
        if let Some(token) = non_blank(self.auth_token.as_deref()) {
            return Some(token.to_string());
        }
        let name = non_blank(self.auth_token_env_variable.as_deref())?;
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }

    /// Both S3 keys, when configured.
    pub fn s3_credentials(&self) -> Option<(&str, &str)> {
        Some((
            non_blank(self.s3_access_key.as_deref())?,
            non_blank(self.s3_secret_key.as_deref())?,
        ))
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
