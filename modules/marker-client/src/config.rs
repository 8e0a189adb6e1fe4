use std::env;

pub const DEFAULT_API_URL: &str = "http://127.0.0.1:9110";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostedConfig {
    pub url: String,
    pub anon_key: String,
    pub table: String,
    pub bucket: String,
}

impl HostedConfig {
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            table: "markers".to_string(),
            bucket: "uploads".to_string(),
        }
    }

    /// `None` unless both the URL and the key are set.
    pub fn from_env() -> Option<Self> {
        let url = non_empty_var("HOSTED_STORE_URL")?;
        let key = non_empty_var("HOSTED_STORE_ANON_KEY")?;
        let mut config = Self::new(&url, &key);
        if let Some(table) = non_empty_var("HOSTED_STORE_TABLE") {
            config.table = table;
        }
        if let Some(bucket) = non_empty_var("HOSTED_STORE_BUCKET") {
            config.bucket = bucket;
        }
        Some(config)
    }
}

/// Which backend the facade is wired to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendConfig {
    FileApi { base_url: String },
    Hosted(HostedConfig),
}

impl BackendConfig {
    /// Hosted store when it is configured, the local marker service otherwise.
    pub fn from_env() -> Self {
        Self::select(env::var("MARKER_API_URL").ok(), HostedConfig::from_env())
    }

    pub fn select(api_url: Option<String>, hosted: Option<HostedConfig>) -> Self {
        match hosted {
            Some(h) => BackendConfig::Hosted(h),
            None => BackendConfig::FileApi {
                base_url: api_url
                    .filter(|u| !u.trim().is_empty())
                    .unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            },
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}
