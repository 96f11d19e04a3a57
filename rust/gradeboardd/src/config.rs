use anyhow::Context;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_AI_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_AI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_AI_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint: String,
    pub timeout: Duration,
}

#[derive(Debug, Clone)]
pub struct DaemonConfig {
    /// Workspace opened before the first request, if any.
    pub workspace: Option<PathBuf>,
    pub ai: AiConfig,
}

impl DaemonConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|k| std::env::var(k).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |k: &str| lookup(k).filter(|v| !v.trim().is_empty());

        let timeout_secs = match non_empty("GRADEBOARD_AI_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("GRADEBOARD_AI_TIMEOUT_SECS must be seconds, got {raw:?}"))?,
            None => DEFAULT_AI_TIMEOUT_SECS,
        };

        Ok(Self {
            workspace: non_empty("GRADEBOARD_WORKSPACE").map(PathBuf::from),
            ai: AiConfig {
                api_key: non_empty("GEMINI_API_KEY").or_else(|| non_empty("API_KEY")),
                model: non_empty("GRADEBOARD_AI_MODEL")
                    .unwrap_or_else(|| DEFAULT_AI_MODEL.to_string()),
                endpoint: non_empty("GRADEBOARD_AI_ENDPOINT")
                    .unwrap_or_else(|| DEFAULT_AI_ENDPOINT.to_string()),
                timeout: Duration::from_secs(timeout_secs),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |k: &str| map.get(k).cloned()
    }

    #[test]
    fn defaults_apply_when_unset() {
        let cfg = DaemonConfig::from_lookup(lookup(&[])).expect("config");
        assert!(cfg.workspace.is_none());
        assert!(cfg.ai.api_key.is_none());
        assert_eq!(cfg.ai.model, DEFAULT_AI_MODEL);
        assert_eq!(cfg.ai.timeout, Duration::from_secs(60));
    }

    #[test]
    fn api_key_falls_back_to_generic_name() {
        let cfg = DaemonConfig::from_lookup(lookup(&[("GEMINI_API_KEY", " "), ("API_KEY", "k")]))
            .expect("config");
        assert_eq!(cfg.ai.api_key.as_deref(), Some("k"));
    }

    #[test]
    fn bad_timeout_is_an_error() {
        let err = DaemonConfig::from_lookup(lookup(&[("GRADEBOARD_AI_TIMEOUT_SECS", "soon")]))
            .expect_err("timeout must parse");
        assert!(err.to_string().contains("GRADEBOARD_AI_TIMEOUT_SECS"));
    }
}
