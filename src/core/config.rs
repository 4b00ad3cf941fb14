use std::path::Path;

// ---------------------------------------------------------------------------
// ToolConfig — file-based config loader (zhihu-direct.json) with env-var fallback
// ---------------------------------------------------------------------------

pub const ENV_CONFIG_PATH: &str = "ZHIHU_DIRECT_CONFIG";
pub const ENV_CHROME_EXECUTABLE: &str = "CHROME_EXECUTABLE";
pub const ENV_NAVIGATION_WAIT_MS: &str = "NAVIGATION_WAIT_MS";
pub const ENV_HTTP_TIMEOUT_SECS: &str = "HTTP_TIMEOUT_SECS";

/// Top-level config loaded from `zhihu-direct.json`.
///
/// Everything here is host-environment tuning. The redirector pattern, the
/// decode heuristics, and the suppressor interval are compile-time constants
/// in `redirect` and are not configurable.
#[derive(serde::Deserialize, Default, Clone, Debug)]
pub struct ToolConfig {
    /// Browser executable path. Default is auto-discovery.
    pub chrome_executable: Option<String>,
    /// Quiet window for the post-navigation network-idle wait. Default: 1500.
    pub navigation_wait_ms: Option<u64>,
    /// Timeout for the plain-HTTP fetch path. Default: 30.
    pub http_timeout_secs: Option<u64>,
}

impl ToolConfig {
    /// Browser executable: JSON field → `CHROME_EXECUTABLE` env var → `None`
    /// (auto-discovery). Only paths that exist are honored.
    pub fn chrome_executable(&self) -> Option<String> {
        if let Some(p) = &self.chrome_executable {
            let p = p.trim();
            if !p.is_empty() && Path::new(p).exists() {
                return Some(p.to_string());
            }
        }
        let p = std::env::var(ENV_CHROME_EXECUTABLE).ok()?;
        let p = p.trim();
        if !p.is_empty() && Path::new(p).exists() {
            Some(p.to_string())
        } else {
            None
        }
    }

    /// Network-idle quiet window: JSON field → `NAVIGATION_WAIT_MS` env → 1500.
    pub fn navigation_wait_ms(&self) -> u64 {
        if let Some(ms) = self.navigation_wait_ms {
            return ms;
        }
        std::env::var(ENV_NAVIGATION_WAIT_MS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1500)
    }

    /// HTTP fetch timeout: JSON field → `HTTP_TIMEOUT_SECS` env → 30.
    pub fn http_timeout_secs(&self) -> u64 {
        if let Some(secs) = self.http_timeout_secs {
            return secs;
        }
        std::env::var(ENV_HTTP_TIMEOUT_SECS)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30)
    }
}

/// Load `zhihu-direct.json` from standard locations.
///
/// Search order (first found wins):
/// 1. `ZHIHU_DIRECT_CONFIG` env var path
/// 2. `./zhihu-direct.json` (process cwd)
/// 3. `../zhihu-direct.json` (one level up)
///
/// Missing file → `ToolConfig::default()` (silent, env-var fallbacks apply).
/// Parse error → log a warning, return `ToolConfig::default()`.
pub fn load_config() -> ToolConfig {
    let candidates: Vec<std::path::PathBuf> = {
        let mut v = vec![
            std::path::PathBuf::from("zhihu-direct.json"),
            std::path::PathBuf::from("../zhihu-direct.json"),
        ];
        if let Ok(env_path) = std::env::var(ENV_CONFIG_PATH) {
            v.insert(0, std::path::PathBuf::from(env_path));
        }
        v
    };

    for path in &candidates {
        match std::fs::read_to_string(path) {
            Ok(contents) => match serde_json::from_str::<ToolConfig>(&contents) {
                Ok(cfg) => {
                    tracing::info!("zhihu-direct.json loaded from {}", path.display());
                    return cfg;
                }
                Err(e) => {
                    tracing::warn!(
                        "zhihu-direct.json parse error at {}: {} — using defaults",
                        path.display(),
                        e
                    );
                    return ToolConfig::default();
                }
            },
            Err(_) => continue, // file not found at this path — try next
        }
    }

    ToolConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_fields_are_absent() {
        let cfg = ToolConfig::default();
        assert_eq!(cfg.navigation_wait_ms(), 1500);
        assert_eq!(cfg.http_timeout_secs(), 30);
    }

    #[test]
    fn json_fields_take_precedence() {
        let cfg: ToolConfig =
            serde_json::from_str(r#"{"navigation_wait_ms": 500, "http_timeout_secs": 5}"#)
                .unwrap();
        assert_eq!(cfg.navigation_wait_ms(), 500);
        assert_eq!(cfg.http_timeout_secs(), 5);
    }

    #[test]
    fn nonexistent_executable_path_is_ignored() {
        std::env::remove_var(ENV_CHROME_EXECUTABLE);
        let cfg: ToolConfig =
            serde_json::from_str(r#"{"chrome_executable": "/definitely/not/here"}"#).unwrap();
        assert_eq!(cfg.chrome_executable(), None);
    }
}
