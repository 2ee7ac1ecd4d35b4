//! Profile configuration persistence and shared infrastructure.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use threepid::{Error, MemoryConfig, MemoryGateway, ThreePid};

const CONFIG_FILE: &str = "profile.conf";
const DIRECTORY_FILE: &str = "directory.conf";
const LOG_FILE: &str = "threepid.log";

/// Base data directory for all profiles.
pub fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("threepid-cli")
}

/// Data directory for a specific profile.
pub fn profile_dir(name: &str) -> PathBuf {
    data_dir().join(name)
}

/// Session log of a profile.
pub fn log_path(name: &str) -> PathBuf {
    profile_dir(name).join(LOG_FILE)
}

/// Read the default profile name (falls back to `"default"`).
pub fn default_profile() -> String {
    let path = data_dir().join(".default");
    fs::read_to_string(path).map_or_else(|_| "default".into(), |s| s.trim().to_owned())
}

/// Persist the default profile name.
pub fn set_default(name: &str) -> threepid::Result<()> {
    let base = data_dir();
    fs::create_dir_all(&base)?;
    fs::write(base.join(".default"), name)?;
    Ok(())
}

/// Persistent per-profile configuration stored as `profile.conf`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileConfig {
    /// Identifiers shown in the sidebar, in order.
    pub three_pids: Vec<ThreePid>,
    /// Whether the simulated homeserver advertises atomic rebind.
    pub rebind: bool,
    /// Whether the simulated session has an identity service.
    pub identity_server: bool,
    /// Simulated per-request latency.
    pub latency_ms: u64,
    /// `EnvFilter` directive for the session log.
    pub log: String,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            three_pids: Vec::new(),
            rebind: false,
            identity_server: true,
            latency_ms: 400,
            log: "info".into(),
        }
    }
}

impl ProfileConfig {
    /// Load from `<profile_dir>/profile.conf`.
    pub fn load(profile: &str) -> threepid::Result<Self> {
        let path = profile_dir(profile).join(CONFIG_FILE);
        let text = fs::read_to_string(&path)
            .map_err(|e| Error::Io(format!("load config {}: {e}", path.display())))?;
        Self::parse(&text)
    }

    /// Parse `key=value` lines. Unknown keys are ignored.
    pub fn parse(text: &str) -> threepid::Result<Self> {
        let mut cfg = Self::default();
        for line in text.lines() {
            let Some((k, v)) = line.trim().split_once('=') else {
                continue;
            };
            let v = v.trim();
            match k.trim() {
                "threepid" => cfg.three_pids.push(ThreePid::parse(v)?),
                "rebind" => cfg.rebind = parse_bool(k, v)?,
                "identity_server" => cfg.identity_server = parse_bool(k, v)?,
                "latency_ms" => {
                    cfg.latency_ms = v
                        .parse()
                        .map_err(|_| Error::InvalidArgument(format!("latency_ms: {v}")))?;
                }
                "log" => v.clone_into(&mut cfg.log),
                _ => {}
            }
        }
        Ok(cfg)
    }

    /// The `profile.conf` representation.
    pub fn render(&self) -> String {
        let mut out: String = self
            .three_pids
            .iter()
            .map(|p| format!("threepid={p}\n"))
            .collect();
        out.push_str(&format!(
            "rebind={}\nidentity_server={}\nlatency_ms={}\nlog={}\n",
            self.rebind, self.identity_server, self.latency_ms, self.log,
        ));
        out
    }

    /// Save to `<profile_dir>/profile.conf`.
    pub fn save(&self, profile: &str) -> threepid::Result<()> {
        let dir = profile_dir(profile);
        fs::create_dir_all(&dir)?;
        fs::write(dir.join(CONFIG_FILE), self.render())?;
        Ok(())
    }

    /// Simulation knobs for [`MemoryGateway`].
    pub const fn memory_config(&self) -> MemoryConfig {
        MemoryConfig {
            latency: Duration::from_millis(self.latency_ms),
            supports_rebind: self.rebind,
            identity_service: self.identity_server,
        }
    }
}

fn parse_bool(key: &str, v: &str) -> threepid::Result<bool> {
    match v {
        "true" | "yes" | "1" => Ok(true),
        "false" | "no" | "0" => Ok(false),
        _ => Err(Error::InvalidArgument(format!("{key}: expected true/false, got {v}"))),
    }
}

/// Identifiers the simulated identity server has bound for a profile.
pub fn load_directory(profile: &str) -> threepid::Result<Vec<ThreePid>> {
    let path = profile_dir(profile).join(DIRECTORY_FILE);
    if !path.exists() {
        return Ok(Vec::new());
    }
    fs::read_to_string(path)?
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(ThreePid::parse)
        .collect()
}

/// Persist the bound identifiers, one `medium:address` per line.
pub fn save_directory(profile: &str, bound: &[ThreePid]) -> threepid::Result<()> {
    let dir = profile_dir(profile);
    fs::create_dir_all(&dir)?;
    let text: String = bound.iter().map(|p| format!("{p}\n")).collect();
    fs::write(dir.join(DIRECTORY_FILE), text)?;
    Ok(())
}

/// Load a profile and the simulated gateway seeded from its directory.
pub fn open(profile: &str) -> threepid::Result<(ProfileConfig, Arc<MemoryGateway>)> {
    let cfg = ProfileConfig::load(profile)?;
    let gateway =
        MemoryGateway::with_config(cfg.memory_config()).with_bound(load_directory(profile)?);
    Ok((cfg, Arc::new(gateway)))
}
