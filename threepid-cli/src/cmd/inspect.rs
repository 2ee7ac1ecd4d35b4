//! Profile inspection: settings plus the live state of every identifier.

use std::sync::Arc;

use serde_json::json;
use threepid::{DiscoveryFlow, MemoryGateway, ThreePid, ViewState};

use super::config::{self, ProfileConfig};
use crate::app::state_label;

/// Show profile settings and the discoverability of each identifier.
pub fn info(profile: &str, as_json: bool) -> threepid::Result<()> {
    let (cfg, gateway) = config::open(profile)?;
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let states = rt.block_on(check_all(&gateway, &cfg.three_pids));

    if as_json {
        println!("{}", render_json(profile, &cfg, &states));
        return Ok(());
    }

    println!("Profile:         {profile}");
    println!("Directory:       {}", config::profile_dir(profile).display());
    println!("Identity server: {}", yes_no(cfg.identity_server));
    println!("Atomic rebind:   {}", yes_no(cfg.rebind));
    println!("Latency:         {} ms", cfg.latency_ms);
    println!("Log:             {} ({})", config::log_path(profile).display(), cfg.log);

    println!("\nIdentifiers ({}):\n", states.len());
    for (i, (p, state)) in states.iter().enumerate() {
        println!(
            "  {}  {:<8} {:<28}  {}",
            i + 1,
            p.medium,
            p.display_address(),
            state_label(state.as_ref())
        );
    }
    Ok(())
}

/// Run one load per identifier, sequentially.
async fn check_all(
    gateway: &Arc<MemoryGateway>,
    three_pids: &[ThreePid],
) -> Vec<(ThreePid, Option<ViewState>)> {
    let mut out = Vec::with_capacity(three_pids.len());
    for p in three_pids {
        let flow = DiscoveryFlow::new(Arc::clone(gateway), p.clone());
        flow.load().await;
        out.push((p.clone(), flow.current()));
    }
    out
}

fn render_json(
    profile: &str,
    cfg: &ProfileConfig,
    states: &[(ThreePid, Option<ViewState>)],
) -> serde_json::Value {
    let identifiers: Vec<_> = states
        .iter()
        .map(|(p, state)| {
            let (mode, error) = match state {
                Some(ViewState::Loaded(mode)) => (Some(mode.as_str()), None),
                Some(ViewState::Error(e)) => (None, Some(e.to_string())),
                Some(ViewState::Loading) | None => (None, None),
            };
            json!({
                "medium": p.medium.as_str(),
                "address": p.address,
                "discoverable": mode.map(|m| m == "revoke"),
                "display_mode": mode,
                "error": error,
            })
        })
        .collect();
    json!({
        "profile": profile,
        "identity_server": cfg.identity_server,
        "rebind": cfg.rebind,
        "latency_ms": cfg.latency_ms,
        "identifiers": identifiers,
    })
}

const fn yes_no(v: bool) -> &'static str {
    if v { "yes" } else { "no" }
}

#[cfg(test)]
mod tests {
    use super::*;
    use threepid::{DisplayMode, Error};

    #[test]
    fn json_reports_mode_and_errors() {
        let cfg = ProfileConfig::default();
        let states = vec![
            (
                ThreePid::parse("alice@example.com").unwrap(),
                Some(ViewState::Loaded(DisplayMode::Revoke)),
            ),
            (
                ThreePid::parse("+447700900123").unwrap(),
                Some(ViewState::Error(Error::Network("down".into()))),
            ),
        ];
        let v = render_json("work", &cfg, &states);
        assert_eq!(v["profile"], "work");
        assert_eq!(v["identifiers"][0]["discoverable"], true);
        assert_eq!(v["identifiers"][0]["display_mode"], "revoke");
        assert_eq!(v["identifiers"][1]["medium"], "msisdn");
        assert_eq!(v["identifiers"][1]["error"], "network: down");
        assert!(v["identifiers"][1]["discoverable"].is_null());
    }

    #[test]
    fn check_all_loads_each_identifier() {
        let alice = ThreePid::parse("alice@example.com").unwrap();
        let bob = ThreePid::parse("bob@example.com").unwrap();
        let gateway = Arc::new(MemoryGateway::new().with_bound([alice.clone()]));
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .unwrap();
        let states = rt.block_on(check_all(&gateway, &[alice, bob]));
        assert_eq!(states[0].1, Some(ViewState::Loaded(DisplayMode::Revoke)));
        assert_eq!(states[1].1, Some(ViewState::Loaded(DisplayMode::Share)));
    }
}
