//! Profile management commands: new, list, remove, clear, default.

use std::fs;
use std::io;

use threepid::Error;

use super::NewArgs;
use super::config::{self, ProfileConfig};

/// Create a new profile and save its config.
///
/// With `--bound` the identifiers start out discoverable.
pub fn create(args: &NewArgs) -> threepid::Result<ProfileConfig> {
    let dir = config::profile_dir(&args.name);
    if dir.join("profile.conf").exists() {
        return Err(Error::InvalidArgument(format!(
            "profile '{}' already exists",
            args.name
        )));
    }

    let mut three_pids = Vec::with_capacity(args.three_pids.len());
    for p in &args.three_pids {
        if !three_pids.contains(p) {
            three_pids.push(p.clone());
        }
    }
    let cfg = ProfileConfig {
        three_pids,
        rebind: args.rebind,
        identity_server: !args.no_identity_server,
        latency_ms: args.latency_ms,
        log: args.log.clone(),
    };
    cfg.save(&args.name)?;
    let bound = if args.bound {
        cfg.three_pids.as_slice()
    } else {
        &[]
    };
    config::save_directory(&args.name, bound)?;

    // Set as default if this is the first profile ever.
    if !config::data_dir().join(".default").exists() {
        config::set_default(&args.name)?;
    }

    println!("Profile '{}' created.", args.name);
    for p in &cfg.three_pids {
        println!("  {:<8} {}", p.medium, p.display_address());
    }
    Ok(cfg)
}

/// List all saved profiles.
pub fn list() -> threepid::Result<()> {
    let base = config::data_dir();
    if !base.exists() {
        println!("No profiles found.");
        return Ok(());
    }

    let default = config::default_profile();

    let mut entries: Vec<_> = fs::read_dir(&base)?
        .filter_map(Result::ok)
        .filter(|e| e.path().is_dir())
        .collect();
    entries.sort_by_key(fs::DirEntry::file_name);

    if entries.is_empty() {
        println!("No profiles found.");
        return Ok(());
    }

    for entry in &entries {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        let star = if *name == default { " *" } else { "" };

        if let Ok(cfg) = ProfileConfig::load(&name) {
            let bound = config::load_directory(&name).map_or(0, |b| b.len());
            println!(
                "  {name:<16} {:>2} identifiers  {bound:>2} discoverable{}{star}",
                cfg.three_pids.len(),
                if cfg.rebind { "  [rebind]" } else { "" },
            );
        } else {
            println!("  {name:<16} [no config]{star}");
        }
    }
    println!("\n  * = default");
    Ok(())
}

/// Remove a single profile directory.
pub fn remove(name: &str) -> threepid::Result<()> {
    let dir = config::profile_dir(name);
    if !dir.exists() {
        println!("Profile '{name}' does not exist.");
        return Ok(());
    }
    fs::remove_dir_all(&dir)?;
    println!("Removed profile '{name}'.");
    Ok(())
}

/// Remove ALL profiles after confirmation from stdin.
pub fn clear() -> threepid::Result<()> {
    let base = config::data_dir();
    if !base.exists() {
        println!("Nothing to clear.");
        return Ok(());
    }

    eprint!(
        "This will delete ALL data in {}.  Continue? [y/N] ",
        base.display()
    );
    let mut answer = String::new();
    io::stdin().read_line(&mut answer)?;

    if !matches!(answer.trim(), "y" | "Y" | "yes" | "YES") {
        println!("Aborted.");
        return Ok(());
    }

    fs::remove_dir_all(&base)?;
    println!("All profiles deleted.");
    Ok(())
}

/// Show or set the default profile.
pub fn default(name: Option<&str>) -> threepid::Result<()> {
    match name {
        Some(name) => {
            if !config::profile_dir(name).exists() {
                return Err(Error::InvalidArgument(format!(
                    "profile '{name}' does not exist"
                )));
            }
            config::set_default(name)?;
            println!("Default profile set to '{name}'.");
        }
        None => println!("{}", config::default_profile()),
    }
    Ok(())
}
