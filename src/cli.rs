// SPDX-License-Identifier: GPL-3.0-only

//! CLI commands
//!
//! The binary has no IPC transport of its own; each command builds a broker
//! on top of the simulated provider described in the config and drives it
//! in-process.

use camera_broker::backends::hardware::{SimulatedProvider, StaticRegistry};
use camera_broker::broker::{CallerIdentity, ClientSession, IdentitySource, LocalIdentity};
use camera_broker::{Config, Enumerator};
use std::sync::{Arc, Barrier};
use std::thread;

type CliResult = Result<(), Box<dyn std::error::Error>>;

/// Broker bound to a fresh simulated provider
struct Harness {
    enumerator: Arc<Enumerator>,
    provider: Arc<SimulatedProvider>,
    caller: CallerIdentity,
}

fn build_harness(config: &Config, uid: Option<u32>) -> Result<Harness, Box<dyn std::error::Error>> {
    let provider = Arc::new(config.simulated.build_provider());
    let registry = StaticRegistry::new().with(config.provider_name.clone(), provider.clone());
    let enumerator = Arc::new(Enumerator::from_config(config, Arc::new(registry)));
    enumerator.init(&config.provider_name)?;

    // Our own pid, but the uid the broker expects unless told otherwise
    let local = LocalIdentity.calling_identity();
    let uid = uid
        .or_else(|| config.allowed_uids.first().copied())
        .unwrap_or(local.uid);

    Ok(Harness {
        enumerator,
        provider,
        caller: CallerIdentity::new(local.pid, uid),
    })
}

/// List all cameras the provider exposes
pub fn list_cameras(config: &Config, uid: Option<u32>) -> CliResult {
    let harness = build_harness(config, uid)?;
    let cameras = harness.enumerator.get_camera_list(&harness.caller)?;

    if cameras.is_empty() {
        println!("No cameras found.");
        return Ok(());
    }

    println!("Available cameras:");
    println!();
    for (index, camera) in cameras.iter().enumerate() {
        println!("  [{}] {}", index, camera.camera_id);
    }

    Ok(())
}

/// Print the broker status snapshot
pub fn print_status(config: &Config, uid: Option<u32>) -> CliResult {
    let harness = build_harness(config, uid)?;
    let status = harness.enumerator.snapshot(&harness.caller)?;
    println!("{}", status.to_json()?);
    Ok(())
}

/// Print the configuration in effect
pub fn show_config(config: &Config) -> CliResult {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

/// Walk through camera sharing and display handover
pub fn run_demo(config: &Config, uid: Option<u32>, camera: Option<String>) -> CliResult {
    let harness = build_harness(config, uid)?;
    let camera_id = match camera {
        Some(id) => id,
        None => harness
            .enumerator
            .get_camera_list(&harness.caller)?
            .into_iter()
            .next()
            .map(|desc| desc.camera_id)
            .ok_or("No cameras found")?,
    };

    println!("Sharing camera {} between two clients", camera_id);

    // Both clients open at the same moment
    let barrier = Arc::new(Barrier::new(2));
    let handles: Vec<_> = ["A", "B"]
        .into_iter()
        .map(|name| {
            let enumerator = Arc::clone(&harness.enumerator);
            let barrier = Arc::clone(&barrier);
            let caller = harness.caller;
            let camera_id = camera_id.clone();
            thread::spawn(move || {
                let mut session = ClientSession::new(enumerator, caller);
                barrier.wait();
                let opened = session.open_camera(&camera_id).map(|proxy| proxy.id());
                (name, session, opened)
            })
        })
        .collect();

    let mut sessions = Vec::new();
    for handle in handles {
        let (name, session, opened) = handle.join().map_err(|_| "client thread panicked")?;
        match opened {
            Ok(id) => println!("  client {} opened proxy {}", name, id),
            Err(e) => println!("  client {} failed: {}", name, e),
        }
        sessions.push((name, session));
    }

    let stats = harness.provider.stats();
    println!("  hardware opens so far: {}", stats.camera_opens);
    println!("{}", harness.enumerator.snapshot(&harness.caller)?.to_json()?);

    // Dropping a session closes whatever the client left open
    for (name, session) in sessions {
        drop(session);
        let closes = harness.provider.stats().camera_closes;
        println!("  client {} disconnected, hardware closes: {}", name, closes);
    }

    println!();
    println!("Opening the display twice");
    let first = harness.enumerator.open_display(&harness.caller)?;
    let second = harness.enumerator.open_display(&harness.caller)?;
    println!("  first display state:  {}", first.get_display_state());
    println!("  second display state: {}", second.get_display_state());
    println!(
        "  broker display state: {}",
        harness.enumerator.get_display_state(&harness.caller)
    );
    harness.enumerator.close_display(&harness.caller, Some(&second))?;

    Ok(())
}
