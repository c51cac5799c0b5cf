//! Replay an overlay event script.
//!
//! Usage: `hud-replay <script.json> [output.json]`
//!
//! Environment:
//! - `HUD_CONFIG` - JSON config file (defaults apply when unset)
//! - `HUD_OUTPUT` - where to write the JSON report when no output argument is given
//!
//! Without an output path every frame is printed to stdout as `step player packet hex`.

use std::path::PathBuf;

use hud_overlay::HudConfig;
use hud_replay::{Replay, ReplayReport, Script};
use tracing::info;

fn main() -> eyre::Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("hud_replay=info".parse()?)
                .add_directive("hud_overlay=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let Some(script_path) = args.get(1).map(PathBuf::from) else {
        eyre::bail!("usage: hud-replay <script.json> [output.json]");
    };
    let output = args
        .get(2)
        .map(PathBuf::from)
        .or_else(|| std::env::var("HUD_OUTPUT").ok().map(PathBuf::from));

    let config = match std::env::var("HUD_CONFIG") {
        Ok(path) => {
            info!("Loading config from {}", path);
            HudConfig::load(&path)?
        }
        Err(_) => HudConfig::default(),
    };

    let script = Script::load(&script_path)?;
    info!(
        "Replaying {} events from {}",
        script.events.len(),
        script_path.display()
    );
    let report = Replay::new(&config).run(&script)?;

    match output {
        Some(path) => report.save(&path)?,
        None => print_frames(&report),
    }
    Ok(())
}

#[allow(clippy::print_stdout)]
fn print_frames(report: &ReplayReport) {
    for frame in &report.frames {
        println!(
            "{:>3} {:>6} {:<14} {}",
            frame.step, frame.player, frame.packet, frame.data
        );
    }
}
