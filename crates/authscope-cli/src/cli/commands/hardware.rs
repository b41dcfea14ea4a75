//! `authscope hardware` - show the detected hardware profile.

use anyhow::Result;
use colored::Colorize;

use authscope_engine::{HardwareProfile, SystemCommandRunner};

use super::Context;
use crate::output;

pub async fn execute(ctx: Context) -> Result<()> {
    let profile = HardwareProfile::detect(&SystemCommandRunner::new()).await;

    if let Some(text) = output::render(ctx.output_format, &profile)? {
        println!("{text}");
        return Ok(());
    }

    println!("{}", "Hardware Profile".bold().underline());
    println!("  {} {}", "model:".bold(), profile.model);
    for (feature, present) in [
        ("battery", profile.has_battery),
        ("touch id", profile.has_touch_id),
        ("face id", profile.has_face_id),
        ("thunderbolt", profile.has_thunderbolt),
        ("ethernet", profile.has_ethernet),
    ] {
        let mark = if present { "yes".green() } else { "no".dimmed() };
        println!("  {:<12} {}", format!("{feature}:").bold(), mark);
    }

    Ok(())
}
