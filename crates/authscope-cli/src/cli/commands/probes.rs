//! `authscope probes` - list the built-in probes and section checks.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use authscope_core::AuthType;
use authscope_engine::catalog::SECTION_REQUIREMENTS;
use authscope_engine::default_catalog;

use super::Context;
use crate::output;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ProbeEntry {
    name: String,
    label: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SectionEntry {
    section: &'static str,
    kind: &'static str,
    auth_type: AuthType,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Listing {
    probes: Vec<ProbeEntry>,
    section_checks: Vec<SectionEntry>,
}

fn listing() -> Listing {
    let probes = default_catalog()
        .iter()
        .map(|probe| ProbeEntry {
            name: probe.name().to_string(),
            label: probe.label().to_string(),
        })
        .collect();
    let section_checks = SECTION_REQUIREMENTS
        .iter()
        .map(|&(section, kind, auth_type, _)| SectionEntry {
            section,
            kind,
            auth_type,
        })
        .collect();

    Listing {
        probes,
        section_checks,
    }
}

pub fn execute(ctx: &Context) -> Result<()> {
    let listing = listing();

    if let Some(text) = output::render(ctx.output_format, &listing)? {
        println!("{text}");
        return Ok(());
    }

    println!("{} ({})", "Probes".bold().underline(), listing.probes.len());
    for probe in &listing.probes {
        println!("  {:<28} {}", probe.name.cyan(), probe.label);
    }
    println!();
    println!("{} ({})", "Section checks".bold().underline(), listing.section_checks.len());
    for check in &listing.section_checks {
        println!(
            "  {:<28} {:<10} {}",
            check.section,
            check.kind.dimmed(),
            check.auth_type.as_str()
        );
    }

    Ok(())
}
