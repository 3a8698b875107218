use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Library crates that must build for the bare-metal target.
const NO_STD_CRATES: [&str; 3] = ["platform", "sabre", "dac-control"];

const EMBEDDED_TARGET: &str = "thumbv7em-none-eabihf";

pub fn run(defmt: bool) -> Result<()> {
    println!();
    println!("{}", "🔍 Checking driver crates...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for krate in NO_STD_CRATES {
        println!(
            "{}",
            format!("  Checking {krate} ({EMBEDDED_TARGET}, no_std)...").cyan()
        );
        let start = Instant::now();

        let mut cmd = Command::new("cargo");
        cmd.args(["check", "-p", krate, "--target", EMBEDDED_TARGET]);
        if defmt {
            cmd.args(["--features", "defmt"]);
        }
        let output = cmd
            .output()
            .with_context(|| format!("Failed to check {krate}"))?;

        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {krate} check failed").red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("{krate} check failed");
        }

        println!(
            "{}",
            format!(
                "  ✓ {krate} passed in {:.2}s",
                start.elapsed().as_secs_f64()
            )
            .green()
        );
    }
    println!();

    println!("{}", "  Running clippy lints...".cyan());
    let clippy_start = Instant::now();

    let clippy_output = Command::new("cargo")
        .args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
        .output()
        .context("Failed to run clippy")?;

    if clippy_output.status.success() {
        println!(
            "{}",
            format!(
                "  ✓ Clippy passed in {:.2}s",
                clippy_start.elapsed().as_secs_f64()
            )
            .green()
        );
    } else {
        eprintln!("{}", "  ⚠ Clippy warnings found".yellow().bold());
        eprintln!();
        eprintln!("{}", String::from_utf8_lossy(&clippy_output.stderr));
    }
    println!();

    println!("{}", "  Checking code formatting...".cyan());

    let fmt_output = Command::new("cargo")
        .args(["fmt", "--all", "--check"])
        .output()
        .context("Failed to run cargo fmt")?;

    if fmt_output.status.success() {
        println!("{}", "  ✓ Formatting check passed".green());
    } else {
        eprintln!("{}", "  ⚠ Formatting issues found".yellow().bold());
        eprintln!("     Run 'cargo fmt --all' to fix");
    }
    println!();

    println!(
        "{}",
        format!(
            "✓ All checks completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}
