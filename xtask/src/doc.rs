use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

/// Library crates and the features that gate public items in each.
const DOCUMENTED: [(&str, &str); 3] = [
    ("platform", "std,defmt,tracing"),
    ("sabre", "defmt"),
    ("dac-control", "defmt"),
];

pub fn run(open: bool) -> Result<()> {
    println!();
    println!("{}", "📚 Documenting driver crates...".cyan().bold());
    println!();

    let start = Instant::now();

    let last = DOCUMENTED.len().saturating_sub(1);
    for (index, &(krate, features)) in DOCUMENTED.iter().enumerate() {
        let mut cmd = Command::new("cargo");
        // Open the top of the stack once everything below it is built.
        cmd.args(doc_args(krate, features, open && index == last));

        let output = cmd
            .output()
            .with_context(|| format!("Failed to document {krate}"))?;
        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {krate} docs failed").red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("Documentation build failed for {krate}");
        }
        println!("{}", format!("  ✓ {krate} ({features})").green());
    }

    println!();
    println!(
        "{}",
        format!(
            "✓ Documentation built in {:.2}s",
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    if !open {
        println!(
            "   {}",
            "Open target/doc/dac_control/index.html, or run 'cargo run -p xtask -- doc --open'".dimmed()
        );
    }
    println!();

    Ok(())
}

fn doc_args<'a>(krate: &'a str, features: &'a str, open: bool) -> Vec<&'a str> {
    let mut args = vec!["doc", "--no-deps", "-p", krate, "--features", features];
    if open {
        args.push("--open");
    }
    args
}
