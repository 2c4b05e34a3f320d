use anyhow::{Context, Result};
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

const TARGET: &str = "thumbv6m-none-eabi";

/// One `cargo` invocation that must succeed.
struct Step {
    label: &'static str,
    args: &'static [&'static str],
}

const STEPS: &[Step] = &[
    Step {
        label: "hardware target (DA14531)",
        args: &["check", "-p", "firmware", "--target", TARGET, "--features", "hardware"],
    },
    Step {
        label: "hardware target, development-debug",
        args: &[
            "check",
            "-p",
            "firmware",
            "--target",
            TARGET,
            "--features",
            "hardware,development-debug",
        ],
    },
    Step {
        label: "emulator target (host)",
        args: &["check", "-p", "firmware", "--features", "emulator", "--all-targets"],
    },
    Step {
        label: "library crates (no_std + defmt)",
        args: &[
            "check",
            "-p",
            "platform",
            "-p",
            "diagnostics",
            "-p",
            "bluetooth",
            "--target",
            TARGET,
            "--features",
            "defmt",
        ],
    },
];

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking firmware builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    for step in STEPS {
        println!("{}", format!("  Checking {}...", step.label).cyan());
        let start = Instant::now();

        let output = Command::new("cargo")
            .args(step.args)
            .output()
            .with_context(|| format!("Failed to check {}", step.label))?;

        if !output.status.success() {
            eprintln!("{}", format!("  ✗ {} failed", step.label).red().bold());
            eprintln!();
            eprintln!("{}", String::from_utf8_lossy(&output.stderr));
            anyhow::bail!("Check failed: {}", step.label);
        }

        println!(
            "{}",
            format!("  ✓ Passed in {:.2}s", start.elapsed().as_secs_f64()).green()
        );
        println!();
    }

    // Lints and formatting are reported, not enforced
    println!("{}", "  Running clippy lints...".cyan());
    let clippy_output = Command::new("cargo")
        .args(["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"])
        .output()
        .context("Failed to run clippy")?;
    if clippy_output.status.success() {
        println!("{}", "  ✓ Clippy passed".green());
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
