use anyhow::{Context, Result};
use colored::Colorize;
use std::process::{Command, Output};
use std::time::Instant;

pub fn run(unit_only: bool, integration_only: bool) -> Result<()> {
    println!();
    println!("{}", "🧪 Running tests...".cyan().bold());
    println!();

    let total_start = Instant::now();

    if !integration_only {
        suite("unit tests", &["test", "--lib", "--workspace"])?;
    }

    if !unit_only {
        suite("integration tests", &["test", "--workspace", "--tests"])?;
        suite(
            "emulator sessions",
            &[
                "test",
                "-p",
                "firmware",
                "--features",
                "emulator",
                "--test",
                "emulator_session",
            ],
        )?;
    }

    println!(
        "{}",
        format!(
            "✓ All tests completed in {:.2}s",
            total_start.elapsed().as_secs_f64()
        )
        .green()
        .bold()
    );
    println!();

    Ok(())
}

/// Run the emulator example with crash reports printed.
pub fn emulate() -> Result<()> {
    println!();
    println!("{}", "🖥  Running the crash-info emulator...".cyan().bold());
    println!();

    let status = Command::new("cargo")
        .args([
            "run",
            "-p",
            "firmware",
            "--features",
            "emulator",
            "--example",
            "crash_emulator",
        ])
        .status()
        .context("Failed to run the emulator")?;

    if !status.success() {
        anyhow::bail!("Emulator exited with {status}");
    }
    Ok(())
}

fn suite(label: &str, args: &[&str]) -> Result<()> {
    println!("{}", format!("  Running {label}...").cyan());
    let start = Instant::now();

    let output = Command::new("cargo")
        .args(args)
        .output()
        .with_context(|| format!("Failed to run {label}"))?;

    if !output.status.success() {
        eprintln!("{}", format!("  ✗ {label} failed").red().bold());
        eprintln!();
        print_indented(&output);
        anyhow::bail!("{label} failed");
    }

    let summary = extract_test_summary(&String::from_utf8_lossy(&output.stdout));
    println!(
        "{}",
        format!(
            "  ✓ {label} passed {} in {:.2}s",
            summary,
            start.elapsed().as_secs_f64()
        )
        .green()
    );
    println!();
    Ok(())
}

fn print_indented(output: &Output) {
    for line in String::from_utf8_lossy(&output.stdout).lines() {
        eprintln!("  {line}");
    }
}

fn extract_test_summary(output: &str) -> String {
    // Look for lines like "test result: ok. 5 passed; 0 failed; 0 ignored; 0 measured; 0 filtered out"
    for line in output.lines() {
        if line.contains("test result:") {
            if let Some(summary) = line.split("test result:").nth(1) {
                return summary.trim().to_string();
            }
        }
    }
    "(summary not available)".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_is_extracted() {
        let out = "running 3 tests\ntest result: ok. 3 passed; 0 failed; 0 ignored\n";
        assert_eq!(extract_test_summary(out), "ok. 3 passed; 0 failed; 0 ignored");
        assert_eq!(extract_test_summary(""), "(summary not available)");
    }
}
