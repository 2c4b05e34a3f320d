// Desktop/tooling crate — unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod decode;
mod flash;
mod test;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "Crash-info firmware development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flash firmware to the DA14531 via probe-rs
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
        /// Build with fault handlers that wait for a debugger
        #[arg(long)]
        development_debug: bool,
    },
    /// Run the desktop emulator scenario
    Emulate,
    /// Check firmware builds for both hardware and emulator targets
    Check,
    /// Run all tests (unit, integration, and emulator)
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Decode crash-info notifications captured by a collector
    ///
    /// Each argument is one notification in hex, in the order received.
    /// A single argument may also hold the whole response.
    Decode {
        /// Notification payloads as hex strings
        #[arg(required = true)]
        notifications: Vec<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Flash {
            release,
            development_debug,
        } => flash::run(release, development_debug),
        Commands::Emulate => test::emulate(),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Decode { notifications } => decode::run(&notifications),
    }
}
