use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod attend;
mod config;
mod dataset;
mod enroll;
mod pipeline;
mod records;

use config::Config;
use enroll::Enrollee;
use records::Roster;

#[derive(Parser)]
#[command(name = "rollcall", about = "Face-recognition attendance tool", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Capture face samples for a new student and add them to the roster
    Enroll,
    /// Run live recognition and mark attendance
    Attend,
    /// List enrolled students
    List,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    let cfg = Config::from_env();

    match cli.command {
        Command::Enroll => {
            let enrollee = Enrollee {
                name: prompt("Enter student name: ")?,
                course: prompt("Enter course: ")?,
                batch: prompt("Enter batch: ")?,
            };
            println!("Follow the on-screen instructions. Press Q or Esc to stop early.");
            enroll::run(&cfg, &enrollee)?;
            println!("Enrollment complete for {}.", enrollee.name);
        }
        Command::Attend => {
            attend::run(&cfg)?;
        }
        Command::List => {
            let entries = Roster::new(&cfg.roster_path).entries()?;
            if entries.is_empty() {
                println!("No students enrolled.");
            } else {
                for e in entries {
                    println!("{}\t{}\t{}\t{}", e.name, e.course, e.batch, e.data_path);
                }
            }
        }
    }

    Ok(())
}

fn prompt(label: &str) -> anyhow::Result<String> {
    use std::io::Write;

    print!("{label}");
    std::io::stdout().flush()?;
    let mut line = String::new();
    std::io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
