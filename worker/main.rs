#![forbid(unsafe_code)]

//! `dyntask-probe` — reference worker built on the `dyntask` client.
//!
//! Reads the handshake, walks every entry (one `next` at a time, or a single
//! `all` with `--bulk`), writes the out-of-date paths to
//! `<output dir>/manifest.txt` (added first, then modified) and reports a
//! summary through the log channel.

use std::fs;
use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::OnceLock;

use clap::Parser;

use dyntask::client::{run_task, WorkerClient, WorkerTask};
use dyntask::models::{ChangeCategory, ChangeEntry};
use dyntask::protocol::{Request, Scope};
use dyntask::{AppError, Result};

/// Name of the file written into the output directory.
const MANIFEST: &str = "manifest.txt";

#[derive(Debug, Clone, Parser)]
#[command(name = "dyntask-probe", about = "Reference worker for dyntask", version, long_about = None)]
struct Cli {
    /// Fetch all entries with one `all` request instead of repeated `next`.
    #[arg(long)]
    bulk: bool,

    /// Send this request line, then exit without reading the reply.
    #[arg(long, value_name = "REQUEST")]
    abandon: Option<String>,

    /// Exit code to return after a successful run.
    #[arg(long, default_value_t = 0)]
    exit_code: u8,

    /// Line to write to stderr before exiting.
    #[arg(long)]
    stderr: Option<String>,
}

fn cli() -> &'static Cli {
    static CLI: OnceLock<Cli> = OnceLock::new();
    CLI.get_or_init(Cli::parse)
}

struct Probe {
    output_dir: PathBuf,
}

impl WorkerTask for Probe {
    fn create(_input_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn execute<R: BufRead, W: Write>(&mut self, client: &mut WorkerClient<R, W>) -> Result<()> {
        let handshake = client.handshake().clone();
        client.trace(&format!(
            "probe started: incremental={} total={}",
            handshake.incremental, handshake.total
        ))?;

        if let Some(line) = &cli().abandon {
            return client.submit(Request::parse(line)?);
        }

        let entries = if cli().bulk {
            client.all(Scope::Combined)?
        } else {
            let mut entries = Vec::new();
            while let Some(entry) = client.next(Scope::Combined)? {
                entries.push(entry);
            }
            entries
        };

        let out_of_date: Vec<&ChangeEntry> = of(&entries, ChangeCategory::Added)
            .chain(of(&entries, ChangeCategory::Modified))
            .collect();
        let manifest: String = out_of_date
            .iter()
            .map(|entry| format!("{}\n", entry.path().display()))
            .collect();
        fs::write(self.output_dir.join(MANIFEST), manifest)
            .map_err(|err| AppError::Io(format!("cannot write manifest: {err}")))?;

        client.info(&format!(
            "processed {} entries\nout of date: {}",
            entries.len(),
            out_of_date.len()
        ))
    }
}

fn of(entries: &[ChangeEntry], category: ChangeCategory) -> impl Iterator<Item = &ChangeEntry> {
    entries.iter().filter(move |e| e.category() == category)
}

fn main() -> ExitCode {
    let cli = cli();
    let status = run_task::<Probe>();
    if let Some(line) = &cli.stderr {
        eprintln!("{line}");
    }
    if status == ExitCode::SUCCESS {
        ExitCode::from(cli.exit_code)
    } else {
        status
    }
}
