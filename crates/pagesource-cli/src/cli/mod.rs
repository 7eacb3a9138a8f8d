//! CLI for the pagesource capture tool.

use anyhow::{bail, Context, Result};
use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::Shell;
use std::path::{Path, PathBuf};

use pagesource_core::capture::{self, CaptureEvent};
use pagesource_core::config;
use pagesource_core::saver;
use pagesource_core::url_model;

/// Capture every resource a webpage loads and save it locally.
#[derive(Debug, Parser)]
#[command(name = "pagesource")]
#[command(about = "Capture all resources from a webpage like browser DevTools Sources tab", long_about = None)]
#[command(version, disable_version_flag = true)]
pub struct Cli {
    /// URL of the webpage to capture resources from.
    #[arg(required_unless_present = "completions")]
    pub url: Option<String>,

    /// Output directory for saved resources.
    #[arg(short, long, value_name = "DIR", default_value = "./pagesource_output")]
    pub output: PathBuf,

    /// Additional seconds to wait after page load for JS content.
    #[arg(short, long, value_name = "SECONDS", default_value_t = 0)]
    pub wait: u64,

    /// Include external resources (CDN assets, third-party scripts).
    #[arg(short = 'e', long)]
    pub include_external: bool,

    /// Show version and exit.
    #[arg(short = 'v', long = "version", action = ArgAction::Version)]
    version: Option<bool>,

    /// Print shell completions for the given shell and exit.
    #[arg(long, value_name = "SHELL", value_enum)]
    pub completions: Option<Shell>,
}

impl Cli {
    /// Parse arguments and run the capture. Returns the process exit code:
    /// 0 on success, 130 on user interrupt (validation and load failures
    /// surface as errors and exit 1 in main).
    pub async fn run_from_args() -> Result<i32> {
        let cli = Cli::parse();

        if let Some(shell) = cli.completions {
            clap_complete::generate(shell, &mut Cli::command(), "pagesource", &mut std::io::stdout());
            return Ok(0);
        }
        let Some(url) = cli.url else {
            bail!("a URL is required");
        };

        let cfg = config::load_or_init().context("could not load configuration")?;
        tracing::debug!("loaded config: {:?}", cfg);

        let page_url = url_model::parse_page_url(&url)?;
        let full_url = page_url.to_string();

        std::fs::create_dir_all(&cli.output).with_context(|| {
            format!("could not create output directory {}", cli.output.display())
        })?;

        println!("Capturing resources from: {full_url}");
        println!("Output directory: {}", display_absolute(&cli.output));
        if cli.include_external {
            println!("Including external resources");
        }

        let (status_tx, mut status_rx) = tokio::sync::mpsc::channel::<CaptureEvent>(16);
        let printer = tokio::spawn(async move {
            while let Some(event) = status_rx.recv().await {
                println!("  {event}");
            }
        });

        // Racing the capture against Ctrl-C: dropping the capture future
        // drops the browser session, whose guards kill the child process
        // and remove the temp profile before we exit 130.
        let resources = tokio::select! {
            result = capture::capture_page_resources(&full_url, cli.wait, &cfg, &status_tx) => {
                result.context("failed to load page")?
            }
            _ = tokio::signal::ctrl_c() => {
                println!();
                println!("Cancelled by user");
                return Ok(130);
            }
        };
        drop(status_tx);
        let _ = printer.await;

        println!("Captured {} resources", resources.len());

        if resources.is_empty() {
            println!("No resources captured");
        } else {
            let (saved, skipped) =
                saver::save_resources(&resources, &cli.output, &full_url, cli.include_external);
            println!("Saved {saved} resources");
            if skipped > 0 {
                println!("Skipped {skipped} external resources (use --include-external to include)");
            }
        }

        println!();
        println!("Done! Resources saved to: {}", display_absolute(&cli.output));
        Ok(0)
    }
}

fn display_absolute(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
