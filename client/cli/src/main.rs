use clap::{Parser, Subcommand};
use indicatif::ProgressBar;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod browser;
mod config;
mod error;
mod preview;
mod tui;

use api::RestTransport;
use browser::{DeleteOutcome, FileBrowser, PendingUpload};
use config::Config;
use preview::PreviewResolver;

#[derive(Parser)]
#[command(name = "filedock")]
#[command(about = "Browse, preview and manage files on a remote file server", long_about = None)]
struct Cli {
    /// File server base url
    #[arg(long, global = true, env = "FILEDOCK_SERVER")]
    server: Option<String>,

    /// External document viewer endpoint
    #[arg(long, global = true, env = "FILEDOCK_VIEWER")]
    viewer: Option<String>,

    /// Files per page
    #[arg(long, global = true)]
    page_size: Option<usize>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive file browser
    Browse,
    /// List remote files
    Ls {
        /// Only show files whose name contains this text
        #[arg(short, long)]
        search: Option<String>,
        /// Page to show
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Upload a local file
    Upload {
        /// Local file path
        path: PathBuf,
    },
    /// Delete a remote file
    Rm {
        /// File id
        id: String,
        /// Skip the confirmation prompt
        #[arg(short, long)]
        yes: bool,
    },
    /// Show how a file would be previewed
    Preview {
        /// File id
        id: String,
    },
    /// Download a remote file
    Download {
        /// File id
        id: String,
        /// Destination path (defaults to the file's name)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = Config::load()?;
    if let Some(server) = cli.server {
        config.server_url = server;
    }
    if let Some(viewer) = cli.viewer {
        config.viewer_url = viewer;
    }
    if let Some(page_size) = cli.page_size {
        config.page_size = page_size;
    }
    config.validate()?;

    let mut browser = build_browser(&config)?;
    let command = cli.command.unwrap_or(Commands::Browse);

    // The TUI owns the terminal, so it runs without a log subscriber
    if !matches!(command, Commands::Browse) {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "filedock=info".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    match command {
        Commands::Browse => {
            tui::run_browser(browser, &config.server_url).await?;
        }
        Commands::Ls { search, page } => {
            list(&mut browser, search.as_deref(), page).await?;
        }
        Commands::Upload { path } => {
            upload(&mut browser, &path).await?;
        }
        Commands::Rm { id, yes } => {
            remove(&mut browser, &id, yes).await?;
        }
        Commands::Preview { id } => {
            preview(&mut browser, &id).await?;
        }
        Commands::Download { id, output } => {
            download(&mut browser, &id, output).await?;
        }
    }

    Ok(())
}

fn build_browser(config: &Config) -> anyhow::Result<FileBrowser<RestTransport>> {
    let transport = RestTransport::new(&config.server_url, config.timeout())?;
    let resolver = PreviewResolver::new(&config.viewer_url)?;
    Ok(FileBrowser::new(transport, resolver, config.page_size()?))
}

async fn list(
    browser: &mut FileBrowser<RestTransport>,
    search: Option<&str>,
    page: usize,
) -> anyhow::Result<()> {
    browser.refresh().await?;
    if let Some(text) = search {
        browser.search(text);
    }
    if !browser.paginate(page) {
        anyhow::bail!("page {} out of range (1-{})", page, browser.total_pages());
    }

    let entries = browser.page_entries();
    if entries.is_empty() {
        println!("no files");
        return Ok(());
    }

    for file in &entries {
        let size = format_size(file.size_bytes);
        println!("{:>10}  {:<26}  {}  [{}]", size, file.id, file.display_name, file.mime_type);
    }
    println!(
        "page {}/{} ({} of {} files)",
        browser.current_page(),
        browser.total_pages(),
        browser.filtered().len(),
        browser.entries().len()
    );

    Ok(())
}

async fn upload(browser: &mut FileBrowser<RestTransport>, path: &Path) -> anyhow::Result<()> {
    let pending = PendingUpload::from_path(path)?;
    let name = pending.file_name.clone();
    browser.select_file(pending);

    let spinner = ProgressBar::new_spinner();
    spinner.set_message(format!("uploading {}", name));
    spinner.enable_steady_tick(Duration::from_millis(100));
    let result = browser.upload().await;
    spinner.finish_and_clear();

    match result? {
        Some(file) => println!(
            "uploaded {} ({}, {})",
            file.display_name,
            file.id,
            format_size(file.size_bytes)
        ),
        None => println!("uploaded {}", name),
    }
    Ok(())
}

async fn remove(browser: &mut FileBrowser<RestTransport>, id: &str, yes: bool) -> anyhow::Result<()> {
    // Only needed for the prompt label
    if let Err(e) = browser.refresh().await {
        tracing::warn!(error = %e, "Could not load listing");
    }

    let mut prompt_error = None;
    let outcome = browser
        .delete_entry(id, |name| {
            if yes {
                return true;
            }
            let stdin = io::stdin();
            match confirm(&mut stdin.lock(), &mut io::stdout(), name) {
                Ok(answer) => answer,
                Err(e) => {
                    prompt_error = Some(e);
                    false
                }
            }
        })
        .await?;
    if let Some(e) = prompt_error {
        return Err(e.into());
    }

    match outcome {
        DeleteOutcome::Deleted => println!("deleted {}", id),
        DeleteOutcome::AlreadyGone => println!("{} was already gone", id),
        DeleteOutcome::Cancelled => println!("cancelled"),
    }
    Ok(())
}

fn confirm<R: BufRead, W: Write>(input: &mut R, output: &mut W, name: &str) -> io::Result<bool> {
    write!(output, "delete {}? [y/N] ", name)?;
    output.flush()?;

    let mut answer = String::new();
    input.read_line(&mut answer)?;
    Ok(matches!(answer.trim().to_lowercase().as_str(), "y" | "yes"))
}

async fn preview(browser: &mut FileBrowser<RestTransport>, id: &str) -> anyhow::Result<()> {
    browser.refresh().await?;
    let reference = browser.open_preview(id)?.clone();
    if let Some(file) = browser.previewing() {
        println!("{}: {}", file.display_name, reference.strategy);
    }
    println!("{}", reference.url);
    browser.close_preview();
    Ok(())
}

async fn download(
    browser: &mut FileBrowser<RestTransport>,
    id: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<()> {
    browser.refresh().await?;
    let file = browser
        .entry(id)
        .ok_or_else(|| anyhow::anyhow!("no file with id {}", id))?;

    let target = match output {
        Some(path) => path,
        None => Path::new(&file.display_name)
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(id)),
    };

    let bytes = browser.transport().download(id).await?;
    fs::write(&target, &bytes)?;
    println!("saved {} ({})", target.display(), format_size(bytes.len() as u64));
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "0 B");
        assert_eq!(format_size(1023), "1023 B");
        assert_eq!(format_size(1536), "1.5 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.0 MB");
        assert_eq!(format_size(3 * 1024 * 1024 * 1024), "3.0 GB");
    }

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["filedock", "--page-size", "5", "ls", "-s", "report", "-p", "2"]).unwrap();
        assert_eq!(cli.page_size, Some(5));
        match cli.command {
            Some(Commands::Ls { search, page }) => {
                assert_eq!(search.as_deref(), Some("report"));
                assert_eq!(page, 2);
            }
            _ => panic!("expected ls"),
        }

        let cli = Cli::try_parse_from(["filedock", "rm", "abc", "--yes"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Rm { yes: true, .. })));

        let cli = Cli::try_parse_from(["filedock"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_confirm_reads_answer() {
        let mut output = Vec::new();
        let confirmed = confirm(&mut io::Cursor::new("Yes\n"), &mut output, "a.txt").unwrap();
        assert!(confirmed);
        assert_eq!(String::from_utf8(output).unwrap(), "delete a.txt? [y/N] ");

        let mut output = Vec::new();
        assert!(!confirm(&mut io::Cursor::new("\n"), &mut output, "a.txt").unwrap());
        assert!(!confirm(&mut io::Cursor::new(""), &mut output, "a.txt").unwrap());
    }

    struct BrokenPipe;

    impl Write for BrokenPipe {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }
    }

    #[test]
    fn test_confirm_propagates_write_errors() {
        let err = confirm(&mut io::Cursor::new("y\n"), &mut BrokenPipe, "a.txt").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
    }
}
