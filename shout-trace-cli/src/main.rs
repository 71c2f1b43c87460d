use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use shout_trace_core::{
    path_codec, AnnotateOptions, Config, Page, PagingRequest, TraceReference, CONFIG_FILE_NAME,
    LINK_PREFIX,
};
use shout_trace_html::FragmentRenderer;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, prelude::*, EnvFilter};

#[derive(Debug, Parser)]
#[command(
    name = "shout-trace",
    version,
    about = "Turn path:line references into editor links and page through the files they name"
)]
struct Args {
    /// Config file to read instead of the platform default
    #[arg(long)]
    config: Option<PathBuf>,

    /// Host of the editor service links point at
    #[arg(long)]
    host: Option<String>,

    /// Port of the editor service links point at
    #[arg(long)]
    port: Option<u16>,

    /// Query string appended to every generated link
    #[arg(long)]
    query: Option<String>,

    /// Open links in the current browser window
    #[arg(long)]
    same_target: bool,

    #[command(subcommand)]
    command: CliCommand,
}

#[derive(Debug, Subcommand)]
enum CliCommand {
    /// Link every path:line reference in FILE (or stdin)
    Annotate {
        file: Option<PathBuf>,
        /// Escape surrounding text for embedding in HTML
        #[arg(long)]
        html: bool,
        /// Link absolute paths
        #[arg(long)]
        abspath: bool,
        /// Title for every generated link
        #[arg(long)]
        title: Option<String>,
    },
    /// Print the link for a single reference
    Link {
        path: String,
        line: u64,
        /// Print only the URL
        #[arg(long)]
        url: bool,
        #[arg(long)]
        abspath: bool,
        #[arg(long)]
        title: Option<String>,
    },
    /// Decode a link back into path:line
    Resolve { link: String },
    /// Print a window of FILE's lines with their byte offsets
    Page {
        file: PathBuf,
        /// Byte offset; negative counts from the end of the file
        #[arg(long, allow_negative_numbers = true)]
        pos: Option<i64>,
        /// Lines per page
        #[arg(short = 'n', long = "lines")]
        lines: Option<usize>,
        /// Read the page that ends at --pos
        #[arg(long)]
        prev: bool,
        /// Highlight this line of the window (1-based)
        #[arg(long)]
        line: Option<usize>,
        /// Link trace references inside the displayed lines (with --html)
        #[arg(long)]
        annotate: bool,
        #[arg(long)]
        play: bool,
        /// Paging parameters in query form, e.g. "pos=-1;n=40;prev=1"
        #[arg(long)]
        params: Option<String>,
        /// Print HTML fragments instead of plain text
        #[arg(long)]
        html: bool,
        /// Print the page as JSON
        #[arg(long, conflicts_with = "html")]
        json: bool,
    },
}

fn main() -> Result<()> {
    let args = Args::parse();

    let project_dirs = ProjectDirs::from("net", "shout-trace", "shout-trace")
        .ok_or_else(|| anyhow!("unable to resolve platform data directories"))?;
    let _log_guard = init_logging(&project_dirs)?;

    let config = load_config(&args, &project_dirs)?;
    debug!(?config, "loaded configuration");
    let annotator = config.annotator();

    let mut stdout = io::stdout().lock();
    match args.command {
        CliCommand::Annotate {
            file,
            html,
            abspath,
            title,
        } => {
            let text = read_input(file.as_deref())?;
            let options = AnnotateOptions {
                html,
                absolute_path: abspath,
                title,
            };
            stdout.write_all(annotator.annotate(&text, &options).as_bytes())?;
        }
        CliCommand::Link {
            path,
            line,
            url,
            abspath,
            title,
        } => {
            if line == 0 {
                bail!("line numbers start at 1");
            }
            let reference = TraceReference::new(path, line);
            let options = AnnotateOptions {
                html: false,
                absolute_path: abspath,
                title,
            };
            let output = if url {
                annotator.link_url(&reference, &options)
            } else {
                annotator.make_link(&reference, &reference.to_string(), &options)
            };
            writeln!(stdout, "{}", output)?;
        }
        CliCommand::Resolve { link } => {
            let reference = TraceReference::from_url(&link)
                .ok_or_else(|| anyhow!("no trace reference in {:?}", link))?;
            writeln!(stdout, "{}", reference)?;
        }
        CliCommand::Page {
            file,
            pos,
            lines,
            prev,
            line,
            annotate,
            play,
            params,
            html,
            json,
        } => {
            let mut request = PagingRequest::from_query(params.as_deref().unwrap_or_default());
            if let Some(pos) = pos {
                request.offset = pos;
            }
            if lines.is_some() {
                request.max_lines = lines;
            }
            if line.is_some() {
                request.highlight_line = line;
            }
            request.backward |= prev;
            request.annotate |= annotate;
            request.play |= play;

            let page = config
                .pager()
                .page(&file, &request)
                .with_context(|| format!("failed to page through {:?}", file))?;
            info!(
                file = %file.display(),
                lines = page.window.len(),
                start = page.window.start_offset,
                "paged file"
            );

            if json {
                serde_json::to_writer_pretty(&mut stdout, &page)?;
                writeln!(stdout)?;
            } else if html {
                let mut renderer =
                    FragmentRenderer::new(&mut stdout, annotator, view_path(&file));
                renderer.draw_page(&page, &request)?;
            } else {
                write_plain_page(&mut stdout, &page, &request)?;
            }
        }
    }
    stdout.flush()?;
    Ok(())
}

fn load_config(args: &Args, project_dirs: &ProjectDirs) -> Result<Config> {
    let mut config = match &args.config {
        Some(path) => Config::load(path)?,
        None => Config::load_or_default(&project_dirs.config_dir().join(CONFIG_FILE_NAME))?,
    };
    if let Some(host) = &args.host {
        config.link.host = host.clone();
    }
    if let Some(port) = args.port {
        config.link.port = port;
    }
    if let Some(query) = &args.query {
        config.link.query = Some(query.clone());
    }
    if args.same_target {
        config.link.open_in_new_target = false;
    }
    Ok(config)
}

fn read_input(file: Option<&Path>) -> Result<String> {
    let bytes = match file {
        Some(path) => fs::read(path).with_context(|| format!("failed to read {:?}", path))?,
        None => {
            let mut buf = Vec::new();
            io::stdin()
                .read_to_end(&mut buf)
                .context("failed to read stdin")?;
            buf
        }
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Route the editor service serves `file` under; navigation links point here.
fn view_path(file: &Path) -> String {
    format!("{}{}/1", LINK_PREFIX, path_codec::encode(&file.to_string_lossy()))
}

fn write_plain_page(out: &mut impl Write, page: &Page, request: &PagingRequest) -> Result<()> {
    for line in page.window.iter() {
        write!(out, "{}\t{}", line.offset, line.text)?;
        if !line.text.ends_with('\n') {
            writeln!(out)?;
        }
    }
    if let Some(nav) = &page.navigation {
        for target in nav.targets() {
            writeln!(
                out,
                "# {}\t{}",
                target.action.title(),
                request.navigate(&target).to_query()
            )?;
        }
    }
    Ok(())
}

fn init_logging(project_dirs: &ProjectDirs) -> Result<WorkerGuard> {
    let log_dir = project_dirs.data_local_dir().join("logs");
    fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(log_dir, "shout-trace.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(file_writer);
    // stdout carries command output.
    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stderr)
        .with_filter(LevelFilter::WARN);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .map_err(|err| anyhow!(err))?;

    Ok(guard)
}
