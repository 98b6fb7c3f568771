use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use glean_core::{NewSummary, SummaryMode, SummaryStore};
use glean_local::assistant::Assistant;
use glean_local::gemini::GeminiClient;
use glean_local::library::{FsLibrary, HttpLibrary};
use glean_local::messaging::{handle_request, PageRequest};
use glean_local::stats::StatsFile;
use glean_local::{extract, highlight, Page};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "glean")]
#[command(about = "Summarize, question and highlight web pages; keep a library of summaries", long_about = None)]
struct Cli {
    /// Directory of the local summary library.
    #[arg(long, global = true, env = "GLEAN_LIBRARY_DIR")]
    library_dir: Option<PathBuf>,
    /// Use a remote library service instead of the local directory.
    #[arg(long, global = true, env = "GLEAN_LIBRARY_URL")]
    library_url: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the article text of a page (json).
    Extract(PageArgs),
    /// Mark sentences in a page and write the resulting HTML.
    Highlight(HighlightCmd),
    /// Answer one content-script style request read from stdin or --request (json).
    PageRequest(PageRequestCmd),
    /// Summarize a page with the model (json).
    Summarize(SummarizeCmd),
    /// Ask the model a question about a page (json).
    Ask(AskCmd),
    /// Suggest up to three tags for a page (json).
    Tags(ModelPageArgs),
    /// Let the model pick key sentences and highlight them in the page.
    KeySentences(KeySentencesCmd),
    /// Save a finished summary to the library (json).
    Save(SaveCmd),
    /// Browse the summary library.
    #[command(subcommand)]
    Library(LibraryCmd),
    /// Show the reading-time-saved counter (json).
    Stats,
    /// Serve the library over HTTP.
    Serve(ServeCmd),
    /// List the models visible to the configured Gemini key (json).
    Models,
    /// Print version info.
    Version(VersionCmd),
}

#[derive(clap::Args, Debug)]
struct PageArgs {
    /// HTML file to read (`-` for stdin).
    #[arg(long)]
    html: PathBuf,
}

#[derive(clap::Args, Debug)]
struct ModelPageArgs {
    #[command(flatten)]
    page: PageArgs,
    /// Override the model (default: GLEAN_GEMINI_MODEL or gemini-2.5-flash).
    #[arg(long)]
    model: Option<String>,
}

#[derive(clap::Args, Debug)]
struct HighlightCmd {
    #[command(flatten)]
    page: PageArgs,
    /// Sentence to mark (repeatable, input order is kept).
    #[arg(long = "sentence")]
    sentences: Vec<String>,
    /// Output path for the highlighted HTML (default: stdout).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct PageRequestCmd {
    #[command(flatten)]
    page: PageArgs,
    /// Request JSON, e.g. '{"type":"GET_ARTICLE_TEXT"}' (default: read stdin).
    #[arg(long)]
    request: Option<String>,
    /// Where to write the page after the request (default: not written).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct SummarizeCmd {
    #[command(flatten)]
    page: ModelPageArgs,
    /// Allowed: brief, detailed, bullets, eli5
    #[arg(long, default_value = "brief")]
    mode: String,
    /// Save the summary to the library (generates tags).
    #[arg(long, requires = "url")]
    save: bool,
    /// Source URL recorded with a saved summary.
    #[arg(long)]
    url: Option<String>,
    /// Title recorded with a saved summary (default: the page <title>).
    #[arg(long)]
    title: Option<String>,
}

#[derive(clap::Args, Debug)]
struct AskCmd {
    #[command(flatten)]
    page: ModelPageArgs,
    #[arg(long)]
    question: String,
}

#[derive(clap::Args, Debug)]
struct KeySentencesCmd {
    #[command(flatten)]
    page: ModelPageArgs,
    /// Output path for the highlighted HTML (default: not written).
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(clap::Args, Debug)]
struct SaveCmd {
    #[arg(long)]
    url: String,
    #[arg(long)]
    title: String,
    #[arg(long)]
    summary: String,
    /// Allowed: brief, detailed, bullets, eli5
    #[arg(long = "type", default_value = "brief")]
    mode: String,
    /// Tag (repeatable).
    #[arg(long = "tag")]
    tags: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum LibraryCmd {
    /// List saved summaries, newest first (json).
    List,
    /// Show one saved summary (json).
    Show { id: String },
}

#[derive(clap::Args, Debug)]
struct ServeCmd {
    #[arg(long, env = "GLEAN_BIND", default_value = "127.0.0.1:3000")]
    bind: std::net::SocketAddr,
}

#[derive(clap::Args, Debug)]
struct VersionCmd {
    /// Output format: json|text
    #[arg(long = "output", alias = "format", default_value = "json")]
    output: String,
}

fn load_env_file() {
    // Opt-in only; never overrides the process env and never logs values.
    let Ok(p) = std::env::var("GLEAN_ENV_FILE") else {
        return;
    };
    let p = p.trim();
    if p.is_empty() {
        return;
    }
    let Ok(txt) = std::fs::read_to_string(p) else {
        return;
    };
    for raw in txt.lines() {
        let s = raw.trim();
        if s.is_empty() || s.starts_with('#') {
            continue;
        }
        let Some((k, v)) = s.split_once('=') else {
            continue;
        };
        let k = k.trim();
        if k.is_empty() {
            continue;
        }
        if std::env::var_os(k).is_none() {
            std::env::set_var(k, v.trim());
        }
    }
}

fn init_tracing() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
    // stderr only: stdout carries the json output.
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn read_html(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut s = String::new();
        std::io::stdin()
            .read_to_string(&mut s)
            .context("read html from stdin")?;
        return Ok(s);
    }
    std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))
}

fn load_page(args: &PageArgs) -> Result<Page> {
    Ok(Page::parse(&read_html(&args.html)?))
}

fn write_html(page: &Page, out: Option<&Path>) -> Result<()> {
    match out {
        Some(p) => std::fs::write(p, page.html()).with_context(|| format!("write {}", p.display())),
        None => {
            println!("{}", page.html());
            Ok(())
        }
    }
}

fn assistant(model: Option<String>) -> Result<Assistant<GeminiClient>> {
    let client = glean_local::http_client()?;
    Ok(Assistant::new(GeminiClient::from_env(client, model)?))
}

fn store(cli_dir: Option<PathBuf>, cli_url: Option<String>) -> Result<Arc<dyn SummaryStore>> {
    if let Some(u) = cli_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
        return Ok(Arc::new(HttpLibrary::new(glean_local::http_client()?, u)?));
    }
    Ok(Arc::new(match cli_dir {
        Some(d) => FsLibrary::new(d),
        None => FsLibrary::from_env(),
    }))
}

fn stats_file(cli_dir: Option<&Path>) -> StatsFile {
    match cli_dir {
        Some(d) => StatsFile::in_dir(d),
        None => StatsFile::in_dir(FsLibrary::from_env().root()),
    }
}

/// Article text, or an error when the page has nothing to summarize.
fn article_or_bail(page: &Page) -> Result<String> {
    let text = extract::article_text(page);
    if text.trim().is_empty() {
        anyhow::bail!("no article text found on this page");
    }
    Ok(text)
}

#[tokio::main]
async fn main() -> Result<()> {
    load_env_file();
    init_tracing();

    let cli = Cli::parse();
    let library_dir = cli.library_dir.clone();
    let library_url = cli.library_url.clone();

    match cli.command {
        Commands::Extract(args) => {
            let page = load_page(&args)?;
            let text = extract::article_text(&page);
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "extract",
                "ok": true,
                "title": page.title(),
                "text": text,
                "text_chars": text.chars().count(),
                "reading_minutes": extract::reading_minutes(&text),
            });
            println!("{v}");
        }
        Commands::Highlight(args) => {
            let mut page = load_page(&args.page)?;
            let stats = highlight::apply_highlights(&mut page, &args.sentences);
            tracing::info!(marked = stats.marked, requested = stats.requested, "highlighted");
            write_html(&page, args.out.as_deref())?;
        }
        Commands::PageRequest(args) => {
            let mut page = load_page(&args.page)?;
            let raw = match args.request {
                Some(r) => r,
                None => {
                    let mut s = String::new();
                    std::io::stdin()
                        .read_to_string(&mut s)
                        .context("read request from stdin")?;
                    s
                }
            };
            let req: PageRequest = serde_json::from_str(&raw).context("parse page request")?;
            let resp = handle_request(&mut page, req);
            println!("{}", serde_json::to_string(&resp)?);
            if let Some(out) = args.out.as_deref() {
                write_html(&page, Some(out))?;
            }
        }
        Commands::Summarize(args) => {
            let mode: SummaryMode = args.mode.parse()?;
            let page = load_page(&args.page.page)?;
            let text = article_or_bail(&page)?;
            let a = assistant(args.page.model)?;
            let summary = a.summarize(&text, mode).await?;
            let reading = stats_file(library_dir.as_deref()).record_summary(&text)?;

            let saved = if args.save {
                let tags = a.tags(&text).await;
                let new = NewSummary {
                    url: args.url.unwrap_or_default(),
                    title: args
                        .title
                        .or_else(|| page.title())
                        .unwrap_or_else(|| "Untitled Article".to_string()),
                    summary: summary.clone(),
                    mode,
                    tags,
                };
                Some(store(library_dir, library_url)?.save(new).await?)
            } else {
                None
            };

            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "summarize",
                "ok": true,
                "mode": mode,
                "summary": summary,
                "reading": reading,
                "saved": saved,
            });
            println!("{v}");
        }
        Commands::Ask(args) => {
            let page = load_page(&args.page.page)?;
            let text = article_or_bail(&page)?;
            let answer = assistant(args.page.model)?.ask(&text, &args.question).await?;
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "ask",
                "ok": true,
                "question": args.question,
                "answer": answer,
            });
            println!("{v}");
        }
        Commands::Tags(args) => {
            let page = load_page(&args.page)?;
            let text = article_or_bail(&page)?;
            let tags = assistant(args.model)?.tags(&text).await;
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "tags",
                "ok": true,
                "tags": tags,
            });
            println!("{v}");
        }
        Commands::KeySentences(args) => {
            let mut page = load_page(&args.page.page)?;
            let text = article_or_bail(&page)?;
            let sentences = assistant(args.page.model)?.key_sentences(&text).await;
            let stats = highlight::apply_highlights(&mut page, &sentences);
            if let Some(out) = args.out.as_deref() {
                write_html(&page, Some(out))?;
            }
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "key_sentences",
                "ok": true,
                "sentences": sentences,
                "highlight": stats,
            });
            println!("{v}");
        }
        Commands::Save(args) => {
            let new = NewSummary {
                url: args.url,
                title: args.title,
                summary: args.summary,
                mode: args.mode.parse()?,
                tags: args.tags,
            };
            let record = store(library_dir, library_url)?.save(new).await?;
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "save",
                "ok": true,
                "record": record,
            });
            println!("{v}");
        }
        Commands::Library(cmd) => {
            let store = store(library_dir, library_url)?;
            let v = match cmd {
                LibraryCmd::List => {
                    let records = store.list().await?;
                    serde_json::json!({
                        "schema_version": 1,
                        "kind": "library_list",
                        "ok": true,
                        "count": records.len(),
                        "records": records,
                    })
                }
                LibraryCmd::Show { id } => {
                    let record = store
                        .get(&id)
                        .await?
                        .with_context(|| format!("no summary with id {id}"))?;
                    serde_json::json!({
                        "schema_version": 1,
                        "kind": "library_show",
                        "ok": true,
                        "record": record,
                    })
                }
            };
            println!("{v}");
        }
        Commands::Stats => {
            let stats = stats_file(library_dir.as_deref()).load();
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "stats",
                "ok": true,
                "stats": stats,
            });
            println!("{v}");
        }
        Commands::Serve(args) => {
            let store = store(library_dir, library_url)?;
            glean::server::serve(args.bind, store).await?;
        }
        Commands::Models => {
            let client = GeminiClient::from_env(glean_local::http_client()?, None)?;
            let models = client.list_models().await?;
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "models",
                "ok": true,
                "models": models,
            });
            println!("{v}");
        }
        Commands::Version(args) => {
            let v = serde_json::json!({
                "schema_version": 1,
                "kind": "version",
                "ok": true,
                "name": "glean",
                "version": env!("CARGO_PKG_VERSION"),
            });
            match args.output.to_ascii_lowercase().as_str() {
                "text" => println!("glean {}", env!("CARGO_PKG_VERSION")),
                _ => println!("{v}"),
            }
        }
    }
    Ok(())
}
