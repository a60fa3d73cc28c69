//! folio-chat – talk to the portfolio assistant from a terminal.
//!
//! Each stdin line is one submission. By default turns go through a running
//! folio-server; `--direct` composes the prompt and calls the completion
//! endpoint in-process instead.

mod live;

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use folio_core::completion::{CompletionConfig, DEFAULT_BASE_URL, DEFAULT_MODEL};
use folio_core::render::display_label;
use folio_core::{
    AssistantApi, ChatSession, CompletionClient, Conversation, DirectAssistant, FsContent, LinkLabels,
    PromptComposer, ReplySource, TurnOutcome, render_reply,
};
use folio_types::{ChatMessage, Language, Persona};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use crate::live::LiveReply;

#[derive(Debug, Parser)]
#[command(name = "folio-chat", version, about = "Terminal client for the portfolio assistant")]
struct Args {
    /// Assistant endpoint of a running folio-server.
    #[arg(long, default_value = "http://127.0.0.1:3000/api/assistant")]
    endpoint: String,

    /// Reply language (`en` or `de`).
    #[arg(long, default_value = "en")]
    language: String,

    /// Print the reply while it streams in.
    #[arg(long)]
    stream: bool,

    /// Call the completion endpoint directly using OPENAI_API_KEY.
    #[arg(long)]
    direct: bool,

    /// Content directory; used for link labels, and for the prompt with `--direct`.
    #[arg(long)]
    content_dir: Option<PathBuf>,

    /// Print replies as HTML instead of plain text.
    #[arg(long)]
    html: bool,

    /// Persona name for the intro greeting.
    #[arg(long, requires = "title")]
    name: Option<String>,

    /// Persona title for the intro greeting.
    #[arg(long, requires = "name")]
    title: Option<String>,

    /// Optional persona subtitle.
    #[arg(long)]
    subtitle: Option<String>,
}

impl Args {
    fn persona(&self) -> Option<Persona> {
        Some(Persona {
            name: self.name.clone()?,
            title: self.title.clone()?,
            subtitle: self.subtitle.clone(),
        })
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::dotenv();
    let args = Args::parse();

    // Quieter than the server: the terminal is the conversation.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .ok()
        .or_else(|| std::env::var("FOLIO_LOG").ok().and_then(|v| v.parse().ok()))
        .unwrap_or_else(|| tracing_subscriber::EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    let language = Language::resolve(Some(args.language.as_str()));
    let content_dir = args
        .content_dir
        .clone()
        .or_else(|| args.direct.then(|| PathBuf::from("content")));
    let composer = content_dir.map(|dir| PromptComposer::new(Arc::new(FsContent::new(dir))));

    let labels = match &composer {
        Some(composer) => LinkLabels::from_projects(&composer.load_projects(language).await),
        None => LinkLabels::default(),
    };
    debug!(labels = labels.len(), "link labels loaded");

    let conversation = match args.persona() {
        Some(persona) => Conversation::with_persona(language, &persona),
        None => Conversation::new(language),
    };

    if args.direct {
        let composer = composer.context("--direct needs a content directory")?;
        let client = CompletionClient::new(CompletionConfig {
            base_url: env_or("OPENAI_BASE_URL", DEFAULT_BASE_URL),
            model: env_or("OPENAI_MODEL", DEFAULT_MODEL),
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            ..CompletionConfig::default()
        })
        .context("OPENAI_API_KEY is required with --direct")?;
        let session = ChatSession::new(conversation, DirectAssistant::new(composer, client)).with_labels(labels);
        run(session, args.html, false).await
    } else if args.stream {
        let source = LiveReply::new(AssistantApi::new(&args.endpoint), std::io::stdout());
        let session = ChatSession::new(conversation, source).with_labels(labels);
        run(session, args.html, true).await
    } else {
        let session = ChatSession::new(conversation, AssistantApi::new(&args.endpoint)).with_labels(labels);
        run(session, args.html, false).await
    }
}

async fn run<R: ReplySource>(mut session: ChatSession<R>, html: bool, streamed: bool) -> anyhow::Result<()> {
    for message in session.conversation().messages() {
        print_message(message, session.labels(), html, false);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        prompt()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match session.send(&line).await {
            Ok(TurnOutcome::Ignored) => {}
            Ok(TurnOutcome::Listening) => println!("(listening...)"),
            Ok(TurnOutcome::SpeechUnavailable(reason)) => println!("({reason})"),
            Ok(TurnOutcome::Replied(message)) => print_message(&message, session.labels(), html, streamed),
            Ok(TurnOutcome::Failed(message)) => print_message(&message, session.labels(), html, false),
            Err(e) => warn!(error = %e, "submission rejected"),
        }
    }

    session.stop_listening();
    Ok(())
}

fn prompt() -> anyhow::Result<()> {
    let mut out = std::io::stdout();
    out.write_all(b"> ")?;
    out.flush()?;
    Ok(())
}

/// Print a reply and its links. `streamed` replies already had their text
/// echoed, so only the links follow.
fn print_message(message: &ChatMessage, labels: &LinkLabels, html: bool, streamed: bool) {
    if html {
        println!("{}", render_reply(&message.content, labels).html());
    } else if !streamed {
        println!("{}", message.content);
    }

    for (i, link) in message.links.iter().flatten().enumerate() {
        println!("  [{}] {} <{}>", i + 1, display_label(link), link.url);
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_owned())
}
