use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use contextmemo_config::Config;
use contextmemo_engine::anchoring::{AnchorOptions, ResolveOptions};
use contextmemo_engine::{JsonNoteStore, NoteFilter, NoteStore};
use std::path::PathBuf;
use uuid::Uuid;

mod commands;

#[derive(Parser, Debug)]
#[command(name = "contextmemo")]
#[command(about = "Attach notes to text on saved web pages and put them back", long_about = None)]
struct Cli {
    /// Config file (defaults to ~/.config/contextmemo/config.toml)
    #[arg(short = 'c', long = "config")]
    config_path: Option<PathBuf>,

    /// Notes file, overriding the config
    #[arg(short = 'n', long = "notes")]
    notes_path: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Save a note on some text of a page
    Annotate {
        #[arg(long)]
        page: PathBuf,
        #[arg(long)]
        url: String,
        /// Text to anchor the note to
        #[arg(long)]
        text: String,
        /// Which match of the text to use, counting from 0
        #[arg(long, default_value_t = 0)]
        occurrence: usize,
        #[arg(long)]
        note: String,
    },
    /// Highlight the saved notes for a URL on a page
    Restore {
        #[arg(long)]
        page: PathBuf,
        #[arg(long)]
        url: String,
        /// Write the highlighted page here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// List saved notes
    List {
        #[arg(long)]
        url: Option<String>,
        /// Case-insensitive search of note and selected text
        #[arg(long, conflicts_with = "url")]
        search: Option<String>,
    },
    /// Replace a note's text
    Edit { id: Uuid, content: String },
    /// Delete a note
    Delete { id: Uuid },
    /// Print the text nodes a page flattens to
    Flatten {
        #[arg(long)]
        page: PathBuf,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = Cli::parse();

    let config_path = cli.config_path.unwrap_or_else(Config::config_path);
    log::debug!("Config path: {}", config_path.display());
    let config = Config::load_or_default(&config_path)?;

    let notes_path = cli.notes_path.unwrap_or(config.notes_path);
    log::debug!("Notes file: {}", notes_path.display());
    let mut store = JsonNoteStore::new(notes_path);

    let anchor_options = AnchorOptions {
        max_chars: config.anchoring.context_chars,
    };
    let resolve_options = ResolveOptions {
        max_window_units: config.anchoring.max_window_units,
    };

    match cli.command {
        Command::Annotate {
            page,
            url,
            text,
            occurrence,
            note,
        } => {
            let page = commands::read_page(&page)?;
            let note = commands::annotate_page(
                &mut store,
                &page,
                &url,
                &text,
                occurrence,
                &note,
                &anchor_options,
            )?;
            println!("{}", note.id);
        }
        Command::Restore { page, url, output } => {
            let page = commands::read_page(&page)?;
            let (html, report) = commands::restore_page(&store, &page, &url, &resolve_options)?;
            for (id, strategy) in &report.applied {
                log::info!("{id}: {strategy}");
            }
            for id in &report.unresolved {
                log::warn!("{id}: could not be placed");
            }
            match output {
                Some(path) => std::fs::write(&path, html)
                    .with_context(|| format!("Failed to write {}", path.display()))?,
                None => println!("{html}"),
            }
        }
        Command::List { url, search } => {
            let filter = match (url, search) {
                (Some(url), _) => NoteFilter::Url(url),
                (None, Some(query)) => NoteFilter::Search(query),
                (None, None) => NoteFilter::All,
            };
            for note in store.list(&filter)? {
                println!("{}", commands::format_note(&note));
            }
        }
        Command::Edit { id, content } => commands::edit_note(&mut store, id, &content)?,
        Command::Delete { id } => commands::delete_note(&mut store, id)?,
        Command::Flatten { page } => {
            let page = commands::read_page(&page)?;
            for line in commands::flatten_page(&page) {
                println!("{line}");
            }
        }
    }

    Ok(())
}
