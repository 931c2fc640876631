use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the backend service.
    Daemon {},

    /// Serve the tool interface on stdio.
    Mcp {},

    /// Save an item into the local store.
    Add {
        /// A url to save
        #[clap(allow_hyphen_values = true, hide = true)]
        url: Option<String>,

        /// Item title
        #[clap(short, long)]
        title: Option<String>,

        /// Item content
        #[clap(short, long)]
        content: Option<String>,

        /// Comma separated tags
        #[clap(short = 'g', long)]
        tags: Option<String>,

        /// Explicit type (skips metadata extraction)
        #[clap(long = "type")]
        item_type: Option<String>,
    },

    /// Search items with a natural-language query.
    Search {
        /// The query text
        query: Vec<String>,

        /// Rank by embedding similarity instead of parsed filters
        #[clap(short, long, default_value = "false")]
        semantic: bool,

        /// Maximum number of results
        #[clap(short, long)]
        limit: Option<usize>,
    },

    /// List recently saved items.
    Recent {
        #[clap(short, long, default_value = "10")]
        limit: usize,

        /// Filter by content type
        #[clap(long = "type")]
        item_type: Option<String>,
    },

    /// Update an item in place.
    Update {
        id: String,

        #[clap(short, long)]
        title: Option<String>,

        #[clap(short, long)]
        content: Option<String>,

        #[clap(short, long)]
        url: Option<String>,

        /// Replace tags
        #[clap(short = 'g', long)]
        tags: Option<String>,

        #[clap(long = "type")]
        item_type: Option<String>,
    },

    /// Delete an item.
    Delete {
        id: String,

        /// Auto confirm
        #[clap(short, long, default_value = "false")]
        yes: bool,
    },

    /// Capture content and submit it, queueing while offline.
    Capture {
        #[clap(subcommand)]
        source: CaptureSource,
    },

    /// Replay the offline queue.
    Sync {
        /// Keep watching connectivity and sync after each reconnect
        #[clap(short, long, default_value = "false")]
        watch: bool,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CaptureSource {
    /// Save a page by title and url
    Page { title: String, url: String },

    /// Save selected text from a page
    Selection {
        #[clap(short, long)]
        title: String,

        #[clap(short, long)]
        url: String,

        text: String,
    },

    /// Save a quick note (reads stdin when no text is given)
    Note {
        text: Option<String>,

        /// Comma separated tags
        #[clap(short = 'g', long)]
        tags: Option<String>,
    },

    /// Save clipboard text as a note
    Clipboard {
        text: Option<String>,

        #[clap(short, long)]
        url: Option<String>,
    },

    /// Upload a screenshot file and save it as an item
    Screenshot {
        file: PathBuf,

        #[clap(short, long)]
        title: String,

        #[clap(short, long)]
        url: String,
    },

    /// Save a link found on a page
    Link {
        link_url: String,

        /// The link's anchor text
        #[clap(long)]
        text: Option<String>,

        #[clap(long, default_value = "")]
        page_title: String,
    },

    /// Save an image found on a page
    Image {
        src_url: String,

        /// The page the image was found on
        #[clap(short, long)]
        url: String,

        #[clap(short, long, default_value = "")]
        title: String,
    },

    /// Save a full AI-chat conversation (reads stdin when no file is given)
    Conversation {
        /// Chat site name, e.g. ChatGPT or Claude
        #[clap(long)]
        site: String,

        #[clap(short, long)]
        title: String,

        #[clap(short, long)]
        url: String,

        file: Option<PathBuf>,
    },

    /// Save a reading-mode extraction (reads stdin when no file is given)
    Reading {
        #[clap(short, long)]
        title: String,

        #[clap(short, long)]
        url: String,

        file: Option<PathBuf>,
    },
}
