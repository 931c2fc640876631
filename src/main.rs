use std::io::Read;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::bail;
use clap::Parser;
use inquire::error::InquireResult;

mod agent;
mod app;
mod cli;
mod config;
mod detect;
mod eid;
mod items;
mod llm;
mod mcp;
mod metadata;
mod ocr;
mod query;
mod scrape;
mod semantic;
mod storage;
#[cfg(test)]
mod tests;
mod web;

use agent::{capture, ApiClient, OfflineQueue, Submission, SyncAgent, SyncResult};
use app::ItemService;
use cli::{CaptureSource, Command};
use config::Config;
use eid::Eid;
use items::{ItemDraft, ItemPatch, ItemType};

pub fn parse_tags(tags: String) -> Vec<String> {
    tags.split(',')
        .flat_map(|value| {
            value
                .split([' ', '\u{a0}'])
                .filter(|value| !value.is_empty())
        })
        .map(|s| s.to_lowercase().to_string())
        .collect::<Vec<_>>()
}

fn parse_item_type(value: Option<String>) -> anyhow::Result<Option<ItemType>> {
    match value {
        None => Ok(None),
        Some(value) => match ItemType::parse(&value) {
            Some(item_type) => Ok(Some(item_type)),
            None => bail!(
                "unknown type {value:?} (expected note, article, product, todo, video, image or other)"
            ),
        },
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = cli::Args::parse();

    let base_path = config::base_path();
    let config = Arc::new(RwLock::new(Config::load_with(&base_path)?));

    match args.command {
        Command::Daemon {} => {
            let mut service = ItemService::new(config.clone(), &base_path)?;
            service.run_queue();

            let listen_addr = config.read().unwrap().listen_addr.clone();
            web::start_daemon(service, listen_addr);
            Ok(())
        }

        Command::Mcp {} => {
            let service = ItemService::new(config.clone(), &base_path)?;
            mcp::run(&service)
        }

        Command::Add {
            url,
            title,
            content,
            tags,
            item_type,
        } => {
            let service = ItemService::new(config.clone(), &base_path)?;

            let draft = ItemDraft {
                url,
                title,
                content,
                tags: tags.map(parse_tags).unwrap_or_default(),
                item_type: parse_item_type(item_type)?,
                ..Default::default()
            };

            let item = service.create(draft)?;
            println!("{}", serde_json::to_string_pretty(&item)?);
            Ok(())
        }

        Command::Search {
            query,
            semantic,
            limit,
        } => {
            let service = ItemService::new(config.clone(), &base_path)?;
            let query_text = query.join(" ");

            if semantic {
                let search = service.semantic_search(&query_text, limit)?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "query": query_text,
                        "count": search.items.len(),
                        "totalItemsSearched": search.total_searched,
                        "items": search.items,
                    }))?
                );
            } else {
                let (parsed, items) = service.nl_search(&query_text, limit)?;
                println!(
                    "{}",
                    serde_json::to_string_pretty(&serde_json::json!({
                        "query": query_text,
                        "parsedParams": parsed,
                        "count": items.len(),
                        "items": items,
                    }))?
                );
            }
            Ok(())
        }

        Command::Recent { limit, item_type } => {
            let service = ItemService::new(config.clone(), &base_path)?;
            let items = service.recent(limit, parse_item_type(item_type)?)?;
            println!("{}", serde_json::to_string_pretty(&items)?);
            Ok(())
        }

        Command::Update {
            id,
            title,
            content,
            url,
            tags,
            item_type,
        } => {
            let service = ItemService::new(config.clone(), &base_path)?;

            let patch = ItemPatch {
                title,
                content,
                url,
                tags: tags.map(parse_tags),
                item_type: parse_item_type(item_type)?,
                ..Default::default()
            };

            let item = service.update(&Eid::from(id), patch)?;
            println!("{}", serde_json::to_string_pretty(&item)?);
            Ok(())
        }

        Command::Delete { id, yes } => {
            if !yes {
                match inquire::prompt_confirmation(format!("Delete item {id}?")) {
                    InquireResult::Ok(true) => {}
                    InquireResult::Ok(false) => return Ok(()),
                    InquireResult::Err(err) => bail!("An error occurred: {}", err),
                }
            }

            let service = ItemService::new(config.clone(), &base_path)?;
            service.delete(&Eid::from(id))?;
            println!("item removed");
            Ok(())
        }

        Command::Capture { source } => capture_command(&config, &base_path, source),

        Command::Sync { watch } => {
            let agent = build_agent(&config, &base_path)?;

            if watch {
                let (probe_interval, settle_delay) = {
                    let config = config.read().unwrap();
                    (
                        Duration::from_secs(config.agent.probe_interval_secs),
                        Duration::from_millis(config.agent.settle_delay_ms),
                    )
                };
                agent.watch(probe_interval, settle_delay);
                Ok(())
            } else {
                match agent.sync_once() {
                    SyncResult::Completed(outcome) => {
                        println!(
                            "{} submitted, {} failed ({} attempted)",
                            outcome.confirmed, outcome.failed, outcome.attempted
                        );
                        Ok(())
                    }
                    SyncResult::Skipped => {
                        println!("sync already in progress");
                        Ok(())
                    }
                }
            }
        }
    }
}

fn build_agent(
    config: &Arc<RwLock<Config>>,
    base_path: &str,
) -> anyhow::Result<SyncAgent> {
    let api_url = config.read().unwrap().agent.api_url.clone();
    let client = Arc::new(ApiClient::new(&api_url));
    let queue = OfflineQueue::open(base_path)?;

    Ok(SyncAgent::new(client, queue))
}

fn capture_command(
    config: &Arc<RwLock<Config>>,
    base_path: &str,
    source: CaptureSource,
) -> anyhow::Result<()> {
    let agent = build_agent(config, base_path)?;

    // startup trigger: replay anything left queued from earlier runs
    let _ = agent.sync_on_startup();

    let draft = match source {
        CaptureSource::Page { title, url } => capture::page(&title, &url),

        CaptureSource::Selection { title, url, text } => capture::selection(&title, &url, &text),

        CaptureSource::Note { text, tags } => {
            capture::note(&text_or_stdin(text)?, tags.map(parse_tags).unwrap_or_default())
        }

        CaptureSource::Clipboard { text, url } => {
            capture::clipboard_note(&text_or_stdin(text)?, url.as_deref())
        }

        CaptureSource::Screenshot { file, title, url } => {
            // the image goes up first; the saved item points at it
            let bytes = std::fs::read(&file)?;
            let filename = file
                .file_name()
                .map(|name| name.to_string_lossy().to_string())
                .unwrap_or_else(|| "screenshot.png".to_string());

            let api_url = config.read().unwrap().agent.api_url.clone();
            let uploaded = ApiClient::new(&api_url).upload_image(&filename, bytes)?;

            capture::screenshot(&title, &url, uploaded.image_url, uploaded.ocr_text)
        }

        CaptureSource::Link {
            link_url,
            text,
            page_title,
        } => capture::link(&link_url, text.as_deref(), &page_title),

        CaptureSource::Image {
            src_url,
            url,
            title,
        } => capture::image(&src_url, &url, &title),

        CaptureSource::Conversation {
            site,
            title,
            url,
            file,
        } => capture::conversation(&site, &title, &url, &file_or_stdin(file)?),

        CaptureSource::Reading { title, url, file } => {
            capture::reading(&title, &url, &file_or_stdin(file)?)
        }
    };

    match agent.submit_or_queue(draft)? {
        Submission::Confirmed(item) => println!("{}", serde_json::to_string_pretty(&item)?),
        Submission::Queued(id) => println!("offline: item queued for sync ({id})"),
    }

    Ok(())
}

fn text_or_stdin(text: Option<String>) -> anyhow::Result<String> {
    match text {
        Some(text) => Ok(text),
        None => {
            let mut buffer = String::new();
            std::io::stdin().read_to_string(&mut buffer)?;
            Ok(buffer.trim().to_string())
        }
    }
}

fn file_or_stdin(file: Option<PathBuf>) -> anyhow::Result<String> {
    match file {
        Some(path) => Ok(std::fs::read_to_string(path)?),
        None => text_or_stdin(None),
    }
}
