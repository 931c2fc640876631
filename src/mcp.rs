//! Tool-invocation interface: a JSON-RPC loop on stdio exposing the
//! knowledge base to agent clients. Mirrors the REST semantics but answers
//! with human-readable text blocks.

use std::io::{self, BufRead, Write};

use anyhow::{anyhow, bail};
use serde_json::{json, Value};

use crate::app::ItemService;
use crate::eid::Eid;
use crate::items::{Item, ItemDraft, ItemType};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SEARCH_RESULT_LIMIT: usize = 20;
const RECENT_DEFAULT_LIMIT: usize = 10;
const RECENT_MAX_LIMIT: usize = 50;

pub fn run(service: &ItemService) -> anyhow::Result<()> {
    let stdin = io::stdin();
    let stdout = io::stdout();

    log::info!("tool server running on stdio");

    for line in stdin.lock().lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }

        let request: Value = match serde_json::from_str(&line) {
            Ok(value) => value,
            Err(err) => {
                log::warn!("malformed request line: {err}");
                continue;
            }
        };

        let Some(response) = handle_request(service, &request) else {
            continue;
        };

        let mut out = stdout.lock();
        serde_json::to_writer(&mut out, &response)?;
        out.write_all(b"\n")?;
        out.flush()?;
    }

    Ok(())
}

/// Notifications (no id) produce no response.
fn handle_request(service: &ItemService, request: &Value) -> Option<Value> {
    let method = request["method"].as_str().unwrap_or_default().to_string();
    if method.starts_with("notifications/") {
        return None;
    }
    let id = request.get("id").cloned()?;

    let result: Result<Value, Value> = match method.as_str() {
        "initialize" => Ok(json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {} },
            "serverInfo": {
                "name": "synapse",
                "version": env!("CARGO_PKG_VERSION"),
            },
        })),
        "ping" => Ok(json!({})),
        "tools/list" => Ok(json!({ "tools": tool_definitions() })),
        "tools/call" => Ok(call_tool(service, &request["params"])),
        _ => Err(json!({
            "code": -32601,
            "message": format!("Method not found: {method}"),
        })),
    };

    Some(match result {
        Ok(result) => json!({"jsonrpc": "2.0", "id": id, "result": result}),
        Err(error) => json!({"jsonrpc": "2.0", "id": id, "error": error}),
    })
}

fn tool_definitions() -> Value {
    json!([
        {
            "name": "search_items",
            "description": "Search through saved items using natural language. Searches across titles, content, URLs, and tags.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "Natural language search query (e.g., \"videos about AI\", \"articles from last month\")",
                    },
                },
                "required": ["query"],
            },
        },
        {
            "name": "create_item",
            "description": "Create a new item in the second brain (note, link, video, etc.)",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "title": { "type": "string", "description": "Title of the item" },
                    "content": { "type": "string", "description": "Content/description of the item" },
                    "url": { "type": "string", "description": "URL if it's a web resource (optional)" },
                    "tags": {
                        "type": "array",
                        "items": { "type": "string" },
                        "description": "Tags for categorization (optional)",
                    },
                    "type": {
                        "type": "string",
                        "enum": ["note", "article", "video", "todo", "image", "other"],
                        "description": "Type of content (optional, will be auto-detected if not provided)",
                    },
                },
                "required": ["title", "content"],
            },
        },
        {
            "name": "get_item_details",
            "description": "Get full details of a specific item by ID",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "id": { "type": "string", "description": "Id of the item" },
                },
                "required": ["id"],
            },
        },
        {
            "name": "list_recent_items",
            "description": "List recently saved items",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "limit": {
                        "type": "number",
                        "description": "Number of items to return (default: 10, max: 50)",
                        "default": 10,
                    },
                    "type": {
                        "type": "string",
                        "enum": ["note", "article", "video", "todo", "image", "other", "all"],
                        "description": "Filter by content type (optional)",
                    },
                },
            },
        },
    ])
}

/// Tool failures come back as an isError text payload, never a protocol
/// error.
fn call_tool(service: &ItemService, params: &Value) -> Value {
    let name = params["name"].as_str().unwrap_or_default();
    let args = &params["arguments"];

    let outcome = match name {
        "search_items" => search_items(service, args),
        "create_item" => create_item(service, args),
        "get_item_details" => get_item_details(service, args),
        "list_recent_items" => list_recent_items(service, args),
        _ => Err(anyhow!("Unknown tool: {name}")),
    };

    match outcome {
        Ok(text) => json!({ "content": [{ "type": "text", "text": text }] }),
        Err(err) => json!({
            "content": [{ "type": "text", "text": format!("Error: {err}") }],
            "isError": true,
        }),
    }
}

fn search_items(service: &ItemService, args: &Value) -> anyhow::Result<String> {
    let query = args["query"]
        .as_str()
        .ok_or_else(|| anyhow!("query is required"))?;

    let (_parsed, items) = service.nl_search(query, Some(SEARCH_RESULT_LIMIT))?;

    let listing = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            let content = item.content.as_deref().unwrap_or_default();
            let preview: String = content.chars().take(150).collect();
            let ellipsis = if content.chars().count() > 150 { "..." } else { "" };
            format!(
                "{}. **{}** ({})\n   {preview}{ellipsis}\n   ID: {}\n   Created: {}\n   {}",
                i + 1,
                item.title.as_deref().unwrap_or("Untitled"),
                item.item_type,
                item.id,
                item.created_at.format("%Y-%m-%d"),
                item.url
                    .as_deref()
                    .map(|url| format!("URL: {url}"))
                    .unwrap_or_default(),
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(format!(
        "Found {} items matching \"{query}\":\n\n{listing}",
        items.len()
    ))
}

fn create_item(service: &ItemService, args: &Value) -> anyhow::Result<String> {
    let title = args["title"]
        .as_str()
        .ok_or_else(|| anyhow!("title is required"))?;
    let content = args["content"]
        .as_str()
        .ok_or_else(|| anyhow!("content is required"))?;

    let tags = args["tags"]
        .as_array()
        .map(|tags| {
            tags.iter()
                .filter_map(|tag| tag.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let item_type = match args["type"].as_str() {
        Some(value) => match ItemType::parse(value) {
            Some(item_type) => Some(item_type),
            None => bail!("unknown type: {value}"),
        },
        None => None,
    };

    let draft = ItemDraft {
        title: Some(title.to_string()),
        content: Some(content.to_string()),
        url: args["url"].as_str().map(String::from),
        item_type,
        tags,
        user_id: Some("mcp_user".to_string()),
        ..Default::default()
    };

    let item = service.create(draft)?;

    Ok(format!(
        "Created new item:\n**{}**\nType: {}\nID: {}",
        item.title.as_deref().unwrap_or("Untitled"),
        item.item_type,
        item.id,
    ))
}

fn get_item_details(service: &ItemService, args: &Value) -> anyhow::Result<String> {
    let id = args["id"]
        .as_str()
        .ok_or_else(|| anyhow!("id is required"))?;

    let item = service
        .get(&Eid::from(id))
        .map_err(|_| anyhow!("Item not found with ID: {id}"))?;

    Ok(format_item_details(&item))
}

fn format_item_details(item: &Item) -> String {
    let mut text = format!(
        "**{}**\n\nType: {}\nCreated: {}\nTags: {}\n\n{}",
        item.title.as_deref().unwrap_or("Untitled"),
        item.item_type,
        item.created_at.format("%Y-%m-%d %H:%M:%S"),
        if item.tags.is_empty() {
            "None".to_string()
        } else {
            item.tags.join(", ")
        },
        item.content.as_deref().unwrap_or_default(),
    );

    if let Some(url) = &item.url {
        text.push_str(&format!("\n\nURL: {url}"));
    }
    if let Some(summary) = &item.metadata.summary {
        text.push_str(&format!("\n\n**Summary:**\n{summary}"));
    }

    text
}

fn list_recent_items(service: &ItemService, args: &Value) -> anyhow::Result<String> {
    let limit = args["limit"]
        .as_u64()
        .map(|limit| limit as usize)
        .unwrap_or(RECENT_DEFAULT_LIMIT)
        .min(RECENT_MAX_LIMIT);

    let item_type = match args["type"].as_str() {
        Some("all") | None => None,
        Some(value) => match ItemType::parse(value) {
            Some(item_type) => Some(item_type),
            None => bail!("unknown type: {value}"),
        },
    };

    let items = service.recent(limit, item_type)?;

    let listing = items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            format!(
                "{}. **{}** ({})\n   Created: {}\n   ID: {}",
                i + 1,
                item.title.as_deref().unwrap_or("Untitled"),
                item.item_type,
                item.created_at.format("%Y-%m-%d"),
                item.id,
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n");

    Ok(format!("**Recent Items**:\n\n{listing}"))
}
