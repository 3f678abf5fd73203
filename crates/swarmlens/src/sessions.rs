use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;

use swarmlens_sessions::{LogEvent, SessionDetail, SessionRecord, SessionStore, SourceFilter, SourceType};

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum SourceChoice {
    #[default]
    All,
    Structured,
    Conversation,
}

impl From<SourceChoice> for SourceFilter {
    fn from(choice: SourceChoice) -> Self {
        match choice {
            SourceChoice::All => SourceFilter::All,
            SourceChoice::Structured => SourceFilter::StructuredOnly,
            SourceChoice::Conversation => SourceFilter::ConversationOnly,
        }
    }
}

pub async fn handle_list(store: &SessionStore, source: SourceChoice, json: bool) -> Result<()> {
    let records = store.list_sessions(source.into()).await;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else if records.is_empty() {
        println!("{}", "No sessions found.".dimmed());
    } else {
        print_sessions_table(&records);
    }

    Ok(())
}

pub async fn handle_show(
    store: &SessionStore,
    id: &str,
    json: bool,
    limit: Option<usize>,
) -> Result<()> {
    let mut detail = store.get_session(id).await?;

    if let Some(limit) = limit {
        let skip = detail.events.len().saturating_sub(limit);
        detail.events.drain(..skip);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&detail)?);
    } else {
        print_session_detail(&detail);
    }

    Ok(())
}

fn print_sessions_table(records: &[SessionRecord]) {
    println!(
        "{:<8} {:<13} {:<17} {:<6} {:<40} {}",
        "STATUS".dimmed(),
        "SOURCE".dimmed(),
        "STARTED".dimmed(),
        "MSGS".dimmed(),
        "TITLE".dimmed(),
        "ID".dimmed(),
    );

    for r in records {
        let status = if r.active {
            format!("{:<8}", "active").bright_green().to_string()
        } else {
            format!("{:<8}", "idle").dimmed().to_string()
        };
        let source = match r.source_type {
            SourceType::Structured => format!("{:<13}", "structured").bright_blue().to_string(),
            SourceType::Conversation => format!("{:<13}", "conversation").bright_cyan().to_string(),
        };
        let messages = r
            .message_count
            .map(|n| n.to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{} {} {:<17} {:<6} {:<40} {}",
            status,
            source,
            r.start_time.format("%Y-%m-%d %H:%M"),
            messages,
            truncate(&r.title, 40),
            r.id.dimmed()
        );
    }
}

fn print_session_detail(detail: &SessionDetail) {
    let meta = &detail.metadata;

    println!("{}", "=== Session Detail ===".bright_blue().bold());
    println!("{}  {}", "ID:".dimmed(), detail.id);
    println!("{}  {}", "Title:".dimmed(), meta.title);
    println!("{}  {}", "Source:".dimmed(), meta.source_type);
    println!(
        "{}  {}",
        "Started:".dimmed(),
        meta.start_time.format("%Y-%m-%d %H:%M:%S UTC")
    );
    if let Some(ref dir) = meta.root_directory {
        println!("{}  {}", "Directory:".dimmed(), dir);
    }
    if let Some(count) = meta.message_count {
        println!("{}  {}", "Messages:".dimmed(), count);
    }
    println!(
        "{}  {}",
        "Status:".dimmed(),
        if meta.active {
            "ACTIVE".bright_green().to_string()
        } else {
            "idle".dimmed().to_string()
        }
    );

    if detail.events.is_empty() {
        println!();
        println!("{}", "No events recorded.".dimmed());
        return;
    }

    println!();
    println!(
        "{}",
        format!("--- Events ({}) ---", detail.events.len()).dimmed()
    );
    for event in &detail.events {
        print_event(event);
    }
}

fn print_event(event: &LogEvent) {
    let instance = match event.instance.as_str() {
        "user" => event.instance.bright_green().to_string(),
        "assistant" => event.instance.bright_cyan().to_string(),
        "system" => event.instance.dimmed().to_string(),
        _ => event.instance.bright_yellow().to_string(),
    };
    let body = serde_json::to_string(event.body()).unwrap_or_default();

    println!(
        "  {} {} {} {}",
        event.timestamp.dimmed(),
        instance,
        format!("[{}]", event.kind).bright_blue(),
        truncate(&body, 120)
    );
}

/// Truncate on a char boundary, marking the cut with an ellipsis.
fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let cut: String = s.chars().take(max.saturating_sub(3)).collect();
    format!("{}...", cut)
}
