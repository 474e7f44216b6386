/**
 * Structured Chat CLI
 *
 * Line-oriented front end over the client core. Plain lines are sent to the
 * assistant; lines starting with '/' are commands (see /help).
 */

use std::sync::Arc;
use structured_chat::client::{
    AssistOutcome, Config, Direction, Granularity, MemoryGateway, PreferencesStore,
    RendererRegistry, SpanKind, Workspace,
};
use structured_chat::shared::{BlockId, BlockType, ChatRole, ClientError};
use tokio::io::{AsyncBufReadExt, BufReader};

const HELP: &str = "\
Commands:
  /projects                 list projects
  /new <name>               create and open a project
  /open <n>                 open project number n
  /rename <name>            rename the open project
  /drop                     delete the open project
  /blocks                   list blocks
  /add <text|list> <title>  create a block
  /title <n> <title>        rename block n
  /edit <n> <content>       replace block n's content (list items separated by '|')
  /rm <n>                   delete block n
  /up <n>, /down <n>        move block n
  /fold <n>, /unfold <n>    collapse or expand block n
  /gen <n>, /improve <n>, /fix <n>
  /diff <n>                 show block n's pending change
  /accept <n>, /reject <n>, /accept-all, /reject-all
  /undo, /redo
  /clear                    clear the chat history
  /sidebar                  toggle the sidebar preference
  /plugins                  list backend plugins
  /plugin-add <name> <type> [json config]
  /plugin-rm <n>            remove plugin number n
  /quit";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "warn".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .with_writer(std::io::stderr)
        .init();

    let offline = std::env::args().any(|arg| arg == "--offline");
    let config = Config::load()?;
    let workspace = if offline {
        tracing::info!("[STARTUP] Using in-memory backend");
        Workspace::new(Arc::new(MemoryGateway::new()), config.history_limit())
    } else {
        tracing::info!("[STARTUP] Connecting to {}", config.server_url());
        Workspace::connect(config.clone())?
    };

    let preferences = config
        .preferences_path()
        .map(PreferencesStore::new)
        .or_else(PreferencesStore::default_location);
    let renderers = RendererRegistry::new();

    if let Err(e) = workspace.refresh_projects().await {
        println!("Could not load projects: {}", e);
    }
    print_projects(&workspace).await;
    println!("Type /help for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "/quit" || line == "/exit" {
            break;
        }
        if let Err(e) = run_line(&workspace, &renderers, preferences.as_ref(), line).await {
            println!("Error: {}", e);
        }
    }
    Ok(())
}

async fn run_line(
    workspace: &Workspace,
    renderers: &RendererRegistry,
    preferences: Option<&PreferencesStore>,
    line: &str,
) -> Result<(), ClientError> {
    let Some(command) = line.strip_prefix('/') else {
        let outcome = workspace.send_message(line).await?;
        println!("assistant> {}", outcome.reply.response);
        if let Some(summary) = workspace
            .messages()
            .await
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Assistant)
            .and_then(|m| m.update_summary())
        {
            println!("{}", summary);
        }
        for update in &outcome.unmatched {
            println!("(ignored update for unknown block {})", update.block_id);
        }
        return Ok(());
    };

    let (name, rest) = command.split_once(' ').unwrap_or((command, ""));
    let rest = rest.trim();
    match name {
        "help" => println!("{}", HELP),
        "projects" => {
            workspace.refresh_projects().await?;
            print_projects(workspace).await;
        }
        "new" => {
            let project = workspace.create_project(rest).await?;
            println!("Opened '{}'", project.name);
        }
        "open" => {
            let index = parse_index(rest)?;
            let project = workspace
                .projects()
                .await
                .into_iter()
                .nth(index)
                .ok_or_else(|| ClientError::validation("project", "No such project number"))?;
            workspace.select_project(&project.id).await?;
            println!("Opened '{}'", project.name);
            print_blocks(workspace, renderers).await;
            for message in workspace.messages().await {
                println!("{:?}> {}", message.role, message.content);
            }
        }
        "rename" => {
            let id = active(workspace).await?;
            workspace.rename_project(&id, rest).await?;
        }
        "drop" => {
            let id = active(workspace).await?;
            workspace.delete_project(&id).await?;
        }
        "blocks" => print_blocks(workspace, renderers).await,
        "add" => {
            let (kind, title) = rest.split_once(' ').unwrap_or((rest, ""));
            let block_type = BlockType::parse(kind)
                .ok_or_else(|| ClientError::validation("type", "Expected 'text' or 'list'"))?;
            workspace.create_block(title, block_type).await?;
        }
        "title" => {
            let (n, title) = rest.split_once(' ').unwrap_or((rest, ""));
            let id = block_at(workspace, n).await?;
            workspace.rename_block(&id, title).await?;
        }
        "edit" => {
            let (n, content) = rest.split_once(' ').unwrap_or((rest, ""));
            let id = block_at(workspace, n).await?;
            let block_type = workspace
                .store()
                .get(&id)
                .await
                .map(|b| b.block_type())
                .unwrap_or_default();
            let content = renderers.parse_edit(block_type, &content.replace('|', "\n"));
            workspace.edit_content(&id, content).await?;
        }
        "rm" => workspace.delete_block(&block_at(workspace, rest).await?).await?,
        "up" => {
            let id = block_at(workspace, rest).await?;
            workspace.move_block(&id, Direction::Up).await?;
        }
        "down" => {
            let id = block_at(workspace, rest).await?;
            workspace.move_block(&id, Direction::Down).await?;
        }
        "fold" => workspace.set_collapsed(&block_at(workspace, rest).await?, true).await?,
        "unfold" => workspace.set_collapsed(&block_at(workspace, rest).await?, false).await?,
        "gen" | "improve" | "fix" => {
            let id = block_at(workspace, rest).await?;
            let outcome = match name {
                "gen" => workspace.generate_content(&id).await?,
                "improve" => workspace.improve_content(&id).await?,
                _ => workspace.fix_content(&id).await?,
            };
            match outcome {
                AssistOutcome::Written(_) => println!("Content written."),
                AssistOutcome::Proposed(_) => println!("Change proposed; /diff to review."),
            }
        }
        "diff" => {
            let id = block_at(workspace, rest).await?;
            match workspace.diff(&id, Granularity::Line).await? {
                None => println!("No pending change."),
                Some(spans) => {
                    for span in spans {
                        let marker = match span.kind {
                            SpanKind::Added => '+',
                            SpanKind::Removed => '-',
                            SpanKind::Unchanged => ' ',
                        };
                        for text in span.text.lines() {
                            println!("{}{}", marker, text);
                        }
                    }
                }
            }
        }
        "accept" => {
            let id = block_at(workspace, rest).await?;
            if !workspace.accept(&id).await? {
                println!("No pending change.");
            }
        }
        "reject" => {
            let id = block_at(workspace, rest).await?;
            workspace.reject(&id).await?;
        }
        "accept-all" => {
            let report = workspace.accept_all().await;
            println!("Accepted {} block(s).", report.accepted.len());
            if let Some(failure) = report.failed {
                println!(
                    "Stopped at {}: {} ({} left pending)",
                    failure.block_id,
                    failure.error,
                    report.remaining.len()
                );
            }
        }
        "reject-all" => println!("Rejected {} change(s).", workspace.reject_all().await),
        "undo" => workspace.undo().await?,
        "redo" => workspace.redo().await?,
        "clear" => workspace.clear_chat().await?,
        "sidebar" => match preferences {
            Some(store) => {
                let mut prefs = store.load();
                prefs.toggle_sidebar();
                if let Err(e) = store.save(&prefs) {
                    println!("Could not save preferences: {}", e);
                }
                println!("Sidebar {}", if prefs.is_sidebar_open { "open" } else { "closed" });
            }
            None => println!("No preferences location available."),
        },
        "plugins" => {
            workspace.refresh_plugins().await?;
            print_plugins(workspace).await;
        }
        "plugin-add" => {
            let mut parts = rest.splitn(3, ' ');
            let name = parts.next().unwrap_or_default();
            let plugin_type = parts.next().unwrap_or_default();
            let config = match parts.next().map(str::trim).filter(|c| !c.is_empty()) {
                Some(text) => serde_json::from_str(text)
                    .map_err(|e| ClientError::validation("config", format!("Invalid JSON: {}", e)))?,
                None => serde_json::json!({}),
            };
            workspace.add_plugin(name, plugin_type, config).await?;
            print_plugins(workspace).await;
        }
        "plugin-rm" => {
            let index = parse_index(rest)?;
            let plugin = workspace
                .plugins()
                .await
                .into_iter()
                .nth(index)
                .ok_or_else(|| ClientError::validation("plugin", "No such plugin number"))?;
            workspace.remove_plugin(&plugin.id).await?;
            print_plugins(workspace).await;
        }
        other => println!("Unknown command '/{}'. Type /help.", other),
    }
    Ok(())
}

async fn print_projects(workspace: &Workspace) {
    let active = workspace.active_project_id().await;
    for (i, project) in workspace.projects().await.iter().enumerate() {
        let marker = if Some(&project.id) == active.as_ref() { '*' } else { ' ' };
        println!("{} {}. {}", marker, i + 1, project.name);
    }
}

async fn print_plugins(workspace: &Workspace) {
    for (i, plugin) in workspace.plugins().await.iter().enumerate() {
        let builtin = if plugin.is_builtin() { " [built-in]" } else { "" };
        println!("  {}. {} ({}){}", i + 1, plugin.name, plugin.plugin_type, builtin);
    }
}

async fn print_blocks(workspace: &Workspace, renderers: &RendererRegistry) {
    for (i, block) in workspace.blocks().await.iter().enumerate() {
        let pending = if block.has_pending() { " [pending]" } else { "" };
        println!("{}. {} ({}){}", i + 1, block.title, block.block_type(), pending);
        if !block.is_collapsed {
            for line in renderers.render(&block.content).lines() {
                println!("   {}", line);
            }
        }
    }
}

fn parse_index(input: &str) -> Result<usize, ClientError> {
    match input.trim().parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(ClientError::validation("index", "Expected a number starting at 1")),
    }
}

async fn block_at(workspace: &Workspace, input: &str) -> Result<BlockId, ClientError> {
    let index = parse_index(input)?;
    workspace
        .store()
        .order()
        .await
        .into_iter()
        .nth(index)
        .ok_or_else(|| ClientError::validation("block", "No such block number"))
}

async fn active(workspace: &Workspace) -> Result<structured_chat::shared::ProjectId, ClientError> {
    workspace
        .active_project_id()
        .await
        .ok_or(ClientError::NoActiveProject)
}
