//! Terminal Kanban board client.
//!
//! Renders tasks grouped by status column, moves tasks between columns, and
//! polls the server for refreshed state in watch mode.
//!
//! Environment:
//! - `TASKBOARD_URL` - API base URL (default `http://localhost:3001`)
//! - `TASKBOARD_TOKEN` - bearer ID token
//! - `TASKBOARD_API_KEY` - service-account key (used when no token is set)

use std::collections::HashMap;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use uuid::Uuid;

use taskboard::api::types::{CreateTaskRequest, UpdateTaskRequest};
use taskboard::board::client::{ApiClient, ClientError, Credentials};
use taskboard::board::{group_tasks, poll::PollGate};
use taskboard::task::{Status, Task, TaskFilter};

const USAGE: &str = "\
Usage: board <command> [options]

Commands:
  show [filters]            render the board
  show <id>                 show one task in detail
  watch [--interval SECS]   render and poll for changes
  add <title> [options]     create a task
  move <id> <status>        move a task to another column
  note <id> <text>          append a note to a task
  archive <id>              archive (soft delete) a task
  agents                    list agent labels

Filters / options:
  --status S --priority P --category C --agent A --archived --limit N
  --description D --tags a,b,c (add only)
";

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        if let Some(ClientError::Unauthorized(msg)) = e.downcast_ref::<ClientError>() {
            eprintln!("Session rejected: {msg}");
            eprintln!("Re-authenticate, then set TASKBOARD_TOKEN (or TASKBOARD_API_KEY).");
        } else {
            eprintln!("error: {e:#}");
        }
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let argv: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = argv.first() else {
        print!("{USAGE}");
        return Ok(());
    };
    let args = Args::parse(&argv[1..])?;
    let client = client_from_env();

    match command.as_str() {
        "show" => {
            // An id as first positional switches to the detail view.
            if let Some(raw) = args.positional.first() {
                let id = parse_id(raw)?;
                let task = client.get_task(id).await?;
                render_detail(&task);
            } else {
                let tasks = client.list_tasks(&args.filter()?).await?;
                render_board(&tasks);
            }
        }
        "watch" => {
            let interval = args.flag_parse::<u64>("interval")?.unwrap_or(30);
            watch(&client, &args.filter()?, Duration::from_secs(interval)).await?;
        }
        "add" => {
            let title = args
                .positional
                .first()
                .context("add requires a title")?
                .clone();
            let task = client
                .create_task(&CreateTaskRequest {
                    title: Some(title),
                    description: args.flag("description"),
                    status: args.flag("status"),
                    priority: args.flag("priority"),
                    category: args.flag("category"),
                    tags: args.flag("tags").map(|t| {
                        t.split(',')
                            .map(str::trim)
                            .filter(|s| !s.is_empty())
                            .map(str::to_string)
                            .collect()
                    }),
                    agent: args.flag("agent"),
                })
                .await?;
            println!("created {} ({})", task.id, task.title);
        }
        "move" => {
            let [raw_id, raw_status] = args.two_positional("move <id> <status>")?;
            let status: Status = raw_status.parse().map_err(anyhow::Error::from)?;
            let task = client.move_task(parse_id(&raw_id)?, status).await?;
            println!("moved {} to {}", task.title, task.status);
        }
        "note" => {
            let raw_id = args.positional.first().context("note requires a task id")?;
            let text = args.positional[1..].join(" ");
            if text.is_empty() {
                bail!("note requires text");
            }
            let task = client.add_note(parse_id(raw_id)?, &text).await?;
            println!("noted on {} ({} entries)", task.title, task.notes.len());
        }
        "archive" => {
            let raw_id = args
                .positional
                .first()
                .context("archive requires a task id")?;
            let task = client.archive_task(parse_id(raw_id)?).await?;
            println!("archived {}", task.title);
        }
        "agents" => {
            for agent in client.agents().await? {
                println!("{agent}");
            }
        }
        other => {
            eprint!("unknown command: {other}\n\n{USAGE}");
            std::process::exit(2);
        }
    }
    Ok(())
}

fn client_from_env() -> ApiClient {
    let base_url =
        std::env::var("TASKBOARD_URL").unwrap_or_else(|_| "http://localhost:3001".to_string());
    let credentials = if let Ok(token) = std::env::var("TASKBOARD_TOKEN") {
        Credentials::Token(token)
    } else if let Ok(key) = std::env::var("TASKBOARD_API_KEY") {
        Credentials::ApiKey(key)
    } else {
        Credentials::None
    };
    ApiClient::new(base_url, credentials)
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).with_context(|| format!("not a task id: {raw}"))
}

/// Refresh loop. The terminal board is always "visible"; the gate still
/// drives the refresh schedule.
async fn watch(client: &ApiClient, filter: &TaskFilter, interval: Duration) -> Result<()> {
    let mut gate = PollGate::new(interval, Instant::now());
    loop {
        if gate.poll_due(Instant::now()) {
            match client.list_tasks(filter).await {
                Ok(tasks) => {
                    // Clear screen and repaint.
                    print!("\x1b[2J\x1b[H");
                    render_board(&tasks);
                    println!("\nrefreshing every {}s, Ctrl+C to quit", interval.as_secs());
                }
                Err(e @ ClientError::Unauthorized(_)) => return Err(e.into()),
                Err(e) => eprintln!("refresh failed: {e}"),
            }
            gate.mark_polled(Instant::now());
        }
        tokio::time::sleep(Duration::from_millis(250)).await;
    }
}

fn render_board(tasks: &[Task]) {
    for column in group_tasks(tasks) {
        println!(
            "━━ {} ({}) {}",
            column.status.as_str().to_uppercase(),
            column.tasks.len(),
            "━".repeat(40usize.saturating_sub(column.status.as_str().len()))
        );
        for task in &column.tasks {
            let agent = if task.agent == "main" {
                String::new()
            } else {
                format!("  @{}", task.agent)
            };
            println!("  {}  [{:<6}] {}{}", task.id, task.priority, task.title, agent);
        }
        if column.tasks.is_empty() {
            println!("  (empty)");
        }
        println!();
    }
}

fn render_detail(task: &Task) {
    println!("{}", task.title);
    println!("  id:        {}", task.id);
    println!("  status:    {}", task.status);
    println!("  priority:  {}", task.priority);
    println!("  agent:     {}", task.agent);
    if let Some(category) = &task.category {
        println!("  category:  {category}");
    }
    if !task.tags.is_empty() {
        println!("  tags:      {}", task.tags.join(", "));
    }
    println!("  created:   {} by {}", task.created_at.format("%Y-%m-%d %H:%M"), task.created_by);
    println!("  updated:   {}", task.updated_at.format("%Y-%m-%d %H:%M"));
    if task.archived {
        match task.archived_at {
            Some(at) => println!("  archived:  {}", at.format("%Y-%m-%d %H:%M")),
            None => println!("  archived:  yes"),
        }
    }
    if let Some(description) = &task.description {
        println!("\n{description}");
    }
    if !task.notes.is_empty() {
        println!("\nactivity:");
        for entry in &task.notes {
            println!(
                "  {} {} - {}",
                entry.timestamp.format("%Y-%m-%d %H:%M"),
                entry.by,
                entry.note
            );
        }
    }
}

/// Minimal flag parsing: `--name value` pairs, a bare `--archived` switch,
/// everything else positional.
struct Args {
    positional: Vec<String>,
    flags: HashMap<String, String>,
    archived: bool,
}

impl Args {
    fn parse(rest: &[String]) -> Result<Self> {
        let mut args = Self {
            positional: Vec::new(),
            flags: HashMap::new(),
            archived: false,
        };
        let mut i = 0;
        while i < rest.len() {
            match rest[i].strip_prefix("--") {
                Some("archived") => args.archived = true,
                Some(name) => {
                    let value = rest
                        .get(i + 1)
                        .with_context(|| format!("--{name} requires a value"))?;
                    args.flags.insert(name.to_string(), value.clone());
                    i += 1;
                }
                None => args.positional.push(rest[i].clone()),
            }
            i += 1;
        }
        Ok(args)
    }

    fn flag(&self, name: &str) -> Option<String> {
        self.flags.get(name).cloned()
    }

    fn flag_parse<T: std::str::FromStr>(&self, name: &str) -> Result<Option<T>> {
        self.flags
            .get(name)
            .map(|v| {
                v.parse::<T>()
                    .map_err(|_| anyhow::anyhow!("invalid value for --{name}: {v}"))
            })
            .transpose()
    }

    fn two_positional(&self, usage: &str) -> Result<[String; 2]> {
        match self.positional.as_slice() {
            [a, b] => Ok([a.clone(), b.clone()]),
            _ => bail!("usage: board {usage}"),
        }
    }

    fn filter(&self) -> Result<TaskFilter> {
        let defaults = TaskFilter::default();
        Ok(TaskFilter {
            status: self
                .flag("status")
                .map(|s| s.parse())
                .transpose()
                .map_err(anyhow::Error::from)?,
            priority: self
                .flag("priority")
                .map(|p| p.parse())
                .transpose()
                .map_err(anyhow::Error::from)?,
            category: self.flag("category"),
            agent: self.flag("agent"),
            archived: self.archived,
            limit: self.flag_parse::<usize>("limit")?.unwrap_or(defaults.limit),
        })
    }
}
