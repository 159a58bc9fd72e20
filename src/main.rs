use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use todo_sync::api::router;
use todo_sync::config::Config;
use todo_sync::models::{Priority, PriorityFilter, StatusFilter, TaskDraft, TaskPatch};
use todo_sync::notify::ConsoleNotifier;
use todo_sync::remote::HttpTaskApi;
use todo_sync::state::AppState;
use todo_sync::storage::{FileStorage, KeyValueStorage};
use todo_sync::theme::{self, ThemePreference};
use todo_sync::{Outcome, TaskStore, db};

#[derive(Parser)]
#[command(name = "todo-sync", about = "To-do list synchronized with a REST task service")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the task REST server
    Serve,
    /// Show tasks using the saved filters
    List {
        #[arg(long)]
        refresh: bool,
    },
    Add {
        text: String,
        #[arg(long, default_value_t = Priority::Medium)]
        priority: Priority,
    },
    Toggle {
        id: String,
    },
    Delete {
        id: String,
    },
    Edit {
        id: String,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        priority: Option<Priority>,
        #[arg(long)]
        completed: Option<bool>,
    },
    /// Change a saved filter
    Filter {
        #[command(subcommand)]
        filter: FilterCommand,
    },
    /// Show or set the color scheme preference
    Theme {
        preference: Option<ThemePreference>,
    },
}

#[derive(Subcommand)]
enum FilterCommand {
    Status { value: StatusFilter },
    Priority { value: PriorityFilter },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "todo_sync=info".to_string()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = Config::new_from_env()?;

    match cli.command {
        Command::Serve => serve(&config).await?,
        Command::Theme { preference } => {
            let storage = FileStorage::new(&config.storage_dir);
            if let Some(preference) = preference {
                theme::save_theme(&storage, preference).await;
            }
            println!("{}", theme::load_theme(&storage).await);
        }
        command => run_client(&config, command).await?,
    }

    Ok(())
}

async fn serve(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let pool = db::connect(&config.database_url).await?;
    let app = router(AppState { db: pool });

    info!("listening on http://{}", config.listen_addr);
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn run_client(config: &Config, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let api = Arc::new(HttpTaskApi::new(&config.api_base_url)?);
    let storage: Arc<dyn KeyValueStorage> = Arc::new(FileStorage::new(&config.storage_dir));
    let store = TaskStore::new(api, storage, Arc::new(ConsoleNotifier));

    store.hydrate().await;
    let refresh = matches!(command, Command::List { refresh: true });
    store.fetch_all(refresh).await;

    let outcome = match command {
        Command::List { .. } => Outcome::Unchanged,
        Command::Add { text, priority } => {
            store
                .add_task(TaskDraft::new(text, priority, config.platform.clone()))
                .await
        }
        Command::Toggle { id } => store.toggle_task(&id).await,
        Command::Delete { id } => store.delete_task(&id).await,
        Command::Edit {
            id,
            text,
            priority,
            completed,
        } => {
            let patch = TaskPatch {
                text,
                is_completed: completed,
                priority,
            };
            store.edit_task(&id, patch).await
        }
        Command::Filter { filter } => {
            match filter {
                FilterCommand::Status { value } => store.set_status_filter(value).await,
                FilterCommand::Priority { value } => store.set_priority_filter(value).await,
            }
            Outcome::Applied
        }
        Command::Serve | Command::Theme { .. } => Outcome::Unchanged,
    };
    info!(?outcome, "command finished");

    let snapshot = store.snapshot();
    println!(
        "status: {}  priority: {}",
        snapshot.status_filter, snapshot.priority_filter
    );
    for task in snapshot.visible_tasks() {
        let mark = if task.is_completed { "x" } else { " " };
        println!("[{}] {:<6} {}  ({})", mark, task.priority.as_str(), task.text, task.id);
    }

    Ok(())
}
