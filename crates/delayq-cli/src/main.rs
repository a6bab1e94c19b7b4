use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use clap::{Parser, Subcommand};
use delayq_core::{
    CancellationToken, DelayqConfig, DequeueError, EnqueueError, Message, Queue, RocksDbStore,
};
use tracing::info;

#[derive(Parser)]
#[command(name = "delayq", about = "Delay queue over a local RocksDB store")]
struct Cli {
    /// Data directory of the RocksDB store (overrides the config file)
    #[arg(long, env = "DELAYQ_DATA_DIR", global = true)]
    data_dir: Option<String>,

    /// Path to a TOML config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Schedule a payload for later delivery
    Add {
        /// Queue name
        queue: String,

        /// Payload (UTF-8)
        payload: String,

        /// Delay before the message becomes due, in milliseconds
        #[arg(long, default_value = "0")]
        delay_ms: u64,

        /// Explicit message ID; a random UUIDv7 is generated if omitted
        #[arg(long)]
        id: Option<String>,
    },

    /// List scheduled messages in deadline order
    List {
        /// Queue name
        queue: String,
    },

    /// Print messages as they fall due and remove them, until interrupted
    Consume {
        /// Queue name
        queue: String,

        /// Poll period in milliseconds (overrides the config file)
        #[arg(long)]
        poll_period_ms: Option<u64>,
    },
}

fn load_config(explicit: Option<&Path>) -> DelayqConfig {
    let result = match explicit {
        Some(path) => Some(DelayqConfig::load(path)),
        None => ["delayq.toml", "/etc/delayq/delayq.toml"]
            .iter()
            .map(Path::new)
            .find(|path| path.exists())
            .map(DelayqConfig::load),
    };

    match result {
        Some(Ok(config)) => {
            info!("loaded configuration");
            config
        }
        Some(Err(e)) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        None => {
            info!("no config file found, using defaults");
            DelayqConfig::default()
        }
    }
}

fn open_store(data_dir: &str) -> Arc<RocksDbStore> {
    match RocksDbStore::open(data_dir) {
        Ok(store) => Arc::new(store),
        Err(e) => {
            eprintln!("Error: cannot open store at {data_dir}: {e}");
            process::exit(1);
        }
    }
}

fn format_enqueue_error(err: &EnqueueError) -> String {
    match err {
        EnqueueError::DuplicateEntry { queue, id } => {
            format!("Error: message {id} is already scheduled in queue \"{queue}\"")
        }
        other => format!("Error: {other}"),
    }
}

fn deadline_nanos(msg: &Message) -> u128 {
    msg.deadline
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0)
}

fn cmd_add(queue: &Queue, payload: String, delay_ms: u64, id: Option<String>) {
    let delay = Duration::from_millis(delay_ms);
    let result = match id {
        Some(id) => queue.add_with_id(id.clone(), payload, delay).map(|()| id),
        None => queue.add(payload, delay),
    };

    match result {
        Ok(id) => println!("{id}"),
        Err(e) => {
            eprintln!("{}", format_enqueue_error(&e));
            process::exit(1);
        }
    }
}

fn cmd_list(queue: &Queue) {
    let messages = match queue.pending() {
        Ok(messages) => messages,
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    };

    if messages.is_empty() {
        println!("No messages scheduled in \"{}\"", queue.name());
        return;
    }

    println!("{:<22} {:<38} PAYLOAD", "DEADLINE_NS", "ID");
    for msg in &messages {
        println!(
            "{:<22} {:<38} {}",
            deadline_nanos(msg),
            msg.id,
            String::from_utf8_lossy(&msg.data)
        );
    }
}

async fn cmd_consume(queue: Queue, config: DelayqConfig) {
    let cancel = CancellationToken::new();
    let consumer_cancel = cancel.clone();

    let mut consumer = tokio::task::spawn_blocking(move || {
        queue.dequeue(&consumer_cancel, &config.consumer, |msg: &Message| {
            println!(
                "{} {} {}",
                deadline_nanos(msg),
                msg.id,
                String::from_utf8_lossy(&msg.data)
            );
            Ok::<(), std::io::Error>(())
        })
    });

    let err = tokio::select! {
        joined = &mut consumer => joined,
        () = shutdown_signal() => {
            info!("stopping consumer after the current poll window");
            cancel.cancel();
            consumer.await
        }
    };

    match err {
        Ok(DequeueError::Cancelled) => {}
        Ok(e) => {
            eprintln!("Error: {e}");
            process::exit(1);
        }
        Err(e) => {
            eprintln!("Error: consumer task failed: {e}");
            process::exit(1);
        }
    }
}

#[tokio::main]
async fn main() {
    delayq_core::telemetry::init_tracing();

    let cli = Cli::parse();
    let mut config = load_config(cli.config.as_deref());
    if let Some(data_dir) = cli.data_dir {
        config.storage.data_dir = data_dir;
    }

    match cli.command {
        Commands::Add {
            queue,
            payload,
            delay_ms,
            id,
        } => {
            let store = open_store(&config.storage.data_dir);
            cmd_add(&Queue::new(store, queue), payload, delay_ms, id);
        }
        Commands::List { queue } => {
            let store = open_store(&config.storage.data_dir);
            cmd_list(&Queue::new(store, queue));
        }
        Commands::Consume {
            queue,
            poll_period_ms,
        } => {
            if let Some(ms) = poll_period_ms {
                config.consumer.poll_period_ms = ms;
            }
            if let Err(e) = config.validate() {
                eprintln!("Error: {e}");
                process::exit(1);
            }
            let store = open_store(&config.storage.data_dir);
            cmd_consume(Queue::new(store, queue), config).await;
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => {},
                    _ = sigterm.recv() => {},
                }
            }
            Err(_) => {
                let _ = ctrl_c.await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
    }

    info!("received shutdown signal");
}
