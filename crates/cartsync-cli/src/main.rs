//! cartsync command line
//!
//! Drives the engine against a live storefront. The cart drawer is simulated
//! in the terminal by [`console::ConsoleWidget`].

mod console;

use anyhow::{Context, Result};
use cartsync_core::{
    AvailabilityGate, CartSession, CartSyncConfig, CartWidget, FileStorage, HostRef,
    SessionStorage,
};
use cartsync_gateway::{CartGateway, HttpTransport, StorefrontGateway};
use cartsync_reconcile::{
    apply_overlays, event_bus, reconcile_loop, refresh_badge, CartSubmitter, LoopSettings,
    SignalKind, SubmitRequest,
};
use clap::{Parser, Subcommand};
use console::ConsoleWidget;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

type Gateway = StorefrontGateway<HttpTransport>;

#[derive(Parser)]
#[command(name = "cartsync", version)]
#[command(about = "Keep a storefront cart drawer in step with the remote cart")]
struct Cli {
    /// TOML configuration file
    #[arg(long, global = true, env = "CARTSYNC_CONFIG")]
    config: Option<PathBuf>,
    /// Storefront GraphQL endpoint
    #[arg(long, global = true)]
    endpoint: Option<String>,
    /// Storefront access token
    #[arg(
        long,
        global = true,
        env = "CARTSYNC_STOREFRONT_TOKEN",
        hide_env_values = true
    )]
    token: Option<String>,
    /// File holding the persisted cart id
    #[arg(long, global = true, default_value = ".cartsync/session.json")]
    session_file: PathBuf,
    /// Emit logs as JSON
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Add one line, creating the cart on first use
    Add {
        /// Merchandise (variant) id
        #[arg(long)]
        variant: String,
        /// Custom field as key=value; repeatable
        #[arg(long = "field", value_parser = parse_field)]
        fields: Vec<(String, String)>,
        /// Personalization text
        #[arg(long)]
        note: Option<String>,
        /// Availability text as the page shows it
        #[arg(long, default_value = "true")]
        available: String,
    },
    /// Print the lines of the active cart
    Lines {
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Run the reconciliation loop, driven by commands on stdin
    Watch,
    /// Forget the persisted cart id
    Reset,
}

struct App {
    config: CartSyncConfig,
    session: Arc<CartSession>,
    gateway: Arc<Gateway>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.json_logs);

    let config = load_config(&cli)?;
    let session = open_session(&cli.session_file, &config)?;
    let transport = HttpTransport::from_config(&config)?;
    let app = App {
        gateway: Arc::new(StorefrontGateway::new(transport, Arc::clone(&session))),
        session,
        config,
    };

    match cli.command {
        Command::Add {
            variant,
            fields,
            note,
            available,
        } => {
            let mut request = SubmitRequest::new(variant);
            for (key, value) in fields {
                request = request.with_field(key, value);
            }
            request.note = note;
            add(&app, request, &available).await
        }
        Command::Lines { json } => lines(&app, json).await,
        Command::Watch => watch(&app).await,
        Command::Reset => reset(&app.session),
    }
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn load_config(cli: &Cli) -> Result<CartSyncConfig> {
    let mut config = match &cli.config {
        Some(path) => CartSyncConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => CartSyncConfig::default(),
    };
    if let Some(endpoint) = &cli.endpoint {
        config = config.with_endpoint(endpoint.clone());
    }
    if let Some(token) = &cli.token {
        config = config.with_access_token(token.clone());
    }
    config.validate()?;

    if config.access_token.is_empty() {
        tracing::warn!("no storefront access token configured");
    }
    Ok(config)
}

fn open_session(path: &Path, config: &CartSyncConfig) -> Result<Arc<CartSession>> {
    let storage: Arc<dyn SessionStorage> = Arc::new(FileStorage::new(path));
    let session = CartSession::open(storage, config.storage_key.clone())
        .with_context(|| format!("opening session file {}", path.display()))?;
    Ok(Arc::new(session))
}

async fn add(app: &App, request: SubmitRequest, available: &str) -> Result<()> {
    let widget = Arc::new(ConsoleWidget::mounted());
    let gate = Arc::new(AvailabilityGate::new());
    gate.observe(available);

    // No loop runs here; the drawer is refreshed inline below
    let (handle, _events) = event_bus();
    let submitter = CartSubmitter::new(
        Arc::clone(&app.gateway),
        Arc::clone(&widget),
        Arc::clone(&app.session),
        gate,
        handle,
        &app.config,
    );

    let cart_id = submitter.submit(request).await?;
    println!("added to {cart_id}");

    let host = widget.host().context("cart drawer not mounted")?;
    let records = app.gateway.fetch_lines().await?;
    widget.render(host, &cart_id, &records)?;
    let outcome = apply_overlays(&*widget, host, &records, &app.config.reserved_prefix)?;
    refresh_badge(&*widget, host)?;
    tracing::info!(
        lines = records.len(),
        injected = outcome.injected,
        "cart drawer refreshed"
    );
    Ok(())
}

async fn lines(app: &App, json: bool) -> Result<()> {
    let Some(cart_id) = app.session.current() else {
        println!("no active cart");
        return Ok(());
    };
    let records = app.gateway.fetch_lines().await?;

    if json {
        let lines: Vec<serde_json::Value> = records
            .iter()
            .map(|r| serde_json::json!({ "id": r.remote_id, "attributes": r.attributes }))
            .collect();
        let document = serde_json::json!({ "cart": cart_id, "lines": lines });
        println!("{}", serde_json::to_string_pretty(&document)?);
        return Ok(());
    }

    println!("cart {cart_id} ({} lines)", records.len());
    for record in &records {
        println!("  {}", record.remote_id);
        for attribute in &record.attributes {
            println!("    {}: {}", attribute.key, attribute.value);
        }
    }
    Ok(())
}

async fn watch(app: &App) -> Result<()> {
    let widget = Arc::new(ConsoleWidget::mounted());
    if let Some(host) = widget.host() {
        redraw(app, &widget, host).await;
    }

    let (engine, handle) = reconcile_loop(
        Arc::clone(&app.gateway),
        Arc::clone(&widget),
        LoopSettings::from_config(&app.config),
    );
    let task = engine.spawn();
    println!("commands: open, close, render, mutate, replace, quit");

    let mut input = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = input.next_line().await? {
        let Some(host) = widget.host() else {
            continue;
        };
        match line.trim() {
            "open" => {
                if !widget.is_open() {
                    widget.open_drawer(host)?;
                }
                handle.signal(host, SignalKind::OpenChanged(true));
            }
            "close" => {
                widget.close();
                handle.signal(host, SignalKind::OpenChanged(false));
            }
            "render" => {
                redraw(app, &widget, host).await;
                handle.signal(host, SignalKind::Rendered);
            }
            "mutate" => {
                handle.signal(host, SignalKind::ContentMutated);
            }
            "replace" => {
                let next = widget.replace_host();
                redraw(app, &widget, next).await;
                handle.signal(next, SignalKind::Replaced);
            }
            "quit" | "exit" => break,
            "" => {}
            other => println!("unknown command: {other}"),
        }
    }

    handle.shutdown();
    let report = task.await?;
    println!(
        "passes: {}, fetches: {} ({} failed, {} stale), overlays: {}",
        report.passes,
        report.fetches,
        report.failed_fetches,
        report.discarded_stale,
        report.overlays_injected
    );
    Ok(())
}

/// Render the drawer the way the hosted widget does after loading the cart
async fn redraw(app: &App, widget: &ConsoleWidget, host: HostRef) {
    let Some(cart_id) = app.session.current() else {
        return;
    };
    let records = match app.gateway.fetch_lines().await {
        Ok(records) => records,
        Err(e) => {
            tracing::warn!(error = %e, "drawer could not load the cart");
            return;
        }
    };
    if let Err(e) = widget.render(host, &cart_id, &records) {
        tracing::debug!(error = %e, "drawer replaced before rendering");
    }
}

fn reset(session: &CartSession) -> Result<()> {
    match session.current() {
        Some(cart_id) => {
            session.clear(&cart_id)?;
            println!("forgot cart {cart_id}");
        }
        None => println!("no active cart"),
    }
    Ok(())
}

fn parse_field(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err("field key must not be empty".to_string());
    }
    Ok((key.to_string(), value.to_string()))
}
