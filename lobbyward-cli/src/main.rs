//! lobbyward CLI: drives the coordinator against console collaborators.
//!
//! There is no chat-platform connection here; the demo plays through the
//! rent, event and verification flows with renders and notifications
//! printed to stdout.

use anyhow::Result;
use async_trait::async_trait;
use clap::Parser;
use lobbyward_core::collab::{
    Authorizer, CollabError, ExternalProfile, IdentityResolver, MemberDirectory, Notifier,
    Presenter,
};
use lobbyward_core::coordinator::{Collaborators, Coordinator};
use lobbyward_core::event::EventView;
use lobbyward_core::logging::{init_logging_with_config, LogConfig, LogLevel};
use lobbyward_core::rent::{PoolView, SlotStatus};
use lobbyward_core::types::{ChannelId, RenderHandle, UserId};
use lobbyward_core::verify::ProfileLink;
use lobbyward_core::Config;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "lobbyward")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Set the log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Enable JSON formatted logging
    #[arg(long)]
    json_logs: bool,

    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Parser, Debug)]
enum Command {
    /// Play through the rent, event and verification flows on the console
    Demo,
    /// Print the effective configuration
    ShowConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = LogLevel::from_str(&args.log_level).unwrap_or_else(|| {
        eprintln!("Invalid log level '{}', using 'info'", args.log_level);
        LogLevel::Info
    });
    init_logging_with_config(LogConfig::new(log_level).json_format(args.json_logs))?;
    lobbyward_core::metrics::init_metrics();

    let config = match &args.config {
        Some(path) => Config::from_file(path)?,
        None => Config::default(),
    };

    match args.command {
        Some(Command::Demo) => run_demo(config).await?,
        Some(Command::ShowConfig) => {
            println!("{}", toml::to_string_pretty(&config)?);
        }
        None => {
            info!("No command specified. Use --help for usage information.");
        }
    }

    Ok(())
}

async fn run_demo(mut config: Config) -> Result<()> {
    // Fast-forward-friendly demo values
    config.booking.reviewers = vec![UserId::new("boss")];

    let console = Arc::new(ConsoleCollaborators::default());
    console.resolver_profile("76561197960287930", "SteamAlice");

    let coordinator = Arc::new(Coordinator::new(
        config,
        Collaborators {
            presenter: console.clone(),
            notifier: console.clone(),
            resolver: console.clone(),
            authorizer: console.clone(),
            directory: console.clone(),
        },
    ));

    let channel = ChannelId::new("lobby");
    let boss = UserId::new("boss");
    let alice = UserId::new("alice");

    println!("== rent flow ==");
    coordinator.create_rent_system(channel.clone(), &boss).await?;
    let request = coordinator.request_slot(&channel, 0, &alice).await?;
    println!("request pending: slot {} by {}", request.slot, request.requester);
    coordinator.approve_slot(&channel, 0, &boss).await?;

    println!("\n== event flow ==");
    let event = coordinator
        .create_event(channel.clone(), "friday lobby", "weekly run", "in 2 hours", 2, &boss)
        .await?;
    coordinator.join_event(&event, &alice).await?;
    coordinator.join_event(&event, &UserId::new("bob")).await?;
    coordinator.manual_activate(&event, &boss).await?;

    println!("\n== verification flow ==");
    let newcomer = UserId::new("newcomer");
    coordinator.member_joined(newcomer.clone()).await;
    let profile = coordinator
        .submit_verification(
            &newcomer,
            "https://steamcommunity.com/profiles/76561197960287930",
        )
        .await?;
    println!("verified as {}", profile.display_name);

    println!("\n== booking flow ==");
    let delivered = coordinator
        .submit_booking(&alice, "Alice", "17/11/2025", "22:00")
        .await?;
    println!("reservation request reached {delivered} reviewer(s)");

    coordinator.shutdown();
    Ok(())
}

/// Every collaborator at once, rendered to stdout. Everyone carries the
/// membership tag; only "boss" is privileged.
#[derive(Default)]
struct ConsoleCollaborators {
    next_handle: AtomicU64,
    profiles: std::sync::Mutex<std::collections::HashMap<String, String>>,
}

impl ConsoleCollaborators {
    fn resolver_profile(&self, key: &str, name: &str) {
        self.profiles
            .lock()
            .unwrap()
            .insert(key.to_string(), name.to_string());
    }

    fn fresh_handle(&self) -> RenderHandle {
        let n = self.next_handle.fetch_add(1, Ordering::Relaxed) + 1;
        RenderHandle::new(format!("console-{n}"))
    }

    fn print_pool(view: &PoolView) {
        println!("[render] pool in #{}", view.channel);
        for slot in &view.slots {
            match &slot.status {
                SlotStatus::Available => println!("  {}: available", slot.label),
                SlotStatus::Requested { by } => {
                    println!("  {}: requested by {by} (awaiting approval)", slot.label)
                }
                SlotStatus::Occupied { by, remaining } => {
                    println!("  {}: {by} for another {remaining}", slot.label)
                }
            }
        }
    }

    fn print_event(view: &EventView) {
        println!(
            "[render] event \"{}\" ({:?}, {}/{} joined): {}",
            view.name,
            view.phase,
            view.participants.len(),
            view.capacity,
            if view.joinable { "join open" } else { "join disabled" }
        );
    }
}

#[async_trait]
impl Presenter for ConsoleCollaborators {
    async fn render_pool(
        &self,
        _channel: &ChannelId,
        view: &PoolView,
    ) -> Result<RenderHandle, CollabError> {
        Self::print_pool(view);
        Ok(self.fresh_handle())
    }

    async fn update_pool(
        &self,
        _handle: &RenderHandle,
        _view: &PoolView,
    ) -> Result<(), CollabError> {
        // Silent: the 1s refresh would flood the console
        Ok(())
    }

    async fn render_event(
        &self,
        _channel: &ChannelId,
        view: &EventView,
    ) -> Result<RenderHandle, CollabError> {
        Self::print_event(view);
        Ok(self.fresh_handle())
    }

    async fn update_event(
        &self,
        _handle: &RenderHandle,
        view: &EventView,
    ) -> Result<(), CollabError> {
        Self::print_event(view);
        Ok(())
    }

    async fn announce(&self, channel: &ChannelId, text: &str) -> Result<(), CollabError> {
        println!("[#{channel}] {text}");
        Ok(())
    }
}

#[async_trait]
impl Notifier for ConsoleCollaborators {
    async fn notify(&self, user: &UserId, text: &str) -> Result<(), CollabError> {
        println!("[dm -> {user}] {text}");
        Ok(())
    }
}

#[async_trait]
impl IdentityResolver for ConsoleCollaborators {
    async fn resolve(&self, link: &ProfileLink) -> Result<ExternalProfile, CollabError> {
        self.profiles
            .lock()
            .unwrap()
            .get(link.key())
            .map(|name| ExternalProfile {
                display_name: name.clone(),
            })
            .ok_or_else(|| CollabError::NotFound(format!("unknown profile {link}")))
    }
}

#[async_trait]
impl Authorizer for ConsoleCollaborators {
    async fn is_privileged(&self, user: &UserId) -> bool {
        user.0 == "boss"
    }

    async fn has_required_tag(&self, _user: &UserId) -> bool {
        true
    }
}

#[async_trait]
impl MemberDirectory for ConsoleCollaborators {
    async fn set_display_name(&self, user: &UserId, name: &str) -> Result<(), CollabError> {
        println!("[directory] {user} is now \"{name}\"");
        Ok(())
    }

    async fn grant_access_tag(&self, user: &UserId) -> Result<(), CollabError> {
        println!("[directory] {user} granted access tag");
        Ok(())
    }

    async fn revoke_membership(&self, user: &UserId, reason: &str) -> Result<(), CollabError> {
        println!("[directory] {user} removed: {reason}");
        Ok(())
    }
}
