//! The terminal event loop.
//!
//! One task owns the controller. Store snapshots, stdin lines, the presence
//! heartbeat and the external-change poll are multiplexed with
//! `tokio::select!`; each wakeup is turned into a [`LoopEvent`] and handled
//! after the select so the controller is borrowed once at a time.

use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use emojichat_shared::RoomToken;
use emojichat_store::{Database, LocalStore, RealtimeStore, StoreError};

use crate::commands::{self, Command, Reply};
use crate::config::{ClientConfig, StoreLocation};
use crate::controller::{RoomController, RoomMode, RoomUpdate};
use crate::identity::{AnonymousAuth, IdentityError};
use crate::notices::Notice;
use crate::render::{self, TimelinePrinter};
use crate::session::SessionContext;

const INPUT_QUEUE: usize = 64;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error(transparent)]
    Identity(#[from] IdentityError),
}

enum LoopEvent {
    Update(RoomUpdate),
    /// `None` once stdin is closed.
    Input(Option<String>),
    Heartbeat,
    Poll,
    Shutdown,
}

pub fn open_store(location: &StoreLocation) -> Result<LocalStore, StoreError> {
    match location {
        StoreLocation::Memory => Ok(LocalStore::in_memory()),
        StoreLocation::Default => LocalStore::with_database(Database::new()?),
        StoreLocation::File(path) => {
            if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
                std::fs::create_dir_all(dir)?;
            }
            LocalStore::with_database(Database::open_at(path)?)
        }
    }
}

/// Prints views to stdout, each message once.
struct Screen {
    printer: TimelinePrinter,
    room: Option<RoomToken>,
}

impl Screen {
    fn new() -> Self {
        Self {
            printer: TimelinePrinter::new(),
            room: None,
        }
    }

    fn notice(&self, notice: &Notice) {
        println!("{}", render::format_notice(notice));
    }

    fn reply(&self, reply: &Reply) {
        match reply {
            Reply::Nothing | Reply::Quit => {}
            Reply::Notice(notice) => self.notice(notice),
            Reply::Lines(lines) => lines.iter().for_each(|line| println!("{line}")),
        }
    }

    /// Print whatever changed in the controller since the last refresh.
    fn refresh<S: RealtimeStore>(&mut self, controller: &mut RoomController<S>) {
        if controller.room() != self.room.as_ref() {
            self.printer.reset();
            self.room = controller.room().cloned();
        }

        for entry in self.printer.fresh(controller.timeline().entries()) {
            println!("{}", render::format_entry(entry, controller.user_id()));
        }

        if controller.identity_prompt() {
            self.notice(&Notice::error("Set your identity first! 📛 Use /nick <name>"));
            controller.dismiss_identity_prompt();
        }
    }
}

/// Run the client until `/quit`, end of input or Ctrl-C.
pub async fn run(config: ClientConfig) -> Result<(), AppError> {
    let store = open_store(&config.store)?;
    let auth = match &config.user_id {
        Some(id) => AnonymousAuth::with_user_id(id.clone()),
        None => AnonymousAuth::new(),
    };
    let session = SessionContext::establish(&auth, store).await?;

    let mode = match &config.fixed_room {
        Some(room) => RoomMode::Single(room.clone()),
        None => RoomMode::Multi,
    };
    let mut controller = RoomController::new(session, mode);
    let mut screen = Screen::new();

    println!("{} · only emojis allowed · /help for commands", emojichat_shared::constants::APP_NAME);

    match controller.restore_profile().await {
        Ok(Some(nickname)) => screen.notice(&Notice::success(format!("Welcome back, {nickname}!"))),
        Ok(None) => screen.notice(&Notice::success("Pick a nickname with /nick <name> 📛")),
        Err(e) => screen.notice(&Notice::failure("load profile", e)),
    }

    if let RoomMode::Single(room) = controller.mode().clone() {
        let reply = commands::rooms::join(&mut controller, room.as_str()).await;
        screen.reply(&reply);
    }

    let (input_tx, mut input_rx) = mpsc::channel::<String>(INPUT_QUEUE);
    // Blocking stdin reads live on their own thread.
    std::thread::spawn(move || {
        for line in std::io::stdin().lines() {
            match line {
                Ok(line) => {
                    if input_tx.blocking_send(line).is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(error = %e, "failed to read stdin");
                    break;
                }
            }
        }
    });

    let mut heartbeat = interval(config.heartbeat);
    heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);
    heartbeat.reset();
    let mut poll = interval(config.poll_interval);
    poll.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(user = %controller.user_id().short(), "client ready");

    loop {
        let event = tokio::select! {
            update = controller.next_update() => LoopEvent::Update(update),
            line = input_rx.recv() => LoopEvent::Input(line),
            _ = heartbeat.tick() => LoopEvent::Heartbeat,
            _ = poll.tick() => LoopEvent::Poll,
            _ = tokio::signal::ctrl_c() => LoopEvent::Shutdown,
        };

        match event {
            LoopEvent::Update(update) => {
                controller.apply(update);
            }
            LoopEvent::Input(None) | LoopEvent::Shutdown => break,
            LoopEvent::Input(Some(line)) => {
                let Some(command) = Command::parse(&line) else {
                    continue;
                };
                let reply = commands::dispatch(&mut controller, command, &config).await;
                if reply == Reply::Quit {
                    break;
                }
                screen.reply(&reply);
            }
            LoopEvent::Heartbeat => {
                if let Err(e) = controller.heartbeat().await {
                    warn!(error = %e, "presence heartbeat failed");
                }
            }
            LoopEvent::Poll => match controller.store().poll_external_changes() {
                Ok(true) => debug!("external changes picked up"),
                Ok(false) => {}
                Err(e) => warn!(error = %e, "failed to poll for external changes"),
            },
        }

        screen.refresh(&mut controller);
    }

    if controller.room().is_some() {
        if let Err(e) = controller.leave().await {
            warn!(error = %e, "failed to leave room on exit");
        }
    }
    info!("client stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_store_file_creates_parent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("chat.db");
        let store = open_store(&StoreLocation::File(path.clone())).unwrap();
        assert_eq!(store.listener_count(), 0);
        assert!(path.exists());
    }
}
