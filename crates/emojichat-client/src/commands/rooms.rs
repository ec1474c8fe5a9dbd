use chrono::Utc;

use emojichat_shared::PresenceStatus;
use emojichat_store::RealtimeStore;

use crate::commands::Reply;
use crate::config::ClientConfig;
use crate::controller::RoomController;
use crate::notices::Notice;
use crate::render;

pub async fn join<S: RealtimeStore>(controller: &mut RoomController<S>, input: &str) -> Reply {
    match controller.join(input).await {
        Ok(room) => Reply::Notice(Notice::success(format!("Joined room {room} 🚪"))),
        Err(e) => Reply::from_error("join room", &e),
    }
}

pub async fn leave<S: RealtimeStore>(controller: &mut RoomController<S>) -> Reply {
    let room = controller.room().cloned();
    match controller.leave().await {
        Ok(()) => match room {
            Some(room) => Reply::Notice(Notice::success(format!("Left room {room} 👋"))),
            None => Reply::Nothing,
        },
        Err(e) => Reply::from_error("leave room", &e),
    }
}

pub async fn status<S: RealtimeStore>(controller: &mut RoomController<S>, input: &str) -> Reply {
    let status: PresenceStatus = match input.trim().parse() {
        Ok(status) => status,
        Err(e) => return Reply::Notice(Notice::error(e)),
    };
    match controller.set_status(status).await {
        Ok(()) => Reply::Notice(Notice::success(format!("Status set to {status}"))),
        Err(e) => Reply::from_error("update status", &e),
    }
}

pub fn who<S: RealtimeStore>(controller: &RoomController<S>, config: &ClientConfig) -> Reply {
    if controller.room().is_none() {
        return Reply::Notice(Notice::error("Join a room first!"));
    }
    Reply::Lines(render::format_roster(
        controller.roster(),
        controller.user_id(),
        Utc::now(),
        config.stale_after(),
    ))
}
