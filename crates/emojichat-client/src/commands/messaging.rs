use emojichat_store::RealtimeStore;

use crate::commands::Reply;
use crate::controller::{ControllerError, RoomController};
use crate::notices::Notice;

/// Send a typed line on its own. If the write fails for any reason other
/// than the content rule, the line becomes the draft for `/send`.
pub async fn say<S: RealtimeStore>(controller: &mut RoomController<S>, text: &str) -> Reply {
    match controller.send(text).await {
        Ok(_) => Reply::Nothing,
        Err(e) => {
            if !matches!(e, ControllerError::Content(_)) {
                controller.set_draft(text);
            }
            Reply::from_error("send message", &e)
        }
    }
}

pub async fn send_draft<S: RealtimeStore>(controller: &mut RoomController<S>) -> Reply {
    match controller.send_draft().await {
        Ok(_) => Reply::Nothing,
        Err(e) => Reply::from_error("send message", &e),
    }
}

pub fn pick<S: RealtimeStore>(controller: &mut RoomController<S>, input: &str) -> Reply {
    let index = match input.trim().parse::<usize>() {
        Ok(n) if n >= 1 => n - 1,
        _ => return Reply::Notice(Notice::error("Pick a palette number, see /palette")),
    };
    match controller.pick_quick_emoji(index) {
        Ok(_) => Reply::Notice(Notice::success(format!("Draft: {}", controller.draft()))),
        Err(e) => Reply::from_error("pick emoji", &e),
    }
}

pub async fn transfer<S: RealtimeStore>(controller: &mut RoomController<S>) -> Reply {
    match controller.send_transfer().await {
        Ok(_) => Reply::Notice(Notice::success("Sent $100 💰")),
        Err(e) => Reply::from_error("send transfer", &e),
    }
}
