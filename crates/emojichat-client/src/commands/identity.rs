use emojichat_store::RealtimeStore;

use crate::commands::Reply;
use crate::controller::RoomController;
use crate::notices::Notice;

pub async fn nick<S: RealtimeStore>(controller: &mut RoomController<S>, input: &str) -> Reply {
    match controller.save_nickname(input).await {
        Ok(nickname) => Reply::Notice(Notice::success(format!("Identity set: {nickname} 📛"))),
        Err(e) => Reply::from_error("save nickname", &e),
    }
}
