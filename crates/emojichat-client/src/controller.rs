//! Session and room controller.
//!
//! Owns the local nickname, the current room and its two subscriptions, and
//! the views built from them. User actions come in as method calls; store
//! notifications come in through [`RoomController::next_update`] and are fed
//! back with [`RoomController::apply`].

use thiserror::Error;
use tracing::{debug, info, warn};

use emojichat_shared::constants::{QUICK_EMOJIS, TRANSFER_BODY};
use emojichat_shared::content;
use emojichat_shared::protocol::{
    MessageRecord, UserProfile, MESSAGE_TIMESTAMP_FIELD, PROFILE_LAST_UPDATE_FIELD,
};
use emojichat_shared::{
    Codec, ContentRejection, Nickname, PresenceStatus, RoomToken, UserId, ValidationError,
};
use emojichat_store::{
    CollectionPath, DocumentId, DocumentWrite, RealtimeStore, Snapshot, StoreError,
    Subscription, WriteMode,
};

use crate::presence::{presence_write, PresenceTracker, RosterView};
use crate::session::SessionContext;
use crate::timeline::{Timeline, TimelineEntry};

#[derive(Error, Debug)]
pub enum ControllerError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Content(#[from] ContentRejection),

    #[error("Join a room first!")]
    NotInRoom,

    #[error("Set your identity first! 📛")]
    NicknameRequired,

    #[error("This client is locked to room {0}")]
    RoomLocked(RoomToken),

    #[error("No quick emoji at position {0}")]
    NoSuchEmoji(usize),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to encode record: {0}")]
    Encoding(#[from] serde_json::Error),
}

impl ControllerError {
    /// Local validation failures, as opposed to collaborator failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Content(_)
                | Self::NotInRoom
                | Self::NicknameRequired
                | Self::RoomLocked(_)
                | Self::NoSuchEmoji(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ControllerError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Unidentified,
    Identified,
    InRoom,
}

/// Whether the user picks rooms freely or the client is pinned to one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomMode {
    Multi,
    /// Joinable before a nickname exists; a send without one raises the
    /// identity prompt.
    Single(RoomToken),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Messages,
    Presence,
}

#[derive(Debug)]
pub enum RoomUpdate {
    Messages(Snapshot),
    Presence(Snapshot),
    /// The store side of a subscription went away.
    Closed(StreamKind),
}

struct ActiveRoom {
    token: RoomToken,
    codec: Codec,
    messages: Option<Subscription>,
    presence: Option<Subscription>,
}

impl ActiveRoom {
    fn messages_path(&self) -> CollectionPath {
        CollectionPath::room_messages(&self.token)
    }

    fn presence_path(&self) -> CollectionPath {
        CollectionPath::room_presence(&self.token)
    }

    fn close(&mut self) {
        if let Some(sub) = self.messages.take() {
            sub.unsubscribe();
        }
        if let Some(sub) = self.presence.take() {
            sub.unsubscribe();
        }
    }
}

pub struct RoomController<S> {
    session: SessionContext<S>,
    mode: RoomMode,
    nickname: Option<Nickname>,
    room: Option<ActiveRoom>,
    timeline: Timeline,
    presence: PresenceTracker,
    status: PresenceStatus,
    draft: String,
    identity_prompt: bool,
}

impl<S: RealtimeStore> RoomController<S> {
    pub fn new(session: SessionContext<S>, mode: RoomMode) -> Self {
        Self {
            session,
            mode,
            nickname: None,
            room: None,
            timeline: Timeline::new(),
            presence: PresenceTracker::new(),
            status: PresenceStatus::Online,
            draft: String::new(),
            identity_prompt: false,
        }
    }

    // -----------------------------------------------------------------------
    // State
    // -----------------------------------------------------------------------

    pub fn state(&self) -> SessionState {
        match (&self.room, &self.nickname) {
            (Some(_), _) => SessionState::InRoom,
            (None, Some(_)) => SessionState::Identified,
            (None, None) => SessionState::Unidentified,
        }
    }

    pub fn user_id(&self) -> &UserId {
        self.session.user_id()
    }

    pub fn store(&self) -> &S {
        self.session.store()
    }

    pub fn mode(&self) -> &RoomMode {
        &self.mode
    }

    pub fn nickname(&self) -> Option<&Nickname> {
        self.nickname.as_ref()
    }

    pub fn room(&self) -> Option<&RoomToken> {
        self.room.as_ref().map(|r| &r.token)
    }

    pub fn status(&self) -> PresenceStatus {
        self.status
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn roster(&self) -> &RosterView {
        self.presence.roster()
    }

    /// Set when the user must be asked for a nickname before going on.
    pub fn identity_prompt(&self) -> bool {
        self.identity_prompt
    }

    pub fn dismiss_identity_prompt(&mut self) {
        self.identity_prompt = false;
    }

    // -----------------------------------------------------------------------
    // Identity
    // -----------------------------------------------------------------------

    /// Load the nickname saved by an earlier session, if any.
    pub async fn restore_profile(&mut self) -> Result<Option<&Nickname>> {
        let id = self.profile_id();
        let Some(doc) = self.store().get(&CollectionPath::users(), &id).await? else {
            return Ok(None);
        };

        let restored = doc
            .parse::<UserProfile>()
            .map_err(|e| e.to_string())
            .and_then(|profile| Nickname::parse(&profile.nickname).map_err(|e| e.to_string()));
        match restored {
            Ok(nickname) => {
                info!(nickname = %nickname, "restored saved nickname");
                self.nickname = Some(nickname);
            }
            Err(e) => warn!(error = %e, "ignoring unusable saved profile"),
        }
        Ok(self.nickname.as_ref())
    }

    /// Validate and persist a nickname. On any failure the current nickname
    /// is kept.
    pub async fn save_nickname(&mut self, input: &str) -> Result<&Nickname> {
        let nickname = Nickname::parse(input)?;

        let profile = UserProfile::new(self.user_id().clone(), &nickname);
        let write =
            DocumentWrite::new(profile.to_fields()?).with_server_timestamp(PROFILE_LAST_UPDATE_FIELD);
        self.store()
            .set(&CollectionPath::users(), &self.profile_id(), write, WriteMode::Merge)
            .await?;

        info!(nickname = %nickname, "nickname saved");
        self.nickname = Some(nickname);
        self.identity_prompt = false;

        if self.room.is_some() {
            if let Err(e) = self.publish_presence(self.status).await {
                warn!(error = %e, "failed to republish presence after rename");
            }
        }

        Ok(self.nickname.as_ref().ok_or(ControllerError::NicknameRequired)?)
    }

    // -----------------------------------------------------------------------
    // Rooms
    // -----------------------------------------------------------------------

    /// Enter `input`'s room, leaving the current one first. Views start empty
    /// and fill from the initial snapshots.
    pub async fn join(&mut self, input: &str) -> Result<&RoomToken> {
        let token = RoomToken::parse(input)?;
        match &self.mode {
            RoomMode::Single(fixed) if fixed != &token => {
                return Err(ControllerError::RoomLocked(fixed.clone()));
            }
            RoomMode::Multi if self.nickname.is_none() => {
                return Err(ControllerError::NicknameRequired);
            }
            _ => {}
        }

        // Subscribe before touching the current room so a failure leaves it
        // intact.
        let messages = self.store().subscribe(&CollectionPath::room_messages(&token))?;
        let presence = self.store().subscribe(&CollectionPath::room_presence(&token))?;

        if self.room.is_some() {
            if let Err(e) = self.leave().await {
                warn!(error = %e, "failed to leave previous room");
            }
        }

        info!(room = %token, "joined room");
        self.timeline.clear();
        self.presence.clear();
        self.status = PresenceStatus::Online;
        self.room = Some(ActiveRoom {
            codec: Codec::for_room(&token),
            token,
            messages: Some(messages),
            presence: Some(presence),
        });

        if let Err(e) = self.publish_presence(PresenceStatus::Online).await {
            warn!(error = %e, "failed to publish presence on join");
        }

        self.room()
            .ok_or(ControllerError::NotInRoom)
    }

    /// Leave the current room. The offline status is published best-effort.
    pub async fn leave(&mut self) -> Result<()> {
        if self.room.is_none() {
            return Err(ControllerError::NotInRoom);
        }

        if let Err(e) = self.publish_presence(PresenceStatus::Offline).await {
            warn!(error = %e, "failed to publish offline status");
        }

        if let Some(mut room) = self.room.take() {
            room.close();
            info!(room = %room.token, "left room");
        }
        self.timeline.clear();
        self.presence.clear();
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Drafts and sending
    // -----------------------------------------------------------------------

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn append_to_draft(&mut self, text: &str) {
        self.draft.push_str(text);
    }

    pub fn clear_draft(&mut self) {
        self.draft.clear();
    }

    /// Append the palette entry at `index` (zero-based) to the draft.
    pub fn pick_quick_emoji(&mut self, index: usize) -> Result<&'static str> {
        let emoji = QUICK_EMOJIS
            .get(index)
            .copied()
            .ok_or(ControllerError::NoSuchEmoji(index + 1))?;
        self.draft.push_str(emoji);
        Ok(emoji)
    }

    /// Encode and write `body` to the current room. The write is not retried;
    /// the message shows up as pending until a snapshot carries it.
    pub async fn send(&mut self, body: &str) -> Result<DocumentId> {
        let Some(room) = &self.room else {
            return Err(ControllerError::NotInRoom);
        };
        content::check(body)?;
        let Some(nickname) = &self.nickname else {
            if matches!(self.mode, RoomMode::Single(_)) {
                self.identity_prompt = true;
            }
            return Err(ControllerError::NicknameRequired);
        };

        let body = body.trim();
        let record = MessageRecord::new(self.user_id().clone(), nickname, room.codec.encode(body));
        let write = DocumentWrite::new(record.to_fields()?).with_server_timestamp(MESSAGE_TIMESTAMP_FIELD);

        let id = match self.store().add(&room.messages_path(), write).await {
            Ok(id) => id,
            Err(e) => {
                warn!(room = %room.token, error = %e, "message write failed");
                return Err(e.into());
            }
        };
        info!(room = %room.token, id = %id, "message sent");

        self.timeline.insert_pending(TimelineEntry {
            id: id.clone(),
            user_id: record.user_id,
            nickname: record.user_nickname,
            content: body.to_string(),
            timestamp: None,
            local: true,
        });
        Ok(id)
    }

    /// Send the draft, clearing it only when the write was issued.
    pub async fn send_draft(&mut self) -> Result<DocumentId> {
        let body = self.draft.clone();
        let id = self.send(&body).await?;
        self.draft.clear();
        Ok(id)
    }

    /// Send the canned money transfer. Asks for a nickname first if unset.
    pub async fn send_transfer(&mut self) -> Result<DocumentId> {
        if self.nickname.is_none() {
            self.identity_prompt = true;
            return Err(ControllerError::NicknameRequired);
        }
        self.send(TRANSFER_BODY).await
    }

    // -----------------------------------------------------------------------
    // Presence
    // -----------------------------------------------------------------------

    /// Change our status in the current room. Without a nickname the status
    /// is kept locally and published once one is saved.
    pub async fn set_status(&mut self, status: PresenceStatus) -> Result<()> {
        if self.room.is_none() {
            return Err(ControllerError::NotInRoom);
        }
        self.status = status;
        self.publish_presence(status).await
    }

    /// Refresh `lastSeen`. Returns whether anything was written.
    pub async fn heartbeat(&mut self) -> Result<bool> {
        if self.room.is_none() || self.nickname.is_none() {
            return Ok(false);
        }
        self.publish_presence(self.status).await?;
        Ok(true)
    }

    async fn publish_presence(&self, status: PresenceStatus) -> Result<()> {
        let (Some(room), Some(nickname)) = (&self.room, &self.nickname) else {
            return Ok(());
        };
        let write = presence_write(nickname, status)?;
        self.store()
            .set(&room.presence_path(), &self.profile_id(), write, WriteMode::Merge)
            .await?;
        debug!(room = %room.token, status = %status, "presence published");
        Ok(())
    }

    fn profile_id(&self) -> DocumentId {
        DocumentId(self.user_id().as_str().to_string())
    }

    // -----------------------------------------------------------------------
    // Notifications
    // -----------------------------------------------------------------------

    /// Wait for the next snapshot from either stream of the current room.
    /// Never resolves while outside a room.
    pub async fn next_update(&mut self) -> RoomUpdate {
        let Some(room) = self.room.as_mut() else {
            return std::future::pending().await;
        };

        tokio::select! {
            snapshot = recv_from(&mut room.messages) => match snapshot {
                Some(snapshot) => RoomUpdate::Messages(snapshot),
                None => RoomUpdate::Closed(StreamKind::Messages),
            },
            snapshot = recv_from(&mut room.presence) => match snapshot {
                Some(snapshot) => RoomUpdate::Presence(snapshot),
                None => RoomUpdate::Closed(StreamKind::Presence),
            },
        }
    }

    /// Fold an update into the views. Returns whether a view changed.
    pub fn apply(&mut self, update: RoomUpdate) -> bool {
        let Some(room) = self.room.as_mut() else {
            return false;
        };

        match update {
            RoomUpdate::Messages(snapshot) if snapshot.path == room.messages_path() => {
                self.timeline.apply_snapshot(&snapshot, &room.codec);
                true
            }
            RoomUpdate::Presence(snapshot) if snapshot.path == room.presence_path() => {
                self.presence.on_snapshot(&snapshot);
                true
            }
            RoomUpdate::Messages(snapshot) | RoomUpdate::Presence(snapshot) => {
                debug!(path = %snapshot.path, "ignoring snapshot for another room");
                false
            }
            RoomUpdate::Closed(kind) => {
                warn!(room = %room.token, stream = ?kind, "subscription closed by store");
                match kind {
                    StreamKind::Messages => room.messages = None,
                    StreamKind::Presence => room.presence = None,
                }
                false
            }
        }
    }

    /// Apply whatever snapshots are already queued, newest per stream only.
    /// Returns how many were applied.
    pub fn sync(&mut self) -> usize {
        let Some(room) = self.room.as_mut() else {
            return 0;
        };
        let messages = room.messages.as_mut().and_then(Subscription::try_latest);
        let presence = room.presence.as_mut().and_then(Subscription::try_latest);

        let mut applied = 0;
        if let Some(snapshot) = messages {
            applied += usize::from(self.apply(RoomUpdate::Messages(snapshot)));
        }
        if let Some(snapshot) = presence {
            applied += usize::from(self.apply(RoomUpdate::Presence(snapshot)));
        }
        applied
    }
}

async fn recv_from(sub: &mut Option<Subscription>) -> Option<Snapshot> {
    match sub {
        Some(sub) => sub.recv().await,
        None => std::future::pending().await,
    }
}
