//! Profile editor: display name, description, avatar and banner.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::info;

use avatarai_net::ApiClient;
use avatarai_shared::feed::UpdateProfile;
use avatarai_shared::types::blob_url;
use avatarai_shared::validate::{validate_text, MediaKind, TextField};
use avatarai_shared::{Session, User};

use crate::error::{ClientError, Result};
use crate::events::{EventSink, UiEvent};
use crate::media::{self, MediaFile, StagedMedia};
use crate::state::Store;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileDraft {
    pub avatar: Option<StagedMedia>,
    pub banner: Option<StagedMedia>,
}

#[derive(Clone)]
pub struct ProfileEditor {
    session: Session,
    api: ApiClient,
    store: Store,
    events: EventSink,
    draft: Arc<Mutex<ProfileDraft>>,
}

impl ProfileEditor {
    pub fn new(session: Session, api: ApiClient, store: Store, events: EventSink) -> Self {
        Self {
            session,
            api,
            store,
            events,
            draft: Arc::new(Mutex::new(ProfileDraft::default())),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ProfileDraft> {
        self.draft.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Start editing. Returns the current user to prefill the form.
    pub fn open(&self) -> Result<User> {
        *self.lock() = ProfileDraft::default();
        self.session.current_user().ok_or(ClientError::NotSignedIn)
    }

    pub async fn stage_avatar(&self, file: MediaFile) -> Result<StagedMedia> {
        let staged = self.stage(MediaKind::Avatar, file).await?;
        self.lock().avatar = Some(staged.clone());
        Ok(staged)
    }

    pub async fn stage_banner(&self, file: MediaFile) -> Result<StagedMedia> {
        let staged = self.stage(MediaKind::Banner, file).await?;
        self.lock().banner = Some(staged.clone());
        Ok(staged)
    }

    async fn stage(&self, kind: MediaKind, file: MediaFile) -> Result<StagedMedia> {
        media::upload(&self.api, kind, file).await.map_err(|e| {
            self.events.error(e.to_string());
            e
        })
    }

    pub fn draft(&self) -> ProfileDraft {
        self.lock().clone()
    }

    /// Save the filled-in fields. Blank fields are left unchanged.
    pub async fn submit(&self, display_name: &str, description: &str) -> Result<bool> {
        let display_name = display_name.trim();
        let description = description.trim();
        let checked = validate_text(TextField::DisplayName, display_name)
            .and_then(|_| validate_text(TextField::Description, description));
        if let Err(e) = checked {
            self.events.error(e.to_string());
            return Err(e.into());
        }

        let draft = self.draft();
        let non_empty = |s: &str| (!s.is_empty()).then(|| s.to_string());
        let update = UpdateProfile {
            display_name: non_empty(display_name),
            description: non_empty(description),
            avatar_cid: draft.avatar.as_ref().map(|m| m.cid.clone()),
            banner_cid: draft.banner.as_ref().map(|m| m.cid.clone()),
        };
        if update.is_empty() {
            self.events.info("Nothing to update");
            return Ok(false);
        }

        if let Err(e) = self.api.update_profile(&update).await {
            self.events.error(format!("Failed to update profile: {e}"));
            return Err(e.into());
        }

        let user = self
            .session
            .update_user(|user| {
                if let Some(name) = &update.display_name {
                    user.display_name = Some(name.clone());
                }
                if let Some(text) = &update.description {
                    user.description = Some(text.clone());
                }
                if let Some(cid) = &update.avatar_cid {
                    user.avatar = Some(blob_url(cid));
                }
                if let Some(cid) = &update.banner_cid {
                    user.banner = Some(blob_url(cid));
                }
            })
            .ok_or(ClientError::NotSignedIn)?;
        self.store.with(|db| db.store_user(&user))?;

        info!(did = %user.did, "Profile updated");
        *self.lock() = ProfileDraft::default();
        self.events.emit(UiEvent::ProfileUpdated(user));
        self.events.success("Profile updated");
        Ok(true)
    }
}
