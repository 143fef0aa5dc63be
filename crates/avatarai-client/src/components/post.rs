//! Post composer and the media draft it shares with feed replies.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use avatarai_net::ApiClient;
use avatarai_shared::constants::{MAX_IMAGES, POST_COUNTER_ERROR, POST_COUNTER_WARNING, POST_LANGS};
use avatarai_shared::feed::{BlobRef, CreateMoment, EmbedExternal};
use avatarai_shared::richtext::{extract_tags, parse_facets};
use avatarai_shared::validate::{validate_text, validate_url, MediaKind, TextField};
use avatarai_shared::ValidationError;

use crate::error::{ClientError, Result};
use crate::events::{EventSink, UiEvent};
use crate::media::{self, MediaFile, StagedMedia};

/// Colour of the character counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterLevel {
    Normal,
    Warning,
    Error,
}

impl CounterLevel {
    pub fn for_count(count: usize) -> Self {
        if count > POST_COUNTER_ERROR {
            CounterLevel::Error
        } else if count > POST_COUNTER_WARNING {
            CounterLevel::Warning
        } else {
            CounterLevel::Normal
        }
    }
}

/// Media attached to a post or reply being written. Images, a video and an
/// external link are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Draft {
    pub images: Vec<StagedMedia>,
    pub video: Option<StagedMedia>,
    pub external: Option<EmbedExternal>,
}

impl Draft {
    pub fn has_media(&self) -> bool {
        !self.images.is_empty() || self.video.is_some() || self.external.is_some()
    }

    /// Validate `text` against the draft and build the request body.
    pub fn to_request(&self, text: &str, parent_id: Option<&str>) -> std::result::Result<CreateMoment, ValidationError> {
        let text = text.trim();
        if text.is_empty() && !self.has_media() {
            return Err(ValidationError::Required("Text or media"));
        }
        validate_text(TextField::Post, text)?;

        Ok(CreateMoment {
            text: text.to_string(),
            facets: parse_facets(text),
            langs: POST_LANGS.iter().map(|l| l.to_string()).collect(),
            tags: extract_tags(text),
            images: self
                .images
                .iter()
                .map(|m| BlobRef { cid: m.cid.clone() })
                .collect(),
            video: self.video.as_ref().map(|m| BlobRef { cid: m.cid.clone() }),
            external: self.external.clone(),
            parent_id: parent_id.map(str::to_string),
        })
    }
}

/// Validate and upload `files` as images for `draft`, one after another.
/// A file that fails is reported and skipped; the rest still upload.
pub(crate) async fn stage_images(
    api: &ApiClient,
    events: &EventSink,
    draft: &Mutex<Draft>,
    files: Vec<MediaFile>,
) -> Result<usize> {
    let existing = lock(draft).images.len();
    if existing + files.len() > MAX_IMAGES {
        let err = ValidationError::TooManyImages(MAX_IMAGES);
        events.error(err.to_string());
        return Err(err.into());
    }

    let mut staged = 0;
    for file in files {
        let name = file.file_name.clone();
        match media::upload(api, MediaKind::Image, file).await {
            Ok(item) => {
                let mut draft = lock(draft);
                draft.video = None;
                draft.external = None;
                draft.images.push(item);
                staged += 1;
            }
            Err(ClientError::Validation(e)) => events.error(e.to_string()),
            Err(e) => {
                warn!(file = %name, error = %e, "Image upload failed");
                events.error(format!("Failed to upload {name}: {e}"));
                if e.is_auth_failure() {
                    return Err(e);
                }
            }
        }
    }
    Ok(staged)
}

/// Validate and upload a single video for `draft`, replacing other media.
pub(crate) async fn stage_video(
    api: &ApiClient,
    events: &EventSink,
    draft: &Mutex<Draft>,
    file: MediaFile,
) -> Result<StagedMedia> {
    let staged = match media::upload(api, MediaKind::Video, file).await {
        Ok(staged) => staged,
        Err(e) => {
            events.error(e.to_string());
            return Err(e);
        }
    };
    let mut draft = lock(draft);
    draft.images.clear();
    draft.external = None;
    draft.video = Some(staged.clone());
    Ok(staged)
}

fn lock(draft: &Mutex<Draft>) -> MutexGuard<'_, Draft> {
    draft.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
pub struct PostComposer {
    api: ApiClient,
    events: EventSink,
    draft: Arc<Mutex<Draft>>,
}

impl PostComposer {
    pub fn new(api: ApiClient, events: EventSink) -> Self {
        Self {
            api,
            events,
            draft: Arc::new(Mutex::new(Draft::default())),
        }
    }

    /// Update the character counter for the text being typed.
    pub fn on_text_changed(&self, text: &str) -> CounterLevel {
        let count = text.chars().count();
        let level = CounterLevel::for_count(count);
        self.events.emit(UiEvent::CharCounter { count, level });
        level
    }

    pub async fn add_images(&self, files: Vec<MediaFile>) -> Result<usize> {
        stage_images(&self.api, &self.events, &self.draft, files).await
    }

    pub async fn set_video(&self, file: MediaFile) -> Result<StagedMedia> {
        stage_video(&self.api, &self.events, &self.draft, file).await
    }

    /// Attach an external link, replacing other media.
    pub fn set_external(&self, url: &str) -> Result<()> {
        let url = url.trim();
        let checked = if url.is_empty() {
            Err(ValidationError::Required("URL"))
        } else {
            validate_url(url)
        };
        if let Err(e) = checked {
            self.events.error(e.to_string());
            return Err(e.into());
        }

        let mut draft = lock(&self.draft);
        draft.images.clear();
        draft.video = None;
        draft.external = Some(EmbedExternal::from_url(url));
        Ok(())
    }

    pub fn remove_image(&self, index: usize) -> Option<StagedMedia> {
        let mut draft = lock(&self.draft);
        (index < draft.images.len()).then(|| draft.images.remove(index))
    }

    /// Discard every staged attachment.
    pub fn clear_media(&self) {
        *lock(&self.draft) = Draft::default();
    }

    pub fn draft(&self) -> Draft {
        lock(&self.draft).clone()
    }

    /// Publish `text` with the staged media. Returns whether a post was made.
    pub async fn submit(&self, text: &str) -> Result<bool> {
        let request = match self.draft().to_request(text, None) {
            Ok(request) => request,
            Err(ValidationError::Required(_)) => {
                self.events.warning("Enter some text or add media");
                return Ok(false);
            }
            Err(e) => {
                self.events.error(e.to_string());
                return Err(e.into());
            }
        };

        if let Err(e) = self.api.create_moment(&request).await {
            self.events.error(format!("Failed to publish: {e}"));
            return Err(e.into());
        }

        info!(
            chars = request.text.chars().count(),
            images = request.images.len(),
            "Moment published"
        );
        self.clear_media();
        self.on_text_changed("");
        self.events.success("Post published");
        Ok(true)
    }
}
