//! Zap, comment and reaction operations.

use chrono::{DateTime, Utc};
use tracing::info;
use zap_types::api::{CreateZapResponse, ReactionImageResponse};
use zap_types::id::{Prefix, TypeId, new_id};
use zap_types::models::{
    Comment, Reaction, ReactionImage, ReactionKind, User, Zap, ZapSide,
};

use crate::Settings;
use crate::access::AccessEvaluator;
use crate::assets::{AssetLocator, Bucket, reaction_key, zap_key};
use crate::error::{CoreError, CoreResult};
use crate::moments::MomentResolver;
use crate::store::Store;

pub const MAX_COMMENT_CHARS: usize = 500;

pub struct ZapService<'a> {
    store: &'a dyn Store,
    assets: &'a dyn AssetLocator,
    settings: &'a Settings,
}

impl<'a> ZapService<'a> {
    pub fn new(store: &'a dyn Store, assets: &'a dyn AssetLocator, settings: &'a Settings) -> Self {
        Self {
            store,
            assets,
            settings,
        }
    }

    /// Creates a Zap in the requester's current regional Moment.
    ///
    /// `timestamp_ms` is the capture time and ends up in the id. A repost
    /// points at the original even when `repost_of` is itself a repost, is
    /// uploaded from the start and gets no upload URLs.
    pub fn create(
        &self,
        user: &User,
        timestamp_ms: Option<i64>,
        repost_of: Option<&str>,
        now: DateTime<Utc>,
    ) -> CoreResult<CreateZapResponse> {
        let moment = MomentResolver::new(self.store).active(user.region, now)?;
        let timestamp = timestamp_ms.unwrap_or_else(|| now.timestamp_millis());
        let id = u64::try_from(timestamp)
            .ok()
            .and_then(|ms| TypeId::at(Prefix::Zap, ms).ok())
            .ok_or_else(|| CoreError::Validation(format!("invalid timestamp {}", timestamp)))?
            .to_string();

        if let Some(target_id) = repost_of {
            let target = self.visible_zap(user, target_id)?;
            let original_id = target.repost_id.unwrap_or(target.id);
            self.store.create_zap(&Zap {
                id: id.clone(),
                moment_id: moment.id,
                author_id: user.id.clone(),
                uploaded: true,
                repost_id: Some(original_id.clone()),
            })?;
            info!("User {} reposted {} as {}", user.id, original_id, id);
            return Ok(CreateZapResponse {
                zap_id: id,
                upload_front_url: None,
                upload_back_url: None,
            });
        }

        let zap = Zap {
            id: id.clone(),
            moment_id: moment.id,
            author_id: user.id.clone(),
            uploaded: false,
            repost_id: None,
        };
        self.store.create_zap(&zap)?;
        info!("User {} created zap {} in {}", user.id, zap.id, zap.moment_id);

        let upload = |side| {
            self.assets.presign_upload(
                Bucket::Zaps,
                &zap_key(&zap.moment_id, &zap.author_id, &zap.id, side),
                self.settings.url_ttl,
            )
        };
        Ok(CreateZapResponse {
            upload_front_url: Some(upload(ZapSide::Front)?),
            upload_back_url: Some(upload(ZapSide::Back)?),
            zap_id: id,
        })
    }

    pub fn mark_uploaded(&self, user: &User, zap_id: &str) -> CoreResult<()> {
        let zap = self.existing_zap(zap_id)?;
        if zap.author_id != user.id {
            return Err(CoreError::Forbidden("not the author of this zap".into()));
        }
        self.store.mark_zap_uploaded(zap_id)?;
        Ok(())
    }

    /// Presigned URL of one side of a Zap, while its Moment is still current
    /// for the author's region.
    pub fn image(
        &self,
        user: &User,
        zap_id: &str,
        side: ZapSide,
        now: DateTime<Utc>,
    ) -> CoreResult<String> {
        let zap = self.visible_zap(user, zap_id)?;
        let author = self
            .store
            .user(&zap.author_id)?
            .ok_or_else(|| CoreError::not_found("user", &zap.author_id))?;
        let current = MomentResolver::new(self.store).active(author.region, now)?;
        if current.id != zap.moment_id {
            return Err(CoreError::Forbidden("the moment of this zap has passed".into()));
        }

        let stored = match &zap.repost_id {
            Some(original_id) => self.existing_zap(original_id)?,
            None => zap,
        };
        Ok(self.assets.presign(
            Bucket::Zaps,
            &zap_key(&stored.moment_id, &stored.author_id, &stored.id, side),
            self.settings.url_ttl,
        )?)
    }

    pub fn add_comment(&self, user: &User, zap_id: &str, content: &str) -> CoreResult<String> {
        let content = content.trim();
        let len = content.chars().count();
        if len == 0 || len > MAX_COMMENT_CHARS {
            return Err(CoreError::Validation(format!(
                "comment must be 1 to {} characters",
                MAX_COMMENT_CHARS
            )));
        }
        let zap = self.visible_zap(user, zap_id)?;
        let comment = Comment {
            id: new_id(Prefix::Comment),
            zap_id: zap.id,
            author_id: user.id.clone(),
            content: content.to_string(),
        };
        self.store.create_comment(&comment)?;
        Ok(comment.id)
    }

    pub fn create_reaction_image(
        &self,
        user: &User,
        kind: ReactionKind,
    ) -> CoreResult<ReactionImageResponse> {
        let image = ReactionImage {
            id: new_id(Prefix::ReactionImage),
            author_id: user.id.clone(),
            kind,
            uploaded: false,
        };
        self.store.create_reaction_image(&image)?;
        let upload_url = self.assets.presign_upload(
            Bucket::Reactions,
            &reaction_key(&image.author_id, kind, &image.id),
            self.settings.url_ttl,
        )?;
        Ok(ReactionImageResponse {
            image_id: image.id,
            upload_url,
        })
    }

    pub fn mark_reaction_image_uploaded(&self, user: &User, image_id: &str) -> CoreResult<()> {
        let image = self
            .store
            .reaction_image(image_id)?
            .ok_or_else(|| CoreError::not_found("reaction image", image_id))?;
        if image.author_id != user.id {
            return Err(CoreError::Forbidden("not the author of this image".into()));
        }
        self.store.mark_reaction_image_uploaded(image_id)?;
        Ok(())
    }

    pub fn add_reaction(
        &self,
        user: &User,
        zap_id: &str,
        kind: ReactionKind,
        image_id: &str,
    ) -> CoreResult<String> {
        let zap = self.visible_zap(user, zap_id)?;
        let image = self
            .store
            .reaction_image(image_id)?
            .ok_or_else(|| CoreError::not_found("reaction image", image_id))?;
        if image.author_id != user.id {
            return Err(CoreError::Forbidden("not the author of this image".into()));
        }
        if image.kind != kind {
            return Err(CoreError::Validation(format!(
                "image {} is a {} reaction",
                image_id,
                image.kind.as_str()
            )));
        }
        let reaction = Reaction {
            id: new_id(Prefix::Reaction),
            zap_id: zap.id,
            author_id: user.id.clone(),
            kind,
            image_id: image.id,
        };
        self.store.create_reaction(&reaction)?;
        Ok(reaction.id)
    }

    /// Presigned URL of a reaction's image. Not-yet-uploaded images read as
    /// not found.
    pub fn reaction_image(&self, user: &User, reaction_id: &str) -> CoreResult<String> {
        let reaction = self.existing_reaction(reaction_id)?;
        let image = self
            .store
            .reaction_image(&reaction.image_id)?
            .filter(|i| i.uploaded)
            .ok_or_else(|| CoreError::not_found("reaction image", &reaction.image_id))?;
        if !AccessEvaluator::new(self.store).can_view_reaction(&user.id, &reaction)? {
            return Err(CoreError::Unauthorized);
        }
        Ok(self.assets.presign(
            Bucket::Reactions,
            &reaction_key(&image.author_id, image.kind, &image.id),
            self.settings.url_ttl,
        )?)
    }

    pub fn delete_reaction(&self, user: &User, reaction_id: &str) -> CoreResult<()> {
        let reaction = self.existing_reaction(reaction_id)?;
        if reaction.author_id != user.id {
            return Err(CoreError::Unauthorized);
        }
        if !self.store.delete_reaction(reaction_id)? {
            return Err(CoreError::not_found("reaction", reaction_id));
        }
        Ok(())
    }

    fn existing_zap(&self, id: &str) -> CoreResult<Zap> {
        self.store
            .zap(id)?
            .ok_or_else(|| CoreError::not_found("zap", id))
    }

    fn existing_reaction(&self, id: &str) -> CoreResult<Reaction> {
        self.store
            .reaction(id)?
            .ok_or_else(|| CoreError::not_found("reaction", id))
    }

    /// Uploaded and visible to `user` under the content rule. A pending
    /// upload reads as not found.
    fn visible_zap(&self, user: &User, id: &str) -> CoreResult<Zap> {
        let zap = self
            .store
            .zap(id)?
            .filter(|z| z.uploaded)
            .ok_or_else(|| CoreError::not_found("zap", id))?;
        if !AccessEvaluator::new(self.store).can_view_zap(&user.id, &zap)? {
            return Err(CoreError::Unauthorized);
        }
        Ok(zap)
    }
}
