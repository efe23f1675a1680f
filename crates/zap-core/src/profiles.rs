//! Profile reads and profile pictures.

use tracing::info;
use zap_types::api::{Author, ProfileResponse};
use zap_types::models::User;

use crate::Settings;
use crate::access::{AccessEvaluator, Rule};
use crate::assets::{AssetLocator, Bucket, avatar_key, profile_picture_url};
use crate::error::{CoreError, CoreResult};
use crate::invites;
use crate::store::Store;

pub fn author_view(user: &User, public_url: &str) -> Author {
    Author {
        id: user.id.clone(),
        handle: user.handle.clone(),
        first_name: user.first_name.clone(),
        last_name: user.last_name.clone(),
        region: user.region,
        profile_picture_url: profile_picture_url(public_url, &user.id, user.profile_picture_version),
    }
}

pub struct ProfileService<'a> {
    store: &'a dyn Store,
    assets: &'a dyn AssetLocator,
    settings: &'a Settings,
}

impl<'a> ProfileService<'a> {
    pub fn new(store: &'a dyn Store, assets: &'a dyn AssetLocator, settings: &'a Settings) -> Self {
        Self {
            store,
            assets,
            settings,
        }
    }

    /// The requester's own profile. Creates their invite on first read.
    pub fn profile(&self, user: &User) -> CoreResult<ProfileResponse> {
        let invite = invites::ensure_user_invite(self.store, &user.id)?;
        Ok(ProfileResponse {
            id: user.id.clone(),
            handle: user.handle.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            region: user.region,
            picture_url: profile_picture_url(
                &self.settings.public_url,
                &user.id,
                user.profile_picture_version,
            ),
            invite_url: invite
                .code
                .map(|code| invites::invite_url(&self.settings.public_url, &code)),
        })
    }

    pub fn user(&self, id: &str) -> CoreResult<Author> {
        let user = self
            .store
            .user(id)?
            .ok_or_else(|| CoreError::not_found("user", id))?;
        Ok(author_view(&user, &self.settings.public_url))
    }

    pub fn user_by_handle(&self, handle: &str) -> CoreResult<Author> {
        let user = self
            .store
            .user_by_handle(handle)?
            .ok_or_else(|| CoreError::not_found("user", handle))?;
        Ok(author_view(&user, &self.settings.public_url))
    }

    /// Short-lived URL of `owner_id`'s avatar, if the profile rule allows.
    pub fn profile_picture(&self, requester_id: &str, owner_id: &str) -> CoreResult<String> {
        if self.store.user(owner_id)?.is_none() {
            return Err(CoreError::not_found("user", owner_id));
        }
        if !AccessEvaluator::new(self.store).visible(requester_id, owner_id, Rule::ProfilePicture)? {
            return Err(CoreError::Unauthorized);
        }
        Ok(self
            .assets
            .presign(Bucket::Avatars, &avatar_key(owner_id), self.settings.url_ttl)?)
    }

    /// Bumps the picture version and hands out an upload URL for the new one.
    pub fn set_profile_picture(&self, user: &User) -> CoreResult<String> {
        let version = self.store.bump_profile_picture_version(&user.id)?;
        info!("User {} uploading profile picture v{}", user.id, version);
        Ok(self
            .assets
            .presign_upload(Bucket::Avatars, &avatar_key(&user.id), self.settings.url_ttl)?)
    }
}
