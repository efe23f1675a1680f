//! In-memory collaborators for unit tests.

use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use zap_types::id::{Prefix, TypeId, new_id};
use zap_types::models::{
    Comment, FriendRequest, Friendship, Invite, Moment, Notification, NotificationKind, Reaction,
    ReactionImage, ReactionKind, Region, RegionalTimestamps, User, Zap,
};

use crate::assets::{AssetLocator, Bucket};
use crate::moments::select_active;
use crate::store::{Store, StoreError, StoreResult};

/// 2024-01-01T00:00:00Z plus `minutes`.
pub fn at_minutes(minutes: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(1_704_067_200_000 + minutes * 60_000)
        .single()
        .expect("valid timestamp")
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    requests: Vec<FriendRequest>,
    friendships: Vec<Friendship>,
    moments: Vec<Moment>,
    zaps: Vec<Zap>,
    comments: Vec<Comment>,
    images: Vec<ReactionImage>,
    reactions: Vec<Reaction>,
    notifications: Vec<Notification>,
    invites: Vec<(String, Option<String>, String)>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    fn with<R>(&self, f: impl FnOnce(&mut Tables) -> R) -> R {
        let mut tables = self.tables.lock().expect("store lock");
        f(&mut tables)
    }

    pub fn add_user(&self, id: &str) -> User {
        self.add_user_in(id, Region::Eu)
    }

    pub fn add_user_in(&self, id: &str, region: Region) -> User {
        let user = User {
            id: id.into(),
            handle: format!("{}_handle", id),
            email: format!("{}@example.com", id),
            first_name: id.to_uppercase(),
            last_name: "Test".into(),
            region,
            profile_picture_version: 0,
            device_token: None,
        };
        self.create_user(&user).expect("unique user");
        user
    }

    pub fn befriend(&self, a: &str, b: &str) {
        self.with(|t| {
            t.friendships.push(Friendship {
                id: new_id(Prefix::Friendship),
                sender_id: a.into(),
                receiver_id: b.into(),
            })
        });
    }

    pub fn request(&self, sender: &str, receiver: &str) {
        self.create_friend_request(&FriendRequest {
            id: new_id(Prefix::FriendRequest),
            sender_id: sender.into(),
            receiver_id: receiver.into(),
        })
        .expect("unique request");
    }

    /// One Moment activating at the same instant in every region.
    pub fn add_moment(&self, id: &str, activation: DateTime<Utc>) -> Moment {
        let moment = Moment {
            id: id.into(),
            date: activation,
            activations: RegionalTimestamps::uniform(activation),
        };
        self.insert_moment(&moment).expect("moment");
        moment
    }

    pub fn add_zap(&self, moment_id: &str, author_id: &str, uploaded: bool) -> Zap {
        self.add_zap_with_id(new_id(Prefix::Zap), moment_id, author_id, uploaded)
    }

    pub fn add_zap_at(
        &self,
        moment_id: &str,
        author_id: &str,
        created: DateTime<Utc>,
    ) -> Zap {
        let id = TypeId::at(Prefix::Zap, created.timestamp_millis() as u64)
            .expect("timestamp")
            .to_string();
        self.add_zap_with_id(id, moment_id, author_id, true)
    }

    fn add_zap_with_id(&self, id: String, moment_id: &str, author_id: &str, uploaded: bool) -> Zap {
        let zap = Zap {
            id,
            moment_id: moment_id.into(),
            author_id: author_id.into(),
            uploaded,
            repost_id: None,
        };
        self.create_zap(&zap).expect("zap");
        zap
    }

    pub fn add_comment(&self, zap_id: &str, author_id: &str, content: &str) -> Comment {
        let comment = Comment {
            id: new_id(Prefix::Comment),
            zap_id: zap_id.into(),
            author_id: author_id.into(),
            content: content.into(),
        };
        self.create_comment(&comment).expect("comment");
        comment
    }

    pub fn add_reaction(&self, zap_id: &str, author_id: &str, image_uploaded: bool) -> Reaction {
        let image = ReactionImage {
            id: new_id(Prefix::ReactionImage),
            author_id: author_id.into(),
            kind: ReactionKind::Happy,
            uploaded: image_uploaded,
        };
        self.create_reaction_image(&image).expect("image");
        let reaction = Reaction {
            id: new_id(Prefix::Reaction),
            zap_id: zap_id.into(),
            author_id: author_id.into(),
            kind: image.kind,
            image_id: image.id,
        };
        self.create_reaction(&reaction).expect("reaction");
        reaction
    }

    pub fn request_count(&self) -> usize {
        self.with(|t| t.requests.len())
    }

    pub fn friendship_count(&self) -> usize {
        self.with(|t| t.friendships.len())
    }

    pub fn notification_count(&self) -> usize {
        self.with(|t| t.notifications.len())
    }

    pub fn zap_count(&self) -> usize {
        self.with(|t| t.zaps.len())
    }
}

impl Store for MemoryStore {
    fn create_user(&self, user: &User) -> StoreResult<()> {
        self.with(|t| {
            if t.users.iter().any(|u| u.handle == user.handle) {
                return Err(StoreError::Conflict("handle".into()));
            }
            if t.users.iter().any(|u| u.email == user.email) {
                return Err(StoreError::Conflict("email".into()));
            }
            t.users.push(user.clone());
            Ok(())
        })
    }

    fn user(&self, id: &str) -> StoreResult<Option<User>> {
        Ok(self.with(|t| t.users.iter().find(|u| u.id == id).cloned()))
    }

    fn user_by_handle(&self, handle: &str) -> StoreResult<Option<User>> {
        Ok(self.with(|t| t.users.iter().find(|u| u.handle == handle).cloned()))
    }

    fn users_by_ids(&self, ids: &[String]) -> StoreResult<Vec<User>> {
        Ok(self.with(|t| {
            t.users
                .iter()
                .filter(|u| ids.contains(&u.id))
                .cloned()
                .collect()
        }))
    }

    fn set_device_token(&self, user_id: &str, token: Option<&str>) -> StoreResult<()> {
        self.with(|t| {
            if let Some(u) = t.users.iter_mut().find(|u| u.id == user_id) {
                u.device_token = token.map(str::to_string);
            }
        });
        Ok(())
    }

    fn bump_profile_picture_version(&self, user_id: &str) -> StoreResult<i64> {
        self.with(|t| {
            let user = t
                .users
                .iter_mut()
                .find(|u| u.id == user_id)
                .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("no user {}", user_id)))?;
            user.profile_picture_version += 1;
            Ok(user.profile_picture_version)
        })
    }

    fn friend_ids(&self, user_id: &str) -> StoreResult<HashSet<String>> {
        Ok(self.with(|t| {
            t.friendships
                .iter()
                .filter_map(|f| {
                    if f.sender_id == user_id {
                        Some(f.receiver_id.clone())
                    } else if f.receiver_id == user_id {
                        Some(f.sender_id.clone())
                    } else {
                        None
                    }
                })
                .collect()
        }))
    }

    fn are_friends(&self, a: &str, b: &str) -> StoreResult<bool> {
        Ok(self.with(|t| {
            t.friendships.iter().any(|f| {
                (f.sender_id == a && f.receiver_id == b) || (f.sender_id == b && f.receiver_id == a)
            })
        }))
    }

    fn friend_request(&self, sender_id: &str, receiver_id: &str) -> StoreResult<Option<FriendRequest>> {
        Ok(self.with(|t| {
            t.requests
                .iter()
                .find(|r| r.sender_id == sender_id && r.receiver_id == receiver_id)
                .cloned()
        }))
    }

    fn friend_requests_involving(&self, user_id: &str) -> StoreResult<Vec<FriendRequest>> {
        Ok(self.with(|t| {
            t.requests
                .iter()
                .filter(|r| r.sender_id == user_id || r.receiver_id == user_id)
                .cloned()
                .collect()
        }))
    }

    fn create_friend_request(&self, request: &FriendRequest) -> StoreResult<()> {
        self.with(|t| {
            if t.requests.iter().any(|r| {
                (r.sender_id == request.sender_id && r.receiver_id == request.receiver_id)
                    || (r.sender_id == request.receiver_id && r.receiver_id == request.sender_id)
            }) {
                return Err(StoreError::Conflict("friend request".into()));
            }
            t.requests.push(request.clone());
            Ok(())
        })
    }

    fn delete_friend_request(&self, sender_id: &str, receiver_id: &str) -> StoreResult<bool> {
        Ok(self.with(|t| {
            let before = t.requests.len();
            t.requests
                .retain(|r| !(r.sender_id == sender_id && r.receiver_id == receiver_id));
            t.requests.len() != before
        }))
    }

    fn convert_friend_request(
        &self,
        sender_id: &str,
        receiver_id: &str,
        friendship_id: &str,
    ) -> StoreResult<bool> {
        Ok(self.with(|t| {
            let before = t.requests.len();
            t.requests
                .retain(|r| !(r.sender_id == sender_id && r.receiver_id == receiver_id));
            if t.requests.len() == before {
                return false;
            }
            t.friendships.push(Friendship {
                id: friendship_id.into(),
                sender_id: sender_id.into(),
                receiver_id: receiver_id.into(),
            });
            true
        }))
    }

    fn insert_moment(&self, moment: &Moment) -> StoreResult<()> {
        self.with(|t| {
            if t.moments.iter().any(|m| m.id == moment.id) {
                return Err(StoreError::Conflict("moment".into()));
            }
            t.moments.push(moment.clone());
            Ok(())
        })
    }

    fn latest_moment_activated_before(
        &self,
        region: Region,
        now: DateTime<Utc>,
    ) -> StoreResult<Option<Moment>> {
        Ok(self.with(|t| select_active(t.moments.iter(), region, now).cloned()))
    }

    fn latest_moment_date(&self) -> StoreResult<Option<DateTime<Utc>>> {
        Ok(self.with(|t| t.moments.iter().map(|m| m.date).max()))
    }

    fn create_zap(&self, zap: &Zap) -> StoreResult<()> {
        self.with(|t| t.zaps.push(zap.clone()));
        Ok(())
    }

    fn zap(&self, id: &str) -> StoreResult<Option<Zap>> {
        Ok(self.with(|t| t.zaps.iter().find(|z| z.id == id).cloned()))
    }

    fn zaps_by_ids(&self, ids: &[String]) -> StoreResult<Vec<Zap>> {
        Ok(self.with(|t| t.zaps.iter().filter(|z| ids.contains(&z.id)).cloned().collect()))
    }

    fn mark_zap_uploaded(&self, id: &str) -> StoreResult<()> {
        self.with(|t| {
            if let Some(z) = t.zaps.iter_mut().find(|z| z.id == id) {
                z.uploaded = true;
            }
        });
        Ok(())
    }

    fn uploaded_zaps(&self, moment_id: &str, author_ids: &[String]) -> StoreResult<Vec<Zap>> {
        Ok(self.with(|t| {
            t.zaps
                .iter()
                .filter(|z| z.uploaded && z.moment_id == moment_id && author_ids.contains(&z.author_id))
                .cloned()
                .collect()
        }))
    }

    fn create_comment(&self, comment: &Comment) -> StoreResult<()> {
        self.with(|t| t.comments.push(comment.clone()));
        Ok(())
    }

    fn comments_for_zaps(&self, zap_ids: &[String]) -> StoreResult<Vec<Comment>> {
        Ok(self.with(|t| {
            t.comments
                .iter()
                .filter(|c| zap_ids.contains(&c.zap_id))
                .cloned()
                .collect()
        }))
    }

    fn create_reaction_image(&self, image: &ReactionImage) -> StoreResult<()> {
        self.with(|t| t.images.push(image.clone()));
        Ok(())
    }

    fn reaction_image(&self, id: &str) -> StoreResult<Option<ReactionImage>> {
        Ok(self.with(|t| t.images.iter().find(|i| i.id == id).cloned()))
    }

    fn mark_reaction_image_uploaded(&self, id: &str) -> StoreResult<()> {
        self.with(|t| {
            if let Some(i) = t.images.iter_mut().find(|i| i.id == id) {
                i.uploaded = true;
            }
        });
        Ok(())
    }

    fn create_reaction(&self, reaction: &Reaction) -> StoreResult<()> {
        self.with(|t| t.reactions.push(reaction.clone()));
        Ok(())
    }

    fn reaction(&self, id: &str) -> StoreResult<Option<Reaction>> {
        Ok(self.with(|t| t.reactions.iter().find(|r| r.id == id).cloned()))
    }

    fn delete_reaction(&self, id: &str) -> StoreResult<bool> {
        Ok(self.with(|t| {
            let before = t.reactions.len();
            t.reactions.retain(|r| r.id != id);
            t.reactions.len() != before
        }))
    }

    fn visible_reactions_for_zaps(&self, zap_ids: &[String]) -> StoreResult<Vec<Reaction>> {
        Ok(self.with(|t| {
            t.reactions
                .iter()
                .filter(|r| zap_ids.contains(&r.zap_id))
                .filter(|r| t.images.iter().any(|i| i.id == r.image_id && i.uploaded))
                .cloned()
                .collect()
        }))
    }

    fn create_notification(&self, notification: &Notification) -> StoreResult<()> {
        self.with(|t| t.notifications.push(notification.clone()));
        Ok(())
    }

    fn notification(&self, id: &str) -> StoreResult<Option<Notification>> {
        Ok(self.with(|t| t.notifications.iter().find(|n| n.id == id).cloned()))
    }

    fn notifications_for(&self, user_id: &str) -> StoreResult<Vec<Notification>> {
        Ok(self.with(|t| {
            t.notifications
                .iter()
                .filter(|n| n.user_id == user_id)
                .cloned()
                .collect()
        }))
    }

    fn delete_notifications(&self, ids: &[String]) -> StoreResult<usize> {
        Ok(self.with(|t| {
            let before = t.notifications.len();
            t.notifications.retain(|n| !ids.contains(&n.id));
            before - t.notifications.len()
        }))
    }

    fn delete_notifications_matching(
        &self,
        user_id: &str,
        kind: NotificationKind,
        target_id: &str,
    ) -> StoreResult<usize> {
        Ok(self.with(|t| {
            let before = t.notifications.len();
            t.notifications.retain(|n| {
                !(n.user_id == user_id && n.kind == kind && n.target_id.as_deref() == Some(target_id))
            });
            before - t.notifications.len()
        }))
    }

    fn create_invite(&self, id: &str, user_id: Option<&str>, code: &str) -> StoreResult<()> {
        self.with(|t| {
            if t.invites.iter().any(|(_, owner, _)| owner.as_deref() == user_id) {
                return Err(StoreError::Conflict("invite".into()));
            }
            t.invites
                .push((id.into(), user_id.map(str::to_string), code.into()));
            Ok(())
        })
    }

    fn server_invite(&self, with_code: bool) -> StoreResult<Option<Invite>> {
        Ok(self.with(|t| {
            t.invites
                .iter()
                .find(|(_, owner, _)| owner.is_none())
                .map(|row| invite_from(row, with_code))
        }))
    }

    fn user_invite(&self, user_id: &str, with_code: bool) -> StoreResult<Option<Invite>> {
        Ok(self.with(|t| {
            t.invites
                .iter()
                .find(|(_, owner, _)| owner.as_deref() == Some(user_id))
                .map(|row| invite_from(row, with_code))
        }))
    }

    fn invite_by_code(&self, code: &str) -> StoreResult<Option<Invite>> {
        Ok(self.with(|t| {
            t.invites
                .iter()
                .find(|(_, _, c)| c == code)
                .map(|row| invite_from(row, true))
        }))
    }
}

fn invite_from(row: &(String, Option<String>, String), with_code: bool) -> Invite {
    Invite {
        id: row.0.clone(),
        user_id: row.1.clone(),
        code: with_code.then(|| row.2.clone()),
    }
}

/// Hands out `mem://` URLs and remembers which buckets it was asked to create.
#[derive(Default)]
pub struct RecordingLocator {
    buckets: Mutex<Vec<Bucket>>,
}

impl RecordingLocator {
    pub fn created_buckets(&self) -> Vec<Bucket> {
        self.buckets.lock().expect("locator lock").clone()
    }
}

impl AssetLocator for RecordingLocator {
    fn presign(&self, bucket: Bucket, key: &str, ttl: Duration) -> anyhow::Result<String> {
        Ok(format!("mem://{}/{}?get&ttl={}", bucket, key, ttl.as_secs()))
    }

    fn presign_upload(&self, bucket: Bucket, key: &str, ttl: Duration) -> anyhow::Result<String> {
        Ok(format!("mem://{}/{}?put&ttl={}", bucket, key, ttl.as_secs()))
    }

    fn bucket_exists(&self, bucket: Bucket) -> anyhow::Result<bool> {
        Ok(self.buckets.lock().expect("locator lock").contains(&bucket))
    }

    fn create_bucket(&self, bucket: Bucket) -> anyhow::Result<()> {
        self.buckets.lock().expect("locator lock").push(bucket);
        Ok(())
    }
}
