//! Daily feed assembly.
//!
//! Fetch broadly, join in memory: one query per region for Zaps, one for all
//! comments, one for all reactions, one for repost originals and at most two
//! for author metadata. Nothing is locked between the calls; a Zap that flips
//! to uploaded halfway through simply shows up on the next read.

use std::collections::{BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use zap_types::api::{Author, FeedComment, FeedReaction, FeedResponse, FeedZap, FriendContent, FriendFeed};
use zap_types::id::TypeId;
use zap_types::models::{Comment, Moment, Reaction, Region, User, Zap, ZapSide};

use crate::Settings;
use crate::assets::{AssetLocator, Bucket, reaction_key, zap_key};
use crate::error::{CoreError, CoreResult};
use crate::moments::MomentResolver;
use crate::profiles::author_view;
use crate::store::Store;

/// Milliseconds past `activation + grace`, or `None` when on time.
pub fn lateness(created_ms: i64, activation: DateTime<Utc>, grace: chrono::Duration) -> Option<i64> {
    let late = created_ms - (activation.timestamp_millis() + grace.num_milliseconds());
    (late > 0).then_some(late)
}

/// Creation time embedded in a stored id.
pub(crate) fn created_ms(id: &str) -> CoreResult<i64> {
    TypeId::parse(id, None)
        .map(|id| id.timestamp_ms())
        .map_err(|e| CoreError::Internal(anyhow::anyhow!("corrupt id '{}': {}", id, e)))
}

pub struct FeedAssembler<'a> {
    store: &'a dyn Store,
    assets: &'a dyn AssetLocator,
    settings: &'a Settings,
}

impl<'a> FeedAssembler<'a> {
    pub fn new(store: &'a dyn Store, assets: &'a dyn AssetLocator, settings: &'a Settings) -> Self {
        Self {
            store,
            assets,
            settings,
        }
    }

    pub fn build(&self, requester: &User, now: DateTime<Utc>) -> CoreResult<FeedResponse> {
        let moments = MomentResolver::new(self.store).active_by_region(now)?;
        if !moments.contains_key(&requester.region) {
            return Err(CoreError::NoActiveMoment(requester.region));
        }

        // Self plus direct friends. Never friend-of-friend.
        let mut eligible: Vec<String> = self
            .store
            .friend_ids(&requester.id)?
            .into_iter()
            .filter(|id| id != &requester.id)
            .collect();
        eligible.push(requester.id.clone());
        let mut users: HashMap<String, User> = self
            .store
            .users_by_ids(&eligible)?
            .into_iter()
            .map(|u| (u.id.clone(), u))
            .collect();

        let zaps = self.zaps_for_authors(&users, &moments)?;
        debug!(
            requester = %requester.id,
            authors = users.len(),
            zaps = zaps.len(),
            "assembling feed"
        );

        let zap_ids: Vec<String> = zaps.iter().map(|z| z.id.clone()).collect();
        let mut comments = group_by_zap(self.store.comments_for_zaps(&zap_ids)?, |c: &Comment| {
            c.zap_id.clone()
        });
        let mut reactions = group_by_zap(
            self.store.visible_reactions_for_zaps(&zap_ids)?,
            |r: &Reaction| r.zap_id.clone(),
        );
        let originals = self.repost_originals(&zaps)?;

        let mut mine = Vec::new();
        let mut by_friend: HashMap<String, Vec<FeedZap>> = HashMap::new();
        for zap in zaps {
            let stored = match &zap.repost_id {
                Some(original_id) => match originals.get(original_id) {
                    Some(original) => original,
                    None => {
                        warn!("Dropping repost {} of missing zap {}", zap.id, original_id);
                        continue;
                    }
                },
                None => &zap,
            };
            let Some(author) = users.get(&zap.author_id) else {
                continue;
            };
            let Some(moment) = moments.get(&author.region) else {
                continue;
            };
            let item = self.feed_zap(
                &zap,
                stored,
                moment,
                author.region,
                comments.remove(&zap.id).unwrap_or_default(),
                reactions.remove(&zap.id).unwrap_or_default(),
            )?;
            if zap.author_id == requester.id {
                mine.push(item);
            } else {
                by_friend.entry(zap.author_id.clone()).or_default().push(item);
            }
        }

        mine.sort_by(|a, b| a.id.cmp(&b.id));
        let mut content: Vec<FriendContent> = by_friend
            .into_iter()
            .map(|(user_id, mut zaps)| {
                zaps.sort_by(|a, b| a.id.cmp(&b.id));
                FriendContent { user_id, zaps }
            })
            .collect();
        // Most recently active friend first.
        content.sort_by(|a, b| latest_id(b).cmp(latest_id(a)));

        let authors = self.authors(&mine, &content, &mut users)?;

        Ok(FeedResponse {
            my_zaps: mine,
            friend: FriendFeed {
                content,
                users: authors,
            },
        })
    }

    /// One query per region, each against that region's own Moment.
    fn zaps_for_authors(
        &self,
        users: &HashMap<String, User>,
        moments: &HashMap<Region, Moment>,
    ) -> CoreResult<Vec<Zap>> {
        let mut zaps = Vec::new();
        for region in Region::ALL {
            let authors: Vec<String> = users
                .values()
                .filter(|u| u.region == region)
                .map(|u| u.id.clone())
                .collect();
            if authors.is_empty() {
                continue;
            }
            let Some(moment) = moments.get(&region) else {
                continue;
            };
            zaps.extend(self.store.uploaded_zaps(&moment.id, &authors)?);
        }
        Ok(zaps)
    }

    fn repost_originals(&self, zaps: &[Zap]) -> CoreResult<HashMap<String, Zap>> {
        let ids: Vec<String> = zaps
            .iter()
            .filter_map(|z| z.repost_id.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        Ok(self
            .store
            .zaps_by_ids(&ids)?
            .into_iter()
            .map(|z| (z.id.clone(), z))
            .collect())
    }

    /// `zap` supplies id, author and timing; `stored` is where the images
    /// live, which differs from `zap` only for reposts.
    fn feed_zap(
        &self,
        zap: &Zap,
        stored: &Zap,
        moment: &Moment,
        region: Region,
        mut comments: Vec<Comment>,
        mut reactions: Vec<Reaction>,
    ) -> CoreResult<FeedZap> {
        let timestamp = created_ms(&zap.id)?;
        let image = |side| {
            self.assets.presign(
                Bucket::Zaps,
                &zap_key(&stored.moment_id, &stored.author_id, &stored.id, side),
                self.settings.url_ttl,
            )
        };

        comments.sort_by(|a, b| a.id.cmp(&b.id));
        reactions.sort_by(|a, b| a.id.cmp(&b.id));

        Ok(FeedZap {
            id: zap.id.clone(),
            author_id: zap.author_id.clone(),
            repost_of: zap.repost_id.clone(),
            front_camera_url: image(ZapSide::Front)?,
            back_camera_url: image(ZapSide::Back)?,
            timestamp,
            late_by: lateness(timestamp, moment.activation(region), self.settings.late_grace),
            comments: comments
                .into_iter()
                .map(|c| -> CoreResult<FeedComment> {
                    Ok(FeedComment {
                        timestamp: created_ms(&c.id)?,
                        id: c.id,
                        author_id: c.author_id,
                        content: c.content,
                    })
                })
                .collect::<CoreResult<_>>()?,
            reactions: reactions
                .into_iter()
                .map(|r| -> CoreResult<FeedReaction> {
                    let image_url = self.assets.presign(
                        Bucket::Reactions,
                        &reaction_key(&r.author_id, r.kind, &r.image_id),
                        self.settings.url_ttl,
                    )?;
                    Ok(FeedReaction {
                        timestamp: created_ms(&r.id)?,
                        id: r.id,
                        author_id: r.author_id,
                        kind: r.kind,
                        image_url,
                    })
                })
                .collect::<CoreResult<_>>()?,
        })
    }

    /// Everyone who appears anywhere in the feed, resolved with at most one
    /// extra batch for commenters and reactors outside the eligible set.
    fn authors(
        &self,
        mine: &[FeedZap],
        content: &[FriendContent],
        users: &mut HashMap<String, User>,
    ) -> CoreResult<Vec<Author>> {
        let mut ids = BTreeSet::new();
        let all_zaps = mine.iter().chain(content.iter().flat_map(|c| c.zaps.iter()));
        for zap in all_zaps {
            ids.insert(zap.author_id.clone());
            ids.extend(zap.comments.iter().map(|c| c.author_id.clone()));
            ids.extend(zap.reactions.iter().map(|r| r.author_id.clone()));
        }

        let missing: Vec<String> = ids.iter().filter(|id| !users.contains_key(*id)).cloned().collect();
        if !missing.is_empty() {
            for user in self.store.users_by_ids(&missing)? {
                users.insert(user.id.clone(), user);
            }
        }

        Ok(ids
            .iter()
            .filter_map(|id| users.get(id))
            .map(|u| author_view(u, &self.settings.public_url))
            .collect())
    }
}

fn group_by_zap<T>(items: Vec<T>, key: impl Fn(&T) -> String) -> HashMap<String, Vec<T>> {
    let mut grouped: HashMap<String, Vec<T>> = HashMap::new();
    for item in items {
        grouped.entry(key(&item)).or_default().push(item);
    }
    grouped
}

fn latest_id(content: &FriendContent) -> &str {
    content.zaps.last().map(|z| z.id.as_str()).unwrap_or_default()
}
