//! Graph membership evaluation: may `requester` see an asset owned by `owner`?
//!
//! Four predicates, checked in a fixed order and short-circuiting on the first
//! that holds:
//!
//! 1. self
//! 2. the owner has a pending friend request to the requester
//! 3. direct friends
//! 4. friend of friend (exactly one intermediate, never deeper)
//!
//! Profile pictures use all four. Zap and reaction imagery only uses 1 and 3.

use tracing::debug;
use zap_types::models::{Reaction, Zap};

use crate::store::{Store, StoreResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rule {
    /// Persistent profile picture.
    ProfilePicture,
    /// Ephemeral daily content: zap and reaction images.
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Grant {
    SelfAccess,
    IncomingRequest,
    DirectFriend,
    FriendOfFriend,
}

pub struct AccessEvaluator<'a> {
    store: &'a dyn Store,
}

impl<'a> AccessEvaluator<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Callers check that the owner exists first; this only answers yes/no.
    pub fn visible(&self, requester_id: &str, owner_id: &str, rule: Rule) -> StoreResult<bool> {
        let grant = self.grant(requester_id, owner_id, rule)?;
        debug!(
            requester = requester_id,
            owner = owner_id,
            ?rule,
            ?grant,
            "access evaluated"
        );
        Ok(grant.is_some())
    }

    pub fn can_view_zap(&self, requester_id: &str, zap: &Zap) -> StoreResult<bool> {
        self.visible(requester_id, &zap.author_id, Rule::Content)
    }

    /// Reaction author under the content rule, or else whoever can see the
    /// parent Zap.
    pub fn can_view_reaction(&self, requester_id: &str, reaction: &Reaction) -> StoreResult<bool> {
        if self.visible(requester_id, &reaction.author_id, Rule::Content)? {
            return Ok(true);
        }
        match self.store.zap(&reaction.zap_id)? {
            Some(zap) => self.can_view_zap(requester_id, &zap),
            None => Ok(false),
        }
    }

    fn grant(&self, requester_id: &str, owner_id: &str, rule: Rule) -> StoreResult<Option<Grant>> {
        if requester_id == owner_id {
            return Ok(Some(Grant::SelfAccess));
        }
        if rule == Rule::ProfilePicture && self.has_incoming_request(requester_id, owner_id)? {
            return Ok(Some(Grant::IncomingRequest));
        }
        if self.store.are_friends(requester_id, owner_id)? {
            return Ok(Some(Grant::DirectFriend));
        }
        if rule == Rule::ProfilePicture && self.is_friend_of_friend(requester_id, owner_id)? {
            return Ok(Some(Grant::FriendOfFriend));
        }
        Ok(None)
    }

    fn has_incoming_request(&self, requester_id: &str, owner_id: &str) -> StoreResult<bool> {
        Ok(self.store.friend_request(owner_id, requester_id)?.is_some())
    }

    /// Depth-2 only: intersect the two adjacency sets.
    fn is_friend_of_friend(&self, requester_id: &str, owner_id: &str) -> StoreResult<bool> {
        let owner_friends = self.store.friend_ids(owner_id)?;
        if owner_friends.is_empty() {
            return Ok(false);
        }
        let requester_friends = self.store.friend_ids(requester_id)?;
        Ok(requester_friends
            .iter()
            .any(|x| x != requester_id && x != owner_id && owner_friends.contains(x)))
    }
}
