//! Friend-request state machine.
//!
//! ```text
//! NONE --request--> REQUESTED --accept--> FRIEND
//!                       |
//!                       +--reject/cancel--> NONE
//! ```
//!
//! A request towards someone who already asked us skips REQUESTED and turns
//! their request into a friendship straight away.

use tracing::{debug, info};
use zap_types::api::{Author, FriendRequestsResponse};
use zap_types::id::{Prefix, new_id};
use zap_types::models::{FriendRequest, NotificationKind, User};

use crate::Settings;
use crate::error::{CoreError, CoreResult};
use crate::notifications::{self, PushTarget};
use crate::profiles::author_view;
use crate::store::{Store, StoreError};

#[derive(Debug, PartialEq, Eq)]
pub enum RequestOutcome {
    /// The receiver had already asked; both are friends now.
    Befriended,
    /// Request stored. `push` is set when the receiver has a device to notify.
    Requested { push: Option<PushTarget> },
}

pub struct FriendService<'a> {
    store: &'a dyn Store,
    settings: &'a Settings,
}

impl<'a> FriendService<'a> {
    pub fn new(store: &'a dyn Store, settings: &'a Settings) -> Self {
        Self { store, settings }
    }

    pub fn request(&self, sender: &User, receiver_handle: &str) -> CoreResult<RequestOutcome> {
        let receiver = self.by_handle(receiver_handle)?;
        if receiver.id == sender.id {
            return Err(CoreError::Forbidden("cannot befriend yourself".into()));
        }
        if self.store.are_friends(&sender.id, &receiver.id)? {
            return Err(CoreError::Conflict("already friends".into()));
        }

        // Mutual request: consume theirs instead of adding ours.
        if let Some(outcome) = self.take_inverse(sender, &receiver)? {
            return Ok(outcome);
        }

        let created = self.store.create_friend_request(&FriendRequest {
            id: new_id(Prefix::FriendRequest),
            sender_id: sender.id.clone(),
            receiver_id: receiver.id.clone(),
        });
        match created {
            Ok(()) => {}
            // The store holds one request per pair; theirs may have landed
            // between our check and insert.
            Err(StoreError::Conflict(_)) => {
                return match self.take_inverse(sender, &receiver)? {
                    Some(outcome) => Ok(outcome),
                    None => Err(CoreError::Conflict("friend request already sent".into())),
                };
            }
            Err(e) => return Err(e.into()),
        }
        info!("{} requested {}", sender.id, receiver.id);

        let push = match receiver.device_token {
            Some(device_token) => {
                let notification = notifications::friend_request(sender, &receiver.id);
                self.store.create_notification(&notification)?;
                Some(PushTarget {
                    notification_id: notification.id,
                    device_token,
                })
            }
            None => None,
        };
        Ok(RequestOutcome::Requested { push })
    }

    /// Turns a pending `receiver -> sender` request into a friendship.
    fn take_inverse(&self, sender: &User, receiver: &User) -> CoreResult<Option<RequestOutcome>> {
        if self.store.friend_request(&receiver.id, &sender.id)?.is_none() {
            return Ok(None);
        }
        let friendship_id = new_id(Prefix::Friendship);
        if !self
            .store
            .convert_friend_request(&receiver.id, &sender.id, &friendship_id)?
        {
            debug!("Inverse request {} -> {} vanished", receiver.id, sender.id);
            return Ok(None);
        }
        self.purge_notification(&receiver.id, &sender.id)?;
        info!("{} and {} are now friends", receiver.id, sender.id);
        Ok(Some(RequestOutcome::Befriended))
    }

    /// Sender withdraws a pending request.
    pub fn cancel(&self, sender: &User, receiver_handle: &str) -> CoreResult<()> {
        let receiver = self.by_handle(receiver_handle)?;
        self.remove(&sender.id, &receiver.id)
    }

    pub fn reject(&self, receiver: &User, sender_id: &str) -> CoreResult<()> {
        self.remove(sender_id, &receiver.id)
    }

    /// Losing a race with a concurrent accept or reject reads as not found.
    pub fn accept(&self, receiver: &User, sender_id: &str) -> CoreResult<()> {
        let friendship_id = new_id(Prefix::Friendship);
        if !self
            .store
            .convert_friend_request(sender_id, &receiver.id, &friendship_id)?
        {
            return Err(CoreError::not_found("friend request", sender_id));
        }
        self.purge_notification(sender_id, &receiver.id)?;
        info!("{} and {} are now friends", sender_id, receiver.id);
        Ok(())
    }

    pub fn friends(&self, user: &User) -> CoreResult<Vec<Author>> {
        let ids: Vec<String> = self.store.friend_ids(&user.id)?.into_iter().collect();
        self.authors(&ids)
    }

    pub fn requests(&self, user: &User) -> CoreResult<FriendRequestsResponse> {
        let (incoming, outgoing): (Vec<FriendRequest>, Vec<FriendRequest>) = self
            .store
            .friend_requests_involving(&user.id)?
            .into_iter()
            .partition(|r| r.receiver_id == user.id);
        let incoming: Vec<String> = incoming.into_iter().map(|r| r.sender_id).collect();
        let outgoing: Vec<String> = outgoing.into_iter().map(|r| r.receiver_id).collect();
        Ok(FriendRequestsResponse {
            incoming: self.authors(&incoming)?,
            outgoing: self.authors(&outgoing)?,
        })
    }

    fn remove(&self, sender_id: &str, receiver_id: &str) -> CoreResult<()> {
        if !self.store.delete_friend_request(sender_id, receiver_id)? {
            return Err(CoreError::not_found("friend request", sender_id));
        }
        self.purge_notification(sender_id, receiver_id)?;
        debug!("Request {} -> {} removed", sender_id, receiver_id);
        Ok(())
    }

    fn purge_notification(&self, sender_id: &str, receiver_id: &str) -> CoreResult<()> {
        self.store.delete_notifications_matching(
            receiver_id,
            NotificationKind::FriendRequest,
            sender_id,
        )?;
        Ok(())
    }

    fn by_handle(&self, handle: &str) -> CoreResult<User> {
        self.store
            .user_by_handle(handle)?
            .ok_or_else(|| CoreError::not_found("user", handle))
    }

    fn authors(&self, ids: &[String]) -> CoreResult<Vec<Author>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let mut users = self.store.users_by_ids(ids)?;
        users.sort_by(|a, b| a.handle.cmp(&b.handle));
        Ok(users
            .iter()
            .map(|u| author_view(u, &self.settings.public_url))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;
    use assert_matches::assert_matches;

    #[derive(Debug, PartialEq, Eq)]
    enum Pair {
        None,
        /// `a` asked `b`.
        Outgoing,
        /// `b` asked `a`.
        Incoming,
        Friend,
    }

    fn pair(store: &MemoryStore, a: &str, b: &str) -> Pair {
        if store.are_friends(a, b).unwrap() {
            Pair::Friend
        } else if store.friend_request(a, b).unwrap().is_some() {
            Pair::Outgoing
        } else if store.friend_request(b, a).unwrap().is_some() {
            Pair::Incoming
        } else {
            Pair::None
        }
    }

    fn users(store: &MemoryStore) -> (User, User) {
        let a = store.add_user("a");
        store.add_user("b");
        store.set_device_token("b", Some("device-b")).unwrap();
        (a, store.user("b").unwrap().unwrap())
    }

    #[test]
    fn request_then_accept() {
        let store = MemoryStore::default();
        let settings = Settings::default();
        let (a, b) = users(&store);
        let friends = FriendService::new(&store, &settings);

        let outcome = friends.request(&a, "b_handle").unwrap();
        let push = assert_matches!(outcome, RequestOutcome::Requested { push: Some(p) } => p);
        assert_eq!(push.device_token, "device-b");
        assert_eq!(pair(&store, "a", "b"), Pair::Outgoing);
        assert_eq!(pair(&store, "b", "a"), Pair::Incoming);

        friends.accept(&b, "a").unwrap();
        assert_eq!(pair(&store, "a", "b"), Pair::Friend);
        assert_eq!(store.request_count(), 0);
        assert_eq!(store.notification_count(), 0);
    }

    #[test]
    fn no_push_without_device() {
        let store = MemoryStore::default();
        let settings = Settings::default();
        let (a, b) = users(&store);
        let friends = FriendService::new(&store, &settings);
        let outcome = friends.request(&b, "a_handle").unwrap();
        assert_eq!(outcome, RequestOutcome::Requested { push: None });
        assert_eq!(store.notification_count(), 0);
        assert_eq!(friends.requests(&a).unwrap().incoming[0].id, "b");
    }

    #[test]
    fn mutual_requests_become_one_friendship() {
        let store = MemoryStore::default();
        let settings = Settings::default();
        let (a, b) = users(&store);
        let friends = FriendService::new(&store, &settings);

        friends.request(&a, "b_handle").unwrap();
        assert_eq!(store.notification_count(), 1);
        let outcome = friends.request(&b, "a_handle").unwrap();

        assert_eq!(outcome, RequestOutcome::Befriended);
        assert_eq!(store.friendship_count(), 1);
        assert_eq!(store.request_count(), 0);
        // b's pending notification about a's request is gone, none added for a
        assert_eq!(store.notification_count(), 0);
    }

    #[test]
    fn second_accept_loses_the_race() {
        let store = MemoryStore::default();
        let settings = Settings::default();
        let (a, b) = users(&store);
        let friends = FriendService::new(&store, &settings);
        friends.request(&a, "b_handle").unwrap();
        friends.accept(&b, "a").unwrap();
        assert_matches!(friends.accept(&b, "a"), Err(CoreError::NotFound { .. }));
        assert_eq!(store.friendship_count(), 1);
    }

    #[test]
    fn reject_and_cancel_purge_notification() {
        let store = MemoryStore::default();
        let settings = Settings::default();
        let (a, b) = users(&store);
        let friends = FriendService::new(&store, &settings);

        friends.request(&a, "b_handle").unwrap();
        friends.reject(&b, "a").unwrap();
        assert_eq!(pair(&store, "a", "b"), Pair::None);
        assert_eq!(store.notification_count(), 0);

        friends.request(&a, "b_handle").unwrap();
        friends.cancel(&a, "b_handle").unwrap();
        assert_eq!(pair(&store, "a", "b"), Pair::None);
        assert_eq!(store.notification_count(), 0);
        assert_matches!(friends.cancel(&a, "b_handle"), Err(CoreError::NotFound { .. }));
    }

    #[test]
    fn invalid_requests() {
        let store = MemoryStore::default();
        let settings = Settings::default();
        let (a, _) = users(&store);
        let friends = FriendService::new(&store, &settings);

        assert_matches!(friends.request(&a, "a_handle"), Err(CoreError::Forbidden(_)));
        assert_matches!(friends.request(&a, "ghost"), Err(CoreError::NotFound { .. }));
        friends.request(&a, "b_handle").unwrap();
        assert_matches!(friends.request(&a, "b_handle"), Err(CoreError::Conflict(_)));
        store.befriend("a", "b");
        assert_matches!(friends.request(&a, "b_handle"), Err(CoreError::Conflict(_)));
    }

    #[test]
    fn lists_friends_and_requests() {
        let store = MemoryStore::default();
        let settings = Settings::default();
        let (a, _) = users(&store);
        store.add_user("c");
        store.befriend("c", "a");
        let friends = FriendService::new(&store, &settings);
        friends.request(&a, "b_handle").unwrap();

        let list = friends.friends(&a).unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].id, "c");
        let requests = friends.requests(&a).unwrap();
        assert!(requests.incoming.is_empty());
        assert_eq!(requests.outgoing[0].handle, "b_handle");
    }
}
