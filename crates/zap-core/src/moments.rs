//! Which Moment is current, per region.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::warn;
use zap_types::models::{Moment, Region};

use crate::error::{CoreError, CoreResult};
use crate::store::{Store, StoreResult};

pub struct MomentResolver<'a> {
    store: &'a dyn Store,
}

impl<'a> MomentResolver<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// The Moment active in `region` at `now`. Fails with
    /// [`CoreError::NoActiveMoment`] when nothing has activated yet.
    pub fn active(&self, region: Region, now: DateTime<Utc>) -> CoreResult<Moment> {
        self.store
            .latest_moment_activated_before(region, now)?
            .ok_or(CoreError::NoActiveMoment(region))
    }

    /// Active Moment of every region that has one.
    pub fn active_by_region(&self, now: DateTime<Utc>) -> StoreResult<HashMap<Region, Moment>> {
        let mut active = HashMap::with_capacity(Region::ALL.len());
        for region in Region::ALL {
            match self.store.latest_moment_activated_before(region, now)? {
                Some(moment) => {
                    active.insert(region, moment);
                }
                None => warn!("No active moment for region {}", region),
            }
        }
        Ok(active)
    }
}

/// The selection rule, for stores that filter in memory: activation for
/// `region` strictly before `now`, then the latest by `(date, id)`.
pub fn select_active<'m, I>(moments: I, region: Region, now: DateTime<Utc>) -> Option<&'m Moment>
where
    I: IntoIterator<Item = &'m Moment>,
{
    moments
        .into_iter()
        .filter(|m| m.activation(region) < now)
        .max_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)))
}
