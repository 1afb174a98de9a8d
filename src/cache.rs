use std::collections::HashMap;

use alloy::primitives::Address;
use anyhow::Result;

use crate::entities::{Arbitrator, Job, JobEventRow, Marketplace, Notification, Review, User};
use crate::store::{BatchData, Store};

/// Write-through entity cache scoped to one block range. Getters clone out
/// of the in-batch map, falling back to a store point-read on miss; puts
/// only touch the map. The whole cache is drained into the store at flush,
/// so events later in the batch observe earlier in-batch mutations.
pub struct Batch<'a, S> {
    store: &'a S,
    marketplaces: HashMap<Address, Marketplace>,
    users: HashMap<Address, User>,
    arbitrators: HashMap<Address, Arbitrator>,
    jobs: HashMap<u64, Job>,
    pub events: Vec<JobEventRow>,
    pub reviews: Vec<Review>,
    pub notifications: Vec<Notification>,
}

impl<'a, S: Store> Batch<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Batch {
            store,
            marketplaces: HashMap::new(),
            users: HashMap::new(),
            arbitrators: HashMap::new(),
            jobs: HashMap::new(),
            events: Vec::new(),
            reviews: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// The marketplace singleton is materialized lazily on first touch.
    pub async fn marketplace(&mut self, address: Address) -> Result<Marketplace> {
        if let Some(marketplace) = self.marketplaces.get(&address) {
            return Ok(marketplace.clone());
        }

        let marketplace = self
            .store
            .marketplace(address)
            .await?
            .unwrap_or_else(|| Marketplace::new(address));
        self.marketplaces.insert(address, marketplace.clone());

        Ok(marketplace)
    }

    pub async fn user(&mut self, address: Address) -> Result<Option<User>> {
        if let Some(user) = self.users.get(&address) {
            return Ok(Some(user.clone()));
        }

        let Some(user) = self.store.user(address).await? else {
            return Ok(None);
        };
        self.users.insert(address, user.clone());

        Ok(Some(user))
    }

    pub async fn arbitrator(&mut self, address: Address) -> Result<Option<Arbitrator>> {
        if let Some(arbitrator) = self.arbitrators.get(&address) {
            return Ok(Some(arbitrator.clone()));
        }

        let Some(arbitrator) = self.store.arbitrator(address).await? else {
            return Ok(None);
        };
        self.arbitrators.insert(address, arbitrator.clone());

        Ok(Some(arbitrator))
    }

    pub async fn job(&mut self, id: u64) -> Result<Option<Job>> {
        if let Some(job) = self.jobs.get(&id) {
            return Ok(Some(job.clone()));
        }

        let Some(job) = self.store.job(id).await? else {
            return Ok(None);
        };
        self.jobs.insert(id, job.clone());

        Ok(Some(job))
    }

    pub fn put_marketplace(&mut self, marketplace: Marketplace) {
        self.marketplaces.insert(marketplace.address, marketplace);
    }

    pub fn put_user(&mut self, user: User) {
        self.users.insert(user.address, user);
    }

    pub fn put_arbitrator(&mut self, arbitrator: Arbitrator) {
        self.arbitrators.insert(arbitrator.address, arbitrator);
    }

    pub fn put_job(&mut self, job: Job) {
        self.jobs.insert(job.id, job);
    }

    pub fn into_data(self) -> BatchData {
        BatchData {
            marketplaces: self.marketplaces.into_values().collect(),
            users: self.users.into_values().collect(),
            arbitrators: self.arbitrators.into_values().collect(),
            jobs: self.jobs.into_values().collect(),
            events: self.events,
            reviews: self.reviews,
            notifications: self.notifications,
        }
    }
}
