//! Collaborators and configuration shared by every workflow of one invocation

use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crate::client::{
    ApiError, HttpStackClient, RepositoryAuthenticator, RolesetManager, StackDeleter,
    StackLister, StackUpserter, StackWaiter,
};
use crate::engine::tracker::StackTracker;
use crate::workflow::config::Config;

/// Everything a workflow needs to talk to the outside world
#[derive(Clone)]
pub struct Context {
    pub config: Arc<Config>,
    pub upserter: Arc<dyn StackUpserter>,
    pub waiter: Arc<dyn StackWaiter>,
    pub lister: Arc<dyn StackLister>,
    pub deleter: Arc<dyn StackDeleter>,
    pub rolesets: Arc<dyn RolesetManager>,
    pub authenticator: Arc<dyn RepositoryAuthenticator>,
}

impl Context {
    /// Use one client for every collaborator role, with a separate waiter
    pub fn from_client<C>(config: Config, client: Arc<C>, waiter: Arc<dyn StackWaiter>) -> Self
    where
        C: StackUpserter
            + StackLister
            + StackDeleter
            + RolesetManager
            + RepositoryAuthenticator
            + 'static,
    {
        Self {
            config: Arc::new(config),
            upserter: client.clone(),
            waiter,
            lister: client.clone(),
            deleter: client.clone(),
            rolesets: client.clone(),
            authenticator: client,
        }
    }

    /// Talk to the HTTP endpoint from `config.api`, polling with `config.tracker`
    pub fn http(config: Config, cancelled: Arc<AtomicBool>) -> Result<Self, ApiError> {
        let client = Arc::new(HttpStackClient::new(&config.api.endpoint)?);
        let tracker = StackTracker::new(client.clone())
            .with_settings(config.tracker_settings())
            .with_cancellation(cancelled);
        Ok(Self::from_client(config, client, Arc::new(tracker)))
    }

    pub fn namespace(&self) -> &str {
        &self.config.namespace
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("namespace", &self.config.namespace)
            .finish_non_exhaustive()
    }
}
