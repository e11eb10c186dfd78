//! Entry point bundling a transport with the resource constructors.

use serde_json::Value;

use deskbridge_common::Result;
use deskbridge_transport::{connect, ApiConfig, SharedTransport};

use crate::asset::{Asset, NewAsset};
use crate::category::Category;
use crate::ticket::{NewTicket, Ticket};
use crate::user::{NewUser, User};

/// Handle to one helpdesk instance.
///
/// Cheap to clone; every resource opened through it shares the transport.
#[derive(Clone)]
pub struct Helpdesk {
    transport: SharedTransport,
}

impl Helpdesk {
    pub fn new(transport: SharedTransport) -> Self {
        Self { transport }
    }

    /// Build an HTTP-backed client, with rate-limit retries if configured.
    pub fn connect(config: &ApiConfig) -> Result<Self> {
        Ok(Self::new(connect(config)?))
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }

    pub async fn ticket(&self, id: u64) -> Result<Ticket> {
        Ticket::open(self.transport.clone(), id).await
    }

    pub async fn create_ticket(&self, ticket: &NewTicket) -> Result<u64> {
        Ticket::create_new(self.transport.as_ref(), ticket).await
    }

    pub async fn user(&self, username: &str) -> Result<User> {
        User::open(self.transport.clone(), username).await
    }

    pub async fn create_user(&self, user: &NewUser) -> Result<u64> {
        User::create_new(self.transport.as_ref(), user).await
    }

    pub async fn asset(&self, id: u64) -> Result<Asset> {
        Asset::open(self.transport.clone(), id).await
    }

    pub async fn create_asset(&self, asset: &NewAsset) -> Result<u64> {
        Asset::create_new(self.transport.as_ref(), asset).await
    }

    pub async fn category(&self, name_with_section: &str) -> Result<Category> {
        Category::find(self.transport.clone(), name_with_section).await
    }

    pub async fn categories(&self) -> Result<Vec<Value>> {
        Category::list(self.transport.as_ref()).await
    }
}
