//! Helpdesk tickets.

use serde_json::Value;
use tracing::info;

use deskbridge_common::{as_integer, EntityKey, Error, Result};
use deskbridge_sync::{
    EmptySave, Refreshed, RemoteEntity, ResourceDescriptor, SaveOutcome, StagedEdits,
};
use deskbridge_transport::{ApiRequest, SharedTransport, Transport};

use crate::fields::editable_fields;

editable_fields! {
    /// Ticket fields that can be changed after creation.
    pub enum TicketField for "ticket" {
        CategoryId => "CategoryID",
        TimeSpentInSeconds => "TimeSpentInSeconds",
        AssignedToUserId => "AssignedToUserID",
        StatusId => "StatusID",
        Tags => "Tags",
    }
}

/// Ticket endpoints and field rules.
pub const TICKET: ResourceDescriptor = ResourceDescriptor {
    resource: "ticket",
    editable_fields: TicketField::NAMES,
    field_map: &[("AssignedToUserID", "assignedUserId")],
    refresh_path: "/api/ticket",
    refresh_attribute: "id",
    save_path: "/api/UpdateTicket",
    save_id_field: "id",
    identity_field: None,
    empty_save: EmptySave::Reject,
    pinned_fields: &[],
    custom_fields: None,
};

const CREATE_PATH: &str = "/api/ticket";
const COMMENT_PATH: &str = "/api/comment";
const COMMENTS_PATH: &str = "/api/comments";

/// Priorities the API accepts; anything else is left out of a create call.
const PRIORITY_RANGE: std::ops::RangeInclusive<i64> = -1..=2;

/// Arguments for [`Ticket::create_new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTicket {
    pub subject: String,
    pub body: String,
    pub category_id: u64,
    /// Sent only when within -1..=2.
    pub priority_id: i64,
    /// Sent only when non-zero.
    pub user_id: u64,
    /// Sent only when non-empty.
    pub tags: String,
}

impl NewTicket {
    pub fn new(subject: impl Into<String>, body: impl Into<String>, category_id: u64) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            category_id,
            priority_id: 0,
            user_id: 0,
            tags: String::new(),
        }
    }

    pub fn with_priority(mut self, priority_id: i64) -> Self {
        self.priority_id = priority_id;
        self
    }

    /// Submit on behalf of another user.
    pub fn with_user(mut self, user_id: u64) -> Self {
        self.user_id = user_id;
        self
    }

    /// Comma-separated tag list.
    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }

    fn to_request(&self) -> ApiRequest {
        let mut request = ApiRequest::post(CREATE_PATH)
            .param("Subject", self.subject.as_str())
            .param("Body", self.body.as_str())
            .param("CategoryID", self.category_id);
        if PRIORITY_RANGE.contains(&self.priority_id) {
            request = request.param("PriorityID", self.priority_id);
        }
        if self.user_id > 0 {
            request = request.param("UserID", self.user_id);
        }
        if !self.tags.is_empty() {
            request = request.param("tags", self.tags.as_str());
        }
        request
    }
}

/// A ticket mirrored from the helpdesk.
pub struct Ticket {
    entity: RemoteEntity,
    id: u64,
}

impl Ticket {
    /// Fetch a ticket by ID.
    ///
    /// # Errors
    /// - `Error::TicketNotFound` if the server returns no record
    pub async fn open(transport: SharedTransport, id: u64) -> Result<Self> {
        let key = EntityKey::Id(id);
        let entity = RemoteEntity::load(transport, &TICKET, key.clone(), Some(key))
            .await?
            .ok_or(Error::TicketNotFound(id))?;
        Ok(Self { entity, id })
    }

    /// Create a ticket and return its ID.
    ///
    /// # Errors
    /// - `Error::InvalidResponse` unless the server answers with a positive integer
    pub async fn create_new<T>(transport: &T, ticket: &NewTicket) -> Result<u64>
    where
        T: Transport + ?Sized,
    {
        let result = transport.send(ticket.to_request()).await?;
        let id = positive_id(&result).ok_or_else(|| {
            Error::InvalidResponse(format!("Unable to create ticket: {}", result))
        })?;
        info!("Created ticket {}", id);
        Ok(id)
    }

    /// Stage a field change; call [`save`](Self::save) to send it.
    pub fn stage(&mut self, field: TicketField, value: impl Into<Value>) -> Result<()> {
        self.entity.stage_field(field, value)
    }

    /// Stage a change from an `updateFoo` style call.
    pub fn apply_update_call(&mut self, method: &str, args: &[Value]) -> Result<()> {
        self.entity.apply_update_call(method, args)
    }

    /// Write staged changes and reload.
    ///
    /// # Errors
    /// - `Error::NoPendingChanges` if nothing is staged
    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let outcome = self.entity.save().await?;
        if outcome.lost_record() {
            return Err(Error::TicketNotFound(self.id));
        }
        Ok(outcome)
    }

    /// Reload from the server, discarding staged changes.
    pub async fn refresh(&mut self) -> Result<()> {
        match self.entity.refresh().await? {
            Refreshed::Updated => Ok(()),
            Refreshed::Empty => Err(Error::TicketNotFound(self.id)),
        }
    }

    /// Post a comment and return the ID the server reports.
    ///
    /// # Errors
    /// - `Error::InvalidResponse` unless the server answers with a positive integer
    pub async fn add_comment(&self, body: &str, for_techs_only: bool) -> Result<u64> {
        let request = ApiRequest::post(COMMENT_PATH)
            .param("Body", body)
            .param("id", self.id)
            .param("forTechsOnly", for_techs_only);

        let result = self.entity.transport().send(request).await?;
        positive_id(&result).ok_or_else(|| {
            Error::InvalidResponse(format!("Invalid response adding comment: {}", result))
        })
    }

    /// All comments on the ticket, as returned by the server.
    pub async fn get_comments(&self) -> Result<Value> {
        let request = ApiRequest::get(COMMENTS_PATH).param("id", self.id);
        self.entity.transport().send(request).await
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn subject(&self) -> Option<&str> {
        self.entity.str_field("Subject")
    }

    pub fn body(&self) -> Option<&str> {
        self.entity.str_field("Body")
    }

    pub fn status_id(&self) -> Option<i64> {
        self.entity.int_field("StatusID")
    }

    pub fn category_id(&self) -> Option<i64> {
        self.entity.int_field("CategoryID")
    }

    pub fn assigned_to_user_id(&self) -> Option<i64> {
        self.entity.int_field("AssignedToUserID")
    }

    pub fn time_spent_in_seconds(&self) -> Option<i64> {
        self.entity.int_field("TimeSpentInSeconds")
    }

    pub fn tags(&self) -> Option<&Value> {
        self.entity.field("Tags")
    }

    /// Any field of the record; `None` when absent.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.entity.field(name)
    }

    pub fn is_dirty(&self) -> bool {
        self.entity.is_dirty()
    }

    /// Fields waiting for the next save.
    pub fn staged(&self) -> &StagedEdits {
        self.entity.staged()
    }

    pub fn entity(&self) -> &RemoteEntity {
        &self.entity
    }
}

fn positive_id(value: &Value) -> Option<u64> {
    as_integer(value)
        .filter(|id| *id > 0)
        .and_then(|id| u64::try_from(id).ok())
}
