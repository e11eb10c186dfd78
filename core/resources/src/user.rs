//! Helpdesk users, addressed by username.

use serde_json::Value;
use tracing::info;

use deskbridge_common::{as_integer, EntityKey, Error, Result};
use deskbridge_sync::{
    EmptySave, Refreshed, RemoteEntity, ResourceDescriptor, SaveOutcome, StagedEdits,
};
use deskbridge_transport::{ApiRequest, SharedTransport, Transport};

use crate::fields::editable_fields;

editable_fields! {
    /// User profile fields that can be changed.
    pub enum UserField for "user" {
        FirstName => "FirstName",
        LastName => "LastName",
        Disabled => "Disabled",
        Location => "Location",
        Phone => "Phone",
        DepartmentName => "DepartmentName",
    }
}

/// User endpoints and field rules.
///
/// Users are looked up by username but saved by the numeric `UserID`
/// found in each refreshed record.
pub const USER: ResourceDescriptor = ResourceDescriptor {
    resource: "user",
    editable_fields: UserField::NAMES,
    field_map: &[
        ("CompanyName", "company"),
        ("DepartmentName", "department"),
        ("Disabled", "disabled"),
    ],
    refresh_path: "/api/UserByUsername",
    refresh_attribute: "username",
    save_path: "/api/UpdateUser",
    save_id_field: "userId",
    identity_field: Some("UserID"),
    empty_save: EmptySave::Skip,
    pinned_fields: &[],
    custom_fields: None,
};

const CREATE_PATH: &str = "/api/CreateUser";

/// Arguments for [`User::create_new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub email: String,
    /// Sent only when non-empty.
    pub first_name: String,
    /// Sent only when non-empty.
    pub last_name: String,
}

impl NewUser {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
            email: email.into(),
            first_name: String::new(),
            last_name: String::new(),
        }
    }

    pub fn with_name(
        mut self,
        first_name: impl Into<String>,
        last_name: impl Into<String>,
    ) -> Self {
        self.first_name = first_name.into();
        self.last_name = last_name.into();
        self
    }

    fn to_request(&self) -> ApiRequest {
        let mut request = ApiRequest::post(CREATE_PATH)
            .param("Username", self.username.as_str())
            .param("Password", self.password.as_str())
            .param("Email", self.email.as_str());
        if !self.first_name.is_empty() {
            request = request.param("FirstName", self.first_name.as_str());
        }
        if !self.last_name.is_empty() {
            request = request.param("LastName", self.last_name.as_str());
        }
        request
    }
}

/// A user mirrored from the helpdesk.
pub struct User {
    entity: RemoteEntity,
}

impl User {
    /// Fetch a user by username.
    ///
    /// # Errors
    /// - `Error::UserNotFound` if the server returns no record
    /// - `Error::InvalidResponse` if the record carries no integer `UserID`
    pub async fn open(transport: SharedTransport, username: &str) -> Result<Self> {
        let key = EntityKey::Name(username.to_string());
        let entity = RemoteEntity::load(transport, &USER, key, None)
            .await?
            .ok_or_else(|| Error::UserNotFound(username.to_string()))?;
        Ok(Self { entity })
    }

    /// Create a user and return the new `UserID`.
    ///
    /// # Errors
    /// - `Error::InvalidResponse` unless the server answers with an integer
    pub async fn create_new<T>(transport: &T, user: &NewUser) -> Result<u64>
    where
        T: Transport + ?Sized,
    {
        let result = transport.send(user.to_request()).await?;
        let id = as_integer(&result)
            .and_then(|id| u64::try_from(id).ok())
            .ok_or_else(|| Error::InvalidResponse(format!("Unable to create user: {}", result)))?;
        info!("Created user {} ({})", user.username, id);
        Ok(id)
    }

    /// Stage a field change; call [`save`](Self::save) to send it.
    pub fn stage(&mut self, field: UserField, value: impl Into<Value>) -> Result<()> {
        self.entity.stage_field(field, value)
    }

    /// Stage enabling or disabling the account.
    ///
    /// The API expects the literal strings `true`/`false`.
    pub fn update_disabled(&mut self, disabled: bool) -> Result<()> {
        let literal = if disabled { "true" } else { "false" };
        self.entity.stage_field(UserField::Disabled, literal)
    }

    /// Stage a change from an `updateFoo` style call.
    ///
    /// `updateDisabled` goes through [`update_disabled`](Self::update_disabled)
    /// when given a boolean.
    pub fn apply_update_call(&mut self, method: &str, args: &[Value]) -> Result<()> {
        match (method, args) {
            ("updateDisabled", [Value::Bool(disabled)]) => self.update_disabled(*disabled),
            _ => self.entity.apply_update_call(method, args),
        }
    }

    /// Write staged changes and reload. A no-op when nothing is staged.
    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let outcome = self.entity.save().await?;
        if outcome.lost_record() {
            return Err(Error::UserNotFound(self.username().to_string()));
        }
        Ok(outcome)
    }

    /// Reload from the server, discarding staged changes.
    pub async fn refresh(&mut self) -> Result<()> {
        match self.entity.refresh().await? {
            Refreshed::Updated => Ok(()),
            Refreshed::Empty => Err(Error::UserNotFound(self.username().to_string())),
        }
    }

    /// Server-assigned ID, used when saving.
    pub fn user_id(&self) -> u64 {
        self.entity
            .save_key()
            .and_then(EntityKey::as_id)
            .unwrap_or_default()
    }

    /// Username the user was looked up by.
    pub fn username(&self) -> &str {
        match self.entity.identity() {
            EntityKey::Name(name) => name,
            EntityKey::Id(_) => "",
        }
    }

    pub fn email(&self) -> Option<&str> {
        self.entity.str_field("Email")
    }

    pub fn first_name(&self) -> Option<&str> {
        self.entity.str_field("FirstName")
    }

    pub fn last_name(&self) -> Option<&str> {
        self.entity.str_field("LastName")
    }

    pub fn company_name(&self) -> Option<&str> {
        self.entity.str_field("CompanyName")
    }

    pub fn department_name(&self) -> Option<&str> {
        self.entity.str_field("DepartmentName")
    }

    /// Whether the account is disabled, accepting a boolean or the
    /// `true`/`false` literal a staged edit leaves behind.
    pub fn is_disabled(&self) -> Option<bool> {
        match self.entity.field("Disabled")? {
            Value::Bool(b) => Some(*b),
            Value::String(s) => s.parse().ok(),
            _ => None,
        }
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
