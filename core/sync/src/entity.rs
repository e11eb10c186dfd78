//! Local mirror of one remote record.

use serde_json::{Map, Value};
use tracing::debug;

use deskbridge_common::{as_integer, EntityKey, Error, Result};
use deskbridge_transport::{ApiRequest, SharedTransport};

use crate::descriptor::{EditableField, EmptySave, ResourceDescriptor};
use crate::staging::StagedEdits;
use crate::state::{Refreshed, SaveOutcome, SyncState};

/// A server-side record mirrored locally, with staged edits.
///
/// # Ownership
/// One owner at a time. Every network operation takes `&mut self` and
/// completes its round trip before returning, so calls on one entity never
/// overlap. Sharing an entity across tasks needs an external lock.
pub struct RemoteEntity {
    transport: SharedTransport,
    descriptor: &'static ResourceDescriptor,
    /// Value sent as the refresh lookup attribute.
    identity: EntityKey,
    /// Value sent as the save ID field.
    save_key: Option<EntityKey>,
    details: Map<String, Value>,
    staged: StagedEdits,
    state: SyncState,
}

impl RemoteEntity {
    /// Fetch a record and build its mirror.
    ///
    /// `save_key` is the identity used on save; pass `None` when the
    /// descriptor names an `identity_field` to read it from the record.
    ///
    /// # Returns
    /// - `Ok(None)` when the server returned no usable record; the caller
    ///   reports its own not-found error
    pub async fn load(
        transport: SharedTransport,
        descriptor: &'static ResourceDescriptor,
        identity: EntityKey,
        save_key: Option<EntityKey>,
    ) -> Result<Option<Self>> {
        let mut entity = Self {
            transport,
            descriptor,
            identity,
            save_key,
            details: Map::new(),
            staged: StagedEdits::new(),
            state: SyncState::Loading,
        };

        match entity.refresh().await? {
            Refreshed::Updated => Ok(Some(entity)),
            Refreshed::Empty => Ok(None),
        }
    }

    /// Discard staged edits and reload details from the server.
    ///
    /// Details are replaced wholesale. A body that is not a non-empty object
    /// leaves the entity untouched and yields `Refreshed::Empty`.
    pub async fn refresh(&mut self) -> Result<Refreshed> {
        let d = self.descriptor;
        let request =
            ApiRequest::get(d.refresh_path).param(d.refresh_attribute, self.identity.to_value());
        debug!("Refreshing {} {}", d.resource, self.identity);

        let record = match self.transport.send(request).await? {
            Value::Object(map) if !map.is_empty() => map,
            _ => return Ok(Refreshed::Empty),
        };

        if let Some(field) = d.identity_field {
            let id = record
                .get(field)
                .and_then(as_integer)
                .and_then(|id| u64::try_from(id).ok())
                .ok_or_else(|| {
                    Error::InvalidResponse(format!(
                        "{} record for {} has no integer {}",
                        d.resource, self.identity, field
                    ))
                })?;
            self.save_key = Some(EntityKey::Id(id));
        }

        self.details = record;
        self.staged.clear();
        self.state = SyncState::Synced;
        Ok(Refreshed::Updated)
    }

    /// Stage a whitelisted field edit.
    ///
    /// Reads reflect the pending value immediately.
    ///
    /// # Errors
    /// - `Error::InvalidField` if `field` is not editable; nothing changes
    pub fn stage_edit(&mut self, field: &str, value: impl Into<Value>) -> Result<()> {
        if !self.descriptor.is_editable(field) {
            return Err(Error::InvalidField {
                resource: self.descriptor.resource,
                field: field.to_string(),
            });
        }
        self.details.insert(field.to_string(), value.into());
        self.staged.stage(field);
        Ok(())
    }

    /// Stage an edit through a resource's typed field enum.
    pub fn stage_field<F: EditableField>(
        &mut self,
        field: F,
        value: impl Into<Value>,
    ) -> Result<()> {
        self.stage_edit(field.name(), value)
    }

    /// Stage an edit from an `updateFoo(value)` style call.
    ///
    /// # Errors
    /// - `Error::InvalidField` if the name is not `update` followed by a
    ///   capitalised field name, or the field is not editable
    /// - `Error::InvalidNumberOfArguments` unless exactly one argument is given
    pub fn apply_update_call(&mut self, method: &str, args: &[Value]) -> Result<()> {
        let field = parse_update_call(method).ok_or_else(|| Error::InvalidField {
            resource: self.descriptor.resource,
            field: method.to_string(),
        })?;
        match args {
            [value] => self.stage_edit(field, value.clone()),
            _ => Err(Error::InvalidNumberOfArguments {
                method: method.to_string(),
                given: args.len(),
            }),
        }
    }

    /// Push staged edits and re-synchronise from the server.
    ///
    /// Custom fields go first, one request each, and leave the staged set as
    /// they are written. The remaining fields go in a single update request.
    /// Once that succeeds the staged set is cleared and exactly one refresh
    /// follows. The update response body is not inspected.
    ///
    /// # Errors
    /// - `Error::NoPendingChanges` for an empty save on a rejecting resource
    /// - Any transport failure, unmodified; staged edits not yet written stay staged
    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let d = self.descriptor;

        if self.staged.is_empty() {
            return match d.empty_save {
                EmptySave::Skip => {
                    debug!("Nothing staged on {} {}", d.resource, self.identity);
                    Ok(SaveOutcome::Unchanged)
                }
                EmptySave::Reject => Err(Error::NoPendingChanges(d.resource)),
            };
        }

        for pinned in d.pinned_fields {
            self.staged.stage(pinned);
        }

        let save_key = self.save_key.clone().ok_or_else(|| {
            Error::InvalidResponse(format!(
                "{} {} has no identity to save under",
                d.resource, self.identity
            ))
        })?;

        let mut custom_fields = Vec::new();
        if let Some(table) = d.custom_fields {
            for field in self.staged.names() {
                let Some(custom) = d.custom_field(&field) else {
                    continue;
                };
                let request = ApiRequest::post(table.path)
                    .param("fieldId", custom.id)
                    .param("value", self.details.get(&field).cloned().unwrap_or(Value::Null))
                    .param("id", save_key.to_value());
                self.transport.send(request).await?;
                self.staged.unstage(&field);
                custom_fields.push(field);
            }
        }

        let mut fields = Vec::new();
        if !self.staged.is_empty() {
            let mut request = ApiRequest::post(d.save_path);
            for (wire, value) in self.update_payload() {
                request = request.param(wire, value);
            }
            request = request.param(d.save_id_field, save_key.to_value());

            debug!(
                "Saving {} {} ({} fields)",
                d.resource,
                self.identity,
                self.staged.count()
            );
            self.transport.send(request).await?;
            fields = self.staged.names();
        }

        self.staged.clear();
        let refreshed = self.refresh().await?;
        Ok(SaveOutcome::Saved {
            fields,
            custom_fields,
            refreshed,
        })
    }

    /// Update payload for the currently staged fields, with wire names applied.
    pub fn update_payload(&self) -> Vec<(String, Value)> {
        self.staged
            .iter()
            .map(|field| {
                let value = self.details.get(field).cloned().unwrap_or(Value::Null);
                (self.descriptor.wire_name(field).to_string(), value)
            })
            .collect()
    }

    /// Value of a field, or `None` when absent or null.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.details.get(name).filter(|v| !v.is_null())
    }

    /// String value of a field.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Integer value of a field.
    pub fn int_field(&self, name: &str) -> Option<i64> {
        self.field(name).and_then(as_integer)
    }

    /// Value of a custom field, looked up by `FieldName` inside the record's
    /// `Fields` list. No network call is made.
    pub fn custom_field(&self, remote_name: &str) -> Option<&Value> {
        self.details
            .get("Fields")?
            .as_array()?
            .iter()
            .find(|f| f.get("FieldName").and_then(Value::as_str) == Some(remote_name))?
            .get("Value")
            .filter(|v| !v.is_null())
    }

    pub fn details(&self) -> &Map<String, Value> {
        &self.details
    }

    pub fn staged(&self) -> &StagedEdits {
        &self.staged
    }

    pub fn is_dirty(&self) -> bool {
        !self.staged.is_empty()
    }

    pub fn identity(&self) -> &EntityKey {
        &self.identity
    }

    pub fn save_key(&self) -> Option<&EntityKey> {
        self.save_key.as_ref()
    }

    pub fn descriptor(&self) -> &'static ResourceDescriptor {
        self.descriptor
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn transport(&self) -> &SharedTransport {
        &self.transport
    }
}

/// Extract `Foo` from `updateFoo`.
///
/// The remainder must start with an upper-case letter and contain only
/// ASCII letters and digits.
pub fn parse_update_call(method: &str) -> Option<&str> {
    let field = method.strip_prefix("update")?;
    let mut chars = field.chars();
    let first = chars.next()?;
    if first.is_ascii_uppercase() && chars.all(|c| c.is_ascii_alphanumeric()) {
        Some(field)
    } else {
        None
    }
}
