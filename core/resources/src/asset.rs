//! Helpdesk assets.
//!
//! Two asset attributes, `Additional` and `Warranty Expiration`, are custom
//! fields: the server keeps them in the record's `Fields` list and writes
//! them through a separate endpoint keyed by a fixed field ID.

use serde_json::Value;
use tracing::info;

use deskbridge_common::{as_integer, EntityKey, Error, Result};
use deskbridge_sync::{
    CustomField, CustomFieldTable, EditableField, EmptySave, Refreshed, RemoteEntity,
    ResourceDescriptor, SaveOutcome, StagedEdits,
};
use deskbridge_transport::{ApiRequest, SharedTransport, Transport};

use crate::fields::editable_fields;

editable_fields! {
    /// Asset fields that can be changed, custom fields included.
    pub enum AssetField for "asset" {
        ModelName => "ModelName",
        Manufacturer => "Manufacturer",
        AssetType => "Type",
        Supplier => "Supplier",
        SerialNumber => "SerialNumber",
        Location => "Location",
        Comments => "Comments",
        Quantity => "Quantity",
        Additional => "Additional",
        WarrantyExpiration => "WarrantyExpiration",
    }
}

/// Custom field IDs are not discoverable through the API.
pub const ASSET_CUSTOM_FIELDS: CustomFieldTable = CustomFieldTable {
    path: "/api/SetCustomFieldForAsset",
    fields: &[
        CustomField {
            field: "Additional",
            remote_name: "Additional",
            id: 2,
        },
        CustomField {
            field: "WarrantyExpiration",
            remote_name: "Warranty Expiration",
            id: 5,
        },
    ],
};

/// Asset endpoints and field rules.
///
/// `Quantity` is pinned: the server resets it to 1 when an update omits it.
pub const ASSET: ResourceDescriptor = ResourceDescriptor {
    resource: "asset",
    editable_fields: AssetField::NAMES,
    field_map: &[],
    refresh_path: "/api/Asset",
    refresh_attribute: "id",
    save_path: "/api/UpdateAsset",
    save_id_field: "id",
    identity_field: None,
    empty_save: EmptySave::Skip,
    pinned_fields: &["Quantity"],
    custom_fields: Some(&ASSET_CUSTOM_FIELDS),
};

const CREATE_PATH: &str = "/api/Asset";
const ADDITIONAL_SEPARATOR: &str = "\r\n";

/// Arguments for [`Asset::create_new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewAsset {
    pub model_name: String,
    pub manufacturer: String,
    pub asset_type: String,
    pub supplier: String,
    pub serial_number: String,
    pub location: String,
    pub comments: String,
    /// Sent only when set and non-zero.
    pub quantity: Option<u32>,
}

impl NewAsset {
    pub fn new(
        model_name: impl Into<String>,
        manufacturer: impl Into<String>,
        asset_type: impl Into<String>,
        supplier: impl Into<String>,
    ) -> Self {
        Self {
            model_name: model_name.into(),
            manufacturer: manufacturer.into(),
            asset_type: asset_type.into(),
            supplier: supplier.into(),
            serial_number: String::new(),
            location: String::new(),
            comments: String::new(),
            quantity: None,
        }
    }

    pub fn with_serial_number(mut self, serial_number: impl Into<String>) -> Self {
        self.serial_number = serial_number.into();
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = location.into();
        self
    }

    pub fn with_comments(mut self, comments: impl Into<String>) -> Self {
        self.comments = comments.into();
        self
    }

    pub fn with_quantity(mut self, quantity: u32) -> Self {
        self.quantity = Some(quantity);
        self
    }

    fn to_request(&self) -> ApiRequest {
        let mut request = ApiRequest::post(CREATE_PATH)
            .param("ModelName", self.model_name.as_str())
            .param("Manufacturer", self.manufacturer.as_str())
            .param("Type", self.asset_type.as_str())
            .param("Supplier", self.supplier.as_str());

        for (name, value) in [
            ("SerialNumber", &self.serial_number),
            ("Location", &self.location),
            ("Comments", &self.comments),
        ] {
            if !value.is_empty() {
                request = request.param(name, value.as_str());
            }
        }
        if let Some(quantity) = self.quantity.filter(|q| *q > 0) {
            request = request.param("Quantity", quantity);
        }
        request
    }
}

/// An asset mirrored from the helpdesk.
pub struct Asset {
    entity: RemoteEntity,
    id: u64,
}

impl Asset {
    /// Fetch an asset by ID.
    ///
    /// # Errors
    /// - `Error::AssetNotFound` if the server returns no record
    pub async fn open(transport: SharedTransport, id: u64) -> Result<Self> {
        let key = EntityKey::Id(id);
        let entity = RemoteEntity::load(transport, &ASSET, key.clone(), Some(key))
            .await?
            .ok_or(Error::AssetNotFound(id))?;
        Ok(Self { entity, id })
    }

    /// Create an asset and return its ID.
    ///
    /// # Errors
    /// - `Error::InvalidResponse` unless the response is an object with an integer `id`
    pub async fn create_new<T>(transport: &T, asset: &NewAsset) -> Result<u64>
    where
        T: Transport + ?Sized,
    {
        let result = transport.send(asset.to_request()).await?;
        let id = result
            .get("id")
            .and_then(as_integer)
            .and_then(|id| u64::try_from(id).ok())
            .ok_or_else(|| Error::InvalidResponse(format!("Unable to create asset: {}", result)))?;
        info!("Created asset {} ({})", asset.model_name, id);
        Ok(id)
    }

    /// Stage a field change; call [`save`](Self::save) to send it.
    pub fn stage(&mut self, field: AssetField, value: impl Into<Value>) -> Result<()> {
        self.entity.stage_field(field, value)
    }

    /// Stage a change from an `updateFoo` style call.
    pub fn apply_update_call(&mut self, method: &str, args: &[Value]) -> Result<()> {
        self.entity.apply_update_call(method, args)
    }

    /// Stage a new `Additional` value.
    ///
    /// Appends `text` to the current value on a new line unless `replace` is
    /// set. The base is the staged `Additional` value when one exists, so
    /// several appends before a save all survive; only without a staged value
    /// is the `Additional` entry of the last refreshed `Fields` list used.
    pub fn update_additional(&mut self, text: &str, replace: bool) -> Result<()> {
        let value = if replace {
            text.to_string()
        } else {
            let current = self.additional().unwrap_or_default();
            format!("{current}{ADDITIONAL_SEPARATOR}{text}")
        };
        self.entity.stage_field(AssetField::Additional, value)
    }

    /// Write staged changes and reload. A no-op when nothing is staged.
    ///
    /// Custom fields are written first, one request each. They stay written
    /// even if the update that follows fails.
    pub async fn save(&mut self) -> Result<SaveOutcome> {
        let outcome = self.entity.save().await?;
        if outcome.lost_record() {
            return Err(Error::AssetNotFound(self.id));
        }
        Ok(outcome)
    }

    /// Reload from the server, discarding staged changes.
    pub async fn refresh(&mut self) -> Result<()> {
        match self.entity.refresh().await? {
            Refreshed::Updated => Ok(()),
            Refreshed::Empty => Err(Error::AssetNotFound(self.id)),
        }
    }

    /// Value of a custom field by its server-side name, e.g. `Warranty Expiration`.
    pub fn custom_field(&self, remote_name: &str) -> Option<&Value> {
        self.entity.custom_field(remote_name)
    }

    /// Current `Additional` text, staged or fetched.
    pub fn additional(&self) -> Option<String> {
        self.custom_text(AssetField::Additional)
    }

    /// Current warranty expiration, staged or fetched.
    pub fn warranty_expiration(&self) -> Option<String> {
        self.custom_text(AssetField::WarrantyExpiration)
    }

    fn custom_text(&self, field: AssetField) -> Option<String> {
        let name = field.name();
        let value = if self.entity.staged().contains(name) {
            self.entity.field(name)
        } else {
            let custom = ASSET.custom_field(name)?;
            self.entity.custom_field(custom.remote_name)
        }?;
        Some(match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn model_name(&self) -> Option<&str> {
        self.entity.str_field("ModelName")
    }

    pub fn manufacturer(&self) -> Option<&str> {
        self.entity.str_field("Manufacturer")
    }

    pub fn asset_type(&self) -> Option<&str> {
        self.entity.str_field("Type")
    }

    pub fn serial_number(&self) -> Option<&str> {
        self.entity.str_field("SerialNumber")
    }

    pub fn quantity(&self) -> Option<i64> {
        self.entity.int_field("Quantity")
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

#[cfg(test)]
mod tests {
    use super::*;
    use deskbridge_transport::{MemoryTransport, Method};
    use serde_json::json;
    use std::sync::Arc;

    fn asset_record() -> Value {
        json!({
            "ItemID": 77,
            "ModelName": "Latitude 7440",
            "Manufacturer": "Dell",
            "Type": "Laptop",
            "Supplier": "CDW",
            "SerialNumber": "ABC123",
            "Quantity": 4,
            "Fields": [
                {"FieldName": "Additional", "Value": "y"},
                {"FieldName": "Warranty Expiration", "Value": "2027-01-31"}
            ]
        })
    }

    async fn open_asset(record: Value) -> (Asset, MemoryTransport) {
        let memory = MemoryTransport::new();
        memory.set_response(Method::Get, "/api/Asset", record);
        memory.set_response(Method::Post, "/api/UpdateAsset", json!(null));
        memory.set_response(Method::Post, "/api/SetCustomFieldForAsset", json!(null));
        let asset = Asset::open(Arc::new(memory.clone()), 77).await.unwrap();
        memory.clear_requests();
        (asset, memory)
    }

    #[tokio::test]
    async fn test_open_reads_fields() {
        let (asset, _) = open_asset(asset_record()).await;
        assert_eq!(asset.id(), 77);
        assert_eq!(asset.model_name(), Some("Latitude 7440"));
        assert_eq!(asset.quantity(), Some(4));
        assert_eq!(asset.warranty_expiration().as_deref(), Some("2027-01-31"));
        assert_eq!(asset.custom_field("Additional"), Some(&json!("y")));
    }

    #[tokio::test]
    async fn test_open_missing_asset() {
        let memory = MemoryTransport::new();
        memory.push_response(Method::Get, "/api/Asset", json!(null));
        let err = Asset::open(Arc::new(memory), 5).await.err().unwrap();
        assert!(matches!(err, Error::AssetNotFound(5)));
    }

    #[tokio::test]
    async fn test_save_pins_quantity() {
        let (mut asset, memory) = open_asset(asset_record()).await;
        asset.stage(AssetField::Location, "Room 101").unwrap();
        asset.save().await.unwrap();

        let update = &memory.requests_to(Method::Post, "/api/UpdateAsset")[0];
        assert_eq!(update.query_param("Location"), Some("Room 101"));
        assert_eq!(update.query_param("Quantity"), Some("4"));
        assert_eq!(update.query_param("id"), Some("77"));
    }

    #[tokio::test]
    async fn test_update_additional_appends() {
        let (mut asset, _) = open_asset(asset_record()).await;
        asset.update_additional("x", false).unwrap();
        assert_eq!(asset.field("Additional"), Some(&json!("y\r\nx")));

        asset.update_additional("z", false).unwrap();
        assert_eq!(asset.additional().as_deref(), Some("y\r\nx\r\nz"));
    }

    #[tokio::test]
    async fn test_update_additional_replaces() {
        let (mut asset, _) = open_asset(asset_record()).await;
        asset.update_additional("x", true).unwrap();
        assert_eq!(asset.field("Additional"), Some(&json!("x")));
    }

    #[tokio::test]
    async fn test_update_additional_without_prior_value() {
        let mut record = asset_record();
        record["Fields"] = json!([]);
        let (mut asset, _) = open_asset(record).await;
        asset.update_additional("x", false).unwrap();
        assert_eq!(asset.field("Additional"), Some(&json!("\r\nx")));
    }

    #[tokio::test]
    async fn test_custom_fields_written_before_update() {
        let (mut asset, memory) = open_asset(asset_record()).await;
        asset.update_additional("note", true).unwrap();
        asset
            .stage(AssetField::WarrantyExpiration, "2028-06-30")
            .unwrap();
        asset.stage(AssetField::Comments, "reimaged").unwrap();
        let outcome = asset.save().await.unwrap();

        let requests = memory.requests();
        let routes: Vec<String> = requests.iter().map(ToString::to_string).collect();
        assert_eq!(
            routes,
            vec![
                "POST /api/SetCustomFieldForAsset",
                "POST /api/SetCustomFieldForAsset",
                "POST /api/UpdateAsset",
                "GET /api/Asset",
            ]
        );
        assert_eq!(requests[0].query_param("fieldId"), Some("2"));
        assert_eq!(requests[0].query_param("value"), Some("note"));
        assert_eq!(requests[0].query_param("id"), Some("77"));
        assert_eq!(requests[1].query_param("fieldId"), Some("5"));
        assert_eq!(requests[1].query_param("value"), Some("2028-06-30"));

        let update = &requests[2];
        assert_eq!(update.query_param("Additional"), None);
        assert_eq!(update.query_param("WarrantyExpiration"), None);
        assert_eq!(update.query_param("Comments"), Some("reimaged"));

        match outcome {
            SaveOutcome::Saved { custom_fields, .. } => {
                assert_eq!(custom_fields, vec!["Additional", "WarrantyExpiration"]);
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_custom_write_survives_failed_update() {
        let (mut asset, memory) = open_asset(asset_record()).await;
        memory.push_error(
            Method::Post,
            "/api/UpdateAsset",
            Error::Transport {
                status: Some(500),
                message: "Internal Server Error".to_string(),
            },
        );
        asset.update_additional("kept", true).unwrap();
        asset.stage(AssetField::Supplier, "SHI").unwrap();

        let err = asset.save().await.unwrap_err();
        assert!(matches!(err, Error::Transport { status: Some(500), .. }));
        assert_eq!(
            memory
                .requests_to(Method::Post, "/api/SetCustomFieldForAsset")
                .len(),
            1
        );
        assert!(asset.entity().staged().contains("Supplier"));
        assert!(!asset.entity().staged().contains("Additional"));
    }

    #[tokio::test]
    async fn test_empty_save_is_noop() {
        let (mut asset, memory) = open_asset(asset_record()).await;
        assert_eq!(asset.save().await.unwrap(), SaveOutcome::Unchanged);
        assert!(memory.requests().is_empty());
    }

    #[tokio::test]
    async fn test_create_new_required_and_optional() {
        let memory = MemoryTransport::new();
        memory.push_response(Method::Post, "/api/Asset", json!({"id": 501}));

        let new = NewAsset::new("ThinkPad", "Lenovo", "Laptop", "CDW")
            .with_location("Lab")
            .with_quantity(0);
        assert_eq!(Asset::create_new(&memory, &new).await.unwrap(), 501);

        let sent = &memory.requests()[0];
        assert_eq!(sent.query_param("Type"), Some("Laptop"));
        assert_eq!(sent.query_param("Location"), Some("Lab"));
        assert_eq!(sent.query_param("SerialNumber"), None);
        assert_eq!(sent.query_param("Quantity"), None);
    }

    #[tokio::test]
    async fn test_create_new_requires_integer_id() {
        let memory = MemoryTransport::new();
        memory.push_response(Method::Post, "/api/Asset", json!({"id": "501"}));
        let new = NewAsset::new("ThinkPad", "Lenovo", "Laptop", "CDW").with_quantity(2);
        let err = Asset::create_new(&memory, &new).await.unwrap_err();
        assert!(matches!(err, Error::InvalidResponse(_)));
        assert_eq!(memory.requests()[0].query_param("Quantity"), Some("2"));
    }

    #[test]
    fn test_type_field_parses() {
        assert_eq!("Type".parse::<AssetField>().unwrap(), AssetField::AssetType);
        assert!(ASSET.validate().is_ok());
    }
}
