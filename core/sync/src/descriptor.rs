//! Static per-resource configuration consumed by the sync engine.

use std::fmt::Debug;

/// What `save()` does when nothing is staged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmptySave {
    /// Return without touching the network.
    Skip,
    /// Fail with `Error::NoPendingChanges`.
    Reject,
}

/// A field stored out-of-band and written through its own endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomField {
    /// Local field name, as staged.
    pub field: &'static str,
    /// Name the server reports under `Fields[*].FieldName`.
    pub remote_name: &'static str,
    /// Numeric custom-field ID the write endpoint expects.
    pub id: u32,
}

/// Custom fields of a resource and the endpoint that writes them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomFieldTable {
    pub path: &'static str,
    pub fields: &'static [CustomField],
}

/// Everything the engine needs to know about one resource type.
///
/// Values are plain `'static` constants, one per resource; the engine is
/// composed with a descriptor rather than specialised per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResourceDescriptor {
    /// Lower-case resource name used in errors and logs.
    pub resource: &'static str,
    /// Fields that may be staged.
    pub editable_fields: &'static [&'static str],
    /// Outbound renames, local name to wire name.
    pub field_map: &'static [(&'static str, &'static str)],
    /// GET endpoint returning a single record.
    pub refresh_path: &'static str,
    /// Query parameter carrying the lookup key on refresh.
    pub refresh_attribute: &'static str,
    /// POST endpoint accepting staged changes.
    pub save_path: &'static str,
    /// Query parameter carrying the record identity on save.
    pub save_id_field: &'static str,
    /// Field re-read from each refresh to become the save identity, when the
    /// lookup key is not the save key.
    pub identity_field: Option<&'static str>,
    pub empty_save: EmptySave,
    /// Fields force-included in every non-empty save.
    pub pinned_fields: &'static [&'static str],
    pub custom_fields: Option<&'static CustomFieldTable>,
}

impl ResourceDescriptor {
    /// Whether `field` is on the editable whitelist.
    pub fn is_editable(&self, field: &str) -> bool {
        self.editable_fields.contains(&field)
    }

    /// Name `field` is sent under on save.
    pub fn wire_name<'a>(&self, field: &'a str) -> &'a str {
        self.field_map
            .iter()
            .find(|(local, _)| *local == field)
            .map(|(_, wire)| *wire)
            .unwrap_or(field)
    }

    /// Custom-field entry for a local field name.
    pub fn custom_field(&self, field: &str) -> Option<&'static CustomField> {
        self.custom_fields?.fields.iter().find(|c| c.field == field)
    }

    /// Check internal consistency: pinned and custom fields must be editable.
    pub fn validate(&self) -> Result<(), String> {
        for pinned in self.pinned_fields {
            if !self.is_editable(pinned) {
                return Err(format!(
                    "{}: pinned field {} is not editable",
                    self.resource, pinned
                ));
            }
        }
        if let Some(table) = self.custom_fields {
            for custom in table.fields {
                if !self.is_editable(custom.field) {
                    return Err(format!(
                        "{}: custom field {} is not editable",
                        self.resource, custom.field
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Closed set of editable fields for one resource type.
///
/// Adapters implement this on an enum so callers stage edits by variant
/// rather than by string.
pub trait EditableField: Copy + Debug {
    /// Field name as the server reports it on read.
    fn name(self) -> &'static str;
}
