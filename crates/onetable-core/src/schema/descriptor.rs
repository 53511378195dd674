use crate::{
    error::InternalError,
    key::KeyCodec,
    model::{
        index::{Index, KeySource},
        record::{FieldKind, FieldMeta, Record, RecordFactory, RecordType},
    },
    schema::constraint::{Constraint, ConstraintError, parse_constraints},
    value::{AttributeValue, Fields, Item},
};
use std::{collections::BTreeMap, fmt};

/// Storage-name override marking a field as not persisted.
pub const NOT_PERSISTED: &str = "-";

///
/// SchemaDescriptor
///
/// Per-record-type table of stored names, write constraints, and the
/// resolver that turns a stored item back into a typed record.
///

pub struct SchemaDescriptor {
    type_name: String,
    fields: BTreeMap<String, FieldMeta>,
    storage_names: BTreeMap<String, String>,
    field_names: BTreeMap<String, String>,
    constraints: BTreeMap<String, Vec<Constraint>>,
    factory: RecordFactory,
}

impl SchemaDescriptor {
    pub fn build(record_type: &RecordType) -> Result<Self, InternalError> {
        let type_name = record_type.name.clone();
        let mut fields = BTreeMap::new();
        let mut storage_names = BTreeMap::new();
        let mut field_names: BTreeMap<String, String> = BTreeMap::new();

        for meta in &record_type.fields {
            if fields.insert(meta.name.clone(), meta.clone()).is_some() {
                return Err(InternalError::configuration(format!(
                    "record type '{type_name}' declares field '{}' twice",
                    meta.name
                )));
            }

            let stored = meta.storage_name.as_deref().unwrap_or(&meta.name);
            if stored == NOT_PERSISTED {
                storage_names.insert(meta.name.clone(), NOT_PERSISTED.to_string());
                continue;
            }
            if let Some(other) = field_names.insert(stored.to_string(), meta.name.clone()) {
                return Err(InternalError::configuration(format!(
                    "record type '{type_name}' maps fields '{other}' and '{}' to stored name '{stored}'",
                    meta.name
                )));
            }
            if stored != meta.name {
                storage_names.insert(meta.name.clone(), stored.to_string());
            }
        }

        let mut constraints = BTreeMap::new();
        for meta in &record_type.fields {
            let Some(text) = meta.constraints.as_deref() else {
                continue;
            };

            let parsed = parse_constraints(&meta.name, text)?;
            for constraint in &parsed {
                if let Some(other) = constraint.fields().iter().find(|f| !fields.contains_key(*f)) {
                    return Err(ConstraintError::UnknownField {
                        field: meta.name.clone(),
                        other: other.clone(),
                    }
                    .into());
                }
            }
            constraints.insert(meta.name.clone(), parsed);
        }

        Ok(Self {
            type_name,
            fields,
            storage_names,
            field_names,
            constraints,
            factory: record_type.factory.clone(),
        })
    }

    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&FieldMeta> {
        self.fields.get(name)
    }

    pub fn fields(&self) -> impl Iterator<Item = &FieldMeta> {
        self.fields.values()
    }

    #[must_use]
    pub fn kind(&self, field: &str) -> FieldKind {
        self.fields.get(field).map(|meta| meta.kind).unwrap_or_default()
    }

    /// Stored attribute name for a field; `None` when it is not persisted.
    #[must_use]
    pub fn storage_name<'a>(&'a self, field: &'a str) -> Option<&'a str> {
        match self.storage_names.get(field) {
            Some(stored) if stored == NOT_PERSISTED => None,
            Some(stored) => Some(stored),
            None => Some(field),
        }
    }

    /// Record field name behind a stored attribute name.
    #[must_use]
    pub fn field_name<'a>(&'a self, stored: &'a str) -> &'a str {
        self.field_names.get(stored).map_or(stored, String::as_str)
    }

    pub fn constraints(&self) -> impl Iterator<Item = (&str, &Constraint)> {
        self.constraints
            .iter()
            .flat_map(|(field, list)| list.iter().map(move |c| (field.as_str(), c)))
    }

    #[must_use]
    pub fn new_record(&self) -> Box<dyn Record> {
        (self.factory)()
    }

    /// Marshal record fields into a stored item, dropping null and
    /// non-persisted fields.
    #[must_use]
    pub fn to_item(&self, fields: &Fields) -> Item {
        fields
            .iter()
            .filter(|(_, value)| !matches!(value, AttributeValue::Null))
            .filter_map(|(name, value)| {
                self.storage_name(name)
                    .map(|stored| (stored.to_string(), value.clone()))
            })
            .collect()
    }

    /// Unmarshal a stored item into record fields.
    #[must_use]
    pub fn to_fields(&self, item: &Item) -> Fields {
        item.iter()
            .map(|(stored, value)| (self.field_name(stored).to_string(), value.clone()))
            .collect()
    }

    /// Rehydrate a stored item into a typed record, recovering fields that
    /// only live inside composite key values of the given indexes.
    pub fn resolve<'a>(
        &self,
        item: &Item,
        indexes: impl IntoIterator<Item = &'a Index>,
        codec: &KeyCodec,
    ) -> Result<Box<dyn Record>, InternalError> {
        let fields = self.resolve_fields(item, indexes, codec);

        let mut record = self.new_record();
        record.apply_fields(&fields)?;

        Ok(record)
    }

    /// Record fields of a stored item, including key-derived ones. A key
    /// value that does not fit this type's layout contributes no fields;
    /// it belongs to another record type sharing the partition.
    #[must_use]
    pub fn resolve_fields<'a>(
        &self,
        item: &Item,
        indexes: impl IntoIterator<Item = &'a Index>,
        codec: &KeyCodec,
    ) -> Fields {
        let mut fields = self.to_fields(item);

        for index in indexes {
            for attribute in index.key_attributes() {
                let Some(key) = attribute.key_fields(&self.type_name) else {
                    continue;
                };
                let Some(stored) = item.get(&attribute.name).and_then(AttributeValue::as_key_text)
                else {
                    continue;
                };

                let decoded = match codec.decode(&stored, key.len()) {
                    Ok(decoded) => decoded,
                    Err(err) => {
                        tracing::debug!(
                            type_name = %self.type_name,
                            index = %index,
                            attribute = %attribute.name,
                            error = %err,
                            "stored key outside type layout"
                        );
                        continue;
                    }
                };
                if decoded
                    .type_name
                    .as_deref()
                    .is_some_and(|name| name != self.type_name)
                {
                    continue;
                }

                for (key_field, part) in key.iter().zip(decoded.parts) {
                    let KeySource::Field(name) = &key_field.source else {
                        continue;
                    };
                    if fields.get(name).is_some_and(|v| !v.is_zero()) {
                        continue;
                    }
                    fields.insert(name.clone(), typed_value(self.kind(name), part));
                }
            }
        }

        fields
    }
}

impl fmt::Debug for SchemaDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaDescriptor")
            .field("type_name", &self.type_name)
            .field("storage_names", &self.storage_names)
            .field("constraints", &self.constraints)
            .finish_non_exhaustive()
    }
}

fn typed_value(kind: FieldKind, text: String) -> AttributeValue {
    match kind {
        FieldKind::Number => AttributeValue::N(text),
        FieldKind::Bool => AttributeValue::Bool(text == "true"),
        FieldKind::Binary => AttributeValue::B(text.into_bytes()),
        FieldKind::Text | FieldKind::Nested => AttributeValue::S(text),
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::ErrorClass,
        key::KeyChars,
        testing::{
            MemoryClient,
            fixtures::{User, open_table},
        },
    };
    use std::sync::Arc;

    fn descriptor() -> SchemaDescriptor {
        SchemaDescriptor::build(&RecordType::of::<User>()).expect("valid user schema")
    }

    #[test]
    fn storage_names_are_bidirectional() {
        let schema = descriptor();

        assert_eq!(schema.storage_name("id"), Some("pk"));
        assert_eq!(schema.field_name("pk"), "id");
        assert_eq!(schema.storage_name("email"), Some("email"));
        assert_eq!(schema.storage_name("session"), None);
    }

    #[test]
    fn marshal_drops_unpersisted_and_null_fields() {
        let schema = descriptor();
        let mut fields = Fields::new();
        fields.insert("id".into(), AttributeValue::text("u1"));
        fields.insert("session".into(), AttributeValue::text("tmp"));
        fields.insert("name".into(), AttributeValue::Null);

        let item = schema.to_item(&fields);
        assert_eq!(item.len(), 1);
        assert_eq!(item.get("pk"), Some(&AttributeValue::text("u1")));

        let back = schema.to_fields(&item);
        assert_eq!(back.get("id"), Some(&AttributeValue::text("u1")));
    }

    #[test]
    fn unique_constraints_are_collected() {
        let schema = descriptor();
        let constraints: Vec<_> = schema.constraints().collect();

        assert_eq!(constraints.len(), 1);
        assert_eq!(constraints[0].0, "email");
        assert_eq!(constraints[0].1.fields(), ["email", "tenant"]);
    }

    #[test]
    fn constraint_on_unknown_field_is_a_configuration_error() {
        let mut record_type = RecordType::of::<User>();
        record_type.fields[0].constraints = Some("unique(missing)".into());

        let err = SchemaDescriptor::build(&record_type).expect_err("unknown tuple field");
        assert_eq!(err.class, ErrorClass::Configuration);
        assert!(err.message.contains("unknown field 'missing'"));
    }

    #[test]
    fn colliding_storage_names_are_rejected() {
        let mut record_type = RecordType::of::<User>();
        record_type.fields.push(FieldMeta::text("alias").stored_as("email"));

        let err = SchemaDescriptor::build(&record_type).expect_err("collision");
        assert_eq!(err.class, ErrorClass::Configuration);
    }

    #[test]
    fn foreign_key_layout_recovers_no_key_fields() {
        let table = open_table(Arc::new(MemoryClient::new()));
        let schema = table.schema("Order").expect("order schema");
        let codec = KeyCodec::new(KeyChars::new(':', Some('*')).expect("chars"), false);

        let mut item = Item::new();
        item.insert("pk".into(), AttributeValue::text("t1"));
        item.insert("sk".into(), AttributeValue::text("Profile"));

        let fields = schema.resolve_fields(&item, table.indexes().iter(), &codec);
        assert_eq!(fields.get("tenant_id"), Some(&AttributeValue::text("t1")));
        assert_eq!(fields.get("kind"), None);
        assert_eq!(fields.get("created_at"), None);
    }

    #[test]
    fn discriminated_key_of_another_type_is_ignored() {
        let table = open_table(Arc::new(MemoryClient::new()));
        let schema = table.schema("Order").expect("order schema");
        let codec = KeyCodec::new(KeyChars::default(), true);

        let mut item = Item::new();
        item.insert("pk".into(), AttributeValue::text("t1"));
        item.insert("sk".into(), AttributeValue::text("Refund:order:2024"));

        let fields = schema.resolve_fields(&item, table.indexes().iter(), &codec);
        assert_eq!(fields.get("kind"), None);
    }
}
