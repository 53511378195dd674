use crate::{
    client::{KeyRole, KeySchemaElement, ScalarType, TableDescription},
    error::InternalError,
    key::KeyChars,
    model::index::{CompositeKey, Index, IndexKind, KeyAttribute, KeyField, KeyPart, KeySource},
    schema::{
        SchemaDescriptor,
        keys::parse_key_statements,
        slots::KeySlots,
    },
};
use std::collections::BTreeMap;
use thiserror::Error as ThisError;

///
/// IndexSetupError
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum IndexSetupError {
    #[error("index {index} key schema has no partition key")]
    MissingPartitionKey { index: String },

    #[error("index {index} key schema is invalid: {reason}")]
    InvalidKeySchema { index: String, reason: String },

    #[error(
        "index {index} slot {attribute}[{type_name}][{position}] claimed by both '{existing}' and '{field}'"
    )]
    DuplicateSlot {
        index: String,
        attribute: String,
        type_name: String,
        position: usize,
        existing: String,
        field: String,
    },

    #[error("index {index} is missing a key field: {attribute}[{type_name}][{position}]")]
    MissingKeyField {
        index: String,
        attribute: String,
        type_name: String,
        position: usize,
    },

    #[error("index {index} shares the table partition key, '{field}' cannot be assigned to it")]
    LocalPartitionKey { index: String, field: String },

    #[error("literal '{literal}' in {attribute}[{type_name}] contains the value separator")]
    LiteralHasSeparator {
        attribute: String,
        type_name: String,
        literal: String,
    },
}

impl From<IndexSetupError> for InternalError {
    fn from(err: IndexSetupError) -> Self {
        Self::configuration(err.to_string())
    }
}

///
/// IndexRegistry
///
/// Every index of one table, primary first, then secondaries by name.
/// Immutable once built.
///

#[derive(Clone, Debug)]
pub struct IndexRegistry {
    indexes: Vec<Index>,
}

impl IndexRegistry {
    /// Build all indexes and assign every record type's key fields.
    pub fn build(
        description: &TableDescription,
        schemas: &[&SchemaDescriptor],
        chars: KeyChars,
    ) -> Result<Self, InternalError> {
        let mut builders = Vec::new();

        let primary = IndexBuilder::from_schema(
            "",
            IndexKind::Primary,
            &description.key_schema,
            description,
        )?;
        for lsi in &description.local_secondary_indexes {
            builders.push(IndexBuilder::from_schema(
                &lsi.index_name,
                IndexKind::LocalSecondary,
                &lsi.key_schema,
                description,
            )?);
        }
        for gsi in &description.global_secondary_indexes {
            builders.push(IndexBuilder::from_schema(
                &gsi.index_name,
                IndexKind::GlobalSecondary,
                &gsi.key_schema,
                description,
            )?);
        }
        builders.sort_by(|a, b| a.name.cmp(&b.name));
        builders.insert(0, primary);

        for schema in schemas {
            assign_record_type(&mut builders, schema, chars)?;
        }

        // Local indexes always share the table's partition key.
        let table_pk = builders[0].pk.attribute.clone();
        for builder in &mut builders[1..] {
            if builder.kind == IndexKind::LocalSecondary {
                builder.pk.name.clone_from(&table_pk.name);
                builder.pk.attribute = table_pk.clone();
            }
        }

        let indexes = builders.into_iter().map(IndexBuilder::finish).collect();

        Ok(Self { indexes })
    }

    #[must_use]
    pub fn primary(&self) -> &Index {
        &self.indexes[0]
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Index> {
        self.indexes.iter().find(|index| index.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Index> {
        self.indexes.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.indexes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indexes.is_empty()
    }
}

// Parse every field's statements into slot arenas, then densify or default
// each key attribute for this record type.
fn assign_record_type(
    builders: &mut [IndexBuilder],
    schema: &SchemaDescriptor,
    chars: KeyChars,
) -> Result<(), InternalError> {
    let type_name = schema.type_name();
    let mut arenas: BTreeMap<(String, KeyPart), KeySlots> = BTreeMap::new();

    let has_sort_key = |name: &str| {
        builders
            .iter()
            .find(|b| b.name == name)
            .map(|b| b.sk.is_some())
    };

    for meta in schema.fields() {
        let Some(text) = meta.keys.as_deref() else {
            continue;
        };

        for assignment in parse_key_statements(&meta.name, text, &has_sort_key)? {
            let field = assignment.key_field.source.to_string();
            let local = builders
                .iter()
                .any(|b| b.name == assignment.index && b.kind == IndexKind::LocalSecondary);
            if local && assignment.part == KeyPart::Partition {
                return Err(IndexSetupError::LocalPartitionKey {
                    index: assignment.index,
                    field,
                }
                .into());
            }

            let slots = arenas
                .entry((assignment.index.clone(), assignment.part))
                .or_default();

            if let Err(conflict) = slots.insert(assignment.position, assignment.key_field) {
                let index = index_label(&assignment.index);
                let attribute = builders
                    .iter()
                    .find(|b| b.name == assignment.index)
                    .and_then(|b| b.attribute(assignment.part))
                    .map(|a| a.name.clone())
                    .unwrap_or_default();

                return Err(IndexSetupError::DuplicateSlot {
                    index,
                    attribute,
                    type_name: type_name.to_string(),
                    position: assignment.position,
                    existing: conflict.existing.source.to_string(),
                    field,
                }
                .into());
            }
        }
    }

    for builder in builders.iter_mut() {
        let index = index_label(&builder.name);
        for part in [KeyPart::Partition, KeyPart::Sort] {
            let builder_name = builder.name.clone();
            let Some(attribute) = builder.attribute_mut(part) else {
                continue;
            };

            let key = match arenas.remove(&(builder_name, part)) {
                Some(slots) => slots.finish().map_err(|gap| IndexSetupError::MissingKeyField {
                    index: index.clone(),
                    attribute: attribute.name.clone(),
                    type_name: type_name.to_string(),
                    position: gap.position,
                })?,
                None => default_key(schema, &attribute.name),
            };

            for key_field in key.iter() {
                if let KeySource::Literal(literal) = &key_field.source
                    && literal.contains(chars.separator())
                {
                    return Err(IndexSetupError::LiteralHasSeparator {
                        attribute: attribute.name.clone(),
                        type_name: type_name.to_string(),
                        literal: literal.clone(),
                    }
                    .into());
                }
            }

            attribute.fields_by_type.insert(type_name.to_string(), key);
        }
    }

    Ok(())
}

// A key attribute with no statements defaults to the field stored under the
// attribute's own name, ascending.
fn default_key(schema: &SchemaDescriptor, attribute: &str) -> CompositeKey {
    let field = schema.field_name(attribute).to_string();

    CompositeKey::from_dense(vec![KeyField::field(field)])
}

fn index_label(name: &str) -> String {
    if name.is_empty() {
        "primary".to_string()
    } else {
        name.to_string()
    }
}

///
/// IndexBuilder
///

struct IndexBuilder {
    name: String,
    kind: IndexKind,
    pk: AttributeBuilder,
    sk: Option<AttributeBuilder>,
}

impl IndexBuilder {
    fn from_schema(
        name: &str,
        kind: IndexKind,
        key_schema: &[KeySchemaElement],
        description: &TableDescription,
    ) -> Result<Self, IndexSetupError> {
        let scalar = |attr: &str| {
            description
                .attribute_types
                .get(attr)
                .copied()
                .unwrap_or(ScalarType::S)
        };

        let mut pk = None;
        let mut sk = None;
        for element in key_schema {
            let slot = match element.role {
                KeyRole::Partition => &mut pk,
                KeyRole::Sort => &mut sk,
            };
            if slot.is_some() {
                return Err(IndexSetupError::InvalidKeySchema {
                    index: index_label(name),
                    reason: format!("duplicate {:?} key", element.role),
                });
            }
            *slot = Some(AttributeBuilder::new(
                &element.attribute_name,
                scalar(&element.attribute_name),
            ));
        }

        let pk = pk.ok_or_else(|| IndexSetupError::MissingPartitionKey {
            index: index_label(name),
        })?;

        Ok(Self {
            name: name.to_string(),
            kind,
            pk,
            sk,
        })
    }

    fn attribute(&self, part: KeyPart) -> Option<&AttributeBuilder> {
        match part {
            KeyPart::Partition => Some(&self.pk),
            KeyPart::Sort => self.sk.as_ref(),
        }
    }

    fn attribute_mut(&mut self, part: KeyPart) -> Option<&mut KeyAttribute> {
        match part {
            KeyPart::Partition => Some(&mut self.pk.attribute),
            KeyPart::Sort => match &mut self.sk {
                Some(sk) => Some(&mut sk.attribute),
                None => None,
            },
        }
    }

    fn finish(self) -> Index {
        Index {
            name: self.name,
            kind: self.kind,
            pk: self.pk.attribute,
            sk: self.sk.map(|sk| sk.attribute),
            consistent_reads: !matches!(self.kind, IndexKind::GlobalSecondary),
        }
    }
}

///
/// AttributeBuilder
///

struct AttributeBuilder {
    name: String,
    attribute: KeyAttribute,
}

impl AttributeBuilder {
    fn new(name: &str, scalar_type: ScalarType) -> Self {
        Self {
            name: name.to_string(),
            attribute: KeyAttribute {
                name: name.to_string(),
                scalar_type,
                fields_by_type: BTreeMap::new(),
            },
        }
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
        model::{
            index::SortOrder,
            record::{FieldMeta, RecordType},
        },
        testing::fixtures::{Order, User, table_description},
    };

    fn build(types: &[RecordType]) -> Result<IndexRegistry, InternalError> {
        let schemas = types
            .iter()
            .map(SchemaDescriptor::build)
            .collect::<Result<Vec<_>, _>>()?;
        let refs: Vec<_> = schemas.iter().collect();

        IndexRegistry::build(&table_description(), &refs, KeyChars::default())
    }

    fn with_fields(fields: Vec<FieldMeta>) -> RecordType {
        let mut record_type = RecordType::of::<User>();
        record_type.name = "Widget".into();
        record_type.fields = fields;
        record_type
    }

    #[test]
    fn indexes_are_primary_first_then_by_name() {
        let registry = build(&[RecordType::of::<User>()]).expect("valid setup");
        let names: Vec<_> = registry.iter().map(|i| i.name.as_str()).collect();

        assert_eq!(names, vec!["", "gsi1", "lsi1"]);
        assert!(registry.primary().consistent_reads);
        assert!(registry.get("lsi1").expect("lsi").consistent_reads);
        assert!(!registry.get("gsi1").expect("gsi").consistent_reads);
        assert_eq!(registry.get("lsi1").expect("lsi").pk.name, "pk");
    }

    #[test]
    fn composite_sort_key_is_assembled_in_slot_order() {
        let registry = build(&[RecordType::of::<Order>()]).expect("valid setup");
        let sk = registry.primary().sk.as_ref().expect("sort key");
        let key = sk.key_fields("Order").expect("order key");

        let names: Vec<_> = key.iter().map(|kf| kf.field_name()).collect();
        assert_eq!(names, vec![Some("kind"), Some("created_at")]);
    }

    #[test]
    fn missing_statements_default_to_same_named_field() {
        let registry = build(&[RecordType::of::<User>()]).expect("valid setup");
        let lsi = registry.get("lsi1").expect("lsi");
        let key = lsi.sk.as_ref().expect("sk").key_fields("User").expect("user");

        assert_eq!(key.len(), 1);
        assert_eq!(key[0].field_name(), Some("lsi1sk"));
        assert_eq!(key[0].order, SortOrder::Asc);
    }

    #[test]
    fn gap_in_composite_is_fatal() {
        let err = build(&[with_fields(vec![
            FieldMeta::text("id").stored_as("pk"),
            FieldMeta::text("a").keys("sk.0"),
            FieldMeta::text("c").keys("sk.2"),
        ])])
        .expect_err("gap at position 1");

        assert_eq!(err.class, ErrorClass::Configuration);
        assert_eq!(
            err.message,
            "index primary is missing a key field: sk[Widget][1]"
        );
    }

    #[test]
    fn duplicate_slot_is_fatal() {
        let err = build(&[with_fields(vec![
            FieldMeta::text("id").keys("pk"),
            FieldMeta::text("other").keys("pk"),
        ])])
        .expect_err("same slot twice");

        assert_eq!(err.class, ErrorClass::Configuration);
        assert!(err.message.contains("claimed by both 'id' and 'other'"));
    }

    #[test]
    fn local_index_partition_statement_is_rejected() {
        let err = build(&[with_fields(vec![
            FieldMeta::text("id").stored_as("pk"),
            FieldMeta::text("owner").keys("lsi1:pk"),
        ])])
        .expect_err("local partition key is fixed");

        assert_eq!(err.class, ErrorClass::Configuration);
        assert_eq!(
            err.message,
            "index lsi1 shares the table partition key, 'owner' cannot be assigned to it"
        );
    }

    #[test]
    fn undeclared_index_is_fatal() {
        let err = build(&[with_fields(vec![FieldMeta::text("id").keys("gsi9:pk")])])
            .expect_err("unknown index");

        assert_eq!(err.class, ErrorClass::Configuration);
        assert!(err.message.contains("undefined index 'gsi9'"));
    }

    #[test]
    fn rebuilding_is_deterministic() {
        let a = build(&[RecordType::of::<User>(), RecordType::of::<Order>()]).expect("setup");
        let b = build(&[RecordType::of::<User>(), RecordType::of::<Order>()]).expect("setup");

        for (left, right) in a.iter().zip(b.iter()) {
            for (la, ra) in left.key_attributes().zip(right.key_attributes()) {
                assert_eq!(la.fields_by_type, ra.fields_by_type);
            }
        }
    }
}
