//! Fixture record types and the table they live in.
//!
//! `User` keeps its id in the partition key under a pinned `Profile` sort
//! key and is unique per (email, tenant) through `gsi1`. `Order` packs
//! `kind` and `created_at` into a composite sort key and is also reachable
//! by id through `gsi1`.

use crate::{
    client::{IndexDescription, KeySchemaElement, TableDescription},
    cursor::Aes256GcmCipher,
    error::{ErrorClass, ErrorOrigin, InternalError},
    model::record::{FieldMeta, Persistable, Record, RecordType},
    table::{Table, TableConfig},
    testing::MemoryClient,
    value::{AttributeValue, Fields},
};
use std::{collections::BTreeMap, sync::Arc};

/// Token key used by [`open_table`].
pub const TOKEN_KEY: [u8; 32] = [9; 32];

/// Primary `pk`/`sk`, local index `lsi1` on `lsi1sk`, global index `gsi1`
/// on `gsi1pk`/`gsi1sk`.
#[must_use]
pub fn table_description() -> TableDescription {
    TableDescription {
        key_schema: vec![
            KeySchemaElement::partition("pk"),
            KeySchemaElement::sort("sk"),
        ],
        local_secondary_indexes: vec![IndexDescription {
            index_name: "lsi1".into(),
            key_schema: vec![
                KeySchemaElement::partition("pk"),
                KeySchemaElement::sort("lsi1sk"),
            ],
        }],
        global_secondary_indexes: vec![IndexDescription {
            index_name: "gsi1".into(),
            key_schema: vec![
                KeySchemaElement::partition("gsi1pk"),
                KeySchemaElement::sort("gsi1sk"),
            ],
        }],
        attribute_types: BTreeMap::new(),
    }
}

/// Fixture configuration: table `app`, `*` as the query wildcard.
#[must_use]
pub fn table_config() -> TableConfig {
    TableConfig::new("app", Arc::new(Aes256GcmCipher::new(&TOKEN_KEY))).query_wildcard('*')
}

/// Open the fixture table with both record types registered.
#[must_use]
pub fn open_table(client: Arc<MemoryClient>) -> Table {
    open_table_with(table_config(), client)
}

#[must_use]
pub fn open_table_with(config: TableConfig, client: Arc<MemoryClient>) -> Table {
    Table::open(config, client, &record_types()).expect("fixture table opens")
}

#[must_use]
pub fn record_types() -> Vec<RecordType> {
    vec![RecordType::of::<User>(), RecordType::of::<Order>()]
}

///
/// User
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct User {
    pub id: String,
    pub email: String,
    pub tenant: String,
    pub name: String,
    pub session: String,
}

impl Record for User {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn fields(&self) -> Fields {
        [
            ("id", &self.id),
            ("email", &self.email),
            ("tenant", &self.tenant),
            ("name", &self.name),
            ("session", &self.session),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), AttributeValue::text(value.as_str())))
        .collect()
    }

    fn apply_fields(&mut self, fields: &Fields) -> Result<(), InternalError> {
        for (name, value) in fields {
            let slot = match name.as_str() {
                "id" => &mut self.id,
                "email" => &mut self.email,
                "tenant" => &mut self.tenant,
                "name" => &mut self.name,
                "session" => &mut self.session,
                _ => continue,
            };
            *slot = text(name, value)?;
        }

        Ok(())
    }
}

impl Persistable for User {
    const TYPE_NAME: &'static str = "User";

    fn field_meta() -> Vec<FieldMeta> {
        vec![
            FieldMeta::text("id").stored_as("pk").keys("pk,sk='Profile'"),
            FieldMeta::text("email")
                .keys("gsi1:pk")
                .constraints("unique(tenant)"),
            FieldMeta::text("tenant").keys("gsi1:sk"),
            FieldMeta::text("name"),
            FieldMeta::text("session").stored_as("-"),
        ]
    }
}

///
/// Order
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Order {
    pub tenant_id: String,
    pub kind: String,
    pub created_at: String,
    pub id: String,
    pub status: String,
    pub note: String,
    pub total: i64,
    pub lines: Vec<String>,
}

impl Record for Order {
    fn type_name(&self) -> &'static str {
        Self::TYPE_NAME
    }

    fn fields(&self) -> Fields {
        let mut fields: Fields = [
            ("tenant_id", &self.tenant_id),
            ("kind", &self.kind),
            ("created_at", &self.created_at),
            ("id", &self.id),
            ("status", &self.status),
            ("note", &self.note),
        ]
        .into_iter()
        .map(|(name, value)| (name.to_string(), AttributeValue::text(value.as_str())))
        .collect();

        fields.insert("total".into(), AttributeValue::number(self.total));
        let lines = self.lines.iter().map(|l| AttributeValue::text(l.as_str()));
        fields.insert("lines".into(), AttributeValue::L(lines.collect()));

        fields
    }

    fn apply_fields(&mut self, fields: &Fields) -> Result<(), InternalError> {
        for (name, value) in fields {
            let slot = match name.as_str() {
                "tenant_id" => &mut self.tenant_id,
                "kind" => &mut self.kind,
                "created_at" => &mut self.created_at,
                "id" => &mut self.id,
                "status" => &mut self.status,
                "note" => &mut self.note,
                "total" => {
                    self.total = text(name, value)?
                        .parse::<i64>()
                        .map_err(|_| mismatch(name, value))?;
                    continue;
                }
                "lines" => {
                    let AttributeValue::L(items) = value else {
                        return Err(mismatch(name, value));
                    };
                    self.lines = items
                        .iter()
                        .map(|item| text(name, item))
                        .collect::<Result<_, _>>()?;
                    continue;
                }
                _ => continue,
            };
            *slot = text(name, value)?;
        }

        Ok(())
    }
}

impl Persistable for Order {
    const TYPE_NAME: &'static str = "Order";

    fn field_meta() -> Vec<FieldMeta> {
        vec![
            FieldMeta::text("tenant_id").keys("pk"),
            FieldMeta::text("kind").keys("sk.0"),
            FieldMeta::text("created_at").keys("sk.1, gsi1:sk"),
            FieldMeta::text("id").keys("!gsi1:pk"),
            FieldMeta::text("status"),
            FieldMeta::text("note"),
            FieldMeta::number("total"),
            FieldMeta::nested("lines"),
        ]
    }
}

fn text(name: &str, value: &AttributeValue) -> Result<String, InternalError> {
    value.as_key_text().ok_or_else(|| mismatch(name, value))
}

fn mismatch(name: &str, value: &AttributeValue) -> InternalError {
    InternalError::new(
        ErrorClass::Internal,
        ErrorOrigin::Serialize,
        format!("field '{name}' cannot hold {value}"),
    )
}

///
/// TESTS
///
