use crate::{
    client::{ClientError, DeleteItemRequest, GetItemRequest, PutItemRequest},
    cursor::TokenShape,
    error::{ErrorClass, ErrorDetail, ErrorOrigin, InternalError, Operation, OperationError},
    index::{QueryShape, select_index},
    model::record::Record,
    obs::MetricsEvent,
    query::{ListQuery, PlanBuilder},
    schema::SchemaDescriptor,
    table::{Store, Table, keys, store_error},
    value::{Fields, Item},
};

impl Table {
    // Bracket one operation with metrics and wrap its failure.
    fn run<T>(
        &self,
        op: Operation,
        type_name: &str,
        body: impl FnOnce() -> Result<(T, u64), InternalError>,
    ) -> Result<T, OperationError> {
        self.metrics.record(MetricsEvent::OpStart { op, type_name });

        let result = body();
        let (ok, items) = match &result {
            Ok((_, items)) => (true, *items),
            Err(_) => (false, 0),
        };
        self.metrics.record(MetricsEvent::OpFinish {
            op,
            type_name,
            ok,
            items,
        });

        result
            .map(|(value, _)| value)
            .map_err(|err| OperationError::new(op, type_name, err))
    }

    // Stored item for a record: marshalled fields plus every populated
    // index key. The primary key is mandatory.
    fn to_stored_item(
        &self,
        schema: &SchemaDescriptor,
        fields: &Fields,
    ) -> Result<Item, InternalError> {
        let type_name = schema.type_name();
        let mut item = schema.to_item(fields);

        let primary = keys::primary_key(self.indexes.primary(), type_name, fields, &self.codec)?;
        item.extend(primary);

        for index in self.indexes.iter().filter(|index| !index.is_primary()) {
            if let Some(key) = keys::index_key(index, type_name, fields, &self.codec)? {
                item.extend(key);
            }
        }

        Ok(item)
    }

    // Validate every constraint whose tuple intersects `changed`; `None`
    // checks them all.
    fn check_constraints(
        &self,
        schema: &SchemaDescriptor,
        fields: &Fields,
        changed: Option<&Fields>,
    ) -> Result<(), InternalError> {
        for (field, constraint) in schema.constraints() {
            if fields.get(field).is_none_or(|value| value.is_zero()) {
                continue;
            }
            let affected = changed.is_none_or(|changed| {
                constraint.fields().iter().any(|f| changed.contains_key(f))
            });
            if affected {
                self.check_unique(schema, fields, constraint.fields())?;
            }
        }

        Ok(())
    }

    fn put(&self, item: Item, condition: Option<String>) -> Result<(), ClientError> {
        self.client.put_item(PutItemRequest {
            table_name: self.name.clone(),
            item,
            condition_expression: condition,
        })
    }

    fn create_record(&self, record: &dyn Record) -> Result<(), InternalError> {
        let schema = self.registered_schema(record.type_name())?;
        let fields = record.fields();

        self.check_constraints(schema, &fields, None)?;
        let item = self.to_stored_item(schema, &fields)?;

        let condition = self
            .indexes
            .primary()
            .key_attributes()
            .map(|attribute| format!("attribute_not_exists({})", attribute.name))
            .collect::<Vec<_>>()
            .join(" AND ");

        self.put(item, Some(condition)).map_err(|err| match err {
            ClientError::ConditionalCheckFailed(_) => InternalError::client(
                ErrorClass::Internal,
                "unique id check failed, retry with a new id value",
                err,
            ),
            other => store_error("put failed", other),
        })
    }

    fn read_record(&self, record: &mut dyn Record) -> Result<(), InternalError> {
        let schema = self.registered_schema(record.type_name())?;
        let type_name = schema.type_name();
        let primary = self.indexes.primary();

        let key = keys::primary_key(primary, type_name, &record.fields(), &self.codec)?;
        let consistency = record.consistency().unwrap_or(self.consistency_default);

        let item = self
            .client
            .get_item(GetItemRequest {
                table_name: self.name.clone(),
                key: key.clone(),
                consistent_read: consistency.consistent_read(primary.consistent_reads),
            })
            .map_err(|err| match err {
                ClientError::ResourceNotFound(_) => {
                    InternalError::not_found(type_name, &key).with_detail(ErrorDetail::Client(err))
                }
                other => store_error("get failed", other),
            })?
            .ok_or_else(|| InternalError::not_found(type_name, &key))?;

        let fields = schema.resolve_fields(&item, self.indexes.iter(), &self.codec);
        record.apply_fields(&fields)
    }

    fn update_record(
        &self,
        current: &mut dyn Record,
        patch: &dyn Record,
    ) -> Result<(), InternalError> {
        if current.type_name() != patch.type_name() {
            return Err(InternalError::new(
                ErrorClass::Validation,
                ErrorOrigin::Store,
                format!(
                    "cannot patch {} with a {}",
                    current.type_name(),
                    patch.type_name()
                ),
            ));
        }

        let schema = self.registered_schema(current.type_name())?;
        let type_name = schema.type_name();
        let mut merged = current.fields();

        let changed: Fields = patch
            .fields()
            .into_iter()
            .filter(|(_, value)| !value.is_zero())
            .filter(|(name, value)| merged.get(name) != Some(value))
            .collect();
        if changed.is_empty() {
            tracing::debug!(type_name, "update has no changes");
            return Ok(());
        }

        let primary = self.indexes.primary();
        if let Some(field) = changed.keys().find(|f| primary.is_key_field(type_name, f)) {
            return Err(InternalError::key_validation(format!(
                "{type_name} primary key field '{field}' cannot be updated"
            )));
        }

        merged.extend(changed.clone());
        self.check_constraints(schema, &merged, Some(&changed))?;

        let item = self.to_stored_item(schema, &merged)?;
        self.put(item, None).map_err(|err| store_error("put failed", err))?;

        current.apply_fields(&merged)
    }

    fn delete_record(&self, record: &dyn Record) -> Result<(), InternalError> {
        let schema = self.registered_schema(record.type_name())?;
        let type_name = schema.type_name();
        let primary = self.indexes.primary();

        let key = keys::primary_key(primary, type_name, &record.fields(), &self.codec)?;
        let condition = self
            .fail_delete_if_not_present
            .then(|| format!("attribute_exists({})", primary.pk.name));

        self.client
            .delete_item(DeleteItemRequest {
                table_name: self.name.clone(),
                key: key.clone(),
                condition_expression: condition,
            })
            .map_err(|err| match err {
                ClientError::ConditionalCheckFailed(_) | ClientError::ResourceNotFound(_) => {
                    InternalError::not_found(type_name, &key)
                        .with_detail(ErrorDetail::Client(err))
                }
                other => store_error("delete failed", other),
            })
    }

    fn list_records(&self, query: &mut ListQuery) -> Result<u64, InternalError> {
        let schema = self.registered_schema(&query.type_name)?;
        let type_name = schema.type_name();

        let consistency = query.consistency.unwrap_or(self.consistency_default);
        let shape = QueryShape {
            type_name,
            fields: &query.fields,
            ascending: query.ascending,
            consistency,
        };
        let selection = select_index(&self.indexes, &shape, self.codec.chars())?;
        self.metrics.record(MetricsEvent::IndexSelected {
            type_name,
            index: &selection.index.name,
        });

        let token_shape = TokenShape {
            table: &self.name,
            type_name,
            index: &selection.index.name,
        };
        let start_key = self
            .tokens
            .untokenize(&token_shape, query.page_token.as_deref())
            .inspect_err(|err| {
                tracing::warn!(type_name, error = %err, "continuation token rejected");
                self.metrics.record(MetricsEvent::TokenRejected { type_name });
            })?;

        let builder = PlanBuilder {
            schema,
            codec: self.codec,
            limits: self.limits,
        };
        let plan = builder.build(query, &selection, start_key)?;

        let output = self
            .client
            .query(plan.to_request(&self.name))
            .map_err(|err| match err {
                ClientError::ResourceNotFound(_) => InternalError::client(
                    ErrorClass::Unsupported,
                    match &plan.index_name {
                        Some(index) => format!("unprocessable index '{index}'"),
                        None => format!("unprocessable table '{}'", self.name),
                    },
                    err,
                ),
                other => store_error("query failed", other),
            })?;

        let next_page_token = self
            .tokens
            .tokenize(&token_shape, output.last_evaluated_key.as_ref())?;

        let mut items = Vec::with_capacity(output.items.len());
        for item in &output.items {
            let resolver = self.resolver_for(item, schema);
            items.push(resolver.resolve(item, self.indexes.iter(), &self.codec)?);
        }

        let count = u64::try_from(items.len()).unwrap_or(u64::MAX);
        query.items = items;
        query.next_page_token = next_page_token;

        Ok(count)
    }
}

impl Store for Table {
    fn create(&self, record: &dyn Record) -> Result<(), OperationError> {
        self.run(Operation::Create, record.type_name(), || {
            self.create_record(record).map(|()| ((), 1))
        })
    }

    fn read(&self, record: &mut dyn Record) -> Result<(), OperationError> {
        let type_name = record.type_name();

        self.run(Operation::Read, type_name, || {
            self.read_record(record).map(|()| ((), 1))
        })
    }

    fn update(&self, current: &mut dyn Record, patch: &dyn Record) -> Result<(), OperationError> {
        let type_name = current.type_name();

        self.run(Operation::Update, type_name, || {
            self.update_record(current, patch).map(|()| ((), 1))
        })
    }

    fn delete(&self, record: &dyn Record) -> Result<(), OperationError> {
        self.run(Operation::Delete, record.type_name(), || {
            self.delete_record(record).map(|()| ((), 1))
        })
    }

    fn list(&self, query: &mut ListQuery) -> Result<(), OperationError> {
        let type_name = query.type_name.clone();

        self.run(Operation::List, &type_name, || {
            self.list_records(query).map(|count| ((), count))
        })
    }
}
