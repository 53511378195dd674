//! Uniqueness checking.
//!
//! A unique tuple is verified by querying for other records holding the
//! same values. Pages grow 1, 101, 201, ... and at most
//! [`UNIQUE_CHECK_CEILING`] items are evaluated in total. The check races
//! with concurrent writers; only the conditional put on create guards the
//! primary key itself.

use crate::{
    consistency::ConsistencyType,
    error::{ErrorClass, ErrorOrigin, InternalError},
    index::{QueryShape, select_index},
    obs::MetricsEvent,
    query::{ListQuery, PlanBuilder},
    schema::SchemaDescriptor,
    table::{Table, keys, store_error},
    value::{Fields, Item},
};

/// Upper bound on items evaluated by one uniqueness check.
pub const UNIQUE_CHECK_CEILING: u32 = 300;

const FIRST_PAGE_LIMIT: u32 = 1;
const PAGE_LIMIT_STEP: u32 = 100;

impl Table {
    /// Fail with a conflict if another stored record holds the same values
    /// for `tuple`. A record matching `fields`' own primary key is ignored.
    pub(crate) fn check_unique(
        &self,
        schema: &SchemaDescriptor,
        fields: &Fields,
        tuple: &[String],
    ) -> Result<(), InternalError> {
        let type_name = schema.type_name();

        let mut query = ListQuery::new(type_name);
        for field in tuple {
            if let Some(value) = fields.get(field) {
                query.fields.insert(field.clone(), value.clone());
            }
        }
        query.consistency = Some(ConsistencyType::Preferred);

        let shape = QueryShape {
            type_name,
            fields: &query.fields,
            ascending: None,
            consistency: ConsistencyType::Preferred,
        };
        let selection = select_index(&self.indexes, &shape, self.codec.chars())?;
        let builder = PlanBuilder {
            schema,
            codec: self.codec,
            limits: self.limits,
        };
        let mut plan = builder.build(&query, &selection, None)?;

        let own_key = keys::index_key(self.indexes.primary(), type_name, fields, &self.codec)?;

        let mut evaluated = 0;
        let mut limit = FIRST_PAGE_LIMIT;
        loop {
            plan.limit = limit
                .min(self.limits.max)
                .min(UNIQUE_CHECK_CEILING - evaluated);

            let request = plan.to_request(&self.name);
            let output = self
                .client
                .query(request)
                .map_err(|err| store_error("uniqueness query failed", err))?;
            evaluated += plan.limit;

            tracing::debug!(
                type_name,
                tuple = ?tuple,
                limit = plan.limit,
                items = output.items.len(),
                evaluated,
                "uniqueness probe"
            );
            self.metrics.record(MetricsEvent::UniqueProbe {
                type_name,
                limit: plan.limit,
                items: u64::try_from(output.items.len()).unwrap_or(u64::MAX),
            });

            if let Some(existing) = output
                .items
                .into_iter()
                .find(|item| !is_self(self, own_key.as_ref(), item))
            {
                self.metrics.record(MetricsEvent::UniqueViolation { type_name });
                return Err(InternalError::unique_violation(type_name, tuple, existing));
            }

            let Some(next) = output.last_evaluated_key else {
                return Ok(());
            };
            if evaluated >= UNIQUE_CHECK_CEILING {
                return Err(InternalError::new(
                    ErrorClass::LimitExceeded,
                    ErrorOrigin::Constraint,
                    format!(
                        "too many checks to verify uniqueness of {type_name} ({})",
                        tuple.join(", ")
                    ),
                ));
            }

            plan.exclusive_start_key = Some(next);
            limit = limit.saturating_add(PAGE_LIMIT_STEP);
        }
    }
}

fn is_self(table: &Table, own_key: Option<&Item>, item: &Item) -> bool {
    own_key.is_some_and(|key| keys::same_primary_key(table.indexes.primary(), key, item))
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        client::{ClientError, QueryOutput},
        model::record::Record,
        testing::{
            MemoryClient, Request,
            fixtures::{User, open_table},
        },
        value::AttributeValue,
    };
    use std::sync::Arc;

    fn user(id: &str, email: &str) -> User {
        User {
            id: id.into(),
            email: email.into(),
            tenant: "t1".into(),
            name: "Ada".into(),
            session: String::new(),
        }
    }

    fn tuple() -> Vec<String> {
        vec!["email".into(), "tenant".into()]
    }

    fn check(client: &Arc<MemoryClient>, candidate: &User) -> Result<(), InternalError> {
        let table = open_table(client.clone());
        let schema = table.registered_schema("User").expect("user schema");

        table.check_unique(schema, &candidate.fields(), &tuple())
    }

    fn stored(id: &str) -> Item {
        let mut item = Item::new();
        item.insert("pk".into(), AttributeValue::text(id));
        item.insert("sk".into(), AttributeValue::text("Profile"));
        item
    }

    fn page(items: Vec<Item>, more: bool) -> QueryOutput {
        let last_evaluated_key = more.then(|| stored("cursor"));
        QueryOutput {
            items,
            last_evaluated_key,
        }
    }

    #[test]
    fn empty_first_probe_is_unique_in_one_round_trip() {
        let client = Arc::new(MemoryClient::new());
        client.push_page(Ok(page(vec![], false)));

        check(&client, &user("u1", "a@b.c")).expect("unique");

        let queries = client.queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].limit, 1);
        assert_eq!(queries[0].index_name.as_deref(), Some("gsi1"));
        assert!(!queries[0].consistent_read);
    }

    #[test]
    fn hit_reports_the_colliding_item() {
        let client = Arc::new(MemoryClient::new());
        client.push_page(Ok(page(vec![stored("u2")], true)));

        let err = check(&client, &user("u1", "a@b.c")).expect_err("taken");
        assert_eq!(err.class, ErrorClass::Conflict);
        assert_eq!(err.existing_item(), Some(&stored("u2")));
    }

    #[test]
    fn own_item_is_not_a_collision() {
        let client = Arc::new(MemoryClient::new());
        client.push_page(Ok(page(vec![stored("u1")], false)));

        check(&client, &user("u1", "a@b.c")).expect("self hit ignored");
    }

    #[test]
    fn limits_escalate_within_the_page_bound() {
        let client = Arc::new(MemoryClient::new());
        client.push_page(Ok(page(vec![], true)));
        client.push_page(Ok(page(vec![], true)));
        client.push_page(Ok(page(vec![], false)));

        check(&client, &user("u1", "a@b.c")).expect("unique");

        let limits: Vec<_> = client.queries().iter().map(|q| q.limit).collect();
        assert_eq!(limits, vec![1, 100, 100]);
        assert!(client.queries()[1].exclusive_start_key.is_some());
    }

    #[test]
    fn ceiling_stops_the_probe() {
        let client = Arc::new(MemoryClient::new());
        for _ in 0..10 {
            client.push_page(Ok(page(vec![], true)));
        }

        let err = check(&client, &user("u1", "a@b.c")).expect_err("ceiling");
        assert_eq!(err.class, ErrorClass::LimitExceeded);

        let limits: Vec<u32> = client.queries().iter().map(|q| q.limit).collect();
        assert_eq!(limits.iter().sum::<u32>(), UNIQUE_CHECK_CEILING);
        assert_eq!(limits, vec![1, 100, 100, 99]);
    }

    #[test]
    fn store_failures_keep_their_class() {
        let client = Arc::new(MemoryClient::new());
        client.push_page(Err(ClientError::ThroughputExceeded("busy".into())));

        let err = check(&client, &user("u1", "a@b.c")).expect_err("throttled");
        assert!(err.is_retriable());
        assert!(matches!(
            client.requests().last(),
            Some(Request::Query(_))
        ));
    }
}
