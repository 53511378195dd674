use crate::{
    client::{
        ClientError, DeleteItemRequest, GetItemRequest, KeyRole, PutItemRequest, QueryOutput,
        QueryRequest, StoreClient, TableDescription,
    },
    testing::fixtures,
    value::{AttributeValue, Item},
};
use std::{
    cmp::Ordering,
    collections::{BTreeMap, VecDeque},
    sync::{Mutex, MutexGuard, PoisonError},
};

///
/// Request
///
/// One call received by a [`MemoryClient`], in arrival order.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Request {
    Describe(String),
    Get(GetItemRequest),
    Put(PutItemRequest),
    Delete(DeleteItemRequest),
    Query(QueryRequest),
}

///
/// MemoryClient
///
/// In-memory store client. Items live in one map keyed by primary key;
/// queries evaluate the generated key condition and filter expressions
/// unless a page has been scripted with [`MemoryClient::push_page`].
///

pub struct MemoryClient {
    state: Mutex<State>,
}

struct State {
    description: Result<TableDescription, ClientError>,
    items: BTreeMap<(String, String), Item>,
    pages: VecDeque<Result<QueryOutput, ClientError>>,
    failures: VecDeque<ClientError>,
    requests: Vec<Request>,
}

impl MemoryClient {
    /// Client describing the fixture table.
    #[must_use]
    pub fn new() -> Self {
        Self::with_description(fixtures::table_description())
    }

    #[must_use]
    pub fn with_description(description: TableDescription) -> Self {
        Self::from_description(Ok(description))
    }

    /// Client whose table does not exist.
    #[must_use]
    pub fn missing_table() -> Self {
        Self::from_description(Err(ClientError::ResourceNotFound(
            "requested resource not found".into(),
        )))
    }

    fn from_description(description: Result<TableDescription, ClientError>) -> Self {
        Self {
            state: Mutex::new(State {
                description,
                items: BTreeMap::new(),
                pages: VecDeque::new(),
                failures: VecDeque::new(),
                requests: Vec::new(),
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Script the response of the next query.
    pub fn push_page(&self, page: Result<QueryOutput, ClientError>) {
        self.state().pages.push_back(page);
    }

    /// Fail the next get, put, delete or query call.
    pub fn fail_next(&self, err: ClientError) {
        self.state().failures.push_back(err);
    }

    /// Store an item directly, bypassing conditions.
    pub fn insert(&self, item: Item) {
        let mut state = self.state();
        if let Some(key) = state.primary_key(&item) {
            state.items.insert(key, item);
        }
    }

    #[must_use]
    pub fn items(&self) -> Vec<Item> {
        self.state().items.values().cloned().collect()
    }

    #[must_use]
    pub fn requests(&self) -> Vec<Request> {
        self.state().requests.clone()
    }

    #[must_use]
    pub fn queries(&self) -> Vec<QueryRequest> {
        self.state()
            .requests
            .iter()
            .filter_map(|request| match request {
                Request::Query(query) => Some(query.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Default for MemoryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl StoreClient for MemoryClient {
    fn describe_table(&self, table_name: &str) -> Result<TableDescription, ClientError> {
        let mut state = self.state();
        state.requests.push(Request::Describe(table_name.to_string()));

        state.description.clone()
    }

    fn get_item(&self, request: GetItemRequest) -> Result<Option<Item>, ClientError> {
        let mut state = self.state();
        state.requests.push(Request::Get(request.clone()));
        state.take_failure()?;

        let key = state.require_key(&request.key)?;

        Ok(state.items.get(&key).cloned())
    }

    fn put_item(&self, request: PutItemRequest) -> Result<(), ClientError> {
        let mut state = self.state();
        state.requests.push(Request::Put(request.clone()));
        state.take_failure()?;

        let key = state.require_key(&request.item)?;
        check_condition(
            request.condition_expression.as_deref(),
            state.items.get(&key),
        )?;
        state.items.insert(key, request.item);

        Ok(())
    }

    fn delete_item(&self, request: DeleteItemRequest) -> Result<(), ClientError> {
        let mut state = self.state();
        state.requests.push(Request::Delete(request.clone()));
        state.take_failure()?;

        let key = state.require_key(&request.key)?;
        check_condition(
            request.condition_expression.as_deref(),
            state.items.get(&key),
        )?;
        state.items.remove(&key);

        Ok(())
    }

    fn query(&self, request: QueryRequest) -> Result<QueryOutput, ClientError> {
        let mut state = self.state();
        state.requests.push(Request::Query(request.clone()));
        state.take_failure()?;

        if let Some(page) = state.pages.pop_front() {
            return page;
        }

        state.evaluate(&request)
    }
}

impl State {
    fn take_failure(&mut self) -> Result<(), ClientError> {
        self.failures.pop_front().map_or(Ok(()), Err)
    }

    fn description(&self) -> Result<&TableDescription, ClientError> {
        self.description.as_ref().map_err(Clone::clone)
    }

    // (partition, sort) attribute names of the table or a named index.
    fn key_names(
        &self,
        index_name: Option<&str>,
    ) -> Result<(String, Option<String>), ClientError> {
        let description = self.description()?;
        let schema = match index_name {
            None => &description.key_schema,
            Some(name) => {
                &description
                    .local_secondary_indexes
                    .iter()
                    .chain(&description.global_secondary_indexes)
                    .find(|index| index.index_name == name)
                    .ok_or_else(|| ClientError::ResourceNotFound(format!("index '{name}'")))?
                    .key_schema
            }
        };

        let find = |role| {
            schema
                .iter()
                .find(|element| element.role == role)
                .map(|element| element.attribute_name.clone())
        };
        let pk = find(KeyRole::Partition)
            .ok_or_else(|| validation("key schema has no partition key"))?;

        Ok((pk, find(KeyRole::Sort)))
    }

    fn primary_key(&self, item: &Item) -> Option<(String, String)> {
        let (pk, sk) = self.key_names(None).ok()?;
        let pk = item.get(&pk)?.as_key_text()?;
        let sk = match sk {
            Some(sk) => item.get(&sk)?.as_key_text()?,
            None => String::new(),
        };

        Some((pk, sk))
    }

    fn require_key(&self, item: &Item) -> Result<(String, String), ClientError> {
        self.description()?;
        self.primary_key(item)
            .ok_or_else(|| validation("item is missing primary key attributes"))
    }

    fn evaluate(&self, request: &QueryRequest) -> Result<QueryOutput, ClientError> {
        let (pk, sk) = self.key_names(request.index_name.as_deref())?;
        let (table_pk, table_sk) = self.key_names(None)?;

        let key_terms = parse_terms(&request.key_condition_expression, request)?;
        let filter_terms = match &request.filter_expression {
            Some(filter) => parse_terms(filter, request)?,
            None => Vec::new(),
        };

        let mut matched: Vec<&Item> = self
            .items
            .values()
            .filter(|item| item.contains_key(&pk))
            .filter(|item| sk.as_ref().is_none_or(|sk| item.contains_key(sk)))
            .filter(|item| key_terms.iter().all(|term| term.matches(item)))
            .collect();

        if let Some(sk) = &sk {
            matched.sort_by(|a, b| compare_values(a.get(sk), b.get(sk)));
        }
        if request.scan_index_forward == Some(false) {
            matched.reverse();
        }

        let key_attributes: Vec<&String> =
            [Some(&pk), sk.as_ref(), Some(&table_pk), table_sk.as_ref()]
                .into_iter()
                .flatten()
                .collect();
        let extract_key = |item: &Item| -> Item {
            key_attributes
                .iter()
                .filter_map(|name| item.get(*name).map(|v| ((*name).clone(), v.clone())))
                .collect()
        };

        let start = match &request.exclusive_start_key {
            Some(start) => matched
                .iter()
                .position(|item| start.iter().all(|(name, value)| item.get(name) == Some(value)))
                .map_or(matched.len(), |position| position + 1),
            None => 0,
        };
        let remaining = &matched[start..];

        let limit = match request.limit {
            0 => remaining.len(),
            limit => usize::try_from(limit).unwrap_or(usize::MAX).min(remaining.len()),
        };
        let evaluated = &remaining[..limit];

        let last_evaluated_key = (limit < remaining.len())
            .then(|| evaluated.last().map(|item| extract_key(item)))
            .flatten();
        let items = evaluated
            .iter()
            .filter(|item| filter_terms.iter().all(|term| term.matches(item)))
            .map(|item| (*item).clone())
            .collect();

        Ok(QueryOutput {
            items,
            last_evaluated_key,
        })
    }
}

///
/// Term
///
/// One comparison from a key condition or filter expression.
///

struct Term {
    attribute: String,
    op: TermOp,
    value: AttributeValue,
}

#[derive(Clone, Copy)]
enum TermOp {
    BeginsWith,
    Eq,
    Gt,
    Gte,
    Lt,
    Lte,
}

impl Term {
    fn matches(&self, item: &Item) -> bool {
        let Some(stored) = item.get(&self.attribute) else {
            return false;
        };

        match self.op {
            TermOp::BeginsWith => match (stored.as_key_text(), self.value.as_key_text()) {
                (Some(stored), Some(prefix)) => stored.starts_with(&prefix),
                _ => false,
            },
            TermOp::Eq => compare_values(Some(stored), Some(&self.value)) == Ordering::Equal,
            TermOp::Gt => compare_values(Some(stored), Some(&self.value)) == Ordering::Greater,
            TermOp::Gte => compare_values(Some(stored), Some(&self.value)) != Ordering::Less,
            TermOp::Lt => compare_values(Some(stored), Some(&self.value)) == Ordering::Less,
            TermOp::Lte => compare_values(Some(stored), Some(&self.value)) != Ordering::Greater,
        }
    }
}

// Parse `a AND b AND ...` where each term is `begins_with(name,:v)` or
// `name OP :v`, resolving `#` aliases and `:` placeholders.
fn parse_terms(expression: &str, request: &QueryRequest) -> Result<Vec<Term>, ClientError> {
    let resolve_name = |name: &str| -> Result<String, ClientError> {
        if name.starts_with('#') {
            request
                .expression_attribute_names
                .get(name)
                .cloned()
                .ok_or_else(|| validation(&format!("undefined name {name}")))
        } else {
            Ok(name.to_string())
        }
    };
    let resolve_value = |placeholder: &str| -> Result<AttributeValue, ClientError> {
        request
            .expression_attribute_values
            .get(placeholder)
            .cloned()
            .ok_or_else(|| validation(&format!("undefined value {placeholder}")))
    };

    let mut terms = Vec::new();
    for text in expression.split(" AND ") {
        let text = text.trim();

        if let Some(inner) = text
            .strip_prefix("begins_with(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            let (name, placeholder) = inner
                .split_once(',')
                .ok_or_else(|| validation(&format!("malformed term {text}")))?;
            terms.push(Term {
                attribute: resolve_name(name.trim())?,
                op: TermOp::BeginsWith,
                value: resolve_value(placeholder.trim())?,
            });
            continue;
        }

        let (name, placeholder) = text
            .split_once(':')
            .map(|(left, right)| (left, format!(":{right}")))
            .ok_or_else(|| validation(&format!("malformed term {text}")))?;
        let (name, op) = [
            (">=", TermOp::Gte),
            ("<=", TermOp::Lte),
            ("=", TermOp::Eq),
            (">", TermOp::Gt),
            ("<", TermOp::Lt),
        ]
        .into_iter()
        .find_map(|(symbol, op)| name.strip_suffix(symbol).map(|name| (name, op)))
        .ok_or_else(|| validation(&format!("malformed term {text}")))?;

        terms.push(Term {
            attribute: resolve_name(name.trim())?,
            op,
            value: resolve_value(placeholder.trim())?,
        });
    }

    Ok(terms)
}

// Numbers compare numerically, everything else by key text.
fn compare_values(a: Option<&AttributeValue>, b: Option<&AttributeValue>) -> Ordering {
    match (a, b) {
        (Some(AttributeValue::N(a)), Some(AttributeValue::N(b))) => {
            match (a.parse::<f64>(), b.parse::<f64>()) {
                (Ok(a), Ok(b)) => a.total_cmp(&b),
                _ => a.cmp(b),
            }
        }
        (Some(a), Some(b)) => a.as_key_text().cmp(&b.as_key_text()),
        (a, b) => a.is_some().cmp(&b.is_some()),
    }
}

// Apply `attribute_exists(x)` / `attribute_not_exists(x)` terms to the item
// currently stored under the request key.
fn check_condition(condition: Option<&str>, existing: Option<&Item>) -> Result<(), ClientError> {
    let Some(condition) = condition else {
        return Ok(());
    };

    for term in condition.split(" AND ").map(str::trim) {
        let holds = if let Some(name) = term
            .strip_prefix("attribute_not_exists(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            existing.is_none_or(|item| !item.contains_key(name))
        } else if let Some(name) = term
            .strip_prefix("attribute_exists(")
            .and_then(|rest| rest.strip_suffix(')'))
        {
            existing.is_some_and(|item| item.contains_key(name))
        } else {
            return Err(validation(&format!("unsupported condition {term}")));
        };

        if !holds {
            return Err(ClientError::ConditionalCheckFailed(
                "the conditional request failed".into(),
            ));
        }
    }

    Ok(())
}

fn validation(message: &str) -> ClientError {
    ClientError::Service {
        code: "ValidationException".into(),
        message: message.to_string(),
    }
}

///
/// TESTS
///
