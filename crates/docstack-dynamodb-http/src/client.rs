//! The DynamoDB client.

use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use docstack_auth::{CredentialProvider, SignError, SignableRequest, Signer, SigningKeyCache};
use docstack_core::DocstackConfig;
use docstack_dynamodb_core::request::{self, ItemOptions, QueryOptions, ScanOptions};
use docstack_dynamodb_core::{Target, TransactRequest, Transaction};
use docstack_dynamodb_model::operations::CONTENT_TYPE;
use docstack_dynamodb_model::output::{
    GetItemOutput, ItemsOutput, TransactGetItemsOutput, TransactWriteItemsOutput, WriteItemOutput,
};
use docstack_dynamodb_model::{DynamoDBError, DynamoDBErrorCode, DynamoDBOperation, Item};
use http::header::CONTENT_TYPE as CONTENT_TYPE_HEADER;
use http::{HeaderMap, HeaderValue, Method, Uri};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::error::ClientError;
use crate::retry::RetryPolicy;
use crate::transport::Transport;

/// Signing name of the service.
pub const SERVICE: &str = "dynamodb";

const X_AMZ_TARGET: &str = "x-amz-target";

/// Result of [`DynamoDBClient::transact`].
#[derive(Debug, Clone)]
pub enum TransactOutput {
    /// A write transaction committed.
    Write(TransactWriteItemsOutput),
    /// A read transaction returned.
    Get(TransactGetItemsOutput),
}

/// Client for one endpoint. Owns its signing-key cache.
pub struct DynamoDBClient<T> {
    transport: T,
    signer: Signer,
    credentials: Arc<dyn CredentialProvider>,
    endpoint: Uri,
    host: String,
    retry: RetryPolicy,
}

impl<T> fmt::Debug for DynamoDBClient<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DynamoDBClient")
            .field("endpoint", &self.endpoint)
            .field("region", &self.signer.region())
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl<T: Transport> DynamoDBClient<T> {
    /// Create a client for the configured endpoint and region.
    ///
    /// # Errors
    ///
    /// [`ClientError::InvalidEndpoint`] when the endpoint has no host.
    pub fn new(
        config: &DocstackConfig,
        transport: T,
        credentials: Arc<dyn CredentialProvider>,
    ) -> Result<Self, ClientError> {
        let raw = config.endpoint();
        let endpoint: Uri = raw
            .parse()
            .map_err(|_| ClientError::InvalidEndpoint(raw.clone()))?;
        let host = endpoint
            .authority()
            .map(|a| a.as_str().to_owned())
            .ok_or(ClientError::InvalidEndpoint(raw))?;
        let cache = Arc::new(SigningKeyCache::with_capacity(
            config.signing_key_cache_capacity,
        ));

        Ok(Self {
            transport,
            signer: Signer::new(config.default_region.as_str(), SERVICE, cache),
            credentials,
            endpoint,
            host,
            retry: RetryPolicy::from_config(config),
        })
    }

    /// Replace the retry policy.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// The signer requests are signed with.
    #[must_use]
    pub fn signer(&self) -> &Signer {
        &self.signer
    }

    /// Send `input` as operation `op` and decode the response.
    ///
    /// Every attempt is signed with the current time. Retryable failures are
    /// retried with exponential backoff until the policy's attempts run out.
    pub async fn execute<I, O>(&self, op: DynamoDBOperation, input: &I) -> Result<O, ClientError>
    where
        I: Serialize + Sync,
        O: DeserializeOwned,
    {
        let body = Bytes::from(serde_json::to_vec(input)?);
        let attempts = self.retry.attempts();
        let mut attempt = 1;
        loop {
            match self.attempt(op, &body).await {
                Ok(payload) => {
                    let payload: &[u8] = if payload.is_empty() { b"{}" } else { &payload };
                    return Ok(serde_json::from_slice(payload)?);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) if attempt >= attempts => {
                    return Err(ClientError::RetriesExhausted {
                        attempts: attempt,
                        last: Box::new(err),
                    });
                }
                Err(err) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(operation = %op, attempt, ?delay, error = %err, "Retrying request");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    async fn attempt(&self, op: DynamoDBOperation, body: &Bytes) -> Result<Bytes, ClientError> {
        let request = self.signed_request(op, body)?;
        debug!(operation = %op, bytes = body.len(), "Sending request");
        let response = self.transport.send(request).await?;
        let status = response.status();
        let payload = response.into_body();
        if status.is_success() {
            Ok(payload)
        } else {
            Err(DynamoDBError::from_response(status, &payload).into())
        }
    }

    fn signed_request(
        &self,
        op: DynamoDBOperation,
        body: &Bytes,
    ) -> Result<http::Request<Bytes>, ClientError> {
        let credentials = self.credentials.credentials()?;
        let mut headers = HeaderMap::new();
        headers.insert(
            X_AMZ_TARGET,
            HeaderValue::from_str(&op.target())
                .map_err(|_| SignError::InvalidHeader(X_AMZ_TARGET.to_owned()))?,
        );
        headers.insert(CONTENT_TYPE_HEADER, HeaderValue::from_static(CONTENT_TYPE));

        self.signer.sign(
            SignableRequest {
                method: Method::POST.as_str(),
                host: &self.host,
                path: self.endpoint.path(),
                body,
                headers: &mut headers,
            },
            &credentials,
            Utc::now(),
        )?;

        let mut request = http::Request::new(body.clone());
        *request.method_mut() = Method::POST;
        *request.uri_mut() = self.endpoint.clone();
        *request.headers_mut() = headers;
        Ok(request)
    }

    /// Replace an item.
    pub async fn put_item(
        &self,
        target: &Target,
        item: &Item,
        options: &ItemOptions,
    ) -> Result<WriteItemOutput, ClientError> {
        let input = request::put_item(target, item, options)?;
        self.execute(DynamoDBOperation::PutItem, &input).await
    }

    /// Insert an item that must not exist yet.
    pub async fn add_item(
        &self,
        target: &Target,
        item: &Item,
        options: &ItemOptions,
    ) -> Result<WriteItemOutput, ClientError> {
        let input = request::add_item(target, item, options)?;
        self.execute(DynamoDBOperation::PutItem, &input).await
    }

    /// Update an item. `Ok(None)` when there was nothing to change and no
    /// request was sent.
    pub async fn update_item(
        &self,
        target: &Target,
        item: &Item,
        options: &ItemOptions,
    ) -> Result<Option<WriteItemOutput>, ClientError> {
        match request::update_item(target, item, options)? {
            Some(input) => Ok(Some(
                self.execute(DynamoDBOperation::UpdateItem, &input).await?,
            )),
            None => Ok(None),
        }
    }

    /// Increment the fields of an item. See [`DynamoDBClient::update_item`].
    pub async fn incr_item(
        &self,
        target: &Target,
        item: &Item,
        options: &ItemOptions,
    ) -> Result<Option<WriteItemOutput>, ClientError> {
        match request::incr_item(target, item, options)? {
            Some(input) => Ok(Some(
                self.execute(DynamoDBOperation::UpdateItem, &input).await?,
            )),
            None => Ok(None),
        }
    }

    /// Delete an item.
    pub async fn delete_item(
        &self,
        target: &Target,
        item: &Item,
        options: &ItemOptions,
    ) -> Result<WriteItemOutput, ClientError> {
        let input = request::delete_item(target, item, options)?;
        self.execute(DynamoDBOperation::DeleteItem, &input).await
    }

    /// Read an item, decoded to native values.
    pub async fn get_item(
        &self,
        target: &Target,
        item: &Item,
        options: &ItemOptions,
    ) -> Result<Option<Item>, ClientError> {
        let input = request::get_item(target, item, options)?;
        let output: GetItemOutput = self.execute(DynamoDBOperation::GetItem, &input).await?;
        Ok(output.decoded())
    }

    /// Query one page.
    pub async fn query(
        &self,
        table_name: &str,
        options: &QueryOptions,
    ) -> Result<ItemsOutput, ClientError> {
        let input = request::query(table_name, options)?;
        self.execute(DynamoDBOperation::Query, &input).await
    }

    /// Scan one page.
    pub async fn scan(
        &self,
        table_name: &str,
        options: &ScanOptions,
    ) -> Result<ItemsOutput, ClientError> {
        let input = request::scan(table_name, options);
        self.execute(DynamoDBOperation::Scan, &input).await
    }

    /// Run a compiled transaction. A cancellation is reported as
    /// [`ClientError::TransactionCanceled`] with reasons indexed by the
    /// caller's entry order.
    pub async fn transact(&self, transaction: &Transaction) -> Result<TransactOutput, ClientError> {
        let result = match &transaction.request {
            TransactRequest::Write(input) => self
                .execute(DynamoDBOperation::TransactWriteItems, input)
                .await
                .map(TransactOutput::Write),
            TransactRequest::Get(input) => self
                .execute(DynamoDBOperation::TransactGetItems, input)
                .await
                .map(TransactOutput::Get),
        };
        result.map_err(|err| correlate_cancellation(transaction, err))
    }
}

fn correlate_cancellation(transaction: &Transaction, err: ClientError) -> ClientError {
    match err {
        ClientError::Service(source)
            if source.code == DynamoDBErrorCode::TransactionCanceledException =>
        {
            let reasons = source.cancellation_reasons().map_or_else(
                || vec![None; transaction.entry_count()],
                |reasons| transaction.correlate(&reasons),
            );
            warn!(?reasons, "Transaction cancelled");
            ClientError::TransactionCanceled { reasons, source }
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use docstack_auth::{Credentials, StaticCredentialProvider};
    use docstack_dynamodb_core::{KeySchema, TransactEntry, TransactOp, TransactionBuilder};
    use docstack_dynamodb_model::Value;
    use http::StatusCode;
    use parking_lot::Mutex;

    use super::*;
    use crate::error::TransportError;

    #[derive(Debug, Default)]
    struct MockTransport {
        responses: Mutex<VecDeque<(StatusCode, &'static str)>>,
        requests: Mutex<Vec<http::Request<Bytes>>>,
    }

    impl MockTransport {
        fn replying(responses: &[(StatusCode, &'static str)]) -> Self {
            Self {
                responses: Mutex::new(responses.iter().copied().collect()),
                requests: Mutex::default(),
            }
        }

        fn sent(&self) -> usize {
            self.requests.lock().len()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn send(
            &self,
            request: http::Request<Bytes>,
        ) -> Result<http::Response<Bytes>, TransportError> {
            self.requests.lock().push(request);
            let (status, body) = self
                .responses
                .lock()
                .pop_front()
                .unwrap_or((StatusCode::OK, "{}"));
            let mut response = http::Response::new(Bytes::from_static(body.as_bytes()));
            *response.status_mut() = status;
            Ok(response)
        }
    }

    fn config() -> DocstackConfig {
        DocstackConfig {
            endpoint: Some("http://localhost:8000".to_owned()),
            retry_base_delay_ms: 0,
            ..DocstackConfig::default()
        }
    }

    fn client(transport: MockTransport) -> DynamoDBClient<MockTransport> {
        let credentials = StaticCredentialProvider::new(Credentials::new("AKID", "secret", None));
        DynamoDBClient::new(&config(), transport, Arc::new(credentials)).unwrap()
    }

    fn users() -> Target {
        Target::new("users", KeySchema::new("pk"))
    }

    fn keyed(pk: &str) -> Item {
        let mut item = Item::new();
        item.insert("pk".to_owned(), Value::from(pk));
        item
    }

    const THROTTLED: &str = r#"{"__type":"com.amazonaws.dynamodb.v20120810#ThrottlingException","message":"Rate exceeded"}"#;

    #[tokio::test]
    async fn test_should_send_signed_json_request() {
        let client = client(MockTransport::default());
        client
            .put_item(&users(), &keyed("u1"), &ItemOptions::default())
            .await
            .unwrap();

        let requests = client.transport.requests.lock();
        let request = &requests[0];
        assert_eq!(request.method(), Method::POST);
        assert_eq!(request.uri().path(), "/");
        assert_eq!(
            request.headers()[X_AMZ_TARGET],
            "DynamoDB_20120810.PutItem"
        );
        assert_eq!(request.headers()[CONTENT_TYPE_HEADER], CONTENT_TYPE);
        assert_eq!(request.headers()["host"], "localhost:8000");
        assert!(request.headers().contains_key("x-amz-date"));
        let authorization = request.headers()["authorization"].to_str().unwrap();
        assert!(authorization.starts_with("AWS4-HMAC-SHA256 Credential=AKID/"));
        assert!(authorization.contains("/us-east-1/dynamodb/aws4_request"));

        let body: serde_json::Value = serde_json::from_slice(request.body()).unwrap();
        assert_eq!(body["TableName"], "users");
        assert_eq!(body["Item"]["pk"]["S"], "u1");
    }

    #[tokio::test]
    async fn test_should_retry_throttled_request() {
        let client = client(MockTransport::replying(&[
            (StatusCode::BAD_REQUEST, THROTTLED),
            (StatusCode::OK, r#"{"Item":{"pk":{"S":"u1"},"age":{"N":"3"}}}"#),
        ]));
        let item = client
            .get_item(&users(), &keyed("u1"), &ItemOptions::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item["age"], Value::Int(3));
        assert_eq!(client.transport.sent(), 2);
    }

    #[tokio::test]
    async fn test_should_not_retry_failed_condition() {
        let client = client(MockTransport::replying(&[(
            StatusCode::BAD_REQUEST,
            r#"{"__type":"com.amazonaws.dynamodb.v20120810#ConditionalCheckFailedException","message":"The conditional request failed"}"#,
        )]));
        let err = client
            .add_item(&users(), &keyed("u1"), &ItemOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Service(ref e) if e.code == DynamoDBErrorCode::ConditionalCheckFailedException
        ));
        assert_eq!(client.transport.sent(), 1);
    }

    #[tokio::test]
    async fn test_should_give_up_after_max_attempts() {
        let client = client(MockTransport::replying(&[
            (StatusCode::SERVICE_UNAVAILABLE, "{}"),
            (StatusCode::SERVICE_UNAVAILABLE, "{}"),
            (StatusCode::SERVICE_UNAVAILABLE, "{}"),
        ]));
        let err = client
            .delete_item(&users(), &keyed("u1"), &ItemOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::RetriesExhausted { attempts: 3, .. }));
        assert_eq!(client.transport.sent(), 3);
    }

    #[tokio::test]
    async fn test_should_correlate_transaction_cancellation() {
        let client = client(MockTransport::replying(&[(
            StatusCode::BAD_REQUEST,
            r#"{"__type":"com.amazonaws.dynamodb.v20120810#TransactionCanceledException","message":"Transaction cancelled, please refer cancellation reasons for specific reasons [None, ConditionalCheckFailed]"}"#,
        )]));
        let mut builder = TransactionBuilder::new();
        builder.push(TransactEntry::new(TransactOp::Put, users(), keyed("a")));
        builder.push_raw("merge", users(), keyed("b"), ItemOptions::default());
        builder.push(TransactEntry::new(TransactOp::Delete, users(), keyed("c")));
        let transaction = builder.build().unwrap().unwrap();

        let err = client.transact(&transaction).await.unwrap_err();
        assert_eq!(
            err.cancellation_reasons(),
            Some(&[None, None, Some("ConditionalCheckFailed".to_owned())][..])
        );
        assert_eq!(client.transport.sent(), 1);
    }

    #[tokio::test]
    async fn test_should_skip_noop_update() {
        let client = client(MockTransport::default());
        let result = client
            .update_item(&users(), &keyed("u1"), &ItemOptions::default())
            .await
            .unwrap();
        assert!(result.is_none());
        assert_eq!(client.transport.sent(), 0);
    }

    #[tokio::test]
    async fn test_should_not_send_without_credentials() {
        let credentials = StaticCredentialProvider::new(Credentials::new("", "", None));
        let client =
            DynamoDBClient::new(&config(), MockTransport::default(), Arc::new(credentials)).unwrap();
        let err = client
            .scan("users", &ScanOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Sign(SignError::MissingCredentials)));
        assert_eq!(client.transport.sent(), 0);
    }

    #[test]
    fn test_should_reject_endpoint_without_host() {
        let config = DocstackConfig {
            endpoint: Some("/relative".to_owned()),
            ..DocstackConfig::default()
        };
        let credentials = StaticCredentialProvider::new(Credentials::new("AKID", "secret", None));
        let err = DynamoDBClient::new(&config, MockTransport::default(), Arc::new(credentials))
            .unwrap_err();
        assert!(matches!(err, ClientError::InvalidEndpoint(_)));
    }
}
