//! Kafka client for protocol-level communication with a single broker.

use bytes::{BufMut, Bytes, BytesMut};
use kafka_protocol::messages::{ApiKey, RequestHeader, ResponseHeader};
use kafka_protocol::protocol::StrBytes;
use kafka_protocol::protocol::{Decodable, Encodable};
use socket2::{SockRef, TcpKeepalive};
use std::sync::atomic::{AtomicI32, Ordering};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::config::KafkaConfig;
use crate::error::KafkaError;
use crate::Result;

/// Kafka client bound to the first reachable server of its bootstrap list.
///
/// The connection is opened lazily and dropped after any I/O failure, so the
/// next request reconnects instead of reusing a broken stream.
pub struct KafkaClient {
    config: KafkaConfig,
    connection: Mutex<Option<BrokerConnection>>,
    correlation_id: AtomicI32,
}

struct BrokerConnection {
    stream: TcpStream,
    server: String,
}

impl KafkaClient {
    /// Create a new Kafka client
    pub fn new(config: KafkaConfig) -> Self {
        Self {
            config,
            connection: Mutex::new(None),
            correlation_id: AtomicI32::new(1),
        }
    }

    /// Connect eagerly, failing if no bootstrap server is reachable.
    pub async fn connect(&self) -> Result<()> {
        let mut conn = self.connection.lock().await;
        if conn.is_none() {
            *conn = Some(self.open_connection().await?);
        }
        Ok(())
    }

    /// Shut the connection down. The client reconnects on its next request.
    pub async fn close(&self) {
        if let Some(mut conn) = self.connection.lock().await.take() {
            if let Err(e) = conn.stream.shutdown().await {
                debug!("Error closing connection to {}: {}", conn.server, e);
            }
            debug!("Closed connection to {}", conn.server);
        }
    }

    async fn open_connection(&self) -> Result<BrokerConnection> {
        // Try each bootstrap server until one connects
        for server in &self.config.bootstrap_servers {
            match self.try_connect(server).await {
                Ok(stream) => {
                    debug!("Connected to Kafka broker: {}", server);
                    return Ok(BrokerConnection {
                        stream,
                        server: server.clone(),
                    });
                }
                Err(e) => {
                    debug!("Failed to connect to {}: {}", server, e);
                    continue;
                }
            }
        }

        Err(KafkaError::NoBrokersAvailable.into())
    }

    async fn try_connect(&self, server: &str) -> Result<TcpStream> {
        let stream = tokio::time::timeout(self.config.request_timeout(), TcpStream::connect(server))
            .await
            .map_err(|_| KafkaError::Timeout(format!("connecting to {}", server)))?
            .map_err(|e| KafkaError::ConnectionFailed {
                broker: server.to_string(),
                message: e.to_string(),
            })?;

        self.configure_socket(&stream, server)?;
        Ok(stream)
    }

    /// Configure TCP socket options (keepalive, nodelay) based on connection config.
    fn configure_socket(&self, stream: &TcpStream, server: &str) -> Result<()> {
        let conn_config = &self.config.connection;
        let sock_ref = SockRef::from(stream);

        if conn_config.tcp_nodelay {
            sock_ref
                .set_nodelay(true)
                .map_err(|e| KafkaError::ConnectionFailed {
                    broker: server.to_string(),
                    message: format!("Failed to set TCP_NODELAY: {}", e),
                })?;
        }

        if conn_config.tcp_keepalive {
            let keepalive = TcpKeepalive::new()
                .with_time(Duration::from_secs(conn_config.keepalive_time_secs))
                .with_interval(Duration::from_secs(conn_config.keepalive_interval_secs));

            sock_ref
                .set_tcp_keepalive(&keepalive)
                .map_err(|e| KafkaError::ConnectionFailed {
                    broker: server.to_string(),
                    message: format!("Failed to set TCP keepalive: {}", e),
                })?;
        }

        Ok(())
    }

    /// Get the next correlation ID
    fn next_correlation_id(&self) -> i32 {
        self.correlation_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Send a request and receive a response, bounded by the request timeout
    pub async fn send_request<Req, Resp>(&self, api_key: ApiKey, request: Req) -> Result<Resp>
    where
        Req: Encodable + Default,
        Resp: Decodable + Default,
    {
        let correlation_id = self.next_correlation_id();
        let api_version = api_version(api_key);

        let header = RequestHeader::default()
            .with_request_api_key(api_key as i16)
            .with_request_api_version(api_version)
            .with_correlation_id(correlation_id)
            .with_client_id(Some(StrBytes::from_string(self.config.client_id.clone())));

        let header_version = api_key.request_header_version(api_version);
        let mut buf = BytesMut::new();

        // Length prefix, patched once the body is encoded
        buf.put_i32(0);

        header
            .encode(&mut buf, header_version)
            .map_err(|e| KafkaError::Protocol(format!("Failed to encode header: {:?}", e)))?;
        request
            .encode(&mut buf, api_version)
            .map_err(|e| KafkaError::Protocol(format!("Failed to encode request: {:?}", e)))?;

        let len = (buf.len() - 4) as i32;
        buf[0..4].copy_from_slice(&len.to_be_bytes());

        trace!(
            "Sending request: api_key={:?}, api_version={}, correlation_id={}, len={}",
            api_key,
            api_version,
            correlation_id,
            len
        );

        let mut conn = self.connection.lock().await;
        if conn.is_none() {
            *conn = Some(self.open_connection().await?);
        }

        let outcome = match conn.as_mut() {
            Some(active) => {
                tokio::time::timeout(self.config.request_timeout(), exchange(active, &buf)).await
            }
            None => return Err(KafkaError::Protocol("Not connected".to_string()).into()),
        };

        let mut response_bytes = match outcome {
            Ok(Ok(bytes)) => bytes,
            Ok(Err(e)) => {
                *conn = None;
                return Err(e);
            }
            Err(_) => {
                *conn = None;
                return Err(KafkaError::Timeout(format!(
                    "{:?} (correlation_id={})",
                    api_key, correlation_id
                ))
                .into());
            }
        };
        drop(conn);

        let response_header_version = api_key.response_header_version(api_version);
        let response_header = ResponseHeader::decode(&mut response_bytes, response_header_version)
            .map_err(|e| {
                KafkaError::Protocol(format!("Failed to decode response header: {:?}", e))
            })?;

        if response_header.correlation_id != correlation_id {
            return Err(KafkaError::Protocol(format!(
                "Correlation id mismatch: sent {}, received {}",
                correlation_id, response_header.correlation_id
            ))
            .into());
        }

        let response = Resp::decode(&mut response_bytes, api_version)
            .map_err(|e| KafkaError::Protocol(format!("Failed to decode response: {:?}", e)))?;

        Ok(response)
    }
}

/// Write one framed request and read one framed response.
async fn exchange(conn: &mut BrokerConnection, request: &[u8]) -> Result<Bytes> {
    conn.stream
        .write_all(request)
        .await
        .map_err(|e| KafkaError::Protocol(format!("Failed to send request: {}", e)))?;

    let mut len_buf = [0u8; 4];
    conn.stream
        .read_exact(&mut len_buf)
        .await
        .map_err(|e| KafkaError::Protocol(format!("Failed to read response length: {}", e)))?;
    let response_len = i32::from_be_bytes(len_buf);
    if response_len < 0 {
        return Err(KafkaError::Protocol(format!(
            "Negative response length {} from {}",
            response_len, conn.server
        ))
        .into());
    }

    trace!("Receiving response: len={}", response_len);

    let mut response_buf = vec![0u8; response_len as usize];
    conn.stream
        .read_exact(&mut response_buf)
        .await
        .map_err(|e| KafkaError::Protocol(format!("Failed to read response body: {}", e)))?;

    Ok(Bytes::from(response_buf))
}

/// API version used for each request type.
///
/// OffsetFetch must be at least v1 so offsets come from the broker and not from
/// ZooKeeper; the legacy registry is read separately.
fn api_version(api_key: ApiKey) -> i16 {
    match api_key {
        ApiKey::Metadata => 9,
        ApiKey::FindCoordinator => 1,
        ApiKey::ListGroups => 0,
        ApiKey::DescribeGroups => 0,
        ApiKey::OffsetFetch => 3,
        ApiKey::OffsetCommit => 2,
        _ => 0,
    }
}
