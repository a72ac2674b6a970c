//! End-to-end tests: raw FIX 4.2 clients against a live gateway instance
//!
//! Each test binds an ephemeral port, runs the full stack (TCP accept loop,
//! framing, session, translation, matching engine) and speaks wire-level
//! FIX from the client side.

use std::sync::Arc;

use ferrox_fix::builder::utc_timestamp_now;
use ferrox_fix::tags::{self, msg_type};
use ferrox_fix::{FixDecoder, FixMessage};
use ferrox_gateway::{GatewayConfig, GatewayServer};
use ferrox_matching::{EngineConfig, MatchingEngine, OrderRequest};
use ferrox_sdk::{Price, Side};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::time::{timeout, Duration};

const VENUE: &str = "FERROX";
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

async fn start_gateway(config: GatewayConfig) -> (std::net::SocketAddr, Arc<MatchingEngine>, Arc<GatewayServer>) {
	let engine = Arc::new(MatchingEngine::start(EngineConfig::default()).unwrap());
	let server = Arc::new(GatewayServer::new(config, engine.clone()));
	let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
	let addr = listener.local_addr().unwrap();
	let acceptor = server.clone();
	tokio::spawn(async move {
		let _ = acceptor.serve_on(listener).await;
	});
	(addr, engine, server)
}

struct FixClient {
	stream: TcpStream,
	decoder: FixDecoder,
	comp_id: String,
	seq: u64,
}

impl FixClient {
	async fn connect(addr: std::net::SocketAddr, comp_id: &str) -> Self {
		let stream = TcpStream::connect(addr).await.unwrap();
		Self {
			stream,
			decoder: FixDecoder::default(),
			comp_id: comp_id.to_string(),
			seq: 1,
		}
	}

	/// Stamp the session header with the next sequence number and send.
	async fn send(&mut self, msg: FixMessage) {
		let seq = self.seq;
		self.seq += 1;
		self.send_with_seq(msg, seq).await;
	}

	async fn send_with_seq(&mut self, mut msg: FixMessage, seq: u64) {
		msg.set(tags::SENDER_COMP_ID, self.comp_id.clone());
		msg.set(tags::TARGET_COMP_ID, VENUE);
		msg.set(tags::MSG_SEQ_NUM, seq.to_string());
		msg.set(tags::SENDING_TIME, utc_timestamp_now());
		self.stream.write_all(&msg.serialize()).await.unwrap();
	}

	/// Receive the next complete message, verifying its checksum.
	async fn recv(&mut self) -> FixMessage {
		let mut buf = [0u8; 4096];
		loop {
			if let Some(msg) = self.decoder.next_message().unwrap() {
				return msg;
			}
			let n = timeout(RECV_TIMEOUT, self.stream.read(&mut buf))
				.await
				.expect("timed out waiting for message")
				.unwrap();
			assert!(n > 0, "connection closed while waiting for message");
			self.decoder.feed(&buf[..n]);
		}
	}

	/// Wait for the peer to drop the connection.
	async fn expect_disconnect(&mut self) {
		let mut buf = [0u8; 1024];
		loop {
			let n = timeout(RECV_TIMEOUT, self.stream.read(&mut buf))
				.await
				.expect("timed out waiting for disconnect")
				.unwrap_or(0);
			if n == 0 {
				return;
			}
		}
	}

	async fn logon(&mut self) -> FixMessage {
		let logon = FixMessage::new(msg_type::LOGON)
			.with(tags::ENCRYPT_METHOD, "0")
			.with(tags::HEART_BT_INT, "30");
		self.send(logon).await;
		let reply = self.recv().await;
		assert_eq!(reply.msg_type(), Some(msg_type::LOGON));
		reply
	}

	fn new_order(cl_ord_id: &str, symbol: &str, side: char, qty: u64, price: &str) -> FixMessage {
		FixMessage::new(msg_type::NEW_ORDER_SINGLE)
			.with(tags::CL_ORD_ID, cl_ord_id)
			.with(tags::SYMBOL, symbol)
			.with(tags::SIDE, side.to_string())
			.with(tags::ORDER_QTY, qty.to_string())
			.with(tags::ORD_TYPE, "2")
			.with(tags::PRICE, price)
	}
}

#[tokio::test]
async fn test_logon_handshake_echoes_negotiation() {
	let (addr, _engine, _server) = start_gateway(GatewayConfig::default()).await;
	let mut client = FixClient::connect(addr, "CLIENT1").await;

	let reply = client.logon().await;
	assert_eq!(reply.get(tags::SENDER_COMP_ID), Some(VENUE));
	assert_eq!(reply.get(tags::TARGET_COMP_ID), Some("CLIENT1"));
	assert_eq!(reply.get(tags::MSG_SEQ_NUM), Some("1"));
	assert_eq!(reply.get(tags::ENCRYPT_METHOD), Some("0"));
	assert_eq!(reply.get(tags::HEART_BT_INT), Some("30"));
}

#[tokio::test]
async fn test_order_acknowledged_then_cancelled() {
	let (addr, _engine, _server) = start_gateway(GatewayConfig::default()).await;
	let mut client = FixClient::connect(addr, "CLIENT1").await;
	client.logon().await;

	client
		.send(FixClient::new_order("ORD-1", "AAPL", '1', 10, "99"))
		.await;
	let ack = client.recv().await;
	assert_eq!(ack.msg_type(), Some(msg_type::EXECUTION_REPORT));
	assert_eq!(ack.get(tags::CL_ORD_ID), Some("ORD-1"));
	assert_eq!(ack.get(tags::ORD_STATUS), Some("0"));
	assert_eq!(ack.get(tags::LEAVES_QTY), Some("10"));
	assert_eq!(ack.get(tags::CUM_QTY), Some("0"));
	assert!(ack.has(tags::EXEC_ID));

	let cancel = FixMessage::new(msg_type::ORDER_CANCEL_REQUEST)
		.with(tags::ORIG_CL_ORD_ID, "ORD-1")
		.with(tags::CL_ORD_ID, "CXL-1")
		.with(tags::SYMBOL, "AAPL")
		.with(tags::SIDE, "1");
	client.send(cancel).await;

	let cancelled = client.recv().await;
	assert_eq!(cancelled.get(tags::ORD_STATUS), Some("4"));
	assert_eq!(cancelled.get(tags::CL_ORD_ID), Some("ORD-1"));
	assert_eq!(cancelled.get(tags::LEAVES_QTY), Some("10"));
	assert_eq!(
		cancelled.get(tags::TEXT),
		Some("client cancel request")
	);
}

#[tokio::test]
async fn test_client_order_fills_against_seeded_liquidity() {
	let (addr, engine, _server) = start_gateway(GatewayConfig::default()).await;
	engine
		.submit_order_sync(OrderRequest::limit(
			"SEED",
			"AAPL",
			Side::Sell,
			Price::from_units(100),
			5,
		))
		.unwrap();

	let mut client = FixClient::connect(addr, "CLIENT1").await;
	client.logon().await;
	client
		.send(FixClient::new_order("ORD-1", "AAPL", '1', 5, "100"))
		.await;

	let fill = client.recv().await;
	assert_eq!(fill.msg_type(), Some(msg_type::EXECUTION_REPORT));
	assert_eq!(fill.get(tags::ORD_STATUS), Some("2"));
	assert_eq!(fill.get(tags::EXEC_TYPE), Some("2"));
	assert_eq!(fill.get(tags::LAST_PX), Some("100"));
	assert_eq!(fill.get(tags::LAST_QTY), Some("5"));
	assert_eq!(fill.get(tags::LEAVES_QTY), Some("0"));
	assert_eq!(fill.get(tags::CUM_QTY), Some("5"));
}

#[tokio::test]
async fn test_sequence_gap_triggers_resend_request() {
	let (addr, _engine, _server) = start_gateway(GatewayConfig::default()).await;
	let mut client = FixClient::connect(addr, "CLIENT1").await;
	client.logon().await;

	// Venue expects 2; jump to 5
	let heartbeat = FixMessage::new(msg_type::HEARTBEAT);
	client.send_with_seq(heartbeat, 5).await;

	let resend = client.recv().await;
	assert_eq!(resend.msg_type(), Some(msg_type::RESEND_REQUEST));
	assert_eq!(resend.get(tags::BEGIN_SEQ_NO), Some("2"));
	assert_eq!(resend.get(tags::END_SEQ_NO), Some("4"));
}

#[tokio::test]
async fn test_test_request_answered_with_heartbeat() {
	let (addr, _engine, _server) = start_gateway(GatewayConfig::default()).await;
	let mut client = FixClient::connect(addr, "CLIENT1").await;
	client.logon().await;

	let req = FixMessage::new(msg_type::TEST_REQUEST).with(tags::TEST_REQ_ID, "PING-1");
	client.send(req).await;

	let reply = client.recv().await;
	assert_eq!(reply.msg_type(), Some(msg_type::HEARTBEAT));
	assert_eq!(reply.get(tags::TEST_REQ_ID), Some("PING-1"));
}

#[tokio::test]
async fn test_cancel_of_unknown_order_is_rejected() {
	let (addr, _engine, _server) = start_gateway(GatewayConfig::default()).await;
	let mut client = FixClient::connect(addr, "CLIENT1").await;
	client.logon().await;

	let cancel = FixMessage::new(msg_type::ORDER_CANCEL_REQUEST)
		.with(tags::ORIG_CL_ORD_ID, "NO-SUCH-ORDER")
		.with(tags::CL_ORD_ID, "CXL-1")
		.with(tags::SYMBOL, "AAPL")
		.with(tags::SIDE, "1");
	client.send(cancel).await;

	let reject = client.recv().await;
	assert_eq!(reject.msg_type(), Some(msg_type::EXECUTION_REPORT));
	assert_eq!(reject.get(tags::ORD_STATUS), Some("8"));
	assert!(reject
		.get(tags::TEXT)
		.unwrap()
		.contains("unknown original order"));
}

#[tokio::test]
async fn test_invalid_order_gets_application_reject() {
	let (addr, _engine, _server) = start_gateway(GatewayConfig::default()).await;
	let mut client = FixClient::connect(addr, "CLIENT1").await;
	client.logon().await;

	// Limit order without a price
	let order = FixMessage::new(msg_type::NEW_ORDER_SINGLE)
		.with(tags::CL_ORD_ID, "ORD-1")
		.with(tags::SYMBOL, "AAPL")
		.with(tags::SIDE, "1")
		.with(tags::ORDER_QTY, "10")
		.with(tags::ORD_TYPE, "2");
	client.send(order).await;

	let reject = client.recv().await;
	assert_eq!(reject.get(tags::ORD_STATUS), Some("8"));
	assert!(reject.get(tags::TEXT).unwrap().contains("44"));
}

#[tokio::test]
async fn test_garbage_bytes_disconnect_the_client() {
	let (addr, _engine, server) = start_gateway(GatewayConfig::default()).await;
	let mut client = FixClient::connect(addr, "CLIENT1").await;

	client.stream.write_all(b"GET / HTTP/1.1\r\n\r\n").await.unwrap();
	client.expect_disconnect().await;

	// Give the connection task a moment to tear down
	tokio::time::sleep(Duration::from_millis(50)).await;
	assert_eq!(server.connection_count(), 0);
}

#[tokio::test]
async fn test_connection_cap_refuses_excess_clients() {
	let config = GatewayConfig {
		max_connections: 1,
		..GatewayConfig::default()
	};
	let (addr, _engine, server) = start_gateway(config).await;

	let mut first = FixClient::connect(addr, "CLIENT1").await;
	first.logon().await;

	let mut second = FixClient::connect(addr, "CLIENT2").await;
	second.expect_disconnect().await;

	use std::sync::atomic::Ordering;
	assert_eq!(server.stats().connections_rejected.load(Ordering::Relaxed), 1);
	assert_eq!(server.connection_count(), 1);
}

#[tokio::test]
async fn test_orders_survive_disconnect() {
	let (addr, engine, _server) = start_gateway(GatewayConfig::default()).await;
	let mut client = FixClient::connect(addr, "CLIENT1").await;
	client.logon().await;

	client
		.send(FixClient::new_order("ORD-1", "AAPL", '1', 10, "99"))
		.await;
	let ack = client.recv().await;
	assert_eq!(ack.get(tags::ORD_STATUS), Some("0"));

	drop(client);
	tokio::time::sleep(Duration::from_millis(100)).await;

	// The resting order is still in the book after the disconnect
	let md = engine.get_market_data("AAPL").unwrap();
	assert_eq!(md.best_bid, Some(Price::from_units(99)));
}
