//! Integration tests for the display client
//!
//! These tests drive a [`DisplayClient`] against a virtual display over
//! in-memory streams and real TCP sockets, covering:
//! - Parameter reads, writes, option names, and catalog validation
//! - Power, identity, diagnosis, and save commands
//! - Request queueing, reply matching, and timeouts
//! - Reassembly of split replies and stream hygiene events
//! - Reconnection after a lost connection

use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::sync::mpsc;

use lfd_client::{
    ClientError, DisplayClient, MonitorId, PowerMode, Reply, ReplyId, SessionConfig, SessionEvent,
};
use lfd_protocol::{catalog, frame, CommandError, OperationType, ParseError};
use lfd_sim::{run_display_task, DisplayTaskCommand, VirtualDisplay, VirtualDisplayConfig};

// ============================================================================
// Helper Functions
// ============================================================================

mod helpers {
    use super::*;

    /// Route session logs to the test harness when RUST_LOG asks for them.
    pub fn init_tracing() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    /// A default display with some parameters forced to known values.
    pub fn display_with(values: &[(&str, u16)]) -> VirtualDisplay {
        let mut display = VirtualDisplay::new(VirtualDisplayConfig::default());
        for (key, value) in values {
            display.set_parameter(key, *value).unwrap();
        }
        display
    }

    /// Wire a client to `display` over an in-memory stream.
    ///
    /// The returned sender keeps the display task alive; send
    /// [`DisplayTaskCommand::Shutdown`] through it to hang up from the
    /// display side.
    pub fn connect(
        display: VirtualDisplay,
        config: SessionConfig,
    ) -> (
        DisplayClient,
        mpsc::Receiver<SessionEvent>,
        mpsc::Sender<DisplayTaskCommand>,
    ) {
        init_tracing();
        let destination = display.id();
        let (client_io, display_io) = tokio::io::duplex(1024);
        let (task_tx, task_rx) = mpsc::channel(4);
        tokio::spawn(run_display_task(display_io, display, task_rx));
        let (client, events) = DisplayClient::spawn_with_io(client_io, destination, config);
        (client, events, task_tx)
    }

    /// Client wired to a fresh default display.
    pub fn connect_default() -> (
        DisplayClient,
        mpsc::Receiver<SessionEvent>,
        mpsc::Sender<DisplayTaskCommand>,
    ) {
        connect(
            VirtualDisplay::new(VirtualDisplayConfig::default()),
            SessionConfig::default(),
        )
    }
}

// ============================================================================
// Parameter Tests
// ============================================================================

mod parameter_tests {
    use super::*;

    #[tokio::test]
    async fn get_reads_the_stored_value() {
        let display = helpers::display_with(&[("picture.brightness", 50)]);
        let (client, _events, _hangup) = helpers::connect(display, SessionConfig::default());

        let reply = client.get("picture.brightness").await.unwrap();
        assert_eq!(reply.key, "PICTURE.BRIGHTNESS");
        assert_eq!(reply.value, 50);
        assert_eq!(reply.max_value, 100);
        assert_eq!(reply.operation, OperationType::Set);
    }

    #[tokio::test]
    async fn set_writes_and_reads_back() {
        let (client, _events, _hangup) = helpers::connect_default();

        let reply = client.set("picture.contrast", 72).await.unwrap();
        assert_eq!(reply.value, 72);
        assert_eq!(client.get("picture.contrast").await.unwrap().value, 72);
    }

    #[tokio::test]
    async fn set_option_resolves_names_to_codes() {
        let (client, _events, _hangup) = helpers::connect_default();

        let reply = client
            .set_option("picture.gamma_selection", "dicom")
            .await
            .unwrap();
        assert_eq!(reply.key, "PICTURE.GAMMA_SELECTION");
        assert_eq!(reply.value, 5);
    }

    #[tokio::test]
    async fn momentary_actions_send_their_fixed_value() {
        let (client, _events, _hangup) = helpers::connect_default();

        // The requested value is irrelevant for an action.
        let reply = client.set("adjust.adjust_reset", 999).await.unwrap();
        assert_eq!(reply.key, "ADJUST.ADJUST_RESET");
        assert_eq!(reply.value, 3);
        assert_eq!(reply.operation, OperationType::Momentary);
    }

    #[tokio::test]
    async fn readonly_parameters_reject_writes_locally() {
        let (client, _events, _hangup) = helpers::connect_default();

        let err = client
            .set("picture.ambient.current_illuminance", 10)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Command(CommandError::ReadOnly(
                "PICTURE.AMBIENT.CURRENT_ILLUMINANCE"
            ))
        ));

        // Reading the same parameter is still allowed.
        assert!(client
            .get("picture.ambient.current_illuminance")
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn unknown_keys_fail_before_anything_is_sent() {
        let (client, _events, _hangup) = helpers::connect_default();

        let err = client.get("picture.does_not_exist").await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Command(CommandError::UnknownKey(_))
        ));
    }

    #[tokio::test]
    async fn out_of_range_values_fail_before_anything_is_sent() {
        let (client, _events, _hangup) = helpers::connect_default();

        let err = client.set("picture.brightness", 101).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Command(CommandError::ValueOutOfRange {
                value: 101,
                max: 100,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn displays_answer_invalid_raw_writes_with_a_refusal() {
        let (client, _events, _hangup) = helpers::connect_default();

        // Bypass catalog validation to exercise the display's own check.
        let spec = catalog::find_by_key("picture.brightness").unwrap();
        let request = frame::build_set(client.destination(), spec.page, spec.code, 999).unwrap();
        let err = client.send_raw(request).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Parse(ParseError::UnsupportedOperation)
        ));
    }
}

// ============================================================================
// Command Tests
// ============================================================================

mod command_tests {
    use super::*;

    #[tokio::test]
    async fn power_state_round_trips() {
        let (client, _events, _hangup) = helpers::connect_default();

        assert_eq!(client.get_power().await.unwrap(), PowerMode::On);
        assert_eq!(
            client.set_power(PowerMode::Standby).await.unwrap(),
            PowerMode::Standby
        );
        assert_eq!(client.get_power().await.unwrap(), PowerMode::Standby);
    }

    #[tokio::test]
    async fn identity_queries_report_the_configured_strings() {
        let display = VirtualDisplay::new(VirtualDisplayConfig {
            model: "X554UNS".to_string(),
            serial: "7402468YB".to_string(),
            ..VirtualDisplayConfig::default()
        });
        let (client, _events, _hangup) = helpers::connect(display, SessionConfig::default());

        assert_eq!(client.get_model().await.unwrap(), "X554UNS");
        assert_eq!(client.get_serial().await.unwrap(), "7402468YB");
    }

    #[tokio::test]
    async fn self_diagnosis_reports_the_status_byte() {
        let mut display = VirtualDisplay::new(VirtualDisplayConfig::default());
        display.set_diagnosis(0x70);
        let (client, _events, _hangup) = helpers::connect(display, SessionConfig::default());

        assert_eq!(client.self_diagnosis().await.unwrap(), 0x70);
    }

    #[tokio::test]
    async fn save_settings_is_acknowledged() {
        let (client, _events, _hangup) = helpers::connect_default();
        client.save_settings().await.unwrap();
    }

    #[tokio::test]
    async fn send_raw_returns_whatever_reply_comes_back() {
        let (client, _events, _hangup) = helpers::connect_default();

        let request = frame::build_get_power(client.destination()).unwrap();
        let reply = client.send_raw(request).await.unwrap();
        assert_eq!(reply, Reply::PowerStatus(PowerMode::On));
    }

    #[tokio::test]
    async fn broadcast_destination_reaches_the_display() {
        helpers::init_tracing();
        let display = VirtualDisplay::new(VirtualDisplayConfig::default());
        let (client_io, display_io) = tokio::io::duplex(1024);
        let (_task_tx, task_rx) = mpsc::channel(4);
        tokio::spawn(run_display_task(display_io, display, task_rx));
        let (client, _events) =
            DisplayClient::spawn_with_io(client_io, MonitorId::All, SessionConfig::default());

        assert_eq!(client.get_power().await.unwrap(), PowerMode::On);
    }
}

// ============================================================================
// Session Behavior Tests
// ============================================================================

mod session_tests {
    use super::*;

    #[tokio::test]
    async fn concurrent_requests_are_answered_in_order() {
        let display =
            helpers::display_with(&[("picture.brightness", 11), ("picture.contrast", 22)]);
        let (client, _events, _hangup) = helpers::connect(display, SessionConfig::default());

        let (brightness, contrast) = tokio::join!(
            client.get("picture.brightness"),
            client.get("picture.contrast"),
        );
        assert_eq!(brightness.unwrap().value, 11);
        assert_eq!(contrast.unwrap().value, 22);
    }

    #[tokio::test]
    async fn unanswered_requests_time_out() {
        helpers::init_tracing();
        // Nothing on the far end ever answers.
        let (client_io, _silent) = tokio::io::duplex(1024);
        let config = SessionConfig {
            reply_timeout: Duration::from_millis(50),
            timeout_poll: Duration::from_millis(10),
            ..SessionConfig::default()
        };
        let (client, _events) =
            DisplayClient::spawn_with_io(client_io, MonitorId::Single(1), config);

        let err = client.get_power().await.unwrap_err();
        assert!(matches!(err, ClientError::Timeout));
    }

    #[tokio::test]
    async fn hanging_up_fails_requests_and_emits_events() {
        let (client, mut events, hangup) = helpers::connect_default();

        assert_eq!(client.get_power().await.unwrap(), PowerMode::On);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);

        hangup.send(DisplayTaskCommand::Shutdown).await.unwrap();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Disconnected);

        let err = client.get_power().await.unwrap_err();
        assert!(matches!(err, ClientError::Disconnected));
    }

    #[tokio::test]
    async fn close_stops_the_session() {
        let (client, _events, _hangup) = helpers::connect_default();

        assert_eq!(client.get_power().await.unwrap(), PowerMode::On);
        client.close().await;

        let err = client.get_power().await.unwrap_err();
        assert!(matches!(err, ClientError::Disconnected));
    }

    #[tokio::test]
    async fn replies_split_across_chunks_still_complete() {
        helpers::init_tracing();
        let (client_io, mut device) = tokio::io::duplex(1024);
        let (client, _events) =
            DisplayClient::spawn_with_io(client_io, MonitorId::Single(1), SessionConfig::default());

        let device_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            let _ = device.read(&mut buf).await.unwrap();
            let reply =
                frame::build_power_status_reply(MonitorId::Single(1), PowerMode::On).unwrap();
            // Dribble the reply out a few bytes at a time.
            for chunk in reply.chunks(5) {
                device.write_all(chunk).await.unwrap();
                device.flush().await.unwrap();
                tokio::time::sleep(Duration::from_millis(2)).await;
            }
            device
        });

        assert_eq!(client.get_power().await.unwrap(), PowerMode::On);
        let _device = device_task.await.unwrap();
    }

    #[tokio::test]
    async fn corrupted_replies_fail_the_request() {
        helpers::init_tracing();
        let (client_io, mut device) = tokio::io::duplex(1024);
        let (client, _events) =
            DisplayClient::spawn_with_io(client_io, MonitorId::Single(1), SessionConfig::default());

        let device_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            let _ = device.read(&mut buf).await.unwrap();
            let mut reply =
                frame::build_power_status_reply(MonitorId::Single(1), PowerMode::On).unwrap();
            // Flip one body bit; the checksum no longer matches.
            reply[10] ^= 0x01;
            device.write_all(&reply).await.unwrap();
            device.flush().await.unwrap();
            device
        });

        let err = client.get_power().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Parse(ParseError::ChecksumMismatch { .. })
        ));
        let _device = device_task.await.unwrap();
    }

    #[tokio::test]
    async fn mismatched_replies_are_reported() {
        helpers::init_tracing();
        let (client_io, mut device) = tokio::io::duplex(1024);
        let (client, _events) =
            DisplayClient::spawn_with_io(client_io, MonitorId::Single(1), SessionConfig::default());

        let device_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            let _ = device.read(&mut buf).await.unwrap();
            // Answer the power query with a model string.
            let reply = frame::build_text_reply(MonitorId::Single(1), 0x17, "P404", 8).unwrap();
            device.write_all(&reply).await.unwrap();
            device.flush().await.unwrap();
            device
        });

        let err = client.get_power().await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::ReplyMismatch {
                expected: ReplyId::PowerStatus,
                actual: ReplyId::Model,
            }
        ));
        let _device = device_task.await.unwrap();
    }

    #[tokio::test]
    async fn junk_after_a_reply_is_dropped_and_reported() {
        helpers::init_tracing();
        let (client_io, mut device) = tokio::io::duplex(1024);
        let (client, mut events) =
            DisplayClient::spawn_with_io(client_io, MonitorId::Single(1), SessionConfig::default());

        let device_task = tokio::spawn(async move {
            let mut buf = vec![0u8; 256];
            let _ = device.read(&mut buf).await.unwrap();
            let mut data =
                frame::build_power_status_reply(MonitorId::Single(1), PowerMode::On).unwrap();
            data.extend_from_slice(b"garbage");
            device.write_all(&data).await.unwrap();
            device.flush().await.unwrap();
            device
        });

        assert_eq!(client.get_power().await.unwrap(), PowerMode::On);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
        assert_eq!(
            events.recv().await.unwrap(),
            SessionEvent::TrailingBytesDropped { count: 7 }
        );
        let _device = device_task.await.unwrap();
    }
}

// ============================================================================
// Reconnect Tests
// ============================================================================

mod reconnect_tests {
    use super::*;

    #[tokio::test]
    async fn reconnects_after_the_display_drops() {
        helpers::init_tracing();
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();

        let config = SessionConfig {
            reconnect_delay: Duration::from_millis(20),
            ..SessionConfig::default()
        };
        let (client, mut events) = DisplayClient::connect(addr, MonitorId::Single(1), config);

        // First connection answers one request, then hangs up.
        let (socket, _) = listener.accept().await.unwrap();
        let (hangup, task_rx) = mpsc::channel(1);
        let first = tokio::spawn(run_display_task(
            socket,
            helpers::display_with(&[("picture.brightness", 42)]),
            task_rx,
        ));

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
        assert_eq!(client.get("picture.brightness").await.unwrap().value, 42);

        hangup.send(DisplayTaskCommand::Shutdown).await.unwrap();
        first.await.unwrap().unwrap();
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Disconnected);
        assert_eq!(events.recv().await.unwrap(), SessionEvent::Reconnecting);

        // Second connection picks service back up.
        let (socket, _) = listener.accept().await.unwrap();
        let (_hangup, task_rx) = mpsc::channel(1);
        tokio::spawn(run_display_task(
            socket,
            helpers::display_with(&[("picture.brightness", 42)]),
            task_rx,
        ));

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Connected);
        assert_eq!(client.get("picture.brightness").await.unwrap().value, 42);
        client.close().await;
    }

    #[tokio::test]
    async fn requests_during_the_reconnect_gap_are_rejected() {
        helpers::init_tracing();
        // Bind, note the port, and close the listener so dialing fails.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);

        let config = SessionConfig {
            reconnect_delay: Duration::from_millis(200),
            ..SessionConfig::default()
        };
        let (client, mut events) = DisplayClient::connect(addr, MonitorId::Single(1), config);

        assert_eq!(events.recv().await.unwrap(), SessionEvent::Reconnecting);
        let err = client.get_power().await.unwrap_err();
        assert!(matches!(err, ClientError::Disconnected));
        client.close().await;
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

mod proptest_tests {
    use super::*;
    use lfd_protocol::{CommandKind, CommandSpec};
    use proptest::prelude::*;

    fn range_write() -> impl Strategy<Value = (&'static CommandSpec, u16)> {
        let specs: Vec<&'static CommandSpec> = catalog::all()
            .filter(|spec| !spec.readonly && matches!(spec.kind, CommandKind::Range { .. }))
            .collect();
        prop::sample::select(specs).prop_flat_map(|spec| {
            let (min, max) = match spec.kind {
                CommandKind::Range { min, max } => (min, max),
                _ => unreachable!(),
            };
            (Just(spec), min..=max)
        })
    }

    proptest! {
        #[test]
        fn any_in_range_write_is_stored_and_echoed((spec, value) in range_write()) {
            let mut display = VirtualDisplay::new(VirtualDisplayConfig::default());
            let request =
                frame::build_set(MonitorId::Single(1), spec.page, spec.code, value).unwrap();
            display.handle_chunk(&request);

            let reply_frame = display.take_output().unwrap();
            let reply = frame::parse_reply(&reply_frame).unwrap();
            prop_assert!(matches!(reply, Reply::Parameter(_)));
            if let Reply::Parameter(p) = reply {
                prop_assert_eq!(p.key, spec.key);
                prop_assert_eq!(p.value, value);
            }
            prop_assert_eq!(display.parameter(spec.key), Some(value));
        }

        #[test]
        fn only_the_addressed_display_answers(id in 1u8..=100, target in 1u8..=100) {
            let mut display = VirtualDisplay::new(VirtualDisplayConfig {
                id,
                ..VirtualDisplayConfig::default()
            });
            display.handle_chunk(&frame::build_get_power(MonitorId::Single(target)).unwrap());
            prop_assert_eq!(display.has_output(), id == target);
        }
    }
}
