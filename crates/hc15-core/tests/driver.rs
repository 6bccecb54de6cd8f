use std::time::Duration;

use hc15_core::codec::Parity;
use hc15_core::command::Command;
use hc15_core::driver::{DriverConfig, Hc15Driver};
use hc15_core::error::Hc15Error;
use hc15_core::transport::MockTransport;
use pretty_assertions::assert_eq;
use tokio::time::Instant;

fn driver_with(mock: &MockTransport) -> Hc15Driver<MockTransport> {
    Hc15Driver::new(mock.clone())
}

fn spill_driver(mock: &MockTransport) -> Hc15Driver<MockTransport> {
    let config = DriverConfig {
        spill_unmatched: true,
        ..DriverConfig::default()
    };
    Hc15Driver::with_config(mock.clone(), config)
}

#[tokio::test(start_paused = true)]
async fn test_probe_round_trip() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK\r\n");
    let driver = driver_with(&mock);

    driver.probe().await.unwrap();
    assert_eq!(mock.take_written(), b"AT\r\n".to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_unexpected_response_rejected() {
    let mock = MockTransport::new();
    mock.respond_with(b"ERROR\r\n");
    let driver = driver_with(&mock);

    let err = driver.probe().await.unwrap_err();
    match err {
        Hc15Error::UnexpectedResponse(line) => assert_eq!(line, "ERROR"),
        other => panic!("expected UnexpectedResponse, got {other:?}"),
    }
    // Spilling is off by default, so the line is gone.
    assert_eq!(driver.read_line(), None);
}

#[tokio::test(start_paused = true)]
async fn test_unmatched_line_spilled_when_configured() {
    let mock = MockTransport::new();
    mock.respond_with(b"+ANNOUNCE\r\n");
    let driver = spill_driver(&mock);

    let err = driver.probe().await.unwrap_err();
    assert!(matches!(err, Hc15Error::UnexpectedResponse(_)));
    assert_eq!(driver.read_line(), Some("+ANNOUNCE".to_string()));
}

#[tokio::test(start_paused = true)]
async fn test_set_channel_round_trip() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK+C:007\r\n");
    let driver = driver_with(&mock);

    assert_eq!(driver.set_channel(7).await.unwrap(), 7);
    assert_eq!(mock.take_written(), b"AT+C007\r\n".to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_channel_range_rejected_before_io() {
    let mock = MockTransport::new();
    let driver = driver_with(&mock);

    for channel in [0u8, 51] {
        let err = driver.set_channel(channel).await.unwrap_err();
        assert!(matches!(err, Hc15Error::InvalidParameter(_)));
    }
    // Nothing reached the wire and command mode was never entered.
    assert!(mock.written().is_empty());
    assert_eq!(mock.mode_changes(), vec![false]);
}

#[tokio::test(start_paused = true)]
async fn test_air_speed_round_trip() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK+S:003\r\n");
    let driver = driver_with(&mock);

    assert_eq!(driver.set_air_speed(3).await.unwrap(), 3);
    assert_eq!(mock.take_written(), b"AT+S003\r\n".to_vec());

    let err = driver.set_air_speed(9).await.unwrap_err();
    assert!(matches!(err, Hc15Error::InvalidParameter(_)));
}

#[tokio::test(start_paused = true)]
async fn test_parity_set_then_query() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK+PARITYBIT\r\n");
    mock.respond_with(b"OK+PARITYBIT:2\r\n");
    let driver = driver_with(&mock);

    driver.set_parity(Parity::Even).await.unwrap();
    assert_eq!(driver.parity().await.unwrap(), Parity::Even);
    assert_eq!(mock.take_written(), b"AT+PARITYBIT2\r\nAT+PARITYBIT?\r\n".to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_baud_rate_query() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK+B:9600\r\n");
    let driver = driver_with(&mock);

    assert_eq!(driver.baud_rate().await.unwrap(), 9600);
    assert_eq!(mock.take_written(), b"AT+B?\r\n".to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_reset_default() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK+DEFAULT\r\n");
    let driver = driver_with(&mock);

    driver.reset_default().await.unwrap();
    assert_eq!(mock.take_written(), b"AT+DEFAULT\r\n".to_vec());
}

#[tokio::test(start_paused = true)]
async fn test_response_deadline_enforced() {
    let mock = MockTransport::new();
    let driver = driver_with(&mock);
    let timeout = driver.config().response_timeout;

    let start = Instant::now();
    let err = driver.probe().await.unwrap_err();
    match err {
        Hc15Error::ResponseTimeout(d) => assert_eq!(d, timeout),
        other => panic!("expected ResponseTimeout, got {other:?}"),
    }
    assert!(start.elapsed() >= timeout);
}

#[tokio::test(start_paused = true)]
async fn test_mode_restored_on_success() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK\r\n");
    let driver = driver_with(&mock);

    driver.probe().await.unwrap();
    assert_eq!(mock.mode_changes(), vec![false, true, false]);
    assert!(!mock.command_mode());
}

#[tokio::test(start_paused = true)]
async fn test_mode_restored_on_timeout() {
    let mock = MockTransport::new();
    let driver = driver_with(&mock);

    let err = driver.probe().await.unwrap_err();
    assert!(matches!(err, Hc15Error::ResponseTimeout(_)));
    assert_eq!(mock.mode_changes(), vec![false, true, false]);
    assert!(!mock.command_mode());
}

#[tokio::test(start_paused = true)]
async fn test_mode_restored_when_module_busy() {
    let mock = MockTransport::new();
    mock.set_busy(true);
    let driver = driver_with(&mock);
    let busy_wait = driver.config().busy_wait;

    let start = Instant::now();
    let err = driver.probe().await.unwrap_err();
    assert!(matches!(err, Hc15Error::ModuleBusy));
    assert!(start.elapsed() >= busy_wait);
    // The command never reached the wire.
    assert!(mock.written().is_empty());
    assert_eq!(mock.mode_changes(), vec![false, true, false]);
}

#[tokio::test(start_paused = true)]
async fn test_token_contention_times_out() {
    let mock = MockTransport::new();
    let driver = driver_with(&mock);

    // A query with no scripted reply holds the token for its full
    // response window, which outlasts the probe's shorter token wait.
    let contender = driver.clone();
    let holder = tokio::spawn(async move { contender.channel().await });
    tokio::task::yield_now().await;

    let err = driver.probe().await.unwrap_err();
    assert!(matches!(err, Hc15Error::LockTimeout(_)));

    let held = holder.await.unwrap();
    assert!(matches!(held, Err(Hc15Error::ResponseTimeout(_))));
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_commands_serialize() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK+C:007\r\n");
    mock.respond_with(b"OK+C:007\r\n");
    let driver = driver_with(&mock);
    let other = driver.clone();

    let (a, b) = tokio::join!(driver.channel(), other.channel());
    assert_eq!(a.unwrap(), 7);
    assert_eq!(b.unwrap(), 7);

    // Strict alternation: neither exchange saw the other's command mode.
    assert_eq!(mock.mode_changes(), vec![false, true, false, true, false]);
}

#[tokio::test(start_paused = true)]
async fn test_read_line_needs_no_token() {
    let mock = MockTransport::new();
    mock.respond_with(b"+EV\r\n");
    let driver = spill_driver(&mock);

    let err = driver.probe().await.unwrap_err();
    assert!(matches!(err, Hc15Error::UnexpectedResponse(_)));

    // Park a query on the token, then read from the buffer anyway.
    let contender = driver.clone();
    let task = tokio::spawn(async move {
        let _ = contender.channel().await;
    });
    tokio::task::yield_now().await;

    assert_eq!(driver.available(), 4);
    assert_eq!(driver.read_line(), Some("+EV".to_string()));

    task.abort();
    let _ = task.await;
}

#[tokio::test(start_paused = true)]
async fn test_execute_returns_matched_line() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK+S:005\r\n");
    let driver = driver_with(&mock);

    let line = driver.execute(Command::query_air_speed()).await.unwrap();
    assert_eq!(line, "OK+S:005");
}

#[tokio::test(start_paused = true)]
async fn test_execute_honors_per_call_timeout() {
    let mock = MockTransport::new();
    let driver = driver_with(&mock);

    let command = Command::query_channel().with_timeout(Duration::from_millis(250));
    let start = Instant::now();
    let err = driver.execute(command).await.unwrap_err();
    match err {
        Hc15Error::ResponseTimeout(d) => assert_eq!(d, Duration::from_millis(250)),
        other => panic!("expected ResponseTimeout, got {other:?}"),
    }
    assert!(start.elapsed() >= Duration::from_millis(250));
}

#[tokio::test(start_paused = true)]
async fn test_basic_params_complete() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK+B:9600\r\nOK+C:007\r\nOK+S:003\r\nOK+P:+20dBm\r\n");
    let driver = driver_with(&mock);

    let params = driver.basic_params().await.unwrap();
    assert_eq!(mock.take_written(), b"AT+RX\r\n".to_vec());
    assert!(params.complete);
    assert_eq!(params.baud_rate, 9600);
    assert_eq!(params.channel, 7);
    assert_eq!(params.air_speed, 3);
    assert_eq!(params.tx_power_dbm, 20);
}

#[tokio::test(start_paused = true)]
async fn test_basic_params_partial_after_deadline() {
    let mock = MockTransport::new();
    // Transmit power never arrives.
    mock.respond_with(b"OK+B:9600\r\nOK+C:021\r\nOK+S:004\r\n");
    let driver = driver_with(&mock);
    let deadline = driver.config().composite_timeout;

    let start = Instant::now();
    let params = driver.basic_params().await.unwrap();
    assert!(start.elapsed() >= deadline);

    assert!(!params.complete);
    assert_eq!(params.baud_rate, 9600);
    assert_eq!(params.channel, 21);
    assert_eq!(params.air_speed, 4);
    assert_eq!(params.tx_power_dbm, 0);
}

#[tokio::test(start_paused = true)]
async fn test_basic_params_out_of_order_with_chatter() {
    let mock = MockTransport::new();
    mock.respond_with(b"OK+P:+20dBm\r\nNOISE\r\nOK+S:008\r\nOK+B:9600\r\nOK+C:050\r\n");
    let driver = driver_with(&mock);

    let params = driver.basic_params().await.unwrap();
    assert!(params.complete);
    assert_eq!(params.baud_rate, 9600);
    assert_eq!(params.channel, 50);
    assert_eq!(params.air_speed, 8);
    assert_eq!(params.tx_power_dbm, 20);
}

#[test]
fn test_error_display() {
    let err = Hc15Error::ResponseTimeout(Duration::from_secs(5));
    assert!(!err.to_string().is_empty());

    let err = Hc15Error::Serial {
        written: 3,
        expected: 9,
    };
    assert!(err.to_string().contains('3'));
    assert!(err.to_string().contains('9'));
}
