//! End-to-end tests: a fixture gateway on an ephemeral port, driven through
//! the public `Gateway` API over TCP.
use std::io::Write;
use std::net::TcpListener;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

use crms_client::{ClientConfig, Gateway};
use crms_common::codec::WireCodec;
use crms_common::{
    GatewayError, Observations2DLayout, RetrieveObservations2DCommand, RetrieveResponseStatus,
    StoreObservations2DCommand, ValueGrid,
};
use crms_server::{FixtureBook, GatewayServer, ServerHandle};

fn sample_book() -> FixtureBook {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("crms_server")
        .join("fixtures")
        .join("sample.json");
    FixtureBook::load(&path).unwrap()
}

fn spawn_gateway(book: FixtureBook) -> ServerHandle {
    GatewayServer::bind("127.0.0.1:0", book)
        .unwrap()
        .spawn()
        .unwrap()
}

fn client(handle: &ServerHandle, codec: WireCodec) -> Gateway {
    let config = ClientConfig::new(handle.local_addr().to_string())
        .with_codec(codec)
        .with_connect_timeout(Duration::from_secs(2))
        .with_io_timeout(Duration::from_secs(5));
    Gateway::connect(config)
}

fn close_price_query(subject: &str) -> RetrieveObservations2DCommand {
    let mut command = RetrieveObservations2DCommand::new();
    command
        .add_subject(subject)
        .add_data_type("CLOSE PRICE")
        .set_date_range("01/01/2018");
    command
}

fn financial_statement_query() -> RetrieveObservations2DCommand {
    let mut command = RetrieveObservations2DCommand::new();
    command
        .add_subject("BHP")
        .add_publisher("JPM")
        .add_data_type("SALES")
        .add_data_type("EBIT_REP")
        .add_data_type("BROKER_NPAT")
        .add_observed_period("2018")
        .add_observed_period("2019")
        .add_observed_period("2020")
        .set_layout(Observations2DLayout::DatatypesByFinYearsAndPublishers)
        .set_transpose_view(true);
    command
}

#[test]
fn incorrect_credentials_report_failed_in_link_test() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Json);
    gateway.login("invalid_user", "invalid_password");

    let message = gateway.test_link("Test message");
    assert!(message.contains("failed"), "{}", message);
}

#[test]
fn default_session_passes_link_test() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Json);

    let message = gateway.test_link("Test message");
    assert!(!message.contains("failed"), "{}", message);
    assert!(message.contains("succeeded"));

    gateway.login("analyst", "analyst-password");
    assert!(!gateway.test_link("Test message").contains("failed"));
    let message = gateway.test_link("upload failed yesterday");
    assert!(!message.contains("failed"), "{}", message);
}

#[test]
fn session_survives_the_gateway_closing_an_idle_connection() {
    let handle = GatewayServer::bind("127.0.0.1:0", sample_book())
        .unwrap()
        .with_idle_timeout(Duration::from_millis(200))
        .spawn()
        .unwrap();
    let mut gateway = client(&handle, WireCodec::Json);
    gateway.login("analyst", "analyst-password");

    let first = gateway.test_link("Test message");
    assert!(!first.contains("failed"), "{}", first);

    thread::sleep(Duration::from_millis(600));
    let second = gateway.test_link("Test message");
    assert!(!second.contains("failed"), "{}", second);

    thread::sleep(Duration::from_millis(600));
    let response = gateway
        .retrieve_observations_2d(&close_price_query("BHP"))
        .unwrap();
    assert_eq!(response.status, RetrieveResponseStatus::Available);
}

#[test]
fn close_price_is_retrieved_with_headers() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Json);

    let response = gateway
        .retrieve_observations_2d(&close_price_query("BHP"))
        .unwrap();

    assert_eq!(response.status, RetrieveResponseStatus::Available);
    let expected = ValueGrid::from_str_rows([["", "CLOSE PRICE"], ["BHP", "29.57"]]).unwrap();
    assert_eq!(response.values, expected);
    assert_eq!(response.value("BHP", "CLOSE PRICE"), Some("29.57"));
}

#[test]
fn unknown_subject_is_a_system_error() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Json);

    let response = gateway
        .retrieve_observations_2d(&close_price_query("INVALID_SUBEJCT"))
        .unwrap();

    assert_eq!(response.status, RetrieveResponseStatus::SystemError);
    assert!(response.values.is_empty());
}

#[test]
fn transposed_financial_statement_puts_data_types_down_the_rows() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Json);

    let response = gateway
        .retrieve_observations_2d(&financial_statement_query())
        .unwrap();

    assert_eq!(response.status, RetrieveResponseStatus::Available);
    let expected = ValueGrid::from_str_rows([
        ["", "2018 JPM", "2019 JPM", "2020 JPM"],
        ["SALES", "45809000000", "45139000000", "43952834224.06"],
        ["EBIT_REP", "16169000000", "15712000000", "16594015907.75"],
        ["BROKER_NPAT", "8933000000", "9466000000", "10540132135.14"],
    ])
    .unwrap();
    assert_eq!(response.values, expected);
    assert!(response.matches_axes(&financial_statement_query()));
}

#[test]
fn retrieve_works_over_bincode_too() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Bincode);

    let response = gateway
        .retrieve_observations_2d(&financial_statement_query())
        .unwrap();
    assert_eq!(response.status, RetrieveResponseStatus::Available);
    assert_eq!(response.value("EBIT_REP", "2019 JPM"), Some("15712000000"));
}

#[test]
fn query_without_fixture_is_not_available() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Json);

    let mut query = close_price_query("NAB");
    query.set_date_range("02/01/2018");
    let response = gateway.retrieve_observations_2d(&query).unwrap();
    assert_eq!(response.status, RetrieveResponseStatus::NotAvailable);
}

#[test]
fn bhp_financials_are_stored() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Json);

    let mut command = StoreObservations2DCommand::new();
    command
        .set_layout(Observations2DLayout::DatatypesBySubjects)
        .add_subject("BHP")
        .add_publisher("GAMMA")
        .add_data_type("EPS")
        .add_data_type("DPS")
        .add_observed_period("2018")
        .set_currency("USD");
    command.set_values(ValueGrid::from_str_rows([["1.10", ".03"]]).unwrap());

    let response = gateway.store_observations_2d(&command).unwrap();
    assert_eq!(response.errors_total, 0, "{:?}", response);
    assert!(response.is_success());
}

#[test]
fn market_data_for_several_securities_is_stored_in_subject_order() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Bincode);

    let mut command = StoreObservations2DCommand::new();
    command
        .set_layout(Observations2DLayout::DatatypesBySubjects)
        .add_subject("BHP")
        .add_subject("NAB")
        .add_subject("WOW")
        .add_data_type("CLOSE PRICE")
        .set_currency("AUD");
    command.set_values(ValueGrid::from_str_rows([["45"], ["20"], ["15"]]).unwrap());

    let response = gateway.store_observations_2d(&command).unwrap();
    assert_eq!(response.errors_total, 0, "{:?}", response);

    let ledger = handle.ledger();
    let ledger = ledger.lock().unwrap();
    let batch = ledger.batches().next().unwrap();
    assert_eq!(batch.cells_written, 3);
    assert_eq!(batch.command.subjects, vec!["BHP", "NAB", "WOW"]);
    assert_eq!(batch.command.values.get(1, 0), Some("20"));
    assert_eq!(batch.username, None);
}

#[test]
fn store_reports_rejected_cells() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Json);

    let mut command = StoreObservations2DCommand::new();
    command
        .add_subject("BHP")
        .add_subject("UNKNOWN")
        .add_data_type("CLOSE PRICE")
        .set_currency("AUD");
    command.set_values(ValueGrid::from_str_rows([["45"], ["20"]]).unwrap());

    let response = gateway.store_observations_2d(&command).unwrap();
    assert_eq!(response.errors_total, 1);
    assert_eq!(response.errors[0].row, 1);
    assert_eq!(handle.ledger().lock().unwrap().cells_written(), 1);
}

#[test]
fn invalid_commands_never_reach_the_gateway() {
    let handle = spawn_gateway(sample_book());
    let mut gateway = client(&handle, WireCodec::Json);

    let err = gateway
        .retrieve_observations_2d(&RetrieveObservations2DCommand::new())
        .unwrap_err();
    assert!(matches!(err, GatewayError::InvalidCommand(_)));

    let mut command = StoreObservations2DCommand::new();
    command.add_subject("BHP").add_data_type("CLOSE PRICE");
    command.set_values(ValueGrid::from_str_rows([["45"], ["20"]]).unwrap());
    let err = gateway.store_observations_2d(&command).unwrap_err();
    assert!(matches!(err, GatewayError::InvalidGrid(_)));

    assert!(handle.ledger().lock().unwrap().is_empty());
}

#[test]
fn unreachable_gateway_is_reported_through_responses() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let config = ClientConfig::new(addr.to_string())
        .with_connect_timeout(Duration::from_millis(500))
        .with_io_timeout(Duration::from_millis(500));
    let mut gateway = Gateway::connect(config);

    assert!(gateway.test_link("Test message").contains("failed"));

    let response = gateway
        .retrieve_observations_2d(&close_price_query("BHP"))
        .unwrap();
    assert_eq!(response.status, RetrieveResponseStatus::SystemError);
    assert!(response.message.is_some());

    let mut command = StoreObservations2DCommand::new();
    command.add_subject("BHP").add_data_type("EPS").add_data_type("DPS");
    command.set_values(ValueGrid::from_str_rows([["1.10", ".03"]]).unwrap());
    assert_eq!(gateway.store_observations_2d(&command).unwrap().errors_total, 2);
}

#[test]
fn closed_book_denies_anonymous_reads() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(
        br#"{
            "accounts": [{ "username": "analyst", "password": "secret" }],
            "allow_anonymous": false,
            "subjects": ["BHP"]
        }"#,
    )
    .unwrap();
    let handle = spawn_gateway(FixtureBook::load(file.path()).unwrap());
    let mut gateway = client(&handle, WireCodec::Json);

    let response = gateway
        .retrieve_observations_2d(&close_price_query("BHP"))
        .unwrap();
    assert_eq!(response.status, RetrieveResponseStatus::AccessDenied);
    assert!(gateway.test_link("Test message").contains("failed"));

    gateway.login("analyst", "secret");
    let response = gateway
        .retrieve_observations_2d(&close_price_query("BHP"))
        .unwrap();
    assert_eq!(response.status, RetrieveResponseStatus::NotAvailable);
}
