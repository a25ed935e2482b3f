use std::sync::LazyLock;

use bulk_mailer::{
    configuration::get_configuration,
    delivery_client::DeliveryTransport,
    extraction::CellValue,
    startup::Application,
    telemetry::{get_subscriber, init_subscriber},
};
use reqwest::multipart::{Form, Part};
use wiremock::MockServer;

// Ensure that the `tracing` stack is only initialised once using `LazyLock`
static TRACING: LazyLock<()> = LazyLock::new(|| {
    let default_filter_level = "info".to_string();
    let subscriber_name = "test".to_string();
    if std::env::var("TEST_LOG").is_ok() {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::stdout);
        init_subscriber(subscriber).expect("Failed to initialise telemetry.");
    } else {
        let subscriber = get_subscriber(subscriber_name, default_filter_level, std::io::sink);
        init_subscriber(subscriber).expect("Failed to initialise telemetry.");
    };
});

pub struct TestApp {
    pub address: String,
    pub port: u16,
    pub delivery_server: MockServer,
    pub api_client: reqwest::Client,
}

impl TestApp {
    pub async fn post_message(&self, message: &str) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/message", &self.address))
            .form(&[("message", message)])
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_recipients(&self, workbook: Vec<u8>) -> reqwest::Response {
        let form = Form::new().part("file", Part::bytes(workbook).file_name("emails.xlsx"));
        self.post_recipients_form(form).await
    }

    pub async fn post_recipients_form(&self, form: Form) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/recipients", &self.address))
            .multipart(form)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_send(&self) -> reqwest::Response {
        self.api_client
            .post(&format!("{}/send", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn get_session(&self) -> serde_json::Value {
        self.api_client
            .get(&format!("{}/session", &self.address))
            .send()
            .await
            .expect("Failed to execute request.")
            .json()
            .await
            .expect("Session snapshot was not JSON.")
    }
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with_transport(DeliveryTransport::Json).await
}

pub async fn spawn_app_with_transport(transport: DeliveryTransport) -> TestApp {
    LazyLock::force(&TRACING);

    // Launch a mock server to stand in for the delivery service
    let delivery_server = MockServer::start().await;

    let configuration = {
        let mut c = get_configuration().expect("Failed to read configuration.");
        // Use a random OS port
        c.application.port = 0;
        c.delivery_service.base_url = delivery_server.uri();
        c.delivery_service.transport = transport;
        c
    };

    let application = Application::build(configuration)
        .await
        .expect("Failed to build application.");
    let application_port = application.port();
    let _ = tokio::spawn(application.run_until_stopped());

    TestApp {
        address: format!("http://127.0.0.1:{}", application_port),
        port: application_port,
        delivery_server,
        api_client: reqwest::Client::new(),
    }
}

/// Builds an xlsx workbook whose first sheet holds `cells` in column A.
pub fn workbook(cells: &[CellValue]) -> Vec<u8> {
    let mut writer = rust_xlsxwriter::Workbook::new();
    let sheet = writer.add_worksheet();
    for (row, cell) in (0u32..).zip(cells) {
        match cell {
            CellValue::Text(text) => sheet.write_string(row, 0, text).map(|_| ()),
            CellValue::Number(n) => sheet.write_number(row, 0, *n).map(|_| ()),
            CellValue::Boolean(b) => sheet.write_boolean(row, 0, *b).map(|_| ()),
            CellValue::Empty => Ok(()),
        }
        .expect("Failed to write a cell.");
    }
    writer.save_to_buffer().expect("Failed to build the workbook.")
}

pub fn emails(addresses: &[&str]) -> Vec<u8> {
    let cells: Vec<CellValue> = addresses
        .iter()
        .map(|a| CellValue::Text(a.to_string()))
        .collect();
    workbook(&cells)
}
