use bulk_mailer::delivery_client::DeliveryTransport;
use bulk_mailer::routes::{FailureBody, SendSummary};
use wiremock::matchers::{any, body_json, header_exists, method, path};
use wiremock::{Mock, ResponseTemplate};

use crate::helpers::{emails, spawn_app, spawn_app_with_transport};

fn delivery_reply(success: bool, message: Option<&str>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(serde_json::json!({
        "success": success,
        "message": message,
    }))
}

#[tokio::test]
async fn send_posts_the_message_and_recipients_to_the_delivery_service() {
    // Arrange
    let app = spawn_app().await;
    app.post_message("Hello").await;
    app.post_recipients(emails(&["x@a.com", "y@b.com"])).await;

    Mock::given(path("/sendemail"))
        .and(method("POST"))
        .and(header_exists("Idempotency-Key"))
        .and(body_json(serde_json::json!({
            "message": "Hello",
            "recipients": ["x@a.com", "y@b.com"],
        })))
        .respond_with(delivery_reply(true, None))
        .expect(1)
        .mount(&app.delivery_server)
        .await;

    // Act
    let response = app.post_send().await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
}

#[tokio::test]
async fn a_successful_send_resets_the_session() {
    // Arrange
    let app = spawn_app().await;
    app.post_message("Hello").await;
    app.post_recipients(emails(&["x@a.com", "y@b.com"])).await;

    Mock::given(any())
        .respond_with(delivery_reply(true, None))
        .expect(1)
        .mount(&app.delivery_server)
        .await;

    // Act
    let response = app.post_send().await;

    // Assert
    let summary: SendSummary = response.json().await.unwrap();
    assert!(summary.success);
    let session = app.get_session().await;
    assert_eq!(session["state"], "idle");
    assert_eq!(session["message"], "");
    assert_eq!(session["total_recipients"], 0);
    assert_eq!(session["last_outcome"]["status"], "succeeded");
}

#[tokio::test]
async fn a_rejected_send_keeps_the_session_and_surfaces_the_reason() {
    // Arrange
    let app = spawn_app().await;
    app.post_message("Hello").await;
    app.post_recipients(emails(&["x@a.com", "y@b.com"])).await;

    Mock::given(any())
        .respond_with(delivery_reply(false, Some("quota exceeded")))
        .expect(1)
        .mount(&app.delivery_server)
        .await;

    // Act
    let response = app.post_send().await;

    // Assert
    assert_eq!(response.status().as_u16(), 502);
    let failure: FailureBody = response.json().await.unwrap();
    assert_eq!(failure.message, "quota exceeded");
    let session = app.get_session().await;
    assert_eq!(session["state"], "idle");
    assert_eq!(session["message"], "Hello");
    assert_eq!(session["total_recipients"], 2);
    assert_eq!(session["last_outcome"]["reason"], "quota exceeded");
}

#[tokio::test]
async fn an_unreachable_delivery_service_keeps_the_session() {
    // Arrange
    let app = spawn_app().await;
    app.post_message("Hello").await;
    app.post_recipients(emails(&["x@a.com"])).await;

    Mock::given(any())
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&app.delivery_server)
        .await;

    // Act
    let response = app.post_send().await;

    // Assert
    assert_eq!(response.status().as_u16(), 502);
    let session = app.get_session().await;
    assert_eq!(session["message"], "Hello");
    assert_eq!(session["total_recipients"], 1);
}

#[tokio::test]
async fn send_returns_400_and_calls_nothing_when_inputs_are_missing() {
    // Arrange
    let app = spawn_app().await;

    Mock::given(any())
        .respond_with(delivery_reply(true, None))
        .expect(0)
        .mount(&app.delivery_server)
        .await;

    // No message, no recipients
    let response = app.post_send().await;
    assert_eq!(response.status().as_u16(), 400, "nothing was provided");

    // Recipients but a blank message
    app.post_recipients(emails(&["x@a.com"])).await;
    app.post_message("   ").await;
    let response = app.post_send().await;
    assert_eq!(response.status().as_u16(), 400, "the message was blank");

    // A message but a workbook without addresses
    app.post_message("Hello").await;
    app.post_recipients(emails(&["no address here"])).await;
    let response = app.post_send().await;
    assert_eq!(response.status().as_u16(), 400, "the recipient list was empty");
}

#[tokio::test]
async fn a_second_send_while_one_is_in_flight_returns_409() {
    // Arrange
    let app = spawn_app().await;
    app.post_message("Hello").await;
    app.post_recipients(emails(&["x@a.com"])).await;

    Mock::given(any())
        .respond_with(delivery_reply(true, None).set_delay(std::time::Duration::from_millis(500)))
        .expect(1)
        .mount(&app.delivery_server)
        .await;

    // Act
    let first = tokio::spawn({
        let client = app.api_client.clone();
        let url = format!("{}/send", &app.address);
        async move { client.post(&url).send().await.unwrap() }
    });
    loop {
        if app.get_session().await["state"] == "submitting" {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    let second = app.post_send().await;

    // Assert
    assert_eq!(second.status().as_u16(), 409);
    assert_eq!(first.await.unwrap().status().as_u16(), 200);
}

#[tokio::test]
async fn a_client_that_disconnects_mid_send_leaves_the_session_retryable() {
    // Arrange
    let app = spawn_app().await;
    app.post_message("Hello").await;
    app.post_recipients(emails(&["x@a.com"])).await;

    Mock::given(any())
        .respond_with(delivery_reply(true, None).set_delay(std::time::Duration::from_millis(800)))
        .mount(&app.delivery_server)
        .await;
    let impatient = reqwest::Client::builder()
        .timeout(std::time::Duration::from_millis(100))
        .build()
        .unwrap();

    // Act
    let abandoned = impatient.post(format!("{}/send", &app.address)).send().await;
    assert!(abandoned.unwrap_err().is_timeout());

    // Assert
    let deadline = tokio::time::Instant::now() + std::time::Duration::from_millis(600);
    let session = loop {
        let session = app.get_session().await;
        if session["state"] == "idle" {
            break session;
        }
        assert!(tokio::time::Instant::now() < deadline, "session stuck in {}", session["state"]);
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    };
    assert_eq!(session["message"], "Hello");
    assert_eq!(session["total_recipients"], 1);

    let retry = app.post_send().await;
    assert_eq!(retry.status().as_u16(), 200);
}

#[tokio::test]
async fn multipart_transport_forwards_the_uploaded_workbook() {
    // Arrange
    let app = spawn_app_with_transport(DeliveryTransport::Multipart).await;
    app.post_message("Hello").await;
    app.post_recipients(emails(&["x@a.com"])).await;

    Mock::given(path("/sendemail"))
        .and(method("POST"))
        .respond_with(delivery_reply(true, None))
        .expect(1)
        .mount(&app.delivery_server)
        .await;

    // Act
    let response = app.post_send().await;

    // Assert
    assert_eq!(response.status().as_u16(), 200);
    let request = &app.delivery_server.received_requests().await.unwrap()[0];
    let body = String::from_utf8_lossy(&request.body);
    assert!(body.contains("name=\"msg\""));
    assert!(body.contains("filename=\"emails.xlsx\""));
}
