//! Exercise a running clockweb server over HTTP
use crate::cli::PositionArgs;
use anyhow::{Context, Result, anyhow};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tracing::debug;

/// A single request of the test sequence along with the status that a
/// correctly behaving server answers with
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Step {
    pub(crate) description: String,
    pub(crate) path: &'static str,
    pub(crate) qr_code: String,
    pub(crate) expected: StatusCode,
}

impl Step {
    fn new(description: &str, path: &'static str, qr_code: &str, expected: StatusCode) -> Self {
        Self {
            description: description.to_string(),
            path,
            qr_code: qr_code.to_string(),
            expected,
        }
    }
}

/// The clock-in/clock-out sequence, including the duplicate submissions that
/// the server must reject
pub(crate) fn steps(first: &str, second: &str) -> Vec<Step> {
    vec![
        Step::new(
            &format!("Clock in {first}"),
            "/clock-in",
            first,
            StatusCode::OK,
        ),
        Step::new(
            &format!("Clock in {first} again"),
            "/clock-in",
            first,
            StatusCode::CONFLICT,
        ),
        Step::new(
            &format!("Clock in {second}"),
            "/clock-in",
            second,
            StatusCode::OK,
        ),
        Step::new(
            &format!("Clock out {first}"),
            "/clock-out",
            first,
            StatusCode::OK,
        ),
        Step::new(
            &format!("Clock out {first} again"),
            "/clock-out",
            first,
            StatusCode::CONFLICT,
        ),
        Step::new(
            &format!("Clock out {second}"),
            "/clock-out",
            second,
            StatusCode::OK,
        ),
        Step::new(
            "Clock in an unknown badge",
            "/clock-in",
            "UNKNOWN-BADGE",
            StatusCode::NOT_FOUND,
        ),
    ]
}

fn endpoint(server: &str, path: &str) -> String {
    format!("{}{}", server.trim_end_matches('/'), path)
}

async fn post(client: &Client, url: &str, body: &Value) -> Result<(StatusCode, String)> {
    debug!(url, %body, "Sending request");
    let response = client
        .post(url)
        .json(body)
        .send()
        .await
        .with_context(|| format!("Request to {url} failed. Is the server running?"))?;
    let status = response.status();
    let text = response.text().await?;
    Ok((status, text))
}

pub(crate) async fn run_harness(
    server: &str,
    first: &str,
    second: &str,
    position: PositionArgs,
    pause: bool,
) -> Result<()> {
    let client = Client::new();
    let sequence = steps(first, second);
    let total = sequence.len();
    let mut failures = 0;
    let mut completed = 0;
    for (i, step) in sequence.iter().enumerate() {
        let url = endpoint(server, step.path);
        let body = json!({
            "qr_code": step.qr_code,
            "latitude": position.latitude,
            "longitude": position.longitude,
        });
        println!("[{}/{total}] {}: POST {url}", i + 1, step.description);
        let (status, text) = post(&client, &url, &body).await?;
        println!("    {status}");
        println!("    {text}");
        completed += 1;
        if status == step.expected {
            println!("    ok");
        } else {
            println!("    FAILED: expected {}", step.expected);
            failures += 1;
        }
        if pause
            && i + 1 < total
            && !inquire::Confirm::new("Continue?")
                .with_default(true)
                .prompt()?
        {
            break;
        }
    }
    match failures {
        0 => {
            println!("PASS: {completed} of {total} steps returned the expected status");
            Ok(())
        }
        n => Err(anyhow!(
            "FAIL: {n} of {completed} steps did not return the expected status"
        )),
    }
}

pub(crate) async fn simulate_shift(
    server: &str,
    qr_code: &str,
    store_token: Option<String>,
    position: PositionArgs,
    pings: u32,
    interval: u64,
) -> Result<()> {
    let client = Client::new();
    let mut body = json!({
        "qr_code": qr_code,
        "latitude": position.latitude,
        "longitude": position.longitude,
    });
    if let Some(token) = store_token {
        body["store_token"] = json!(token);
    }

    println!("Clocking in...");
    let (status, text) = post(&client, &endpoint(server, "/api/clock-in"), &body).await?;
    if status != StatusCode::OK {
        return Err(anyhow!("Clock-in failed ({status}): {text}"));
    }
    let receipt: Value = serde_json::from_str(&text)?;
    let shift_id = receipt["shift_id"]
        .as_i64()
        .ok_or_else(|| anyhow!("The clock-in response has no shift id: {text}"))?;
    println!("Clocked in");
    println!("Shift ID: {shift_id}");
    println!("Employee: {}", receipt["employee_name"]);
    println!("Store: {}", receipt["store_name"]);

    println!("\nSending GPS pings...");
    let ping = json!({
        "shift_id": shift_id,
        "latitude": position.latitude,
        "longitude": position.longitude,
    });
    for i in 0..pings {
        let (status, text) = post(&client, &endpoint(server, "/api/location-ping"), &ping).await?;
        if status != StatusCode::OK {
            return Err(anyhow!("Location ping failed ({status}): {text}"));
        }
        if i + 1 < pings {
            tokio::time::sleep(Duration::from_secs(interval)).await;
        }
    }
    println!("{pings} GPS pings sent");

    println!("\nClocking out...");
    let (status, text) = post(&client, &endpoint(server, "/api/clock-out"), &body).await?;
    match status {
        StatusCode::OK => {
            println!("Clock-out successful: {text}");
            Ok(())
        }
        _ => Err(anyhow!("Clock-out failed ({status}): {text}")),
    }
}
