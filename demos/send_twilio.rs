//! Send one SMS straight through the Twilio backend, bypassing the HTTP endpoint.
use sms_core::{SendRequest, SenderRoute, SmsClient};
use sms_twilio::TwilioClient;

use std::env;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let account_sid = arg_or_env("--account-sid", "TWILIO_ACCOUNT_SID");
    let auth_token = arg_or_env("--auth-token", "TWILIO_AUTH_TOKEN");
    let to = arg_or_env("--to", "TO_NUMBER");
    let text = arg_or_env("--text", "SMS_TEXT");
    let service = optional_arg_or_env("--messaging-service-sid", "TWILIO_MESSAGING_SERVICE_SID");
    let from = optional_arg_or_env("--from", "TWILIO_FROM");

    let route = match (&service, &from) {
        (Some(sid), _) => SenderRoute::MessagingService(sid),
        (None, Some(from)) => SenderRoute::From(from),
        (None, None) => return Err("set --messaging-service-sid or --from".into()),
    };

    let client = TwilioClient::new(account_sid, auth_token);
    let outcome = client
        .send(SendRequest {
            to: &to,
            body: &text,
            route,
        })
        .await?;
    println!("Sent with sid {} (status: {})", outcome.sid, outcome.status);
    Ok(())
}

fn optional_arg_or_env(flag: &str, env_key: &str) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    if let Some(idx) = args.iter().position(|a| a == flag) {
        if idx + 1 < args.len() {
            return Some(args[idx + 1].clone());
        }
    }
    env::var(env_key).ok().filter(|v| !v.is_empty())
}

fn arg_or_env(flag: &str, env_key: &str) -> String {
    optional_arg_or_env(flag, env_key)
        .unwrap_or_else(|| panic!("missing {} (arg {} or env {})", flag, flag, env_key))
}
