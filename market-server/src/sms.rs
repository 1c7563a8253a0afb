//! Inbound SMS commands
//!
//! Farmers without a smartphone register and look up prices by text:
//!
//! - `REGISTER FARMER <Name>, <Location>`
//! - `PRICE <Crop>`
//!
//! Replies are returned as TwiML.

use shared::error::AppError;
use shared::models::{NewUser, UserRole};

use crate::db::{MarketStore, StoreError};
use crate::util::{generate_code, hash_password};

const REGISTER_USAGE: &str = "Sorry, there was an error processing your registration. \
     Please use the format: REGISTER FARMER Your Name, Your Location";
const SUPPORT: &str = "An error occurred. Please contact support.";
const HELP: &str = "Sorry, I did not understand that command. Available commands:\n\
     - REGISTER FARMER Your Name, Your Location\n\
     - PRICE [CropName] (e.g., PRICE MAIZE)";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmsCommand {
    RegisterFarmer { name: String, location: String },
    /// `REGISTER FARMER` with a body that is not `<Name>, <Location>`
    MalformedRegistration,
    Price { crop: String },
    Unknown,
}

/// Parse a message body. Matching is case-insensitive.
pub fn parse_command(body: &str) -> SmsCommand {
    let upper = body.trim().to_uppercase();
    let parts: Vec<&str> = upper.split_whitespace().collect();

    match parts.as_slice() {
        ["REGISTER", "FARMER", rest @ ..] if rest.len() >= 2 => {
            let info = rest.join(" ");
            let fields: Vec<&str> = info.split(',').map(str::trim).collect();
            match fields.as_slice() {
                [name, location] if !name.is_empty() && !location.is_empty() => {
                    SmsCommand::RegisterFarmer {
                        name: title_case(name),
                        location: title_case(location),
                    }
                }
                _ => SmsCommand::MalformedRegistration,
            }
        }
        ["PRICE", crop] => SmsCommand::Price {
            crop: capitalize(crop),
        },
        _ => SmsCommand::Unknown,
    }
}

/// `JOHN DOE` -> `John Doe`
fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(capitalize)
        .collect::<Vec<_>>()
        .join(" ")
}

/// `MAIZE` -> `Maize`
fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}

/// Handle one inbound message and produce the reply text.
///
/// Internal failures are logged and answered with the support message.
pub async fn handle_inbound(store: &dyn MarketStore, from: &str, body: &str) -> String {
    match run_command(store, from, body).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(from = %from, error = %e, "Inbound SMS failed");
            SUPPORT.to_string()
        }
    }
}

async fn run_command(store: &dyn MarketStore, from: &str, body: &str) -> Result<String, AppError> {
    match parse_command(body) {
        SmsCommand::RegisterFarmer { name, location } => {
            register_farmer(store, from, name, location).await
        }
        SmsCommand::MalformedRegistration => Ok(REGISTER_USAGE.to_string()),
        SmsCommand::Price { crop } => price_reply(store, &crop).await,
        SmsCommand::Unknown => Ok(HELP.to_string()),
    }
}

async fn register_farmer(
    store: &dyn MarketStore,
    from: &str,
    name: String,
    location: String,
) -> Result<String, AppError> {
    if let Some(existing) = store.find_user_by_phone(from).await.map_err(store_error)? {
        return Ok(format!(
            "Hello {}! You are already registered with FMLP.",
            existing.username
        ));
    }

    let email = format!("{}@fmlp_offline.com", from.trim_start_matches('+'));
    if store.email_taken(&email).await.map_err(store_error)? {
        tracing::warn!(from = %from, "Placeholder email already taken");
        return Ok(SUPPORT.to_string());
    }

    let pin = generate_code();
    let password_hash = hash_password(&pin).map_err(|e| {
        tracing::error!(error = %e, "Failed to hash PIN");
        AppError::internal("Failed to hash PIN")
    })?;

    let new_user = NewUser {
        username: name.clone(),
        email,
        phone_number: Some(from.to_string()),
        password_hash,
        role: UserRole::Farmer,
        is_approved: false,
        location: Some(location),
    };

    match store.insert_user(&new_user).await {
        Ok(user) => {
            tracing::info!(user_id = user.id, from = %from, "Farmer registered by SMS");
            Ok(format!(
                "Welcome, {name}! Your FMLP account has been created and is pending approval. \
                 Your PIN is {pin}. We will notify you once it's active."
            ))
        }
        Err(StoreError::Conflict(constraint)) => {
            tracing::warn!(from = %from, constraint = %constraint, "SMS registration conflict");
            Ok(SUPPORT.to_string())
        }
        Err(e) => Err(store_error(e)),
    }
}

async fn price_reply(store: &dyn MarketStore, crop: &str) -> Result<String, AppError> {
    Ok(match store.find_market_price(crop).await.map_err(store_error)? {
        Some(price) => format!(
            "Current market price for {}: {} KES/{}",
            price.crop_name, price.average_price, price.unit
        ),
        None => format!("Sorry, we do not have a market price for '{crop}'."),
    })
}

fn store_error(e: StoreError) -> AppError {
    crate::error::ServiceError::from(e).into()
}

/// Wrap a reply in a TwiML `<Message>`
pub fn twiml(message: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>{}</Message></Response>",
        escape_xml(message)
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory::MemoryStore;
    use rust_decimal::Decimal;

    #[test]
    fn test_parse_register() {
        assert_eq!(
            parse_command("register farmer john doe, nakuru town"),
            SmsCommand::RegisterFarmer {
                name: "John Doe".into(),
                location: "Nakuru Town".into()
            }
        );
        assert_eq!(
            parse_command("  REGISTER FARMER Mary ,Eldoret "),
            SmsCommand::RegisterFarmer {
                name: "Mary".into(),
                location: "Eldoret".into()
            }
        );
    }

    #[test]
    fn test_parse_malformed_register() {
        assert_eq!(
            parse_command("REGISTER FARMER John Doe Nakuru"),
            SmsCommand::MalformedRegistration
        );
        assert_eq!(
            parse_command("REGISTER FARMER a, b, c"),
            SmsCommand::MalformedRegistration
        );
        assert_eq!(
            parse_command("REGISTER FARMER John ,"),
            SmsCommand::MalformedRegistration
        );
        // Too short to be a registration attempt at all
        assert_eq!(parse_command("REGISTER FARMER John"), SmsCommand::Unknown);
    }

    #[test]
    fn test_parse_price_and_unknown() {
        assert_eq!(
            parse_command("price MAIZE"),
            SmsCommand::Price {
                crop: "Maize".into()
            }
        );
        assert_eq!(parse_command("PRICE sweet potato"), SmsCommand::Unknown);
        assert_eq!(parse_command(""), SmsCommand::Unknown);
        assert_eq!(parse_command("hello"), SmsCommand::Unknown);
    }

    #[test]
    fn test_twiml_escapes() {
        assert_eq!(
            twiml("Tom & Jerry <3 'x'"),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?><Response><Message>\
             Tom &amp; Jerry &lt;3 &apos;x&apos;</Message></Response>"
        );
    }

    #[tokio::test]
    async fn test_register_creates_unapproved_farmer() {
        let store = MemoryStore::new();

        let reply = handle_inbound(&store, "+254711000111", "REGISTER FARMER jane wambui, kisii")
            .await;
        assert!(reply.starts_with("Welcome, Jane Wambui!"));
        assert!(reply.contains("pending approval"));

        let state = store.snapshot().await;
        let user = state.users.values().next().unwrap();
        assert_eq!(user.username, "Jane Wambui");
        assert_eq!(user.email, "254711000111@fmlp_offline.com");
        assert_eq!(user.phone_number.as_deref(), Some("+254711000111"));
        assert_eq!(user.location.as_deref(), Some("Kisii"));
        assert_eq!(user.role, UserRole::Farmer);
        assert!(!user.is_approved);
    }

    #[tokio::test]
    async fn test_register_known_phone_greets() {
        let store = MemoryStore::new();
        store
            .seed_user("juma", UserRole::Farmer, Some("+254700000001"))
            .await;

        let reply = handle_inbound(&store, "+254700000001", "REGISTER FARMER Juma, Meru")
            .await;
        assert_eq!(reply, "Hello juma! You are already registered with FMLP.");
        assert_eq!(store.snapshot().await.users.len(), 1);
    }

    #[tokio::test]
    async fn test_register_username_clash_asks_for_support() {
        let store = MemoryStore::new();
        store
            .seed_user("Jane", UserRole::Farmer, Some("+254700000001"))
            .await;

        let reply = handle_inbound(&store, "+254700000002", "REGISTER FARMER Jane, Kisii")
            .await;
        assert_eq!(reply, SUPPORT);
        assert_eq!(store.snapshot().await.users.len(), 1);
    }

    #[tokio::test]
    async fn test_price_lookup() {
        let store = MemoryStore::new();
        store
            .seed_market_price("Maize", "90kg bag", Decimal::new(350000, 2))
            .await;

        let reply = handle_inbound(&store, "+254700000001", "price maize")
            .await;
        assert_eq!(reply, "Current market price for Maize: 3500.00 KES/90kg bag");

        let reply = handle_inbound(&store, "+254700000001", "PRICE Sorghum")
            .await;
        assert_eq!(reply, "Sorry, we do not have a market price for 'Sorghum'.");
    }

    #[tokio::test]
    async fn test_unknown_command_gets_help() {
        let store = MemoryStore::new();
        let reply = handle_inbound(&store, "+254700000001", "BUY MAIZE")
            .await;
        assert_eq!(reply, HELP);
    }
}
