//! User management commands.

use castgate::user::generate_stream_key;

use crate::backend::open_store;
use crate::cli::{UserAddArgs, UserListArgs, UserPasswdArgs, UserRotateKeyArgs, UserTargetArgs};
use crate::output::{OutputFormat, print_json, print_table};

/// Run the `user add` command
pub async fn add(
    args: &UserAddArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.backend_config).await?;

    let password = args.password.clone().unwrap_or_else(generate_stream_key);
    let stream_key = args.stream_key.clone().unwrap_or_else(generate_stream_key);
    let record = store.create(&args.username, &password, &stream_key).await?;

    // Generated secrets are shown here once and never again
    let shown_password = args.password.is_none().then_some(password.as_str());
    match format {
        OutputFormat::Human => {
            println!("Created user {} ({})", record.username(), record.id());
            if let Some(password) = shown_password {
                println!("Password:   {password}");
            }
            println!("Stream key: {stream_key}");
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "id": record.id().to_string(),
                "username": record.username(),
                "password": shown_password,
                "stream_key": stream_key,
            });
            print_json(&json)?;
        }
    }
    Ok(())
}

/// Run the `user remove` command
pub async fn remove(
    args: &UserTargetArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.backend_config).await?;
    store.remove(&args.username).await?;

    match format {
        OutputFormat::Human => println!("Removed user {}", args.username),
        OutputFormat::Json => {
            let json = serde_json::json!({ "removed": args.username });
            print_json(&json)?;
        }
    }
    Ok(())
}

/// Run the `user list` command
pub async fn list(
    args: &UserListArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.backend_config).await?;
    let users = store.list().await?;

    match format {
        OutputFormat::Human => {
            if users.is_empty() {
                println!("No users found.");
                return Ok(());
            }
            let rows: Vec<Vec<String>> = users
                .iter()
                .map(|u| vec![u.username().to_string(), u.id().to_string()])
                .collect();
            print_table(&["USERNAME", "ID"], &rows);
        }
        OutputFormat::Json => {
            let json: Vec<serde_json::Value> = users
                .iter()
                .map(|u| {
                    serde_json::json!({
                        "id": u.id().to_string(),
                        "username": u.username(),
                    })
                })
                .collect();
            print_json(&serde_json::Value::Array(json))?;
        }
    }
    Ok(())
}

/// Run the `user passwd` command
pub async fn passwd(
    args: &UserPasswdArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.backend_config).await?;

    match &args.current {
        Some(current) => {
            store
                .change_password(&args.username, current, &args.new_password)
                .await?
        }
        None => store.set_password(&args.username, &args.new_password).await?,
    }

    match format {
        OutputFormat::Human => println!("Password changed for {}", args.username),
        OutputFormat::Json => {
            let json = serde_json::json!({ "password_changed": args.username });
            print_json(&json)?;
        }
    }
    Ok(())
}

/// Run the `user rotate-key` command
pub async fn rotate_key(
    args: &UserRotateKeyArgs,
    format: OutputFormat,
) -> Result<(), Box<dyn std::error::Error>> {
    let store = open_store(&args.backend_config).await?;

    let stream_key = args.stream_key.clone().unwrap_or_else(generate_stream_key);
    store.change_stream_key(&args.username, &stream_key).await?;

    match format {
        OutputFormat::Human => {
            println!("Stream key rotated for {}", args.username);
            if args.stream_key.is_none() {
                println!("Stream key: {stream_key}");
            }
        }
        OutputFormat::Json => {
            let json = serde_json::json!({
                "username": args.username,
                "stream_key": args.stream_key.is_none().then_some(stream_key.as_str()),
            });
            print_json(&json)?;
        }
    }
    Ok(())
}
