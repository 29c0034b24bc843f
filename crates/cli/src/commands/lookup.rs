use chrono::Utc;
use t3ext_core::domain::extension::ExtensionKey;
use t3ext_core::errors::ApplicationError;
use t3ext_server::bootstrap::build_source;
use t3ext_slack::messages;

use super::{exit, load_config, runtime, CommandResult};

/// Runs the lookup pipeline without the token check and prints the message
/// Slack would receive under `data`.
pub fn run(raw_key: &str) -> CommandResult {
    let config = match load_config("lookup") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("lookup") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let result = runtime.block_on(async {
        let source = build_source(&config)
            .await
            .map_err(|error| ("source_init", error.to_string(), exit::STORE_CONNECT))?;

        let resolved = async {
            let key = ExtensionKey::normalize(raw_key)?;
            let record = source.lookup(&key).await?.into_record(&key)?;
            Ok::<_, ApplicationError>(messages::extension_details(
                &record,
                &key,
                &config.links.details_base_url,
                Utc::now(),
            ))
        }
        .await;
        Ok::<_, (&'static str, String, u8)>(resolved)
    });

    match result {
        Ok(Ok(message)) => CommandResult::success_with_data(
            "lookup",
            format!("found extension `{}`", raw_key.to_lowercase()),
            serde_json::to_value(&message).ok(),
        ),
        Ok(Err(error)) => {
            let message = messages::error_message(&error.user_message());
            CommandResult::failure_with_data(
                "lookup",
                error.kind(),
                error.to_string(),
                exit::LOOKUP,
                serde_json::to_value(&message).ok(),
            )
        }
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("lookup", error_class, message, exit_code)
        }
    }
}
