use std::fs;
use std::path::Path;

use t3ext_core::domain::extension::{ExtensionKey, ExtensionRecord};
use t3ext_db::{connect, migrations, SqlExtensionStore};

use super::{exit, load_config, runtime, CommandResult};

pub fn run(file: &Path) -> CommandResult {
    let config = match load_config("seed") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let records = match read_records(file) {
        Ok(records) => records,
        Err(message) => return CommandResult::failure("seed", "seed_input", message, exit::INPUT),
    };
    let runtime = match runtime("seed") {
        Ok(runtime) => runtime,
        Err(failure) => return failure,
    };

    let store = &config.store;
    let result = runtime.block_on(async {
        let pool = connect(store)
            .await
            .map_err(|error| ("store_connectivity", error.to_string(), exit::STORE_CONNECT))?;
        migrations::run_pending(&pool, &store.table)
            .await
            .map_err(|error| ("migration", error.to_string(), exit::STORE_WRITE))?;

        let repository = SqlExtensionStore::new(pool.clone(), &store.table);
        for record in &records {
            repository
                .upsert(record)
                .await
                .map_err(|error| ("seed_execution", format!("{}: {error}", record.key), exit::STORE_WRITE))?;
        }
        pool.close().await;
        Ok::<usize, (&'static str, String, u8)>(records.len())
    });

    match result {
        Ok(count) => CommandResult::success(
            "seed",
            format!("upserted {count} extension record(s) into `{}`", store.table),
        ),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("seed", error_class, message, exit_code)
        }
    }
}

/// Reads a JSON array of records. Keys are normalized the same way the slash
/// command normalizes its argument, so seeded rows are reachable.
pub fn read_records(file: &Path) -> Result<Vec<ExtensionRecord>, String> {
    let raw = fs::read_to_string(file)
        .map_err(|error| format!("could not read {}: {error}", file.display()))?;
    let records: Vec<ExtensionRecord> = serde_json::from_str(&raw)
        .map_err(|error| format!("could not parse {}: {error}", file.display()))?;

    records
        .into_iter()
        .map(|mut record| {
            let key = ExtensionKey::normalize(&record.key)
                .map_err(|error| format!("{}: {error}", file.display()))?;
            record.key = key.as_str().to_string();
            Ok(record)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::read_records;

    #[test]
    fn records_are_read_and_keys_normalized() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[{{"key": "PowerMail", "title": "Powermail", "version": "10.9.1",
                "author": {{"name": "in2code", "email": null}}, "last_updated": 1700000000,
                "description": "Mail forms", "repository_url": null}}]"#
        )
        .expect("write");

        let records = read_records(file.path()).expect("records");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].key, "powermail");
        assert_eq!(records[0].last_updated, Some(1_700_000_000));
        assert!(records[0].compatibility.is_empty());
    }

    #[test]
    fn invalid_keys_are_reported_with_the_file_name() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(
            file,
            r#"[{{"key": "no", "title": "", "version": "", "author": null,
                "last_updated": null, "description": "", "repository_url": null}}]"#
        )
        .expect("write");

        let error = read_records(file.path()).expect_err("short key");
        assert!(error.contains("invalid extension key"), "{error}");
    }

    #[test]
    fn non_array_documents_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        write!(file, r#"{{"key": "powermail"}}"#).expect("write");

        assert!(read_records(file.path()).is_err());
    }
}
