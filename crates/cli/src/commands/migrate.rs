use t3ext_db::{connect, migrations};

use super::{exit, load_config, runtime, CommandResult};

pub fn run() -> CommandResult {
    let config = match load_config("migrate") {
        Ok(config) => config,
        Err(failure) => return failure,
    };
    let runtime = match runtime("migrate") {
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
        pool.close().await;
        Ok::<(), (&'static str, String, u8)>(())
    });

    match result {
        Ok(()) => CommandResult::success("migrate", format!("table `{}` is ready", store.table)),
        Err((error_class, message, exit_code)) => {
            CommandResult::failure("migrate", error_class, message, exit_code)
        }
    }
}
