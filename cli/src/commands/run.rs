use bulkid::PostgresClient;

use crate::{
    cli_interface::PlanArgs,
    commands::load_plan,
    console::{print_error_message, print_success_message, print_warn_message},
};

pub async fn handle_run_command(args: &PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_plan(args)?;

    if !loaded.config.backend.runs_on_postgres() {
        let message = format!(
            "bulkid run executes against Postgres but the config targets the {} backend, use bulkid explain to print its statements instead",
            loaded.strategy.backend().name()
        );
        print_error_message(&message);
        return Err(message.into());
    }

    let postgres_client = PostgresClient::new().await.map_err(|e| {
        print_error_message(&format!("Could not connect to Postgres, make sure your connection string is mapping in the .env correctly: trace: {}", e));
        e
    })?;

    let outcome = postgres_client
        .run_bulk_operation(&loaded.strategy, &loaded.plan, &loaded.session)
        .await
        .map_err(|e| {
            print_error_message(&format!(
                "Bulk {} failed and was rolled back: trace: {}",
                loaded.plan.operation, e
            ));
            e
        })?;

    for (table, count) in &outcome.per_table {
        println!("{:>10} {}", count, table);
    }

    if let Some(warning) = &outcome.cleanup_warning {
        print_warn_message(&format!("Staging cleanup failed: {}", warning));
    }

    print_success_message(&format!(
        "\nBulk {} affected {} rows in {}",
        loaded.plan.operation,
        outcome.affected_rows,
        loaded.plan.count_table()
    ));

    Ok(())
}
