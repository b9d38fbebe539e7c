use bulkid::{BulkIdError, DryRunConnection};

use crate::{
    cli_interface::PlanArgs,
    commands::load_plan,
    console::{print_error_message, print_statement, print_success_message},
};

pub async fn handle_explain_command(args: &PlanArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_plan(args)?;

    let mut conn = DryRunConnection::new();
    loaded.strategy.execute(&loaded.plan, &mut conn, &loaded.session).await.map_err(
        |e: BulkIdError| {
            print_error_message(&format!("Could not plan the bulk {}: trace: {}", loaded.plan.operation, e));
            e
        },
    )?;

    let cleanup = loaded
        .strategy
        .cleanup()
        .map_or_else(|| "none".to_string(), |policy| format!("{:?}", policy));
    print_success_message(&format!(
        "Bulk {} on {} using the {} strategy (backend {}, cleanup {})",
        loaded.plan.operation,
        loaded.plan.id_source.root_table,
        loaded.strategy.kind(),
        loaded.strategy.backend().name(),
        cleanup
    ));

    for (index, statement) in conn.statements().iter().enumerate() {
        print_statement(index, statement);
    }

    if loaded.config.strategy.is_some() {
        println!("\nstrategy forced by config");
    }

    Ok(())
}
