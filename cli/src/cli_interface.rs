use clap::{Args, Parser, Subcommand};

#[allow(clippy::upper_case_acronyms)]
#[derive(Parser, Debug)]
#[clap(name = "bulkid", about, version)]
pub struct CLI {
    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    /// The bulkid.yaml describing the backend, default is bulkid.yaml where the command is run.
    #[clap(long, short)]
    pub config: Option<String>,

    /// The plan file describing the bulk update or delete.
    #[clap(long)]
    pub plan: String,

    /// optional - Session token stamped on persistent staging rows, a random one is used if not set.
    #[clap(long, short)]
    pub session: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Prints every statement a bulk plan would run, without touching a database.
    ///
    /// Example:
    /// `bulkid explain --plan void_invoices.yaml`
    #[clap(name = "explain")]
    Explain {
        #[clap(flatten)]
        args: PlanArgs,
    },

    /// Runs a bulk plan against the Postgres database in DATABASE_URL, inside
    /// one transaction.
    ///
    /// Example:
    /// `bulkid run --plan void_invoices.yaml`
    #[clap(name = "run")]
    Run {
        #[clap(flatten)]
        args: PlanArgs,
    },
}
