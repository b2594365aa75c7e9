use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "metamodel",
    about = "Metamodel: resolve, build and validate the runtime metamodel of declared domain types",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the metamodel and run every enabled validator
    Validate {
        /// Path to the type registry JSON document
        registry: String,

        /// Path to a TOML config (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,

        /// Restrict the model to these domain types (repeatable)
        #[arg(long = "type", value_name = "TYPE")]
        types: Vec<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// List the resolved members of one type
    Members {
        /// Path to the type registry JSON document
        registry: String,

        /// Type to resolve
        type_name: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the ranked facets of one object spec and its features
    Facets {
        /// Path to the type registry JSON document
        registry: String,

        /// Object type to show
        type_name: String,

        /// Path to a TOML config (defaults apply when omitted)
        #[arg(long)]
        config: Option<String>,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}
