use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
pub struct Args {
    /// Path to a YAML config file
    #[clap(short, long, global = true, env = "LINKPEEK_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the preview HTTP service.
    Daemon {
        /// Address to listen on (overrides config)
        #[clap(short, long)]
        listen: Option<String>,
    },

    /// Build a preview for a url and print it as json
    Preview {
        /// a plain url, e.g. https://example.com/article
        url: String,

        /// Don't fall back to a headless browser
        #[clap(long, default_value = "false")]
        no_headless: bool,
    },

    /// Print the encoded form of a url, as expected by /api/preview/<encoded>
    Encode {
        /// a plain url
        url: String,
    },
}
