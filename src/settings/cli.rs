use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "fireteam", about = "Peer relationship service")]
pub struct Cli {
    /// Path to a TOML settings file.
    #[arg(long)]
    pub settings: Option<String>,
}
