//! Interactive read-eval loop.

use std::io::{self, Write};

use runtime::ToolSpec;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;

use crate::config::Config;
use crate::error::Result;

/// One line of user input.
#[derive(Debug, PartialEq, Eq)]
pub enum Command<'a> {
    Empty,
    Quit,
    Clear,
    Tools,
    /// Narrow the visible tools to these servers.
    Server(Vec<&'a str>),
    /// `server` with no names: make every server visible again.
    AllServers,
    Message(&'a str),
}

impl<'a> Command<'a> {
    pub fn parse(line: &'a str) -> Self {
        let input = line.trim();
        let mut words = input.split_whitespace();
        let Some(first) = words.next() else {
            return Command::Empty;
        };

        match first.to_lowercase().as_str() {
            "quit" | "exit" if input.len() == first.len() => Command::Quit,
            "clear" if input.len() == first.len() => Command::Clear,
            "tools" if input.len() == first.len() => Command::Tools,
            "server" => {
                let names: Vec<&str> = words.collect();
                if names.is_empty() {
                    Command::AllServers
                } else {
                    Command::Server(names)
                }
            }
            _ => Command::Message(input),
        }
    }
}

pub fn print_tools(tools: &[ToolSpec]) {
    if tools.is_empty() {
        println!("No tools available.");
        return;
    }
    for tool in tools {
        println!("  {:<32}  {}", tool.name, tool.description);
    }
}

pub async fn run(config: &Config) -> Result<()> {
    println!("mooring v{}", env!("CARGO_PKG_VERSION"));

    let mut client = crate::connect(config).await?;
    println!("Model: {}", client.backend().model());
    println!("Servers: {}", client.servers().join(", "));
    println!("Commands: quit, clear, tools, server <name>...");

    let mut stdout = io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nChat: ");
        stdout.flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match Command::parse(&line) {
            Command::Empty => continue,
            Command::Quit => break,
            Command::Clear => {
                client.clear();
                println!("Conversation cleared.");
            }
            Command::Tools => print_tools(&client.tools()),
            Command::Server(names) => {
                let unknown = client.select_scope(names);
                if !unknown.is_empty() {
                    println!("No server named: {}", unknown.join(", "));
                }
                println!("{} tool(s) visible.", client.tools().len());
            }
            Command::AllServers => {
                client.reset_scope();
                println!("All servers visible.");
            }
            Command::Message(text) => {
                let result = client
                    .chat(text, |chunk| {
                        print!("{chunk}");
                        let _ = io::stdout().flush();
                    })
                    .await;
                println!();
                if let Err(e) = result {
                    error!("{e}");
                }
            }
        }
    }

    client.close().await;
    println!("\nSession ended.");
    Ok(())
}
