use std::io::Write;

use clap::Parser;
use tidy_chat_client::{
    ConversationHandle, ConversationState, HttpTransport, ReplyRenderer, Role, TurnPhase,
};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

/// Terminal front end for a running chat widget server
#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Args {
    /// Chat endpoint of the widget server
    #[clap(long, default_value = "http://127.0.0.1:3000/api/chat")]
    url: String,

    /// Greeting shown before the first question
    #[clap(
        long,
        default_value = "Hi! I can answer questions about our cleaning services. What can I help with?"
    )]
    greeting: String,
}

/// Prints what has not been shown yet of a reply that keeps growing.
#[derive(Default)]
struct ReplyPrinter {
    shown: String,
}

impl ReplyPrinter {
    fn show(&mut self, content: &str) -> std::io::Result<()> {
        let mut out = std::io::stdout();
        match content.strip_prefix(self.shown.as_str()) {
            Some(rest) => write!(out, "{rest}")?,
            // Replaced rather than extended, e.g. by the apology.
            None => write!(out, "\n{content}")?,
        }
        out.flush()?;
        self.shown = content.to_string();
        Ok(())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let renderer = ReplyRenderer::new(HttpTransport::new(args.url));
    let conversation = ConversationHandle::new(ConversationState::with_greeting(&args.greeting));
    conversation.set_open(true);

    println!("assistant> {}", args.greeting);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("you> ");
        std::io::stdout().flush()?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        if line.trim().is_empty() {
            continue;
        }

        let mut updates = conversation.subscribe();
        let mut printer = ReplyPrinter::default();
        print!("assistant> ");
        std::io::stdout().flush()?;

        let turn = renderer.run_turn(&conversation, line);
        tokio::pin!(turn);

        let outcome = loop {
            tokio::select! {
                outcome = &mut turn => break outcome,
                Ok(()) = updates.changed() => {
                    let reply = updates
                        .borrow_and_update()
                        .messages()
                        .last()
                        .filter(|m| m.role == Role::Assistant)
                        .map(|m| m.content.clone());
                    if let Some(reply) = reply {
                        printer.show(&reply)?;
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    debug!("interrupt received; cancelling turn");
                    renderer.cancel();
                }
            }
        };

        match outcome {
            Ok(outcome) => {
                printer.show(&outcome.content)?;
                if outcome.phase == TurnPhase::Cancelled {
                    print!(" [stopped]");
                }
                println!();
            }
            Err(e) => println!("({e})"),
        }
    }

    println!();
    Ok(())
}
