//! NeoBarber - command-line front end for the NeoBarber barbershop manager.
//!
//! Restores the saved session on launch, then runs one subcommand against
//! the NeoBarber API.

mod app;

use std::io;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

const USAGE: &str = "\
Usage: neobarber <command> [args]

Commands:
  login [email]                       Log in (password from NEOBARBER_PASSWORD or prompt)
  register <email> <name> [shop]      Create an account and log in
  logout                              Forget the saved session
  whoami                              Show the logged-in user
  agenda [YYYY-MM-DD]                 Confirmed appointments for a day (default today)
  book <client> <service> <date> <time>
                                      Book an appointment (client/service by id or name)
  complete <id>                       Mark an appointment as completed
  cancel <id>                         Cancel (delete) an appointment
  clients                             List clients
  client add <name> [phone] [email]   Add a client
  services                            List services
  tasks                               List tasks
  task add <title> [low|normal|high]  Add a task
  task toggle <id>                    Mark a task done or open again
  task rm <id>                        Remove a task
  revenue [start] [end]               Revenue summary, optional YYYY-MM-DD bounds
  health                              Check the API is reachable";

/// Initialize the tracing subscriber for logging
fn init_tracing() {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first().map(String::as_str) else {
        eprintln!("{}", USAGE);
        return Ok(());
    };
    if matches!(command, "-h" | "--help" | "help") {
        println!("{}", USAGE);
        return Ok(());
    }

    info!(command = command, "NeoBarber starting");
    let mut app = App::new().await?;
    let arg = |i: usize| args.get(i).cloned();

    match command {
        "login" => app.login(arg(1)).await?,
        "register" => {
            let (Some(email), Some(name)) = (arg(1), arg(2)) else {
                return Err(anyhow::anyhow!("Usage: neobarber register <email> <name> [shop]"));
            };
            app.register(email, name, arg(3)).await?
        }
        "logout" => app.logout().await?,
        "whoami" => app.whoami()?,
        "agenda" => app.agenda(arg(1)).await?,
        "book" => {
            let (Some(client), Some(service), Some(date), Some(time)) =
                (arg(1), arg(2), arg(3), arg(4))
            else {
                return Err(anyhow::anyhow!(
                    "Usage: neobarber book <client> <service> <date> <time>"
                ));
            };
            app.book(&client, &service, &date, &time).await?
        }
        "complete" | "cancel" => {
            let Some(id) = arg(1) else {
                return Err(anyhow::anyhow!("Usage: neobarber {} <id>", command));
            };
            if command == "complete" {
                app.complete(&id).await?
            } else {
                app.cancel(&id).await?
            }
        }
        "clients" => app.clients().await?,
        "client" => match (arg(1).as_deref(), arg(2)) {
            (Some("add"), Some(name)) => app.add_client(name, arg(3), arg(4)).await?,
            _ => return Err(anyhow::anyhow!("Usage: neobarber client add <name> [phone] [email]")),
        },
        "services" => app.services().await?,
        "tasks" => app.tasks().await?,
        "task" => match (arg(1).as_deref(), arg(2)) {
            (Some("add"), Some(title)) => app.add_task(title, arg(3)).await?,
            (Some("toggle"), Some(id)) => app.toggle_task(&id).await?,
            (Some("rm"), Some(id)) => app.remove_task(&id).await?,
            _ => {
                return Err(anyhow::anyhow!(
                    "Usage: neobarber task add <title> [priority] | toggle <id> | rm <id>"
                ))
            }
        },
        "revenue" => app.revenue(arg(1), arg(2)).await?,
        "health" => app.health().await?,
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }

    Ok(())
}
