//! JrDev's two entry points (spec.md §6): interactive and one-shot.

mod app;
mod commands;
mod confirm;

use std::io::Write;
use std::process::ExitCode;

use clap::Parser;

use app::Application;
use commands::CommandOutcome;
use jrdev_core::agent::router::{self, RouterDecision};

#[derive(Parser, Debug)]
#[command(name = "jrdev", version, about = "An interactive AI coding assistant")]
struct Cli {
    /// One-shot instruction, joined with spaces. Omit to start the
    /// interactive session.
    instruction: Vec<String>,

    /// Auto-accept every file-change confirmation prompt for this session.
    #[arg(long)]
    accept_all: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    env_logger::init();

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> ExitCode {
    let cwd = match std::env::current_dir() {
        Ok(dir) => dir,
        Err(e) => {
            eprintln!("could not determine the current directory: {e}");
            return ExitCode::FAILURE;
        }
    };

    let app = match Application::new(cwd, cli.accept_all) {
        Ok(app) => app,
        Err(e) => {
            eprintln!("startup failed: {e}");
            return ExitCode::FAILURE;
        }
    };

    if !cli.instruction.is_empty() {
        return run_one_shot(&app, &cli.instruction.join(" ")).await;
    }

    run_interactive(&app).await;
    ExitCode::SUCCESS
}

/// Run a single turn non-interactively and exit (spec.md §6): success
/// unless the turn asked the user for clarification it has no way to give,
/// or the turn produced an error.
async fn run_one_shot(app: &Application, instruction: &str) -> ExitCode {
    match route_and_dispatch(app, instruction).await {
        Ok(RouterDecision::Chat(reply)) => {
            println!("{reply}");
            ExitCode::SUCCESS
        }
        Ok(RouterDecision::Clarify(question)) => {
            eprintln!("needs clarification: {question}");
            ExitCode::FAILURE
        }
        Ok(RouterDecision::ExecuteCommand(_)) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run_interactive(app: &Application) {
    println!("JrDev ready. Type /help for commands, /exit to quit.");
    loop {
        print!("> ");
        let _ = std::io::stdout().flush();
        let mut line = String::new();
        if std::io::stdin().read_line(&mut line).unwrap_or(0) == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(rest) = line.strip_prefix('/') {
            let (name, args) = rest.split_once(char::is_whitespace).unwrap_or((rest, ""));
            match commands::dispatch(app, &format!("/{name}"), args).await {
                Ok(CommandOutcome::Text(text)) => println!("{text}"),
                Ok(CommandOutcome::Exit) => break,
                Err(e) => eprintln!("error: {e}"),
            }
            continue;
        }

        match route_and_dispatch(app, line).await {
            Ok(RouterDecision::Chat(reply)) => println!("{reply}"),
            Ok(RouterDecision::Clarify(question)) => println!("{question}"),
            Ok(RouterDecision::ExecuteCommand(_)) => {}
            Err(e) => eprintln!("error: {e}"),
        }
    }
}

/// Route free-form input through C13, then dispatch an `execute_command`
/// decision back through the same command table direct `/`-prefix uses
/// (spec.md §4.11, §6).
async fn route_and_dispatch(app: &Application, input: &str) -> Result<RouterDecision, app::AppError> {
    let model = app.model_for(Some("intent_router"));
    let worker_id = app.new_worker_id("router");
    let ctx = app.agent_context(worker_id);
    let user_thread = app.current_thread()?;
    let catalogue = commands::catalogue();

    let decision = router::route(&ctx, &app.router_thread, &user_thread, &app.cwd, &model, &catalogue, input)
        .await
        .map_err(app::AppError::Llm)?;
    app.thread_store.save(&app.router_thread.lock())?;
    app.thread_store.save(&user_thread.lock())?;

    if let RouterDecision::ExecuteCommand(reconstructed) = &decision {
        let (name, args) = reconstructed.split_once(char::is_whitespace).unwrap_or((reconstructed.as_str(), ""));
        let name = if name.starts_with('/') { name.to_string() } else { format!("/{name}") };
        match commands::dispatch(app, &name, args).await? {
            CommandOutcome::Text(text) => println!("{text}"),
            CommandOutcome::Exit => std::process::exit(0),
        }
    }

    Ok(decision)
}
