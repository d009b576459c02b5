use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use crate::app::{ChatApp, View};
use crate::config::AppConfig;
use crate::logger::Logger;
use crate::menu::{MenuCategory, MenuPanel};
use crate::transcript::{ChatMessage, Role};
use crate::utils::markup_to_text;
use colored::*;
use rustyline::completion::{Completer, Pair};
use rustyline::config::Configurer;
use rustyline::error::ReadlineError;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::{Config, CompletionType, Context, Editor, Helper, Highlighter, Validator};

/// Available slash commands for tab-completion.
const COMMANDS: &[&str] = &[
    "/help", "/quit", "/exit", "/login", "/logout", "/menu", "/pick",
    "/close", "/history", "/stats", "/whoami", "/campuses",
];

const MENU_NAMES: &[&str] = &["policies", "protocols", "handbook"];

/// Rustyline helper providing slash-command tab-completion and inline hints.
#[derive(Helper, Validator, Highlighter)]
struct CommandCompleter;

impl Hinter for CommandCompleter {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos != line.len() || !line.starts_with('/') {
            return None;
        }

        // `/menu p` hints the category name
        if let Some(arg) = line.strip_prefix("/menu ") {
            return MENU_NAMES
                .iter()
                .find(|m| m.starts_with(arg) && **m != arg)
                .map(|m| m[arg.len()..].to_string());
        }
        if line.contains(' ') {
            return None;
        }

        COMMANDS
            .iter()
            .find(|cmd| cmd.starts_with(line) && **cmd != line)
            .map(|cmd| cmd[line.len()..].to_string())
    }
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let prefix = &line[..pos];
        if let Some(arg) = prefix.strip_prefix("/menu ") {
            let matches = MENU_NAMES
                .iter()
                .filter(|m| m.starts_with(arg))
                .map(|m| Pair {
                    display: m.to_string(),
                    replacement: m.to_string(),
                })
                .collect();
            return Ok(("/menu ".len(), matches));
        }
        if !prefix.starts_with('/') || prefix.contains(' ') {
            return Ok((0, vec![]));
        }

        let matches: Vec<Pair> = COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

type LineEditor = Editor<CommandCompleter, DefaultHistory>;

pub fn print_banner() {
    println!("{}", "====================================".bright_cyan());
    println!("{}", "        CMS POLICY ASSISTANT        ".bright_cyan().bold());
    println!("{}", "====================================".bright_cyan());
    println!("{}", " Ask about school policies, protocols and handbooks".bright_white());
    println!("{}\n", " Type /help for commands or /quit to exit".dimmed());
}

fn print_message(msg: &ChatMessage) {
    let text = markup_to_text(&msg.content);
    match msg.role {
        Role::User => println!("{} {}", "you ›".bright_blue().bold(), text),
        Role::Assistant => {
            println!("{}", "assistant ›".bright_green().bold());
            for line in text.lines() {
                println!("  {}", line);
            }
        }
    }
}

fn print_from(app: &ChatApp, start: usize) {
    for msg in app.messages().iter().skip(start) {
        print_message(msg);
    }
    println!();
}

fn print_help() {
    println!("\n{}", "Available Commands:".bright_cyan().bold());
    println!("  {}  - Exit the program", "/quit, /exit".green());
    println!("  {}         - Show this help", "/help".green());
    println!("  {} [user] [campus] - Log in to the policy assistant", "/login".green());
    println!("  {}       - Log out and forget the saved session", "/logout".green());
    println!("  {} <name>  - Toggle a menu: policies, protocols, handbook", "/menu".green());
    println!("  {} <n>     - Pick item n from the open menu", "/pick".green());
    println!("  {}        - Close the open menu", "/close".green());
    println!("  {}      - Show the conversation", "/history".green());
    println!("  {}        - Show session statistics", "/stats".green());
    println!("  {}       - Show the signed-in user", "/whoami".green());
    println!("  {}     - List campus codes", "/campuses".green());
    println!("  Anything else is sent as a question.");
    println!();
}

/// Start a spinner animation in a background thread.
/// Returns an `Arc<AtomicBool>`; set it to `false` to stop the spinner.
fn start_spinner(message: &str) -> Arc<AtomicBool> {
    let running = Arc::new(AtomicBool::new(true));
    let running_clone = running.clone();
    let msg = message.to_string();

    std::thread::spawn(move || {
        let frames = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];
        let mut i = 0;
        while running_clone.load(Ordering::Relaxed) {
            print!("\r{} {} ", frames[i % frames.len()].to_string().cyan(), msg.dimmed());
            let _ = io::stdout().flush();
            std::thread::sleep(std::time::Duration::from_millis(80));
            i += 1;
        }
        // Clear the spinner line
        print!("\r{}\r", " ".repeat(msg.len() + 4));
        let _ = io::stdout().flush();
    });

    running
}

fn stop_spinner(handle: &Arc<AtomicBool>) {
    handle.store(false, Ordering::Relaxed);
    // Give the spinner thread time to clear the line
    std::thread::sleep(std::time::Duration::from_millis(100));
}

/// Read one line; `None` on Ctrl-C / Ctrl-D.
fn prompt(rl: &mut LineEditor, label: &str) -> Option<String> {
    match rl.readline(label) {
        Ok(line) => Some(line.trim().to_string()),
        Err(_) => None,
    }
}

/// Ask for whatever `/login` was not given, then authenticate.
async fn run_login(app: &mut ChatApp, rl: &mut LineEditor, args: &[&str]) {
    let remembered = app.login_form().clone();

    let username = match args.first() {
        Some(u) => u.to_string(),
        None if !remembered.username.is_empty() => {
            let entered = prompt(rl, &format!("Username [{}]: ", remembered.username)).unwrap_or_default();
            if entered.is_empty() { remembered.username.clone() } else { entered }
        }
        None => prompt(rl, "Username: ").unwrap_or_default(),
    };

    let campus = match args.get(1) {
        Some(c) => c.to_string(),
        None => {
            let label = match &remembered.campus {
                Some(c) => format!("Campus ({}) [{}]: ", app.config().campuses.join("/"), c),
                None => format!("Campus ({}): ", app.config().campuses.join("/")),
            };
            let entered = prompt(rl, &label).unwrap_or_default();
            if entered.is_empty() { remembered.campus.clone().unwrap_or_default() } else { entered }
        }
    };

    // Not masked; the line is kept out of the history
    rl.set_auto_add_history(false);
    let password = prompt(rl, "Password: ").unwrap_or_default();
    rl.set_auto_add_history(true);

    let spinner = start_spinner("Signing in...");
    let result = app.login(&username, &password, &campus).await;
    stop_spinner(&spinner);

    match result {
        Ok(session) => {
            println!(
                "{} {} {}",
                "✓ Signed in as".green(),
                session.username.bright_white(),
                format!("(campus {}, {})", session.campus, session.role).dimmed()
            );
            print_from(app, 0);
        }
        Err(_) => {
            let msg = app.login_error().unwrap_or("Login failed.");
            println!("{} {}", "✗".red().bold(), msg.red());
        }
    }
}

async fn run_question(app: &mut ChatApp, question: &str) {
    let before = app.messages().len();
    let Some(pending) = app.begin_ask(question) else {
        print_from(app, before);
        return;
    };

    let client = app.client().clone();
    let spinner = start_spinner("Assistant is typing...");
    let outcome = pending.dispatch(&client).await;
    stop_spinner(&spinner);

    app.complete_ask(outcome);
    // The echo is already on screen
    print_from(app, before + 1);
}

fn show_menu(app: &mut ChatApp, arg: Option<&str>) {
    let Some(arg) = arg else {
        println!("{}", "Usage: /menu <policies|protocols|handbook>".yellow());
        return;
    };
    let category = match arg.parse::<MenuCategory>() {
        Ok(c) => c,
        Err(e) => {
            println!("{}", e.yellow());
            return;
        }
    };

    let Some(items) = app.open_category(category) else {
        println!("{}", format!("{} menu closed.", category.title()).dimmed());
        return;
    };

    println!("\n{}", category.title().bright_cyan().bold());
    let enabled = MenuPanel::is_enabled(category, app.current_campus());
    for (i, item) in items.iter().enumerate() {
        let line = format!("  {:>2}. {}", i + 1, item.label);
        if enabled {
            println!("{}", line.bright_white());
        } else {
            println!("{} {}", line.dimmed(), "(choose a campus first)".dimmed());
        }
    }
    println!("{}\n", "Pick with /pick <n>".dimmed());
}

async fn pick_item(app: &mut ChatApp, arg: Option<&str>) {
    let Some(category) = app.open_menu() else {
        println!("{}", "No menu is open. Use /menu first.".yellow());
        return;
    };
    let index = arg.and_then(|a| a.parse::<usize>().ok()).filter(|n| *n >= 1);
    let Some(item) = index.and_then(|n| category.items().get(n - 1)) else {
        println!(
            "{}",
            format!("Choose a number between 1 and {}.", category.items().len()).yellow()
        );
        return;
    };

    if !app.is_item_enabled(category) {
        println!("{} {}", "✗".red(), "Choose a campus with /login first.".yellow());
        return;
    }

    let before = app.messages().len();
    let spinner = start_spinner("Assistant is typing...");
    let result = app.select_item(category, item).await;
    stop_spinner(&spinner);

    match result {
        // The canned question was never typed, so show its echo too
        Ok(_) => print_from(app, before),
        Err(e) => println!("{} {}", "✗".red(), e.user_message().yellow()),
    }
}

fn show_whoami(app: &ChatApp) {
    match app.session() {
        Some(s) => {
            println!("\n{}", "Signed in:".bright_cyan().bold());
            println!("  {}     {}", "User:".dimmed(), s.username.bright_white());
            println!("  {}   {}", "Campus:".dimmed(), s.campus.bright_white());
            println!("  {}     {}", "Role:".dimmed(), s.role.bright_white());
            println!();
        }
        None => println!("{}", "Not signed in. Use /login.".yellow()),
    }
}

// Interactive REPL entry point
pub async fn start_repl(config: &AppConfig) {
    print_banner();

    let logger = if config.enable_logging {
        Logger::new(&config.log_dir).unwrap_or_else(|e| {
            println!("{} {}", "⚠️  Logging disabled:".yellow(), e);
            Logger::disabled()
        })
    } else {
        Logger::disabled()
    };
    let mut app = ChatApp::new(config.clone()).with_logger(logger);

    let rl_config = Config::builder()
        .auto_add_history(true)
        .completion_type(CompletionType::List)
        .completion_prompt_limit(100)
        .build();
    let mut rl: LineEditor = match Editor::with_config(rl_config) {
        Ok(rl) => rl,
        Err(e) => {
            println!("{} {}", "✗ Failed to create line editor:".red().bold(), e);
            return;
        }
    };
    rl.set_helper(Some(CommandCompleter));

    if app.restore_session().is_some() {
        println!("{}", "✓ Restored saved session.".green());
        print_from(&app, 0);
    } else {
        println!("{}", "Sign in with /login to start asking questions.".bright_white());
    }

    loop {
        let label = match (app.view(), app.session()) {
            (View::Chat, Some(s)) => format!("{}> ", s.campus),
            _ => "> ".to_string(),
        };
        let line = match rl.readline(&label.bright_cyan().bold().to_string()) {
            Ok(line) => line.trim().to_string(),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => {
                println!("Goodbye!");
                break;
            }
            Err(e) => {
                println!("{} {}", "✗ Input error:".red(), e);
                continue;
            }
        };

        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        let command = parts.next().unwrap_or_default();
        let args: Vec<&str> = parts.collect();

        match command {
            "/quit" | "/exit" => {
                println!("Goodbye!");
                break;
            }
            "/help" => print_help(),
            "/login" => run_login(&mut app, &mut rl, &args).await,
            "/logout" => {
                app.logout();
                println!("{}", "✓ Signed out.".green());
            }
            "/menu" => show_menu(&mut app, args.first().copied()),
            "/pick" => pick_item(&mut app, args.first().copied()).await,
            "/close" => app.close_menu(),
            "/history" => {
                if app.messages().is_empty() {
                    println!("{}", "No conversation yet.".yellow());
                } else {
                    print_from(&app, 0);
                }
            }
            "/stats" => app.metrics().display(),
            "/whoami" => show_whoami(&app),
            "/campuses" => println!("{}", app.config().campuses.join(", ")),
            cmd if cmd.starts_with('/') => {
                println!("{} {}", "Unknown command:".yellow(), cmd);
            }
            _ => run_question(&mut app, &line).await,
        }
    }
}
