/// Preview: interactive playthrough shell for testing scene content.
///
/// Usage: preview [--assets <dir>] [--lang <code>]
///
/// Commands:
///   up / down / ok        move and activate the menu selection
///   <n>                   pick choice n of the visible dialog
///   wait [seconds]        advance time (default: until something happens)
///   nudge <stat> <amt>    shift a stat target (clarity, anxiety, balance)
///   lang <code>           switch language and save it to the config
///   restart / back        restart from the start scene / return to menu
///   stats / flags / show  inspect the session
///   help                  list commands
///   quit                  exit

use hydrangea_engine::core::content::ContentPaths;
use hydrangea_engine::core::runtime::Runtime;
use hydrangea_engine::core::session::{Command, MenuItem, Mode, Session, SessionEvent};
use hydrangea_engine::schema::stats::StatKind;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Simulated frame length.
const FRAME: f32 = 1.0 / 60.0;
/// Longest `wait` without an explicit duration, in seconds.
const MAX_WAIT: f32 = 30.0;

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hydrangea_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut assets_dir = "assets".to_string();
    let mut language = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--help" | "-h" => {
                print_usage();
                return;
            }
            "--assets" if i + 1 < args.len() => {
                i += 1;
                assets_dir = args[i].clone();
            }
            "--lang" if i + 1 < args.len() => {
                i += 1;
                language = Some(args[i].clone());
            }
            _ => {
                eprintln!("Unknown argument: {}", args[i]);
                print_usage();
                std::process::exit(1);
            }
        }
        i += 1;
    }

    let mut runtime = match Runtime::boot(ContentPaths::under(Path::new(&assets_dir))) {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("ERROR: {}", e);
            std::process::exit(1);
        }
    };
    if let Some(ref code) = language {
        if let Err(e) = runtime.set_language(code) {
            eprintln!("ERROR: {}", e);
        }
    }

    println!(
        "Loaded {} scenes, language '{}'",
        runtime.session().graph().len(),
        runtime.session().language()
    );
    println!("Type 'help' for commands.\n");
    print_screen(runtime.session());

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    while runtime.session().is_running() {
        print!("preview> ");
        stdout.flush().ok();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line).is_err() || line.is_empty() {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        let cmd = parts[0].to_lowercase();

        let command = match cmd.as_str() {
            "quit" | "exit" | "q" => Some(Command::Quit),
            "help" | "h" | "?" => {
                print_help();
                None
            }
            "up" => Some(Command::MenuUp),
            "down" => Some(Command::MenuDown),
            "ok" | "enter" => Some(Command::MenuActivate),
            "restart" | "r" => Some(Command::Restart),
            "back" | "b" => Some(Command::Back),
            "nudge" => {
                let kind = parts.get(1).and_then(|s| parse_stat(s));
                let amount = parts.get(2).and_then(|s| s.parse::<f32>().ok());
                match (kind, amount) {
                    (Some(kind), Some(amount)) => Some(Command::NudgeStat { kind, amount }),
                    _ => {
                        println!("Usage: nudge <clarity|anxiety|balance> <amount>");
                        None
                    }
                }
            }
            "wait" | "w" => {
                let seconds = parts.get(1).and_then(|s| s.parse::<f32>().ok());
                wait(&mut runtime, seconds);
                print_screen(runtime.session());
                None
            }
            "lang" => {
                match parts.get(1) {
                    Some(code) => match runtime.set_language(code) {
                        Ok(()) => println!("Language set to '{}'", runtime.session().language()),
                        Err(e) => println!("ERROR: {}", e),
                    },
                    None => println!("Current language: {}", runtime.session().language()),
                }
                None
            }
            "stats" => {
                print_stats(runtime.session());
                None
            }
            "flags" => {
                let flags = runtime.session().flags().sorted();
                if flags.is_empty() {
                    println!("No flags set.");
                } else {
                    println!("Flags: {}", flags.join(", "));
                }
                None
            }
            "show" => {
                print_screen(runtime.session());
                None
            }
            other => match other.parse::<usize>() {
                Ok(n) if n >= 1 => Some(Command::Choose(n - 1)),
                _ => {
                    println!("Unknown command: '{}'. Type 'help' for available commands.", cmd);
                    None
                }
            },
        };

        if let Some(command) = command {
            match runtime.session_mut().handle_command(command) {
                Ok(()) => {
                    // Let fades and redirects settle before showing the result.
                    wait(&mut runtime, None);
                    print_screen(runtime.session());
                }
                Err(e) => println!("ERROR: {}", e),
            }
        }
    }

    match runtime.shutdown() {
        Ok(_) => println!("Goodbye."),
        Err(e) => eprintln!("ERROR: {}", e),
    }
}

/// Advance `seconds`, or until the screen settles on something new.
fn wait(runtime: &mut Runtime, seconds: Option<f32>) {
    let limit = seconds.unwrap_or(MAX_WAIT);
    let mut elapsed = 0.0;
    while elapsed < limit {
        if let Err(e) = runtime.update(FRAME) {
            println!("ERROR: {}", e);
            break;
        }
        elapsed += FRAME;
        for event in runtime.session_mut().drain_events() {
            print_event(&event);
        }
        let session = runtime.session();
        let settled = !session.transition().is_active()
            && (session.dialog().is_some() || session.mode() != Mode::Playing);
        if seconds.is_none() && settled {
            break;
        }
    }
}

fn print_event(event: &SessionEvent) {
    match event {
        SessionEvent::SceneEntered {
            id,
            background,
            music,
            ..
        } => {
            let mut line = format!("[Scene] {}", id);
            if let Some(bg) = background {
                line.push_str(&format!("  bg={}", bg));
            }
            if let Some(track) = music {
                line.push_str(&format!("  music={}", track));
            }
            println!("{}", line);
        }
        SessionEvent::TransitionRequested { target } => println!("[Fade] -> {}", target),
        SessionEvent::Ended => println!("[End]"),
        SessionEvent::ContentReloaded { language } => println!("[Reload] language={}", language),
        SessionEvent::FlagDropped { name } => println!("[Flag dropped] {}", name),
        SessionEvent::Quit => {}
    }
}

fn print_screen(session: &Session) {
    match session.mode() {
        Mode::Menu => {
            println!("\n--- Menu ---");
            for item in MenuItem::ALL {
                let marker = if item == session.menu_selection() { ">" } else { " " };
                println!(" {} {}", marker, item.label());
            }
            println!();
        }
        Mode::Settings => {
            println!("\n--- Settings ---");
            println!("  language: {}  (use 'lang <code>', 'back' to return)\n", session.language());
        }
        Mode::Playing | Mode::Ended => {
            let Some(dialog) = session.dialog() else {
                if session.mode() == Mode::Ended {
                    println!("\n--- The story has ended. 'restart' or 'quit'. ---\n");
                }
                return;
            };
            println!();
            if let Some(ref title) = dialog.title {
                println!("=== {} ===", title);
            }
            match (&dialog.speaker, &dialog.text) {
                (Some(speaker), Some(text)) => println!("{}: {}", speaker, text),
                (None, Some(text)) => println!("{}", text),
                (Some(speaker), None) => println!("{}:", speaker),
                (None, None) => {}
            }
            for (i, choice) in dialog.choices.iter().enumerate() {
                println!("  {}. {}", i + 1, choice);
            }
            for notice in session.notices() {
                println!("  ({})", notice.text);
            }
            if session.mode() == Mode::Ended {
                println!("--- The End ---");
            }
            println!();
        }
    }
}

fn print_stats(session: &Session) {
    for kind in StatKind::ALL {
        let stat = session.stats().get(kind);
        println!(
            "  {:<8} target {:>7.2}  shown {:>7.2}",
            kind.name(),
            stat.target,
            stat.current
        );
    }
}

fn parse_stat(s: &str) -> Option<StatKind> {
    match s.to_lowercase().as_str() {
        "clarity" | "cl" | "e" => Some(StatKind::Clarity),
        "anxiety" | "anx" | "q" => Some(StatKind::Anxiety),
        "balance" | "bal" => Some(StatKind::Balance),
        _ => None,
    }
}

fn print_usage() {
    println!("Preview: interactive playthrough shell for testing scene content.");
    println!();
    println!("Usage: preview [--assets <dir>] [--lang <code>]");
    println!();
    println!("  --assets <dir>  Assets directory (default: assets)");
    println!("  --lang <code>   Language to start in (ua, ru, en)");
}

fn print_help() {
    println!("Commands:");
    println!("  up, down, ok          Move and activate the menu selection");
    println!("  <n>                   Pick choice n");
    println!("  wait [seconds]        Advance time (default: until something happens)");
    println!("  nudge <stat> <amount> Shift a stat target");
    println!("  lang <code>           Switch language");
    println!("  restart               Fade back to the start scene");
    println!("  back                  Return to the menu");
    println!("  stats                 Show stat targets and displayed values");
    println!("  flags                 Show set flags");
    println!("  show                  Redraw the current screen");
    println!("  help                  Show this help");
    println!("  quit                  Exit");
}
