/// Walkthrough example: plays the bundled demo story with a fixed script.
///
/// The porch, the flowers, a gift in the hall and a quiet ending in the kitchen.
/// Stats drift between choices exactly as they would in the game.
///
/// Run with: cargo run --example walkthrough [-- <language>]

use hydrangea_engine::core::content::{Content, ContentPaths};
use hydrangea_engine::core::session::{Command, Dialog, Mode, Session, SessionEvent};
use hydrangea_engine::schema::stats::StatKind;
use std::path::Path;

const FRAME: f32 = 1.0 / 60.0;
/// Choice picked at each dialog that offers any, in order.
const SCRIPT: [usize; 5] = [1, 0, 0, 0, 0];

fn main() {
    let language = std::env::args().nth(1).unwrap_or_else(|| "en".to_string());
    let paths = ContentPaths::under(Path::new("assets"));
    let content = Content::load(&paths, &language).expect("Failed to load demo content");

    println!("========================================");
    println!("   {} scenes, language '{}'", content.graph.len(), content.language());
    println!("========================================\n");

    let mut session = Session::new(content);
    session
        .handle_command(Command::MenuActivate)
        .expect("Failed to start a new game");

    let mut script = SCRIPT.iter();
    let mut clock = 0.0f32;

    loop {
        session.tick(FRAME).expect("Session error");
        clock += FRAME;

        for event in session.drain_events() {
            if let SessionEvent::SceneEntered { id, .. } = event {
                println!("--- [{:>5.2}s] {} ---", clock, id);
            }
        }

        let Some(dialog) = session.dialog().cloned() else {
            if session.mode() == Mode::Ended {
                break;
            }
            continue;
        };
        if session.transition().is_active() || dialog.choices.is_empty() {
            if session.mode() == Mode::Ended {
                print_dialog(&dialog);
                break;
            }
            continue;
        }

        print_dialog(&dialog);
        let Some(&pick) = script.next() else {
            println!("[Script exhausted]");
            break;
        };
        println!("> {}\n", dialog.choices[pick]);
        session
            .handle_command(Command::Choose(pick))
            .expect("Scripted choice failed");
        print_stats(&session);
    }

    println!("\nFlags: {}", session.flags().sorted().join(", "));
    println!("========================================");
    println!("   FIN");
    println!("========================================");
}

fn print_dialog(dialog: &Dialog) {
    if let Some(ref title) = dialog.title {
        println!("== {} ==", title);
    }
    match (&dialog.speaker, &dialog.text) {
        (Some(speaker), Some(text)) => println!("{}: {}", speaker, text),
        (None, Some(text)) => println!("{}", text),
        _ => {}
    }
    for (i, choice) in dialog.choices.iter().enumerate() {
        println!("  {}. {}", i + 1, choice);
    }
    println!();
}

fn print_stats(session: &Session) {
    let line: Vec<String> = StatKind::ALL
        .iter()
        .map(|&kind| format!("{} {:.0}", kind.abbrev(), session.stats().get(kind).target))
        .collect();
    println!("[{}]", line.join(" | "));
    for notice in session.notices() {
        println!("  {}", notice.text);
    }
    println!();
}
