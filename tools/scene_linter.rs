/// Scene Linter: validates scene graph links and story structure.
///
/// Usage: scene_linter <content_file> [--strings <dir>] [--lang <code>]

use hydrangea_engine::core::graph::SceneGraph;
use hydrangea_engine::core::localization::{load_with_fallback, LocalizationTable};
use hydrangea_engine::schema::scene::SceneIndex;
use std::collections::VecDeque;
use std::path::Path;
use std::process;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hydrangea_engine=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 || args[1] == "--help" || args[1] == "-h" {
        println!("Usage: scene_linter <content_file> [--strings <dir>] [--lang <code>]");
        process::exit(0);
    }

    let content_path = Path::new(&args[1]);
    let mut strings_dir = None;
    let mut language = "ua".to_string();

    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--strings" if i + 1 < args.len() => {
                i += 1;
                strings_dir = Some(args[i].clone());
            }
            "--lang" if i + 1 < args.len() => {
                i += 1;
                language = args[i].clone();
            }
            other => {
                eprintln!("Unknown argument: {}", other);
                process::exit(1);
            }
        }
        i += 1;
    }

    let strings = match strings_dir {
        Some(ref dir) => match load_with_fallback(Path::new(dir), &language, "ua") {
            Ok(table) => table,
            Err(e) => {
                eprintln!("ERROR: Failed to load strings: {}", e);
                process::exit(1);
            }
        },
        None => LocalizationTable::new(&language),
    };

    let graph = match SceneGraph::load(content_path, &strings) {
        Ok(graph) => graph,
        Err(e) => {
            eprintln!("ERROR: Failed to load content: {}", e);
            process::exit(1);
        }
    };

    println!(
        "Loaded {} scenes (language '{}', start '{}')",
        graph.len(),
        graph.language(),
        graph.start_id()
    );

    let (errors, warnings) = lint_graph(&graph, strings_dir.is_some());

    println!("\n=== Scene Lint Report ===\n");

    if errors.is_empty() && warnings.is_empty() {
        println!("All checks passed!");
    }

    for warning in &warnings {
        println!("WARNING: {}", warning);
    }

    for error in &errors {
        println!("ERROR: {}", error);
    }

    println!(
        "\nSummary: {} errors, {} warnings",
        errors.len(),
        warnings.len()
    );

    if errors.is_empty() {
        process::exit(0);
    } else {
        process::exit(1);
    }
}

/// Every scene reachable in one step from `index`, by any route.
fn successors(graph: &SceneGraph, index: SceneIndex) -> Vec<SceneIndex> {
    let Some(scene) = graph.scene(index) else {
        return Vec::new();
    };
    scene
        .choices
        .iter()
        .filter_map(|c| c.next)
        .chain(scene.checks.iter().filter_map(|c| c.target))
        .chain(scene.auto_next)
        .collect()
}

fn lint_graph(graph: &SceneGraph, checked_strings: bool) -> (Vec<String>, Vec<String>) {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    // Loader diagnostics. Translation misses only matter when a table was given.
    for diagnostic in graph.diagnostics() {
        if diagnostic.affects_flow() {
            errors.push(diagnostic.to_string());
        } else if checked_strings
            || !matches!(
                diagnostic,
                hydrangea_engine::core::graph::Diagnostic::MissingTranslation { .. }
            )
        {
            warnings.push(diagnostic.to_string());
        }
    }

    // Reachability from the start scene
    let mut reached = vec![false; graph.len()];
    if let Some(start) = graph.start() {
        let mut queue = VecDeque::from([start]);
        reached[start.0] = true;
        while let Some(index) = queue.pop_front() {
            for next in successors(graph, index) {
                if !reached[next.0] {
                    reached[next.0] = true;
                    queue.push_back(next);
                }
            }
        }
    }
    for (index, scene) in graph.iter() {
        if !reached[index.0] {
            warnings.push(format!("Scene '{}' is unreachable from the start", scene.id));
        }
    }

    // Endings
    let endings: Vec<&str> = graph
        .scenes()
        .iter()
        .filter(|s| s.is_ending())
        .map(|s| s.id.as_str())
        .collect();
    if endings.is_empty() {
        warnings.push("No scene ends the story".to_string());
    } else {
        println!("Endings: {}", endings.join(", "));
    }

    // Timed scenes that never advance
    for scene in graph.scenes() {
        if scene.auto_time > 0.0 && !scene.choices.is_empty() {
            warnings.push(format!(
                "Scene '{}' has auto_time but also choices; the timer never runs",
                scene.id
            ));
        }
    }

    // Auto-check loops. A loop of unconditional checks always hangs; a
    // conditional one only might, so it is a warning.
    for cycle in check_cycles(graph) {
        let unconditional = cycle.windows(2).all(|pair| {
            graph
                .scene(pair[0])
                .and_then(|s| s.checks.iter().find(|c| c.target.is_some()))
                .is_some_and(|c| c.condition.is_unconditional() && c.target == Some(pair[1]))
        });
        let names: Vec<&str> = cycle
            .iter()
            .filter_map(|&i| graph.scene(i).map(|s| s.id.as_str()))
            .collect();
        let message = format!("Auto-checks can loop: {}", names.join(" -> "));
        if unconditional {
            errors.push(message);
        } else {
            warnings.push(message);
        }
    }

    (errors, warnings)
}

/// Cycles in the auto-check redirect graph, each listed once.
fn check_cycles(graph: &SceneGraph) -> Vec<Vec<SceneIndex>> {
    #[derive(Clone, Copy, PartialEq)]
    enum Mark {
        New,
        Active,
        Done,
    }

    fn visit(
        graph: &SceneGraph,
        index: SceneIndex,
        marks: &mut [Mark],
        stack: &mut Vec<SceneIndex>,
        cycles: &mut Vec<Vec<SceneIndex>>,
    ) {
        marks[index.0] = Mark::Active;
        stack.push(index);
        let targets: Vec<SceneIndex> = graph
            .scene(index)
            .map(|s| s.checks.iter().filter_map(|c| c.target).collect())
            .unwrap_or_default();
        for target in targets {
            match marks[target.0] {
                Mark::New => visit(graph, target, marks, stack, cycles),
                Mark::Active => {
                    if let Some(pos) = stack.iter().position(|&i| i == target) {
                        let mut cycle = stack[pos..].to_vec();
                        cycle.push(target);
                        cycles.push(cycle);
                    }
                }
                Mark::Done => {}
            }
        }
        stack.pop();
        marks[index.0] = Mark::Done;
    }

    let mut marks = vec![Mark::New; graph.len()];
    let mut cycles = Vec::new();
    for (index, _) in graph.iter() {
        if marks[index.0] == Mark::New {
            visit(graph, index, &mut marks, &mut Vec::new(), &mut cycles);
        }
    }
    cycles
}
