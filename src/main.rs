use std::{
    env, fs,
    io::{self, BufRead, Write},
    path::{Path, PathBuf},
    process,
};

use anyhow::Context;
use fbximport::{
    ImportSettings, LogLevel, OptionsPrompt, OptionsRequest, PromptOutcome, ResultExt,
    import_scene, init_logging,
    host::FileSystemHost,
    settings::{load_import_settings, recognize},
    source::SourceScene,
    target::SceneDocument,
};

/// Asks on the terminal which take to import.
struct ConsolePrompt;

impl OptionsPrompt for ConsolePrompt {
    fn confirm(&mut self, request: &OptionsRequest<'_>) -> PromptOutcome {
        for issue in request.issues {
            println!("[{:?}] {}", issue.severity, issue.message);
        }
        for choice in &request.take_choices {
            println!("  {choice}");
        }
        print!("Take (Enter keeps current, q cancels): ");
        io::stdout().flush().ok();

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return PromptOutcome::Cancelled;
        }

        let mut settings = request.settings.clone();
        match line.trim() {
            "q" | "Q" => return PromptOutcome::Cancelled,
            "" => {}
            take => settings.take = Some(take.to_string()),
        }
        PromptOutcome::Accepted(settings)
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err:#}");
        process::exit(1);
    }
}

fn usage() -> ! {
    eprintln!(
        "Usage: fbximport <input.json> <output.json> [--settings <file.json>] [--log-level <level>] [Key=Value...]"
    );
    process::exit(2);
}

fn run() -> anyhow::Result<()> {
    let mut args = env::args().skip(1);
    let (Some(input), Some(output)) = (args.next(), args.next()) else {
        usage();
    };
    let input = PathBuf::from(input);
    let output = PathBuf::from(output);

    let mut settings = ImportSettings::default();
    let mut level = LogLevel::default();
    let mut pairs = Vec::new();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--settings" => {
                let Some(path) = args.next() else { usage() };
                settings = load_import_settings(Path::new(&path))?;
            }
            "--log-level" => {
                let Some(value) = args.next() else { usage() };
                level = LogLevel::parse(&value)
                    .with_context(|| format!("unknown log level '{value}'"))?;
            }
            _ => pairs.push(arg),
        }
    }
    init_logging(level);
    settings
        .apply_pairs(pairs.iter().map(String::as_str))
        .log_error(Some("parsing options"))?;

    if !recognize(&input) {
        log::debug!(
            "'{}' has no interchange extension, reading it as a parsed scene",
            input.display()
        );
    }

    let content = fs::read_to_string(&input)
        .with_context(|| format!("failed to read input file: {}", input.display()))?;
    let scene: SourceScene =
        serde_json::from_str(&content).context("failed to parse input scene JSON")?;

    let host = FileSystemHost::new(input.parent().map(Path::to_path_buf));
    let mut document = SceneDocument::new();
    let report = import_scene(&scene, &mut document, &host, &settings, &mut ConsolePrompt)
        .log_error(Some("import"))?;

    document.save_json(&output)?;

    if let Some(take) = &report.take {
        println!("Take: {take}");
    }
    println!(
        "Figures: {}, Bones: {}, Meshes: {}",
        report.figure_count, report.bone_count, report.mesh_count
    );
    println!(
        "Materials: {}, Morphs: {}, Bone bindings: {}",
        report.material_count, report.morph_count, report.skin_binding_count
    );
    println!("Replicated skeletons: {}", report.replicated_skeleton_count);
    println!("Issues: {}", report.issues.len());

    Ok(())
}
