use clap::Parser;
use rbe::{BundleEditor, EditorConfig, FileSource, TextSource, statics};
use std::path::PathBuf;

/// RBE: Resource Bundle Editor. Lists the locales and key tree of a properties bundle family.
#[derive(Parser, Debug)]
#[command(name = "rbe", version, about, long_about = None)]
struct Args {
    /// Directory holding the bundle's properties files
    #[arg(value_name = "DIRECTORY")]
    dir: PathBuf,

    /// Base name shared by the locale files (`messages` for `messages_de.properties`)
    #[arg(value_name = "BASE_NAME")]
    base_name: String,

    /// Show keys as a flat list instead of a hierarchy
    #[arg(long)]
    flat: bool,

    /// Show only keys with missing translations
    #[arg(long)]
    incomplete: bool,

    /// JSON5 editor configuration file
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Exit with status 1 when any value is missing
    #[arg(long)]
    check: bool,

    /// Log debug output to stderr
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    // Usage errors exit with status 2.
    let args = Args::parse();

    let level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::WARN
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let mut config = match &args.config {
        Some(path) => EditorConfig::load_path(path)?,
        None => EditorConfig::default(),
    };
    if args.flat {
        config.key_tree_hierarchical = false;
    }
    if args.incomplete {
        config.show_only_incomplete = true;
    }

    let source = FileSource::open(&args.dir, &args.base_name)?;
    if source.locales().is_empty() {
        println!("{}", statics::EN_NO_BUNDLES);
        return Ok(());
    }
    let editor = BundleEditor::new(source, config);

    println!("{} {}", statics::EN_APP_TITLE, args.base_name);
    println!("{}", statics::EN_HEADING_LOCALES);
    for locale in editor.source().locales() {
        let name = if locale.is_root() {
            statics::EN_LOCALE_DEFAULT.to_string()
        } else {
            locale.to_string()
        };
        let mut line = format!("  {name}");
        if editor.source().is_read_only(&locale) {
            line.push(' ');
            line.push_str(statics::EN_LABEL_READ_ONLY);
        }
        if let Some((_, err)) = editor.report().failures.iter().find(|(l, _)| *l == locale) {
            line.push_str(&format!(" {}: {err:#}", statics::EN_LABEL_FAILED));
        }
        println!("{line}");
    }

    println!("{}", statics::EN_HEADING_KEYS);
    let mut missing = 0usize;
    editor.tree().walk(|item, depth| {
        let state = editor.missing_value(item.id());
        let glyph = if state.is_missing_value() {
            missing += 1;
            statics::EN_GLYPH_MISSING
        } else if state.is_missing_child_value_only() {
            statics::EN_GLYPH_MISSING_CHILD
        } else {
            statics::EN_GLYPH_NONE
        };
        let commented = if editor.is_commented(item.id()) {
            statics::EN_GLYPH_COMMENTED
        } else {
            statics::EN_GLYPH_NONE
        };
        println!("{glyph}{commented} {}{}", "  ".repeat(depth), item.name());
    });

    println!(
        "{} {}  {} {}",
        statics::EN_SUMMARY_KEYS,
        editor.group().keys().len(),
        statics::EN_SUMMARY_MISSING,
        missing
    );

    if args.check && missing > 0 {
        std::process::exit(1);
    }
    Ok(())
}
