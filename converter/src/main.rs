//! Gedshift CLI - Convert genealogical line-record documents
//!
//! # Main Commands
//!
//! ```bash
//! gedshift convert family.ged --to successor     # Legacy to successor
//! gedshift convert family7.ged --to legacy       # Successor to legacy
//! ```
//!
//! # Debug Commands (for development)
//!
//! ```bash
//! gedshift parse family.ged                      # Just parse to a JSON tree
//! gedshift select family.ged "INDI[]" --all      # Evaluate a selector path
//! gedshift check family.ged                      # Check cross-references
//! gedshift rules                                 # Show registered transformations
//! gedshift example-options                       # Show default options JSON
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use gedshift::{
    check_references, convert_file, read_file, render, write, ConvertOptions, Direction,
    Node, Registry, Schema, Tree,
};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "gedshift")]
#[command(about = "Convert genealogical line-record documents between schemas", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

/// Schema named on the command line
#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemaArg {
    Legacy,
    Successor,
}

impl From<SchemaArg> for Schema {
    fn from(arg: SchemaArg) -> Self {
        match arg {
            SchemaArg::Legacy => Schema::Legacy,
            SchemaArg::Successor => Schema::Successor,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a document to the other schema
    Convert {
        /// Input document
        input: PathBuf,

        /// Destination schema
        #[arg(short, long, value_enum, default_value = "successor")]
        to: SchemaArg,

        /// Options JSON file (see `example-options`)
        #[arg(long)]
        options: Option<PathBuf>,

        /// Override the legacy maximum line length
        #[arg(long)]
        max_line: Option<usize>,

        /// Output the converted tree as JSON instead of line records
        #[arg(long)]
        json: bool,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Parse a document and output its tree as JSON
    Parse {
        /// Input document
        input: PathBuf,

        /// Schema the document is written in
        #[arg(short, long, value_enum, default_value = "legacy")]
        schema: SchemaArg,

        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Evaluate a selector path against the document root
    Select {
        /// Input document
        input: PathBuf,

        /// Selector path, e.g. `INDI#I1/NAME`
        path: String,

        /// Return every match of the last step
        #[arg(short, long)]
        all: bool,

        /// Schema the document is written in
        #[arg(short, long, value_enum, default_value = "legacy")]
        schema: SchemaArg,
    },

    /// Check that every pointer resolves
    Check {
        /// Input document
        input: PathBuf,

        /// Schema the document is written in
        #[arg(short, long, value_enum, default_value = "legacy")]
        schema: SchemaArg,
    },

    /// Show the registered transformations
    Rules,

    /// Show the default conversion options
    ExampleOptions,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Convert {
            input,
            to,
            options,
            max_line,
            json,
            output,
        } => cmd_convert(
            &input,
            to.into(),
            options.as_deref(),
            max_line,
            json,
            output.as_deref(),
        ),

        Commands::Parse {
            input,
            schema,
            output,
        } => cmd_parse(&input, schema.into(), output.as_deref()),

        Commands::Select {
            input,
            path,
            all,
            schema,
        } => cmd_select(&input, &path, all, schema.into()),

        Commands::Check { input, schema } => cmd_check(&input, schema.into()),

        Commands::Rules => cmd_rules(),

        Commands::ExampleOptions => cmd_example_options(),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_convert(
    input: &Path,
    target: Schema,
    options_path: Option<&Path>,
    max_line: Option<usize>,
    json: bool,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Converting: {}", input.display());

    let mut options = match options_path {
        Some(path) => ConvertOptions::from_file(path)?,
        None => ConvertOptions::default(),
    };
    if let Some(max_len) = max_line {
        options.legacy_lines = options.legacy_lines.with_max_len(max_len);
    }

    let direction = match target {
        Schema::Successor => Direction::ToSuccessor,
        Schema::Legacy => Direction::ToLegacy,
    };
    let result = convert_file(input, direction, &options)?;

    let stats = &result.stats;
    eprintln!("   Visited: {} nodes ({} handled)", stats.visited, stats.handled);
    eprintln!(
        "   Records: externalized {}, relocated {}, internalized {}, pruned {}",
        stats.externalized, stats.relocated, stats.internalized, stats.pruned
    );
    for (category, count) in &result.records {
        eprintln!("   {}: {}", category, count);
    }
    eprintln!(
        "✅ {} records, {} pointers resolved",
        result.check.records, result.check.pointers
    );

    let content = if json {
        serde_json::to_string_pretty(&result.to_node())?
    } else {
        render(&result, &options)
    };
    write_output(&content, output)?;

    Ok(())
}

fn cmd_parse(
    input: &Path,
    schema: Schema,
    output: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Parsing: {}", input.display());

    let result = read_file(input, schema)?;
    eprintln!("   Encoding: {}", result.encoding);
    eprintln!("✅ Parsed {} lines", result.lines);

    let json = serde_json::to_string_pretty(&result.tree.to_node(result.tree.root()))?;
    write_output(&json, output)?;

    Ok(())
}

fn cmd_select(
    input: &Path,
    path: &str,
    all: bool,
    schema: Schema,
) -> Result<(), Box<dyn std::error::Error>> {
    let tree = read_file(input, schema)?.tree;
    let root = tree.root();

    let matches = if all {
        tree.select_all(root, path)?
    } else {
        tree.select(root, path)?.into_iter().collect()
    };
    for node in &matches {
        print!("{}", write_node(&tree.to_node(*node), schema));
    }
    eprintln!("🔎 {} match(es)", matches.len());

    Ok(())
}

/// A matched subtree as line records, rooted at level 0
fn write_node(node: &Node, schema: Schema) -> String {
    let tree = Tree::from_records(std::slice::from_ref(node));
    write(&tree, schema, ConvertOptions::default().line_policy(schema))
}

fn cmd_check(input: &Path, schema: Schema) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("✔️  Checking: {}", input.display());

    let tree = read_file(input, schema)?.tree;
    let report = check_references(&tree)?;
    eprintln!(
        "✅ {} records, {} pointers resolved",
        report.records, report.pointers
    );

    Ok(())
}

fn cmd_rules() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", Registry::standard().describe());
    Ok(())
}

fn cmd_example_options() -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", ConvertOptions::default().to_json()?);
    Ok(())
}

fn write_output(content: &str, path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    match path {
        Some(p) => {
            fs::write(p, content)?;
            eprintln!("💾 Output written to: {}", p.display());
        }
        None => {
            print!("{}", content);
        }
    }
    Ok(())
}
