mod error;
mod export;
mod hiring;
mod loader;
mod priority;
mod search;
mod settings;
mod table;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use export::ExportFormat;
use loader::Upload;
use search::OutputColumn;
use settings::Settings;
use table::Table;

#[derive(Parser)]
#[command(
    name = "priority_extract",
    about = "Flatten company priority JSON from CSV/Excel uploads, and collect web search hits per row"
)]
struct Cli {
    /// Settings file (default: ./priority_extract.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct InputArgs {
    /// Uploaded file (.csv, .xls, .xlsx or .json)
    #[arg(short, long)]
    input: PathBuf,
    /// Worksheet to read; required when a workbook has several
    #[arg(short, long)]
    sheet: Option<String>,
}

#[derive(Args)]
struct OutputArgs {
    /// Output file; format follows its extension unless --format is given
    #[arg(short, long)]
    output: Option<PathBuf>,
    #[arg(short, long, value_enum)]
    format: Option<ExportFormat>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show sheets, column summary and the first rows of a file
    Inspect {
        #[command(flatten)]
        input: InputArgs,
        /// Rows to preview (default from settings)
        #[arg(short = 'n', long)]
        rows: Option<usize>,
    },
    /// Flatten the selected priority categories into one row per initiative
    Extract {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Column holding the priorities JSON
        #[arg(short, long, default_value = "Formatted Priorities")]
        column: String,
        /// Category keys in output order: business, R&D, sustainability, talent, technology
        #[arg(short, long, value_delimiter = ',', required = true)]
        keys: Vec<String>,
    },
    /// Search the web for each row and keep the top hit
    Search {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
        /// Columns whose values make up each query, in order
        #[arg(short, long, value_delimiter = ',', required = true)]
        columns: Vec<String>,
        /// Result fields to keep
        #[arg(long, value_enum, value_delimiter = ',', default_values_t = OutputColumn::ALL)]
        keep: Vec<OutputColumn>,
    },
    /// Clean a job-postings export into the hiring deliverable
    Hiring {
        #[command(flatten)]
        input: InputArgs,
        #[command(flatten)]
        output: OutputArgs,
    },
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref()).context("Failed to load settings")?;
    info!(?settings, "settings loaded");

    match cli.command {
        Commands::Inspect { input, rows } => {
            let upload = read_upload(&input)?;
            if upload.format.is_workbook() {
                println!("Sheets: {}", upload.sheet_names()?.join(", "));
            }
            let table = upload.load(input.sheet.as_deref())?;
            print_info(&table);
            println!();
            print_preview(&table, rows.unwrap_or(settings.preview_rows));
        }
        Commands::Extract {
            input,
            output,
            column,
            keys,
        } => {
            for key in keys.iter().filter(|k| !priority::is_known_category(k)) {
                warn!(%key, "not a standard category key; it will label as itself");
            }
            let table = read_upload(&input)?.load(input.sheet.as_deref())?;

            let pb = progress_bar();
            let extraction = priority::extract(&table, &column, &keys, &pb)?;
            for w in &extraction.warnings {
                eprintln!("Warning: {}", w);
            }

            let result = extraction.to_table();
            if result.is_empty() {
                println!("No initiatives found for keys: {}", keys.join(", "));
            } else {
                print_preview(&result, settings.preview_rows);
            }
            let path = write_output(&result, &output, "extracted_priority_data")?;
            println!(
                "Saved {} records from {} companies to {}",
                result.len(),
                extraction.rows_processed,
                path.display()
            );
        }
        Commands::Search {
            input,
            output,
            columns,
            keep,
        } => {
            let table = read_upload(&input)?.load(input.sheet.as_deref())?;
            let pacing = search::Pacing::from(&settings.search);

            let collection = {
                // client lives for this run only
                let mut provider = search::duckduckgo::DuckDuckGo::new(&settings.search)?;
                let pb = progress_bar();
                search::collect(&table, &columns, &mut provider, &pacing, &pb)?
            };

            for f in &collection.failures {
                eprintln!(
                    "Failed: row {} {:?} after {} attempt(s): {}",
                    f.row + 1,
                    f.query,
                    f.attempts,
                    f.reason
                );
            }
            if collection.results.is_empty() {
                println!("No results were retrieved from the search queries.");
            }

            let result = collection.to_table(&keep);
            let path = write_output(&result, &output, "output")?;
            println!(
                "Saved {} results ({} failed) to {}",
                result.len(),
                collection.failures.len(),
                path.display()
            );
        }
        Commands::Hiring { input, output } => {
            let table = read_upload(&input)?.load(input.sheet.as_deref())?;
            let cleaned = hiring::clean(&table)?;
            print_info(&cleaned);
            let path = write_output(&cleaned, &output, "cleaned_data")?;
            println!("Saved {} job rows to {}", cleaned.len(), path.display());
        }
    }

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }
    Ok(())
}

fn read_upload(input: &InputArgs) -> anyhow::Result<Upload> {
    Upload::read(&input.input).with_context(|| format!("Failed to read {}", input.input.display()))
}

fn write_output(table: &Table, args: &OutputArgs, default_stem: &str) -> anyhow::Result<PathBuf> {
    let format = args
        .format
        .or_else(|| args.output.as_deref().and_then(ExportFormat::from_path))
        .unwrap_or(ExportFormat::Csv);
    let path = args
        .output
        .clone()
        .unwrap_or_else(|| Path::new(default_stem).with_extension(format.extension()));

    let bytes = format.serialize(table)?;
    fs::write(&path, &bytes).with_context(|| format!("Failed to write {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), mime = format.mime_type(), "wrote output");
    Ok(path)
}

fn progress_bar() -> ProgressBar {
    let pb = ProgressBar::new(0);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

fn print_info(table: &Table) {
    println!("{} rows x {} columns", table.len(), table.columns().len());
    println!("{:>3} | {:<32} | {:>9} | {:<6}", "#", "Column", "Non-Null", "Kind");
    println!("{}", "-".repeat(60));
    for (i, s) in table.column_summaries().iter().enumerate() {
        println!(
            "{:>3} | {:<32} | {:>9} | {:<6}",
            i,
            truncate(&s.name, 32),
            s.non_null,
            s.kind.to_string()
        );
    }
}

fn print_preview(table: &Table, rows: usize) {
    const WIDTH: usize = 24;
    let header: Vec<String> = table
        .columns()
        .iter()
        .map(|c| format!("{:<WIDTH$}", truncate(c, WIDTH)))
        .collect();
    println!("{}", header.join(" | "));
    println!("{}", "-".repeat(header.len() * (WIDTH + 3)));
    for row in table.head(rows).rows() {
        let cells: Vec<String> = row
            .iter()
            .map(|c| format!("{:<WIDTH$}", truncate(&c.to_string().replace('\n', " "), WIDTH)))
            .collect();
        println!("{}", cells.join(" | "));
    }
    if table.len() > rows {
        println!("... {} more rows", table.len() - rows);
    }
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn extract_keys_keep_order() {
        let cli = Cli::parse_from([
            "priority_extract",
            "extract",
            "-i",
            "in.csv",
            "--keys",
            "talent,R&D,business",
        ]);
        let Commands::Extract { keys, column, .. } = cli.command else {
            panic!("expected extract");
        };
        assert_eq!(keys, vec!["talent", "R&D", "business"]);
        assert_eq!(column, "Formatted Priorities");
    }

    #[test]
    fn search_keeps_all_fields_by_default() {
        let cli = Cli::parse_from(["priority_extract", "search", "-i", "q.csv", "-c", "Company,Country"]);
        let Commands::Search { keep, columns, .. } = cli.command else {
            panic!("expected search");
        };
        assert_eq!(keep, OutputColumn::ALL.to_vec());
        assert_eq!(columns, vec!["Company", "Country"]);
    }

    #[test]
    fn truncate_marks_cut_text() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a long column name", 8), "a lon...");
    }

    #[test]
    fn fixture_end_to_end() {
        let raw = std::fs::read("tests/fixtures/priorities.csv").unwrap();
        let table = loader::load(&raw, loader::SourceFormat::Csv, None).unwrap();
        let keys = vec!["business".to_string(), "talent".to_string()];
        let out = priority::extract(&table, "Formatted Priorities", &keys, &ProgressBar::hidden()).unwrap();
        let result = out.to_table();
        let csv = String::from_utf8(ExportFormat::Csv.serialize(&result).unwrap()).unwrap();
        assert_eq!(
            csv,
            "Company Name,Priority Type,Priority Initiative Name,Priority Initiative Description\n\
             Acme,Business Priorities,Expand,Grow fast\n\
             Acme,Talent Priorities,Hire,Engineers Sales ops\n"
        );
    }
}
