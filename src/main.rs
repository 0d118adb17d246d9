//! iati-tables CLI - Convert IATI activity XML to and from CSV tables
//!
//! # Main Commands
//!
//! ```bash
//! iati-tables extract --xml activities.xml --output ./tables
//! iati-tables build --input ./tables --output activities.xml
//! iati-tables validate --input ./tables
//! iati-tables templates --output ./templates --examples
//! ```
//!
//! # Typical Workflow
//!
//! ```bash
//! iati-tables templates --output ./work --examples   # start from templates
//! iati-tables validate --input ./work                # check the edited tables
//! iati-tables build --input ./work --output out.xml --validate-tables
//! ```

use clap::{Parser, Subcommand, ValueEnum};
use iati_tables::{validate_folder, TableConverter, TableId};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "iati-tables")]
#[command(about = "Convert IATI activity XML to and from CSV tables", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract an IATI XML file into a folder of CSV tables
    Extract {
        /// Input IATI activity XML file
        #[arg(long)]
        xml: PathBuf,

        /// Output folder for the CSV tables
        #[arg(short, long)]
        output: PathBuf,

        /// Recreate the output folder if it already exists
        #[arg(long)]
        overwrite: bool,
    },

    /// Build an IATI XML file from a folder of CSV tables
    Build {
        /// Input folder containing the CSV tables
        #[arg(short, long)]
        input: PathBuf,

        /// Output XML file
        #[arg(short, long)]
        output: PathBuf,

        /// Validate the CSV tables first and abort on errors
        #[arg(long)]
        validate_tables: bool,

        /// Re-parse the generated XML as a final check
        #[arg(long)]
        validate_output: bool,
    },

    /// Validate a folder of CSV tables without converting it
    Validate {
        /// Input folder containing the CSV tables
        #[arg(short, long)]
        input: PathBuf,

        /// Report format
        #[arg(long, default_value = "text")]
        format: ReportFormat,
    },

    /// Write empty (or example-filled) CSV templates
    Templates {
        /// Output folder for the template files
        #[arg(short, long)]
        output: PathBuf,

        /// Fill the templates with example rows
        #[arg(long)]
        examples: bool,

        /// Comma-separated table names (default: all tables)
        #[arg(long, value_delimiter = ',')]
        tables: Option<Vec<String>>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Text,
    Json,
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Extract {
            xml,
            output,
            overwrite,
        } => cmd_extract(&xml, &output, overwrite),

        Commands::Build {
            input,
            output,
            validate_tables,
            validate_output,
        } => cmd_build(&input, &output, validate_tables, validate_output),

        Commands::Validate { input, format } => cmd_validate(&input, format),

        Commands::Templates {
            output,
            examples,
            tables,
        } => cmd_templates(&output, examples, tables),
    };

    if let Err(e) = result {
        eprintln!("❌ Error: {}", e);
        std::process::exit(1);
    }
}

fn cmd_extract(xml: &Path, output: &Path, overwrite: bool) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Extracting: {}", xml.display());

    if !xml.is_file() {
        return Err(format!("XML file not found: {}", xml.display()).into());
    }

    let mut converter = TableConverter::new();
    if !converter.xml_to_tables(&xml.to_string_lossy(), output, overwrite) {
        return Err("conversion failed".into());
    }
    Ok(())
}

fn cmd_build(
    input: &Path,
    output: &Path,
    validate_tables: bool,
    validate_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("⚙️  Building XML from: {}", input.display());

    let mut converter = TableConverter::new();
    let ok = converter.tables_to_xml(input, output, validate_output, validate_tables);

    for warning in &converter.latest_warnings {
        eprintln!("   ⚠️  {warning}");
    }
    if !ok {
        for error in &converter.latest_errors {
            eprintln!("   - {error}");
        }
        return Err(format!("{} error(s) reported", converter.latest_errors.len()).into());
    }
    Ok(())
}

fn cmd_validate(input: &Path, format: ReportFormat) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📊 Validating CSV folder: {}", input.display());

    let report = validate_folder(input);

    match format {
        ReportFormat::Text => {
            for issue in &report.issues {
                println!("{issue}");
            }
            let errors = report.errors().count();
            let warnings = report.warnings().count();
            if report.is_valid() {
                eprintln!("✅ Valid: {} warning(s), no errors", warnings);
            } else {
                eprintln!("❌ Invalid: {} error(s), {} warning(s)", errors, warnings);
            }
        }
        ReportFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    if !report.is_valid() {
        return Err("validation failed".into());
    }
    Ok(())
}

fn cmd_templates(
    output: &Path,
    examples: bool,
    tables: Option<Vec<String>>,
) -> Result<(), Box<dyn std::error::Error>> {
    eprintln!("📄 Writing templates to: {}", output.display());

    let subset: Option<Vec<TableId>> = match tables {
        Some(keys) => {
            let mut ids = Vec::new();
            for key in keys {
                let key = key.trim();
                if key.is_empty() {
                    continue;
                }
                match TableId::from_key(key) {
                    Some(id) => ids.push(id),
                    None => eprintln!("   ⚠️  Unknown table '{key}' skipped"),
                }
            }
            Some(ids)
        }
        None => None,
    };

    let mut converter = TableConverter::new();
    if !converter.generate_templates(output, examples, subset.as_deref()) {
        return Err("template generation failed".into());
    }
    Ok(())
}
